use rand::seq::IndexedRandom;

const ADJECTIVES: &[&str] = &[
    "admiring", "brave", "calm", "clever", "dreamy", "eager", "festive", "gentle", "happy",
    "jolly", "keen", "lucid", "merry", "nifty", "optimistic", "peaceful", "quirky", "relaxed",
    "serene", "tender", "upbeat", "vibrant", "wizardly", "youthful", "zealous",
];

const SURNAMES: &[&str] = &[
    "babbage", "curie", "darwin", "euler", "fermi", "gauss", "hopper", "hypatia", "kepler",
    "lamarr", "lovelace", "meitner", "newton", "noether", "pascal", "ritchie", "shannon",
    "tesla", "thompson", "turing", "volta", "wozniak", "yalow", "zuse",
];

/// `adjective.surname`, e.g. `calm.hopper`.
pub fn random_display_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("anonymous");
    let surname = SURNAMES.choose(&mut rng).copied().unwrap_or("peer");
    format!("{adjective}.{surname}")
}
