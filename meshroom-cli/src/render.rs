use chrono::{DateTime, Local};
use colored::*;
use meshroom_core::{ChatMessage, MessageBody};
use meshroom_peer::{Notice, NoticeKind, RoomSnapshot};

fn clock(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_owned())
}

pub fn message(msg: &ChatMessage) -> String {
    let time = clock(msg.timestamp).dimmed();

    if msg.is_system_notice {
        let text = msg.text().unwrap_or_default();
        return format!("{} {}", time, text.dimmed().italic());
    }

    let author = if msg.origin_local {
        msg.author.cyan().bold()
    } else {
        msg.author.yellow().bold()
    };

    match &msg.body {
        MessageBody::Text(text) => format!("{} {}: {}", time, author, text),
        MessageBody::Image(data_url) => {
            let mime = data_url
                .strip_prefix("data:")
                .and_then(|rest| rest.split(';').next())
                .unwrap_or("image");
            format!(
                "{} {}: {}",
                time,
                author,
                format!("[{} image, {} bytes encoded]", mime, data_url.len()).magenta()
            )
        }
    }
}

pub fn notice(notice: &Notice) -> String {
    match notice.kind {
        NoticeKind::Info => format!("{} {}", "i".blue(), notice.text),
        NoticeKind::Warning => format!("{} {}", "!".yellow().bold(), notice.text.yellow()),
        NoticeKind::Error => format!("{} {}", "x".red().bold(), notice.text.red()),
    }
}

pub fn users(snapshot: &RoomSnapshot) -> String {
    let mut out = format!(
        "{} {} ({})",
        "In the room:".bold(),
        snapshot.count,
        snapshot.phase
    );
    for (i, p) in snapshot.participants.iter().enumerate() {
        let mut line = format!("\n  {}", p.display_name);
        if i == 0 {
            line.push_str(&format!(" {}", "(host)".dimmed()));
        }
        if snapshot.self_id.as_ref() == Some(&p.peer_id) {
            line.push_str(&format!(" {}", "(you)".dimmed()));
        }
        out.push_str(&line);
    }
    out
}
