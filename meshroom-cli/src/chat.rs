use crate::{image, render};
use anyhow::Result;
use colored::*;
use meshroom_peer::{SessionError, SessionEvent, SessionHandle};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::debug;

const HELP: &str = "\
/image PATH   send an image (max 5 MiB)
/users        list participants
/link         print the invitation link
/id           print your identifier
/new          leave and start a new room
/quit         exit";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Text(&'a str),
    Image(&'a str),
    Users,
    Link,
    Id,
    New,
    Quit,
    Help,
    Unknown(&'a str),
    Empty,
}

fn parse(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Text(line);
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(n, r)| (n, r.trim()))
        .unwrap_or((command, ""));
    match name {
        "image" | "img" if !rest.is_empty() => Input::Image(rest),
        "users" | "who" => Input::Users,
        "link" => Input::Link,
        "id" => Input::Id,
        "new" => Input::New,
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        _ => Input::Unknown(line),
    }
}

/// Interactive loop: renders session events and turns input lines into commands.
pub async fn run(handle: SessionHandle, link_base: String) -> Result<()> {
    let printer = tokio::spawn(print_events(handle.subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let result = match parse(&line) {
            Input::Empty => Ok(()),
            Input::Text(text) => handle.send_text(text).await,
            Input::Image(path) => match image::load(Path::new(path)).await {
                Ok(data_url) => handle.send_image(data_url).await,
                Err(e) => {
                    eprintln!("{} {:#}", "x".red().bold(), e);
                    Ok(())
                }
            },
            Input::Users => {
                println!("{}", render::users(&handle.snapshot()));
                Ok(())
            }
            Input::Link => {
                match handle.invite_link(&link_base)? {
                    Some(link) => println!("{}", link.underline()),
                    None => println!("{}", "Not identified yet".dimmed()),
                }
                Ok(())
            }
            Input::Id => {
                match handle.snapshot().self_id {
                    Some(id) => println!("{}", id),
                    None => println!("{}", "Not identified yet".dimmed()),
                }
                Ok(())
            }
            Input::New => handle.reset_room().await,
            Input::Quit => break,
            Input::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Input::Unknown(cmd) => {
                println!("{} {} (try /help)", "Unknown command".yellow(), cmd);
                Ok(())
            }
        };

        match result {
            Ok(()) => {}
            // Already reported through a notice.
            Err(SessionError::NotConnected) => {}
            Err(SessionError::SessionClosed) => break,
            Err(e) => eprintln!("{} {}", "x".red().bold(), e),
        }
    }

    let _ = handle.shutdown().await;
    printer.abort();
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Message(msg)) if !msg.origin_local => {
                println!("{}", render::message(&msg));
            }
            Ok(SessionEvent::Message(msg)) if msg.is_system_notice => {
                println!("{}", render::message(&msg));
            }
            Ok(SessionEvent::Message(_)) => {}
            Ok(SessionEvent::Notice(notice)) => println!("{}", render::notice(&notice)),
            Ok(SessionEvent::Cleared) => {
                println!("{}", "Room cleared. Starting a new room...".dimmed());
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!("Chat printer lagged by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
