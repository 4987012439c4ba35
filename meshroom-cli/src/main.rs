mod chat;
mod image;
mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use meshroom_core::{IceServerConfig, parse_invite};
use meshroom_peer::{RtcTransport, Session, SessionConfig, TransportConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshroom", version, about = "Ephemeral peer-to-peer chat rooms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rendezvous service peers register with.
    Rendezvous {
        #[arg(long, env = "MESHROOM_BIND", default_value = "127.0.0.1:9000")]
        bind: String,

        /// ICE server announced to every peer (repeatable).
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,
    },

    /// Create a room and print its invitation link.
    Host(RoomArgs),

    /// Join a room from an invitation link or a host identifier.
    Join {
        invite: String,

        #[command(flatten)]
        room: RoomArgs,
    },
}

#[derive(Args)]
struct RoomArgs {
    /// Display name. A random one is generated when omitted.
    #[arg(short, long, env = "MESHROOM_NAME")]
    name: Option<String>,

    #[arg(long, env = "MESHROOM_RENDEZVOUS_URL")]
    rendezvous: Option<String>,

    /// Base URL invitation links are built on.
    #[arg(long, env = "MESHROOM_LINK_BASE", default_value = "https://meshroom.local/")]
    link_base: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Rendezvous { .. } => "info",
        _ => "warn",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Commands::Rendezvous { bind, ice_servers } => {
            let listener = TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {bind}"))?;
            let ice_servers = ice_servers.into_iter().map(IceServerConfig::stun).collect();

            println!("{} ws://{}/ws", "Rendezvous listening on".green().bold(), bind);
            meshroom_rendezvous::serve(
                listener,
                meshroom_rendezvous::RendezvousService::new(ice_servers),
            )
            .await
            .context("Rendezvous service stopped")?;
        }

        Commands::Host(room) => run_room(room, None).await?,

        Commands::Join { invite, room } => {
            let host = parse_invite(&invite).context("Invalid invitation")?;
            run_room(room, Some(host)).await?;
        }
    }

    Ok(())
}

async fn run_room(args: RoomArgs, invite: Option<meshroom_core::PeerId>) -> Result<()> {
    let mut transport_config = TransportConfig::from_env();
    if let Some(url) = args.rendezvous {
        transport_config = transport_config.with_rendezvous_url(url);
    }

    let mut config = SessionConfig::default();
    if let Some(name) = args.name {
        config = config.with_display_name(name);
    }
    if let Some(host) = invite {
        config = config.with_invite(host);
    }

    let handle = Session::spawn(Arc::new(RtcTransport::new(transport_config)), config);
    let self_id = handle
        .initialize()
        .await
        .context("Could not obtain an identifier from the rendezvous service")?;

    let snapshot = handle.snapshot();
    println!(
        "{} {} ({})",
        "You are".green().bold(),
        snapshot.display_name.bold(),
        self_id.to_string().dimmed()
    );
    if let Some(link) = handle.invite_link(&args.link_base)? {
        if snapshot.role == meshroom_peer::Role::Hub {
            println!("{} {}", "Invite others with".green(), link.underline());
        }
    }
    println!("{}", "Type a message, or /help for commands.".dimmed());

    chat::run(handle, args.link_base).await
}
