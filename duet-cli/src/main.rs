use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use duet::model::{NegotiationState, RoomMember, split, split_in_halves};
use duet::peer::{
    LocalBus, Session, SessionConfig, SessionEvent, StaticMediaSource, WebRtcConfig,
    WebRtcTransportFactory, WsTransport,
};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duet")]
#[command(about = "Two-party calls negotiated over a presence channel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a JSON payload (stdin or file) into chunk envelopes.
    Split {
        #[arg(short, long, default_value_t = 10 * 1024)]
        max: usize,

        /// Always split at the midpoint into two chunks.
        #[arg(long)]
        halves: bool,

        #[arg(short, long)]
        file: Option<String>,
    },

    /// Join a room on a relay and print session events; stdin lines are sent as chat.
    Join {
        #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
        relay: String,

        #[arg(long)]
        room: String,

        #[arg(long)]
        member: String,

        #[arg(long)]
        owner: bool,

        /// Give up if negotiation does not complete in this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Negotiate two in-process sessions with real peer connections.
    Loopback {
        #[arg(long, default_value_t = 20)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("duet_peer=info,warn")),
        )
        .init();

    match Cli::parse().command {
        Commands::Split { max, halves, file } => run_split(max, halves, file),
        Commands::Join {
            relay,
            room,
            member,
            owner,
            timeout,
        } => run_join(&relay, &room, &member, owner, timeout).await,
        Commands::Loopback { timeout } => run_loopback(timeout).await,
    }
}

fn run_split(max: usize, halves: bool, file: Option<String>) -> Result<()> {
    let mut input = String::new();
    match &file {
        Some(path) => {
            input = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
        }
    }

    let value: serde_json::Value =
        serde_json::from_str(input.trim()).context("Input is not valid JSON")?;
    let text = serde_json::to_string(&value)?;

    let chunks = if halves {
        split_in_halves(&text)
    } else {
        split(&text, max)
    };

    eprintln!(
        "{}",
        format!("📦 {} bytes -> {} chunk(s)", text.len(), chunks.len()).cyan()
    );
    for chunk in &chunks {
        println!("{}", serde_json::to_string(&chunk.to_value()?)?);
    }
    Ok(())
}

async fn run_join(
    relay: &str,
    room: &str,
    member: &str,
    owner: bool,
    timeout: Option<u64>,
) -> Result<()> {
    println!("{}", format!("🚀 Joining room '{}' as {}...", room, member).green().bold());

    let (transport, rx) = WsTransport::connect(relay, room, RoomMember::new(member, member))
        .await
        .with_context(|| format!("Failed to connect to {}", relay))?;

    let mut config = SessionConfig::default().with_owner(owner);
    if let Some(secs) = timeout {
        config = config.with_negotiation_timeout(Duration::from_secs(secs));
    }

    let session = Session::start(
        config,
        Arc::new(transport),
        rx,
        Arc::new(WebRtcTransportFactory::new(
            WebRtcConfig::default().with_turn_from_env(),
        )),
        Arc::new(StaticMediaSource::default()),
    )
    .await
    .context("Failed to start session")?;

    let mut events = session.events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event("", &event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("{}", format!("⚠️  {} events dropped", n).yellow());
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            line = lines.next_line() => match line? {
                Some(line) if !line.trim().is_empty() => {
                    if let Err(e) = session.send_chat(line.trim()).await {
                        eprintln!("{}", format!("❌ {}", e).red());
                    }
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.leave().await?;
    println!("{}", "👋 Left the room".green());
    Ok(())
}

async fn run_loopback(timeout: u64) -> Result<()> {
    println!("{}", "🚀 Starting loopback call...".green().bold());

    let bus = LocalBus::default();
    let factory = Arc::new(WebRtcTransportFactory::new(WebRtcConfig::local_only()));
    let media = Arc::new(StaticMediaSource::default());

    let mut sessions = Vec::new();
    for (id, config) in [
        ("owner", SessionConfig::owner()),
        ("guest", SessionConfig::guest()),
    ] {
        let (client, rx) = bus.connect("loopback", RoomMember::new(id, id))?;
        let session = Session::start(config, Arc::new(client), rx, factory.clone(), media.clone())
            .await
            .with_context(|| format!("Failed to start {}", id))?;
        let mut events = session.events();
        let label = format!("[{}] ", id);
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                print_event(&label, &event);
            }
        });
        sessions.push(session);
    }

    for session in &sessions {
        session
            .wait_for_state(NegotiationState::Connected, Duration::from_secs(timeout))
            .await
            .with_context(|| format!("{} did not connect", session.local_member().id))?;
    }
    println!("{}", "✨ Both sides connected".green().bold());

    for session in &sessions {
        session.leave().await?;
    }
    Ok(())
}

fn print_event(label: &str, event: &SessionEvent) {
    let line = match event {
        SessionEvent::RoleAssigned(role) => format!("🎭 role: {}", role).cyan(),
        SessionEvent::StateChanged {
            from,
            to,
            generation,
        } => format!("🔁 {} -> {} (instance {})", from, to, generation).cyan(),
        SessionEvent::PeerJoined(member) => format!("➕ {} joined", member.id).green(),
        SessionEvent::PeerLeft(member) => format!("➖ {} left", member.id).yellow(),
        SessionEvent::ReassemblyCompleted { event } => format!("📦 {} reassembled", event).normal(),
        SessionEvent::ReassemblyFailed { event, reason } => {
            format!("⚠️  {} dropped: {}", event, reason).yellow()
        }
        SessionEvent::StaleEvent { input, state } => {
            format!("⏭  {} ignored in {}", input, state).dimmed()
        }
        SessionEvent::RemoteTrack(track) => {
            format!("🎧 remote {:?} track {}", track.kind, track.id).green()
        }
        SessionEvent::ConnectivityChanged(state) => format!("📡 media {:?}", state).normal(),
        SessionEvent::Chat(message) => {
            format!("💬 {}: {}", message.sender_id, message.body).bold()
        }
        SessionEvent::MemberAnnounced(id) => format!("👋 {} announced", id).normal(),
        SessionEvent::Error(e) => format!("❌ {}", e).red(),
        SessionEvent::TornDown { generation } => {
            format!("🧹 instance {} closed", generation).yellow()
        }
    };
    println!("{}{}", label, line);
}
