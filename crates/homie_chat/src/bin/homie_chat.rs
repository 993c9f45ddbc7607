//! homie-chat: command-line client for a group chat channel.
//! Reads config, opens a live session, prints the feed as it arrives. With a
//! message argument it sends that one message and exits; otherwise each stdin
//! line is sent until EOF.

use homie_chat::{
    config, ChatClient, ChatSession, Composer, HistorySource, NoHistory, WsConnector,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const LIVE_TIMEOUT: Duration = Duration::from_secs(10);
const ECHO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    channel: Option<String>,
    token: Option<String>,
    message: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut positional = Vec::new();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = iter.next().map(PathBuf::from),
            "--channel" => args.channel = iter.next(),
            "--token" => args.token = iter.next(),
            _ => positional.push(arg),
        }
    }
    if !positional.is_empty() {
        args.message = Some(positional.join(" "));
    }
    args
}

fn resolve_config_path(args: &Args) -> PathBuf {
    // 1. --config <path> flag
    if let Some(path) = &args.config {
        return path.clone();
    }
    // 2. HOMIE_CHAT_CONFIG env var
    if let Ok(val) = std::env::var("HOMIE_CHAT_CONFIG") {
        return PathBuf::from(val);
    }
    // 3. Default path (~/.homie-chat/config.yaml)
    config::default_config_path().unwrap_or_else(|| {
        eprintln!("Error: unable to determine config path (set --config or HOMIE_CHAT_CONFIG)");
        process::exit(1);
    })
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("homie_chat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();
    let args = parse_args();
    let config_path = resolve_config_path(&args);

    let cfg = match config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load config from {}: {}", config_path.display(), e);
            process::exit(1);
        }
    };

    let token = args
        .token
        .clone()
        .or_else(|| std::env::var("HOMIE_CHAT_TOKEN").ok())
        .or_else(|| cfg.auth.token.clone());
    let Some(token) = token else {
        eprintln!("Error: no token (use --token, HOMIE_CHAT_TOKEN or auth.token)");
        process::exit(1);
    };
    let Some(channel) = args.channel.clone().or_else(|| cfg.chat.channel_id.clone()) else {
        eprintln!("Error: no channel (use --channel or chat.channel_id)");
        process::exit(1);
    };
    let options = match cfg.session_options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: invalid config: {}", e);
            process::exit(1);
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    let assistant = cfg.assistant_name().to_owned();
    let result = rt.block_on(async {
        if cfg.history_enabled() {
            let client = ChatClient::connect_default(options);
            run(client, &channel, &token, &assistant, args.message).await
        } else {
            let client = ChatClient::new(options, Arc::new(WsConnector::new()), NoHistory);
            run(client, &channel, &token, &assistant, args.message).await
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run<H: HistorySource + Clone>(
    mut client: ChatClient<H>,
    channel: &str,
    token: &str,
    assistant: &str,
    message: Option<String>,
) -> Result<(), String> {
    let session = client.subscribe(channel, token).map_err(|e| e.to_string())?;
    let result = match message {
        Some(text) => send_once(session, &text).await,
        None => interactive(session, assistant).await,
    };
    client.unsubscribe();
    result
}

/// Wait for the connection, send `text`, wait for the server echo, print.
async fn send_once(session: &ChatSession, text: &str) -> Result<(), String> {
    let mut status = session.status();
    let live = matches!(
        tokio::time::timeout(LIVE_TIMEOUT, status.wait_for(|s| s.is_live())).await,
        Ok(Ok(_))
    );
    if !live {
        return Err("not connected to live chat".into());
    }
    let before = status.borrow().feed_len;
    if !session.send(text) {
        return Err("message not sent".into());
    }

    let echoed = tokio::time::timeout(ECHO_TIMEOUT, session.wait_for_echo(text, before)).await;
    if !matches!(echoed, Ok(Some(_))) {
        tracing::warn!("no echo from server");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for m in session.feed() {
        let _ = writeln!(out, "{}: {}", m.sender_name, m.content);
    }
    Ok(())
}

/// Print the feed as it grows and send each stdin line.
async fn interactive(session: &ChatSession, assistant: &str) -> Result<(), String> {
    let mut status = session.status();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut composer = Composer::new();
    let mut printed = 0;
    let mut replying = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        composer.set(line);
                        if !composer.text().trim().is_empty() && !composer.submit(session) {
                            eprintln!("(not connected, message not sent: {})", composer.text());
                            composer.clear();
                        }
                    }
                    Ok(None) => return Ok(()),
                    Err(e) => return Err(e.to_string()),
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let peer_is_active = status.borrow_and_update().peer_is_active;
                let fresh = session.messages_since(printed);
                printed += fresh.len();
                let stdout = io::stdout();
                let mut out = stdout.lock();
                for m in fresh {
                    let _ = writeln!(out, "{}: {}", m.sender_name, m.content);
                }
                if peer_is_active && !replying {
                    let _ = writeln!(out, "* {} is replying...", assistant);
                }
                replying = peer_is_active;
                let _ = out.flush();
            }
        }
    }
}
