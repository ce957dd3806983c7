//! Hands-free console binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Spawn a hands-free session over the console recognition engine
//! 3. Read commands and "speech" from stdin until `:quit` or EOF

mod cli;
mod console;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use handsfree_core::config::HandsFreeConfig;
use handsfree_core::error::Result;
use handsfree_session::HandsFreeSession;

use cli::CliArgs;
use console::{ConsoleCallbacks, ConsoleEngine};

/// One line of console input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Start,
    Stop,
    Pause,
    Resume,
    Enable,
    Disable,
    Status,
    Quit,
    Fail(&'a str),
    End,
    Speak(&'a str),
    Blank,
    Unknown(&'a str),
}

fn parse_line(line: &str) -> Command<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Command::Blank;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Speak(line);
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "enable" => Command::Enable,
        "disable" => Command::Disable,
        "status" => Command::Status,
        "quit" | "q" => Command::Quit,
        "error" if !arg.is_empty() => Command::Fail(arg),
        "end" => Command::End,
        _ => Command::Unknown(line),
    }
}

const HELP: &str = "Commands: :start :stop :pause :resume :enable :disable :status \
:error <code> :end :quit. Any other line is spoken; end it with ... for an interim result.";

/// Log domain events as they happen.
async fn event_log(mut events: tokio::sync::broadcast::Receiver<handsfree_core::SessionEvent>) {
    use tokio::sync::broadcast::error::RecvError;
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::debug!(event = event.event_name(), %json, "Session event"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize session event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = HandsFreeConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);
    config.validate()?;

    // Tracing.
    let log_level = args.resolve_log_level(&config);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting handsfree v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        silence_ms = config.session.silence_ms,
        auto_send = config.session.auto_send,
        locale = %config.engine.locale,
        "Configuration loaded"
    );

    let engine = ConsoleEngine::new();
    let callbacks = Arc::new(ConsoleCallbacks::new());
    let session = HandsFreeSession::builder(Arc::new(engine.clone()), callbacks.clone())
        .config(&config)
        .spawn();
    callbacks.attach(session.control());
    tokio::spawn(event_log(session.subscribe()));

    println!("{HELP}");
    run_console(&session, &engine).await?;

    session.shutdown().await?;
    tracing::info!("handsfree exited");
    Ok(())
}

async fn run_console(session: &HandsFreeSession, engine: &ConsoleEngine) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Command::Start => session.start()?,
            Command::Stop => session.stop()?,
            Command::Pause => session.pause()?,
            Command::Resume => session.resume()?,
            Command::Enable => session.set_enabled(true)?,
            Command::Disable => session.set_enabled(false)?,
            Command::Status => {
                session.flush().await?;
                println!("{}", serde_json::to_string_pretty(&session.status())?);
            }
            Command::Quit => break,
            Command::Fail(code) => engine.fail(code),
            Command::End => engine.end(),
            Command::Speak(text) => {
                if !engine.hear(text) {
                    println!("Not listening. Use :start first.");
                }
            }
            Command::Blank => {}
            Command::Unknown(input) => {
                println!("Unknown command {input:?}. {HELP}");
            }
        }
    }
    Ok(())
}
