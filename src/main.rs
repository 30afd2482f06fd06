//! Funnel Bot - Main Entry Point
//!
//! Runs the Telegram long-polling dispatcher and the HTTP gateway side by
//! side over one shared funnel.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use teloxide::prelude::*;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use funnel_bot::commands::CommandHandler;
use funnel_bot::config::{FunnelScript, FunnelSettings};
use funnel_bot::funnel::Funnel;
use funnel_bot::server::{AppState, build_router};
use funnel_bot::telegram::TelegramGateway;
use funnel_bot::types::UserId;

const EXAMPLE_SCRIPT_PATH: &str = "script.example.json";

/// Telegram funnel bot with signed tracking links and reminders.
#[derive(Parser, Debug)]
#[command(name = "funnel_bot")]
#[command(about = "Telegram funnel bot with signed tracking links and reminders")]
#[command(version)]
struct Args {
    /// Path to a JSON script overriding the built-in messages.
    #[arg(short, long)]
    script: Option<String>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Address the HTTP server binds to.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Generate an example script file and exit.
    #[arg(long)]
    generate_script: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if args.generate_script {
        return generate_example_script();
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let settings =
        FunnelSettings::from_env().context("Failed to load settings from environment")?;

    let script = match &args.script {
        Some(path) => FunnelScript::load_from_file(path)
            .with_context(|| format!("Failed to load script from {path}"))?,
        None => FunnelScript::default(),
    };
    script.validate().context("Funnel script validation failed")?;

    let gateway = TelegramGateway::new(&settings.bot_token);
    let bot = gateway.bot().clone();

    let me = bot.get_me().await.context("Failed to reach the Telegram Bot API")?;
    let bot_username = me.user.username.clone();
    info!(username = ?bot_username, "Connected to Telegram");

    let funnel = Arc::new(Funnel::from_settings(&settings, script, Arc::new(gateway)));
    funnel.log_photo_sources();

    match &settings.base_url {
        Some(base) => info!(base_url = %base, "Tracking links go through /go"),
        None => warn!("FUNNEL_BASE_URL not set, tracking links point straight at the site"),
    }

    // HTTP gateway
    let addr = format!("{}:{}", args.bind, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {addr}"))?;
    info!(addr = %addr, "HTTP server listening");

    let router = build_router(AppState::new(Arc::clone(&funnel)));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    // Chat commands
    let commands = Arc::new(CommandHandler::new(Arc::clone(&funnel), bot_username));
    let handler = Update::filter_message().endpoint(move |msg: Message| {
        let commands = Arc::clone(&commands);
        async move {
            if let Some(text) = msg.text() {
                commands.try_handle(UserId(msg.chat.id.0), text).await;
            }
            respond(())
        }
    });

    info!("Bot is running. Use Ctrl+C to stop.");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shutting down...");
    let _ = shutdown_tx.send(());
    server_handle
        .await
        .context("HTTP server task panicked")?
        .context("HTTP server failed")?;

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Writes the built-in script as an example file.
fn generate_example_script() -> Result<()> {
    FunnelScript::example().save_to_file(EXAMPLE_SCRIPT_PATH)?;

    println!("✓ Example script written to: {EXAMPLE_SCRIPT_PATH}");
    println!("\nTo use this bot:");
    println!("1. Copy {EXAMPLE_SCRIPT_PATH} to script.json and edit the texts");
    println!("2. Create a .env file with FUNNEL_BOT_TOKEN and FUNNEL_SIGNING_SECRET");
    println!("3. Run: funnel_bot --script script.json");

    Ok(())
}
