//! `banter` – console front-end for the conversational memory engine.
//!
//! 1. Loads `~/.banter/config.toml` (plus `BANTER_*` overrides) and refuses
//!    to start on an invalid configuration.  `banter init` writes a default
//!    config file and exits.
//! 2. Opens the message store, probes the inference server and warm-starts
//!    the engine from stored history.
//! 3. Reads stdin lines as group messages (`!dm ` prefix for direct ones) and
//!    prints replies; runs the retention sweep and the announcer on timers.
//! 4. On **Ctrl-C** or end of input, abandons in-flight replies, flushes
//!    pending store writes and exits.

mod config;
mod console;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use banter_memory::MessageStore;
use banter_runtime::{
    Engine, EngineServices, HttpEmbedder, LlmDriver, MessagingGateway, ThreadRandom, clock_for_timezone,
    init_tracing,
};
use banter_types::BanterError;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigError};
use crate::console::{ConsoleGateway, ConsoleInput};

fn main() -> ExitCode {
    let _tracing = init_tracing("banter");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} {e}", "✗ Failed to start runtime:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let result = if std::env::args().nth(1).as_deref() == Some("init") {
        write_default_config()
    } else {
        runtime.block_on(run())
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "banter stopped");
            eprintln!("{} {e}", "✗".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn write_default_config() -> Result<(), BanterError> {
    let path = config::config_path();
    if path.exists() {
        println!("{} {}", "Config already exists:".yellow(), path.display());
        return Ok(());
    }
    config::save_to(&Config::default(), &path).map_err(config_error)?;
    println!("{} {}", "✓ Wrote".green(), path.display());
    println!("  Set {} before starting.", "chat_id".bold());
    Ok(())
}

async fn run() -> Result<(), BanterError> {
    print_banner();

    let cfg = config::load().map_err(config_error)?;
    let engine_config = cfg.engine_config().map_err(config_error)?;
    debug!(config = ?cfg, "configuration loaded");

    let store = MessageStore::open(&cfg.db_path).map_err(|e| BanterError::Storage(e.to_string()))?;
    info!(path = %cfg.db_path, "message store opened");

    let api_key = (!cfg.api_key.is_empty()).then(|| cfg.api_key.clone());
    let driver = Arc::new(LlmDriver::new(&cfg.inference_url, &cfg.model).with_api_key(api_key));
    if driver.health_check().await {
        println!("  Inference server: {} ({})", "online".green(), cfg.inference_url);
    } else {
        println!("  Inference server: {} ({})", "offline".yellow(), cfg.inference_url);
        warn!(url = %cfg.inference_url, "inference server unreachable, replies will use fallbacks");
    }

    let services = EngineServices {
        store: Arc::new(store),
        inference: driver,
        embedder: Arc::new(HttpEmbedder::new(&cfg.embedding_url, &cfg.embedding_model)),
        random: Arc::new(ThreadRandom),
        clock: clock_for_timezone(&cfg.timezone),
    };
    let engine = Arc::new(Engine::new(engine_config, services));

    match engine.warm_start().await {
        Ok(n) => info!(events = n, "warm start complete"),
        Err(e) => warn!(error = %e, "warm start failed, starting with empty memory"),
    }

    let gateway = Arc::new(ConsoleGateway);
    let mut jobs = JoinSet::new();
    jobs.spawn(sweep_loop(engine.clone(), Duration::from_secs(cfg.cleanup_interval_secs)));
    if cfg.enable_schedule {
        jobs.spawn(announce_loop(
            engine.clone(),
            gateway.clone(),
            Duration::from_secs(cfg.scheduler_interval_secs),
        ));
    }

    println!("  Type a message, or {} for a direct one. Ctrl-C to quit.", "!dm <text>".bold());
    let input = ConsoleInput::new(cfg.chat_id.unwrap_or_default(), cfg.thread_id, operator_name());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut replies = JoinSet::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(inbound) = input.parse_line(&line) else { continue };
                    let engine = engine.clone();
                    let gateway = gateway.clone();
                    replies.spawn(async move {
                        if let Err(e) = engine.respond(&inbound, gateway.as_ref()).await {
                            error!(author_id = inbound.author_id, error = %e, "message handling failed");
                        }
                    });
                }
                Ok(None) => {
                    info!("input closed");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "failed to read stdin");
                    break;
                }
            },
            Some(_) = replies.join_next(), if !replies.is_empty() => {}
        }
    }

    replies.abort_all();
    jobs.abort_all();
    engine.flush().await;
    println!("{}", "  ✓ Pending writes flushed. Bye.".green());
    Ok(())
}

async fn sweep_loop(engine: Arc<Engine>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately; the first sweep waits a full period.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let engine = engine.clone();
        match tokio::task::spawn_blocking(move || engine.sweep()).await {
            Ok(Ok(report)) => debug!(?report, "sweep finished"),
            Ok(Err(e)) => error!(error = %e, "sweep failed"),
            Err(e) => error!(error = %e, "sweep task panicked"),
        }
    }
}

async fn announce_loop(engine: Arc<Engine>, gateway: Arc<dyn MessagingGateway>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        match engine.announce(gateway.as_ref()).await {
            Ok(0) => {}
            Ok(n) => info!(sent = n, "announcements delivered"),
            Err(e) => error!(error = %e, "announcement delivery failed"),
        }
    }
}

fn config_error(e: ConfigError) -> BanterError {
    BanterError::Config(e.to_string())
}

fn operator_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "оператор".to_string())
}

fn print_banner() {
    println!("{}", "┌───────────────────────────────┐".cyan());
    println!("{}", "│  banter · memory chat engine  │".cyan().bold());
    println!("{}", "└───────────────────────────────┘".cyan());
}
