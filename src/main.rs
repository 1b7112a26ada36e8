use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use botlink::config::Config;
use botlink::error::{BotlinkError, Result};
use botlink::{handler_fn, Gateway, Poller, Update};

#[derive(Parser)]
#[command(name = "botlink", version, about = "Bot API gateway: send, poll and webhook delivery")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config file
    Init,
    /// Send a text message to a chat
    Send {
        /// Target chat ID
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,
        /// The message text to send
        text: String,
    },
    /// Fetch pending updates
    Poll {
        /// First update_id to request
        #[arg(short, long, default_value = "0")]
        offset: i64,
        /// Keep polling, advancing the offset after each batch
        #[arg(short, long)]
        follow: bool,
    },
    /// Webhook registration management
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
    /// Run the webhook endpoint
    Serve,
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Register the webhook with the platform
    Set {
        /// Callback URL (defaults to webhook.public_url)
        #[arg(short, long)]
        url: Option<String>,
        /// Certificate file (defaults to webhook.certificate)
        #[arg(short, long)]
        certificate: Option<PathBuf>,
    },
    /// Remove the webhook and return to polling
    Delete,
    /// Show the current webhook registration
    Info,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // file + stderr for long-running commands, stderr only otherwise
    let long_running = matches!(
        &cli.command,
        Commands::Serve | Commands::Poll { follow: true, .. }
    );
    init_tracing(long_running)?;

    match cli.command {
        Commands::Init => cmd_init(&cli.config)?,
        Commands::Send { chat_id, text } => cmd_send(&cli.config, chat_id, &text).await?,
        Commands::Poll { offset, follow } => cmd_poll(&cli.config, offset, follow).await?,
        Commands::Webhook { action } => match action {
            WebhookAction::Set { url, certificate } => {
                cmd_webhook_set(&cli.config, url, certificate).await?
            }
            WebhookAction::Delete => cmd_webhook_delete(&cli.config).await?,
            WebhookAction::Info => cmd_webhook_info(&cli.config).await?,
        },
        Commands::Serve => cmd_serve(&cli.config).await?,
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn botlink_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".botlink")
}

fn log_file_path() -> PathBuf {
    botlink_dir().join("botlink.log")
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    let config_path = path.clone().unwrap_or_else(Config::default_path);
    if !config_path.exists() {
        return Err(BotlinkError::Config(format!(
            "Config not found at {}. Run `botlink init` first.",
            config_path.display()
        )));
    }
    Config::load(&config_path)
}

fn init_tracing(with_file: bool) -> std::result::Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if with_file {
            "info".into()
        } else {
            "warn".into()
        }
    });

    let stderr_layer = tracing_subscriber::fmt::layer();

    if with_file {
        let dir = botlink_dir();
        let _ = std::fs::create_dir_all(&dir);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path())?;

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }

    Ok(())
}

fn print_update(update: &Update) {
    let from = &update.message.from;
    let sender = if from.username.is_empty() {
        from.first_name.clone()
    } else {
        format!("@{}", from.username)
    };
    println!(
        "[{}] chat={} from={} {}",
        update.update_id,
        update.chat_id(),
        sender,
        update.message.text
    );
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    println!("\nShutting down...");
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_init(config_path: &Option<PathBuf>) -> Result<()> {
    let path = config_path.clone().unwrap_or_else(Config::default_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::write(&path, Config::default_toml())?;
        println!("Created config at {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

async fn cmd_send(config_path: &Option<PathBuf>, chat_id: i64, text: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let gateway = Gateway::from_config(&config)?;
    gateway.send(chat_id, text).await?;
    println!("Sent to chat {chat_id}.");
    Ok(())
}

async fn cmd_poll(config_path: &Option<PathBuf>, offset: i64, follow: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let gateway = Arc::new(Gateway::from_config(&config)?);

    if !follow {
        let updates = gateway.poll(offset).await?;
        if updates.is_empty() {
            println!("No pending updates.");
        }
        for update in &updates {
            print_update(update);
        }
        if let Some(last) = updates.last() {
            println!("\nNext offset: {}", last.update_id.saturating_add(1));
        }
        return Ok(());
    }

    let handler = handler_fn(|update: Update| async move {
        print_update(&update);
        Ok(())
    });
    let interval = Duration::from_millis(config.polling.interval_ms);

    println!("Polling from offset {offset}. Press Ctrl+C to stop.");
    let next = Poller::new(gateway, offset)
        .run(&handler, interval, shutdown_signal())
        .await;
    println!("Resume with --offset {next}");
    Ok(())
}

async fn cmd_webhook_set(
    config_path: &Option<PathBuf>,
    url: Option<String>,
    certificate: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let gateway = Gateway::from_config(&config)?;

    let url = url.unwrap_or_else(|| config.webhook.public_url.clone());
    if url.is_empty() {
        return Err(BotlinkError::Config(
            "No callback URL: pass --url or set webhook.public_url".to_string(),
        ));
    }
    let certificate = certificate.unwrap_or_else(|| config.webhook.certificate.clone());

    match config.webhook.secret() {
        Some(secret) => {
            gateway
                .register_webhook_with_secret(&url, &certificate, secret)
                .await?
        }
        None => gateway.register_webhook(&url, &certificate).await?,
    }
    println!("Webhook set to {url}");
    Ok(())
}

async fn cmd_webhook_delete(config_path: &Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let gateway = Gateway::from_config(&config)?;
    gateway.unregister_webhook().await?;
    println!("Webhook deleted. Updates are pollable again.");
    Ok(())
}

async fn cmd_webhook_info(config_path: &Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let gateway = Gateway::from_config(&config)?;
    let info = gateway.webhook_status().await?;

    if info.url.is_empty() {
        println!("URL:                 (none, polling mode)");
    } else {
        println!("URL:                 {}", info.url);
    }
    println!("Custom certificate:  {}", info.has_custom_certificate);
    println!("Pending updates:     {}", info.pending_update_count);
    Ok(())
}

async fn cmd_serve(config_path: &Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let gateway = Arc::new(Gateway::from_config(&config)?);
    let bind_addr = config.webhook.bind.clone();
    let webhook_path = config.webhook.route_path();

    let (update_tx, mut update_rx) = mpsc::channel::<Update>(64);

    tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            print_update(&update);
        }
    });

    let state = Arc::new(botlink::api::AppState {
        gateway,
        handler: Arc::new(update_tx),
        webhook_path: webhook_path.clone(),
        secret_token: config.webhook.secret().map(str::to_string),
        max_body_bytes: config.webhook.max_body_bytes,
    });

    let app = botlink::api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.map_err(|e| {
        BotlinkError::Config(format!("Failed to bind to {bind_addr}: {e}"))
    })?;

    let local_addr = listener.local_addr().map_err(|e| {
        BotlinkError::Config(format!("Failed to get local address: {e}"))
    })?;

    info!("Webhook endpoint listening on {local_addr}{webhook_path}");
    println!("botlink v{} serving webhook", env!("CARGO_PKG_VERSION"));
    println!("  Bind:  {local_addr}");
    println!("  Path:  {webhook_path}");
    println!("  Log:   {}", log_file_path().display());
    println!();
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BotlinkError::Config(format!("Server error: {e}")))?;

    println!("botlink stopped.");
    Ok(())
}
