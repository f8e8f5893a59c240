use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use salesbot_core::{ChatSession, Config, WebhookClient};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

const DEFAULT_LOG_FILTER: &str = "salesbot=info,salesbot_core=info";

#[derive(Parser, Debug)]
#[command(name = "salesbot", version)]
#[command(about = "Chat with a workflow-automation webhook from the terminal")]
struct Cli {
    /// Webhook URL of the workflow that answers messages
    #[arg(long, env = "SALESBOT_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Config file (defaults to <config dir>/salesbot/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pause before each webhook call, in milliseconds
    #[arg(long)]
    reply_delay_ms: Option<u64>,

    /// Title shown in the header and as the bot's name
    #[arg(long)]
    title: Option<String>,

    /// Log file for the interactive mode
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the resolved settings back to the config file
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// The message to send
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let file_config = Config::load_from(&config_path)?;
    let config = resolve_config(&cli, file_config);

    if cli.save_config {
        config.save_to(&config_path)?;
    }

    let client = WebhookClient::new(config.webhook_url.clone()).with_reply_delay(config.reply_delay());

    match cli.command {
        Some(Commands::Ask { message }) => {
            init_stderr_logging();
            ask(&client, message).await
        }
        None => {
            let log_path = match cli.log_file {
                Some(path) => path,
                None => default_log_path(),
            };
            let _guard = init_file_logging(&log_path)?;
            tracing::info!(configured = client.is_configured(), "starting chat");

            run_tui(App::new(client, config.title())).await
        }
    }
}

/// Command-line values (and the environment, through clap) win over the file.
fn resolve_config(cli: &Cli, file: Config) -> Config {
    Config {
        webhook_url: cli.webhook_url.clone().or(file.webhook_url),
        reply_delay_ms: cli.reply_delay_ms.or(file.reply_delay_ms),
        title: cli.title.clone().or(file.title),
    }
}

async fn ask(client: &WebhookClient, message: String) -> Result<()> {
    let mut session = ChatSession::new();
    session.set_draft(message);

    match session.send(client).await {
        Some(reply) => {
            println!("{}", reply.text);
            Ok(())
        }
        None => bail!("nothing to send: the message is empty"),
    }
}

async fn run_tui(mut app: App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(tui::TICK_RATE);

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);
        app.poll_reply().await;
    }
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// The terminal owns stderr in interactive mode, so logs go to a file.
fn init_file_logging(path: &Path) -> Result<WorkerGuard> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log path {} has no file name", path.display()))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("salesbot")
        .join("salesbot.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file_config() {
        let cli = Cli::parse_from([
            "salesbot",
            "--webhook-url",
            "http://localhost:5678/webhook/cli",
            "--reply-delay-ms",
            "0",
        ]);
        let file = Config {
            webhook_url: Some("http://localhost:5678/webhook/file".to_string()),
            reply_delay_ms: Some(900),
            title: Some("Support Bot".to_string()),
        };

        let config = resolve_config(&cli, file);
        assert_eq!(config.webhook_url.as_deref(), Some("http://localhost:5678/webhook/cli"));
        assert_eq!(config.reply_delay_ms, Some(0));
        assert_eq!(config.title(), "Support Bot");
    }

    #[test]
    fn test_ask_subcommand_parses() {
        let cli = Cli::parse_from(["salesbot", "--title", "Shop", "ask", "price?"]);
        assert!(matches!(cli.command, Some(Commands::Ask { ref message }) if message == "price?"));
        assert_eq!(cli.title.as_deref(), Some("Shop"));
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_message() {
        let client = WebhookClient::new(None);
        assert!(ask(&client, "  ".to_string()).await.is_err());
        assert!(ask(&client, "hi".to_string()).await.is_ok());
    }
}
