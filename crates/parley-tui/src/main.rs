use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use parley_core::Config;
use tokio::sync::mpsc;

mod app;
mod button;
mod handler;
mod logging;
mod tui;
mod ui;

use app::{App, Options};
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Chat with Gemini in the terminal", version)]
struct Cli {
    /// Gemini model to use (overrides the config file)
    #[arg(short, long)]
    model: Option<String>,

    /// Milliseconds between revealed characters
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Start with an empty transcript instead of the typed greeting
    #[arg(long)]
    no_greeting: bool,

    /// Config file to read and save to
    #[arg(long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Write logs here instead of the default data directory
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file.clone() {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    let _log_guard = logging::init(&log_path)?;

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(ms) = cli.interval_ms {
        config.typing_interval_ms = ms;
    }
    tracing::info!(model = %config.model, interval_ms = config.typing_interval_ms, "starting parley");

    let options = Options {
        greet: !cli.no_greeting,
        config_path: cli.config,
    };

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, config, options).await;

    tui::restore()?;
    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, config: Config, options: Options) -> Result<()> {
    let (chat_tx, chat_rx) = mpsc::unbounded_channel();
    let mut events = EventHandler::new(chat_rx);
    let mut app = App::new(config, options, chat_tx);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event)?,
            None => break,
        }
    }

    Ok(())
}
