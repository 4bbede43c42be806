use anyhow::{Context, Result};
use log::info;

mod app;
mod chat;
mod clipboard;
mod config;
mod gemini;
mod handler;
mod logging;
mod preset;
mod reveal;
mod tui;
mod ui;

use app::App;
use clipboard::SystemClipboard;
use config::{Config, API_KEY_ENV};
use gemini::GeminiClient;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init() {
        eprintln!("Logging disabled: {}", e);
    }

    let config_path = Config::get_config_path().ok();
    let config = match &config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::new(),
    };

    let api_key = config.resolve_api_key(std::env::var(API_KEY_ENV).ok())?;
    let endpoint = config.endpoint();
    info!("starting with model {} ({})", endpoint.model, endpoint.version.as_str());
    let client = GeminiClient::new(endpoint, &api_key, config.timeout())
        .context("Failed to build HTTP client")?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &config, client, config_path).await;

    tui::restore()?;
    info!("exiting");
    result
}

async fn run(
    terminal: &mut Tui,
    config: &Config,
    client: GeminiClient,
    config_path: Option<std::path::PathBuf>,
) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(
        config,
        client,
        Box::new(SystemClipboard::new()),
        events.sender(),
        config_path,
    );

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(&mut app, event);
        app.sync_tasks();
    }

    Ok(())
}
