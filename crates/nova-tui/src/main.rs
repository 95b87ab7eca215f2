use std::sync::Arc;
use anyhow::Result;
use nova_core::{
    get_or_create_conversation_id, logging, ChannelSink, Config, Controller, DisplayUpdate,
    FileStore, MemoryStore, NovaClient, SessionContext,
};
use tokio::sync::mpsc::UnboundedReceiver;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

fn resolve_session() -> SessionContext {
    match FileStore::default_location() {
        Ok(store) => get_or_create_conversation_id(&store),
        Err(e) => {
            tracing::warn!("No location for session storage: {:#}", e);
            let mut session = get_or_create_conversation_id(&MemoryStore::new());
            session.ephemeral = true;
            session
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };

    // Logging is best effort; the TUI owns stderr, so a failure only shows in the header
    let logging_enabled = logging::default_log_path()
        .and_then(|path| logging::init(&path, config.log_level()))
        .is_ok();
    if let Some(e) = config_error {
        tracing::warn!("Ignoring unreadable config, using defaults: {:#}", e);
    }

    let session = resolve_session();
    tracing::info!(
        base_url = config.base_url(),
        thread_id = session.thread_id(),
        ephemeral = session.ephemeral,
        "Starting Nova"
    );

    let (sink, display_rx) = ChannelSink::new();
    let controller = Controller::new(
        Arc::new(NovaClient::new(config.base_url())),
        Arc::new(sink),
        session,
        config.render_options(),
    );

    let startup = controller.clone();
    tokio::spawn(async move {
        startup.startup().await;
    });

    let mut app = App::new(controller, config.base_url().to_string());
    app.logging_enabled = logging_enabled;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, app, display_rx).await;
    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!("TUI exited with error: {:#}", e);
    }
    result
}

async fn run(
    terminal: &mut Tui,
    mut app: App,
    mut display_rx: UnboundedReceiver<DisplayUpdate>,
) -> Result<()> {
    let mut events = EventHandler::new();

    loop {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(&mut app, event),
            Some(update) = display_rx.recv() => {
                app.apply_update(update);
                // Apply whatever else is queued before redrawing
                while let Ok(update) = display_rx.try_recv() {
                    app.apply_update(update);
                }
            }
            else => break,
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
