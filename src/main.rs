mod actions;
mod app;
mod catalog;
mod config;
mod engine;
mod error;
mod input;
mod logging;
mod notice;
mod player;
mod theme;
mod ui;

use std::{
    io::{self, stdout},
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::info;

use crate::app::App;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::engine::mpv::MpvEngine;
use crate::player::Player;

// ── Constants ──────────────────────────────────────────────────────

const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "tilawa", version, about = "Listen to Quran recitations in the terminal")]
struct Args {
    /// Config file
    #[arg(long, env = "TILAWA_CONFIG")]
    config: Option<PathBuf>,

    /// Recitation id to start playing
    #[arg(long)]
    play: Option<String>,

    /// Log file
    #[arg(long, env = "TILAWA_LOG")]
    log_file: Option<PathBuf>,
}

// ── Main ───────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(config::default_config_path);
    let config = Config::load(&config_path)?;
    let log_path = args.log_file.unwrap_or_else(config::default_log_path);
    let _log_guard = logging::init(&log_path, &config.log_level)?;

    let catalog = match &config.catalog_file {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    };
    info!(recitations = catalog.len(), config = %config_path.display(), "starting");

    let (engine_tx, engine_rx) = mpsc::unbounded_channel();
    let engine = MpvEngine::new(config.mpv_path.clone(), engine_tx);
    let player = Player::new(catalog, Box::new(engine), config.volume, config.repeat);
    let mut app = App::new(player, config, config_path, engine_rx);
    if let Some(id) = &args.play {
        app.open(id);
    }

    // Panic hook: restore terminal on crash so it doesn't stay in raw mode
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        );
        default_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("exiting");
    result.context("terminal UI failed")
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        app.drain();
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    input::handle_key(app, key);
                    if app.should_quit {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => input::handle_mouse(app, mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
        }
    }
}
