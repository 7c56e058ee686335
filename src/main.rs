use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod export;
mod format;
mod inputter;
mod loader;
mod model;
mod table;
mod ui;

use controller::Controller;
use domain::{DbvConfig, DbvError};
use loader::GenericWdbcSource;
use model::{Model, Status};
use ui::TableUI;

/// Viewer for DBC/WDB/DB2 client database caches.
#[derive(Parser, Debug)]
#[command(name = "dbv", version)]
struct Args {
    /// Format build number; -1 lets the source decide
    #[arg(short = 'b', long, default_value_t = 0)]
    build: i64,

    /// Treat FILES as logical cache identifiers looked up from the
    /// environment instead of filesystem paths
    #[arg(long)]
    get: bool,

    /// Cache files to open, one tab each
    #[arg(required = true)]
    files: Vec<String>,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

// Logs go to a file; the terminal belongs to the TUI.
fn init_tracing() -> Result<(), DbvError> {
    let Ok(path) = std::env::var("DBV_LOG") else {
        return Ok(());
    };
    let logfile = std::fs::File::create(&path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(logfile)
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    info!("Logging to {path}");
    Ok(())
}

fn run() -> Result<(), DbvError> {
    let args = Args::parse();
    init_tracing()?;

    let cfg = DbvConfig {
        event_poll_time: 100,
        default_build: args.build,
    };

    let mut model = Model::init(&cfg, Box::new(GenericWdbcSource::new()));
    for name in &args.files {
        if args.get {
            model.open_env(name);
        } else {
            let expanded = shellexpand::full(name)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| name.clone());
            model.open_path(Path::new(&expanded));
        }
    }

    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }

    Ok(())
}
