//! # Departure Board Entry Point
//!
//! Wires configuration, logging, the feed client and a host surface into a
//! [`CycleScheduler`] and runs it until Ctrl-C or any terminal input.
//! `--stdout` runs a single refresh and prints an ASCII snapshot instead.

use anyhow::Context;
use clap::Parser;
use departure_board_lib::blink::BlinkAnimator;
use departure_board_lib::config::{Config, DEFAULT_CONFIG_PATH};
use departure_board_lib::feed::FeedClient;
use departure_board_lib::grid::{DisplayGrid, GridGeometry};
use departure_board_lib::layout::Layout;
use departure_board_lib::panel::{SidePanel, TextPanel};
use departure_board_lib::renderer::draw_ascii;
use departure_board_lib::scheduler::CycleScheduler;
use departure_board_lib::surface::{MemorySurface, Surface};
use departure_board_lib::terminal::{spawn_input_listener, TerminalSurface};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run one refresh and print the board as plain text
    #[arg(long)]
    stdout: bool,

    /// Log destination while the terminal is in use
    #[arg(long, default_value_os_t = default_log_file())]
    log_file: PathBuf,

    /// Log filter directives
    #[arg(long, env = "DEPARTURE_BOARD_LOG", default_value = "info")]
    log_filter: String,
}

fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("departure-board.log")
}

/// Logs go to stderr in stdout mode and to a file otherwise, since the
/// board owns the terminal.
fn init_logging(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&args.log_filter)
        .with_context(|| format!("invalid log filter {:?}", args.log_filter))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if args.stdout {
        builder.with_writer(std::io::stderr).init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)
            .with_context(|| format!("cannot open log file {}", args.log_file.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }
    Ok(())
}

/// Cancel on SIGINT / Ctrl-C
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for interrupt"),
        }
    });
}

fn build_scheduler<D: Surface>(
    config: &Config,
    client: FeedClient,
    surface: D,
    capacity: usize,
    panel: Option<TextPanel>,
    cancel: CancellationToken,
) -> CycleScheduler<FeedClient, D> {
    let grid = DisplayGrid::new(capacity, config.display.row_pacing());
    let blink = BlinkAnimator::new(config.display.blink, config.display.flash_half_cycle());
    let scheduler = CycleScheduler::new(
        client,
        surface,
        grid,
        blink,
        config.feed.refresh_interval,
        cancel,
    )
    .with_title(config.display.title.clone());

    match panel {
        Some(panel) => scheduler.with_panel(Box::new(panel) as Box<dyn SidePanel>),
        None => scheduler,
    }
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = Config::load_from_path(&args.config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        url = %config.feed.url,
        interval = config.feed.refresh_interval,
        "starting departure board"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let client = FeedClient::new(config.feed.url.clone(), config.feed.timeout())
            .context("cannot build HTTP client")?;
        let panel = TextPanel::from_lines(&config.panel.lines);
        let cancel = CancellationToken::new();
        spawn_signal_handler(cancel.clone());

        // Development mode: one refresh rendered as ASCII
        if args.stdout {
            let rows = config.display.max_rows.max(1);
            let layout = Layout::compact(rows, panel.is_some());
            let scheduler = build_scheduler(
                &config,
                client,
                MemorySurface::new(),
                rows,
                panel,
                cancel,
            );
            let surface = scheduler.run_once().await;
            println!("{}", draw_ascii(&surface, &layout));
            return anyhow::Ok(());
        }

        let geometry = GridGeometry::terminal(config.display.max_rows);
        let surface = TerminalSurface::open(geometry, panel.is_some())
            .context("cannot take over the terminal")?;
        let capacity = surface.capacity();
        let listener = spawn_input_listener(cancel.clone());

        let scheduler = build_scheduler(&config, client, surface, capacity, panel, cancel.clone());
        drop(scheduler.run().await);

        cancel.cancel();
        let _ = listener.await;
        anyhow::Ok(())
    })
}
