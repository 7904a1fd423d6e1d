mod aggregate;
mod classify;
mod config;
mod courier;
mod error;
mod extractors;
mod report;
mod sheet;
mod shipment;
mod util;
mod web;

use chrono::Local;
use clap::{Parser, Subcommand};
use config::{load as config_load, validate as config_validate};
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Track FedEx shipments from a spreadsheet and build a colour-coded status report."
)]
struct Cli {
    /// Configuration file; environment variables prefixed TRACKREPORT_ override it.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track every shipment in a workbook and write the report.
    Report {
        /// Input workbook (.xlsx or .xls).
        #[arg(long)]
        input: PathBuf,

        /// Directory for the generated report.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Serve the upload API.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match config_load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            std::process::exit(1);
        }
    };

    match &cli.command {
        Command::Report { output_dir, .. } => {
            if let Some(dir) = output_dir {
                config.report.output_dir = dir.to_string_lossy().into_owned();
            }
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                config.web.port = *port;
            }
        }
    }

    if let Err(err) = config_validate(&config) {
        eprintln!("Configuration error: {err}");
        std::process::exit(1);
    }

    info!(
        fedex_config = ?config.fedex.sanitized_for_log(),
        output_dir = %config.report.output_dir,
        "Effective configuration loaded"
    );

    let courier: Arc<dyn courier::CourierClient> =
        Arc::new(courier::fedex::FedexClient::new(&config.fedex));

    match cli.command {
        Command::Report { input, .. } => {
            if let Err(err) = sheet::read::check_extension(&input.to_string_lossy()) {
                error!(error = %err, "Rejected input file");
                std::process::exit(1);
            }

            let now = Local::now().naive_local();
            match report::generate_from_workbook(courier.as_ref(), &input, &config, now) {
                Ok(path) => println!("{}", path.display()),
                Err(err) => {
                    error!(error = %err, "Report generation failed");
                    std::process::exit(1);
                }
            }
        }
        Command::Serve { .. } => {
            let running = Arc::new(AtomicBool::new(true));
            let running_signal = Arc::clone(&running);

            if let Err(err) = ctrlc::set_handler(move || {
                info!("Ctrl-C received, shutting down gracefully");
                running_signal.store(false, Ordering::SeqCst);
            }) {
                error!(error = %err, "Failed to install Ctrl-C handler");
                std::process::exit(1);
            }

            info!(port = config.web.port, "trackreport starting");

            if let Err(err) = web::start(config, courier, running) {
                error!(error = %format!("{err:#}"), "Web server stopped with an error");
                std::process::exit(1);
            }

            info!("trackreport stopped");
        }
    }
}
