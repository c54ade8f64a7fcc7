use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use diffdrive_teleop::input::CrlfWriter;
use diffdrive_teleop::runtime::{self, Backend};

/// Keyboard teleop for a two-motor differential drive
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Motor board backend
    #[arg(short, long, value_enum, default_value_t = Backend::Simulated)]
    backend: Backend,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Setup logging (set RUST_LOG=debug to see every command change)
    // Logs go to stderr; stdout belongs to the raw-mode terminal
    tracing_subscriber::fmt()
        .with_writer(|| CrlfWriter::new(std::io::stderr()))
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .init();

    let args = Args::parse();

    if let Err(e) = runtime::run(args.backend).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
