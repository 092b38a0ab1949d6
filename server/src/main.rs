use clap::Parser;
use log::info;
use server::config::{CliArgs, ServerConfig};
use server::network::{BoxError, Server};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = CliArgs::parse();
    let config = ServerConfig::load(&args)?;

    info!(
        "Starting server on {} ({}x{} grid, cell size {}, tick {:?})",
        config.bind_address(),
        config.grid_width,
        config.grid_height,
        config.cell_size,
        config.tick_interval
    );
    if let Some(seed) = config.seed {
        info!("Using fixed seed {}", seed);
    }

    let mut server = Server::new(&config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
