use h2server::{Server, ServerConfig};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let (cert, key) = match (args.next(), args.next()) {
        (Some(cert), Some(key)) => (cert, key),
        _ => {
            eprintln!("usage: h2server <cert.pem> <key.pem> [address]");
            return ExitCode::from(2);
        }
    };

    let mut config = ServerConfig::new(cert, key);
    if let Some(address) = args.next() {
        config = config.with_address(address);
    }

    match Server::new(config).listen_and_serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}
