//! Gambit server binary.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gambit
//! cargo run --bin gambit -- --host 127.0.0.1 --port 3000 --log-level debug
//! PORT=9000 cargo run --bin gambit
//! ```

use clap::Parser;
use gambit::{GambitServer, logger::setup_logger};

#[derive(Parser, Debug)]
#[command(name = "gambit")]
#[command(about = "Room and session relay server for live chess games", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger(&args.log_level);

    let addr = format!("{}:{}", args.host, args.port);
    let server = match GambitServer::builder().bind(&addr).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
