//! Logging setup for the server binary.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events the default filter lets through.
const CRATES: [&str; 5] = [
    "gambit",
    "gambit_transport",
    "gambit_protocol",
    "gambit_session",
    "gambit_room",
];

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the filter when set. Otherwise every Gambit crate
/// logs at `default_level` and everything else at `warn`.
///
/// ```no_run
/// gambit::logger::setup_logger("debug");
/// ```
pub fn setup_logger(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES
            .iter()
            .map(|krate| format!("{krate}={default_level}"))
            .collect();
        format!("warn,{}", directives.join(",")).into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
