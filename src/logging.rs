//! Tracing subscriber setup for the CLI.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (e.g. `"info"` or
/// `"warn,chunkscope=debug"`) is used. Calling this twice is harmless: the
/// second call leaves the first subscriber in place.
pub fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("debug");
        init_tracing("not a valid [directive");
        tracing::debug!("still logging");
    }
}
