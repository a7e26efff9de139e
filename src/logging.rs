use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info";

/// Installs the native tracing subscriber. `filter` uses `RUST_LOG` syntax
/// and falls back to the `RUST_LOG` environment variable, then to `info`.
/// Returns false when a global subscriber was already installed.
pub fn init(filter: Option<&str>) -> bool {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_installs_once() {
        init(Some("psxcore=trace"));
        assert!(!init(None));
    }
}
