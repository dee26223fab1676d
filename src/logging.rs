use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,telegram_extractor_backend=info,grammers=warn")
    });

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
