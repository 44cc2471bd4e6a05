/// Install the process-wide tracing subscriber. Called once by the embedding
/// host before constructing a client; safe to call again (later calls are
/// no-ops).
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidechat_core=debug,info".into()),
        )
        .try_init();
}
