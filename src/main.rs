//! ZenCorp - HTTP Server Entry Point

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zencorp::{api, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zencorp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: store={:?}, data_dir={}, dev_mode={}",
        config.store_type,
        config.data_dir.display(),
        config.dev_mode
    );
    if config.dev_mode {
        info!("Dev mode: authentication is disabled");
    }

    api::serve(config).await
}
