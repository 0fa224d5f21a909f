use std::sync::Arc;

use skycast::{Orchestrator, SkycastConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("SKYCAST_CONFIG").ok();
    let config = SkycastConfig::load(config_path.as_deref())?;

    let query: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let orchestrator = Arc::new(Orchestrator::new(&config)?);
    for line in orchestrator
        .handle_lines(&query, &config.preferences)
        .await
    {
        println!("{line}");
    }

    Ok(())
}
