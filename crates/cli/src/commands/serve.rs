//! `papertrail serve`: start the HTTP API server.

use super::load_config;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("📚 Papertrail API");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.active_model());
    println!("   Store:     {}", config.store.backend);

    papertrail_gateway::start(config).await?;

    Ok(())
}
