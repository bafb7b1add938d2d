use gembridge_core::config::Config;
use gembridge_core::proxy::ProxyServer;

pub async fn run(mut config: Config, port_override: Option<u16>) -> anyhow::Result<()> {
    // Apply port override if provided
    if let Some(port) = port_override {
        config.server.port = port;
    }

    tracing::info!("Starting gembridge...");
    tracing::info!("  Port: {}", config.server.port);
    tracing::info!("  Host: {}", config.server.bind_host());
    tracing::info!("  Upstream: {}", config.upstream.base_urls.join(", "));
    if config.upstream.resolve_api_key().is_none() {
        tracing::warn!(
            "No API key configured (upstream.api_key or ${}); requests go out unauthenticated.",
            config.upstream.api_key_env
        );
    }
    if let Some(secs) = config.rate_limit.interval_seconds {
        tracing::info!("  Rate limit: 1 request / {}s (wait: {})", secs, config.rate_limit.wait);
    }

    // Create and start server
    let server = ProxyServer::new(&config)?;

    tracing::info!("Proxy server starting on http://{}:{}", config.server.bind_host(), config.server.port);
    tracing::info!("Press Ctrl+C to stop");

    // Run server (blocks until shutdown)
    server.run().await?;

    Ok(())
}
