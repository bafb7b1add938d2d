use gembridge_core::config::LoadedConfig;

pub async fn run(loaded: &LoadedConfig) -> anyhow::Result<()> {
    let config = &loaded.config;

    println!("gembridge Status");
    println!("================");
    println!();
    println!("Configuration:");
    match &loaded.source {
        Some(path) => println!("  Config file: {:?}", path),
        None => println!("  Config file: none (built-in defaults)"),
    }
    println!("  Logging: {}", config.logging.filter_directives());
    println!();
    println!("Server settings:");
    println!("  Host: {}", config.server.bind_host());
    println!("  Port: {}", config.server.port);
    println!();
    println!("Upstream:");
    for (i, url) in config.upstream.base_urls.iter().enumerate() {
        println!("  {}. {}", i + 1, url);
    }
    println!(
        "  API key: {}",
        if config.upstream.resolve_api_key().is_some() { "set" } else { "missing" }
    );
    println!("  Custom model mappings: {}", config.model_mapping.custom.len());

    // Check if server is reachable
    println!();
    let host = if config.server.bind_host() == "0.0.0.0" { "127.0.0.1" } else { config.server.bind_host() };
    let url = format!("http://{}:{}/healthz", host, config.server.port);
    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            println!("Server: RUNNING ✓");
        }
        _ => {
            println!("Server: NOT RUNNING");
        }
    }

    Ok(())
}
