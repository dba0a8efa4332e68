//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use cadence_core::AppConfig;
use cadence_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(
    config: &AppConfig,
    host: &str,
    port: u16,
    no_auth: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Cadence web server...");
    println!("   Database: {}", config.db_path);
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if config.api_keys.is_empty() {
        println!();
        println!("   ❌ No API keys configured. Set CADENCE_API_KEYS or server.api_keys,");
        println!("      or pass --no-auth for local use.");
    } else {
        println!(
            "   🔑 API keys: {} configured",
            config.api_keys.len()
        );
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 CORS origins: {}",
            config.allowed_origins.join(", ")
        );
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(config)?;

    let server_config = ServerConfig {
        require_auth: !no_auth,
        ..ServerConfig::from_app_config(config)
    };

    let static_dir_str = static_dir
        .map(|p| {
            p.to_str()
                .with_context(|| format!("Static dir is not valid UTF-8: {}", p.display()))
        })
        .transpose()?;
    cadence_server::serve_with_config(db, host, port, static_dir_str, server_config).await?;

    Ok(())
}
