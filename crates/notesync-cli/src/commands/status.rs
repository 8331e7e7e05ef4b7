//! Status command handler

use anyhow::Result;

use notesync_core::{Config, OriginTag, WsGateway};

use crate::output::{Output, OutputFormat};

/// Show this client's identity and whether the server is reachable
pub async fn show(config: &Config, output: &Output) -> Result<()> {
    let origin_tag = OriginTag::process();
    let reachable = match config.server_url.as_deref() {
        Some(url) => Some(
            WsGateway::connect(url, config.request_timeout())
                .await
                .map_err(|e| e.to_string()),
        ),
        None => None,
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "origin_tag": origin_tag,
                    "server_url": config.server_url,
                    "connected": matches!(reachable, Some(Ok(_))),
                    "error": reachable.as_ref().and_then(|r| r.as_ref().err()),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", origin_tag);
        }
        OutputFormat::Human => {
            println!("notesync Status");
            println!("===============");
            println!();
            println!("Client:");
            println!("  Origin tag: {}", origin_tag);
            println!();
            println!("Server:");
            match (&config.server_url, &reachable) {
                (Some(url), Some(Ok(_))) => {
                    println!("  URL:    {}", url);
                    println!("  Status: connected");
                }
                (Some(url), Some(Err(e))) => {
                    println!("  URL:    {}", url);
                    println!("  Status: unreachable ({})", e);
                }
                _ => {
                    println!("  Not configured. Set one with:");
                    println!("    notesync config set server_url ws://your-server:3030");
                }
            }
        }
    }

    Ok(())
}
