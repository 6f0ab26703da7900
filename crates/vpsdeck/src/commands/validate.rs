use crate::utils;
use colored::Colorize;
use serde_json::json;
use vpsdeck_cloud::ProviderHub;

pub async fn handle(hub: &ProviderHub, provider_id: &str, json: bool) -> anyhow::Result<()> {
    let service = hub.service(provider_id).await?;
    let valid = service.validate_credentials().await;

    if json {
        utils::print_json(&json!({
            "provider": provider_id,
            "type": service.provider_type(),
            "valid": valid,
        }))?;
    } else if valid {
        println!(
            "{} Credentials for {} are valid",
            "✓".green().bold(),
            provider_id.cyan()
        );
    } else {
        println!(
            "{} Credentials for {} are invalid",
            "✗".red().bold(),
            provider_id.cyan()
        );
    }

    if !valid {
        anyhow::bail!("Credential check failed for {}", provider_id);
    }
    Ok(())
}
