use crate::utils;
use colored::Colorize;
use serde_json::{Value, json};
use vpsdeck_cloud::{InstanceAction, ProviderHub};

pub async fn handle(
    hub: &ProviderHub,
    provider_id: &str,
    instance_id: &str,
    action: &str,
    params: Option<&str>,
    yes: bool,
    json: bool,
) -> anyhow::Result<()> {
    let params: Option<Value> = params
        .map(|p| serde_json::from_str::<Value>(p))
        .transpose()
        .map_err(|e| anyhow::anyhow!("--params must be a JSON object: {}", e))?;
    if params.as_ref().is_some_and(|p| !p.is_object()) {
        anyhow::bail!("--params must be a JSON object");
    }

    if InstanceAction::parse(action).is_some_and(|a| a.is_destructive()) && !yes {
        anyhow::bail!(
            "Refusing to {} instance {} without --yes",
            action.trim(),
            instance_id
        );
    }

    let service = hub.service(provider_id).await?;
    service
        .perform_action_named(instance_id, action, params.as_ref())
        .await?;

    if json {
        return utils::print_json(&json!({
            "provider": provider_id,
            "instance": instance_id,
            "action": action.trim().to_ascii_lowercase(),
            "accepted": true,
        }));
    }

    println!(
        "{} {} accepted for instance {}",
        "✓".green(),
        action.trim().to_ascii_lowercase().bold(),
        instance_id.cyan()
    );
    println!(
        "{}",
        "The provider applies the change asynchronously; check `instance` for progress.".dimmed()
    );
    Ok(())
}
