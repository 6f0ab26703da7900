use crate::utils;
use colored::Colorize;
use serde_json::json;
use std::path::Path;
use vpsdeck_cloud::ProviderHub;

pub async fn handle(hub: &ProviderHub, config_path: &Path, json: bool) -> anyhow::Result<()> {
    let records = hub.directory().list().await?;

    if json {
        let rows: Vec<_> = records
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "type": r.provider_type,
                    "label": r.label,
                    "active": r.active,
                    "hasCredential": !r.credential.trim().is_empty(),
                    "implemented": r.provider_type.is_implemented(),
                })
            })
            .collect();
        return utils::print_json(&rows);
    }

    println!("Settings: {}", config_path.display().to_string().cyan());
    println!();
    if records.is_empty() {
        println!("{}", "No providers configured".dimmed());
        return Ok(());
    }

    utils::print_table_header(&format!(
        "{:<20} {:<14} {:<24} {:<8} {:<10}",
        "ID", "TYPE", "LABEL", "ACTIVE", "TOKEN"
    ));
    for record in &records {
        let active = format!("{:<8}", if record.active { "yes" } else { "no" });
        let token = if record.credential.trim().is_empty() {
            "missing".yellow()
        } else {
            "set".green()
        };
        println!(
            "{} {:<14} {:<24} {} {}",
            format!("{:<20}", record.id).cyan(),
            record.provider_type.display_name(),
            utils::truncate(record.display_label(), 24),
            if record.active { active.green() } else { active.dimmed() },
            token
        );
    }
    Ok(())
}
