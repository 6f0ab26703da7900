use crate::utils;
use colored::Colorize;
use serde_json::json;
use vpsdeck_cloud::{ProviderHub, ProviderService, ResourceKind};

pub async fn handle(hub: &ProviderHub, warm: bool, json: bool) -> anyhow::Result<()> {
    if warm {
        warm_all(hub, json).await?;
    }

    let cache = hub.factory().cache();
    let stats = cache.stats();

    if json {
        let rows: Vec<_> = ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let settings = cache.settings(kind);
                let entry = stats.get(&kind);
                json!({
                    "kind": kind,
                    "ttlSecs": settings.ttl.as_secs(),
                    "enabled": settings.enabled,
                    "count": entry.map(|s| s.count).unwrap_or(0),
                    "providers": entry.map(|s| s.provider_ids.clone()).unwrap_or_default(),
                })
            })
            .collect();
        return utils::print_json(&rows);
    }

    utils::print_table_header(&format!(
        "{:<14} {:<8} {:<9} {:>8}  {}",
        "KIND", "TTL", "ENABLED", "ENTRIES", "PROVIDERS"
    ));
    for kind in ResourceKind::ALL {
        let settings = cache.settings(kind);
        let (count, providers) = stats
            .get(&kind)
            .map(|s| (s.count, s.provider_ids.join(", ")))
            .unwrap_or((0, String::new()));
        let enabled = format!("{:<9}", if settings.enabled { "yes" } else { "no" });
        println!(
            "{} {:<8} {} {:>8}  {}",
            format!("{:<14}", kind.as_str()).cyan(),
            utils::format_ttl(settings.ttl),
            if settings.enabled { enabled.green() } else { enabled.dimmed() },
            count,
            providers.dimmed()
        );
    }
    Ok(())
}

/// Fill the cache from every active provider. Failures are reported and
/// skipped so one broken account does not hide the others.
async fn warm_all(hub: &ProviderHub, quiet: bool) -> anyhow::Result<()> {
    let records = hub.directory().list().await?;
    for record in records.iter().filter(|r| r.active) {
        let service = match hub.service(&record.id).await {
            Ok(service) => service,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", record.id, e);
                continue;
            }
        };
        if !quiet {
            println!("Warming {}...", record.id.cyan());
        }
        for kind in ResourceKind::ALL {
            if let Err(e) = fetch(service.as_ref(), kind).await {
                tracing::warn!("Failed to fetch {} for {}: {}", kind, record.id, e);
                if !quiet {
                    println!("  {} {}: {}", "✗".red(), kind, e.message);
                }
            }
        }
    }
    if !quiet {
        println!();
    }
    Ok(())
}

async fn fetch(service: &dyn ProviderService, kind: ResourceKind) -> vpsdeck_cloud::Result<usize> {
    let count = match kind {
        ResourceKind::Plans => service.get_plans().await?.len(),
        ResourceKind::Images => service.get_images().await?.len(),
        ResourceKind::Regions => service.get_regions().await?.len(),
        ResourceKind::Marketplace => service.get_marketplace_apps().await?.len(),
    };
    Ok(count)
}
