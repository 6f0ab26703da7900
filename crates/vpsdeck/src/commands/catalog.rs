use crate::utils;
use colored::Colorize;
use vpsdeck_cloud::{
    MarketplaceApp, ProviderHub, ProviderImage, ProviderPlan, ProviderRegion, ResourceKind,
};

pub async fn handle(
    hub: &ProviderHub,
    provider_id: &str,
    kind: ResourceKind,
    refresh: bool,
    json: bool,
) -> anyhow::Result<()> {
    let service = hub.service(provider_id).await?;
    if refresh {
        tracing::debug!("Dropping cached {} for {}", kind, provider_id);
        hub.refresh(provider_id, Some(kind));
    }

    match kind {
        ResourceKind::Plans => {
            let plans = service.get_plans().await?;
            if json {
                return utils::print_json(&plans);
            }
            print_plans(&plans);
        }
        ResourceKind::Images => {
            let images = service.get_images().await?;
            if json {
                return utils::print_json(&images);
            }
            print_images(&images);
        }
        ResourceKind::Regions => {
            let regions = service.get_regions().await?;
            if json {
                return utils::print_json(&regions);
            }
            print_regions(&regions);
        }
        ResourceKind::Marketplace => {
            let apps = service.get_marketplace_apps().await?;
            if json {
                return utils::print_json(&apps);
            }
            print_apps(&apps);
        }
    }
    Ok(())
}

fn print_plans(plans: &[ProviderPlan]) {
    if plans.is_empty() {
        println!("{}", "No plans available".dimmed());
        return;
    }
    utils::print_table_header(&format!(
        "{:<24} {:>5} {:>9} {:>8} {:>10} {:>10} {:>9}",
        "ID", "VCPU", "MEMORY", "DISK", "TRANSFER", "$/MONTH", "$/HOUR"
    ));
    for plan in plans {
        println!(
            "{} {:>5} {:>9} {:>8} {:>10} {:>10.2} {:>9.4}",
            format!("{:<24}", utils::truncate(&plan.id, 24)).cyan(),
            plan.vcpus,
            format!("{} MB", plan.memory_mb),
            format!("{} GB", plan.disk_gb),
            format!("{} GB", plan.transfer_gb),
            plan.price_monthly,
            plan.price_hourly
        );
    }
}

fn print_images(images: &[ProviderImage]) {
    if images.is_empty() {
        println!("{}", "No images available".dimmed());
        return;
    }
    utils::print_table_header(&format!(
        "{:<32} {:<36} {:<14} {:>8}",
        "ID", "LABEL", "DISTRIBUTION", "MIN DISK"
    ));
    for image in images {
        let min_disk = image
            .min_disk_gb
            .map(|gb| format!("{} GB", gb))
            .unwrap_or_else(|| "-".to_string());
        let label = format!("{:<36}", utils::truncate(&image.label, 36));
        println!(
            "{} {} {:<14} {:>8}",
            format!("{:<32}", utils::truncate(&image.id, 32)).cyan(),
            if image.deprecated { label.dimmed() } else { label.normal() },
            image.distribution.as_deref().unwrap_or("-"),
            min_disk
        );
    }
}

fn print_regions(regions: &[ProviderRegion]) {
    if regions.is_empty() {
        println!("{}", "No regions available".dimmed());
        return;
    }
    utils::print_table_header(&format!(
        "{:<16} {:<28} {:<8} {:<10}",
        "ID", "LABEL", "COUNTRY", "STATUS"
    ));
    for region in regions {
        let status = if region.available {
            "available".green()
        } else {
            "offline".red()
        };
        println!(
            "{} {:<28} {:<8} {}",
            format!("{:<16}", region.id).cyan(),
            utils::truncate(&region.label, 28),
            region.country.as_deref().unwrap_or("-"),
            status
        );
    }
}

fn print_apps(apps: &[MarketplaceApp]) {
    if apps.is_empty() {
        println!("{}", "No marketplace apps available".dimmed());
        return;
    }
    utils::print_table_header(&format!("{:<28} {:<32} {}", "ID", "LABEL", "DESCRIPTION"));
    for app in apps {
        println!(
            "{} {:<32} {}",
            format!("{:<28}", utils::truncate(&app.id, 28)).cyan(),
            utils::truncate(&app.label, 32),
            utils::truncate(app.description.as_deref().unwrap_or(""), 60).dimmed()
        );
    }
}
