use crate::utils;
use colored::Colorize;
use vpsdeck_cloud::{ProviderHub, ProviderInstance};

pub async fn handle_list(hub: &ProviderHub, provider_id: &str, json: bool) -> anyhow::Result<()> {
    let service = hub.service(provider_id).await?;
    let instances = service.list_instances().await?;

    if json {
        return utils::print_json(&instances);
    }

    if instances.is_empty() {
        println!("{}", "No instances".dimmed());
        return Ok(());
    }

    utils::print_table_header(&format!(
        "{:<12} {:<24} {:<13} {:<12} {:<16} {:<18}",
        "ID", "LABEL", "STATUS", "REGION", "IPV4", "SPECS"
    ));
    for instance in &instances {
        let specs = format!(
            "{}vCPU/{}MB/{}GB",
            instance.specs.vcpus, instance.specs.memory_mb, instance.specs.disk_gb
        );
        println!(
            "{} {:<24} {} {:<12} {:<16} {}",
            format!("{:<12}", instance.id).cyan(),
            utils::truncate(&instance.label, 24),
            pad_status(instance),
            instance.region,
            instance.ipv4.first().map(String::as_str).unwrap_or("-"),
            specs.dimmed()
        );
    }
    println!();
    println!("{} instance(s)", instances.len());
    Ok(())
}

pub async fn handle_show(
    hub: &ProviderHub,
    provider_id: &str,
    instance_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let service = hub.service(provider_id).await?;
    let instance = service.get_instance(instance_id).await?;

    if json {
        return utils::print_json(&instance);
    }

    println!("{} {}", instance.label.bold(), format!("({})", instance.id).dimmed());
    println!("  status:   {}", utils::colored_status(instance.status));
    println!("  region:   {}", instance.region);
    println!("  image:    {}", instance.image.as_deref().unwrap_or("-"));
    println!(
        "  specs:    {} vCPU, {} MB memory, {} GB disk, {} GB transfer",
        instance.specs.vcpus,
        instance.specs.memory_mb,
        instance.specs.disk_gb,
        instance.specs.transfer_gb
    );
    if instance.ipv4.is_empty() {
        println!("  ipv4:     -");
    } else {
        println!("  ipv4:     {}", instance.ipv4.join(", ").cyan());
    }
    println!("  ipv6:     {}", instance.ipv6.as_deref().unwrap_or("-"));
    if let Some(tags) = instance.tags.as_ref().filter(|t| !t.is_empty()) {
        println!("  tags:     {}", tags.join(", "));
    }
    println!("  created:  {}", instance.created);
    Ok(())
}

fn pad_status(instance: &ProviderInstance) -> String {
    let status = utils::colored_status(instance.status).to_string();
    let width = instance.status.to_string().chars().count();
    format!("{}{}", status, " ".repeat(13usize.saturating_sub(width)))
}
