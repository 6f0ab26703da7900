use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::time::Duration;
use vpsdeck_cloud::InstanceStatus;

/// Pretty-print any serializable value to stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Bold header line followed by a dimmed rule of the same width
pub fn print_table_header(header: &str) {
    println!("{}", header.bold());
    println!("{}", "─".repeat(header.chars().count()).dimmed());
}

pub fn colored_status(status: InstanceStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        InstanceStatus::Running => text.green(),
        InstanceStatus::Stopped => text.red(),
        InstanceStatus::Provisioning | InstanceStatus::Rebooting => text.yellow(),
        InstanceStatus::Error => text.red().bold(),
        InstanceStatus::Unknown => text.dimmed(),
    }
}

/// `1h`, `6h`, `90s`, `1h30m`
pub fn format_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{}s", seconds));
    }
    out
}

/// Cut `text` to `max` characters, marking the cut with `…`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ttl() {
        assert_eq!(format_ttl(Duration::from_secs(3600)), "1h");
        assert_eq!(format_ttl(Duration::from_secs(6 * 3600)), "6h");
        assert_eq!(format_ttl(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_ttl(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_ttl(Duration::ZERO), "0s");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ubuntu 24.04 LTS x64", 10), "Ubuntu 24…");
        assert_eq!(truncate("ÄÖÜäöü", 4), "ÄÖÜ…");
    }
}
