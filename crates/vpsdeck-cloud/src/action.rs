//! Power and lifecycle actions on an instance

use serde::{Deserialize, Serialize};

/// Closed set of actions accepted by `perform_action`
///
/// Actions are fire-and-forget: a successful call means the vendor accepted
/// the transition, not that it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceAction {
    /// Also accepted as `power_on`
    #[serde(alias = "power_on")]
    Boot,
    /// Graceful shutdown
    Shutdown,
    /// Hard power off
    PowerOff,
    Reboot,
    /// Hard power off followed by power on
    PowerCycle,
    Delete,
}

impl InstanceAction {
    pub const ALL: [InstanceAction; 6] = [
        InstanceAction::Boot,
        InstanceAction::Shutdown,
        InstanceAction::PowerOff,
        InstanceAction::Reboot,
        InstanceAction::PowerCycle,
        InstanceAction::Delete,
    ];

    /// Parse an action name. Returns `None` for anything outside the
    /// vocabulary.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "boot" | "power_on" => Some(InstanceAction::Boot),
            "shutdown" => Some(InstanceAction::Shutdown),
            "power_off" => Some(InstanceAction::PowerOff),
            "reboot" => Some(InstanceAction::Reboot),
            "power_cycle" => Some(InstanceAction::PowerCycle),
            "delete" => Some(InstanceAction::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceAction::Boot => "boot",
            InstanceAction::Shutdown => "shutdown",
            InstanceAction::PowerOff => "power_off",
            InstanceAction::Reboot => "reboot",
            InstanceAction::PowerCycle => "power_cycle",
            InstanceAction::Delete => "delete",
        }
    }

    /// Whether the action destroys the instance
    pub fn is_destructive(&self) -> bool {
        matches!(self, InstanceAction::Delete)
    }
}

impl std::fmt::Display for InstanceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(InstanceAction::parse("boot"), Some(InstanceAction::Boot));
        assert_eq!(InstanceAction::parse("power_on"), Some(InstanceAction::Boot));
        assert_eq!(
            InstanceAction::parse("POWER_CYCLE"),
            Some(InstanceAction::PowerCycle)
        );
        assert_eq!(InstanceAction::parse("resize"), None);
        assert_eq!(InstanceAction::parse(""), None);
    }

    #[test]
    fn test_parse_display_agree() {
        for action in InstanceAction::ALL {
            assert_eq!(InstanceAction::parse(&action.to_string()), Some(action));
        }
    }

    #[test]
    fn test_serde_alias() {
        let action: InstanceAction = serde_json::from_str("\"power_on\"").unwrap();
        assert_eq!(action, InstanceAction::Boot);
        assert!(InstanceAction::Delete.is_destructive());
    }
}
