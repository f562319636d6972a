//! Registry configuration

use serde::{Deserialize, Serialize};

/// What to do when two overloads under one name share an argument signature
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverloadPolicy {
    /// Fail `publish` with `DuplicateOverload`
    #[default]
    Reject,
    /// Keep the first registration, drop later duplicates with a warning
    FirstWins,
}

/// Registry behavior switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Duplicate overload handling (default: reject)
    #[serde(default)]
    pub overload_policy: OverloadPolicy,

    /// Re-publishing a type replaces the old record (default: true)
    #[serde(default = "default_replace_existing")]
    pub replace_existing: bool,
}

fn default_replace_existing() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            overload_policy: OverloadPolicy::default(),
            replace_existing: default_replace_existing(),
        }
    }
}

impl RegistryConfig {
    /// Set the duplicate overload policy
    pub fn with_overload_policy(mut self, policy: OverloadPolicy) -> Self {
        self.overload_policy = policy;
        self
    }

    /// Allow or forbid replacing published types
    pub fn with_replace_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.overload_policy, OverloadPolicy::Reject);
        assert!(config.replace_existing);
    }

    #[test]
    fn test_builder_setters() {
        let config = RegistryConfig::default()
            .with_overload_policy(OverloadPolicy::FirstWins)
            .with_replace_existing(false);
        assert_eq!(config.overload_policy, OverloadPolicy::FirstWins);
        assert!(!config.replace_existing);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{ "overload_policy": "first_wins" }"#).unwrap();
        assert_eq!(config.overload_policy, OverloadPolicy::FirstWins);
        assert!(config.replace_existing);

        let config: RegistryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RegistryConfig::default());
    }
}
