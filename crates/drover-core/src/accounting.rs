//! Read-only projections of scheduler accounts and queues.

use serde::{Deserialize, Serialize};

/// A scheduler account, as reported by an adapter's account enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub name: String,

    /// QoS values this account can use.
    #[serde(default)]
    pub qos: Vec<String>,

    /// Cluster the account belongs to, when the scheduler scopes accounts
    /// per cluster.
    #[serde(default)]
    pub cluster: Option<String>,
}

impl AccountInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qos: Vec::new(),
            cluster: None,
        }
    }
}

/// A scheduler queue (partition), as reported by an adapter's queue
/// enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub name: String,

    /// QoS values usable on this queue.
    #[serde(default)]
    pub qos: Vec<String>,

    /// Accounts allowed to use this queue. `None` means all accounts are
    /// permitted.
    #[serde(default)]
    pub allow_accounts: Option<Vec<String>>,

    /// Accounts denied access to this queue.
    #[serde(default)]
    pub deny_accounts: Vec<String>,
}

impl QueueInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qos: Vec::new(),
            allow_accounts: None,
            deny_accounts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_queue_allows_all_accounts() {
        let queue = QueueInfo::new("general");
        assert_eq!(queue.allow_accounts, None);
        assert!(queue.deny_accounts.is_empty());
    }

    #[test]
    fn test_restricted_queue() {
        let queue = QueueInfo {
            allow_accounts: Some(vec!["pzs0714".into()]),
            ..QueueInfo::new("hugemem")
        };
        assert_eq!(queue.allow_accounts.as_deref(), Some(&["pzs0714".to_string()][..]));
    }
}
