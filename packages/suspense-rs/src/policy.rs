//! Fetch policies: cache-vs-network precedence for a single preload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParsePolicyError;

/// Controls whether a preload answers from the record store, the network,
/// or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Cached data if present and fresh; otherwise fetch.
    #[default]
    StoreOrNetwork,
    /// Cached data if present (fresh or not), and always refresh from the network.
    StoreAndNetwork,
    /// Always fetch; never answer from the store.
    NetworkOnly,
    /// Never fetch; missing data is an error.
    StoreOnly,
}

impl FetchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchPolicy::StoreOrNetwork => "store-or-network",
            FetchPolicy::StoreAndNetwork => "store-and-network",
            FetchPolicy::NetworkOnly => "network-only",
            FetchPolicy::StoreOnly => "store-only",
        }
    }

    pub fn variants() -> &'static [FetchPolicy] {
        &[
            FetchPolicy::StoreOrNetwork,
            FetchPolicy::StoreAndNetwork,
            FetchPolicy::NetworkOnly,
            FetchPolicy::StoreOnly,
        ]
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FetchPolicy::variants()
            .iter()
            .copied()
            .find(|policy| policy.as_str() == s)
            .ok_or_else(|| ParsePolicyError(s.to_string()))
    }
}
