// File: ottonrent-common/src/models/tenant.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// One streaming brand. Each tenant has its own isolated store instance
/// and document tree.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Tenant {
    Crunchyroll,
    Netflix,
    Prime,
}

impl Tenant {
    pub const ALL: [Tenant; 3] = [Tenant::Crunchyroll, Tenant::Netflix, Tenant::Prime];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tenant::Crunchyroll => "crunchyroll",
            Tenant::Netflix => "netflix",
            Tenant::Prime => "prime",
        }
    }

    /// Upper-case form used in environment variable names.
    pub fn env_key(&self) -> &'static str {
        match self {
            Tenant::Crunchyroll => "CRUNCHYROLL",
            Tenant::Netflix => "NETFLIX",
            Tenant::Prime => "PRIME",
        }
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tenant {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crunchyroll" | "cr" => Ok(Tenant::Crunchyroll),
            "netflix" | "nf" => Ok(Tenant::Netflix),
            "prime" | "primevideo" | "prime-video" => Ok(Tenant::Prime),
            _ => Err(format!("Unknown tenant: {}", s)),
        }
    }
}
