//! API-key authentication for the HTTP surface.
//!
//! Keys live in a two-column CSV file (`user,api_key`) loaded once at
//! startup. Requests present the key in the `X-API-Key` header; an unknown
//! or missing key is a 401.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

/// Header carrying the client API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Loaded key → user mapping.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    users_by_key: HashMap<String, String>,
}

impl ApiKeyStore {
    /// Load the store from a CSV file with a `user,api_key` header row.
    pub fn from_csv_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::KeyFile {
            path: path.display().to_string(),
        })?;
        Ok(Self::from_csv(&content))
    }

    /// Parse CSV content. Blank lines and the header row are skipped;
    /// malformed rows are ignored.
    pub fn from_csv(content: &str) -> Self {
        let mut users_by_key = HashMap::new();
        for line in content.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((user, key)) = line.split_once(',') {
                let (user, key) = (user.trim(), key.trim());
                if !user.is_empty() && !key.is_empty() {
                    users_by_key.insert(key.to_string(), user.to_string());
                }
            }
        }
        Self { users_by_key }
    }

    /// Build a store from explicit pairs (tests).
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            users_by_key: pairs
                .iter()
                .map(|(user, key)| (key.to_string(), user.to_string()))
                .collect(),
        }
    }

    /// The user a key belongs to, if any.
    pub fn user_for(&self, api_key: &str) -> Option<&str> {
        self.users_by_key.get(api_key).map(String::as_str)
    }

    /// Number of loaded keys.
    pub fn len(&self) -> usize {
        self.users_by_key.len()
    }

    /// Whether no keys are loaded.
    pub fn is_empty(&self) -> bool {
        self.users_by_key.is_empty()
    }
}
