//! Persisted request-template store (`request.json`).
//!
//! The document is owned jointly with the session manager: login rewrites the
//! header variants and substitutes the user id into URL patterns, while every
//! field it does not own (payload bodies, alternate endpoint URLs, anything a
//! newer game patch adds) is copied through unchanged.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Placeholder substituted with the literal user id at template finalization.
pub const USER_ID_PLACEHOLDER: &str = "{user_id}";

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuyProductUrls {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub url_upgrade: String,
    /// Bulk stat-increment endpoint (weapon level-ups).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_stats: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopUpUrls {
    #[serde(default)]
    pub url_money: String,
    #[serde(default)]
    pub url_cstacks: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTemplates {
    /// Runtime request headers, including the bearer token once logged in.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Token-endpoint headers, never carrying a bearer token.
    #[serde(default)]
    pub token_header: BTreeMap<String, String>,
    /// Token-endpoint header shape with the current bearer token injected.
    #[serde(default)]
    pub token_header_with_token: BTreeMap<String, String>,
    #[serde(default)]
    pub url_buy_products: BuyProductUrls,
    #[serde(default)]
    pub url_buy: TopUpUrls,
    #[serde(default = "empty_object")]
    pub payload_money: Value,
    #[serde(default = "empty_object")]
    pub payload_cstacks: Value,
    #[serde(default = "empty_object")]
    pub payload_cred: Value,
    /// Fields this version does not know about survive a load/save cycle.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Default for RequestTemplates {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            token_header: BTreeMap::new(),
            token_header_with_token: BTreeMap::new(),
            url_buy_products: BuyProductUrls::default(),
            url_buy: TopUpUrls::default(),
            payload_money: empty_object(),
            payload_cstacks: empty_object(),
            payload_cred: empty_object(),
            extra: serde_json::Map::new(),
        }
    }
}

impl RequestTemplates {
    /// Load the store, treating a missing file as an empty document. A file
    /// that exists but does not parse is a hard error: silently starting from
    /// scratch would clobber it on the next save.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            ConfigError::Load(format!("invalid JSON in {}: {e}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Inject a fresh bearer token and substitute the literal user id into
    /// every URL pattern. Called by the session manager after each successful
    /// login; the caller persists the result.
    pub fn finalize(&mut self, access_token: &str, user_id: &str) {
        let bearer = format!("Bearer {access_token}");

        self.token_header_with_token = self.token_header.clone();
        self.token_header_with_token
            .insert("Authorization".to_string(), bearer.clone());
        self.headers.insert("Authorization".to_string(), bearer);

        self.url_buy_products.url = self
            .url_buy_products
            .url
            .replace(USER_ID_PLACEHOLDER, user_id);
        self.url_buy_products.url_upgrade = self
            .url_buy_products
            .url_upgrade
            .replace(USER_ID_PLACEHOLDER, user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seeded() -> RequestTemplates {
        let mut t = RequestTemplates::default();
        t.token_header
            .insert("Content-Type".into(), "application/x-www-form-urlencoded".into());
        t.headers.insert("Accept".into(), "*/*".into());
        t.url_buy_products.url =
            "https://shop.example/v1/users/{user_id}/purchases".into();
        t.url_buy_products.url_upgrade =
            "https://shop.example/v1/users/{user_id}/stats".into();
        t
    }

    #[test]
    fn missing_file_loads_as_empty_document() {
        let dir = tempdir().unwrap();
        let t = RequestTemplates::load(&dir.path().join("request.json")).unwrap();
        assert!(t.headers.is_empty());
        assert_eq!(t.url_buy_products.url, "");
    }

    #[test]
    fn malformed_file_is_a_hard_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("request.json");
        fs::write(&path, "{not json").unwrap();
        assert!(RequestTemplates::load(&path).is_err());
    }

    #[test]
    fn finalize_injects_bearer_and_user_id() {
        let mut t = seeded();
        t.finalize("tok-123", "user-9");

        assert_eq!(
            t.headers.get("Authorization").map(String::as_str),
            Some("Bearer tok-123")
        );
        assert_eq!(
            t.token_header_with_token
                .get("Authorization")
                .map(String::as_str),
            Some("Bearer tok-123")
        );
        // The bare token header stays token-free.
        assert!(!t.token_header.contains_key("Authorization"));
        assert_eq!(
            t.url_buy_products.url,
            "https://shop.example/v1/users/user-9/purchases"
        );
        assert_eq!(
            t.url_buy_products.url_upgrade,
            "https://shop.example/v1/users/user-9/stats"
        );
    }

    #[test]
    fn finalize_keeps_non_auth_token_headers() {
        let mut t = seeded();
        t.finalize("tok", "u");
        assert_eq!(
            t.token_header_with_token
                .get("Content-Type")
                .map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("request.json");
        fs::write(
            &path,
            r#"{
  "headers": {"Accept": "*/*"},
  "payload_money": {"bundle": "medium"},
  "url_future_feature": {"url": "https://shop.example/new"}
}"#,
        )
        .unwrap();

        let mut t = RequestTemplates::load(&path).unwrap();
        t.finalize("tok", "u");
        t.save(&path).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["url_future_feature"]["url"], "https://shop.example/new");
        assert_eq!(raw["payload_money"]["bundle"], "medium");
        assert_eq!(raw["headers"]["Authorization"], "Bearer tok");
    }
}
