//! Weapon stat tooling: fetch current weapon levels from the upgrade
//! endpoint, cache them to `weapons.json`, and push level increments through
//! the bulk stat endpoint.

use crate::error::{ConfigError, FarmError, PurchaseError, Result};
use crate::templates::RequestTemplates;
use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const MAX_WEAPON_LEVEL: u32 = 28;

const WEAPON_LEVEL_MARKER: &str = "weapon-level";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStat {
    #[serde(rename = "statCode")]
    pub stat_code: String,
    #[serde(rename = "value", default)]
    pub level: u32,
}

#[derive(Debug, Deserialize)]
struct StatListResponse {
    #[serde(default)]
    data: Vec<StatEntry>,
}

#[derive(Debug, Deserialize)]
struct StatEntry {
    #[serde(rename = "statCode", default)]
    stat_code: String,
    #[serde(default)]
    value: u32,
}

/// Wire body of one stat increment.
#[derive(Debug, Serialize)]
struct StatIncrement<'a> {
    inc: u32,
    #[serde(rename = "statCode")]
    stat_code: &'a str,
}

pub struct WeaponService {
    client: Client,
    headers: BTreeMap<String, String>,
    upgrade_url: String,
    stats_url: Option<String>,
}

impl WeaponService {
    pub fn from_templates(
        client: Client,
        templates: &RequestTemplates,
    ) -> Result<Self> {
        if templates.headers.is_empty() {
            return Err(ConfigError::MissingTemplate("headers").into());
        }
        Ok(Self {
            client,
            headers: templates.headers.clone(),
            upgrade_url: templates.url_buy_products.url_upgrade.clone(),
            stats_url: templates.url_buy_products.url_stats.clone(),
        })
    }

    /// Fetch the stat list and keep the weapon-level entries, in response
    /// order.
    pub async fn fetch_stats(&self) -> Result<Vec<WeaponStat>> {
        if self.upgrade_url.is_empty() {
            return Err(ConfigError::MissingTemplate("url_buy_products.url_upgrade").into());
        }

        let mut request = self.client.get(&self.upgrade_url);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .context("Weapon stat request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FarmError::Purchase(PurchaseError::StatRejected {
                status: status.as_u16(),
                body,
            }));
        }

        let list: StatListResponse = response
            .json()
            .await
            .context("Weapon stat response was not valid JSON")?;

        let stats: Vec<WeaponStat> = list
            .data
            .into_iter()
            .filter(|entry| entry.stat_code.contains(WEAPON_LEVEL_MARKER))
            .map(|entry| WeaponStat {
                stat_code: entry.stat_code,
                level: entry.value,
            })
            .collect();
        debug!("Fetched {} weapon-level stats", stats.len());
        Ok(stats)
    }

    /// Validate against the level cap and push one increment through the bulk
    /// stat endpoint.
    pub async fn level_up(
        &self,
        stat_code: &str,
        current_level: u32,
        increment: u32,
    ) -> Result<()> {
        // Saturate so an absurd increment reads as over the cap, not a panic.
        let requested = current_level.saturating_add(increment);
        if requested > MAX_WEAPON_LEVEL {
            return Err(FarmError::Purchase(PurchaseError::LevelCap {
                requested,
                max: MAX_WEAPON_LEVEL,
            }));
        }

        let Some(stats_url) = self.stats_url.as_deref() else {
            return Err(ConfigError::MissingTemplate("url_buy_products.url_stats").into());
        };

        let payload = [StatIncrement {
            inc: increment,
            stat_code,
        }];
        let mut request = self.client.post(stats_url).json(&payload);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .context("Stat increment request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FarmError::Purchase(PurchaseError::StatRejected {
                status: status.as_u16(),
                body,
            }));
        }

        debug!("Levelled up {stat_code} by {increment}");
        Ok(())
    }
}

pub fn save_cache(stats: &[WeaponStat], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ConfigError::Io)?;
    }
    let json = serde_json::to_string_pretty(stats)
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    fs::write(path, json).map_err(ConfigError::Io)?;
    Ok(())
}

/// Fail-soft like the other read-mostly stores: no cache means no stats.
pub fn load_cache(path: &Path) -> Vec<WeaponStat> {
    fs::read_to_string(path)
        .ok()
        .and_then(|contents| serde_json::from_str(&contents).ok())
        .unwrap_or_default()
}
