//! Item catalog (`offsets.json`), read-only external collaborator.
//!
//! The document is keyed by category name; each value is an ordered sequence
//! of single-key maps from display name to item descriptor. A single generic
//! executor is parameterized over [`ItemCategory`] instead of one purchase
//! module per category.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use strum::{Display, EnumIter, EnumString};
use tracing::warn;

/// Purchasable item categories, matching the catalog's top-level keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum ItemCategory {
    #[strum(serialize = "Inventory Slots")]
    InventorySlots,
    #[strum(serialize = "Paint")]
    Paint,
    #[strum(serialize = "Heist Pack")]
    HeistPack,
    #[strum(serialize = "Weapon Pattern")]
    WeaponPattern,
    #[strum(serialize = "Mask Patterns")]
    MaskPatterns,
    #[strum(serialize = "Twitch Items")]
    TwitchItems,
}

impl ItemCategory {
    /// Catalog key for this category.
    pub fn key(self) -> String {
        self.to_string()
    }
}

/// Immutable item descriptor; identity is `item_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasableItem {
    pub name: String,
    pub item_id: String,
    pub price: u64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct ItemDetails {
    #[serde(rename = "itemId")]
    item_id: String,
    price: u64,
    currency: String,
}

#[derive(Debug, Default)]
pub struct Catalog {
    categories: BTreeMap<String, Vec<PurchasableItem>>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
            .map_err(|e| ConfigError::Catalog(format!("invalid JSON in {}: {e}", path.display())))
    }

    fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        // Entries that are not an object with the expected fields are skipped
        // with a warning, matching the fail-soft read contract of the store.
        let raw: BTreeMap<String, Vec<BTreeMap<String, serde_json::Value>>> =
            serde_json::from_str(contents)?;

        let mut categories = BTreeMap::new();
        for (category, entries) in raw {
            let mut items = Vec::with_capacity(entries.len());
            for entry in entries {
                for (name, value) in entry {
                    match serde_json::from_value::<ItemDetails>(value) {
                        Ok(details) => items.push(PurchasableItem {
                            name,
                            item_id: details.item_id,
                            price: details.price,
                            currency: details.currency,
                        }),
                        Err(e) => warn!("Skipping catalog entry '{name}' in '{category}': {e}"),
                    }
                }
            }
            categories.insert(category, items);
        }
        Ok(Self { categories })
    }

    /// Items of a category in catalog order; empty when the category is
    /// absent from the file.
    pub fn items(&self, category: ItemCategory) -> &[PurchasableItem] {
        self.categories
            .get(&category.key())
            .map_or(&[], Vec::as_slice)
    }

    pub fn find(&self, category: ItemCategory, name: &str) -> Option<&PurchasableItem> {
        self.items(category).iter().find(|item| item.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    const SAMPLE: &str = r#"{
  "Paint": [
    {"Red Paint": {"itemId": "a1", "price": 100, "currency": "CASH"}},
    {"Blue Paint": {"itemId": "a2", "price": 150, "currency": "CASH"}}
  ],
  "Inventory Slots": [
    {"Weapon Slot": {"itemId": "s1", "price": 2000, "currency": "GOLD"}}
  ]
}"#;

    #[test]
    fn parses_items_in_catalog_order() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        let paints = catalog.items(ItemCategory::Paint);
        assert_eq!(paints.len(), 2);
        assert_eq!(paints[0].name, "Red Paint");
        assert_eq!(paints[0].item_id, "a1");
        assert_eq!(paints[0].price, 100);
        assert_eq!(paints[1].name, "Blue Paint");
    }

    #[test]
    fn absent_category_yields_no_items() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        assert!(catalog.items(ItemCategory::TwitchItems).is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let catalog = Catalog::parse(
            r#"{"Paint": [
                {"Broken": {"price": "not-a-number"}},
                {"Red Paint": {"itemId": "a1", "price": 100, "currency": "CASH"}}
            ]}"#,
        )
        .unwrap();
        let paints = catalog.items(ItemCategory::Paint);
        assert_eq!(paints.len(), 1);
        assert_eq!(paints[0].name, "Red Paint");
    }

    #[test]
    fn find_matches_display_name() {
        let catalog = Catalog::parse(SAMPLE).unwrap();
        let slot = catalog.find(ItemCategory::InventorySlots, "Weapon Slot").unwrap();
        assert_eq!(slot.item_id, "s1");
        assert_eq!(slot.currency, "GOLD");
        assert!(catalog.find(ItemCategory::Paint, "Green Paint").is_none());
    }

    #[test]
    fn category_keys_round_trip_through_strum() {
        for category in ItemCategory::iter() {
            let parsed: ItemCategory = category.key().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert_eq!(ItemCategory::InventorySlots.key(), "Inventory Slots");
    }
}
