//! Static item and spell lookups.
//!
//! The bid engine only needs "which item is this name" and "what is item N";
//! [`ItemLookup`] is that seam. [`StaticDatabase`] is the JSON-file backed
//! implementation loaded once at startup.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::common::error::ItemDbError;

/// Item identifier from the static database.
pub type ItemId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpellRecord {
    pub id: u32,
    pub name: String,
}

/// Lookup service for items and spells.
pub trait ItemLookup: Send + Sync {
    fn find_item_id_by_name(&self, name: &str) -> Option<ItemId>;
    fn get_item_by_id(&self, id: ItemId) -> Option<ItemRecord>;
    fn get_spell_by_id(&self, id: u32) -> Option<SpellRecord>;
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseFile {
    #[serde(default)]
    items: Vec<ItemRecord>,
    #[serde(default)]
    spells: Vec<SpellRecord>,
}

/// In-memory item/spell database.
#[derive(Debug, Default)]
pub struct StaticDatabase {
    items: HashMap<ItemId, ItemRecord>,
    item_ids_by_name: HashMap<String, ItemId>,
    spells: HashMap<u32, SpellRecord>,
}

impl StaticDatabase {
    /// Load the database from a JSON file of the form
    /// `{ "items": [{"id": 1, "name": "Cloth Cap"}], "spells": [...] }`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ItemDbError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ItemDbError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: DatabaseFile =
            serde_json::from_str(&content).map_err(|source| ItemDbError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let db = Self::from_records(file.items, file.spells);
        info!(
            "Loaded {} items and {} spells from {}",
            db.items.len(),
            db.spells.len(),
            path.display()
        );
        Ok(db)
    }

    pub fn from_records(items: Vec<ItemRecord>, spells: Vec<SpellRecord>) -> Self {
        let item_ids_by_name = items
            .iter()
            .map(|item| (item.name.to_lowercase(), item.id))
            .collect();

        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            item_ids_by_name,
            spells: spells.into_iter().map(|spell| (spell.id, spell)).collect(),
        }
    }
}

impl ItemLookup for StaticDatabase {
    fn find_item_id_by_name(&self, name: &str) -> Option<ItemId> {
        self.item_ids_by_name.get(&name.trim().to_lowercase()).copied()
    }

    fn get_item_by_id(&self, id: ItemId) -> Option<ItemRecord> {
        self.items.get(&id).cloned()
    }

    fn get_spell_by_id(&self, id: u32) -> Option<SpellRecord> {
        self.spells.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let db = StaticDatabase::from_records(
            vec![ItemRecord {
                id: 1001,
                name: "Cloth Cap".to_string(),
            }],
            vec![],
        );

        assert_eq!(db.find_item_id_by_name("cloth cap"), Some(1001));
        assert_eq!(db.find_item_id_by_name(" CLOTH CAP "), Some(1001));
        assert_eq!(db.find_item_id_by_name("Leather Cap"), None);
        assert_eq!(db.get_item_by_id(1001).map(|i| i.name), Some("Cloth Cap".to_string()));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"items": [{{"id": 5, "name": "Fine Steel Sword"}}], "spells": [{{"id": 13, "name": "Complete Heal"}}]}}"#
        )
        .unwrap();

        let db = StaticDatabase::load(file.path()).unwrap();
        assert_eq!(db.find_item_id_by_name("fine steel sword"), Some(5));
        assert_eq!(db.get_spell_by_id(13).map(|s| s.name), Some("Complete Heal".to_string()));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = StaticDatabase::load("/nonexistent/items.json");
        assert!(matches!(result, Err(ItemDbError::Io { .. })));
    }
}
