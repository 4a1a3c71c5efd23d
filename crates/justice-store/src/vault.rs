//! The vault: the ordered collection of confirmed incident entries, mirrored
//! wholesale into a single key-value slot after every change.

use justice_core::IncidentEntry;
use tracing::{info, warn};

use crate::{KeyValueStore, StoreError};

/// Name of the slot holding the JSON array of entries.
pub const VAULT_SLOT: &str = "justice_vault";

/// Where a damaged vault slot is copied before anything overwrites it.
pub const VAULT_BACKUP_SLOT: &str = "justice_vault_corrupt";

/// Entries recovered from the slot, plus the raw slot text when some or all
/// of it could not be decoded.
struct Loaded {
    entries: Vec<IncidentEntry>,
    damaged: Option<String>,
}

fn read_slot(backend: &dyn KeyValueStore) -> Loaded {
    let raw = match backend.get(VAULT_SLOT) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            return Loaded {
                entries: Vec::new(),
                damaged: None,
            };
        }
        Err(e) => {
            warn!(error = %e, "vault slot unreadable, starting empty");
            return Loaded {
                entries: Vec::new(),
                damaged: None,
            };
        }
    };

    let items = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, bytes = raw.len(), "vault slot corrupt, starting empty");
            return Loaded {
                entries: Vec::new(),
                damaged: Some(raw),
            };
        }
    };

    let total = items.len();
    let mut entries = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<IncidentEntry>(item) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(index, error = %e, "skipping unreadable vault entry"),
        }
    }
    let damaged = (entries.len() < total).then_some(raw);
    Loaded { entries, damaged }
}

/// Read the stored entries.
///
/// Never fails. A missing or unreadable slot yields an empty collection, and
/// entries that do not decode are skipped while the rest are kept.
pub fn load_entries(backend: &dyn KeyValueStore) -> Vec<IncidentEntry> {
    read_slot(backend).entries
}

/// Overwrite the slot with the full collection.
pub fn save_entries(
    backend: &mut dyn KeyValueStore,
    entries: &[IncidentEntry],
) -> Result<(), StoreError> {
    let json = serde_json::to_string(entries)?;
    backend.set(VAULT_SLOT, &json)
}

/// Owned, most-recent-first collection of incident entries.
///
/// Created once at startup and handed to whatever needs it. Every mutation
/// is followed by a whole-collection write. When that write fails the
/// in-memory change is kept and the error returned.
pub struct Vault {
    backend: Box<dyn KeyValueStore>,
    entries: Vec<IncidentEntry>,
}

impl Vault {
    /// Open the vault, loading whatever the backend holds.
    ///
    /// If the slot was damaged its raw text is first copied to
    /// [`VAULT_BACKUP_SLOT`], since the next write replaces the slot with
    /// only the entries that could be read.
    pub fn open(mut backend: Box<dyn KeyValueStore>) -> Self {
        let Loaded { entries, damaged } = read_slot(backend.as_ref());
        if let Some(raw) = damaged {
            match backend.set(VAULT_BACKUP_SLOT, &raw) {
                Ok(()) => warn!(slot = VAULT_BACKUP_SLOT, "kept a copy of the damaged vault"),
                Err(e) => warn!(error = %e, "could not back up the damaged vault"),
            }
        }
        info!(count = entries.len(), "loaded vault");
        Self { backend, entries }
    }

    pub fn entries(&self) -> &[IncidentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&IncidentEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }

    /// Id for an entry created at `timestamp` (epoch ms), unique within the vault.
    pub fn next_id(&self, timestamp: i64) -> String {
        let base = timestamp.to_string();
        if self.get(&base).is_none() {
            return base;
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{base}-{n}");
            if self.get(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Insert at the front and persist.
    pub fn add(&mut self, entry: IncidentEntry) -> Result<(), StoreError> {
        info!(id = %entry.id, "adding vault entry");
        self.entries.insert(0, entry);
        self.save_all()
    }

    /// Remove by id and persist. The caller is responsible for having
    /// obtained the user's confirmation.
    pub fn remove(&mut self, id: &str) -> Result<IncidentEntry, StoreError> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let removed = self.entries.remove(idx);
        info!(id, "removed vault entry");
        self.save_all()?;
        Ok(removed)
    }

    /// Write the full collection to the backend.
    pub fn save_all(&mut self) -> Result<(), StoreError> {
        save_entries(self.backend.as_mut(), &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileStore, MemoryStore};
    use justice_core::{Classification, Urgency};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn entry(id: &str, ts: i64) -> IncidentEntry {
        IncidentEntry {
            id: id.into(),
            timestamp: ts,
            redacted_content: format!("[PERSON_1] incident {id}"),
            classifications: vec![Classification::AbuseOfAuthority],
            urgency: Urgency::High,
            legal_context: "Employment Act".into(),
            placeholders: BTreeMap::from([("[PERSON_1]".into(), "the director".into())]),
        }
    }

    #[test]
    fn empty_backend_loads_empty() {
        let vault = Vault::open(Box::new(MemoryStore::new()));
        assert!(vault.is_empty());
    }

    #[test]
    fn corrupt_slot_loads_empty() {
        let store = MemoryStore::new().with_slot(VAULT_SLOT, "{not json");
        let vault = Vault::open(Box::new(store));
        assert!(vault.is_empty());
    }

    #[test]
    fn wrong_shape_loads_empty() {
        let store = MemoryStore::new().with_slot(VAULT_SLOT, r#"{"entries": []}"#);
        assert!(load_entries(&store).is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let entries = vec![entry("2", 2), entry("1", 1)];
        let mut store = MemoryStore::new();
        save_entries(&mut store, &entries).unwrap();
        assert_eq!(load_entries(&store), entries);
    }

    #[test]
    fn add_inserts_at_front_and_persists() {
        let mut vault = Vault::open(Box::new(MemoryStore::new()));
        vault.add(entry("1", 1)).unwrap();
        vault.add(entry("2", 2)).unwrap();

        let ids: Vec<&str> = vault.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(load_entries(vault.backend()), vault.entries());
    }

    #[test]
    fn remove_persists_and_reports_missing() {
        let mut vault = Vault::open(Box::new(MemoryStore::new()));
        vault.add(entry("1", 1)).unwrap();
        vault.add(entry("2", 2)).unwrap();

        let removed = vault.remove("1").unwrap();
        assert_eq!(removed.id, "1");
        assert_eq!(load_entries(vault.backend()).len(), 1);

        assert!(matches!(vault.remove("1"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn next_id_avoids_collisions() {
        let mut vault = Vault::open(Box::new(MemoryStore::new()));
        assert_eq!(vault.next_id(1000), "1000");
        vault.add(entry("1000", 1000)).unwrap();
        assert_eq!(vault.next_id(1000), "1000-1");
        vault.add(entry("1000-1", 1000)).unwrap();
        assert_eq!(vault.next_id(1000), "1000-2");
    }

    #[test]
    fn file_backed_vault_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            let mut vault = Vault::open(Box::new(store));
            vault.add(entry("1", 1)).unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        let vault = Vault::open(Box::new(store));
        assert_eq!(vault.len(), 1);
        assert_eq!(vault.entries()[0].redacted_content, "[PERSON_1] incident 1");
    }

    #[test]
    fn corrupt_file_is_backed_up_before_the_next_add() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("justice_vault.json"), "\u{0}garbage").unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        let mut vault = Vault::open(Box::new(store));
        assert!(vault.is_empty());

        vault.add(entry("1", 1)).unwrap();
        assert_eq!(load_entries(vault.backend()).len(), 1);
        assert_eq!(
            vault.backend().get(VAULT_BACKUP_SLOT).unwrap().as_deref(),
            Some("\u{0}garbage")
        );
    }

    #[test]
    fn one_bad_entry_does_not_cost_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let raw = r#"[
            {"id":"2","timestamp":2,"redactedContent":"x","classifications":["Other"],
             "urgency":"critical","legalContext":""},
            {"id":"1","timestamp":1,"redactedContent":"kept evidence",
             "classifications":["Discrimination"],"urgency":"low","legalContext":"",
             "rawContent":"legacy field"}
        ]"#;
        std::fs::write(dir.path().join("justice_vault.json"), raw).unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        let mut vault = Vault::open(Box::new(store));
        assert_eq!(vault.len(), 1);
        assert_eq!(vault.entries()[0].redacted_content, "kept evidence");

        vault.add(entry("3", 3)).unwrap();
        drop(vault);

        let store = FileStore::open(dir.path()).unwrap();
        let on_disk = load_entries(&store);
        let ids: Vec<&str> = on_disk.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        let backup = store.get(VAULT_BACKUP_SLOT).unwrap().unwrap();
        assert!(backup.contains("critical"));
    }

    #[test]
    fn healthy_vault_writes_no_backup() {
        let mut store = MemoryStore::new();
        save_entries(&mut store, &[entry("1", 1)]).unwrap();
        let vault = Vault::open(Box::new(store));
        assert_eq!(vault.len(), 1);
        assert_eq!(vault.backend().get(VAULT_BACKUP_SLOT).unwrap(), None);
    }

    fn any_entry() -> impl Strategy<Value = IncidentEntry> {
        (
            "[0-9]{1,13}(-[0-9]{1,3})?",
            any::<i64>(),
            any::<String>(),
            prop::collection::vec(prop::sample::select(Classification::ALL.to_vec()), 0..6),
            prop::sample::select(vec![Urgency::High, Urgency::Medium, Urgency::Low]),
            any::<String>(),
            prop::collection::btree_map(any::<String>(), any::<String>(), 0..4),
        )
            .prop_map(
                |(id, timestamp, redacted_content, classifications, urgency, legal_context, placeholders)| {
                    IncidentEntry {
                        id,
                        timestamp,
                        redacted_content,
                        classifications,
                        urgency,
                        legal_context,
                        placeholders,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn any_collection_roundtrips(entries in prop::collection::vec(any_entry(), 0..8)) {
            let mut store = MemoryStore::new();
            save_entries(&mut store, &entries).unwrap();
            prop_assert_eq!(load_entries(&store), entries.clone());

            let vault = Vault::open(Box::new(store));
            prop_assert_eq!(vault.entries(), entries.as_slice());
            prop_assert_eq!(vault.backend().get(VAULT_BACKUP_SLOT).unwrap(), None);
        }
    }
}
