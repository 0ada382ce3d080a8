//! Answer-key registry: immutable built-in keys plus a persisted overlay of
//! user-created keys.
//!
//! The registry is constructed once and handed to whoever needs lookups; it
//! owns the custom-key namespace and nothing else. Notifications about key
//! creation belong to the caller's workflow, not here.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::{EvalError, Result};
use crate::model::AnswerKey;
use crate::store::{self, KvStore, CUSTOM_KEYS_KEY};

pub struct AnswerKeyRegistry {
    builtin: BTreeMap<String, AnswerKey>,
    question_count: u32,
    store: Arc<dyn KvStore>,
    // Serializes the read-modify-write in `create`.
    write_lock: Mutex<()>,
}

impl AnswerKeyRegistry {
    pub fn new(
        builtin: BTreeMap<String, AnswerKey>,
        question_count: u32,
        store: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            builtin,
            question_count,
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn custom_keys(&self) -> BTreeMap<String, AnswerKey> {
        store::load_or_default(self.store.as_ref(), CUSTOM_KEYS_KEY)
    }

    /// Built-in and custom keys together. A stored custom key whose name
    /// has since become a built-in is hidden behind the built-in.
    pub fn list_all(&self) -> BTreeMap<String, AnswerKey> {
        let mut all = self.custom_keys();
        all.extend(self.builtin.clone());
        all
    }

    /// Look up a key by exact name.
    pub fn get(&self, name: &str) -> Option<AnswerKey> {
        self.builtin
            .get(name)
            .cloned()
            .or_else(|| self.custom_keys().remove(name))
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtin.contains_key(name)
    }

    pub fn builtin_names(&self) -> Vec<String> {
        self.builtin.keys().cloned().collect()
    }

    pub fn custom_names(&self) -> Vec<String> {
        self.custom_keys()
            .into_keys()
            .filter(|name| !self.is_builtin(name))
            .collect()
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    /// Save a custom key under `name`.
    ///
    /// Fails with `Validation` for a blank name or out-of-range question
    /// numbers, and with `Conflict` when `name` belongs to a built-in key.
    /// An existing custom key of the same name is replaced.
    pub fn create(&self, name: &str, key: AnswerKey) -> Result<()> {
        if name.trim().is_empty() {
            return Err(EvalError::Validation(
                "answer key name cannot be empty".into(),
            ));
        }
        if self.is_builtin(name) {
            return Err(EvalError::Conflict(format!(
                "cannot overwrite built-in answer key: {name}"
            )));
        }
        if let Some((q, _)) = key
            .iter()
            .find(|(q, _)| *q == 0 || *q > self.question_count)
        {
            return Err(EvalError::Validation(format!(
                "question {q} is outside 1..={}",
                self.question_count
            )));
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut custom = self.custom_keys();
        if custom.insert(name.to_string(), key).is_some() {
            tracing::info!("replacing existing custom answer key '{name}'");
        }
        store::save(self.store.as_ref(), CUSTOM_KEYS_KEY, &custom)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerOption;
    use crate::store::MemoryStore;

    fn registry_with(store: Arc<dyn KvStore>) -> AnswerKeyRegistry {
        let mut builtin = BTreeMap::new();
        builtin.insert("Set A".to_string(), AnswerKey::from_compact("ABCDE").unwrap());
        builtin.insert("Set B".to_string(), AnswerKey::from_compact("EDCBA").unwrap());
        AnswerKeyRegistry::new(builtin, 5, store)
    }

    fn registry() -> AnswerKeyRegistry {
        registry_with(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn list_all_unions_builtin_and_custom() {
        let reg = registry();
        reg.create("Custom 1", AnswerKey::from_compact("AAAAA").unwrap())
            .unwrap();
        let all = reg.list_all();
        assert_eq!(all.len(), 3);
        assert!(all.contains_key("Set A"));
        assert!(all.contains_key("Custom 1"));
        assert_eq!(reg.custom_names(), vec!["Custom 1".to_string()]);
        assert_eq!(reg.builtin_names(), vec!["Set A", "Set B"]);
    }

    #[test]
    fn blank_name_rejected() {
        let reg = registry();
        for name in ["", "   ", "\t\n"] {
            let err = reg.create(name, AnswerKey::new()).unwrap_err();
            assert!(matches!(err, EvalError::Validation(_)), "{name:?}");
        }
        assert!(reg.custom_names().is_empty());
    }

    #[test]
    fn builtin_name_conflicts_and_writes_nothing() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let reg = registry_with(Arc::clone(&store));
        let err = reg
            .create("Set A", AnswerKey::from_compact("EEEEE").unwrap())
            .unwrap_err();
        assert!(matches!(err, EvalError::Conflict(_)));
        assert!(store.get(CUSTOM_KEYS_KEY).is_none());
        assert_eq!(reg.get("Set A").unwrap().get(1), AnswerOption::A);
    }

    #[test]
    fn new_name_always_succeeds() {
        let reg = registry();
        reg.create("KeyA", AnswerKey::from_compact("B").unwrap())
            .unwrap();
        assert_eq!(reg.get("KeyA").unwrap().get(1), AnswerOption::B);
        assert!(!reg.is_builtin("KeyA"));
    }

    #[test]
    fn custom_name_collision_overwrites() {
        let reg = registry();
        reg.create("Retake", AnswerKey::from_compact("AAAAA").unwrap())
            .unwrap();
        reg.create("Retake", AnswerKey::from_compact("BBBBB").unwrap())
            .unwrap();
        assert_eq!(reg.custom_names().len(), 1);
        assert_eq!(reg.get("Retake").unwrap().get(1), AnswerOption::B);
    }

    #[test]
    fn out_of_range_question_rejected() {
        let reg = registry();
        let mut key = AnswerKey::new();
        key.insert(6, AnswerOption::A);
        let err = reg.create("Too far", key).unwrap_err();
        assert!(matches!(err, EvalError::Validation(_)));
    }

    #[test]
    fn custom_keys_survive_reconstruction() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        registry_with(Arc::clone(&store))
            .create("Persisted", AnswerKey::from_compact("CCCCC").unwrap())
            .unwrap();
        let reopened = registry_with(store);
        assert_eq!(reopened.get("Persisted").unwrap().get(5), AnswerOption::C);
    }

    #[test]
    fn builtin_wins_over_older_custom_key() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        registry_with(Arc::clone(&store))
            .create("Set C", AnswerKey::from_compact("EEEEE").unwrap())
            .unwrap();

        let mut builtin = BTreeMap::new();
        builtin.insert("Set C".to_string(), AnswerKey::from_compact("AAAAA").unwrap());
        let reg = AnswerKeyRegistry::new(builtin, 5, store);

        assert_eq!(reg.list_all()["Set C"].get(1), AnswerOption::A);
        assert_eq!(reg.get("Set C").unwrap().get(1), AnswerOption::A);
        assert!(reg.custom_names().is_empty());
    }

    #[test]
    fn malformed_overlay_reads_as_empty() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store
            .set(CUSTOM_KEYS_KEY, serde_json::json!({"Bad": {"1": "Z"}}))
            .unwrap();
        let reg = registry_with(store);
        assert_eq!(reg.list_all().len(), 2);
        assert!(reg.get("Bad").is_none());
    }
}
