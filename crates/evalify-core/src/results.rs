//! Evaluation history, newest first.
//!
//! Order is insertion order reversed. Records are never re-sorted by date,
//! deduplicated, edited, or deleted here.

use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::model::EvaluationResult;
use crate::store::{self, KvStore, RESULTS_KEY};

pub struct ResultStore {
    store: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl ResultStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Persist `result` at the front of the history.
    pub fn append(&self, result: EvaluationResult) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut results = self.list_all();
        results.insert(0, result);
        store::save(self.store.as_ref(), RESULTS_KEY, &results)
    }

    /// Every stored result, most recently appended first.
    pub fn list_all(&self) -> Vec<EvaluationResult> {
        store::load_or_default(self.store.as_ref(), RESULTS_KEY)
    }

    pub fn len(&self) -> usize {
        self.list_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DetectedAnswers;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn make_result(file: &str, total: u32, offset_days: i64) -> EvaluationResult {
        EvaluationResult {
            id: Uuid::new_v4(),
            evaluation_name: None,
            image_file_name: file.into(),
            evaluation_date: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
                + Duration::days(offset_days),
            total_score: total,
            subject_scores: BTreeMap::new(),
            detected_answers: DetectedAnswers::new(),
            answer_key_name: "Set A".into(),
        }
    }

    #[test]
    fn newest_first() {
        let results = ResultStore::new(Arc::new(MemoryStore::new()));
        let r1 = make_result("one.png", 10, 0);
        let r2 = make_result("two.png", 20, 1);
        results.append(r1.clone()).unwrap();
        results.append(r2.clone()).unwrap();
        assert_eq!(results.list_all(), vec![r2, r1]);
    }

    #[test]
    fn insertion_order_not_date_order() {
        let results = ResultStore::new(Arc::new(MemoryStore::new()));
        let later = make_result("later.png", 1, 5);
        let earlier = make_result("earlier.png", 2, 0);
        results.append(later).unwrap();
        results.append(earlier).unwrap();
        let names: Vec<_> = results
            .list_all()
            .into_iter()
            .map(|r| r.image_file_name)
            .collect();
        assert_eq!(names, vec!["earlier.png", "later.png"]);
    }

    #[test]
    fn no_deduplication() {
        let results = ResultStore::new(Arc::new(MemoryStore::new()));
        let r = make_result("same.png", 50, 0);
        results.append(r.clone()).unwrap();
        results.append(r).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn malformed_history_reads_as_empty_and_recovers() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store.set(RESULTS_KEY, serde_json::json!("garbage")).unwrap();
        let results = ResultStore::new(store);
        assert!(results.is_empty());
        results.append(make_result("fresh.png", 3, 0)).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let results = Arc::new(ResultStore::new(Arc::new(MemoryStore::new())));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let results = Arc::clone(&results);
                std::thread::spawn(move || {
                    results
                        .append(make_result(&format!("{i}.png"), i, 0))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(results.len(), 8);
    }
}
