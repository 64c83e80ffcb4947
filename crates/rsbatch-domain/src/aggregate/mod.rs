//! Per-batch result accumulation.
//!
//! A [`BatchAggregate`] is created for one batch, written as each item
//! finishes, and consumed to build the response. It is never shared between
//! batches.

mod store;

pub use store::{ResultsStore, SlotState};

use serde::Serialize;
use serde_json::Value;

use crate::error::{ReferenceError, StoreResult};

/// Occurrence count for one HTTP error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailureCode {
    pub code: u16,
    pub count: u64,
}

/// Results, success count and error tally for one batch.
#[derive(Debug, Clone)]
pub struct BatchAggregate {
    store: ResultsStore,
    success: u64,
    failure_codes: Vec<FailureCode>,
}

impl BatchAggregate {
    /// Creates an empty aggregate for a batch of `len` items.
    pub fn new(len: usize) -> Self {
        Self {
            store: ResultsStore::new(len),
            success: 0,
            failure_codes: Vec::new(),
        }
    }

    /// Records the final response of a dispatched item.
    ///
    /// A status of 400 or above is tallied under its code; anything else
    /// counts as a success.
    pub fn record_response(&mut self, index: usize, status: u16, result: Value) -> StoreResult<()> {
        self.store.write(index, SlotState::Ok(result))?;

        if status >= 400 {
            self.tally_failure(status);
        } else {
            self.success += 1;
        }
        Ok(())
    }

    /// Records an item that could not be dispatched because a reference failed.
    ///
    /// Neither the success count nor the failure codes change.
    pub fn record_reference_error(&mut self, index: usize, error: ReferenceError) -> StoreResult<()> {
        self.store.write(index, SlotState::Failed(error))
    }

    fn tally_failure(&mut self, code: u16) {
        match self.failure_codes.iter_mut().find(|entry| entry.code == code) {
            Some(entry) => entry.count += 1,
            None => self.failure_codes.push(FailureCode { code, count: 1 }),
        }
    }

    pub fn store(&self) -> &ResultsStore {
        &self.store
    }

    pub fn success(&self) -> u64 {
        self.success
    }

    /// Failure codes in the order they were first seen.
    pub fn failure_codes(&self) -> &[FailureCode] {
        &self.failure_codes
    }

    /// Consumes the aggregate, returning the success count, the failure
    /// codes and the per-item results in batch order.
    pub fn finish(self) -> (u64, Vec<FailureCode>, Vec<Value>) {
        (self.success, self.failure_codes, self.store.into_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde_json::json;

    #[test]
    fn test_success_and_failure_classification() {
        let mut aggregate = BatchAggregate::new(4);
        aggregate.record_response(0, 200, json!({"ok": true})).unwrap();
        aggregate.record_response(1, 302, json!(null)).unwrap();
        aggregate.record_response(2, 404, json!({"error": "Not Found"})).unwrap();
        aggregate.record_response(3, 399, json!("fine")).unwrap();

        assert_eq!(aggregate.success(), 3);
        assert_eq!(aggregate.failure_codes(), &[FailureCode { code: 404, count: 1 }]);
    }

    #[test]
    fn test_repeated_code_tallied_once() {
        let mut aggregate = BatchAggregate::new(5);
        for index in 0..5 {
            aggregate.record_response(index, 404, json!({})).unwrap();
        }

        assert_eq!(aggregate.success(), 0);
        assert_eq!(aggregate.failure_codes(), &[FailureCode { code: 404, count: 5 }]);
    }

    #[test]
    fn test_failure_codes_keep_first_seen_order() {
        let mut aggregate = BatchAggregate::new(5);
        aggregate.record_response(0, 500, json!({})).unwrap();
        aggregate.record_response(1, 404, json!({})).unwrap();
        aggregate.record_response(2, 500, json!({})).unwrap();
        aggregate.record_response(3, 403, json!({})).unwrap();
        aggregate.record_response(4, 404, json!({})).unwrap();

        let codes: Vec<(u16, u64)> = aggregate
            .failure_codes()
            .iter()
            .map(|entry| (entry.code, entry.count))
            .collect();
        assert_eq!(codes, vec![(500, 2), (404, 2), (403, 1)]);
    }

    #[test]
    fn test_reference_error_is_not_counted() {
        let mut aggregate = BatchAggregate::new(2);
        aggregate.record_response(0, 200, json!({"id": "1"})).unwrap();
        aggregate
            .record_reference_error(1, ReferenceError::MissingReference { index: 0 })
            .unwrap();

        assert_eq!(aggregate.success(), 1);
        assert!(aggregate.failure_codes().is_empty());
        assert!(matches!(
            aggregate.store().get(1),
            Some(SlotState::Failed(ReferenceError::MissingReference { index: 0 }))
        ));
    }

    #[test]
    fn test_double_write_does_not_change_counts() {
        let mut aggregate = BatchAggregate::new(1);
        aggregate.record_response(0, 200, json!({})).unwrap();
        let err = aggregate.record_response(0, 500, json!({})).unwrap_err();

        assert_eq!(err, StoreError::SlotAlreadyWritten { index: 0 });
        assert_eq!(aggregate.success(), 1);
        assert!(aggregate.failure_codes().is_empty());
    }

    #[test]
    fn test_finish_returns_results_in_batch_order() {
        let mut aggregate = BatchAggregate::new(3);
        aggregate.record_response(2, 200, json!("third")).unwrap();
        aggregate.record_response(0, 200, json!("first")).unwrap();
        aggregate
            .record_reference_error(
                1,
                ReferenceError::ReferenceNotFound {
                    index: 0,
                    field: "id".to_string(),
                },
            )
            .unwrap();

        let (success, failure_codes, results) = aggregate.finish();
        assert_eq!(success, 2);
        assert!(failure_codes.is_empty());
        assert_eq!(results[0], json!("first"));
        assert_eq!(results[1]["code"], "reference_not_found");
        assert_eq!(results[2], json!("third"));
    }

    #[test]
    fn test_failure_code_serializes_as_code_and_count() {
        let value = serde_json::to_value(FailureCode { code: 404, count: 3 }).unwrap();
        assert_eq!(value, json!({"code": 404, "count": 3}));
    }
}
