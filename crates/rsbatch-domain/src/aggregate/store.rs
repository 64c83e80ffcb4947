//! Write-once results store indexed by batch position.

use serde_json::{json, Value};

use crate::error::{ReferenceError, StoreError, StoreResult};

/// State of one batch position.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    /// The item has not finished yet.
    Unset,
    /// The item was dispatched; holds its final response body.
    Ok(Value),
    /// The item was not dispatched because a reference failed.
    Failed(ReferenceError),
}

/// Results of a batch, one slot per item.
///
/// Each slot is written at most once. Readers only see positions that were
/// written before them in scheduling order.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    slots: Vec<SlotState>,
}

impl ResultsStore {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![SlotState::Unset; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SlotState> {
        self.slots.get(index)
    }

    /// The response body at `index`, if that item was dispatched.
    pub fn result(&self, index: usize) -> Option<&Value> {
        match self.slots.get(index) {
            Some(SlotState::Ok(value)) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn write(&mut self, index: usize, state: SlotState) -> StoreResult<()> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(StoreError::SlotOutOfRange { index, len })?;

        if !matches!(slot, SlotState::Unset) {
            return Err(StoreError::SlotAlreadyWritten { index });
        }
        *slot = state;
        Ok(())
    }

    /// Converts every slot into its JSON form, in batch order.
    ///
    /// Failed slots become `{"code": ..., "message": ...}`; unset slots become `null`.
    pub fn into_values(self) -> Vec<Value> {
        self.slots
            .into_iter()
            .map(|slot| match slot {
                SlotState::Unset => Value::Null,
                SlotState::Ok(value) => value,
                SlotState::Failed(err) => json!({
                    "code": err.code(),
                    "message": err.to_string(),
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_unset() {
        let store = ResultsStore::new(3);
        assert_eq!(store.len(), 3);
        assert!((0..3).all(|i| store.get(i) == Some(&SlotState::Unset)));
        assert!(store.result(0).is_none());
    }

    #[test]
    fn test_write_once() {
        let mut store = ResultsStore::new(1);
        store.write(0, SlotState::Ok(json!({"id": 1}))).unwrap();
        assert_eq!(store.result(0), Some(&json!({"id": 1})));

        let err = store.write(0, SlotState::Ok(json!({}))).unwrap_err();
        assert_eq!(err, StoreError::SlotAlreadyWritten { index: 0 });
    }

    #[test]
    fn test_write_out_of_range() {
        let mut store = ResultsStore::new(2);
        let err = store.write(2, SlotState::Ok(json!({}))).unwrap_err();
        assert_eq!(err, StoreError::SlotOutOfRange { index: 2, len: 2 });
    }

    #[test]
    fn test_failed_slot_has_no_result() {
        let mut store = ResultsStore::new(1);
        store
            .write(0, SlotState::Failed(ReferenceError::MissingReference { index: 0 }))
            .unwrap();
        assert!(store.result(0).is_none());
    }

    #[test]
    fn test_into_values_shapes() {
        let mut store = ResultsStore::new(3);
        store.write(0, SlotState::Ok(json!([1, 2]))).unwrap();
        store
            .write(
                1,
                SlotState::Failed(ReferenceError::IllegalReferenceValue {
                    index: 0,
                    field: "name".to_string(),
                }),
            )
            .unwrap();

        let values = store.into_values();
        assert_eq!(values[0], json!([1, 2]));
        assert_eq!(values[1]["code"], "illegal_reference_value");
        assert!(values[1]["message"]
            .as_str()
            .unwrap()
            .contains("illegal characters"));
        assert_eq!(values[2], Value::Null);
    }
}
