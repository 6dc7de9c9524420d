//! Bounded table of the most frequent values of a path

use crate::value::{collate, Value};
use std::cmp::Ordering;

/// One frequent value and how many rows carry it
#[derive(Debug, Clone, PartialEq)]
pub struct TopNItem {
    pub key: Value,
    pub count: i64,
}

/// Keeps at most `capacity` items, highest count first
#[derive(Debug, Clone, PartialEq)]
pub struct TopNContainer {
    capacity: usize,
    items: Vec<TopNItem>,
}

impl TopNContainer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    /// Offers a value. It is inserted ahead of the first item with a
    /// strictly smaller count; ties keep the earlier item first. The
    /// smallest item falls off when the table is full.
    pub fn consider(&mut self, key: Value, count: i64) {
        if self.capacity == 0 {
            return;
        }
        match self.items.iter().position(|item| item.count < count) {
            Some(pos) => {
                self.items.insert(pos, TopNItem { key, count });
                self.items.truncate(self.capacity);
            }
            None if self.items.len() < self.capacity => {
                self.items.push(TopNItem { key, count });
            }
            None => {}
        }
    }

    /// Count recorded for a value equal to `key` under collation
    pub fn num_items_with_key(&self, key: &Value) -> Option<i64> {
        self.items
            .iter()
            .find(|item| collate(&item.key, key) == Ordering::Equal)
            .map(|item| item.count)
    }

    pub fn items(&self) -> &[TopNItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keeps_largest_counts() {
        let names = [
            "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy",
            "eleventh",
        ];
        let mut top = TopNContainer::new(10);
        for (i, name) in names.iter().enumerate() {
            top.consider(Value::from(*name), (i as i64 + 1) * 100);
        }

        assert_eq!(top.len(), 10);
        assert_eq!(top.items()[0].key, Value::from("eleventh"));
        assert_eq!(top.items()[0].count, 1100);
        assert_eq!(top.items()[9].key, Value::from("bob"));
        assert_eq!(top.items()[9].count, 200);
        assert_eq!(top.num_items_with_key(&Value::from("alice")), None);
    }

    #[test]
    fn test_small_value_ignored_when_full() {
        let mut top = TopNContainer::new(2);
        top.consider(Value::from(1.0), 5);
        top.consider(Value::from(2.0), 7);
        top.consider(Value::from(3.0), 1);

        assert_eq!(top.len(), 2);
        assert_eq!(top.items()[0].count, 7);
        assert_eq!(top.num_items_with_key(&Value::from(3.0)), None);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut top = TopNContainer::new(3);
        top.consider(Value::from("a"), 4);
        top.consider(Value::from("b"), 4);
        assert_eq!(top.items()[0].key, Value::from("a"));
        assert_eq!(top.items()[1].key, Value::from("b"));
    }

    #[test]
    fn test_lookup_uses_deep_equality() {
        let mut top = TopNContainer::new(3);
        top.consider(Value::from(json!({"a": [1, 2]})), 9);
        assert_eq!(top.num_items_with_key(&Value::from(json!({"a": [1, 2]}))), Some(9));
        assert_eq!(top.num_items_with_key(&Value::from(json!({"a": [1]}))), None);
    }
}
