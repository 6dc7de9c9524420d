//! Collation: the single total order over document values
//!
//! Kinds order as:
//!
//! ```text
//! null < false < true < number < string < array < object
//! ```
//!
//! Within a kind:
//! - numbers compare numerically; NaN sorts above every other number
//! - strings compare by code point
//! - arrays compare element by element, a shorter prefix sorts first
//! - objects compare by entry count, then by sorted (key, value) pairs
//!
//! Comparison operators, sorting and index range construction all use this
//! order, so it must stay total and stable.

use std::cmp::Ordering;

use super::Value;

/// Position of a value's kind in the collation order. Booleans occupy two
/// slots so that `false < true` needs no further tie-breaking.
fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Compares two values under collation
pub fn collate(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (rank(a), rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.partial_cmp(y).unwrap_or_else(|| x.total_cmp(y))
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = collate(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            let ord = x.len().cmp(&y.len());
            if ord != Ordering::Equal {
                return ord;
            }
            for ((ka, va), (kb, vb)) in x.iter().zip(y.iter()) {
                let ord = ka.cmp(kb).then_with(|| collate(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}

/// Compares two values under collation, returning -1, 0 or 1
pub fn compare(a: &Value, b: &Value) -> i32 {
    match collate(a, b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}
