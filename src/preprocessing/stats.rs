//! Mode and rounding helpers for the fill steps

use std::collections::HashMap;
use std::hash::Hash;

/// Most frequent value; ties resolve to the smallest value
pub fn mode<T, I>(values: I) -> Option<T>
where
    T: Clone + Eq + Hash + Ord,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
        .map(|(v, _)| v)
}

/// Mode of a float sequence, keyed on the bit pattern
pub fn mode_f64<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    mode(values.into_iter().filter(|v| !v.is_nan()).map(OrderedBits::from)).map(|b| b.value())
}

/// Round half to even
pub fn round_half_even(x: f64) -> f64 {
    x.round_ties_even()
}

/// Total-order wrapper so floats can be hashed and compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderedBits(u64);

impl OrderedBits {
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl From<f64> for OrderedBits {
    fn from(v: f64) -> Self {
        // Fold -0.0 into 0.0 so both land in one group
        let v = if v == 0.0 { 0.0 } else { v };
        OrderedBits(v.to_bits())
    }
}

impl PartialOrd for OrderedBits {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedBits {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value().total_cmp(&other.value())
    }
}
