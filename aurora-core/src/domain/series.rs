//! Observation series: an ordered, duplicate-free sequence of keyed rows.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DataError;
use crate::validate;

/// A row with a chronological key (calendar day or timestamp).
pub trait Observation {
    type Key: Ord + Copy + fmt::Display;

    fn key(&self) -> Self::Key;
}

/// Rows keyed by a strictly increasing key.
///
/// The invariant is established at construction and cannot be broken through
/// the public API: rows are only ever removed, never reordered or inserted.
/// Serializes as a plain list of rows; deserializing re-checks the ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Series<T> {
    rows: Vec<T>,
}

impl<T: Observation> Series<T> {
    /// Wrap rows that are already in strictly increasing key order.
    pub fn new(rows: Vec<T>) -> Result<Self, DataError> {
        validate::require_strictly_increasing(rows.iter().map(Observation::key))?;
        Ok(Self { rows })
    }

    /// Stable-sort by key and drop duplicate keys (first occurrence wins).
    pub fn canonical(rows: Vec<T>) -> Self {
        let (rows, _) = validate::canonicalize(rows);
        Self { rows }
    }

    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.rows.last()
    }

    pub fn keys(&self) -> impl Iterator<Item = T::Key> + '_ {
        self.rows.iter().map(Observation::key)
    }

    /// Keep rows matching `keep`, preserving order.
    pub fn filter(mut self, keep: impl FnMut(&T) -> bool) -> Self {
        self.rows.retain(keep);
        self
    }

    /// Keep only the last `n` rows.
    pub fn tail(mut self, n: usize) -> Self {
        let skip = self.rows.len().saturating_sub(n);
        self.rows.drain(..skip);
        self
    }
}

impl<T: Serialize> Serialize for Series<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Series<T>
where
    T: Deserialize<'de> + Observation,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<T>::deserialize(deserializer)?;
        Series::new(rows).map_err(serde::de::Error::custom)
    }
}

impl<T> IntoIterator for Series<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Series<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    struct Obs {
        t: i64,
        v: f32,
    }

    impl Observation for Obs {
        type Key = i64;

        fn key(&self) -> i64 {
            self.t
        }
    }

    fn obs(t: i64, v: f32) -> Obs {
        Obs { t, v }
    }

    #[test]
    fn new_accepts_sorted_rows() {
        let s = Series::new(vec![obs(1, 1.0), obs(2, 2.0), obs(5, 3.0)]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.keys().collect::<Vec<_>>(), vec![1, 2, 5]);
    }

    #[test]
    fn new_rejects_duplicates_and_disorder() {
        assert!(matches!(
            Series::new(vec![obs(1, 1.0), obs(1, 2.0)]),
            Err(DataError::Validation(_))
        ));
        assert!(Series::new(vec![obs(2, 1.0), obs(1, 2.0)]).is_err());
    }

    #[test]
    fn canonical_sorts_and_keeps_first_duplicate() {
        let s = Series::canonical(vec![obs(3, 3.0), obs(1, 1.0), obs(3, 9.0), obs(2, 2.0)]);
        assert_eq!(s.keys().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(s.last().unwrap().v, 3.0);
    }

    #[test]
    fn tail_and_filter_preserve_order() {
        let s = Series::canonical((0..10).map(|t| obs(t, t as f32)).collect());
        let tail = s.clone().tail(3);
        assert_eq!(tail.keys().collect::<Vec<_>>(), vec![7, 8, 9]);

        let even = s.filter(|o| o.t % 2 == 0);
        assert_eq!(even.keys().collect::<Vec<_>>(), vec![0, 2, 4, 6, 8]);

        let short = Series::canonical(vec![obs(1, 1.0)]).tail(7);
        assert_eq!(short.len(), 1);
    }

    #[test]
    fn deserialize_rechecks_ordering() {
        let s = Series::canonical(vec![obs(1, 1.0), obs(2, 2.0)]);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.starts_with('['));
        let back: Series<Obs> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);

        let unordered = r#"[{"t": 2, "v": 1.0}, {"t": 1, "v": 2.0}]"#;
        assert!(serde_json::from_str::<Series<Obs>>(unordered).is_err());
        let duplicated = r#"[{"t": 1, "v": 1.0}, {"t": 1, "v": 2.0}]"#;
        assert!(serde_json::from_str::<Series<Obs>>(duplicated).is_err());
    }
}
