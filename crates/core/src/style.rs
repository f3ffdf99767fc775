//! Property bags and the agreement fold used to summarize selections.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

/// Cell text style: CSS-like property names to JSON values.
pub type TextStyle = PropertyBag<String, serde_json::Value>;

/// An ordered map of named properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(
    serialize = "K: Serialize, V: Serialize",
    deserialize = "K: Ord + Deserialize<'de>, V: Deserialize<'de>"
))]
pub struct PropertyBag<K, V> {
    properties: BTreeMap<K, V>,
}

impl<K, V> Default for PropertyBag<K, V> {
    fn default() -> Self {
        Self { properties: BTreeMap::new() }
    }
}

impl<K: Ord, V> PropertyBag<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<K>, value: impl Into<V>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.properties.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.properties.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.properties.remove(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.properties.iter()
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq> PropertyBag<K, V> {
    /// Properties every bag that sets them agrees on.
    ///
    /// A bag that doesn't set a property has no say on it; one disagreement
    /// drops the property for good.
    pub fn agreement<'a, I>(bags: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        K: 'a,
        V: 'a,
    {
        let mut fold = PropertyAgreement::new();
        for bag in bags {
            fold.observe(bag);
        }
        fold.finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for PropertyBag<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { properties: iter.into_iter().collect() }
    }
}

impl<'a, K, V> IntoIterator for &'a PropertyBag<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = btree_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

#[derive(Debug, Clone)]
enum Vote<V> {
    Agreed(V),
    Conflict,
}

/// Running property-wise agreement over any number of bags.
#[derive(Debug, Clone)]
pub struct PropertyAgreement<K, V> {
    votes: BTreeMap<K, Vote<V>>,
}

impl<K, V> Default for PropertyAgreement<K, V> {
    fn default() -> Self {
        Self { votes: BTreeMap::new() }
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq> PropertyAgreement<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, bag: &PropertyBag<K, V>) {
        for (key, value) in bag {
            match self.votes.entry(key.clone()) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(Vote::Agreed(value.clone()));
                }
                btree_map::Entry::Occupied(mut slot) => {
                    if matches!(slot.get(), Vote::Agreed(existing) if existing != value) {
                        slot.insert(Vote::Conflict);
                    }
                }
            }
        }
    }

    pub fn finish(self) -> PropertyBag<K, V> {
        self.votes
            .into_iter()
            .filter_map(|(key, vote)| match vote {
                Vote::Agreed(value) => Some((key, value)),
                Vote::Conflict => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn style(pairs: &[(&str, &str)]) -> TextStyle {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_agreement_drops_only_conflicts() {
        let a = style(&[("color", "#111"), ("text-align", "left")]);
        let b = style(&[("color", "#111"), ("text-align", "right")]);

        let summary = TextStyle::agreement([&a, &b]);
        assert_eq!(summary, style(&[("color", "#111")]));
    }

    #[test]
    fn test_missing_property_does_not_veto() {
        let a = style(&[("color", "#111")]);
        let b = style(&[("color", "#111"), ("font-weight", "bold")]);

        let summary = TextStyle::agreement([&a, &b]);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.get(&"font-weight".to_string()), Some(&json!("bold")));
    }

    #[test]
    fn test_conflict_is_sticky() {
        let a = style(&[("color", "#111")]);
        let b = style(&[("color", "#222")]);
        let c = style(&[("color", "#111")]);

        assert!(TextStyle::agreement([&a, &b, &c]).is_empty());
    }

    #[test]
    fn test_agreement_of_nothing_is_empty() {
        let bags: Vec<TextStyle> = Vec::new();
        assert!(TextStyle::agreement(&bags).is_empty());
    }

    #[test]
    fn test_generic_over_keys_and_values() {
        let a: PropertyBag<u8, bool> = PropertyBag::new().with(1u8, true).with(2u8, false);
        let b: PropertyBag<u8, bool> = PropertyBag::new().with(1u8, true).with(2u8, true);
        let summary = PropertyBag::agreement([&a, &b]);
        assert_eq!(summary, PropertyBag::new().with(1u8, true));
    }

    #[test]
    fn test_serde_transparent() {
        let a = style(&[("color", "#111")]);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!({"color": "#111"}));
    }
}
