use super::SmgValue;
use crate::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// A symmetric, dynamic relation collecting pairs of values known to be distinct.
///
/// The analysis queries the relation to avoid merging values that provably differ,
/// e.g. to justify that two pointers cannot alias.
/// If `(a, b)` is in the relation then so is `(b, a)`; self-pairs never occur.
/// The relation is *not* transitively closed:
/// `a != b` and `b != c` say nothing about `a` and `c`.
///
/// The relation is owned by the graph and mutated only through it.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct NeqRelation {
    relations: BTreeMap<SmgValue, BTreeSet<SmgValue>>,
}

impl NeqRelation {
    /// Create an empty relation.
    pub fn new() -> NeqRelation {
        NeqRelation::default()
    }

    /// Record that two values are distinct.
    /// Inserts both orientations; a no-op if the pair is already related
    /// or if both arguments are the same value.
    pub fn add_relation(&mut self, first: SmgValue, second: SmgValue) {
        if first == second {
            return;
        }
        self.relations.entry(first).or_default().insert(second);
        self.relations.entry(second).or_default().insert(first);
    }

    /// Remove the pair from the relation, in both orientations.
    pub fn remove_relation(&mut self, first: SmgValue, second: SmgValue) {
        self.remove_one_sided(first, second);
        self.remove_one_sided(second, first);
    }

    fn remove_one_sided(&mut self, from: SmgValue, to: SmgValue) {
        if let Some(partners) = self.relations.get_mut(&from) {
            partners.remove(&to);
            if partners.is_empty() {
                self.relations.remove(&from);
            }
        }
    }

    /// Purge a value from the relation:
    /// drop its own entry and remove it from every counterpart's entry.
    pub fn remove_value(&mut self, value: SmgValue) {
        if let Some(partners) = self.relations.remove(&value) {
            for partner in partners {
                self.remove_one_sided(partner, value);
            }
        }
    }

    /// Re-home every pair involving `discarded` onto `kept`,
    /// skipping pairs that would relate `kept` to itself.
    /// Used when two abstract values are identified with each other.
    pub fn merge_values(&mut self, kept: SmgValue, discarded: SmgValue) {
        if kept == discarded {
            return;
        }
        let partners = match self.relations.remove(&discarded) {
            Some(partners) => partners,
            None => return,
        };
        for partner in partners {
            self.remove_one_sided(partner, discarded);
            if partner != kept {
                self.add_relation(kept, partner);
            }
        }
    }

    /// Returns true if the two values are known to be distinct.
    pub fn relation_exists(&self, first: SmgValue, second: SmgValue) -> bool {
        self.relations
            .get(&first)
            .map_or(false, |partners| partners.contains(&second))
    }

    /// The values known to be distinct from `value`,
    /// as an owned snapshot rather than a live view.
    pub fn neqs_of(&self, value: SmgValue) -> BTreeSet<SmgValue> {
        self.relations.get(&value).cloned().unwrap_or_default()
    }

    /// Returns true if no pair is recorded at all.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(id: u64) -> SmgValue {
        SmgValue::new(id)
    }

    #[test]
    fn relation_is_symmetric() {
        let mut neq = NeqRelation::new();
        neq.add_relation(value(1), value(2));
        assert!(neq.relation_exists(value(1), value(2)));
        assert!(neq.relation_exists(value(2), value(1)));
        neq.remove_relation(value(2), value(1));
        assert!(!neq.relation_exists(value(1), value(2)));
        assert!(neq.is_empty());
    }

    #[test]
    fn self_pairs_are_ignored() {
        let mut neq = NeqRelation::new();
        neq.add_relation(value(1), value(1));
        assert!(neq.is_empty());
    }

    #[test]
    fn remove_value_purges_both_sides() {
        let mut neq = NeqRelation::new();
        neq.add_relation(value(1), value(2));
        neq.add_relation(value(1), value(3));
        neq.remove_value(value(1));
        assert!(neq.is_empty());
    }

    #[test]
    fn merge_rehomes_pairs_onto_the_kept_value() {
        let mut neq = NeqRelation::new();
        neq.add_relation(value(2), value(3));
        neq.add_relation(value(2), value(4));
        neq.merge_values(value(1), value(2));
        assert!(neq.relation_exists(value(1), value(3)));
        assert!(neq.relation_exists(value(1), value(4)));
        assert!(!neq.relation_exists(value(2), value(3)));
        assert_eq!(neq.neqs_of(value(2)), BTreeSet::new());
    }

    #[test]
    fn merge_never_relates_the_kept_value_to_itself() {
        let mut neq = NeqRelation::new();
        neq.add_relation(value(1), value(2));
        neq.merge_values(value(1), value(2));
        assert!(!neq.relation_exists(value(1), value(1)));
        assert!(neq.neqs_of(value(1)).is_empty());
    }

    #[test]
    fn neqs_of_returns_a_snapshot() {
        let mut neq = NeqRelation::new();
        neq.add_relation(value(1), value(2));
        let snapshot = neq.neqs_of(value(1));
        neq.add_relation(value(1), value(3));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(neq.neqs_of(value(1)).len(), 2);
    }
}
