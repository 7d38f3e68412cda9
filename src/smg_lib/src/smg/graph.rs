use super::{
    HasValueEdge, HasValueEdgeFilter, NeqRelation, ObjectId, PointsToEdge, SmgObject, SmgValue,
};
use crate::prelude::*;
use crate::utils::debug::ToJsonCompact;
use std::collections::{BTreeMap, BTreeSet};

/// The base symbolic memory graph.
///
/// The graph owns its objects, values and edges exclusively.
/// Mutation primitives perform exactly the bookkeeping they name and nothing else:
/// no operation repairs invariants on behalf of the caller,
/// and consistency is verified out-of-band by [`consistency::verify`](super::consistency::verify).
///
/// Cloning the graph is the supported way to branch analysis state.
/// A clone shares no mutable collection with its source;
/// only the immutable object identities behind their `Arc`s are shared.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Smg {
    objects: BTreeSet<SmgObject>,
    values: BTreeSet<SmgValue>,
    hv_edges: BTreeSet<HasValueEdge>,
    pt_edges: BTreeMap<SmgValue, PointsToEdge>,
    validity: BTreeMap<ObjectId, bool>,
    neq: NeqRelation,
    machine_model: MachineModel,
}

impl Smg {
    /// Create the canonical empty graph for the given machine:
    /// it contains exactly the null object (invalid, size 0), the null value
    /// and the points-to edge joining them.
    pub fn new(machine_model: MachineModel) -> Smg {
        let null_object = SmgObject::null_object();
        let null_value = SmgValue::null_value();
        let mut smg = Smg {
            objects: BTreeSet::new(),
            values: BTreeSet::new(),
            hv_edges: BTreeSet::new(),
            pt_edges: BTreeMap::new(),
            validity: BTreeMap::new(),
            neq: NeqRelation::new(),
            machine_model,
        };
        smg.validity.insert(null_object.id(), false);
        smg.pt_edges.insert(
            null_value,
            PointsToEdge::new(null_value, null_object.clone(), 0),
        );
        smg.objects.insert(null_object);
        smg.values.insert(null_value);
        smg
    }

    /// The machine model the graph was constructed with.
    pub fn machine_model(&self) -> &MachineModel {
        &self.machine_model
    }

    /// The designated null object.
    pub fn null_object(&self) -> SmgObject {
        SmgObject::null_object()
    }

    /// The designated null value.
    pub fn null_value(&self) -> SmgValue {
        SmgValue::null_value()
    }

    /// Insert an object into the graph as valid.
    /// The caller must not insert the same object twice.
    pub fn add_object(&mut self, object: SmgObject) {
        self.add_object_with_validity(object, true);
    }

    /// Insert an object into the graph and set its validity.
    /// The caller must not insert the same object twice.
    pub fn add_object_with_validity(&mut self, object: SmgObject, validity: bool) {
        debug_assert!(
            !self.objects.contains(&object),
            "object {} is already part of the graph",
            object
        );
        self.validity.insert(object.id(), validity);
        self.objects.insert(object);
    }

    /// Remove the object from the object set and drop its validity entry.
    ///
    /// Edges referencing the object are deliberately left in place;
    /// removing them is the caller's responsibility.
    /// Use [`remove_object_and_edges`](Self::remove_object_and_edges)
    /// for the removal that cannot dangle.
    pub fn remove_object(&mut self, object: &SmgObject) {
        self.objects.remove(object);
        self.validity.remove(&object.id());
    }

    /// Remove the object together with every has-value edge leaving it
    /// and every points-to edge targeting it.
    pub fn remove_object_and_edges(&mut self, object: &SmgObject) {
        self.hv_edges.retain(|edge| edge.object() != object);
        self.pt_edges.retain(|_value, edge| edge.object() != object);
        self.remove_object(object);
    }

    /// Insert a value into the value set.
    pub fn add_value(&mut self, value: SmgValue) {
        self.values.insert(value);
    }

    /// Remove a value from the value set and purge it from the inequality relation.
    ///
    /// Edges referencing the value are left untouched;
    /// this asymmetry with object removal is intentional.
    pub fn remove_value(&mut self, value: &SmgValue) {
        self.values.remove(value);
        self.neq.remove_value(*value);
    }

    /// Insert a has-value edge. Set semantics: inserting an edge twice is a no-op.
    pub fn add_has_value_edge(&mut self, edge: HasValueEdge) {
        self.hv_edges.insert(edge);
    }

    /// Remove a has-value edge by structural equality.
    pub fn remove_has_value_edge(&mut self, edge: &HasValueEdge) {
        self.hv_edges.remove(edge);
    }

    /// Insert a points-to edge, replacing any prior edge for the same source value.
    /// This is where the at-most-one-target invariant is maintained.
    pub fn add_points_to_edge(&mut self, edge: PointsToEdge) {
        self.pt_edges.insert(edge.value(), edge);
    }

    /// Remove the points-to edge of the given value, if one exists.
    pub fn remove_points_to_edge(&mut self, value: &SmgValue) {
        self.pt_edges.remove(value);
    }

    /// The points-to edge of the given value, if one exists.
    pub fn points_to_edge(&self, value: &SmgValue) -> Option<&PointsToEdge> {
        self.pt_edges.get(value)
    }

    /// Set the validity of an object.
    /// Returns an error if the object is not part of the graph.
    pub fn set_validity(&mut self, object: &SmgObject, validity: bool) -> Result<(), Error> {
        if !self.objects.contains(object) {
            return Err(anyhow!("object {} is not part of the graph", object));
        }
        self.validity.insert(object.id(), validity);
        Ok(())
    }

    /// Query the validity of an object.
    /// Returns an error if the object is not part of the graph.
    pub fn is_object_valid(&self, object: &SmgObject) -> Result<bool, Error> {
        self.validity
            .get(&object.id())
            .copied()
            .ok_or_else(|| anyhow!("object {} is not part of the graph", object))
    }

    /// Identify two abstract values with each other.
    ///
    /// If either value is the null value, null survives;
    /// otherwise the first argument survives.
    /// Every has-value edge carrying the discarded value is rewritten to the survivor,
    /// the inequality relation of the discarded value is merged onto the survivor
    /// and the discarded value is removed from the value set.
    /// A no-op if both arguments are the same value.
    ///
    /// The merge policy does not rewrite points-to edges,
    /// so the discarded value must not be a pointer.
    pub fn merge_values(&mut self, first: SmgValue, second: SmgValue) {
        if first == second {
            return;
        }
        let (kept, discarded) = if second.is_null() {
            (second, first)
        } else {
            (first, second)
        };
        debug_assert!(
            !self.pt_edges.contains_key(&discarded),
            "cannot merge away the pointer value {}",
            discarded
        );
        let rewritten: Vec<HasValueEdge> = self
            .hv_edges
            .iter()
            .filter(|edge| edge.value() == discarded)
            .cloned()
            .collect();
        for edge in rewritten {
            self.hv_edges.remove(&edge);
            self.hv_edges.insert(HasValueEdge::new(
                edge.object().clone(),
                edge.offset(),
                edge.ctype().clone(),
                kept,
            ));
        }
        self.neq.merge_values(kept, discarded);
        self.values.remove(&discarded);
    }

    /// The object a value points to, or `None` if the value has no points-to edge.
    /// Returns an error if the value is not part of the graph.
    pub fn object_pointed_by(&self, value: &SmgValue) -> Result<Option<SmgObject>, Error> {
        if !self.values.contains(value) {
            return Err(anyhow!("value {} is not part of the graph", value));
        }
        Ok(self.pt_edges.get(value).map(|edge| edge.object().clone()))
    }

    /// Returns true if the value has a points-to edge.
    pub fn is_pointer(&self, value: &SmgValue) -> bool {
        self.pt_edges.contains_key(value)
    }

    /// The byte offsets within the object that are provably null-valued,
    /// derived from the has-value edges carrying the null value.
    pub fn null_bytes_for_object(&self, object: &SmgObject) -> BTreeSet<i64> {
        let filter = HasValueEdgeFilter::new()
            .for_object(object.clone())
            .with_value(SmgValue::null_value());
        let mut null_bytes = BTreeSet::new();
        for edge in filter.filter(self) {
            null_bytes.extend(edge.covered_bytes());
        }
        null_bytes
    }

    /// Returns true if every byte in `[offset, offset + size)` within the object
    /// is covered by a null-valued has-value edge.
    /// Models "the remaining region is known to be zeroed",
    /// e.g. for reads past the last explicit initializer.
    pub fn is_covered_by_nullified_blocks(
        &self,
        object: &SmgObject,
        offset: i64,
        size: ByteSize,
    ) -> bool {
        let null_bytes = self.null_bytes_for_object(object);
        (offset..offset + u64::from(size) as i64).all(|byte| null_bytes.contains(&byte))
    }

    /// Record that two values are distinct.
    pub fn add_neq_relation(&mut self, first: SmgValue, second: SmgValue) {
        self.neq.add_relation(first, second);
    }

    /// Drop the record that two values are distinct.
    pub fn remove_neq_relation(&mut self, first: SmgValue, second: SmgValue) {
        self.neq.remove_relation(first, second);
    }

    /// Returns true if the two values are known to be distinct.
    pub fn values_known_distinct(&self, first: SmgValue, second: SmgValue) -> bool {
        self.neq.relation_exists(first, second)
    }

    /// Read access to the value-inequality relation.
    pub fn neq_relation(&self) -> &NeqRelation {
        &self.neq
    }

    /// The objects of the graph.
    pub fn objects(&self) -> &BTreeSet<SmgObject> {
        &self.objects
    }

    /// The values of the graph.
    pub fn values(&self) -> &BTreeSet<SmgValue> {
        &self.values
    }

    /// The has-value edges of the graph.
    pub fn has_value_edges(&self) -> &BTreeSet<HasValueEdge> {
        &self.hv_edges
    }

    /// An iterator over the points-to edges of the graph.
    pub fn points_to_edges(&self) -> impl Iterator<Item = &PointsToEdge> {
        self.pt_edges.values()
    }

    /// The validity entries of the graph, keyed by object identity.
    /// Exposed for the consistency verifier.
    pub fn validity_entries(&self) -> &BTreeMap<ObjectId, bool> {
        &self.validity
    }
}

impl ToJsonCompact for Smg {
    fn to_json_compact(&self) -> serde_json::Value {
        serde_json::json!({
            "objects": self
                .objects
                .iter()
                .map(|object| format!("{}", object))
                .collect::<Vec<_>>(),
            "values": self
                .values
                .iter()
                .map(|value| format!("{}", value))
                .collect::<Vec<_>>(),
            "has_value_edges": self
                .hv_edges
                .iter()
                .map(|edge| format!("{}", edge))
                .collect::<Vec<_>>(),
            "points_to_edges": self
                .pt_edges
                .values()
                .map(|edge| format!("{}", edge))
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::IdSequence;
    use super::*;

    fn new_smg() -> (Smg, IdSequence) {
        (Smg::new(MachineModel::lp64()), IdSequence::new())
    }

    fn int_type() -> CType {
        CType::int_type(&MachineModel::lp64())
    }

    fn region(ids: &mut IdSequence, size: u64, label: &str) -> SmgObject {
        SmgObject::new(ids.next_object_id(), ByteSize::new(size), label)
    }

    #[test]
    fn fresh_graph_contains_the_null_triple() {
        let (smg, _) = new_smg();
        assert_eq!(smg.objects().len(), 1);
        assert_eq!(smg.values().len(), 1);
        assert!(smg.has_value_edges().is_empty());
        let null_target = smg.object_pointed_by(&smg.null_value()).unwrap().unwrap();
        assert!(null_target.is_null());
        assert_eq!(null_target.size(), ByteSize::new(0));
        assert_eq!(smg.is_object_valid(&smg.null_object()).unwrap(), false);
    }

    #[test]
    fn validity_queries_fail_on_unknown_objects() {
        let (mut smg, mut ids) = new_smg();
        let stranger = region(&mut ids, 8, "x");
        assert!(smg.is_object_valid(&stranger).is_err());
        assert!(smg.set_validity(&stranger, false).is_err());
        smg.add_object(stranger.clone());
        assert_eq!(smg.is_object_valid(&stranger).unwrap(), true);
        smg.set_validity(&stranger, false).unwrap();
        assert_eq!(smg.is_object_valid(&stranger).unwrap(), false);
    }

    #[test]
    fn remove_object_leaves_edges_dangling() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let value = SmgValue::new(1);
        smg.add_object(object.clone());
        smg.add_value(value);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), value));
        smg.remove_object(&object);
        assert!(!smg.objects().contains(&object));
        assert_eq!(smg.has_value_edges().len(), 1);
    }

    #[test]
    fn remove_object_and_edges_is_edge_complete() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let other = region(&mut ids, 8, "y");
        let value = SmgValue::new(1);
        let address = SmgValue::new(2);
        smg.add_object(object.clone());
        smg.add_object(other.clone());
        smg.add_value(value);
        smg.add_value(address);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), value));
        smg.add_has_value_edge(HasValueEdge::new(other.clone(), 0, int_type(), value));
        smg.add_points_to_edge(PointsToEdge::new(address, object.clone(), 0));

        smg.remove_object_and_edges(&object);
        assert!(smg
            .has_value_edges()
            .iter()
            .all(|edge| edge.object() != &object));
        assert!(smg.points_to_edges().all(|edge| edge.object() != &object));
        assert_eq!(smg.has_value_edges().len(), 1);
        assert!(smg.is_object_valid(&object).is_err());
    }

    #[test]
    fn points_to_edges_are_keyed_by_source_value() {
        let (mut smg, mut ids) = new_smg();
        let first = region(&mut ids, 8, "x");
        let second = region(&mut ids, 8, "y");
        let address = SmgValue::new(1);
        smg.add_object(first.clone());
        smg.add_object(second.clone());
        smg.add_value(address);
        smg.add_points_to_edge(PointsToEdge::new(address, first, 0));
        smg.add_points_to_edge(PointsToEdge::new(address, second.clone(), 4));
        assert_eq!(smg.points_to_edge(&address).unwrap().object(), &second);
        assert_eq!(smg.points_to_edge(&address).unwrap().offset(), 4);
        assert!(smg.is_pointer(&address));
        smg.remove_points_to_edge(&address);
        assert!(!smg.is_pointer(&address));
    }

    #[test]
    fn object_pointed_by_distinguishes_absence_from_contract_breach() {
        let (mut smg, _) = new_smg();
        let value = SmgValue::new(1);
        assert!(smg.object_pointed_by(&value).is_err());
        smg.add_value(value);
        assert!(smg.object_pointed_by(&value).unwrap().is_none());
    }

    #[test]
    fn merge_values_rewrites_edges_and_rehomes_inequalities() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let kept = SmgValue::new(1);
        let discarded = SmgValue::new(2);
        let distinct = SmgValue::new(3);
        smg.add_object(object.clone());
        smg.add_value(kept);
        smg.add_value(discarded);
        smg.add_value(distinct);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), discarded));
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 4, int_type(), discarded));
        smg.add_neq_relation(discarded, distinct);

        smg.merge_values(kept, discarded);
        assert!(!smg.values().contains(&discarded));
        assert!(smg
            .has_value_edges()
            .iter()
            .all(|edge| edge.value() == kept));
        assert_eq!(smg.has_value_edges().len(), 2);
        assert!(smg.values_known_distinct(kept, distinct));
        assert!(!smg.values_known_distinct(discarded, distinct));
    }

    #[test]
    fn merge_values_keeps_null_as_survivor() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let value = SmgValue::new(1);
        smg.add_object(object.clone());
        smg.add_value(value);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), value));

        smg.merge_values(value, SmgValue::null_value());
        assert!(!smg.values().contains(&value));
        assert!(smg.values().contains(&SmgValue::null_value()));
        let edge = smg.has_value_edges().iter().next().unwrap();
        assert!(edge.value().is_null());
    }

    #[test]
    fn merge_values_is_idempotent_on_equal_arguments() {
        let (mut smg, _) = new_smg();
        let value = SmgValue::new(1);
        smg.add_value(value);
        let before = smg.clone();
        smg.merge_values(value, value);
        assert_eq!(smg, before);
    }

    #[test]
    fn remove_value_purges_the_inequality_relation() {
        let (mut smg, _) = new_smg();
        let first = SmgValue::new(1);
        let second = SmgValue::new(2);
        smg.add_value(first);
        smg.add_value(second);
        smg.add_neq_relation(first, second);
        smg.remove_value(&first);
        assert!(!smg.values_known_distinct(first, second));
        assert!(smg.neq_relation().is_empty());
    }

    #[test]
    fn null_byte_coverage() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 16, "buf");
        smg.add_object(object.clone());
        // Bytes [0, 8) are zeroed via a long, bytes [8, 12) via an int.
        smg.add_has_value_edge(HasValueEdge::new(
            object.clone(),
            0,
            CType::long_type(&MachineModel::lp64()),
            SmgValue::null_value(),
        ));
        smg.add_has_value_edge(HasValueEdge::new(
            object.clone(),
            8,
            int_type(),
            SmgValue::null_value(),
        ));
        let null_bytes = smg.null_bytes_for_object(&object);
        assert_eq!(null_bytes.len(), 12);
        assert!(smg.is_covered_by_nullified_blocks(&object, 0, ByteSize::new(12)));
        assert!(smg.is_covered_by_nullified_blocks(&object, 4, ByteSize::new(8)));
        assert!(!smg.is_covered_by_nullified_blocks(&object, 8, ByteSize::new(8)));
        assert!(!smg.is_covered_by_nullified_blocks(&object, 12, ByteSize::new(1)));
    }

    #[test]
    fn non_null_values_contribute_no_null_bytes() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let value = SmgValue::new(1);
        smg.add_object(object.clone());
        smg.add_value(value);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), value));
        assert!(smg.null_bytes_for_object(&object).is_empty());
    }

    #[test]
    fn cloned_graphs_diverge_independently() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        smg.add_object(object.clone());
        let mut branch = smg.clone();
        branch.set_validity(&object, false).unwrap();
        branch.add_value(SmgValue::new(1));
        assert_eq!(smg.is_object_valid(&object).unwrap(), true);
        assert_eq!(smg.values().len(), 1);
        assert_eq!(branch.values().len(), 2);
    }
}
