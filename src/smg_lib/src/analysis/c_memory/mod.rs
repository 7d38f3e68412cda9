//! The C view of program memory.
//!
//! [`CLangSmg`] wraps the base graph and partitions its objects into the three
//! C storage regions: the call stack (a last-in/first-out stack of
//! [`StackFrame`]s holding named locals), the heap and the global variables.
//! Low-level edge and object bookkeeping is forwarded to the base graph;
//! this layer additionally maintains region membership,
//! resolves visible variables
//! and reclaims unreachable state via [`CLangSmg::prune_unreachable`],
//! which doubles as the memory-leak detector.

pub mod consistency;
mod stack_frame;
pub use stack_frame::StackFrame;

use crate::prelude::*;
use crate::smg::{
    HasValueEdge, HasValueEdgeFilter, IdSequence, PointsToEdge, Smg, SmgObject, SmgValue,
};
use crate::utils::debug::ToJsonCompact;
use crate::utils::log::LogThread;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The label of the object holding the return value of a function call.
/// No C variable can carry this name, so it never collides with a local.
pub const RETURN_VALUE_LABEL: &str = "__retval__";

/// A symbolic memory graph specialized to C programs.
///
/// On top of the base graph the type tracks
/// which objects live in which storage region,
/// the call stack with its named locals and per-call return-value objects,
/// and a monotonic memory-leak flag that pruning sets
/// once a still-valid object becomes unreachable.
///
/// Cloning the state is the supported way to branch the analysis;
/// clones share no mutable collections with their source.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct CLangSmg {
    smg: Smg,
    stack: Vec<StackFrame>,
    heap_objects: BTreeSet<SmgObject>,
    global_objects: BTreeMap<String, SmgObject>,
    has_leaks: bool,
    ids: IdSequence,
}

impl CLangSmg {
    /// Create the initial state for the given machine:
    /// the canonical base graph, an empty call stack, no globals,
    /// and the heap index seeded with the null object.
    pub fn new(machine_model: MachineModel) -> CLangSmg {
        let smg = Smg::new(machine_model);
        let mut heap_objects = BTreeSet::new();
        heap_objects.insert(smg.null_object());
        CLangSmg {
            smg,
            stack: Vec::new(),
            heap_objects,
            global_objects: BTreeMap::new(),
            has_leaks: false,
            ids: IdSequence::new(),
        }
    }

    /// Mint a fresh memory object with the given size and label.
    /// The object is not yet part of the graph;
    /// register it with one of the `add_*_object` methods.
    pub fn create_region(&mut self, size: ByteSize, label: impl Into<String>) -> SmgObject {
        SmgObject::new(self.ids.next_object_id(), size, label)
    }

    /// Mint a fresh abstract value.
    /// The value is not yet part of the graph; register it with [`add_value`](Self::add_value).
    pub fn create_value(&mut self) -> SmgValue {
        self.ids.next_value()
    }

    /// Push a frame for a call of the named function.
    /// A non-`void` return type mints the frame's return-value object
    /// and registers it in the object set.
    pub fn add_stack_frame(&mut self, function_name: &str, return_type: Option<&CType>) {
        let return_object = return_type.map(|ctype| {
            SmgObject::new(self.ids.next_object_id(), ctype.size(), RETURN_VALUE_LABEL)
        });
        if let Some(object) = &return_object {
            self.smg.add_object(object.clone());
        }
        self.stack.push(StackFrame::new(function_name, return_object));
    }

    /// Pop the current frame and remove every object it owns from the graph,
    /// together with all edges referencing them.
    ///
    /// Stack objects are scope-bound by construction,
    /// so their removal performs no leak accounting.
    /// Returns an error if the call stack is empty.
    pub fn drop_stack_frame(&mut self) -> Result<(), Error> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| anyhow!("cannot drop a stack frame from an empty call stack"))?;
        for object in frame.all_objects() {
            self.smg.remove_object_and_edges(object);
        }
        debug_assert!(
            consistency::verify(self, &LogThread::create_disconnected_sender()),
            "dropping a stack frame left the memory graph inconsistent"
        );
        Ok(())
    }

    /// Register a freshly allocated heap object.
    /// The caller must not register the same object as a heap object twice.
    pub fn add_heap_object(&mut self, object: SmgObject) {
        debug_assert!(
            !self.heap_objects.contains(&object),
            "object {} is already tracked as a heap object",
            object
        );
        self.smg.add_object(object.clone());
        self.heap_objects.insert(object);
    }

    /// Register a global variable object under its label.
    /// Global variable names are unique per translation unit,
    /// so the caller must not bind the same name twice.
    pub fn add_global_object(&mut self, object: SmgObject) {
        debug_assert!(
            !self.global_objects.contains_key(object.label()),
            "global variable {} is already bound",
            object.label()
        );
        self.smg.add_object(object.clone());
        self.global_objects
            .insert(object.label().to_string(), object);
    }

    /// Register a local variable object in the current (top) frame,
    /// keyed by its label.
    /// Returns an error if no stack frame exists.
    pub fn add_stack_object(&mut self, object: SmgObject) -> Result<(), Error> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| anyhow!("cannot declare {} without a stack frame", object.label()))?;
        frame.add_variable(object.clone());
        self.smg.add_object(object);
        Ok(())
    }

    /// Resolve a variable name the way C scoping does,
    /// checking the current frame first and the globals second.
    ///
    /// Nested lexical blocks are not modeled:
    /// all locals of a function live in its single frame.
    /// Returns `None` if the name is bound in neither scope;
    /// absence is an expected outcome here, not a contract breach.
    pub fn object_for_visible_variable(&self, name: &str) -> Option<SmgObject> {
        if let Some(frame) = self.stack.last() {
            if let Some(object) = frame.variable(name) {
                return Some(object.clone());
            }
        }
        self.global_objects.get(name).cloned()
    }

    /// The return-value object of the current frame,
    /// absent for `void` functions or an empty call stack.
    pub fn object_for_function_return_value(&self) -> Option<&SmgObject> {
        self.stack.last().and_then(|frame| frame.return_object())
    }

    /// Remove every object and value that is unreachable from the stack and
    /// global roots, detecting memory leaks along the way.
    ///
    /// Reachability is computed along has-value edges only:
    /// they are the only structural links leaving an object.
    /// Points-to edges are consulted solely to resolve whether a stored value
    /// denotes another object.
    /// The roots are the objects of *every* stack frame (not only the top one,
    /// since a pointer stored in an outer frame's local may still address an
    /// object that must survive a deeper call's pruning pass) plus all globals.
    ///
    /// A stray object that is still valid is a memory leak
    /// and sets the monotonic leak flag before being removed.
    /// Stray values lose their points-to edge first and are then removed,
    /// which also purges them from the inequality relation.
    /// Calling this twice in a row leaves the graph unchanged the second time.
    pub fn prune_unreachable(&mut self) {
        let mut work_queue: VecDeque<SmgObject> = self
            .stack
            .iter()
            .flat_map(|frame| frame.all_objects())
            .chain(self.global_objects.values())
            .cloned()
            .collect();
        let mut seen_objects: BTreeSet<SmgObject> = BTreeSet::new();
        let mut seen_values: BTreeSet<SmgValue> = BTreeSet::new();

        while let Some(object) = work_queue.pop_front() {
            if !seen_objects.insert(object.clone()) {
                continue;
            }
            let filter = HasValueEdgeFilter::new().for_object(object);
            for edge in filter.filter(&self.smg) {
                seen_values.insert(edge.value());
                if let Some(points_to) = self.smg.points_to_edge(&edge.value()) {
                    if !seen_objects.contains(points_to.object()) {
                        work_queue.push_back(points_to.object().clone());
                    }
                }
            }
        }

        let stray_objects: Vec<SmgObject> = self
            .smg
            .objects()
            .iter()
            .filter(|object| !seen_objects.contains(*object) && !object.is_null())
            .cloned()
            .collect();
        for object in stray_objects {
            if matches!(self.smg.is_object_valid(&object), Ok(true)) {
                self.report_memory_leak();
            }
            self.smg.remove_object_and_edges(&object);
            self.heap_objects.remove(&object);
        }

        let stray_values: Vec<SmgValue> = self
            .smg
            .values()
            .iter()
            .filter(|value| !seen_values.contains(*value) && !value.is_null())
            .copied()
            .collect();
        for value in stray_values {
            if self.smg.is_pointer(&value) {
                self.smg.remove_points_to_edge(&value);
            }
            self.smg.remove_value(&value);
        }

        debug_assert!(
            consistency::verify(self, &LogThread::create_disconnected_sender()),
            "pruning left the memory graph inconsistent"
        );
    }

    /// Identify two abstract values with each other.
    /// Value merging is a pure base-graph concern;
    /// this layer only re-runs the consistency check in debug builds.
    pub fn merge_values(&mut self, first: SmgValue, second: SmgValue) {
        self.smg.merge_values(first, second);
        debug_assert!(
            consistency::verify(self, &LogThread::create_disconnected_sender()),
            "merging values left the memory graph inconsistent"
        );
    }

    /// Returns true if pruning ever discovered a memory leak in this state.
    /// The flag is monotonic: it is set by pruning and never cleared.
    pub fn has_memory_leaks(&self) -> bool {
        self.has_leaks
    }

    /// Record that a memory leak was discovered.
    fn report_memory_leak(&mut self) {
        self.has_leaks = true;
    }

    /// Insert a value into the value set of the underlying graph.
    pub fn add_value(&mut self, value: SmgValue) {
        self.smg.add_value(value);
    }

    /// Insert a has-value edge into the underlying graph.
    pub fn add_has_value_edge(&mut self, edge: HasValueEdge) {
        self.smg.add_has_value_edge(edge);
    }

    /// Remove a has-value edge from the underlying graph.
    pub fn remove_has_value_edge(&mut self, edge: &HasValueEdge) {
        self.smg.remove_has_value_edge(edge);
    }

    /// Insert a points-to edge into the underlying graph,
    /// replacing any prior edge of the same source value.
    pub fn add_points_to_edge(&mut self, edge: PointsToEdge) {
        self.smg.add_points_to_edge(edge);
    }

    /// Set the validity of an object, e.g. to model `free()`.
    /// Returns an error if the object is not part of the graph.
    pub fn set_validity(&mut self, object: &SmgObject, validity: bool) -> Result<(), Error> {
        self.smg.set_validity(object, validity)
    }

    /// Query the validity of an object.
    /// Returns an error if the object is not part of the graph.
    pub fn is_object_valid(&self, object: &SmgObject) -> Result<bool, Error> {
        self.smg.is_object_valid(object)
    }

    /// The object a value points to, or `None` if the value has no points-to edge.
    /// Returns an error if the value is not part of the graph.
    pub fn object_pointed_by(&self, value: &SmgValue) -> Result<Option<SmgObject>, Error> {
        self.smg.object_pointed_by(value)
    }

    /// Returns true if the value has a points-to edge.
    pub fn is_pointer(&self, value: &SmgValue) -> bool {
        self.smg.is_pointer(value)
    }

    /// Record that two values are distinct.
    pub fn add_neq_relation(&mut self, first: SmgValue, second: SmgValue) {
        self.smg.add_neq_relation(first, second);
    }

    /// Returns true if the two values are known to be distinct.
    pub fn values_known_distinct(&self, first: SmgValue, second: SmgValue) -> bool {
        self.smg.values_known_distinct(first, second)
    }

    /// The byte offsets within the object that are provably null-valued.
    pub fn null_bytes_for_object(&self, object: &SmgObject) -> BTreeSet<i64> {
        self.smg.null_bytes_for_object(object)
    }

    /// Returns true if every byte of the given range within the object
    /// is covered by a null-valued has-value edge.
    pub fn is_covered_by_nullified_blocks(
        &self,
        object: &SmgObject,
        offset: i64,
        size: ByteSize,
    ) -> bool {
        self.smg.is_covered_by_nullified_blocks(object, offset, size)
    }

    /// Read access to the underlying base graph.
    pub fn smg(&self) -> &Smg {
        &self.smg
    }

    /// The machine model the state was constructed with.
    pub fn machine_model(&self) -> &MachineModel {
        self.smg.machine_model()
    }

    /// The frames of the call stack, bottom first.
    pub fn stack_frames(&self) -> &[StackFrame] {
        &self.stack
    }

    /// The heap partition of the object universe.
    pub fn heap_objects(&self) -> &BTreeSet<SmgObject> {
        &self.heap_objects
    }

    /// Returns true if the object is tracked as a heap object.
    pub fn is_heap_object(&self, object: &SmgObject) -> bool {
        self.heap_objects.contains(object)
    }

    /// The global variables, keyed by name.
    pub fn global_objects(&self) -> &BTreeMap<String, SmgObject> {
        &self.global_objects
    }
}

impl ToJsonCompact for CLangSmg {
    fn to_json_compact(&self) -> serde_json::Value {
        serde_json::json!({
            "stack": self
                .stack
                .iter()
                .map(|frame| {
                    serde_json::json!({
                        "function": frame.function_name(),
                        "variables": frame
                            .variables()
                            .map(|object| format!("{}", object))
                            .collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>(),
            "heap": self
                .heap_objects
                .iter()
                .map(|object| format!("{}", object))
                .collect::<Vec<_>>(),
            "globals": self
                .global_objects
                .keys()
                .collect::<Vec<_>>(),
            "has_leaks": self.has_leaks,
            "smg": self.smg.to_json_compact(),
        })
    }
}
