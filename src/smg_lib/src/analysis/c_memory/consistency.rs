//! Consistency checks for the C view of memory.
//!
//! These checks run on top of the base-graph verifier and validate the
//! region bookkeeping that [`CLangSmg`] maintains:
//! the stack, heap and global partitions must be disjoint,
//! together they must cover the whole object universe,
//! and the region indices must only reference graph members.
//! Like the base verifier this is a debug/test facility:
//! it never mutates, reports violations at `Error` severity
//! and returns a single coarse boolean.

use super::CLangSmg;
use crate::smg;
use crate::smg::SmgObject;
use crate::utils::log::{LogMessage, LogThreadMsg};
use crossbeam_channel::Sender;
use std::collections::BTreeSet;

/// Run the base-graph checks and all C-layer checks on the given state.
/// Returns false if any check failed; diagnostics go to `logger`.
pub fn verify(state: &CLangSmg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = smg::consistency::verify(state.smg(), logger);
    consistent &= verify_disjointness(state, logger);
    consistent &= verify_completeness(state, logger);
    consistent &= verify_null_object_in_heap(state, logger);
    consistent
}

fn report(logger: &Sender<LogThreadMsg>, text: String) {
    let _ = logger.send(
        LogMessage::new_error(text)
            .source("CLangSMG consistency")
            .into(),
    );
}

fn stack_objects(state: &CLangSmg) -> BTreeSet<SmgObject> {
    state
        .stack_frames()
        .iter()
        .flat_map(|frame| frame.all_objects())
        .cloned()
        .collect()
}

fn global_objects(state: &CLangSmg) -> BTreeSet<SmgObject> {
    state.global_objects().values().cloned().collect()
}

/// No object may belong to more than one storage region.
fn verify_disjointness(state: &CLangSmg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = true;
    let stack = stack_objects(state);
    let globals = global_objects(state);
    for object in stack.intersection(&globals) {
        report(logger, format!("object {} is both a stack and a global object", object));
        consistent = false;
    }
    for object in stack.intersection(state.heap_objects()) {
        report(logger, format!("object {} is both a stack and a heap object", object));
        consistent = false;
    }
    for object in globals.intersection(state.heap_objects()) {
        report(logger, format!("object {} is both a global and a heap object", object));
        consistent = false;
    }
    consistent
}

/// The three regions together must cover the object universe exactly:
/// every graph object belongs to a region
/// and every region index entry is a graph member.
fn verify_completeness(state: &CLangSmg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = true;
    let mut partitioned = stack_objects(state);
    partitioned.extend(global_objects(state));
    partitioned.extend(state.heap_objects().iter().cloned());

    for object in state.smg().objects() {
        if !partitioned.contains(object) {
            report(
                logger,
                format!("object {} belongs to no storage region", object),
            );
            consistent = false;
        }
    }
    for object in &partitioned {
        if !state.smg().objects().contains(object) {
            report(
                logger,
                format!("region index references the removed object {}", object),
            );
            consistent = false;
        }
    }
    consistent
}

/// The heap index is seeded with the null object at construction time
/// and must keep it forever.
fn verify_null_object_in_heap(state: &CLangSmg, logger: &Sender<LogThreadMsg>) -> bool {
    if !state.heap_objects().contains(&state.smg().null_object()) {
        report(logger, "the null object is missing from the heap index".to_string());
        return false;
    }
    true
}
