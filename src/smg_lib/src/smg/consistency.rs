//! A side-channel batch of consistency checks over a graph snapshot.
//!
//! The verifier never mutates the graph and is meant for debug and test
//! configurations; it is O(objects × edges) in the worst case and has no
//! place on production hot paths.
//! Each violated invariant is reported through the logging sink at `Error`
//! severity with the offending object or edge, while the verifier itself
//! only returns a single coarse boolean.
//! Callers treat a `false` result as an assertion failure,
//! not as a recoverable condition.

use super::{HasValueEdgeFilter, Smg, SmgEdge, SmgValue};
use crate::prelude::*;
use crate::utils::log::{LogMessage, LogThreadMsg};
use crossbeam_channel::Sender;
use itertools::Itertools;
use std::collections::BTreeSet;

/// Run all consistency checks on the given graph snapshot.
/// Returns false if any check failed; diagnostics go to `logger`.
pub fn verify(smg: &Smg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = true;
    consistent &= verify_null_object(smg, logger);
    consistent &= verify_invalid_regions_have_no_edges(smg, logger);
    consistent &= verify_field_bounds(smg, logger);
    consistent &= verify_edge_consistency(smg, logger);
    consistent &= verify_validity_entries(smg, logger);
    consistent
}

/// Send a diagnosis to the logging sink.
/// Sends are fire-and-forget: a disconnected sink just discards the message.
fn report(logger: &Sender<LogThreadMsg>, text: String) {
    let _ = logger.send(LogMessage::new_error(text).source("SMG consistency").into());
}

/// The null triple must be intact:
/// exactly one value points to the null object,
/// the null value is that value (addressing offset 0),
/// and the null object is invalid, of size 0 and without has-value edges.
fn verify_null_object(smg: &Smg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = true;
    let null_object = smg.null_object();

    match smg.objects().get(&null_object) {
        Some(stored) => {
            if stored.size() != ByteSize::new(0) {
                report(
                    logger,
                    format!("null object has non-zero size {}", stored.size()),
                );
                consistent = false;
            }
        }
        None => {
            report(logger, "null object is missing from the graph".to_string());
            consistent = false;
        }
    }

    let pointers_to_null = smg
        .points_to_edges()
        .filter(|edge| edge.object().is_null())
        .count();
    if pointers_to_null != 1 {
        report(
            logger,
            format!("{} values point to the null object, expected exactly one", pointers_to_null),
        );
        consistent = false;
    }

    match smg.points_to_edge(&SmgValue::null_value()) {
        Some(edge) if edge.object().is_null() && edge.offset() == 0 => (),
        Some(edge) => {
            report(
                logger,
                format!("null value points to {}+{} instead of the null object", edge.object(), edge.offset()),
            );
            consistent = false;
        }
        None => {
            report(logger, "null value has no points-to edge".to_string());
            consistent = false;
        }
    }

    let null_edges = HasValueEdgeFilter::new()
        .for_object(null_object.clone())
        .filter(smg)
        .count();
    if null_edges != 0 {
        report(
            logger,
            format!("null object carries {} has-value edges", null_edges),
        );
        consistent = false;
    }

    if !matches!(smg.is_object_valid(&null_object), Ok(false)) {
        report(logger, "null object must be invalid".to_string());
        consistent = false;
    }

    consistent
}

/// An invalid object represents freed or out-of-scope memory
/// and must have no outgoing has-value edges.
fn verify_invalid_regions_have_no_edges(smg: &Smg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = true;
    for object in smg.objects() {
        if let Ok(false) = smg.is_object_valid(object) {
            let filter = HasValueEdgeFilter::new().for_object(object.clone());
            for edge in filter.filter(smg) {
                report(
                    logger,
                    format!("invalid object {} carries the has-value edge {}", object, edge),
                );
                consistent = false;
            }
        }
    }
    consistent
}

/// Every has-value edge must stay within the byte extent of its object.
fn verify_field_bounds(smg: &Smg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = true;
    for edge in smg.has_value_edges() {
        let extent = u64::from(edge.object().size()) as i64;
        if edge.offset() < 0 || edge.covered_bytes().end > extent {
            report(
                logger,
                format!(
                    "edge {} exceeds the {}-byte extent of its object",
                    edge, extent
                ),
            );
            consistent = false;
        }
    }
    consistent
}

/// Every edge must reference graph members only,
/// and no two edges of the same kind may contradict each other.
fn verify_edge_consistency(smg: &Smg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = true;
    for edge in smg.has_value_edges() {
        if !smg.objects().contains(edge.object()) {
            report(logger, format!("edge {} references a removed object", edge));
            consistent = false;
        }
        if !smg.values().contains(&edge.value()) {
            report(logger, format!("edge {} references a removed value", edge));
            consistent = false;
        }
    }
    for edge in smg.points_to_edges() {
        if !smg.objects().contains(edge.object()) {
            report(logger, format!("edge {} references a removed object", edge));
            consistent = false;
        }
        if !smg.values().contains(&edge.value()) {
            report(logger, format!("edge {} references a removed value", edge));
            consistent = false;
        }
    }

    let all_edges: Vec<SmgEdge> = smg
        .has_value_edges()
        .iter()
        .cloned()
        .map(SmgEdge::from)
        .chain(smg.points_to_edges().cloned().map(SmgEdge::from))
        .collect();
    for (left, right) in all_edges.iter().tuple_combinations() {
        if !left.is_consistent_with(right) {
            report(
                logger,
                format!("edges {} and {} contradict each other", left, right),
            );
            consistent = false;
        }
    }
    consistent
}

/// Every object must have a validity entry and every entry must belong to an object.
/// Negative object sizes cannot occur by construction of the size type.
fn verify_validity_entries(smg: &Smg, logger: &Sender<LogThreadMsg>) -> bool {
    let mut consistent = true;
    let object_ids: BTreeSet<_> = smg.objects().iter().map(|object| object.id()).collect();
    for object in smg.objects() {
        if !smg.validity_entries().contains_key(&object.id()) {
            report(logger, format!("object {} has no validity entry", object));
            consistent = false;
        }
    }
    for id in smg.validity_entries().keys() {
        if !object_ids.contains(id) {
            report(
                logger,
                format!("validity entry {} belongs to no object", id),
            );
            consistent = false;
        }
    }
    consistent
}

#[cfg(test)]
mod tests {
    use super::super::{HasValueEdge, IdSequence, PointsToEdge, SmgObject};
    use super::*;
    use crate::utils::log::{LogLevel, LogThread};

    fn new_smg() -> (Smg, IdSequence) {
        (Smg::new(MachineModel::lp64()), IdSequence::new())
    }

    fn int_type() -> CType {
        CType::int_type(&MachineModel::lp64())
    }

    fn region(ids: &mut IdSequence, size: u64, label: &str) -> SmgObject {
        SmgObject::new(ids.next_object_id(), ByteSize::new(size), label)
    }

    fn discard() -> Sender<LogThreadMsg> {
        LogThread::create_disconnected_sender()
    }

    #[test]
    fn fresh_graph_is_consistent() {
        let (smg, _) = new_smg();
        assert!(verify(&smg, &discard()));
    }

    #[test]
    fn populated_graph_is_consistent() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let heap = region(&mut ids, 16, "h");
        let value = SmgValue::new(1);
        let address = SmgValue::new(2);
        smg.add_object(object.clone());
        smg.add_object(heap.clone());
        smg.add_value(value);
        smg.add_value(address);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), value));
        smg.add_points_to_edge(PointsToEdge::new(address, heap, 0));
        assert!(verify(&smg, &discard()));
    }

    #[test]
    fn dangling_edges_are_detected() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let value = SmgValue::new(1);
        smg.add_object(object.clone());
        smg.add_value(value);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), value));
        // Bookkeeping-only removal leaves the edge dangling.
        smg.remove_object(&object);
        assert!(!verify(&smg, &discard()));
    }

    #[test]
    fn invalid_object_with_edges_is_detected() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let value = SmgValue::new(1);
        smg.add_object(object.clone());
        smg.add_value(value);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), value));
        smg.set_validity(&object, false).unwrap();
        assert!(!verify(&smg, &discard()));
    }

    #[test]
    fn out_of_bounds_fields_are_detected() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 2, "tiny");
        let value = SmgValue::new(1);
        smg.add_object(object.clone());
        smg.add_value(value);
        smg.add_has_value_edge(HasValueEdge::new(object, 0, int_type(), value));
        assert!(!verify(&smg, &discard()));
    }

    #[test]
    fn contradicting_field_values_are_detected() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        smg.add_object(object.clone());
        smg.add_value(SmgValue::new(1));
        smg.add_value(SmgValue::new(2));
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), SmgValue::new(1)));
        smg.add_has_value_edge(HasValueEdge::new(object, 0, int_type(), SmgValue::new(2)));
        assert!(!verify(&smg, &discard()));
    }

    #[test]
    fn second_pointer_to_null_object_is_detected() {
        let (mut smg, _) = new_smg();
        let address = SmgValue::new(1);
        smg.add_value(address);
        smg.add_points_to_edge(PointsToEdge::new(address, smg.null_object(), 0));
        assert!(!verify(&smg, &discard()));
    }

    #[test]
    fn diagnostics_reach_the_logging_sink() {
        let (mut smg, mut ids) = new_smg();
        let object = region(&mut ids, 8, "x");
        let value = SmgValue::new(1);
        smg.add_object(object.clone());
        smg.add_value(value);
        smg.add_has_value_edge(HasValueEdge::new(object.clone(), 0, int_type(), value));
        smg.remove_object(&object);

        let log_thread = LogThread::spawn(LogThread::collect_all);
        assert!(!verify(&smg, &log_thread.get_msg_sender()));
        let logs = log_thread.collect();
        assert!(!logs.is_empty());
        assert!(logs.iter().all(|message| message.level == LogLevel::Error));
    }
}
