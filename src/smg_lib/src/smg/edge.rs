use super::graph::Smg;
use super::{SmgObject, SmgValue};
use crate::prelude::*;

/// A has-value edge asserts that reading a field of type `ctype`
/// at byte offset `offset` within `object` yields `value`.
///
/// Several has-value edges may leave the same object for different offsets or types.
/// Edges compare structurally; the graph stores them with set semantics.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct HasValueEdge {
    object: SmgObject,
    offset: i64,
    ctype: CType,
    value: SmgValue,
}

impl HasValueEdge {
    /// Create a has-value edge.
    pub fn new(object: SmgObject, offset: i64, ctype: CType, value: SmgValue) -> HasValueEdge {
        HasValueEdge {
            object,
            offset,
            ctype,
            value,
        }
    }

    /// The object the edge leaves from.
    pub fn object(&self) -> &SmgObject {
        &self.object
    }

    /// The byte offset of the field within the object.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// The type annotation of the field.
    pub fn ctype(&self) -> &CType {
        &self.ctype
    }

    /// The abstract value stored in the field.
    pub fn value(&self) -> SmgValue {
        self.value
    }

    /// The byte offsets covered by the field, as a half-open range.
    pub fn covered_bytes(&self) -> std::ops::Range<i64> {
        self.offset..self.offset + u64::from(self.ctype.size()) as i64
    }
}

impl std::fmt::Display for HasValueEdge {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "{}[{}:{}] = {}",
            self.object, self.offset, self.ctype, self.value
        )
    }
}

/// A points-to edge asserts that `value`, when interpreted as a pointer,
/// addresses byte offset `offset` within `object`.
///
/// The graph keys its points-to collection by the source value,
/// so at most one points-to edge exists per value.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct PointsToEdge {
    value: SmgValue,
    object: SmgObject,
    offset: i64,
}

impl PointsToEdge {
    /// Create a points-to edge.
    pub fn new(value: SmgValue, object: SmgObject, offset: i64) -> PointsToEdge {
        PointsToEdge {
            value,
            object,
            offset,
        }
    }

    /// The pointer value the edge leaves from.
    pub fn value(&self) -> SmgValue {
        self.value
    }

    /// The object the value points into.
    pub fn object(&self) -> &SmgObject {
        &self.object
    }

    /// The byte offset within the target object that the value addresses.
    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl std::fmt::Display for PointsToEdge {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "{} -> {}+{}",
            self.value, self.object, self.offset
        )
    }
}

/// The closed union of the two edge kinds of the graph.
///
/// The consistency verifier works on this union
/// so that its pairwise edge-compatibility check is a total function
/// instead of a cascade of runtime type tests.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum SmgEdge {
    /// A has-value edge.
    HasValue(HasValueEdge),
    /// A points-to edge.
    PointsTo(PointsToEdge),
}

impl SmgEdge {
    /// Symmetric compatibility check between two edges.
    ///
    /// Edges of different kinds never contradict each other.
    /// Two has-value edges contradict each other if they leave the same object
    /// at the same offset with the same type but disagree on the value.
    /// Two points-to edges contradict each other if they leave the same value
    /// but disagree on the addressed object or offset.
    pub fn is_consistent_with(&self, other: &SmgEdge) -> bool {
        match (self, other) {
            (SmgEdge::HasValue(left), SmgEdge::HasValue(right)) => {
                if left.object() == right.object()
                    && left.offset() == right.offset()
                    && left.ctype() == right.ctype()
                {
                    left.value() == right.value()
                } else {
                    true
                }
            }
            (SmgEdge::PointsTo(left), SmgEdge::PointsTo(right)) => {
                if left.value() == right.value() {
                    left.object() == right.object() && left.offset() == right.offset()
                } else {
                    true
                }
            }
            (SmgEdge::HasValue(_), SmgEdge::PointsTo(_))
            | (SmgEdge::PointsTo(_), SmgEdge::HasValue(_)) => true,
        }
    }
}

impl From<HasValueEdge> for SmgEdge {
    fn from(edge: HasValueEdge) -> SmgEdge {
        SmgEdge::HasValue(edge)
    }
}

impl From<PointsToEdge> for SmgEdge {
    fn from(edge: PointsToEdge) -> SmgEdge {
        SmgEdge::PointsTo(edge)
    }
}

impl std::fmt::Display for SmgEdge {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SmgEdge::HasValue(edge) => write!(formatter, "{}", edge),
            SmgEdge::PointsTo(edge) => write!(formatter, "{}", edge),
        }
    }
}

/// A filter for querying the has-value edges of a graph.
///
/// Constraints are added with the builder-style setters;
/// an unset component matches every edge.
#[derive(Debug, Clone, Default)]
pub struct HasValueEdgeFilter {
    object: Option<SmgObject>,
    offset: Option<i64>,
    ctype: Option<CType>,
    value: Option<SmgValue>,
}

impl HasValueEdgeFilter {
    /// Create a filter matching every has-value edge.
    pub fn new() -> HasValueEdgeFilter {
        HasValueEdgeFilter::default()
    }

    /// Only match edges leaving the given object.
    pub fn for_object(mut self, object: SmgObject) -> HasValueEdgeFilter {
        self.object = Some(object);
        self
    }

    /// Only match edges at the given byte offset.
    pub fn at_offset(mut self, offset: i64) -> HasValueEdgeFilter {
        self.offset = Some(offset);
        self
    }

    /// Only match edges with the given type annotation.
    pub fn of_type(mut self, ctype: CType) -> HasValueEdgeFilter {
        self.ctype = Some(ctype);
        self
    }

    /// Only match edges carrying the given value.
    pub fn with_value(mut self, value: SmgValue) -> HasValueEdgeFilter {
        self.value = Some(value);
        self
    }

    /// Check a single edge against the filter.
    pub fn matches(&self, edge: &HasValueEdge) -> bool {
        if let Some(object) = &self.object {
            if edge.object() != object {
                return false;
            }
        }
        if let Some(offset) = self.offset {
            if edge.offset() != offset {
                return false;
            }
        }
        if let Some(ctype) = &self.ctype {
            if edge.ctype() != ctype {
                return false;
            }
        }
        if let Some(value) = self.value {
            if edge.value() != value {
                return false;
            }
        }
        true
    }

    /// Iterate over the has-value edges of `smg` that satisfy the filter.
    pub fn filter<'a>(&'a self, smg: &'a Smg) -> impl Iterator<Item = &'a HasValueEdge> {
        smg.has_value_edges()
            .iter()
            .filter(move |edge| self.matches(edge))
    }
}
