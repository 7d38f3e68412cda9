use super::SmgValue;
use crate::prelude::*;
use std::sync::Arc;

/// The unique identity of a memory object within one graph.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    /// The identity of the designated null object.
    const NULL: ObjectId = ObjectId(0);
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// An allocator for fresh object and value identities.
///
/// Each analysis state owns its own sequence
/// (cloned together with the state when branching),
/// so identities are unique within a branch without any process-wide counter.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// Create a sequence whose first handed-out identity is 1,
    /// leaving 0 for the designated null object and null value.
    pub fn new() -> IdSequence {
        IdSequence { next: 1 }
    }

    /// Mint a fresh object identity.
    pub fn next_object_id(&mut self) -> ObjectId {
        let id = self.next;
        self.next += 1;
        ObjectId(id)
    }

    /// Mint a fresh abstract value.
    pub fn next_value(&mut self) -> SmgValue {
        let id = self.next;
        self.next += 1;
        SmgValue::new(id)
    }
}

impl Default for IdSequence {
    fn default() -> IdSequence {
        IdSequence::new()
    }
}

/// A contiguous region of memory: a variable, a malloc'd block or the designated null region.
///
/// The identity, size and label of an object are immutable after creation,
/// so the data is wrapped in an `Arc` and may be shared between cloned graphs.
/// Whether the object currently represents live memory is *not* part of the
/// object itself; validity is tracked by the graph.
///
/// Objects compare by identity:
/// two distinct objects may well share size and label.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SmgObject(Arc<SmgObjectData>);

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
struct SmgObjectData {
    id: ObjectId,
    size: ByteSize,
    label: String,
}

impl SmgObject {
    /// Create a memory object with the given identity, byte size and label.
    pub fn new(id: ObjectId, size: ByteSize, label: impl Into<String>) -> SmgObject {
        SmgObject(Arc::new(SmgObjectData {
            id,
            size,
            label: label.into(),
        }))
    }

    /// The designated null object: identity 0, size 0, never valid.
    pub fn null_object() -> SmgObject {
        SmgObject::new(ObjectId::NULL, ByteSize::new(0), "NULL")
    }

    /// The identity of the object.
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// The extent of the object in bytes.
    pub fn size(&self) -> ByteSize {
        self.0.size
    }

    /// The label of the object, e.g. the name of the variable it was created for.
    pub fn label(&self) -> &str {
        &self.0.label
    }

    /// Returns true if this is the designated null object.
    pub fn is_null(&self) -> bool {
        self.0.id == ObjectId::NULL
    }
}

impl PartialEq for SmgObject {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for SmgObject {}

impl PartialOrd for SmgObject {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmgObject {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl std::hash::Hash for SmgObject {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl std::fmt::Display for SmgObject {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "{}{}", self.0.label, self.0.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_compare_by_identity() {
        let mut ids = IdSequence::new();
        let first = SmgObject::new(ids.next_object_id(), ByteSize::new(8), "x");
        let twin = SmgObject::new(first.id(), ByteSize::new(16), "y");
        let other = SmgObject::new(ids.next_object_id(), ByteSize::new(8), "x");
        assert_eq!(first, twin);
        assert_ne!(first, other);
        assert!(SmgObject::null_object().is_null());
        assert!(!first.is_null());
    }

    #[test]
    fn id_sequence_starts_past_null() {
        let mut ids = IdSequence::new();
        assert_ne!(ids.next_object_id(), ObjectId::NULL);
        assert!(!ids.next_value().is_null());
    }
}
