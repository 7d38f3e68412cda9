use crate::prelude::*;

/// An opaque identifier standing for a (possibly unknown) runtime value.
///
/// Values carry no payload themselves;
/// their meaning comes from the edges that mention them
/// and from the value-inequality relation of the graph.
/// The distinguished value `0` always denotes the null value
/// and always points to the null object.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SmgValue(u64);

impl SmgValue {
    /// Create a value with the given identifier.
    pub fn new(id: u64) -> SmgValue {
        SmgValue(id)
    }

    /// The designated null value.
    pub fn null_value() -> SmgValue {
        SmgValue(0)
    }

    /// Returns true if this is the designated null value.
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// The raw identifier of the value.
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SmgValue {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_null() {
            write!(formatter, "NULL")
        } else {
            write!(formatter, "V{}", self.0)
        }
    }
}
