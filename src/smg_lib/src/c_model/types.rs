use super::{ByteSize, MachineModel};
use serde::{Deserialize, Serialize};

/// The type annotation of a field inside a memory object.
///
/// A has-value edge asserts that reading a field of this type at some offset
/// inside an object yields a certain abstract value.
/// Only the display name and the width of the type matter to the memory graph:
/// two fields agree on their type exactly if name and width are equal.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct CType {
    name: String,
    size: ByteSize,
}

impl CType {
    /// Create a type annotation with the given display name and width.
    pub fn new(name: impl Into<String>, size: ByteSize) -> CType {
        CType {
            name: name.into(),
            size,
        }
    }

    /// The `char` type of the given machine.
    pub fn char_type(machine_model: &MachineModel) -> CType {
        CType::new("char", machine_model.char_size())
    }

    /// The `int` type of the given machine.
    pub fn int_type(machine_model: &MachineModel) -> CType {
        CType::new("int", machine_model.int_size())
    }

    /// The `long` type of the given machine.
    pub fn long_type(machine_model: &MachineModel) -> CType {
        CType::new("long", machine_model.long_size())
    }

    /// A pointer type of the given machine.
    /// All pointer types share the same width, so a single annotation suffices.
    pub fn pointer_type(machine_model: &MachineModel) -> CType {
        CType::new("ptr", machine_model.pointer_size())
    }

    /// The display name of the type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The width of the type in bytes.
    pub fn size(&self) -> ByteSize {
        self.size
    }
}

impl std::fmt::Display for CType {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.name)
    }
}
