use super::ByteSize;
use serde::{Deserialize, Serialize};

/// The sizing parameters of the machine that the analyzed program runs on.
///
/// A machine model is supplied when constructing a memory graph
/// and is immutable afterwards.
/// It determines the width of pointers and of the basic C integer types,
/// which in turn determines the extent of the fields that has-value edges describe.
#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord,
)]
pub struct MachineModel {
    pointer_size: ByteSize,
    char_size: ByteSize,
    short_size: ByteSize,
    int_size: ByteSize,
    long_size: ByteSize,
}

impl MachineModel {
    /// The machine model of common 64-bit Linux targets (4-byte `int`, 8-byte `long` and pointers).
    pub fn lp64() -> MachineModel {
        MachineModel {
            pointer_size: ByteSize::new(8),
            char_size: ByteSize::new(1),
            short_size: ByteSize::new(2),
            int_size: ByteSize::new(4),
            long_size: ByteSize::new(8),
        }
    }

    /// The machine model of common 32-bit targets (4-byte `int`, `long` and pointers).
    pub fn ilp32() -> MachineModel {
        MachineModel {
            pointer_size: ByteSize::new(4),
            char_size: ByteSize::new(1),
            short_size: ByteSize::new(2),
            int_size: ByteSize::new(4),
            long_size: ByteSize::new(4),
        }
    }

    /// The size of pointers on this machine.
    pub fn pointer_size(&self) -> ByteSize {
        self.pointer_size
    }

    /// The size of the C `char` type on this machine.
    pub fn char_size(&self) -> ByteSize {
        self.char_size
    }

    /// The size of the C `short` type on this machine.
    pub fn short_size(&self) -> ByteSize {
        self.short_size
    }

    /// The size of the C `int` type on this machine.
    pub fn int_size(&self) -> ByteSize {
        self.int_size
    }

    /// The size of the C `long` type on this machine.
    pub fn long_size(&self) -> ByteSize {
        self.long_size
    }
}
