//! This module defines the C-level vocabulary that the memory graph is built from:
//! byte sizes, the machine model supplying them, and the type annotations
//! carried by has-value edges.

use derive_more::*;
use serde::{Deserialize, Serialize};

mod machine;
pub use machine::*;
mod types;
pub use types::*;

/// An unsigned number of bytes.
///
/// Used for the sizes of memory objects and of the values stored inside them.
/// Offsets into memory objects are kept as signed `i64` byte offsets instead,
/// since intermediate offset arithmetic may produce negative numbers.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
    Display,
    From,
    Into,
    Add,
    Sub,
    Mul,
    AddAssign,
    SubAssign,
    Sum,
)]
#[serde(transparent)]
pub struct ByteSize(u64);

impl ByteSize {
    /// Create a new `ByteSize` object.
    pub fn new(value: u64) -> ByteSize {
        ByteSize(value)
    }

    /// Convert to the equivalent size in bits (by multiplying with 8).
    pub fn as_bit_length(self) -> usize {
        (u64::from(self) * 8) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_size_arithmetic() {
        assert_eq!(ByteSize::new(2).as_bit_length(), 16);
        assert_eq!(ByteSize::new(2) + ByteSize::new(3), ByteSize::new(5));
        assert_eq!(u64::from(ByteSize::new(7)), 7);
    }
}
