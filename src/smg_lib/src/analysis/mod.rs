//! Analysis-state modules built on top of the base symbolic memory graph.
//!
//! The base graph knows nothing about the analyzed language.
//! The modules here add language-level structure,
//! currently the C view of memory in [`c_memory`].

pub mod c_memory;
