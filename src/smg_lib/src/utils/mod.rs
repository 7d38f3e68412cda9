//! This module contains utility structs and traits that are used by all
//! analysis stages, like the logging infrastructure.

pub mod debug;
pub mod log;
