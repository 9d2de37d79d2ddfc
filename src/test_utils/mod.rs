//! Helpers shared by the unit tests of every module.
mod common;
mod launcher;

pub use common::*;
pub use launcher::*;
