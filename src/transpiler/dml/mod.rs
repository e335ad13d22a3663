//! Statement-level SQL generation.

pub mod delete;
pub mod insert;
pub mod raw;
pub mod select;
pub mod union;
pub mod update;
pub mod with;

pub use insert::write_tuples;
