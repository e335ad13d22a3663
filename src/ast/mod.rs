//! Statement AST and builders.

pub mod conditions;
pub mod delete;
pub mod ids;
pub mod insert;
pub mod joins;
pub mod operators;
pub mod raw;
pub mod select;
pub mod union;
pub mod update;
pub mod values;
pub mod with;

pub use conditions::*;
pub use delete::*;
pub use ids::*;
pub use insert::*;
pub use joins::*;
pub use operators::*;
pub use raw::*;
pub use select::*;
pub use union::*;
pub use update::*;
pub use values::*;
pub use with::*;
