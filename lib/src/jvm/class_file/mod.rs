//! Binary representation of class files
//!
//! Everything in here refers to the constant pool through indices. The [`crate::jvm::model`]
//! layer resolves those indices into names and descriptors.

mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod resolve;
mod version;

pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use version::*;
