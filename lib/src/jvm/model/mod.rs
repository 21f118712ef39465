//! Semantic representations of classes
//!
//! This is the representation passes work with. Every constant pool index is resolved into the
//! name, descriptor, or constant it refers to, and method bodies are editable instruction lists.
//!
//!   - __Class__ is represented using [`Class`]
//!   - __Method__ is represented using [`Method`]
//!   - __Field__ is represented using [`Field`]
//!
//! Classes are read with [`Class::decode`] and written with [`Class::encode`]. The constant pool
//! is rebuilt from scratch on every encode, so unused constants disappear.

mod class;
mod field;
mod method;

pub use class::*;
pub use field::*;
pub use method::*;
