//! Read, edit, and write JVM classes
//!
//! ### Layers
//!
//! Classes pass through two representations:
//!
//!   - [`class_file`] mirrors the binary format: a constant pool plus members whose attributes
//!     are still mostly raw bytes, all referring to each other through constant pool indices.
//!
//!   - [`model`] is the editable form. Names and descriptors are resolved out of the pool,
//!     method bodies are [`code::InsnList`]s whose branches target [`code::Label`]s, and the
//!     constant pool is rebuilt from scratch when the class is encoded again.
//!
//! ### Decoding and re-encoding a class
//!
//! ```
//! use classpatch::jvm::model::Class;
//! use classpatch::jvm::*;
//!
//! # fn rewrite(bytes: &[u8]) -> Result<Vec<u8>, Error> {
//! let mut class = Class::decode(bytes)?;
//! class.access_flags |= ClassAccessFlags::FINAL;
//! class.verify()?;
//! let encoded = class.encode()?;
//! # Ok(encoded)
//! # }
//! ```
//!
//! Only the `Code`, `ConstantValue`, and `Exceptions` attributes survive decoding. Debug
//! information, stack map frames, annotations, and signatures are dropped, which means versions
//! that require stack maps (51 and up) are rejected outright.

mod access_flags;
mod binary_format;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod model;
mod names;
pub mod verifier;

pub use access_flags::*;
pub use binary_format::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
