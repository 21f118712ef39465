//! Rewrite compiled JVM classes
//!
//! The crate is split in two layers:
//!
//!   - [`jvm`] reads and writes class files. Classes are decoded into an editable model where
//!     method bodies are linked lists of instructions and labels, so passes can insert, remove,
//!     and replace instructions without worrying about byte offsets. Encoding recomputes branch
//!     offsets, the maximum operand stack depth, and the number of local slots.
//!
//!   - [`patch`] is the pipeline run over a whole archive of classes: a fixed sequence of
//!     passes, followed by verification, renaming, and encoding.
//!
//! ### Example
//!
//! ```no_run
//! use classpatch::patch::{Patcher, Settings};
//!
//! # fn run(settings: Settings, entries: Vec<Vec<u8>>) -> Result<(), classpatch::patch::Error> {
//! let patcher = Patcher::new(settings);
//! let output = patcher.patch(entries)?;
//! for class in &output.classes {
//!     println!("{} ({} bytes)", class.entry_name(), class.bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod jvm;
pub mod patch;
mod util;
