//! Bytecode representation and rewriting
//!
//! ### Structure
//!
//! Despite being pushed off into [just another method attribute](crate::jvm::class_file::Code),
//! the bytecode is arguably the most important part of the class file - it contains the actual
//! executable instructions. We split up the [list of bytecode instructions][0] into two groups:
//!
//!   - [`Instruction`] for straight-line instructions
//!   - [`BranchInstruction`] for instructions that may branch or end the method
//!
//! A method body is an [`InsnList`] of these, interleaved with [`Label`]s marking positions that
//! branches and exception handlers refer to. Passes edit the list in place: inserting, removing,
//! and replacing instructions never requires fixing up any offsets.
//!
//! ### Decoding and encoding
//!
//! [`decode_code`] lifts the raw bytes into this form, resolving every constant pool reference.
//! [`encode_code`] goes the other way, picking short or wide forms for jumps and recomputing
//! `max_stack` and `max_locals`.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se6/html/Instructions.doc.html

mod code;
mod decode;
mod encode;
mod flow;
mod insn_list;
mod instructions;
mod label;

pub use code::*;
pub use decode::*;
pub use encode::*;
pub use flow::*;
pub use insn_list::*;
pub use instructions::*;
pub use label::*;
