//! Bytecode verification
//!
//! For any specific instruction inside a method body, the stack and locals should have the same
//! structure, regardless of which control flow was used to reach that instruction. In other words:
//! although the values on the stack and in the locals may obviously be different, the types and
//! order of the stack and local variables cannot. That structure is a [`Frame`] of
//! [`VerificationType`]s.
//!
//! Knowing the frame at a point in the code makes it possible to verify that the next instruction
//! makes sense (eg. `dadd` only makes sense if the top two elements on the stack are of type
//! `double`). When an instruction can be reached from multiple locations (eg. it is the target of
//! jumps), the incoming frames get merged and the instruction is checked again until nothing
//! changes any more. Type mismatches merge into [`VerificationType::Top`], which no instruction
//! accepts as an operand.
//!
//! This is the same [verification by type inference][0] the JVM performs on class files which
//! carry no stack maps. Passes rewrite method bodies, so running it before encoding catches a
//! broken rewrite at patch time rather than at class loading time.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se6/html/ClassFile.doc.html#9766

mod frame;
mod method;
mod types;

pub use frame::*;
pub use method::*;
pub use types::*;
