use super::class_file::{Constant, Version};
use super::code::Label;
use super::verifier::VerificationType;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// First four bytes were not `0xCAFEBABE`
    BadMagic(u32),
    UnsupportedVersion(Version),
    /// Bytes left over after the last class attribute
    TrailingBytes(usize),

    ConstantPoolOverflow {
        constant: Constant,
        offset: u16,
    },
    BadConstantIndex(u16),
    UnexpectedConstant {
        index: u16,
        expected: &'static str,
    },
    /// Constant pool tag we either do not know or do not support
    UnsupportedConstant(u8),
    MalformedUtf8(String),
    BadName(String),
    BadDescriptor(String),
    MalformedAttribute(&'static str),

    UnknownOpcode {
        offset: u32,
        opcode: u8,
    },
    UnsupportedInstruction {
        offset: u32,
        name: &'static str,
    },
    /// Branch or exception range that does not land on an instruction boundary
    BadBranchTarget {
        offset: u32,
        target: i64,
    },

    /// A branch or exception handler refers to a label missing from the instruction list
    UnplacedLabel(Label),
    /// The same label is placed twice in one instruction list
    DuplicateLabel(Label),
    MethodCodeOverflow(usize),
    MethodCodeMaxStackOverflow(usize),
    MethodCodeMaxLocalsOverflow(usize),

    DuplicateMethod {
        name: String,
        descriptor: String,
    },
    DuplicateField {
        name: String,
        descriptor: String,
    },

    /// Error trying to verify
    VerifierError {
        class: String,
        method: String,
        descriptor: String,
        index: usize,
        instruction: String,
        kind: VerifierErrorKind,
        listing: String,
    },
}

#[derive(Debug)]
pub enum VerifierErrorKind {
    EmptyStack,
    IncompatibleTypes {
        expected: VerificationType,
        found: VerificationType,
    },
    /// Value of the wrong size for a size-sensitive stack instruction (eg. `pop` on a `long`)
    InvalidCategory(VerificationType),
    InvalidLocal(u16),
    IncompatibleStackHeights(usize, usize),
    FallsOffEnd,
    InvalidReturn,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl fmt::Display for VerifierErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierErrorKind::EmptyStack => write!(f, "pop from empty stack"),
            VerifierErrorKind::IncompatibleTypes { expected, found } => {
                write!(f, "expected {:?}, found {:?}", expected, found)
            }
            VerifierErrorKind::InvalidCategory(typ) => write!(f, "wrong value size for {:?}", typ),
            VerifierErrorKind::InvalidLocal(idx) => write!(f, "invalid local variable {}", idx),
            VerifierErrorKind::IncompatibleStackHeights(a, b) => {
                write!(f, "incompatible stack heights {} and {}", a, b)
            }
            VerifierErrorKind::FallsOffEnd => write!(f, "execution falls off end of code"),
            VerifierErrorKind::InvalidReturn => write!(f, "return does not match descriptor"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "{}", err),
            Error::BadMagic(magic) => write!(f, "bad magic number {:#010x}", magic),
            Error::UnsupportedVersion(version) => {
                write!(f, "unsupported class version {}.{}", version.major, version.minor)
            }
            Error::TrailingBytes(n) => write!(f, "{} trailing bytes after class", n),
            Error::ConstantPoolOverflow { constant, offset } => {
                write!(f, "constant pool overflow at {} adding {:?}", offset, constant)
            }
            Error::BadConstantIndex(idx) => write!(f, "bad constant pool index {}", idx),
            Error::UnexpectedConstant { index, expected } => {
                write!(f, "constant {} is not a {}", index, expected)
            }
            Error::UnsupportedConstant(tag) => write!(f, "unsupported constant tag {}", tag),
            Error::MalformedUtf8(msg) => write!(f, "malformed modified UTF-8: {}", msg),
            Error::BadName(msg) => write!(f, "bad name: {}", msg),
            Error::BadDescriptor(msg) => write!(f, "bad descriptor: {}", msg),
            Error::MalformedAttribute(name) => write!(f, "malformed {} attribute", name),
            Error::UnknownOpcode { offset, opcode } => {
                write!(f, "unknown opcode {:#04x} at offset {}", opcode, offset)
            }
            Error::UnsupportedInstruction { offset, name } => {
                write!(f, "unsupported instruction {} at offset {}", name, offset)
            }
            Error::BadBranchTarget { offset, target } => {
                write!(f, "bad branch target {} from offset {}", target, offset)
            }
            Error::UnplacedLabel(label) => write!(f, "label {:?} is never placed", label),
            Error::DuplicateLabel(label) => write!(f, "label {:?} is placed twice", label),
            Error::MethodCodeOverflow(len) => write!(f, "method code too long ({} bytes)", len),
            Error::MethodCodeMaxStackOverflow(n) => write!(f, "max stack too large ({})", n),
            Error::MethodCodeMaxLocalsOverflow(n) => write!(f, "max locals too large ({})", n),
            Error::DuplicateMethod { name, descriptor } => {
                write!(f, "duplicate method {}{}", name, descriptor)
            }
            Error::DuplicateField { name, descriptor } => {
                write!(f, "duplicate field {} {}", name, descriptor)
            }
            Error::VerifierError {
                class,
                method,
                descriptor,
                index,
                instruction,
                kind,
                ..
            } => write!(
                f,
                "Bytecode correctness failed: {} at {}.{}{} (instruction {}: {})",
                kind, class, method, descriptor, index, instruction
            ),
        }
    }
}

impl std::error::Error for Error {}
