use crate::jvm;
use std::fmt;

/// Fatal problem which aborts the whole run
#[derive(Debug)]
pub enum Error {
    /// Decoding, verifying, or encoding a class failed
    Jvm(jvm::Error),

    /// A class named in the key fields is not in the batch
    MissingClass(String),

    /// A class named in the key fields has no static initializer
    MissingClassInitializer(String),

    /// The static initializer never assigns the key field from a string literal
    MissingKeyField { class: String, field: String },

    /// Class, field, or method name which the JVM would not accept
    MalformedName(String),
    MalformedDescriptor(String),

    /// Key field location not of the form `class.field`
    MalformedKeyField(String),

    /// Key component which is not a decimal number
    MalformedKey(String),
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::Jvm(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Jvm(err) => write!(f, "{}", err),
            Error::MissingClass(class) => write!(f, "class {} not found", class),
            Error::MissingClassInitializer(class) => {
                write!(f, "class {} has no static initializer", class)
            }
            Error::MissingKeyField { class, field } => write!(
                f,
                "no literal assigned to {}.{} in the static initializer",
                class, field
            ),
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::MalformedDescriptor(msg) => write!(f, "malformed descriptor: {}", msg),
            Error::MalformedKeyField(location) => {
                write!(f, "key field '{}' is not of the form class.field", location)
            }
            Error::MalformedKey(msg) => write!(f, "malformed key: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Jvm(err) => Some(err),
            _ => None,
        }
    }
}

/// Recoverable problem noticed by a pass
///
/// The pass skips whatever it could not handle and carries on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    /// Name of the pass which raised the warning
    pub pass: &'static str,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.pass, self.message)
    }
}
