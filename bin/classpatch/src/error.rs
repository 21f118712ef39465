use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Zip(zip::result::ZipError),
    Json(serde_json::Error),
    Http(ureq::Error),

    /// Key server answered with something other than `200 OK`
    HttpStatus(u16),

    /// Key material could not be read
    Key(String),

    Patch(classpatch::patch::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Error {
        Error::Zip(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Error {
        match err {
            ureq::Error::StatusCode(code) => Error::HttpStatus(code),
            other => Error::Http(other),
        }
    }
}

impl From<classpatch::patch::Error> for Error {
    fn from(err: classpatch::patch::Error) -> Error {
        Error::Patch(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Zip(err) => write!(f, "Archive error: {}", err),
            Error::Json(err) => write!(f, "Invalid configuration: {}", err),
            Error::Http(err) => write!(f, "HTTP error: {}", err),
            Error::HttpStatus(code) => write!(f, "Http response code: {}", code),
            Error::Key(msg) => write!(f, "Invalid key: {}", msg),
            Error::Patch(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Zip(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Http(err) => Some(err),
            Error::Patch(err) => Some(err),
            Error::HttpStatus(_) | Error::Key(_) => None,
        }
    }
}
