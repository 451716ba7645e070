use crate::jvm;
use crate::jvm::class_file::ConstantPoolOverflow;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The class could not be read or written back
    ClassFormat(jvm::Error),

    /// Class, method, or prefix name that isn't a valid JVM name
    MalformedName(String),

    /// Replacement method can't stand in for the method it redirects
    IncompatibleReplacement {
        original: String,
        replacement: String,
        reason: &'static str,
    },

    /// Registration file line that couldn't be understood
    MalformedRegistration { line: usize, message: String },
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::ClassFormat(err)
    }
}

impl From<ConstantPoolOverflow> for Error {
    fn from(overflow: ConstantPoolOverflow) -> Error {
        Error::ClassFormat(overflow.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ClassFormat(err) => write!(f, "class format error: {}", err),
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::IncompatibleReplacement {
                original,
                replacement,
                reason,
            } => write!(
                f,
                "replacement {} cannot stand in for {}: {}",
                replacement, original, reason
            ),
            Error::MalformedRegistration { line, message } => {
                write!(f, "registration line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ClassFormat(err) => Some(err),
            _ => None,
        }
    }
}
