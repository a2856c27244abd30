//! Purpose: Canonical error type shared by backends, the ABI layer, and the CLI.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Internal failures carry a kind plus optional context; the ABI maps kinds to status codes.
//! Invariants: Every `ErrorKind` maps to exactly one ABI status and one exit code.
//! Invariants: Messages never embed caller payload bytes.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    NotImplemented,
    Usage,
    State,
    Internal,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

/// Process exit code for a failure kind. ABI-backed kinds reuse their status value.
pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::NotImplemented => 1,
        ErrorKind::Usage => 2,
        ErrorKind::State => 3,
        ErrorKind::Internal => 4,
        ErrorKind::Io => 5,
    }
}
