// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A tagged ErrorKind so callers can match on failure class without
//    inspecting the backtrace payload
// 3. A way to centralize logging every error into the tracing system as it's
//    created, so there's one place to breakpoint if you want to trap errors.

use std::borrow::Cow;

use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

/// Failure classes from the error handling design. `Message` and most
/// `Connection::Retryable` failures are recovered locally and never surface
/// this far; `Configuration`, `InvalidStateTransition`, `Connection::Fatal`,
/// `Codec` and `Cancelled` are the user-visible ones.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Configuration,
    InvalidStateTransition,
    ConnectionRetryable,
    ConnectionFatal,
    Message,
    Codec,
    Cancelled,
    Other,
}

impl ErrorKind {
    /// Whether the caller should treat this failure as locally recoverable
    /// (retry, drop-and-log) rather than something to surface.
    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorKind::ConnectionRetryable | ErrorKind::Message)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    inner: DynBacktraceError,
}

pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(ErrorKind::Other, err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.inner)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, err: E) -> Error {
        error!(target: "nmeshed", kind = ?kind, "{:?}", err);
        let inner = DynBacktraceError::from(err);
        Error { kind, inner }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Other, msg)
}

pub fn kind_err(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(kind, SimpleErr(msg.into()))
}

pub fn config_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Configuration, msg)
}

pub fn invalid_transition_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::InvalidStateTransition, msg)
}

pub fn codec_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Codec, msg)
}

pub fn cancelled_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Cancelled, msg)
}

#[test]
fn test_error() {
    let e = err("test error");
    assert_eq!(e.kind(), ErrorKind::Other);
}

#[test]
fn test_config_err_kind() {
    let e = config_err("missing workspace_id");
    assert_eq!(e.kind(), ErrorKind::Configuration);
    assert!(e.kind().is_recoverable() == false);
}
