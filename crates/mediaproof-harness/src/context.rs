//! Call-capturing context double for the in-process RPC path.
//!
//! Records the status code and details the code under test reports, and
//! turns aborts into typed errors. Aborting with a success code is a
//! defect in the backend itself and fails loudly as
//! [`CallError::InvalidAbort`] instead of being absorbed.

use thiserror::Error;

/// Status codes the generation service can report (gRPC-shaped subset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Cancelled,
    InvalidArgument,
    NotFound,
    ResourceExhausted,
    Internal,
    Unavailable,
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            StatusCode::Internal => "INTERNAL",
            StatusCode::Unavailable => "UNAVAILABLE",
        };
        f.write_str(name)
    }
}

/// Errors from an in-process backend call.
#[derive(Debug, Error)]
pub enum CallError {
    /// The backend aborted the call with a non-OK status.
    #[error("call aborted with {code}: {details}")]
    Aborted { code: StatusCode, details: String },

    /// The backend aborted with `OK` — a programming error in the code
    /// under test, surfaced rather than swallowed.
    #[error("abort called with OK as status code")]
    InvalidAbort,
}

/// Captures the outcome of a single in-process call.
#[derive(Debug, Default)]
pub struct CallContext {
    code: Option<StatusCode>,
    details: Option<String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_code(&mut self, code: StatusCode) {
        self.code = Some(code);
    }

    pub fn set_details(&mut self, details: impl Into<String>) {
        self.details = Some(details.into());
    }

    pub fn code(&self) -> Option<StatusCode> {
        self.code
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Abort the call. Records code and details, then hands back the error
    /// the backend must propagate. `StatusCode::Ok` records nothing and
    /// yields [`CallError::InvalidAbort`].
    #[must_use]
    pub fn abort(&mut self, code: StatusCode, message: impl Into<String>) -> CallError {
        if code == StatusCode::Ok {
            return CallError::InvalidAbort;
        }
        let message = message.into();
        self.set_code(code);
        self.set_details(message.clone());
        CallError::Aborted {
            code,
            details: message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_records_code_and_details() {
        let mut context = CallContext::new();
        let err = context.abort(StatusCode::InvalidArgument, "bad prompt");
        assert!(matches!(
            err,
            CallError::Aborted {
                code: StatusCode::InvalidArgument,
                ..
            }
        ));
        assert_eq!(context.code(), Some(StatusCode::InvalidArgument));
        assert_eq!(context.details(), Some("bad prompt"));
    }

    #[test]
    fn abort_with_ok_is_invalid() {
        let mut context = CallContext::new();
        let err = context.abort(StatusCode::Ok, "should not happen");
        assert!(matches!(err, CallError::InvalidAbort));
        // Nothing recorded: the abort itself was the defect.
        assert_eq!(context.code(), None);
        assert_eq!(context.details(), None);
    }

    #[test]
    fn fresh_context_is_empty() {
        let context = CallContext::new();
        assert_eq!(context.code(), None);
        assert_eq!(context.details(), None);
    }
}
