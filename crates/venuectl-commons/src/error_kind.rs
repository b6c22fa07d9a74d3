use std::fmt;

/// The closed set of error classifications a protocol adapter, the retry
/// engine, and the orchestrator agree on. Every attempt and every device
/// result carries one of these, never a free-form string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    ConnectionRefused,
    NetworkUnreachable,
    EmptyResponse,
    ProtocolError,
    /// The peer returned a semantic error (e.g. a JSON-RPC `error` object).
    RemoteError { code: i64, message: String },
    Cancelled,
    /// Unexpected failure inside the orchestrator or an adapter. Must never
    /// be allowed to abort a batch.
    Internal,
    NotFound,
    Unknown,
}

impl ErrorKind {
    /// True for transient conditions worth retrying; false for conditions a
    /// retry cannot fix (bad device id, cancellation).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::Cancelled | ErrorKind::NotFound)
    }

    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        ErrorKind::RemoteError {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::ConnectionRefused => write!(f, "connection refused"),
            ErrorKind::NetworkUnreachable => write!(f, "network unreachable"),
            ErrorKind::EmptyResponse => write!(f, "empty response"),
            ErrorKind::ProtocolError => write!(f, "protocol error"),
            ErrorKind::RemoteError { code, message } => {
                write!(f, "remote error {code}: {message}")
            }
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Internal => write!(f, "internal error"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Unknown => write!(f, "unknown error"),
        }
    }
}

/// Classify a raw `std::io::Error` into the closed set above. Adapters use
/// this at the point where a connect/read/write call fails.
pub fn classify_io_error(err: &std::io::Error) -> ErrorKind {
    use std::io::ErrorKind as IoKind;
    match err.kind() {
        IoKind::TimedOut => ErrorKind::Timeout,
        IoKind::ConnectionRefused => ErrorKind::ConnectionRefused,
        IoKind::NotFound | IoKind::AddrNotAvailable => ErrorKind::NetworkUnreachable,
        IoKind::UnexpectedEof => ErrorKind::EmptyResponse,
        _ => ErrorKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_excludes_cancelled_and_not_found() {
        assert!(!ErrorKind::Cancelled.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::Internal.is_retryable());
    }

    #[test]
    fn remote_error_carries_code_and_message() {
        let kind = ErrorKind::remote(-32601, "Method not found");
        match kind {
            ErrorKind::RemoteError { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            _ => panic!("expected RemoteError"),
        }
    }

    #[test]
    fn classify_io_error_maps_timed_out() {
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline exceeded");
        assert_eq!(classify_io_error(&err), ErrorKind::Timeout);
    }
}
