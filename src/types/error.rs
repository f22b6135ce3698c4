use std::error::Error as StdError;
use std::fmt;
use std::io;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// HTTP/2 Error Codes (RFC 7540 Section 7)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError,
    ProtocolError,
    InternalError,
    FlowControlError,
    SettingsTimeout,
    StreamClosed,
    FrameSizeError,
    RefusedStream,
    Cancel,
    CompressionError,
    ConnectError,
    EnhanceYourCalm,
    InadequateSecurity,
    Http11Required,
    /// A code outside the registered range. Legal on the wire, opaque to us.
    Unknown(u32),
}

impl ErrorCode {
    pub fn from_u32(code: u32) -> Self {
        match code {
            0x0 => ErrorCode::NoError,
            0x1 => ErrorCode::ProtocolError,
            0x2 => ErrorCode::InternalError,
            0x3 => ErrorCode::FlowControlError,
            0x4 => ErrorCode::SettingsTimeout,
            0x5 => ErrorCode::StreamClosed,
            0x6 => ErrorCode::FrameSizeError,
            0x7 => ErrorCode::RefusedStream,
            0x8 => ErrorCode::Cancel,
            0x9 => ErrorCode::CompressionError,
            0xa => ErrorCode::ConnectError,
            0xb => ErrorCode::EnhanceYourCalm,
            0xc => ErrorCode::InadequateSecurity,
            0xd => ErrorCode::Http11Required,
            other => ErrorCode::Unknown(other),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            ErrorCode::NoError => 0x0,
            ErrorCode::ProtocolError => 0x1,
            ErrorCode::InternalError => 0x2,
            ErrorCode::FlowControlError => 0x3,
            ErrorCode::SettingsTimeout => 0x4,
            ErrorCode::StreamClosed => 0x5,
            ErrorCode::FrameSizeError => 0x6,
            ErrorCode::RefusedStream => 0x7,
            ErrorCode::Cancel => 0x8,
            ErrorCode::CompressionError => 0x9,
            ErrorCode::ConnectError => 0xa,
            ErrorCode::EnhanceYourCalm => 0xb,
            ErrorCode::InadequateSecurity => 0xc,
            ErrorCode::Http11Required => 0xd,
            ErrorCode::Unknown(code) => *code,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ErrorCode::Unknown(_))
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        ErrorCode::from_u32(code)
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.as_u32()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, description) = match self {
            ErrorCode::NoError => ("NO_ERROR", "graceful shutdown"),
            ErrorCode::ProtocolError => ("PROTOCOL_ERROR", "protocol error detected"),
            ErrorCode::InternalError => ("INTERNAL_ERROR", "implementation fault"),
            ErrorCode::FlowControlError => {
                ("FLOW_CONTROL_ERROR", "flow control protocol violated")
            }
            ErrorCode::SettingsTimeout => ("SETTINGS_TIMEOUT", "settings not acknowledged"),
            ErrorCode::StreamClosed => ("STREAM_CLOSED", "frame received for closed stream"),
            ErrorCode::FrameSizeError => ("FRAME_SIZE_ERROR", "frame size incorrect"),
            ErrorCode::RefusedStream => ("REFUSED_STREAM", "stream not processed"),
            ErrorCode::Cancel => ("CANCEL", "stream cancelled"),
            ErrorCode::CompressionError => ("COMPRESSION_ERROR", "compression state not updated"),
            ErrorCode::ConnectError => {
                ("CONNECT_ERROR", "TCP connection error for CONNECT method")
            }
            ErrorCode::EnhanceYourCalm => ("ENHANCE_YOUR_CALM", "processing capacity exceeded"),
            ErrorCode::InadequateSecurity => (
                "INADEQUATE_SECURITY",
                "negotiated TLS parameters inadequate",
            ),
            ErrorCode::Http11Required => ("HTTP_1_1_REQUIRED", "use HTTP/1.1 for request"),
            ErrorCode::Unknown(_) => ("UNKNOWN", "unregistered error code"),
        };
        write!(f, "{} (0x{:x}): {}", name, self.as_u32(), description)
    }
}

/// A protocol-level failure carrying the error code a peer would see.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct H2Error {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl H2Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Chains `inner` under a new message, keeping `code` extractable without
    /// walking the source chain.
    pub fn wrap<E>(code: ErrorCode, message: impl Into<String>, inner: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(inner)),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Header compression failures. These carry no HTTP/2 error code; callers
/// that need COMPRESSION_ERROR semantics map them explicitly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HpackError {
    #[error("hpack: table entry {0} not found")]
    TableEntryNotFound(u64),

    #[error("hpack: data size {requested} is over protocol limitation {limit}")]
    DataSizeExceeded { requested: u64, limit: usize },

    #[error("hpack: prefixed int too long")]
    PrefixedIntOverflow,

    #[error("hpack: string literal of {length} octets exceeds limit {max}")]
    StringLiteralTooLong { length: u64, max: usize },

    #[error("hpack: invalid huffman encoded data")]
    InvalidHuffman,

    #[error("hpack: header block ended unexpectedly")]
    UnexpectedEof,

    #[error("hpack: header field uses invalid character")]
    InvalidHeaderChar,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP/2 error: {0}")]
    H2(#[from] H2Error),

    #[error("{0}")]
    Hpack(#[from] HpackError),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("read invalid client preface")]
    InvalidPreface,

    #[error("operation timed out")]
    Timeout,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ServerError {
    /// Code to report to the peer. Anything that is not a protocol error
    /// surfaces as INTERNAL_ERROR.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ServerError::H2(err) => err.code(),
            _ => ErrorCode::InternalError,
        }
    }
}
