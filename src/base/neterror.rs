use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure classes reported by the transport layer.
///
/// The numeric values follow the codes used by common HTTP tooling so that
/// callers porting retry or reporting logic can keep their tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCode {
    UnsupportedProtocol,
    FailedInit,
    UrlMalformed,
    CouldntResolveProxy,
    CouldntResolveHost,
    CouldntConnect,
    WeirdServerReply,
    WriteError,
    ReadError,
    OperationTimedOut,
    SslConnectError,
    BadFunctionArgument,
    TooManyRedirects,
    SendError,
    RecvError,
    PeerFailedVerification,
    ProxyError,
    /// The transfer group lost track of its registered transfer.
    BadTransferGroup,
    Unknown(i32),
}

impl TransportCode {
    pub fn as_i32(&self) -> i32 {
        match self {
            TransportCode::UnsupportedProtocol => 1,
            TransportCode::FailedInit => 2,
            TransportCode::UrlMalformed => 3,
            TransportCode::CouldntResolveProxy => 5,
            TransportCode::CouldntResolveHost => 6,
            TransportCode::CouldntConnect => 7,
            TransportCode::WeirdServerReply => 8,
            TransportCode::WriteError => 23,
            TransportCode::ReadError => 26,
            TransportCode::OperationTimedOut => 28,
            TransportCode::SslConnectError => 35,
            TransportCode::BadFunctionArgument => 43,
            TransportCode::TooManyRedirects => 47,
            TransportCode::SendError => 55,
            TransportCode::RecvError => 56,
            TransportCode::PeerFailedVerification => 60,
            TransportCode::ProxyError => 97,
            TransportCode::BadTransferGroup => 1001,
            TransportCode::Unknown(code) => *code,
        }
    }
}

impl From<i32> for TransportCode {
    fn from(code: i32) -> Self {
        match code {
            1 => TransportCode::UnsupportedProtocol,
            2 => TransportCode::FailedInit,
            3 => TransportCode::UrlMalformed,
            5 => TransportCode::CouldntResolveProxy,
            6 => TransportCode::CouldntResolveHost,
            7 => TransportCode::CouldntConnect,
            8 => TransportCode::WeirdServerReply,
            23 => TransportCode::WriteError,
            26 => TransportCode::ReadError,
            28 => TransportCode::OperationTimedOut,
            35 => TransportCode::SslConnectError,
            43 => TransportCode::BadFunctionArgument,
            47 => TransportCode::TooManyRedirects,
            55 => TransportCode::SendError,
            56 => TransportCode::RecvError,
            60 => TransportCode::PeerFailedVerification,
            97 => TransportCode::ProxyError,
            1001 => TransportCode::BadTransferGroup,
            _ => TransportCode::Unknown(code),
        }
    }
}

#[derive(Debug, Error)]
pub enum NetError {
    /// The process-wide transport runtime could not be brought up.
    #[error("transport initialization failed: {0}")]
    TransportInit(String),

    /// The per-engine connection handle could not be created.
    #[error("connection handle creation failed: {0}")]
    HandleCreate(String),

    /// Any transport operation failed. `message` is the transport's diagnostic.
    #[error("{message}")]
    Transport {
        code: TransportCode,
        message: String,
    },

    /// A declared form-file path is not a regular file.
    #[error("file: {} not exist", .0.display())]
    MissingFile(PathBuf),

    #[error("no header named {0:?}")]
    HeaderNotFound(String),

    #[error("failed to write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl NetError {
    /// Build a transport error from a code and diagnostic text.
    pub fn transport(code: TransportCode, message: impl Into<String>) -> Self {
        NetError::Transport {
            code,
            message: message.into(),
        }
    }

    /// Transport code of this error, if it is a transport failure.
    pub fn code(&self) -> Option<TransportCode> {
        match self {
            NetError::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.code() == Some(TransportCode::OperationTimedOut)
    }

    pub(crate) fn bad_argument(message: impl Into<String>) -> Self {
        NetError::transport(TransportCode::BadFunctionArgument, message)
    }

    pub(crate) fn timed_out(after: std::time::Duration, phase: &str) -> Self {
        NetError::transport(
            TransportCode::OperationTimedOut,
            format!("{} timed out after {} milliseconds", phase, after.as_millis()),
        )
    }
}
