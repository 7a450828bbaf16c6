use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identifies one terminal connection. A session may hold many instances;
/// the pair is unique for the lifetime of the workbench.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportKey {
    pub session_id: String,
    pub instance_id: String,
}

impl fmt::Display for TransportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.instance_id)
    }
}

/// Failures from the preference backend. All of these are transient from the
/// workbench's point of view: local state stays authoritative and the write
/// retries on the next mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Unavailable(String),
    Rejected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(detail) => write!(f, "preference store unavailable: {detail}"),
            StoreError::Rejected(detail) => write!(f, "preference write rejected: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    ConnectFailed(String),
    AlreadyConnected(TransportKey),
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectFailed(detail) => {
                write!(f, "terminal connect failed: {detail}")
            }
            TransportError::AlreadyConnected(key) => {
                write!(f, "transport already open for {key}")
            }
            TransportError::Closed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for TransportError {}
