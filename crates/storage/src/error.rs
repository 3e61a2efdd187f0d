//! Fetch error types and connectivity classification.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;

/// Transient network failure class. Callers may retry these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Refused,
    TimedOut,
    HostUnreachable,
    /// Name does not resolve.
    DnsNotFound,
    /// Resolver temporarily unavailable.
    DnsUnavailable,
}

impl Connectivity {
    /// errno-style code reported to callers.
    pub fn code(self) -> &'static str {
        match self {
            Connectivity::Refused => "ECONNREFUSED",
            Connectivity::TimedOut => "ETIMEDOUT",
            Connectivity::HostUnreachable => "EHOSTUNREACH",
            Connectivity::DnsNotFound => "ENOTFOUND",
            Connectivity::DnsUnavailable => "EAI_AGAIN",
        }
    }

    /// Short human-readable message.
    pub fn brief(self) -> &'static str {
        match self {
            Connectivity::Refused => "Service unreachable",
            Connectivity::TimedOut => "Connection timed out",
            Connectivity::HostUnreachable => "Host unreachable",
            Connectivity::DnsNotFound => "Address not found",
            Connectivity::DnsUnavailable => "DNS unavailable",
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.brief())
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{kind}: {message}")]
    Connectivity { kind: Connectivity, message: String },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    pub fn connectivity(&self) -> Option<Connectivity> {
        match self {
            FetchError::Connectivity { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<object_store::Error> for FetchError {
    fn from(err: object_store::Error) -> Self {
        if let object_store::Error::NotFound { path, .. } = &err {
            return FetchError::NotFound(path.clone());
        }
        match classify_error_chain(&err) {
            Some(kind) => FetchError::Connectivity {
                kind,
                message: err.to_string(),
            },
            None => FetchError::Other(err.to_string()),
        }
    }
}

/// Walk an error's source chain looking for a network-level cause.
///
/// Typed causes (`io::Error`, `reqwest::Error`) are checked first; resolver
/// failures only surface as text, so the rendered chain is matched last.
pub fn classify_error_chain(err: &(dyn StdError + 'static)) -> Option<Connectivity> {
    let mut rendered = String::new();
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);

    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if let Some(kind) = classify_io_kind(io_err.kind()) {
                return Some(kind);
            }
        }
        if let Some(req_err) = e.downcast_ref::<reqwest::Error>() {
            if req_err.is_timeout() {
                return Some(Connectivity::TimedOut);
            }
        }
        rendered.push_str(&e.to_string().to_ascii_lowercase());
        rendered.push('\n');
        current = e.source();
    }

    classify_message(&rendered)
}

fn classify_io_kind(kind: io::ErrorKind) -> Option<Connectivity> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some(Connectivity::Refused),
        io::ErrorKind::TimedOut => Some(Connectivity::TimedOut),
        _ => None,
    }
}

fn classify_message(msg: &str) -> Option<Connectivity> {
    if msg.contains("temporary failure in name resolution") || msg.contains("eai_again") {
        Some(Connectivity::DnsUnavailable)
    } else if msg.contains("dns error")
        || msg.contains("failed to lookup address")
        || msg.contains("name or service not known")
        || msg.contains("nodename nor servname")
        || msg.contains("enotfound")
    {
        Some(Connectivity::DnsNotFound)
    } else if msg.contains("connection refused") || msg.contains("econnrefused") {
        Some(Connectivity::Refused)
    } else if msg.contains("no route to host")
        || msg.contains("host is unreachable")
        || msg.contains("network is unreachable")
        || msg.contains("ehostunreach")
    {
        Some(Connectivity::HostUnreachable)
    } else if msg.contains("timed out") || msg.contains("etimedout") {
        Some(Connectivity::TimedOut)
    } else {
        None
    }
}
