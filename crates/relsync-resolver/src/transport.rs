use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Cursor, Read};

use anyhow::{Context, Result};
use relsync_core::SyncError;

/// Minimal GET surface the resolver and fetcher need from the network.
///
/// An `Err` means the request never produced a response (DNS, connect,
/// timeout). Non-success statuses come back as a response so callers can
/// report them.
pub trait HttpTransport {
    fn get(&self, url: &str) -> Result<TransportResponse>;
}

pub struct TransportResponse {
    pub status: u16,
    /// File name proposed by the server through content-disposition.
    pub file_name: Option<String>,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read>,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("file_name", &self.file_name)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_text(mut self, url: &str) -> Result<String> {
        let mut text = String::new();
        self.body
            .read_to_string(&mut text)
            .map_err(|err| SyncError::Transport {
                url: url.to_string(),
                reason: format!("failed reading response body: {err}"),
            })
            .with_context(|| format!("failed reading {url}"))?;
        Ok(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoute {
    pub status: u16,
    pub file_name: Option<String>,
    pub body: Vec<u8>,
    /// When set, the body fails with a connection reset after this many
    /// bytes.
    pub reset_after: Option<usize>,
}

impl StaticRoute {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            file_name: None,
            body: body.into().into_bytes(),
            reset_after: None,
        }
    }

    pub fn file(file_name: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            file_name: Some(file_name.into()),
            body,
            reset_after: None,
        }
    }

    pub fn reset_after(mut self, bytes: usize) -> Self {
        self.reset_after = Some(bytes);
        self
    }
}

/// Body that hands out `remaining` bytes and then fails as a dropped
/// connection would.
struct ResetBody {
    inner: Cursor<Vec<u8>>,
    remaining: usize,
}

impl Read for ResetBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        let limit = buf.len().min(self.remaining);
        let read = self.inner.read(&mut buf[..limit])?;
        self.remaining -= read;
        Ok(read)
    }
}

/// In-memory transport serving fixed responses by exact URL. Used for
/// offline runs and tests; every requested URL is recorded.
#[derive(Debug, Default)]
pub struct StaticTransport {
    routes: BTreeMap<String, StaticRoute>,
    requests: RefCell<Vec<String>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, url: impl Into<String>, route: StaticRoute) -> Self {
        self.set_route(url, route);
        self
    }

    pub fn set_route(&mut self, url: impl Into<String>, route: StaticRoute) {
        self.routes.insert(url.into(), route);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }
}

impl HttpTransport for StaticTransport {
    fn get(&self, url: &str) -> Result<TransportResponse> {
        self.requests.borrow_mut().push(url.to_string());
        let Some(route) = self.routes.get(url) else {
            return Err(SyncError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        };

        let inner = Cursor::new(route.body.clone());
        let body: Box<dyn Read> = match route.reset_after {
            Some(remaining) => Box::new(ResetBody { inner, remaining }),
            None => Box::new(inner),
        };
        Ok(TransportResponse {
            status: route.status,
            file_name: route.file_name.clone(),
            content_length: Some(route.body.len() as u64),
            body,
        })
    }
}
