//! Result envelope returned by every fetch.

use http::StatusCode;

/// How a fetch finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    /// The response was received and interpreted.
    #[default]
    Completed,
    /// The cancellation token fired before the response was fully read.
    Cancelled,
}

/// Status, payload and diagnostics of a single fetch.
///
/// A fresh envelope starts with the `500 Internal Server Error` sentinel
/// status and no payload. The payload is only ever set for a `200 OK`
/// response that carried one.
#[derive(Debug, Clone)]
pub struct ResultDetails<T> {
    /// HTTP status of the response, or the sentinel if none was received.
    pub status: StatusCode,
    /// Error body returned by the server, if any.
    pub description: Option<String>,
    /// The exact URL that was requested.
    pub request_url: String,
    /// Deserialized payload.
    pub payload: Option<T>,
    completion: Completion,
}

impl<T> ResultDetails<T> {
    /// Create an empty envelope for a request to `request_url`.
    pub fn new(request_url: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            description: None,
            request_url: request_url.into(),
            payload: None,
            completion: Completion::Completed,
        }
    }

    /// Mark the envelope as cut short by cancellation.
    pub(crate) fn cancelled(mut self) -> Self {
        self.completion = Completion::Cancelled;
        self
    }

    /// Check if the status is `200 OK`.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Check if the fetch was cancelled before completing.
    pub fn is_cancelled(&self) -> bool {
        self.completion == Completion::Cancelled
    }

    /// How the fetch finished.
    pub fn completion(&self) -> Completion {
        self.completion
    }

    /// Get the payload, if any.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Consume the envelope and return the payload.
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Transform the payload, keeping status and diagnostics.
    pub fn map<U, F>(self, f: F) -> ResultDetails<U>
    where
        F: FnOnce(T) -> U,
    {
        ResultDetails {
            status: self.status,
            description: self.description,
            request_url: self.request_url,
            payload: self.payload.map(f),
            completion: self.completion,
        }
    }
}
