/// Failure talking to the backend session or item APIs.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered `status: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("Results not in API response")]
    MissingResults,
}

impl BackendError {
    /// Message shown to the user when an operation is abandoned.
    #[must_use]
    pub fn user_message(&self, operation: &str) -> String {
        format!(
            "An issue happened during {operation}. Please notify site owner, sending them this error message: {self}"
        )
    }
}
