/// Errors from a generative backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// The backend accepted the job but reported it as failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Generation did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("No backend registered for model '{0}'")]
    UnknownModel(String),

    #[error("Seed image generation failed: {0}")]
    SeedImage(String),
}

impl BackendError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
