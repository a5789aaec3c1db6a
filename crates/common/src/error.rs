use crate::store::KvError;

/// Failure of a site operation, one variant per externally visible outcome.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// A credential was presented but does not grant this operation
    #[error("{0}")]
    Forbidden(String),
    #[error("404: Site \"{public_key}\" not found")]
    SiteNotFound { public_key: String },
    #[error("404: File \"{path}\" not found in site \"{public_key}\"")]
    FileNotFound { public_key: String, path: String },
    /// Malformed request input
    #[error("{0}")]
    Validation(String),
    /// The write would push the site past its size budget
    #[error("{0}")]
    LimitExceeded(String),
    #[error("storage error: {0}")]
    Storage(#[from] KvError),
    /// A stored record could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl SiteError {
    pub fn site_not_found(public_key: &str) -> Self {
        Self::SiteNotFound {
            public_key: public_key.to_string(),
        }
    }

    pub fn file_not_found(public_key: &str, path: &str) -> Self {
        Self::FileNotFound {
            public_key: public_key.to_string(),
            path: path.to_string(),
        }
    }
}

impl From<serde_json::Error> for SiteError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}
