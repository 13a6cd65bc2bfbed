use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Bib(#[from] lec_bib::BibError),
}
