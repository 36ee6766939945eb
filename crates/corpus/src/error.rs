pub(crate) type CorpusResult<T> = Result<T, CorpusError>;

macro_rules! bail {
    ($($arg:tt)*) => {{
        return Err(CorpusError::Other(format!($($arg)*)));
    }};
}

pub(crate) use bail;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CorpusError {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Hyperdata(#[from] hyperdata::HyperdataError),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CorpusError {
    #[inline]
    pub(crate) fn other<T: ToString>(s: T) -> Self {
        Self::Other(s.to_string())
    }
}
