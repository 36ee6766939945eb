use std::io;

pub type HyperdataResult<T> = Result<T, HyperdataError>;

macro_rules! bail {
    ($($arg:tt)*) => {{
        return Err($crate::error::HyperdataError::Other(format!($($arg)*)));
    }};
}

pub(crate) use bail;

#[derive(Debug, thiserror::Error)]
pub enum HyperdataError {
    /// The top-level input could not be read at all. This is the only
    /// error a [ParsingPipeline](crate::ParsingPipeline) run returns.
    #[error("unable to read input: {0}")]
    Input(#[from] io::Error),

    #[error("corrupt container entry '{name}': {reason}")]
    Container { name: String, reason: String },

    #[error("invalid record: {0}")]
    Parse(String),

    #[error("unable to normalize {field}: {reason}")]
    Normalize { field: String, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    Other(String),
}

impl HyperdataError {
    #[inline]
    pub(crate) fn parse<T: ToString>(s: T) -> Self {
        Self::Parse(s.to_string())
    }

    #[inline]
    pub(crate) fn container<N, R>(name: N, reason: R) -> Self
    where
        N: ToString,
        R: ToString,
    {
        Self::Container {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if the error must abort the whole pipeline
    /// invocation.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}
