use cdict_core::DictionaryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XrefError {
    #[error("{element} xref without {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid integer {value:?} in attribute {attribute} of {element}")]
    InvalidInteger {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
}

pub type Result<T, E = XrefError> = std::result::Result<T, E>;
