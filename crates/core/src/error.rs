use thiserror::Error;

/// A key directory name that does not have the `<domain> <language> <version>` shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("unparseable key: {0:?}")]
    Unparseable(String),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Config error: {0}")]
    Config(String),
}
