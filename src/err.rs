use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame too short to be a valid packet: {len} bytes")]
    InvalidFrame { len: usize },

    #[error("could not resolve address {0}")]
    AddrResolution(String),

    #[error("input file not found: {0}")]
    MissingInputFile(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
