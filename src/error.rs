#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The socket reported something other than "would block". Fatal to the role.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// A datagram of the wrong size arrived. Never fatal; the datagram is discarded.
    #[error("expected a 128-byte record, found {found} bytes")]
    RecordLength { found: usize },

    #[error("unable to resolve address {0}")]
    Resolve(String),

    #[error("invalid configuration: {0}")]
    Config(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
