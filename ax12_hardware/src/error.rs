use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("serial device not open")]
    NotOpen,
    #[error("uart: {0}")]
    Uart(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
