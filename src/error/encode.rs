use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("Offset {0:#010x} does not fit in a reference slot")]
    OffsetOverflow(u32),
}
