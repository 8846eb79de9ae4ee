use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unknown tag {tag:#04x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("Unexpected EOF: need {need} bytes at offset {offset}")]
    UnexpectedEof { offset: usize, need: usize },

    #[error("Invalid UTF-8 encoding in string body at offset {0}")]
    InvalidUtf8(usize),

    #[error("Unhandled dict key type {0:#04x}")]
    BadKeyType(u8),

    #[error("Unhandled dict value type {0:#04x}")]
    BadValueType(u8),

    #[error("Unhandled array element type {0:#04x}")]
    BadElementType(u8),

    #[error("Unknown inline quartet {0:#x} in reference slot")]
    BadInlineQuartet(u8),

    #[error("Inline slot {0:#010x} does not hold a valid character")]
    BadInlineChar(u32),

    #[error("Reference slot {0:#010x} does not resolve to a string")]
    ExpectedString(u32),
}
