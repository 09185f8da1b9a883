/// Errors that can occur while decoding a data frame or one of its components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A record would extend past the end of the payload.
    #[error("truncated {record} at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        record: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A component header declares a size smaller than the header itself.
    #[error("component at offset {offset} declares size {size}")]
    InvalidComponentSize { offset: usize, size: u32 },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
