use ark_serialize::SerializationError;
use ark_std::fmt;

pub type ShareId = u16;

#[derive(Debug)]
pub enum UtilsError {
    /// Number of bases and number of scalars/responses differ
    VectorLengthMismatch(usize, usize),
    /// Schnorr response does not satisfy the verification relation
    InvalidResponse,
    InvalidSignature,
    /// Threshold must satisfy `1 <= threshold <= total`
    InvalidThresholdOrTotal(ShareId, ShareId),
    /// Share ids are x coordinates so must be non-zero
    InvalidShareId(ShareId),
    DuplicateShareId(ShareId),
    Serialization(SerializationError),
}

impl fmt::Display for UtilsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VectorLengthMismatch(a, b) => {
                write!(f, "vector lengths differ: {} and {}", a, b)
            }
            Self::InvalidResponse => write!(f, "invalid Schnorr response"),
            Self::InvalidSignature => write!(f, "invalid Schnorr signature"),
            Self::InvalidThresholdOrTotal(t, n) => {
                write!(f, "invalid threshold {} for total {}", t, n)
            }
            Self::InvalidShareId(id) => write!(f, "invalid share id {}", id),
            Self::DuplicateShareId(id) => write!(f, "share id {} repeated", id),
            Self::Serialization(e) => write!(f, "serialization error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UtilsError {}

impl From<SerializationError> for UtilsError {
    fn from(e: SerializationError) -> Self {
        Self::Serialization(e)
    }
}
