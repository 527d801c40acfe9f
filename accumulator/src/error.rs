use crate::accumulator::Epoch;
use allosaur_utils::error::{ShareId, UtilsError};
use ark_serialize::SerializationError;
use ark_std::fmt;

/// Status codes used when errors cross a byte boundary. Any nonzero code is a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    /// Malformed bytes, wrong lengths or misuse of the registry API
    Input = 1,
    /// A cryptographic operation failed, like a revoked member or an invalid proof
    Signing = 2,
    /// Internal or unexpected failure
    Wrapper = 99,
}

#[derive(Debug)]
pub enum AllosaurError {
    /// Malformed external bytes
    EncodingError(&'static str),
    InvalidLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Element is already an active member, or repeated in the input of `operation`, at `epoch`
    DuplicateMember { operation: &'static str, epoch: Epoch },
    /// Element is not an active member at `epoch`
    UnknownMember { operation: &'static str, epoch: Epoch },
    /// Element was deleted earlier and can't be added again
    PreviouslyRevoked,
    /// Element is the negation of the trapdoor and must never be accumulated
    ProhibitedElement,
    /// The witness owner is among the deletions of the update at `epoch`
    RevokedMember { epoch: Epoch },
    /// Number of coefficients does not match number of additions and deletions
    MalformedBatch {
        additions: usize,
        deletions: usize,
        coefficients: usize,
    },
    EpochGap { expected: Epoch, found: Epoch },
    HistoryPruned { requested: Epoch, oldest: Epoch },
    FutureEpoch { requested: Epoch, current: Epoch },
    WitnessOwnerMismatch,
    InvalidWitness,
    StaleWitness {
        witness_epoch: Epoch,
        accumulator_epoch: Epoch,
    },
    InsufficientShares { threshold: ShareId, received: usize },
    /// Registry `registry` reported an update different from the other registries
    InconsistentEpoch {
        registry: ShareId,
        expected: (Epoch, Epoch),
        found: (Epoch, Epoch),
    },
    InconsistentShares,
    InvalidThreshold { threshold: ShareId, total: usize },
    /// The request carries shares for fewer powers than the update has coefficients
    UpdateTooLarge { supported: usize, required: usize },
    /// Proof created for the accumulator at `epoch` does not verify
    InvalidProof { epoch: Epoch },
    /// Signature on an accumulator snapshot does not verify
    InvalidSignature,
    StaleProof {
        proof_epoch: Epoch,
        accumulator_epoch: Epoch,
    },
    UtilsError(UtilsError),
    Serialization(SerializationError),
}

impl AllosaurError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EncodingError(_)
            | Self::InvalidLength { .. }
            | Self::DuplicateMember { .. }
            | Self::UnknownMember { .. }
            | Self::PreviouslyRevoked
            | Self::ProhibitedElement
            | Self::MalformedBatch { .. }
            | Self::EpochGap { .. }
            | Self::HistoryPruned { .. }
            | Self::FutureEpoch { .. }
            | Self::WitnessOwnerMismatch
            | Self::InvalidThreshold { .. }
            | Self::UpdateTooLarge { .. } => ErrorCode::Input,
            Self::RevokedMember { .. }
            | Self::InvalidWitness
            | Self::StaleWitness { .. }
            | Self::InsufficientShares { .. }
            | Self::InconsistentEpoch { .. }
            | Self::InconsistentShares
            | Self::InvalidProof { .. }
            | Self::InvalidSignature
            | Self::StaleProof { .. } => ErrorCode::Signing,
            Self::UtilsError(UtilsError::InvalidShareId(_))
            | Self::UtilsError(UtilsError::DuplicateShareId(_)) => ErrorCode::Input,
            Self::UtilsError(_) | Self::Serialization(_) => ErrorCode::Wrapper,
        }
    }
}

impl fmt::Display for AllosaurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodingError(what) => write!(f, "encoding error: {}", what),
            Self::InvalidLength {
                what,
                expected,
                found,
            } => write!(
                f,
                "invalid length for {}: expected {} bytes, found {}",
                what, expected, found
            ),
            Self::DuplicateMember { operation, epoch } => {
                write!(f, "{}: member is already present (epoch {})", operation, epoch)
            }
            Self::UnknownMember { operation, epoch } => {
                write!(f, "{}: member is not present (epoch {})", operation, epoch)
            }
            Self::PreviouslyRevoked => write!(f, "member was revoked and cannot be added again"),
            Self::ProhibitedElement => write!(f, "element cannot be accumulated"),
            Self::RevokedMember { epoch } => write!(f, "member revoked at epoch {}", epoch),
            Self::MalformedBatch {
                additions,
                deletions,
                coefficients,
            } => write!(
                f,
                "malformed batch: {} additions and {} deletions need {} coefficients, found {}",
                additions,
                deletions,
                additions + deletions,
                coefficients
            ),
            Self::EpochGap { expected, found } => {
                write!(f, "expected update for epoch {}, found {}", expected, found)
            }
            Self::HistoryPruned { requested, oldest } => write!(
                f,
                "history after epoch {} was pruned, oldest retained is {}",
                requested, oldest
            ),
            Self::FutureEpoch { requested, current } => write!(
                f,
                "epoch {} is ahead of current epoch {}",
                requested, current
            ),
            Self::WitnessOwnerMismatch => write!(f, "element does not own the witness"),
            Self::InvalidWitness => write!(f, "witness does not verify"),
            Self::StaleWitness {
                witness_epoch,
                accumulator_epoch,
            } => write!(
                f,
                "witness is for epoch {} but accumulator is at {}",
                witness_epoch, accumulator_epoch
            ),
            Self::InsufficientShares {
                threshold,
                received,
            } => write!(f, "need {} shares, received {}", threshold, received),
            Self::InconsistentEpoch {
                registry,
                expected,
                found,
            } => write!(
                f,
                "registry {} sent update {}..{} but expected {}..{}",
                registry, found.0, found.1, expected.0, expected.1
            ),
            Self::InconsistentShares => write!(f, "shares do not interpolate consistently"),
            Self::InvalidThreshold { threshold, total } => {
                write!(f, "invalid threshold {} of {}", threshold, total)
            }
            Self::UpdateTooLarge {
                supported,
                required,
            } => write!(
                f,
                "request supports {} coefficients but update has {}",
                supported, required
            ),
            Self::InvalidProof { epoch } => {
                write!(f, "invalid membership proof for epoch {}", epoch)
            }
            Self::InvalidSignature => write!(f, "invalid accumulator signature"),
            Self::StaleProof {
                proof_epoch,
                accumulator_epoch,
            } => write!(
                f,
                "proof is for epoch {} but accumulator is at {}",
                proof_epoch, accumulator_epoch
            ),
            Self::UtilsError(e) => write!(f, "{}", e),
            Self::Serialization(e) => write!(f, "serialization error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllosaurError {}

impl From<UtilsError> for AllosaurError {
    fn from(e: UtilsError) -> Self {
        match e {
            UtilsError::InvalidThresholdOrTotal(threshold, total) => Self::InvalidThreshold {
                threshold,
                total: total as usize,
            },
            UtilsError::InvalidSignature => Self::InvalidSignature,
            UtilsError::Serialization(e) => Self::Serialization(e),
            e => Self::UtilsError(e),
        }
    }
}

impl From<SerializationError> for AllosaurError {
    fn from(e: SerializationError) -> Self {
        Self::Serialization(e)
    }
}
