//! Members are identified by scalars. Identifiers given as bytes are hashed to a scalar under a tag
//! used for nothing else.

use crate::error::AllosaurError;
use allosaur_utils::{hashing_utils::hash_to_field, serde_utils::ArkObjectBytes};
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use sha2::Sha256;

pub const USER_ID_DST: &[u8] = b"ALLOSAUR-V1-USER-ID-HASH-TO-SCALAR";

/// Hash an identifier to a scalar. Empty identifiers are rejected rather than hashed.
pub fn hash_to_scalar<F: PrimeField>(bytes: &[u8]) -> Result<F, AllosaurError> {
    if bytes.is_empty() {
        return Err(AllosaurError::EncodingError("empty identifier"));
    }
    let y = hash_to_field::<F, Sha256>(USER_ID_DST, bytes);
    if y.is_zero() {
        return Err(AllosaurError::EncodingError("identifier hashes to zero"));
    }
    Ok(y)
}

/// Identifier of a member as a scalar
#[serde_as]
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    CanonicalSerialize,
    CanonicalDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Element<F: PrimeField>(#[serde_as(as = "ArkObjectBytes")] pub F);

impl<F: PrimeField> Element<F> {
    pub fn hash(bytes: &[u8]) -> Result<Self, AllosaurError> {
        hash_to_scalar(bytes).map(Self)
    }

    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        Self(F::rand(rng))
    }

    pub fn scalar(&self) -> &F {
        &self.0
    }
}

impl<F: PrimeField> From<F> for Element<F> {
    fn from(f: F) -> Self {
        Self(f)
    }
}
