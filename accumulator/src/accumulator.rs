//! The accumulator value and the primitives changing it.
//!
//! For trapdoor `alpha` and active members `y_1, ..., y_n`, the accumulator is `V = P * (y_1 + alpha) * ... * (y_n + alpha)`.
//! Adding `y` multiplies `V` by `y + alpha` and deleting divides by it, so these need the trapdoor. A witness for `y`
//! is `C = V * 1/(y + alpha)` and is checked with the pairing equation `e(C, P_tilde * y + witness_pk) = e(V, P_tilde)`.

use crate::{
    error::AllosaurError,
    setup::{PublicKeys, SetupParams},
};
use allosaur_utils::{
    poly::eval_negated_roots_direct, schnorr_signature::Signature, serde_utils::ArkObjectBytes,
};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::{Field, One, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{rand::RngCore, vec::Vec};
use digest::Digest;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

pub type Epoch = u64;

#[serde_as]
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Debug,
    CanonicalSerialize,
    CanonicalDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Accumulator<G: AffineRepr> {
    #[serde_as(as = "ArkObjectBytes")]
    pub value: G,
    pub epoch: Epoch,
}

impl<G: AffineRepr> Accumulator<G> {
    /// Accumulator of the empty set at epoch 0
    pub fn initial(P: G) -> Self {
        Self { value: P, epoch: 0 }
    }

    pub fn value(&self) -> &G {
        &self.value
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Bytes a snapshot signature is computed over
    pub fn to_signing_bytes(&self) -> Result<Vec<u8>, AllosaurError> {
        let mut bytes = Vec::with_capacity(8 + self.value.compressed_size());
        bytes.extend_from_slice(&self.epoch.to_le_bytes());
        self.value.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }
}

/// Accumulator snapshot signed with the registry's signing key, so a verifier can authenticate the
/// value and epoch it checks proofs against
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
#[serde(bound = "")]
pub struct SignedAccumulator<G: AffineRepr> {
    pub accumulator: Accumulator<G>,
    pub signature: Signature<G>,
}

impl<G: AffineRepr> SignedAccumulator<G> {
    pub fn new<R: RngCore, D: Digest>(
        rng: &mut R,
        accumulator: Accumulator<G>,
        signing_key: &G::ScalarField,
        P: &G,
    ) -> Result<Self, AllosaurError> {
        let signature =
            Signature::new::<R, D>(rng, &accumulator.to_signing_bytes()?, signing_key, P)?;
        Ok(Self {
            accumulator,
            signature,
        })
    }

    /// Verify with `sign_pk` of the registry and `P` of its setup params
    pub fn verify<D: Digest>(&self, sign_pk: &G, P: &G) -> Result<(), AllosaurError> {
        self.signature
            .verify::<D>(&self.accumulator.to_signing_bytes()?, sign_pk, P)?;
        Ok(())
    }
}

/// `prior_value * (scalar + trapdoor)`. Like the other functions taking the trapdoor here, this is not
/// constant time in the trapdoor.
pub fn accumulate<G: AffineRepr>(
    trapdoor: &G::ScalarField,
    scalar: &G::ScalarField,
    prior_value: &G,
) -> Result<G::Group, AllosaurError> {
    let factor = *scalar + trapdoor;
    if factor.is_zero() {
        return Err(AllosaurError::ProhibitedElement);
    }
    Ok(prior_value.mul_bigint(factor.into_bigint()))
}

/// `prior_value * 1/(scalar + trapdoor)`
pub fn remove<G: AffineRepr>(
    trapdoor: &G::ScalarField,
    scalar: &G::ScalarField,
    prior_value: &G,
) -> Result<G::Group, AllosaurError> {
    let factor = (*scalar + trapdoor)
        .inverse()
        .ok_or(AllosaurError::ProhibitedElement)?;
    Ok(prior_value.mul_bigint(factor.into_bigint()))
}

/// `prior_value * 1/((d_1 + trapdoor) * (d_2 + trapdoor) * ...)`. The product is the evaluation of
/// `d_D(x) = (d_1 - x) * (d_2 - x) * ...` at `-trapdoor`.
pub fn remove_batch<G: AffineRepr>(
    trapdoor: &G::ScalarField,
    scalars: &[G::ScalarField],
    prior_value: &G,
) -> Result<G::Group, AllosaurError> {
    let factor = eval_negated_roots_direct(scalars, &-*trapdoor)
        .inverse()
        .ok_or(AllosaurError::ProhibitedElement)?;
    Ok(prior_value.mul_bigint(factor.into_bigint()))
}

/// Accumulate all of `scalars` from scratch, starting at `P`
pub fn accumulate_all<G: AffineRepr>(
    trapdoor: &G::ScalarField,
    scalars: &[G::ScalarField],
    P: &G,
) -> G::Group {
    let factor = scalars
        .iter()
        .fold(G::ScalarField::one(), |acc, y| acc * (*y + trapdoor));
    P.mul_bigint(factor.into_bigint())
}

/// Check `e(witness, P_tilde * member + witness_pk) == e(accumulator, P_tilde)`
pub fn verify_membership<E: Pairing>(
    member: &E::ScalarField,
    witness: &E::G1Affine,
    accumulator_value: &E::G1Affine,
    pk: &PublicKeys<E>,
    params: &SetupParams<E>,
) -> bool {
    let P_tilde_times_y_plus_Q_tilde =
        params.P_tilde.mul_bigint(member.into_bigint()) + pk.witness_pk;
    E::multi_pairing(
        [*witness, (-accumulator_value.into_group()).into_affine()],
        [P_tilde_times_y_plus_Q_tilde.into_affine(), params.P_tilde],
    )
    .is_zero()
}
