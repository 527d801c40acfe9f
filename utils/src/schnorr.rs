//! Schnorr protocol to prove knowledge of the openings of a multi-base relation `y = sum_i bases[i] * witnesses[i]`.
//! The prover commits with random blindings, gets a challenge and responds with `blinding + challenge * witness`
//! for each witness.

use crate::{error::UtilsError, hashing_utils::field_elem_from_try_and_incr, serde_utils::ArkObjectBytes};
use ark_ec::{AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, Write};
use ark_std::{vec::Vec, UniformRand, rand::RngCore};
use digest::Digest;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Contributes bytes to the Fiat-Shamir challenge
pub trait ChallengeContributor {
    fn challenge_contribution<W: Write>(&self, writer: W) -> Result<(), UtilsError>;
}

/// Commitment to the blindings. The blindings are secret and wiped on drop.
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SchnorrCommitment<G: AffineRepr> {
    pub blindings: Vec<G::ScalarField>,
    #[zeroize(skip)]
    pub t: G,
}

impl<G: AffineRepr> SchnorrCommitment<G> {
    pub fn new(bases: &[G], blindings: Vec<G::ScalarField>) -> Self {
        let t = G::Group::msm_unchecked(bases, &blindings).into_affine();
        Self { blindings, t }
    }

    /// Commit with fresh random blindings, one per base
    pub fn random<R: RngCore>(rng: &mut R, bases: &[G]) -> Self {
        let blindings = (0..bases.len())
            .map(|_| G::ScalarField::rand(rng))
            .collect::<Vec<_>>();
        Self::new(bases, blindings)
    }

    pub fn response(
        &self,
        witnesses: &[G::ScalarField],
        challenge: &G::ScalarField,
    ) -> Result<SchnorrResponse<G>, UtilsError> {
        if self.blindings.len() != witnesses.len() {
            return Err(UtilsError::VectorLengthMismatch(
                self.blindings.len(),
                witnesses.len(),
            ));
        }
        let responses = crate::iter!(self.blindings)
            .zip(crate::iter!(witnesses))
            .map(|(b, w)| *b + (*w * challenge))
            .collect::<Vec<_>>();
        Ok(SchnorrResponse(responses))
    }
}

impl<G: AffineRepr> ChallengeContributor for SchnorrCommitment<G> {
    fn challenge_contribution<W: Write>(&self, writer: W) -> Result<(), UtilsError> {
        self.t.serialize_compressed(writer).map_err(|e| e.into())
    }
}

#[serde_as]
#[derive(
    Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct SchnorrResponse<G: AffineRepr>(
    #[serde_as(as = "Vec<ArkObjectBytes>")] pub Vec<G::ScalarField>,
);

impl<G: AffineRepr> SchnorrResponse<G> {
    /// Check `sum_i bases[i] * responses[i] - y * challenge == t`
    pub fn is_valid(
        &self,
        bases: &[G],
        y: &G,
        t: &G,
        challenge: &G::ScalarField,
    ) -> Result<(), UtilsError> {
        if self.len() != bases.len() {
            return Err(UtilsError::VectorLengthMismatch(self.len(), bases.len()));
        }
        let mut bases = bases.to_vec();
        bases.push(*y);
        let mut scalars = self.0.clone();
        scalars.push(-*challenge);
        if G::Group::msm_unchecked(&bases, &scalars).into_affine() == *t {
            Ok(())
        } else {
            Err(UtilsError::InvalidResponse)
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Uses try-and-increment. Vulnerable to side channel attacks but the challenge is public anyway.
pub fn compute_random_oracle_challenge<F: PrimeField, D: Digest>(challenge_bytes: &[u8]) -> F {
    field_elem_from_try_and_incr::<F, D>(challenge_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::{Fr, G1Affine, G1Projective};
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use blake2::Blake2b512;

    #[test]
    fn schnorr_two_bases() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let bases = (0..2)
            .map(|_| G1Projective::rand(&mut rng).into_affine())
            .collect::<Vec<G1Affine>>();
        let witnesses = (0..2).map(|_| Fr::rand(&mut rng)).collect::<Vec<_>>();
        let y = G1Projective::msm_unchecked(&bases, &witnesses).into_affine();

        let comm = SchnorrCommitment::random(&mut rng, &bases);
        let mut bytes = vec![];
        comm.challenge_contribution(&mut bytes).unwrap();
        y.serialize_compressed(&mut bytes).unwrap();
        let challenge = compute_random_oracle_challenge::<Fr, Blake2b512>(&bytes);

        let resp = comm.response(&witnesses, &challenge).unwrap();
        resp.is_valid(&bases, &y, &comm.t, &challenge).unwrap();
        assert_eq!(resp.len(), 2);

        let wrong_challenge = challenge + Fr::from(1u64);
        assert!(matches!(
            resp.is_valid(&bases, &y, &comm.t, &wrong_challenge),
            Err(UtilsError::InvalidResponse)
        ));
        assert!(comm.response(&witnesses[..1], &challenge).is_err());
    }
}
