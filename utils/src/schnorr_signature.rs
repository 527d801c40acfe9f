use crate::{
    error::UtilsError, hashing_utils::field_elem_from_try_and_incr, serde_utils::ArkObjectBytes,
};
use ark_ec::{AffineRepr, CurveGroup};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{rand::RngCore, vec::Vec, UniformRand};
use digest::Digest;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Schnorr signature `(response, challenge)` where `challenge = H(gen * r || message)`
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct Signature<G: AffineRepr> {
    #[serde_as(as = "ArkObjectBytes")]
    pub response: G::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub challenge: G::ScalarField,
}

impl<G: AffineRepr> Signature<G> {
    pub fn new<R: RngCore, D: Digest>(
        rng: &mut R,
        message: &[u8],
        secret_key: &G::ScalarField,
        gen: &G,
    ) -> Result<Self, UtilsError> {
        let r = G::ScalarField::rand(rng);
        let t = (*gen * r).into_affine();
        let challenge = Self::compute_challenge::<D>(&t, message)?;
        let response = r + challenge * secret_key;
        Ok(Self {
            response,
            challenge,
        })
    }

    pub fn verify<D: Digest>(
        &self,
        message: &[u8],
        public_key: &G,
        gen: &G,
    ) -> Result<(), UtilsError> {
        let t = (*gen * self.response - *public_key * self.challenge).into_affine();
        if Self::compute_challenge::<D>(&t, message)? == self.challenge {
            Ok(())
        } else {
            Err(UtilsError::InvalidSignature)
        }
    }

    pub fn compute_challenge<D: Digest>(
        t: &G,
        message: &[u8],
    ) -> Result<G::ScalarField, UtilsError> {
        let mut challenge_bytes = Vec::with_capacity(t.compressed_size() + message.len());
        t.serialize_compressed(&mut challenge_bytes)?;
        challenge_bytes.extend_from_slice(message);
        Ok(field_elem_from_try_and_incr::<G::ScalarField, D>(
            &challenge_bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::{Fr, G1Projective};
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use blake2::Blake2b512;

    #[test]
    fn sig_verify() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let message = vec![1, 2, 3, 4];
        let gen = G1Projective::rand(&mut rng).into_affine();
        let sk = Fr::rand(&mut rng);
        let pk = (gen * sk).into_affine();
        let sig = Signature::new::<_, Blake2b512>(&mut rng, &message, &sk, &gen).unwrap();
        sig.verify::<Blake2b512>(&message, &pk, &gen).unwrap();
        assert!(sig.verify::<Blake2b512>(&[1, 2, 3], &pk, &gen).is_err());

        let other_pk = (gen * Fr::rand(&mut rng)).into_affine();
        assert!(sig.verify::<Blake2b512>(&message, &other_pk, &gen).is_err());
    }
}
