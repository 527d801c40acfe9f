//! Zero knowledge proof of membership. This is the proof of knowledge of a weak-BB signature where the prover does
//! no pairings, with the accumulator value in place of the signer's generator.
//!
//! Witness is `C`, accumulator value is `V`, member is `y`, trapdoor is `alpha` and `C * (y + alpha) = V`.
//! 1. Prover picks a random `r` and randomizes the witness as `C' = C * r`.
//! 2. Prover creates `C_bar = V * r - C' * y` and sends `C'` and `C_bar` to the verifier.
//! 3. Prover proves knowledge of `r` and `y` in `C_bar = V * r - C' * y`.
//! 4. Verifier checks the proof from step 3, that `C'` is not 0 and `e(C_bar, P_tilde) = e(C', witness_pk)`.
//!
//! The challenge also covers a nonce chosen by the verifier and the epoch of the accumulator so a proof
//! can neither be replayed to another verifier nor presented against another accumulator state.
//!
//! ```ignore
//! let proof = MembershipProof::prove::<_, Blake2b512>(&mut rng, &witness, &accumulator, &pk, &params, &nonce)?;
//! proof.verify_for_nonce::<Blake2b512>(&nonce, &accumulator, &pk, &params)?;
//! ```

use crate::{
    accumulator::{Accumulator, Epoch},
    error::AllosaurError,
    setup::{PublicKeys, SetupParams},
    witness::MembershipWitness,
};
use allosaur_utils::{
    schnorr::{compute_random_oracle_challenge, SchnorrCommitment, SchnorrResponse},
    serde_utils::ArkObjectBytes,
};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::Zero;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{io::Write, ops::Neg, rand::RngCore, vec, vec::Vec, UniformRand};
use digest::Digest;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Shortest nonce a verifier may issue
pub const MIN_NONCE_LENGTH: usize = 16;

#[derive(Clone, PartialEq, Eq, Debug, Zeroize, ZeroizeOnDrop)]
pub struct MembershipProofProtocol<E: Pairing> {
    /// The randomized witness `C'`
    #[zeroize(skip)]
    pub C_prime: E::G1Affine,
    /// `V * r - C' * y`
    #[zeroize(skip)]
    pub C_bar: E::G1Affine,
    /// For relation `C_bar = V * r - C' * y`
    pub sc_comm: SchnorrCommitment<E::G1Affine>,
    /// (r, y)
    sc_wits: [E::ScalarField; 2],
    #[zeroize(skip)]
    pub epoch: Epoch,
    #[zeroize(skip)]
    pub nonce: Vec<u8>,
}

#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
#[serde(bound = "")]
pub struct MembershipProof<E: Pairing> {
    /// The randomized witness `C'`
    #[serde_as(as = "ArkObjectBytes")]
    pub C_prime: E::G1Affine,
    /// `V * r - C' * y`
    #[serde_as(as = "ArkObjectBytes")]
    pub C_bar: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub t: E::G1Affine,
    pub sc_resp: SchnorrResponse<E::G1Affine>,
    #[serde_as(as = "ArkObjectBytes")]
    pub challenge: E::ScalarField,
    /// Epoch of the accumulator the proof was created for
    pub epoch: Epoch,
    pub nonce: Vec<u8>,
}

impl<E: Pairing> MembershipProofProtocol<E> {
    /// Start a proof for `witness` against `accumulator`. Both must be of the same epoch.
    pub fn init<R: RngCore>(
        rng: &mut R,
        witness: &MembershipWitness<E::G1Affine>,
        accumulator: &Accumulator<E::G1Affine>,
        nonce: &[u8],
    ) -> Result<Self, AllosaurError> {
        if nonce.len() < MIN_NONCE_LENGTH {
            return Err(AllosaurError::EncodingError("nonce is shorter than 16 bytes"));
        }
        if witness.epoch != accumulator.epoch {
            return Err(AllosaurError::StaleWitness {
                witness_epoch: witness.epoch,
                accumulator_epoch: accumulator.epoch,
            });
        }
        let r = E::ScalarField::rand(rng);
        let y = witness.owner;
        let C_prime = witness.value * r;
        let C_prime_neg = C_prime.neg();
        // C_bar = V * r - C' * y
        let C_bar = (accumulator.value * r + C_prime_neg * y).into_affine();
        let sc_comm = SchnorrCommitment::random(rng, &[accumulator.value, C_prime_neg.into()]);
        Ok(Self {
            C_prime: C_prime.into_affine(),
            C_bar,
            sc_comm,
            sc_wits: [r, y],
            epoch: accumulator.epoch,
            nonce: nonce.to_vec(),
        })
    }

    pub fn challenge_contribution<W: Write>(
        &self,
        accumulator_value: &E::G1Affine,
        pk: &PublicKeys<E>,
        params: &SetupParams<E>,
        writer: W,
    ) -> Result<(), AllosaurError> {
        MembershipProof::<E>::compute_challenge_contribution(
            &self.nonce,
            self.epoch,
            accumulator_value,
            &self.C_prime,
            &self.C_bar,
            &self.sc_comm.t,
            pk,
            params,
            writer,
        )
    }

    pub fn gen_proof(self, challenge: &E::ScalarField) -> Result<MembershipProof<E>, AllosaurError> {
        let sc_resp = self.sc_comm.response(&self.sc_wits, challenge)?;
        Ok(MembershipProof {
            C_prime: self.C_prime,
            C_bar: self.C_bar,
            t: self.sc_comm.t,
            sc_resp,
            challenge: *challenge,
            epoch: self.epoch,
            nonce: self.nonce.clone(),
        })
    }
}

impl<E: Pairing> MembershipProof<E> {
    /// Create a proof in one go with the challenge computed by hashing with `D`
    pub fn prove<R: RngCore, D: Digest>(
        rng: &mut R,
        witness: &MembershipWitness<E::G1Affine>,
        accumulator: &Accumulator<E::G1Affine>,
        pk: &PublicKeys<E>,
        params: &SetupParams<E>,
        nonce: &[u8],
    ) -> Result<Self, AllosaurError> {
        let protocol = MembershipProofProtocol::<E>::init(rng, witness, accumulator, nonce)?;
        let mut challenge_bytes = vec![];
        protocol.challenge_contribution(&accumulator.value, pk, params, &mut challenge_bytes)?;
        let challenge = compute_random_oracle_challenge::<E::ScalarField, D>(&challenge_bytes);
        protocol.gen_proof(&challenge)
    }

    /// Verify against `accumulator`, which must be of the epoch the proof was created for
    pub fn verify<D: Digest>(
        &self,
        accumulator: &Accumulator<E::G1Affine>,
        pk: &PublicKeys<E>,
        params: &SetupParams<E>,
    ) -> Result<(), AllosaurError> {
        if self.epoch != accumulator.epoch {
            return Err(AllosaurError::StaleProof {
                proof_epoch: self.epoch,
                accumulator_epoch: accumulator.epoch,
            });
        }
        if self.C_prime.is_zero() {
            return Err(AllosaurError::InvalidProof { epoch: self.epoch });
        }

        let mut challenge_bytes = vec![];
        self.challenge_contribution(&accumulator.value, pk, params, &mut challenge_bytes)?;
        if compute_random_oracle_challenge::<E::ScalarField, D>(&challenge_bytes) != self.challenge {
            return Err(AllosaurError::InvalidProof { epoch: self.epoch });
        }

        self.sc_resp
            .is_valid(
                &[accumulator.value, self.C_prime.into_group().neg().into()],
                &self.C_bar,
                &self.t,
                &self.challenge,
            )
            .map_err(|_| AllosaurError::InvalidProof { epoch: self.epoch })?;

        if !E::multi_pairing(
            [self.C_bar, self.C_prime.into_group().neg().into_affine()],
            [params.P_tilde, pk.witness_pk],
        )
        .is_zero()
        {
            return Err(AllosaurError::InvalidProof { epoch: self.epoch });
        }
        Ok(())
    }

    /// Verify and check that the proof answers the nonce the verifier issued
    pub fn verify_for_nonce<D: Digest>(
        &self,
        expected_nonce: &[u8],
        accumulator: &Accumulator<E::G1Affine>,
        pk: &PublicKeys<E>,
        params: &SetupParams<E>,
    ) -> Result<(), AllosaurError> {
        if self.nonce != expected_nonce {
            return Err(AllosaurError::InvalidProof { epoch: self.epoch });
        }
        self.verify::<D>(accumulator, pk, params)
    }

    pub fn challenge_contribution<W: Write>(
        &self,
        accumulator_value: &E::G1Affine,
        pk: &PublicKeys<E>,
        params: &SetupParams<E>,
        writer: W,
    ) -> Result<(), AllosaurError> {
        Self::compute_challenge_contribution(
            &self.nonce,
            self.epoch,
            accumulator_value,
            &self.C_prime,
            &self.C_bar,
            &self.t,
            pk,
            params,
            writer,
        )
    }

    pub fn compute_challenge_contribution<W: Write>(
        nonce: &[u8],
        epoch: Epoch,
        accumulator_value: &E::G1Affine,
        C_prime: &E::G1Affine,
        C_bar: &E::G1Affine,
        t: &E::G1Affine,
        pk: &PublicKeys<E>,
        params: &SetupParams<E>,
        mut writer: W,
    ) -> Result<(), AllosaurError> {
        nonce.serialize_compressed(&mut writer)?;
        epoch.serialize_compressed(&mut writer)?;
        accumulator_value.serialize_compressed(&mut writer)?;
        C_prime.serialize_compressed(&mut writer)?;
        C_bar.serialize_compressed(&mut writer)?;
        t.serialize_compressed(&mut writer)?;
        params.P_tilde.serialize_compressed(&mut writer)?;
        pk.witness_pk.serialize_compressed(&mut writer)?;
        Ok(())
    }
}
