//! Keys and setup parameters.
//!
//! The accumulator lives in G1 and the witness public key in G2: for trapdoor `alpha`, `witness_pk = P_tilde * alpha`.
//! A second secret `s` gives `sign_pk = P * s` which signs accumulator snapshots so a verifier can
//! authenticate the value it checks proofs against.

use allosaur_utils::{affine_group_element_from_byte_slices, serde_utils::ArkObjectBytes};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{rand::RngCore, UniformRand};
use digest::Digest;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Trapdoor `alpha` of the accumulator
#[serde_as]
#[derive(
    Clone,
    PartialEq,
    Eq,
    Debug,
    CanonicalSerialize,
    CanonicalDeserialize,
    Serialize,
    Deserialize,
    Zeroize,
    ZeroizeOnDrop,
)]
pub struct SecretKey<F: PrimeField>(#[serde_as(as = "ArkObjectBytes")] pub F);

/// Key signing accumulator snapshots
#[serde_as]
#[derive(
    Clone,
    PartialEq,
    Eq,
    Debug,
    CanonicalSerialize,
    CanonicalDeserialize,
    Serialize,
    Deserialize,
    Zeroize,
    ZeroizeOnDrop,
)]
pub struct SigningKey<F: PrimeField>(#[serde_as(as = "ArkObjectBytes")] pub F);

#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct SetupParams<E: Pairing> {
    /// Generator of G1. The accumulator of the empty set.
    #[serde_as(as = "ArkObjectBytes")]
    pub P: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub P_tilde: E::G2Affine,
}

#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct PublicKeys<E: Pairing> {
    /// `P_tilde * alpha`
    #[serde_as(as = "ArkObjectBytes")]
    pub witness_pk: E::G2Affine,
    /// `P * s`
    #[serde_as(as = "ArkObjectBytes")]
    pub sign_pk: E::G1Affine,
}

/// Both secrets of a registry with the matching public keys. Registries sharing a keypair are
/// replicas of the same accumulator.
#[derive(Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct Keypair<E: Pairing> {
    pub secret_key: SecretKey<E::ScalarField>,
    pub signing_key: SigningKey<E::ScalarField>,
    pub public_keys: PublicKeys<E>,
}

impl<F: PrimeField> SecretKey<F> {
    pub fn new<R: RngCore>(rng: &mut R) -> Self {
        Self(F::rand(rng))
    }
}

impl<F: PrimeField> SigningKey<F> {
    pub fn new<R: RngCore>(rng: &mut R) -> Self {
        Self(F::rand(rng))
    }
}

impl<E: Pairing> SetupParams<E> {
    /// Generate params by hashing a known string. The hash function is vulnerable to timing
    /// attack but since all this is public knowledge, it is fine.
    /// This is useful if people need to be convinced that the discrete log of group elements wrt each other is not known.
    pub fn new<D: Digest>(label: &[u8]) -> Self {
        let P = affine_group_element_from_byte_slices!(label, b" : P");
        let P_tilde = affine_group_element_from_byte_slices!(label, b" : P_tilde");
        Self { P, P_tilde }
    }

    /// Generate params using a random number generator
    pub fn generate_using_rng<R: RngCore>(rng: &mut R) -> Self {
        Self {
            P: E::G1::rand(rng).into_affine(),
            P_tilde: E::G2::rand(rng).into_affine(),
        }
    }

    /// Params shouldn't be 0
    pub fn is_valid(&self) -> bool {
        !(self.P.is_zero() || self.P_tilde.is_zero())
    }
}

impl<E: Pairing> PublicKeys<E> {
    /// Generate public keys from given secret keys and setup parameters
    pub fn new_from_secret_keys(
        secret_key: &SecretKey<E::ScalarField>,
        signing_key: &SigningKey<E::ScalarField>,
        setup_params: &SetupParams<E>,
    ) -> Self {
        Self {
            witness_pk: setup_params
                .P_tilde
                .mul_bigint(secret_key.0.into_bigint())
                .into_affine(),
            sign_pk: setup_params
                .P
                .mul_bigint(signing_key.0.into_bigint())
                .into_affine(),
        }
    }

    /// Public keys shouldn't be 0
    pub fn is_valid(&self) -> bool {
        !(self.witness_pk.is_zero() || self.sign_pk.is_zero())
    }
}

impl<E: Pairing> Keypair<E> {
    pub fn generate_using_rng<R: RngCore>(rng: &mut R, setup_params: &SetupParams<E>) -> Self {
        let secret_key = SecretKey::new(rng);
        let signing_key = SigningKey::new(rng);
        Self::from_secret_keys(secret_key, signing_key, setup_params)
    }

    pub fn from_secret_keys(
        secret_key: SecretKey<E::ScalarField>,
        signing_key: SigningKey<E::ScalarField>,
        setup_params: &SetupParams<E>,
    ) -> Self {
        let public_keys = PublicKeys::new_from_secret_keys(&secret_key, &signing_key, setup_params);
        Self {
            secret_key,
            signing_key,
            public_keys,
        }
    }
}
