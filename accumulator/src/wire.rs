//! Fixed length byte encodings over BLS12-381 and a registry handle speaking them, for callers across a
//! language or process boundary.
//!
//! Scalars are 32 bytes, G1 elements 48 bytes and G2 elements 96 bytes, all in arkworks' compressed form.
//! A witness is `value || epoch || owner` (88 bytes), an accumulator `value || epoch` (56 bytes) and public keys
//! `witness_pk || sign_pk` (144 bytes), with epochs as 8 little endian bytes. Lists are concatenated blocks and are
//! rejected unless their length is an exact multiple of the block size. Failures are reported as an
//! [`ExternError`] carrying the numeric code of [`ErrorCode`].

use crate::{
    accumulator::{Accumulator, Epoch},
    batch_utils::Omega,
    error::{AllosaurError, ErrorCode},
    proofs::MembershipProof,
    registry::{Registry, RegistryConfig},
    setup::{Keypair, PublicKeys, SetupParams},
    update::AggregatedUpdate,
    witness::MembershipWitness,
};
use ark_bls12_381::{Bls12_381, Fr, G1Affine, G2Affine};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::rand::RngCore;
use blake2::Blake2b512;
use std::{fmt, sync::Arc};

pub const SCALAR_BYTES: usize = 32;
pub const G1_BYTES: usize = 48;
pub const G2_BYTES: usize = 96;
pub const EPOCH_BYTES: usize = 8;
pub const WITNESS_BYTES: usize = G1_BYTES + EPOCH_BYTES + SCALAR_BYTES;
pub const ACCUMULATOR_BYTES: usize = G1_BYTES + EPOCH_BYTES;
pub const PUBLIC_KEYS_BYTES: usize = G2_BYTES + G1_BYTES;

/// Label the default setup params are derived from
pub const DEFAULT_SETUP_LABEL: &[u8] = b"ALLOSAUR-V1-BLS12-381-SETUP";

/// Error as seen across the boundary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternError {
    pub code: ErrorCode,
    pub message: String,
}

impl ExternError {
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            message: String::new(),
        }
    }

    pub fn code_value(&self) -> u32 {
        self.code as u32
    }
}

impl From<AllosaurError> for ExternError {
    fn from(e: AllosaurError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for ExternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code_value())
    }
}

impl std::error::Error for ExternError {}

pub fn default_params() -> SetupParams<Bls12_381> {
    SetupParams::new::<Blake2b512>(DEFAULT_SETUP_LABEL)
}

fn check_length(what: &'static str, bytes: &[u8], expected: usize) -> Result<(), AllosaurError> {
    if bytes.len() != expected {
        return Err(AllosaurError::InvalidLength {
            what,
            expected,
            found: bytes.len(),
        });
    }
    Ok(())
}

fn to_bytes<T: CanonicalSerialize>(t: &T) -> Result<Vec<u8>, AllosaurError> {
    let mut bytes = Vec::with_capacity(t.compressed_size());
    t.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Fr, AllosaurError> {
    check_length("scalar", bytes, SCALAR_BYTES)?;
    Fr::deserialize_compressed(bytes).map_err(|_| AllosaurError::EncodingError("invalid scalar"))
}

pub fn g1_from_bytes(bytes: &[u8]) -> Result<G1Affine, AllosaurError> {
    check_length("G1 element", bytes, G1_BYTES)?;
    G1Affine::deserialize_compressed(bytes)
        .map_err(|_| AllosaurError::EncodingError("invalid G1 element"))
}

pub fn g2_from_bytes(bytes: &[u8]) -> Result<G2Affine, AllosaurError> {
    check_length("G2 element", bytes, G2_BYTES)?;
    G2Affine::deserialize_compressed(bytes)
        .map_err(|_| AllosaurError::EncodingError("invalid G2 element"))
}

fn epoch_from_bytes(bytes: &[u8]) -> Result<Epoch, AllosaurError> {
    let mut b = [0u8; EPOCH_BYTES];
    check_length("epoch", bytes, EPOCH_BYTES)?;
    b.copy_from_slice(bytes);
    Ok(Epoch::from_le_bytes(b))
}

/// Split `bytes` into blocks of `block` bytes and decode each
pub fn decode_blocks<T>(
    what: &'static str,
    bytes: &[u8],
    block: usize,
    decode: impl Fn(&[u8]) -> Result<T, AllosaurError>,
) -> Result<Vec<T>, AllosaurError> {
    if bytes.len() % block != 0 {
        return Err(AllosaurError::InvalidLength {
            what,
            expected: (bytes.len() / block + 1) * block,
            found: bytes.len(),
        });
    }
    bytes.chunks_exact(block).map(decode).collect()
}

pub fn witness_to_bytes(witness: &MembershipWitness<G1Affine>) -> Result<Vec<u8>, AllosaurError> {
    let mut bytes = Vec::with_capacity(WITNESS_BYTES);
    witness.value.serialize_compressed(&mut bytes)?;
    bytes.extend_from_slice(&witness.epoch.to_le_bytes());
    witness.owner.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

pub fn witness_from_bytes(bytes: &[u8]) -> Result<MembershipWitness<G1Affine>, AllosaurError> {
    check_length("witness", bytes, WITNESS_BYTES)?;
    let (value, rest) = bytes.split_at(G1_BYTES);
    let (epoch, owner) = rest.split_at(EPOCH_BYTES);
    Ok(MembershipWitness::new(
        g1_from_bytes(value)?,
        epoch_from_bytes(epoch)?,
        scalar_from_bytes(owner)?,
    ))
}

pub fn accumulator_to_bytes(accumulator: &Accumulator<G1Affine>) -> Result<Vec<u8>, AllosaurError> {
    let mut bytes = Vec::with_capacity(ACCUMULATOR_BYTES);
    accumulator.value.serialize_compressed(&mut bytes)?;
    bytes.extend_from_slice(&accumulator.epoch.to_le_bytes());
    Ok(bytes)
}

pub fn accumulator_from_bytes(bytes: &[u8]) -> Result<Accumulator<G1Affine>, AllosaurError> {
    check_length("accumulator", bytes, ACCUMULATOR_BYTES)?;
    let (value, epoch) = bytes.split_at(G1_BYTES);
    Ok(Accumulator {
        value: g1_from_bytes(value)?,
        epoch: epoch_from_bytes(epoch)?,
    })
}

pub fn public_keys_to_bytes(pk: &PublicKeys<Bls12_381>) -> Result<Vec<u8>, AllosaurError> {
    let mut bytes = Vec::with_capacity(PUBLIC_KEYS_BYTES);
    pk.witness_pk.serialize_compressed(&mut bytes)?;
    pk.sign_pk.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

pub fn public_keys_from_bytes(bytes: &[u8]) -> Result<PublicKeys<Bls12_381>, AllosaurError> {
    check_length("public keys", bytes, PUBLIC_KEYS_BYTES)?;
    let (witness_pk, sign_pk) = bytes.split_at(G2_BYTES);
    Ok(PublicKeys {
        witness_pk: g2_from_bytes(witness_pk)?,
        sign_pk: g1_from_bytes(sign_pk)?,
    })
}

/// Shared handle to a registry over BLS12-381 with byte level endpoints. Clones refer to the same registry.
#[derive(Clone)]
pub struct RegistryHandle {
    inner: Arc<Registry<Bls12_381>>,
}

impl RegistryHandle {
    /// New registry with fresh keys over [`default_params`]
    pub fn new<R: RngCore>(rng: &mut R, config: RegistryConfig) -> Self {
        Self::from_registry(Registry::create(rng, default_params(), config))
    }

    pub fn from_keys(keypair: Keypair<Bls12_381>, config: RegistryConfig) -> Self {
        Self::from_registry(Registry::from_keys(keypair, default_params(), config))
    }

    pub fn from_registry(registry: Registry<Bls12_381>) -> Self {
        Self {
            inner: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry<Bls12_381> {
        &self.inner
    }

    /// Returns the witness of the new member
    pub fn add_member(&self, id: &[u8]) -> Result<Vec<u8>, ExternError> {
        Ok(witness_to_bytes(&self.inner.add_member(id)?)?)
    }

    /// Returns the new accumulator
    pub fn delete_member(&self, id: &[u8]) -> Result<Vec<u8>, ExternError> {
        Ok(accumulator_to_bytes(&self.inner.delete_member(id)?)?)
    }

    /// Delete members given as concatenated 32 byte scalars. Returns the new accumulator.
    pub fn batch_delete(&self, deletions: &[u8]) -> Result<Vec<u8>, ExternError> {
        let ys = decode_blocks("deletions", deletions, SCALAR_BYTES, scalar_from_bytes)?;
        Ok(accumulator_to_bytes(&self.inner.batch_delete_scalars(&ys)?)?)
    }

    pub fn current_epoch(&self) -> Epoch {
        self.inner.current_epoch()
    }

    pub fn accumulator(&self) -> Result<Vec<u8>, ExternError> {
        Ok(accumulator_to_bytes(&self.inner.current_accumulator())?)
    }

    pub fn witness_public_key(&self) -> Result<Vec<u8>, ExternError> {
        Ok(to_bytes(&self.inner.public_keys().witness_pk)?)
    }

    pub fn sign_public_key(&self) -> Result<Vec<u8>, ExternError> {
        Ok(to_bytes(&self.inner.public_keys().sign_pk)?)
    }

    pub fn public_keys(&self) -> Result<Vec<u8>, ExternError> {
        Ok(public_keys_to_bytes(self.inner.public_keys())?)
    }

    /// The update since `epoch` in its canonical serialization, for [`apply_update`]
    pub fn update_since(&self, epoch: Epoch) -> Result<Vec<u8>, ExternError> {
        Ok(to_bytes(&self.inner.update_since(epoch)?)?)
    }
}

/// Update a witness with deletions only, like those of a published revocation file. `deletions` are 32 byte
/// blocks and `coefficients` 48 byte blocks.
pub fn multi_batch_update(
    witness: &[u8],
    y: &[u8],
    deletions: &[u8],
    coefficients: &[u8],
    target_epoch: Epoch,
) -> Result<Vec<u8>, ExternError> {
    let witness = witness_from_bytes(witness)?;
    let y = scalar_from_bytes(y)?;
    let deletions = decode_blocks("deletions", deletions, SCALAR_BYTES, scalar_from_bytes)?;
    let coefficients = decode_blocks("coefficients", coefficients, G1_BYTES, g1_from_bytes)?;
    let updated = witness.multi_batch_update(
        &y,
        &[],
        &deletions,
        &Omega(coefficients),
        target_epoch,
    )?;
    Ok(witness_to_bytes(&updated)?)
}

/// Update a witness with an update from [`RegistryHandle::update_since`]
pub fn apply_update(witness: &[u8], update: &[u8]) -> Result<Vec<u8>, ExternError> {
    let witness = witness_from_bytes(witness)?;
    let update = AggregatedUpdate::<G1Affine>::deserialize_compressed(update)
        .map_err(|_| AllosaurError::EncodingError("invalid update"))?;
    Ok(witness_to_bytes(&witness.apply_aggregated(&update)?)?)
}

pub fn check_witness(
    witness: &[u8],
    accumulator: &[u8],
    public_keys: &[u8],
) -> Result<(), ExternError> {
    let witness = witness_from_bytes(witness)?;
    let accumulator = accumulator_from_bytes(accumulator)?;
    let pk = public_keys_from_bytes(public_keys)?;
    Ok(witness.verify(&accumulator, &pk, &default_params())?)
}

pub fn create_membership_proof<R: RngCore>(
    rng: &mut R,
    witness: &[u8],
    accumulator: &[u8],
    public_keys: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>, ExternError> {
    let witness = witness_from_bytes(witness)?;
    let accumulator = accumulator_from_bytes(accumulator)?;
    let pk = public_keys_from_bytes(public_keys)?;
    let proof = MembershipProof::<Bls12_381>::prove::<R, Blake2b512>(
        rng,
        &witness,
        &accumulator,
        &pk,
        &default_params(),
        nonce,
    )?;
    Ok(to_bytes(&proof)?)
}

/// Verify a proof from [`create_membership_proof`] made for `nonce` against `accumulator`
pub fn verify_membership_proof(
    proof: &[u8],
    accumulator: &[u8],
    public_keys: &[u8],
    nonce: &[u8],
) -> Result<(), ExternError> {
    let proof = MembershipProof::<Bls12_381>::deserialize_compressed(proof)
        .map_err(|_| AllosaurError::EncodingError("invalid proof"))?;
    let accumulator = accumulator_from_bytes(accumulator)?;
    let pk = public_keys_from_bytes(public_keys)?;
    Ok(proof.verify_for_nonce::<Blake2b512>(nonce, &accumulator, &pk, &default_params())?)
}
