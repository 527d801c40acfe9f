use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{
    field_hashers::{DefaultFieldHasher, HashToField},
    PrimeField, Zero,
};
use ark_std::vec::Vec;
use digest::{Digest, DynDigest};

const ATTEMPT_SEPARATOR: &[u8] = b"-attempt-";

/// Hash bytes to a point on the curve. Returns as Projective coordinates. This is vulnerable to timing attack and is only used when input
/// is public anyway like when generating setup parameters.
pub fn projective_group_elem_from_try_and_incr<G: AffineRepr, D: Digest>(bytes: &[u8]) -> G::Group {
    let mut j = 0u64;
    loop {
        let hash = attempt_digest::<D>(bytes, j);
        if let Some(g) = G::from_random_bytes(&hash) {
            let g = g.mul_by_cofactor_to_group();
            if !g.is_zero() {
                return g;
            }
        }
        j += 1;
    }
}

/// Hash bytes to a point on the curve. Returns as Affine coordinates. This is vulnerable to timing attack and is only used when input
/// is public anyway like when generating setup parameters.
pub fn affine_group_elem_from_try_and_incr<G: AffineRepr, D: Digest>(bytes: &[u8]) -> G {
    projective_group_elem_from_try_and_incr::<G, D>(bytes).into_affine()
}

/// Hash bytes to a field element. This is vulnerable to timing attack and is only used when input
/// is public anyway like when generating setup parameters or challenge
pub fn field_elem_from_try_and_incr<F: PrimeField, D: Digest>(bytes: &[u8]) -> F {
    let mut j = 0u64;
    loop {
        let hash = attempt_digest::<D>(bytes, j);
        if let Some(f) = F::from_random_bytes(&hash) {
            return f;
        }
        j += 1;
    }
}

/// Hash `msg` to a field element with the hash-to-field construction of RFC 9380 under the
/// domain separation tag `dst`. Output is uniform, unlike `field_elem_from_try_and_incr`.
pub fn hash_to_field<F: PrimeField, H: Default + DynDigest + Clone>(dst: &[u8], msg: &[u8]) -> F {
    let hasher = <DefaultFieldHasher<H> as HashToField<F>>::new(dst);
    let mut out: Vec<F> = hasher.hash_to_field(msg, 1);
    out.pop().unwrap_or_else(F::zero)
}

fn attempt_digest<D: Digest>(bytes: &[u8], attempt: u64) -> Vec<u8> {
    if attempt == 0 {
        return D::digest(bytes).to_vec();
    }
    let mut hasher = D::new();
    hasher.update(bytes);
    hasher.update(ATTEMPT_SEPARATOR);
    hasher.update(attempt.to_le_bytes());
    hasher.finalize().to_vec()
}
