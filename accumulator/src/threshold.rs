//! Witness update through `n` registries of which any `threshold` are enough, without any fewer than
//! `threshold` of them learning the holder's element.
//!
//! The registries are replicas holding the same accumulator, trapdoor and update log. The holder of element `y`
//! needs `<[1, y, y^2, ...], Omega>` for the update since its epoch but must not reveal `y`. So it Shamir shares each
//! of `y^0, y^1, ..., y^{m-1}` among the registries, sending registry `i` the shares `s_i(y^k)`. Every registry
//! answers with the public part of the update and `sum_k s_i(y^k) * Omega_k`, which is a share of
//! `<[1, y, y^2, ...], Omega>` as the map is linear. The holder interpolates any `threshold` answers at 0 and
//! applies the result like a multi-batch update.

use crate::{
    accumulator::Epoch,
    batch_utils::Poly_d,
    error::AllosaurError,
    update::AggregatedUpdate,
    witness::MembershipWitness,
};
use allosaur_utils::{
    error::ShareId,
    lagrange::{deal_secret, lagrange_basis_at_0_for_all},
    poly::powers,
    serde_utils::ArkObjectBytes,
};
use ark_ec::{AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{cfg_into_iter, collections::BTreeMap, rand::RngCore, vec, vec::Vec};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Registries are identified by non-zero ids which are also the x coordinates of their shares
pub type RegistryId = ShareId;

/// What a holder sends to one registry. `shares[k]` is the registry's share of `y^k`.
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
pub struct RequestShare<F: PrimeField> {
    #[zeroize(skip)]
    pub registry_id: RegistryId,
    /// Epoch of the holder's witness
    #[zeroize(skip)]
    pub epoch: Epoch,
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    pub shares: Vec<F>,
}

/// Shares for all registries
#[derive(Clone, Debug)]
pub struct UpdateRequest<F: PrimeField> {
    pub threshold: ShareId,
    pub epoch: Epoch,
    pub shares: Vec<RequestShare<F>>,
}

/// A registry's answer to a [`RequestShare`]
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct PartialUpdate<G: AffineRepr> {
    pub registry_id: RegistryId,
    pub from_epoch: Epoch,
    pub to_epoch: Epoch,
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    pub additions: Vec<G::ScalarField>,
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    pub deletions: Vec<G::ScalarField>,
    /// The registry's share of `<[1, y, y^2, ...], Omega>`
    #[serde_as(as = "ArkObjectBytes")]
    pub omega_share: G,
}

impl<F: PrimeField> UpdateRequest<F> {
    /// Share the powers `y^0, ..., y^{max_len - 1}` of the witness owner among `registry_ids`. `max_len` bounds
    /// the number of coefficients of an update the request can be answered for.
    pub fn new<R: RngCore, G: AffineRepr<ScalarField = F>>(
        rng: &mut R,
        witness: &MembershipWitness<G>,
        threshold: ShareId,
        registry_ids: &[RegistryId],
        max_len: usize,
    ) -> Result<Self, AllosaurError> {
        if threshold < 1 || threshold as usize > registry_ids.len() {
            return Err(AllosaurError::InvalidThreshold {
                threshold,
                total: registry_ids.len(),
            });
        }
        let mut per_registry = vec![Vec::with_capacity(max_len); registry_ids.len()];
        for p in powers(&witness.owner, max_len) {
            let shares = deal_secret(rng, p, threshold, registry_ids)?;
            for (i, s) in shares.into_iter().enumerate() {
                per_registry[i].push(s);
            }
        }
        let shares = registry_ids
            .iter()
            .zip(per_registry)
            .map(|(id, shares)| RequestShare {
                registry_id: *id,
                epoch: witness.epoch,
                shares,
            })
            .collect();
        Ok(Self {
            threshold,
            epoch: witness.epoch,
            shares,
        })
    }

    pub fn share_for(&self, registry_id: RegistryId) -> Option<&RequestShare<F>> {
        self.shares.iter().find(|s| s.registry_id == registry_id)
    }
}

impl<G: AffineRepr> PartialUpdate<G> {
    /// Answer `share` with `update`, which must start at the epoch of the share
    pub fn from_aggregated(
        update: &AggregatedUpdate<G>,
        share: &RequestShare<G::ScalarField>,
    ) -> Result<Self, AllosaurError> {
        update.validate()?;
        if update.from_epoch != share.epoch {
            return Err(AllosaurError::EpochGap {
                expected: share.epoch,
                found: update.from_epoch,
            });
        }
        let n = update.coefficients.len();
        if n > share.shares.len() {
            return Err(AllosaurError::UpdateTooLarge {
                supported: share.shares.len(),
                required: n,
            });
        }
        let omega_share =
            G::Group::msm_unchecked(&update.coefficients.0, &share.shares[..n]).into_affine();
        Ok(Self {
            registry_id: share.registry_id,
            from_epoch: update.from_epoch,
            to_epoch: update.to_epoch,
            additions: update.additions.clone(),
            deletions: update.deletions.clone(),
            omega_share,
        })
    }

    fn epochs(&self) -> (Epoch, Epoch) {
        (self.from_epoch, self.to_epoch)
    }
}

/// Combine the answers of the registries into the updated witness. Any `threshold` of the answers are
/// interpolated and every answer beyond them is checked against the interpolation.
pub fn user_update<G: AffineRepr>(
    witness: &MembershipWitness<G>,
    partials: &BTreeMap<RegistryId, PartialUpdate<G>>,
    threshold: ShareId,
) -> Result<MembershipWitness<G>, AllosaurError> {
    if threshold < 1 {
        return Err(AllosaurError::InvalidThreshold {
            threshold,
            total: partials.len(),
        });
    }
    let t = threshold as usize;
    if partials.len() < t {
        return Err(AllosaurError::InsufficientShares {
            threshold,
            received: partials.len(),
        });
    }

    // Each answer is interpolated at its key
    if partials.iter().any(|(id, p)| *id != p.registry_id) {
        return Err(AllosaurError::InconsistentShares);
    }

    let mut iter = partials.iter();
    // Non-empty as `t >= 1`
    let (_, first) = match iter.next() {
        Some(p) => p,
        None => {
            return Err(AllosaurError::InsufficientShares {
                threshold,
                received: 0,
            })
        }
    };
    if first.from_epoch != witness.epoch {
        return Err(AllosaurError::EpochGap {
            expected: witness.epoch,
            found: first.from_epoch,
        });
    }
    for (id, p) in iter {
        if p.epochs() != first.epochs()
            || p.additions != first.additions
            || p.deletions != first.deletions
        {
            return Err(AllosaurError::InconsistentEpoch {
                registry: *id,
                expected: first.epochs(),
                found: p.epochs(),
            });
        }
    }

    let y = &witness.owner;
    if first.deletions.contains(y) {
        return Err(AllosaurError::RevokedMember {
            epoch: first.to_epoch,
        });
    }
    if first.additions.contains(y) {
        return Err(AllosaurError::DuplicateMember {
            operation: "user_update",
            epoch: first.to_epoch,
        });
    }

    let ids = partials.keys().copied().collect::<Vec<_>>();
    let points = partials.values().map(|p| p.omega_share).collect::<Vec<_>>();
    let y_omega_ip = interpolate::<G>(&ids[..t], &points[..t])?;

    // Replace the first share of the interpolating set with each extra share in turn
    let extra = cfg_into_iter!(t..ids.len())
        .map(|j| {
            let mut sub_ids = ids[1..t].to_vec();
            sub_ids.push(ids[j]);
            let mut sub_points = points[1..t].to_vec();
            sub_points.push(points[j]);
            interpolate::<G>(&sub_ids, &sub_points)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if extra.iter().any(|e| *e != y_omega_ip) {
        return Err(AllosaurError::InconsistentShares);
    }

    if first.additions.is_empty() && first.deletions.is_empty() {
        return Ok(MembershipWitness::new(
            witness.value,
            first.to_epoch,
            witness.owner,
        ));
    }
    let d_A = Poly_d::eval_direct(&first.additions, y);
    let d_D = Poly_d::eval_direct(&first.deletions, y);
    witness.apply_evaluated(&d_A, &d_D, y_omega_ip, first.to_epoch)
}

fn interpolate<G: AffineRepr>(ids: &[RegistryId], points: &[G]) -> Result<G::Group, AllosaurError> {
    let basis = lagrange_basis_at_0_for_all::<G::ScalarField>(ids)?;
    Ok(G::Group::msm_unchecked(points, &basis))
}
