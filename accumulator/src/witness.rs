//! Membership witnesses and their update without the trapdoor.
//!
//! A witness for element `y` is `C = V * 1/(y + alpha)`. After additions `A` and deletions `D` with published
//! coefficients `Omega`, the holder computes `C' = d_A(y)/d_D(y) * C + 1/d_D(y) * <[1, y, y^2, ...], Omega>`.
//!
//! [`MembershipWitness::batch_update`] takes the records of consecutive epochs as published and combines
//! them with a single multi-scalar multiplication as in section 4.2 of the paper.
//! [`MembershipWitness::multi_batch_update`] takes additions, deletions and coefficients already flattened
//! across epochs, like an [`AggregatedUpdate`] or a published revocation file. Both give the same witness.
//!
//! ```ignore
//! let records = registry.records_since(witness.epoch)?;
//! let new_witness = witness.batch_update(&records)?;
//!
//! let update = registry.update_since(witness.epoch)?;
//! assert_eq!(new_witness, witness.apply_aggregated(&update)?);
//! ```

use crate::{
    accumulator::{verify_membership, Accumulator, Epoch},
    batch_utils::{Omega, Poly_d},
    error::AllosaurError,
    setup::{PublicKeys, SetupParams},
    update::{AggregatedUpdate, UpdateRecord},
};
use allosaur_utils::serde_utils::ArkObjectBytes;
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::{Field, One, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::vec::Vec;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

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
pub struct MembershipWitness<G: AffineRepr> {
    #[serde_as(as = "ArkObjectBytes")]
    pub value: G,
    /// Epoch of the accumulator this witness is valid for
    pub epoch: Epoch,
    /// Element the witness is for
    #[serde_as(as = "ArkObjectBytes")]
    pub owner: G::ScalarField,
}

impl<G: AffineRepr> MembershipWitness<G> {
    pub fn new(value: G, epoch: Epoch, owner: G::ScalarField) -> Self {
        Self {
            value,
            epoch,
            owner,
        }
    }

    /// Check the witness against `accumulator`. Fails with `StaleWitness` when they are of different
    /// epochs, whatever the pairing check would say.
    pub fn verify<E: Pairing<G1Affine = G, ScalarField = G::ScalarField>>(
        &self,
        accumulator: &Accumulator<G>,
        pk: &PublicKeys<E>,
        params: &SetupParams<E>,
    ) -> Result<(), AllosaurError> {
        if self.epoch != accumulator.epoch {
            return Err(AllosaurError::StaleWitness {
                witness_epoch: self.epoch,
                accumulator_epoch: accumulator.epoch,
            });
        }
        if verify_membership::<E>(&self.owner, &self.value, &accumulator.value, pk, params) {
            Ok(())
        } else {
            Err(AllosaurError::InvalidWitness)
        }
    }

    /// Update the witness with the records published after its epoch. `records` must start at
    /// `self.epoch + 1` and be contiguous. An empty list returns the witness unchanged.
    pub fn batch_update(&self, records: &[UpdateRecord<G>]) -> Result<Self, AllosaurError> {
        // A revoked holder learns that even when records are missing
        if let Some(r) = records.iter().find(|r| r.is_deleted(&self.owner)) {
            return Err(AllosaurError::RevokedMember { epoch: r.epoch });
        }
        let mut expected = self.epoch + 1;
        for r in records {
            if r.epoch != expected {
                return Err(AllosaurError::EpochGap {
                    expected,
                    found: r.epoch,
                });
            }
            r.validate()?;
            expected += 1;
        }
        if records.is_empty() {
            return Ok(*self);
        }

        let y = &self.owner;
        let d_A = records.iter().map(|r| r.eval_d_A(y)).collect::<Vec<_>>();
        let d_D = records.iter().map(|r| r.eval_d_D(y)).collect::<Vec<_>>();

        // The factor of `omega_t` is `d_{A_{t+1->m}} * d_{D_{0->t-1}}`
        let mut omega_t_factors = Vec::with_capacity(records.len());
        let mut d_D_before = G::ScalarField::one();
        for t in 0..records.len() {
            let d_A_after = d_A[t + 1..]
                .iter()
                .fold(G::ScalarField::one(), |acc, d| acc * d);
            omega_t_factors.push(d_A_after * d_D_before);
            d_D_before *= d_D[t];
        }
        let d_A_ij = d_A.iter().fold(G::ScalarField::one(), |acc, d| acc * d);
        let d_D_ij = d_D_before;
        if d_A_ij.is_zero() {
            return Err(AllosaurError::DuplicateMember {
                operation: "batch_update",
                epoch: expected - 1,
            });
        }
        let d_D_ij_inv = d_D_ij
            .inverse()
            .ok_or(AllosaurError::RevokedMember { epoch: expected - 1 })?;

        // One MSM over the coefficients of all records
        let max_omega_size = records
            .iter()
            .map(|r| r.coefficients.len())
            .max()
            .unwrap_or(0);
        let scaled_powers_of_y = Omega::<G>::scaled_powers_of_y(y, &d_D_ij_inv, max_omega_size);
        let mut bases = Vec::new();
        let mut scalars = Vec::new();
        for (t, r) in records.iter().enumerate() {
            for (i, c) in r.coefficients.0.iter().enumerate() {
                bases.push(*c);
                scalars.push(omega_t_factors[t] * scaled_powers_of_y[i]);
            }
        }
        let y_omega_ip = G::Group::msm_unchecked(&bases, &scalars);

        let d_A_times_d_D_inv = d_A_ij * d_D_ij_inv;
        let new_C = self.value.mul_bigint(d_A_times_d_D_inv.into_bigint()) + y_omega_ip;
        Ok(Self::new(new_C.into_affine(), expected - 1, self.owner))
    }

    /// Update the witness with additions, deletions and coefficients flattened across possibly many epochs,
    /// ending at `target_epoch`. `y` is the element the update polynomials are evaluated at, which has to be
    /// the witness owner. Lengths must satisfy `coefficients = additions + deletions`.
    pub fn multi_batch_update(
        &self,
        y: &G::ScalarField,
        additions: &[G::ScalarField],
        deletions: &[G::ScalarField],
        coefficients: &Omega<G>,
        target_epoch: Epoch,
    ) -> Result<Self, AllosaurError> {
        if *y != self.owner {
            return Err(AllosaurError::WitnessOwnerMismatch);
        }
        if coefficients.len() != additions.len() + deletions.len() {
            return Err(AllosaurError::MalformedBatch {
                additions: additions.len(),
                deletions: deletions.len(),
                coefficients: coefficients.len(),
            });
        }
        if target_epoch < self.epoch {
            return Err(AllosaurError::EpochGap {
                expected: self.epoch,
                found: target_epoch,
            });
        }
        if deletions.contains(y) {
            return Err(AllosaurError::RevokedMember {
                epoch: target_epoch,
            });
        }
        if additions.contains(y) {
            return Err(AllosaurError::DuplicateMember {
                operation: "multi_batch_update",
                epoch: target_epoch,
            });
        }
        if additions.is_empty() && deletions.is_empty() {
            return Ok(Self::new(self.value, target_epoch, self.owner));
        }

        let d_A = Poly_d::eval_direct(additions, y);
        let d_D = Poly_d::eval_direct(deletions, y);
        let y_omega_ip = coefficients.inner_product_with_powers_of_y(y);
        self.apply_evaluated(&d_A, &d_D, y_omega_ip, target_epoch)
    }

    /// Update with an aggregated update which must start at the witness's epoch
    pub fn apply_aggregated(&self, update: &AggregatedUpdate<G>) -> Result<Self, AllosaurError> {
        update.validate()?;
        if update.from_epoch != self.epoch {
            return Err(AllosaurError::EpochGap {
                expected: self.epoch,
                found: update.from_epoch,
            });
        }
        self.multi_batch_update(
            &self.owner,
            &update.additions,
            &update.deletions,
            &update.coefficients,
            update.to_epoch,
        )
    }

    /// `C' = d_A(y)/d_D(y) * C + 1/d_D(y) * y_omega_ip` where `y_omega_ip` is the evaluation of
    /// `Omega` at the owner, however it was obtained.
    pub(crate) fn apply_evaluated(
        &self,
        d_A: &G::ScalarField,
        d_D: &G::ScalarField,
        y_omega_ip: G::Group,
        target_epoch: Epoch,
    ) -> Result<Self, AllosaurError> {
        let d_D_inv = d_D.inverse().ok_or(AllosaurError::RevokedMember {
            epoch: target_epoch,
        })?;
        let d_A_times_d_D_inv = *d_A * d_D_inv;
        let new_C = self.value.mul_bigint(d_A_times_d_D_inv.into_bigint())
            + y_omega_ip * d_D_inv;
        Ok(Self::new(new_C.into_affine(), target_epoch, self.owner))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        accumulator::{accumulate, remove, remove_batch},
        setup::Keypair,
        test_serialization,
    };
    use ark_bls12_381::{Bls12_381, Fr, G1Affine};
    use ark_std::{
        rand::{rngs::StdRng, SeedableRng},
        UniformRand,
    };
    use blake2::Blake2b512;

    /// Bookkeeping of a registry without locks or a member store
    pub struct Log {
        pub keypair: Keypair<Bls12_381>,
        pub params: SetupParams<Bls12_381>,
        pub accumulator: Accumulator<G1Affine>,
        pub records: Vec<UpdateRecord<G1Affine>>,
    }

    impl Log {
        pub fn new(rng: &mut StdRng) -> Self {
            let params = SetupParams::new::<Blake2b512>(b"test");
            let keypair = Keypair::generate_using_rng(rng, &params);
            let accumulator = Accumulator::initial(params.P);
            Self {
                keypair,
                params,
                accumulator,
                records: vec![],
            }
        }

        pub fn add(&mut self, y: Fr) -> MembershipWitness<G1Affine> {
            let old = self.accumulator.value;
            let epoch = self.accumulator.epoch + 1;
            let value = accumulate(&self.keypair.secret_key.0, &y, &old).unwrap();
            self.records.push(UpdateRecord::addition(epoch, y, &old));
            self.accumulator = Accumulator {
                value: value.into_affine(),
                epoch,
            };
            MembershipWitness::new(old, epoch, y)
        }

        pub fn delete(&mut self, ys: &[Fr]) {
            let old = self.accumulator.value;
            let epoch = self.accumulator.epoch + 1;
            let value = remove_batch(&self.keypair.secret_key.0, ys, &old).unwrap();
            self.records.push(
                UpdateRecord::deletion(epoch, ys.to_vec(), &old, &self.keypair.secret_key).unwrap(),
            );
            self.accumulator = Accumulator {
                value: value.into_affine(),
                epoch,
            };
        }

        pub fn since(&self, epoch: Epoch) -> &[UpdateRecord<G1Affine>] {
            &self.records[epoch as usize..]
        }

        pub fn check(&self, w: &MembershipWitness<G1Affine>) {
            w.verify(&self.accumulator, &self.keypair.public_keys, &self.params)
                .unwrap();
            let expected = remove(&self.keypair.secret_key.0, &w.owner, &self.accumulator.value)
                .unwrap()
                .into_affine();
            assert_eq!(w.value, expected);
        }
    }

    #[test]
    fn update_across_additions_and_deletions() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let mut log = Log::new(&mut rng);
        let members = (0..10).map(|_| Fr::rand(&mut rng)).collect::<Vec<_>>();
        let witnesses = members.iter().map(|y| log.add(*y)).collect::<Vec<_>>();
        log.check(&witnesses[9]);
        test_serialization!(MembershipWitness<G1Affine>, witnesses[0]);

        assert!(matches!(
            witnesses[0].verify(&log.accumulator, &log.keypair.public_keys, &log.params),
            Err(AllosaurError::StaleWitness {
                witness_epoch: 1,
                accumulator_epoch: 10
            })
        ));

        log.delete(&members[1..2]);
        log.delete(&members[4..7]);
        let late = log.add(Fr::rand(&mut rng));
        log.delete(&[members[8]]);

        for (i, w) in witnesses.iter().enumerate() {
            let records = log.since(w.epoch);
            let updated = w.batch_update(records);
            if [1, 4, 5, 6, 8].contains(&i) {
                assert!(matches!(updated, Err(AllosaurError::RevokedMember { .. })));
                continue;
            }
            let updated = updated.unwrap();
            assert_eq!(updated.epoch, log.accumulator.epoch);
            log.check(&updated);

            // Flattened update gives the same witness
            let agg = UpdateRecord::aggregate(w.epoch, records).unwrap();
            assert_eq!(w.apply_aggregated(&agg).unwrap(), updated);

            // Applying one record at a time gives the same witness
            let mut step = *w;
            for r in records {
                step = step.batch_update(core::slice::from_ref(r)).unwrap();
            }
            assert_eq!(step, updated);
        }

        let updated_late = late.batch_update(log.since(late.epoch)).unwrap();
        log.check(&updated_late);
        assert_eq!(late.batch_update(&[]).unwrap(), late);
    }

    #[test]
    fn revocation_is_reported_before_gaps() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let mut log = Log::new(&mut rng);
        let a = Fr::rand(&mut rng);
        let b = Fr::rand(&mut rng);
        let w_a = log.add(a);
        let w_b = log.add(b);
        log.delete(&[a]);

        // record for epoch 2 is not given but the holder is revoked anyway
        assert!(matches!(
            w_a.batch_update(&log.records[2..]),
            Err(AllosaurError::RevokedMember { epoch: 3 })
        ));
        let w_b = w_b.batch_update(&log.records[2..]).unwrap();
        log.check(&w_b);

        let c = Fr::rand(&mut rng);
        let w_c = log.add(c);
        log.delete(&[b]);
        log.add(Fr::rand(&mut rng));
        assert!(matches!(
            w_c.batch_update(&log.records[5..]),
            Err(AllosaurError::EpochGap {
                expected: 5,
                found: 6
            })
        ));
    }

    #[test]
    fn multi_batch_update_checks_input() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let mut log = Log::new(&mut rng);
        let members = (0..4).map(|_| Fr::rand(&mut rng)).collect::<Vec<_>>();
        let witnesses = members.iter().map(|y| log.add(*y)).collect::<Vec<_>>();
        let w = witnesses[3];
        log.delete(&members[0..2]);
        let record = log.records[4].clone();

        let updated = w
            .multi_batch_update(
                &w.owner,
                &[],
                &record.deletions,
                &record.coefficients,
                record.epoch,
            )
            .unwrap();
        log.check(&updated);

        // 2 deletions but 3 coefficients
        let mut three = record.coefficients.clone();
        three.0.push(three.0[0]);
        assert!(matches!(
            w.multi_batch_update(&w.owner, &[], &record.deletions, &three, 5),
            Err(AllosaurError::MalformedBatch {
                additions: 0,
                deletions: 2,
                coefficients: 3
            })
        ));
        assert!(matches!(
            w.multi_batch_update(&members[2], &[], &record.deletions, &record.coefficients, 5),
            Err(AllosaurError::WitnessOwnerMismatch)
        ));
        assert!(matches!(
            witnesses[0].multi_batch_update(
                &members[0],
                &[],
                &record.deletions,
                &record.coefficients,
                5
            ),
            Err(AllosaurError::RevokedMember { epoch: 5 })
        ));

        // Nothing to apply only moves the epoch
        let moved = w
            .multi_batch_update(&w.owner, &[], &[], &Omega::empty(), 7)
            .unwrap();
        assert_eq!((moved.value, moved.epoch), (w.value, 7));
        assert!(matches!(
            w.multi_batch_update(&w.owner, &[], &[], &Omega::empty(), 2),
            Err(AllosaurError::EpochGap {
                expected: 4,
                found: 2
            })
        ));
    }
}
