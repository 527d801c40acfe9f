//! The registry owns the trapdoor and is the only party changing the accumulator.
//!
//! Every committed mutation moves the accumulator to the next epoch and appends one [`UpdateRecord`] to the log: an
//! addition record for [`Registry::add_member`] and a deletion record for [`Registry::delete_member`] and
//! [`Registry::batch_delete`]. Holders use the records after their witness's epoch to update it.
//!
//! Mutations serialize on a mutex guarding the member store, the log and the accumulator, so the record, the
//! new value and the new epoch are published together. Reads of the current accumulator don't take that
//! mutex and see either the state before or after a mutation, never a mix.
//!
//! ```ignore
//! let registry = Registry::<Bls12_381>::create(&mut rng, params, RegistryConfig::default());
//! let witness = registry.add_member(b"alice")?;
//! registry.delete_member(b"bob")?;
//! let witness = witness.batch_update(&registry.records_since(witness.epoch)?)?;
//! ```

use crate::{
    accumulator::{
        accumulate, accumulate_all, remove, remove_batch, Accumulator, Epoch, SignedAccumulator,
    },
    element::hash_to_scalar,
    error::AllosaurError,
    persistence::{InMemoryMemberStore, MemberStatus, MemberStore},
    setup::{Keypair, PublicKeys, SetupParams},
    threshold::{PartialUpdate, RequestShare},
    update::{AggregatedUpdate, UpdateRecord},
    witness::MembershipWitness,
};
use ark_ec::{pairing::Pairing, CurveGroup};
use ark_std::{collections::VecDeque, rand::RngCore, vec::Vec};
use digest::Digest;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Number of most recent update records to keep. `None` keeps all of them.
    pub retention: Option<u64>,
    /// Whether deleting an empty batch moves the accumulator to the next epoch
    pub empty_batch_advances_epoch: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention: None,
            empty_batch_advances_epoch: true,
        }
    }
}

struct State<E: Pairing, S> {
    store: S,
    accumulator: Accumulator<E::G1Affine>,
    /// Records of the epochs after `pruned_until`, oldest first
    log: VecDeque<UpdateRecord<E::G1Affine>>,
    pruned_until: Epoch,
}

pub struct Registry<E: Pairing, S = InMemoryMemberStore<<E as Pairing>::ScalarField>> {
    keypair: Keypair<E>,
    params: SetupParams<E>,
    config: RegistryConfig,
    state: Mutex<State<E, S>>,
    current: RwLock<Accumulator<E::G1Affine>>,
}

impl<E: Pairing> Registry<E> {
    /// New registry of an empty set with fresh keys
    pub fn create<R: RngCore>(rng: &mut R, params: SetupParams<E>, config: RegistryConfig) -> Self {
        let keypair = Keypair::generate_using_rng(rng, &params);
        Self::from_keys(keypair, params, config)
    }

    /// New registry of an empty set with the given keys. Registries created with the same keys and
    /// given the same mutations in the same order are replicas.
    pub fn from_keys(keypair: Keypair<E>, params: SetupParams<E>, config: RegistryConfig) -> Self {
        Self::with_store(keypair, params, config, InMemoryMemberStore::new())
    }
}

impl<E: Pairing, S: MemberStore<E::ScalarField>> Registry<E, S> {
    /// Registry over `store`. Active members of the store are accumulated at epoch 0.
    pub fn with_store(
        keypair: Keypair<E>,
        params: SetupParams<E>,
        config: RegistryConfig,
        store: S,
    ) -> Self {
        let value =
            accumulate_all(&keypair.secret_key.0, &store.active(), &params.P).into_affine();
        let accumulator = Accumulator { value, epoch: 0 };
        Self {
            keypair,
            params,
            config,
            state: Mutex::new(State {
                store,
                accumulator,
                log: VecDeque::new(),
                pruned_until: 0,
            }),
            current: RwLock::new(accumulator),
        }
    }

    /// Add the member identified by `id` and return its witness for the new epoch
    pub fn add_member(&self, id: &[u8]) -> Result<MembershipWitness<E::G1Affine>, AllosaurError> {
        self.add_member_scalar(hash_to_scalar(id)?)
    }

    pub fn add_member_scalar(
        &self,
        y: E::ScalarField,
    ) -> Result<MembershipWitness<E::G1Affine>, AllosaurError> {
        let mut state = self.state.lock();
        match state.store.status(&y) {
            Some(MemberStatus::Active) => {
                warn!(
                    operation = "add",
                    epoch = state.accumulator.epoch,
                    "rejected duplicate member"
                );
                return Err(AllosaurError::DuplicateMember {
                    operation: "add",
                    epoch: state.accumulator.epoch,
                });
            }
            Some(MemberStatus::Revoked) => {
                warn!(operation = "add", "rejected previously revoked member");
                return Err(AllosaurError::PreviouslyRevoked);
            }
            None => (),
        }
        let old = state.accumulator.value;
        let value = accumulate(&self.keypair.secret_key.0, &y, &old)?.into_affine();
        let epoch = state.accumulator.epoch + 1;
        state.store.add(y);
        self.commit(&mut state, value, UpdateRecord::addition(epoch, y, &old));
        info!(operation = "add", epoch, count = 1, "committed");
        // The accumulator without `y` is the witness of `y`
        Ok(MembershipWitness::new(old, epoch, y))
    }

    /// Delete the member identified by `id`
    pub fn delete_member(&self, id: &[u8]) -> Result<Accumulator<E::G1Affine>, AllosaurError> {
        self.delete_scalars(&[hash_to_scalar(id)?])
    }

    pub fn delete_member_scalar(
        &self,
        y: E::ScalarField,
    ) -> Result<Accumulator<E::G1Affine>, AllosaurError> {
        self.delete_scalars(&[y])
    }

    /// Delete all members identified by `ids` in one epoch
    pub fn batch_delete<B: AsRef<[u8]>>(
        &self,
        ids: &[B],
    ) -> Result<Accumulator<E::G1Affine>, AllosaurError> {
        let ys = ids
            .iter()
            .map(|id| hash_to_scalar(id.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.delete_scalars(&ys)
    }

    pub fn batch_delete_scalars(
        &self,
        ys: &[E::ScalarField],
    ) -> Result<Accumulator<E::G1Affine>, AllosaurError> {
        self.delete_scalars(ys)
    }

    /// Issue a fresh witness for an active member for the current epoch
    pub fn issue_witness(
        &self,
        y: &E::ScalarField,
    ) -> Result<MembershipWitness<E::G1Affine>, AllosaurError> {
        let state = self.state.lock();
        if !state.store.has(y) {
            return Err(AllosaurError::UnknownMember {
                operation: "issue_witness",
                epoch: state.accumulator.epoch,
            });
        }
        let value = remove(&self.keypair.secret_key.0, y, &state.accumulator.value)?;
        Ok(MembershipWitness::new(
            value.into_affine(),
            state.accumulator.epoch,
            *y,
        ))
    }

    pub fn current_epoch(&self) -> Epoch {
        self.current.read().epoch
    }

    pub fn current_accumulator(&self) -> Accumulator<E::G1Affine> {
        *self.current.read()
    }

    pub fn public_keys(&self) -> &PublicKeys<E> {
        &self.keypair.public_keys
    }

    pub fn params(&self) -> &SetupParams<E> {
        &self.params
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn member_count(&self) -> u64 {
        self.state.lock().store.size()
    }

    /// The current accumulator signed with the signing key
    pub fn signed_accumulator<R: RngCore, D: Digest>(
        &self,
        rng: &mut R,
    ) -> Result<SignedAccumulator<E::G1Affine>, AllosaurError> {
        SignedAccumulator::new::<R, D>(
            rng,
            self.current_accumulator(),
            &self.keypair.signing_key.0,
            &self.params.P,
        )
    }

    /// Records of all epochs after `epoch`, oldest first
    pub fn records_since(
        &self,
        epoch: Epoch,
    ) -> Result<Vec<UpdateRecord<E::G1Affine>>, AllosaurError> {
        let state = self.state.lock();
        let current = state.accumulator.epoch;
        if epoch > current {
            return Err(AllosaurError::FutureEpoch {
                requested: epoch,
                current,
            });
        }
        if epoch < state.pruned_until {
            return Err(AllosaurError::HistoryPruned {
                requested: epoch,
                oldest: state.pruned_until,
            });
        }
        let records = state
            .log
            .iter()
            .skip((epoch - state.pruned_until) as usize)
            .cloned()
            .collect::<Vec<_>>();
        debug!(from = epoch, to = current, count = records.len(), "read records");
        Ok(records)
    }

    /// Records of all epochs after `epoch` flattened into one update
    pub fn update_since(
        &self,
        epoch: Epoch,
    ) -> Result<AggregatedUpdate<E::G1Affine>, AllosaurError> {
        let records = self.records_since(epoch)?;
        UpdateRecord::aggregate(epoch, &records)
    }

    /// Answer a holder's share of a threshold update request
    pub fn threshold_update(
        &self,
        share: &RequestShare<E::ScalarField>,
    ) -> Result<PartialUpdate<E::G1Affine>, AllosaurError> {
        let update = self.update_since(share.epoch)?;
        debug!(
            registry = share.registry_id,
            from = update.from_epoch,
            to = update.to_epoch,
            "answered threshold update"
        );
        PartialUpdate::from_aggregated(&update, share)
    }

    /// Recompute the accumulator from the active members and panic if it differs from the current one
    pub fn check_invariants(&self) {
        let state = self.state.lock();
        let active = state.store.active();
        assert_eq!(active.len() as u64, state.store.size());
        let expected =
            accumulate_all(&self.keypair.secret_key.0, &active, &self.params.P).into_affine();
        assert_eq!(
            expected, state.accumulator.value,
            "accumulator does not match its active members at epoch {}",
            state.accumulator.epoch
        );
        assert_eq!(*self.current.read(), state.accumulator);
        if let Some(last) = state.log.back() {
            assert_eq!(last.epoch, state.accumulator.epoch);
        }
    }

    fn delete_scalars(
        &self,
        ys: &[E::ScalarField],
    ) -> Result<Accumulator<E::G1Affine>, AllosaurError> {
        let mut state = self.state.lock();
        if ys.is_empty() {
            if !self.config.empty_batch_advances_epoch {
                return Ok(state.accumulator);
            }
            let value = state.accumulator.value;
            let epoch = state.accumulator.epoch + 1;
            self.commit(&mut state, value, UpdateRecord::empty(epoch));
            info!(operation = "delete", epoch, count = 0, "committed");
            return Ok(state.accumulator);
        }
        let current = state.accumulator.epoch;
        for (i, y) in ys.iter().enumerate() {
            if ys[..i].contains(y) {
                warn!(
                    operation = "delete",
                    epoch = current,
                    "rejected batch with repeated member"
                );
                return Err(AllosaurError::DuplicateMember {
                    operation: "delete",
                    epoch: current,
                });
            }
            if !state.store.has(y) {
                warn!(operation = "delete", epoch = current, "rejected unknown member");
                return Err(AllosaurError::UnknownMember {
                    operation: "delete",
                    epoch: current,
                });
            }
        }
        let old = state.accumulator.value;
        let value = remove_batch(&self.keypair.secret_key.0, ys, &old)?.into_affine();
        let epoch = state.accumulator.epoch + 1;
        let record = UpdateRecord::deletion(epoch, ys.to_vec(), &old, &self.keypair.secret_key)?;
        for y in ys {
            state.store.revoke(y);
        }
        self.commit(&mut state, value, record);
        info!(operation = "delete", epoch, count = ys.len(), "committed");
        Ok(state.accumulator)
    }

    /// Append `record`, move to its epoch and publish the new accumulator
    fn commit(
        &self,
        state: &mut State<E, S>,
        value: E::G1Affine,
        record: UpdateRecord<E::G1Affine>,
    ) {
        assert_eq!(record.epoch, state.accumulator.epoch + 1);
        assert_eq!(
            record.coefficients.len(),
            record.additions.len() + record.deletions.len()
        );
        state.accumulator = Accumulator {
            value,
            epoch: record.epoch,
        };
        state.log.push_back(record);
        if let Some(retention) = self.config.retention {
            while state.log.len() as u64 > retention {
                if let Some(r) = state.log.pop_front() {
                    state.pruned_until = r.epoch;
                }
            }
        }
        *self.current.write() = state.accumulator;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_serialization;
    use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
    use ark_bls12_381::{Bls12_381, Fr, G1Affine};
    use ark_std::{
        rand::{rngs::StdRng, SeedableRng},
        UniformRand,
    };
    use blake2::Blake2b512;
    use std::sync::Arc;

    fn new_registry(config: RegistryConfig) -> Registry<Bls12_381> {
        let mut rng = StdRng::seed_from_u64(0u64);
        let params = SetupParams::new::<Blake2b512>(b"test");
        Registry::create(&mut rng, params, config)
    }

    #[test]
    fn add_and_delete() {
        let registry = new_registry(RegistryConfig::default());
        assert_eq!(registry.current_epoch(), 0);
        assert_eq!(registry.current_accumulator().value, registry.params().P);

        let before = registry.current_accumulator();
        let w_alice = registry.add_member(b"alice").unwrap();
        assert_eq!(w_alice.value, before.value);
        assert_eq!(w_alice.epoch, 1);
        let w_bob = registry.add_member(b"bob").unwrap();
        w_bob
            .verify(
                &registry.current_accumulator(),
                registry.public_keys(),
                registry.params(),
            )
            .unwrap();
        registry.add_member(b"carol").unwrap();
        registry.add_member(b"dave").unwrap();

        assert!(matches!(
            registry.add_member(b"bob"),
            Err(AllosaurError::DuplicateMember {
                operation: "add",
                epoch: 4
            })
        ));
        assert!(matches!(
            registry.add_member(b""),
            Err(AllosaurError::EncodingError(_))
        ));
        assert_eq!(registry.current_epoch(), 4);

        let acc = registry.delete_member(b"alice").unwrap();
        assert_eq!(acc.epoch, 5);
        assert!(matches!(
            registry.delete_member(b"alice"),
            Err(AllosaurError::UnknownMember {
                operation: "delete",
                epoch: 5
            })
        ));
        assert!(matches!(
            registry.add_member(b"alice"),
            Err(AllosaurError::PreviouslyRevoked)
        ));
        assert!(matches!(
            registry.batch_delete(&[b"carol".as_slice(), b"carol".as_slice()]),
            Err(AllosaurError::DuplicateMember {
                operation: "delete",
                epoch: 5
            })
        ));
        assert!(matches!(
            registry.batch_delete(&[b"carol".as_slice(), b"erin".as_slice()]),
            Err(AllosaurError::UnknownMember {
                operation: "delete",
                epoch: 5
            })
        ));
        // Rejected batches change nothing
        assert_eq!(registry.current_epoch(), 5);
        assert_eq!(registry.member_count(), 3);

        let acc = registry.batch_delete(&["carol", "dave"]).unwrap();
        assert_eq!(acc.epoch, 6);
        assert_eq!(registry.member_count(), 1);
        registry.check_invariants();

        let records = registry.records_since(1).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[4].deletions.len(), 2);
        test_serialization!(UpdateRecord<G1Affine>, records[4]);
        let w_alice_after = w_alice.batch_update(&registry.records_since(1).unwrap());
        assert!(matches!(
            w_alice_after,
            Err(AllosaurError::RevokedMember { epoch: 5 })
        ));
        let w_bob = w_bob
            .batch_update(&registry.records_since(w_bob.epoch).unwrap())
            .unwrap();
        let acc = registry.current_accumulator();
        w_bob
            .verify(&acc, registry.public_keys(), registry.params())
            .unwrap();
        assert_eq!(
            w_bob,
            registry
                .issue_witness(&hash_to_scalar(b"bob").unwrap())
                .unwrap()
        );
        assert!(matches!(
            registry.issue_witness(&hash_to_scalar(b"alice").unwrap()),
            Err(AllosaurError::UnknownMember {
                operation: "issue_witness",
                epoch: 6
            })
        ));

        assert!(matches!(
            registry.records_since(7),
            Err(AllosaurError::FutureEpoch {
                requested: 7,
                current: 6
            })
        ));
        assert!(registry.records_since(6).unwrap().is_empty());

        // Reads don't change anything
        assert_eq!(registry.current_accumulator(), registry.current_accumulator());
        assert_eq!(
            registry.update_since(2).unwrap(),
            registry.update_since(2).unwrap()
        );

        let signed = registry
            .signed_accumulator::<_, Blake2b512>(&mut StdRng::seed_from_u64(1u64))
            .unwrap();
        signed
            .verify::<Blake2b512>(&registry.public_keys().sign_pk, &registry.params().P)
            .unwrap();
        assert_eq!(signed.accumulator, acc);
    }

    #[test]
    fn empty_batches_and_retention() {
        let registry = new_registry(RegistryConfig::default());
        let acc = registry.batch_delete::<&[u8]>(&[]).unwrap();
        assert_eq!(acc.epoch, 1);
        assert_eq!(acc.value, registry.params().P);
        assert!(registry.records_since(0).unwrap()[0].deletions.is_empty());

        let registry = new_registry(RegistryConfig {
            retention: Some(2),
            empty_batch_advances_epoch: false,
        });
        let acc = registry.batch_delete::<&[u8]>(&[]).unwrap();
        assert_eq!(acc.epoch, 0);
        for id in ["a", "b", "c", "d"] {
            registry.add_member(id.as_bytes()).unwrap();
        }
        assert_eq!(registry.records_since(2).unwrap().len(), 2);
        assert!(matches!(
            registry.records_since(1),
            Err(AllosaurError::HistoryPruned {
                requested: 1,
                oldest: 2
            })
        ));
        registry.check_invariants();

        let config: RegistryConfig = serde_json::from_str(r#"{"retention": 10}"#).unwrap();
        assert_eq!(config.retention, Some(10));
        assert!(config.empty_batch_advances_epoch);
    }

    #[test]
    fn prohibited_element() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let params = SetupParams::<Bls12_381>::new::<Blake2b512>(b"test");
        let keypair = Keypair::generate_using_rng(&mut rng, &params);
        let alpha = keypair.secret_key.0;
        let registry = Registry::from_keys(keypair, params, RegistryConfig::default());
        assert!(matches!(
            registry.add_member_scalar(-alpha),
            Err(AllosaurError::ProhibitedElement)
        ));
        assert_eq!(registry.current_epoch(), 0);
    }

    #[test]
    fn concurrent_mutations() {
        let registry = Arc::new(new_registry(RegistryConfig::default()));
        let members = {
            let mut rng = StdRng::seed_from_u64(1u64);
            (0..40).map(|_| Fr::rand(&mut rng)).collect::<Vec<_>>()
        };
        std::thread::scope(|s| {
            for chunk in members.chunks(10) {
                let registry = registry.clone();
                s.spawn(move || {
                    for y in chunk {
                        registry.add_member_scalar(*y).unwrap();
                        let acc = registry.current_accumulator();
                        assert!(acc.epoch >= 1);
                    }
                });
            }
        });
        assert_eq!(registry.current_epoch(), 40);
        registry.batch_delete_scalars(&members[..20]).unwrap();
        registry.check_invariants();

        // Every record is for the epoch after the one before it
        let records = registry.records_since(0).unwrap();
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.epoch, i as u64 + 1);
        }
    }
}
