//! Keeping witnesses of many holders current, as a witness service does for holders that are not online
//! when the accumulator changes.
//!
//! A [`WitnessStore`] holds the last good witness of each holder and an [`UpdateSource`] gives the records
//! published since. [`refresh_all`] brings every holder to the current epoch independently of the others, so a
//! revoked holder or a holder whose history was pruned doesn't stop the rest. It checks a cancel flag between
//! holders and can be run periodically by whatever scheduler the caller has.

use crate::{
    accumulator::Epoch,
    error::AllosaurError,
    persistence::MemberStore,
    registry::Registry,
    update::UpdateRecord,
    witness::MembershipWitness,
};
use ark_ec::{pairing::Pairing, AffineRepr};
use ark_std::{collections::BTreeMap, vec::Vec};
use core::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Storage of the last good witness of each holder
pub trait WitnessStore<G: AffineRepr> {
    type Holder: Clone;

    fn get(&self, holder: &Self::Holder) -> Option<MembershipWitness<G>>;

    fn put(&mut self, holder: Self::Holder, witness: MembershipWitness<G>);

    fn holders(&self) -> Vec<Self::Holder>;
}

/// Where update records come from, usually a registry or a mirror of its published log
pub trait UpdateSource<G: AffineRepr> {
    fn current_epoch(&self) -> Epoch;

    fn records_since(&self, epoch: Epoch) -> Result<Vec<UpdateRecord<G>>, AllosaurError>;
}

impl<E: Pairing, S: MemberStore<E::ScalarField>> UpdateSource<E::G1Affine> for Registry<E, S> {
    fn current_epoch(&self) -> Epoch {
        Registry::current_epoch(self)
    }

    fn records_since(&self, epoch: Epoch) -> Result<Vec<UpdateRecord<E::G1Affine>>, AllosaurError> {
        Registry::records_since(self, epoch)
    }
}

#[derive(Debug)]
pub struct RefreshReport<H> {
    pub refreshed: usize,
    pub unchanged: usize,
    /// Holders that are no longer members. Their stored witness is left as it was.
    pub revoked: Vec<H>,
    pub failed: Vec<(H, AllosaurError)>,
    /// Whether the run stopped early because the cancel flag was set
    pub cancelled: bool,
}

impl<H> Default for RefreshReport<H> {
    fn default() -> Self {
        Self {
            refreshed: 0,
            unchanged: 0,
            revoked: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }
}

pub fn needs_refresh(cached_epoch: Epoch, current_epoch: Epoch) -> bool {
    cached_epoch < current_epoch
}

/// Bring the witness of every holder in `store` to the current epoch of `source`
pub fn refresh_all<G, W, U>(
    store: &mut W,
    source: &U,
    cancel: &AtomicBool,
) -> RefreshReport<W::Holder>
where
    G: AffineRepr,
    W: WitnessStore<G>,
    U: UpdateSource<G>,
{
    let mut report = RefreshReport::default();
    let current = source.current_epoch();
    for holder in store.holders() {
        if cancel.load(Ordering::Acquire) {
            report.cancelled = true;
            break;
        }
        let witness = match store.get(&holder) {
            Some(w) => w,
            None => continue,
        };
        if !needs_refresh(witness.epoch, current) {
            report.unchanged += 1;
            continue;
        }
        let updated = source
            .records_since(witness.epoch)
            .and_then(|records| witness.batch_update(&records));
        match updated {
            Ok(w) => {
                store.put(holder, w);
                report.refreshed += 1;
            }
            Err(AllosaurError::RevokedMember { epoch }) => {
                warn!(epoch, "holder was revoked");
                report.revoked.push(holder);
            }
            Err(e) => {
                debug!(epoch = witness.epoch, error = %e, "could not refresh holder");
                report.failed.push((holder, e));
            }
        }
    }
    info!(
        epoch = current,
        refreshed = report.refreshed,
        revoked = report.revoked.len(),
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "refreshed witnesses"
    );
    report
}

/// In-memory store keyed by holder
#[derive(Clone, Debug)]
pub struct InMemoryWitnessStore<H: Ord, G: AffineRepr> {
    pub db: BTreeMap<H, MembershipWitness<G>>,
}

impl<H: Ord, G: AffineRepr> InMemoryWitnessStore<H, G> {
    pub fn new() -> Self {
        Self {
            db: BTreeMap::new(),
        }
    }
}

impl<H: Ord, G: AffineRepr> Default for InMemoryWitnessStore<H, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Ord + Clone, G: AffineRepr> WitnessStore<G> for InMemoryWitnessStore<H, G> {
    type Holder = H;

    fn get(&self, holder: &H) -> Option<MembershipWitness<G>> {
        self.db.get(holder).copied()
    }

    fn put(&mut self, holder: H, witness: MembershipWitness<G>) {
        self.db.insert(holder, witness);
    }

    fn holders(&self) -> Vec<H> {
        self.db.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::RegistryConfig, setup::SetupParams};
    use ark_bls12_381::{Bls12_381, G1Affine};
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use blake2::Blake2b512;

    #[test]
    fn refresh_holders() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let params = SetupParams::<Bls12_381>::new::<Blake2b512>(b"test");
        let registry = Registry::create(&mut rng, params, RegistryConfig::default());

        let mut store = InMemoryWitnessStore::<&str, G1Affine>::new();
        for id in ["alice", "bob", "carol", "dave"] {
            store.put(id, registry.add_member(id.as_bytes()).unwrap());
        }
        registry.delete_member(b"bob").unwrap();
        registry.add_member(b"erin").unwrap();

        assert!(needs_refresh(1, 6));
        assert!(!needs_refresh(6, 6));

        let cancel = AtomicBool::new(false);
        let report = refresh_all(&mut store, &registry, &cancel);
        assert_eq!(report.refreshed, 3);
        assert_eq!(report.unchanged, 0);
        assert_eq!(report.revoked, vec!["bob"]);
        assert!(report.failed.is_empty());
        assert!(!report.cancelled);

        let acc = registry.current_accumulator();
        for id in ["alice", "carol", "dave"] {
            let w = store.get(&id).unwrap();
            assert_eq!(w.epoch, 6);
            w.verify(&acc, registry.public_keys(), registry.params())
                .unwrap();
        }
        // Revoked holder keeps its last good witness
        assert_eq!(store.get(&"bob").unwrap().epoch, 2);

        // Nothing changed since
        let report = refresh_all(&mut store, &registry, &cancel);
        assert_eq!(report.refreshed, 0);
        assert_eq!(report.unchanged, 3);
        assert_eq!(report.revoked.len(), 1);

        cancel.store(true, Ordering::Release);
        registry.add_member(b"frank").unwrap();
        let report = refresh_all(&mut store, &registry, &cancel);
        assert!(report.cancelled);
        assert_eq!(report.refreshed, 0);
    }
}
