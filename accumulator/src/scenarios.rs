use crate::{
    accumulator::accumulate_all,
    batch_utils::Omega,
    element::hash_to_scalar,
    error::AllosaurError,
    proofs::MembershipProof,
    registry::{Registry, RegistryConfig},
    setup::{Keypair, SetupParams},
    threshold::{user_update, PartialUpdate, RegistryId, UpdateRequest},
    update::UpdateRecord,
};
use ark_bls12_381::{Bls12_381, Fr};
use ark_ec::CurveGroup;
use ark_std::{
    collections::BTreeMap,
    rand::{rngs::StdRng, RngCore, SeedableRng},
    UniformRand,
};
use blake2::Blake2b512;
use std::time::Instant;

fn setup(rng: &mut StdRng) -> (Keypair<Bls12_381>, SetupParams<Bls12_381>) {
    let params = SetupParams::new::<Blake2b512>(b"test");
    let keypair = Keypair::generate_using_rng(rng, &params);
    (keypair, params)
}

fn fresh_nonce(rng: &mut StdRng) -> [u8; 32] {
    let mut nonce = [0u8; 32];
    rng.fill_bytes(&mut nonce);
    nonce
}

#[test]
fn revoked_holder_and_remaining_holder() {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (keypair, params) = setup(&mut rng);
    let registry = Registry::from_keys(keypair, params, RegistryConfig::default());
    assert_eq!(registry.current_epoch(), 0);

    let w_a = registry.add_member(b"A").unwrap();
    assert_eq!(w_a.epoch, 1);
    let w_b = registry.add_member(b"B").unwrap();
    assert_eq!(w_b.epoch, 2);
    registry.delete_member(b"A").unwrap();
    assert_eq!(registry.current_epoch(), 3);

    let record = registry.records_since(2).unwrap();
    assert_eq!(record.len(), 1);
    assert_eq!(record[0].epoch, 3);
    assert_eq!(record[0].deletion_poly.len(), 2);

    assert!(matches!(
        w_a.batch_update(&record),
        Err(AllosaurError::RevokedMember { epoch: 3 })
    ));
    let w_b = w_b.batch_update(&record).unwrap();
    assert_eq!(w_b.epoch, 3);

    let acc = registry.current_accumulator();
    let pk = registry.public_keys();
    w_b.verify(&acc, pk, registry.params()).unwrap();
    let nonce = fresh_nonce(&mut rng);
    MembershipProof::<Bls12_381>::prove::<_, Blake2b512>(
        &mut rng,
        &w_b,
        &acc,
        pk,
        registry.params(),
        &nonce,
    )
    .unwrap()
    .verify_for_nonce::<Blake2b512>(&nonce, &acc, pk, registry.params())
    .unwrap();
}

#[test]
fn replay_and_update_equivalence() {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (keypair, params) = setup(&mut rng);
    let alpha = keypair.secret_key.0;
    let P = params.P;
    let registry = Registry::from_keys(keypair, params, RegistryConfig::default());

    let members = (0..30).map(|_| Fr::rand(&mut rng)).collect::<Vec<_>>();
    let mut witnesses = Vec::new();
    let mut active = Vec::new();
    let start = Instant::now();
    for (i, y) in members.iter().enumerate() {
        witnesses.push(registry.add_member_scalar(*y).unwrap());
        active.push(*y);
        // Delete a few members every few additions
        if i % 7 == 6 {
            let gone = [members[i - 6], members[i - 3]];
            registry.batch_delete_scalars(&gone).unwrap();
            active.retain(|a| !gone.contains(a));
        }
    }
    registry.delete_member_scalar(members[29]).unwrap();
    active.retain(|a| *a != members[29]);
    println!(
        "Time for {} epochs: {:?}",
        registry.current_epoch(),
        start.elapsed()
    );

    // Replaying the log from scratch gives the current accumulator
    let acc = registry.current_accumulator();
    assert_eq!(acc.value, accumulate_all(&alpha, &active, &P).into_affine());
    registry.check_invariants();

    for w in &witnesses {
        let records = registry.records_since(w.epoch).unwrap();
        let by_record = w.batch_update(&records);
        if !active.contains(&w.owner) {
            assert!(matches!(
                by_record,
                Err(AllosaurError::RevokedMember { .. })
            ));
            continue;
        }
        let by_record = by_record.unwrap();
        let agg = UpdateRecord::aggregate(w.epoch, &records).unwrap();
        let by_batch = w
            .multi_batch_update(
                &w.owner,
                &agg.additions,
                &agg.deletions,
                &agg.coefficients,
                agg.to_epoch,
            )
            .unwrap();
        assert_eq!(by_record, by_batch);
        assert_eq!(by_record, registry.issue_witness(&w.owner).unwrap());
        by_record
            .verify(&acc, registry.public_keys(), registry.params())
            .unwrap();
    }
}

#[test]
fn malformed_batch_leaves_registry_unchanged() {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (keypair, params) = setup(&mut rng);
    let registry = Registry::from_keys(keypair, params, RegistryConfig::default());
    for id in ["a", "b", "c", "d"] {
        registry.add_member(id.as_bytes()).unwrap();
    }
    let w = registry
        .issue_witness(&hash_to_scalar(b"d").unwrap())
        .unwrap();
    registry.batch_delete(&["a", "b"]).unwrap();
    let record = registry.records_since(4).unwrap().remove(0);
    let before = registry.current_accumulator();

    let mut three = record.coefficients.0.clone();
    three.push(three[0]);
    assert!(matches!(
        w.multi_batch_update(&w.owner, &[], &record.deletions, &Omega(three), 5),
        Err(AllosaurError::MalformedBatch {
            additions: 0,
            deletions: 2,
            coefficients: 3
        })
    ));
    assert_eq!(registry.current_accumulator(), before);
    assert_eq!(registry.records_since(0).unwrap().len(), 5);
}

#[test]
fn idempotent_reads() {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (keypair, params) = setup(&mut rng);
    let registry = Registry::from_keys(keypair, params, RegistryConfig::default());
    registry.add_member(b"a").unwrap();
    registry.add_member(b"b").unwrap();
    registry.delete_member(b"a").unwrap();

    let epoch = registry.current_epoch();
    let acc = registry.current_accumulator();
    let records = registry.records_since(0).unwrap();
    for _ in 0..3 {
        assert_eq!(registry.current_epoch(), epoch);
        assert_eq!(registry.current_accumulator(), acc);
        assert_eq!(registry.records_since(0).unwrap(), records);
        assert_eq!(registry.public_keys(), registry.public_keys());
    }
}

#[test]
fn two_of_three_replicas() {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (keypair, params) = setup(&mut rng);
    let ids: [RegistryId; 3] = [1, 2, 3];
    let replicas = ids
        .iter()
        .map(|id| {
            (
                *id,
                Registry::from_keys(keypair.clone(), params.clone(), RegistryConfig::default()),
            )
        })
        .collect::<BTreeMap<_, _>>();

    // Every replica sees the same mutations in the same order
    let mut w = None;
    for id in ["a", "b", "c", "d", "e"] {
        for r in replicas.values() {
            let witness = r.add_member(id.as_bytes()).unwrap();
            if id == "c" {
                w = Some(witness);
            }
        }
    }
    for r in replicas.values() {
        r.batch_delete(&["a", "d"]).unwrap();
        r.add_member(b"f").unwrap();
    }
    let w = w.unwrap();
    let acc = replicas[&1].current_accumulator();
    assert_eq!(acc, replicas[&3].current_accumulator());

    let max_len = replicas[&1].update_since(w.epoch).unwrap().coefficients.len();
    let request = UpdateRequest::new(&mut rng, &w, 2, &ids, max_len).unwrap();
    let answer = |id: RegistryId| -> PartialUpdate<_> {
        replicas[&id]
            .threshold_update(request.share_for(id).unwrap())
            .unwrap()
    };

    let mut partials = BTreeMap::new();
    partials.insert(1, answer(1));
    assert!(matches!(
        user_update(&w, &partials, 2),
        Err(AllosaurError::InsufficientShares {
            threshold: 2,
            received: 1
        })
    ));

    partials.insert(3, answer(3));
    let updated = user_update(&w, &partials, 2).unwrap();
    assert_eq!(updated.epoch, acc.epoch);
    updated
        .verify(&acc, replicas[&2].public_keys(), replicas[&2].params())
        .unwrap();
    assert_eq!(
        updated,
        w.batch_update(&replicas[&2].records_since(w.epoch).unwrap())
            .unwrap()
    );

    partials.insert(2, answer(2));
    assert_eq!(user_update(&w, &partials, 2).unwrap(), updated);
}
