#![cfg_attr(not(feature = "std"), no_std)]
#![allow(non_snake_case)]

//! # Dynamic accumulator for credential revocation
//!
//! A positive dynamic accumulator over a pairing friendly curve, after [Dynamic Universal Accumulator with Batch
//! Update over Bilinear Groups](https://eprint.iacr.org/2020/777) and [ALLOSAUR](https://eprint.iacr.org/2022/1362).
//! A registry holding the trapdoor keeps one short accumulator value for the set of valid credential holders,
//! and each holder keeps a witness of membership.
//!
//! - [`registry`] adds and deletes members, moving the accumulator to a new epoch on each change and publishing
//!   an [`update::UpdateRecord`] for it.
//! - [`witness`] updates witnesses from the published records without the trapdoor, one record at a time or
//!   many at once with a single multi-scalar multiplication.
//! - [`proofs`] proves membership in zero knowledge, bound to a verifier's nonce and the accumulator's epoch.
//! - [`threshold`] updates a witness through several replicas of the registry without revealing the member's
//!   element to fewer than a threshold of them.
//! - [`cache`] keeps witnesses of many holders current.
//! - [`wire`] has fixed length byte encodings over BLS12-381 and a registry handle speaking them.
//!
//! The registry, the cache and the byte encodings need the `std` feature.

pub mod accumulator;
pub mod batch_utils;
#[cfg(feature = "std")]
pub mod cache;
pub mod element;
pub mod error;
pub mod persistence;
pub mod proofs;
#[cfg(feature = "std")]
pub mod registry;
pub mod setup;
pub mod threshold;
pub mod update;
#[cfg(feature = "std")]
pub mod wire;
pub mod witness;

pub mod prelude {
    pub use crate::{
        accumulator::{Accumulator, Epoch, SignedAccumulator},
        batch_utils::Omega,
        element::{hash_to_scalar, Element},
        error::{AllosaurError, ErrorCode},
        persistence::{InMemoryMemberStore, MemberStore},
        proofs::{MembershipProof, MembershipProofProtocol},
        setup::*,
        threshold::{user_update, PartialUpdate, RegistryId, RequestShare, UpdateRequest},
        update::{AggregatedUpdate, UpdateRecord},
        witness::MembershipWitness,
    };

    #[cfg(feature = "std")]
    pub use crate::{
        cache::{refresh_all, InMemoryWitnessStore, UpdateSource, WitnessStore},
        registry::{Registry, RegistryConfig},
    };
}

#[cfg(test)]
#[macro_use]
pub mod tests {
    #[macro_export]
    macro_rules! test_serialization {
        ($obj_type:ty, $obj: expr) => {
            let mut serz = vec![];
            CanonicalSerialize::serialize_compressed(&$obj, &mut serz).unwrap();
            let deserz: $obj_type =
                CanonicalDeserialize::deserialize_compressed(&serz[..]).unwrap();
            assert_eq!(deserz, $obj);

            let mut serz = vec![];
            $obj.serialize_uncompressed(&mut serz).unwrap();
            let deserz: $obj_type =
                CanonicalDeserialize::deserialize_uncompressed(&serz[..]).unwrap();
            assert_eq!(deserz, $obj);

            // Test JSON serialization
            let ser = serde_json::to_string(&$obj).unwrap();
            let deser = serde_json::from_str::<$obj_type>(&ser).unwrap();
            assert_eq!($obj, deser);

            // Test Message Pack serialization
            let ser = rmp_serde::to_vec_named(&$obj).unwrap();
            let deser = rmp_serde::from_slice::<$obj_type>(&ser).unwrap();
            assert_eq!($obj, deser);
        };
    }
}

#[cfg(all(test, feature = "std"))]
mod scenarios;
