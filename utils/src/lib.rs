#![cfg_attr(not(feature = "std"), no_std)]

//! Helpers over arkworks shared by the accumulator crate: serde bridging for ark types, hashing to
//! field elements and curve points, fixed-base multiplication tables, polynomial arithmetic,
//! Schnorr proofs of knowledge and signatures, and Lagrange interpolation at 0.

#[macro_use]
pub mod macros;
#[macro_use]
pub mod serde_utils;
pub mod error;
pub mod hashing_utils;
pub mod lagrange;
pub mod msm;
pub mod poly;
pub mod schnorr;
pub mod schnorr_signature;

/// Return `par_iter` or `iter` depending on whether feature `parallel` is enabled
#[macro_export]
macro_rules! iter {
    ($val:expr) => {{
        #[cfg(feature = "parallel")]
        let it = $val.par_iter();
        #[cfg(not(feature = "parallel"))]
        let it = $val.iter();
        it
    }};
}
