//! Shamir sharing of field elements and Lagrange interpolation at 0. Share ids are the x coordinates
//! the dealing polynomial is evaluated at, so they must be non-zero and distinct.

use crate::error::{ShareId, UtilsError};
use ark_ff::PrimeField;
use ark_poly::{univariate::DensePolynomial, DenseUVPolynomial, Polynomial};
use ark_std::{cfg_into_iter, cfg_iter, rand::RngCore, vec::Vec};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Share `secret` so that any `threshold` of the evaluations at `ids` reconstruct it. Returns the
/// evaluations in the order of `ids`.
pub fn deal_secret<R: RngCore, F: PrimeField>(
    rng: &mut R,
    secret: F,
    threshold: ShareId,
    ids: &[ShareId],
) -> Result<Vec<F>, UtilsError> {
    check_ids(ids)?;
    if threshold < 1 || threshold as usize > ids.len() {
        return Err(UtilsError::InvalidThresholdOrTotal(
            threshold,
            ids.len() as ShareId,
        ));
    }
    let mut coeffs = Vec::with_capacity(threshold as usize);
    coeffs.push(secret);
    coeffs.extend((1..threshold).map(|_| F::rand(rng)));
    let poly = DensePolynomial::from_coefficients_vec(coeffs);
    Ok(cfg_iter!(ids)
        .map(|i| poly.evaluate(&F::from(*i as u64)))
        .collect())
}

/// Return the Lagrange basis polynomial at x = 0 for each of the given `x` coordinates.
pub fn lagrange_basis_at_0_for_all<F: PrimeField>(x_coords: &[ShareId]) -> Result<Vec<F>, UtilsError> {
    check_ids(x_coords)?;
    let x = cfg_iter!(x_coords)
        .map(|x| F::from(*x as u64))
        .collect::<Vec<_>>();

    // Product of all `x`, i.e. \prod_{i}(x_i}
    let product = x.iter().fold(F::one(), |acc, x_i| acc * x_i);

    let mut basis = cfg_into_iter!(x.clone())
        .map(|i| {
            let denominator = x
                .iter()
                .filter(|&j| &i != j)
                .fold(F::one(), |acc, j| acc * (*j - i));
            // numerator is the product of all `x` except `x_i`
            (product * i.inverse().unwrap_or_default(), denominator)
        })
        .collect::<Vec<_>>();
    let mut denominators = basis.iter().map(|(_, d)| *d).collect::<Vec<_>>();
    ark_ff::batch_inversion(&mut denominators);
    Ok(basis
        .drain(..)
        .zip(denominators)
        .map(|((n, _), d_inv)| n * d_inv)
        .collect())
}

fn check_ids(ids: &[ShareId]) -> Result<(), UtilsError> {
    for (k, id) in ids.iter().enumerate() {
        if *id == 0 {
            return Err(UtilsError::InvalidShareId(*id));
        }
        if ids[..k].contains(id) {
            return Err(UtilsError::DuplicateShareId(*id));
        }
    }
    Ok(())
}
