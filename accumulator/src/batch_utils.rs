#![allow(non_camel_case_types)]

//! Polynomials for updating witnesses after a batch of additions and deletions, as in section 3 and 4.1 of
//! [Dynamic Universal Accumulator with Batch Update over Bilinear Groups](https://eprint.iacr.org/2020/777).
//!
//! For additions `y_A` and deletions `y_D` applied to accumulator `V`, a witness `C` of `y` becomes
//! `C' = d_A(y)/d_D(y) * C + v_{A,D}(y)/d_D(y) * V`. The registry publishes `Omega`, the coefficients of
//! `v_{A,D}` multiplied by `V`, so that holders can evaluate `v_{A,D}(y) * V` without knowing the trapdoor.

use crate::{error::AllosaurError, setup::SecretKey};
use allosaur_utils::{
    msm::multiply_field_elems_with_same_group_elem,
    poly::{eval_negated_roots_direct, evaluate_group_poly, poly_from_negated_roots, powers},
    serde_utils::ArkObjectBytes,
};
use ark_ec::AffineRepr;
use ark_ff::{One, PrimeField, Zero};
use ark_poly::univariate::DensePolynomial;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{vec, vec::Vec};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Polynomial `d_A` or `d_D`, i.e. `(updates[0]-x) * (updates[1]-x) * ...`
pub struct Poly_d<F: PrimeField>(pub DensePolynomial<F>);

/// Polynomial `v_A`, used when only adding
pub struct Poly_v_A<F: PrimeField>(pub DensePolynomial<F>);

/// Polynomial `v_D`, used when only deleting
pub struct Poly_v_D<F: PrimeField>(pub DensePolynomial<F>);

/// Polynomial `v_{A,D}`, used when both adding and deleting in the same batch
pub struct Poly_v_AD<F: PrimeField>(pub DensePolynomial<F>);

impl<F: PrimeField> Poly_d<F> {
    /// Constant polynomial 1 for no updates as its evaluation multiplies the old witness
    pub fn generate(updates: &[F]) -> Self {
        Self(poly_from_negated_roots(updates))
    }

    /// Evaluation without creating the polynomial as the variable is already known.
    pub fn eval_direct(updates: &[F], x: &F) -> F {
        eval_negated_roots_direct(updates, x)
    }
}

impl<F: PrimeField> Poly_v_A<F> {
    /// `v_A(x) = sum_{s} (prod_{i<s} (additions[i] + alpha)) * prod_{i>s} (additions[i] - x)`
    pub fn generate(additions: &[F], alpha: &F) -> Self {
        let n = additions.len();
        let mut sum = DensePolynomial::zero();
        let mut factor = F::one();
        for s in 0..n {
            let poly = poly_from_negated_roots(&additions[s + 1..]);
            sum = &sum + &(&poly * factor);
            factor *= additions[s] + alpha;
        }
        Self(sum)
    }

    pub fn eval_direct(additions: &[F], alpha: &F, x: &F) -> F {
        let mut sum = F::zero();
        let mut factor = F::one();
        for s in 0..additions.len() {
            sum += factor * eval_negated_roots_direct(&additions[s + 1..], x);
            factor *= additions[s] + alpha;
        }
        sum
    }
}

impl<F: PrimeField> Poly_v_D<F> {
    /// `v_D(x) = sum_{s} (prod_{i<=s} (removals[i] + alpha))^-1 * prod_{i<s} (removals[i] - x)`
    pub fn generate(removals: &[F], alpha: &F) -> Result<Self, AllosaurError> {
        let factors = Self::factors(removals, alpha)?;
        let mut sum = DensePolynomial::zero();
        for (s, factor) in factors.into_iter().enumerate() {
            let poly = poly_from_negated_roots(&removals[..s]);
            sum = &sum + &(&poly * factor);
        }
        Ok(Self(sum))
    }

    pub fn eval_direct(removals: &[F], alpha: &F, x: &F) -> Result<F, AllosaurError> {
        let factors = Self::factors(removals, alpha)?;
        Ok(factors
            .into_iter()
            .enumerate()
            .map(|(s, factor)| factor * eval_negated_roots_direct(&removals[..s], x))
            .sum())
    }

    /// `1/(removals[0] + alpha)`, `1/((removals[0] + alpha) * (removals[1] + alpha))`, ...
    fn factors(removals: &[F], alpha: &F) -> Result<Vec<F>, AllosaurError> {
        let mut acc = F::one();
        let mut factors = Vec::with_capacity(removals.len());
        for r in removals {
            acc *= *r + alpha;
            factors.push(acc);
        }
        if factors.iter().any(|f| f.is_zero()) {
            return Err(AllosaurError::ProhibitedElement);
        }
        ark_ff::batch_inversion(&mut factors);
        Ok(factors)
    }
}

impl<F: PrimeField> Poly_v_AD<F> {
    /// `v_{A,D}(x) = v_A(x) - prod_{a in additions} (a + alpha) * v_D(x)`
    pub fn generate(additions: &[F], removals: &[F], alpha: &F) -> Result<Self, AllosaurError> {
        let mut p = Poly_v_A::generate(additions, alpha).0;
        if !removals.is_empty() {
            let v_D = Poly_v_D::generate(removals, alpha)?.0;
            p = &p - &(&v_D * Self::compute_factor(additions, alpha));
        }
        Ok(Self(p))
    }

    pub fn eval_direct(
        additions: &[F],
        removals: &[F],
        alpha: &F,
        x: &F,
    ) -> Result<F, AllosaurError> {
        let mut e = Poly_v_A::eval_direct(additions, alpha, x);
        if !removals.is_empty() {
            e -= Poly_v_D::eval_direct(removals, alpha, x)?
                * Self::compute_factor(additions, alpha);
        }
        Ok(e)
    }

    pub fn get_omega_coefficients(&self) -> &[F] {
        &self.0.coeffs
    }

    fn compute_factor(additions: &[F], alpha: &F) -> F {
        additions.iter().fold(F::one(), |acc, a| acc * (*a + alpha))
    }
}

/// Published by the registry with each update so witnesses can be updated without the trapdoor. Defined in
/// section 4.1 of the paper. Always holds `additions + deletions` coefficients, padded with the identity
/// when `v_{A,D}` has a smaller degree, so the expected length can be checked from public data.
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct Omega<G: AffineRepr>(#[serde_as(as = "Vec<ArkObjectBytes>")] pub Vec<G>);

impl<G: AffineRepr> Omega<G> {
    pub fn new(
        additions: &[G::ScalarField],
        removals: &[G::ScalarField],
        old_accumulator: &G,
        sk: &SecretKey<G::ScalarField>,
    ) -> Result<Self, AllosaurError> {
        let poly = Poly_v_AD::generate(additions, removals, &sk.0)?;
        let mut coeffs = multiply_field_elems_with_same_group_elem(
            old_accumulator.into_group(),
            poly.get_omega_coefficients(),
        );
        coeffs.resize(additions.len() + removals.len(), G::zero());
        Ok(Self(coeffs))
    }

    /// `<[1, y, y^2, ...], omega>`
    pub fn inner_product_with_powers_of_y(&self, y: &G::ScalarField) -> G::Group {
        evaluate_group_poly(&self.0, y)
    }

    /// `[scale, scale * y, scale * y^2, ...]` of length `n`
    pub fn scaled_powers_of_y(
        y: &G::ScalarField,
        scale: &G::ScalarField,
        n: usize,
    ) -> Vec<G::ScalarField> {
        let mut p = powers(y, n);
        for x in p.iter_mut() {
            *x *= scale;
        }
        p
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn empty() -> Self {
        Self(vec![])
    }
}

impl<G: AffineRepr> From<Vec<G>> for Omega<G> {
    fn from(coeffs: Vec<G>) -> Self {
        Self(coeffs)
    }
}
