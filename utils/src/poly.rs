use ark_ec::{AffineRepr, VariableBaseMSM};
use ark_ff::{PrimeField, Zero};
use ark_poly::{univariate::DensePolynomial, DenseUVPolynomial};
use ark_std::{cfg_into_iter, vec, vec::Vec};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Naive multiplication (n^2) of 2 polynomials defined over prime fields
/// Note: Using multiply operator from ark-poly is orders of magnitude slower than naive multiplication
pub fn multiply_poly<F: PrimeField>(
    left: &DensePolynomial<F>,
    right: &DensePolynomial<F>,
) -> DensePolynomial<F> {
    if left.coeffs.is_empty() || right.coeffs.is_empty() {
        return DensePolynomial::zero();
    }
    let mut product = vec![F::zero(); left.coeffs.len() + right.coeffs.len() - 1];
    for (i, l) in left.coeffs.iter().enumerate() {
        for (j, r) in right.coeffs.iter().enumerate() {
            product[i + j] += *l * r;
        }
    }
    DensePolynomial::from_coefficients_vec(product)
}

/// Multiply given polynomials together. Product of no polynomials is the constant 1.
pub fn multiply_many_polys<F: PrimeField>(polys: Vec<DensePolynomial<F>>) -> DensePolynomial<F> {
    let one = || DensePolynomial::from_coefficients_vec(vec![F::one()]);

    #[cfg(not(feature = "parallel"))]
    let r = polys
        .into_iter()
        .reduce(|a, b| multiply_poly(&a, &b))
        .unwrap_or_else(one);

    #[cfg(feature = "parallel")]
    let r = polys
        .into_par_iter()
        .reduce(one, |a, b| multiply_poly(&a, &b));

    r
}

/// Create the polynomial `(roots[0]-x)*(roots[1]-x)*..*(roots[last]-x)`. For no roots, this is
/// the constant polynomial 1 as its evaluation always scales something.
pub fn poly_from_negated_roots<F: PrimeField>(roots: &[F]) -> DensePolynomial<F> {
    let terms = cfg_into_iter!(roots)
        .map(|r| DensePolynomial::from_coefficients_slice(&[*r, -F::one()]))
        .collect::<Vec<_>>();
    multiply_many_polys(terms)
}

/// Create the monic polynomial `(x-roots[0])*(x-roots[1])*..*(x-roots[last])`
pub fn poly_from_roots<F: PrimeField>(roots: &[F]) -> DensePolynomial<F> {
    let terms = cfg_into_iter!(roots)
        .map(|r| DensePolynomial::from_coefficients_slice(&[-*r, F::one()]))
        .collect::<Vec<_>>();
    multiply_many_polys(terms)
}

/// Returns `[1, x, x^2, ..., x^{n-1}]`
pub fn powers<F: PrimeField>(x: &F, n: usize) -> Vec<F> {
    let mut p = Vec::with_capacity(n);
    let mut acc = F::one();
    for _ in 0..n {
        p.push(acc);
        acc *= x;
    }
    p
}

/// Multiply a polynomial with scalar coefficients by one whose coefficients are group elements.
/// The result is the coefficient vector of the product polynomial "in the exponent".
pub fn multiply_scalar_poly_with_group_poly<G: AffineRepr>(
    scalar_poly: &[G::ScalarField],
    group_poly: &[G],
) -> Vec<G::Group> {
    if scalar_poly.is_empty() || group_poly.is_empty() {
        return Vec::new();
    }
    let len = scalar_poly.len() + group_poly.len() - 1;
    cfg_into_iter!(0..len)
        .map(|k| {
            let start = k.saturating_sub(scalar_poly.len() - 1);
            let end = k.min(group_poly.len() - 1);
            let bases = &group_poly[start..=end];
            let scalars = (start..=end)
                .map(|j| scalar_poly[k - j])
                .collect::<Vec<_>>();
            G::Group::msm_unchecked(bases, &scalars)
        })
        .collect()
}

/// Evaluate a polynomial whose coefficients are group elements at the scalar `x`, i.e.
/// `<[1, x, x^2, ...], coeffs>` as one multi-scalar multiplication.
pub fn evaluate_group_poly<G: AffineRepr>(coeffs: &[G], x: &G::ScalarField) -> G::Group {
    G::Group::msm_unchecked(coeffs, &powers(x, coeffs.len()))
}

/// `prod_i (roots[i] - x)` without building the polynomial
pub fn eval_negated_roots_direct<F: PrimeField>(roots: &[F], x: &F) -> F {
    roots.iter().fold(F::one(), |acc, r| acc * (*r - x))
}
