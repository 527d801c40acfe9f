//! Public update information published by the registry.
//!
//! Every epoch transition appends one [`UpdateRecord`] to the registry's log. A record carries the elements added
//! and deleted in that transition and the `Omega` coefficients which let a holder advance a witness without the
//! trapdoor. Many consecutive records can be flattened into one [`AggregatedUpdate`] whose single `Omega`
//! updates a witness across all of them at once.
//!
//! For records `1..m` with additions `A_t`, deletions `D_t` and coefficients `Omega_t`, the flattened polynomial is
//! `Omega(x) = sum_t A_{>t}(x) * D_{<t}(x) * Omega_t(x)` where `A_{>t}` is the product of `d_{A_s}` for `s > t` and
//! `D_{<t}` the product of `d_{D_s}` for `s < t`. Updating with it gives the same witness as applying the records
//! one after another.

use crate::{
    accumulator::Epoch,
    batch_utils::{Omega, Poly_d},
    error::AllosaurError,
    setup::SecretKey,
};
use allosaur_utils::{
    poly::{multiply_poly, multiply_scalar_poly_with_group_poly, poly_from_roots},
    serde_utils::ArkObjectBytes,
};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{One, PrimeField, Zero};
use ark_poly::{univariate::DensePolynomial, DenseUVPolynomial};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{vec, vec::Vec};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
#[serde(bound = "")]
pub struct UpdateRecord<G: AffineRepr> {
    /// Epoch the accumulator moved to
    pub epoch: Epoch,
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    pub additions: Vec<G::ScalarField>,
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    pub deletions: Vec<G::ScalarField>,
    /// Coefficients of `(x - deletions[0]) * (x - deletions[1]) * ...`, lowest degree first
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    pub deletion_poly: Vec<G::ScalarField>,
    pub coefficients: Omega<G>,
}

/// Consecutive update records flattened into one
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
#[serde(bound = "")]
pub struct AggregatedUpdate<G: AffineRepr> {
    pub from_epoch: Epoch,
    pub to_epoch: Epoch,
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    pub additions: Vec<G::ScalarField>,
    #[serde_as(as = "Vec<ArkObjectBytes>")]
    pub deletions: Vec<G::ScalarField>,
    pub coefficients: Omega<G>,
}

impl<G: AffineRepr> UpdateRecord<G> {
    /// Record for adding `element` to the accumulator `old_accumulator`. `Omega` is just the old accumulator.
    pub fn addition(epoch: Epoch, element: G::ScalarField, old_accumulator: &G) -> Self {
        Self {
            epoch,
            additions: vec![element],
            deletions: vec![],
            deletion_poly: vec![G::ScalarField::one()],
            coefficients: Omega(vec![*old_accumulator]),
        }
    }

    /// Record for deleting all of `deletions` at once from the accumulator `old_accumulator`
    pub fn deletion(
        epoch: Epoch,
        deletions: Vec<G::ScalarField>,
        old_accumulator: &G,
        sk: &SecretKey<G::ScalarField>,
    ) -> Result<Self, AllosaurError> {
        let coefficients = Omega::new(&[], &deletions, old_accumulator, sk)?;
        let deletion_poly = poly_from_roots(&deletions).coeffs;
        Ok(Self {
            epoch,
            additions: vec![],
            deletions,
            deletion_poly,
            coefficients,
        })
    }

    /// Record of a transition that changed nothing but the epoch
    pub fn empty(epoch: Epoch) -> Self {
        Self {
            epoch,
            additions: vec![],
            deletions: vec![],
            deletion_poly: vec![G::ScalarField::one()],
            coefficients: Omega::empty(),
        }
    }

    pub fn validate(&self) -> Result<(), AllosaurError> {
        check_lengths(&self.additions, &self.deletions, &self.coefficients)?;
        if !is_deletion_poly(&self.deletion_poly, &self.deletions) {
            return Err(AllosaurError::MalformedBatch {
                additions: self.additions.len(),
                deletions: self.deletions.len(),
                coefficients: self.coefficients.len(),
            });
        }
        Ok(())
    }

    pub fn is_deleted(&self, element: &G::ScalarField) -> bool {
        self.deletions.contains(element)
    }

    /// `d_A(y) = prod_i (additions[i] - y)`
    pub fn eval_d_A(&self, y: &G::ScalarField) -> G::ScalarField {
        Poly_d::eval_direct(&self.additions, y)
    }

    /// `d_D(y) = prod_i (deletions[i] - y)`, from the published polynomial `prod_i (y - deletions[i])`
    pub fn eval_d_D(&self, y: &G::ScalarField) -> G::ScalarField {
        let e = self
            .deletion_poly
            .iter()
            .rev()
            .fold(G::ScalarField::zero(), |acc, c| acc * y + c);
        if self.deletions.len() % 2 == 1 {
            -e
        } else {
            e
        }
    }

    /// Flatten `records`, which must be the records right after `from_epoch`, into one update.
    pub fn aggregate(
        from_epoch: Epoch,
        records: &[Self],
    ) -> Result<AggregatedUpdate<G>, AllosaurError> {
        let mut expected = from_epoch + 1;
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

        let additions = records
            .iter()
            .flat_map(|r| r.additions.iter().copied())
            .collect::<Vec<_>>();
        let deletions = records
            .iter()
            .flat_map(|r| r.deletions.iter().copied())
            .collect::<Vec<_>>();

        let one = || DensePolynomial::from_coefficients_vec(vec![G::ScalarField::one()]);
        // suffix_A[t] = A_{>t}(x)
        let mut suffix_A = vec![one(); records.len()];
        for t in (0..records.len().saturating_sub(1)).rev() {
            suffix_A[t] = multiply_poly(
                &suffix_A[t + 1],
                &Poly_d::generate(&records[t + 1].additions).0,
            );
        }
        // prefix_D[t] = D_{<t}(x)
        let mut prefix_D = vec![one(); records.len()];
        for t in 1..records.len() {
            prefix_D[t] = multiply_poly(
                &prefix_D[t - 1],
                &Poly_d::generate(&records[t - 1].deletions).0,
            );
        }

        let mut omega = vec![G::Group::zero(); additions.len() + deletions.len()];
        for (t, r) in records.iter().enumerate() {
            let factor = multiply_poly(&suffix_A[t], &prefix_D[t]);
            let terms = multiply_scalar_poly_with_group_poly(&factor.coeffs, &r.coefficients.0);
            for (i, term) in terms.into_iter().enumerate() {
                omega[i] += term;
            }
        }

        Ok(AggregatedUpdate {
            from_epoch,
            to_epoch: expected - 1,
            additions,
            deletions,
            coefficients: Omega(G::Group::normalize_batch(&omega)),
        })
    }
}

impl<G: AffineRepr> AggregatedUpdate<G> {
    /// Update that moves nothing, from `epoch` to `epoch`
    pub fn empty(epoch: Epoch) -> Self {
        Self {
            from_epoch: epoch,
            to_epoch: epoch,
            additions: vec![],
            deletions: vec![],
            coefficients: Omega::empty(),
        }
    }

    pub fn validate(&self) -> Result<(), AllosaurError> {
        if self.to_epoch < self.from_epoch {
            return Err(AllosaurError::EpochGap {
                expected: self.from_epoch,
                found: self.to_epoch,
            });
        }
        check_lengths(&self.additions, &self.deletions, &self.coefficients)
    }

    pub fn is_deleted(&self, element: &G::ScalarField) -> bool {
        self.deletions.contains(element)
    }
}

fn check_lengths<G: AffineRepr>(
    additions: &[G::ScalarField],
    deletions: &[G::ScalarField],
    coefficients: &Omega<G>,
) -> Result<(), AllosaurError> {
    if coefficients.len() != additions.len() + deletions.len() {
        return Err(AllosaurError::MalformedBatch {
            additions: additions.len(),
            deletions: deletions.len(),
            coefficients: coefficients.len(),
        });
    }
    Ok(())
}

/// `true` when `coeffs` are the coefficients of the monic polynomial with roots `roots`
pub fn is_deletion_poly<F: PrimeField>(coeffs: &[F], roots: &[F]) -> bool {
    coeffs == poly_from_roots(roots).coeffs.as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_serialization;
    use ark_bls12_381::{Fr, G1Affine, G1Projective};
    use ark_std::{
        rand::{rngs::StdRng, SeedableRng},
        UniformRand,
    };

    #[test]
    fn records_and_aggregation() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let sk = SecretKey(Fr::rand(&mut rng));
        let V = G1Projective::rand(&mut rng).into_affine();
        let y = Fr::rand(&mut rng);

        let a = Fr::rand(&mut rng);
        let deleted = (0..3).map(|_| Fr::rand(&mut rng)).collect::<Vec<_>>();
        let add = UpdateRecord::<G1Affine>::addition(5, a, &V);
        add.validate().unwrap();
        assert_eq!(add.eval_d_A(&y), a - y);
        assert_eq!(add.eval_d_D(&y), Fr::one());

        let del = UpdateRecord::deletion(6, deleted.clone(), &V, &sk).unwrap();
        del.validate().unwrap();
        assert!(del.is_deleted(&deleted[1]));
        assert!(!del.is_deleted(&y));
        assert_eq!(del.eval_d_D(&y), Poly_d::eval_direct(&deleted, &y));
        assert!(del.eval_d_D(&deleted[2]).is_zero());
        assert!(is_deletion_poly(&del.deletion_poly, &deleted));
        test_serialization!(UpdateRecord<G1Affine>, del);

        let agg = UpdateRecord::aggregate(4, &[add.clone(), del.clone()]).unwrap();
        assert_eq!((agg.from_epoch, agg.to_epoch), (4, 6));
        assert_eq!(agg.additions, vec![a]);
        assert_eq!(agg.deletions, deleted);
        assert_eq!(agg.coefficients.len(), 4);
        agg.validate().unwrap();
        test_serialization!(AggregatedUpdate<G1Affine>, agg);

        // A single record aggregates to itself
        let single = UpdateRecord::aggregate(5, &[del.clone()]).unwrap();
        assert_eq!(single.coefficients, del.coefficients);

        assert!(matches!(
            UpdateRecord::aggregate(3, &[add.clone(), del.clone()]),
            Err(AllosaurError::EpochGap {
                expected: 4,
                found: 5
            })
        ));
        assert!(matches!(
            UpdateRecord::aggregate(4, &[add.clone(), UpdateRecord::empty(7)]),
            Err(AllosaurError::EpochGap {
                expected: 6,
                found: 7
            })
        ));

        let empty = UpdateRecord::<G1Affine>::aggregate(9, &[]).unwrap();
        assert_eq!(empty, AggregatedUpdate::empty(9));

        let mut malformed = del.clone();
        malformed.coefficients.0.pop();
        assert!(matches!(
            malformed.validate(),
            Err(AllosaurError::MalformedBatch {
                additions: 0,
                deletions: 3,
                coefficients: 2
            })
        ));
        let mut wrong_poly = del;
        wrong_poly.deletion_poly[0] += Fr::one();
        assert!(wrong_poly.validate().is_err());
    }
}
