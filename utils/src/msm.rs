use ark_ec::{scalar_mul::fixed_base::FixedBase, CurveGroup};
use ark_ff::PrimeField;
use ark_std::vec::Vec;

/// Use when same elliptic curve point is to be multiplied by several scalars, like the old
/// accumulator value being scaled by every coefficient of an update polynomial.
#[derive(Clone, Debug)]
pub struct WindowTable<G: CurveGroup> {
    scalar_size: usize,
    window_size: usize,
    outerc: usize,
    table: Vec<Vec<G::Affine>>,
}

impl<G: CurveGroup> WindowTable<G> {
    /// Create new table for `group_elem`. `num_multiplications` is the number of multiplication that
    /// need to be done and it can be an approximation as it does not impact correctness but only performance.
    pub fn new(num_multiplications: usize, group_elem: G) -> Self {
        let scalar_size = G::ScalarField::MODULUS_BIT_SIZE as usize;
        let window_size = FixedBase::get_mul_window_size(num_multiplications);
        let outerc = (scalar_size + window_size - 1) / window_size;
        let table = FixedBase::get_window_table(scalar_size, window_size, group_elem);
        Self {
            scalar_size,
            window_size,
            outerc,
            table,
        }
    }

    pub fn multiply(&self, element: &G::ScalarField) -> G {
        FixedBase::windowed_mul(self.outerc, self.window_size, &self.table, element)
    }

    pub fn multiply_many(&self, elements: &[G::ScalarField]) -> Vec<G> {
        FixedBase::msm(self.scalar_size, self.window_size, &self.table, elements)
    }
}

/// The same group element is multiplied by each in `elements` using a window table. Returns affine
/// points as they are usually published or fed to a later MSM.
pub fn multiply_field_elems_with_same_group_elem<G: CurveGroup>(
    group_elem: G,
    elements: &[G::ScalarField],
) -> Vec<G::Affine> {
    if elements.is_empty() {
        return Vec::new();
    }
    let table = WindowTable::new(elements.len(), group_elem);
    G::normalize_batch(&table.multiply_many(elements))
}
