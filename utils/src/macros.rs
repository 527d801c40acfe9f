/// Concatenates supplied slices into one continuous vector.
#[macro_export]
macro_rules! concat_slices {
    ($($slice: expr),+) => {
        [$(&$slice[..]),+].concat()
    }
}

/// Concatenates provided byte slices and hashes result to a point on the curve. Returns as Affine coordinates.
/// Expects a type parameter `D: Digest` in scope.
#[macro_export]
macro_rules! affine_group_element_from_byte_slices {
    ($($arg: expr),+) => {
        $crate::hashing_utils::affine_group_elem_from_try_and_incr::<_, D>(&$crate::concat_slices!($($arg),+))
    };
}
