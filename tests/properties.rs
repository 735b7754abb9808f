// tests/properties.rs
//
// Property-based checks for vector algebra and matrix generation.

use proptest::prelude::*;

use stencil_bench::grid::Grid3D;
use stencil_bench::matrix::StencilMatrix;
use stencil_bench::reference;
use stencil_bench::vector::Vector;

fn values(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e3..1.0e3f64, len)
}

fn vector_pair() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..200).prop_flat_map(|len| (values(len), values(len)))
}

proptest! {
    #[test]
    fn squared_norm_difference_with_self_is_zero(v in (1usize..200).prop_flat_map(values)) {
        let v = Vector::from_slice(&v).unwrap();
        prop_assert_eq!(v.squared_norm_difference(&v).unwrap(), 0.0);
    }

    #[test]
    fn squared_norm_difference_is_symmetric((a, b) in vector_pair()) {
        let a = Vector::from_slice(&a).unwrap();
        let b = Vector::from_slice(&b).unwrap();
        let ab = a.squared_norm_difference(&b).unwrap();
        let ba = b.squared_norm_difference(&a).unwrap();
        prop_assert_eq!(ab, ba);
        prop_assert!(ab >= 0.0);
    }

    #[test]
    fn squared_norm_difference_rejects_unequal_lengths(len in 1usize..64, extra in 1usize..8) {
        let a = Vector::new(len).unwrap();
        let b = Vector::new(len + extra).unwrap();
        prop_assert!(a.squared_norm_difference(&b).is_err());
    }

    #[test]
    fn generated_rows_match_stencil_and_sum_to_degree_rhs(n in 1usize..7) {
        let a = StencilMatrix::build(n).unwrap();
        let grid = Grid3D::new(n);
        prop_assert_eq!(a.nrow, grid.n_cells());
        for row in 0..a.nrow {
            prop_assert_eq!(usize::from(a.nnzs[row]), grid.stencil_points(row));
        }

        let mut ones = Vector::new(a.nrow).unwrap();
        ones.one_fill();
        let mut y = Vector::new(a.nrow).unwrap();
        reference::spmv(&a, &ones, &mut y).unwrap();
        let mut b = Vector::new(a.nrow).unwrap();
        b.init_from_degree(&a.nnzs).unwrap();
        prop_assert_eq!(y.as_slice(), b.as_slice());
    }
}
