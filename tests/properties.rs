//! Property-based tests for grids, fields and hierarchies.

use gridfield::{HierarchicalGridData, Method, ResampleOptions, UniformGrid, UniformGridData};
use proptest::prelude::*;




fn plane(x: &[f64]) -> f64 {
    1.5 * x[0] - 0.5 * x[1] + 2.0
}

fn bump(x: &[f64]) -> f64 {
    (x[0] * 0.7).sin() + (x[1] * 0.3).cos()
}




proptest! {
    /// One-dimensional coordinates step by the spacing from x0 to x1.
    #[test]
    fn coordinates_step_by_spacing(
        nx in 2usize..40,
        ny in 2usize..40,
        x0 in -10.0f64..10.0,
        y0 in -10.0f64..10.0,
        lx in 0.1f64..20.0,
        ly in 0.1f64..20.0,
    ) {
        let grid = UniformGrid::from_corners(&[nx, ny], &[x0, y0], &[x0 + lx, y0 + ly]).unwrap();
        let coordinates = grid.coordinates_1d();

        for (axis, axis_coordinates) in coordinates.iter().enumerate() {
            prop_assert_eq!(axis_coordinates.len(), grid.shape()[axis]);
            for pair in axis_coordinates.windows(2) {
                prop_assert!((pair[1] - pair[0] - grid.dx()[axis]).abs() < 1e-9);
            }
        }
        let x1 = grid.x1();
        prop_assert!(grid.contains(grid.x0()));
        prop_assert!(grid.contains(&x1));
        let beyond: Vec<_> = x1.iter().zip(grid.dx()).map(|(x, d)| x + 1.5 * d).collect();
        prop_assert!(!grid.contains(&beyond));
    }

    /// Reading back a sampled field gives the function at each cell center.
    #[test]
    fn sampling_round_trip(
        nx in 1usize..12,
        ny in 2usize..12,
        i in 0usize..12,
        j in 0usize..12,
    ) {
        let x1 = if nx == 1 { 0.0 } else { 3.0 };
        let f = UniformGridData::sample_function(bump, &[nx, ny], &[0.0, -1.0], &[x1, 2.0], 0).unwrap();
        let index = [i % nx, j % ny];
        let x = f.grid().coordinate_at(&index).unwrap();
        prop_assert_eq!(f.value_at_index(&index).unwrap(), bump(&x));
    }

    /// Field arithmetic acts value by value.
    #[test]
    fn addition_is_elementwise(
        nx in 2usize..16,
        ny in 2usize..16,
        s in -5.0f64..5.0,
    ) {
        let a = UniformGridData::sample_function(bump, &[nx, ny], &[0.0, 0.0], &[1.0, 1.0], 0).unwrap();
        let b = &a * s;
        let c = (&a + &b).unwrap();

        for n in 0..a.data().len() {
            prop_assert_eq!(c.data()[n], a.data()[n] + b.data()[n]);
        }
    }

    /// Resampling onto the field's own grid reproduces it.
    #[test]
    fn resampling_onto_own_grid(
        nx in 2usize..16,
        ny in 2usize..16,
        spline in any::<bool>(),
    ) {
        let f = UniformGridData::sample_function(bump, &[nx, ny], &[-1.0, 0.0], &[1.0, 4.0], 0).unwrap();
        let method = if spline { Method::Spline } else { Method::Linear };
        let g = f.resampled(f.grid(), ResampleOptions::default().with_method(method)).unwrap();

        for (a, b) in f.data().iter().zip(g.data()) {
            prop_assert!((a - b).abs() < 1e-9);
        }
    }

    /// Linear fields are reproduced exactly anywhere inside the grid.
    #[test]
    fn interpolation_is_exact_for_planes(
        px in 0.0f64..4.0,
        py in 0.0f64..4.0,
    ) {
        let f = UniformGridData::sample_function(plane, &[5, 7], &[0.0, 0.0], &[4.0, 4.0], 0).unwrap();
        let linear = ResampleOptions::default().with_method(Method::Linear);
        prop_assert!((f.evaluate(&[px, py]).unwrap() - plane(&[px, py])).abs() < 1e-9);
        prop_assert!((f.evaluate_with(&[px, py], linear).unwrap() - plane(&[px, py])).abs() < 1e-9);
    }

    /// Fields on different lattices never combine.
    #[test]
    fn mismatched_lattices_fail(
        shift in 0.01f64..0.99,
    ) {
        let a = UniformGridData::sample_function(bump, &[6, 6], &[0.0, 0.0], &[5.0, 5.0], 0).unwrap();
        let b = UniformGridData::sample_function(bump, &[6, 6], &[shift, 0.0], &[5.0 + shift, 5.0], 0).unwrap();
        prop_assert!((&a + &b).is_err());
        prop_assert!((&a * &b).is_err());
    }

    /// Sampling a sub-region agrees with the full merge over that region.
    #[test]
    fn subregion_matches_merge(
        i0 in 0usize..20,
        len in 1usize..12,
        resample in any::<bool>(),
    ) {
        let coarse = UniformGridData::sample_function(bump, &[11, 11], &[0.0, 0.0], &[10.0, 10.0], 0).unwrap();
        let fine_grid = UniformGrid::from_spacing(&[9, 9], &[3.0, 3.0], &[0.5, 0.5]).unwrap().with_ref_level(1);
        let fine = UniformGridData::from_function(fine_grid, plane);
        let hg = HierarchicalGridData::new(vec![coarse, fine]).unwrap();
        let merged = hg.merge_refinement_levels(resample).unwrap();

        let i1 = (i0 + len).min(20);
        let part = hg.to_uniform_grid_data(
            &[i1 - i0 + 1, 3],
            &[i0 as f64 * 0.5, 4.0],
            &[i1 as f64 * 0.5, 5.0],
            resample).unwrap();

        for k in 0..=(i1 - i0) {
            for j in 0..3 {
                let a = part.value_at_index(&[k, j]).unwrap();
                let b = merged.value_at_index(&[i0 + k, 8 + j]).unwrap();
                prop_assert!((a - b).abs() < 1e-9);
            }
        }
    }
}
