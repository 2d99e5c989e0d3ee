use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridfield::{HierarchicalGridData, Method, ResampleOptions, UniformGrid, UniformGridData};

const N: usize = 128;




fn field() -> UniformGridData {
    UniformGridData::sample_function(|x| (x[0] * 3.0).sin() * (x[1] * 2.0).cos(), &[N, N], &[0.0, 0.0], &[1.0, 1.0], 0)
        .expect("valid grid")
}




// ============================================================================
fn resampling(c: &mut Criterion) {
    let source = field();
    let target = UniformGrid::from_corners(&[N + 17, N + 17], &[0.0, 0.0], &[1.0, 1.0]).expect("valid grid");

    for (name, method) in [("nearest", Method::Nearest), ("linear", Method::Linear), ("spline", Method::Spline)] {
        let options = ResampleOptions::default().with_method(method);
        c.bench_function(&format!("resample_{}", name), |b| {
            b.iter(|| source.resampled(black_box(&target), options))
        });
    }
}

fn merging(c: &mut Criterion) {
    let coarse = field();
    let grid = UniformGrid::from_spacing(&[N, N], &[0.25, 0.25], &[0.5 / (N - 1) as f64; 2])
        .expect("valid grid")
        .with_ref_level(1);
    let fine = UniformGridData::from_function(grid, |x| x[0] * x[1]);
    let hierarchy = HierarchicalGridData::new(vec![coarse, fine]).expect("valid hierarchy");

    c.bench_function("merge_refinement_levels", |b| {
        b.iter(|| hierarchy.merge_refinement_levels(black_box(true)))
    });
}

criterion_group!(benches, resampling, merging);
criterion_main!(benches);
