//! Benchmarks for percentile thresholds and isosurface extraction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wannierflow::volumetric::{extract_isosurface, find_isovalue, GridSpan, VolumetricGrid};

#[allow(clippy::cast_precision_loss)]
fn gaussian_grid(n: usize) -> VolumetricGrid {
    let centre = (n - 1) as f64 / 2.0;
    let width = n as f64 / 6.0;
    let mut data = Vec::with_capacity(n * n * n);
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                let r2 = [i, j, k].iter().map(|&x| (x as f64 - centre).powi(2)).sum::<f64>();
                let lobe = if k as f64 > centre { 1.0 } else { -1.0 };
                data.push(lobe * (-r2 / (2.0 * width * width)).exp());
            }
        }
    }
    let extent = n as f64 * 0.2;
    VolumetricGrid::new(
        [n, n, n],
        [0.0; 3],
        [[extent, 0.0, 0.0], [0.0, extent, 0.0], [0.0, 0.0, extent]],
        GridSpan::Exclusive,
        data,
    )
    .expect("grid size matches shape")
}

fn isosurface_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_isosurface");
    for n in [16, 32, 48] {
        let grid = gaussian_grid(n);
        let level = find_isovalue(&grid, 90.0).expect("valid percentile");
        group.bench_with_input(BenchmarkId::from_parameter(n), &grid, |b, grid| {
            b.iter(|| extract_isosurface(black_box(grid), black_box(level), 1))
        });
    }
    group.finish();

    let grid = gaussian_grid(32);
    c.bench_function("find_isovalue_32", |b| b.iter(|| find_isovalue(black_box(&grid), 90.0)));
}

criterion_group!(benches, isosurface_benchmark);
criterion_main!(benches);
