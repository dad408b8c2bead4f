/* benches/matrix_kernels.rs */
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration, Throughput,
};
use squiggler::{
    affine_map, affine_map2, from_flat_array, row_normalise_inplace, sequence_to_squiggle,
    Matrix, ModelWeights, SquiggleModel,
};

fn filled(nr: usize, nc: usize, scale: f32) -> Matrix {
    let values: Vec<f32> = (0..nr * nc).map(|i| ((i % 97) as f32 + 1.0) * scale).collect();
    from_flat_array(&values, nr, nc).unwrap()
}

/// Affine kernels over a range of sequence lengths
fn bench_affine(c: &mut Criterion) {
    let mut group = c.benchmark_group("affine");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    let hidden = 64;
    let w = filled(hidden, hidden, 1.0e-3);
    let b = filled(hidden, 1, 1.0e-2);

    for &columns in &[16usize, 256, 4096] {
        let x = filled(hidden, columns, 1.0e-2);
        group.throughput(Throughput::Elements((hidden * hidden * columns) as u64));

        group.bench_with_input(BenchmarkId::new("affine_map", columns), &columns, |bench, _| {
            let mut out = None;
            bench.iter(|| {
                out = Some(affine_map(black_box(&x), &w, &b, out.take()).unwrap());
            })
        });

        group.bench_with_input(BenchmarkId::new("affine_map2", columns), &columns, |bench, _| {
            let mut out = None;
            bench.iter(|| {
                out = Some(affine_map2(black_box(&x), &x, &w, &w, &b, out.take()).unwrap());
            })
        });
    }

    group.finish();
}

/// Masked column normalisation, including shapes with padding rows
fn bench_row_normalise(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_normalise");

    for &rows in &[3usize, 64, 1025] {
        let source = filled(rows, 512, 0.5);
        group.throughput(Throughput::Elements((rows * 512) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |bench, _| {
            let mut m = source.try_clone().unwrap();
            bench.iter(|| row_normalise_inplace(Some(black_box(&mut m))))
        });
    }

    group.finish();
}

/// End-to-end prediction with placeholder weights
fn bench_sequence_to_squiggle(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_to_squiggle");
    let model = SquiggleModel::from_weights(&ModelWeights::seeded(5, 32, 0).unwrap()).unwrap();

    for &length in &[100usize, 1_000, 10_000] {
        let sequence: Vec<u8> = (0..length).map(|i| b"ACGT"[(i * 7 + i / 3) % 4]).collect();
        group.throughput(Throughput::Elements(length as u64));
        group.bench_with_input(BenchmarkId::from_parameter(length), &sequence, |bench, seq| {
            bench.iter(|| black_box(sequence_to_squiggle(&model, black_box(seq), true).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_affine, bench_row_normalise, bench_sequence_to_squiggle);
criterion_main!(benches);
