use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sigfil_core::{
    apply_delay_correction, combine_channels, combine_samples, decode, encode, Dims, SampleMatrix,
};
use sigfil_types::{BitDepth, HeaderDictionary};

/// Типичный блок наблюдения: 1024 канала, 64 мкс.
fn header(dims: Dims) -> HeaderDictionary {
    let mut h = HeaderDictionary::new();
    h.set_bit_depth(BitDepth::Bits32);
    h.set_n_samples(dims.n_samples);
    h.set_n_ifs(dims.n_ifs);
    h.set_n_channels(dims.n_channels);
    h.set_fch1(1500.0);
    h.set_foff(-0.25);
    h.set_tsamp(64e-6);
    h
}

fn noise(dims: Dims) -> SampleMatrix {
    let mut rng = StdRng::seed_from_u64(42);
    SampleMatrix::from_fn(dims, |_, _, _| rng.gen_range(0.0f32..255.0))
}

fn bench_decimation(c: &mut Criterion) {
    let dims = Dims::new(4096, 1, 1024);
    let h = header(dims);
    let m = noise(dims);

    let mut group = c.benchmark_group("decimation");
    group.throughput(Throughput::Elements(dims.len() as u64));

    for factor in [2usize, 16] {
        group.bench_with_input(BenchmarkId::new("combine_channels", factor), &factor, |b, &f| {
            b.iter(|| {
                let mut hdr = h.clone();
                black_box(combine_channels(black_box(&m), &mut hdr, f).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("combine_samples", factor), &factor, |b, &f| {
            b.iter(|| {
                let mut hdr = h.clone();
                black_box(combine_samples(black_box(&m), &mut hdr, f).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_dedispersion(c: &mut Criterion) {
    let dims = Dims::new(8192, 1, 256);
    let h = header(dims);
    let m = noise(dims);

    let mut group = c.benchmark_group("dedispersion");
    group.throughput(Throughput::Elements(dims.len() as u64));

    for dm in [0.0f64, 56.8] {
        group.bench_with_input(BenchmarkId::new("apply_delay_correction", dm), &dm, |b, &dm| {
            b.iter(|| black_box(apply_delay_correction(black_box(&m), &h, dm).unwrap()))
        });
    }

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let dims = Dims::new(2048, 1, 512);
    let m = noise(dims);

    let mut group = c.benchmark_group("codec");

    for depth in [BitDepth::Bits8, BitDepth::Bits32] {
        let mut h = header(dims);
        h.set_bit_depth(depth);
        let raw = encode(&h, &m, false).unwrap();

        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(BenchmarkId::new("decode", depth), &raw, |b, raw| {
            b.iter(|| black_box(decode(black_box(raw)).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("encode", depth), &h, |b, h| {
            b.iter(|| black_box(encode(h, black_box(&m), false).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decimation, bench_dedispersion, bench_codec);
criterion_main!(benches);
