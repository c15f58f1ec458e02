//! Benchmarks for face bitmap encoding.
//!
//! Run with: cargo bench -p facefinder-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facefinder_core::bitmap::Bitmap;
use facefinder_core::encoding::{encode, ByteOrder, EncodingBuffer, Precision};
use image::DynamicImage;
use rand::Rng;

fn random_pixels(side: u32) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    (0..side * side).map(|_| rng.gen::<u32>() | 0xFF00_0000).collect()
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for side in [112u32, 160] {
        let pixels = random_pixels(side);

        let mut quantized = EncodingBuffer::new(side, Precision::Quantized, ByteOrder::Native);
        group.bench_with_input(BenchmarkId::new("quantized", side), &pixels, |b, pixels| {
            b.iter(|| encode(&mut quantized, black_box(pixels)))
        });

        let mut float = EncodingBuffer::new(side, Precision::Float, ByteOrder::Native);
        group.bench_with_input(BenchmarkId::new("float", side), &pixels, |b, pixels| {
            b.iter(|| encode(&mut float, black_box(pixels)))
        });

        let mut big_endian = EncodingBuffer::new(side, Precision::Float, ByteOrder::Big);
        group.bench_with_input(BenchmarkId::new("float_be", side), &pixels, |b, pixels| {
            b.iter(|| encode(&mut big_endian, black_box(pixels)))
        });
    }

    group.finish();
}

fn benchmark_bitmap_resize(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(640, 480);

    c.bench_function("bitmap_from_image_resized_112", |b| {
        b.iter(|| Bitmap::from_image_resized(black_box(&img), 112))
    });
}

criterion_group!(benches, benchmark_encode, benchmark_bitmap_resize);
criterion_main!(benches);
