// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Benchmarks for the marshaling hot paths.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use openvinojs_core::{marshal, Heap, LinearMemory, Precision, Shape, Tensor, TensorData};
use std::hint::black_box;

const IMAGE_DIMS: [u32; 4] = [1, 3, 224, 224];

fn image_values() -> Vec<f64> {
    (0..150_528u32).map(|i| f64::from(i % 256)).collect()
}

fn bench_heap() -> Heap {
    Heap::new(LinearMemory::new(4 * 1024 * 1024, 64 * 1024 * 1024))
}

/// Tensor construction from plain JS numbers, per precision.
fn bench_tensor_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("tensor_construction");
    let values = image_values();
    group.throughput(Throughput::Elements(values.len() as u64));

    for precision in [Precision::Uint8, Precision::Uint8Clamped, Precision::Float32] {
        group.bench_with_input(
            BenchmarkId::from_parameter(precision),
            &precision,
            |b, &precision| {
                b.iter(|| {
                    let tensor = Tensor::new(precision, black_box(&values), IMAGE_DIMS).unwrap();
                    black_box(tensor)
                })
            },
        );
    }

    group.finish();
}

/// Copy into native memory and release.
fn bench_tensor_to_native(c: &mut Criterion) {
    let mut group = c.benchmark_group("tensor_to_native");
    let values = image_values();
    let heap = bench_heap();

    for precision in [Precision::Uint8, Precision::Float32, Precision::Float64] {
        let tensor = Tensor::new(precision, &values, IMAGE_DIMS).unwrap();
        group.throughput(Throughput::Bytes(tensor.byte_len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(precision),
            &tensor,
            |b, tensor| {
                b.iter(|| {
                    let handle = marshal::tensor_to_native(&heap, black_box(tensor)).unwrap();
                    handle.release().unwrap();
                })
            },
        );
    }

    group.finish();
}

/// Read a native tensor back.
fn bench_native_to_tensor(c: &mut Criterion) {
    let mut group = c.benchmark_group("native_to_tensor");
    let heap = bench_heap();
    let tensor = Tensor::new(Precision::Float32, &image_values(), IMAGE_DIMS).unwrap();
    let handle = marshal::tensor_to_native(&heap, &tensor).unwrap();

    group.throughput(Throughput::Bytes(tensor.byte_len() as u64));
    group.bench_function("float32_image", |b| {
        b.iter(|| {
            let copy = marshal::native_to_tensor(&heap, black_box(handle.native())).unwrap();
            black_box(copy)
        })
    });

    group.finish();
    handle.release().unwrap();
}

/// Shape marshaling and typed buffer conversion.
fn bench_small_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("small_ops");
    let heap = bench_heap();
    let shape = Shape::from_dims(&IMAGE_DIMS);

    group.bench_function("shape_round_trip", |b| {
        b.iter(|| {
            let handle = marshal::shape_to_native(&heap, black_box(&shape)).unwrap();
            let copy = marshal::native_to_shape(&heap, handle.native()).unwrap();
            handle.release().unwrap();
            black_box(copy)
        })
    });

    let data = TensorData::from_numbers(Precision::Float32.array_kind(), &image_values());
    group.bench_function("convert_f32_to_u8", |b| {
        b.iter(|| black_box(data.convert(Precision::Uint8.array_kind())))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tensor_construction,
    bench_tensor_to_native,
    bench_native_to_tensor,
    bench_small_ops,
);
criterion_main!(benches);
