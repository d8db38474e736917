//! Protocol encoding/decoding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pinlink_protocol::{FrameAssembler, Packet, PACKET_SIZE};

fn bench_packet_encode(c: &mut Criterion) {
    let packet = Packet::outputs(0b11);

    c.bench_function("packet_encode", |b| {
        b.iter(|| black_box(black_box(&packet).encode()));
    });
}

fn bench_packet_decode(c: &mut Criterion) {
    let encoded = Packet::outputs(0b11).encode();

    c.bench_function("packet_decode", |b| {
        b.iter(|| black_box(Packet::decode(black_box(&encoded)).unwrap()));
    });
}

fn bench_assembler_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembler_drain");

    for count in [10usize, 100, 1000] {
        let mut stream = Vec::with_capacity(count * PACKET_SIZE);
        for i in 0..count {
            stream.extend_from_slice(&Packet::outputs(i as u32).encode());
        }

        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &stream, |b, stream| {
            b.iter(|| {
                let mut assembler = FrameAssembler::new();
                assembler.feed(stream);
                let mut extracted = 0;
                while let Ok(Some(_)) = assembler.try_extract() {
                    extracted += 1;
                }
                black_box(extracted)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_packet_encode,
    bench_packet_decode,
    bench_assembler_drain
);
criterion_main!(benches);
