//! 코덱/분할 벤치마크
//!
//! cargo bench --bench codec

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use rfb::{Block, BlockCodec, BlockSet, Collector, WireConfig};

fn bench_codec(c: &mut Criterion) {
    let wire = WireConfig::default();
    let codec = BlockCodec::new(wire);
    let block = Block::new(17, Bytes::from(vec![0xA5u8; wire.block_size]), true);
    let encoded = codec.encode(&block);

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("encode", |b| b.iter(|| codec.encode(black_box(&block))));
    group.bench_function("decode", |b| b.iter(|| codec.decode(black_box(&encoded))));
    group.finish();
}

fn bench_partition_and_collect(c: &mut Criterion) {
    let wire = WireConfig::default();
    let data = Bytes::from(vec![0x3Cu8; 4 * 1024 * 1024]);
    let codec = BlockCodec::new(wire);
    let set = BlockSet::partition(data.clone(), &wire).unwrap();
    let round: Vec<Bytes> = set.round().map(|b| codec.encode(b)).collect();

    let mut group = c.benchmark_group("file");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(20);
    group.bench_function("partition_4mb", |b| {
        b.iter(|| BlockSet::partition(black_box(data.clone()), &wire))
    });
    group.bench_function("collect_4mb", |b| {
        b.iter(|| {
            let mut collector = Collector::new(wire);
            for datagram in round.iter().rev() {
                let _ = collector.handle_datagram(datagram);
            }
            collector.reassemble()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_codec, bench_partition_and_collect);
criterion_main!(benches);
