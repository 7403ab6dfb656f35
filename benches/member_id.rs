//! Benchmark for IOMMU group member identifier parsing
//!
//! Groups are rescanned on every attach, so parsing stays on the hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use vfio_classifier::hardware::classification::{ClassCode, MemberId};

fn bench_parse_members(c: &mut Criterion) {
    let mut group = c.benchmark_group("member_id");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_pci_address", |b| {
        b.iter(|| MemberId::parse(black_box("0000:03:00.0")));
    });

    group.bench_function("parse_mdev_uuid", |b| {
        b.iter(|| MemberId::parse(black_box("83b8f4f2-509f-382f-3c1e-e6bfe0fa1001")));
    });

    group.bench_function("parse_unknown", |b| {
        b.iter(|| MemberId::parse(black_box("bogus")));
    });

    group.finish();
}

fn bench_class_code(c: &mut Criterion) {
    let mut group = c.benchmark_group("class_code");
    group.throughput(Throughput::Elements(1));

    group.bench_function("first_line_prefix", |b| {
        b.iter(|| ClassCode::from_sysfs(black_box("0x030000\n")).has_prefix(black_box("0x03")));
    });

    group.finish();
}

criterion_group!(benches, bench_parse_members, bench_class_code);
criterion_main!(benches);
