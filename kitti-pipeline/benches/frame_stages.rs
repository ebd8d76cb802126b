use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kitti_core::{AttributeRecord, FrameKey, LabelRecord, Point, PointRecord};
use kitti_pipeline::{FrameFilter, FrameMerger, IntensityInjector, SensorContribution};

fn sensor_stream(n: usize) -> (PointRecord, LabelRecord) {
    let points = (0..n)
        .map(|i| Point::new(i as f32 * 0.01, i as f32 * 0.02, 0.5, (i % 2) as f32))
        .collect();
    let labels = (0..n as u32).map(|i| i % 20).collect();
    (points, labels)
}

fn bench_filter_inject(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_inject");
    for size in [10_000, 120_000] {
        let (points, labels) = sensor_stream(size);
        let raw: AttributeRecord = (0..size).map(|i| (i % 300) as f64).collect();
        let filter = FrameFilter::new(1.0);
        let injector = IntensityInjector::default();

        group.bench_with_input(BenchmarkId::new("filter", size), &size, |b, _| {
            b.iter(|| filter.filter(&points, &labels))
        });
        group.bench_with_input(BenchmarkId::new("filter+inject", size), &size, |b, _| {
            b.iter(|| {
                let filtered = filter.filter(&points, &labels)?;
                injector.inject_selected(&filtered.points, &raw, &filtered.selection)
            })
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let key = FrameKey::new("00".parse().unwrap(), "000".parse().unwrap());
    let (points, labels) = sensor_stream(60_000);
    let merger = FrameMerger::new();

    c.bench_function("merge_three_sensors", |b| {
        b.iter(|| {
            let contributions = ["lidar0", "lidar1", "lidar2"]
                .iter()
                .map(|name| SensorContribution::present(*name, points.clone(), labels.clone()))
                .collect();
            merger.merge(&key, contributions)
        })
    });
}

criterion_group!(benches, bench_filter_inject, bench_merge);
criterion_main!(benches);
