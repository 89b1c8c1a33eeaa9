use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use redfin_geo_processor::models::{Crosswalk, CrosswalkEntry, GeographyLevel, InputReport, ZipRecord};
use redfin_geo_processor::processors::{Aggregator, GeoPipeline};
use redfin_geo_processor::utils::{percentile_ranks, weighted_median};
use redfin_geo_processor::PipelineConfig;

// Deterministic pseudo-random values so runs are comparable
fn lcg(seed: &mut u64) -> f64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (*seed >> 11) as f64 / (1u64 << 53) as f64
}

fn create_test_zip_data(zip_count: usize, zips_per_county: usize) -> (Vec<ZipRecord>, Crosswalk) {
    let mut seed = 42;
    let mut records = Vec::with_capacity(zip_count);
    let mut entries = Vec::with_capacity(zip_count);

    for i in 0..zip_count {
        let zip = format!("{:05}", 1000 + i);
        let county = 1000 + (i / zips_per_county) % 90_000;
        let county_fips = format!("{:05}", county);

        entries.push(CrosswalkEntry {
            zip: zip.clone(),
            state_fips: county_fips[..2].to_string(),
            county_fips,
            state_abbrev: None,
            state_name: Some("Bench State".to_string()),
            county_name: Some(format!("County {}", county)),
            cbsa_code: None,
            population: Some(500.0 + lcg(&mut seed) * 40_000.0),
        });

        let price = 50_000.0 + lcg(&mut seed).powi(3) * 3_000_000.0;
        records.push(
            ZipRecord::new(zip)
                .with_period("2024-06-30")
                .with_metric("MEDIAN_SALE_PRICE", Some(price))
                .with_metric("MEDIAN_SALE_PRICE_YOY", Some(lcg(&mut seed) * 0.4 - 0.2))
                .with_metric("HOMES_SOLD", Some((lcg(&mut seed) * 120.0).floor()))
                .with_metric("INVENTORY", Some((lcg(&mut seed) * 300.0).floor()))
                .with_metric("MEDIAN_DOM", Some(5.0 + lcg(&mut seed) * 200.0)),
        );
    }

    (records, Crosswalk::from_entries(entries))
}

fn benchmark_weighted_median(c: &mut Criterion) {
    let mut seed = 7;
    let values: Vec<Option<f64>> = (0..1_000).map(|_| Some(lcg(&mut seed) * 1e6)).collect();
    let weights: Vec<Option<f64>> = (0..1_000).map(|_| Some(1.0 + lcg(&mut seed) * 1e4)).collect();

    c.bench_function("weighted_median_1k", |b| {
        b.iter(|| black_box(weighted_median(black_box(&values), black_box(&weights))))
    });
}

fn benchmark_percentile_ranks(c: &mut Criterion) {
    let mut group = c.benchmark_group("percentile_ranks");

    for &size in &[1_000usize, 10_000, 30_000] {
        let mut seed = 11;
        // Rounded values produce plenty of ties
        let column: Vec<Option<f64>> = (0..size)
            .map(|i| (i % 17 != 0).then(|| (lcg(&mut seed) * 500.0).round()))
            .collect();

        group.bench_with_input(BenchmarkId::new("records", size), &column, |b, column| {
            b.iter(|| black_box(percentile_ranks(column).len()))
        });
    }

    group.finish();
}

fn benchmark_aggregation(c: &mut Criterion) {
    let (records, crosswalk) = create_test_zip_data(30_000, 10);
    let aggregator = Aggregator::new(
        PipelineConfig::default().aggregate_metrics,
    );

    c.bench_function("aggregate_county_30k_zips", |b| {
        b.iter(|| {
            let outcome = aggregator
                .aggregate(&records, &crosswalk, GeographyLevel::County)
                .map(|o| o.records.len())
                .unwrap_or(0);
            black_box(outcome)
        })
    });
}

fn benchmark_full_pipeline_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_by_size");
    let pipeline = GeoPipeline::new(PipelineConfig::default());

    for &size in &[1_000usize, 10_000] {
        let (records, crosswalk) = create_test_zip_data(size, 8);

        group.bench_with_input(BenchmarkId::new("zips", size), &size, |b, _| {
            b.iter(|| {
                let dataset = pipeline.aggregate_level(
                    &records,
                    &crosswalk,
                    GeographyLevel::County,
                    &InputReport::default(),
                );
                black_box(dataset.map(|d| d.records.len()).unwrap_or(0))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_weighted_median,
    benchmark_percentile_ranks,
    benchmark_aggregation,
    benchmark_full_pipeline_by_size
);
criterion_main!(benches);
