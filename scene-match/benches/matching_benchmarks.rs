use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_match::{
    cross_validate, BruteForceMatcher, CancellationToken, CorrespondenceFinder, FeatureExtractor,
    GeometricVerifier, Image, ImageMatcher, MatcherConfig, MemorySource, OrbExtractor, VerificationStrategy,
};

/// Overlapping rectangles of random shade
fn create_benchmark_scene(width: u32, height: u32, seed: u64) -> Image {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = Image::from_pixel(width, height, image::Luma([128]));
    for _ in 0..(width * height / 150) {
        let w = rng.gen_range(5..=48);
        let h = rng.gen_range(5..=40);
        let x = rng.gen_range(-10..width as i32);
        let y = rng.gen_range(-10..height as i32);
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), image::Luma([rng.gen()]));
    }
    img
}

fn bench_extraction(c: &mut Criterion) {
    let extractor = OrbExtractor::new(MatcherConfig::default().orb).unwrap();
    let mut group = c.benchmark_group("extraction");
    for &(w, h) in &[(160u32, 120u32), (320, 240), (640, 480)] {
        let img = create_benchmark_scene(w, h, 1);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", w, h)), &img, |b, img| {
            b.iter(|| extractor.extract(black_box(img)))
        });
    }
    group.finish();
}

fn bench_correspondences(c: &mut Criterion) {
    let extractor = OrbExtractor::new(MatcherConfig::default().orb).unwrap();
    let query = extractor.extract(&create_benchmark_scene(320, 240, 2)).unwrap();
    let reference = extractor.extract(&create_benchmark_scene(320, 240, 3)).unwrap();

    c.bench_function("nearest_neighbors", |b| {
        b.iter(|| BruteForceMatcher.nearest_neighbors(black_box(&query), black_box(&reference)))
    });
    c.bench_function("cross_validate", |b| {
        b.iter(|| cross_validate(&BruteForceMatcher, black_box(&query), black_box(&reference)))
    });
}

fn bench_verification(c: &mut Criterion) {
    let extractor = OrbExtractor::new(MatcherConfig::default().orb).unwrap();
    let scene = create_benchmark_scene(320, 240, 4);
    let crop = image::imageops::crop_imm(&scene, 16, 16, 256, 192).to_image();
    let query = extractor.extract(&crop).unwrap();
    let same = extractor.extract(&scene).unwrap();
    let other = extractor.extract(&create_benchmark_scene(320, 240, 5)).unwrap();

    let mut group = c.benchmark_group("verification");
    for strategy in [
        VerificationStrategy::NearestNeighbor,
        VerificationStrategy::CrossCheck,
        VerificationStrategy::CrossCheckHomography,
    ] {
        let verifier = GeometricVerifier::new(&MatcherConfig { strategy, ..MatcherConfig::default() });
        group.bench_function(BenchmarkId::new(strategy.to_string(), "same_scene"), |b| {
            b.iter(|| verifier.verify(black_box(&query), black_box(&same)))
        });
        group.bench_function(BenchmarkId::new(strategy.to_string(), "other_scene"), |b| {
            b.iter(|| verifier.verify(black_box(&query), black_box(&other)))
        });
    }
    group.finish();
}

fn bench_ranking(c: &mut Criterion) {
    let mut source = MemorySource::new();
    for i in 0..8u64 {
        source = source.with_image(&format!("{}.jpg", i), create_benchmark_scene(240, 180, 10 + i));
    }
    let query = create_benchmark_scene(240, 180, 13);
    let extractor = OrbExtractor::new(MatcherConfig::default().orb).unwrap();
    let features = extractor.extract(&query).unwrap();

    let mut group = c.benchmark_group("ranking");
    group.sample_size(20);
    for parallel in [false, true] {
        let matcher = ImageMatcher::builder().parallel(parallel).build().unwrap();
        matcher.train_from(&source).unwrap();
        let cancel = CancellationToken::new();
        group.bench_function(BenchmarkId::new("8_entries", if parallel { "parallel" } else { "serial" }), |b| {
            b.iter(|| matcher.match_features(black_box(&features), &cancel))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_extraction,
    bench_correspondences,
    bench_verification,
    bench_ranking
);
criterion_main!(benches);
