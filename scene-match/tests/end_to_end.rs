mod common;

use std::sync::Arc;
use std::thread;

use common::synthetic::{scene, write_abc, write_jpeg, write_query_from};
use common::{init_logging, scratch_dir};
use scene_match::{
    CancellationToken, ImageMatcher, MatchError, MatcherConfig, SourceError, VerificationStrategy,
};

fn trained(tag: &str) -> (ImageMatcher, std::path::PathBuf) {
    init_logging();
    let root = scratch_dir(tag);
    let train_dir = root.join("train");
    std::fs::create_dir(&train_dir).unwrap();
    let b = write_abc(&train_dir);
    write_query_from(&root, &b);

    let matcher = ImageMatcher::new(MatcherConfig::default()).unwrap();
    assert_eq!(matcher.train(&train_dir).unwrap(), 3);
    (matcher, root)
}

#[test]
fn noisy_crop_finds_its_source() {
    let (matcher, root) = trained("crop");
    let report = matcher.find_best_match(root.join("query.jpg")).unwrap();

    assert_eq!(report.name, "b.jpg");
    assert_eq!(report.index, 1);
    assert!(report.confidence > 0.0, "{:?}", report);
    assert_eq!(report.scores.len(), 3);
}

#[test]
fn reported_name_is_always_a_trained_name() {
    let (matcher, root) = trained("names");
    let index = matcher.index().unwrap();
    let names: Vec<&str> = index.names().collect();
    assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);

    let unrelated = root.join("unrelated.jpg");
    write_jpeg(&unrelated, &scene(999));
    for query in [root.join("query.jpg"), unrelated] {
        let report = matcher.find_best_match(&query).unwrap();
        assert!(names.contains(&report.name.as_str()));
    }
}

#[test]
fn identical_image_matches_itself() {
    let (matcher, root) = trained("self");
    let report = matcher.find_best_match(root.join("train").join("c.jpg")).unwrap();

    assert_eq!(report.name, "c.jpg");
    assert_eq!(report.support, 0.0);
    assert!(report.scores.iter().all(|&s| s >= report.support));
    assert!(report.confidence > 0.0);
}

#[test]
fn repeated_queries_are_identical() {
    let (matcher, root) = trained("idempotent");
    let query = root.join("query.jpg");
    let first = matcher.find_best_match(&query).unwrap();
    let second = matcher.find_best_match(&query).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_strategy_finds_the_self_match() {
    init_logging();
    let root = scratch_dir("strategies");
    write_abc(&root);
    for strategy in [
        VerificationStrategy::NearestNeighbor,
        VerificationStrategy::CrossCheck,
        VerificationStrategy::CrossCheckHomography,
    ] {
        let matcher = ImageMatcher::builder().strategy(strategy).build().unwrap();
        matcher.train(&root).unwrap();
        let report = matcher.find_best_match(root.join("a.jpg")).unwrap();
        assert_eq!(report.name, "a.jpg", "{}", strategy);
    }
}

#[test]
fn empty_training_directory() {
    init_logging();
    let dir = scratch_dir("empty");
    let matcher = ImageMatcher::new(MatcherConfig::default()).unwrap();

    assert_eq!(matcher.train(&dir).unwrap(), 0);
    let query = dir.join("q.jpg");
    write_jpeg(&query, &scene(1));
    assert!(matches!(matcher.find_best_match(&query), Err(MatchError::EmptyIndex)));
}

#[test]
fn missing_query_is_not_found() {
    let (matcher, root) = trained("missing");
    let result = matcher.find_best_match(root.join("does-not-exist.jpg"));
    assert!(matches!(result, Err(MatchError::Source(SourceError::NotFound(_)))));
}

#[test]
fn missing_training_directory() {
    init_logging();
    let root = scratch_dir("no-train");
    let matcher = ImageMatcher::new(MatcherConfig::default()).unwrap();
    assert!(matches!(
        matcher.train(root.join("absent")),
        Err(MatchError::Configuration(SourceError::NotFound(_)))
    ));
    assert!(!matcher.is_trained());
}

#[test]
fn retraining_discards_previous_entries() {
    let (matcher, root) = trained("retrain");
    let second = root.join("second");
    std::fs::create_dir(&second).unwrap();
    write_jpeg(&second.join("x.jpg"), &scene(404));
    write_jpeg(&second.join("y.jpg"), &scene(505));

    assert_eq!(matcher.train(&second).unwrap(), 2);
    let report = matcher.find_best_match(root.join("query.jpg")).unwrap();
    assert!(report.name == "x.jpg" || report.name == "y.jpg");
    assert_eq!(report.scores.len(), 2);
    assert_eq!(report.generation, 2);
}

#[test]
fn concurrent_queries_during_retrain_see_whole_indexes() {
    let (matcher, root) = trained("concurrent");
    let matcher = Arc::new(matcher);
    let second = root.join("second");
    std::fs::create_dir(&second).unwrap();
    write_jpeg(&second.join("z.jpg"), &scene(606));

    let query = root.join("query.jpg");
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let matcher = Arc::clone(&matcher);
            let query = query.clone();
            thread::spawn(move || matcher.find_best_match(&query).unwrap())
        })
        .collect();
    matcher.train(&second).unwrap();

    for reader in readers {
        let report = reader.join().unwrap();
        match report.generation {
            1 => assert_eq!(report.scores.len(), 3),
            2 => assert_eq!(report.name, "z.jpg"),
            g => panic!("unexpected generation {}", g),
        }
    }
}

#[test]
fn query_directory_reports_each_image() {
    let (matcher, root) = trained("batch");
    let queries = root.join("queries");
    std::fs::create_dir(&queries).unwrap();
    std::fs::copy(root.join("query.jpg"), queries.join("1.jpg")).unwrap();
    std::fs::copy(root.join("train").join("a.jpg"), queries.join("2.jpg")).unwrap();
    std::fs::write(queries.join("3.jpg"), b"corrupt").unwrap();

    let results = matcher.find_best_matches(&queries).unwrap();
    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["1.jpg", "2.jpg", "3.jpg"]);
    assert_eq!(results[0].1.as_ref().unwrap().name, "b.jpg");
    assert_eq!(results[1].1.as_ref().unwrap().name, "a.jpg");
    assert!(matches!(results[2].1, Err(MatchError::Source(SourceError::Unreadable { .. }))));
}

#[test]
fn cancelled_before_start() {
    let (matcher, root) = trained("cancel");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = matcher.find_best_match_with_cancel(root.join("query.jpg"), &cancel);
    assert!(matches!(result, Err(MatchError::Cancelled)));
}
