//! End-to-end facade tests: assignment, scoring, persistence, recovery.

use std::fs;
use std::sync::Arc;
use std::thread;

use splitest::{
    Experiment, JsonFileStore, MemoryStore, SplitTester, TestStatus, VisitorIdentity,
};

const BROWSER: Option<&str> = Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0");

fn visitor_with_id(id: i64) -> VisitorIdentity {
    VisitorIdentity::decode(&format!("ID={id}|Tests=|Conversions="))
}

// ============================================================================
// Experiment lifecycle
// ============================================================================

#[test]
fn test_get_or_create_returns_the_same_experiment() {
    let tester = SplitTester::new(MemoryStore::new());

    let created = tester
        .get_or_create_experiment("signup", &["green", "red"])
        .expect("create");
    let fetched = tester
        .get_or_create_experiment("signup", &["does", "not", "matter"])
        .expect("fetch");

    assert_eq!(created, fetched);
    assert_eq!(created.status(), TestStatus::Running);
    assert_eq!(fetched.arm_count(), 2);
}

#[test]
fn test_blank_arm_names_are_synthesized() {
    let tester = SplitTester::new(MemoryStore::new());

    let experiment = tester
        .get_or_create_experiment("exp", &["hero image", "", "  "])
        .expect("create");

    let contents: Vec<&str> = experiment
        .alternatives()
        .iter()
        .map(splitest::Alternative::content)
        .collect();
    assert_eq!(contents, ["hero image", "Alternative 2", "Alternative 3"]);
}

#[test]
fn test_bare_count_synthesizes_all_names() {
    let tester = SplitTester::new(MemoryStore::new());

    let experiment = tester
        .get_or_create_with_count("exp", 3)
        .expect("create");

    let contents: Vec<&str> = experiment
        .alternatives()
        .iter()
        .map(splitest::Alternative::content)
        .collect();
    assert_eq!(
        contents,
        ["Alternative 1", "Alternative 2", "Alternative 3"]
    );
}

#[test]
fn test_delete_experiment_reports_removal() {
    let tester = SplitTester::new(MemoryStore::new());
    tester
        .get_or_create_experiment("exp", &["a", "b"])
        .expect("create");

    assert!(tester.delete_experiment("exp"));
    assert!(!tester.delete_experiment("exp"));
    assert!(tester.experiment("exp").is_none());
}

// ============================================================================
// Assignment and participation
// ============================================================================

#[test]
fn test_participation_scored_once_per_visitor() {
    let tester = SplitTester::new(MemoryStore::new());
    let experiment = tester
        .get_or_create_experiment("exp", &["a", "b"])
        .expect("create");

    let mut visitor = visitor_with_id(42);
    let first = tester
        .pick_alternative(&experiment, &mut visitor, BROWSER)
        .expect("pick");
    assert_eq!(first.participants(), 1);
    assert!(visitor.is_dirty());

    // repeated requests change nothing
    for _ in 0..5 {
        let snapshot = tester.experiment("exp").expect("exists");
        tester
            .pick_alternative(&snapshot, &mut visitor, BROWSER)
            .expect("pick");
    }

    let after = tester.experiment("exp").expect("exists");
    assert_eq!(after.participants(), 1);
    assert_eq!(after.alternatives()[42 % 2].participants(), 1);
}

#[test]
fn test_assignment_is_stable_per_visitor() {
    let tester = SplitTester::new(MemoryStore::new());
    let experiment = tester
        .get_or_create_experiment("exp", &["a", "b", "c"])
        .expect("create");

    let mut visitor = visitor_with_id(482_913);
    let first = tester
        .pick_alternative(&experiment, &mut visitor, BROWSER)
        .expect("pick");

    for _ in 0..10 {
        let again = tester
            .pick_alternative(&experiment, &mut visitor, BROWSER)
            .expect("pick");
        assert_eq!(again.content(), first.content());
    }
}

#[test]
fn test_bots_are_served_but_never_scored() {
    let tester = SplitTester::new(MemoryStore::new());
    let experiment = tester
        .get_or_create_experiment("exp", &["a", "b"])
        .expect("create");

    let mut crawler = visitor_with_id(7);
    let arm = tester
        .pick_alternative(&experiment, &mut crawler, Some("Googlebot/2.1"))
        .expect("pick");
    assert_eq!(arm.participants(), 0);
    assert!(!crawler.is_dirty());

    let mut headless = visitor_with_id(8);
    tester
        .pick_alternative(&experiment, &mut headless, None)
        .expect("pick");

    assert_eq!(tester.experiment("exp").expect("exists").participants(), 0);
}

#[test]
fn test_completed_experiment_locks_in_the_winner() {
    // seed a completed experiment (>= 200 total conversions) through the
    // same JSON the registry persists
    let store = MemoryStore::new();
    let completed: Experiment = serde_json::from_value(serde_json::json!({
        "name": "done",
        "created_at": "2026-01-01T00:00:00Z",
        "alternatives": [
            {"content": "winner", "participants": 500, "conversions": 150},
            {"content": "loser", "participants": 500, "conversions": 60},
        ]
    }))
    .expect("decode");
    let mut map = std::collections::HashMap::new();
    map.insert("done".to_string(), completed);
    splitest::RegistryStore::save(&store, &map).expect("seed");

    let tester = SplitTester::new(store);
    let experiment = tester.experiment("done").expect("seeded");
    assert!(experiment.is_complete());

    // visitor 1 would hash to the losing arm, but the winner is locked in
    let mut visitor = visitor_with_id(1);
    let arm = tester
        .pick_alternative(&experiment, &mut visitor, BROWSER)
        .expect("pick");
    assert_eq!(arm.content(), "winner");
    assert!(!visitor.is_dirty());

    let untouched = tester.experiment("done").expect("exists");
    assert_eq!(untouched.participants(), 1000);
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_conversion_scored_once_and_only_for_participants() {
    let tester = SplitTester::new(MemoryStore::new());
    let experiment = tester
        .get_or_create_experiment("exp", &["a", "b"])
        .expect("create");

    // an outsider who never saw the experiment
    let mut outsider = visitor_with_id(99);
    tester.score_conversion("exp", &mut outsider);
    assert_eq!(tester.experiment("exp").expect("exists").conversions(), 0);
    assert!(!outsider.is_dirty());

    // a participant converts exactly once
    let mut visitor = visitor_with_id(10);
    tester
        .pick_alternative(&experiment, &mut visitor, BROWSER)
        .expect("pick");
    for _ in 0..4 {
        tester.score_conversion("exp", &mut visitor);
    }

    let after = tester.experiment("exp").expect("exists");
    assert_eq!(after.conversions(), 1);
    assert_eq!(after.alternatives()[10 % 2].conversions(), 1);
    assert!(visitor.has_converted("exp"));
}

#[test]
fn test_conversion_lands_on_the_assigned_arm() {
    let tester = SplitTester::new(MemoryStore::new());
    let experiment = tester
        .get_or_create_experiment("exp", &["a", "b", "c"])
        .expect("create");

    let mut visitor = visitor_with_id(5); // 5 mod 3 = arm 2
    tester
        .pick_alternative(&experiment, &mut visitor, BROWSER)
        .expect("pick");
    tester.score_conversion("exp", &mut visitor);

    let after = tester.experiment("exp").expect("exists");
    assert_eq!(after.alternatives()[2].participants(), 1);
    assert_eq!(after.alternatives()[2].conversions(), 1);
    assert_eq!(after.alternatives()[0].conversions(), 0);
    assert_eq!(after.alternatives()[1].conversions(), 0);
}

#[test]
fn test_conversion_for_unknown_experiment_is_a_noop() {
    let tester = SplitTester::new(MemoryStore::new());
    let mut visitor = visitor_with_id(1);
    visitor.mark_seen("ghost");
    tester.score_conversion("ghost", &mut visitor);
    assert!(!visitor.has_converted("ghost"));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_registry_round_trips_through_the_file_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("experiments.json");

    let mut visitor = visitor_with_id(4);
    let created_at;
    {
        let tester = SplitTester::new(JsonFileStore::new(&path));
        let experiment = tester
            .get_or_create_experiment("exp", &["a", "b"])
            .expect("create");
        created_at = experiment.created_at();
        tester
            .pick_alternative(&experiment, &mut visitor, BROWSER)
            .expect("pick");
        tester.score_conversion("exp", &mut visitor);
    }

    // a fresh process over the same file sees identical state
    let tester = SplitTester::new(JsonFileStore::new(&path));
    let reloaded = tester.experiment("exp").expect("persisted");
    assert_eq!(reloaded.created_at(), created_at);
    assert_eq!(reloaded.alternatives()[0].content(), "a");
    assert_eq!(reloaded.alternatives()[4 % 2].participants(), 1);
    assert_eq!(reloaded.alternatives()[4 % 2].conversions(), 1);
}

#[test]
fn test_corrupt_registry_file_fails_open_and_self_heals() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("experiments.json");
    fs::write(&path, "<<< definitely not json >>>").expect("corrupt");

    let tester = SplitTester::new(JsonFileStore::new(&path));
    assert!(tester.experiments().is_empty());

    // the store was immediately rewritten as a valid empty registry
    let healed = fs::read_to_string(&path).expect("read");
    let parsed: std::collections::HashMap<String, Experiment> =
        serde_json::from_str(&healed).expect("healed JSON");
    assert!(parsed.is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_create_and_score_stays_consistent() {
    let tester = Arc::new(SplitTester::new(MemoryStore::new()));

    let handles: Vec<_> = (0..16_i64)
        .map(|i| {
            let tester = Arc::clone(&tester);
            thread::spawn(move || {
                let experiment = tester
                    .get_or_create_experiment("race", &["a", "b"])
                    .expect("create or fetch");
                let mut visitor = visitor_with_id(i);
                tester
                    .pick_alternative(&experiment, &mut visitor, BROWSER)
                    .expect("pick");
                tester.score_conversion("race", &mut visitor);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }

    let experiments = tester.experiments();
    assert_eq!(experiments.len(), 1);

    // 16 distinct visitors: every participation and conversion landed once
    let race = &experiments[0];
    assert_eq!(race.participants(), 16);
    assert_eq!(race.conversions(), 16);
    assert_eq!(race.alternatives()[0].participants(), 8);
    assert_eq!(race.alternatives()[1].participants(), 8);
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_reporting_surface() {
    let tester = SplitTester::new(MemoryStore::new());
    tester
        .get_or_create_experiment("exp", &["a", "b"])
        .expect("create");

    let experiment = tester.experiment("exp").expect("exists");
    assert_eq!(experiment.significance_test_name(), "Two-proportion z-test");
    assert_eq!(experiment.assumptions_to_check().len(), 4);
    // no participants yet: the description reports the precondition
    assert!(experiment
        .result_description()
        .contains("lacks participants"));
}
