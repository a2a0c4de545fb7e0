//! End-to-end tests for full orchestrator passes
//!
//! Idempotence, reference gating, coercion, ordering and fault isolation.

mod common;

use common::{
    jamchart_payload, push_dimensions, setlist_payload, show_payload, song_payload,
    venue_payload, TestEnv,
    SETLIST_ENTRY_ID, SHOW_DATE, SHOW_ID, SONG_ID, SONG_NAME, VENUE_ID, VENUE_NAME,
};
use serde_json::json;
use setlist_curator::curated_store::{ErrorCategory, ErrorLog};
use setlist_curator::entities::spec_for;
use setlist_curator::raw_store::{RawRecordState, RawRecordStore};
use setlist_curator::resolver::EntityResolver;
use setlist_curator::transform::{EntityTransformer, TransformSettings};
use setlist_curator::upsert::{UpsertEngine, UpsertOutcome};
use setlist_curator::EntityKind;

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_second_pass_changes_nothing() {
    let env = TestEnv::new();
    push_dimensions(&env);
    env.push(
        EntityKind::SetlistEntry,
        setlist_payload(SETLIST_ENTRY_ID, SHOW_ID, SONG_ID, 1),
    );

    let first = env.run_pass();
    assert_eq!(first.total_succeeded, 4);
    let rows_before = env.row(EntityKind::SetlistEntry, SETLIST_ENTRY_ID).unwrap();

    let second = env.run_pass();
    assert_eq!(second.total_attempted, 0);
    assert_eq!(
        env.row(EntityKind::SetlistEntry, SETLIST_ENTRY_ID).unwrap(),
        rows_before
    );
}

#[test]
fn test_replaying_a_processed_record_is_a_no_op() {
    let env = TestEnv::new();
    let raw_id = env.push(EntityKind::Venue, venue_payload(VENUE_ID, VENUE_NAME));
    env.run_pass();
    let before = env.row(EntityKind::Venue, VENUE_ID).unwrap();

    let raw = env.raw_store.get_raw_record(raw_id).unwrap().unwrap();
    assert!(raw.is_processed);
    let spec = spec_for(EntityKind::Venue);
    let resolver = EntityResolver::new(env.curated_store.clone());
    let record = EntityTransformer::new(spec)
        .build_record(&raw, &resolver)
        .unwrap();
    let outcome = UpsertEngine::new(env.curated_store.clone(), spec)
        .upsert(&record)
        .unwrap();

    assert!(matches!(outcome, UpsertOutcome::Unchanged(_)));
    assert_eq!(env.row(EntityKind::Venue, VENUE_ID).unwrap(), before);
}

// =============================================================================
// Reference gating
// =============================================================================

#[test]
fn test_missing_required_reference_skips_until_dependency_arrives() {
    let env = TestEnv::new();
    env.push(EntityKind::Song, song_payload(SONG_ID, SONG_NAME));
    env.push(
        EntityKind::SetlistEntry,
        setlist_payload(SETLIST_ENTRY_ID, SHOW_ID, SONG_ID, 1),
    );

    let report = env.run_pass();
    assert_eq!(report.total_skipped, 1);
    assert_eq!(env.count(EntityKind::SetlistEntry), 0);
    assert_eq!(env.unprocessed(EntityKind::SetlistEntry), 1);
    assert_eq!(
        env.curated_store
            .count_errors(
                EntityKind::SetlistEntry,
                Some(ErrorCategory::MissingReference)
            )
            .unwrap(),
        1
    );

    env.push(EntityKind::Show, show_payload(SHOW_ID, SHOW_DATE, VENUE_ID));
    let report = env.run_pass();
    assert_eq!(report.total_skipped, 0);
    assert_eq!(env.count(EntityKind::SetlistEntry), 1);
    assert_eq!(env.unprocessed(EntityKind::SetlistEntry), 0);
}

#[test]
fn test_unresolved_optional_reference_is_null_and_not_logged() {
    let env = TestEnv::new();
    env.push(
        EntityKind::Show,
        show_payload(SHOW_ID, SHOW_DATE, "no-such-venue"),
    );

    let report = env.run_pass();
    assert_eq!(report.total_succeeded, 1);
    let show = env.row(EntityKind::Show, SHOW_ID).unwrap();
    assert!(show["venue_id"].is_null());
    assert_eq!(env.curated_store.count_errors(EntityKind::Show, None).unwrap(), 0);
}

#[test]
fn test_dangling_show_id_is_not_bound_by_date() {
    let env = TestEnv::new();
    push_dimensions(&env);
    env.run_pass();

    // Same date as the existing show, but an upstream id nobody has seen.
    let raw_id = env.push(
        EntityKind::SetlistEntry,
        setlist_payload(SETLIST_ENTRY_ID, "9999", SONG_ID, 1),
    );
    let report = env.run_pass();

    assert_eq!(report.total_succeeded, 0);
    assert_eq!(report.total_skipped, 1);
    assert_eq!(env.count(EntityKind::SetlistEntry), 0);
    let raw = env.raw_store.get_raw_record(raw_id).unwrap().unwrap();
    assert_eq!(raw.state(), RawRecordState::Unprocessed);
    assert_eq!(
        env.curated_store
            .count_errors(
                EntityKind::SetlistEntry,
                Some(ErrorCategory::MissingReference)
            )
            .unwrap(),
        1
    );
}

#[test]
fn test_dangling_venue_id_is_not_rebound_by_name() {
    let env = TestEnv::new();
    env.push(EntityKind::Venue, venue_payload(VENUE_ID, VENUE_NAME));
    env.run_pass();

    // The payload also names the existing venue; the id still decides.
    let mut payload = show_payload(SHOW_ID, SHOW_DATE, "no-such-venue");
    payload["venuename"] = json!(VENUE_NAME);
    env.push(EntityKind::Show, payload);
    env.run_pass();

    let show = env.row(EntityKind::Show, SHOW_ID).unwrap();
    assert!(show["venue_id"].is_null());
}

#[test]
fn test_reference_falls_back_to_name() {
    let env = TestEnv::new();
    push_dimensions(&env);
    env.push(
        EntityKind::SetlistEntry,
        json!({
            "uniqueid": SETLIST_ENTRY_ID,
            "showid": SHOW_ID,
            "song": "tweezer",
            "set": "1",
            "position": 3,
        }),
    );

    env.run_pass();
    let entry = env.row(EntityKind::SetlistEntry, SETLIST_ENTRY_ID).unwrap();
    let song = env.row(EntityKind::Song, SONG_ID).unwrap();
    assert_eq!(entry["song_id"], song["id"]);
    assert_eq!(entry["set_name"], "Set 1");
}

// =============================================================================
// Identity
// =============================================================================

#[test]
fn test_distinct_ids_sharing_a_natural_key_are_both_kept() {
    let env = TestEnv::new();
    push_dimensions(&env);
    // The song was played twice in the show, each performance charted.
    env.push(
        EntityKind::JamAnnotation,
        jamchart_payload("j1", SHOW_ID, SONG_ID, "Opening jam"),
    );
    env.push(
        EntityKind::JamAnnotation,
        jamchart_payload("j2", SHOW_ID, SONG_ID, "Reprise jam"),
    );

    let report = env.run_pass();
    assert_eq!(report.total_failed, 0);
    assert_eq!(env.count(EntityKind::JamAnnotation), 2);
    let first = env.row(EntityKind::JamAnnotation, "j1").unwrap();
    let second = env.row(EntityKind::JamAnnotation, "j2").unwrap();
    assert_eq!(first["description"], "Opening jam");
    assert_eq!(second["description"], "Reprise jam");
    assert_eq!(first["show_id"], second["show_id"]);
}

#[test]
fn test_rows_without_upstream_id_converge_on_natural_key() {
    let env = TestEnv::new();
    push_dimensions(&env);
    for (received_at, description) in [(1_000, "Type I"), (2_000, "Type II")] {
        let mut payload = jamchart_payload("", SHOW_ID, SONG_ID, description);
        payload.as_object_mut().unwrap().remove("jamchartid");
        env.push_at(EntityKind::JamAnnotation, payload, received_at);
    }

    env.run_pass();
    assert_eq!(env.count(EntityKind::JamAnnotation), 1);
    assert_eq!(env.unprocessed(EntityKind::JamAnnotation), 0);
}

// =============================================================================
// Coercion
// =============================================================================

#[test]
fn test_unparseable_capacity_becomes_null() {
    let env = TestEnv::new();
    let mut payload = venue_payload(VENUE_ID, VENUE_NAME);
    payload["capacity"] = json!("unknown");
    env.push(EntityKind::Venue, payload);

    let report = env.run_pass();
    assert_eq!(report.total_succeeded, 1);
    let venue = env.row(EntityKind::Venue, VENUE_ID).unwrap();
    assert!(venue["capacity"].is_null());
    assert_eq!(venue["name"], VENUE_NAME);
}

#[test]
fn test_track_time_is_stored_in_seconds() {
    let env = TestEnv::new();
    push_dimensions(&env);
    env.push(
        EntityKind::SetlistEntry,
        setlist_payload(SETLIST_ENTRY_ID, SHOW_ID, SONG_ID, 1),
    );
    let mut blank = setlist_payload("900002", SHOW_ID, SONG_ID, 2);
    blank["tracktime"] = json!("abc");
    env.push(EntityKind::SetlistEntry, blank);

    env.run_pass();
    let entry = env.row(EntityKind::SetlistEntry, SETLIST_ENTRY_ID).unwrap();
    assert_eq!(entry["duration_secs"], 1325);
    assert_eq!(entry["is_jamchart"], 1);
    assert_eq!(entry["show_year"], 2023);
    let blank = env.row(EntityKind::SetlistEntry, "900002").unwrap();
    assert!(blank["duration_secs"].is_null());
}

// =============================================================================
// Ordering and fault isolation
// =============================================================================

#[test]
fn test_facts_resolve_dimensions_submitted_in_the_same_pass() {
    let env = TestEnv::new();
    // Dependent records first, dimensions last.
    env.push(
        EntityKind::SetlistEntry,
        setlist_payload(SETLIST_ENTRY_ID, SHOW_ID, SONG_ID, 1),
    );
    env.push(EntityKind::Show, show_payload(SHOW_ID, SHOW_DATE, VENUE_ID));
    env.push(EntityKind::Song, song_payload(SONG_ID, SONG_NAME));
    env.push(EntityKind::Venue, venue_payload(VENUE_ID, VENUE_NAME));

    let report = env.run_pass();
    assert_eq!(report.total_succeeded, 4);
    assert_eq!(report.total_skipped, 0);

    let venue = env.row(EntityKind::Venue, VENUE_ID).unwrap();
    let show = env.row(EntityKind::Show, SHOW_ID).unwrap();
    let entry = env.row(EntityKind::SetlistEntry, SETLIST_ENTRY_ID).unwrap();
    assert_eq!(show["venue_id"], venue["id"]);
    assert_eq!(entry["show_id"], show["id"]);
}

#[test]
fn test_one_bad_row_does_not_block_the_batch() {
    let env = TestEnv::new();
    for i in 1..=100 {
        let payload = if i == 50 {
            json!(["not", "an", "object"])
        } else {
            song_payload(&format!("song-{i}"), &format!("Song {i}"))
        };
        env.push(EntityKind::Song, payload);
    }

    let report = env.run_pass();
    assert_eq!(report.total_attempted, 100);
    assert_eq!(report.total_succeeded, 99);
    assert_eq!(report.total_failed, 1);
    assert_eq!(env.count(EntityKind::Song), 99);
    assert_eq!(
        env.curated_store
            .count_errors(EntityKind::Song, Some(ErrorCategory::RowFailure))
            .unwrap(),
        1
    );

    let recent = env
        .curated_store
        .recent_errors(Some(EntityKind::Song), 10)
        .unwrap();
    assert_eq!(recent.len(), 1);
    assert!(recent[0].payload_snapshot.is_some());
}

#[test]
fn test_sequential_and_parallel_runs_agree() {
    let sequential = TestEnv::with_settings(TransformSettings {
        batch_size: 7,
        max_batches_per_kind: 20,
        workers: 1,
    });
    let parallel = TestEnv::new();
    for env in [&sequential, &parallel] {
        push_dimensions(env);
        for position in 1..=30 {
            env.push(
                EntityKind::SetlistEntry,
                setlist_payload(&format!("u{position}"), SHOW_ID, SONG_ID, position),
            );
        }
    }

    let a = sequential.run_pass();
    let b = parallel.run_pass();
    assert_eq!(a.total_succeeded, 33);
    assert_eq!(a.total_succeeded, b.total_succeeded);
    assert_eq!(
        sequential.count(EntityKind::SetlistEntry),
        parallel.count(EntityKind::SetlistEntry)
    );
}

// =============================================================================
// Duplicate convergence
// =============================================================================

#[test]
fn test_newest_received_duplicate_wins_regardless_of_arrival() {
    let env = TestEnv::new();
    let mut newer = venue_payload(VENUE_ID, "Madison Square Garden");
    newer["capacity"] = json!(20789);
    env.push_at(EntityKind::Venue, newer, 2_000);
    env.run_pass();

    // An older snapshot shows up late.
    let mut older = venue_payload(VENUE_ID, "MSG");
    older["capacity"] = json!(18000);
    env.push_at(EntityKind::Venue, older, 1_000);
    let report = env.run_pass();

    assert_eq!(report.total_succeeded, 1);
    assert_eq!(env.count(EntityKind::Venue), 1);
    let venue = env.row(EntityKind::Venue, VENUE_ID).unwrap();
    assert_eq!(venue["name"], "Madison Square Garden");
    assert_eq!(venue["capacity"], 20789);
    assert_eq!(venue["source_received_at"], 2_000);
}

#[test]
fn test_duplicates_in_one_batch_converge_on_latest() {
    let env = TestEnv::with_settings(TransformSettings {
        batch_size: 50,
        max_batches_per_kind: 1,
        workers: 4,
    });
    for (received_at, name) in [(3_000, "Third"), (1_000, "First"), (2_000, "Second")] {
        env.push_at(EntityKind::Song, song_payload(SONG_ID, name), received_at);
    }

    env.run_pass();
    assert_eq!(env.count(EntityKind::Song), 1);
    let song = env.row(EntityKind::Song, SONG_ID).unwrap();
    assert_eq!(song["name"], "Third");
    assert_eq!(song["slug"], "third");
    assert_eq!(env.unprocessed(EntityKind::Song), 0);
}
