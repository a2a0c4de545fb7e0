//! Test environment and raw payload builders

use super::constants::*;
use serde_json::{json, Value};
use setlist_curator::curated_store::SqliteCuratedStore;
use setlist_curator::raw_store::{NewRawRecord, RawRecordStore, SqliteRawStore};
use setlist_curator::{CuratedStore, EntityKind, Orchestrator, RunReport, TransformContext, TransformSettings};
use std::sync::Arc;
use tempfile::TempDir;

/// Both stores backed by files in a temporary directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub raw_store: Arc<SqliteRawStore>,
    pub curated_store: Arc<SqliteCuratedStore>,
    pub settings: TransformSettings,
}

#[allow(dead_code)]
impl TestEnv {
    pub fn new() -> Self {
        Self::with_settings(TransformSettings {
            batch_size: 50,
            max_batches_per_kind: 10,
            workers: 4,
        })
    }

    pub fn with_settings(settings: TransformSettings) -> Self {
        let dir = TempDir::new().unwrap();
        let raw_store = Arc::new(SqliteRawStore::new(dir.path().join("raw.db")).unwrap());
        let curated_store =
            Arc::new(SqliteCuratedStore::new(dir.path().join("curated.db")).unwrap());
        Self {
            dir,
            raw_store,
            curated_store,
            settings,
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(TransformContext::new(
            self.raw_store.clone(),
            self.curated_store.clone(),
            self.curated_store.clone(),
            self.settings,
        ))
    }

    pub fn run_pass(&self) -> RunReport {
        self.orchestrator().run_full_pass()
    }

    pub fn push(&self, kind: EntityKind, payload: Value) -> i64 {
        self.raw_store
            .insert_raw_record(&NewRawRecord::new(kind, payload))
            .unwrap()
    }

    pub fn push_at(&self, kind: EntityKind, payload: Value, received_at: i64) -> i64 {
        self.raw_store
            .insert_raw_record(&NewRawRecord::new(kind, payload).received_at(received_at))
            .unwrap()
    }

    /// Curated row with the given upstream id, as a JSON object.
    pub fn row(&self, kind: EntityKind, external_id: &str) -> Option<Value> {
        let id = self
            .curated_store
            .find_by_external_id(kind, external_id)
            .unwrap()?;
        self.curated_store.get_row(kind, id).unwrap()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.curated_store.count_rows(kind).unwrap()
    }

    pub fn unprocessed(&self, kind: EntityKind) -> usize {
        self.raw_store.count_unprocessed(kind).unwrap()
    }
}

#[allow(dead_code)]
pub fn venue_payload(venue_id: &str, name: &str) -> Value {
    json!({
        "venueid": venue_id,
        "venuename": name,
        "city": "New York",
        "state": "NY",
        "country": "USA",
        "capacity": "19500",
    })
}

#[allow(dead_code)]
pub fn show_payload(show_id: &str, show_date: &str, venue_id: &str) -> Value {
    json!({
        "showid": show_id,
        "showdate": show_date,
        "venueid": venue_id,
        "venue": VENUE_NAME,
        "tourname": "2023 New Year's Run",
        "artist_name": "Phish",
    })
}

#[allow(dead_code)]
pub fn song_payload(song_id: &str, name: &str) -> Value {
    json!({
        "songid": song_id,
        "song": name,
        "artist": "Phish",
        "times_played": "412",
    })
}

#[allow(dead_code)]
pub fn setlist_payload(unique_id: &str, show_id: &str, song_id: &str, position: i64) -> Value {
    json!({
        "uniqueid": unique_id,
        "showid": show_id,
        "showdate": SHOW_DATE,
        "songid": song_id,
        "song": SONG_NAME,
        "set": "2",
        "position": position,
        "transition": " > ",
        "tracktime": "22:05",
        "isjamchart": "1",
    })
}

#[allow(dead_code)]
pub fn jamchart_payload(jamchart_id: &str, show_id: &str, song_id: &str, description: &str) -> Value {
    json!({
        "jamchartid": jamchart_id,
        "showid": show_id,
        "showdate": SHOW_DATE,
        "songid": song_id,
        "jamchart_description": description,
        "tracktime": "14:52",
    })
}

/// Venue, show and song that a setlist entry can resolve against.
#[allow(dead_code)]
pub fn push_dimensions(env: &TestEnv) {
    env.push(EntityKind::Venue, venue_payload(VENUE_ID, VENUE_NAME));
    env.push(EntityKind::Show, show_payload(SHOW_ID, SHOW_DATE, VENUE_ID));
    env.push(EntityKind::Song, song_payload(SONG_ID, SONG_NAME));
}
