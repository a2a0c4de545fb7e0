//! SQLite schema for the curated layer.
//!
//! Every entity table carries the same provenance tail: the raw record that
//! last wrote the row, its receipt time, a digest of the business content and
//! the created/updated/processed stamps. Derived date parts are generated
//! columns.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, PartialUniqueIndex, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP_MS,
};

/// Natural keys only identify rows that upstream gave no id.
pub const NATURAL_KEY_PREDICATE: &str = "external_id IS NULL";

const VENUE_FK: ForeignKey = ForeignKey {
    foreign_table: "venues",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const SHOW_FK: ForeignKey = ForeignKey {
    foreign_table: "shows",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const PERSON_FK: ForeignKey = ForeignKey {
    foreign_table: "people",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const YEAR_OF_SHOW_DATE: &str = "cast(substr(show_date, 1, 4) as integer)";
const MONTH_OF_SHOW_DATE: &str = "cast(substr(show_date, 6, 2) as integer)";

const VENUES_TABLE_V0: Table = Table {
    name: "venues",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("city", &SqlType::Text),
        sqlite_column!("state", &SqlType::Text),
        sqlite_column!("country", &SqlType::Text),
        sqlite_column!("capacity", &SqlType::Integer),
        sqlite_column!("latitude", &SqlType::Real),
        sqlite_column!("longitude", &SqlType::Real),
        sqlite_column!("notes", &SqlType::Text),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_venues_name", "name COLLATE NOCASE")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

const SHOWS_TABLE_V0: Table = Table {
    name: "shows",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("show_date", &SqlType::Text),
        sqlite_column!(
            "show_year",
            &SqlType::Integer,
            generated_as = Some(YEAR_OF_SHOW_DATE)
        ),
        sqlite_column!(
            "show_month",
            &SqlType::Integer,
            generated_as = Some(MONTH_OF_SHOW_DATE)
        ),
        sqlite_column!("venue_id", &SqlType::Integer, foreign_key = Some(&VENUE_FK)),
        sqlite_column!("permalink", &SqlType::Text),
        sqlite_column!("tour", &SqlType::Text),
        sqlite_column!("artist", &SqlType::Text),
        sqlite_column!("notes", &SqlType::Text),
        sqlite_column!("exclude_from_stats", &SqlType::Integer),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_shows_date", "show_date"),
        ("idx_shows_venue", "venue_id"),
    ],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

const SONGS_TABLE_V0: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("slug", &SqlType::Text),
        sqlite_column!("original_artist", &SqlType::Text),
        sqlite_column!("debut_date", &SqlType::Text),
        sqlite_column!("last_played", &SqlType::Text),
        sqlite_column!("times_played", &SqlType::Integer),
        sqlite_column!("gap", &SqlType::Integer),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_songs_name", "name COLLATE NOCASE")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

const SETLIST_ENTRIES_TABLE_V0: Table = Table {
    name: "setlist_entries",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("show_id", &SqlType::Integer, foreign_key = Some(&SHOW_FK)),
        sqlite_column!("song_id", &SqlType::Integer, foreign_key = Some(&SONG_FK)),
        sqlite_column!("set_name", &SqlType::Text),
        sqlite_column!("position", &SqlType::Integer),
        sqlite_column!("transition", &SqlType::Text),
        sqlite_column!("trans_mark", &SqlType::Text),
        sqlite_column!("is_jamchart", &SqlType::Integer),
        sqlite_column!("jamchart_note", &SqlType::Text),
        sqlite_column!("duration_secs", &SqlType::Integer),
        sqlite_column!("gap", &SqlType::Integer),
        sqlite_column!("is_reprise", &SqlType::Integer),
        sqlite_column!("footnote", &SqlType::Text),
        sqlite_column!("show_date", &SqlType::Text),
        sqlite_column!(
            "show_year",
            &SqlType::Integer,
            generated_as = Some(YEAR_OF_SHOW_DATE)
        ),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_setlist_entries_show", "show_id"),
        ("idx_setlist_entries_song", "song_id"),
        ("idx_setlist_entries_year", "show_year"),
    ],
    unique_constraints: &[],
    partial_unique_indices: &[PartialUniqueIndex {
        name: "ux_setlist_entries_natural",
        columns: &["show_id", "set_name", "position"],
        predicate: NATURAL_KEY_PREDICATE,
    }],
};

const JAM_ANNOTATIONS_TABLE_V0: Table = Table {
    name: "jam_annotations",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("show_id", &SqlType::Integer, foreign_key = Some(&SHOW_FK)),
        sqlite_column!("song_id", &SqlType::Integer, foreign_key = Some(&SONG_FK)),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("is_recommended", &SqlType::Integer),
        sqlite_column!("duration_secs", &SqlType::Integer),
        sqlite_column!("show_date", &SqlType::Text),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_jam_annotations_song", "song_id")],
    unique_constraints: &[],
    partial_unique_indices: &[PartialUniqueIndex {
        name: "ux_jam_annotations_natural",
        columns: &["show_id", "song_id"],
        predicate: NATURAL_KEY_PREDICATE,
    }],
};

const PEOPLE_TABLE_V0: Table = Table {
    name: "people",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("role", &SqlType::Text),
        sqlite_column!("instrument", &SqlType::Text),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_people_name", "name COLLATE NOCASE")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

const APPEARANCES_TABLE_V0: Table = Table {
    name: "appearances",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("person_id", &SqlType::Integer, foreign_key = Some(&PERSON_FK)),
        sqlite_column!("show_id", &SqlType::Integer, foreign_key = Some(&SHOW_FK)),
        sqlite_column!("role", &SqlType::Text),
        sqlite_column!("instrument", &SqlType::Text),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_appearances_show", "show_id")],
    unique_constraints: &[],
    partial_unique_indices: &[PartialUniqueIndex {
        name: "ux_appearances_natural",
        columns: &["person_id", "show_id"],
        predicate: NATURAL_KEY_PREDICATE,
    }],
};

const LINKS_TABLE_V0: Table = Table {
    name: "links",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("show_id", &SqlType::Integer, foreign_key = Some(&SHOW_FK)),
        sqlite_column!("link_type", &SqlType::Text),
        sqlite_column!("url", &SqlType::Text),
        sqlite_column!("title", &SqlType::Text),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_links_show", "show_id")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

const UPLOADS_TABLE_V0: Table = Table {
    name: "uploads",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("show_id", &SqlType::Integer, foreign_key = Some(&SHOW_FK)),
        sqlite_column!("url", &SqlType::Text),
        sqlite_column!("caption", &SqlType::Text),
        sqlite_column!("uploaded_by", &SqlType::Text),
        sqlite_column!("uploaded_at", &SqlType::Integer),
        sqlite_column!("media_type", &SqlType::Text),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_uploads_show", "show_id")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

const METADATA_ITEMS_TABLE_V0: Table = Table {
    name: "metadata_items",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("song_id", &SqlType::Integer, foreign_key = Some(&SONG_FK)),
        sqlite_column!("show_id", &SqlType::Integer, foreign_key = Some(&SHOW_FK)),
        sqlite_column!("meta_key", &SqlType::Text),
        sqlite_column!("meta_value", &SqlType::Text),
        sqlite_column!("source", &SqlType::Text),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
    partial_unique_indices: &[PartialUniqueIndex {
        name: "ux_metadata_items_natural",
        columns: &["song_id", "meta_key"],
        predicate: NATURAL_KEY_PREDICATE,
    }],
};

const ACTIVITY_FEED_ITEMS_TABLE_V0: Table = Table {
    name: "activity_feed_items",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("external_id", &SqlType::Text, is_unique = true),
        sqlite_column!("show_id", &SqlType::Integer, foreign_key = Some(&SHOW_FK)),
        sqlite_column!("song_id", &SqlType::Integer, foreign_key = Some(&SONG_FK)),
        sqlite_column!("person_id", &SqlType::Integer, foreign_key = Some(&PERSON_FK)),
        sqlite_column!("activity_type", &SqlType::Text),
        sqlite_column!("actor", &SqlType::Text),
        sqlite_column!("summary", &SqlType::Text),
        sqlite_column!("occurred_at", &SqlType::Integer),
        sqlite_column!("source_raw_id", &SqlType::Integer, non_null = true),
        sqlite_column!("source_received_at", &SqlType::Integer, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
        sqlite_column!("processed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_activity_feed_items_occurred", "occurred_at")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

const ERROR_LOG_TABLE_V0: Table = Table {
    name: "error_log",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("entity_kind", &SqlType::Text, non_null = true),
        // Null for failures that aren't tied to a single raw record
        sqlite_column!("raw_record_id", &SqlType::Integer),
        sqlite_column!("category", &SqlType::Text, non_null = true),
        sqlite_column!("error_message", &SqlType::Text, non_null = true),
        sqlite_column!("payload_snapshot", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP_MS)
        ),
    ],
    indices: &[("idx_error_log_kind_created", "entity_kind, created_at")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

pub const CURATED_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        VENUES_TABLE_V0,
        SHOWS_TABLE_V0,
        SONGS_TABLE_V0,
        SETLIST_ENTRIES_TABLE_V0,
        JAM_ANNOTATIONS_TABLE_V0,
        PEOPLE_TABLE_V0,
        APPEARANCES_TABLE_V0,
        LINKS_TABLE_V0,
        UPLOADS_TABLE_V0,
        METADATA_ITEMS_TABLE_V0,
        ACTIVITY_FEED_ITEMS_TABLE_V0,
        ERROR_LOG_TABLE_V0,
    ],
    migration: None,
}];
