use super::{person_ref, show_ref, song_ref};
use crate::coerce::Coercion;
use crate::entity_kind::EntityKind;
use crate::mapping::{EntitySpec, FieldSpec, Identity};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::ActivityFeedItem,
    table: "activity_feed_items",
    description: "Site activity events, loosely linked to shows, songs and people",
    identity: Identity::ExternalId {
        keys: &["activityid", "activity_id", "id"],
    },
    fields: &[
        FieldSpec {
            column: "activity_type",
            keys: &["type", "activity_type", "action"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "actor",
            keys: &["username", "actor", "user"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "summary",
            keys: &["summary", "text", "message"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "occurred_at",
            keys: &["occurred_at", "timestamp", "created"],
            coercion: Coercion::Timestamp,
        },
    ],
    references: &[show_ref(false), song_ref(false), person_ref(false)],
    fallback: None,
    hook: None,
    reconcile_date: None,
};
