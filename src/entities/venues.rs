use crate::coerce::Coercion;
use crate::entity_kind::EntityKind;
use crate::mapping::{EntitySpec, FallbackSpec, FieldSpec, Identity};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::Venue,
    table: "venues",
    description: "Venues with location and capacity",
    identity: Identity::ExternalId {
        keys: &["venueid", "venue_id"],
    },
    fields: &[
        FieldSpec {
            column: "name",
            keys: &["venuename", "venue", "name"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "city",
            keys: &["city"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "state",
            keys: &["state"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "country",
            keys: &["country"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "capacity",
            keys: &["capacity"],
            coercion: Coercion::Int,
        },
        FieldSpec {
            column: "latitude",
            keys: &["latitude", "lat"],
            coercion: Coercion::Decimal,
        },
        FieldSpec {
            column: "longitude",
            keys: &["longitude", "long", "lng"],
            coercion: Coercion::Decimal,
        },
        FieldSpec {
            column: "notes",
            keys: &["venuenotes", "notes"],
            coercion: Coercion::Text,
        },
    ],
    references: &[],
    fallback: Some(FallbackSpec {
        column: "name",
        coercion: Coercion::Text,
    }),
    hook: None,
    reconcile_date: None,
};
