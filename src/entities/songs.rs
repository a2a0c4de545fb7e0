use crate::coerce::{Coercion, FieldValue};
use crate::entity_kind::EntityKind;
use crate::mapping::{CuratedRecord, EntitySpec, FallbackSpec, FieldSpec, Identity};
use crate::transform::TransformError;
use serde_json::{Map, Value};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::Song,
    table: "songs",
    description: "Songs with play statistics",
    identity: Identity::ExternalId {
        keys: &["songid", "song_id"],
    },
    fields: &[
        FieldSpec {
            column: "name",
            keys: &["song", "name", "title"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "slug",
            keys: &["slug"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "original_artist",
            keys: &["artist", "original_artist"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "debut_date",
            keys: &["debut", "debut_date"],
            coercion: Coercion::Date,
        },
        FieldSpec {
            column: "last_played",
            keys: &["last_played"],
            coercion: Coercion::Date,
        },
        FieldSpec {
            column: "times_played",
            keys: &["times_played"],
            coercion: Coercion::Int,
        },
        FieldSpec {
            column: "gap",
            keys: &["gap"],
            coercion: Coercion::Int,
        },
    ],
    references: &[],
    fallback: Some(FallbackSpec {
        column: "name",
        coercion: Coercion::Text,
    }),
    hook: Some(derive_slug),
    reconcile_date: None,
};

fn derive_slug(_payload: &Map<String, Value>, record: &mut CuratedRecord) -> Result<(), TransformError> {
    if record.get("slug").is_null() {
        if let Some(name) = record.get("name").as_str() {
            let slug = slugify(name);
            if !slug.is_empty() {
                record.set("slug", FieldValue::Text(slug));
            }
        }
    }
    Ok(())
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if c == '\'' || c == '\u{2019}' {
            continue;
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
