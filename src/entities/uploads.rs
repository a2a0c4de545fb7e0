use super::show_ref;
use crate::coerce::{Coercion, FieldValue};
use crate::entity_kind::EntityKind;
use crate::mapping::{CuratedRecord, EntitySpec, FieldSpec, Identity};
use crate::transform::TransformError;
use serde_json::{Map, Value};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::Upload,
    table: "uploads",
    description: "Fan uploaded photos, posters and recordings",
    identity: Identity::ExternalId {
        keys: &["uploadid", "upload_id"],
    },
    fields: &[
        FieldSpec {
            column: "url",
            keys: &["url", "file_url", "image"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "caption",
            keys: &["caption", "description"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "uploaded_by",
            keys: &["uploaded_by", "username", "user"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "uploaded_at",
            keys: &["uploaded_at", "created", "timestamp"],
            coercion: Coercion::Timestamp,
        },
        FieldSpec {
            column: "media_type",
            keys: &["media_type", "type"],
            coercion: Coercion::Text,
        },
    ],
    references: &[show_ref(true)],
    fallback: None,
    hook: Some(infer_media_type),
    reconcile_date: None,
};

fn infer_media_type(_payload: &Map<String, Value>, record: &mut CuratedRecord) -> Result<(), TransformError> {
    if !record.get("media_type").is_null() {
        return Ok(());
    }
    let inferred = record.get("url").as_str().and_then(media_type_for_url);
    if let Some(media_type) = inferred {
        record.set("media_type", FieldValue::from(media_type));
    }
    Ok(())
}

fn media_type_for_url(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" => Some("image"),
        "mp3" | "flac" | "ogg" | "m4a" | "wav" => Some("audio"),
        "mp4" | "mov" | "webm" => Some("video"),
        "pdf" => Some("document"),
        _ => None,
    }
}
