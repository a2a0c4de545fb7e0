use super::{show_ref, song_ref};
use crate::coerce::{Coercion, FieldValue};
use crate::entity_kind::EntityKind;
use crate::mapping::{CuratedRecord, EntitySpec, FieldSpec, Identity, ReconcileDate};
use crate::transform::TransformError;
use serde_json::{Map, Value};

pub static SPEC: EntitySpec = EntitySpec {
    kind: EntityKind::SetlistEntry,
    table: "setlist_entries",
    description: "One song performance within a show's setlist",
    identity: Identity::ExternalIdOrNaturalKey {
        keys: &["uniqueid"],
        columns: &["show_id", "set_name", "position"],
    },
    fields: &[
        FieldSpec {
            column: "set_name",
            keys: &["set", "set_name"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "position",
            keys: &["position"],
            coercion: Coercion::Int,
        },
        FieldSpec {
            column: "transition",
            keys: &["transition"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "trans_mark",
            keys: &["trans_mark"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "is_jamchart",
            keys: &["isjamchart", "is_jamchart"],
            coercion: Coercion::Bool,
        },
        FieldSpec {
            column: "jamchart_note",
            keys: &["jamchart_description", "jamchart_note"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "duration_secs",
            keys: &["tracktime", "duration"],
            coercion: Coercion::DurationSecs,
        },
        FieldSpec {
            column: "gap",
            keys: &["gap"],
            coercion: Coercion::Int,
        },
        FieldSpec {
            column: "is_reprise",
            keys: &["isreprise", "is_reprise"],
            coercion: Coercion::Bool,
        },
        FieldSpec {
            column: "footnote",
            keys: &["footnote"],
            coercion: Coercion::Text,
        },
        FieldSpec {
            column: "show_date",
            keys: &["showdate", "show_date"],
            coercion: Coercion::Date,
        },
    ],
    references: &[show_ref(true), song_ref(true)],
    fallback: None,
    hook: Some(normalize_set_name),
    reconcile_date: Some(ReconcileDate {
        raw_key: "showdate",
        column: "show_date",
    }),
};

fn normalize_set_name(
    _payload: &Map<String, Value>,
    record: &mut CuratedRecord,
) -> Result<(), TransformError> {
    if let Some(raw) = record.get("set_name").as_str() {
        let normalized = set_display_name(raw);
        record.set("set_name", FieldValue::Text(normalized));
    }
    Ok(())
}

/// Upstream set codes ("1", "2", "e", "e2", ...) to display names.
fn set_display_name(code: &str) -> String {
    let lower = code.trim().to_ascii_lowercase();
    if let Ok(n) = lower.parse::<u32>() {
        return format!("Set {}", n);
    }
    if let Some(rest) = lower.strip_prefix("set") {
        if let Ok(n) = rest.trim().parse::<u32>() {
            return format!("Set {}", n);
        }
    }
    match lower.as_str() {
        "e" | "encore" => "Encore".to_string(),
        "s" | "soundcheck" => "Soundcheck".to_string(),
        _ => match lower.strip_prefix('e').map(str::parse::<u32>) {
            Some(Ok(n)) if n > 1 => format!("Encore {}", n),
            Some(Ok(_)) => "Encore".to_string(),
            _ => code.trim().to_string(),
        },
    }
}
