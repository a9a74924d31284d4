//! Wire decoding of admin API records
//!
//! The backend serves flat camelCase JSON objects. `id`, `status`,
//! `createdAt` and `reason` are lifted out; everything else is sorted into
//! display fields, metrics and flags by JSON type.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::entities::{AuditEntry, EntityId, EntityKind, EntitySnapshot};
use crate::error::CollaboratorError;

/// Decode a list response: a bare array or `{ "data": [...] }`.
/// Records that cannot be decoded are skipped.
pub fn decode_list(kind: EntityKind, body: Value) -> Result<Vec<EntitySnapshot>, CollaboratorError> {
    let items = match unwrap_data(body) {
        Value::Array(items) => items,
        other => {
            return Err(CollaboratorError::Deserialization(format!(
                "expected a list of {}, got {}",
                kind.plural(),
                type_name(&other)
            )))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match decode_record(kind, item) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect())
}

/// Decode a single record, optionally wrapped in `{ "data": {...} }`
pub fn decode_record(kind: EntityKind, body: Value) -> Result<EntitySnapshot, CollaboratorError> {
    let mut object = match unwrap_data(body) {
        Value::Object(object) => object,
        other => {
            return Err(CollaboratorError::Deserialization(format!(
                "expected a {} object, got {}",
                kind,
                type_name(&other)
            )))
        }
    };

    let id = take_id(&mut object, &["id", "_id"]).ok_or_else(|| {
        CollaboratorError::Deserialization(format!("{} record without an id", kind))
    })?;

    let status = match object.remove("status") {
        Some(Value::String(status)) => status,
        _ => {
            return Err(CollaboratorError::Deserialization(format!(
                "{} {} has no status",
                kind, id
            )))
        }
    };

    let created_at = take_timestamp(&mut object);
    let reason = take_str(&mut object, &["reason"]);

    let mut snapshot = EntitySnapshot::new(kind, id, status).with_created_at(created_at);
    snapshot.reason = reason;
    collect_fields(&mut snapshot, None, object, true);
    Ok(snapshot)
}

/// Decode the audit trail: a bare array or `{ "data": [...] }`.
/// Entries without an id or action are skipped.
pub fn decode_audit_log(body: Value) -> Result<Vec<AuditEntry>, CollaboratorError> {
    let items = match unwrap_data(body) {
        Value::Array(items) => items,
        other => {
            return Err(CollaboratorError::Deserialization(format!(
                "expected a list of audit entries, got {}",
                type_name(&other)
            )))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let decoded = decode_audit_entry(item);
            if decoded.is_none() {
                tracing::warn!("Skipping undecodable audit entry");
            }
            decoded
        })
        .collect())
}

fn decode_audit_entry(item: Value) -> Option<AuditEntry> {
    let Value::Object(mut object) = item else {
        return None;
    };

    let id = take_id(&mut object, &["id", "_id"])?;
    let action = take_str(&mut object, &["action", "type"])?;
    let mut entry = AuditEntry::new(id.0, action);
    entry.entity_kind = take_str(&mut object, &["entityType", "entity_type", "entity"])
        .and_then(|raw| raw.parse().ok());
    entry.entity_id = take_id(&mut object, &["entityId", "entity_id"]);
    entry.actor = take_str(
        &mut object,
        &["adminEmail", "admin_email", "actor", "performedBy"],
    );
    entry.reason = take_str(&mut object, &["reason"]);
    entry.created_at = take_timestamp(&mut object);
    Some(entry)
}

/// First of `keys` holding a non-empty string or a number
fn take_id(object: &mut Map<String, Value>, keys: &[&str]) -> Option<EntityId> {
    keys.iter().find_map(|key| match object.remove(*key) {
        Some(Value::String(id)) if !id.is_empty() => Some(EntityId(id)),
        Some(Value::Number(id)) => Some(EntityId(id.to_string())),
        _ => None,
    })
}

fn take_str(object: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.remove(*key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn take_timestamp(object: &mut Map<String, Value>) -> DateTime<Utc> {
    take_str(object, &["createdAt", "created_at"])
        .and_then(|raw| parse_timestamp(&raw))
        .unwrap_or_else(Utc::now)
}

fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut object) if object.contains_key("data") => {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn collect_fields(
    snapshot: &mut EntitySnapshot,
    parent: Option<&str>,
    object: Map<String, Value>,
    descend: bool,
) {
    for (key, value) in object {
        let name = match parent {
            Some(parent) => format!("{}_{}", parent, to_snake_case(&key)),
            None => to_snake_case(&key),
        };

        match value {
            Value::String(s) => {
                snapshot.display_fields.insert(name, s);
            }
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    snapshot.metrics.insert(name, n);
                }
            }
            Value::Bool(b) => {
                snapshot.flags.insert(name, b);
            }
            Value::Array(items) => {
                let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if !joined.is_empty() {
                    snapshot.display_fields.insert(name, joined.join(", "));
                }
            }
            Value::Object(nested) if descend => {
                collect_fields(snapshot, Some(&name), nested, false);
            }
            Value::Object(_) | Value::Null => {}
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `totalOrders` → `total_orders`; already snake_case keys pass through
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
