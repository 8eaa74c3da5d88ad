//! Conversion between backend JSON and [`EntityRecord`]s.
//!
//! This is the only place where the wire representation of dates and
//! references is dealt with: decoded date fields come out in canonical form,
//! encoded reference fields go out as `{ "id": n }`.

use serde_json::{Map, Value};
use tracing::warn;

use crate::dates;
use crate::error::TransportError;
use crate::schema::{FieldKind, ResourceDescriptor};
use crate::types::{EntityId, EntityRecord};

/// Decodes one record received from `GET /{r}/{id}`, `POST` or `PUT`.
///
/// Fields are kept verbatim, including ones the descriptor does not declare,
/// except declared date fields which are canonicalized. An unparseable date is
/// kept as sent and logged.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] if the body is not an object or carries
/// an identifier that is not an integer.
pub fn decode_record(
    descriptor: &ResourceDescriptor,
    body: Value,
) -> Result<EntityRecord, TransportError> {
    let Value::Object(mut object) = body else {
        return Err(TransportError::Decode(format!(
            "expected a {} object, got {}",
            descriptor.noun().singular,
            kind_of(&body)
        )));
    };

    let id = match object.remove("id") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(EntityId::from_json(&raw).ok_or_else(|| {
            TransportError::Decode(format!("invalid {} id: {raw}", descriptor.name()))
        })?),
    };

    let mut record = EntityRecord::new();
    for (name, value) in object {
        let value = match descriptor.field(&name).map(|f| f.kind) {
            Some(FieldKind::Date { .. }) => decode_date(descriptor, &name, value),
            _ => value,
        };
        record.set(name, value);
    }

    Ok(match id {
        Some(id) => record.with_id(id),
        None => record,
    })
}

/// Decodes the array returned by `GET /{r}`.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] if the body is not an array or any
/// element fails [`decode_record`].
pub fn decode_list(
    descriptor: &ResourceDescriptor,
    body: Value,
) -> Result<Vec<EntityRecord>, TransportError> {
    let Value::Array(items) = body else {
        return Err(TransportError::Decode(format!(
            "expected a list of {}, got {}",
            descriptor.noun().plural,
            kind_of(&body)
        )));
    };
    items
        .into_iter()
        .map(|item| decode_record(descriptor, item))
        .collect()
}

/// Encodes a record as the JSON body of `POST`/`PUT`.
///
/// Only declared fields are sent, plus `id` when the record carries one.
/// References collapse to `{ "id": n }` (or `null`), empty dates and numbers
/// become `null`, numeric text is sent as a number.
#[must_use]
pub fn encode_record(descriptor: &ResourceDescriptor, record: &EntityRecord) -> Value {
    let mut object = Map::new();
    if let Some(id) = record.id() {
        object.insert("id".to_string(), Value::from(id.0));
    }
    for field in descriptor.fields() {
        let value = record.get(field.name).cloned().unwrap_or(Value::Null);
        let encoded = match field.kind {
            FieldKind::Reference { .. } => encode_reference(&value),
            FieldKind::Date { .. } => encode_date(value),
            FieldKind::Number => encode_number(value),
            FieldKind::Text | FieldKind::LongText | FieldKind::Bool | FieldKind::Choice(_) => value,
        };
        object.insert(field.name.to_string(), encoded);
    }
    Value::Object(object)
}

fn decode_date(descriptor: &ResourceDescriptor, name: &str, value: Value) -> Value {
    if value.is_null() || value.as_str().is_some_and(str::is_empty) {
        return value;
    }
    match dates::canonicalize(&value) {
        Some(canonical) => Value::String(canonical),
        None => {
            warn!(
                resource = descriptor.name(),
                field = name,
                %value,
                "date field is not in a recognised format, keeping it as sent"
            );
            value
        }
    }
}

fn encode_reference(value: &Value) -> Value {
    let id = match value {
        Value::Object(object) => object.get("id").and_then(EntityId::from_json),
        other => EntityId::from_json(other),
    };
    id.map_or(Value::Null, EntityId::to_reference)
}

fn encode_date(value: Value) -> Value {
    match &value {
        Value::String(s) if s.trim().is_empty() => Value::Null,
        Value::String(_) | Value::Null => value,
        other => dates::canonicalize(other).map_or(Value::Null, Value::String),
    }
}

fn encode_number(value: Value) -> Value {
    match &value {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                Value::from(int)
            } else {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        _ => value,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, Noun};
    use serde_json::json;

    fn sale() -> ResourceDescriptor {
        ResourceDescriptor::builder("vendas", Noun::feminine("venda", "vendas"))
            .field(FieldDef::date("dataVenda", "Data da Venda"))
            .field(FieldDef::number("valorFinal", "Valor Final"))
            .field(FieldDef::flag("concluido", "Concluído"))
            .field(FieldDef::long_text("descricao", "Descrição"))
            .field(FieldDef::reference("usuario", "Usuário", "usuarios"))
            .field(FieldDef::reference("veiculo", "Veículo", "veiculos"))
            .build()
            .unwrap()
    }

    #[test]
    fn decode_canonicalizes_dates_and_keeps_the_rest() {
        let record = decode_record(
            &sale(),
            json!({
                "id": 3,
                "dataVenda": "2024-06-10T21:00:00.000-03:00",
                "valorFinal": 45000.0,
                "usuario": { "id": 5, "nome": "Ana" },
                "idVeiculo": 8
            }),
        )
        .unwrap();

        assert_eq!(record.id(), Some(EntityId(3)));
        assert_eq!(record.get("dataVenda"), Some(&json!("2024-06-10")));
        assert_eq!(record.get("valorFinal"), Some(&json!(45000.0)));
        assert_eq!(record.get("usuario"), Some(&json!({ "id": 5, "nome": "Ana" })));
        assert_eq!(record.get("idVeiculo"), Some(&json!(8)));
        assert!(record.get("id").is_none());
    }

    #[test]
    fn decode_keeps_unrecognised_dates() {
        let record = decode_record(&sale(), json!({ "id": 1, "dataVenda": "ontem" })).unwrap();
        assert_eq!(record.get("dataVenda"), Some(&json!("ontem")));
    }

    #[test]
    fn decode_rejects_non_objects_and_bad_ids() {
        assert!(matches!(
            decode_record(&sale(), json!([1, 2])).unwrap_err(),
            TransportError::Decode(_)
        ));
        assert!(matches!(
            decode_record(&sale(), json!({ "id": "x" })).unwrap_err(),
            TransportError::Decode(_)
        ));
        assert!(matches!(
            decode_list(&sale(), json!({ "id": 1 })).unwrap_err(),
            TransportError::Decode(_)
        ));
    }

    #[test]
    fn decode_list_preserves_order() {
        let records = decode_list(&sale(), json!([{ "id": 2 }, { "id": 1 }])).unwrap();
        let ids: Vec<_> = records.iter().filter_map(EntityRecord::id).collect();
        assert_eq!(ids, vec![EntityId(2), EntityId(1)]);
    }

    #[test]
    fn encode_collapses_references_and_omits_undeclared_fields() {
        let mut record = EntityRecord::new();
        record.set("dataVenda", json!("2024-06-10"));
        record.set("valorFinal", json!("45000.50"));
        record.set("concluido", json!(true));
        record.set("descricao", json!("à vista"));
        record.set("usuario", json!({ "id": 5, "nome": "Ana", "empresa": { "id": 1 } }));
        record.set("veiculo", Value::Null);
        record.set("idUsuario", json!(5));

        let body = encode_record(&sale(), &record);
        assert_eq!(
            body,
            json!({
                "dataVenda": "2024-06-10",
                "valorFinal": 45000.5,
                "concluido": true,
                "descricao": "à vista",
                "usuario": { "id": 5 },
                "veiculo": null
            })
        );
    }

    #[test]
    fn encode_sends_id_when_present_and_nulls_empty_values() {
        let mut record = EntityRecord::new();
        record.set("dataVenda", json!(""));
        record.set("valorFinal", json!(""));
        let body = encode_record(&sale(), &record.with_id(EntityId(7)));
        assert_eq!(body["id"], json!(7));
        assert_eq!(body["dataVenda"], Value::Null);
        assert_eq!(body["valorFinal"], Value::Null);
        assert_eq!(body["concluido"], Value::Null);
    }

    #[test]
    fn date_round_trip_keeps_calendar_date() {
        let descriptor = sale();
        let received = decode_record(
            &descriptor,
            json!({ "id": 1, "dataVenda": "2024-12-31T23:59:59+14:00" }),
        )
        .unwrap();
        let sent = encode_record(&descriptor, &received);
        assert_eq!(sent["dataVenda"], json!("2024-12-31"));
    }
}
