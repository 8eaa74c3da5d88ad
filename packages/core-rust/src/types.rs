use std::collections::BTreeMap;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Identifier assigned by the backend when a record is first persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Reads an identifier from a JSON number or a numeric string.
    ///
    /// Fractional numbers are rejected; the backend only issues integral ids.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The `{ "id": n }` shape the backend expects for reference fields.
    #[must_use]
    pub fn to_reference(self) -> Value {
        json!({ "id": self.0 })
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// One entity record: an optional identifier plus named field values.
///
/// Field values are kept in their JSON form. The identifier is `None` until the
/// backend assigns one and cannot be changed afterwards; the only way to get a
/// record with a different id is to build a new one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<EntityId>,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl EntityRecord {
    /// Creates an unpersisted record with no fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record that the backend already knows under `id`.
    #[must_use]
    pub fn persisted(id: EntityId, fields: BTreeMap<String, Value>) -> Self {
        Self {
            id: Some(id),
            fields,
        }
    }

    /// Creates an unpersisted record from field values.
    #[must_use]
    pub fn unpersisted(fields: BTreeMap<String, Value>) -> Self {
        Self { id: None, fields }
    }

    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Text value of a field, if it holds a string.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Sets a field value. The identifier is not a field and cannot be set here.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Identifier of the record a reference field points at, when the field
    /// holds a nested object with an `id`.
    #[must_use]
    pub fn reference_id(&self, name: &str) -> Option<EntityId> {
        self.fields
            .get(name)
            .and_then(|v| v.get("id"))
            .and_then(EntityId::from_json)
    }

    /// Copy of this record with the identifier stripped, as sent on create.
    #[must_use]
    pub fn without_id(&self) -> Self {
        Self {
            id: None,
            fields: self.fields.clone(),
        }
    }

    /// Copy of this record carrying `id`, as sent on update.
    #[must_use]
    pub fn with_id(&self, id: EntityId) -> Self {
        Self {
            id: Some(id),
            fields: self.fields.clone(),
        }
    }

    /// JSON object form: fields plus `id` when present.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(id) = self.id {
            map.insert("id".to_string(), Value::from(id.0));
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn entity_id_from_number_and_string() {
        assert_eq!(EntityId::from_json(&json!(5)), Some(EntityId(5)));
        assert_eq!(EntityId::from_json(&json!("12")), Some(EntityId(12)));
        assert_eq!(EntityId::from_json(&json!(" 3 ")), Some(EntityId(3)));
        assert_eq!(EntityId::from_json(&json!(1.5)), None);
        assert_eq!(EntityId::from_json(&json!(null)), None);
        assert_eq!(EntityId::from_json(&json!("abc")), None);
    }

    #[test]
    fn reference_shape_is_id_only() {
        assert_eq!(EntityId(5).to_reference(), json!({ "id": 5 }));
    }

    #[test]
    fn reference_id_reads_nested_object() {
        let record = EntityRecord::unpersisted(fields(&[
            ("usuario", json!({ "id": 5, "nome": "Ana" })),
            ("veiculo", Value::Null),
        ]));
        assert_eq!(record.reference_id("usuario"), Some(EntityId(5)));
        assert_eq!(record.reference_id("veiculo"), None);
        assert_eq!(record.reference_id("missing"), None);
    }

    #[test]
    fn with_and_without_id_copy_fields() {
        let record = EntityRecord::persisted(EntityId(9), fields(&[("nome", json!("Sedan"))]));
        let stripped = record.without_id();
        assert_eq!(stripped.id(), None);
        assert_eq!(stripped.text("nome"), Some("Sedan"));

        let restored = stripped.with_id(EntityId(9));
        assert_eq!(restored, record);
    }

    #[test]
    fn to_json_includes_id_only_when_persisted() {
        let new = EntityRecord::unpersisted(fields(&[("nome", json!("Fiat"))]));
        assert_eq!(new.to_json(), json!({ "nome": "Fiat" }));

        let saved = new.with_id(EntityId(2));
        assert_eq!(saved.to_json(), json!({ "id": 2, "nome": "Fiat" }));
    }

    #[test]
    fn serde_flattens_fields_next_to_id() {
        let record: EntityRecord =
            serde_json::from_value(json!({ "id": 1, "nome": "Sedan" })).expect("deserialize");
        assert_eq!(record.id(), Some(EntityId(1)));
        assert_eq!(record.text("nome"), Some("Sedan"));
        assert!(record.get("id").is_none());
    }
}
