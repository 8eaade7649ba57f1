//! Records: one source row plus its generated identifier.
//!
//! A [`Record`] keeps its source fields in column order and carries a typed
//! [`RecordId`]. The wire form is a flat JSON object of string values where
//! the reserved `id` member holds the identifier:
//!
//! ```json
//! {"name": "Apple", "price": "1.00", "id": "6f1c2b7e-9a3d-4c1e-8f2a-b5d4e3c2a1f0"}
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::id::RecordId;

/// Name of the reserved identifier field.
pub const ID_FIELD: &str = "id";

/// One row of the source table with its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    fields: Vec<(String, String)>,
}

impl Record {
    /// Builds a record from a header and the matching row values.
    ///
    /// A header column named `id` is dropped: the generated identifier
    /// always takes that name.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the row width differs from the header.
    pub fn from_row(id: RecordId, header: &[String], values: Vec<String>) -> Result<Self> {
        if header.len() != values.len() {
            return Err(Error::InvalidInput(format!(
                "row has {} fields but header has {}",
                values.len(),
                header.len()
            )));
        }

        let fields = header
            .iter()
            .cloned()
            .zip(values)
            .filter(|(name, _)| name != ID_FIELD)
            .collect();
        Ok(Self { id, fields })
    }

    /// Builds a record from `(name, value)` pairs, dropping any `id` pair.
    pub fn new<K, V>(id: RecordId, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(name, _)| name != ID_FIELD)
            .collect();
        Self { id, fields }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the value of a source field.
    ///
    /// The identifier is not a source field; use [`Record::id`].
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates source field names in column order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Number of source fields, excluding the identifier.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no source fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(ID_FIELD, &self.id.to_string())?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flat object of string values with an \"id\" member")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Record, A::Error> {
        let mut id = None;
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));

        while let Some((name, value)) = map.next_entry::<String, String>()? {
            if !seen.insert(name.clone()) {
                return Err(de::Error::custom(format!("duplicate field `{name}`")));
            }
            if name == ID_FIELD {
                let parsed = value.parse::<RecordId>().map_err(de::Error::custom)?;
                id = Some(parsed);
            } else {
                fields.push((name, value));
            }
        }

        let id = id.ok_or_else(|| de::Error::missing_field(ID_FIELD))?;
        Ok(Record { id, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn from_row_keeps_column_order() {
        let record = Record::from_row(
            RecordId::generate(),
            &header(&["name", "price"]),
            vec!["Apple".into(), "1.00".into()],
        )
        .unwrap();

        assert_eq!(record.field_names().collect::<Vec<_>>(), ["name", "price"]);
        assert_eq!(record.get("name"), Some("Apple"));
        assert_eq!(record.get("price"), Some("1.00"));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn from_row_rejects_width_mismatch() {
        let err = Record::from_row(
            RecordId::generate(),
            &header(&["name", "price"]),
            vec!["Apple".into()],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn source_id_column_is_replaced() {
        let id = RecordId::generate();
        let record = Record::from_row(
            id,
            &header(&["id", "name"]),
            vec!["legacy-7".into(), "Apple".into()],
        )
        .unwrap();

        assert_eq!(record.len(), 1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn serializes_fields_then_id() {
        let id: RecordId = "6f1c2b7e-9a3d-4c1e-8f2a-b5d4e3c2a1f0".parse().unwrap();
        let record = Record::new(id, [("name", "Apple"), ("price", "1.00")]);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Apple","price":"1.00","id":"6f1c2b7e-9a3d-4c1e-8f2a-b5d4e3c2a1f0"}"#
        );
    }

    #[test]
    fn deserializes_id_in_any_position() {
        let json = r#"{"id":"6f1c2b7e-9a3d-4c1e-8f2a-b5d4e3c2a1f0","name":"Banana","price":"0.50"}"#;
        let record: Record = serde_json::from_str(json).unwrap();

        assert_eq!(
            record.id().to_string(),
            "6f1c2b7e-9a3d-4c1e-8f2a-b5d4e3c2a1f0"
        );
        assert_eq!(record.field_names().collect::<Vec<_>>(), ["name", "price"]);
    }

    #[test]
    fn deserialize_requires_id() {
        let err = serde_json::from_str::<Record>(r#"{"name":"Apple"}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `id`"));
    }

    #[test]
    fn deserialize_rejects_non_string_values() {
        let json = r#"{"id":"6f1c2b7e-9a3d-4c1e-8f2a-b5d4e3c2a1f0","price":1.0}"#;
        assert!(serde_json::from_str::<Record>(json).is_err());
    }

    #[test]
    fn deserialize_rejects_malformed_id() {
        assert!(serde_json::from_str::<Record>(r#"{"id":"abc","name":"Apple"}"#).is_err());
    }
}
