use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use time::OffsetDateTime;

use super::repo_types::{CreatedTable, TableRow};

/// Name used when a table is saved without one.
pub const DEFAULT_TABLE_NAME: &str = "Untitled";

/// `data` is kept as raw JSON text so documents round-trip unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTableRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTableRequest {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

/// Name and document with defaults applied.
#[derive(Debug)]
pub struct TableDocument {
    pub name: String,
    pub data: Box<RawValue>,
}

impl TableDocument {
    fn new(name: Option<String>, data: Option<Box<RawValue>>) -> Self {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
        let data = data.unwrap_or_else(empty_document);
        Self { name, data }
    }
}

fn empty_document() -> Box<RawValue> {
    RawValue::from_string("{}".to_string()).expect("literal is valid JSON")
}

impl From<CreateTableRequest> for TableDocument {
    fn from(r: CreateTableRequest) -> Self {
        Self::new(r.name, r.data)
    }
}

impl UpdateTableRequest {
    pub fn into_parts(self) -> (i64, TableDocument) {
        (self.id, TableDocument::new(self.name, self.data))
    }
}

#[derive(Debug, Serialize)]
pub struct TableView {
    pub id: i64,
    pub name: String,
    pub data: Box<RawValue>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<TableRow> for TableView {
    type Error = serde_json::Error;

    fn try_from(r: TableRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            data: RawValue::from_string(r.data)?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedTableView {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<CreatedTable> for CreatedTableView {
    fn from(t: CreatedTable) -> Self {
        Self {
            id: t.id,
            name: t.name,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<TableView>,
}

#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub table: CreatedTableView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn create(json: &str) -> TableDocument {
        serde_json::from_str::<CreateTableRequest>(json)
            .expect("parse")
            .into()
    }

    #[test]
    fn missing_fields_get_defaults() {
        let doc = create("{}");
        assert_eq!(doc.name, DEFAULT_TABLE_NAME);
        assert_eq!(doc.data.get(), "{}");
    }

    #[test]
    fn blank_name_and_null_data_get_defaults() {
        let doc = create(r#"{"name":"   ","data":null}"#);
        assert_eq!(doc.name, DEFAULT_TABLE_NAME);
        assert_eq!(doc.data.get(), "{}");
    }

    #[test]
    fn document_text_is_kept_verbatim() {
        let doc = create(r#"{"name":" Sheet1 ","data":{"b":2,"a":[1,2.50]}}"#);
        assert_eq!(doc.name, "Sheet1");
        assert_eq!(doc.data.get(), r#"{"b":2,"a":[1,2.50]}"#);
    }

    #[test]
    fn update_requires_id() {
        assert!(serde_json::from_str::<UpdateTableRequest>(r#"{"name":"x"}"#).is_err());
        assert!(serde_json::from_str::<UpdateTableRequest>(r#"{"id":"seven"}"#).is_err());
        let (id, doc) = serde_json::from_str::<UpdateTableRequest>(r#"{"id":7}"#)
            .unwrap()
            .into_parts();
        assert_eq!(id, 7);
        assert_eq!(doc.name, DEFAULT_TABLE_NAME);
    }

    #[test]
    fn view_serializes_stored_document_unchanged() {
        let view = TableView::try_from(TableRow {
            id: 3,
            name: "Sheet1".into(),
            data: r#"{"b":2,"a":1}"#.into(),
            created_at: datetime!(2024-05-01 10:00:00 UTC),
            updated_at: datetime!(2024-05-02 11:30:00 UTC),
        })
        .unwrap();
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains(r#""data":{"b":2,"a":1}"#), "{json}");
        assert!(json.contains(r#""updated_at":"2024-05-02T11:30:00Z""#), "{json}");
    }
}
