//! Records held by the document-management (HyperThought) side: files and
//! their key/value metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ITEM_NO: &str = "ITEM NO.";
pub const PART_NUMBER: &str = "PART NUMBER";
pub const QUANTITY: &str = "QTY.";
pub const ITEM_TYPE: &str = "ITEM TYPE";
pub const ID_NUMBER: &str = "id_number";

/// File types that carry CAD part/assembly data.
pub const CAD_FILE_TYPES: [&str; 2] = ["SLDASM", "SLDPRT"];

/// `{ "type": "string", "link": ... }`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetadataValue {
    #[serde(rename = "type", default = "default_value_type")]
    pub value_type: String,
    #[serde(default)]
    pub link: Value,
}

fn default_value_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetadataItem {
    #[serde(rename = "keyName")]
    pub key_name: String,
    pub value: MetadataValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl MetadataItem {
    pub fn new(key_name: impl Into<String>, link: Value) -> Self {
        let value_type = match &link {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            _ => "string",
        };
        Self {
            key_name: key_name.into(),
            value: MetadataValue {
                value_type: value_type.to_string(),
                link,
            },
            unit: None,
            annotation: None,
        }
    }
}

/// A file (or folder) in the document store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoredFile {
    pub pk: String,
    pub name: String,
    #[serde(default)]
    pub ftype: String,
    #[serde(default)]
    pub metadata: Vec<MetadataItem>,
}

impl StoredFile {
    /// Every value recorded under `key`, in write order.
    pub fn lookup_all<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a Value> + use<'a, 'k> {
        self.metadata
            .iter()
            .filter(move |m| m.key_name == key)
            .map(|m| &m.value.link)
    }

    /// Last value recorded under `key`.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.lookup_all(key).last()
    }

    /// Metadata cut into the per-BOM-row groups written by tagging. Each
    /// group ends at an `ITEM TYPE` entry; untyped metadata forms one group.
    pub fn row_groups(&self) -> Vec<&[MetadataItem]> {
        let mut groups = Vec::new();
        let mut start = 0;
        for (index, item) in self.metadata.iter().enumerate() {
            if item.key_name == ITEM_TYPE {
                groups.push(&self.metadata[start..=index]);
                start = index + 1;
            }
        }
        if start < self.metadata.len() {
            groups.push(&self.metadata[start..]);
        }
        groups
    }

    /// Metadata value rendered as text: strings as-is, numbers in their JSON form.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn is_cad(&self) -> bool {
        CAD_FILE_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(self.ftype.trim()))
    }

    pub fn is_folder(&self) -> bool {
        self.ftype.eq_ignore_ascii_case("folder")
    }

    pub fn stem(&self) -> &str {
        file_stem(&self.name)
    }

    /// Extension of the file name, without the dot.
    pub fn extension(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => "",
        }
    }
}

/// Text before the first `.`.
pub fn file_stem(name: &str) -> &str {
    match name.split_once('.') {
        Some((stem, _)) => stem,
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored(ftype: &str) -> StoredFile {
        serde_json::from_value(json!({
            "pk": "pk-1",
            "name": "BRACKET-01.SLDPRT",
            "ftype": ftype,
            "metadata": [
                {"keyName": "ITEM NO.", "value": {"type": "string", "link": "2.1"}},
                {"keyName": "QTY.", "value": {"type": "number", "link": 4.0}},
                {"keyName": "PART NUMBER", "value": {"link": "BRACKET-01"}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn lookups_render_text_and_numbers() {
        let file = stored("SLDPRT");
        assert_eq!(file.text(ITEM_NO).as_deref(), Some("2.1"));
        assert_eq!(file.text(QUANTITY).as_deref(), Some("4.0"));
        assert_eq!(file.text(PART_NUMBER).as_deref(), Some("BRACKET-01"));
        assert_eq!(file.text(ITEM_TYPE), None);
    }

    #[test]
    fn cad_filter_ignores_case() {
        assert!(stored("SLDPRT").is_cad());
        assert!(stored("sldasm").is_cad());
        assert!(!stored("PDF").is_cad());
    }

    #[test]
    fn stem_and_extension() {
        assert_eq!(file_stem("A.B.SLDASM"), "A");
        assert_eq!(file_stem("README"), "README");
        let file = stored("SLDPRT");
        assert_eq!(file.stem(), "BRACKET-01");
        assert_eq!(file.extension(), "SLDPRT");
    }

    #[test]
    fn new_item_infers_value_type() {
        let number = MetadataItem::new("QTY.", json!(2.0));
        assert_eq!(number.value.value_type, "number");
        let text = MetadataItem::new("PART NUMBER", json!("X"));
        assert_eq!(text.value.value_type, "string");
        let encoded = serde_json::to_value(&text).unwrap();
        assert_eq!(encoded["keyName"], "PART NUMBER");
        assert!(encoded.get("unit").is_none());
    }

    #[test]
    fn repeated_keys_are_kept_per_bom_row() {
        let file = StoredFile {
            pk: "pk-pin".into(),
            name: "PIN.SLDPRT".into(),
            ftype: "SLDPRT".into(),
            metadata: vec![
                MetadataItem::new(ITEM_NO, json!("2.1")),
                MetadataItem::new(QUANTITY, json!(2.0)),
                MetadataItem::new(ITEM_TYPE, json!("SubComponent")),
                MetadataItem::new(ITEM_NO, json!("3.1")),
                MetadataItem::new(QUANTITY, json!(4.0)),
                MetadataItem::new(ITEM_TYPE, json!("SubComponent")),
                MetadataItem::new(ID_NUMBER, json!("abc")),
            ],
        };
        let numbers: Vec<&Value> = file.lookup_all(ITEM_NO).collect();
        assert_eq!(numbers, vec![&json!("2.1"), &json!("3.1")]);
        assert_eq!(file.lookup(ITEM_NO), Some(&json!("3.1")));

        let groups = file.row_groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0][1].value.link, json!(2.0));
        assert_eq!(groups[1][0].value.link, json!("3.1"));
        assert_eq!(groups[2][0].key_name, ID_NUMBER);
    }
}
