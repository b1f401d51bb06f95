use serde_json::{Map, Value};

/// Placeholder for a field the documents do not mention.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Placeholder for every field when the whole extraction failed.
pub const EXTRACTION_FAILED: &str = "Extraction failed";

/// Field holding the nested contact object.
pub const CONTACT_INFO: &str = "contact_info";

/// Keys of the nested `contact_info` object.
pub const CONTACT_KEYS: [&str; 4] = ["Name", "Email", "Phone", "Address"];

/// Target fields, in output order.
pub const FIELDS: [&str; 20] = [
    "Bid Number",
    "Title",
    "Due Date",
    "Bid Submission Type",
    "Term of Bid",
    "Pre Bid Meeting",
    "Installation",
    "Bid Bond Requirement",
    "Delivery Date",
    "Payment Terms",
    "Any Additional Documentation Required",
    "MFG for Registration",
    "Contract or Cooperative to use",
    "Model_no",
    "Part_no",
    "Product",
    CONTACT_INFO,
    "company_name",
    "Bid Summary",
    "Product Specification",
];

/// One folder's extracted bid metadata.
///
/// After normalization every entry of [`FIELDS`] is present. Keys the model
/// added on its own follow the schema fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRecord(Map<String, Value>);

impl ExtractionRecord {
    pub(crate) fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Record used when the pipeline failed for a folder.
    pub fn failed() -> Self {
        let map = FIELDS
            .iter()
            .map(|field| (field.to_string(), Value::from(EXTRACTION_FAILED)))
            .collect();
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Number of fields, extras included.
    pub fn field_count(&self) -> usize {
        self.0.len()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Keys outside the schema, in model order.
    pub fn extras(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .filter(|(key, _)| !FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn is_failed(&self) -> bool {
        FIELDS
            .iter()
            .all(|field| self.get_str(field) == Some(EXTRACTION_FAILED))
    }

    /// Pretty JSON with two-space indentation.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_has_twenty_unique_fields() {
        let mut names = FIELDS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 20);
    }

    #[test]
    fn failed_record_marks_every_field() {
        let record = ExtractionRecord::failed();

        assert_eq!(record.field_count(), FIELDS.len());
        assert!(record.is_failed());
        assert_eq!(record.get_str(CONTACT_INFO), Some(EXTRACTION_FAILED));
        assert_eq!(record.field_names().collect::<Vec<_>>(), FIELDS.to_vec());
    }

    #[test]
    fn pretty_json_keeps_schema_order() {
        let json = ExtractionRecord::failed().to_pretty_json().unwrap();

        assert!(json.starts_with("{\n  \"Bid Number\": \"Extraction failed\""));
        let title = json.find("\"Title\"").unwrap();
        let product_spec = json.find("\"Product Specification\"").unwrap();
        assert!(title < product_spec);
    }
}
