use serde_json::Value;

use crate::schema::{FIELDS, NOT_SPECIFIED};

/// The schema field names as a pretty-printed JSON array.
fn field_list() -> String {
    let items: Vec<String> = FIELDS
        .iter()
        .map(|field| format!("  {}", Value::from(*field)))
        .collect();
    format!("[\n{}\n]", items.join(",\n"))
}

/// Join retrieved segment texts into a single context blob.
pub fn build_context<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join("\n\n")
}

pub fn build_extraction_prompt(context: &str) -> String {
    format!(
        r#"Extract RFP information from this document and return ONLY valid JSON with these exact fields:
{}

Rules:
- Use exact field names listed above
- For missing data, use "{}"
- contact_info should be a dict with Name, Email, Phone, Address
- Product Specification should be detailed technical specs
- Return ONLY the JSON, no markdown or extra text

Document Content:
{}

JSON Output:"#,
        field_list(),
        NOT_SPECIFIED,
        context
    )
}
