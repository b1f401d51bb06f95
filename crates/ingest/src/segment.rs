use sha2::{Digest, Sha256};

/// A contiguous unit of document text used for embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub doc_id: String,
    pub segment_id: String,
    pub text: String,
    pub source: String,
    pub ordinal: usize, // position within the source document
}

impl Segment {
    pub fn new(doc_id: String, text: String, source: String, ordinal: usize) -> Self {
        let segment_id = Self::generate_segment_id(&doc_id, &text, ordinal);

        Self {
            doc_id,
            segment_id,
            text,
            source,
            ordinal,
        }
    }

    fn generate_segment_id(doc_id: &str, text: &str, ordinal: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(ordinal.to_le_bytes());
        hasher.update(text.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}
