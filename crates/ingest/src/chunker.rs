use unicode_segmentation::UnicodeSegmentation;

use crate::segment::Segment;

const TOKENS_PER_WORD: f64 = 1.3;

pub struct ChunkerConfig {
    pub target_tokens_max: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_tokens_max: 400,
            overlap_tokens: 40,
        }
    }
}

/// Splits extracted document text into retrieval-sized segments.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str, source: &str) -> Vec<Segment> {
        let text = text.replace("\r\n", "\n").replace('\u{c}', "\n\n");
        let mut pieces: Vec<String> = Vec::new();

        for section in self.split_by_headings(&text) {
            // Small sections stay whole
            if estimate_tokens(&section) <= self.config.target_tokens_max {
                let trimmed = section.trim();
                if !trimmed.is_empty() {
                    pieces.push(trimmed.to_string());
                }
                continue;
            }

            let max = self.config.target_tokens_max;
            let mut buffer = String::new();
            let mut buffer_words = 0;

            for unit in self.split_units(&section) {
                let unit_words = word_count(&unit);

                // If adding this unit exceeds max, flush buffer
                if buffer_words > 0 && tokens_for_words(buffer_words + unit_words) > max {
                    pieces.push(buffer.trim().to_string());

                    // Start new buffer with overlap, unless it would push the unit over max
                    let overlap = self.get_overlap(&buffer, self.config.overlap_tokens);
                    let overlap_words = word_count(&overlap);
                    buffer.clear();
                    buffer_words = 0;
                    if overlap_words > 0 && tokens_for_words(overlap_words + unit_words) <= max {
                        buffer.push_str(&overlap);
                        buffer.push_str("\n\n");
                        buffer_words = overlap_words;
                    }
                }

                buffer.push_str(&unit);
                buffer.push_str("\n\n");
                buffer_words += unit_words;
            }

            if !buffer.trim().is_empty() {
                pieces.push(buffer.trim().to_string());
            }
        }

        pieces
            .into_iter()
            .enumerate()
            .map(|(ordinal, piece)| {
                Segment::new(doc_id.to_string(), piece, source.to_string(), ordinal)
            })
            .collect()
    }

    fn split_by_headings(&self, text: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current_section = String::new();

        for line in text.lines() {
            if line.trim_start().starts_with('#') && !current_section.trim().is_empty() {
                sections.push(std::mem::take(&mut current_section));
            }
            current_section.push_str(line);
            current_section.push('\n');
        }

        if !current_section.is_empty() {
            sections.push(current_section);
        }

        sections
    }

    /// Paragraphs, with oversized paragraphs broken into sentences and
    /// oversized sentences into word windows.
    fn split_units(&self, section: &str) -> Vec<String> {
        let max = self.config.target_tokens_max;
        let mut units = Vec::new();

        for para in section.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            if estimate_tokens(para) <= max {
                units.push(para.to_string());
                continue;
            }

            for sentence in para.unicode_sentences().map(str::trim).filter(|s| !s.is_empty()) {
                if estimate_tokens(sentence) <= max {
                    units.push(sentence.to_string());
                } else {
                    units.extend(word_windows(sentence, words_for_tokens(max)));
                }
            }
        }

        units
    }

    fn get_overlap(&self, text: &str, target_tokens: usize) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        let target_words = words_for_tokens(target_tokens);

        // Repeating the whole previous chunk is not an overlap
        if target_words == 0 || words.len() <= target_words {
            return String::new();
        }

        words[words.len() - target_words..].join(" ")
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

/// Rough token estimate: 1.3 tokens per whitespace-separated word.
fn estimate_tokens(text: &str) -> usize {
    tokens_for_words(word_count(text))
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn tokens_for_words(words: usize) -> usize {
    (words as f64 * TOKENS_PER_WORD) as usize
}

fn words_for_tokens(tokens: usize) -> usize {
    (tokens as f64 / TOKENS_PER_WORD) as usize
}

fn word_windows(text: &str, window: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(window.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_chunker() -> Chunker {
        Chunker::new(ChunkerConfig {
            target_tokens_max: 13, // 10 words
            overlap_tokens: 2,     // 1 word
        })
    }

    #[test]
    fn test_basic_chunking() {
        let chunker = Chunker::default();
        let text = "This is a test paragraph.\n\nThis is another paragraph.";
        let segments = chunker.chunk_text("test-doc", text, "test.html");

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].doc_id, "test-doc");
        assert_eq!(segments[0].source, "test.html");
        assert!(segments[0].text.contains("another paragraph"));
    }

    #[test]
    fn blank_text_produces_no_segments() {
        let chunker = Chunker::default();
        assert!(chunker.chunk_text("doc", "  \n\n \n", "x.pdf").is_empty());
    }

    #[test]
    fn headings_start_new_sections() {
        let chunker = Chunker::default();
        let text = "# Scope\nSupply of laptops.\n# Terms\nNet 30.";
        let segments = chunker.chunk_text("doc", text, "rfp.html");

        assert_eq!(segments.len(), 2);
        assert!(segments[0].text.starts_with("# Scope"));
        assert!(segments[1].text.starts_with("# Terms"));
        assert_eq!(segments[1].ordinal, 1);
    }

    #[test]
    fn long_sections_are_packed_under_the_limit_with_overlap() {
        let chunker = small_chunker();
        let text = "one two three four five six\n\nseven eight nine ten eleven twelve\n\nthirteen fourteen";
        let segments = chunker.chunk_text("doc", text, "rfp.pdf");

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "one two three four five six");
        // last word of the previous chunk is carried over
        assert!(segments[1].text.starts_with("six"));
        assert!(segments[1].text.contains("seven"));
    }

    #[test]
    fn overlap_never_pushes_a_segment_over_the_limit() {
        let chunker = small_chunker();
        let paragraphs: Vec<String> = (0..3)
            .map(|p| (0..10).map(|w| format!("p{p}w{w}")).collect::<Vec<_>>().join(" "))
            .collect();
        let text = paragraphs.join("\n\n");
        let segments = chunker.chunk_text("doc", &text, "rfp.pdf");

        assert_eq!(segments.len(), 3);
        for segment in &segments {
            assert!(estimate_tokens(&segment.text) <= 13, "{}", segment.text);
        }
        // a full-size paragraph leaves no room for the carried-over word
        assert!(segments[1].text.starts_with("p1w0"));
    }

    #[test]
    fn oversized_sentences_are_split_into_word_windows() {
        let chunker = small_chunker();
        let words: Vec<String> = (0..25).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let segments = chunker.chunk_text("doc", &text, "rfp.pdf");

        assert!(segments.len() >= 3);
        for segment in &segments {
            assert!(segment.text.split_whitespace().count() <= 11);
        }
        assert!(segments.iter().any(|s| s.text.contains("w24")));
    }

    #[test]
    fn form_feeds_act_as_paragraph_breaks() {
        let chunker = small_chunker();
        let text = "page one has some words here\u{c}page two has other words too";
        let segments = chunker.chunk_text("doc", text, "rfp.pdf");

        assert_eq!(segments.len(), 2);
        assert!(segments[0].text.starts_with("page one"));
        assert!(segments[1].text.contains("page two"));
    }
}
