//! Sentence / paragraph splitter.
//!
//! Keeps the original entry and adds one entry per chunk. Chunk ids point
//! back at the parent with a `#char={start},{end}` fragment (character
//! offsets). Text that forms a single chunk is left alone.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use sentir_core::record::ID_KEY;
use sentir_core::{models, Activity, ParamSpec, ParamSpecs, PluginBehavior, PluginContext, Record, Result};

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?\s][^.!?]*(?:[.!?]+|$)").expect("sentence pattern must compile"));

/// How to chunk the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Sentence,
    Paragraph,
}

impl Delimiter {
    fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("paragraph") => Delimiter::Paragraph,
            _ => Delimiter::Sentence,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Split;

impl Split {
    pub fn new() -> Self {
        Self
    }
}

/// Byte ranges of the chunks in `text`, whitespace trimmed.
pub fn spans(text: &str, delimiter: Delimiter) -> Vec<(usize, usize)> {
    match delimiter {
        Delimiter::Sentence => SENTENCE
            .find_iter(text)
            .map(|m| (m.start(), m.start() + m.as_str().trim_end().len()))
            .filter(|(start, end)| end > start)
            .collect(),
        Delimiter::Paragraph => {
            let mut out = Vec::new();
            let mut offset = 0;
            for line in text.split_inclusive('\n') {
                let content = line.trim_end_matches(['\n', '\r']);
                if !content.trim().is_empty() {
                    out.push((offset, offset + content.len()));
                }
                offset += line.len();
            }
            out
        }
    }
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Document part of an entry id and the character offset the entry starts
/// at within it (`doc#char=12,40` gives `("doc", 12)`).
fn document_of(id: &str) -> (String, usize) {
    match id.split_once("#char=") {
        Some((document, range)) => {
            let start = range
                .split(',')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            (document.to_string(), start)
        }
        None => (id.to_string(), 0),
    }
}

#[async_trait]
impl PluginBehavior for Split {
    async fn analyse_entry(
        &self,
        entry: Record,
        activity: &Activity,
        _ctx: &PluginContext,
    ) -> Result<Vec<Record>> {
        let delimiter = Delimiter::from_param(activity.param_str("delimiter"));
        let text = entry.get_str("nif:isString").unwrap_or_default().to_string();
        let chunks = spans(&text, delimiter);
        if chunks.len() <= 1 {
            return Ok(vec![entry]);
        }

        let parent = entry.id_ref().map(document_of);
        let mut out = Vec::with_capacity(chunks.len() + 1);
        out.push(entry);
        for (start, end) in chunks {
            let mut chunk = models::entry(&text[start..end]);
            if let Some((document, base)) = &parent {
                chunk.set(
                    ID_KEY,
                    format!(
                        "{}#char={},{}",
                        document,
                        base + char_offset(&text, start),
                        base + char_offset(&text, end)
                    ),
                );
            }
            out.push(chunk);
        }
        Ok(out)
    }

    fn extra_params(&self) -> ParamSpecs {
        let mut specs = ParamSpecs::new();
        specs.insert(
            "delimiter".into(),
            ParamSpec::required()
                .with_aliases(&["type", "t"])
                .with_default(json!("sentence"))
                .with_options(vec![json!("sentence"), json!("paragraph")])
                .with_description("Split text into paragraphs or sentences."),
        );
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentir_core::Params;

    fn activity(delimiter: &str) -> Activity {
        let mut params = Params::new();
        params.insert("delimiter".into(), json!(delimiter));
        Activity::new("split", "endpoint:plugins/split_0.3", params)
    }

    async fn run(entry: Record, delimiter: &str) -> Vec<Record> {
        Split::new()
            .analyse_entry(entry, &activity(delimiter), &PluginContext::in_memory("split"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sentences() {
        let out = run(models::entry("Hello. World."), "sentence").await;
        let texts: Vec<_> = out.iter().map(|e| e.get_str("nif:isString").unwrap()).collect();
        assert_eq!(texts, vec!["Hello. World.", "Hello.", "World."]);
    }

    #[tokio::test]
    async fn test_paragraph_ids_point_at_parent() {
        let entry = models::entry("Hello\nWorld").with(ID_KEY, ":test");
        let out = run(entry, "paragraph").await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].id_ref(), Some(":test#char=0,5"));
        assert_eq!(out[2].id_ref(), Some(":test#char=6,11"));
        assert_eq!(out[2].get_str("nif:isString"), Some("World"));
    }

    #[tokio::test]
    async fn test_single_chunk_is_untouched() {
        let out = run(models::entry("Just one sentence."), "sentence").await;
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_offsets_count_characters() {
        let text = "Ça va. Très bien.";
        let chunks = spans(text, Delimiter::Sentence);
        assert_eq!(chunks.len(), 2);
        let (start, end) = chunks[1];
        assert_eq!(&text[start..end], "Très bien.");
        assert_eq!(char_offset(text, start), 7);
        assert_eq!(char_offset(text, end), 17);
    }

    #[tokio::test]
    async fn test_nested_chunks_keep_document_offsets() {
        let entry = models::entry("Two. Three.").with(ID_KEY, "http://example.org/doc#char=5,16");
        let out = run(entry, "sentence").await;
        assert_eq!(out[1].id_ref(), Some("http://example.org/doc#char=5,9"));
        assert_eq!(out[2].id_ref(), Some("http://example.org/doc#char=10,16"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(spans("a\n\n  \nb\n", Delimiter::Paragraph), vec![(0, 1), (6, 7)]);
    }
}
