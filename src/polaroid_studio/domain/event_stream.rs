//! Incremental decoding of the upstream `text/event-stream` body.
//!
//! Chunks may end anywhere, including in the middle of a line or of a UTF-8
//! sequence. [`LineDecoder`] buffers raw bytes and only hands out complete
//! lines; `\n` never occurs inside a multi-byte sequence, so splitting on it
//! before decoding is safe.

use serde::Deserialize;

const DATA_PREFIX: &str = "data: ";

#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them.
    /// The trailing fragment is held back for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(decode_line)
            .collect()
    }

    /// Flushes an unterminated final line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        Some(decode_line(&line))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

// --- Gemini response body (same shape for each SSE event and for the buffered call) ---

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }

    /// All text parts of the first candidate, concatenated.
    pub fn caption_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Text carried by one `data: {json}` line. Other lines and malformed JSON yield `None`.
pub fn event_text(line: &str) -> Option<String> {
    let json = line.strip_prefix(DATA_PREFIX)?.trim();
    if json.is_empty() {
        return None;
    }
    let response: GenerateResponse = serde_json::from_str(json).ok()?;
    response
        .first_text()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{text}\"}}]}}}}]}}\n\n"
        )
    }

    #[test]
    fn test_feed_holds_back_incomplete_line() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.feed(b"data: {\"a\"").is_empty());
        assert_eq!(decoder.feed(b":1}\nnext"), vec!["data: {\"a\":1}"]);
        assert_eq!(decoder.feed(b"\n"), vec!["next"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_split_event_is_neither_lost_nor_duplicated() {
        let stream = format!("{}{}", event("Golden "), event("hour"));
        let bytes = stream.as_bytes();
        for split in 1..bytes.len() {
            let mut decoder = LineDecoder::new();
            let mut texts = Vec::new();
            for chunk in [&bytes[..split], &bytes[split..]] {
                texts.extend(decoder.feed(chunk).iter().filter_map(|l| event_text(l)));
            }
            assert_eq!(texts, vec!["Golden ", "hour"], "split at {split}");
        }
    }

    #[test]
    fn test_multibyte_text_survives_split() {
        let stream = event("Senja di danau ☀");
        let bytes = stream.as_bytes();
        let sun = stream.find('☀').unwrap();
        let mut decoder = LineDecoder::new();
        let mut lines = decoder.feed(&bytes[..sun + 1]);
        lines.extend(decoder.feed(&bytes[sun + 1..]));
        let texts: Vec<String> = lines.iter().filter_map(|l| event_text(l)).collect();
        assert_eq!(texts, vec!["Senja di danau ☀"]);
    }

    #[test]
    fn test_crlf_and_finish() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.feed(b"a\r\nb"), vec!["a"]);
        assert_eq!(decoder.finish().as_deref(), Some("b"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_event_text_ignores_noise() {
        assert_eq!(event_text("data: {not json"), None);
        assert_eq!(event_text("data: "), None);
        assert_eq!(event_text(": keep-alive"), None);
        assert_eq!(event_text("event: message"), None);
        assert_eq!(event_text("data: {\"candidates\":[]}"), None);
        assert_eq!(event_text(event("ok").trim_end()).as_deref(), Some("ok"));
    }

    #[test]
    fn test_caption_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Summer "},{"text":"days"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.caption_text(), "Summer days");
        assert_eq!(GenerateResponse::default().caption_text(), "");
    }
}
