// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logical line reader
//!
//! Decodes a byte stream with the step's character set and hands out one
//! logical record at a time. For delimited files a record may span several
//! physical lines while an enclosure is open; for fixed-width files every
//! physical line is a record.

use crate::config::{Content, FileType};
use crate::source::ByteStream;
use crate::{Error, Result};
use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};
use log::warn;
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 8192;

/// Upper bound on one logical record, in bytes of decoded text
pub const MAX_RECORD_LEN: usize = 1 << 20;

/// How physical lines combine into records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMode {
    Csv {
        delimiter: String,
        enclosure: Option<char>,
        escape: Option<char>,
    },
    Fixed,
}

impl LineMode {
    /// Mode for `content`, with the separator already resolved to `delimiter`
    #[must_use]
    pub fn from_content(content: &Content, delimiter: &str) -> Self {
        match content.file_type {
            FileType::Csv => LineMode::Csv {
                delimiter: delimiter.to_string(),
                enclosure: content.enclosure_char(),
                escape: content.escape_char(),
            },
            FileType::Fixed => LineMode::Fixed,
        }
    }
}

/// Resolve a character set label; blank means UTF-8
pub fn lookup_encoding(label: &str) -> Result<&'static Encoding> {
    let label = label.trim();
    if label.is_empty() {
        return Ok(UTF_8);
    }
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| Error::decode(format!("unknown character set: {}", label)))
}

/// Enclosure state of a delimited record, fed one physical line at a time.
///
/// An enclosure opens only at the start of a field. Inside an enclosure a
/// doubled enclosure is a literal and the closing one may be followed by
/// anything.
#[derive(Debug, Clone, Copy)]
struct RecordScan {
    open: bool,
    field_start: bool,
    just_closed: bool,
    escaped: bool,
}

impl RecordScan {
    fn new() -> Self {
        Self {
            open: false,
            field_start: true,
            just_closed: false,
            escaped: false,
        }
    }

    fn feed(&mut self, text: &str, delimiter: &str, enclosure: char, escape: Option<char>) {
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            if !self.open && !self.escaped && !delimiter.is_empty() && rest.starts_with(delimiter) {
                self.field_start = true;
                self.just_closed = false;
                rest = &rest[delimiter.len()..];
                continue;
            }
            rest = &rest[c.len_utf8()..];

            if self.escaped {
                self.escaped = false;
            } else if escape.is_some_and(|esc| esc == c && esc != enclosure) {
                self.escaped = true;
            } else if c == enclosure {
                if self.open {
                    self.open = false;
                    self.just_closed = true;
                } else if self.field_start || self.just_closed {
                    // just_closed: the second half of a doubled enclosure
                    self.open = true;
                    self.just_closed = false;
                }
            } else {
                self.just_closed = false;
            }
            self.field_start = false;
        }
    }
}

pub struct LineReader {
    stream: ByteStream,
    decoder: Decoder,
    mode: LineMode,
    pending: String,
    eof: bool,
    malformed: Option<String>,
    physical_lines: usize,
}

impl LineReader {
    pub fn new(stream: ByteStream, encoding: &str, mode: LineMode) -> Result<Self> {
        let encoding = lookup_encoding(encoding)?;
        Ok(Self {
            stream,
            decoder: encoding.new_decoder_with_bom_removal(),
            mode,
            pending: String::new(),
            eof: false,
            malformed: None,
            physical_lines: 0,
        })
    }

    /// Next logical record, or `None` at end of stream.
    ///
    /// A record left open at end of stream, or one that grows past
    /// `MAX_RECORD_LEN`, is returned as read so far.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        let Some(mut line) = self.next_physical().await? else {
            return Ok(None);
        };
        let LineMode::Csv {
            delimiter,
            enclosure: Some(enclosure),
            escape,
        } = &self.mode
        else {
            return Ok(Some(line));
        };
        let (delimiter, enclosure, escape) = (delimiter.clone(), *enclosure, *escape);

        let mut scan = RecordScan::new();
        scan.feed(&line, &delimiter, enclosure, escape);
        while scan.open {
            if line.len() > MAX_RECORD_LEN {
                warn!(
                    "record ending at line {} exceeds {} bytes; enclosure left open",
                    self.physical_lines, MAX_RECORD_LEN
                );
                break;
            }
            let Some(more) = self.next_physical().await? else {
                break;
            };
            scan.feed("\n", &delimiter, enclosure, escape);
            scan.feed(&more, &delimiter, enclosure, escape);
            line.push('\n');
            line.push_str(&more);
        }
        Ok(Some(line))
    }

    /// Physical lines consumed so far
    #[must_use]
    pub fn physical_lines(&self) -> usize {
        self.physical_lines
    }

    async fn next_physical(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(i) = self.pending.find(|c: char| c == '\n' || c == '\r') {
                let consumed = if self.pending[i..].starts_with("\r\n") {
                    i + 2
                } else if i + 1 == self.pending.len() && !self.eof && self.pending.ends_with('\r') {
                    // A trailing CR may be the first half of CRLF
                    self.fill().await?;
                    continue;
                } else {
                    i + 1
                };
                let line = self.pending[..i].to_string();
                let _ = self.pending.drain(..consumed);
                self.physical_lines += 1;
                return Ok(Some(line));
            }

            if self.eof {
                if let Some(msg) = self.malformed.take() {
                    return Err(Error::Decode(msg));
                }
                if self.pending.is_empty() {
                    return Ok(None);
                }
                self.physical_lines += 1;
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.stream.read(&mut chunk).await?;
        let last = n == 0;
        let mut input = &chunk[..n];
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .ok_or_else(|| Error::decode("decode buffer overflow"))?;
            self.pending.reserve(needed);
            let (result, read) =
                self.decoder
                    .decode_to_string_without_replacement(input, &mut self.pending, last);
            input = &input[read..];
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(_, _) => {
                    self.malformed = Some(format!(
                        "malformed {} input after line {}",
                        self.decoder.encoding().name(),
                        self.physical_lines
                    ));
                    self.eof = true;
                    return Ok(());
                }
            }
        }
        if last {
            self.eof = true;
        }
        Ok(())
    }
}

/// Split a delimited record into field values, removing enclosures and
/// resolving escapes. An enclosure opens only at the start of a field; a
/// doubled enclosure inside an enclosed value is a literal enclosure.
#[must_use]
pub fn split_fields(
    line: &str,
    delimiter: &str,
    enclosure: Option<char>,
    escape: Option<char>,
) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_enclosure = false;
    let mut field_start = true;
    let mut rest = line;

    while let Some(c) = rest.chars().next() {
        if !in_enclosure && !delimiter.is_empty() && rest.starts_with(delimiter) {
            fields.push(std::mem::take(&mut current));
            field_start = true;
            rest = &rest[delimiter.len()..];
            continue;
        }
        rest = &rest[c.len_utf8()..];

        if escape.is_some_and(|esc| esc == c && Some(esc) != enclosure) {
            if let Some(next) = rest.chars().next() {
                current.push(next);
                rest = &rest[next.len_utf8()..];
            }
        } else if Some(c) == enclosure && in_enclosure {
            if rest.starts_with(c) {
                current.push(c);
                rest = &rest[c.len_utf8()..];
            } else {
                in_enclosure = false;
            }
        } else if Some(c) == enclosure && field_start {
            in_enclosure = true;
        } else {
            current.push(c);
        }
        field_start = false;
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: &'static [u8], encoding: &str, mode: LineMode) -> LineReader {
        LineReader::new(Box::pin(bytes), encoding, mode).unwrap()
    }

    async fn all_lines(mut r: LineReader) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = r.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    fn csv() -> LineMode {
        LineMode::Csv {
            delimiter: ";".to_string(),
            enclosure: Some('"'),
            escape: None,
        }
    }

    fn scan(lines: &[&str], escape: Option<char>) -> bool {
        let mut scan = RecordScan::new();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                scan.feed("\n", ";", '"', escape);
            }
            scan.feed(line, ";", '"', escape);
        }
        scan.open
    }

    #[tokio::test]
    async fn test_terminators() {
        let r = reader(b"a\nb\r\nc\rd", "", LineMode::Fixed);
        assert_eq!(all_lines(r).await, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_trailing_newline_adds_no_line() {
        let r = reader(b"line1\nline2\n", "UTF-8", LineMode::Fixed);
        assert_eq!(all_lines(r).await, vec!["line1", "line2"]);
    }

    #[tokio::test]
    async fn test_enclosed_newline_joins_records() {
        let r = reader(b"id;note\n1;\"two\nlines\"\n2;plain\n", "", csv());
        assert_eq!(all_lines(r).await, vec!["id;note", "1;\"two\nlines\"", "2;plain"]);
    }

    #[tokio::test]
    async fn test_fixed_mode_ignores_enclosures() {
        let r = reader(b"ab\"cd\nef\n", "", LineMode::Fixed);
        assert_eq!(all_lines(r).await, vec!["ab\"cd", "ef"]);
    }

    #[tokio::test]
    async fn test_latin1_decoding() {
        let r = reader(b"caf\xe9\n", "ISO-8859-1", LineMode::Fixed);
        assert_eq!(all_lines(r).await, vec!["café"]);
    }

    #[tokio::test]
    async fn test_utf16_decoding() {
        let r = reader(b"a\x00\n\x00b\x00", "UTF-16LE", LineMode::Fixed);
        assert_eq!(all_lines(r).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_bom_removed() {
        let r = reader(b"\xef\xbb\xbfhead\n", "UTF-8", LineMode::Fixed);
        assert_eq!(all_lines(r).await, vec!["head"]);
    }

    #[tokio::test]
    async fn test_malformed_input_after_good_lines() {
        let mut r = reader(b"ok1\nok2\nbad\xff\n", "UTF-8", LineMode::Fixed);
        assert_eq!(r.next_line().await.unwrap().as_deref(), Some("ok1"));
        assert_eq!(r.next_line().await.unwrap().as_deref(), Some("ok2"));
        assert!(matches!(r.next_line().await, Err(Error::Decode(_))));
    }

    #[test]
    fn test_unknown_encoding() {
        let result = LineReader::new(Box::pin(&b""[..]), "klingon", LineMode::Fixed);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("a;b;;c", ";", Some('"'), None), vec!["a", "b", "", "c"]);
        assert_eq!(
            split_fields("\"x;y\";\"say \"\"hi\"\"\"", ";", Some('"'), None),
            vec!["x;y", "say \"hi\""]
        );
        assert_eq!(split_fields("a\\;b;c", ";", Some('"'), Some('\\')), vec!["a;b", "c"]);
        assert_eq!(split_fields("one||two", "||", None, None), vec!["one", "two"]);
        assert_eq!(split_fields("", ",", None, None), vec![""]);
        assert_eq!(
            split_fields("id;5\" pipe;\"x\"", ";", Some('"'), None),
            vec!["id", "5\" pipe", "x"]
        );
    }

    #[test]
    fn test_enclosure_state() {
        assert!(scan(&["1;\"two"], None));
        assert!(!scan(&["1;\"two\""], None));
        assert!(!scan(&["\"a\"\"b\""], None));
        assert!(scan(&["\"a\\\"b"], Some('\\')));
        assert!(!scan(&["1;\"two", "lines\";3"], None));
        // Quotes inside a field are literal
        assert!(!scan(&["id;5\" pipe"], None));
        assert!(!scan(&["a\"b;c"], None));
        // An escaped line break stays inside the enclosure
        assert!(scan(&["\"a\\", "b"], Some('\\')));
    }

    #[tokio::test]
    async fn test_mid_field_quote_does_not_join() {
        let r = reader(b"id;5\" pipe\n1;2\n3;4\n", "", csv());
        assert_eq!(all_lines(r).await, vec!["id;5\" pipe", "1;2", "3;4"]);
    }

    #[tokio::test]
    async fn test_unclosed_record_is_bounded() {
        let mut text = b"\"never closed\n".to_vec();
        let row = "x".repeat(1023);
        for _ in 0..(MAX_RECORD_LEN / 1024 + 8) {
            text.extend_from_slice(row.as_bytes());
            text.push(b'\n');
        }
        text.extend_from_slice(b"tail\n");
        let total_lines = MAX_RECORD_LEN / 1024 + 10;

        let mut r = LineReader::new(Box::pin(std::io::Cursor::new(text)), "", csv()).unwrap();
        let first = r.next_line().await.unwrap().unwrap();
        assert!(first.len() > MAX_RECORD_LEN);
        assert!(first.len() < MAX_RECORD_LEN + 2048);
        assert!(r.physical_lines() < total_lines);
    }

    #[tokio::test]
    async fn test_physical_lines_counts_joined_records() {
        let mut r = reader(b"a;\"b\nc\"\nd\n", "", csv());
        assert_eq!(r.next_line().await.unwrap().as_deref(), Some("a;\"b\nc\""));
        assert_eq!(r.physical_lines(), 2);
        assert_eq!(r.next_line().await.unwrap().as_deref(), Some("d"));
        assert_eq!(r.physical_lines(), 3);
    }
}
