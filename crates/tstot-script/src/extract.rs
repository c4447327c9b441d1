//! Trim call extraction.
//!
//! A trim is recognised only as the exact, gap-free token run
//! `Trim ( <number> , <number> )`. Any whitespace, sign or other character
//! inside the call breaks the match and the text is ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScriptError};
use crate::tokenizer::{tokenize, SpannedToken, Token};

const TRIM_IDENT: &str = "Trim";

/// An inclusive range of frame numbers taken from one `Trim` call.
///
/// `start_frame > end_frame` is representable; the resolver rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrimRange {
    pub start_frame: u32,
    pub end_frame: u32,
}

impl TrimRange {
    pub fn new(start_frame: u32, end_frame: u32) -> Self {
        Self {
            start_frame,
            end_frame,
        }
    }

    /// True when the range runs backwards.
    pub fn is_inverted(&self) -> bool {
        self.start_frame > self.end_frame
    }
}

impl fmt::Display for TrimRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start_frame, self.end_frame)
    }
}

/// Extract every trim range from script text, in script order.
pub fn extract_trim_ranges(script: &str) -> Result<Vec<TrimRange>> {
    let tokens = tokenize(script);
    let mut ranges = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        match match_trim(&tokens[i..]) {
            Some((start, end)) => {
                ranges.push(TrimRange::new(frame_number(start)?, frame_number(end)?));
                i += 6;
            }
            None => i += 1,
        }
    }

    tracing::debug!("Extracted {} trim range(s)", ranges.len());
    Ok(ranges)
}

/// Extract trim ranges from raw script bytes, which must be UTF-8.
pub fn extract_from_bytes(bytes: &[u8]) -> Result<Vec<TrimRange>> {
    let text = std::str::from_utf8(bytes).map_err(|e| ScriptError::EncodingError {
        valid_up_to: e.valid_up_to(),
    })?;
    extract_trim_ranges(text)
}

/// Number literal text and its byte offset.
type Literal<'src> = (&'src str, usize);

/// Match `Trim ( n , n )` at the head of `tokens`, returning the two numbers.
fn match_trim<'src>(tokens: &[SpannedToken<'src>]) -> Option<(Literal<'src>, Literal<'src>)> {
    let run = tokens.get(..6)?;

    if run.windows(2).any(|pair| pair[0].span.end != pair[1].span.start) {
        return None;
    }

    match (
        run[0].token,
        run[1].token,
        run[2].token,
        run[3].token,
        run[4].token,
        run[5].token,
    ) {
        (
            Token::Ident(TRIM_IDENT),
            Token::LParen,
            Token::Number(start),
            Token::Comma,
            Token::Number(end),
            Token::RParen,
        ) => Some(((start, run[2].span.start), (end, run[4].span.start))),
        _ => None,
    }
}

fn frame_number((text, offset): Literal<'_>) -> Result<u32> {
    text.parse().map_err(|_| ScriptError::FrameNumberOverflow {
        value: text.to_string(),
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_script_order() {
        let script = "src = LWLibavVideoSource(\"in.ts\")\n\
                      Trim(193,3188) ++ Trim(4988,22040)\n\
                      Trim(23839,46345) ++ Trim(48145,48743)\n";
        let ranges = extract_trim_ranges(script).unwrap();
        assert_eq!(
            ranges,
            vec![
                TrimRange::new(193, 3188),
                TrimRange::new(4988, 22040),
                TrimRange::new(23839, 46345),
                TrimRange::new(48145, 48743),
            ]
        );
    }

    #[test]
    fn test_whitespace_inside_call_is_ignored() {
        let ranges = extract_trim_ranges("Trim( 1,2) Trim(3 ,4) Trim (5,6) Trim(7,8)").unwrap();
        assert_eq!(ranges, vec![TrimRange::new(7, 8)]);
    }

    #[test]
    fn test_case_sensitive_and_whole_identifier() {
        let ranges = extract_trim_ranges("trim(1,2) TRIM(3,4) MyTrim(5,6) Trimmed(7,8)").unwrap();
        assert!(ranges.is_empty());
    }

    #[test]
    fn test_signs_and_fractions_rejected() {
        let ranges = extract_trim_ranges("Trim(-1,2) Trim(1,+2) Trim(1.5,2) Trim(1,2x)").unwrap();
        assert!(ranges.is_empty());
    }

    #[test]
    fn test_duplicates_and_inverted_ranges_kept() {
        let ranges = extract_trim_ranges("Trim(10,20)Trim(10,20)Trim(30,5)").unwrap();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0], ranges[1]);
        assert!(ranges[2].is_inverted());
    }

    #[test]
    fn test_no_trims() {
        assert!(extract_trim_ranges("").unwrap().is_empty());
        assert!(extract_trim_ranges("return last").unwrap().is_empty());
    }

    #[test]
    fn test_overflow_reports_offset() {
        let err = extract_trim_ranges("x Trim(4294967296,1)").unwrap_err();
        match err {
            ScriptError::FrameNumberOverflow { value, offset } => {
                assert_eq!(value, "4294967296");
                assert_eq!(offset, 7);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_utf8() {
        let err = extract_from_bytes(b"Trim(1,2)\xff").unwrap_err();
        assert!(matches!(err, ScriptError::EncodingError { valid_up_to: 9 }));
    }

    #[test]
    fn test_display() {
        assert_eq!(TrimRange::new(193, 3188).to_string(), "[193, 3188]");
    }
}
