//! Figure and table caption detection.
//!
//! Scans extracted document text for caption lines and reports them as
//! structured references. The patterns accept the forms that show up in
//! real papers: `Figure 1:`, `Fig. 1.`, `Figure 1 -`, a bare `Figure 1`,
//! and lettered variants like `Figure 1A:`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// What a caption labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionKind {
    Figure,
    Table,
}

impl std::fmt::Display for CaptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionKind::Figure => write!(f, "figure"),
            CaptionKind::Table => write!(f, "table"),
        }
    }
}

/// A caption found in document text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionRef {
    pub kind: CaptionKind,
    /// Caption number as printed, e.g. "3" or "2A".
    pub number: String,
    /// Zero-based line index in the scanned text.
    pub line: usize,
    /// The full caption line.
    pub text: String,
}

/// Scans text for figure/table captions.
pub struct CaptionScanner;

fn figure_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^(Figure|Fig\.?)\s+\d+\s*[:.]",
            r"(?i)^(Figure|Fig\.?)\s+\d+\s*[-\u{2013}]",
            r"(?i)^(Figure|Fig\.?)\s+\d+$",
            r"(?i)^(Figure|Fig\.?)\s+\d+[A-Za-z]$",
            r"(?i)^(Figure|Fig\.?)\s+\d+[A-Za-z]\s*[:.]",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
    })
}

fn table_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^(Table)\s+\d+\s*[:.]",
            r"(?i)^(Table)\s+\d+\s*[-\u{2013}]",
            r"(?i)^(Table)\s+\d+$",
            r"(?i)^(Table)\s+\d+[A-Za-z]$",
            r"(?i)^(Table)\s+\d+[A-Za-z]\s*[:.]",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
    })
}

fn figure_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(Figure|Fig\.?)\s*(\d+[A-Za-z]?)").expect("static regex"))
}

fn table_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(Table)\s*(\d+[A-Za-z]?)").expect("static regex"))
}

impl CaptionScanner {
    /// Find every figure and table caption in `text`.
    pub fn scan(text: &str) -> Vec<CaptionRef> {
        let mut captions = Vec::new();

        for (line_idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if figure_patterns().iter().any(|p| p.is_match(line)) {
                let number = figure_number()
                    .captures(line)
                    .and_then(|c| c.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                captions.push(CaptionRef {
                    kind: CaptionKind::Figure,
                    number,
                    line: line_idx,
                    text: line.to_string(),
                });
                continue;
            }

            if table_patterns().iter().any(|p| p.is_match(line)) {
                let number = table_number()
                    .captures(line)
                    .and_then(|c| c.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                captions.push(CaptionRef {
                    kind: CaptionKind::Table,
                    number,
                    line: line_idx,
                    text: line.to_string(),
                });
            }
        }

        captions
    }
}
