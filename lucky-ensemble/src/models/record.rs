//! Input records supplied by the record source
//!
//! Records and draw results are produced by the ingestion layer and are
//! read-only here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of content a record was ingested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// News article
    News,
    /// Social media post
    Social,
    /// Dream interpretation entry
    Dream,
    /// Folklore / astrology entry
    Astrology,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::News => "news",
            SourceKind::Social => "social",
            SourceKind::Dream => "dream",
            SourceKind::Astrology => "astrology",
        }
    }

    /// News and social content
    pub fn is_text_media(&self) -> bool {
        matches!(self, SourceKind::News | SourceKind::Social)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = lucky_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "news" => Ok(SourceKind::News),
            "social" => Ok(SourceKind::Social),
            "dream" => Ok(SourceKind::Dream),
            "astrology" => Ok(SourceKind::Astrology),
            other => Err(lucky_common::Error::InvalidInput(format!(
                "Unknown source kind: {}",
                other
            ))),
        }
    }
}

/// Ingestion processing status; only `Ready` records are analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Ready,
    Rejected,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Ready => "ready",
            ProcessingStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = lucky_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "ready" => Ok(ProcessingStatus::Ready),
            "rejected" => Ok(ProcessingStatus::Rejected),
            other => Err(lucky_common::Error::InvalidInput(format!(
                "Unknown processing status: {}",
                other
            ))),
        }
    }
}

/// Timestamped unit of external content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub source_kind: SourceKind,
    pub raw_text: String,
    /// Numbers pre-extracted by the ingestion layer
    pub extracted_numbers: Vec<String>,
    pub keywords: Vec<String>,
    /// Sentiment score (0.0-1.0)
    pub sentiment: f64,
    /// Relevance score (0.0-1.0)
    pub relevance: f64,
    pub timestamp: DateTime<Utc>,
    pub processing_status: ProcessingStatus,
}

impl Record {
    /// Create a ready record with neutral sentiment and full relevance
    pub fn new(source_kind: SourceKind, raw_text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_kind,
            raw_text: raw_text.into(),
            extracted_numbers: Vec::new(),
            keywords: Vec::new(),
            sentiment: 0.5,
            relevance: 1.0,
            timestamp,
            processing_status: ProcessingStatus::Ready,
        }
    }

    pub fn with_numbers<I, S>(mut self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extracted_numbers = numbers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set sentiment, clamped to 0.0-1.0
    pub fn with_sentiment(mut self, sentiment: f64) -> Self {
        self.sentiment = clamp_unit(sentiment);
        self
    }

    /// Set relevance, clamped to 0.0-1.0
    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = clamp_unit(relevance);
        self
    }

    pub fn with_status(mut self, status: ProcessingStatus) -> Self {
        self.processing_status = status;
        self
    }

    /// Numeric tokens carried by this record
    ///
    /// Uses the pre-extracted numbers when present, otherwise scans digit
    /// runs out of the raw text. Non-numeric extracted tokens are dropped.
    pub fn number_tokens(&self) -> Vec<String> {
        if self.extracted_numbers.is_empty() {
            return digit_runs(&self.raw_text);
        }

        self.extracted_numbers
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .collect()
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Maximal runs of ASCII digits in `text`, in order of appearance
pub fn digit_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

/// Historical lottery outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub draw_date: NaiveDate,
    /// Winning number as a digit string (usually 6 digits)
    pub winning_number: String,
}

impl DrawResult {
    pub fn new(draw_date: NaiveDate, winning_number: impl Into<String>) -> Self {
        Self {
            draw_date,
            winning_number: winning_number.into(),
        }
    }

    /// Last `n` digits of the winning number
    pub fn tail(&self, n: usize) -> Option<&str> {
        let len = self.winning_number.len();
        if n == 0 || len < n || !self.winning_number.is_ascii() {
            return None;
        }
        Some(&self.winning_number[len - n..])
    }

    /// Final digit of the winning number
    pub fn last_digit(&self) -> Option<u32> {
        self.winning_number.chars().last().and_then(|c| c.to_digit(10))
    }

    /// All contiguous substrings of length `n`, left to right
    pub fn substrings(&self, n: usize) -> Vec<&str> {
        let len = self.winning_number.len();
        if n == 0 || len < n || !self.winning_number.is_ascii() {
            return Vec::new();
        }
        (0..=len - n).map(|i| &self.winning_number[i..i + n]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_runs() {
        assert_eq!(
            digit_runs("Lottery 2024: 23 winners, code 456789!"),
            vec!["2024", "23", "456789"]
        );
        assert_eq!(digit_runs("no digits here"), Vec::<String>::new());
        assert_eq!(digit_runs("07"), vec!["07"]);
    }

    #[test]
    fn test_number_tokens_prefers_extracted() {
        let record = Record::new(SourceKind::News, "text mentions 99", Utc::now())
            .with_numbers(["23", " 45 ", "x1", ""]);
        assert_eq!(record.number_tokens(), vec!["23", "45"]);

        let bare = Record::new(SourceKind::News, "text mentions 99", Utc::now());
        assert_eq!(bare.number_tokens(), vec!["99"]);
    }

    #[test]
    fn test_scores_are_clamped() {
        let record = Record::new(SourceKind::Dream, "", Utc::now())
            .with_sentiment(1.7)
            .with_relevance(-0.2);
        assert_eq!(record.sentiment, 1.0);
        assert_eq!(record.relevance, 0.0);
    }

    #[test]
    fn test_source_kind_roundtrip_names() {
        for kind in [SourceKind::News, SourceKind::Social, SourceKind::Dream, SourceKind::Astrology] {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
        assert!(SourceKind::Social.is_text_media());
        assert!(!SourceKind::Dream.is_text_media());
        assert!("tarot".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_draw_tail_and_substrings() {
        let draw = DrawResult::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "123456");
        assert_eq!(draw.tail(2), Some("56"));
        assert_eq!(draw.tail(3), Some("456"));
        assert_eq!(draw.tail(7), None);
        assert_eq!(draw.last_digit(), Some(6));
        assert_eq!(draw.substrings(2), vec!["12", "23", "34", "45", "56"]);
    }
}
