use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Calendar date as an ISO `YYYY-MM-DD` string.
///
/// Dates stay strings on purpose: lexicographic comparison of the ISO form
/// is chronological comparison, and the day-over-day computations downstream
/// depend only on that ordering.
pub type DayDate = String;

/// Classifier label attached to a scored headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSentimentLabelError;

impl fmt::Display for ParseSentimentLabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown sentiment label")
    }
}

impl std::error::Error for ParseSentimentLabelError {}

impl FromStr for SentimentLabel {
    type Err = ParseSentimentLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" | "POS" => Ok(SentimentLabel::Positive),
            "NEUTRAL" | "NEU" => Ok(SentimentLabel::Neutral),
            "NEGATIVE" | "NEG" => Ok(SentimentLabel::Negative),
            _ => Err(ParseSentimentLabelError),
        }
    }
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Neutral => "NEUTRAL",
            SentimentLabel::Negative => "NEGATIVE",
        }
    }
}

/// One day's aggregated sentiment for a ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySentiment {
    pub date: DayDate,
    /// Mean headline score, [-1, 1].
    pub avg_score: f64,
    pub article_count: u32,
    pub positive_count: u32,
    pub neutral_count: u32,
    pub negative_count: u32,
}

/// One day's price bar. Every field except the date may be absent upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DayDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// The joined per-day input of the alignment transform.
///
/// `None` and zero are different things here: a `None` close marks a day with
/// no price at all, which the return walk treats specially, while a zero
/// volume is just a quiet day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: DayDate,
    /// Aggregated sentiment score, [-1, 1].
    pub sentiment: Option<f64>,
    /// Closing price, non-negative.
    pub close: Option<f64>,
    /// Traded volume, non-negative.
    pub volume: Option<f64>,
}

impl DailyRecord {
    pub fn new(date: impl Into<DayDate>) -> Self {
        Self {
            date: date.into(),
            sentiment: None,
            close: None,
            volume: None,
        }
    }
}

pub trait HasDate {
    fn date(&self) -> &str;
}

impl HasDate for DailySentiment {
    fn date(&self) -> &str {
        &self.date
    }
}

impl HasDate for PricePoint {
    fn date(&self) -> &str {
        &self.date
    }
}

impl HasDate for DailyRecord {
    fn date(&self) -> &str {
        &self.date
    }
}

/// Date-ordered window of daily samples with binary-searchable dates.
///
/// Construction sorts; the sort is stable, so duplicate dates keep their
/// input order and are handled by consumers as consecutive days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyWindow<T> {
    data: Vec<T>,
}

impl<T> Default for DailyWindow<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T: HasDate> DailyWindow<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Build a window from samples in any order.
    pub fn from_unsorted(mut samples: Vec<T>) -> Self {
        samples.sort_by(|a, b| a.date().cmp(b.date()));
        Self { data: samples }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn first(&self) -> Option<&T> {
        self.data.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.data.last()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Insert keeping date order; an existing sample on the same date is
    /// replaced (last write wins).
    pub fn upsert(&mut self, sample: T) {
        let idx = self.lower_bound(sample.date());
        if idx < self.data.len() && self.data[idx].date() == sample.date() {
            self.data[idx] = sample;
        } else {
            self.data.insert(idx, sample);
        }
    }

    /// Samples with dates in `[start, end)`.
    pub fn range(&self, start: &str, end: &str) -> &[T] {
        let lo = self.lower_bound(start);
        let hi = self.lower_bound(end);
        &self.data[lo..hi]
    }

    /// The trailing `days` samples.
    pub fn tail(&self, days: usize) -> &[T] {
        let start = self.data.len().saturating_sub(days);
        &self.data[start..]
    }

    fn lower_bound(&self, date: &str) -> usize {
        let mut left = 0usize;
        let mut right = self.data.len();
        while left < right {
            let mid = (left + right) / 2;
            match self.data[mid].date().cmp(date) {
                Ordering::Less => left = mid + 1,
                Ordering::Equal | Ordering::Greater => right = mid,
            }
        }
        left
    }
}

/// Linear remapping of `value` from `[in_min, in_max]` to `[out_min, out_max]`.
///
/// A zero-width input domain returns `out_min` instead of dividing by zero;
/// chart axes and the volume rescaler both rely on that. No clamping is
/// applied — callers bound their inputs first when they need a bounded
/// output. Inverted axes fall out of passing swapped domain bounds.
pub fn map_range(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if in_max == in_min {
        return out_min;
    }
    (value - in_min) / (in_max - in_min) * (out_max - out_min) + out_min
}
