use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use sentiment_core::{map_range, DailyRecord, DailySentiment, DayDate, SentimentLabel};

/// Daily return magnitude that maps to 1.0 on the normalized price scale.
/// A 2% move fills half the [-2, 2] display band.
pub const PRICE_SENSITIVITY: f64 = 0.02;

/// Composite score at or above which a window reads as "Aligned",
/// and at or below whose negation it reads as "Misleading".
const INTERPRETATION_THRESHOLD: f64 = 0.3;

/// Standard deviation below which correlation is treated as undefined.
const MIN_STDDEV: f64 = 0.001;

/// Dead band for the sentiment trend comparison.
const TREND_DEAD_BAND: f64 = 0.05;

pub fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round_four(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ---------- derived series ---------------------------------------------------

/// Observed volume bounds used for the [0, 1] rescale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRange {
    pub min: f64,
    pub max: f64,
}

impl Default for VolumeRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// The chartable output of the daily alignment transform: a shared date axis
/// and four parallel series, one element per input record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivedSeries {
    pub dates: Vec<DayDate>,
    /// Sentiment score per day, missing days as 0.
    pub sentiment: Vec<f64>,
    /// Day-over-day close return; 0 on the first day and around price gaps.
    pub price_returns: Vec<f64>,
    /// Returns scaled by [`PRICE_SENSITIVITY`] and clamped to [-2, 2].
    pub price_norm: Vec<f64>,
    /// Sentiment sign-agreement with the day's return, clamped to [-1, 1];
    /// 0 whenever the return is exactly 0.
    pub alignment: Vec<f64>,
    /// Raw volumes, missing days as 0.
    pub volumes: Vec<f64>,
    /// Volumes rescaled from `volume_range` into [0, 1].
    pub volume_norm: Vec<f64>,
    pub volume_range: VolumeRange,
}

impl DerivedSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Days usable for windowed sentiment-vs-return statistics. The first
    /// day carries no real return (there is no prior close), so it is
    /// excluded the same way the metrics job excluded NULL returns.
    pub fn paired_days(&self) -> Vec<PairedDay> {
        self.dates
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, date)| PairedDay {
                date: date.clone(),
                sentiment: self.sentiment[i],
                price_return: self.price_returns[i],
            })
            .collect()
    }
}

/// Transform a window of daily records into the derived series bundle.
///
/// Total function: any input, including empty or all-missing, produces a
/// well-defined output and never panics — this sits directly on a rendering
/// path. The input is sorted ascending by date (stable, so duplicate dates
/// are processed in input order as consecutive days); the caller's slice is
/// left untouched.
pub fn compute_derived_series(records: &[DailyRecord]) -> DerivedSeries {
    if records.is_empty() {
        return DerivedSeries::default();
    }

    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let dates: Vec<DayDate> = sorted.iter().map(|r| r.date.clone()).collect();
    let sentiment: Vec<f64> = sorted.iter().map(|r| r.sentiment.unwrap_or(0.0)).collect();

    // Day-over-day returns with a carried previous close. The carry is
    // overwritten every step, including with `None` on a missing-close day,
    // so the first valid close after a gap also yields a 0 return and the
    // baseline restarts there. Upstream behaves exactly this way and the
    // charts are calibrated to it; do not "fix" this to compare against the
    // last known close.
    let mut price_returns = Vec::with_capacity(sorted.len());
    let mut prev_close: Option<f64> = None;
    for record in &sorted {
        let ret = match (prev_close, record.close) {
            (Some(prev), Some(close)) => (close - prev) / prev,
            _ => 0.0,
        };
        price_returns.push(ret);
        prev_close = record.close;
    }

    let price_norm: Vec<f64> = price_returns
        .iter()
        .map(|r| (r / PRICE_SENSITIVITY).clamp(-2.0, 2.0))
        .collect();

    // A return of exactly 0.0 is the one "no signal" case; near-zero moves
    // still carry a direction.
    let alignment: Vec<f64> = sentiment
        .iter()
        .zip(&price_returns)
        .map(|(&s, &r)| {
            if r == 0.0 {
                0.0
            } else {
                let direction = if r > 0.0 { 1.0 } else { -1.0 };
                (s * direction).clamp(-1.0, 1.0)
            }
        })
        .collect();

    let volumes: Vec<f64> = sorted.iter().map(|r| r.volume.unwrap_or(0.0)).collect();
    let volume_range = observed_volume_range(&volumes);
    let volume_norm: Vec<f64> = volumes
        .iter()
        .map(|&v| map_range(v, volume_range.min, volume_range.max, 0.0, 1.0).clamp(0.0, 1.0))
        .collect();

    DerivedSeries {
        dates,
        sentiment,
        price_returns,
        price_norm,
        alignment,
        volumes,
        volume_norm,
        volume_range,
    }
}

/// Min over strictly positive volumes (0 when there are none) and max over
/// all volumes, forced to 1 when empty or degenerately equal to the min so
/// the rescale domain never has zero width with distinct data.
fn observed_volume_range(volumes: &[f64]) -> VolumeRange {
    let min = volumes
        .iter()
        .copied()
        .filter(|v| *v > 0.0)
        .fold(f64::INFINITY, f64::min);
    let min = if min.is_finite() { min } else { 0.0 };

    let max = volumes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max = if !max.is_finite() || max == min { 1.0 } else { max };

    VolumeRange { min, max }
}

// ---------- windowed metrics -------------------------------------------------

/// One day with both a sentiment score and a realized return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedDay {
    pub date: DayDate,
    pub sentiment: f64,
    pub price_return: f64,
}

/// Reading of a window's alignment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpretation {
    Aligned,
    Noisy,
    Misleading,
}

impl Interpretation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interpretation::Aligned => "Aligned",
            Interpretation::Noisy => "Noisy",
            Interpretation::Misleading => "Misleading",
        }
    }

    fn from_score(score: f64) -> Self {
        if score >= INTERPRETATION_THRESHOLD {
            Interpretation::Aligned
        } else if score <= -INTERPRETATION_THRESHOLD {
            Interpretation::Misleading
        } else {
            Interpretation::Noisy
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment-vs-return statistics over one window of paired days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowMetrics {
    /// Pearson correlation, 0 when either side is flat or the value is NaN.
    pub corr: f64,
    /// Fraction of days where sentiment and return share a sign.
    pub directional_match: f64,
    /// `0.5 * corr + 0.5 * (directional_match * 2 - 1)`, clamped to [-1, 1].
    pub alignment_score: f64,
    pub misalignment_days: u32,
    pub interpretation: Interpretation,
}

/// A window's metrics anchored at its last date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowedMetrics {
    pub date_end: DayDate,
    pub window_days: usize,
    #[serde(flatten)]
    pub metrics: WindowMetrics,
}

/// Metrics for a single window of equal-length score/return slices.
///
/// Empty input yields the all-zero `Noisy` reading; slices of unequal length
/// are truncated to the shorter one.
pub fn compute_window_metrics(sentiments: &[f64], returns: &[f64]) -> WindowMetrics {
    let n = sentiments.len().min(returns.len());
    let sentiments = &sentiments[..n];
    let returns = &returns[..n];
    if n == 0 {
        return WindowMetrics {
            corr: 0.0,
            directional_match: 0.0,
            alignment_score: 0.0,
            misalignment_days: 0,
            interpretation: Interpretation::Noisy,
        };
    }

    let corr = if stddev(sentiments) < MIN_STDDEV || stddev(returns) < MIN_STDDEV {
        0.0
    } else {
        let r = pearson(sentiments, returns);
        if r.is_nan() {
            0.0
        } else {
            r
        }
    };

    // sign(0.0) is 0, so two flat days count as matching.
    let matches = sentiments
        .iter()
        .zip(returns)
        .filter(|(s, r)| sign(**s) == sign(**r))
        .count();
    let directional_match = matches as f64 / n as f64;
    let misalignment_days = (n - matches) as u32;

    let alignment_score =
        (0.5 * corr + 0.5 * (directional_match * 2.0 - 1.0)).clamp(-1.0, 1.0);

    WindowMetrics {
        corr: round_four(corr),
        directional_match: round_four(directional_match),
        alignment_score: round_four(alignment_score),
        misalignment_days,
        interpretation: Interpretation::from_score(alignment_score),
    }
}

/// Rolling metrics: one entry per full `window_days` window over `days`,
/// anchored at each window's last date. Fewer days than the window yields
/// nothing.
pub fn rolling_metrics(days: &[PairedDay], window_days: usize) -> Vec<WindowedMetrics> {
    if window_days == 0 || days.len() < window_days {
        return Vec::new();
    }
    days.windows(window_days)
        .map(|window| {
            let sentiments: Vec<f64> = window.iter().map(|d| d.sentiment).collect();
            let returns: Vec<f64> = window.iter().map(|d| d.price_return).collect();
            WindowedMetrics {
                date_end: window.last().map(|d| d.date.clone()).unwrap_or_default(),
                window_days,
                metrics: compute_window_metrics(&sentiments, &returns),
            }
        })
        .collect()
}

/// Three-way sign, unlike `f64::signum` which maps 0.0 to 1.0.
fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let mx = mean(xs);
    let my = mean(ys);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    cov / (vx.sqrt() * vy.sqrt())
}

// ---------- daily aggregation ------------------------------------------------

/// A headline that already passed upstream sentiment scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHeadline {
    pub title: String,
    /// RFC 3339 publish timestamp.
    pub published_at: String,
    /// Score in [-1, 1].
    pub score: f64,
    pub label: SentimentLabel,
}

/// Group scored headlines by UTC calendar day into daily aggregates,
/// ascending by date. Headlines with unparseable timestamps are skipped.
pub fn aggregate_daily(items: &[ScoredHeadline]) -> Vec<DailySentiment> {
    #[derive(Default)]
    struct DayAcc {
        score_sum: f64,
        article_count: u32,
        positive_count: u32,
        neutral_count: u32,
        negative_count: u32,
    }

    let mut by_day: BTreeMap<DayDate, DayAcc> = BTreeMap::new();
    for item in items {
        let Ok(published) = DateTime::parse_from_rfc3339(&item.published_at) else {
            continue;
        };
        let date = published.date_naive().format("%Y-%m-%d").to_string();
        let acc = by_day.entry(date).or_default();
        acc.score_sum += item.score;
        acc.article_count += 1;
        match item.label {
            SentimentLabel::Positive => acc.positive_count += 1,
            SentimentLabel::Neutral => acc.neutral_count += 1,
            SentimentLabel::Negative => acc.negative_count += 1,
        }
    }

    by_day
        .into_iter()
        .map(|(date, acc)| DailySentiment {
            date,
            avg_score: round_four(acc.score_sum / acc.article_count as f64),
            article_count: acc.article_count,
            positive_count: acc.positive_count,
            neutral_count: acc.neutral_count,
            negative_count: acc.negative_count,
        })
        .collect()
}

// ---------- period summaries -------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentTrend {
    Up,
    Down,
    Stable,
}

/// Compare the later half of the window against the earlier half with a
/// small dead band. Fewer than two scores is always `Stable`.
pub fn sentiment_trend(scores: &[f64]) -> SentimentTrend {
    if scores.len() < 2 {
        return SentimentTrend::Stable;
    }
    let mid = scores.len() / 2;
    let early = mean(&scores[..mid]);
    let late = mean(&scores[mid..]);
    if late - early > TREND_DEAD_BAND {
        SentimentTrend::Up
    } else if early - late > TREND_DEAD_BAND {
        SentimentTrend::Down
    } else {
        SentimentTrend::Stable
    }
}

/// Label with the highest total count across the window; `Neutral` when the
/// window is empty. The first maximum wins on ties.
pub fn dominant_label(days: &[DailySentiment]) -> SentimentLabel {
    let mut counts = [0u64; 3];
    for day in days {
        counts[0] += day.positive_count as u64;
        counts[1] += day.neutral_count as u64;
        counts[2] += day.negative_count as u64;
    }
    let labels = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];
    let mut best = SentimentLabel::Neutral;
    let mut best_count = 0u64;
    for (label, &count) in labels.iter().zip(&counts) {
        if count > best_count {
            best = *label;
            best_count = count;
        }
    }
    best
}

/// Percent change from the first to the last valid close in the window,
/// rounded to two decimals; 0 with fewer than two valid closes.
pub fn period_return_pct(closes: &[Option<f64>]) -> f64 {
    let mut valid = closes.iter().flatten();
    let Some(&first) = valid.next() else {
        return 0.0;
    };
    let Some(&last) = valid.last() else {
        return 0.0;
    };
    if first == 0.0 {
        return 0.0;
    }
    round_two((last - first) / first * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: &str, sentiment: Option<f64>, close: Option<f64>, volume: Option<f64>) -> DailyRecord {
        DailyRecord {
            date: date.to_string(),
            sentiment,
            close,
            volume,
        }
    }

    #[test]
    fn empty_input_yields_empty_bundle() {
        let out = compute_derived_series(&[]);
        assert!(out.is_empty());
        assert!(out.sentiment.is_empty());
        assert!(out.price_returns.is_empty());
        assert!(out.alignment.is_empty());
        assert!(out.volume_norm.is_empty());
        assert_eq!(out.volume_range, VolumeRange { min: 0.0, max: 1.0 });
    }

    #[test]
    fn series_share_length_and_sorted_dates() {
        let records = vec![
            rec("2024-01-03", Some(0.5), Some(99.0), Some(800.0)),
            rec("2024-01-01", None, Some(100.0), Some(1_000.0)),
            rec("2024-01-02", Some(-0.2), Some(102.0), None),
        ];
        let out = compute_derived_series(&records);
        assert_eq!(out.len(), 3);
        assert_eq!(out.dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(out.sentiment.len(), 3);
        assert_eq!(out.price_returns.len(), 3);
        assert_eq!(out.price_norm.len(), 3);
        assert_eq!(out.alignment.len(), 3);
        assert_eq!(out.volume_norm.len(), 3);
        // Caller slice is untouched.
        assert_eq!(records[0].date, "2024-01-03");
    }

    #[test]
    fn returns_are_day_over_day_close_changes() {
        let records = vec![
            rec("2024-01-01", None, Some(100.0), None),
            rec("2024-01-02", None, Some(102.0), None),
            rec("2024-01-03", None, Some(99.0), None),
        ];
        let out = compute_derived_series(&records);
        assert_eq!(out.price_returns[0], 0.0);
        assert!((out.price_returns[1] - 0.02).abs() < 1e-12);
        assert!((out.price_returns[2] - (99.0 - 102.0) / 102.0).abs() < 1e-12);
        assert_eq!(out.price_norm[1], 1.0); // boundary of the 2% band, unclamped
        assert!((out.price_norm[2] - (-1.470_588_235_294_117_6)).abs() < 1e-9);
    }

    #[test]
    fn missing_close_forces_zero_return_on_the_next_valid_day() {
        // Documented upstream quirk, preserved on purpose: the previous-close
        // carry is dropped on a gap day, so the day after the gap compares
        // against nothing and also reads 0.
        let records = vec![
            rec("2024-01-01", None, Some(100.0), None),
            rec("2024-01-02", None, None, None),
            rec("2024-01-03", None, Some(104.0), None),
            rec("2024-01-04", None, Some(106.0), None),
        ];
        let out = compute_derived_series(&records);
        assert_eq!(out.price_returns[..3], [0.0, 0.0, 0.0]);
        assert!((out.price_returns[3] - (106.0 - 104.0) / 104.0).abs() < 1e-12);
    }

    #[test]
    fn alignment_is_zero_without_price_movement() {
        let records = vec![
            rec("2024-01-01", Some(0.9), Some(100.0), None),
            rec("2024-01-02", Some(0.6), Some(100.0), None), // flat day
            rec("2024-01-03", Some(0.6), Some(101.0), None),
            rec("2024-01-04", Some(0.8), Some(100.0), None),
        ];
        let out = compute_derived_series(&records);
        assert_eq!(out.alignment[0], 0.0); // first day has no return
        assert_eq!(out.alignment[1], 0.0); // exactly zero return
        assert_eq!(out.alignment[2], 0.6); // sentiment agrees with the up move
        assert_eq!(out.alignment[3], -0.8); // positive sentiment, down move
        for (a, r) in out.alignment.iter().zip(&out.price_returns) {
            if *r == 0.0 {
                assert_eq!(*a, 0.0);
            }
            assert!((-1.0..=1.0).contains(a));
        }
    }

    #[test]
    fn price_norm_clamps_to_band() {
        let records = vec![
            rec("2024-01-01", None, Some(100.0), None),
            rec("2024-01-02", None, Some(120.0), None), // +20% -> clamped
            rec("2024-01-03", None, Some(60.0), None),  // -50% -> clamped
        ];
        let out = compute_derived_series(&records);
        assert_eq!(out.price_norm[1], 2.0);
        assert_eq!(out.price_norm[2], -2.0);
    }

    #[test]
    fn volume_rescales_into_unit_interval() {
        let records = vec![
            rec("2024-01-01", None, None, Some(200.0)),
            rec("2024-01-02", None, None, Some(1_000.0)),
            rec("2024-01-03", None, None, None),
        ];
        let out = compute_derived_series(&records);
        assert_eq!(out.volume_range, VolumeRange { min: 200.0, max: 1_000.0 });
        assert_eq!(out.volume_norm[0], 0.0);
        assert_eq!(out.volume_norm[1], 1.0);
        assert_eq!(out.volume_norm[2], 0.0); // missing volume clamps up to 0
    }

    #[test]
    fn degenerate_volumes_fall_back_to_unit_range() {
        let all_zero = compute_derived_series(&[
            rec("2024-01-01", None, None, Some(0.0)),
            rec("2024-01-02", None, None, Some(0.0)),
        ]);
        assert_eq!(all_zero.volume_range, VolumeRange { min: 0.0, max: 1.0 });
        assert_eq!(all_zero.volume_norm, vec![0.0, 0.0]);

        let all_equal = compute_derived_series(&[
            rec("2024-01-01", None, None, Some(5.0)),
            rec("2024-01-02", None, None, Some(5.0)),
        ]);
        assert_eq!(all_equal.volume_range.max, 1.0);
        for v in &all_equal.volume_norm {
            assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn single_record_is_degenerate_but_defined() {
        let out = compute_derived_series(&[rec("2024-01-01", Some(0.4), Some(100.0), Some(10.0))]);
        assert_eq!(out.price_returns, vec![0.0]);
        assert_eq!(out.alignment, vec![0.0]);
        assert_eq!(out.sentiment, vec![0.4]);
    }

    #[test]
    fn paired_days_skip_the_first_return() {
        let out = compute_derived_series(&[
            rec("2024-01-01", Some(0.1), Some(100.0), None),
            rec("2024-01-02", Some(0.2), Some(101.0), None),
        ]);
        let pairs = out.paired_days();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].date, "2024-01-02");
        assert!(pairs[0].price_return > 0.0);
    }

    #[test]
    fn perfectly_aligned_window_reads_aligned() {
        let sentiments = [0.2, 0.5, -0.3, 0.4, -0.1];
        let returns = [0.01, 0.02, -0.01, 0.015, -0.005];
        let m = compute_window_metrics(&sentiments, &returns);
        assert_eq!(m.directional_match, 1.0);
        assert_eq!(m.misalignment_days, 0);
        assert!(m.alignment_score >= 0.3);
        assert_eq!(m.interpretation, Interpretation::Aligned);
    }

    #[test]
    fn inverted_window_reads_misleading() {
        let sentiments = [0.2, 0.5, -0.3, 0.4, 0.1];
        let returns = [-0.01, -0.02, 0.01, -0.015, -0.005];
        let m = compute_window_metrics(&sentiments, &returns);
        assert_eq!(m.directional_match, 0.0);
        assert_eq!(m.misalignment_days, 5);
        assert_eq!(m.interpretation, Interpretation::Misleading);
    }

    #[test]
    fn flat_inputs_have_zero_correlation() {
        let sentiments = [0.2, 0.2, 0.2, 0.2];
        let returns = [0.01, -0.01, 0.02, -0.02];
        let m = compute_window_metrics(&sentiments, &returns);
        assert_eq!(m.corr, 0.0);
    }

    #[test]
    fn empty_window_is_noisy_zero() {
        let m = compute_window_metrics(&[], &[]);
        assert_eq!(m.alignment_score, 0.0);
        assert_eq!(m.interpretation, Interpretation::Noisy);
    }

    #[test]
    fn rolling_metrics_anchor_at_window_end() {
        let days: Vec<PairedDay> = (1..=5)
            .map(|i| PairedDay {
                date: format!("2024-01-0{i}"),
                sentiment: 0.1 * i as f64,
                price_return: 0.01 * i as f64,
            })
            .collect();
        let rolled = rolling_metrics(&days, 3);
        assert_eq!(rolled.len(), 3);
        assert_eq!(rolled[0].date_end, "2024-01-03");
        assert_eq!(rolled[2].date_end, "2024-01-05");
        assert!(rolling_metrics(&days, 6).is_empty());
        assert!(rolling_metrics(&days, 0).is_empty());
    }

    #[test]
    fn aggregate_groups_by_utc_day() {
        let items = vec![
            ScoredHeadline {
                title: "up".into(),
                published_at: "2024-03-01T09:30:00Z".into(),
                score: 0.8,
                label: SentimentLabel::Positive,
            },
            ScoredHeadline {
                title: "down".into(),
                published_at: "2024-03-01T16:00:00Z".into(),
                score: -0.4,
                label: SentimentLabel::Negative,
            },
            ScoredHeadline {
                title: "later".into(),
                published_at: "2024-03-02T10:00:00Z".into(),
                score: 0.0,
                label: SentimentLabel::Neutral,
            },
            ScoredHeadline {
                title: "bad ts".into(),
                published_at: "not-a-date".into(),
                score: 1.0,
                label: SentimentLabel::Positive,
            },
        ];
        let days = aggregate_daily(&items);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, "2024-03-01");
        assert_eq!(days[0].article_count, 2);
        assert_eq!(days[0].positive_count, 1);
        assert_eq!(days[0].negative_count, 1);
        assert!((days[0].avg_score - 0.2).abs() < 1e-9);
        assert_eq!(days[1].article_count, 1);
        assert_eq!(days[1].neutral_count, 1);
    }

    #[test]
    fn trend_uses_half_window_means() {
        assert_eq!(sentiment_trend(&[0.0, 0.0, 0.5, 0.6]), SentimentTrend::Up);
        assert_eq!(sentiment_trend(&[0.5, 0.6, 0.0, 0.0]), SentimentTrend::Down);
        assert_eq!(sentiment_trend(&[0.3, 0.31, 0.3, 0.32]), SentimentTrend::Stable);
        assert_eq!(sentiment_trend(&[0.9]), SentimentTrend::Stable);
    }

    #[test]
    fn period_return_spans_valid_closes() {
        let closes = [None, Some(100.0), None, Some(102.3), None];
        assert_eq!(period_return_pct(&closes), 2.3);
        assert_eq!(period_return_pct(&[Some(100.0)]), 0.0);
        assert_eq!(period_return_pct(&[]), 0.0);
    }
}
