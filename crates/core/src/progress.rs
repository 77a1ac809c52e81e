//! Projects a subject's attempt history into a plottable series.

use chrono::{DateTime, Utc};

use crate::model::QuizAttempt;

/// One plotted attempt.
///
/// `x` is the attempt's position between the earliest (`0.0`) and latest (`1.0`)
/// attempt dates. `percentage` lies in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressPoint {
    pub date: DateTime<Utc>,
    pub x: f64,
    pub percentage: f64,
    pub score: u32,
    pub total_questions: u32,
}

/// Aggregated history, with a rendering hint for the chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressSeries {
    /// No attempts recorded yet.
    NoHistory,
    /// A single attempt: the datum is computed but a trend line should not be drawn.
    InsufficientHistory(ProgressPoint),
    /// Two or more attempts ordered by date.
    Trend(Vec<ProgressPoint>),
}

impl ProgressSeries {
    /// Whether a consumer should draw a trend line.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        matches!(self, ProgressSeries::Trend(_))
    }

    #[must_use]
    pub fn points(&self) -> &[ProgressPoint] {
        match self {
            ProgressSeries::NoHistory => &[],
            ProgressSeries::InsufficientHistory(point) => std::slice::from_ref(point),
            ProgressSeries::Trend(points) => points,
        }
    }
}

/// Sorts the history by date and maps every attempt to a `ProgressPoint`.
#[must_use]
pub fn aggregate(history: &[QuizAttempt]) -> ProgressSeries {
    let mut sorted = history.to_vec();
    sorted.sort_by_key(QuizAttempt::date);

    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return ProgressSeries::NoHistory;
    };
    let earliest = first.date().timestamp_millis();
    let span = last.date().timestamp_millis() - earliest;

    #[allow(clippy::cast_precision_loss)]
    let to_point = |attempt: &QuizAttempt| {
        let x = if span == 0 {
            0.0
        } else {
            (attempt.date().timestamp_millis() - earliest) as f64 / span as f64
        };
        ProgressPoint {
            date: attempt.date(),
            x,
            percentage: attempt.percentage(),
            score: attempt.score(),
            total_questions: attempt.total_questions(),
        }
    };

    if sorted.len() == 1 {
        return ProgressSeries::InsufficientHistory(to_point(first));
    }
    ProgressSeries::Trend(sorted.iter().map(to_point).collect())
}
