//! Results-screen projection of a finished session.

/// Encouragement tier shown next to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Perfect,
    Excellent,
    GoodEffort,
    KeepPracticing,
}

impl Feedback {
    #[must_use]
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            100.. => Feedback::Perfect,
            80..=99 => Feedback::Excellent,
            50..=79 => Feedback::GoodEffort,
            _ => Feedback::KeepPracticing,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Feedback::Perfect => "Perfect score!",
            Feedback::Excellent => "Excellent work!",
            Feedback::GoodEffort => "Good effort, keep going.",
            Feedback::KeepPracticing => "Keep practicing.",
        }
    }
}

/// Everything the results screen needs about a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub score: u32,
    pub total: u32,
    /// Rounded to the nearest whole percent.
    pub percentage: u32,
    pub feedback: Feedback,
    pub has_wrong_answers: bool,
    pub has_next_batch: bool,
}

impl ResultSummary {
    #[must_use]
    pub fn new(score: u32, total: u32, has_wrong_answers: bool, has_next_batch: bool) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (score * 100 + total / 2) / total
        };
        Self {
            score,
            total,
            percentage,
            feedback: Feedback::for_percentage(percentage),
            has_wrong_answers,
            has_next_batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_tiers() {
        assert_eq!(ResultSummary::new(5, 5, false, false).feedback, Feedback::Perfect);
        assert_eq!(ResultSummary::new(4, 5, true, false).feedback, Feedback::Excellent);
        assert_eq!(ResultSummary::new(1, 2, true, false).feedback, Feedback::GoodEffort);
        assert_eq!(ResultSummary::new(1, 3, true, true).feedback, Feedback::KeepPracticing);
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(ResultSummary::new(2, 3, true, false).percentage, 67);
        assert_eq!(ResultSummary::new(1, 3, true, false).percentage, 33);
        assert_eq!(ResultSummary::new(19, 20, true, false).feedback, Feedback::Excellent);
    }
}
