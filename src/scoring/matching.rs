use std::collections::BTreeSet;
use std::ops::AddAssign;

use serde::Serialize;

/// `(f1, precision, recall)` for one question or an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Score {
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
}

impl Score {
    pub const NO_PREDICTION: Score = Score::uniform(-1.0);
    pub const NO_GOLD_ANSWER: Score = Score::uniform(-2.0);
    pub const NO_GOLD_AND_NO_PREDICTION: Score = Score::uniform(-3.0);

    const fn uniform(value: f64) -> Self {
        Self {
            f1: value,
            precision: value,
            recall: value,
        }
    }

    /// F1 is 0 when either input is 0.
    pub fn from_precision_recall(precision: f64, recall: f64) -> Self {
        let f1 = if precision > 0.0 && recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            f1,
            precision,
            recall,
        }
    }

    /// Component-wise mean; an empty input averages to zero.
    pub fn mean<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = Score>,
    {
        let mut total = Score::default();
        let mut count = 0_usize;
        for score in scores {
            total.f1 += score.f1;
            total.precision += score.precision;
            total.recall += score.recall;
            count += 1;
        }
        if count == 0 {
            return Score::default();
        }
        let n = count as f64;
        Score {
            f1: total.f1 / n,
            precision: total.precision / n,
            recall: total.recall / n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MatchCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl MatchCounts {
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn score(&self) -> Score {
        Score::from_precision_recall(self.precision(), self.recall())
    }
}

impl AddAssign for MatchCounts {
    fn add_assign(&mut self, other: Self) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Result of scoring one question's sets. Sentinel variants are kept out of
/// aggregate means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored(Score),
    NoGoldAndNoPrediction,
    NoPrediction,
    NoGoldAnswer,
}

impl ScoreOutcome {
    /// The computed score, or the sentinel's fixed triple.
    pub fn score(&self) -> Score {
        match self {
            Self::Scored(score) => *score,
            Self::NoGoldAndNoPrediction => Score::NO_GOLD_AND_NO_PREDICTION,
            Self::NoPrediction => Score::NO_PREDICTION,
            Self::NoGoldAnswer => Score::NO_GOLD_ANSWER,
        }
    }

    pub fn scored(&self) -> Option<Score> {
        match self {
            Self::Scored(score) => Some(*score),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Scored(_) => "scored",
            Self::NoGoldAndNoPrediction => "no_gold_and_no_prediction",
            Self::NoPrediction => "no_prediction",
            Self::NoGoldAnswer => "no_gold_answer",
        }
    }
}

pub fn normalize_answer(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Lower-cased, trimmed, de-duplicated values; blanks are dropped.
pub fn normalized_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| normalize_answer(value.as_ref()))
        .filter(|value| !value.is_empty())
        .collect()
}

pub fn match_sets(gold: &BTreeSet<String>, generated: &BTreeSet<String>) -> MatchCounts {
    let true_positives = gold.intersection(generated).count();
    MatchCounts {
        true_positives,
        false_positives: generated.difference(gold).count(),
        false_negatives: gold.difference(generated).count(),
    }
}

/// Scores two normalized sets, resolving degenerate inputs to sentinels in
/// priority order: both empty, no prediction, no gold answer.
pub fn score_sets(gold: &BTreeSet<String>, generated: &BTreeSet<String>) -> ScoreOutcome {
    match (gold.is_empty(), generated.is_empty()) {
        (true, true) => ScoreOutcome::NoGoldAndNoPrediction,
        (false, true) => ScoreOutcome::NoPrediction,
        (true, false) => ScoreOutcome::NoGoldAnswer,
        (false, false) => ScoreOutcome::Scored(match_sets(gold, generated).score()),
    }
}
