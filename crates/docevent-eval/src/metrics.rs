//! True-positive counts and the scores derived from them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub tp: usize,
    pub pred: usize,
    pub gold: usize,
}

impl Counts {
    pub fn new(tp: usize, pred: usize, gold: usize) -> Self {
        Self { tp, pred, gold }
    }

    /// tp / pred, or 0 with no predictions.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.pred)
    }

    /// tp / gold, or 0 with no gold objects.
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.gold)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Self) {
        self.tp += other.tp;
        self.pred += other.pred;
        self.gold += other.gold;
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tp={}, num_pred={}, num_gold={}, P={:.2}, R={:.2}, F={:.2}",
            self.tp,
            self.pred,
            self.gold,
            self.precision(),
            self.recall(),
            self.f1()
        )
    }
}

/// Overall counts plus a breakdown by entity, relation or argument type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scoreboard {
    pub overall: Counts,
    pub by_type: BTreeMap<String, Counts>,
}

impl Scoreboard {
    pub fn entry(&mut self, label: &str) -> &mut Counts {
        self.by_type.entry(label.to_string()).or_default()
    }

    /// Sum the per-type counts into `overall`, leaving out `excluded` labels.
    pub fn total_excluding(&mut self, excluded: impl Fn(&str) -> bool) {
        self.overall = Counts::default();
        for (label, counts) in &self.by_type {
            if !excluded(label) {
                self.overall += *counts;
            }
        }
    }
}

impl fmt::Display for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "overall scores {}", self.overall)?;
        for (label, counts) in &self.by_type {
            writeln!(f, "argument type {label} {counts}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scores_from_counts() {
        let counts = Counts::new(3, 4, 6);
        assert_relative_eq!(counts.precision(), 0.75);
        assert_relative_eq!(counts.recall(), 0.5);
        assert_relative_eq!(counts.f1(), 0.6);
    }

    #[test]
    fn empty_denominators_score_zero() {
        let counts = Counts::new(0, 0, 0);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.recall(), 0.0);
        assert_eq!(counts.f1(), 0.0);
    }

    #[test]
    fn report_line_format() {
        assert_eq!(
            Counts::new(1, 3, 2).to_string(),
            "tp=1, num_pred=3, num_gold=2, P=0.33, R=0.50, F=0.40"
        );
    }

    #[test]
    fn overall_leaves_out_excluded_labels() {
        let mut board = Scoreboard::default();
        *board.entry("Pledger") += Counts::new(1, 1, 1);
        *board.entry("StartDate") += Counts::new(0, 2, 1);
        board.total_excluding(|label| label == "StartDate");
        assert_eq!(board.overall, Counts::new(1, 1, 1));

        let text = board.to_string();
        assert!(text.starts_with("overall scores tp=1"));
        assert!(text.contains("argument type StartDate tp=0, num_pred=2"));
    }
}
