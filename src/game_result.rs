use chrono::{DateTime, Local};

/// Outcome of one completed round
#[derive(Debug, Clone, PartialEq)]
pub struct GameResult {
    correct: u32,
    total: u32,
    date: DateTime<Local>,
}

impl GameResult {
    /// `correct` is clamped to `total`
    pub fn new(correct: u32, total: u32, date: DateTime<Local>) -> Self {
        Self {
            correct: correct.min(total),
            total,
            date,
        }
    }

    /// Stand-in for "no game stored yet"
    pub fn placeholder() -> Self {
        Self::new(0, 0, Local::now())
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn date(&self) -> DateTime<Local> {
        self.date
    }

    /// Only a strictly higher correct count wins; equal scores keep the older record.
    pub fn is_better(&self, other: &GameResult) -> bool {
        self.correct > other.correct
    }
}
