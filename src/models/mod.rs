mod article;

pub use article::{Article, FeedSource};

/// Outcome of one bulk-add entry (CSV or OPML import).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
    Invalid,
}

/// Tallies for a bulk feed add, reported back to the admin.
#[derive(Debug, Default, Clone, Copy)]
pub struct BulkAddReport {
    pub added: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

impl BulkAddReport {
    pub fn record(&mut self, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Added => self.added += 1,
            AddOutcome::Duplicate => self.duplicates += 1,
            AddOutcome::Invalid => self.invalid += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.duplicates + self.invalid
    }
}

/// Result of one delivery tick, for logging and admin acknowledgments.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickSummary {
    pub delivered: usize,
    pub feeds_failed: usize,
    /// True when a send failure stopped the batch before it was exhausted.
    pub batch_halted: bool,
}
