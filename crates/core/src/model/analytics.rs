use std::collections::BTreeMap;

use crate::model::ids::Level;

/// A concept many students got wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonMistake {
    pub concept: String,
    pub frequency: u32,
}

/// Class-wide statistics computed by the backend for teachers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassAnalytics {
    pub total_students: u32,
    /// Students currently working on each level.
    pub level_distribution: BTreeMap<Level, u32>,
    /// Students who cleared every level of the current chapter.
    pub completed: u32,
    pub stuck_percent: u32,
    pub average_attempts: BTreeMap<Level, f64>,
    pub common_mistakes: Vec<CommonMistake>,
}

impl ClassAnalytics {
    /// Students accounted for in the distribution, including `completed`.
    #[must_use]
    pub fn distributed_students(&self) -> u32 {
        self.level_distribution
            .values()
            .fold(self.completed, |acc, n| acc.saturating_add(*n))
    }
}
