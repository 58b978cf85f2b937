use std::fmt;

use crate::describe::Description;
use crate::error::ProgressError;

pub const DRAWINGS_PER_STORY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Waiting for drawing `n` (1-based).
    AwaitingDrawing(usize),
    /// All drawings described; only the story remains.
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingDrawing(n) => write!(f, "waiting for drawing {n} of {DRAWINGS_PER_STORY}"),
            Self::Complete => write!(f, "all {DRAWINGS_PER_STORY} drawings analyzed"),
        }
    }
}

/// Descriptions gathered so far. The step is derived from their count,
/// so it can only move forward one at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProgress {
    descriptions: Vec<Description>,
}

impl SessionProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based step; 4 once complete.
    pub fn step(&self) -> usize {
        self.descriptions.len() + 1
    }

    pub fn stage(&self) -> Stage {
        if self.is_complete() {
            Stage::Complete
        } else {
            Stage::AwaitingDrawing(self.step())
        }
    }

    pub fn is_complete(&self) -> bool {
        self.descriptions.len() == DRAWINGS_PER_STORY
    }

    pub fn story_available(&self) -> bool {
        self.is_complete()
    }

    pub fn descriptions(&self) -> &[Description] {
        &self.descriptions
    }

    /// The three descriptions, once there are exactly three.
    pub fn completed(&self) -> Option<&[Description; DRAWINGS_PER_STORY]> {
        self.descriptions.as_slice().try_into().ok()
    }

    pub fn record(&mut self, description: Description) -> Result<Stage, ProgressError> {
        if self.is_complete() {
            return Err(ProgressError::AlreadyComplete);
        }
        self.descriptions.push(description);
        Ok(self.stage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_waiting_for_first_drawing() {
        let progress = SessionProgress::new();
        assert_eq!(progress.step(), 1);
        assert_eq!(progress.stage(), Stage::AwaitingDrawing(1));
        assert!(progress.descriptions().is_empty());
        assert!(!progress.story_available());
        assert!(progress.completed().is_none());
    }

    #[test]
    fn step_tracks_description_count() {
        let mut progress = SessionProgress::new();
        for k in 1..DRAWINGS_PER_STORY {
            let stage = progress.record(Description::new(format!("d{k}"))).unwrap();
            assert_eq!(stage, Stage::AwaitingDrawing(k + 1));
            assert_eq!(progress.step(), k + 1);
            assert_eq!(progress.descriptions().len(), k);
            assert!(!progress.story_available());
        }
    }

    #[test]
    fn third_description_completes() {
        let mut progress = SessionProgress::new();
        progress.record(Description::new("balón")).unwrap();
        progress.record(Description::new("jugador")).unwrap();
        let stage = progress.record(Description::new("portería")).unwrap();

        assert_eq!(stage, Stage::Complete);
        assert_eq!(progress.step(), 4);
        assert!(progress.story_available());
        let all = progress.completed().unwrap();
        assert_eq!(all[0].as_str(), "balón");
        assert_eq!(all[2].as_str(), "portería");
    }

    #[test]
    fn complete_rejects_further_descriptions() {
        let mut progress = SessionProgress::new();
        for d in ["a", "b", "c"] {
            progress.record(Description::new(d)).unwrap();
        }
        let before = progress.clone();
        assert_eq!(
            progress.record(Description::new("d")),
            Err(ProgressError::AlreadyComplete)
        );
        assert_eq!(progress, before);
    }

    #[test]
    fn stage_reads_well() {
        assert_eq!(Stage::AwaitingDrawing(2).to_string(), "waiting for drawing 2 of 3");
        assert_eq!(Stage::Complete.to_string(), "all 3 drawings analyzed");
    }
}
