/// Run phase definitions for one orchestrator invocation
///
/// A run moves `Idle -> Crawling -> Merging -> Reporting -> Done` and never
/// goes back; every new invocation starts from `Idle` again.
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing started yet
    Idle,

    /// Platform crawls in progress; holds the platform most recently started
    Crawling(String),

    /// Per-platform results are being merged
    Merging,

    /// The crawl report is being generated
    Reporting,

    /// Run finished
    Done,
}

impl RunPhase {
    /// Returns true once the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true while platforms are being crawled
    pub fn is_crawling(&self) -> bool {
        matches!(self, Self::Crawling(_))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Crawling(_) => 1,
            Self::Merging => 2,
            Self::Reporting => 3,
            Self::Done => 4,
        }
    }

    /// Whether `next` may follow this phase
    ///
    /// Phases only move forward; `Crawling` may repeat for the next platform,
    /// and a finished run may restart from `Idle`.
    pub fn can_advance_to(&self, next: &RunPhase) -> bool {
        match (self, next) {
            (Self::Done, Self::Idle) => true,
            (Self::Crawling(_), Self::Crawling(_)) => true,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Crawling(platform) => write!(f, "crawling({})", platform),
            Self::Merging => write!(f, "merging"),
            Self::Reporting => write!(f, "reporting"),
            Self::Done => write!(f, "done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let crawling = RunPhase::Crawling("taobao".to_string());
        assert!(RunPhase::Idle.can_advance_to(&crawling));
        assert!(crawling.can_advance_to(&RunPhase::Crawling("xiaohongshu".to_string())));
        assert!(crawling.can_advance_to(&RunPhase::Merging));
        assert!(RunPhase::Merging.can_advance_to(&RunPhase::Reporting));
        assert!(RunPhase::Reporting.can_advance_to(&RunPhase::Done));
        assert!(RunPhase::Done.can_advance_to(&RunPhase::Idle));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!RunPhase::Merging.can_advance_to(&RunPhase::Crawling("taobao".to_string())));
        assert!(!RunPhase::Reporting.can_advance_to(&RunPhase::Idle));
        assert!(!RunPhase::Done.can_advance_to(&RunPhase::Merging));
    }

    #[test]
    fn test_display() {
        assert_eq!(RunPhase::Crawling("taobao".to_string()).to_string(), "crawling(taobao)");
        assert_eq!(RunPhase::Done.to_string(), "done");
        assert!(RunPhase::Done.is_terminal());
        assert!(!RunPhase::Idle.is_crawling());
    }
}
