//! Analysis progress tracking.
//!
//! Six fixed phases are advanced from tool names. The mapping is an explicit
//! rule table: the first rule whose marker appears in the tool name and whose
//! index gate passes is applied. Phases only move forward.

use crate::config::PHASE_NAMES;
use serde::{Deserialize, Serialize};

/// Status of one analysis phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    /// Not started.
    #[default]
    Pending,
    /// In progress.
    Running,
    /// Finished.
    Done,
    /// Failed; terminal.
    Error,
}

impl PhaseStatus {
    /// Whether moving from `self` to `next` keeps the phase monotonic.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        match (self, next) {
            (Self::Error, _) | (Self::Done, Self::Pending | Self::Running | Self::Error) => false,
            (_, Self::Error) => matches!(self, Self::Running),
            (Self::Running, Self::Pending) => false,
            _ => true,
        }
    }
}

/// One named phase and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPhase {
    /// Phase name.
    pub name: String,
    /// Current status.
    pub status: PhaseStatus,
}

struct PhaseRule {
    marker: &'static str,
    max_index: usize,
    completes: &'static [usize],
    starts: usize,
}

const PHASE_RULES: [PhaseRule; 4] = [
    // metadata lookup
    PhaseRule {
        marker: "meta",
        max_index: 0,
        completes: &[],
        starts: 0,
    },
    // file tree listing
    PhaseRule {
        marker: "list",
        max_index: 1,
        completes: &[0],
        starts: 1,
    },
    // reading selected files
    PhaseRule {
        marker: "read",
        max_index: 3,
        completes: &[1, 2],
        starts: 3,
    },
    // packing the repository for analysis
    PhaseRule {
        marker: "pack",
        max_index: 4,
        completes: &[3],
        starts: 4,
    },
];

/// Ordered phases of one analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBoard {
    phases: Vec<AnalysisPhase>,
    current_index: usize,
}

impl PhaseBoard {
    /// All phases pending, index 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phases: PHASE_NAMES
                .iter()
                .map(|name| AnalysisPhase {
                    name: (*name).to_string(),
                    status: PhaseStatus::Pending,
                })
                .collect(),
            current_index: 0,
        }
    }

    /// Phases in order.
    #[must_use]
    pub fn phases(&self) -> &[AnalysisPhase] {
        &self.phases
    }

    /// Index of the furthest phase reached.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Advance phases for a started tool. Returns whether a rule applied.
    pub fn advance_for_tool(&mut self, tool_name: &str) -> bool {
        let current = self.current_index;
        let Some(rule) = PHASE_RULES
            .iter()
            .find(|rule| tool_name.contains(rule.marker) && current <= rule.max_index)
        else {
            return false;
        };

        for &index in rule.completes {
            self.set_status(index, PhaseStatus::Done);
        }
        self.set_status(rule.starts, PhaseStatus::Running);
        self.current_index = rule.starts;
        true
    }

    /// Mark every phase not in error as done.
    pub fn finish(&mut self) {
        for phase in &mut self.phases {
            if phase.status != PhaseStatus::Error {
                phase.status = PhaseStatus::Done;
            }
        }
    }

    /// Move the current phase from running to error. Returns whether it changed.
    pub fn fail_current(&mut self) -> bool {
        self.set_status(self.current_index, PhaseStatus::Error)
    }

    fn set_status(&mut self, index: usize, status: PhaseStatus) -> bool {
        match self.phases.get_mut(index) {
            Some(phase) if phase.status.can_become(status) => {
                phase.status = status;
                true
            }
            _ => false,
        }
    }
}

impl Default for PhaseBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::PhaseStatus::{Done, Error, Pending, Running};
    use super::{PhaseBoard, PhaseStatus};

    fn statuses(board: &PhaseBoard) -> Vec<PhaseStatus> {
        board.phases().iter().map(|phase| phase.status).collect()
    }

    #[test]
    fn starts_pending() {
        let board = PhaseBoard::new();
        assert_eq!(board.phases().len(), 6);
        assert_eq!(board.phases()[0].name, "metadata");
        assert_eq!(board.phases()[5].name, "report");
        assert!(statuses(&board).iter().all(|s| *s == Pending));
    }

    #[test]
    fn follows_the_usual_tool_order() {
        let mut board = PhaseBoard::new();
        assert!(board.advance_for_tool("get_repo_meta"));
        assert_eq!(statuses(&board), vec![Running, Pending, Pending, Pending, Pending, Pending]);

        assert!(board.advance_for_tool("list_repo_files"));
        assert_eq!(statuses(&board), vec![Done, Running, Pending, Pending, Pending, Pending]);
        assert_eq!(board.current_index(), 1);

        assert!(board.advance_for_tool("read_repo_file"));
        assert_eq!(statuses(&board), vec![Done, Done, Done, Running, Pending, Pending]);
        assert_eq!(board.current_index(), 3);

        assert!(board.advance_for_tool("pack_repository"));
        assert_eq!(statuses(&board), vec![Done, Done, Done, Done, Running, Pending]);
        assert_eq!(board.current_index(), 4);
    }

    #[test]
    fn never_moves_backwards() {
        let mut board = PhaseBoard::new();
        board.advance_for_tool("read_repo_file");
        assert!(!board.advance_for_tool("list_repo_files"));
        assert!(!board.advance_for_tool("get_repo_meta"));
        assert_eq!(board.current_index(), 3);
        assert_eq!(board.phases()[0].status, Pending);
    }

    #[test]
    fn meta_only_applies_at_start() {
        let mut board = PhaseBoard::new();
        board.advance_for_tool("list_repo_files");
        assert!(!board.advance_for_tool("get_repo_meta"));
        assert_eq!(board.phases()[0].status, Done);
    }

    #[test]
    fn unknown_tools_do_nothing() {
        let mut board = PhaseBoard::new();
        assert!(!board.advance_for_tool("search_code"));
        assert_eq!(board, PhaseBoard::new());
    }

    #[test]
    fn finish_keeps_errors() {
        let mut board = PhaseBoard::new();
        board.advance_for_tool("list_repo_files");
        assert!(board.fail_current());
        board.finish();
        assert_eq!(statuses(&board), vec![Done, Error, Done, Done, Done, Done]);
    }

    #[test]
    fn error_only_from_running() {
        let mut board = PhaseBoard::new();
        assert!(!board.fail_current());
        board.finish();
        board.advance_for_tool("get_repo_meta");
        assert_eq!(board.phases()[0].status, Done);
    }

    #[test]
    fn transition_table() {
        assert!(Pending.can_become(Running));
        assert!(Pending.can_become(Done));
        assert!(!Pending.can_become(Error));
        assert!(Running.can_become(Error));
        assert!(!Done.can_become(Running));
        assert!(!Error.can_become(Done));
    }
}
