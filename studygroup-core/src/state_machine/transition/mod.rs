//! Pure state transition function.
//!
//! `transition` takes the current group and a command and either rejects
//! the command or returns the new group state together with the effects
//! that move the store to that state. It has no side effects.
//!
//! Handlers are split by workflow, each with co-located tests:
//! - `membership`: join, leave, kick, delete, update
//! - `requests`: submit and accept join requests

mod membership;
mod requests;

use super::command::Command;
use super::effect::Effect;
use super::state::StudyGroup;
use crate::error::GroupError;

/// What remains of the group after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Active(StudyGroup),
    /// The group no longer exists.
    Deleted,
}

impl GroupOutcome {
    pub fn group(&self) -> Option<&StudyGroup> {
        match self {
            Self::Active(group) => Some(group),
            Self::Deleted => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Result of an accepted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub outcome: GroupOutcome,
    /// Effects to apply, in order.
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn active(group: StudyGroup, effects: Vec<Effect>) -> Self {
        Self {
            outcome: GroupOutcome::Active(group),
            effects,
        }
    }

    pub fn deleted() -> Self {
        Self {
            outcome: GroupOutcome::Deleted,
            effects: vec![Effect::DeleteGroup],
        }
    }
}

/// Pure state transition function.
pub fn transition(group: StudyGroup, command: Command) -> Result<TransitionResult, GroupError> {
    match command {
        Command::Join { student } => membership::join(group, student),
        Command::Leave { student } => membership::leave(group, student),
        Command::Kick {
            requester,
            target,
            target_exists,
        } => membership::kick(group, requester, target, target_exists),
        Command::Delete { requester } => membership::delete(group, requester),
        Command::Update { requester, update } => membership::update(group, requester, update),
        Command::SubmitRequest {
            student,
            message,
            now,
        } => requests::submit(group, student, message, now),
        Command::AcceptRequest { accepter, request } => {
            requests::accept(group, accepter, request)
        }
    }
}
