//! Commands issued against a single study group.
//!
//! A command carries everything the transition needs that is not part of
//! the group snapshot itself, such as the current time or whether a kick
//! target exists at all.

use chrono::{DateTime, Utc};

use super::state::GroupUpdate;
use crate::ids::{RequestId, StudentId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Direct join of a public group.
    Join { student: StudentId },

    /// Voluntary departure, with owner succession if needed.
    Leave { student: StudentId },

    /// Owner removes another member.
    Kick {
        requester: StudentId,
        target: StudentId,
        /// Whether `target` names an existing student.
        target_exists: bool,
    },

    /// Owner deletes the group outright.
    Delete { requester: StudentId },

    /// Owner edits meeting details, capacity or privacy.
    Update {
        requester: StudentId,
        update: GroupUpdate,
    },

    /// Non-member asks to be let in.
    SubmitRequest {
        student: StudentId,
        message: Option<String>,
        now: DateTime<Utc>,
    },

    /// Owner admits the author of a pending request.
    AcceptRequest {
        accepter: StudentId,
        request: RequestId,
    },
}

impl Command {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Kick { .. } => "kick",
            Self::Delete { .. } => "delete",
            Self::Update { .. } => "update",
            Self::SubmitRequest { .. } => "submit_request",
            Self::AcceptRequest { .. } => "accept_request",
        }
    }
}
