//! Effects (store mutations as data).
//!
//! Transitions never touch the store. They describe each row-level change
//! as an `Effect`, and the server's interpreter replays them inside the
//! transaction that loaded the group.

use chrono::{DateTime, Utc};

use crate::ids::{RequestId, StudentId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Insert a membership row.
    AddMember { student: StudentId },

    /// Delete a membership row.
    RemoveMember { student: StudentId },

    /// Point `owner_id` at another current member.
    TransferOwnership { from: StudentId, to: StudentId },

    /// Overwrite the group's editable settings with these values.
    UpdateDetails {
        location: String,
        meeting_time: DateTime<Utc>,
        meeting_day: Option<String>,
        capacity: u32,
        is_private: bool,
    },

    /// Insert a pending join request; the store assigns its id.
    InsertRequest {
        student: StudentId,
        message: Option<String>,
        created_at: DateTime<Utc>,
    },

    /// Delete a pending join request.
    DeleteRequest { request: RequestId },

    /// Delete the group. Memberships and requests go with it.
    DeleteGroup,
}
