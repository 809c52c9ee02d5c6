//! Business-rule violations raised by the membership engine.
//!
//! None of these are transient: retrying the same command against the same
//! state yields the same error. Store failures live in the server crate.

use std::fmt;

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    BadRequest,
    CapacityExceeded,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Forbidden => "forbidden",
            Self::BadRequest => "bad_request",
            Self::CapacityExceeded => "capacity_exceeded",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected group or join-request operation.
///
/// The `Display` text is the human-readable reason returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("Study group not found")]
    GroupNotFound,
    #[error("Join request not found")]
    RequestNotFound,
    #[error("Student not found")]
    StudentNotFound,
    #[error("Course not found")]
    CourseNotFound,
    #[error("Semester not found")]
    SemesterNotFound,

    #[error("Already a member of this study group")]
    AlreadyMember,

    #[error("Study group is private")]
    PrivateGroup,
    #[error("Only the owner may {action}")]
    NotOwner { action: &'static str },

    #[error("Study group is full")]
    GroupFull,

    #[error("Student is not a member of this group")]
    NotAMember,
    #[error("Requested member is not in this group")]
    TargetNotAMember,
    #[error("Owner cannot remove themselves from the group")]
    CannotKickOwner,
    #[error("Can't request to join a group you are already in")]
    RequesterAlreadyMember,
    #[error("Join request already submitted")]
    DuplicateRequest,
    #[error("Join request message exceeds {max} characters")]
    MessageTooLong { max: usize },
    #[error("Capacity {capacity} is invalid for a group with {members} members")]
    InvalidCapacity { capacity: u32, members: usize },
}

impl GroupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GroupNotFound
            | Self::RequestNotFound
            | Self::StudentNotFound
            | Self::CourseNotFound
            | Self::SemesterNotFound => ErrorKind::NotFound,
            Self::AlreadyMember => ErrorKind::Conflict,
            Self::PrivateGroup | Self::NotOwner { .. } => ErrorKind::Forbidden,
            Self::GroupFull => ErrorKind::CapacityExceeded,
            Self::NotAMember
            | Self::TargetNotAMember
            | Self::CannotKickOwner
            | Self::RequesterAlreadyMember
            | Self::DuplicateRequest
            | Self::MessageTooLong { .. }
            | Self::InvalidCapacity { .. } => ErrorKind::BadRequest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_owner_message_names_the_action() {
        let err = GroupError::NotOwner {
            action: "accept join requests",
        };
        assert_eq!(err.to_string(), "Only the owner may accept join requests");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(GroupError::GroupFull.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(GroupError::AlreadyMember.kind(), ErrorKind::Conflict);
        assert_eq!(GroupError::DuplicateRequest.kind(), ErrorKind::BadRequest);
        assert_eq!(GroupError::StudentNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorKind::CapacityExceeded.to_string(), "capacity_exceeded");
    }
}
