//! Join-request transitions: submit and accept.
//!
//! Submission checks neither privacy nor capacity, so a group can hold more
//! pending requests than it has free slots. Capacity is enforced only when
//! the owner accepts.

use chrono::{DateTime, Utc};

use super::TransitionResult;
use crate::error::GroupError;
use crate::ids::{RequestId, StudentId};
use crate::state_machine::effect::Effect;
use crate::state_machine::state::{JoinRequest, StudyGroup, MAX_REQUEST_MESSAGE_LEN};

pub(super) fn submit(
    mut group: StudyGroup,
    student: StudentId,
    message: Option<String>,
    now: DateTime<Utc>,
) -> Result<TransitionResult, GroupError> {
    if group.is_member(student) {
        return Err(GroupError::RequesterAlreadyMember);
    }
    if group.has_pending_request(student) {
        return Err(GroupError::DuplicateRequest);
    }
    if message
        .as_ref()
        .is_some_and(|m| m.chars().count() > MAX_REQUEST_MESSAGE_LEN)
    {
        return Err(GroupError::MessageTooLong {
            max: MAX_REQUEST_MESSAGE_LEN,
        });
    }

    group.pending.insert(
        student,
        JoinRequest {
            id: None,
            message: message.clone(),
            created_at: now,
        },
    );
    Ok(TransitionResult::active(
        group,
        vec![Effect::InsertRequest {
            student,
            message,
            created_at: now,
        }],
    ))
}

/// Accept a pending request.
///
/// A request whose author already joined directly is simply consumed: the
/// call succeeds and membership is left as it is.
pub(super) fn accept(
    mut group: StudyGroup,
    accepter: StudentId,
    request_id: RequestId,
) -> Result<TransitionResult, GroupError> {
    if !group.is_owner(accepter) {
        return Err(GroupError::NotOwner {
            action: "accept join requests",
        });
    }
    let Some((student, _)) = group.find_request(request_id) else {
        return Err(GroupError::RequestNotFound);
    };

    if group.is_member(student) {
        group.pending.remove(&student);
        return Ok(TransitionResult::active(
            group,
            vec![Effect::DeleteRequest {
                request: request_id,
            }],
        ));
    }
    if group.is_full() {
        return Err(GroupError::GroupFull);
    }

    group.pending.remove(&student);
    group.members.insert(student);
    Ok(TransitionResult::active(
        group,
        vec![
            Effect::AddMember { student },
            Effect::DeleteRequest {
                request: request_id,
            },
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::state::test_support::*;

    // ---- submit ----

    #[test]
    fn test_submit_creates_pending_request() {
        let result = submit(
            group_with(&[1]),
            StudentId(2),
            Some("hi".to_string()),
            meeting_time(),
        )
        .unwrap();
        let group = result.outcome.group().unwrap();
        let request = &group.pending[&StudentId(2)];
        assert_eq!(request.id, None);
        assert_eq!(request.message.as_deref(), Some("hi"));
        assert_eq!(
            result.effects,
            vec![Effect::InsertRequest {
                student: StudentId(2),
                message: Some("hi".to_string()),
                created_at: meeting_time(),
            }]
        );
    }

    #[test]
    fn test_submit_ignores_privacy_and_capacity() {
        let mut group = group_with(&[1, 2, 3, 4, 5]);
        group.is_private = true;
        assert!(submit(group, StudentId(6), None, meeting_time()).is_ok());
    }

    #[test]
    fn test_member_cannot_submit() {
        let err = submit(group_with(&[1, 2]), StudentId(2), None, meeting_time()).unwrap_err();
        assert_eq!(err, GroupError::RequesterAlreadyMember);
    }

    #[test]
    fn test_duplicate_submit_rejected() {
        let group = with_request(group_with(&[1]), 4, 2);
        let err = submit(group, StudentId(2), None, meeting_time()).unwrap_err();
        assert_eq!(err, GroupError::DuplicateRequest);
    }

    #[test]
    fn test_overlong_message_rejected() {
        let message = "x".repeat(MAX_REQUEST_MESSAGE_LEN + 1);
        let err = submit(group_with(&[1]), StudentId(2), Some(message), meeting_time())
            .unwrap_err();
        assert!(matches!(err, GroupError::MessageTooLong { .. }));
    }

    // ---- accept ----

    #[test]
    fn test_accept_adds_member_and_consumes_request() {
        let group = with_request(group_with(&[1]), 4, 2);
        let result = accept(group, StudentId(1), RequestId(4)).unwrap();
        let group = result.outcome.group().unwrap();
        assert!(group.is_member(StudentId(2)));
        assert!(group.pending.is_empty());
        assert_eq!(
            result.effects,
            vec![
                Effect::AddMember {
                    student: StudentId(2)
                },
                Effect::DeleteRequest {
                    request: RequestId(4)
                },
            ]
        );
    }

    #[test]
    fn test_accept_stale_request_is_idempotent() {
        // Student 2 joined directly after submitting.
        let group = with_request(group_with(&[1, 2]), 4, 2);
        let result = accept(group, StudentId(1), RequestId(4)).unwrap();
        let group = result.outcome.group().unwrap();
        assert_eq!(group.members.len(), 2);
        assert!(group.pending.is_empty());
        assert_eq!(
            result.effects,
            vec![Effect::DeleteRequest {
                request: RequestId(4)
            }]
        );
    }

    #[test]
    fn test_stale_accept_succeeds_even_when_full() {
        let group = with_request(group_with(&[1, 2, 3, 4, 5]), 4, 2);
        assert!(accept(group, StudentId(1), RequestId(4)).is_ok());
    }

    #[test]
    fn test_accept_by_non_owner_forbidden() {
        let group = with_request(group_with(&[1, 3]), 4, 2);
        let err = accept(group, StudentId(3), RequestId(4)).unwrap_err();
        assert!(matches!(err, GroupError::NotOwner { .. }));
    }

    #[test]
    fn test_accept_unknown_request_not_found() {
        let group = with_request(group_with(&[1]), 4, 2);
        let err = accept(group, StudentId(1), RequestId(5)).unwrap_err();
        assert_eq!(err, GroupError::RequestNotFound);
    }

    #[test]
    fn test_accept_into_full_group_rejected() {
        let group = with_request(group_with(&[1, 3, 4, 5, 6]), 4, 2);
        let err = accept(group, StudentId(1), RequestId(4)).unwrap_err();
        assert_eq!(err, GroupError::GroupFull);
    }
}
