//! State types for the membership state machine.
//!
//! A `StudyGroup` is always loaded as a whole: the group row, its member
//! set and its pending join requests. Transitions only ever see a complete
//! snapshot, so every precondition is evaluated against consistent data.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ids::{CourseId, GroupId, RequestId, SemesterId, StudentId};

/// Capacity given to newly created groups.
pub const DEFAULT_CAPACITY: u32 = 5;

/// Longest message a student may attach to a join request.
pub const MAX_REQUEST_MESSAGE_LEN: usize = 500;

/// A pending ask to join a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// `None` until the store has assigned a key.
    pub id: Option<RequestId>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A study group with its full membership picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyGroup {
    pub id: GroupId,
    pub owner_id: StudentId,
    pub capacity: u32,
    pub is_private: bool,
    pub course_id: CourseId,
    pub semester_id: SemesterId,
    pub location: String,
    pub meeting_time: DateTime<Utc>,
    pub meeting_day: Option<String>,
    /// Ordered by student id, which makes owner succession deterministic.
    pub members: BTreeSet<StudentId>,
    /// Keyed by requesting student: at most one pending request per student.
    pub pending: BTreeMap<StudentId, JoinRequest>,
}

impl StudyGroup {
    pub fn is_member(&self, student: StudentId) -> bool {
        self.members.contains(&student)
    }

    pub fn is_owner(&self, student: StudentId) -> bool {
        self.owner_id == student
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity as usize
    }

    pub fn has_pending_request(&self, student: StudentId) -> bool {
        self.pending.contains_key(&student)
    }

    /// Find a pending request by its store key.
    pub fn find_request(&self, request_id: RequestId) -> Option<(StudentId, &JoinRequest)> {
        self.pending
            .iter()
            .find(|(_, request)| request.id == Some(request_id))
            .map(|(student, request)| (*student, request))
    }

    /// The member who would inherit ownership if the owner left: the
    /// remaining member with the smallest id.
    pub fn successor_owner(&self) -> Option<StudentId> {
        self.members
            .iter()
            .copied()
            .find(|member| *member != self.owner_id)
    }

    /// Describe the first violated structural invariant, if any.
    pub fn invariant_violation(&self) -> Option<String> {
        if self.capacity == 0 {
            return Some("capacity must be positive".to_string());
        }
        if !self.members.contains(&self.owner_id) {
            return Some(format!("owner {} is not a member", self.owner_id));
        }
        if self.members.len() > self.capacity as usize {
            return Some(format!(
                "{} members exceed capacity {}",
                self.members.len(),
                self.capacity
            ));
        }
        None
    }
}

/// Fields supplied when creating a group. The creator becomes the owner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewStudyGroup {
    pub course_id: CourseId,
    pub semester_id: SemesterId,
    pub location: String,
    pub meeting_time: DateTime<Utc>,
    #[serde(default)]
    pub meeting_day: Option<String>,
}

impl NewStudyGroup {
    /// Build the initial state: capacity 5, public, creator as sole member.
    pub fn into_group(self, id: GroupId, creator: StudentId) -> StudyGroup {
        StudyGroup {
            id,
            owner_id: creator,
            capacity: DEFAULT_CAPACITY,
            is_private: false,
            course_id: self.course_id,
            semester_id: self.semester_id,
            location: self.location,
            meeting_time: self.meeting_time,
            meeting_day: self.meeting_day,
            members: BTreeSet::from([creator]),
            pending: BTreeMap::new(),
        }
    }
}

/// Partial update of a group's settings. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GroupUpdate {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub meeting_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meeting_day: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn meeting_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 14, 18, 30, 0).unwrap()
    }

    /// A public group with capacity 5 owned by the first listed member.
    pub fn group_with(members: &[i64]) -> StudyGroup {
        StudyGroup {
            id: GroupId(1),
            owner_id: StudentId(members[0]),
            capacity: DEFAULT_CAPACITY,
            is_private: false,
            course_id: CourseId(10),
            semester_id: SemesterId(20),
            location: "Main Library, Room 2".to_string(),
            meeting_time: meeting_time(),
            meeting_day: Some("Monday".to_string()),
            members: members.iter().copied().map(StudentId).collect(),
            pending: BTreeMap::new(),
        }
    }

    pub fn with_request(mut group: StudyGroup, request_id: i64, student: i64) -> StudyGroup {
        group.pending.insert(
            StudentId(student),
            JoinRequest {
                id: Some(RequestId(request_id)),
                message: Some("hi".to_string()),
                created_at: meeting_time(),
            },
        );
        group
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_successor_is_smallest_remaining_id() {
        let mut group = group_with(&[5, 9, 3, 7]);
        group.owner_id = StudentId(5);
        assert_eq!(group.successor_owner(), Some(StudentId(3)));

        group.owner_id = StudentId(3);
        assert_eq!(group.successor_owner(), Some(StudentId(5)));
    }

    #[test]
    fn test_successor_none_when_owner_alone() {
        let group = group_with(&[1]);
        assert_eq!(group.successor_owner(), None);
    }

    #[test]
    fn test_new_group_defaults() {
        let group = NewStudyGroup {
            course_id: CourseId(1),
            semester_id: SemesterId(2),
            location: "Quad".to_string(),
            meeting_time: meeting_time(),
            meeting_day: None,
        }
        .into_group(GroupId(3), StudentId(4));

        assert_eq!(group.capacity, DEFAULT_CAPACITY);
        assert!(!group.is_private);
        assert_eq!(group.owner_id, StudentId(4));
        assert_eq!(group.members.len(), 1);
        assert!(group.invariant_violation().is_none());
    }

    #[test]
    fn test_invariant_violation_detects_missing_owner() {
        let mut group = group_with(&[1, 2]);
        group.members.remove(&StudentId(1));
        assert!(group.invariant_violation().is_some());
    }

    #[test]
    fn test_find_request_by_id() {
        let group = with_request(group_with(&[1]), 77, 2);
        let (student, request) = group.find_request(RequestId(77)).unwrap();
        assert_eq!(student, StudentId(2));
        assert_eq!(request.message.as_deref(), Some("hi"));
        assert!(group.find_request(RequestId(78)).is_none());
    }

    #[test]
    fn test_group_update_deserializes_partial_body() {
        let update: GroupUpdate = serde_json::from_str(r#"{"capacity": 8}"#).unwrap();
        assert_eq!(update.capacity, Some(8));
        assert_eq!(update.location, None);
        assert_eq!(update.is_private, None);
    }
}
