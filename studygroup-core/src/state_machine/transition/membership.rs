//! Membership transitions: join, leave, kick, delete, update.

use super::TransitionResult;
use crate::error::GroupError;
use crate::ids::StudentId;
use crate::state_machine::effect::Effect;
use crate::state_machine::state::{GroupUpdate, StudyGroup};

/// Direct join. Only public groups with a free slot accept it.
pub(super) fn join(
    mut group: StudyGroup,
    student: StudentId,
) -> Result<TransitionResult, GroupError> {
    if group.is_member(student) {
        return Err(GroupError::AlreadyMember);
    }
    if group.is_private {
        return Err(GroupError::PrivateGroup);
    }
    if group.is_full() {
        return Err(GroupError::GroupFull);
    }

    group.members.insert(student);
    Ok(TransitionResult::active(
        group,
        vec![Effect::AddMember { student }],
    ))
}

/// Leave the group. An owner hands over to the smallest remaining id;
/// an owner leaving alone deletes the group.
pub(super) fn leave(
    mut group: StudyGroup,
    student: StudentId,
) -> Result<TransitionResult, GroupError> {
    if !group.is_member(student) {
        return Err(GroupError::NotAMember);
    }

    let mut effects = Vec::with_capacity(2);
    if group.is_owner(student) {
        let Some(successor) = group.successor_owner() else {
            return Ok(TransitionResult::deleted());
        };
        effects.push(Effect::TransferOwnership {
            from: student,
            to: successor,
        });
        group.owner_id = successor;
    }

    group.members.remove(&student);
    effects.push(Effect::RemoveMember { student });
    Ok(TransitionResult::active(group, effects))
}

pub(super) fn kick(
    mut group: StudyGroup,
    requester: StudentId,
    target: StudentId,
    target_exists: bool,
) -> Result<TransitionResult, GroupError> {
    if !group.is_owner(requester) {
        return Err(GroupError::NotOwner {
            action: "remove members",
        });
    }
    if !target_exists {
        return Err(GroupError::StudentNotFound);
    }
    if !group.is_member(target) {
        return Err(GroupError::TargetNotAMember);
    }
    // Ownership only changes hands through leave.
    if group.is_owner(target) {
        return Err(GroupError::CannotKickOwner);
    }

    group.members.remove(&target);
    Ok(TransitionResult::active(
        group,
        vec![Effect::RemoveMember { student: target }],
    ))
}

pub(super) fn delete(
    group: StudyGroup,
    requester: StudentId,
) -> Result<TransitionResult, GroupError> {
    if !group.is_owner(requester) {
        return Err(GroupError::NotOwner {
            action: "delete this study group",
        });
    }
    Ok(TransitionResult::deleted())
}

pub(super) fn update(
    mut group: StudyGroup,
    requester: StudentId,
    update: GroupUpdate,
) -> Result<TransitionResult, GroupError> {
    if !group.is_owner(requester) {
        return Err(GroupError::NotOwner {
            action: "update this study group",
        });
    }
    if let Some(capacity) = update.capacity {
        if capacity == 0 || (capacity as usize) < group.members.len() {
            return Err(GroupError::InvalidCapacity {
                capacity,
                members: group.members.len(),
            });
        }
        group.capacity = capacity;
    }
    if let Some(location) = update.location {
        group.location = location;
    }
    if let Some(meeting_time) = update.meeting_time {
        group.meeting_time = meeting_time;
    }
    if let Some(meeting_day) = update.meeting_day {
        group.meeting_day = Some(meeting_day);
    }
    if let Some(is_private) = update.is_private {
        group.is_private = is_private;
    }

    let effect = Effect::UpdateDetails {
        location: group.location.clone(),
        meeting_time: group.meeting_time,
        meeting_day: group.meeting_day.clone(),
        capacity: group.capacity,
        is_private: group.is_private,
    };
    Ok(TransitionResult::active(group, vec![effect]))
}
