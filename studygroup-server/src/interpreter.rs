//! Effect interpreter.
//!
//! The boundary between the pure transition function and the store: it
//! takes the effects a transition produced and replays them against the
//! open transaction, in order. Any failure aborts the whole unit of work
//! because the caller's transaction is rolled back.

use tracing::info;

use studygroup_core::{
    transition, Command, Effect, GroupError, GroupId, GroupOutcome, RequestId, StudentId,
    StudyGroup,
};

use crate::error::ApiError;
use crate::repository::{RepositoryError, Tx};

/// Data produced while applying effects that the transition could not know.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AppliedEffects {
    /// Key assigned to a request inserted by `InsertRequest`.
    pub inserted_request: Option<RequestId>,
    /// Students added to the group, in effect order.
    pub added_members: Vec<StudentId>,
}

/// Apply `effects` for group `group` inside `tx`.
pub fn apply_effects(
    tx: &Tx<'_>,
    group: GroupId,
    effects: &[Effect],
) -> Result<AppliedEffects, RepositoryError> {
    let mut applied = AppliedEffects::default();

    for effect in effects {
        match effect {
            Effect::AddMember { student } => {
                tx.add_member(group, *student)?;
                info!("Student {} joined study group {}", student, group);
                applied.added_members.push(*student);
            }
            Effect::RemoveMember { student } => {
                tx.remove_member(group, *student)?;
                info!("Student {} left study group {}", student, group);
            }
            Effect::TransferOwnership { from, to } => {
                tx.set_owner(group, *to)?;
                info!(
                    "Ownership of study group {} transferred from {} to {}",
                    group, from, to
                );
            }
            Effect::UpdateDetails {
                location,
                meeting_time,
                meeting_day,
                capacity,
                is_private,
            } => {
                tx.update_details(
                    group,
                    location,
                    *meeting_time,
                    meeting_day.as_deref(),
                    *capacity,
                    *is_private,
                )?;
            }
            Effect::InsertRequest {
                student,
                message,
                created_at,
            } => {
                let id = tx.insert_request(group, *student, message.as_deref(), *created_at)?;
                info!(
                    "Student {} requested to join study group {} (request {})",
                    student, group, id
                );
                applied.inserted_request = Some(id);
            }
            Effect::DeleteRequest { request } => {
                tx.delete_request(*request)?;
            }
            Effect::DeleteGroup => {
                tx.delete_group(group)?;
                info!("Study group {} deleted", group);
            }
        }
    }

    Ok(applied)
}

/// Result of running one command against a stored group.
#[derive(Debug)]
pub struct Executed {
    /// Group state after the command, `None` if the group was deleted.
    pub group: Option<StudyGroup>,
    pub applied: AppliedEffects,
}

/// Load the group, run `command` through the transition function, and apply
/// the resulting effects. Must be called inside a write transaction.
pub fn execute(tx: &Tx<'_>, group_id: GroupId, command: Command) -> Result<Executed, ApiError> {
    let group = tx
        .load_group(group_id)?
        .ok_or(GroupError::GroupNotFound)?;

    let name = command.name();
    let result = transition(group, command).map_err(|e| {
        info!("Rejected {} on study group {}: {}", name, group_id, e);
        e
    })?;
    let applied = apply_effects(tx, group_id, &result.effects)?;

    let group = match result.outcome {
        GroupOutcome::Active(mut group) => {
            if let Some(id) = applied.inserted_request {
                for request in group.pending.values_mut() {
                    request.id.get_or_insert(id);
                }
            }
            Some(group)
        }
        GroupOutcome::Deleted => None,
    };

    Ok(Executed { group, applied })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteRepository;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use studygroup_core::{GroupUpdate, NewStudyGroup};

    async fn repo_with_group(members: usize) -> (SqliteRepository, GroupId, Vec<StudentId>) {
        let repo = SqliteRepository::new_in_memory().unwrap();
        let (group, students) = repo
            .write("seed", move |tx| {
                let semester = tx.find_or_create_semester("Fall", 2026)?;
                let course = tx.find_or_create_course("CS", "1337", "Hopper", semester.id)?;
                let students = (0..members + 3)
                    .map(|i| tx.insert_student(&format!("s{i}@campus.edu"), "hash"))
                    .collect::<Result<Vec<_>, _>>()?;
                let group = tx.create_group(
                    NewStudyGroup {
                        course_id: course.id,
                        semester_id: semester.id,
                        location: "Quad".to_string(),
                        meeting_time: Utc.with_ymd_and_hms(2026, 9, 14, 18, 0, 0).unwrap(),
                        meeting_day: None,
                    },
                    students[0],
                )?;
                for student in &students[1..members] {
                    tx.add_member(group.id, *student)?;
                }
                Ok::<_, RepositoryError>((group.id, students))
            })
            .await
            .unwrap();
        (repo, group, students)
    }

    #[tokio::test]
    async fn test_owner_leave_persists_transfer() {
        let (repo, group, students) = repo_with_group(3).await;
        let owner = students[0];

        let stored = repo
            .write("leave", move |tx| {
                execute(tx, group, Command::Leave { student: owner })?;
                Ok::<_, ApiError>(tx.load_group(group)?)
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stored.owner_id, students[1]);
        assert!(!stored.is_member(owner));
        assert_eq!(stored.members.len(), 2);
    }

    #[tokio::test]
    async fn test_sole_owner_leave_deletes_group() {
        let (repo, group, students) = repo_with_group(1).await;
        let owner = students[0];

        let (executed, stored) = repo
            .write("leave", move |tx| {
                let executed = execute(tx, group, Command::Leave { student: owner })?;
                Ok::<_, ApiError>((executed, tx.load_group(group)?))
            })
            .await
            .unwrap();

        assert!(executed.group.is_none());
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_submitted_request_gets_store_id() {
        let (repo, group, students) = repo_with_group(1).await;
        let outsider = students[1];

        let executed = repo
            .write("submit", move |tx| {
                execute(
                    tx,
                    group,
                    Command::SubmitRequest {
                        student: outsider,
                        message: None,
                        now: Utc::now(),
                    },
                )
            })
            .await
            .unwrap();

        let id = executed.applied.inserted_request.unwrap();
        let group = executed.group.unwrap();
        assert_eq!(group.find_request(id).map(|(s, _)| s), Some(outsider));
    }

    #[tokio::test]
    async fn test_rejected_command_changes_nothing() {
        let (repo, group, students) = repo_with_group(2).await;
        let member = students[1];

        let err = repo
            .write("kick", move |tx| {
                execute(
                    tx,
                    group,
                    Command::Kick {
                        requester: member,
                        target: member,
                        target_exists: true,
                    },
                )
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Group(GroupError::NotOwner { .. })));

        let stored = repo
            .read::<_, RepositoryError, _>("load", move |tx| tx.load_group(group))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.members.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_group_not_found() {
        let (repo, _, students) = repo_with_group(1).await;
        let student = students[0];

        let err = repo
            .write("join", move |tx| {
                execute(tx, GroupId(999), Command::Join { student })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Group(GroupError::GroupNotFound)));
    }

    #[tokio::test]
    async fn test_accept_reports_admitted_student() {
        let (repo, group, students) = repo_with_group(1).await;
        let (owner, outsider) = (students[0], students[1]);

        let executed = repo
            .write("accept", move |tx| {
                let submitted = execute(
                    tx,
                    group,
                    Command::SubmitRequest {
                        student: outsider,
                        message: None,
                        now: Utc::now(),
                    },
                )?;
                let request = submitted
                    .applied
                    .inserted_request
                    .ok_or_else(|| ApiError::Internal("no request id".to_string()))?;
                execute(
                    tx,
                    group,
                    Command::AcceptRequest {
                        accepter: owner,
                        request,
                    },
                )
            })
            .await
            .unwrap();

        assert_eq!(executed.applied.added_members, vec![outsider]);
    }

    #[tokio::test]
    async fn test_stale_accept_admits_nobody() {
        let (repo, group, students) = repo_with_group(1).await;
        let (owner, outsider) = (students[0], students[1]);

        let executed = repo
            .write("accept", move |tx| {
                let submitted = execute(
                    tx,
                    group,
                    Command::SubmitRequest {
                        student: outsider,
                        message: None,
                        now: Utc::now(),
                    },
                )?;
                let request = submitted
                    .applied
                    .inserted_request
                    .ok_or_else(|| ApiError::Internal("no request id".to_string()))?;
                execute(tx, group, Command::Join { student: outsider })?;
                execute(
                    tx,
                    group,
                    Command::AcceptRequest {
                        accepter: owner,
                        request,
                    },
                )
            })
            .await
            .unwrap();

        assert!(executed.applied.added_members.is_empty());
        assert!(executed.group.unwrap().pending.is_empty());
    }

    // =========================================================================
    // Property tests
    // =========================================================================

    /// Commands issued by and against `students`.
    fn arb_command(students: Vec<StudentId>) -> impl Strategy<Value = Command> {
        let pick = move || proptest::sample::select(students.clone());
        prop_oneof![
            pick().prop_map(|student| Command::Join { student }),
            pick().prop_map(|student| Command::Leave { student }),
            (pick(), pick()).prop_map(|(requester, target)| Command::Kick {
                requester,
                target,
                target_exists: true,
            }),
            (pick(), 1u32..5).prop_map(|(requester, capacity)| Command::Update {
                requester,
                update: GroupUpdate {
                    capacity: Some(capacity),
                    ..Default::default()
                },
            }),
            pick().prop_map(|student| Command::SubmitRequest {
                student,
                message: None,
                now: Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap(),
            }),
            (pick(), 1i64..8).prop_map(|(accepter, request)| Command::AcceptRequest {
                accepter,
                request: RequestId(request),
            }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Property: after every accepted command the stored group equals the
        /// state the transition function returned.
        #[test]
        fn stored_group_matches_transition_state(
            commands in proptest::collection::vec(
                arb_command((1..=5).map(StudentId).collect()),
                0..25,
            )
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (repo, group, students) = repo_with_group(2).await;
                assert_eq!(
                    students.iter().map(|s| s.0).collect::<Vec<_>>(),
                    vec![1, 2, 3, 4, 5]
                );

                for command in commands {
                    let (executed, stored) = repo
                        .write("step", move |tx| {
                            let executed = execute(tx, group, command);
                            Ok::<_, ApiError>((executed, tx.load_group(group)?))
                        })
                        .await
                        .unwrap();

                    match executed {
                        Ok(executed) => {
                            assert_eq!(executed.group, stored);
                            if let Some(stored) = &stored {
                                assert!(
                                    stored.invariant_violation().is_none(),
                                    "{:?}",
                                    stored.invariant_violation()
                                );
                            }
                        }
                        Err(ApiError::Group(GroupError::GroupNotFound)) => {
                            assert!(stored.is_none());
                        }
                        Err(ApiError::Group(_)) => {}
                        Err(other) => panic!("store failure: {other}"),
                    }
                }
            });
        }
    }
}
