//! Study group endpoints.
//!
//! Every mutating handler runs one write transaction that loads the group,
//! feeds a [`Command`] to the transition function, applies the resulting
//! effects and, where the response needs it, renders the new state.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tracing::info;

use studygroup_core::{
    Command, GroupError, GroupId, GroupUpdate, NewStudyGroup, RequestId, StudentId,
};

use crate::auth::CurrentStudent;
use crate::dto::{PendingRequestDto, StudyGroupDto, SubmitRequestBody, SubmittedRequestDto};
use crate::error::ApiError;
use crate::interpreter::execute;
use crate::AppState;

/// Run `command` against `group_id` and render the surviving group.
async fn run_command(
    state: &AppState,
    operation: &'static str,
    group_id: GroupId,
    command: Command,
) -> Result<StudyGroupDto, ApiError> {
    state
        .repository
        .write(operation, move |tx| {
            let executed = execute(tx, group_id, command)?;
            let group = executed.group.ok_or(GroupError::GroupNotFound)?;
            Ok(StudyGroupDto::load(tx, &group)?)
        })
        .await
}

/// Run `command` against `group_id` for its effects only.
async fn run_command_silently(
    state: &AppState,
    operation: &'static str,
    group_id: GroupId,
    command: Command,
) -> Result<(), ApiError> {
    state
        .repository
        .write(operation, move |tx| {
            execute(tx, group_id, command)?;
            Ok(())
        })
        .await
}

/// Handler: GET /study-group/:id
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<GroupId>,
) -> Result<Json<StudyGroupDto>, ApiError> {
    let dto = state
        .repository
        .read("get group", move |tx| {
            let group = tx
                .load_group(group_id)?
                .ok_or(GroupError::GroupNotFound)?;
            Ok::<_, ApiError>(StudyGroupDto::load(tx, &group)?)
        })
        .await?;
    Ok(Json(dto))
}

/// Handler: POST /study-group/
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    CurrentStudent(creator): CurrentStudent,
    Json(body): Json<NewStudyGroup>,
) -> Result<(StatusCode, Json<StudyGroupDto>), ApiError> {
    let dto = state
        .repository
        .write("create group", move |tx| {
            if tx.course(body.course_id)?.is_none() {
                return Err(GroupError::CourseNotFound.into());
            }
            if tx.semester(body.semester_id)?.is_none() {
                return Err(GroupError::SemesterNotFound.into());
            }
            let group = tx.create_group(body, creator)?;
            info!(
                "Student {} created study group {} for course {}",
                creator, group.id, group.course_id
            );
            Ok::<_, ApiError>(StudyGroupDto::load(tx, &group)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

/// Handler: POST /study-group/:id
///
/// Direct join of a public group.
pub async fn join_group(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
    Path(group_id): Path<GroupId>,
) -> Result<(StatusCode, Json<StudyGroupDto>), ApiError> {
    let dto = run_command(&state, "join group", group_id, Command::Join { student }).await?;
    Ok((StatusCode::ACCEPTED, Json(dto)))
}

/// Handler: PATCH /study-group/:id
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    CurrentStudent(requester): CurrentStudent,
    Path(group_id): Path<GroupId>,
    Json(update): Json<GroupUpdate>,
) -> Result<Json<StudyGroupDto>, ApiError> {
    let dto = run_command(
        &state,
        "update group",
        group_id,
        Command::Update { requester, update },
    )
    .await?;
    Ok(Json(dto))
}

/// Handler: DELETE /study-group/:id
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    CurrentStudent(requester): CurrentStudent,
    Path(group_id): Path<GroupId>,
) -> Result<StatusCode, ApiError> {
    run_command_silently(
        &state,
        "delete group",
        group_id,
        Command::Delete { requester },
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: POST /study-group/:id/leave
pub async fn leave_group(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
    Path(group_id): Path<GroupId>,
) -> Result<StatusCode, ApiError> {
    run_command_silently(&state, "leave group", group_id, Command::Leave { student }).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: POST /study-group/:id/kick/:student_id
pub async fn kick_member(
    State(state): State<Arc<AppState>>,
    CurrentStudent(requester): CurrentStudent,
    Path((group_id, target)): Path<(GroupId, StudentId)>,
) -> Result<StatusCode, ApiError> {
    state
        .repository
        .write("kick member", move |tx| {
            let target_exists = tx.student_exists(target)?;
            execute(
                tx,
                group_id,
                Command::Kick {
                    requester,
                    target,
                    target_exists,
                },
            )?;
            Ok::<_, ApiError>(())
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The request body is optional, but if present it must be a valid
/// [`SubmitRequestBody`].
fn parse_submit_body(body: &[u8]) -> Result<SubmitRequestBody, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SubmitRequestBody::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}

/// Handler: POST /study-group/:id/request
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
    Path(group_id): Path<GroupId>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmittedRequestDto>), ApiError> {
    let message = parse_submit_body(&body)?.message;
    let now = Utc::now();

    let dto = state
        .repository
        .write("submit join request", move |tx| {
            let executed = execute(
                tx,
                group_id,
                Command::SubmitRequest {
                    student,
                    message: message.clone(),
                    now,
                },
            )?;
            let id = executed
                .applied
                .inserted_request
                .ok_or_else(|| ApiError::Internal("join request was not stored".to_string()))?;
            Ok::<_, ApiError>(SubmittedRequestDto {
                id,
                study_group_id: group_id,
                message,
                created_at: now,
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

/// Handler: GET /study-group/:id/requests
///
/// Pending requests, oldest first. Only the owner may look.
pub async fn list_group_requests(
    State(state): State<Arc<AppState>>,
    CurrentStudent(requester): CurrentStudent,
    Path(group_id): Path<GroupId>,
) -> Result<Json<Vec<PendingRequestDto>>, ApiError> {
    let requests = state
        .repository
        .read("list group requests", move |tx| {
            let group = tx
                .load_group(group_id)?
                .ok_or(GroupError::GroupNotFound)?;
            if !group.is_owner(requester) {
                return Err(GroupError::NotOwner {
                    action: "view join requests",
                }
                .into());
            }
            Ok::<_, ApiError>(tx.group_requests(group_id)?)
        })
        .await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// Handler: POST /study-group/:id/request/:request_id/accept
pub async fn accept_request(
    State(state): State<Arc<AppState>>,
    CurrentStudent(accepter): CurrentStudent,
    Path((group_id, request)): Path<(GroupId, RequestId)>,
) -> Result<(StatusCode, Json<StudyGroupDto>), ApiError> {
    let (dto, admitted) = state
        .repository
        .write("accept join request", move |tx| {
            let executed = execute(tx, group_id, Command::AcceptRequest { accepter, request })?;
            let group = executed.group.ok_or(GroupError::GroupNotFound)?;
            let dto = StudyGroupDto::load(tx, &group)?;
            Ok::<_, ApiError>((dto, executed.applied.added_members))
        })
        .await?;

    if admitted.is_empty() {
        info!(
            "Join request {} for study group {} closed; its author was already a member",
            request, group_id
        );
    } else {
        info!(
            "Student {} accepted join request {} for study group {}",
            accepter, request, group_id
        );
    }
    Ok((StatusCode::ACCEPTED, Json(dto)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/study-group/", post(create_group))
        .route(
            "/study-group/:id",
            get(get_group)
                .post(join_group)
                .patch(update_group)
                .delete(delete_group),
        )
        .route("/study-group/:id/leave", post(leave_group))
        .route("/study-group/:id/kick/:student_id", post(kick_member))
        .route("/study-group/:id/request", post(submit_request))
        .route("/study-group/:id/requests", get(list_group_requests))
        .route(
            "/study-group/:id/request/:request_id/accept",
            post(accept_request),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_submit_body_has_no_message() {
        assert_eq!(parse_submit_body(b"").unwrap().message, None);
        assert_eq!(parse_submit_body(b" \n").unwrap().message, None);
        assert_eq!(parse_submit_body(b"{}").unwrap().message, None);
    }

    #[test]
    fn test_submit_body_message() {
        let body = parse_submit_body(br#"{"message": "Room for one more?"}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("Room for one more?"));
    }

    #[test]
    fn test_malformed_submit_body_rejected() {
        for body in [&br#"{"message": 42}"#[..], b"{", b"message=hi"] {
            assert!(matches!(
                parse_submit_body(body),
                Err(ApiError::BadRequest(_))
            ));
        }
    }
}
