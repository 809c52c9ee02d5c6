//! Endpoints about the calling student: profile, groups and requests.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, patch},
    Json, Router,
};
use tracing::info;

use studygroup_core::{GroupError, ProfileUpdate};

use crate::auth::CurrentStudent;
use crate::dto::{MyJoinRequestDto, StudentDto, StudyGroupDto};
use crate::error::ApiError;
use crate::repository::{RepositoryError, StudentRecord};
use crate::AppState;

/// Handler: GET /
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Json<StudentDto>, ApiError> {
    let record = state
        .repository
        .read("me", move |tx| {
            Ok::<_, ApiError>(tx.student(student)?.ok_or(GroupError::StudentNotFound)?)
        })
        .await?;
    Ok(Json(record.into()))
}

/// Handler: PATCH /profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<StudentDto>, ApiError> {
    if update
        .email
        .as_deref()
        .is_some_and(|email| email.trim().is_empty())
    {
        return Err(ApiError::BadRequest("Email must not be empty".to_string()));
    }

    let record = state
        .repository
        .write("update profile", move |tx| {
            let StudentRecord { id, mut profile } =
                tx.student(student)?.ok_or(GroupError::StudentNotFound)?;
            if update.is_empty() {
                return Ok(StudentRecord { id, profile });
            }

            update.apply_to(&mut profile);
            if let Some(other) = tx.student_id_by_email(&profile.email)? {
                if other != id {
                    return Err(ApiError::Conflict("Email already registered"));
                }
            }
            tx.update_profile(id, &profile)?;
            Ok::<_, ApiError>(StudentRecord { id, profile })
        })
        .await?;

    info!("Student {} updated their profile", student);
    Ok(Json(record.into()))
}

/// Handler: GET /study_groups
pub async fn my_groups(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Json<Vec<StudyGroupDto>>, ApiError> {
    let groups = state
        .repository
        .read::<_, RepositoryError, _>("list my groups", move |tx| {
            let mut groups = Vec::new();
            for id in tx.member_group_ids(student)? {
                if let Some(group) = tx.load_group(id)? {
                    groups.push(StudyGroupDto::load(tx, &group)?);
                }
            }
            Ok(groups)
        })
        .await?;
    Ok(Json(groups))
}

/// Handler: GET /requests
pub async fn my_requests(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Json<Vec<MyJoinRequestDto>>, ApiError> {
    let requests = state
        .repository
        .read::<_, RepositoryError, _>("list my requests", move |tx| {
            tx.student_requests(student)
        })
        .await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(me))
        .route("/profile", patch(update_profile))
        .route("/study_groups", get(my_groups))
        .route("/requests", get(my_requests))
}
