//! Course catalog endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tracing::info;

use studygroup_core::catalog::search_pattern;
use studygroup_core::{CourseId, GroupError};

use crate::auth::CurrentStudent;
use crate::dto::{CourseDto, NewCourseRequest, NewSemesterRequest, SearchQuery, SemesterDto};
use crate::error::ApiError;
use crate::repository::RepositoryError;
use crate::AppState;

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Handler: GET /course/search?q=
pub async fn search_courses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<CourseDto>>, ApiError> {
    let Some(pattern) = search_pattern(&query.q) else {
        return Ok(Json(Vec::new()));
    };
    let courses = state
        .repository
        .read::<_, RepositoryError, _>("search courses", move |tx| tx.search_courses(&pattern))
        .await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// Handler: POST /course/
///
/// Returns the existing course when the triple is already known.
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<CourseDto>), ApiError> {
    let department = required(&body.department, "department")?;
    let course_number = required(&body.course_number, "course_number")?;
    let professor = required(&body.professor, "professor")?;
    let semester = body.semester_id;

    let course = state
        .repository
        .write("create course", move |tx| {
            if tx.semester(semester)?.is_none() {
                return Err(GroupError::SemesterNotFound.into());
            }
            Ok::<_, ApiError>(tx.find_or_create_course(
                &department,
                &course_number,
                &professor,
                semester,
            )?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(course.into())))
}

/// Handler: POST /course/:id/enroll
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
    Path(course): Path<CourseId>,
) -> Result<StatusCode, ApiError> {
    let now = Utc::now();
    state
        .repository
        .write("enroll", move |tx| {
            if tx.course(course)?.is_none() {
                return Err(GroupError::CourseNotFound.into());
            }
            tx.enroll(student, course, now)?;
            Ok::<_, ApiError>(())
        })
        .await?;
    info!("Student {} enrolled in course {}", student, course);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler: GET /courses
pub async fn my_courses(
    State(state): State<Arc<AppState>>,
    CurrentStudent(student): CurrentStudent,
) -> Result<Json<Vec<CourseDto>>, ApiError> {
    let courses = state
        .repository
        .read::<_, RepositoryError, _>("list courses", move |tx| tx.courses_for_student(student))
        .await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// Handler: POST /semester/
pub async fn create_semester(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewSemesterRequest>,
) -> Result<(StatusCode, Json<SemesterDto>), ApiError> {
    let term = required(&body.term, "term")?;
    let year = body.year;
    let semester = state
        .repository
        .write::<_, RepositoryError, _>("create semester", move |tx| {
            tx.find_or_create_semester(&term, year)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(semester.into())))
}

/// Handler: GET /semesters
pub async fn list_semesters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SemesterDto>>, ApiError> {
    let semesters = state
        .repository
        .read::<_, RepositoryError, _>("list semesters", |tx| tx.semesters())
        .await?;
    Ok(Json(semesters.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/course/search", get(search_courses))
        .route("/course/", post(create_course))
        .route("/course/:id/enroll", post(enroll))
        .route("/courses", get(my_courses))
        .route("/semester/", post(create_semester))
        .route("/semesters", get(list_semesters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  CS ", "department").unwrap(), "CS");
    }

    #[test]
    fn test_required_rejects_blank() {
        let err = required("   ", "professor").unwrap_err();
        assert_eq!(err.to_string(), "professor is required");
    }
}
