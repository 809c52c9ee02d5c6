//! JSON request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use studygroup_core::catalog::course_name;
use studygroup_core::{CourseId, GroupId, RequestId, SemesterId, StudentId, StudyGroup};

use crate::repository::{
    CourseRecord, PendingRequestRecord, RepositoryError, SemesterRecord, StudentRecord,
    StudentRequestRecord, Tx,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDto {
    pub id: StudentId,
    pub email: String,
    pub major: Option<String>,
    pub class_year: Option<String>,
    pub linkedin: Option<String>,
}

impl From<StudentRecord> for StudentDto {
    fn from(record: StudentRecord) -> Self {
        Self {
            id: record.id,
            email: record.profile.email,
            major: record.profile.major,
            class_year: record.profile.class_year,
            linkedin: record.profile.linkedin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemesterDto {
    pub id: SemesterId,
    pub term: String,
    pub year: i32,
}

impl From<SemesterRecord> for SemesterDto {
    fn from(record: SemesterRecord) -> Self {
        Self {
            id: record.id,
            term: record.term,
            year: record.year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDto {
    pub id: CourseId,
    pub department: String,
    pub course_number: String,
    pub professor: String,
    pub semester: SemesterDto,
}

impl From<CourseRecord> for CourseDto {
    fn from(record: CourseRecord) -> Self {
        Self {
            id: record.id,
            department: record.department,
            course_number: record.course_number,
            professor: record.professor,
            semester: record.semester.into(),
        }
    }
}

/// Full view of a group: course, owner and members (ascending id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGroupDto {
    pub id: GroupId,
    pub capacity: u32,
    pub is_private: bool,
    pub location: String,
    pub meeting_time: DateTime<Utc>,
    pub meeting_day: Option<String>,
    pub course: CourseDto,
    pub owner: StudentDto,
    pub members: Vec<StudentDto>,
}

impl StudyGroupDto {
    /// Resolve the course and students referenced by `group`.
    pub fn load(tx: &Tx<'_>, group: &StudyGroup) -> Result<Self, RepositoryError> {
        let course = tx
            .course(group.course_id)?
            .ok_or_else(|| RepositoryError::corruption("study group course reference"))?;

        let mut members = Vec::with_capacity(group.members.len());
        let mut owner = None;
        for id in &group.members {
            let student: StudentDto = tx
                .student(*id)?
                .ok_or_else(|| RepositoryError::corruption("study group member reference"))?
                .into();
            if *id == group.owner_id {
                owner = Some(student.clone());
            }
            members.push(student);
        }
        let owner = owner.ok_or_else(|| RepositoryError::corruption("study group owner"))?;

        Ok(Self {
            id: group.id,
            capacity: group.capacity,
            is_private: group.is_private,
            location: group.location.clone(),
            meeting_time: group.meeting_time,
            meeting_day: group.meeting_day.clone(),
            course: course.into(),
            owner,
            members,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGroupPreviewDto {
    pub id: GroupId,
    pub location: String,
    pub meeting_time: DateTime<Utc>,
    pub meeting_day: Option<String>,
    pub capacity: u32,
    pub course_name: String,
}

/// One of the caller's own pending requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyJoinRequestDto {
    pub id: RequestId,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub study_group: StudyGroupPreviewDto,
}

impl From<StudentRequestRecord> for MyJoinRequestDto {
    fn from(record: StudentRequestRecord) -> Self {
        Self {
            id: record.id,
            message: record.message,
            created_at: record.created_at,
            study_group: StudyGroupPreviewDto {
                id: record.group_id,
                location: record.location,
                meeting_time: record.meeting_time,
                meeting_day: record.meeting_day,
                capacity: record.capacity,
                course_name: course_name(&record.department, &record.course_number),
            },
        }
    }
}

/// A pending request as the group owner sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequestDto {
    pub id: RequestId,
    pub student_id: StudentId,
    pub email: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PendingRequestRecord> for PendingRequestDto {
    fn from(record: PendingRequestRecord) -> Self {
        Self {
            id: record.id,
            student_id: record.student_id,
            email: record.email,
            message: record.message,
            created_at: record.created_at,
        }
    }
}

/// Response to a submitted join request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedRequestDto {
    pub id: RequestId,
    pub study_group_id: GroupId,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequestBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewCourseRequest {
    pub department: String,
    pub course_number: String,
    pub professor: String,
    pub semester_id: SemesterId,
}

#[derive(Debug, Deserialize)]
pub struct NewSemesterRequest {
    pub term: String,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
