use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use studygroup_core::{
    CourseId, GroupId, JoinRequest, NewStudyGroup, RequestId, SemesterId, StudentId, StudyGroup,
};

use super::{storage_err, timestamp, RepositoryError, Tx};

/// A pending request as shown to the group owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequestRecord {
    pub id: RequestId,
    pub student_id: StudentId,
    pub email: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A pending request as shown to its author, with enough of the group to
/// render a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRequestRecord {
    pub id: RequestId,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub group_id: GroupId,
    pub location: String,
    pub meeting_time: DateTime<Utc>,
    pub meeting_day: Option<String>,
    pub capacity: u32,
    pub department: String,
    pub course_number: String,
}

fn capacity_from_sql(raw: i64) -> Result<u32, RepositoryError> {
    u32::try_from(raw)
        .ok()
        .filter(|c| *c > 0)
        .ok_or_else(|| RepositoryError::corruption("study group capacity"))
}

impl Tx<'_> {
    /// Insert a new group with its creator as owner and sole member.
    pub fn create_group(
        &self,
        new: NewStudyGroup,
        creator: StudentId,
    ) -> Result<StudyGroup, RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO study_groups
                     (capacity, is_private, owner_id, semester_id, course_id,
                      location, meeting_time, meeting_day)
                 VALUES (?1, 0, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    studygroup_core::DEFAULT_CAPACITY,
                    creator.0,
                    new.semester_id.0,
                    new.course_id.0,
                    new.location,
                    timestamp(new.meeting_time),
                    new.meeting_day,
                ],
            )
            .map_err(storage_err("create group"))?;
        let id = GroupId(self.conn().last_insert_rowid());

        let group = new.into_group(id, creator);
        self.add_member(id, creator)?;
        Ok(group)
    }

    /// Load a group with its members and pending requests.
    pub fn load_group(&self, id: GroupId) -> Result<Option<StudyGroup>, RepositoryError> {
        let row = self
            .conn()
            .query_row(
                "SELECT owner_id, capacity, is_private, course_id, semester_id,
                        location, meeting_time, meeting_day
                 FROM study_groups WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok((
                        StudentId(row.get(0)?),
                        row.get::<_, i64>(1)?,
                        row.get::<_, bool>(2)?,
                        CourseId(row.get(3)?),
                        SemesterId(row.get(4)?),
                        row.get::<_, String>(5)?,
                        row.get::<_, DateTime<Utc>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                },
            )
            .optional()
            .map_err(storage_err("load group"))?;

        let Some((
            owner_id,
            capacity,
            is_private,
            course_id,
            semester_id,
            location,
            meeting_time,
            meeting_day,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(StudyGroup {
            id,
            owner_id,
            capacity: capacity_from_sql(capacity)?,
            is_private,
            course_id,
            semester_id,
            location,
            meeting_time,
            meeting_day,
            members: self.members_of(id)?,
            pending: self.pending_of(id)?,
        }))
    }

    fn members_of(&self, id: GroupId) -> Result<BTreeSet<StudentId>, RepositoryError> {
        let mut stmt = self
            .conn()
            .prepare("SELECT student_id FROM study_group_members WHERE study_group_id = ?1")
            .map_err(storage_err("load members"))?;
        let rows = stmt
            .query_map(params![id.0], |row| Ok(StudentId(row.get(0)?)))
            .map_err(storage_err("load members"))?;
        rows.collect::<Result<_, _>>()
            .map_err(storage_err("load members"))
    }

    fn pending_of(
        &self,
        id: GroupId,
    ) -> Result<BTreeMap<StudentId, JoinRequest>, RepositoryError> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT id, student_id, message, created_at
                 FROM study_group_join_requests WHERE study_group_id = ?1",
            )
            .map_err(storage_err("load join requests"))?;
        let rows = stmt
            .query_map(params![id.0], |row| {
                Ok((
                    StudentId(row.get(1)?),
                    JoinRequest {
                        id: Some(RequestId(row.get(0)?)),
                        message: row.get(2)?,
                        created_at: row.get(3)?,
                    },
                ))
            })
            .map_err(storage_err("load join requests"))?;
        rows.collect::<Result<_, _>>()
            .map_err(storage_err("load join requests"))
    }

    pub fn add_member(&self, group: GroupId, student: StudentId) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO study_group_members (study_group_id, student_id) VALUES (?1, ?2)",
                params![group.0, student.0],
            )
            .map_err(storage_err("add member"))?;
        Ok(())
    }

    pub fn remove_member(
        &self,
        group: GroupId,
        student: StudentId,
    ) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "DELETE FROM study_group_members WHERE study_group_id = ?1 AND student_id = ?2",
                params![group.0, student.0],
            )
            .map_err(storage_err("remove member"))?;
        Ok(())
    }

    pub fn set_owner(&self, group: GroupId, owner: StudentId) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "UPDATE study_groups SET owner_id = ?2 WHERE id = ?1",
                params![group.0, owner.0],
            )
            .map_err(storage_err("transfer ownership"))?;
        Ok(())
    }

    pub fn update_details(
        &self,
        group: GroupId,
        location: &str,
        meeting_time: DateTime<Utc>,
        meeting_day: Option<&str>,
        capacity: u32,
        is_private: bool,
    ) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "UPDATE study_groups
                 SET location = ?2, meeting_time = ?3, meeting_day = ?4,
                     capacity = ?5, is_private = ?6
                 WHERE id = ?1",
                params![
                    group.0,
                    location,
                    timestamp(meeting_time),
                    meeting_day,
                    capacity,
                    is_private
                ],
            )
            .map_err(storage_err("update group"))?;
        Ok(())
    }

    pub fn insert_request(
        &self,
        group: GroupId,
        student: StudentId,
        message: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<RequestId, RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO study_group_join_requests
                     (study_group_id, student_id, message, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![group.0, student.0, message, timestamp(created_at)],
            )
            .map_err(storage_err("insert join request"))?;
        Ok(RequestId(self.conn().last_insert_rowid()))
    }

    pub fn delete_request(&self, request: RequestId) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "DELETE FROM study_group_join_requests WHERE id = ?1",
                params![request.0],
            )
            .map_err(storage_err("delete join request"))?;
        Ok(())
    }

    /// Delete a group. Memberships and join requests cascade.
    pub fn delete_group(&self, group: GroupId) -> Result<(), RepositoryError> {
        self.conn()
            .execute("DELETE FROM study_groups WHERE id = ?1", params![group.0])
            .map_err(storage_err("delete group"))?;
        Ok(())
    }

    /// Pending requests for a group, oldest first.
    pub fn group_requests(
        &self,
        group: GroupId,
    ) -> Result<Vec<PendingRequestRecord>, RepositoryError> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT r.id, r.student_id, s.email, r.message, r.created_at
                 FROM study_group_join_requests r
                 JOIN students s ON s.id = r.student_id
                 WHERE r.study_group_id = ?1
                 ORDER BY r.created_at, r.id",
            )
            .map_err(storage_err("list group requests"))?;
        let rows = stmt
            .query_map(params![group.0], |row| {
                Ok(PendingRequestRecord {
                    id: RequestId(row.get(0)?),
                    student_id: StudentId(row.get(1)?),
                    email: row.get(2)?,
                    message: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .map_err(storage_err("list group requests"))?;
        rows.collect::<Result<_, _>>()
            .map_err(storage_err("list group requests"))
    }

    /// A student's own pending requests, newest first.
    pub fn student_requests(
        &self,
        student: StudentId,
    ) -> Result<Vec<StudentRequestRecord>, RepositoryError> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT r.id, r.message, r.created_at,
                        g.id, g.location, g.meeting_time, g.meeting_day, g.capacity,
                        c.department, c.course_number
                 FROM study_group_join_requests r
                 JOIN study_groups g ON g.id = r.study_group_id
                 JOIN courses c ON c.id = g.course_id
                 WHERE r.student_id = ?1
                 ORDER BY r.created_at DESC, r.id DESC",
            )
            .map_err(storage_err("list student requests"))?;
        let rows = stmt
            .query_map(params![student.0], |row| {
                Ok((
                    RequestId(row.get(0)?),
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                    GroupId(row.get(3)?),
                    row.get::<_, String>(4)?,
                    row.get::<_, DateTime<Utc>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .map_err(storage_err("list student requests"))?;

        let mut records = Vec::new();
        for row in rows {
            let (
                id,
                message,
                created_at,
                group_id,
                location,
                meeting_time,
                meeting_day,
                capacity,
                department,
                course_number,
            ) = row.map_err(storage_err("list student requests"))?;
            records.push(StudentRequestRecord {
                id,
                message,
                created_at,
                group_id,
                location,
                meeting_time,
                meeting_day,
                capacity: capacity_from_sql(capacity)?,
                department,
                course_number,
            });
        }
        Ok(records)
    }

    /// Ids of the groups a student belongs to, ascending.
    pub fn member_group_ids(&self, student: StudentId) -> Result<Vec<GroupId>, RepositoryError> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT study_group_id FROM study_group_members
                 WHERE student_id = ?1 ORDER BY study_group_id",
            )
            .map_err(storage_err("list member groups"))?;
        let rows = stmt
            .query_map(params![student.0], |row| Ok(GroupId(row.get(0)?)))
            .map_err(storage_err("list member groups"))?;
        rows.collect::<Result<_, _>>()
            .map_err(storage_err("list member groups"))
    }
}
