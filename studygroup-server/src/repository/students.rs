use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use studygroup_core::{Profile, StudentId};

use super::{storage_err, timestamp, RepositoryError, Tx};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub id: StudentId,
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub student_id: StudentId,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

impl Tx<'_> {
    /// Insert a student. `email` must already be normalised.
    pub fn insert_student(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<StudentId, RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO students (email, password_hash) VALUES (?1, ?2)",
                params![email, password_hash],
            )
            .map_err(storage_err("insert student"))?;
        Ok(StudentId(self.conn().last_insert_rowid()))
    }

    pub fn student_id_by_email(&self, email: &str) -> Result<Option<StudentId>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT id FROM students WHERE email = ?1",
                params![email],
                |row| Ok(StudentId(row.get(0)?)),
            )
            .optional()
            .map_err(storage_err("find student by email"))
    }

    /// Id and password hash for a login attempt.
    pub fn credentials(
        &self,
        email: &str,
    ) -> Result<Option<(StudentId, String)>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT id, password_hash FROM students WHERE email = ?1",
                params![email],
                |row| Ok((StudentId(row.get(0)?), row.get(1)?)),
            )
            .optional()
            .map_err(storage_err("load credentials"))
    }

    pub fn student(&self, id: StudentId) -> Result<Option<StudentRecord>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT email, major, class_year, linkedin FROM students WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok(StudentRecord {
                        id,
                        profile: Profile {
                            email: row.get(0)?,
                            major: row.get(1)?,
                            class_year: row.get(2)?,
                            linkedin: row.get(3)?,
                        },
                    })
                },
            )
            .optional()
            .map_err(storage_err("load student"))
    }

    pub fn student_exists(&self, id: StudentId) -> Result<bool, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1)",
                params![id.0],
                |row| row.get(0),
            )
            .map_err(storage_err("check student"))
    }

    pub fn update_profile(&self, id: StudentId, profile: &Profile) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "UPDATE students SET email = ?2, major = ?3, class_year = ?4, linkedin = ?5
                 WHERE id = ?1",
                params![
                    id.0,
                    profile.email,
                    profile.major,
                    profile.class_year,
                    profile.linkedin
                ],
            )
            .map_err(storage_err("update profile"))?;
        Ok(())
    }

    pub fn insert_session(
        &self,
        token: &str,
        student: StudentId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "INSERT INTO sessions (session_token, student_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, student.0, timestamp(created_at), timestamp(expires_at)],
            )
            .map_err(storage_err("insert session"))?;
        Ok(())
    }

    pub fn session(&self, token: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT student_id, expires_at FROM sessions WHERE session_token = ?1",
                params![token],
                |row| {
                    Ok(SessionRecord {
                        student_id: StudentId(row.get(0)?),
                        expires_at: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(storage_err("load session"))
    }
}
