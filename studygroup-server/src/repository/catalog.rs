use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use studygroup_core::catalog::MAX_SEARCH_RESULTS;
use studygroup_core::{CourseId, SemesterId, StudentId};

use super::{storage_err, timestamp, RepositoryError, Tx};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterRecord {
    pub id: SemesterId,
    pub term: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRecord {
    pub id: CourseId,
    pub department: String,
    pub course_number: String,
    pub professor: String,
    pub semester: SemesterRecord,
}

const COURSE_SELECT: &str = "SELECT c.id, c.department, c.course_number, c.professor,
                                    s.id, s.term, s.year
                             FROM courses c JOIN semesters s ON s.id = c.semester_id";

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<CourseRecord> {
    Ok(CourseRecord {
        id: CourseId(row.get(0)?),
        department: row.get(1)?,
        course_number: row.get(2)?,
        professor: row.get(3)?,
        semester: SemesterRecord {
            id: SemesterId(row.get(4)?),
            term: row.get(5)?,
            year: row.get(6)?,
        },
    })
}

impl Tx<'_> {
    pub fn semester(&self, id: SemesterId) -> Result<Option<SemesterRecord>, RepositoryError> {
        self.conn()
            .query_row(
                "SELECT term, year FROM semesters WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok(SemesterRecord {
                        id,
                        term: row.get(0)?,
                        year: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(storage_err("load semester"))
    }

    /// Return the semester for `(term, year)`, creating it if needed.
    pub fn find_or_create_semester(
        &self,
        term: &str,
        year: i32,
    ) -> Result<SemesterRecord, RepositoryError> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO semesters (term, year) VALUES (?1, ?2)",
                params![term, year],
            )
            .map_err(storage_err("create semester"))?;
        self.conn()
            .query_row(
                "SELECT id FROM semesters WHERE term = ?1 AND year = ?2",
                params![term, year],
                |row| {
                    Ok(SemesterRecord {
                        id: SemesterId(row.get(0)?),
                        term: term.to_string(),
                        year,
                    })
                },
            )
            .map_err(storage_err("create semester"))
    }

    /// All semesters, most recent year first.
    pub fn semesters(&self) -> Result<Vec<SemesterRecord>, RepositoryError> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, term, year FROM semesters ORDER BY year DESC, term")
            .map_err(storage_err("list semesters"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SemesterRecord {
                    id: SemesterId(row.get(0)?),
                    term: row.get(1)?,
                    year: row.get(2)?,
                })
            })
            .map_err(storage_err("list semesters"))?;
        rows.collect::<Result<_, _>>()
            .map_err(storage_err("list semesters"))
    }

    pub fn course(&self, id: CourseId) -> Result<Option<CourseRecord>, RepositoryError> {
        self.conn()
            .query_row(
                &format!("{COURSE_SELECT} WHERE c.id = ?1"),
                params![id.0],
                course_from_row,
            )
            .optional()
            .map_err(storage_err("load course"))
    }

    /// Return the course for the `(department, course_number, semester)`
    /// triple, creating it if needed. The semester must exist.
    pub fn find_or_create_course(
        &self,
        department: &str,
        course_number: &str,
        professor: &str,
        semester: SemesterId,
    ) -> Result<CourseRecord, RepositoryError> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO courses (department, course_number, professor, semester_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![department, course_number, professor, semester.0],
            )
            .map_err(storage_err("create course"))?;
        self.conn()
            .query_row(
                &format!(
                    "{COURSE_SELECT}
                     WHERE c.department = ?1 AND c.course_number = ?2 AND c.semester_id = ?3"
                ),
                params![department, course_number, semester.0],
                course_from_row,
            )
            .map_err(storage_err("create course"))
    }

    /// Case-insensitive substring search. `pattern` comes from
    /// [`studygroup_core::catalog::search_pattern`].
    pub fn search_courses(&self, pattern: &str) -> Result<Vec<CourseRecord>, RepositoryError> {
        let mut stmt = self
            .conn()
            .prepare(&format!(
                "{COURSE_SELECT}
                 WHERE lower(c.department) LIKE ?1 ESCAPE '\\'
                    OR lower(c.course_number) LIKE ?1 ESCAPE '\\'
                    OR lower(c.professor) LIKE ?1 ESCAPE '\\'
                 ORDER BY c.department, c.course_number
                 LIMIT ?2"
            ))
            .map_err(storage_err("search courses"))?;
        let rows = stmt
            .query_map(params![pattern, MAX_SEARCH_RESULTS as i64], course_from_row)
            .map_err(storage_err("search courses"))?;
        rows.collect::<Result<_, _>>()
            .map_err(storage_err("search courses"))
    }

    /// Enroll a student. Re-enrolling is a no-op.
    pub fn enroll(
        &self,
        student: StudentId,
        course: CourseId,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO student_courses (student_id, course_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![student.0, course.0, timestamp(now)],
            )
            .map_err(storage_err("enroll"))?;
        Ok(())
    }

    pub fn courses_for_student(
        &self,
        student: StudentId,
    ) -> Result<Vec<CourseRecord>, RepositoryError> {
        let mut stmt = self
            .conn()
            .prepare(&format!(
                "{COURSE_SELECT}
                 JOIN student_courses sc ON sc.course_id = c.id
                 WHERE sc.student_id = ?1
                 ORDER BY c.department, c.course_number"
            ))
            .map_err(storage_err("list student courses"))?;
        let rows = stmt
            .query_map(params![student.0], course_from_row)
            .map_err(storage_err("list student courses"))?;
        rows.collect::<Result<_, _>>()
            .map_err(storage_err("list student courses"))
    }
}
