//! Domain core for the study-group backend.
//!
//! Everything in this crate is pure: no I/O, no clocks, no storage. The
//! server crate loads a [`StudyGroup`] inside a transaction, feeds it a
//! [`Command`] through [`transition`], and applies the returned
//! [`Effect`]s to the store before committing.

pub mod catalog;
pub mod error;
pub mod ids;
pub mod profile;
pub mod state_machine;

pub use error::{ErrorKind, GroupError};
pub use ids::{CourseId, GroupId, RequestId, SemesterId, StudentId};
pub use profile::{Profile, ProfileUpdate};
pub use state_machine::*;
