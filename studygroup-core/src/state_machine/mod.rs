//! Explicit state machine for study-group membership.
//!
//! The design mirrors a classic command/effect split:
//! - **State**: the loaded group (`StudyGroup`), including members and
//!   pending join requests
//! - **Commands**: what a student asked for (`Command`)
//! - **Effects**: which store mutations to perform (`Effect`)
//! - **Transition**: pure function `(StudyGroup, Command) -> Result<TransitionResult, GroupError>`
//!
//! The server's interpreter applies the effects inside the same
//! transaction that loaded the state.

pub mod command;
pub mod effect;
pub mod state;
pub mod transition;

pub use command::*;
pub use effect::*;
pub use state::*;
pub use transition::*;
