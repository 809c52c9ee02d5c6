//! Identifier newtypes.
//!
//! Every table key gets its own type so a student id can never be passed
//! where a group id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_newtype!(
    /// Primary key of a student.
    StudentId
);
id_newtype!(
    /// Primary key of a study group.
    GroupId
);
id_newtype!(
    /// Primary key of a pending join request.
    RequestId
);
id_newtype!(CourseId);
id_newtype!(SemesterId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_by_inner_value() {
        let mut ids = vec![StudentId(3), StudentId(1), StudentId(2)];
        ids.sort();
        assert_eq!(ids, vec![StudentId(1), StudentId(2), StudentId(3)]);
    }

    #[test]
    fn test_ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&GroupId(42)).unwrap();
        assert_eq!(json, "42");
        let back: GroupId = serde_json::from_str("42").unwrap();
        assert_eq!(back, GroupId(42));
    }
}
