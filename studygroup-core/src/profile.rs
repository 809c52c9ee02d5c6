//! Student profile attributes and partial updates.

use serde::{Deserialize, Serialize};

/// Editable profile attributes of a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,
    pub major: Option<String>,
    pub class_year: Option<String>,
    pub linkedin: Option<String>,
}

/// Partial profile update: only fields present in the request overwrite
/// the stored value. Absent and `null` fields are both no-ops, never
/// null-outs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub class_year: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.major.is_none()
            && self.class_year.is_none()
            && self.linkedin.is_none()
    }

    /// Apply the present fields to `profile`.
    pub fn apply_to(self, profile: &mut Profile) {
        if let Some(email) = self.email {
            profile.email = normalize_email(&email);
        }
        if let Some(major) = self.major {
            profile.major = Some(major);
        }
        if let Some(class_year) = self.class_year {
            profile.class_year = Some(class_year);
        }
        if let Some(linkedin) = self.linkedin {
            profile.linkedin = Some(linkedin);
        }
    }
}

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
