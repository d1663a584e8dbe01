use stagegate_core::{AppError, AppResult};
use uuid::Uuid;

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier with surrounding whitespace removed.
            pub fn new(value: impl Into<String>) -> AppResult<Self> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(format!(
                        "{} must not be empty",
                        $label
                    )));
                }

                Ok(Self(trimmed.to_owned()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = AppError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str(self.0.as_str())
            }
        }
    };
}

string_identifier!(
    /// Stable identifier of a staff member (actor).
    StaffId,
    "staff id"
);
string_identifier!(
    /// Stable identifier of a role.
    RoleId,
    "role id"
);
string_identifier!(
    /// Stable identifier of a department.
    DepartmentId,
    "department id"
);
string_identifier!(
    /// Storage identity of a permission.
    PermissionId,
    "permission id"
);
string_identifier!(
    /// Stable identifier of a workflow case.
    CaseId,
    "case id"
);

impl CaseId {
    /// Creates a random case identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{CaseId, StaffId};

    #[test]
    fn identifiers_reject_blank_values() {
        assert!(StaffId::new(" ").is_err());
        assert!(CaseId::new("").is_err());
    }

    #[test]
    fn generated_case_ids_are_unique() {
        assert_ne!(CaseId::generate(), CaseId::generate());
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let staff_id = StaffId::new("s1").unwrap_or_else(|_| unreachable!());
        let encoded = serde_json::to_string(&staff_id).unwrap_or_default();
        assert_eq!(encoded, "\"s1\"");

        let decoded: Result<StaffId, _> = serde_json::from_str("\"  \"");
        assert!(decoded.is_err());
    }
}
