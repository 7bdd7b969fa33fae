//! User identity projection.
//!
//! Users are owned by the external identity subsystem; this crate only reads
//! them through the [`crate::domain::ports::UserDirectory`] port and refers to
//! them by [`UserId`] everywhere else.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Validation errors returned by [`User::try_from_parts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// The user id string was empty.
    EmptyId,
    /// The user id string was not a valid UUID.
    InvalidId,
    /// The username was empty after trimming whitespace.
    EmptyUsername,
    /// The username was shorter than the allowed minimum.
    UsernameTooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The username was longer than the allowed maximum.
    UsernameTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The username contained characters outside `[A-Za-z0-9_]`.
    UsernameInvalidCharacters,
    /// The email address did not look like an address at all.
    InvalidEmail,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameTooShort { min } => {
                write!(f, "username must be at least {min} characters")
            }
            Self::UsernameTooLong { max } => {
                write!(f, "username must be at most {max} characters")
            }
            Self::UsernameInvalidCharacters => write!(
                f,
                "username may only contain letters, numbers, or underscores",
            ),
            Self::InvalidEmail => write!(f, "email must contain a local part and a domain"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Construct a [`UserId`] directly from a UUID.
    ///
    /// Useful when the UUID is already validated (e.g., loaded from database).
    pub fn from_uuid(uuid: Uuid) -> Self {
        let raw = uuid.to_string();
        Self(uuid, raw)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }

        let parsed = Uuid::parse_str(&id).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        let UserId(_, raw) = value;
        raw
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Unique handle a user registers under. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

/// Minimum allowed length for a username.
pub const USERNAME_MIN: usize = 3;
/// Maximum allowed length for a username.
pub const USERNAME_MAX: usize = 32;

impl Username {
    /// Validate and construct a [`Username`] from owned input.
    pub fn new(username: impl Into<String>) -> Result<Self, UserValidationError> {
        Self::from_owned(username.into())
    }

    fn from_owned(username: String) -> Result<Self, UserValidationError> {
        if username.trim().is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }

        let length = username.chars().count();
        if length < USERNAME_MIN {
            return Err(UserValidationError::UsernameTooShort { min: USERNAME_MIN });
        }
        if length > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }

        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }

        Ok(Self(username))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Application user as read from the identity subsystem.
///
/// ## Invariants
/// - `id` must be a valid UUID string.
/// - `username` must satisfy the handle rules above.
/// - `email` must contain a local part and a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "UserDto", into = "UserDto")]
pub struct User {
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    id: UserId,
    #[schema(value_type = String, example = "ada_l")]
    username: Username,
    #[schema(example = "Ada Lovelace")]
    full_name: String,
    #[schema(example = "ada@example.com")]
    email: String,
}

impl User {
    /// Build a new [`User`] from validated components.
    pub fn new(id: UserId, username: Username, full_name: String, email: String) -> Self {
        Self {
            id,
            username,
            full_name,
            email,
        }
    }

    /// Fallible constructor enforcing identifier, username, and email rules.
    pub fn try_from_parts(
        id: impl AsRef<str>,
        username: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let id = UserId::new(id)?;
        let username = Username::new(username)?;
        let email = email.into();
        validate_email(&email)?;

        Ok(Self::new(id, username, full_name.into(), email))
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Unique registered handle.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Display name shown alongside the handle.
    pub fn full_name(&self) -> &str {
        self.full_name.as_str()
    }

    /// Contact address carried opaque for notification delivery.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }
}

fn validate_email(email: &str) -> Result<(), UserValidationError> {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() {
        return Err(UserValidationError::InvalidEmail);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    id: String,
    username: String,
    full_name: String,
    email: String,
}

impl From<User> for UserDto {
    fn from(value: User) -> Self {
        let User {
            id,
            username,
            full_name,
            email,
        } = value;
        Self {
            id: id.to_string(),
            username: username.into(),
            full_name,
            email,
        }
    }
}

impl TryFrom<UserDto> for User {
    type Error = UserValidationError;

    fn try_from(value: UserDto) -> Result<Self, Self::Error> {
        User::try_from_parts(value.id, value.username, value.full_name, value.email)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn user_id_rejects_non_uuid_input() {
        assert_eq!(UserId::new("not-a-uuid"), Err(UserValidationError::InvalidId));
        assert_eq!(UserId::new(""), Err(UserValidationError::EmptyId));
    }

    #[rstest]
    fn user_id_preserves_raw_representation() {
        let raw = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
        let id = UserId::new(raw).expect("valid id");
        assert_eq!(id.as_ref(), raw);
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    #[case("ab", UserValidationError::UsernameTooShort { min: USERNAME_MIN })]
    #[case("has space", UserValidationError::UsernameInvalidCharacters)]
    #[case("dash-ed", UserValidationError::UsernameInvalidCharacters)]
    fn username_rejects_invalid_input(
        #[case] input: &str,
        #[case] expected: UserValidationError,
    ) {
        assert_eq!(Username::new(input), Err(expected));
    }

    #[rstest]
    fn username_accepts_handles() {
        let name = Username::new("ada_l0velace").expect("valid username");
        assert_eq!(name.as_ref(), "ada_l0velace");
    }

    #[rstest]
    #[case("missing-at")]
    #[case("@nodomainlocal")]
    #[case("nolocal@")]
    fn email_rejects_malformed_addresses(#[case] email: &str) {
        let result = User::try_from_parts(
            "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "ada_l",
            "Ada Lovelace",
            email,
        );
        assert_eq!(result, Err(UserValidationError::InvalidEmail));
    }

    #[rstest]
    fn user_round_trips_through_dto() {
        let user = User::try_from_parts(
            "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "ada_l",
            "Ada Lovelace",
            "ada@example.com",
        )
        .expect("valid user");

        let serialized = serde_json::to_string(&user).expect("user serializes");
        let restored: User = serde_json::from_str(&serialized).expect("user deserializes");
        assert_eq!(restored, user);
    }
}
