//! Customer identifier type.
//!
//! Upstream customers are keyed by an opaque string (`"C1"`, `"CUST-0042"`),
//! not by a database sequence, so the identifier wraps a `String` rather than
//! an integer.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CustomerId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomerIdError {
    /// The input string is empty or only whitespace.
    #[error("customer_id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("customer_id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// The stable identifier of a customer, as assigned by the upstream source.
///
/// This is the primary key of the local `customers` table. At most one stored
/// record exists per identifier.
///
/// ## Examples
///
/// ```
/// use customer_sync_core::CustomerId;
///
/// assert!(CustomerId::parse("C1").is_ok());
/// assert!(CustomerId::parse("").is_err());
/// assert!(CustomerId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    /// Maximum length of an identifier.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `CustomerId` from a string.
    ///
    /// The identifier is stored exactly as given; it is not trimmed, because
    /// matching against existing rows is an exact comparison.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or longer than 255 characters.
    pub fn parse(s: &str) -> Result<Self, CustomerIdError> {
        if s.trim().is_empty() {
            return Err(CustomerIdError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(CustomerIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CustomerId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CustomerId {
    type Err = CustomerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CustomerId {
    type Error = CustomerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

impl AsRef<str> for CustomerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CustomerId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CustomerId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Primary keys were validated on the way in
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CustomerId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
