//! Fixed-point account balance using decimal arithmetic.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A customer's account balance.
///
/// Always carries exactly two fractional digits, matching the `NUMERIC(15, 2)`
/// column it is stored in. Incoming amounts with more precision are rounded,
/// midpoints away from zero (`1.005` becomes `1.01`).
///
/// Deserializes from either a JSON number or a JSON string, so upstream
/// sources may send `1234.5` or `"1234.50"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct AccountBalance(Decimal);

impl AccountBalance {
    /// Number of fractional digits kept.
    pub const SCALE: u32 = 2;

    /// Create a balance, normalising to two fractional digits.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        let mut amount =
            amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(Self::SCALE);
        Self(amount)
    }

    /// Create a balance from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, Self::SCALE))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for AccountBalance {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<AccountBalance> for Decimal {
    fn from(balance: AccountBalance) -> Self {
        balance.0
    }
}

impl fmt::Display for AccountBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for AccountBalance {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for AccountBalance {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for AccountBalance {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
