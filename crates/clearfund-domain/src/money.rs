//! Fixed-point currency representation used throughout the ledger.

use std::fmt;
use std::ops::Neg;

use serde::{Deserialize, Serialize};

/// Signed monetary amount stored as integer minor units (cents).
///
/// Ledger math never passes through floating point: two amounts are equal
/// only when their cent counts are equal, and arithmetic is checked.
/// Serialized as the bare integer count of cents.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Builds an amount from whole currency units.
    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Saturating addition for derived aggregates (summaries, totals);
    /// ledger appends use the checked variant and fail on overflow.
    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    pub fn abs(self) -> Money {
        Money(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Clamps negative amounts to zero; used when splitting a signed net
    /// balance into its two one-directional views.
    pub fn floor_zero(self) -> Money {
        Money(self.0.max(0))
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
