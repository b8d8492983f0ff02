//! Core types: Price, Quantity, Timestamp, OrderId, AgentId, VenueId

use std::fmt;

/// Price in tenths of a currency unit.
///
/// `Price(1000)` represents 100.0. The market model quotes everything at
/// one decimal place, so a tenth is the tick: construction from `f64`
/// rounds to the nearest tick and all book ordering is integral.
/// Prices may go negative (an exogenous shock is applied unclamped).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Round a raw price to the nearest tick.
    pub fn from_f64(value: f64) -> Self {
        Price((value * 10.0).round() as i64)
    }

    /// The price as a plain float (exact: every tick is representable).
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.to_f64())
    }
}

/// Quantity of shares. Always non-negative; holdings use `i64` (shorts).
pub type Quantity = u64;

/// Arrival counter within one book, assigned monotonically.
/// Orders at equal price match in arrival order (FIFO).
pub type Timestamp = u64;

/// Unique order identifier, assigned by the venue's book.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Identifier of a trading agent, assigned by the ledger at registration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub u32);

impl AgentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

/// Identifier of an exchange venue (its position in the market's venue list).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VenueId(pub u32);

impl VenueId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}
