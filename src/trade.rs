//! Trade representation

use crate::{AgentId, Price, Quantity, Side, Timestamp, VenueId};

/// A completed trade between an incoming (taker) order and a resting
/// (maker) order. Executes at the resting order's price.
///
/// Either agent may be absent when the corresponding order was a
/// book-seed order; that side's settlement was skipped.
#[derive(Clone, Debug, PartialEq)]
pub struct Trade {
    /// Venue the trade printed on
    pub venue: VenueId,
    /// Execution price (the resting order's price)
    pub price: Price,
    /// Quantity executed
    pub qty: Quantity,
    /// Agent behind the incoming order
    pub taker: Option<AgentId>,
    /// Agent behind the resting order
    pub maker: Option<AgentId>,
    /// Side of the incoming order
    pub taker_side: Side,
    /// Book arrival counter at execution
    pub timestamp: Timestamp,
}

impl Trade {
    /// The side of the resting (maker) order.
    #[inline]
    pub fn maker_side(&self) -> Side {
        self.taker_side.opposite()
    }

    /// Cash value of the trade before transaction costs.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.qty as f64 * self.price.to_f64()
    }
}
