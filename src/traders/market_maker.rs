//! MarketMaker: two-sided quoting that leans against its own inventory.
//!
//! Every tick the maker pulls all of its quotes and re-posts one bid and
//! one ask per venue, with sizes that steer the position back inside the
//! soft-limit band and prices offset by the inventory skew.

use crate::{AgentId, Market, Quantity, VenueId};

/// Inventory-balancing liquidity provider.
///
/// `soft_limits[i]` is the half-width of the tolerated position band on
/// the agent's i-th venue: the band is `[-soft_limits[i], soft_limits[i]]`.
/// `panic` latches once the maker has quoted; nothing consumes it, it is
/// an observable left for the surrounding analytics.
#[derive(Clone, Debug)]
pub struct MarketMaker {
    pub soft_limits: Vec<i64>,
    pub panic: bool,
}

impl MarketMaker {
    pub fn new(soft_limits: Vec<i64>) -> Self {
        Self {
            soft_limits,
            panic: false,
        }
    }

    /// One quoting pass.
    ///
    /// The offset `min(1, (ask − bid) · assets/lower)` is clamped only
    /// from above: with `lower < 0` a long book pushes both quotes down
    /// (selling pressure), a short book pushes them up. Volumes aim each
    /// side at half the distance to its band edge; venues without a
    /// readable spread are skipped for the tick.
    pub(crate) fn step(&mut self, id: AgentId, venues: &[VenueId], market: &mut Market) {
        market.cancel_all(id);
        for (i, &venue) in venues.iter().enumerate() {
            let Ok(quote) = market.venue(venue).spread() else {
                continue;
            };
            let assets = market.portfolio(id).holding(venue);
            let upper = self.soft_limits[i];
            let lower = -upper;

            let offset = (quote.width() * (assets as f64 / lower as f64)).min(1.0);
            let bid_volume = (upper - 1 - assets).div_euclid(2).max(0) as Quantity;
            let ask_volume = (assets - 1 - lower).div_euclid(2).max(0) as Quantity;

            self.panic = true;
            market.buy_limit(id, venue, bid_volume, quote.bid.to_f64() + offset);
            market.sell_limit(id, venue, ask_volume, quote.ask.to_f64() - offset);
        }
    }
}
