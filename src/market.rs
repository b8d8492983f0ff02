//! Market: the venues and the ledger behind one simulation.
//!
//! Routes agent order flow to the venues and carries the shared account
//! arena. The order primitives here are the common agent contract: they
//! round prices to the tick, drop zero quantities, pick the venue for
//! market orders, and swallow non-fatal venue errors (the agent's action
//! simply does not happen on a halted or one-sided venue).

use tracing::trace;

use crate::ledger::{Ledger, OrderRef, Portfolio};
use crate::{AgentId, Exchange, Price, Quantity, Side, VenueId};

/// All venues plus the account arena.
#[derive(Clone, Debug)]
pub struct Market {
    exchanges: Vec<Exchange>,
    pub ledger: Ledger,
}

impl Market {
    pub fn new(exchanges: Vec<Exchange>, ledger: Ledger) -> Self {
        Self { exchanges, ledger }
    }

    // === Venue access ===

    pub fn venue_count(&self) -> usize {
        self.exchanges.len()
    }

    pub fn venues(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn venues_mut(&mut self) -> &mut [Exchange] {
        &mut self.exchanges
    }

    pub fn venue(&self, id: VenueId) -> &Exchange {
        &self.exchanges[id.index()]
    }

    pub fn venue_mut(&mut self, id: VenueId) -> &mut Exchange {
        &mut self.exchanges[id.index()]
    }

    pub fn portfolio(&self, agent: AgentId) -> &Portfolio {
        self.ledger.portfolio(agent)
    }

    // === Agent order primitives ===

    /// Place a buy limit order at `venue`. Prices are rounded to the
    /// tick; zero quantities and venue errors are silently dropped.
    pub fn buy_limit(&mut self, agent: AgentId, venue: VenueId, qty: Quantity, price: f64) {
        let price = Price::from_f64(price);
        let _ = self.exchanges[venue.index()].limit_order(
            Some(agent),
            Side::Bid,
            qty,
            price,
            &mut self.ledger,
        );
    }

    /// Place a sell limit order at `venue`.
    pub fn sell_limit(&mut self, agent: AgentId, venue: VenueId, qty: Quantity, price: f64) {
        let price = Price::from_f64(price);
        let _ = self.exchanges[venue.index()].limit_order(
            Some(agent),
            Side::Ask,
            qty,
            price,
            &mut self.ledger,
        );
    }

    /// Market buy across the agent's venues. Returns the unfilled
    /// remainder.
    ///
    /// Unless `venue` is given, the order routes to the venue whose ask
    /// side has the *lowest worst* (least aggressive) price among venues
    /// with any asks — the only scalar available without walking the
    /// whole book, and the routing the fill distribution depends on.
    /// If no venue has asks the full quantity comes back.
    pub fn buy_market(
        &mut self,
        agent: AgentId,
        venues: &[VenueId],
        qty: Quantity,
        venue: Option<VenueId>,
    ) -> Quantity {
        self.route_market(agent, venues, qty, venue, Side::Bid)
    }

    /// Market sell across the agent's venues: picks the venue with the
    /// *highest worst* bid. Returns the unfilled remainder.
    pub fn sell_market(
        &mut self,
        agent: AgentId,
        venues: &[VenueId],
        qty: Quantity,
        venue: Option<VenueId>,
    ) -> Quantity {
        self.route_market(agent, venues, qty, venue, Side::Ask)
    }

    fn route_market(
        &mut self,
        agent: AgentId,
        venues: &[VenueId],
        qty: Quantity,
        venue: Option<VenueId>,
        side: Side,
    ) -> Quantity {
        let opposite = side.opposite();
        let selected = venues
            .iter()
            .filter_map(|&v| {
                self.venue(v)
                    .book()
                    .worst_price(opposite)
                    .map(|worst| (v, worst))
            })
            .reduce(|best, candidate| {
                let better = match side {
                    Side::Bid => candidate.1 < best.1,
                    Side::Ask => candidate.1 > best.1,
                };
                if better { candidate } else { best }
            });
        let Some((chosen, _)) = selected else {
            return qty;
        };
        let chosen = venue.unwrap_or(chosen);
        trace!(agent = %agent, venue = %chosen, %side, qty, "market order routed");
        match self.exchanges[chosen.index()].market_order(Some(agent), side, qty, &mut self.ledger)
        {
            Ok(remaining) => remaining,
            Err(_) => qty,
        }
    }

    /// Cancel one of the agent's resting orders. Unknown handles are a
    /// no-op on the book and drop the stale handle.
    pub fn cancel(&mut self, agent: AgentId, order: OrderRef) {
        self.exchanges[order.venue.index()].cancel_order(order.order, &mut self.ledger);
        // the exchange detaches the owner's handle when the order was
        // resting; make sure a stale handle cannot survive either way
        self.ledger.detach(agent, order);
    }

    /// Cancel every resting order of the agent (snapshot first, the set
    /// mutates while cancelling).
    pub fn cancel_all(&mut self, agent: AgentId) {
        let open: Vec<OrderRef> = self.ledger.portfolio(agent).open_orders().to_vec();
        for order in open {
            self.cancel(agent, order);
        }
    }

    /// Shift every resting price at `venue` and repair the book.
    pub fn apply_price_shock(&mut self, venue: VenueId, delta: Price) {
        self.exchanges[venue.index()].apply_price_shock(delta, &mut self.ledger);
    }

    /// Cash plus mark-to-mid inventory value. Venues without a readable
    /// mid (one-sided book) contribute nothing.
    pub fn equity(&self, agent: AgentId) -> f64 {
        let portfolio = self.ledger.portfolio(agent);
        let inventory: f64 = portfolio
            .holdings()
            .map(|(venue, shares)| {
                let mid = self
                    .venue(venue)
                    .price()
                    .map(|p| p.to_f64())
                    .unwrap_or(0.0);
                shares as f64 * mid
            })
            .sum();
        portfolio.cash + inventory
    }
}
