//! Ledger: the account arena shared by every venue.
//!
//! Agents never hold order references; they hold `(venue, order)` id
//! pairs, and their cash, inventory and open-order handles live here,
//! addressed by [`AgentId`]. Settlement and handle maintenance go through
//! the ledger so that an order removed by the book (fill or cancel) is
//! always dropped from its owner's open set in the same step.

use rustc_hash::FxHashMap;

use crate::{AgentId, OrderId, Price, Quantity, VenueId};

/// Handle to a live resting order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderRef {
    pub venue: VenueId,
    pub order: OrderId,
}

/// One agent's account: cash, per-venue inventory, live order handles.
///
/// Cash and inventory are unconstrained: the model has no margin check,
/// so both may go negative (short positions, borrowed cash).
#[derive(Clone, Debug)]
pub struct Portfolio {
    pub cash: f64,
    holdings: FxHashMap<VenueId, i64>,
    open_orders: Vec<OrderRef>,
}

impl Portfolio {
    fn new(cash: f64) -> Self {
        Self {
            cash,
            holdings: FxHashMap::default(),
            open_orders: Vec::new(),
        }
    }

    /// Shares held at a venue (0 if never traded there).
    #[inline]
    pub fn holding(&self, venue: VenueId) -> i64 {
        self.holdings.get(&venue).copied().unwrap_or(0)
    }

    /// Venues with a recorded (possibly zero) inventory entry.
    pub fn holdings(&self) -> impl Iterator<Item = (VenueId, i64)> + '_ {
        self.holdings.iter().map(|(v, n)| (*v, *n))
    }

    /// Live resting orders, oldest first.
    #[inline]
    pub fn open_orders(&self) -> &[OrderRef] {
        &self.open_orders
    }

    fn add_shares(&mut self, venue: VenueId, delta: i64) {
        *self.holdings.entry(venue).or_insert(0) += delta;
    }
}

/// All portfolios, indexed by agent id.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    portfolios: Vec<Portfolio>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent with starting cash and per-venue inventory.
    pub fn register(
        &mut self,
        cash: f64,
        holdings: impl IntoIterator<Item = (VenueId, i64)>,
    ) -> AgentId {
        let id = AgentId(self.portfolios.len() as u32);
        let mut portfolio = Portfolio::new(cash);
        for (venue, shares) in holdings {
            portfolio.holdings.insert(venue, shares);
        }
        self.portfolios.push(portfolio);
        id
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.portfolios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }

    pub fn portfolio(&self, agent: AgentId) -> &Portfolio {
        &self.portfolios[agent.index()]
    }

    pub fn portfolio_mut(&mut self, agent: AgentId) -> &mut Portfolio {
        &mut self.portfolios[agent.index()]
    }

    /// Settle a fill of `qty` shares at `price` on `venue`.
    ///
    /// The buyer pays `qty·price·(1 + t_cost)` and gains the shares; the
    /// seller receives `qty·price·(1 − t_cost)` and loses them. The net
    /// `2·qty·price·t_cost` leaves the economy (the transaction-cost
    /// sink). A `None` participant is a book-seed order: that leg is
    /// skipped entirely.
    pub fn settle(
        &mut self,
        venue: VenueId,
        buyer: Option<AgentId>,
        seller: Option<AgentId>,
        qty: Quantity,
        price: Price,
        t_cost: f64,
    ) {
        let notional = qty as f64 * price.to_f64();
        if let Some(buyer) = buyer {
            let p = self.portfolio_mut(buyer);
            p.cash -= notional * (1.0 + t_cost);
            p.add_shares(venue, qty as i64);
        }
        if let Some(seller) = seller {
            let p = self.portfolio_mut(seller);
            p.cash += notional * (1.0 - t_cost);
            p.add_shares(venue, -(qty as i64));
        }
    }

    /// Record a newly resting order against its owner.
    pub fn attach(&mut self, agent: AgentId, order: OrderRef) {
        self.portfolio_mut(agent).open_orders.push(order);
    }

    /// Drop an order handle once the book no longer holds it.
    /// Silent no-op if the handle is already gone.
    pub fn detach(&mut self, agent: AgentId, order: OrderRef) {
        let open = &mut self.portfolio_mut(agent).open_orders;
        if let Some(pos) = open.iter().position(|&o| o == order) {
            open.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_sequential_ids() {
        let mut ledger = Ledger::new();
        let a = ledger.register(1000.0, [(VenueId(0), 5)]);
        let b = ledger.register(500.0, []);
        assert_eq!(a, AgentId(0));
        assert_eq!(b, AgentId(1));
        assert_eq!(ledger.portfolio(a).holding(VenueId(0)), 5);
        assert_eq!(ledger.portfolio(b).holding(VenueId(0)), 0);
    }

    #[test]
    fn settle_transfers_cash_and_shares() {
        let mut ledger = Ledger::new();
        let buyer = ledger.register(1000.0, []);
        let seller = ledger.register(1000.0, [(VenueId(0), 10)]);

        // 2 shares at 100.0 with a 1% transaction cost
        ledger.settle(VenueId(0), Some(buyer), Some(seller), 2, Price(1000), 0.01);

        assert_eq!(ledger.portfolio(buyer).cash, 1000.0 - 202.0);
        assert_eq!(ledger.portfolio(buyer).holding(VenueId(0)), 2);
        assert_eq!(ledger.portfolio(seller).cash, 1000.0 + 198.0);
        assert_eq!(ledger.portfolio(seller).holding(VenueId(0)), 8);
    }

    #[test]
    fn settle_skips_seed_legs() {
        let mut ledger = Ledger::new();
        let buyer = ledger.register(100.0, []);

        ledger.settle(VenueId(0), Some(buyer), None, 1, Price(500), 0.0);

        assert_eq!(ledger.portfolio(buyer).cash, 50.0);
        assert_eq!(ledger.portfolio(buyer).holding(VenueId(0)), 1);
    }

    #[test]
    fn cash_and_shares_may_go_negative() {
        let mut ledger = Ledger::new();
        let agent = ledger.register(10.0, []);

        ledger.settle(VenueId(0), Some(agent), None, 1, Price(1000), 0.0);
        assert_eq!(ledger.portfolio(agent).cash, -90.0);

        ledger.settle(VenueId(0), None, Some(agent), 3, Price(1000), 0.0);
        assert_eq!(ledger.portfolio(agent).holding(VenueId(0)), -2);
    }

    #[test]
    fn attach_detach_roundtrip() {
        let mut ledger = Ledger::new();
        let agent = ledger.register(0.0, []);
        let handle = OrderRef {
            venue: VenueId(1),
            order: OrderId(7),
        };

        ledger.attach(agent, handle);
        assert_eq!(ledger.portfolio(agent).open_orders(), &[handle]);

        ledger.detach(agent, handle);
        assert!(ledger.portfolio(agent).open_orders().is_empty());

        // already gone: no-op
        ledger.detach(agent, handle);
    }
}
