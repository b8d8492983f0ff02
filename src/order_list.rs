//! OrderList: one side of a book, in price-time priority.
//!
//! Price levels live in a `BTreeMap` keyed by price, each holding a FIFO
//! queue of order ids. The orders themselves live in the book's central
//! arena; this structure only defines matching priority:
//!
//! - Bids: best = highest price; Asks: best = lowest price
//! - Within a price level, earlier arrivals match first (FIFO)
//! - `worst_price` is the least-aggressive resting price (the "last"
//!   order), used only as a fallback price reference for market routing

use std::collections::{BTreeMap, VecDeque};

use crate::{OrderId, Price, Side};

/// One side of the order book (all bids or all asks).
#[derive(Clone, Debug)]
pub struct OrderList {
    side: Side,
    levels: BTreeMap<Price, VecDeque<OrderId>>,
    len: usize,
}

impl OrderList {
    /// Create an empty list for the given side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            len: 0,
        }
    }

    /// Which side this list represents.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Returns true if no orders rest on this side.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of resting orders.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of distinct price levels.
    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// The most aggressive resting price (highest bid / lowest ask).
    pub fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Bid => self.levels.keys().next_back().copied(),
            Side::Ask => self.levels.keys().next().copied(),
        }
    }

    /// The least aggressive resting price (lowest bid / highest ask).
    pub fn worst_price(&self) -> Option<Price> {
        match self.side {
            Side::Bid => self.levels.keys().next().copied(),
            Side::Ask => self.levels.keys().next_back().copied(),
        }
    }

    /// The next order to match: front of the queue at the best price.
    pub fn front(&self) -> Option<OrderId> {
        let best = self.best_price()?;
        self.levels[&best].front().copied()
    }

    /// Insert an order preserving price-time priority: resting orders with
    /// equal price keep precedence over the newcomer.
    pub fn insert(&mut self, price: Price, id: OrderId) {
        self.levels.entry(price).or_default().push_back(id);
        self.len += 1;
    }

    /// Insert at the head of its price level. Only correct for an order
    /// that already held the front of that level (a partially filled
    /// order being re-rested keeps its time priority).
    pub fn insert_front(&mut self, price: Price, id: OrderId) {
        self.levels.entry(price).or_default().push_front(id);
        self.len += 1;
    }

    /// Remove a specific resting order. Silent no-op if absent.
    ///
    /// Returns `true` if the order was found and removed.
    pub fn remove(&mut self, price: Price, id: OrderId) -> bool {
        let Some(queue) = self.levels.get_mut(&price) else {
            return false;
        };
        let Some(pos) = queue.iter().position(|&q| q == id) else {
            return false;
        };
        queue.remove(pos);
        if queue.is_empty() {
            self.levels.remove(&price);
        }
        self.len -= 1;
        true
    }

    /// Remove and return the front order at the best price.
    pub fn pop_front(&mut self) -> Option<OrderId> {
        let best = self.best_price()?;
        let queue = self.levels.get_mut(&best)?;
        let id = queue.pop_front()?;
        if queue.is_empty() {
            self.levels.remove(&best);
        }
        self.len -= 1;
        Some(id)
    }

    /// Iterate resting orders from the most aggressive price outward,
    /// FIFO within each level.
    pub fn iter_best_to_worst(&self) -> impl Iterator<Item = (Price, OrderId)> + '_ {
        let iter: Box<dyn Iterator<Item = (&Price, &VecDeque<OrderId>)> + '_> = match self.side {
            Side::Ask => Box::new(self.levels.iter()),
            Side::Bid => Box::new(self.levels.iter().rev()),
        };
        iter.flat_map(|(price, queue)| queue.iter().map(move |id| (*price, *id)))
    }

    /// Shift every resting price by `delta` ticks.
    ///
    /// Adding a constant preserves both the level ordering and the FIFO
    /// queues, so priority is untouched. The caller is responsible for
    /// resolving any bid/ask cross the shift produces.
    pub fn shift_prices(&mut self, delta: Price) {
        let levels = std::mem::take(&mut self.levels);
        self.levels = levels
            .into_iter()
            .map(|(price, queue)| (Price(price.0 + delta.0), queue))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_list_is_empty() {
        let bids = OrderList::new(Side::Bid);
        assert!(bids.is_empty());
        assert_eq!(bids.len(), 0);
        assert_eq!(bids.best_price(), None);
        assert_eq!(bids.worst_price(), None);
        assert_eq!(bids.front(), None);
    }

    #[test]
    fn bids_best_is_highest() {
        let mut bids = OrderList::new(Side::Bid);
        bids.insert(Price(1000), OrderId(1));
        bids.insert(Price(990), OrderId(2));
        bids.insert(Price(1010), OrderId(3));

        assert_eq!(bids.best_price(), Some(Price(1010)));
        assert_eq!(bids.worst_price(), Some(Price(990)));
        assert_eq!(bids.front(), Some(OrderId(3)));
    }

    #[test]
    fn asks_best_is_lowest() {
        let mut asks = OrderList::new(Side::Ask);
        asks.insert(Price(1000), OrderId(1));
        asks.insert(Price(1010), OrderId(2));
        asks.insert(Price(990), OrderId(3));

        assert_eq!(asks.best_price(), Some(Price(990)));
        assert_eq!(asks.worst_price(), Some(Price(1010)));
        assert_eq!(asks.front(), Some(OrderId(3)));
    }

    #[test]
    fn fifo_within_level() {
        let mut asks = OrderList::new(Side::Ask);
        asks.insert(Price(1000), OrderId(1));
        asks.insert(Price(1000), OrderId(2));
        asks.insert(Price(1000), OrderId(3));

        assert_eq!(asks.pop_front(), Some(OrderId(1)));
        assert_eq!(asks.pop_front(), Some(OrderId(2)));
        assert_eq!(asks.pop_front(), Some(OrderId(3)));
        assert!(asks.is_empty());
    }

    #[test]
    fn remove_preserves_fifo_for_rest() {
        let mut bids = OrderList::new(Side::Bid);
        bids.insert(Price(1000), OrderId(1));
        bids.insert(Price(1000), OrderId(2));
        bids.insert(Price(1000), OrderId(3));

        assert!(bids.remove(Price(1000), OrderId(2)));
        assert_eq!(bids.pop_front(), Some(OrderId(1)));
        assert_eq!(bids.pop_front(), Some(OrderId(3)));
    }

    #[test]
    fn remove_absent_is_silent() {
        let mut bids = OrderList::new(Side::Bid);
        bids.insert(Price(1000), OrderId(1));

        assert!(!bids.remove(Price(1000), OrderId(99)));
        assert!(!bids.remove(Price(990), OrderId(1)));
        assert_eq!(bids.len(), 1);
    }

    #[test]
    fn removing_last_order_drops_level() {
        let mut asks = OrderList::new(Side::Ask);
        asks.insert(Price(1000), OrderId(1));
        asks.insert(Price(1010), OrderId(2));

        assert!(asks.remove(Price(1000), OrderId(1)));
        assert_eq!(asks.level_count(), 1);
        assert_eq!(asks.best_price(), Some(Price(1010)));
    }

    #[test]
    fn iter_best_to_worst_order() {
        let mut bids = OrderList::new(Side::Bid);
        bids.insert(Price(990), OrderId(1));
        bids.insert(Price(1010), OrderId(2));
        bids.insert(Price(1000), OrderId(3));
        bids.insert(Price(1010), OrderId(4));

        let ids: Vec<_> = bids.iter_best_to_worst().map(|(_, id)| id).collect();
        assert_eq!(ids, vec![OrderId(2), OrderId(4), OrderId(3), OrderId(1)]);
    }

    #[test]
    fn shift_preserves_priority() {
        let mut asks = OrderList::new(Side::Ask);
        asks.insert(Price(1000), OrderId(1));
        asks.insert(Price(1000), OrderId(2));
        asks.insert(Price(1020), OrderId(3));

        asks.shift_prices(Price(-500));

        assert_eq!(asks.best_price(), Some(Price(500)));
        assert_eq!(asks.worst_price(), Some(Price(520)));
        let ids: Vec<_> = asks.iter_best_to_worst().map(|(_, id)| id).collect();
        assert_eq!(ids, vec![OrderId(1), OrderId(2), OrderId(3)]);
    }
}
