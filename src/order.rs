//! Order representation and lifecycle

use crate::{AgentId, OrderId, Price, Quantity, Side, Timestamp, VenueId};

/// An order resting in, or being matched against, a venue's book.
///
/// Orders live by value in the book's arena and are addressed by
/// [`OrderId`]; agents keep `(venue, order)` handles, never references.
/// `owner` is `None` for the orders seeded at book initialization —
/// their settlement leg is skipped when they trade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    /// Unique identifier assigned by the venue's book
    pub id: OrderId,
    /// Bid or ask
    pub side: Side,
    /// Limit price (max for a bid, min for an ask), one-decimal ticks
    pub price: Price,
    /// Quantity still available to fill; 0 means consumed
    pub qty: Quantity,
    /// Venue this order was routed to
    pub venue: VenueId,
    /// Issuing agent, absent for book-seed orders
    pub owner: Option<AgentId>,
    /// Arrival counter within the book (FIFO at equal price)
    pub timestamp: Timestamp,
}

impl Order {
    pub fn new(
        id: OrderId,
        side: Side,
        price: Price,
        qty: Quantity,
        venue: VenueId,
        owner: Option<AgentId>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            side,
            price,
            qty,
            venue,
            owner,
            timestamp,
        }
    }

    /// Returns true once the order has been fully matched.
    #[inline]
    pub fn is_consumed(&self) -> bool {
        self.qty == 0
    }

    /// Reduce the remaining quantity after a fill.
    ///
    /// # Panics
    ///
    /// Panics if `quantity` exceeds the remaining quantity.
    pub fn fill(&mut self, quantity: Quantity) {
        assert!(
            quantity <= self.qty,
            "fill quantity {} exceeds remaining {}",
            quantity,
            self.qty
        );
        self.qty -= quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_order(qty: Quantity) -> Order {
        Order::new(
            OrderId(1),
            Side::Bid,
            Price(1000),
            qty,
            VenueId(0),
            Some(AgentId(3)),
            1,
        )
    }

    #[test]
    fn new_order_is_live() {
        let order = make_order(5);
        assert_eq!(order.qty, 5);
        assert!(!order.is_consumed());
    }

    #[test]
    fn partial_then_full_fill() {
        let mut order = make_order(5);
        order.fill(2);
        assert_eq!(order.qty, 3);
        assert!(!order.is_consumed());
        order.fill(3);
        assert!(order.is_consumed());
    }

    #[test]
    #[should_panic(expected = "exceeds remaining")]
    fn overfill_panics() {
        let mut order = make_order(2);
        order.fill(3);
    }

    #[test]
    fn seed_orders_have_no_owner() {
        let order = Order::new(OrderId(9), Side::Ask, Price(1010), 4, VenueId(1), None, 2);
        assert!(order.owner.is_none());
    }
}
