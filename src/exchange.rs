//! Exchange: one tradable instrument on one venue.
//!
//! Owns the order book, the dividend stream, the risk-free rate, the
//! proportional transaction cost and the trading-halt flag. Order flow
//! (limit/market) is gated on the halt flag at this boundary; quotes and
//! cancels stay available while halted so the resting book is preserved
//! and readable.

use std::collections::VecDeque;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::error::{MarketError, Result};
use crate::ledger::{Ledger, OrderRef};
use crate::{AgentId, OrderBook, OrderId, Price, Quantity, Side, Trade, VenueId};

/// Number of future dividends known to the exchange at any time.
pub const DIVIDEND_HORIZON: usize = 100;

/// Width of the log-normal step driving the dividend process.
const DIVIDEND_STD: f64 = 5e-3;

/// Best bid and ask prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quote {
    pub bid: Price,
    pub ask: Price,
}

impl Quote {
    /// Spread width (ask − bid) as a float.
    #[inline]
    pub fn width(&self) -> f64 {
        self.ask.to_f64() - self.bid.to_f64()
    }

    /// Mid-price rounded to one decimal.
    #[inline]
    pub fn mid(&self) -> Price {
        Price::from_f64((self.bid.to_f64() + self.ask.to_f64()) / 2.0)
    }
}

/// A single continuous limit-order-book venue.
#[derive(Clone, Debug)]
pub struct Exchange {
    pub id: VenueId,
    /// Number of orders seeded at initialization
    pub volume: u64,
    pub risk_free: f64,
    pub transaction_cost: f64,
    /// Set by a StopTrading event: no dividends, no order flow
    pub trading_stopped: bool,
    book: OrderBook,
    /// Always exactly [`DIVIDEND_HORIZON`] entries; front is the current
    /// dividend, back the furthest-known future one. All entries ≥ 0.
    dividend_book: VecDeque<f64>,
    /// Tape of every trade printed on this venue
    trades: Vec<Trade>,
}

impl Exchange {
    /// Create a venue with a seeded book and dividend stream.
    ///
    /// `volume/2` order prices are drawn from `N(price − std, std)` and
    /// `volume/2` from `N(price + std, std)`, rounded to one decimal and
    /// paired with uniform quantities in 1..=5. Draws above the center
    /// price become asks, the rest bids, so the seeded book is never
    /// crossed. The dividend stream starts at `rf · price` and evolves by
    /// iterated multiplication, clamped at zero.
    pub fn new(
        id: VenueId,
        price: f64,
        std: f64,
        volume: u64,
        risk_free: f64,
        transaction_cost: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let mut book = OrderBook::new(id);
        let center = Price::from_f64(price);

        let below = Normal::new(price - std, std).expect("seed price std must be finite and > 0");
        let above = Normal::new(price + std, std).expect("seed price std must be finite and > 0");
        let half = volume / 2;
        for i in 0..half * 2 {
            let raw = if i < half {
                below.sample(rng)
            } else {
                above.sample(rng)
            };
            let p = Price::from_f64(raw);
            let qty: Quantity = rng.gen_range(1..=5);
            let side = if p > center { Side::Ask } else { Side::Bid };
            let order = book.create_order(side, p, qty, None);
            book.insert_resting(order);
        }

        let mut dividend_book = VecDeque::with_capacity(DIVIDEND_HORIZON);
        let mut div = risk_free * price;
        for _ in 0..DIVIDEND_HORIZON {
            dividend_book.push_back(div.max(0.0));
            div *= Self::next_div_multiplier(rng);
        }

        Self {
            id,
            volume,
            risk_free,
            transaction_cost,
            trading_stopped: false,
            book,
            dividend_book,
            trades: Vec::new(),
        }
    }

    fn next_div_multiplier(rng: &mut impl Rng) -> f64 {
        let step = Normal::new(0.0, DIVIDEND_STD).expect("constant std is valid");
        step.sample(rng).exp()
    }

    // === Quotes ===

    /// Best bid and ask. Fails when either side is empty.
    pub fn spread(&self) -> Result<Quote> {
        match (self.book.best_bid(), self.book.best_ask()) {
            (Some(bid), Some(ask)) => Ok(Quote { bid, ask }),
            _ => Err(MarketError::EmptyBook),
        }
    }

    /// Resting quantity at the best bid and best ask.
    pub fn spread_volume(&self) -> Result<(Quantity, Quantity)> {
        match (
            self.book.best_volume(Side::Bid),
            self.book.best_volume(Side::Ask),
        ) {
            (Some(bid), Some(ask)) => Ok((bid, ask)),
            _ => Err(MarketError::EmptyBook),
        }
    }

    /// Mid-price, rounded to one decimal. Fails like [`Self::spread`].
    pub fn price(&self) -> Result<Price> {
        Ok(self.spread()?.mid())
    }

    // === Dividends ===

    /// The current dividend.
    pub fn dividend(&self) -> f64 {
        self.dividend_book[0]
    }

    /// The first `access` known dividends, current first.
    pub fn dividends(&self, access: usize) -> Vec<f64> {
        self.dividend_book.iter().take(access).copied().collect()
    }

    /// Pop the current dividend and append a new future one:
    /// `max(0, last · exp(N(0, 5e-3)))`.
    pub fn generate_dividend(&mut self, rng: &mut impl Rng) {
        let last = *self.dividend_book.back().expect("dividend book never empty");
        let next = last * Self::next_div_multiplier(rng);
        self.dividend_book.push_back(next.max(0.0));
        self.dividend_book.pop_front();
        debug_assert_eq!(self.dividend_book.len(), DIVIDEND_HORIZON);
    }

    // === Order flow ===

    /// Submit a limit order.
    ///
    /// Marketable orders fulfil against the opposite side first; any
    /// remaining quantity rests and is attached to the owner's open set.
    /// Returns the resting order id, if any. No-op (`EmptyBook`) when
    /// either side is empty at entry; zero quantities are dropped
    /// silently.
    pub fn limit_order(
        &mut self,
        owner: Option<AgentId>,
        side: Side,
        qty: Quantity,
        price: Price,
        ledger: &mut Ledger,
    ) -> Result<Option<OrderId>> {
        if self.trading_stopped {
            return Err(MarketError::TradingStopped);
        }
        let quote = self.spread()?;
        if qty == 0 {
            return Ok(None);
        }

        let mut order = self.book.create_order(side, price, qty, owner);
        let marketable = match side {
            Side::Bid => price >= quote.ask,
            Side::Ask => price <= quote.bid,
        };
        if marketable {
            let trades = self
                .book
                .fulfill(&mut order, self.transaction_cost, ledger, true);
            self.trades.extend(trades);
        }

        if order.is_consumed() {
            return Ok(None);
        }
        let id = order.id;
        self.book.insert_resting(order);
        if let Some(owner) = owner {
            ledger.attach(
                owner,
                OrderRef {
                    venue: self.id,
                    order: id,
                },
            );
        }
        Ok(Some(id))
    }

    /// Submit a market order: fulfil against the opposite side with no
    /// price constraint. Returns the unfilled remainder.
    pub fn market_order(
        &mut self,
        owner: Option<AgentId>,
        side: Side,
        qty: Quantity,
        ledger: &mut Ledger,
    ) -> Result<Quantity> {
        if self.trading_stopped {
            return Err(MarketError::TradingStopped);
        }
        if qty == 0 {
            return Ok(0);
        }
        // carries the worst opposite price as its reference; matching
        // itself is unconstrained
        let reference = self
            .book
            .worst_price(side.opposite())
            .unwrap_or(Price::ZERO);
        let mut order = self.book.create_order(side, reference, qty, owner);
        let trades = self
            .book
            .fulfill(&mut order, self.transaction_cost, ledger, false);
        self.trades.extend(trades);
        Ok(order.qty)
    }

    /// Remove a resting order. Unknown ids are a silent no-op; allowed
    /// while halted (book maintenance is not order flow).
    pub fn cancel_order(&mut self, id: OrderId, ledger: &mut Ledger) {
        if let Some(order) = self.book.remove(id) {
            if let Some(owner) = order.owner {
                ledger.detach(
                    owner,
                    OrderRef {
                        venue: self.id,
                        order: id,
                    },
                );
            }
        }
    }

    /// Shift every resting price by `delta` and re-establish the book
    /// invariants by matching away any resulting cross.
    pub fn apply_price_shock(&mut self, delta: Price, ledger: &mut Ledger) -> Vec<Trade> {
        self.book.shift_prices(delta);
        let trades = self.book.uncross(self.transaction_cost, ledger);
        debug!(venue = %self.id, delta = %delta, fills = trades.len(), "price shock applied");
        self.trades.extend(trades.clone());
        trades
    }

    // === Access ===

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    #[cfg(test)]
    pub(crate) fn book_mut(&mut self) -> &mut OrderBook {
        &mut self.book
    }

    /// Every trade printed on this venue, in execution order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }
}
