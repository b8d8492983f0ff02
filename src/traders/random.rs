//! Random agent: noise orders that keep the market looking traded.

use rand::Rng;
use rand_distr::{Distribution, Exp};

use crate::exchange::Quote;
use crate::{AgentId, Market, Quantity, Side, VenueId};

/// Spread of the exponential price offset used for out-of-spread limits.
const DELTA_STD: f64 = 2.5;

/// Noise trader with no state of its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTrader;

/// Uniform draw on [0, 1).
#[inline]
pub(crate) fn unit(rng: &mut impl Rng) -> f64 {
    rng.gen_range(0.0..1.0)
}

/// Order quantity, uniform on 1..=5.
pub(crate) fn draw_quantity(rng: &mut impl Rng) -> Quantity {
    rng.gen_range(1..=5)
}

/// Exponential price offset with mean [`DELTA_STD`].
pub(crate) fn draw_delta(rng: &mut impl Rng) -> f64 {
    Exp::new(1.0 / DELTA_STD)
        .expect("constant rate is valid")
        .sample(rng)
}

/// Price for a limit order against the given quote:
/// with probability 0.35 uniform inside the spread, otherwise an
/// exponential offset away from the best price on the order's side.
pub(crate) fn draw_price(side: Side, quote: Quote, rng: &mut impl Rng) -> f64 {
    if unit(rng) < 0.35 {
        rng.gen_range(quote.bid.to_f64()..quote.ask.to_f64())
    } else {
        let delta = draw_delta(rng);
        match side {
            Side::Bid => quote.bid.to_f64() - delta,
            Side::Ask => quote.ask.to_f64() + delta,
        }
    }
}

/// One tick of the random policy:
/// side coin, then a regime draw `v` — market order above 0.85, limit
/// order on the agent's first venue in (0.5, 0.85], cancel one random
/// resting order below 0.35, otherwise nothing. Limit prices reference
/// the narrowest spread across the agent's venues.
pub(crate) fn step(id: AgentId, venues: &[VenueId], market: &mut Market, rng: &mut impl Rng) {
    let quote = narrowest_spread(venues, market);
    let Some(quote) = quote else {
        return;
    };

    let side = if unit(rng) > 0.5 { Side::Bid } else { Side::Ask };

    let v = unit(rng);
    if v > 0.85 {
        let qty = draw_quantity(rng);
        match side {
            Side::Bid => market.buy_market(id, venues, qty, None),
            Side::Ask => market.sell_market(id, venues, qty, None),
        };
    } else if v > 0.5 {
        let price = draw_price(side, quote, rng);
        let qty = draw_quantity(rng);
        match side {
            Side::Bid => market.buy_limit(id, venues[0], qty, price),
            Side::Ask => market.sell_limit(id, venues[0], qty, price),
        }
    } else if v < 0.35 {
        let open = market.portfolio(id).open_orders();
        if !open.is_empty() {
            let pick = open[rng.gen_range(0..open.len())];
            market.cancel(id, pick);
        }
    }
}

/// The tightest readable quote across the given venues.
pub(crate) fn narrowest_spread(venues: &[VenueId], market: &Market) -> Option<Quote> {
    venues
        .iter()
        .filter_map(|&v| market.venue(v).spread().ok())
        .min_by(|a, b| a.width().total_cmp(&b.width()))
}
