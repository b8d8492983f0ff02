//! Chartist: trend-follower whose side is set by a mutable sentiment.
//!
//! An optimistic chartist buys on the cheapest venue it can see, a
//! pessimistic one sells on the dearest. Sentiment is revalued from the
//! opinion of the chartist crowd and the latest price move.

use rand::Rng;

use super::random::{draw_price, draw_quantity, unit};
use super::{OpinionParams, Population, Sentiment};
use crate::{AgentId, Market, Side, VenueId};

/// Trend trader.
#[derive(Clone, Copy, Debug)]
pub struct Chartist {
    pub sentiment: Sentiment,
}

impl Chartist {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self {
            sentiment: Sentiment::draw(rng),
        }
    }
}

/// One tick of the chartist policy: pick the venue by sentiment, then the
/// usual regime buckets (market order above 0.85, limit in (0.5, 0.85]
/// with the price nudged by the transaction cost, cancel the most recent
/// resting order below 0.35).
pub(crate) fn step(
    id: AgentId,
    venues: &[VenueId],
    sentiment: Sentiment,
    market: &mut Market,
    rng: &mut impl Rng,
) {
    let priced: Vec<(VenueId, crate::Price)> = venues
        .iter()
        .filter_map(|&v| market.venue(v).price().ok().map(|p| (v, p)))
        .collect();
    let chosen = match sentiment {
        Sentiment::Optimistic => priced.iter().min_by_key(|(_, p)| *p),
        Sentiment::Pessimistic => priced.iter().max_by_key(|(_, p)| *p),
    };
    let Some(&(venue, _)) = chosen else {
        return;
    };
    let ex = market.venue(venue);
    let t_cost = ex.transaction_cost;
    let Ok(quote) = ex.spread() else {
        return;
    };

    let v = unit(rng);
    match sentiment {
        Sentiment::Optimistic => {
            if v > 0.85 {
                market.buy_market(id, venues, draw_quantity(rng), None);
            } else if v > 0.5 {
                let price = draw_price(Side::Bid, quote, rng) * (1.0 - t_cost);
                market.buy_limit(id, venue, draw_quantity(rng), price);
            } else if v < 0.35 {
                cancel_newest(id, market);
            }
        }
        Sentiment::Pessimistic => {
            if v > 0.85 {
                market.sell_market(id, venues, draw_quantity(rng), None);
            } else if v > 0.5 {
                let price = draw_price(Side::Ask, quote, rng) * (1.0 + t_cost);
                market.sell_limit(id, venue, draw_quantity(rng), price);
            } else if v < 0.35 {
                cancel_newest(id, market);
            }
        }
    }
}

fn cancel_newest(id: AgentId, market: &mut Market) {
    if let Some(&newest) = market.portfolio(id).open_orders().last() {
        market.cancel(id, newest);
    }
}

/// Probability that a chartist flips away from `sentiment`.
///
/// `x` is the normalized opinion majority `(N+ − N−)/Nc`, `dp` the last
/// price change, `p` the reference price. The flip probability is
/// `v1 · Nc/N · exp(±U)` with `U = a1·x + (a2/v1)·dp/p` (positive sign
/// when leaving the optimistic camp).
pub(crate) fn flip_probability(
    sentiment: Sentiment,
    x: f64,
    dp: f64,
    p: f64,
    params: &OpinionParams,
    chartists: usize,
    traders: usize,
) -> f64 {
    let v1 = if params.v1 == 0.0 { 1.0 } else { params.v1 };
    let p = if p == 0.0 { 1.0 } else { p };
    let u = params.a1 * x + params.a2 / v1 * dp / p;
    let weight = v1 * chartists as f64 / traders as f64;
    match sentiment {
        Sentiment::Optimistic => weight * u.exp(),
        Sentiment::Pessimistic => weight * (-u).exp(),
    }
}

/// Revalue a chartist's sentiment against the crowd and the price move.
/// The reference price is the cheapest readable mid when optimistic, the
/// dearest when pessimistic.
pub(crate) fn revalue(
    sentiment: &mut Sentiment,
    venues: &[VenueId],
    market: &Market,
    pop: &Population,
    dp: f64,
    params: &OpinionParams,
    rng: &mut impl Rng,
) {
    if pop.chartists == 0 || pop.traders == 0 {
        return;
    }
    let mids: Vec<f64> = venues
        .iter()
        .filter_map(|&v| market.venue(v).price().ok().map(|p| p.to_f64()))
        .collect();
    if mids.is_empty() {
        return;
    }
    let p = match sentiment {
        Sentiment::Optimistic => mids.iter().copied().fold(f64::INFINITY, f64::min),
        Sentiment::Pessimistic => mids.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };

    let x = (pop.optimists as f64 - pop.pessimists as f64) / pop.chartists as f64;
    let prob = flip_probability(*sentiment, x, dp, p, params, pop.chartists, pop.traders);
    if prob > unit(rng) {
        *sentiment = match sentiment {
            Sentiment::Optimistic => Sentiment::Pessimistic,
            Sentiment::Pessimistic => Sentiment::Optimistic,
        };
    }
}
