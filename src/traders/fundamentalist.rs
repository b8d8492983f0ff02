//! Fundamentalist: values the stock with the Constant Dividend Model and
//! trades the gap between fundamental value and the market price.

use rand::Rng;

use super::random::{draw_delta, unit};
use crate::{AgentId, Market, Quantity, VenueId};

/// Order-size sensitivity to the fundamental/price gap.
const GAMMA: f64 = 5e-3;

/// Fundamental trader. Single-venue by construction: the valuation and
/// all limit orders use the explicit primary venue; only market orders
/// route across the agent's full venue list.
#[derive(Clone, Copy, Debug)]
pub struct Fundamentalist {
    /// How many future dividends this agent can see
    pub access: usize,
    /// The venue whose dividends and quotes drive the valuation
    pub venue: VenueId,
}

#[inline]
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Constant Dividend Model valuation over the known dividend window:
/// the discounted sum of all but the last known dividend, plus the
/// perpetuity of the last one at the risk-free rate.
pub(crate) fn evaluate(dividends: &[f64], risk_free: f64) -> f64 {
    let r = risk_free;
    let n = dividends.len();
    let perp = dividends[n - 1] / r / (1.0 + r).powi(n as i32 - 1);
    let known: f64 = if n > 1 {
        (0..n - 1)
            .map(|i| dividends[i] / (1.0 + r).powi(i as i32 + 1))
            .sum()
    } else {
        0.0
    };
    known + perp
}

/// Order quantity scaled by the relative mispricing, capped at 5.
pub(crate) fn order_size(pf: f64, p: f64) -> Quantity {
    let q = ((pf - p).abs() / p / GAMMA).round() as i64;
    q.clamp(0, 5) as Quantity
}

/// One tick of the fundamentalist policy.
///
/// Above 0.45 the agent trades, split 50/50 per branch between taking
/// liquidity and quoting around `pf`; the sell-above-`pf` quote in the
/// buy branch (and its mirror) hedges the taker flow rather than chasing
/// it. Below 0.45 the oldest resting order is cancelled.
pub(crate) fn step(
    id: AgentId,
    venues: &[VenueId],
    access: usize,
    venue: VenueId,
    market: &mut Market,
    rng: &mut impl Rng,
) {
    let ex = market.venue(venue);
    let Ok(quote) = ex.spread() else {
        return;
    };
    let Ok(mid) = ex.price() else {
        return;
    };
    let t_cost = ex.transaction_cost;
    let pf = round1(evaluate(&ex.dividends(access), ex.risk_free));
    let p = mid.to_f64();

    let regime = unit(rng);
    let qty = order_size(pf, p);
    if qty == 0 {
        return;
    }

    if regime > 0.45 {
        let pick = unit(rng);
        let ask_t = round1(quote.ask.to_f64() * (1.0 + t_cost));
        let bid_t = round1(quote.bid.to_f64() * (1.0 - t_cost));

        if pf >= ask_t {
            if pick > 0.5 {
                market.buy_market(id, venues, qty, None);
            } else {
                market.sell_limit(id, venue, qty, (pf + draw_delta(rng)) * (1.0 + t_cost));
            }
        } else if pf <= bid_t {
            if pick > 0.5 {
                market.sell_market(id, venues, qty, None);
            } else {
                market.buy_limit(id, venue, qty, (pf - draw_delta(rng)) * (1.0 - t_cost));
            }
        } else if pick > 0.5 {
            market.buy_limit(id, venue, qty, (pf - draw_delta(rng)) * (1.0 - t_cost));
        } else {
            market.sell_limit(id, venue, qty, (pf + draw_delta(rng)) * (1.0 + t_cost));
        }
    } else if let Some(&oldest) = market.portfolio(id).open_orders().first() {
        market.cancel(id, oldest);
    }
}
