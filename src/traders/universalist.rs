//! Universalist: runs either the chartist or the fundamentalist policy
//! and switches between them on relative attractiveness.
//!
//! The sentiment field is permanent state: it keeps updating while the
//! agent runs as a chartist, freezes while it runs as a fundamentalist,
//! and the switch back into the chartist camp is gated on that frozen
//! value.

use rand::Rng;

use super::{chartist, fundamentalist, OpinionParams, Population, Sentiment};
use crate::{AgentId, Market, VenueId};

/// Which of the two parent policies is currently active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    Chartist,
    Fundamentalist,
}

/// Strategy-switching trader.
#[derive(Clone, Copy, Debug)]
pub struct Universalist {
    pub style: Style,
    pub sentiment: Sentiment,
    /// Future dividends visible in fundamentalist mode
    pub access: usize,
    /// Primary venue (valuation, limit orders, revaluation series)
    pub venue: VenueId,
}

impl Universalist {
    pub fn new(access: usize, venue: VenueId, rng: &mut impl Rng) -> Self {
        let style = if rng.gen_range(0.0..1.0) > 0.5 {
            Style::Chartist
        } else {
            Style::Fundamentalist
        };
        Self {
            style,
            sentiment: Sentiment::draw(rng),
            access,
            venue,
        }
    }

    /// Delegate the tick to the active policy.
    pub(crate) fn call(
        &mut self,
        id: AgentId,
        venues: &[VenueId],
        market: &mut Market,
        rng: &mut impl Rng,
    ) {
        match self.style {
            Style::Chartist => chartist::step(id, venues, self.sentiment, market, rng),
            Style::Fundamentalist => {
                fundamentalist::step(id, venues, self.access, self.venue, market, rng)
            }
        }
    }

    /// Revalue sentiment (chartist mode only), then maybe switch styles.
    ///
    /// `dp` is the last price change of the primary venue, `avg_return`
    /// the mean agent return of the last tick.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn change_strategy(
        &mut self,
        venues: &[VenueId],
        market: &Market,
        pop: &Population,
        dp: f64,
        avg_return: f64,
        params: &OpinionParams,
        rng: &mut impl Rng,
    ) {
        if self.style == Style::Chartist {
            chartist::revalue(&mut self.sentiment, venues, market, pop, dp, params, rng);
        }
        if pop.traders == 0 {
            return;
        }

        let ex = market.venue(self.venue);
        let Ok(mid) = ex.price() else {
            return;
        };
        let p = mid.to_f64();
        let pf = fundamentalist::evaluate(&ex.dividends(self.access), ex.risk_free);
        let r = pf * ex.risk_free;
        let (u1, u2) = switch_utilities(r, dp, p, pf, avg_return, params);

        let n = pop.traders as f64;
        let v2 = params.v2;
        match self.style {
            Style::Chartist => {
                let prob = match self.sentiment {
                    Sentiment::Optimistic => v2 * pop.optimists as f64 / (n * u1.exp()),
                    Sentiment::Pessimistic => v2 * pop.pessimists as f64 / (n * u2.exp()),
                };
                if prob > rng.gen_range(0.0..1.0) {
                    self.style = Style::Fundamentalist;
                }
            }
            Style::Fundamentalist => {
                let nf = pop.fundamentalists as f64;
                let prob = v2 * nf / (n * (-u1).exp());
                if prob > rng.gen_range(0.0..1.0) && self.sentiment == Sentiment::Pessimistic {
                    self.style = Style::Chartist;
                    self.sentiment = Sentiment::Optimistic;
                }
                let prob = v2 * nf / (n * (-u2).exp());
                if prob > rng.gen_range(0.0..1.0) && self.sentiment == Sentiment::Optimistic {
                    self.style = Style::Chartist;
                    self.sentiment = Sentiment::Pessimistic;
                }
            }
        }
    }
}

/// Clamped switch utilities.
///
/// `U1` favors the fundamentalist view (expected dividend yield plus the
/// momentum term against the economy-wide return, discounted by the
/// mispricing risk), `U2` the chartist view; both clipped to ±100 so the
/// exponentials stay finite.
pub(crate) fn switch_utilities(
    r: f64,
    dp: f64,
    p: f64,
    pf: f64,
    avg_return: f64,
    params: &OpinionParams,
) -> (f64, f64) {
    let momentum = (r + dp / params.v2) / p;
    let mispricing = params.s * ((pf - p) / p).abs();
    let u1 = (params.a3 * (momentum - avg_return - mispricing)).clamp(-100.0, 100.0);
    let u2 = (params.a3 * (avg_return - momentum - mispricing)).clamp(-100.0, 100.0);
    (u1, u2)
}
