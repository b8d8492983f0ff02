//! Trading agents.
//!
//! Every agent is a [`Trader`]: an id, the venues it trades on, and a
//! [`Strategy`]. The strategy is a closed enum rather than a trait object
//! because the Universalist *is* both a Chartist and a Fundamentalist and
//! flips between them at runtime — composition over the union of fields
//! keeps that flip a tag change instead of an inheritance puzzle.
//!
//! Money, inventory and resting-order handles live in the market's
//! [`crate::Ledger`]; the trader structs hold only strategy state.

mod chartist;
mod fundamentalist;
mod market_maker;
mod random;
mod universalist;

pub use chartist::Chartist;
pub use fundamentalist::Fundamentalist;
pub use market_maker::MarketMaker;
pub use random::RandomTrader;
pub use universalist::{Style, Universalist};

use std::fmt;

use rand::Rng;

use crate::{AgentId, Market, VenueId};

/// A chartist's categorical belief about short-term price direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sentiment {
    Optimistic,
    Pessimistic,
}

impl Sentiment {
    /// Coin-flip initial sentiment.
    pub fn draw(rng: &mut impl Rng) -> Self {
        if rng.gen_range(0.0..1.0) > 0.5 {
            Sentiment::Optimistic
        } else {
            Sentiment::Pessimistic
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Optimistic => write!(f, "Optimistic"),
            Sentiment::Pessimistic => write!(f, "Pessimistic"),
        }
    }
}

/// The observable kind of an agent. A Universalist reports the strategy
/// it is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraderKind {
    Random,
    Fundamentalist,
    Chartist,
    MarketMaker,
}

impl fmt::Display for TraderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraderKind::Random => write!(f, "Random"),
            TraderKind::Fundamentalist => write!(f, "Fundamentalist"),
            TraderKind::Chartist => write!(f, "Chartist"),
            TraderKind::MarketMaker => write!(f, "MarketMaker"),
        }
    }
}

/// Census of the agent population, taken once per tick before the
/// revaluation pass so every flip probability sees the same counts.
/// Optimists/pessimists count only agents currently acting as chartists.
#[derive(Clone, Copy, Debug, Default)]
pub struct Population {
    pub traders: usize,
    pub chartists: usize,
    pub fundamentalists: usize,
    pub optimists: usize,
    pub pessimists: usize,
}

/// Weights of the opinion-propagation and strategy-switching dynamics.
#[derive(Clone, Copy, Debug, serde::Deserialize)]
#[serde(default)]
pub struct OpinionParams {
    /// Importance of the chartist majority opinion
    pub a1: f64,
    /// Importance of the recent price change
    pub a2: f64,
    /// Importance of fundamentalist profit
    pub a3: f64,
    /// Sentiment revaluation frequency
    pub v1: f64,
    /// Strategy revaluation frequency
    pub v2: f64,
    /// Importance of fundamental-value opportunities
    pub s: f64,
}

impl Default for OpinionParams {
    fn default() -> Self {
        Self {
            a1: 1.0,
            a2: 1.0,
            a3: 1.0,
            v1: 0.1,
            v2: 0.1,
            s: 0.1,
        }
    }
}

/// One agent's decision policy and its mutable state.
#[derive(Clone, Debug)]
pub enum Strategy {
    Random(RandomTrader),
    Fundamentalist(Fundamentalist),
    Chartist(Chartist),
    Universalist(Universalist),
    MarketMaker(MarketMaker),
}

/// A trading agent: identity, venue handles, and strategy state.
#[derive(Clone, Debug)]
pub struct Trader {
    pub id: AgentId,
    pub venues: Vec<VenueId>,
    pub strategy: Strategy,
}

impl Trader {
    pub fn new(id: AgentId, venues: Vec<VenueId>, strategy: Strategy) -> Self {
        Self {
            id,
            venues,
            strategy,
        }
    }

    /// The venue whose series drive this agent's revaluation formulas.
    pub fn primary_venue(&self) -> VenueId {
        self.venues[0]
    }

    /// Activate the agent for one tick.
    pub fn call(&mut self, market: &mut Market, rng: &mut impl Rng) {
        match &mut self.strategy {
            Strategy::Random(_) => random::step(self.id, &self.venues, market, rng),
            Strategy::Fundamentalist(f) => {
                fundamentalist::step(self.id, &self.venues, f.access, f.venue, market, rng)
            }
            Strategy::Chartist(c) => {
                chartist::step(self.id, &self.venues, c.sentiment, market, rng)
            }
            Strategy::Universalist(u) => u.call(self.id, &self.venues, market, rng),
            Strategy::MarketMaker(m) => m.step(self.id, &self.venues, market),
        }
    }

    /// Sentiment revaluation (chartists only; universalists re-evaluate
    /// inside [`Self::revalue_strategy`]).
    pub fn revalue_sentiment(
        &mut self,
        market: &Market,
        pop: &Population,
        dp: f64,
        params: &OpinionParams,
        rng: &mut impl Rng,
    ) {
        if let Strategy::Chartist(c) = &mut self.strategy {
            chartist::revalue(&mut c.sentiment, &self.venues, market, pop, dp, params, rng);
        }
    }

    /// Strategy (and sentiment) revaluation for universalists.
    /// `avg_return` is the mean agent return of the last tick.
    pub fn revalue_strategy(
        &mut self,
        market: &Market,
        pop: &Population,
        dp: f64,
        avg_return: f64,
        params: &OpinionParams,
        rng: &mut impl Rng,
    ) {
        if let Strategy::Universalist(u) = &mut self.strategy {
            u.change_strategy(&self.venues, market, pop, dp, avg_return, params, rng);
        }
    }

    /// The kind this agent currently reports as.
    pub fn kind(&self) -> TraderKind {
        match &self.strategy {
            Strategy::Random(_) => TraderKind::Random,
            Strategy::Fundamentalist(_) => TraderKind::Fundamentalist,
            Strategy::Chartist(_) => TraderKind::Chartist,
            Strategy::Universalist(u) => match u.style {
                Style::Chartist => TraderKind::Chartist,
                Style::Fundamentalist => TraderKind::Fundamentalist,
            },
            Strategy::MarketMaker(_) => TraderKind::MarketMaker,
        }
    }

    /// Current sentiment, for agents that hold one. A Universalist keeps
    /// its last-held sentiment while running as a Fundamentalist.
    pub fn sentiment(&self) -> Option<Sentiment> {
        match &self.strategy {
            Strategy::Chartist(c) => Some(c.sentiment),
            Strategy::Universalist(u) => Some(u.sentiment),
            _ => None,
        }
    }

    /// Display name used in rosters, e.g. `Chartist7`.
    pub fn name(&self) -> String {
        format!("{}{}", self.kind(), self.id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn kind_labels() {
        assert_eq!(TraderKind::MarketMaker.to_string(), "MarketMaker");
        assert_eq!(TraderKind::Random.to_string(), "Random");
    }

    #[test]
    fn universalist_reports_current_style() {
        let trader = Trader::new(
            AgentId(4),
            vec![VenueId(0)],
            Strategy::Universalist(Universalist {
                style: Style::Fundamentalist,
                sentiment: Sentiment::Pessimistic,
                access: 1,
                venue: VenueId(0),
            }),
        );
        assert_eq!(trader.kind(), TraderKind::Fundamentalist);
        assert_eq!(trader.sentiment(), Some(Sentiment::Pessimistic));
        assert_eq!(trader.name(), "Fundamentalist4");
    }

    #[test]
    fn sentiment_draw_is_a_coin_flip() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let draws: Vec<Sentiment> = (0..100).map(|_| Sentiment::draw(&mut rng)).collect();
        assert!(draws.iter().any(|s| *s == Sentiment::Optimistic));
        assert!(draws.iter().any(|s| *s == Sentiment::Pessimistic));
    }
}
