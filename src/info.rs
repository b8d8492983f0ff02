//! SimulatorInfo: per-venue observable time series and the report
//! projection handed to external collaborators.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::events::EventRecord;
use crate::traders::{Sentiment, TraderKind};
use crate::{AgentId, VenueId};

/// Market regime label for one observation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Stable,
    Panic,
    Disaster,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Stable => write!(f, "stable"),
            Regime::Panic => write!(f, "panic"),
            Regime::Disaster => write!(f, "disaster"),
        }
    }
}

/// Per-tick order-book summary, including the roster of traders active
/// on the venue.
#[derive(Clone, Debug, Serialize)]
pub struct BookSummary {
    pub bid_orders: usize,
    pub ask_orders: usize,
    pub bid_volume: u64,
    pub ask_volume: u64,
    pub traders: Vec<String>,
}

/// Append-only record of one venue's observable state, one entry per
/// iteration in every series.
#[derive(Clone, Debug)]
pub struct SimulatorInfo {
    pub venue: VenueId,
    /// Mid-price each tick (carries the last readable mid through
    /// one-sided stretches)
    pub prices: Vec<f64>,
    /// Best bid/ask each tick, `None` when a side was empty
    pub quotes: Vec<Option<(f64, f64)>>,
    /// Current dividend each tick
    pub dividends: Vec<f64>,
    /// Equity return of each agent vs. the previous tick
    pub returns: Vec<FxHashMap<AgentId, f64>>,
    /// Reported kind of each agent (universalists mutate)
    pub kinds: Vec<FxHashMap<AgentId, TraderKind>>,
    /// Sentiment of each sentiment-carrying agent
    pub sentiments: Vec<FxHashMap<AgentId, Sentiment>>,
    /// Book summary each tick
    pub orders: Vec<BookSummary>,
    /// One regime label per completed observation window
    pub states: Vec<Regime>,
}

impl SimulatorInfo {
    pub fn new(venue: VenueId) -> Self {
        Self {
            venue,
            prices: Vec::new(),
            quotes: Vec::new(),
            dividends: Vec::new(),
            returns: Vec::new(),
            kinds: Vec::new(),
            sentiments: Vec::new(),
            orders: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Number of recorded iterations.
    pub fn ticks(&self) -> usize {
        self.prices.len()
    }

    /// Price change over the last recorded tick (0 while unavailable).
    pub fn price_delta(&self) -> f64 {
        let n = self.prices.len();
        if n < 2 {
            return 0.0;
        }
        self.prices[n - 1] - self.prices[n - 2]
    }

    /// Simple-return series at the given lag:
    /// `r_i = (p_i − p_{i−lag}) / p_{i−lag}`.
    pub fn stock_returns(&self, lag: usize) -> Vec<f64> {
        if lag == 0 || self.prices.len() <= lag {
            return Vec::new();
        }
        (lag..self.prices.len())
            .map(|i| {
                let base = self.prices[i - lag];
                if base == 0.0 {
                    0.0
                } else {
                    (self.prices[i] - base) / base
                }
            })
            .collect()
    }

    /// Mean agent return of the last recorded tick (0 before any tick).
    pub fn mean_return_last_tick(&self) -> f64 {
        match self.returns.last() {
            Some(map) if !map.is_empty() => map.values().sum::<f64>() / map.len() as f64,
            _ => 0.0,
        }
    }

    /// Label the trailing `size`-tick window by return volatility.
    pub(crate) fn classify_window(&self, size: usize, panic_vol: f64, disaster_vol: f64) -> Regime {
        let returns = self.stock_returns(1);
        let tail = if returns.len() > size {
            &returns[returns.len() - size..]
        } else {
            &returns[..]
        };
        let vol = std_dev(tail);
        if vol <= panic_vol {
            Regime::Stable
        } else if vol <= disaster_vol {
            Regime::Panic
        } else {
            Regime::Disaster
        }
    }
}

/// Population standard deviation.
fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Identity of an agent as shown to consumers.
#[derive(Clone, Debug, Serialize)]
pub struct TraderMeta {
    pub name: String,
    pub kind: String,
}

/// The structured projection of one venue's run, laid out for the
/// external collaborators (export, plotting, recovery analytics).
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub prices: Vec<f64>,
    pub dividends: Vec<f64>,
    pub returns: Vec<BTreeMap<String, f64>>,
    pub orders: Vec<BookSummary>,
    pub states: Vec<String>,
    pub available_traders: BTreeMap<String, TraderMeta>,
    pub events: Vec<EventRecord>,
}
