//! Typed configuration records and the simulator builder.
//!
//! The core consumes configuration as plain deserializable records; how
//! they reach the process (JSON files, scenario generators) is the
//! caller's business. `SimConfig::build` expands trader groups into
//! registered agents, turns venue ordinals into handles, and wires up
//! the simulator with one seeded random source.

use rand::SeedableRng;
use serde::Deserialize;

use crate::events::{Event, EventKind};
use crate::ledger::Ledger;
use crate::sim::{SimRng, Simulator, SimulatorSettings};
use crate::traders::{
    Chartist, Fundamentalist, MarketMaker, OpinionParams, RandomTrader, Strategy, Trader,
    Universalist,
};
use crate::{Exchange, Market, VenueId};

/// Errors detected while building a simulator from a config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config declares no exchanges")]
    NoExchanges,
    #[error("exchange std must be positive, got {0}")]
    InvalidStd(f64),
    #[error("trader group references unknown venue {0}")]
    UnknownVenue(usize),
    #[error("trader group declares no markets")]
    NoMarkets,
    #[error("trader group has {assets} asset entries for {markets} markets")]
    AssetCountMismatch { assets: usize, markets: usize },
    #[error("softlimits has {limits} entries for {markets} markets")]
    SoftLimitCountMismatch { limits: usize, markets: usize },
    #[error("fundamental access must be at least 1")]
    ZeroAccess,
    #[error("event references unknown venue {0}")]
    UnknownEventVenue(usize),
}

/// One venue to create.
#[derive(Clone, Debug, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_price")]
    pub price: f64,
    #[serde(default = "default_std")]
    pub std: f64,
    #[serde(default = "default_volume")]
    pub volume: u64,
    #[serde(default = "default_rf")]
    pub rf: f64,
    #[serde(default)]
    pub transaction_cost: f64,
}

fn default_price() -> f64 {
    100.0
}
fn default_std() -> f64 {
    25.0
}
fn default_volume() -> u64 {
    1000
}
fn default_rf() -> f64 {
    5e-4
}

/// Which policy a trader group runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum TraderType {
    Random,
    Fundamentalist,
    Chartist,
    Universalist,
    MarketMaker,
}

/// One group of identically configured traders, expanded `count` times.
/// Strategy-specific fields are optional; unknown fields are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct TraderConfig {
    #[serde(rename = "type")]
    pub kind: TraderType,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_cash")]
    pub cash: f64,
    /// Venue ordinals this group trades on
    pub markets: Vec<usize>,
    /// Initial inventory per market (zeros when omitted)
    #[serde(default)]
    pub assets: Vec<i64>,
    /// Future dividends visible (Fundamentalist/Universalist)
    #[serde(default = "default_access")]
    pub access: usize,
    /// Per-market inventory band half-widths (MarketMaker)
    #[serde(default)]
    pub softlimits: Option<Vec<i64>>,
}

fn default_count() -> u32 {
    1
}
fn default_cash() -> f64 {
    1000.0
}
fn default_access() -> usize {
    1
}

/// One scheduled perturbation.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum EventConfig {
    MarketPriceShock {
        it: u64,
        stock_id: usize,
        price_change: f64,
    },
    StopTrading {
        it: u64,
        exchange_id: usize,
    },
}

/// The whole simulation setup.
#[derive(Clone, Debug, Deserialize)]
pub struct SimConfig {
    pub exchanges: Vec<ExchangeConfig>,
    pub traders: Vec<TraderConfig>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
    pub iterations: u64,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_stability")]
    pub stability_threshold: u32,
    #[serde(default)]
    pub opinion: OpinionParams,
    #[serde(default = "default_panic_vol")]
    pub panic_vol: f64,
    #[serde(default = "default_disaster_vol")]
    pub disaster_vol: f64,
}

fn default_size() -> usize {
    10
}
fn default_window() -> usize {
    5
}
fn default_stability() -> u32 {
    5
}
fn default_panic_vol() -> f64 {
    0.01
}
fn default_disaster_vol() -> f64 {
    0.05
}

impl SimConfig {
    fn settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            opinion: self.opinion,
            size: self.size,
            window: self.window,
            stability_threshold: self.stability_threshold,
            panic_vol: self.panic_vol,
            disaster_vol: self.disaster_vol,
        }
    }

    /// Build the simulator: seed the venues, expand every trader group,
    /// and schedule the events. The same seed over the same config and
    /// schedule reproduces the run exactly.
    pub fn build(&self, seed: u64) -> Result<Simulator, ConfigError> {
        if self.exchanges.is_empty() {
            return Err(ConfigError::NoExchanges);
        }
        let mut rng = SimRng::seed_from_u64(seed);

        let mut exchanges = Vec::with_capacity(self.exchanges.len());
        for (i, cfg) in self.exchanges.iter().enumerate() {
            if !(cfg.std > 0.0) {
                return Err(ConfigError::InvalidStd(cfg.std));
            }
            exchanges.push(Exchange::new(
                VenueId(i as u32),
                cfg.price,
                cfg.std,
                cfg.volume,
                cfg.rf,
                cfg.transaction_cost,
                &mut rng,
            ));
        }

        let mut ledger = Ledger::new();
        let mut traders = Vec::new();
        for group in &self.traders {
            let venues = Self::venue_handles(group, self.exchanges.len())?;
            for _ in 0..group.count {
                let holdings = venues.iter().enumerate().map(|(i, &venue)| {
                    (venue, group.assets.get(i).copied().unwrap_or(0))
                });
                let id = ledger.register(group.cash, holdings);
                let strategy = Self::strategy(group, &venues, &mut rng)?;
                traders.push(Trader::new(id, venues.clone(), strategy));
            }
        }

        let mut events = Vec::with_capacity(self.events.len());
        for event in &self.events {
            events.push(self.event(event)?);
        }

        let market = Market::new(exchanges, ledger);
        Ok(Simulator::new(market, traders, events, self.settings(), rng))
    }

    fn venue_handles(group: &TraderConfig, n_venues: usize) -> Result<Vec<VenueId>, ConfigError> {
        if group.markets.is_empty() {
            return Err(ConfigError::NoMarkets);
        }
        if !group.assets.is_empty() && group.assets.len() != group.markets.len() {
            return Err(ConfigError::AssetCountMismatch {
                assets: group.assets.len(),
                markets: group.markets.len(),
            });
        }
        group
            .markets
            .iter()
            .map(|&m| {
                if m < n_venues {
                    Ok(VenueId(m as u32))
                } else {
                    Err(ConfigError::UnknownVenue(m))
                }
            })
            .collect()
    }

    fn strategy(
        group: &TraderConfig,
        venues: &[VenueId],
        rng: &mut SimRng,
    ) -> Result<Strategy, ConfigError> {
        Ok(match group.kind {
            TraderType::Random => Strategy::Random(RandomTrader),
            TraderType::Fundamentalist => {
                if group.access == 0 {
                    return Err(ConfigError::ZeroAccess);
                }
                Strategy::Fundamentalist(Fundamentalist {
                    access: group.access,
                    venue: venues[0],
                })
            }
            TraderType::Chartist => Strategy::Chartist(Chartist::new(rng)),
            TraderType::Universalist => {
                if group.access == 0 {
                    return Err(ConfigError::ZeroAccess);
                }
                Strategy::Universalist(Universalist::new(group.access, venues[0], rng))
            }
            TraderType::MarketMaker => {
                let limits = match &group.softlimits {
                    Some(limits) => {
                        if limits.len() != venues.len() {
                            return Err(ConfigError::SoftLimitCountMismatch {
                                limits: limits.len(),
                                markets: venues.len(),
                            });
                        }
                        limits.clone()
                    }
                    None => vec![100; venues.len()],
                };
                Strategy::MarketMaker(MarketMaker::new(limits))
            }
        })
    }

    fn event(&self, event: &EventConfig) -> Result<Event, ConfigError> {
        let n = self.exchanges.len();
        Ok(match *event {
            EventConfig::MarketPriceShock {
                it,
                stock_id,
                price_change,
            } => {
                if stock_id >= n {
                    return Err(ConfigError::UnknownEventVenue(stock_id));
                }
                Event::new(
                    it,
                    EventKind::MarketPriceShock {
                        venue: VenueId(stock_id as u32),
                        price_change,
                    },
                )
            }
            EventConfig::StopTrading { it, exchange_id } => {
                if exchange_id >= n {
                    return Err(ConfigError::UnknownEventVenue(exchange_id));
                }
                Event::new(
                    it,
                    EventKind::StopTrading {
                        venue: VenueId(exchange_id as u32),
                    },
                )
            }
        })
    }
}
