//! Scheduled perturbations applied to the market at fixed iterations.

use serde::Serialize;
use tracing::info;

use crate::{Market, Price, VenueId};

/// What a scheduled event does when it fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EventKind {
    /// Add a signed change to every resting price on both sides of the
    /// venue's book. The book is uncrossed before the next agent acts.
    MarketPriceShock { venue: VenueId, price_change: f64 },
    /// Halt the target venue and resume every other venue.
    StopTrading { venue: VenueId },
}

/// A perturbation scheduled for one iteration.
#[derive(Clone, Debug)]
pub struct Event {
    /// Iteration this event fires at
    pub it: u64,
    pub kind: EventKind,
    fired: bool,
}

impl Event {
    pub fn new(it: u64, kind: EventKind) -> Self {
        Self {
            it,
            kind,
            fired: false,
        }
    }

    /// Whether the event has been dispatched.
    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Apply the event if `it` is its scheduled iteration.
    /// Returns true when it fired.
    pub fn fire(&mut self, it: u64, market: &mut Market) -> bool {
        if it != self.it {
            return false;
        }
        match self.kind {
            EventKind::MarketPriceShock {
                venue,
                price_change,
            } => {
                info!(%venue, price_change, it, "market price shock");
                market.apply_price_shock(venue, Price::from_f64(price_change));
            }
            EventKind::StopTrading { venue } => {
                info!(%venue, it, "stop trading");
                for (i, exchange) in market.venues_mut().iter_mut().enumerate() {
                    exchange.trading_stopped = i == venue.index();
                }
            }
        }
        self.fired = true;
        true
    }

    /// Projection for external consumers.
    pub fn record(&self) -> EventRecord {
        match self.kind {
            EventKind::MarketPriceShock {
                venue,
                price_change,
            } => EventRecord {
                kind: "MarketPriceShock",
                it: self.it,
                venue: venue.0,
                price_change: Some(price_change),
                fired: self.fired,
            },
            EventKind::StopTrading { venue } => EventRecord {
                kind: "StopTrading",
                it: self.it,
                venue: venue.0,
                price_change: None,
                fired: self.fired,
            },
        }
    }
}

/// Serializable echo of a scheduled event.
#[derive(Clone, Debug, Serialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub it: u64,
    pub venue: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change: Option<f64>,
    pub fired: bool,
}
