//! # agentbook
//!
//! An agent-based simulator of a multi-venue equity market: a fixed
//! population of heterogeneous trading agents interacts through one or
//! more continuous limit-order-book exchanges over a discrete sequence
//! of iterations.
//!
//! ## What's inside
//!
//! - **Matching engine**: price-time-priority books with limit, market
//!   and cancel semantics, partial fills, maker pricing, and immediate
//!   cash/asset settlement with a proportional transaction cost
//! - **Venues**: each [`Exchange`] owns a book, a 100-entry dividend
//!   stream, a risk-free rate and a trading-halt flag
//! - **Agents**: Random, Fundamentalist, Chartist (with sentiment
//!   dynamics), Universalist (strategy switching) and MarketMaker
//!   (inventory-balanced two-sided quoting)
//! - **Events**: scheduled perturbations — market price shocks and
//!   trading halts
//! - **Observables**: per-iteration series of prices, spreads,
//!   dividends, agent returns, order-book summaries and regime labels
//!
//! ## Quick start
//!
//! ```
//! use agentbook::sim::SimRng;
//! use agentbook::{Exchange, Ledger, Side, VenueId};
//! use rand::SeedableRng;
//!
//! let mut rng = SimRng::seed_from_u64(42);
//! let mut exchange = Exchange::new(VenueId(0), 100.0, 25.0, 1000, 5e-4, 0.0, &mut rng);
//! let mut ledger = Ledger::new();
//! let trader = ledger.register(10_000.0, []);
//!
//! // lift the best ask with a market order
//! let unfilled = exchange
//!     .market_order(Some(trader), Side::Bid, 3, &mut ledger)
//!     .unwrap();
//! assert_eq!(unfilled, 0);
//! assert_eq!(ledger.portfolio(trader).holding(VenueId(0)), 3);
//! ```
//!
//! ## Running a simulation
//!
//! A whole run is described by a [`config::SimConfig`] record (the file
//! parsing lives with the caller) and driven by [`sim::Simulator`]:
//!
//! ```
//! use agentbook::config::SimConfig;
//!
//! let config: SimConfig = serde_json::from_str(
//!     r#"{
//!         "exchanges": [{"volume": 1000}],
//!         "traders": [
//!             {"type": "Random", "count": 10, "cash": 1000, "markets": [0]},
//!             {"type": "Fundamentalist", "count": 5, "markets": [0], "access": 3}
//!         ],
//!         "iterations": 100
//!     }"#,
//! )
//! .unwrap();
//!
//! let mut sim = config.build(7).unwrap();
//! sim.simulate(config.iterations);
//!
//! assert_eq!(sim.infos[0].prices.len(), 100);
//! let report = sim.report(agentbook::VenueId(0));
//! assert_eq!(report.prices.len(), 100);
//! ```
//!
//! ## Determinism
//!
//! The simulation is strictly serial: one tick fires events, pays
//! dividends, activates every agent in a shuffled order and snapshots
//! the state, in that order, with every random draw flowing through a
//! single seedable generator. The same seed, agent population and event
//! schedule reproduce a run bit-for-bit.

mod book;
mod error;
mod exchange;
mod ledger;
mod market;
mod order;
mod order_list;
mod side;
mod trade;
mod types;

pub mod config;
pub mod events;
pub mod info;
pub mod sim;
pub mod traders;

// Re-export public API
pub use book::OrderBook;
pub use error::MarketError;
pub use exchange::{DIVIDEND_HORIZON, Exchange, Quote};
pub use ledger::{Ledger, OrderRef, Portfolio};
pub use market::Market;
pub use order::Order;
pub use order_list::OrderList;
pub use side::Side;
pub use trade::Trade;
pub use traders::{Strategy, Trader};
pub use types::{AgentId, OrderId, Price, Quantity, Timestamp, VenueId};
