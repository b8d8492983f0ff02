//! Simulator: drives the per-iteration loop.
//!
//! A tick is an indivisible unit and everything in it is strictly
//! serial: scheduled events fire first, then dividends are generated on
//! the venues still trading, then every agent acts once in a freshly
//! shuffled order, then sentiments and strategies are revalued, and the
//! observable state is snapshotted last. All randomness flows through
//! one seedable generator so identical seed + config + schedule replays
//! identically.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::events::Event;
use crate::info::{BookSummary, SimulationReport, SimulatorInfo, TraderMeta};
use crate::traders::{OpinionParams, Population, Sentiment, Trader, TraderKind};
use crate::{Market, Side, VenueId};

/// The single random source threaded through the whole simulation.
pub type SimRng = ChaCha8Rng;

/// Knobs of the loop outside the agent policies themselves.
#[derive(Clone, Debug)]
pub struct SimulatorSettings {
    /// Weights of the sentiment/strategy revaluation dynamics
    pub opinion: OpinionParams,
    /// Window length (in ticks) of one regime label
    pub size: usize,
    /// Recovery-analytics window, carried through for the consumers
    pub window: usize,
    /// Consecutive-stable-windows threshold, carried for the consumers
    pub stability_threshold: u32,
    /// Return volatility below which a window is stable
    pub panic_vol: f64,
    /// Return volatility above which a window is a disaster
    pub disaster_vol: f64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            opinion: OpinionParams::default(),
            size: 10,
            window: 5,
            stability_threshold: 5,
            panic_vol: 0.01,
            disaster_vol: 0.05,
        }
    }
}

/// The simulation: venues, agents, schedule, and the recorded series.
#[derive(Debug)]
pub struct Simulator {
    pub market: Market,
    pub traders: Vec<Trader>,
    pub events: Vec<Event>,
    pub settings: SimulatorSettings,
    /// One observable record per venue
    pub infos: Vec<SimulatorInfo>,
    rng: SimRng,
    it: u64,
    prev_equity: Vec<f64>,
}

impl Simulator {
    pub fn new(
        market: Market,
        traders: Vec<Trader>,
        events: Vec<Event>,
        settings: SimulatorSettings,
        rng: SimRng,
    ) -> Self {
        let infos = market
            .venues()
            .iter()
            .map(|ex| SimulatorInfo::new(ex.id))
            .collect();
        let prev_equity = traders.iter().map(|t| market.equity(t.id)).collect();
        Self {
            market,
            traders,
            events,
            settings,
            infos,
            rng,
            it: 0,
            prev_equity,
        }
    }

    /// Completed iterations.
    pub fn iteration(&self) -> u64 {
        self.it
    }

    /// Run `iterations` ticks.
    pub fn simulate(&mut self, iterations: u64) {
        for _ in 0..iterations {
            self.tick();
        }
    }

    fn tick(&mut self) {
        self.it += 1;
        let t = self.it;
        debug!(t, "tick");

        // 1. scheduled events, in insertion order
        for event in &mut self.events {
            event.fire(t, &mut self.market);
        }

        // 2. dividends on venues still trading
        for exchange in self.market.venues_mut() {
            if !exchange.trading_stopped {
                exchange.generate_dividend(&mut self.rng);
            }
        }

        // 3. every agent acts once, in random order
        let mut order: Vec<usize> = (0..self.traders.len()).collect();
        order.shuffle(&mut self.rng);
        for idx in order {
            self.traders[idx].call(&mut self.market, &mut self.rng);
        }

        // 4. opinion dynamics: the whole pass sees one census
        let pop = self.census();
        let avg_return = self
            .infos
            .first()
            .map(|info| info.mean_return_last_tick())
            .unwrap_or(0.0);
        let deltas: Vec<f64> = self.infos.iter().map(|info| info.price_delta()).collect();
        for trader in &mut self.traders {
            let dp = deltas
                .get(trader.primary_venue().index())
                .copied()
                .unwrap_or(0.0);
            trader.revalue_sentiment(
                &self.market,
                &pop,
                dp,
                &self.settings.opinion,
                &mut self.rng,
            );
            trader.revalue_strategy(
                &self.market,
                &pop,
                dp,
                avg_return,
                &self.settings.opinion,
                &mut self.rng,
            );
        }

        // 5. snapshot
        self.snapshot();

        // 6. regime label at the end of each window
        if self.settings.size > 0 && t % self.settings.size as u64 == 0 {
            for info in &mut self.infos {
                let label = info.classify_window(
                    self.settings.size,
                    self.settings.panic_vol,
                    self.settings.disaster_vol,
                );
                info.states.push(label);
            }
        }

        #[cfg(debug_assertions)]
        for exchange in self.market.venues() {
            exchange.book().validate();
        }
    }

    /// Count the population once; optimists/pessimists only among agents
    /// currently acting as chartists.
    fn census(&self) -> Population {
        let mut pop = Population {
            traders: self.traders.len(),
            ..Population::default()
        };
        for trader in &self.traders {
            match trader.kind() {
                TraderKind::Chartist => {
                    pop.chartists += 1;
                    match trader.sentiment() {
                        Some(Sentiment::Optimistic) => pop.optimists += 1,
                        Some(Sentiment::Pessimistic) => pop.pessimists += 1,
                        None => {}
                    }
                }
                TraderKind::Fundamentalist => pop.fundamentalists += 1,
                _ => {}
            }
        }
        pop
    }

    fn snapshot(&mut self) {
        let mut returns = FxHashMap::default();
        let mut kinds = FxHashMap::default();
        let mut sentiments = FxHashMap::default();
        for (idx, trader) in self.traders.iter().enumerate() {
            let equity = self.market.equity(trader.id);
            let prev = self.prev_equity[idx];
            let ret = if prev != 0.0 { (equity - prev) / prev } else { 0.0 };
            self.prev_equity[idx] = equity;
            returns.insert(trader.id, ret);
            kinds.insert(trader.id, trader.kind());
            if let Some(sentiment) = trader.sentiment() {
                sentiments.insert(trader.id, sentiment);
            }
        }

        for (info, exchange) in self.infos.iter_mut().zip(self.market.venues()) {
            match exchange.price() {
                Ok(mid) => info.prices.push(mid.to_f64()),
                // one-sided book: carry the last readable mid
                Err(_) => info.prices.push(info.prices.last().copied().unwrap_or(0.0)),
            }
            info.quotes.push(
                exchange
                    .spread()
                    .ok()
                    .map(|q| (q.bid.to_f64(), q.ask.to_f64())),
            );
            info.dividends.push(exchange.dividend());

            let (bid_orders, bid_volume) = exchange.book().side_summary(Side::Bid);
            let (ask_orders, ask_volume) = exchange.book().side_summary(Side::Ask);
            let roster = self
                .traders
                .iter()
                .filter(|tr| tr.venues.contains(&exchange.id))
                .map(|tr| tr.name())
                .collect();
            info.orders.push(BookSummary {
                bid_orders,
                ask_orders,
                bid_volume,
                ask_volume,
                traders: roster,
            });

            info.returns.push(returns.clone());
            info.kinds.push(kinds.clone());
            info.sentiments.push(sentiments.clone());
        }
    }

    /// Project one venue's record into the consumer-facing layout.
    pub fn report(&self, venue: VenueId) -> SimulationReport {
        let info = &self.infos[venue.index()];
        let available_traders = self
            .traders
            .iter()
            .map(|tr| {
                (
                    tr.id.0.to_string(),
                    TraderMeta {
                        name: tr.name(),
                        kind: tr.kind().to_string(),
                    },
                )
            })
            .collect();
        SimulationReport {
            prices: info.prices.clone(),
            dividends: info.dividends.clone(),
            returns: info
                .returns
                .iter()
                .map(|map| {
                    map.iter()
                        .map(|(id, r)| (id.0.to_string(), *r))
                        .collect::<BTreeMap<String, f64>>()
                })
                .collect(),
            orders: info.orders.clone(),
            states: info.states.iter().map(|s| s.to_string()).collect(),
            available_traders,
            events: self.events.iter().map(|e| e.record()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::traders::{
        Chartist, Fundamentalist, MarketMaker, RandomTrader, Sentiment, Strategy,
    };
    use crate::{Exchange, Ledger};
    use rand::SeedableRng;

    fn build_sim(seed: u64, n_random: usize, events: Vec<Event>) -> Simulator {
        let mut rng = SimRng::seed_from_u64(seed);
        let a = Exchange::new(VenueId(0), 100.0, 25.0, 1000, 5e-4, 0.0, &mut rng);
        let b = Exchange::new(VenueId(1), 100.0, 25.0, 1000, 5e-4, 0.0, &mut rng);
        let mut ledger = Ledger::new();
        let mut traders = Vec::new();
        for _ in 0..n_random {
            let id = ledger.register(1000.0, [(VenueId(0), 0), (VenueId(1), 0)]);
            traders.push(Trader::new(
                id,
                vec![VenueId(0), VenueId(1)],
                Strategy::Random(RandomTrader),
            ));
        }
        let market = Market::new(vec![a, b], ledger);
        Simulator::new(market, traders, events, SimulatorSettings::default(), rng)
    }

    #[test]
    fn series_grow_one_entry_per_tick() {
        let mut sim = build_sim(1, 10, Vec::new());
        sim.simulate(25);

        assert_eq!(sim.iteration(), 25);
        for info in &sim.infos {
            assert_eq!(info.ticks(), 25);
            assert_eq!(info.dividends.len(), 25);
            assert_eq!(info.returns.len(), 25);
            assert_eq!(info.kinds.len(), 25);
            assert_eq!(info.orders.len(), 25);
            assert_eq!(info.quotes.len(), 25);
            // both sides of a seeded book stay readable
            let (bid, ask) = info.quotes.last().unwrap().unwrap();
            assert!(bid < ask);
            // one regime label per completed 10-tick window
            assert_eq!(info.states.len(), 2);
        }
    }

    #[test]
    fn same_seed_same_series() {
        let mut a = build_sim(7, 10, Vec::new());
        let mut b = build_sim(7, 10, Vec::new());
        a.simulate(30);
        b.simulate(30);

        assert_eq!(a.infos[0].prices, b.infos[0].prices);
        assert_eq!(a.infos[1].prices, b.infos[1].prices);
        assert_eq!(a.infos[0].dividends, b.infos[0].dividends);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = build_sim(7, 10, Vec::new());
        let mut b = build_sim(8, 10, Vec::new());
        a.simulate(30);
        b.simulate(30);
        assert_ne!(a.infos[0].dividends, b.infos[0].dividends);
    }

    #[test]
    fn halt_isolates_one_venue() {
        // StopTrading on venue 0 at t=5, back on at t=15 via venue 1 halt
        let events = vec![
            Event::new(5, EventKind::StopTrading { venue: VenueId(0) }),
            Event::new(15, EventKind::StopTrading { venue: VenueId(1) }),
        ];
        let mut sim = build_sim(3, 10, events);

        sim.simulate(4);
        let div_before = *sim.infos[0].dividends.last().unwrap();

        sim.simulate(10);
        // no dividend generation while halted: the series is flat
        for t in 5..=14 {
            assert_eq!(sim.infos[0].dividends[t - 1], div_before);
        }
        assert!(sim.market.venue(VenueId(0)).trading_stopped);
        assert!(!sim.market.venue(VenueId(1)).trading_stopped);
        // the halted venue's book is still readable
        assert!(sim.market.venue(VenueId(0)).spread().is_ok());

        sim.simulate(10);
        assert!(!sim.market.venue(VenueId(0)).trading_stopped);
        assert!(sim.market.venue(VenueId(1)).trading_stopped);
        // dividends flow again on venue 0
        let resumed = sim.infos[0].dividends.len();
        assert_ne!(
            sim.infos[0].dividends[resumed - 1],
            sim.infos[0].dividends[14 - 1]
        );
    }

    #[test]
    fn open_order_handles_match_the_books() {
        let mut sim = build_sim(11, 20, Vec::new());
        sim.simulate(50);

        for trader in &sim.traders {
            for handle in sim.market.portfolio(trader.id).open_orders() {
                let order = sim
                    .market
                    .venue(handle.venue)
                    .book()
                    .get(handle.order)
                    .expect("every handle points at a resting order");
                assert_eq!(order.owner, Some(trader.id));
                assert!(order.qty > 0);
            }
        }
        // and the other direction: every owned resting order is handled
        for exchange in sim.market.venues() {
            for side in [Side::Bid, Side::Ask] {
                for (_, id) in exchange.book().side(side).iter_best_to_worst() {
                    let order = exchange.book().get(id).unwrap();
                    if let Some(owner) = order.owner {
                        assert!(
                            sim.market
                                .portfolio(owner)
                                .open_orders()
                                .iter()
                                .any(|h| h.order == id && h.venue == exchange.id),
                            "resting order {id} not tracked by its owner"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn mixed_population_runs_clean() {
        let mut rng = SimRng::seed_from_u64(23);
        let a = Exchange::new(VenueId(0), 100.0, 25.0, 2000, 5e-4, 0.0, &mut rng);
        let b = Exchange::new(VenueId(1), 100.0, 25.0, 2000, 5e-4, 0.0, &mut rng);
        let mut ledger = Ledger::new();
        let mut traders = Vec::new();
        let both = vec![VenueId(0), VenueId(1)];
        for i in 0..40 {
            let id = ledger.register(1000.0, [(VenueId(0), 5), (VenueId(1), 5)]);
            let strategy = match i % 4 {
                0 => Strategy::Random(RandomTrader),
                1 => Strategy::Fundamentalist(Fundamentalist {
                    access: 3,
                    venue: VenueId(0),
                }),
                2 => Strategy::Chartist(Chartist::new(&mut rng)),
                _ => Strategy::MarketMaker(MarketMaker::new(vec![100, 100])),
            };
            traders.push(Trader::new(id, both.clone(), strategy));
        }
        let market = Market::new(vec![a, b], ledger);
        let mut sim = Simulator::new(
            market,
            traders,
            Vec::new(),
            SimulatorSettings::default(),
            rng,
        );

        sim.simulate(60);

        for exchange in sim.market.venues() {
            exchange.book().validate();
        }
        assert_eq!(sim.infos[0].ticks(), 60);
        // someone holds a sentiment, everyone has a kind
        assert!(!sim.infos[0].sentiments.last().unwrap().is_empty());
        assert_eq!(sim.infos[0].kinds.last().unwrap().len(), 40);
    }

    #[test]
    fn sentiments_track_the_chartist_population() {
        let mut sim = build_sim(2, 5, Vec::new());
        let id = sim.market.ledger.register(1000.0, [(VenueId(0), 0)]);
        sim.traders.push(Trader::new(
            id,
            vec![VenueId(0)],
            Strategy::Chartist(Chartist {
                sentiment: Sentiment::Optimistic,
            }),
        ));
        sim.prev_equity.push(sim.market.equity(id));

        sim.simulate(20);
        // only the chartist carries a sentiment; the randoms do not
        let last = sim.infos[0].sentiments.last().unwrap();
        assert_eq!(last.len(), 1);
        assert!(last.contains_key(&id));
    }

    #[test]
    fn report_layout_matches_consumers() {
        let mut sim = build_sim(
            5,
            8,
            vec![Event::new(
                10,
                EventKind::MarketPriceShock {
                    venue: VenueId(0),
                    price_change: -20.0,
                },
            )],
        );
        sim.simulate(20);

        let report = sim.report(VenueId(0));
        assert_eq!(report.prices.len(), 20);
        assert_eq!(report.returns.len(), 20);
        assert_eq!(report.available_traders.len(), 8);
        assert_eq!(report.events.len(), 1);
        assert!(report.events[0].fired);

        let json = serde_json::to_value(&report).unwrap();
        for key in [
            "prices",
            "dividends",
            "returns",
            "orders",
            "states",
            "available_traders",
            "events",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["events"][0]["type"], "MarketPriceShock");
    }

    #[test]
    fn fundamentalists_pull_price_toward_value() {
        // the dividend stream prices the stock near 100; dislocate the
        // book 50 below and let fundamentalists buy the gap back
        let mut rng = SimRng::seed_from_u64(31);
        let exchange = Exchange::new(VenueId(0), 100.0, 25.0, 2000, 5e-4, 0.0, &mut rng);
        let mut ledger = Ledger::new();
        let mut traders = Vec::new();
        for _ in 0..10 {
            let id = ledger.register(1e9, [(VenueId(0), 0)]);
            traders.push(Trader::new(
                id,
                vec![VenueId(0)],
                Strategy::Fundamentalist(Fundamentalist {
                    access: 5,
                    venue: VenueId(0),
                }),
            ));
        }
        let mut market = Market::new(vec![exchange], ledger);
        market.apply_price_shock(VenueId(0), crate::Price::from_f64(-50.0));
        let start = market.venue(VenueId(0)).price().unwrap().to_f64();

        let mut sim = Simulator::new(
            market,
            traders,
            Vec::new(),
            SimulatorSettings::default(),
            rng,
        );
        sim.simulate(400);

        let end = *sim.infos[0].prices.last().unwrap();
        assert!(
            end > start + 10.0,
            "mid should climb toward the fundamental value, start {start}, end {end}"
        );
    }

    #[test]
    fn price_shock_shows_up_in_the_series() {
        let events = vec![Event::new(
            10,
            EventKind::MarketPriceShock {
                venue: VenueId(0),
                price_change: -50.0,
            },
        )];
        let mut sim = build_sim(13, 10, events);
        sim.simulate(20);

        let prices = &sim.infos[0].prices;
        // the mid drops by roughly the shock between t=9 and t=10
        let drop = prices[8] - prices[10];
        assert!(drop > 30.0, "expected a sharp drop, got {drop}");
    }
}
