//! Service statistics module for the brigade kitchen engine.
//!
//! Tracks serve rates, mistake rates, station utilization, and per-recipe
//! order outcomes over configurable time windows. Listens to core events
//! (`OrderEntered`, `OrderCompleted`, `OrderExpired`, `BundleServed`,
//! `MistakeRecorded`, `BundleDiscarded`, `StationBurned`) and aggregates
//! them into rolling metrics using [`Fixed64`] arithmetic.
//!
//! # Usage
//!
//! ```ignore
//! let mut stats = ServiceStats::new(StatsConfig::default());
//! // Feed events each tick:
//! stats.process_event(&event);
//! // Advance the tick counter with an occupancy sample:
//! stats.end_tick(kitchen.clock(), &kitchen.occupancy());
//! // Query metrics:
//! let rate = stats.get_serve_rate();
//! ```

use std::collections::HashMap;

use brigade_core::event::{DiscardReason, KitchenEvent};
use brigade_core::fixed::{Fixed64, Ticks};
use brigade_core::id::{OrderId, RecipeId};
use brigade_core::instance::StationRef;
use brigade_core::query::Occupancy;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the statistics module.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Window size in ticks for rolling averages (e.g., 60 ticks).
    pub window_size: Ticks,
    /// Maximum number of historical samples to retain per metric.
    pub history_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer — trend history buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity buffer of [`Fixed64`] samples for trend queries.
///
/// Overwrites the oldest sample once full. Iteration runs oldest to newest.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<Fixed64>,
    /// Next write position.
    write: usize,
    /// Live samples stored, capped at capacity.
    filled: usize,
}

impl RingBuffer {
    /// Create a buffer holding up to `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            slots: vec![Fixed64::ZERO; capacity],
            write: 0,
            filled: 0,
        }
    }

    /// Append a sample, evicting the oldest if the buffer is full.
    pub fn push(&mut self, value: Fixed64) {
        self.slots[self.write] = value;
        self.write = (self.write + 1) % self.slots.len();
        if self.filled < self.slots.len() {
            self.filled += 1;
        }
    }

    /// Number of samples currently stored.
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Total capacity.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Most recently pushed sample, if any.
    pub fn latest(&self) -> Option<Fixed64> {
        if self.filled == 0 {
            return None;
        }
        let last = (self.write + self.slots.len() - 1) % self.slots.len();
        Some(self.slots[last])
    }

    /// Iterate samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Fixed64> + '_ {
        // Before wrapping, samples live in slots[..filled]; after, the
        // oldest sample sits at the write position.
        let (older, newer) = if self.filled < self.slots.len() {
            (&self.slots[..self.filled], &self.slots[..0])
        } else {
            (&self.slots[self.write..], &self.slots[..self.write])
        };
        older.iter().copied().chain(newer.iter().copied())
    }

    /// Collect all stored samples into a Vec (oldest to newest).
    pub fn to_vec(&self) -> Vec<Fixed64> {
        self.iter().collect()
    }

    /// Drop all samples without changing capacity.
    pub fn clear(&mut self) {
        self.slots.fill(Fixed64::ZERO);
        self.write = 0;
        self.filled = 0;
    }
}

// ---------------------------------------------------------------------------
// Rolling window counter
// ---------------------------------------------------------------------------

/// A per-tick counter averaged over the most recent N ticks.
///
/// Counts accumulate into `pending` during a tick and move into the ring of
/// committed ticks on [`commit`](Self::commit). [`total`](Self::total) and
/// [`rate`](Self::rate) include both, so queries stay accurate mid-tick.
///
/// # Tick lifecycle
///
/// 1. Call [`add`](Self::add) zero or more times during the tick.
/// 2. Call [`commit`](Self::commit) exactly once at end-of-tick to write the
///    pending count into the ring and prepare for the next tick.
#[derive(Debug, Clone)]
struct RollingWindow {
    /// Committed per-tick counts.
    counts: Vec<u64>,
    /// Write position for the next commit.
    cursor: usize,
    /// Sum of committed counts currently in the ring.
    committed: u64,
    /// Accumulator for the in-progress tick.
    pending: u64,
    /// Committed ticks stored, capped at the window size.
    filled: usize,
}

impl RollingWindow {
    fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "RollingWindow size must be > 0");
        Self {
            counts: vec![0; window_size],
            cursor: 0,
            committed: 0,
            pending: 0,
            filled: 0,
        }
    }

    /// Accumulate a count for the in-progress tick.
    fn add(&mut self, count: u64) {
        self.pending += count;
    }

    /// Close out the in-progress tick, evicting the oldest when full.
    fn commit(&mut self) {
        if self.filled == self.counts.len() {
            self.committed -= self.counts[self.cursor];
        }
        self.counts[self.cursor] = self.pending;
        self.committed += self.pending;
        self.pending = 0;
        self.cursor = (self.cursor + 1) % self.counts.len();
        if self.filled < self.counts.len() {
            self.filled += 1;
        }
    }

    /// Window total, committed ticks plus the in-progress tick.
    fn total(&self) -> u64 {
        self.committed + self.pending
    }

    /// Rolling average per tick, dividing by the ticks that contributed.
    fn rate(&self) -> Fixed64 {
        let ticks = if self.pending > 0 {
            self.filled + 1
        } else {
            self.filled
        };
        if ticks == 0 {
            return Fixed64::ZERO;
        }
        Fixed64::from_num(self.total()) / Fixed64::from_num(ticks)
    }
}

// ---------------------------------------------------------------------------
// Station usage
// ---------------------------------------------------------------------------

/// Rolling busy-tick accounting for a bank of identical stations.
///
/// Fed one occupancy sample per tick. Utilization is busy station-ticks over
/// available station-ticks, so a four-burner range with two assigned burners
/// reads 0.5 regardless of window size.
#[derive(Debug, Clone)]
struct StationUse {
    /// Station-ticks spent occupied, within the window.
    busy_ticks: RollingWindow,
    /// Station-ticks available, within the window.
    capacity_ticks: RollingWindow,
    /// Historical utilization snapshots.
    history: RingBuffer,
}

impl StationUse {
    fn new(window_size: usize, history_capacity: usize) -> Self {
        Self {
            busy_ticks: RollingWindow::new(window_size),
            capacity_ticks: RollingWindow::new(window_size),
            history: RingBuffer::new(history_capacity),
        }
    }

    /// End-of-tick accounting from an occupancy sample.
    fn end_tick(&mut self, busy: u64, capacity: u64) {
        // Record this tick's sample.
        self.busy_ticks.add(busy);
        self.capacity_ticks.add(capacity);

        // Snapshot utilization, then advance windows.
        self.history.push(self.utilization());
        self.busy_ticks.commit();
        self.capacity_ticks.commit();
    }

    /// Utilization: busy station-ticks / available station-ticks (0.0 to 1.0).
    fn utilization(&self) -> Fixed64 {
        let capacity = self.capacity_ticks.total();
        if capacity == 0 {
            return Fixed64::ZERO;
        }
        Fixed64::from_num(self.busy_ticks.total()) / Fixed64::from_num(capacity)
    }
}

// ---------------------------------------------------------------------------
// Microwave queue usage
// ---------------------------------------------------------------------------

/// Rolling queue-depth accounting for the microwave line.
#[derive(Debug, Clone)]
struct QueueUse {
    /// Queue depth samples, one per tick, within the window.
    depth_ticks: RollingWindow,
    /// Historical average-depth snapshots.
    history: RingBuffer,
}

impl QueueUse {
    fn new(window_size: usize, history_capacity: usize) -> Self {
        Self {
            depth_ticks: RollingWindow::new(window_size),
            history: RingBuffer::new(history_capacity),
        }
    }

    /// End-of-tick accounting from an occupancy sample.
    fn end_tick(&mut self, depth: u64) {
        self.depth_ticks.add(depth);
        self.history.push(self.average_depth());
        self.depth_ticks.commit();
    }

    /// Mean queued instances per tick over the window.
    fn average_depth(&self) -> Fixed64 {
        self.depth_ticks.rate()
    }
}

// ---------------------------------------------------------------------------
// Per-recipe statistics
// ---------------------------------------------------------------------------

/// Per-recipe order outcomes.
#[derive(Debug, Clone)]
struct RecipeStats {
    /// Rolling count of completed orders.
    completions: RollingWindow,
    /// Ticks from entry to completion, one sample per completed order.
    latency_history: RingBuffer,
    /// Lifetime completed order count.
    completed: u64,
    /// Lifetime expired order count.
    expired: u64,
}

impl RecipeStats {
    fn new(window_size: usize, history_capacity: usize) -> Self {
        Self {
            completions: RollingWindow::new(window_size),
            latency_history: RingBuffer::new(history_capacity),
            completed: 0,
            expired: 0,
        }
    }
}

/// An order that has entered the board and not yet resolved.
#[derive(Debug, Clone, Copy)]
struct OpenOrder {
    recipe: RecipeId,
    entered: Ticks,
}

// ---------------------------------------------------------------------------
// ServiceStats — main module struct
// ---------------------------------------------------------------------------

/// Main service statistics aggregator.
///
/// Accepts events via [`process_event`](ServiceStats::process_event), advances
/// time via [`end_tick`](ServiceStats::end_tick), and exposes serve, station,
/// and per-recipe metrics through getter methods.
///
/// All rate values use [`Fixed64`] arithmetic for determinism.
#[derive(Debug)]
pub struct ServiceStats {
    config: StatsConfig,
    /// Rolling count of served bundles.
    served: RollingWindow,
    /// Lifetime served bundle count.
    served_total: u64,
    /// Rolling count of recorded mistakes.
    mistakes: RollingWindow,
    /// Lifetime recorded mistake count.
    mistakes_total: u64,
    /// Burner bank usage.
    woks: StationUse,
    /// Fryer basket bank usage.
    fryers: StationUse,
    /// Microwave queue depth.
    microwave: QueueUse,
    /// Order outcomes keyed by recipe.
    recipes: HashMap<RecipeId, RecipeStats>,
    /// Orders on the board awaiting completion or expiry.
    open_orders: HashMap<OrderId, OpenOrder>,
    /// Lifetime burner burn-outs.
    wok_burns: u64,
    /// Lifetime basket burn-outs.
    fryer_burns: u64,
    discards_manual: u64,
    discards_burned: u64,
    discards_expired: u64,
    discards_departed: u64,
    /// Current tick (set by end_tick).
    current_tick: Ticks,
}

impl ServiceStats {
    /// Create a new service stats tracker with the given configuration.
    pub fn new(config: StatsConfig) -> Self {
        let ws = config.window_size as usize;
        let hc = config.history_capacity;
        Self {
            config,
            served: RollingWindow::new(ws),
            served_total: 0,
            mistakes: RollingWindow::new(ws),
            mistakes_total: 0,
            woks: StationUse::new(ws, hc),
            fryers: StationUse::new(ws, hc),
            microwave: QueueUse::new(ws, hc),
            recipes: HashMap::new(),
            open_orders: HashMap::new(),
            wok_burns: 0,
            fryer_burns: 0,
            discards_manual: 0,
            discards_burned: 0,
            discards_expired: 0,
            discards_departed: 0,
            current_tick: 0,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Get the current tick.
    pub fn current_tick(&self) -> Ticks {
        self.current_tick
    }

    // -- Event processing ---------------------------------------------------

    /// Process a single event, updating internal counters.
    ///
    /// Call this for each event in a tick, then call [`end_tick`](Self::end_tick)
    /// to finalize the tick and advance rolling windows.
    pub fn process_event(&mut self, event: &KitchenEvent) {
        match event {
            KitchenEvent::OrderEntered {
                order,
                recipe,
                tick,
            } => {
                self.recipe_entry(*recipe);
                self.open_orders.insert(
                    *order,
                    OpenOrder {
                        recipe: *recipe,
                        entered: *tick,
                    },
                );
            }

            KitchenEvent::OrderCompleted { order, tick } => {
                if let Some(open) = self.open_orders.remove(order) {
                    let waited = tick.saturating_sub(open.entered);
                    let entry = self.recipe_entry(open.recipe);
                    entry.completed += 1;
                    entry.completions.add(1);
                    entry.latency_history.push(Fixed64::from_num(waited));
                }
            }

            KitchenEvent::OrderExpired { order, .. } => {
                if let Some(open) = self.open_orders.remove(order) {
                    self.recipe_entry(open.recipe).expired += 1;
                }
            }

            KitchenEvent::BundleServed { .. } => {
                self.served.add(1);
                self.served_total += 1;
            }

            KitchenEvent::MistakeRecorded { .. } => {
                self.mistakes.add(1);
                self.mistakes_total += 1;
            }

            KitchenEvent::BundleDiscarded { reason, .. } => match reason {
                DiscardReason::Manual => self.discards_manual += 1,
                DiscardReason::StationBurned => self.discards_burned += 1,
                DiscardReason::OrderExpired => self.discards_expired += 1,
                DiscardReason::OrderDeparted => self.discards_departed += 1,
            },

            KitchenEvent::StationBurned { station, .. } => match station {
                StationRef::Wok(_) => self.wok_burns += 1,
                StationRef::Fryer(_) => self.fryer_burns += 1,
                StationRef::Microwave => {}
            },

            // Other events are not tracked by the stats module.
            _ => {}
        }
    }

    /// Finalize the current tick and advance all rolling windows.
    ///
    /// Must be called once per tick, after all events have been processed,
    /// with an occupancy sample taken at the same tick.
    pub fn end_tick(&mut self, tick: Ticks, occupancy: &Occupancy) {
        self.current_tick = tick;

        self.woks.end_tick(
            occupancy.burners_busy as u64,
            occupancy.burners_total as u64,
        );
        self.fryers.end_tick(
            occupancy.baskets_busy as u64,
            occupancy.baskets_total as u64,
        );
        self.microwave.end_tick(occupancy.microwave_depth as u64);

        self.served.commit();
        self.mistakes.commit();
        for recipe in self.recipes.values_mut() {
            recipe.completions.commit();
        }
    }

    // -- Service queries ----------------------------------------------------

    /// Get the serve rate (bundles/tick) over the configured window.
    pub fn get_serve_rate(&self) -> Fixed64 {
        self.served.rate()
    }

    /// Lifetime count of served bundles.
    pub fn total_served(&self) -> u64 {
        self.served_total
    }

    /// Get the mistake rate (mistakes/tick) over the configured window.
    pub fn get_mistake_rate(&self) -> Fixed64 {
        self.mistakes.rate()
    }

    /// Lifetime count of recorded mistakes.
    pub fn total_mistakes(&self) -> u64 {
        self.mistakes_total
    }

    // -- Station queries ----------------------------------------------------

    /// Get the burner utilization ratio (0.0 to 1.0) over the window.
    pub fn get_wok_utilization(&self) -> Fixed64 {
        self.woks.utilization()
    }

    /// Get the fryer basket utilization ratio (0.0 to 1.0) over the window.
    pub fn get_fryer_utilization(&self) -> Fixed64 {
        self.fryers.utilization()
    }

    /// Get the mean microwave queue depth over the window.
    pub fn get_microwave_depth(&self) -> Fixed64 {
        self.microwave.average_depth()
    }

    /// Lifetime count of burner burn-outs.
    pub fn wok_burn_count(&self) -> u64 {
        self.wok_burns
    }

    /// Lifetime count of fryer basket burn-outs.
    pub fn fryer_burn_count(&self) -> u64 {
        self.fryer_burns
    }

    // -- Per-recipe queries -------------------------------------------------

    /// Get the completion rate (orders/tick) for a recipe over the window.
    pub fn get_completion_rate(&self, recipe: RecipeId) -> Fixed64 {
        self.recipes
            .get(&recipe)
            .map(|r| r.completions.rate())
            .unwrap_or(Fixed64::ZERO)
    }

    /// Get the mean ticks from order entry to completion for a recipe.
    ///
    /// Averages over the retained latency samples (most recent first out).
    pub fn get_average_latency(&self, recipe: RecipeId) -> Fixed64 {
        let Some(stats) = self.recipes.get(&recipe) else {
            return Fixed64::ZERO;
        };
        if stats.latency_history.is_empty() {
            return Fixed64::ZERO;
        }
        let sum = stats
            .latency_history
            .iter()
            .fold(Fixed64::ZERO, |acc, v| acc + v);
        sum / Fixed64::from_num(stats.latency_history.len())
    }

    /// Lifetime count of completed orders for a recipe.
    pub fn completed_orders(&self, recipe: RecipeId) -> u64 {
        self.recipes.get(&recipe).map(|r| r.completed).unwrap_or(0)
    }

    /// Lifetime count of expired orders for a recipe.
    pub fn expired_orders(&self, recipe: RecipeId) -> u64 {
        self.recipes.get(&recipe).map(|r| r.expired).unwrap_or(0)
    }

    // -- Order board and discards -------------------------------------------

    /// Orders currently on the board (entered, not yet completed or expired).
    pub fn open_order_count(&self) -> usize {
        self.open_orders.len()
    }

    /// Lifetime count of bundles discarded for the given reason.
    pub fn discarded(&self, reason: DiscardReason) -> u64 {
        match reason {
            DiscardReason::Manual => self.discards_manual,
            DiscardReason::StationBurned => self.discards_burned,
            DiscardReason::OrderExpired => self.discards_expired,
            DiscardReason::OrderDeparted => self.discards_departed,
        }
    }

    /// Lifetime count of discarded bundles across all reasons.
    pub fn total_discarded(&self) -> u64 {
        self.discards_manual
            + self.discards_burned
            + self.discards_expired
            + self.discards_departed
    }

    // -- Historical data ----------------------------------------------------

    /// Get historical burner utilization snapshots, oldest to newest.
    pub fn get_wok_history(&self) -> Vec<Fixed64> {
        self.woks.history.to_vec()
    }

    /// Get historical fryer utilization snapshots, oldest to newest.
    pub fn get_fryer_history(&self) -> Vec<Fixed64> {
        self.fryers.history.to_vec()
    }

    /// Get historical microwave average-depth snapshots, oldest to newest.
    pub fn get_microwave_history(&self) -> Vec<Fixed64> {
        self.microwave.history.to_vec()
    }

    /// Get retained completion latency samples for a recipe, oldest to newest.
    pub fn get_latency_history(&self, recipe: RecipeId) -> Vec<Fixed64> {
        self.recipes
            .get(&recipe)
            .map(|r| r.latency_history.to_vec())
            .unwrap_or_default()
    }

    // -- Utility ------------------------------------------------------------

    /// Clear all statistics, resetting to a fresh state.
    pub fn clear(&mut self) {
        let fresh = ServiceStats::new(self.config.clone());
        *self = fresh;
    }

    /// Number of recipes with tracked outcomes.
    pub fn tracked_recipe_count(&self) -> usize {
        self.recipes.len()
    }

    // -- Internal helpers ---------------------------------------------------

    fn recipe_entry(&mut self, recipe: RecipeId) -> &mut RecipeStats {
        let ws = self.config.window_size as usize;
        let hc = self.config.history_capacity;
        self.recipes
            .entry(recipe)
            .or_insert_with(|| RecipeStats::new(ws, hc))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
