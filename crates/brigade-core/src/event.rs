//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted while commands execute and while the tick phases run,
//! then delivered in batch: once at the end of each command and once at the
//! end of each tick. Each event kind has its own [`EventBuffer`] ring with a
//! configurable capacity.
//!
//! Listeners are passive only (UI, audio, analytics). Anything that needs to
//! change kitchen state goes through a command, not through an event handler.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind. Suppressed events are free.

use crate::catalog::ActionType;
use crate::fixed::Ticks;
use crate::id::*;
use crate::instance::StationRef;
use crate::plating::PlateKind;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why an instance left the kitchen without being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Player threw it away.
    Manual,
    /// Its station burned out from under it.
    StationBurned,
    /// Its order hit the hard timeout.
    OrderExpired,
    /// Its order departed the board with the instance still unfinished.
    OrderDeparted,
}

/// A kitchen event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KitchenEvent {
    // -- Order board --
    OrderEntered {
        order: OrderId,
        recipe: RecipeId,
        tick: Ticks,
    },
    OrderStarted {
        order: OrderId,
        tick: Ticks,
    },
    OrderCompleted {
        order: OrderId,
        tick: Ticks,
    },
    OrderExpired {
        order: OrderId,
        tick: Ticks,
    },
    OrderDeparted {
        order: OrderId,
        tick: Ticks,
    },

    // -- Bundle lifecycle --
    BundleAssigned {
        instance: InstanceId,
        order: OrderId,
        bundle: BundleId,
        station: StationRef,
        tick: Ticks,
    },
    IngredientAdded {
        instance: InstanceId,
        requirement: RequirementId,
        amount: u32,
        satisfied: bool,
        tick: Ticks,
    },
    StepAdvanced {
        instance: InstanceId,
        /// New current step index after the advance.
        step_index: usize,
        tick: Ticks,
    },
    ActionPerformed {
        instance: InstanceId,
        action: ActionType,
        /// Timer-driven (deep-fry) rather than player-driven.
        auto: bool,
        tick: Ticks,
    },
    BundleCompleted {
        instance: InstanceId,
        tick: Ticks,
    },
    BundlePlated {
        instance: InstanceId,
        plate: PlateKind,
        tick: Ticks,
    },
    DecoApplied {
        instance: InstanceId,
        rule: DecoRuleId,
        position: GridPos,
        amount: u32,
        tick: Ticks,
    },
    BundleMerged {
        source: InstanceId,
        target: InstanceId,
        amount: u32,
        /// The source gave up its last portion and is now absorbed.
        exhausted: bool,
        tick: Ticks,
    },
    BundleServed {
        instance: InstanceId,
        order: OrderId,
        deco_complete: bool,
        tick: Ticks,
    },
    BundleDiscarded {
        instance: InstanceId,
        order: OrderId,
        reason: DiscardReason,
        tick: Ticks,
    },

    // -- Stations --
    StationBurned {
        station: StationRef,
        instance: Option<InstanceId>,
        tick: Ticks,
    },
    WaterBoiled {
        burner: BurnerId,
        tick: Ticks,
    },
    MistakeRecorded {
        instance: InstanceId,
        /// Running mistake total on the instance.
        total: u32,
        tick: Ticks,
    },
}

/// Discriminant tag for event kinds, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OrderEntered,
    OrderStarted,
    OrderCompleted,
    OrderExpired,
    OrderDeparted,
    BundleAssigned,
    IngredientAdded,
    StepAdvanced,
    ActionPerformed,
    BundleCompleted,
    BundlePlated,
    DecoApplied,
    BundleMerged,
    BundleServed,
    BundleDiscarded,
    StationBurned,
    WaterBoiled,
    MistakeRecorded,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 18;

impl KitchenEvent {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            KitchenEvent::OrderEntered { .. } => EventKind::OrderEntered,
            KitchenEvent::OrderStarted { .. } => EventKind::OrderStarted,
            KitchenEvent::OrderCompleted { .. } => EventKind::OrderCompleted,
            KitchenEvent::OrderExpired { .. } => EventKind::OrderExpired,
            KitchenEvent::OrderDeparted { .. } => EventKind::OrderDeparted,
            KitchenEvent::BundleAssigned { .. } => EventKind::BundleAssigned,
            KitchenEvent::IngredientAdded { .. } => EventKind::IngredientAdded,
            KitchenEvent::StepAdvanced { .. } => EventKind::StepAdvanced,
            KitchenEvent::ActionPerformed { .. } => EventKind::ActionPerformed,
            KitchenEvent::BundleCompleted { .. } => EventKind::BundleCompleted,
            KitchenEvent::BundlePlated { .. } => EventKind::BundlePlated,
            KitchenEvent::DecoApplied { .. } => EventKind::DecoApplied,
            KitchenEvent::BundleMerged { .. } => EventKind::BundleMerged,
            KitchenEvent::BundleServed { .. } => EventKind::BundleServed,
            KitchenEvent::BundleDiscarded { .. } => EventKind::BundleDiscarded,
            KitchenEvent::StationBurned { .. } => EventKind::StationBurned,
            KitchenEvent::WaterBoiled { .. } => EventKind::WaterBoiled,
            KitchenEvent::MistakeRecorded { .. } => EventKind::MistakeRecorded,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer — pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    /// Pre-allocated storage.
    events: Vec<Option<KitchenEvent>>,
    /// Write position (wraps around).
    head: usize,
    /// Number of events currently stored (may be less than capacity).
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: KitchenEvent) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events that were dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    /// Clear all events from the buffer.
    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a KitchenEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&KitchenEvent)>;

/// Priority level for event listeners. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&KitchenEvent) -> bool>;

/// Wraps a listener with priority, optional filter, and insertion order.
struct ListenerEntry {
    listener: PassiveListener,
    priority: ListenerPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("priority", &self.priority)
            .field(
                "filter",
                &if self.filter.is_some() {
                    "Some(<fn>)"
                } else {
                    "None"
                },
            )
            .field("insertion_order", &self.insertion_order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// The central event bus. Holds one ring buffer per event kind, listener
/// lists, and suppression flags.
pub struct EventBus {
    /// One ring buffer per event kind, allocated lazily on first emit.
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],

    /// Suppressed event kinds. Suppressed events are never buffered.
    suppressed: [bool; EVENT_KIND_COUNT],

    /// Listeners indexed by event kind.
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],

    /// Default buffer capacity for new event buffers.
    default_capacity: usize,

    /// Monotonically increasing counter for stable sort ordering.
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppress an event kind. Suppressed events are never allocated or buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        // Drop the buffer if it exists -- zero allocation for suppressed events.
        self.buffers[kind.index()] = None;
    }

    /// Check if an event kind is suppressed.
    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Emit an event into its ring buffer. No-ops if the kind is suppressed.
    pub fn emit(&mut self, event: KitchenEvent) {
        let idx = event.kind().index();

        if self.suppressed[idx] {
            return;
        }

        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(self.default_capacity))
            .push(event);
    }

    /// Register a passive listener for an event kind. Listeners are called
    /// in registration order during delivery with Normal priority and no filter.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, ListenerPriority::Normal, None, listener);
    }

    /// Register a passive listener with explicit priority and optional filter.
    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: ListenerPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.listeners[kind.index()].push(ListenerEntry {
            listener,
            priority,
            filter,
            insertion_order: order,
        });
    }

    /// Deliver all buffered events to listeners, oldest first, then clear.
    ///
    /// For each event kind with buffered events:
    /// 1. Sort listeners by `(priority, insertion_order)`.
    /// 2. For each listener, check the optional filter; skip on false.
    /// 3. Call the listener for each event in order.
    /// 4. Clear the buffer.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }

            let Some(buffer) = self.buffers[idx].as_ref() else {
                continue;
            };

            if buffer.is_empty() {
                continue;
            }

            // Collect events into a temporary Vec to avoid borrow conflicts
            // between the buffer and listeners.
            let events: Vec<KitchenEvent> = buffer.iter().cloned().collect();

            self.listeners[idx].sort_by_key(|entry| (entry.priority as u8, entry.insertion_order));

            for entry in &mut self.listeners[idx] {
                for event in &events {
                    if let Some(ref filter) = entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }

            if let Some(buffer) = self.buffers[idx].as_mut() {
                buffer.clear();
            }
        }
    }

    /// Get the event buffer for a specific event kind (read-only).
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Get the count of events currently buffered for a kind.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Get the total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear all buffers. Does not remove listeners or suppression settings.
    pub fn clear_all(&mut self) {
        for buffer in &mut self.buffers {
            if let Some(b) = buffer.as_mut() {
                b.clear();
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
