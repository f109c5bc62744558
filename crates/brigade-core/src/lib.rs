//! Brigade Core -- the simulation engine for restaurant cooking games.
//!
//! This crate provides the station physics, recipe step validation, bundle
//! and order lifecycles, plating rules, events, queries, and deterministic
//! fixed-point arithmetic that every Brigade game depends on.
//!
//! # Five-Phase Tick Pipeline
//!
//! Each call to [`kitchen::Kitchen::tick`] advances the simulation by one
//! second through the following phases:
//!
//! 1. **Order sweep** -- Departure timers fire; hard-timeout orders are
//!    force-expired along with their live instances.
//! 2. **Station physics** -- Burner thermal model steps (heating, boiling,
//!    overheating, burning).
//! 3. **Cooking timers** -- Fryer and microwave timers accrue, deep-fry steps
//!    auto-advance, and overdue fryer loads burn.
//! 4. **Event delivery** -- Buffered events go out to passive listeners.
//! 5. **Bookkeeping** -- The tick counter advances.
//!
//! # Command Outcome Pattern
//!
//! Commands distinguish expected refusals from consistency errors. A refusal
//! (wrong step, cold pan, occupied slot) is a normal gameplay outcome; a
//! consistency error (an id that does not exist) fails loudly:
//!
//! ```rust,ignore
//! match kitchen.add_ingredient(instance, requirement, amount)? {
//!     Outcome::Accepted(report) => render_feed(report),
//!     Outcome::Rejected(rejection) => flash_refusal(rejection),
//! }
//! ```
//!
//! # Key Types
//!
//! - [`kitchen::Kitchen`] -- Main simulation engine and pipeline orchestrator.
//! - [`catalog::Catalog`] -- Immutable menu data: recipes, bundles, steps,
//!   requirements, and deco rules (frozen at startup).
//! - [`wok::Burner`] -- Per-burner thermal model with pan and water states.
//! - [`fryer::FryerBasket`] -- Submersion-gated fry timer with a burn grace.
//! - [`microwave::MicrowaveQueue`] -- FIFO queue; only the head cooks.
//! - [`validator::rule_feed`] / [`validator::rule_action`] -- The step
//!   validator, parameterized by [`policy::EnforcementMode`].
//! - [`plating::PlatingState`] -- The 3x3 deco grid and its rule engine.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`event::EventBus`] -- Subscription-based event bus with buffered delivery.

pub mod catalog;
pub mod command;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod event;
pub mod fixed;
pub mod fryer;
pub mod id;
pub mod instance;
pub mod kitchen;
pub mod microwave;
pub mod order;
pub mod plating;
pub mod policy;
pub mod query;
pub mod validator;
pub mod wok;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
