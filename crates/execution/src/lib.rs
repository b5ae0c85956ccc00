//! # Meridian Execution Crate
//!
//! This crate provides the core components for trade execution and position
//! state management: the `Broker` capability contract, the `PaperBroker`
//! simulated ledger, and the `OrderManager` state machine that translates
//! target-position signals into balance-changing trades.
//!
//! ## Architectural Principles
//!
//! - **Execution Abstraction:** The `Broker` trait lets the order manager and
//!   the control loop be completely agnostic about whether trades hit a
//!   simulated ledger or a real exchange. The paper variant is the economic
//!   model the rest of the system is tested against.
//! - **Rejections are values, not errors:** a fill the venue cannot honor
//!   (insufficient funds or inventory) comes back as `Ok(None)`. Only
//!   connectivity failures and invariant violations are `Err`.
//!
//! ## Public API
//!
//! - `Broker`: the five-operation execution capability.
//! - `PaperBroker`: the in-memory ledger for backtesting and paper trading.
//! - `OrderManager`: position tracking, equity curve, and the drawdown
//!   circuit breaker.
//! - `ExecutionError`: the specific error types returned from this crate.

// Declare the modules that constitute this crate.
pub mod broker;
pub mod error;
pub mod manager;
pub mod paper;

// Re-export the key components to provide a clean, public-facing API.
pub use broker::Broker;
pub use error::ExecutionError;
pub use manager::{OrderManager, TradingSummary};
pub use paper::PaperBroker;
