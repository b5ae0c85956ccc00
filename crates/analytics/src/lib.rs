//! # Meridian Analytics
//!
//! Quantitative analysis of trading performance. It acts as the "unbiased
//! judge" of the system.
//!
//! ## Architectural Principles
//!
//! - **Pure logic crate:** no knowledge of brokers, ledgers, or data sources.
//!   Inputs are plain return and value series; outputs are report values.
//! - **Stateless calculation:** every function is a pure mapping from its
//!   inputs. Running a backtest and summarizing it are two explicit steps;
//!   nothing here is computed lazily or cached.
//!
//! ## Public API
//!
//! - `compute_metrics` / `PerformanceMetrics`: full statistics over a
//!   log-return series.
//! - `summarize_values` / `BacktestSummary`: the shared summary for the
//!   event-based backtest variants.
//! - `optimal_leverage`, `kelly_simulation`: the Kelly sizing policy.

// Declare the modules that constitute this crate.
pub mod error;
pub mod kelly;
pub mod metrics;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use error::AnalyticsError;
pub use kelly::{KellyConfig, WealthPaths, kelly_simulation, optimal_leverage};
pub use metrics::{PerformanceMetrics, compute_metrics, log_returns};
pub use report::{BacktestSummary, summarize_values};
