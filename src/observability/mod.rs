//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, one span per connection)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//!     → monitor.rs (periodic handler count in the log)
//! ```

pub mod logging;
pub mod metrics;
pub mod monitor;

pub use monitor::Monitor;
