//! Execution time measurements for knit applications
//!
//! Wrap a closure or a future with [`track`] / [`track_async`] and the elapsed
//! time is recorded under a label in the process-wide [`Measurements`]
//! registry, where it can be listed, summed and averaged.
//!
//! # Examples
//!
//! ```
//! use knit_util::*;
//!
//! let greeting = track("greet", || format!("Hello {}", "World"));
//! assert_eq!(greeting, "Hello World");
//!
//! let entries = default_measurements().by_label("greet");
//! assert!(!entries.is_empty());
//! ```

pub mod measure;

pub use measure::{
    Entry, Measurements, Tracker, default_measurements, track, track_async,
};
