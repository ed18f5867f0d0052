//! Needs-reply scoring engine.
//!
//! Single pass per thread:
//! 1. `signals::extract_signals()`: question, action phrases, age bucket,
//!    thread length, courtesy close
//! 2. `scorer::score_signals()`: fixed-order sum, clamped to [0, 100]
//! 3. `ranker::rank()`: minimum-score filter, descending sort
//!
//! Every step is a pure function of its input and the scoring config.

pub mod ranker;
pub mod scorer;
pub mod signals;
pub mod types;

pub use ranker::rank;
pub use scorer::{Score, score_signals, score_thread};
pub use signals::{AgeBucket, SignalSet, extract_signals};
pub use types::{ResultSet, ScoredThread, Thread};
