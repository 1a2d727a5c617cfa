//! Report renderers for analysis outcomes.
//!
//! - [`terminal`] — colored risk banner plus a probability table; respects `--verbose` / `--quiet`.
//! - JSON output is the serialized [`Analysis`](crate::models::Analysis), written by `main`.

pub mod terminal;
