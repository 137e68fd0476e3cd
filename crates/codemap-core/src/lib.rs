//! # Codemap Core
//!
//! Client-side orchestration for a code-search service: the project
//! lifecycle, the hierarchical result tree, per-node view state, and the
//! session that sequences import, search, and clear against a backend.
//!
//! This crate performs no network or filesystem I/O of its own. The
//! [`backend::Backend`] trait is the only seam to the outside; the HTTP
//! implementation lives in the `codemap` application crate.
//!
//! | Module | Role |
//! |--------|------|
//! | [`lifecycle`] | `NoProject → Importing → Active → Clearing` state machine |
//! | [`tree`] | Arena-backed result tree with hit repair |
//! | [`view`] | Expand and chunk visibility per node |
//! | [`session`] | Guarded backend calls, last-issued search wins |
//! | [`backend`] | Backend trait and an in-memory implementation |

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod session;
pub mod tree;
pub mod view;

pub use error::{CodemapError, Result};
