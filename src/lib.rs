//! # Codemap
//!
//! A terminal client for hierarchical code search. Import a repository into
//! a search backend, run natural-language queries against it, and browse the
//! matches as a folder tree with the hit paths opened up.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  shell   │──▶│   Session    │──▶│ HttpBackend  │──▶ search service
//! │ (stdin)  │   │ lifecycle +  │   │  (reqwest)   │
//! └──────────┘   │ tree + view  │   └──────────────┘
//!      ▲         └──────┬───────┘
//!      │                ▼
//!      └──────────── render
//! ```
//!
//! The state machine, tree model, and sequencing live in `codemap-core`;
//! this crate adds the configuration, the HTTP client, and the text UI.
//!
//! ## Quick Start
//!
//! ```bash
//! codemap import https://github.com/acme/widgets.git
//! codemap shell
//! codemap> import ./widgets
//! codemap> search where are requests authenticated
//! codemap> chunks src/auth/middleware.rs
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`client`] | HTTP backend |
//! | [`render`] | Plain-text codemap output |
//! | [`shell`] | Interactive command loop |

pub mod client;
pub mod config;
pub mod render;
pub mod shell;
