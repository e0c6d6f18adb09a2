//! # Dharma
//!
//! A query router for scripture study. A free-text query is matched to a
//! configured scripture, classified as an exact verse reference, a verse
//! search, or an open question, and answered from local chapter files or a
//! document-grounded text-generation service.
//!
//! ## Architecture
//!
//! ```text
//!               ┌────────────┐   ┌────────────┐
//!  query ──────▶│  Registry  │──▶│ Classifier │
//!               │  (detect)  │   │ fast path  │
//!               └────────────┘   └─────┬──────┘
//!                                      │
//!          ┌───────────────────────────┼────────────────────┐
//!          ▼                           ▼                    ▼
//!   ┌─────────────┐            ┌──────────────┐      ┌─────────────┐
//!   │   Lookup    │◀───────────│ Verse search │      │  Question   │
//!   │ chapter.json│            │ (generation) │      │ (generation)│
//!   └──────┬──────┘            └──────────────┘      └──────┬──────┘
//!          └──────────────────────────┬─────────────────────┘
//!                                     ▼
//!                             text payload ──▶ render
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dharma lookup 2 47                  # exact verse, no network
//! dharma ask "What is karma yoga?"    # needs GOOGLE_API_KEY
//! dharma serve                        # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`scripture`] | Scripture profiles and detection |
//! | [`classify`] | Query classification |
//! | [`lookup`] | Exact verse lookup |
//! | [`generation`] | Text-generation provider abstraction |
//! | [`router`] | Query routing and handlers |
//! | [`render`] | Response parsing for display |
//! | [`sources`] | Scripture data health listing |
//! | [`server`] | HTTP server |

pub mod classify;
pub mod config;
pub mod generation;
pub mod lookup;
pub mod models;
pub mod render;
pub mod router;
pub mod scripture;
pub mod server;
pub mod sources;
