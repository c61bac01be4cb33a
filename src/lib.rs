//! # Solr Harness
//!
//! Upload JSON document batches to a Solr core and inspect the core's
//! live metadata through an ingest/metadata service.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌───────────────┐   ┌──────────┐
//! │ JSON file  │──▶│  Analyzer   │──▶│    Session     │──▶│ Backend  │
//! │ (on disk)  │   │ (local only)│   │  Controller    │   │  (HTTP)  │
//! └────────────┘   └─────────────┘   └───────┬───────┘   └────┬─────┘
//!                                            │                │
//!                                            ▼                ▼
//!                                     ┌────────────┐   ┌────────────┐
//!                                     │   render   │◀──│  classify  │
//!                                     └────────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! solrh analyze ./data.json                 # inspect the batch, no network
//! solrh upload ./data.json --core docs      # index it
//! solrh metadata --core docs                # show document count, size, samples
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`profile`] | Connection profile validation |
//! | [`analyze`] | Local document batch analysis |
//! | [`error`] | Failure taxonomy and classification |
//! | [`backend`] | Ingest and metadata HTTP clients |
//! | [`session`] | Session state machine |
//! | [`progress`] | Progress reporting on stderr |
//! | [`render`] | Human and JSON output |
//! | [`ingest`] | `analyze` / `upload` commands |
//! | [`metadata_cmd`] | `metadata` / `refresh` commands |

pub mod analyze;
pub mod backend;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metadata_cmd;
pub mod models;
pub mod profile;
pub mod progress;
pub mod render;
pub mod session;
