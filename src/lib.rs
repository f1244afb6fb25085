//! # EA Discovery
//!
//! Enterprise-architecture discovery for Salesforce engagements: collect
//! discovery answers, extract them from client documents with a language
//! model, generate planning artifacts, and render them as SVG diagrams.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌─────────┐   ┌────────────┐
//! │ Documents │──▶│ Extract  │──▶│ Gateway │──▶│  Repair +  │
//! │ PDF/DOCX  │   │ (text)   │   │ (model) │   │ Synthesize │
//! └───────────┘   └──────────┘   └─────────┘   └─────┬──────┘
//!                                                    │
//!                      ┌──────────────┬──────────────┤
//!                      ▼              ▼              ▼
//!                 ┌─────────┐   ┌──────────┐   ┌──────────┐
//!                 │ Session │   │   SVG    │   │  Store   │
//!                 │  (CLI)  │   │ diagrams │   │ SQLite / │
//!                 └─────────┘   └──────────┘   │ PostgREST│
//!                                              └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ead init                                  # create database
//! ead discover brief.pdf notes.docx --out ./acme
//! ead list
//! ead render <id> --out ./diagrams
//! ead serve                                 # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`label`] | Lenient label resolution for model output |
//! | [`merge`] | Merging extracted answers into existing ones |
//! | [`extract`] | Document text extraction |
//! | [`gateway`] | Language-model API client with retry |
//! | [`prompts`] | Analysis and generation prompts |
//! | [`repair`] | Tolerant JSON recovery |
//! | [`synthesize`] | Placeholder architecture sections |
//! | [`svg`] | Diagram renderers |
//! | [`store`] | Engagement persistence backends |
//! | [`cache`] | Client-side engagement list |
//! | [`session`] | Discovery workflow state machine |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod cache;
pub mod config;
pub mod db;
pub mod discover;
pub mod error;
pub mod export;
pub mod extract;
pub mod gateway;
pub mod get;
pub mod label;
pub mod merge;
pub mod migrate;
pub mod models;
pub mod prompts;
pub mod repair;
pub mod server;
pub mod session;
pub mod store;
pub mod svg;
pub mod synthesize;
