//! TeamCache Manager
//!
//! The persistent, profile-driven job engine behind a browsable cache-warming
//! tool for a network-mounted filespace. Catalogues the filespace into a
//! relational store, drives batched cache-warm requests to completion through
//! a pool of concurrent workers, keeps directory cache status consistent with
//! leaf-file status, and publishes live progress to connected observers.
//!
//! The HTTP/WebSocket façade, authentication, media-preview transcoding,
//! direct-link issuance, and UI are external collaborators and live outside
//! this crate; [`Engine`] is the whole of the stable contract they depend on.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod infrastructure;
pub mod profile_selector;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
