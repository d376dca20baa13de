//! Domain layer for the padron client registry.
//!
//! - [`catalog`]: the immutable plan catalog loaded at process start.
//! - [`normalize`]: per-field parsers that turn loosely-typed JSON input into
//!   validated values.
//! - [`accounting`]: derived usage and billing metrics.
//! - [`service`]: the client operations exposed to the HTTP and CLI surfaces.

pub mod accounting;
pub mod catalog;
pub mod normalize;
pub mod service;
