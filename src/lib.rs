//! Layered, validated source transformations for JavaScript and TypeScript.
//!
//! Requested layers are dependency-corrected by [`resolver`], run in order by
//! [`pipeline::Pipeline`], and each candidate must pass the [`validator`]
//! before it replaces the current code. [`engine::Engine`] is the entry point.

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod events;
pub mod exit;
pub mod fallback;
pub mod lang;
pub mod layers;
pub mod pipeline;
pub mod reporting;
pub mod repository;
pub mod resolver;
pub mod validator;
