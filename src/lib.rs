//! Oxibps: BPS binary patch creation and application in Rust.
//!
//! The crate provides:
//! - The BPS patch model, parser, serializer and applier (`bps`)
//! - A hash-chain diff engine with linear and delta modes (`engine`, `hash`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use oxibps::{DiffMode, apply, create, parse, serialize};
//!
//! let source = b"hello old world";
//! let target = b"hello new world";
//!
//! let patch = create(source, target, DiffMode::Delta).unwrap();
//! let bytes = serialize(&patch);
//! let parsed = parse(&bytes).unwrap();
//! let rebuilt = apply(&parsed, source, true).unwrap();
//! assert_eq!(rebuilt, target);
//! ```

pub mod bps;
pub mod engine;
pub mod hash;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use bps::{Action, ActionMode, Patch, PatchBuilder, PatchError, apply, parse, serialize};
pub use engine::{CreateOptions, DiffMode, create, create_with_options};
