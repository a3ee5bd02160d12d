// Hash indexing and match search for patch creation.
//
// This module provides:
// - A 4-byte window checksum and bucket sizing
// - Chained hash tables over source and emitted target positions
// - Match selection with fixed tie-break rules
// - Matcher profiles (fast..thorough)

pub mod config;
pub mod matching;
pub mod rolling;
pub mod table;
