// Matcher profiles for the diff engine.
//
// Each profile trades search effort for patch size.  The thresholds are the
// break-even lengths at which an action is never larger than the literal
// bytes it replaces: a `SourceRead` costs one opcode byte, a copy costs an
// opcode byte plus at least one offset byte.

/// Width of the hashed window, in bytes.
pub const HASH_WINDOW: usize = 4;

/// Matcher profile configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Name for display purposes.
    pub name: &'static str,
    /// Shortest `SourceRead` worth emitting before more target follows.
    pub min_source_read: usize,
    /// Shortest `SourceCopy` / `TargetCopy` worth emitting.
    pub min_copy: usize,
    /// Maximum hash-chain entries examined per lookup.
    pub max_chain: usize,
    /// Match length considered "long enough" to stop walking a chain.
    pub long_enough: usize,
}

/// Compression levels mapping to profiles.
///
/// - Levels 0-3: fast
/// - Levels 4-6: default
/// - Levels 7-9: thorough
pub fn config_for_level(level: u32) -> MatcherConfig {
    match level {
        0..=3 => FAST,
        4..=6 => DEFAULT,
        _ => THOROUGH,
    }
}

// ---------------------------------------------------------------------------
// Profile definitions
// ---------------------------------------------------------------------------

pub const FAST: MatcherConfig = MatcherConfig {
    name: "fast",
    min_source_read: 3,
    min_copy: HASH_WINDOW,
    max_chain: 4,
    long_enough: 32,
};

pub const DEFAULT: MatcherConfig = MatcherConfig {
    name: "default",
    min_source_read: 3,
    min_copy: HASH_WINDOW,
    max_chain: 32,
    long_enough: 256,
};

pub const THOROUGH: MatcherConfig = MatcherConfig {
    name: "thorough",
    min_source_read: 3,
    min_copy: HASH_WINDOW,
    max_chain: 1024,
    long_enough: usize::MAX,
};
