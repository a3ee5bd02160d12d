// Match search for the diff engine.
//
// At each target position three candidates are considered:
//   1. SourceRead: source and target agree at the same offset
//   2. SourceCopy: a source position found through the source index
//   3. TargetCopy: an earlier target position found through the target index
//      (only when self-reference is allowed)
//
// The longest candidate wins.  On equal length the earlier kind in the list
// above wins, and within a copy kind the position closest to the running
// pointer wins, then the lower position.

use super::config::MatcherConfig;
use super::rolling::{self, small_cksum};
use super::table::ChainTable;

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

/// Where a match reads its bytes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    SourceRead,
    SourceCopy,
    TargetCopy,
}

/// A match found by the engine, to be turned into an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub kind: MatchKind,
    /// Absolute position the bytes are read from (source or target).
    pub from: usize,
    /// Length of the match.
    pub length: usize,
}

// ---------------------------------------------------------------------------
// Match engine
// ---------------------------------------------------------------------------

/// Index state for one diff: the full source index, plus an index over the
/// target bytes emitted so far when self-reference is allowed.
pub struct MatchEngine<'a> {
    config: MatcherConfig,
    source: &'a [u8],
    target: &'a [u8],
    source_table: ChainTable,
    target_table: Option<ChainTable>,
    /// Target positions `< indexed` are in `target_table`.
    indexed: usize,
}

impl<'a> MatchEngine<'a> {
    /// Build the engine and index every window of `source`.
    ///
    /// `self_copies` enables the target index and `TargetCopy` candidates.
    pub fn new(
        config: MatcherConfig,
        source: &'a [u8],
        target: &'a [u8],
        self_copies: bool,
    ) -> Self {
        let mut source_table = ChainTable::new(source.len());
        // Ascending insertion keeps every chain newest (highest) first.
        for pos in 0..source.len() {
            match small_cksum(&source[pos..]) {
                Some(cksum) => source_table.insert(cksum, pos),
                None => break,
            }
        }
        let target_table = self_copies.then(|| ChainTable::new(target.len()));
        Self {
            config,
            source,
            target,
            source_table,
            target_table,
            indexed: 0,
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Make target positions `< upto` available to later `TargetCopy`
    /// lookups.  No-op without a target index.
    pub fn index_target(&mut self, upto: usize) {
        let Some(table) = self.target_table.as_mut() else {
            return;
        };
        while self.indexed < upto {
            match small_cksum(&self.target[self.indexed..]) {
                Some(cksum) => table.insert(cksum, self.indexed),
                None => {
                    // Tail shorter than a window: nothing left to index.
                    self.indexed = self.target.len();
                    return;
                }
            }
            self.indexed += 1;
        }
    }

    /// Best acceptable match at target position `pos`, or `None` if the byte
    /// should be emitted as a literal.
    pub fn find_best(&self, pos: usize, source_ptr: usize, target_ptr: usize) -> Option<Match> {
        let rest = &self.target[pos..];
        let read_len = if pos < self.source.len() {
            rolling::forward_match(&self.source[pos..], rest, rest.len())
        } else {
            0
        };
        let read = Match {
            kind: MatchKind::SourceRead,
            from: pos,
            length: read_len,
        };

        let mut best = read;
        if read_len < self.config.long_enough
            && let Some(cksum) = small_cksum(rest)
        {
            let copy = self.best_copy(
                &self.source_table,
                self.source,
                cksum,
                rest,
                source_ptr,
                MatchKind::SourceCopy,
            );
            if let Some(m) = copy.filter(|m| m.length > best.length) {
                best = m;
            }
            if let Some(table) = &self.target_table
                && best.length < self.config.long_enough
            {
                let copy = self.best_copy(
                    table,
                    self.target,
                    cksum,
                    rest,
                    target_ptr,
                    MatchKind::TargetCopy,
                );
                if let Some(m) = copy.filter(|m| m.length > best.length) {
                    best = m;
                }
            }
        }

        // A read that runs to the end of the target leaves no literal run to
        // split, so it is never more expensive than the literal bytes.
        let read_ok = read_len >= self.config.min_source_read
            || (read_len > 0 && pos + read_len == self.target.len());
        if best.length >= self.threshold(best.kind) {
            Some(best)
        } else if read_ok {
            Some(read)
        } else {
            None
        }
    }

    fn threshold(&self, kind: MatchKind) -> usize {
        match kind {
            MatchKind::SourceRead => self.config.min_source_read,
            MatchKind::SourceCopy | MatchKind::TargetCopy => self.config.min_copy,
        }
    }

    /// Walk one chain and keep the best candidate for `rest`.
    fn best_copy(
        &self,
        table: &ChainTable,
        data: &[u8],
        cksum: u32,
        rest: &[u8],
        ptr: usize,
        kind: MatchKind,
    ) -> Option<Match> {
        let mut best: Option<Match> = None;
        for from in table.candidates(cksum, self.config.max_chain) {
            let length = rolling::forward_match(&data[from..], rest, rest.len());
            if length == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) if length != b.length => length > b.length,
                Some(b) => {
                    let (d, bd) = (from.abs_diff(ptr), b.from.abs_diff(ptr));
                    d < bd || (d == bd && from < b.from)
                }
            };
            if better {
                best = Some(Match { kind, from, length });
                if length >= self.config.long_enough {
                    break;
                }
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
