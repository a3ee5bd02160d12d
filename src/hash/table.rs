// Chained hash table over window positions.
//
// `head[bucket]` holds the most recently inserted position for a bucket and
// `next[pos]` links each position to the previous one in the same bucket.
// Positions must be inserted in increasing order, so every chain runs from
// newest to oldest.  Stored values carry HASH_CKOFFSET so 0 means "empty".

use super::rolling::{HASH_CKOFFSET, HashCfg};

/// Hash chain index for one buffer (source or target).
pub struct ChainTable {
    /// Bucket array: `head[bucket] = pos + HASH_CKOFFSET` or 0 (empty).
    head: Vec<u32>,
    /// `next[pos]` = previous position in the same bucket (+ offset) or 0.
    next: Vec<u32>,
    cfg: HashCfg,
}

impl ChainTable {
    /// Create a table able to index positions `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        let cfg = HashCfg::new(capacity);
        Self {
            head: vec![0u32; cfg.size],
            next: vec![0u32; capacity],
            cfg,
        }
    }

    /// Number of positions this table can index.
    pub fn capacity(&self) -> usize {
        self.next.len()
    }

    /// Most recent position stored for `cksum`.
    #[inline(always)]
    pub fn lookup(&self, cksum: u32) -> Option<usize> {
        decode(self.head[self.cfg.bucket(cksum)])
    }

    /// Insert `pos` at the head of its bucket's chain.
    ///
    /// Positions outside the table's capacity are ignored.
    #[inline(always)]
    pub fn insert(&mut self, cksum: u32, pos: usize) {
        let Some(stored) = u32::try_from(pos)
            .ok()
            .and_then(|p| p.checked_add(HASH_CKOFFSET))
        else {
            return;
        };
        if pos >= self.next.len() {
            return;
        }
        let bucket = self.cfg.bucket(cksum);
        self.next[pos] = self.head[bucket];
        self.head[bucket] = stored;
    }

    /// The entry inserted before `pos` in the same bucket.
    #[inline]
    pub fn chain_prev(&self, pos: usize) -> Option<usize> {
        decode(*self.next.get(pos)?)
    }

    /// Walk the chain for `cksum`, newest first, visiting at most `limit`
    /// entries.
    pub fn candidates(&self, cksum: u32, limit: usize) -> Chain<'_> {
        Chain {
            table: self,
            cur: self.lookup(cksum),
            left: limit,
        }
    }

    /// Bucket count.
    pub fn size(&self) -> usize {
        self.cfg.size
    }
}

#[inline(always)]
fn decode(val: u32) -> Option<usize> {
    if val != 0 {
        Some((val - HASH_CKOFFSET) as usize)
    } else {
        None
    }
}

/// Iterator over one bucket's chain.
pub struct Chain<'a> {
    table: &'a ChainTable,
    cur: Option<usize>,
    left: usize,
}

impl Iterator for Chain<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.left == 0 {
            return None;
        }
        let pos = self.cur?;
        self.left -= 1;
        self.cur = self.table.chain_prev(pos);
        Some(pos)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
