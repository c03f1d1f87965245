use relay_types::{Chain, Entry};

/// Position of the host-driven reveal: which chain is on screen and how many
/// of its entries are uncovered. `step_index == 0` shows only the seed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RevealCursor {
    pub chain_index: usize,
    pub step_index: usize,
}

impl RevealCursor {
    pub fn new(chain_index: usize, step_index: usize) -> Self {
        Self {
            chain_index,
            step_index,
        }
    }

    pub fn reset() -> Self {
        Self::default()
    }

    /// The chain on screen and its uncovered entries. The last entry of the
    /// returned slice is the one currently being revealed. `None` when the
    /// cursor points past the chains or at one with nothing to show.
    pub fn visible<'a>(&self, chains: &'a [Chain]) -> Option<(&'a Chain, &'a [Entry])> {
        let chain = chains.get(self.chain_index)?;
        if chain.entries.is_empty() {
            return None;
        }
        let end = self.step_index.min(chain.entries.len() - 1);
        Some((chain, &chain.entries[..=end]))
    }

    /// One host click: uncover the next entry, or move to the next chain
    /// that has entries. `None` once every chain has been fully revealed.
    pub fn advance(self, chains: &[Chain]) -> Option<RevealCursor> {
        let chain = chains.get(self.chain_index)?;
        if self.step_index + 1 < chain.entries.len() {
            return Some(RevealCursor::new(self.chain_index, self.step_index + 1));
        }
        let mut next = self.chain_index + 1;
        while next < chains.len() {
            if !chains[next].entries.is_empty() {
                return Some(RevealCursor::new(next, 0));
            }
            next += 1;
        }
        None
    }

    /// Viewers apply relayed cursors monotonically, so a reordered or
    /// duplicated channel event can never move the presentation backwards.
    pub fn merge_forward(self, target: RevealCursor) -> RevealCursor {
        self.max(target)
    }
}
