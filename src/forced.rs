use std::collections::HashMap;

/// Positions from which a move is known to force a win for the searching side.
///
/// Keys are `Board::position_key` values. Entries are only added when
/// backpropagation proves a line, and only dropped when the search is reset.
#[derive(Debug, Clone)]
pub struct ForcedSequenceCache<M> {
    moves: HashMap<String, M>,
}

impl<M> Default for ForcedSequenceCache<M> {
    fn default() -> Self {
        Self {
            moves: HashMap::new(),
        }
    }
}

impl<M: Clone> ForcedSequenceCache<M> {
    /// The move that forces a win from this position, if one is known.
    pub fn get(&self, position_key: &str) -> Option<&M> {
        self.moves.get(position_key)
    }

    /// Whether a forced move is known for this position.
    pub fn contains(&self, position_key: &str) -> bool {
        self.moves.contains_key(position_key)
    }

    /// Records every step of a proven line as (position, move to play there).
    pub fn record_line<I>(&mut self, line: I)
    where
        I: IntoIterator<Item = (String, M)>,
    {
        self.moves.extend(line);
    }

    /// Number of positions with a known forced move.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// `true` until the first forced line is proven.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Forgets every proven line.
    pub fn clear(&mut self) {
        self.moves.clear();
    }
}
