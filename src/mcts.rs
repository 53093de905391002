use crate::board::{Board, Outcome};
use crate::config::SearchConfig;
use crate::forced::ForcedSequenceCache;
use crate::mcts_node::MctsNode;
use crate::playout::playout;
use crate::random::{RandomGenerator, StandardRandomGenerator};
use ego_tree::{NodeId, NodeRef, Tree};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// The main struct for running the Monte Carlo Tree Search algorithm.
///
/// It owns the search tree, the forced-sequence cache, the random number
/// generator and the search configuration. Parent links inside the tree are
/// plain node ids, so only the children own their subtrees.
pub struct MonteCarloTreeSearch<T: Board, K: RandomGenerator> {
    tree: Tree<MctsNode<T>>,
    forced_sequences: ForcedSequenceCache<T::Move>,
    random: K,
    config: SearchConfig,
}

impl<T: Board, K: RandomGenerator> Default for MonteCarloTreeSearch<T, K> {
    fn default() -> Self {
        MonteCarloTreeSearchBuilder::new(T::default()).build()
    }
}

/// A builder for creating instances of `MonteCarloTreeSearch`.
pub struct MonteCarloTreeSearchBuilder<T: Board, K: RandomGenerator> {
    board: T,
    random_generator: K,
    config: SearchConfig,
}

impl<T: Board, K: RandomGenerator> MonteCarloTreeSearchBuilder<T, K> {
    /// Creates a new builder with the given initial board state.
    pub fn new(board: T) -> Self {
        Self {
            board,
            random_generator: K::default(),
            config: SearchConfig::default(),
        }
    }

    /// Sets the random number generator for the MCTS search.
    pub fn with_random_generator(mut self, rg: K) -> Self {
        self.random_generator = rg;
        self
    }

    /// Sets the search parameters.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the `MonteCarloTreeSearch` instance with the configured parameters.
    pub fn build(self) -> MonteCarloTreeSearch<T, K> {
        MonteCarloTreeSearch::new(self.board, self.random_generator, self.config)
    }
}

/// Result of a single `search` iteration.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SearchStatus {
    /// A leaf was expanded, simulated and backpropagated.
    Iterated,
    /// No expandable leaf is left; further iterations do nothing.
    Exhausted,
}

impl<T: Board, K: RandomGenerator> MonteCarloTreeSearch<T, K> {
    /// Returns a new builder for `MonteCarloTreeSearch`.
    pub fn builder(board: T) -> MonteCarloTreeSearchBuilder<T, K> {
        MonteCarloTreeSearchBuilder::new(board)
    }

    /// Creates a new `MonteCarloTreeSearch` instance.
    ///
    /// It is recommended to use the builder pattern via `MonteCarloTreeSearch::builder()` instead.
    pub fn new(board: T, rg: K, config: SearchConfig) -> Self {
        Self {
            tree: Tree::new(MctsNode::new(board)),
            forced_sequences: ForcedSequenceCache::default(),
            random: rg,
            config,
        }
    }

    /// Returns an immutable reference to the underlying search tree.
    pub fn get_tree(&self) -> &Tree<MctsNode<T>> {
        &self.tree
    }

    /// Returns a reference to the root node of the search tree.
    pub fn get_root(&self) -> NodeRef<'_, MctsNode<T>> {
        self.tree.root()
    }

    /// The parameters this search was built with.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Forced wins proven so far, keyed by position.
    pub fn forced_sequences(&self) -> &ForcedSequenceCache<T::Move> {
        &self.forced_sequences
    }

    /// Drops the whole tree and the forced-sequence cache and starts over from `board`.
    pub fn reset(&mut self, board: T) {
        self.tree = Tree::new(MctsNode::new(board));
        self.forced_sequences.clear();
    }

    /// Performs one full iteration: selection, expansion, simulation and backpropagation.
    pub fn search(&mut self) -> SearchStatus {
        let root_id = self.tree.root().id();
        let Some(leaf_id) =
            Self::find_expandable_leaf(&self.tree, &mut self.random, &self.config, root_id)
        else {
            return SearchStatus::Exhausted;
        };

        let children = self.expand_node(leaf_id);
        let Some(&candidate) = self.random.choose(&children) else {
            return SearchStatus::Exhausted;
        };

        let outcome = self.simulate(candidate);
        self.backpropagate(candidate, outcome);
        SearchStatus::Iterated
    }

    /// Runs the MCTS search for a specified number of iterations, stopping early once exhausted.
    pub fn iterate_n_times(&mut self, n: u64) {
        for _ in 0..n {
            if self.search() == SearchStatus::Exhausted {
                break;
            }
        }
    }

    /// Picks a move for the side to move at the root.
    ///
    /// A move from the forced-sequence cache is returned without searching, as
    /// is the only legal move. Otherwise iterations run until `time_limit` has
    /// elapsed or `iteration_limit` iterations were done, whichever comes
    /// first; the clock is only checked between iterations. At least one
    /// iteration always runs, so a live position always gets a move.
    pub fn find_best_move(&mut self, time_limit: Duration, iteration_limit: u64) -> Option<T::Move> {
        let root_key = self.tree.root().value().board.position_key();
        if let Some(forced) = self.forced_sequences.get(&root_key) {
            info!(?forced, "using forced sequence move");
            return Some(forced.clone());
        }

        let mut legal_moves = self.tree.root().value().board.legal_moves();
        match legal_moves.len() {
            0 => return None,
            1 => {
                debug!("only one move available, playing it");
                return legal_moves.pop();
            }
            _ => {}
        }

        let start = Instant::now();
        let deadline = start.checked_add(time_limit);
        let mut iterations: u64 = 0;
        loop {
            let status = self.search();
            iterations += 1;

            if let Some(forced) = self.forced_sequences.get(&root_key) {
                info!(
                    iterations,
                    cached = self.forced_sequences.len(),
                    ?forced,
                    "found forced sequence"
                );
                return Some(forced.clone());
            }
            if status == SearchStatus::Exhausted {
                debug!("no more non-terminal leaf nodes to expand");
                break;
            }
            if iterations >= iteration_limit || deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
        }

        debug!(
            iterations,
            elapsed_ms = start.elapsed().as_millis() as u64,
            root_visits = self.tree.root().value().visits,
            root_wins = self.tree.root().value().wins,
            "search finished"
        );
        self.get_most_perspective_move()
    }

    /// Returns the root child with the highest expected win rate for the side
    /// to move, breaking ties uniformly at random.
    pub fn get_most_perspective_move(&mut self) -> Option<T::Move> {
        let rated: Vec<(f64, &T::Move)> = self
            .tree
            .root()
            .children()
            .filter_map(|child| {
                let data = child.value();
                Some((data.expected_win_rate_for_parent()?, data.prev_move.as_ref()?))
            })
            .collect();

        let best_moves: Vec<&T::Move> = if rated.is_empty() {
            self.tree
                .root()
                .children()
                .filter_map(|child| child.value().prev_move.as_ref())
                .collect()
        } else {
            let best_rate = rated
                .iter()
                .map(|(rate, _)| *rate)
                .fold(f64::NEG_INFINITY, f64::max);
            debug!(
                expected_win_rate = best_rate,
                "choosing among strongest moves"
            );
            rated
                .into_iter()
                .filter(|(rate, _)| *rate == best_rate)
                .map(|(_, m)| m)
                .collect()
        };

        self.random.choose(&best_moves).map(|m| (*m).clone())
    }

    /// Advances the root past `b_move`.
    ///
    /// A move already in the tree makes that child the new root; its subtree
    /// and statistics are kept and everything else is released. An unknown
    /// move starts a fresh single-node tree.
    pub fn apply_move(&mut self, b_move: &T::Move) {
        let known_child = self
            .tree
            .root()
            .children()
            .find(|child| child.value().prev_move.as_ref() == Some(b_move))
            .map(|child| child.id());

        match known_child.and_then(|id| Self::extract_subtree(&self.tree, id)) {
            Some(subtree) => self.tree = subtree,
            None => {
                let mut board = self.tree.root().value().board.clone();
                board.perform_move(b_move);
                self.reset(board);
            }
        }
    }

    /// The root's win rate for its own side to move, `0.5` before any playout.
    pub fn evaluation(&self) -> f64 {
        self.tree.root().value().win_rate().unwrap_or(0.5)
    }

    /// `true` when a forced win is known, the root is terminal, or every
    /// move from an expanded root leads to a terminal position.
    pub fn is_game_going_to_end_soon(&self) -> bool {
        if !self.forced_sequences.is_empty() {
            return true;
        }

        let root = self.tree.root();
        root.value().is_terminal
            || (root.has_children() && root.children().all(|c| c.value().is_terminal))
    }

    /// Descends from `node_id` to a leaf worth expanding.
    ///
    /// Terminal children are skipped. The rest are shuffled and then stably
    /// sorted by descending UCT score, so equal scores are tried in random
    /// order; if a child's subtree has nothing to expand the next one is tried.
    fn find_expandable_leaf(
        tree: &Tree<MctsNode<T>>,
        random: &mut K,
        config: &SearchConfig,
        node_id: NodeId,
    ) -> Option<NodeId> {
        let node = tree.get(node_id)?;
        if !node.has_children() {
            return Some(node_id);
        }

        let parent_visits = node.value().visits;
        let mut options: Vec<(NodeId, f64)> = node
            .children()
            .filter(|child| !child.value().is_terminal)
            .map(|child| (child.id(), child.value().uct_score(parent_visits, config)))
            .collect();
        if options.is_empty() {
            return None;
        }

        random.shuffle(&mut options);
        options.sort_by(|a, b| b.1.total_cmp(&a.1));
        options
            .into_iter()
            .find_map(|(child_id, _)| Self::find_expandable_leaf(tree, random, config, child_id))
    }

    /// Expands a leaf node by creating one child per legal move.
    fn expand_node(&mut self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.tree.get(node_id) else {
            return Vec::new();
        };
        let board = node.value().board.clone();
        let side_to_move = node.value().side_to_move;

        let mut new_nodes = Vec::new();
        for possible_move in board.legal_moves() {
            let mut board_clone = board.clone();
            board_clone.perform_move(&possible_move);
            let child = MctsNode::with_move(board_clone, possible_move);
            if child.side_to_move == side_to_move {
                error!(
                    prev_move = ?child.prev_move,
                    "child does not flip the side to move, dropping it"
                );
                continue;
            }
            new_nodes.push(child);
        }

        let Some(mut parent) = self.tree.get_mut(node_id) else {
            return Vec::new();
        };
        new_nodes
            .into_iter()
            .map(|child| parent.append(child).id())
            .collect()
    }

    /// Simulates a random playout from a given node.
    fn simulate(&mut self, node_id: NodeId) -> Outcome {
        match self.tree.get(node_id) {
            Some(node) => playout(
                &node.value().board,
                &mut self.random,
                self.config.max_playout_depth,
            ),
            None => Outcome::Draw,
        }
    }

    /// Propagates a playout result from `node_id` up to the root.
    ///
    /// The walk also tracks whether the line is forced. It starts forced only
    /// if `node_id` is terminal, and stops being forced at any node with more
    /// than one child whose side to move is not the root's side. A forced line
    /// won by the root's side is stored in the forced-sequence cache, one
    /// entry per (parent position, move played) along the path.
    fn backpropagate(&mut self, node_id: NodeId, outcome: Outcome) {
        let root_side = self.tree.root().value().side_to_move;
        let mut forced = self
            .tree
            .get(node_id)
            .is_some_and(|node| node.value().is_terminal);
        let mut line = Vec::new();
        let mut path = Vec::new();

        let mut cursor = self.tree.get(node_id);
        while let Some(node) = cursor {
            let data = node.value();
            if data.side_to_move != root_side && node.children().nth(1).is_some() {
                forced = false;
            }
            if forced {
                if let (Some(parent), Some(b_move)) = (node.parent(), data.prev_move.as_ref()) {
                    line.push((parent.value().board.position_key(), b_move.clone()));
                }
            }
            path.push(node.id());
            cursor = node.parent();
        }

        for id in path {
            if let Some(mut node) = self.tree.get_mut(id) {
                node.value().record(outcome);
            }
        }

        if forced && outcome == Outcome::Win(root_side) {
            self.forced_sequences.record_line(line);
        }
    }

    /// Copies the subtree under `new_root` into a tree of its own.
    fn extract_subtree(tree: &Tree<MctsNode<T>>, new_root: NodeId) -> Option<Tree<MctsNode<T>>> {
        let source = tree.get(new_root)?;
        let mut subtree = Tree::new(source.value().clone());
        let mut pending = vec![(source, subtree.root().id())];
        while let Some((from, to_id)) = pending.pop() {
            let mut to = subtree.get_mut(to_id)?;
            let copied: Vec<_> = from
                .children()
                .map(|child| (child, to.append(child.value().clone()).id()))
                .collect();
            pending.extend(copied);
        }
        Some(subtree)
    }
}

impl<T: Board> MonteCarloTreeSearch<T, StandardRandomGenerator> {
    /// A search with default parameters and an unseeded random generator.
    pub fn from_board(board: T) -> Self {
        MonteCarloTreeSearchBuilder::new(board).build()
    }
}
