use crate::board::{Board, Outcome};
use crate::config::SearchConfig;
use crate::playout::{count_threats, is_dead_draw, is_winning_state};
use shakmaty::Color;

/// Represents a single node in the Monte Carlo search tree.
///
/// Statistics are kept from the perspective of `side_to_move`: a playout won
/// by that side adds one to `wins`, a playout it lost subtracts one, a draw
/// leaves it unchanged. `wins.abs()` therefore never exceeds `visits`.
#[derive(Debug, Clone)]
pub struct MctsNode<T: Board> {
    /// The game state that this node represents.
    pub board: T,
    /// The move that led to this node's state from its parent. `None` for the initial root.
    pub prev_move: Option<T::Move>,
    /// The player whose turn it is in this node's game state.
    pub side_to_move: Color,
    /// Signed playout score for `side_to_move`.
    pub wins: i64,
    /// Number of playouts that went through this node.
    pub visits: u64,
    /// The position is won by the side to move or is a dead draw.
    pub is_terminal: bool,
    /// Number of capturing replies available to the side to move.
    pub threats: usize,
}

impl<T: Board> Default for MctsNode<T> {
    fn default() -> Self {
        MctsNode::new(T::default())
    }
}

impl<T: Board> MctsNode<T> {
    /// Creates a root node for the given board state.
    pub fn new(board: T) -> Self {
        let threats = count_threats(&board);
        MctsNode {
            side_to_move: board.side_to_move(),
            board,
            prev_move: None,
            wins: 0,
            visits: 0,
            is_terminal: false,
            threats,
        }
    }

    /// Creates the node reached by playing `b_move`; `board` already has the move applied.
    ///
    /// A child whose side to move has no reply, or that is a dead draw, is
    /// terminal and starts with one visit and one win.
    pub fn with_move(board: T, b_move: T::Move) -> Self {
        let threats = count_threats(&board);
        let is_terminal = is_winning_state(&board) || is_dead_draw(&board);
        MctsNode {
            side_to_move: board.side_to_move(),
            board,
            prev_move: Some(b_move),
            wins: if is_terminal { 1 } else { 0 },
            visits: if is_terminal { 1 } else { 0 },
            is_terminal,
            threats,
        }
    }

    /// Adds one playout result to the statistics.
    pub fn record(&mut self, outcome: Outcome) {
        self.visits += 1;
        match outcome {
            Outcome::Win(side) if side == self.side_to_move => self.wins += 1,
            Outcome::Win(_) => self.wins -= 1,
            Outcome::Draw => {}
        }
    }

    /// Win rate in `[0, 1]` for `side_to_move`, or `None` before the first visit.
    pub fn win_rate(&self) -> Option<f64> {
        if self.visits == 0 {
            None
        } else {
            Some((self.wins as f64 + self.visits as f64) / (2.0 * self.visits as f64))
        }
    }

    /// Win rate in `[0, 1]` for the side that played `prev_move`.
    pub fn expected_win_rate_for_parent(&self) -> Option<f64> {
        if self.visits == 0 {
            None
        } else {
            Some((self.visits as f64 - self.wins as f64) / (2.0 * self.visits as f64))
        }
    }

    /// UCT score used during selection; unvisited nodes score positive infinity.
    pub fn uct_score(&self, parent_visits: u64, config: &SearchConfig) -> f64 {
        let Some(exploitation) = self.win_rate() else {
            return f64::INFINITY;
        };
        let exploration = f64::sqrt(f64::ln(parent_visits as f64) / self.visits as f64);
        let threat = 1.0 - 1.0 / (self.threats as f64 + 1.0);
        exploitation + config.exploration_constant * exploration + config.threat_constant * threat
    }
}

#[cfg(test)]
mod tests {
    use crate::board::{Board, ChessMove, Outcome};
    use crate::boards::antichess::AntichessBoard;
    use crate::config::SearchConfig;
    use crate::mcts_node::MctsNode;
    use shakmaty::{Color, Square};

    #[test]
    fn terminal_nodes_are_preseeded() {
        // arrange: after Rxd1 white has nothing left and has won
        let mut board = AntichessBoard::from_fen("8/8/8/8/8/8/8/r2N4 b - -").unwrap();
        let capture = board.legal_moves().remove(0);
        board.perform_move(&capture);

        // act
        let node = MctsNode::with_move(board, capture);

        // assert
        assert!(node.is_terminal);
        assert_eq!(node.visits, 1);
        assert_eq!(node.wins, 1);
        assert_eq!(node.threats, 0);
    }

    #[test]
    fn threats_count_capturing_replies() {
        // arrange: after Nd1 black's only reply is Rxd1
        let mut board = AntichessBoard::from_fen("8/8/8/8/8/8/1N6/r7 w - -").unwrap();
        let nd1 = board
            .resolve_move(&ChessMove::new(Square::B2, Square::D1))
            .unwrap();
        board.perform_move(&nd1);

        // act
        let node = MctsNode::with_move(board, nd1);

        // assert
        assert_eq!(node.threats, 1);
        assert!(!node.is_terminal);
        assert_eq!(node.visits, 0);
        assert_eq!(node.side_to_move, Color::Black);
    }

    #[test]
    fn roots_are_never_preseeded() {
        let board = AntichessBoard::from_fen("8/8/8/8/8/8/8/r7 w - -").unwrap();
        let node = MctsNode::new(board);
        assert!(!node.is_terminal);
        assert_eq!(node.visits, 0);
    }

    #[test]
    fn record_scores_from_side_to_move() {
        let mut node = MctsNode::new(AntichessBoard::default());
        assert_eq!(node.side_to_move, Color::White);
        node.record(Outcome::Win(Color::White));
        node.record(Outcome::Win(Color::Black));
        node.record(Outcome::Win(Color::Black));
        node.record(Outcome::Draw);
        assert_eq!(node.visits, 4);
        assert_eq!(node.wins, -1);
        assert_eq!(node.win_rate(), Some(3.0 / 8.0));
        assert_eq!(node.expected_win_rate_for_parent(), Some(5.0 / 8.0));
    }

    #[test]
    fn unvisited_nodes_are_preferred() {
        let node = MctsNode::new(AntichessBoard::default());
        let config = SearchConfig::default();
        assert_eq!(node.win_rate(), None);
        assert_eq!(node.uct_score(10, &config), f64::INFINITY);
    }

    #[test]
    fn uct_includes_threat_bonus() {
        let mut node = MctsNode::new(AntichessBoard::default());
        node.record(Outcome::Draw);
        node.threats = 3;
        let config = SearchConfig::default();
        // exploitation 0.5, exploration 0 with one parent visit, threat 0.75
        assert!((node.uct_score(1, &config) - 1.25).abs() < 1e-12);
    }
}
