//! Pure 3x3 tic-tac-toe state machine.
//!
//! No I/O happens here: the orchestrator and the sync reducer drive a
//! [`GameState`] and decide what to send or render from the outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MoveError;

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// The 8 winning triples: 3 rows, 3 columns, 2 diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A player mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// Always moves first.
    X,
    /// Moves second.
    O,
}

impl Symbol {
    /// The opposing mark.
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "X",
            Self::O => "O",
        })
    }
}

/// Row-major 3x3 board; `None` is an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board([Option<Symbol>; CELL_COUNT]);

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// The mark at `idx`, or `None` if the cell is empty or out of range.
    pub fn get(&self, idx: usize) -> Option<Symbol> {
        self.0.get(idx).copied().flatten()
    }

    /// All cells in index order.
    pub fn cells(&self) -> &[Option<Symbol>; CELL_COUNT] {
        &self.0
    }

    /// Number of cells holding `symbol`.
    pub fn count(&self, symbol: Symbol) -> usize {
        self.0.iter().filter(|cell| **cell == Some(symbol)).count()
    }

    /// `true` when no cell is empty.
    pub fn is_full(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    fn place(&mut self, idx: usize, symbol: Symbol) -> Result<(), MoveError> {
        let cell = self.0.get_mut(idx).ok_or(MoveError::OutOfRange(idx))?;
        if cell.is_some() {
            return Err(MoveError::CellOccupied(idx));
        }
        *cell = Some(symbol);
        Ok(())
    }
}

/// Terminal outcome of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    /// Three in a row; `line` is the winning triple for highlighting.
    Win { winner: Symbol, line: [usize; 3] },
    /// Full board without a winning triple.
    Draw,
}

impl GameResult {
    /// The winning symbol, if any.
    pub fn winner(&self) -> Option<Symbol> {
        match self {
            Self::Win { winner, .. } => Some(*winner),
            Self::Draw => None,
        }
    }
}

/// Check a board for a win or draw. `None` means the game is in progress.
pub fn check_result(board: &Board) -> Option<GameResult> {
    for line in WINNING_LINES {
        let [a, b, c] = line;
        if let Some(winner) = board.get(a) {
            if board.get(b) == Some(winner) && board.get(c) == Some(winner) {
                return Some(GameResult::Win { winner, line });
            }
        }
    }
    board.is_full().then_some(GameResult::Draw)
}

/// What a successful move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The game goes on; `next` is to move.
    Continue { next: Symbol },
    /// The move ended the game.
    Finished(GameResult),
}

/// Board, turn and side assignment for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    turn: Symbol,
    result: Option<GameResult>,
    my_symbol: Symbol,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// A fresh game: empty board, X to move, local participant is X.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Symbol::X,
            result: None,
            my_symbol: Symbol::X,
        }
    }

    /// The current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Symbol to move next.
    pub fn turn(&self) -> Symbol {
        self.turn
    }

    /// `true` once a win or draw has been reached; further moves are refused.
    pub fn over(&self) -> bool {
        self.result.is_some()
    }

    /// The final result, once the game is over.
    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    /// The local participant's symbol.
    pub fn my_symbol(&self) -> Symbol {
        self.my_symbol
    }

    /// Assign the local participant's side.
    pub fn set_my_symbol(&mut self, symbol: Symbol) {
        self.my_symbol = symbol;
    }

    /// Whether the local participant may move. A game without an active
    /// peer is always the local participant's turn.
    pub fn is_my_turn(&self, peer_active: bool) -> bool {
        !peer_active || self.turn == self.my_symbol
    }

    /// Place `symbol` at `idx`.
    ///
    /// On success the board is re-evaluated: a terminal position freezes the
    /// game, otherwise the turn passes to the opponent of `symbol`.
    ///
    /// # Errors
    ///
    /// [`MoveError::GameOver`] if the game is finished,
    /// [`MoveError::OutOfRange`] / [`MoveError::CellOccupied`] for a bad cell.
    /// The state is untouched on error.
    pub fn apply_move(&mut self, idx: usize, symbol: Symbol) -> Result<MoveOutcome, MoveError> {
        if self.over() {
            return Err(MoveError::GameOver);
        }
        self.board.place(idx, symbol)?;

        match check_result(&self.board) {
            Some(result) => {
                self.result = Some(result);
                Ok(MoveOutcome::Finished(result))
            }
            None => {
                self.turn = symbol.other();
                Ok(MoveOutcome::Continue { next: self.turn })
            }
        }
    }

    /// Clear the board and re-derive the local symbol from `assign`.
    pub fn reset_with(&mut self, assign: impl FnOnce() -> Symbol) {
        self.clear();
        self.my_symbol = assign();
    }

    /// Clear the board, X to move, keeping the current side assignment.
    pub fn clear(&mut self) {
        self.board = Board::new();
        self.turn = Symbol::X;
        self.result = None;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn board_of(marks: &[(usize, Symbol)]) -> Board {
        let mut board = Board::new();
        for &(idx, sym) in marks {
            board.place(idx, sym).unwrap();
        }
        board
    }

    #[test]
    fn every_winning_line_is_detected() {
        for line in WINNING_LINES {
            for sym in [Symbol::X, Symbol::O] {
                let board = board_of(&line.map(|idx| (idx, sym)));
                assert_eq!(
                    check_result(&board),
                    Some(GameResult::Win { winner: sym, line }),
                    "line {line:?} for {sym}"
                );
            }
        }
    }

    #[test]
    fn full_board_without_line_is_draw() {
        // X O X
        // X O O
        // O X X
        use Symbol::{O, X};
        let board = board_of(&[
            (0, X),
            (1, O),
            (2, X),
            (3, X),
            (4, O),
            (5, O),
            (6, O),
            (7, X),
            (8, X),
        ]);
        assert_eq!(check_result(&board), Some(GameResult::Draw));
    }

    #[test]
    fn in_progress_board_has_no_result() {
        assert_eq!(check_result(&Board::new()), None);
        let board = board_of(&[(0, Symbol::X), (1, Symbol::X), (4, Symbol::O)]);
        assert_eq!(check_result(&board), None);
    }

    #[test]
    fn mixed_line_is_not_a_win() {
        let board = board_of(&[(0, Symbol::X), (1, Symbol::O), (2, Symbol::X)]);
        assert_eq!(check_result(&board), None);
    }

    #[test]
    fn apply_move_alternates_turns() {
        let mut game = GameState::new();
        assert_eq!(
            game.apply_move(4, Symbol::X).unwrap(),
            MoveOutcome::Continue { next: Symbol::O }
        );
        assert_eq!(game.turn(), Symbol::O);
        game.apply_move(0, Symbol::O).unwrap();
        assert_eq!(game.turn(), Symbol::X);
    }

    #[test]
    fn apply_move_rejects_bad_cells() {
        let mut game = GameState::new();
        assert_eq!(game.apply_move(9, Symbol::X), Err(MoveError::OutOfRange(9)));
        game.apply_move(3, Symbol::X).unwrap();
        let before = game.clone();
        assert_eq!(
            game.apply_move(3, Symbol::O),
            Err(MoveError::CellOccupied(3))
        );
        assert_eq!(game, before);
    }

    #[test]
    fn finished_game_rejects_moves() {
        let mut game = GameState::new();
        for (idx, sym) in [
            (0, Symbol::X),
            (3, Symbol::O),
            (1, Symbol::X),
            (4, Symbol::O),
        ] {
            game.apply_move(idx, sym).unwrap();
        }
        let outcome = game.apply_move(2, Symbol::X).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Finished(GameResult::Win {
                winner: Symbol::X,
                line: [0, 1, 2]
            })
        );
        assert!(game.over());
        assert_eq!(game.apply_move(8, Symbol::O), Err(MoveError::GameOver));
    }

    #[test]
    fn over_tracks_check_result_through_a_whole_game() {
        let mut game = GameState::new();
        for idx in [4, 0, 8, 2, 1, 7, 6, 3, 5] {
            if game.over() {
                break;
            }
            let sym = game.turn();
            game.apply_move(idx, sym).unwrap();
            assert_eq!(game.over(), check_result(game.board()).is_some());
        }
    }

    #[test]
    fn legal_play_keeps_counts_balanced() {
        // Fill cells in a scrambled order, always playing the side to move.
        let orders: [[usize; 9]; 3] = [
            [0, 1, 2, 3, 4, 5, 6, 7, 8],
            [4, 0, 8, 2, 6, 3, 5, 1, 7],
            [1, 0, 3, 2, 5, 4, 7, 8, 6],
        ];
        for order in orders {
            let mut game = GameState::new();
            for idx in order {
                if game.over() {
                    break;
                }
                game.apply_move(idx, game.turn()).unwrap();
                let x = game.board().count(Symbol::X);
                let o = game.board().count(Symbol::O);
                assert!(x == o || x == o + 1, "x={x} o={o}");
                if !game.over() {
                    let expected = if x == o { Symbol::X } else { Symbol::O };
                    assert_eq!(game.turn(), expected);
                }
            }
        }
    }

    #[test]
    fn reset_clears_board_and_applies_policy() {
        let mut game = GameState::new();
        game.apply_move(0, Symbol::X).unwrap();
        game.reset_with(|| Symbol::O);
        assert_eq!(game.board(), &Board::new());
        assert_eq!(game.turn(), Symbol::X);
        assert!(!game.over());
        assert_eq!(game.my_symbol(), Symbol::O);
    }

    #[test]
    fn clear_keeps_side_assignment() {
        let mut game = GameState::new();
        game.set_my_symbol(Symbol::O);
        game.apply_move(0, Symbol::X).unwrap();
        game.clear();
        assert_eq!(game.my_symbol(), Symbol::O);
        assert_eq!(game.board().count(Symbol::X), 0);
    }

    #[test]
    fn turn_ownership() {
        let mut game = GameState::new();
        game.set_my_symbol(Symbol::O);
        assert!(game.is_my_turn(false));
        assert!(!game.is_my_turn(true));
        game.apply_move(0, Symbol::X).unwrap();
        assert!(game.is_my_turn(true));
    }
}
