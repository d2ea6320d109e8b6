//! Reducer that applies inbound wire messages to the local game.
//!
//! [`apply_message`] is pure given `(state, role, message)`: it mutates the
//! [`GameState`] and reports what happened, leaving any I/O (re-rendering,
//! originating a host reset) to the caller.
//!
//! Messages are assumed to arrive in send order on an ordered, reliable data
//! channel. There are no sequence numbers, so loss or reordering is not
//! recovered from; explicit `sym` tagging on moves only narrows the window.

use tracing::debug;

use crate::game::{GameState, MoveOutcome, Symbol};
use crate::protocol::{Role, WireMessage};

/// What an inbound message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The message had no effect on the state.
    Ignored,
    /// A peer move was applied.
    Moved(MoveOutcome),
    /// The board was cleared.
    Reset,
    /// The local side assignment changed to the given symbol.
    RolesAssigned(Symbol),
    /// The peer asked the host for a new game; the caller must originate a
    /// fresh role assignment and reset.
    ResetRequested,
}

/// Apply `message` received by a participant playing `role`.
pub fn apply_message(state: &mut GameState, role: Role, message: &WireMessage) -> SyncOutcome {
    match *message {
        WireMessage::Move { idx, sym } => {
            // The explicit symbol wins; the local turn is only a fallback for
            // peers that do not send one.
            let sym = sym.unwrap_or_else(|| state.turn());
            match state.apply_move(usize::from(idx), sym) {
                Ok(outcome) => SyncOutcome::Moved(outcome),
                Err(e) => {
                    debug!("ignoring peer move at {idx}: {e}");
                    SyncOutcome::Ignored
                }
            }
        }
        WireMessage::Reset => {
            state.clear();
            SyncOutcome::Reset
        }
        WireMessage::RequestReset => match role {
            Role::Host => SyncOutcome::ResetRequested,
            Role::Join => {
                debug!("join ignoring request-reset");
                SyncOutcome::Ignored
            }
        },
        WireMessage::RoleAssignment { x_role, .. } => {
            let mine = if x_role == role { Symbol::X } else { Symbol::O };
            state.set_my_symbol(mine);
            SyncOutcome::RolesAssigned(mine)
        }
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
    use crate::game::GameResult;

    #[test]
    fn move_onto_occupied_cell_is_noop() {
        let mut state = GameState::new();
        state.apply_move(4, Symbol::X).unwrap();
        let before = state.clone();

        let outcome = apply_message(&mut state, Role::Join, &WireMessage::mark(4, Symbol::O));
        assert_eq!(outcome, SyncOutcome::Ignored);
        assert_eq!(state, before);
    }

    #[test]
    fn out_of_range_move_is_noop() {
        let mut state = GameState::new();
        let before = state.clone();
        let msg = WireMessage::Move {
            idx: 12,
            sym: Some(Symbol::X),
        };
        assert_eq!(
            apply_message(&mut state, Role::Host, &msg),
            SyncOutcome::Ignored
        );
        assert_eq!(state, before);
    }

    #[test]
    fn move_after_game_over_is_noop() {
        let mut state = GameState::new();
        let moves = [
            (0, Symbol::X),
            (3, Symbol::O),
            (1, Symbol::X),
            (4, Symbol::O),
            (2, Symbol::X),
        ];
        for (idx, sym) in moves {
            state.apply_move(idx, sym).unwrap();
        }
        let before = state.clone();
        let outcome = apply_message(&mut state, Role::Host, &WireMessage::mark(8, Symbol::O));
        assert_eq!(outcome, SyncOutcome::Ignored);
        assert_eq!(state, before);
    }

    #[test]
    fn explicit_symbol_beats_local_turn() {
        let mut state = GameState::new();
        // Local turn says X, but the peer says it played O.
        let outcome = apply_message(&mut state, Role::Host, &WireMessage::mark(2, Symbol::O));
        assert_eq!(
            outcome,
            SyncOutcome::Moved(MoveOutcome::Continue { next: Symbol::X })
        );
        assert_eq!(state.board().get(2), Some(Symbol::O));
    }

    #[test]
    fn missing_symbol_falls_back_to_turn() {
        let mut state = GameState::new();
        let msg = WireMessage::Move { idx: 5, sym: None };
        apply_message(&mut state, Role::Join, &msg);
        assert_eq!(state.board().get(5), Some(Symbol::X));
        assert_eq!(state.turn(), Symbol::O);
    }

    #[test]
    fn winning_move_is_reported() {
        let mut state = GameState::new();
        for (idx, sym) in [
            (6, Symbol::X),
            (0, Symbol::O),
            (7, Symbol::X),
            (1, Symbol::O),
        ] {
            state.apply_move(idx, sym).unwrap();
        }
        let outcome = apply_message(&mut state, Role::Join, &WireMessage::mark(8, Symbol::X));
        assert_eq!(
            outcome,
            SyncOutcome::Moved(MoveOutcome::Finished(GameResult::Win {
                winner: Symbol::X,
                line: [6, 7, 8]
            }))
        );
        assert!(state.over());
    }

    #[test]
    fn reset_applies_unconditionally() {
        let mut state = GameState::new();
        state.set_my_symbol(Symbol::O);
        state.apply_move(0, Symbol::X).unwrap();
        assert_eq!(
            apply_message(&mut state, Role::Join, &WireMessage::Reset),
            SyncOutcome::Reset
        );
        assert_eq!(state.board().count(Symbol::X), 0);
        assert_eq!(state.turn(), Symbol::X);
        assert!(!state.over());
        assert_eq!(state.my_symbol(), Symbol::O);
    }

    #[test]
    fn roles_for_host_x() {
        let msg = WireMessage::roles(Role::Host);

        let mut join = GameState::new();
        assert_eq!(
            apply_message(&mut join, Role::Join, &msg),
            SyncOutcome::RolesAssigned(Symbol::O)
        );
        assert_eq!(join.my_symbol(), Symbol::O);

        let mut host = GameState::new();
        host.set_my_symbol(Symbol::O);
        assert_eq!(
            apply_message(&mut host, Role::Host, &msg),
            SyncOutcome::RolesAssigned(Symbol::X)
        );
        assert_eq!(host.my_symbol(), Symbol::X);
    }

    #[test]
    fn roles_for_join_x() {
        let msg = WireMessage::roles(Role::Join);
        let mut join = GameState::new();
        join.set_my_symbol(Symbol::O);
        apply_message(&mut join, Role::Join, &msg);
        assert_eq!(join.my_symbol(), Symbol::X);
    }

    #[test]
    fn request_reset_only_matters_to_host() {
        let mut state = GameState::new();
        state.apply_move(0, Symbol::X).unwrap();
        let before = state.clone();

        assert_eq!(
            apply_message(&mut state, Role::Host, &WireMessage::RequestReset),
            SyncOutcome::ResetRequested
        );
        // The host reset itself is originated by the caller.
        assert_eq!(state, before);

        assert_eq!(
            apply_message(&mut state, Role::Join, &WireMessage::RequestReset),
            SyncOutcome::Ignored
        );
        assert_eq!(state, before);
    }
}
