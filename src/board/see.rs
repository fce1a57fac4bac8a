//! Static exchange evaluation.
//!
//! Plays out the capture sequence on a single square, each side always
//! recapturing with its least valuable attacker, and returns the net
//! material balance for the side making the first capture.

use super::attacks;
use super::state::Position;
use super::types::{Bitboard, Color, Move, Piece, PIECES};

/// Exchange values; the king is a sentinel that ends any sequence.
pub(crate) const SEE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 20000];

#[inline]
#[must_use]
pub(crate) fn see_value(piece: Piece) -> i32 {
    SEE_VALUES[piece.index()]
}

impl Position {
    /// Net material estimate of playing `m` and letting both sides
    /// recapture on the destination with their least valuable attacker
    /// until no attackers remain. A quiet move starts the exchange at
    /// zero, so a defended landing square scores the moved piece away.
    #[must_use]
    pub fn see(&self, m: Move) -> i32 {
        const MAX_EXCHANGES: usize = 32;

        if m.is_castle() {
            return 0;
        }

        let from = m.from();
        let to = m.to();

        let victim_value = match self.piece_at(to) {
            Some((_, piece)) => see_value(piece),
            None if m.is_en_passant() => see_value(Piece::Pawn),
            None => 0,
        };
        let Some((_, attacker)) = self.piece_at(from) else {
            return 0;
        };

        let mut gain = [0i32; MAX_EXCHANGES];
        gain[0] = victim_value;

        let mut occupied = self.occupancy();
        let mut attackers = self.attackers_to(to, occupied);
        let mut side = self.side_to_move();
        let mut next_piece = attacker;
        let mut from_bb = Bitboard::from_square(from);
        let mut depth = 0;

        loop {
            // Take the current attacker off the board; sliders behind it
            // may now reach the target square.
            occupied &= !from_bb;
            attackers &= !from_bb;
            if next_piece == Piece::Pawn || next_piece.slides_diagonally() {
                attackers |= Bitboard(attacks::bishop_attacks(to, occupied.0))
                    & self.diagonal_sliders()
                    & occupied;
            }
            if next_piece.slides_straight() {
                attackers |= Bitboard(attacks::rook_attacks(to, occupied.0))
                    & self.straight_sliders()
                    & occupied;
            }

            side = side.opponent();
            let side_attackers = attackers & self.occupied_by(side);
            if side_attackers.is_empty() {
                break;
            }

            depth += 1;
            if depth >= MAX_EXCHANGES {
                break;
            }

            let (lva_piece, lva_bb) = self.least_valuable_attacker(side_attackers, side);

            gain[depth] = see_value(next_piece) - gain[depth - 1];

            // Neither continuing nor stopping can help the capturing side
            // from here on.
            if (-gain[depth - 1]).max(gain[depth]) < 0 {
                break;
            }

            // A king cannot recapture into remaining enemy attackers.
            if lva_piece == Piece::King
                && (attackers & self.occupied_by(side.opponent())).any()
            {
                break;
            }

            next_piece = lva_piece;
            from_bb = lva_bb;
        }

        while depth > 0 {
            depth -= 1;
            gain[depth] = -(-gain[depth]).max(gain[depth + 1]);
        }
        gain[0]
    }

    /// `see(m) >= threshold`.
    #[inline]
    #[must_use]
    pub fn see_ge(&self, m: Move, threshold: i32) -> bool {
        self.see(m) >= threshold
    }

    fn least_valuable_attacker(&self, attackers: Bitboard, side: Color) -> (Piece, Bitboard) {
        for piece in PIECES {
            let candidates = attackers & self.pieces_of(side, piece);
            if candidates.any() {
                return (piece, Bitboard::from_square(candidates.lsb()));
            }
        }
        // Callers only ask when an attacker exists.
        unreachable!("least_valuable_attacker on empty set")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    fn capture(pos: &mut Position, uci: &str) -> Move {
        pos.parse_uci_move(uci).expect("legal move")
    }

    #[test]
    fn undefended_piece_nets_its_value() {
        // Rook takes an undefended pawn.
        let mut pos = Position::from_fen("4k3/8/8/3p4/8/8/8/3RK3 w - - 0 1").unwrap();
        let m = capture(&mut pos, "d1d5");
        assert_eq!(pos.see(m), see_value(Piece::Pawn));
    }

    #[test]
    fn defended_pawn_loses_the_rook() {
        // Rxd5 is met by exd5: pawn for rook.
        let mut pos = Position::from_fen("4k3/8/4p3/3p4/8/8/8/3RK3 w - - 0 1").unwrap();
        let m = capture(&mut pos, "d1d5");
        assert_eq!(
            pos.see(m),
            see_value(Piece::Pawn) - see_value(Piece::Rook)
        );
    }

    #[test]
    fn see_never_exceeds_victim_value() {
        let mut pos = Position::from_fen(
            "r1bqkbnr/ppp1pppp/2n5/3p4/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
        )
        .unwrap();
        let m = capture(&mut pos, "e4d5");
        let (_, victim) = pos.piece_at(m.to()).unwrap();
        assert!(pos.see(m) <= see_value(victim));
    }

    #[test]
    fn xray_recapture_counts() {
        // Rook takes on e5; behind the capturing rook a second rook
        // supports the exchange against a defended pawn.
        let pos = Position::from_fen("4k3/4r3/8/4p3/8/8/4R3/4RK2 w - - 0 1").unwrap();
        let m = Move::capture("e2".parse().unwrap(), "e5".parse().unwrap());
        // Rxe5 Rxe5 Rxe5: pawn + rook - rook = pawn.
        assert_eq!(pos.see(m), see_value(Piece::Pawn));
    }

    #[test]
    fn equal_exchange_is_zero() {
        // Knight takes knight, defended by a pawn; knight for knight.
        let mut pos =
            Position::from_fen("4k3/2p5/3n4/8/4N3/8/8/4K3 w - - 0 1").unwrap();
        let m = capture(&mut pos, "e4d6");
        assert_eq!(
            pos.see(m),
            see_value(Piece::Knight) - see_value(Piece::Knight)
        );
    }

    #[test]
    fn see_ge_thresholds() {
        let mut pos = Position::from_fen("4k3/8/8/3p4/8/8/8/3RK3 w - - 0 1").unwrap();
        let m = capture(&mut pos, "d1d5");
        assert!(pos.see_ge(m, 0));
        assert!(pos.see_ge(m, 100));
        assert!(!pos.see_ge(m, 101));
    }

    #[test]
    fn safe_quiet_move_scores_zero() {
        let mut pos = Position::new();
        let m = pos.parse_uci_move("e2e4").unwrap();
        assert_eq!(pos.see(m), 0);
    }

    #[test]
    fn quiet_move_into_a_pawn_loses_the_piece() {
        let mut pos = Position::from_fen("4k3/8/8/8/3p4/8/8/1N2K3 w - - 0 1").unwrap();
        let m = capture(&mut pos, "b1c3");
        assert_eq!(pos.see(m), -see_value(Piece::Knight));
    }
}
