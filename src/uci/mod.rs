//! Universal Chess Interface front end.

mod command;
mod engine;
mod options;

use std::io::BufRead;

use crate::board::{Move, Position};

pub use command::{parse, GoParams, UciCommand};
pub use engine::Engine;
pub use options::{OptionAction, UciOptions};

/// Long-algebraic wire form for a move. Castling is written king-to-g/c
/// unless Chess960 mode asks for the king-to-rook form; `0000` is the
/// null move.
#[must_use]
pub fn format_move(m: Move, chess960: bool) -> String {
    if m.is_none() {
        return "0000".to_string();
    }
    if m.is_castle() && !chess960 {
        let (king_to, _) = Position::castle_destinations(m.from(), m.to());
        return format!("{}{}", m.from(), king_to);
    }
    let mut out = format!("{}{}", m.from(), m.to());
    if let Some(p) = m.promotion_piece() {
        out.push(p.to_char());
    }
    out
}

/// `score cp N` or `score mate N` as the protocol wants it.
#[must_use]
pub fn format_score(score: i32, mate_in: Option<i32>) -> String {
    match mate_in {
        Some(moves) => format!("mate {moves}"),
        None => format!("cp {score}"),
    }
}

/// Blocking command loop over stdin. Returns cleanly on `quit` or end of
/// input; the process exit code is 0 either way.
pub fn run() {
    let stdin = std::io::stdin();
    let mut engine = Engine::new();

    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse(&line) {
            Some(cmd) => {
                if !engine.handle(cmd) {
                    break;
                }
            }
            None => engine.note_ignored(&line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;

    #[test]
    fn formats_plain_and_promotion_moves() {
        let m = Move::quiet("e2".parse().unwrap(), "e4".parse().unwrap());
        assert_eq!(format_move(m, false), "e2e4");

        let promo = Move::promotion(
            "e7".parse().unwrap(),
            "e8".parse().unwrap(),
            crate::board::Piece::Queen,
            false,
        );
        assert_eq!(format_move(promo, false), "e7e8q");
        assert_eq!(format_move(Move::NONE, false), "0000");
    }

    #[test]
    fn castling_notation_depends_on_mode() {
        let castle = Move::castle(Square::E1, Square::H1);
        assert_eq!(format_move(castle, false), "e1g1");
        assert_eq!(format_move(castle, true), "e1h1");

        let long = Move::castle(Square::E8, Square::A8);
        assert_eq!(format_move(long, false), "e8c8");
        assert_eq!(format_move(long, true), "e8a8");
    }

    #[test]
    fn score_formatting() {
        assert_eq!(format_score(35, None), "cp 35");
        assert_eq!(format_score(30995, Some(3)), "mate 3");
        assert_eq!(format_score(-30995, Some(-2)), "mate -2");
    }
}
