//! Board-level test suite: make/unmake round trips, hash consistency,
//! perft, draw detection and FEN handling.

mod make_unmake;
mod perft;
mod property;
