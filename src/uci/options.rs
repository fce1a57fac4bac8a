//! UCI option registry: advertisement and `setoption` handling.

use crate::board::MAX_PLY;
use crate::search::StyleParams;

/// Actions the engine must take beyond recording the new value.
#[derive(Debug, PartialEq, Eq)]
pub enum OptionAction {
    ResizeHash(usize),
    SetThreads(usize),
    SetSyzygyPath(String),
    ClearHash,
}

/// Current option values, with the protocol defaults.
#[derive(Clone, Debug)]
pub struct UciOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub depth: i32,
    pub move_overhead: u64,
    pub contempt: i32,
    pub syzygy_path: Option<String>,
    pub own_book: bool,
    pub book_file: Option<String>,
    pub book_learning: bool,
    pub book_random: bool,
    pub multipv: u32,
    pub chess960: bool,
    pub analyse_mode: bool,
    pub show_wdl: bool,
    pub use_nnue: bool,
    pub eval_file: Option<String>,
    pub ponder: bool,
    pub style: StyleParams,
}

impl Default for UciOptions {
    fn default() -> Self {
        UciOptions {
            hash_mb: 64,
            threads: 1,
            depth: MAX_PLY as i32 - 1,
            move_overhead: 30,
            contempt: 0,
            syzygy_path: None,
            own_book: false,
            book_file: None,
            book_learning: false,
            book_random: false,
            multipv: 1,
            chess960: false,
            analyse_mode: false,
            show_wdl: false,
            use_nnue: false,
            eval_file: None,
            ponder: false,
            style: StyleParams::default(),
        }
    }
}

fn print_spin(name: &str, default: impl std::fmt::Display, min: i64, max: i64) {
    println!("option name {name} type spin default {default} min {min} max {max}");
}

fn print_check(name: &str, default: bool) {
    println!("option name {name} type check default {default}");
}

fn print_string(name: &str, default: &str) {
    println!("option name {name} type string default {default}");
}

impl UciOptions {
    /// Advertise the option set after `uci`.
    pub fn print(&self) {
        print_spin("Hash", self.hash_mb, 1, 1024);
        print_spin("Threads", self.threads, 1, 64);
        print_spin("Depth", self.depth, 1, 128);
        print_spin("MoveOverhead", self.move_overhead, 0, 5000);
        print_spin("Contempt", self.contempt, -100, 100);
        print_check("Ponder", self.ponder);
        println!("option name Clear Hash type button");
        print_string("SyzygyPath", "<empty>");
        print_check("OwnBook", self.own_book);
        print_string("BookFile", "<empty>");
        print_check("BookLearning", self.book_learning);
        print_check("BookRandom", self.book_random);
        print_spin("MultiPV", self.multipv as i64, 1, 10);
        print_check("UCI_Chess960", self.chess960);
        print_check("UCI_AnalyseMode", self.analyse_mode);
        print_check("UCI_ShowWDL", self.show_wdl);
        print_check("UseNNUE", self.use_nnue);
        print_string("EvalFile", "<empty>");
        print_spin("Aggression", self.style.aggression, 0, 100);
        print_spin("Positional", self.style.positional, 0, 100);
        print_spin("RiskTaking", self.style.risk_taking, 0, 100);
        print_spin("DrawAcceptance", self.style.draw_acceptance, 0, 100);
        print_spin("TimePressure", self.style.time_pressure, 0, 100);
    }

    /// Record a `setoption`. Unknown names are ignored; the return value
    /// tells the engine what to rebuild.
    pub fn apply(&mut self, name: &str, value: Option<&str>) -> Option<OptionAction> {
        let value_i64 = value.and_then(|v| v.parse::<i64>().ok());
        let value_bool = value.map(|v| v.eq_ignore_ascii_case("true") || v == "1");

        match name.to_ascii_lowercase().replace(' ', "").as_str() {
            "hash" => {
                let mb = value_i64.unwrap_or(64).clamp(1, 1024) as usize;
                if mb != self.hash_mb {
                    self.hash_mb = mb;
                    return Some(OptionAction::ResizeHash(mb));
                }
            }
            "threads" => {
                let threads = value_i64.unwrap_or(1).clamp(1, 64) as usize;
                if threads != self.threads {
                    self.threads = threads;
                    return Some(OptionAction::SetThreads(threads));
                }
            }
            "depth" => self.depth = value_i64.unwrap_or(127).clamp(1, 128) as i32,
            "moveoverhead" => self.move_overhead = value_i64.unwrap_or(30).clamp(0, 5000) as u64,
            "contempt" => self.contempt = value_i64.unwrap_or(0).clamp(-100, 100) as i32,
            "syzygypath" => {
                let path = value.unwrap_or("").trim();
                if path.is_empty() || path == "<empty>" {
                    self.syzygy_path = None;
                } else {
                    self.syzygy_path = Some(path.to_string());
                    return Some(OptionAction::SetSyzygyPath(path.to_string()));
                }
            }
            "ownbook" => self.own_book = value_bool.unwrap_or(false),
            "bookfile" => self.book_file = value.map(str::to_string),
            "booklearning" => self.book_learning = value_bool.unwrap_or(false),
            "bookrandom" => self.book_random = value_bool.unwrap_or(false),
            "multipv" => self.multipv = value_i64.unwrap_or(1).clamp(1, 10) as u32,
            "uci_chess960" => self.chess960 = value_bool.unwrap_or(false),
            "uci_analysemode" => self.analyse_mode = value_bool.unwrap_or(false),
            "uci_showwdl" => self.show_wdl = value_bool.unwrap_or(false),
            "usennue" => self.use_nnue = value_bool.unwrap_or(false),
            "evalfile" => self.eval_file = value.map(str::to_string),
            "ponder" => self.ponder = value_bool.unwrap_or(false),
            "aggression" => self.style.aggression = clamp_style(value_i64),
            "positional" => self.style.positional = clamp_style(value_i64),
            "risktaking" => self.style.risk_taking = clamp_style(value_i64),
            "drawacceptance" => self.style.draw_acceptance = clamp_style(value_i64),
            "timepressure" => self.style.time_pressure = clamp_style(value_i64),
            "clearhash" => return Some(OptionAction::ClearHash),
            _ => log::debug!("ignoring unknown option '{name}'"),
        }
        None
    }
}

fn clamp_style(value: Option<i64>) -> i32 {
    value.unwrap_or(50).clamp(0, 100) as i32
}
