//! Line parsing for the UCI protocol.

/// Arguments of a `go` command; everything optional.
#[derive(Clone, Debug, Default)]
pub struct GoParams {
    pub depth: Option<i32>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub nodes: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
    pub searchmoves: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum UciCommand {
    Uci,
    Debug(bool),
    IsReady,
    NewGame,
    SetOption { name: String, value: Option<String> },
    Position { fen: Option<String>, moves: Vec<String> },
    Go(GoParams),
    Stop,
    PonderHit,
    Display,
    Quit,
}

/// Parse one input line. `None` means the line carried no recognisable
/// command and is ignored, per protocol.
#[must_use]
pub fn parse(line: &str) -> Option<UciCommand> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (&first, rest) = tokens.split_first()?;

    match first {
        "uci" => Some(UciCommand::Uci),
        "debug" => Some(UciCommand::Debug(rest.first() != Some(&"off"))),
        "isready" => Some(UciCommand::IsReady),
        "ucinewgame" => Some(UciCommand::NewGame),
        "setoption" => parse_setoption(rest),
        "position" => Some(parse_position(rest)),
        "go" => Some(UciCommand::Go(parse_go(rest))),
        "stop" => Some(UciCommand::Stop),
        "ponderhit" => Some(UciCommand::PonderHit),
        "d" | "display" => Some(UciCommand::Display),
        "quit" => Some(UciCommand::Quit),
        _ => None,
    }
}

fn parse_setoption(rest: &[&str]) -> Option<UciCommand> {
    let mut name_parts: Vec<&str> = Vec::new();
    let mut value_parts: Vec<&str> = Vec::new();
    let mut mode = "";

    for &token in rest {
        match token {
            "name" => mode = "name",
            "value" => mode = "value",
            _ => match mode {
                "name" => name_parts.push(token),
                "value" => value_parts.push(token),
                _ => {}
            },
        }
    }

    if name_parts.is_empty() {
        return None;
    }
    Some(UciCommand::SetOption {
        name: name_parts.join(" "),
        value: if value_parts.is_empty() {
            None
        } else {
            Some(value_parts.join(" "))
        },
    })
}

fn parse_position(rest: &[&str]) -> UciCommand {
    let mut fen = None;
    let mut moves = Vec::new();
    let mut idx = 0;

    if rest.first() == Some(&"startpos") {
        idx = 1;
    } else if rest.first() == Some(&"fen") {
        idx = 1;
        let mut fen_parts = Vec::new();
        while idx < rest.len() && rest[idx] != "moves" {
            fen_parts.push(rest[idx]);
            idx += 1;
        }
        fen = Some(fen_parts.join(" "));
    }

    if rest.get(idx) == Some(&"moves") {
        moves = rest[idx + 1..].iter().map(|s| (*s).to_string()).collect();
    }

    UciCommand::Position { fen, moves }
}

fn parse_go(rest: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut iter = rest.iter().peekable();

    fn number<T: std::str::FromStr>(iter: &mut std::iter::Peekable<std::slice::Iter<&str>>) -> Option<T> {
        iter.next().and_then(|s| s.parse().ok())
    }

    while let Some(&token) = iter.next() {
        match token {
            "depth" => params.depth = number(&mut iter),
            "movetime" => params.movetime = number(&mut iter),
            "wtime" => params.wtime = number(&mut iter),
            "btime" => params.btime = number(&mut iter),
            "winc" => params.winc = number(&mut iter),
            "binc" => params.binc = number(&mut iter),
            "movestogo" => params.movestogo = number(&mut iter),
            "nodes" => params.nodes = number(&mut iter),
            "infinite" => params.infinite = true,
            "ponder" => params.ponder = true,
            "searchmoves" => {
                while let Some(&&candidate) = iter.peek() {
                    if candidate.len() < 4 || !candidate.as_bytes()[0].is_ascii_lowercase() {
                        break;
                    }
                    // Crude shape check: square-square with optional
                    // promotion letter; real validation happens against
                    // the position.
                    if candidate.len() > 5 {
                        break;
                    }
                    params.searchmoves.push(candidate.to_string());
                    iter.next();
                }
            }
            _ => {}
        }
    }
    params
}
