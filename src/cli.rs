//! Text presentation layer: fleet placement and match commands over stdin,
//! boards and status rendered to stdout.

use std::fmt::Write as _;
use std::io::{self, Write};

use log::debug;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::board::BoardModel;
use crate::cellset::{Cell, Grid};
use crate::config::GRID_SIZE;
use crate::engine::{Phase, Score, ShotRecord};
use crate::error::{PlacementError, ShotError};
use crate::roster::render_roster;
use crate::session::{Frontend, Intent, SessionSnapshot};
use crate::ship::{Orientation, Placement};

pub const SETUP_HELP: &str = "\
commands:
  place <ship> <col> <row> [h|v]   place or move a ship
  remove <col> <row>               remove the ship covering a cell
  random [seed]                    place the whole fleet at random
  rotate                           toggle the default orientation
  reset                            clear the board
  board                            show the board
  start                            begin the match (fleet must be complete)
  quit";

pub const GAME_HELP: &str = "\
commands:
  target <col> <row>   aim the next volley
  auto                 toggle auto-fire
  board                show both grids
  score                show the score
  players              list participants
  exit                 open the exit summary
  confirm | cancel     leave the match or resume it";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?} (try help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{0:?} is not a number")]
    BadNumber(String),
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupCommand {
    Place {
        ship: String,
        origin: Cell,
        orientation: Option<Orientation>,
    },
    Remove(Cell),
    Random(Option<u64>),
    Rotate,
    Reset,
    Show,
    Start,
    Quit,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    Intent(Intent),
    Board,
    Score,
    Players,
    Help,
}

fn number<T: std::str::FromStr>(token: &str) -> Result<T, CommandError> {
    token.parse().map_err(|_| CommandError::BadNumber(token.to_string()))
}

fn cell_args(args: &[&str], usage: &'static str) -> Result<Cell, CommandError> {
    match args {
        [col, row] => Ok(Cell::new(number(col)?, number(row)?)),
        _ => Err(CommandError::Usage(usage)),
    }
}

pub fn parse_setup_command(line: &str) -> Result<SetupCommand, CommandError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&cmd, args)) = words.split_first() else {
        return Err(CommandError::Empty);
    };
    match cmd.to_ascii_lowercase().as_str() {
        "place" | "p" => {
            const USAGE: &str = "place <ship> <col> <row> [h|v]";
            let (ship, rest) = args.split_first().ok_or(CommandError::Usage(USAGE))?;
            let (coords, orientation) = match rest {
                [col, row] => ([*col, *row], None),
                [col, row, o] => ([*col, *row], Some(o.parse::<Orientation>()?)),
                _ => return Err(CommandError::Usage(USAGE)),
            };
            Ok(SetupCommand::Place {
                ship: ship.to_string(),
                origin: cell_args(&coords, USAGE)?,
                orientation,
            })
        }
        "remove" | "rm" => Ok(SetupCommand::Remove(cell_args(args, "remove <col> <row>")?)),
        "random" => match args {
            [] => Ok(SetupCommand::Random(None)),
            [seed] => Ok(SetupCommand::Random(Some(number(seed)?))),
            _ => Err(CommandError::Usage("random [seed]")),
        },
        "rotate" | "r" => Ok(SetupCommand::Rotate),
        "reset" => Ok(SetupCommand::Reset),
        "board" | "show" => Ok(SetupCommand::Show),
        "start" => Ok(SetupCommand::Start),
        "quit" | "q" => Ok(SetupCommand::Quit),
        "help" | "?" => Ok(SetupCommand::Help),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

pub fn parse_game_command(line: &str) -> Result<GameCommand, CommandError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&cmd, args)) = words.split_first() else {
        return Err(CommandError::Empty);
    };
    let intent = match cmd.to_ascii_lowercase().as_str() {
        "target" | "t" => Intent::SelectTarget(cell_args(args, "target <col> <row>")?),
        "auto" => Intent::ToggleAutoFire,
        "exit" | "quit" => Intent::RequestExit,
        "confirm" | "yes" => Intent::ConfirmExit,
        "cancel" | "no" => Intent::CancelExit,
        "board" => return Ok(GameCommand::Board),
        "score" => return Ok(GameCommand::Score),
        "players" => return Ok(GameCommand::Players),
        "help" | "?" => return Ok(GameCommand::Help),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(GameCommand::Intent(intent))
}

fn grid_header(out: &mut String) {
    out.push_str("   ");
    for col in 0..GRID_SIZE {
        let _ = write!(out, " {}", col);
    }
    out.push('\n');
}

fn render_grid<F: Fn(Cell) -> char>(mark: F) -> String {
    let mut out = String::new();
    grid_header(&mut out);
    for row in 0..GRID_SIZE {
        let _ = write!(out, "{:2} ", row);
        for col in 0..GRID_SIZE {
            let _ = write!(out, " {}", mark(Cell::new(col, row)));
        }
        out.push('\n');
    }
    out
}

/// The local fleet. Ships show as the first letter of their id; with
/// `incoming`, hits show as `X` and misses as `o`.
pub fn render_board(board: &BoardModel, incoming: Option<&ShotRecord>) -> String {
    render_fleet(&board.snapshot().placements, incoming)
}

pub fn render_fleet(placements: &[Placement], incoming: Option<&ShotRecord>) -> String {
    render_grid(|cell| match incoming {
        Some(shots) if shots.is_hit(cell) => 'X',
        Some(shots) if shots.is_miss(cell) => 'o',
        _ => placements
            .iter()
            .find(|p| p.covers(cell))
            .and_then(|p| p.ship().chars().next())
            .map_or('.', |c| c.to_ascii_uppercase()),
    })
}

/// The shared target grid: confirmed hits `X`, volleys `o`, aim `+`.
pub fn render_target_grid(outgoing: &ShotRecord, target: Option<Cell>) -> String {
    render_grid(|cell| {
        if outgoing.is_hit(cell) {
            'X'
        } else if outgoing.is_miss(cell) {
            'o'
        } else if target == Some(cell) {
            '+'
        } else {
            '.'
        }
    })
}

pub fn render_score(score: &Score) -> String {
    let mut out = String::from("match summary\n");
    let _ = writeln!(out, "  shots fired: {}", score.shots_fired);
    let _ = writeln!(out, "  times hit: {}", score.hits_taken);
    if score.hits_by_peer.is_empty() {
        out.push_str("  no player hit\n");
    } else {
        out.push_str("  hits by player:\n");
        for (peer, hits) in &score.hits_by_peer {
            let sunk = score.destroyed_by_peer.get(peer).copied().unwrap_or(0);
            let _ = writeln!(out, "    {}: {} hit(s), {} sunk", peer, hits, sunk);
        }
    }
    let _ = writeln!(out, "  distinct players hit: {}", score.distinct_peers_hit);
    let _ = writeln!(out, "  final score: {}", score.final_score);
    out
}

pub fn render_status(snapshot: &SessionSnapshot) -> String {
    let shots = &snapshot.shots;
    let active = snapshot.participants.iter().filter(|p| p.active).count();
    let phase = match shots.phase {
        Phase::AwaitingPlayers => "waiting for players".to_string(),
        Phase::Armed => "pick a target".to_string(),
        Phase::TargetPending => match shots.selected_target {
            Some(cell) => format!("aiming at {}", cell),
            None => "aiming".to_string(),
        },
        Phase::AutoTargeting => "auto-fire".to_string(),
        Phase::ExitPending => "exit? (confirm/cancel)".to_string(),
        Phase::GameOver => "all ships lost".to_string(),
    };
    format!(
        "[{} players] {} | next shot in {}s | fired {} | hit {} times | sunk {:?}",
        active,
        phase,
        shots.countdown_remaining.max(0.0) as u32,
        shots.score.shots_fired,
        shots.score.hits_taken,
        shots.sunk,
    )
}

/// Lines from stdin, read on a background task so the control loop can
/// drain them without blocking.
pub struct StdinLines {
    rx: mpsc::UnboundedReceiver<String>,
}

impl StdinLines {
    /// Must be called inside a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("stdin closed");
        });
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = io::stdout().flush();
}

/// Apply one setup command to `board`, returning the text to show.
pub fn apply_setup_command(board: &mut BoardModel, cmd: &SetupCommand) -> Result<String, CommandError> {
    match cmd {
        SetupCommand::Place {
            ship,
            origin,
            orientation,
        } => {
            let orientation = orientation.unwrap_or_else(|| board.orientation());
            board.place(ship, *origin, orientation)?;
            Ok(render_board(board, None))
        }
        SetupCommand::Remove(cell) => Ok(match board.remove_at(*cell) {
            Some(id) => format!("removed {}\n{}", id, render_board(board, None)),
            None => format!("nothing at {}", cell),
        }),
        SetupCommand::Random(seed) => {
            board.randomize(*seed)?;
            Ok(render_board(board, None))
        }
        SetupCommand::Rotate => Ok(format!("orientation: {:?}", board.toggle_orientation())),
        SetupCommand::Reset => {
            board.reset();
            Ok(render_board(board, None))
        }
        SetupCommand::Show => {
            let mut out = render_board(board, None);
            for ship in board.catalog() {
                let state = if board.placement(ship.id()).is_some() { "placed" } else { "-" };
                let _ = writeln!(out, "  {:<10} {} ({})  {}", ship.id(), ship.name(), ship.length(), state);
            }
            Ok(out)
        }
        SetupCommand::Help | SetupCommand::Start | SetupCommand::Quit => Ok(SETUP_HELP.to_string()),
    }
}

/// Interactive placement. Returns `false` if the user quit or stdin closed
/// before the fleet was complete.
pub async fn place_fleet(board: &mut BoardModel, lines: &mut StdinLines) -> bool {
    println!("{}", SETUP_HELP);
    println!("{}", render_board(board, None));
    loop {
        prompt("setup> ");
        let Some(line) = lines.next().await else {
            return false;
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_setup_command(&line) {
            Ok(SetupCommand::Start) if board.is_fully_placed() => return true,
            Ok(SetupCommand::Start) => println!("place every ship first (or use random)"),
            Ok(SetupCommand::Quit) => return false,
            Ok(cmd) => match apply_setup_command(board, &cmd) {
                Ok(text) => println!("{}", text),
                Err(e) => println!("{}", e),
            },
            Err(e) => println!("{}", e),
        }
    }
}

enum View {
    Board,
    Score,
    Players,
    Help,
}

/// Stdin/stdout frontend. The status line is reprinted only when it changes.
pub struct CliFrontend {
    lines: StdinLines,
    views: Vec<View>,
    last_status: String,
    last_fired: u32,
    last_overlays: (Grid, Grid),
}

impl CliFrontend {
    pub fn new(lines: StdinLines) -> Self {
        Self {
            lines,
            views: Vec::new(),
            last_status: String::new(),
            last_fired: 0,
            last_overlays: (Grid::new(), Grid::new()),
        }
    }
}

impl Frontend for CliFrontend {
    fn poll_intents(&mut self) -> Vec<Intent> {
        let mut intents = Vec::new();
        while let Some(line) = self.lines.try_next() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_game_command(&line) {
                Ok(GameCommand::Intent(intent)) => intents.push(intent),
                Ok(GameCommand::Board) => self.views.push(View::Board),
                Ok(GameCommand::Score) => self.views.push(View::Score),
                Ok(GameCommand::Players) => self.views.push(View::Players),
                Ok(GameCommand::Help) => self.views.push(View::Help),
                Err(e) => println!("{}", e),
            }
            if matches!(intents.last(), Some(Intent::RequestExit)) {
                self.views.push(View::Score);
            }
        }
        intents
    }

    fn present(&mut self, snapshot: &SessionSnapshot) {
        let shots = &snapshot.shots;
        let overlays = (shots.incoming.hits(), shots.outgoing.hits());
        if shots.score.shots_fired != self.last_fired || overlays != self.last_overlays {
            self.last_fired = shots.score.shots_fired;
            self.last_overlays = overlays;
            self.views.push(View::Board);
        }
        for view in self.views.drain(..) {
            match view {
                View::Board => {
                    println!("targets:\n{}", render_target_grid(&shots.outgoing, shots.selected_target));
                    println!(
                        "your fleet:\n{}",
                        render_fleet(&snapshot.board.placements, Some(&shots.incoming))
                    );
                }
                View::Score => println!("{}", render_score(&shots.score)),
                View::Players => println!("{}", render_roster(&snapshot.participants, snapshot.local)),
                View::Help => println!("{}", GAME_HELP),
            }
        }
        let status = render_status(snapshot);
        if status != self.last_status {
            println!("{}", status);
            self.last_status = status;
        }
    }

    fn rejected(&mut self, intent: Intent, err: ShotError) {
        println!("{:?} refused: {}", intent, err);
    }
}
