use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use naval_p2p::cli::{place_fleet, CliFrontend, StdinLines};
use naval_p2p::{init_logging, run, simulate, BoardModel, Intent, Session, SessionConfig};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); defaults to $NAVAL_LOG or info.
    #[arg(long, global = true)]
    log_level: Option<LevelFilter>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Join the match on the local network.
    Play {
        /// JSON file with session settings; flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        udp_port: Option<u16>,
        #[arg(long)]
        ack_port: Option<u16>,
        #[arg(long)]
        broadcast: Option<IpAddr>,
        /// Skip outbound-route detection and use this address as our identity.
        #[arg(long)]
        local_ip: Option<IpAddr>,
        #[arg(long)]
        countdown: Option<f32>,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
        /// Place the fleet at random instead of interactively.
        #[arg(long)]
        randomize: bool,
        /// Start with auto-fire on.
        #[arg(long)]
        auto_fire: bool,
        /// Do not print roster updates.
        #[arg(long)]
        no_roster: bool,
    },
    /// Run a headless match between simulated peers and print the summary.
    Local {
        #[arg(long, default_value_t = 2)]
        peers: usize,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
        #[arg(long, default_value_t = 200_000)]
        max_frames: u64,
    },
}

fn seeded_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => SmallRng::from_rng(&mut rand::rng()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Commands::Local {
            peers,
            seed,
            max_frames,
        } => {
            let seed = seed.unwrap_or_else(rand::random);
            println!("Simulating {} peers with seed {}...", peers, seed);
            let report = simulate(peers, seed, 0.5, max_frames)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Play {
            config,
            udp_port,
            ack_port,
            broadcast,
            local_ip,
            countdown,
            seed,
            randomize,
            auto_fire,
            no_roster,
        } => {
            let mut settings = match config {
                Some(path) => SessionConfig::from_json_file(&path)?,
                None => SessionConfig::default(),
            };
            settings.udp_port = udp_port.unwrap_or(settings.udp_port);
            settings.ack_port = ack_port.unwrap_or(settings.ack_port);
            settings.broadcast_addr = broadcast.unwrap_or(settings.broadcast_addr);
            settings.local_ip = local_ip.or(settings.local_ip);
            settings.countdown_secs = countdown.unwrap_or(settings.countdown_secs);
            settings.roster_view &= !no_roster;
            if let Some(s) = seed {
                println!("Using fixed seed: {} (game will be reproducible)", s);
            }

            let mut lines = StdinLines::spawn();
            let mut board = BoardModel::new();
            if randomize {
                board.randomize(seed)?;
                println!("{}", naval_p2p::cli::render_board(&board, None));
            } else if !place_fleet(&mut board, &mut lines).await {
                println!("Leaving before the match started.");
                return Ok(());
            }

            let mut session = Session::bind(&settings, board, seeded_rng(seed.map(|s| s.wrapping_add(1))))?;
            if settings.roster_view {
                session.spawn_roster_view(|text| println!("{}", text));
            }
            if auto_fire {
                session.apply(Intent::ToggleAutoFire)?;
            }
            println!("{}", naval_p2p::cli::GAME_HELP);
            let mut frontend = CliFrontend::new(lines);
            run(&mut session, &mut frontend, settings.frame_interval()).await?;
            println!("{}", naval_p2p::cli::render_score(&session.engine().score()));
        }
    }
    Ok(())
}
