use naval_p2p::{init_logging, simulate};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!("Usage: {} <seed> [peers] [max_frames]", args[0]);
        std::process::exit(1);
    }
    let seed: u64 = args[1].parse()?;
    let peers: usize = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(2);
    let max_frames: u64 = args.get(3).map(|s| s.parse()).transpose()?.unwrap_or(200_000);
    init_logging(Some(log::LevelFilter::Warn));

    let report = simulate(peers, seed, 0.5, max_frames)?;
    let winner = match report.survivors.as_slice() {
        [only] => Some(only.to_string()),
        _ => None,
    };

    let result = json!({
        "seed": report.seed,
        "frames": report.frames,
        "simulated_secs": report.simulated_secs,
        "winner": winner,
        "peers": report.peers,
    });

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
