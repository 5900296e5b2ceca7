//! Runs battles from JSON files through the combat service.
//!
//! ```text
//! skirmish-sim --content demos/content.json --battle demos/battle.json --repeat 20 --summary
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use skirmish_core::{Camp, SceneOutcome};
use skirmish_service::{init_tracing, CombatService, ServiceConfig, StartCombat};

#[derive(Parser, Debug)]
#[command(name = "skirmish-sim", about = "Run Skirmish battles from JSON files")]
struct Cli {
    /// Service configuration file (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Content file (JSON). Overrides the configured content path.
    #[arg(long)]
    content: Option<PathBuf>,

    /// Battle request file (JSON).
    #[arg(long)]
    battle: PathBuf,

    /// Number of battles to run; scene ids and seeds count up from the request.
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Print one summary line per battle instead of the full JSON result.
    #[arg(long)]
    summary: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log).map_err(|err| anyhow::anyhow!(err))?;

    let mut config = ServiceConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(content) = cli.content {
        config.content_path = Some(content);
    }
    let service = CombatService::from_config(&config).context("starting combat service")?;

    let text = std::fs::read_to_string(&cli.battle)
        .with_context(|| format!("reading {}", cli.battle.display()))?;
    let request: StartCombat =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", cli.battle.display()))?;

    let mut attacker_wins = 0;
    for round in 0..cli.repeat {
        let mut battle = request.clone();
        battle.scene_id += u64::from(round);
        battle.seed = request.seed.map(|seed| seed.wrapping_add(u64::from(round)));

        let reply = service
            .start_combat(battle)
            .await
            .with_context(|| format!("battle {round}"))?;
        let result = &reply.result;
        if result.attacker_win {
            attacker_wins += 1;
        }

        if cli.summary {
            let outcome = match result.outcome {
                SceneOutcome::Victory(Camp::Attacker) => "attacker victory".to_string(),
                SceneOutcome::Victory(Camp::Defender) => "defender victory".to_string(),
                ref other => format!("{other:?}").to_lowercase(),
            };
            println!(
                "scene {:>6}  seed {:>20}  {:<16}  {:>4} ticks  {:>6} ms  dmg {}/{}",
                reply.scene_id,
                result.meta.seed,
                outcome,
                result.ticks,
                result.elapsed_ms,
                result.damage_dealt(Camp::Attacker),
                result.damage_dealt(Camp::Defender),
            );
        } else {
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
    }

    if cli.summary && cli.repeat > 1 {
        println!("attacker won {attacker_wins}/{}", cli.repeat);
    }
    service.shutdown().await;
    Ok(())
}
