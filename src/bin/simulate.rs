use clap::Parser;
use drift_tournament_server::engine::TournamentEngine;
use drift_tournament_server::error::Result;
use drift_tournament_server::rules::round_score;
use drift_tournament_server::types::{
    BattleScoreInput, BattleStatus, ClassificationId, ClassificationStandings, CompetitionId,
    CompetitionStatus, DriverId, JudgeId, QualifyingScoreInput,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

const MAX_SCORING_PASSES: usize = 200;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 8)]
    drivers: u32,
    #[arg(long, default_value_t = 3)]
    judges: u32,
    #[arg(long, default_value_t = 3)]
    competitions: u32,
    #[arg(long)]
    seed: Option<u64>,
    /// Chance that a scored round ends in an exact tie.
    #[arg(long, default_value_t = 0.1)]
    tie_rate: f64,
    #[arg(long)]
    classification_closed: bool,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug)]
struct SimSetup {
    classification_id: ClassificationId,
    drivers: Vec<DriverId>,
    judges: Vec<JudgeId>,
    tie_rate: f64,
}

#[derive(Clone, Debug, Serialize)]
struct CompetitionResultLine {
    competition_id: CompetitionId,
    name: String,
    seed: u64,
    status: CompetitionStatus,
    battles: usize,
    injected_ties: u32,
    overtime_rounds: u32,
    champion_number: Option<u32>,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    competition_count: usize,
    anomaly_count: usize,
    overtime_rounds: u32,
    competitions: Vec<CompetitionResultLine>,
    classification: Option<ClassificationStandings>,
}

#[derive(Default)]
struct AnomalyLog {
    messages: Vec<String>,
    seen: HashSet<String>,
    total: usize,
}

impl AnomalyLog {
    fn push(&mut self, message: String) {
        self.total += 1;
        tracing::warn!(%message, "anomaly detected");
        if self.seen.insert(message.clone()) {
            self.messages.push(message);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("simulate=info,drift_tournament_server=warn")),
        )
        .init();

    let cli = Cli::parse();
    let started_at_ms = now_ms();
    let seed = cli.seed.unwrap_or(started_at_ms);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed, started_at_ms));
    let mut rng = StdRng::seed_from_u64(seed);
    let mut engine = TournamentEngine::new();

    tracing::info!(
        %run_id,
        seed,
        drivers = cli.drivers,
        judges = cli.judges,
        competitions = cli.competitions,
        "simulation started"
    );

    let setup = match build_setup(&mut engine, &cli, seed) {
        Ok(setup) => setup,
        Err(error) => {
            tracing::error!(%error, "failed to register simulation entities");
            std::process::exit(2);
        }
    };

    let mut results = Vec::new();
    for round in 1..=cli.competitions {
        let result = run_competition(&mut engine, &mut rng, &setup, &format!("Round {round}"), seed);
        println!(
            "{}",
            serde_json::to_string(&result).unwrap_or_else(|error| format!(
                "{{\"error\":\"failed to encode result: {error}\"}}"
            ))
        );
        results.push(result);
    }

    if cli.classification_closed {
        if let Err(error) = engine.close_classification(setup.classification_id) {
            tracing::error!(%error, "failed to close classification");
        }
    }
    let classification = match engine.classification_standings(setup.classification_id) {
        Ok(standings) => Some(standings),
        Err(error) => {
            tracing::error!(%error, "failed to build classification standings");
            None
        }
    };

    let summary = build_run_summary(run_id.clone(), started_at_ms, now_ms(), results, classification);
    let has_anomaly = summary.anomaly_count > 0;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            tracing::error!(path = %path.display(), %error, "summary write failed");
            std::process::exit(2);
        }
    }
    tracing::info!(
        %run_id,
        competitions = summary.competition_count,
        anomalies = summary.anomaly_count,
        overtime_rounds = summary.overtime_rounds,
        "simulation finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn build_setup(engine: &mut TournamentEngine, cli: &Cli, seed: u64) -> Result<SimSetup> {
    let classification_id = engine
        .create_classification(&format!("Simulated Series {seed}"))?
        .id;
    let mut drivers = Vec::new();
    for number in 1..=cli.drivers {
        drivers.push(engine.create_driver(&format!("Driver {number:02}"), number)?.id);
    }
    let mut judges = Vec::new();
    for idx in 1..=cli.judges {
        judges.push(engine.create_judge(&format!("Judge {idx}"))?.id);
    }
    Ok(SimSetup {
        classification_id,
        drivers,
        judges,
        tie_rate: cli.tie_rate.clamp(0.0, 1.0),
    })
}

fn run_competition(
    engine: &mut TournamentEngine,
    rng: &mut StdRng,
    setup: &SimSetup,
    name: &str,
    seed: u64,
) -> CompetitionResultLine {
    let mut anomalies = AnomalyLog::default();
    let mut injected_ties = 0;

    let competition_id = match prepare_competition(engine, rng, setup, name) {
        Ok(competition_id) => competition_id,
        Err(error) => {
            anomalies.push(format!("competition setup rejected: {error}"));
            return CompetitionResultLine {
                competition_id: 0,
                name: name.to_string(),
                seed,
                status: CompetitionStatus::Qualifying,
                battles: 0,
                injected_ties,
                overtime_rounds: 0,
                champion_number: None,
                anomalies: anomalies.messages,
            };
        }
    };
    tracing::info!(competition_id, name, "tournament started");

    let mut passes = 0;
    loop {
        let pending: Vec<_> = match engine.list_battles(competition_id, None) {
            Ok(battles) => battles
                .into_iter()
                .filter(|battle| battle.status == BattleStatus::Pending)
                .collect(),
            Err(error) => {
                anomalies.push(format!("battle listing failed: {error}"));
                break;
            }
        };
        if pending.is_empty() {
            break;
        }
        passes += 1;
        if passes > MAX_SCORING_PASSES {
            anomalies.push("scoring pass limit exceeded".to_string());
            break;
        }
        for battle in pending {
            let tie = rng.random_bool(setup.tie_rate);
            if tie {
                injected_ties += 1;
            }
            let driver1_points = if tie {
                5.0
            } else if rng.random_bool(0.5) {
                round_score(rng.random_range(5.5..=8.0))
            } else {
                round_score(rng.random_range(2.0..=4.5))
            };
            if let Err(error) = score_round(
                engine,
                battle.id,
                battle.next_required_omt_round,
                driver1_points,
                &setup.judges,
            ) {
                anomalies.push(format!("battle {} score rejected: {error}", battle.id));
            }
        }
    }

    let overtime_rounds = check_completed_competition(engine, competition_id, setup, &mut anomalies);
    if overtime_rounds != injected_ties {
        anomalies.push(format!(
            "overtime mismatch: {injected_ties} ties injected, {overtime_rounds} overtime rounds played"
        ));
    }

    let (status, battles) = match (
        engine.competition_summary(competition_id),
        engine.list_battles(competition_id, None),
    ) {
        (Ok(summary), Ok(battles)) => (summary.status, battles.len()),
        _ => (CompetitionStatus::Tournament, 0),
    };
    let champion_number = engine
        .competition_standings(competition_id)
        .ok()
        .and_then(|standings| {
            standings
                .standings
                .into_iter()
                .find(|row| row.final_place == Some(1))
                .map(|row| row.driver_number)
        });

    CompetitionResultLine {
        competition_id,
        name: name.to_string(),
        seed,
        status,
        battles,
        injected_ties,
        overtime_rounds,
        champion_number,
        anomalies: anomalies.messages,
    }
}

fn prepare_competition(
    engine: &mut TournamentEngine,
    rng: &mut StdRng,
    setup: &SimSetup,
    name: &str,
) -> Result<CompetitionId> {
    let competition_id = engine.create_competition(setup.classification_id, name)?.id;
    engine.register_drivers(competition_id, &setup.drivers)?;
    engine.assign_judges(competition_id, &setup.judges)?;
    for &driver_id in &setup.drivers {
        for &judge_id in &setup.judges {
            for run_number in 1..=2 {
                engine.submit_qualifying_score(
                    competition_id,
                    QualifyingScoreInput {
                        driver_id,
                        judge_id,
                        run_number,
                        score: round_score(rng.random_range(55.0..=99.0)),
                    },
                )?;
            }
        }
    }
    engine.start_tournament(competition_id)?;
    Ok(competition_id)
}

/// Every judge gives both runs the same split.
fn score_round(
    engine: &mut TournamentEngine,
    battle_id: u64,
    omt_round: u32,
    driver1_points: f64,
    judges: &[JudgeId],
) -> Result<()> {
    for &judge_id in judges {
        for run_number in 1..=2 {
            engine.submit_battle_score(
                battle_id,
                BattleScoreInput {
                    judge_id,
                    omt_round,
                    run_number,
                    driver1_points,
                    driver2_points: round_score(10.0 - driver1_points),
                },
            )?;
        }
    }
    Ok(())
}

/// Returns the number of overtime rounds played across all battles.
fn check_completed_competition(
    engine: &TournamentEngine,
    competition_id: CompetitionId,
    setup: &SimSetup,
    anomalies: &mut AnomalyLog,
) -> u32 {
    match engine.competition_summary(competition_id) {
        Ok(summary) if summary.status != CompetitionStatus::Completed => {
            anomalies.push(format!("competition ended in status {}", summary.status.as_str()));
        }
        Ok(_) => {}
        Err(error) => anomalies.push(format!("competition lookup failed: {error}")),
    }

    match engine.competition_standings(competition_id) {
        Ok(standings) => {
            let places: Vec<u32> = standings
                .standings
                .iter()
                .filter_map(|row| row.final_place)
                .collect();
            if places.len() != setup.drivers.len() {
                anomalies.push(format!(
                    "missing placements: {} of {} drivers placed",
                    places.len(),
                    setup.drivers.len()
                ));
            }
            let unique: BTreeSet<u32> = places.iter().copied().collect();
            if unique.len() != places.len() {
                anomalies.push("duplicate placements".to_string());
            }
            for row in &standings.standings {
                if row.total_points != round_score(row.competition_points + row.qualifying_points) {
                    anomalies.push(format!(
                        "points mismatch for driver {}",
                        row.driver_number
                    ));
                }
            }
        }
        Err(error) => anomalies.push(format!("standings failed: {error}")),
    }

    engine
        .list_battles(competition_id, None)
        .map(|battles| battles.iter().map(|battle| battle.current_omt_round).sum())
        .unwrap_or(0)
}

fn default_run_id(seed: u64, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    competitions: Vec<CompetitionResultLine>,
    classification: Option<ClassificationStandings>,
) -> RunSummary {
    let anomaly_count = competitions
        .iter()
        .map(|competition| competition.anomalies.len())
        .sum();
    let overtime_rounds = competitions
        .iter()
        .map(|competition| competition.overtime_rounds)
        .sum();
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        competition_count: competitions.len(),
        anomaly_count,
        overtime_rounds,
        competitions,
        classification,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}
