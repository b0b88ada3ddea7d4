use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{
    competition_points_for_place, qualifying_bonus_for_rank, BATTLE_POINTS_TOTAL,
    FIRST_NON_PODIUM_PLACE, MAX_BATTLE_POINTS, MAX_NAME_LEN, MAX_QUALIFYING_SCORE,
    MIN_DRIVERS_TO_START, MIN_GROUP_SIZE, RUNS_PER_ROUND, SCORE_EPSILON, UNRANKED,
};
use crate::error::{Result, TournamentError};
use crate::rules::{
    assign_groups_alternating, average, build_round_robin_pairs, cmp_desc_f64,
    order_battles_avoid_consecutive, resolve_two_run_round, round_score,
    total_after_drop_lowest_once, BattleSlot, RoundResolution,
};
use crate::store::TournamentStore;
use crate::types::{
    AssignmentResult, Battle, BattleId, BattleScoreInput, BattleScoreResult, BattleStatus,
    BattleView, Classification, ClassificationId, ClassificationStandingRow,
    ClassificationStandings, CompetitionBreakdownItem, CompetitionDriverView, CompetitionId,
    CompetitionStandingRow, CompetitionStandings, CompetitionStatus, CompetitionSummary, Driver,
    DriverId, GroupName, GroupStandingRow, Judge, JudgeId, LeaderboardRow, Notification,
    ProgressionOutcome, QualifyingScoreInput, Stage, TournamentStartResult,
};

mod battle;
mod bracket;
mod notify;
mod progression;
mod qualifying;
mod registry;
mod standings;

/// Rules engine over one entity arena.
///
/// Every command runs inside [`TournamentEngine::transact`]: it is applied to
/// a draft copy and only swapped in when it succeeds, so a rejected command
/// leaves no partial mutation behind. Queries borrow the committed state.
#[derive(Clone, Debug, Default)]
pub struct TournamentEngine {
    store: TournamentStore,
}

impl TournamentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: TournamentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TournamentStore {
        &self.store
    }

    fn transact<T>(&mut self, apply: impl FnOnce(&mut TournamentEngine) -> Result<T>) -> Result<T> {
        let mut draft = self.clone();
        let value = apply(&mut draft)?;
        *self = draft;
        Ok(value)
    }

    pub fn create_classification(&mut self, name: &str) -> Result<Classification> {
        self.transact(|engine| engine.apply_create_classification(name))
    }

    pub fn close_classification(&mut self, classification_id: ClassificationId) -> Result<Classification> {
        self.transact(|engine| engine.apply_close_classification(classification_id))
    }

    pub fn create_competition(
        &mut self,
        classification_id: ClassificationId,
        name: &str,
    ) -> Result<CompetitionSummary> {
        self.transact(|engine| engine.apply_create_competition(classification_id, name))
    }

    pub fn create_driver(&mut self, name: &str, number: u32) -> Result<Driver> {
        self.transact(|engine| engine.apply_create_driver(name, number))
    }

    pub fn create_judge(&mut self, name: &str) -> Result<Judge> {
        self.transact(|engine| engine.apply_create_judge(name))
    }

    pub fn register_drivers(
        &mut self,
        competition_id: CompetitionId,
        driver_ids: &[DriverId],
    ) -> Result<AssignmentResult> {
        self.transact(|engine| engine.apply_register_drivers(competition_id, driver_ids))
    }

    pub fn assign_judges(
        &mut self,
        competition_id: CompetitionId,
        judge_ids: &[JudgeId],
    ) -> Result<AssignmentResult> {
        self.transact(|engine| engine.apply_assign_judges(competition_id, judge_ids))
    }

    /// Upserts one judge's run score and returns the recomputed leaderboard.
    pub fn submit_qualifying_score(
        &mut self,
        competition_id: CompetitionId,
        input: QualifyingScoreInput,
    ) -> Result<Vec<LeaderboardRow>> {
        self.transact(|engine| {
            engine.apply_qualifying_score(competition_id, input)?;
            engine.qualifying_leaderboard(competition_id)
        })
    }

    pub fn start_tournament(&mut self, competition_id: CompetitionId) -> Result<TournamentStartResult> {
        self.transact(|engine| engine.apply_start_tournament(competition_id))
    }

    pub fn submit_battle_score(
        &mut self,
        battle_id: BattleId,
        input: BattleScoreInput,
    ) -> Result<BattleScoreResult> {
        self.transact(|engine| engine.apply_battle_score(battle_id, input))
    }

    /// Safe to poll: unmet preconditions are reported as `false` flags.
    pub fn progress_competition(&mut self, competition_id: CompetitionId) -> Result<ProgressionOutcome> {
        self.transact(|engine| engine.apply_progression(competition_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) struct Fixture {
        pub engine: TournamentEngine,
        pub classification_id: ClassificationId,
        pub competition_id: CompetitionId,
        pub drivers: Vec<DriverId>,
        pub judges: Vec<JudgeId>,
    }

    /// Classification with one competition, `driver_count` drivers numbered
    /// 1.. and `judge_count` judges, all registered.
    pub(super) fn fixture(driver_count: u32, judge_count: u32) -> Fixture {
        let mut engine = TournamentEngine::new();
        let classification_id = engine
            .create_classification("Series 2026")
            .expect("classification")
            .id;
        let competition_id = engine
            .create_competition(classification_id, "Round 1")
            .expect("competition")
            .id;
        let drivers: Vec<DriverId> = (1..=driver_count)
            .map(|number| {
                engine
                    .create_driver(&format!("Driver {number}"), number)
                    .expect("driver")
                    .id
            })
            .collect();
        let judges: Vec<JudgeId> = (1..=judge_count)
            .map(|idx| engine.create_judge(&format!("Judge {idx}")).expect("judge").id)
            .collect();
        if !drivers.is_empty() {
            engine
                .register_drivers(competition_id, &drivers)
                .expect("register drivers");
        }
        if !judges.is_empty() {
            engine
                .assign_judges(competition_id, &judges)
                .expect("assign judges");
        }
        Fixture {
            engine,
            classification_id,
            competition_id,
            drivers,
            judges,
        }
    }

    impl Fixture {
        /// Every judge gives both runs the same score; scores descend with
        /// driver order so qualifying rank equals car number.
        pub fn complete_qualifying(&mut self) {
            let mut score = 90.0;
            for driver_id in self.drivers.clone() {
                for judge_id in self.judges.clone() {
                    for run_number in 1..=2 {
                        self.engine
                            .submit_qualifying_score(
                                self.competition_id,
                                QualifyingScoreInput {
                                    driver_id,
                                    judge_id,
                                    run_number,
                                    score,
                                },
                            )
                            .expect("qualifying score");
                    }
                }
                score -= 5.0;
            }
        }

        pub fn score_round(
            &mut self,
            battle_id: BattleId,
            omt_round: u32,
            driver1_points: f64,
        ) -> BattleScoreResult {
            let mut last = None;
            for judge_id in self.judges.clone() {
                for run_number in 1..=2 {
                    last = Some(
                        self.engine
                            .submit_battle_score(
                                battle_id,
                                BattleScoreInput {
                                    judge_id,
                                    omt_round,
                                    run_number,
                                    driver1_points,
                                    driver2_points: 10.0 - driver1_points,
                                },
                            )
                            .expect("battle score"),
                    );
                }
            }
            last.expect("at least one judge")
        }

        pub fn pending_battles(&self) -> Vec<BattleView> {
            self.engine
                .list_battles(self.competition_id, None)
                .expect("battles")
                .into_iter()
                .filter(|battle| battle.status == BattleStatus::Pending)
                .collect()
        }

        /// Scores every pending battle 6/4 for driver 1 until none remain.
        pub fn run_to_completion(&mut self) {
            for _ in 0..8 {
                let pending = self.pending_battles();
                if pending.is_empty() {
                    break;
                }
                for battle in pending {
                    self.score_round(battle.id, 0, 6.0);
                }
            }
        }
    }

    #[test]
    fn four_driver_competition_runs_to_completion() {
        let mut fx = fixture(4, 2);
        fx.complete_qualifying();
        let start = fx.engine.start_tournament(fx.competition_id).expect("start");
        assert_eq!(start.created_group_battles, 2);

        fx.run_to_completion();

        let standings = fx
            .engine
            .competition_standings(fx.competition_id)
            .expect("standings");
        assert_eq!(standings.status, CompetitionStatus::Completed);
        let mut places: Vec<u32> = standings
            .standings
            .iter()
            .filter_map(|row| row.final_place)
            .collect();
        places.sort();
        assert_eq!(places, vec![1, 2, 3, 4]);

        let battles = fx.engine.list_battles(fx.competition_id, None).expect("battles");
        assert_eq!(battles.len(), 6);
        assert!(battles.iter().all(|battle| battle.current_omt_round == 0));
    }

    #[test]
    fn rejected_command_leaves_state_untouched() {
        let mut fx = fixture(4, 2);
        let before = fx.engine.qualifying_leaderboard(fx.competition_id).expect("board");
        let error = fx
            .engine
            .submit_qualifying_score(
                fx.competition_id,
                QualifyingScoreInput {
                    driver_id: fx.drivers[0],
                    judge_id: 999,
                    run_number: 1,
                    score: 80.0,
                },
            )
            .expect_err("unknown judge");
        assert_eq!(error.kind(), "validation_error");
        let after = fx.engine.qualifying_leaderboard(fx.competition_id).expect("board");
        assert_eq!(before, after);
        assert!(fx.engine.store().qualifying_scores_for(fx.competition_id).is_empty());
    }

    #[test]
    fn progression_is_idempotent_once_applied() {
        let mut fx = fixture(4, 1);
        fx.complete_qualifying();
        fx.engine.start_tournament(fx.competition_id).expect("start");
        let group_battles = fx.pending_battles();
        for battle in &group_battles[..group_battles.len() - 1] {
            fx.score_round(battle.id, 0, 6.0);
        }
        let last = fx.score_round(group_battles[group_battles.len() - 1].id, 0, 6.0);
        assert!(last.progression.created_semifinals);

        for _ in 0..3 {
            let outcome = fx
                .engine
                .progress_competition(fx.competition_id)
                .expect("progress");
            assert_eq!(outcome, ProgressionOutcome::default());
        }
        let semis = fx
            .engine
            .list_battles(fx.competition_id, Some(Stage::Semifinal))
            .expect("semis");
        assert_eq!(semis.len(), 2);
    }

    #[test]
    fn progress_on_unknown_competition_is_not_found() {
        let mut engine = TournamentEngine::new();
        let error = engine.progress_competition(7).expect_err("missing");
        assert_eq!(error.kind(), "not_found");
    }
}
