use super::*;

/// Per-run judge averages for one round of a battle.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct RoundAverages {
    run1_driver1: f64,
    run1_driver2: f64,
    run2_driver1: f64,
    run2_driver2: f64,
    complete: bool,
}

impl RoundAverages {
    fn resolve(&self) -> RoundResolution {
        resolve_two_run_round(
            self.run1_driver1,
            self.run1_driver2,
            self.run2_driver1,
            self.run2_driver2,
        )
    }

    /// `None` unless every assigned judge has scored both runs.
    fn resolution(&self) -> Option<RoundResolution> {
        self.complete.then(|| self.resolve())
    }
}

impl TournamentEngine {
    pub(super) fn round_averages(&self, battle: &Battle, omt_round: u32) -> RoundAverages {
        let judges_needed = self.store.judge_ids_for(battle.competition_id).len();
        let rows = self.store.run_scores_for(battle.id, omt_round);
        if rows.is_empty() || judges_needed == 0 {
            return RoundAverages::default();
        }

        let run1: Vec<_> = rows.iter().filter(|row| row.run_number == 1).collect();
        let run2: Vec<_> = rows.iter().filter(|row| row.run_number == 2).collect();
        if run1.len() != judges_needed || run2.len() != judges_needed {
            return RoundAverages::default();
        }

        RoundAverages {
            run1_driver1: average(run1.iter().map(|row| row.driver1_points)),
            run1_driver2: average(run1.iter().map(|row| row.driver2_points)),
            run2_driver1: average(run2.iter().map(|row| row.driver1_points)),
            run2_driver2: average(run2.iter().map(|row| row.driver2_points)),
            complete: true,
        }
    }

    /// Highest round a judge may score right now.
    fn max_open_round(&self, battle: &Battle) -> u32 {
        let current = self.store.current_omt_round(battle.id);
        match self.round_averages(battle, current).resolution() {
            Some(resolution) if resolution.winner.is_none() => current + 1,
            _ => current,
        }
    }

    /// Round-level scores of the round that decided the battle; earlier tied
    /// rounds never count. `(0, 0)` while the battle is pending.
    pub(super) fn decisive_round_scores(&self, battle: &Battle) -> (f64, f64) {
        if !battle.is_completed() {
            return (0.0, 0.0);
        }
        let current = self.store.current_omt_round(battle.id);
        (0..=current)
            .rev()
            .filter_map(|omt_round| self.round_averages(battle, omt_round).resolution())
            .find(|resolution| resolution.winner.is_some())
            .map(|resolution| (resolution.driver1_round_score, resolution.driver2_round_score))
            .unwrap_or((0.0, 0.0))
    }

    pub(super) fn apply_battle_score(
        &mut self,
        battle_id: BattleId,
        input: BattleScoreInput,
    ) -> Result<BattleScoreResult> {
        let battle = self.store.battle(battle_id)?.clone();
        if battle.is_completed() {
            return Err(TournamentError::state("Battle already completed"));
        }
        if !(1..=RUNS_PER_ROUND).contains(&input.run_number) {
            return Err(TournamentError::validation("Run number must be 1 or 2"));
        }
        for points in [input.driver1_points, input.driver2_points] {
            if !points.is_finite() || !(0.0..=MAX_BATTLE_POINTS).contains(&points) {
                return Err(TournamentError::validation(format!(
                    "Judge points must be between 0 and {MAX_BATTLE_POINTS}"
                )));
            }
        }
        let driver1_points = round_score(input.driver1_points);
        let driver2_points = round_score(input.driver2_points);
        if ((driver1_points + driver2_points) - BATTLE_POINTS_TOTAL).abs() > SCORE_EPSILON {
            return Err(TournamentError::validation(
                "Judge points must sum to exactly 10",
            ));
        }
        if !self.store.judge_ids_for(battle.competition_id).contains(&input.judge_id) {
            return Err(TournamentError::validation(
                "Judge not assigned to battle competition",
            ));
        }

        let max_allowed = self.max_open_round(&battle);
        if input.omt_round > max_allowed {
            return Err(TournamentError::state(format!(
                "OMT round {} is not open yet. Next available is {max_allowed}",
                input.omt_round
            )));
        }

        self.store.upsert_run_score(
            battle_id,
            input.omt_round,
            input.run_number,
            input.judge_id,
            driver1_points,
            driver2_points,
        );
        tracing::debug!(
            battle_id,
            judge_id = input.judge_id,
            omt_round = input.omt_round,
            run = input.run_number,
            driver1_points,
            driver2_points,
            "battle run score stored"
        );

        if let Some(resolution) = self.round_averages(&battle, input.omt_round).resolution() {
            match resolution.winner {
                Some(slot) => {
                    let (winner_id, loser_id) = match slot {
                        BattleSlot::Driver1 => (battle.driver1_id, battle.driver2_id),
                        BattleSlot::Driver2 => (battle.driver2_id, battle.driver1_id),
                    };
                    let stored = self.store.battle_mut(battle_id)?;
                    stored.winner_id = Some(winner_id);
                    stored.loser_id = Some(loser_id);
                    stored.status = BattleStatus::Completed;
                    tracing::debug!(
                        battle_id,
                        winner_id,
                        omt_round = input.omt_round,
                        "battle decided"
                    );
                }
                None => {
                    tracing::debug!(
                        battle_id,
                        omt_round = input.omt_round,
                        "round tied, next overtime round open"
                    );
                }
            }
        }

        let progression = self.apply_progression(battle.competition_id)?;
        Ok(BattleScoreResult {
            battle: self.battle_view(battle_id)?,
            progression,
        })
    }

    pub fn battle_view(&self, battle_id: BattleId) -> Result<BattleView> {
        let battle = self.store.battle(battle_id)?;
        Ok(self.view_of(battle))
    }

    pub(super) fn view_of(&self, battle: &Battle) -> BattleView {
        let current_omt_round = self.store.current_omt_round(battle.id);
        let tied = self
            .round_averages(battle, current_omt_round)
            .resolution()
            .is_some_and(|resolution| resolution.winner.is_none());
        let next_required_omt_round = if tied && !battle.is_completed() {
            current_omt_round + 1
        } else {
            current_omt_round
        };

        BattleView {
            id: battle.id,
            competition_id: battle.competition_id,
            stage: battle.stage,
            group: battle.group,
            order_index: battle.order_index,
            driver1_id: battle.driver1_id,
            driver2_id: battle.driver2_id,
            status: battle.status,
            winner_id: battle.winner_id,
            loser_id: battle.loser_id,
            current_omt_round,
            next_required_omt_round,
        }
    }
}
