use super::*;

#[derive(Default)]
struct RunScores {
    run1: Vec<f64>,
    run2: Vec<f64>,
}

fn run_average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(round_score(average(values.iter().copied())))
}

impl TournamentEngine {
    pub(super) fn apply_qualifying_score(
        &mut self,
        competition_id: CompetitionId,
        input: QualifyingScoreInput,
    ) -> Result<()> {
        let competition = self.store.competition(competition_id)?;
        if competition.status != CompetitionStatus::Qualifying {
            return Err(TournamentError::state(
                "Qualifying scores can only be submitted before tournament starts",
            ));
        }
        if !(1..=RUNS_PER_ROUND).contains(&input.run_number) {
            return Err(TournamentError::validation("Run number must be 1 or 2"));
        }
        if !input.score.is_finite() || input.score < 0.0 || input.score > MAX_QUALIFYING_SCORE {
            return Err(TournamentError::validation(format!(
                "Qualifying score must be between 0 and {MAX_QUALIFYING_SCORE}"
            )));
        }
        if !self.store.driver_ids_for(competition_id).contains(&input.driver_id) {
            return Err(TournamentError::validation(
                "Driver is not registered in this competition",
            ));
        }
        if !self.store.judge_ids_for(competition_id).contains(&input.judge_id) {
            return Err(TournamentError::validation(
                "Judge is not assigned to this competition",
            ));
        }

        let score = round_score(input.score);
        self.store.upsert_qualifying_score(
            competition_id,
            input.driver_id,
            input.judge_id,
            input.run_number,
            score,
        );
        tracing::debug!(
            competition_id,
            driver_id = input.driver_id,
            judge_id = input.judge_id,
            run = input.run_number,
            score,
            "qualifying score stored"
        );
        Ok(())
    }

    /// Best-run leaderboard: a driver's qualifying score is the better of the
    /// two run averages, never their mean.
    pub fn qualifying_leaderboard(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Vec<LeaderboardRow>> {
        self.store.competition(competition_id)?;
        let judge_count = self.store.judge_ids_for(competition_id).len();

        let mut by_driver: BTreeMap<DriverId, RunScores> = BTreeMap::new();
        for row in self.store.qualifying_scores_for(competition_id) {
            let runs = by_driver.entry(row.driver_id).or_default();
            match row.run_number {
                1 => runs.run1.push(row.score),
                2 => runs.run2.push(row.score),
                _ => {}
            }
        }

        let mut rows = Vec::new();
        for entry in self.store.entries_for(competition_id) {
            let driver = self.store.driver(entry.driver_id)?;
            let empty = RunScores::default();
            let runs = by_driver.get(&entry.driver_id).unwrap_or(&empty);

            let run1_avg = run_average(&runs.run1);
            let run2_avg = run_average(&runs.run2);
            let (qualifying_score, second_best_run) = match (run1_avg, run2_avg) {
                (Some(a), Some(b)) => (a.max(b), a.min(b)),
                (Some(a), None) | (None, Some(a)) => (a, 0.0),
                (None, None) => (0.0, 0.0),
            };
            let is_complete =
                judge_count > 0 && runs.run1.len() == judge_count && runs.run2.len() == judge_count;

            rows.push(LeaderboardRow {
                driver_id: driver.id,
                driver_name: driver.name.clone(),
                driver_number: driver.number,
                run1_avg: run1_avg.unwrap_or(0.0),
                run2_avg: run2_avg.unwrap_or(0.0),
                qualifying_score: round_score(qualifying_score),
                second_best_run: round_score(second_best_run),
                is_complete,
                rank: 0,
            });
        }

        rows.sort_by(|a, b| {
            cmp_desc_f64(a.qualifying_score, b.qualifying_score)
                .then_with(|| cmp_desc_f64(a.second_best_run, b.second_best_run))
                .then_with(|| cmp_desc_f64(a.run2_avg, b.run2_avg))
                .then_with(|| cmp_desc_f64(a.run1_avg, b.run1_avg))
                .then_with(|| a.driver_number.cmp(&b.driver_number))
        });
        for (idx, row) in rows.iter_mut().enumerate() {
            row.rank = idx as u32 + 1;
        }
        Ok(rows)
    }

    pub fn is_qualifying_complete(&self, competition_id: CompetitionId) -> Result<bool> {
        self.store.competition(competition_id)?;
        if self.store.judge_ids_for(competition_id).is_empty() {
            return Ok(false);
        }
        let leaderboard = self.qualifying_leaderboard(competition_id)?;
        if leaderboard.is_empty() {
            return Ok(false);
        }
        Ok(leaderboard.iter().all(|row| row.is_complete))
    }
}
