use super::*;

impl TournamentEngine {
    pub(super) fn apply_start_tournament(
        &mut self,
        competition_id: CompetitionId,
    ) -> Result<TournamentStartResult> {
        match self.store.competition(competition_id)?.status {
            CompetitionStatus::Completed => {
                return Err(TournamentError::state("Competition already completed"));
            }
            CompetitionStatus::Tournament => {
                return Err(TournamentError::state("Tournament already started"));
            }
            CompetitionStatus::Qualifying => {}
        }

        let leaderboard = self.qualifying_leaderboard(competition_id)?;
        if leaderboard.len() < MIN_DRIVERS_TO_START {
            return Err(TournamentError::validation(format!(
                "At least {MIN_DRIVERS_TO_START} drivers are required to start tournament"
            )));
        }
        if !leaderboard.iter().all(|row| row.is_complete) {
            return Err(TournamentError::validation("Qualifying is not complete"));
        }

        let ordered: Vec<DriverId> = leaderboard.iter().map(|row| row.driver_id).collect();
        let groups = assign_groups_alternating(&ordered);
        if groups.a.len() < MIN_GROUP_SIZE || groups.b.len() < MIN_GROUP_SIZE {
            return Err(TournamentError::validation(format!(
                "Need at least {MIN_GROUP_SIZE} drivers in each group for semifinals"
            )));
        }

        for entry in self.store.entries_for_mut(competition_id) {
            let Some(row) = leaderboard.iter().find(|row| row.driver_id == entry.driver_id) else {
                continue;
            };
            entry.qualifying_rank = Some(row.rank);
            entry.qualifying_score = row.qualifying_score;
            entry.group = groups.group_of(entry.driver_id);
        }

        let mut created_group_battles = 0;
        for group in GroupName::ALL {
            let pairs = build_round_robin_pairs(groups.members(group));
            let ordered_pairs = order_battles_avoid_consecutive(&pairs);
            for (idx, (driver1_id, driver2_id)) in ordered_pairs.into_iter().enumerate() {
                self.store.insert_battle(
                    competition_id,
                    Stage::Group,
                    Some(group),
                    idx as u32 + 1,
                    driver1_id,
                    driver2_id,
                );
                created_group_battles += 1;
            }
        }

        self.store.competition_mut(competition_id)?.status = CompetitionStatus::Tournament;
        tracing::info!(
            competition_id,
            drivers = ordered.len(),
            created_group_battles,
            "tournament started"
        );

        Ok(TournamentStartResult {
            competition_id,
            groups,
            created_group_battles,
        })
    }

    /// Battles ordered by stage name, group, order index and id. `stage`
    /// narrows the listing when given.
    pub fn list_battles(
        &self,
        competition_id: CompetitionId,
        stage: Option<Stage>,
    ) -> Result<Vec<BattleView>> {
        self.store.competition(competition_id)?;
        let mut battles: Vec<&Battle> = self
            .store
            .battles_for(competition_id)
            .into_iter()
            .filter(|battle| stage.map_or(true, |stage| battle.stage == stage))
            .collect();
        battles.sort_by(|a, b| {
            a.stage
                .as_str()
                .cmp(b.stage.as_str())
                .then_with(|| a.group.cmp(&b.group))
                .then_with(|| a.order_index.cmp(&b.order_index))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(battles
            .into_iter()
            .map(|battle| self.view_of(battle))
            .collect())
    }
}
