use super::*;

#[derive(Clone, Copy, Default)]
struct GroupTally {
    wins: u32,
    losses: u32,
    points_for: f64,
    points_against: f64,
}

impl TournamentEngine {
    /// Runs the three bracket triggers in order. Each one is a no-op when its
    /// precondition is unmet or it has already been applied.
    pub(super) fn apply_progression(
        &mut self,
        competition_id: CompetitionId,
    ) -> Result<ProgressionOutcome> {
        self.store.competition(competition_id)?;
        let created_semifinals = self.try_create_semifinals(competition_id)?;
        let created_finals = self.try_create_final_and_third_place(competition_id)?;
        let finalized_competition = self.try_finalize(competition_id)?;
        Ok(ProgressionOutcome {
            created_semifinals,
            created_finals,
            finalized_competition,
        })
    }

    fn all_completed(
        &self,
        competition_id: CompetitionId,
        stage: Stage,
        group: Option<GroupName>,
    ) -> bool {
        let battles = self.store.battles_in_stage(competition_id, stage, group);
        !battles.is_empty() && battles.iter().all(|battle| battle.is_completed())
    }

    fn try_create_semifinals(&mut self, competition_id: CompetitionId) -> Result<bool> {
        if self.store.has_stage(competition_id, Stage::Semifinal) {
            return Ok(false);
        }
        let groups_done = GroupName::ALL
            .iter()
            .all(|group| self.all_completed(competition_id, Stage::Group, Some(*group)));
        if !groups_done {
            return Ok(false);
        }

        let group_a = self.group_standings(competition_id, GroupName::A)?;
        let group_b = self.group_standings(competition_id, GroupName::B)?;
        if group_a.len() < MIN_GROUP_SIZE || group_b.len() < MIN_GROUP_SIZE {
            return Ok(false);
        }

        // Cross-seeded so group winners never meet their own group again.
        let pairings = [
            (group_a[0].driver_id, group_b[1].driver_id),
            (group_b[0].driver_id, group_a[1].driver_id),
        ];
        for (idx, (driver1_id, driver2_id)) in pairings.into_iter().enumerate() {
            self.store.insert_battle(
                competition_id,
                Stage::Semifinal,
                None,
                idx as u32 + 1,
                driver1_id,
                driver2_id,
            );
        }
        tracing::info!(competition_id, "semifinals created");
        Ok(true)
    }

    fn try_create_final_and_third_place(&mut self, competition_id: CompetitionId) -> Result<bool> {
        if !self.all_completed(competition_id, Stage::Semifinal, None) {
            return Ok(false);
        }
        if self.store.has_stage(competition_id, Stage::Final)
            || self.store.has_stage(competition_id, Stage::ThirdPlace)
        {
            return Ok(false);
        }

        let semis = self.store.battles_in_stage(competition_id, Stage::Semifinal, None);
        let [first, second] = semis.as_slice() else {
            return Ok(false);
        };
        let (Some((winner1, loser1)), Some((winner2, loser2))) = (first.outcome(), second.outcome())
        else {
            return Ok(false);
        };

        self.store
            .insert_battle(competition_id, Stage::ThirdPlace, None, 1, loser1, loser2);
        self.store
            .insert_battle(competition_id, Stage::Final, None, 1, winner1, winner2);
        tracing::info!(competition_id, "final and third place created");
        Ok(true)
    }

    fn stage_outcome(
        &self,
        competition_id: CompetitionId,
        stage: Stage,
    ) -> Option<(DriverId, DriverId)> {
        if !self.all_completed(competition_id, stage, None) {
            return None;
        }
        self.store
            .battles_in_stage(competition_id, stage, None)
            .first()
            .and_then(|battle| battle.outcome())
    }

    fn try_finalize(&mut self, competition_id: CompetitionId) -> Result<bool> {
        if self.store.competition(competition_id)?.status == CompetitionStatus::Completed {
            return Ok(false);
        }
        let (Some((champion, runner_up)), Some((third, fourth))) = (
            self.stage_outcome(competition_id, Stage::Final),
            self.stage_outcome(competition_id, Stage::ThirdPlace),
        ) else {
            return Ok(false);
        };

        let mut places: BTreeMap<DriverId, u32> =
            BTreeMap::from([(champion, 1), (runner_up, 2), (third, 3), (fourth, 4)]);
        let remainder = self.remaining_order_after_top4(competition_id, &places)?;
        for (offset, driver_id) in remainder.into_iter().enumerate() {
            places.insert(driver_id, FIRST_NON_PODIUM_PLACE + offset as u32);
        }

        for entry in self.store.entries_for_mut(competition_id) {
            let Some(place) = places.get(&entry.driver_id).copied() else {
                continue;
            };
            let rank = entry.qualifying_rank.unwrap_or(UNRANKED);
            let bonus = f64::from(qualifying_bonus_for_rank(rank));
            let qualifying_points = round_score(entry.qualifying_score + bonus);
            let competition_points = round_score(f64::from(competition_points_for_place(place)));
            entry.final_place = Some(place);
            entry.competition_points = competition_points;
            entry.qualifying_points = qualifying_points;
            entry.total_points = round_score(competition_points + qualifying_points);
        }

        self.store.competition_mut(competition_id)?.status = CompetitionStatus::Completed;
        tracing::info!(competition_id, placed = places.len(), "competition finalized");
        Ok(true)
    }

    /// Drivers outside the podium, ordered by group rank, then qualifying
    /// rank, then car number. Group membership does not matter.
    fn remaining_order_after_top4(
        &self,
        competition_id: CompetitionId,
        taken: &BTreeMap<DriverId, u32>,
    ) -> Result<Vec<DriverId>> {
        let mut merged = Vec::new();
        for group in GroupName::ALL {
            merged.extend(
                self.group_standings(competition_id, group)?
                    .into_iter()
                    .filter(|row| !taken.contains_key(&row.driver_id)),
            );
        }
        merged.sort_by_key(|row| (row.rank, row.qualifying_rank, row.driver_number));
        Ok(merged.into_iter().map(|row| row.driver_id).collect())
    }

    /// Standings within one group from its completed battles, using the
    /// decisive round scores of each battle.
    pub fn group_standings(
        &self,
        competition_id: CompetitionId,
        group: GroupName,
    ) -> Result<Vec<GroupStandingRow>> {
        self.store.competition(competition_id)?;

        let mut tallies: BTreeMap<DriverId, GroupTally> = self
            .store
            .entries_for(competition_id)
            .into_iter()
            .filter(|entry| entry.group == Some(group))
            .map(|entry| (entry.driver_id, GroupTally::default()))
            .collect();

        for battle in self.store.battles_in_stage(competition_id, Stage::Group, Some(group)) {
            let Some((winner_id, loser_id)) = battle.outcome() else {
                continue;
            };
            let (driver1_score, driver2_score) = self.decisive_round_scores(battle);
            if let Some(tally) = tallies.get_mut(&winner_id) {
                tally.wins += 1;
            }
            if let Some(tally) = tallies.get_mut(&loser_id) {
                tally.losses += 1;
            }
            if let Some(tally) = tallies.get_mut(&battle.driver1_id) {
                tally.points_for += driver1_score;
                tally.points_against += driver2_score;
            }
            if let Some(tally) = tallies.get_mut(&battle.driver2_id) {
                tally.points_for += driver2_score;
                tally.points_against += driver1_score;
            }
        }

        let mut rows = Vec::with_capacity(tallies.len());
        for (driver_id, tally) in tallies {
            let driver = self.store.driver(driver_id)?;
            let qualifying_rank = self
                .store
                .entry(competition_id, driver_id)
                .and_then(|entry| entry.qualifying_rank)
                .unwrap_or(UNRANKED);
            rows.push((
                tally,
                GroupStandingRow {
                    driver_id,
                    driver_name: driver.name.clone(),
                    driver_number: driver.number,
                    wins: tally.wins,
                    losses: tally.losses,
                    points_for: 0.0,
                    points_against: 0.0,
                    point_diff: 0.0,
                    qualifying_rank,
                    rank: 0,
                },
            ));
        }

        rows.sort_by(|(a, a_row), (b, b_row)| {
            b.wins
                .cmp(&a.wins)
                .then_with(|| {
                    cmp_desc_f64(a.points_for - a.points_against, b.points_for - b.points_against)
                })
                .then_with(|| cmp_desc_f64(a.points_for, b.points_for))
                .then_with(|| a_row.qualifying_rank.cmp(&b_row.qualifying_rank))
                .then_with(|| a_row.driver_number.cmp(&b_row.driver_number))
        });

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(idx, (tally, mut row))| {
                row.rank = idx as u32 + 1;
                row.point_diff = round_score(tally.points_for - tally.points_against);
                row.points_for = round_score(tally.points_for);
                row.points_against = round_score(tally.points_against);
                row
            })
            .collect())
    }
}
