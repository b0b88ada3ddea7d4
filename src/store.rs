//! Entity arena. Each record kind lives in its own id-keyed map and refers
//! to the others through plain id fields.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TournamentError};
use crate::types::{
    Battle, BattleId, BattleRunScore, BattleStatus, Classification, ClassificationId,
    Competition, CompetitionEntry, CompetitionId, CompetitionJudge, CompetitionStatus, Driver,
    DriverId, GroupName, Judge, JudgeId, QualifyingScore, Stage,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct IdCounters {
    classification: u64,
    competition: u64,
    driver: u64,
    judge: u64,
    entry: u64,
    competition_judge: u64,
    qualifying_score: u64,
    battle: u64,
    run_score: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TournamentStore {
    ids: IdCounters,
    classifications: BTreeMap<ClassificationId, Classification>,
    competitions: BTreeMap<CompetitionId, Competition>,
    drivers: BTreeMap<DriverId, Driver>,
    judges: BTreeMap<JudgeId, Judge>,
    entries: BTreeMap<u64, CompetitionEntry>,
    competition_judges: BTreeMap<u64, CompetitionJudge>,
    qualifying_scores: BTreeMap<u64, QualifyingScore>,
    battles: BTreeMap<BattleId, Battle>,
    run_scores: BTreeMap<u64, BattleRunScore>,
}

impl TournamentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classification(&self, id: ClassificationId) -> Result<&Classification> {
        self.classifications
            .get(&id)
            .ok_or_else(|| TournamentError::not_found("Classification"))
    }

    pub fn classification_mut(&mut self, id: ClassificationId) -> Result<&mut Classification> {
        self.classifications
            .get_mut(&id)
            .ok_or_else(|| TournamentError::not_found("Classification"))
    }

    pub fn competition(&self, id: CompetitionId) -> Result<&Competition> {
        self.competitions
            .get(&id)
            .ok_or_else(|| TournamentError::not_found("Competition"))
    }

    pub fn competition_mut(&mut self, id: CompetitionId) -> Result<&mut Competition> {
        self.competitions
            .get_mut(&id)
            .ok_or_else(|| TournamentError::not_found("Competition"))
    }

    pub fn driver(&self, id: DriverId) -> Result<&Driver> {
        self.drivers
            .get(&id)
            .ok_or_else(|| TournamentError::not_found("Driver"))
    }

    pub fn judge(&self, id: JudgeId) -> Result<&Judge> {
        self.judges
            .get(&id)
            .ok_or_else(|| TournamentError::not_found("Judge"))
    }

    pub fn battle(&self, id: BattleId) -> Result<&Battle> {
        self.battles
            .get(&id)
            .ok_or_else(|| TournamentError::not_found("Battle"))
    }

    pub fn battle_mut(&mut self, id: BattleId) -> Result<&mut Battle> {
        self.battles
            .get_mut(&id)
            .ok_or_else(|| TournamentError::not_found("Battle"))
    }

    pub fn classifications(&self) -> impl Iterator<Item = &Classification> {
        self.classifications.values()
    }

    pub fn competitions(&self) -> impl Iterator<Item = &Competition> {
        self.competitions.values()
    }

    pub fn drivers(&self) -> impl Iterator<Item = &Driver> {
        self.drivers.values()
    }

    pub fn judges(&self) -> impl Iterator<Item = &Judge> {
        self.judges.values()
    }

    pub fn insert_classification(&mut self, name: String) -> ClassificationId {
        let id = next(&mut self.ids.classification);
        self.classifications.insert(
            id,
            Classification {
                id,
                name,
                is_closed: false,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn insert_competition(
        &mut self,
        classification_id: ClassificationId,
        name: String,
    ) -> CompetitionId {
        let id = next(&mut self.ids.competition);
        self.competitions.insert(
            id,
            Competition {
                id,
                classification_id,
                name,
                status: CompetitionStatus::Qualifying,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn insert_driver(&mut self, name: String, number: u32) -> DriverId {
        let id = next(&mut self.ids.driver);
        self.drivers.insert(
            id,
            Driver {
                id,
                name,
                number,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn insert_judge(&mut self, name: String) -> JudgeId {
        let id = next(&mut self.ids.judge);
        self.judges.insert(
            id,
            Judge {
                id,
                name,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn entries_for(&self, competition_id: CompetitionId) -> Vec<&CompetitionEntry> {
        self.entries
            .values()
            .filter(|entry| entry.competition_id == competition_id)
            .collect()
    }

    pub fn entries_for_mut(
        &mut self,
        competition_id: CompetitionId,
    ) -> impl Iterator<Item = &mut CompetitionEntry> {
        self.entries
            .values_mut()
            .filter(move |entry| entry.competition_id == competition_id)
    }

    pub fn entry(
        &self,
        competition_id: CompetitionId,
        driver_id: DriverId,
    ) -> Option<&CompetitionEntry> {
        self.entries
            .values()
            .find(|entry| entry.competition_id == competition_id && entry.driver_id == driver_id)
    }

    pub fn driver_ids_for(&self, competition_id: CompetitionId) -> BTreeSet<DriverId> {
        self.entries_for(competition_id)
            .into_iter()
            .map(|entry| entry.driver_id)
            .collect()
    }

    /// Adds the entry unless the driver is already registered. Returns
    /// whether a row was added.
    pub fn insert_entry(&mut self, competition_id: CompetitionId, driver_id: DriverId) -> bool {
        if self.entry(competition_id, driver_id).is_some() {
            return false;
        }
        let id = next(&mut self.ids.entry);
        self.entries.insert(
            id,
            CompetitionEntry {
                id,
                competition_id,
                driver_id,
                group: None,
                qualifying_rank: None,
                qualifying_score: 0.0,
                final_place: None,
                competition_points: 0.0,
                qualifying_points: 0.0,
                total_points: 0.0,
            },
        );
        true
    }

    pub fn judge_ids_for(&self, competition_id: CompetitionId) -> BTreeSet<JudgeId> {
        self.competition_judges
            .values()
            .filter(|row| row.competition_id == competition_id)
            .map(|row| row.judge_id)
            .collect()
    }

    pub fn insert_competition_judge(
        &mut self,
        competition_id: CompetitionId,
        judge_id: JudgeId,
    ) -> bool {
        let exists = self
            .competition_judges
            .values()
            .any(|row| row.competition_id == competition_id && row.judge_id == judge_id);
        if exists {
            return false;
        }
        let id = next(&mut self.ids.competition_judge);
        self.competition_judges.insert(
            id,
            CompetitionJudge {
                id,
                competition_id,
                judge_id,
            },
        );
        true
    }

    pub fn qualifying_scores_for(&self, competition_id: CompetitionId) -> Vec<&QualifyingScore> {
        self.qualifying_scores
            .values()
            .filter(|row| row.competition_id == competition_id)
            .collect()
    }

    pub fn upsert_qualifying_score(
        &mut self,
        competition_id: CompetitionId,
        driver_id: DriverId,
        judge_id: JudgeId,
        run_number: u8,
        score: f64,
    ) -> u64 {
        if let Some(existing) = self.qualifying_scores.values_mut().find(|row| {
            row.competition_id == competition_id
                && row.driver_id == driver_id
                && row.judge_id == judge_id
                && row.run_number == run_number
        }) {
            existing.score = score;
            return existing.id;
        }

        let id = next(&mut self.ids.qualifying_score);
        self.qualifying_scores.insert(
            id,
            QualifyingScore {
                id,
                competition_id,
                driver_id,
                judge_id,
                run_number,
                score,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn battles_for(&self, competition_id: CompetitionId) -> Vec<&Battle> {
        self.battles
            .values()
            .filter(|battle| battle.competition_id == competition_id)
            .collect()
    }

    /// Battles of one stage ordered by their order index. `group` narrows
    /// the selection when given.
    pub fn battles_in_stage(
        &self,
        competition_id: CompetitionId,
        stage: Stage,
        group: Option<GroupName>,
    ) -> Vec<&Battle> {
        let mut rows: Vec<&Battle> = self
            .battles
            .values()
            .filter(|battle| battle.competition_id == competition_id && battle.stage == stage)
            .filter(|battle| group.is_none() || battle.group == group)
            .collect();
        rows.sort_by_key(|battle| (battle.order_index, battle.id));
        rows
    }

    pub fn has_stage(&self, competition_id: CompetitionId, stage: Stage) -> bool {
        self.battles
            .values()
            .any(|battle| battle.competition_id == competition_id && battle.stage == stage)
    }

    pub fn insert_battle(
        &mut self,
        competition_id: CompetitionId,
        stage: Stage,
        group: Option<GroupName>,
        order_index: u32,
        driver1_id: DriverId,
        driver2_id: DriverId,
    ) -> BattleId {
        let id = next(&mut self.ids.battle);
        self.battles.insert(
            id,
            Battle {
                id,
                competition_id,
                stage,
                group,
                order_index,
                driver1_id,
                driver2_id,
                status: BattleStatus::Pending,
                winner_id: None,
                loser_id: None,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn run_scores_for(&self, battle_id: BattleId, omt_round: u32) -> Vec<&BattleRunScore> {
        self.run_scores
            .values()
            .filter(|row| row.battle_id == battle_id && row.omt_round == omt_round)
            .collect()
    }

    /// Highest overtime round holding any score, 0 when nothing is scored.
    pub fn current_omt_round(&self, battle_id: BattleId) -> u32 {
        self.run_scores
            .values()
            .filter(|row| row.battle_id == battle_id)
            .map(|row| row.omt_round)
            .max()
            .unwrap_or(0)
    }

    pub fn upsert_run_score(
        &mut self,
        battle_id: BattleId,
        omt_round: u32,
        run_number: u8,
        judge_id: JudgeId,
        driver1_points: f64,
        driver2_points: f64,
    ) -> u64 {
        if let Some(existing) = self.run_scores.values_mut().find(|row| {
            row.battle_id == battle_id
                && row.omt_round == omt_round
                && row.run_number == run_number
                && row.judge_id == judge_id
        }) {
            existing.driver1_points = driver1_points;
            existing.driver2_points = driver2_points;
            return existing.id;
        }

        let id = next(&mut self.ids.run_score);
        self.run_scores.insert(
            id,
            BattleRunScore {
                id,
                battle_id,
                omt_round,
                run_number,
                judge_id,
                driver1_points,
                driver2_points,
                created_at: Utc::now(),
            },
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_report_missing_entities() {
        let store = TournamentStore::new();
        let error = store.competition(42).expect_err("competition is missing");
        assert_eq!(error.kind(), "not_found");
        assert_eq!(error.to_string(), "Competition not found");
        assert!(store.battle(1).is_err());
    }

    #[test]
    fn ids_are_allocated_per_kind() {
        let mut store = TournamentStore::new();
        let class_id = store.insert_classification("Series".to_string());
        let first = store.insert_competition(class_id, "Round 1".to_string());
        let second = store.insert_competition(class_id, "Round 2".to_string());
        let driver = store.insert_driver("Driver".to_string(), 7);
        assert_eq!(class_id, 1);
        assert_eq!((first, second), (1, 2));
        assert_eq!(driver, 1);
    }

    #[test]
    fn entries_and_judges_are_unique_per_competition() {
        let mut store = TournamentStore::new();
        let class_id = store.insert_classification("Series".to_string());
        let comp = store.insert_competition(class_id, "Round 1".to_string());
        let driver = store.insert_driver("Driver".to_string(), 7);
        let judge = store.insert_judge("Judge".to_string());

        assert!(store.insert_entry(comp, driver));
        assert!(!store.insert_entry(comp, driver));
        assert!(store.insert_competition_judge(comp, judge));
        assert!(!store.insert_competition_judge(comp, judge));
        assert_eq!(store.entries_for(comp).len(), 1);
        assert_eq!(store.judge_ids_for(comp).len(), 1);
    }

    #[test]
    fn upserts_replace_existing_rows_by_key() {
        let mut store = TournamentStore::new();
        let first = store.upsert_qualifying_score(1, 2, 3, 1, 80.0);
        let second = store.upsert_qualifying_score(1, 2, 3, 1, 85.0);
        assert_eq!(first, second);
        assert_eq!(store.qualifying_scores_for(1)[0].score, 85.0);

        let a = store.upsert_run_score(9, 0, 1, 3, 6.0, 4.0);
        let b = store.upsert_run_score(9, 0, 1, 3, 5.0, 5.0);
        let c = store.upsert_run_score(9, 1, 1, 3, 5.0, 5.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.current_omt_round(9), 1);
        assert_eq!(store.current_omt_round(10), 0);
    }
}
