//! Viewer payloads produced after a command commits. Delivery belongs to
//! the transport; these only read the committed state.

use super::*;

impl TournamentEngine {
    pub fn qualifying_notification(&self, competition_id: CompetitionId) -> Result<Notification> {
        Ok(Notification::QualifyingLeaderboard {
            competition_id,
            leaderboard: self.qualifying_leaderboard(competition_id)?,
        })
    }

    pub fn tournament_started_notification(
        &self,
        started: &TournamentStartResult,
    ) -> Result<Notification> {
        Ok(Notification::TournamentStarted {
            competition_id: started.competition_id,
            groups: started.groups.clone(),
            battles: self.list_battles(started.competition_id, None)?,
        })
    }

    /// Standings ride along only once the competition is completed.
    pub fn battle_update_notification(&self, battle_id: BattleId) -> Result<Notification> {
        let battle = self.battle_view(battle_id)?;
        let competition_id = battle.competition_id;
        let competition_status = self.store.competition(competition_id)?.status;
        let competition_standings = if competition_status == CompetitionStatus::Completed {
            Some(self.competition_standings(competition_id)?.standings)
        } else {
            None
        };
        Ok(Notification::BattleUpdate {
            competition_id,
            battle,
            battles: self.list_battles(competition_id, None)?,
            competition_status,
            competition_standings,
        })
    }

    /// First message a new viewer receives.
    pub fn bootstrap_notification(&self, competition_id: CompetitionId) -> Result<Notification> {
        Ok(Notification::Bootstrap {
            competition_id,
            qualifying_leaderboard: self.qualifying_leaderboard(competition_id)?,
            battles: self.list_battles(competition_id, None)?,
            competition_standings: self.competition_standings(competition_id)?.standings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::fixture;
    use super::*;

    #[test]
    fn payloads_are_tagged_by_type() {
        let mut fx = fixture(4, 1);
        let qualifying = fx
            .engine
            .qualifying_notification(fx.competition_id)
            .expect("qualifying");
        let json = serde_json::to_value(&qualifying).expect("json");
        assert_eq!(json["type"], "qualifying_leaderboard");
        assert_eq!(json["leaderboard"].as_array().map(Vec::len), Some(4));

        fx.complete_qualifying();
        let started = fx.engine.start_tournament(fx.competition_id).expect("start");
        let notification = fx
            .engine
            .tournament_started_notification(&started)
            .expect("started");
        assert_eq!(notification.competition_id(), fx.competition_id);
        let json = serde_json::to_value(&notification).expect("json");
        assert_eq!(json["type"], "tournament_started");
        assert_eq!(json["groups"]["A"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["battles"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn battle_update_carries_standings_only_when_completed() {
        let mut fx = fixture(4, 1);
        fx.complete_qualifying();
        fx.engine.start_tournament(fx.competition_id).expect("start");
        let first = fx.pending_battles()[0].id;
        fx.score_round(first, 0, 6.0);

        let update = fx.engine.battle_update_notification(first).expect("update");
        let json = serde_json::to_value(&update).expect("json");
        assert_eq!(json["type"], "battle_update");
        assert_eq!(json["competition_status"], "tournament");
        assert!(json.get("competition_standings").is_none());

        fx.run_to_completion();
        let update = fx.engine.battle_update_notification(first).expect("update");
        match update {
            Notification::BattleUpdate {
                competition_status,
                competition_standings,
                ..
            } => {
                assert_eq!(competition_status, CompetitionStatus::Completed);
                assert_eq!(competition_standings.map(|rows| rows.len()), Some(4));
            }
            other => panic!("unexpected notification {other:?}"),
        }
    }

    #[test]
    fn bootstrap_covers_every_view() {
        let fx = fixture(4, 1);
        let bootstrap = fx
            .engine
            .bootstrap_notification(fx.competition_id)
            .expect("bootstrap");
        let json = serde_json::to_value(&bootstrap).expect("json");
        assert_eq!(json["type"], "bootstrap");
        assert_eq!(json["qualifying_leaderboard"].as_array().map(Vec::len), Some(4));
        assert_eq!(json["battles"].as_array().map(Vec::len), Some(0));
        assert!(fx.engine.bootstrap_notification(42).is_err());
    }
}
