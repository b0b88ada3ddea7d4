use super::*;

fn unset_last(value: Option<u32>) -> u32 {
    value.unwrap_or(UNRANKED)
}

impl TournamentEngine {
    /// One row per registered driver, podium first once the competition has
    /// been finalized.
    pub fn competition_standings(
        &self,
        competition_id: CompetitionId,
    ) -> Result<CompetitionStandings> {
        let competition = self.store.competition(competition_id)?;

        let mut rows = Vec::new();
        for entry in self.store.entries_for(competition_id) {
            let driver = self.store.driver(entry.driver_id)?;
            rows.push(CompetitionStandingRow {
                driver_id: driver.id,
                driver_name: driver.name.clone(),
                driver_number: driver.number,
                qualifying_rank: entry.qualifying_rank,
                qualifying_score: round_score(entry.qualifying_score),
                group: entry.group,
                final_place: entry.final_place,
                competition_points: round_score(entry.competition_points),
                qualifying_points: round_score(entry.qualifying_points),
                total_points: round_score(entry.total_points),
            });
        }
        rows.sort_by_key(|row| {
            (
                unset_last(row.final_place),
                unset_last(row.qualifying_rank),
                row.driver_number,
            )
        });

        Ok(CompetitionStandings {
            competition_id,
            competition_name: competition.name.clone(),
            status: competition.status,
            standings: rows,
        })
    }

    /// Season table over the completed competitions of a classification.
    /// A closed classification drops each driver's single worst result.
    pub fn classification_standings(
        &self,
        classification_id: ClassificationId,
    ) -> Result<ClassificationStandings> {
        let classification = self.store.classification(classification_id)?;

        let mut per_driver: BTreeMap<DriverId, Vec<CompetitionBreakdownItem>> = BTreeMap::new();
        let completed = self.store.competitions().filter(|competition| {
            competition.classification_id == classification_id
                && competition.status == CompetitionStatus::Completed
        });
        for competition in completed {
            for entry in self.store.entries_for(competition.id) {
                per_driver
                    .entry(entry.driver_id)
                    .or_default()
                    .push(CompetitionBreakdownItem {
                        competition_id: competition.id,
                        points: round_score(entry.total_points),
                        place: entry.final_place,
                    });
            }
        }

        let mut rows = Vec::with_capacity(per_driver.len());
        for (driver_id, mut breakdown) in per_driver {
            let driver = self.store.driver(driver_id)?;
            breakdown.sort_by_key(|item| item.competition_id);
            let totals: Vec<f64> = breakdown.iter().map(|item| item.points).collect();
            let raw_total: f64 = totals.iter().sum();
            let drop_lowest_applied = classification.is_closed && totals.len() > 1;
            let effective_total = if classification.is_closed {
                total_after_drop_lowest_once(&totals)
            } else {
                raw_total
            };
            rows.push(ClassificationStandingRow {
                driver_id,
                driver_name: driver.name.clone(),
                driver_number: driver.number,
                competitions_count: totals.len(),
                raw_total_points: round_score(raw_total),
                effective_total_points: round_score(effective_total),
                drop_lowest_applied,
                competition_breakdown: breakdown,
                rank: 0,
            });
        }

        rows.sort_by(|a, b| {
            cmp_desc_f64(a.effective_total_points, b.effective_total_points)
                .then_with(|| cmp_desc_f64(a.raw_total_points, b.raw_total_points))
                .then_with(|| a.driver_number.cmp(&b.driver_number))
        });
        for (idx, row) in rows.iter_mut().enumerate() {
            row.rank = idx as u32 + 1;
        }

        Ok(ClassificationStandings {
            classification_id,
            classification_name: classification.name.clone(),
            is_closed: classification.is_closed,
            standings: rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{fixture, Fixture};
    use super::*;

    /// Runs another competition in the fixture's classification with the
    /// same drivers and judges.
    fn run_another_competition(fx: &mut Fixture, name: &str) -> CompetitionId {
        let competition_id = fx
            .engine
            .create_competition(fx.classification_id, name)
            .expect("competition")
            .id;
        fx.engine
            .register_drivers(competition_id, &fx.drivers)
            .expect("drivers");
        fx.engine
            .assign_judges(competition_id, &fx.judges)
            .expect("judges");
        fx.competition_id = competition_id;
        fx.complete_qualifying();
        fx.engine.start_tournament(competition_id).expect("start");
        fx.run_to_completion();
        competition_id
    }

    #[test]
    fn competition_standings_before_finalization_list_unplaced_rows() {
        let fx = fixture(3, 1);
        let standings = fx
            .engine
            .competition_standings(fx.competition_id)
            .expect("standings");
        assert_eq!(standings.status, CompetitionStatus::Qualifying);
        let numbers: Vec<u32> = standings.standings.iter().map(|row| row.driver_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(standings.standings.iter().all(|row| row.final_place.is_none()));
        assert!(fx.engine.competition_standings(77).is_err());
    }

    #[test]
    fn open_classification_sums_every_completed_competition() {
        let mut fx = fixture(4, 1);
        let first = fx.competition_id;
        fx.complete_qualifying();
        fx.engine.start_tournament(first).expect("start");
        fx.run_to_completion();

        // Still running competitions do not count.
        let pending = fx
            .engine
            .create_competition(fx.classification_id, "Round 3")
            .expect("pending")
            .id;
        let second = run_another_competition(&mut fx, "Round 2");

        let table = fx
            .engine
            .classification_standings(fx.classification_id)
            .expect("table");
        assert!(!table.is_closed);
        assert_eq!(table.standings.len(), 4);
        for row in &table.standings {
            assert_eq!(row.competitions_count, 2);
            assert!(!row.drop_lowest_applied);
            assert_eq!(row.raw_total_points, row.effective_total_points);
            let ids: Vec<CompetitionId> = row
                .competition_breakdown
                .iter()
                .map(|item| item.competition_id)
                .collect();
            assert_eq!(ids, vec![first, second]);
            assert!(!ids.contains(&pending));
        }
        let ranks: Vec<u32> = table.standings.iter().map(|row| row.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert!(table
            .standings
            .windows(2)
            .all(|pair| pair[0].effective_total_points >= pair[1].effective_total_points));
    }

    #[test]
    fn closed_classification_drops_one_lowest_result() {
        let mut fx = fixture(4, 1);
        fx.complete_qualifying();
        fx.engine.start_tournament(fx.competition_id).expect("start");
        fx.run_to_completion();
        run_another_competition(&mut fx, "Round 2");
        fx.engine
            .close_classification(fx.classification_id)
            .expect("close");

        let table = fx
            .engine
            .classification_standings(fx.classification_id)
            .expect("table");
        assert!(table.is_closed);
        for row in &table.standings {
            assert!(row.drop_lowest_applied);
            let lowest = row
                .competition_breakdown
                .iter()
                .map(|item| item.points)
                .fold(f64::INFINITY, f64::min);
            assert_eq!(
                row.effective_total_points,
                round_score(row.raw_total_points - lowest)
            );
        }
    }

    #[test]
    fn single_result_is_kept_when_closed() {
        let mut fx = fixture(4, 1);
        fx.complete_qualifying();
        fx.engine.start_tournament(fx.competition_id).expect("start");
        fx.run_to_completion();
        fx.engine
            .close_classification(fx.classification_id)
            .expect("close");

        let table = fx
            .engine
            .classification_standings(fx.classification_id)
            .expect("table");
        for row in &table.standings {
            assert_eq!(row.competitions_count, 1);
            assert!(!row.drop_lowest_applied);
            assert_eq!(row.effective_total_points, row.raw_total_points);
        }
    }

    /// Arena with two completed competitions in one classification. Each
    /// driver is given by car number and its total in each competition.
    fn seeded_classification(
        closed: bool,
        results: &[(u32, [f64; 2])],
    ) -> (TournamentEngine, ClassificationId) {
        let mut store = TournamentStore::new();
        let classification_id = store.insert_classification("Series".to_string());
        store
            .classification_mut(classification_id)
            .expect("classification")
            .is_closed = closed;
        let competitions = [
            store.insert_competition(classification_id, "Round 1".to_string()),
            store.insert_competition(classification_id, "Round 2".to_string()),
        ];
        for competition_id in competitions {
            store.competition_mut(competition_id).expect("competition").status =
                CompetitionStatus::Completed;
        }
        for (number, totals) in results {
            let driver_id = store.insert_driver(format!("Driver {number}"), *number);
            for (competition_id, total) in competitions.iter().zip(totals) {
                store.insert_entry(*competition_id, driver_id);
                let entry = store
                    .entries_for_mut(*competition_id)
                    .find(|entry| entry.driver_id == driver_id)
                    .expect("entry");
                entry.total_points = *total;
            }
        }
        (TournamentEngine::from_store(store), classification_id)
    }

    #[test]
    fn equal_effective_totals_rank_by_raw_total_then_number() {
        let (engine, classification_id) = seeded_classification(
            true,
            &[
                (2, [50.0, 100.0]),
                (6, [60.0, 100.0]),
                (9, [80.0, 100.0]),
                (4, [100.0, 60.0]),
            ],
        );
        let table = engine
            .classification_standings(classification_id)
            .expect("table");
        let numbers: Vec<u32> = table.standings.iter().map(|row| row.driver_number).collect();
        assert_eq!(numbers, vec![9, 4, 6, 2]);
        assert!(table
            .standings
            .iter()
            .all(|row| row.effective_total_points == 100.0 && row.drop_lowest_applied));
        let raw: Vec<f64> = table.standings.iter().map(|row| row.raw_total_points).collect();
        assert_eq!(raw, vec![180.0, 160.0, 160.0, 150.0]);
        let ranks: Vec<u32> = table.standings.iter().map(|row| row.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn open_classification_ties_rank_by_number() {
        let (engine, classification_id) = seeded_classification(
            false,
            &[(12, [70.0, 30.0]), (8, [99.5, 0.0]), (5, [40.0, 60.0])],
        );
        let table = engine
            .classification_standings(classification_id)
            .expect("table");
        let numbers: Vec<u32> = table.standings.iter().map(|row| row.driver_number).collect();
        assert_eq!(numbers, vec![5, 12, 8]);
        assert!(table.standings.iter().all(|row| !row.drop_lowest_applied));
        assert_eq!(table.standings[0].effective_total_points, 100.0);
        assert_eq!(table.standings[1].effective_total_points, 100.0);
        assert_eq!(table.standings[2].effective_total_points, 99.5);
    }

    #[test]
    fn empty_classification_has_no_rows() {
        let fx = fixture(0, 0);
        let table = fx
            .engine
            .classification_standings(fx.classification_id)
            .expect("table");
        assert!(table.standings.is_empty());
        let error = fx.engine.classification_standings(99).expect_err("missing");
        assert_eq!(error.kind(), "not_found");
    }
}
