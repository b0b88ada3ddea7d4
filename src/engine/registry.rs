use super::*;

fn normalize_name(raw: &str, label: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TournamentError::validation(format!("{label} name is required")));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(TournamentError::validation(format!(
            "{label} name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn dedup_ids(ids: &[u64]) -> Vec<u64> {
    ids.iter().copied().collect::<BTreeSet<u64>>().into_iter().collect()
}

impl TournamentEngine {
    pub(super) fn apply_create_classification(&mut self, raw_name: &str) -> Result<Classification> {
        let name = normalize_name(raw_name, "Classification")?;
        if self.store.classifications().any(|row| row.name == name) {
            return Err(TournamentError::conflict("Classification name already exists"));
        }
        let id = self.store.insert_classification(name);
        Ok(self.store.classification(id)?.clone())
    }

    pub(super) fn apply_close_classification(
        &mut self,
        classification_id: ClassificationId,
    ) -> Result<Classification> {
        let classification = self.store.classification_mut(classification_id)?;
        classification.is_closed = true;
        tracing::info!(classification_id, "classification closed");
        Ok(classification.clone())
    }

    pub(super) fn apply_create_competition(
        &mut self,
        classification_id: ClassificationId,
        raw_name: &str,
    ) -> Result<CompetitionSummary> {
        let name = normalize_name(raw_name, "Competition")?;
        if self.store.classification(classification_id)?.is_closed {
            return Err(TournamentError::state("Classification is closed"));
        }
        let duplicate = self
            .store
            .competitions()
            .any(|row| row.classification_id == classification_id && row.name == name);
        if duplicate {
            return Err(TournamentError::conflict(
                "Competition name already exists in this classification",
            ));
        }
        let id = self.store.insert_competition(classification_id, name);
        self.competition_summary(id)
    }

    pub(super) fn apply_create_driver(&mut self, raw_name: &str, number: u32) -> Result<Driver> {
        let name = normalize_name(raw_name, "Driver")?;
        if number == 0 {
            return Err(TournamentError::validation("Driver number must be at least 1"));
        }
        if self.store.drivers().any(|row| row.number == number) {
            return Err(TournamentError::conflict("Driver number already exists"));
        }
        let id = self.store.insert_driver(name, number);
        Ok(self.store.driver(id)?.clone())
    }

    pub(super) fn apply_create_judge(&mut self, raw_name: &str) -> Result<Judge> {
        let name = normalize_name(raw_name, "Judge")?;
        if self.store.judges().any(|row| row.name == name) {
            return Err(TournamentError::conflict("Judge name already exists"));
        }
        let id = self.store.insert_judge(name);
        Ok(self.store.judge(id)?.clone())
    }

    fn require_editable_competition(&self, competition_id: CompetitionId) -> Result<()> {
        let competition = self.store.competition(competition_id)?;
        if competition.status != CompetitionStatus::Qualifying {
            return Err(TournamentError::state(
                "Can only modify competition before tournament starts",
            ));
        }
        Ok(())
    }

    pub(super) fn apply_register_drivers(
        &mut self,
        competition_id: CompetitionId,
        driver_ids: &[DriverId],
    ) -> Result<AssignmentResult> {
        self.require_editable_competition(competition_id)?;
        let ids = dedup_ids(driver_ids);
        if ids.is_empty() {
            return Err(TournamentError::validation("No driver IDs provided"));
        }
        for driver_id in &ids {
            self.store.driver(*driver_id)?;
        }
        let added = ids
            .into_iter()
            .filter(|driver_id| self.store.insert_entry(competition_id, *driver_id))
            .count();
        Ok(AssignmentResult {
            competition_id,
            added,
        })
    }

    pub(super) fn apply_assign_judges(
        &mut self,
        competition_id: CompetitionId,
        judge_ids: &[JudgeId],
    ) -> Result<AssignmentResult> {
        self.require_editable_competition(competition_id)?;
        let ids = dedup_ids(judge_ids);
        if ids.is_empty() {
            return Err(TournamentError::validation("No judge IDs provided"));
        }
        for judge_id in &ids {
            self.store.judge(*judge_id)?;
        }
        let added = ids
            .into_iter()
            .filter(|judge_id| self.store.insert_competition_judge(competition_id, *judge_id))
            .count();
        Ok(AssignmentResult {
            competition_id,
            added,
        })
    }

    pub fn list_classifications(&self) -> Vec<Classification> {
        self.store.classifications().cloned().collect()
    }

    pub fn competition_summary(&self, competition_id: CompetitionId) -> Result<CompetitionSummary> {
        let competition = self.store.competition(competition_id)?;
        Ok(CompetitionSummary {
            id: competition.id,
            name: competition.name.clone(),
            classification_id: competition.classification_id,
            status: competition.status,
            driver_count: self.store.entries_for(competition_id).len(),
            judge_count: self.store.judge_ids_for(competition_id).len(),
        })
    }

    pub fn list_competitions(&self) -> Vec<CompetitionSummary> {
        self.store
            .competitions()
            .filter_map(|competition| self.competition_summary(competition.id).ok())
            .collect()
    }

    pub fn list_drivers(&self) -> Vec<Driver> {
        let mut rows: Vec<Driver> = self.store.drivers().cloned().collect();
        rows.sort_by_key(|driver| driver.number);
        rows
    }

    pub fn list_judges(&self) -> Vec<Judge> {
        self.store.judges().cloned().collect()
    }

    pub fn competition_drivers(&self, competition_id: CompetitionId) -> Result<Vec<CompetitionDriverView>> {
        self.store.competition(competition_id)?;
        let mut rows = Vec::new();
        for entry in self.store.entries_for(competition_id) {
            let Ok(driver) = self.store.driver(entry.driver_id) else {
                continue;
            };
            rows.push(CompetitionDriverView {
                id: driver.id,
                name: driver.name.clone(),
                number: driver.number,
                group: entry.group,
                qualifying_rank: entry.qualifying_rank,
            });
        }
        rows.sort_by_key(|row| row.number);
        Ok(rows)
    }

    pub fn competition_judges(&self, competition_id: CompetitionId) -> Result<Vec<Judge>> {
        self.store.competition(competition_id)?;
        let mut rows: Vec<Judge> = self
            .store
            .judge_ids_for(competition_id)
            .into_iter()
            .filter_map(|judge_id| self.store.judge(judge_id).ok().cloned())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_and_numbers_conflict() {
        let mut engine = TournamentEngine::new();
        engine.create_classification(" Series ").expect("first");
        let error = engine.create_classification("Series").expect_err("duplicate");
        assert_eq!(error.kind(), "conflict");

        engine.create_driver("Alice", 7).expect("driver");
        let error = engine.create_driver("Bob", 7).expect_err("duplicate number");
        assert_eq!(error.kind(), "conflict");

        engine.create_judge("Judge 1").expect("judge");
        assert!(engine.create_judge("Judge 1").is_err());
    }

    #[test]
    fn names_are_trimmed_and_validated() {
        let mut engine = TournamentEngine::new();
        let created = engine.create_classification("  Series  ").expect("created");
        assert_eq!(created.name, "Series");
        let error = engine.create_classification("   ").expect_err("empty");
        assert_eq!(error.kind(), "validation_error");
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(engine.create_judge(&long).is_err());
        assert!(engine.create_driver("Zero", 0).is_err());
    }

    #[test]
    fn closed_classification_rejects_new_competitions() {
        let mut engine = TournamentEngine::new();
        let class_id = engine.create_classification("Series").expect("class").id;
        engine.create_competition(class_id, "Round 1").expect("round 1");
        assert!(engine.create_competition(class_id, "Round 1").is_err());

        let closed = engine.close_classification(class_id).expect("close");
        assert!(closed.is_closed);
        let error = engine
            .create_competition(class_id, "Round 2")
            .expect_err("closed");
        assert_eq!(error.kind(), "state_error");
    }

    #[test]
    fn registration_skips_existing_and_rejects_unknown_ids() {
        let mut engine = TournamentEngine::new();
        let class_id = engine.create_classification("Series").expect("class").id;
        let comp = engine.create_competition(class_id, "Round 1").expect("comp").id;
        let d1 = engine.create_driver("A", 1).expect("d1").id;
        let d2 = engine.create_driver("B", 2).expect("d2").id;

        let first = engine.register_drivers(comp, &[d1, d1, d2]).expect("register");
        assert_eq!(first.added, 2);
        let second = engine.register_drivers(comp, &[d2]).expect("register again");
        assert_eq!(second.added, 0);

        let error = engine.register_drivers(comp, &[99]).expect_err("unknown");
        assert_eq!(error.kind(), "not_found");
        assert!(engine.register_drivers(comp, &[]).is_err());
        assert!(engine.assign_judges(comp, &[]).is_err());

        let summary = engine.competition_summary(comp).expect("summary");
        assert_eq!(summary.driver_count, 2);
        assert_eq!(summary.judge_count, 0);
    }

    #[test]
    fn listings_are_ordered() {
        let mut engine = TournamentEngine::new();
        engine.create_driver("Late", 30).expect("d");
        engine.create_driver("Early", 3).expect("d");
        let numbers: Vec<u32> = engine.list_drivers().iter().map(|d| d.number).collect();
        assert_eq!(numbers, vec![3, 30]);
    }
}
