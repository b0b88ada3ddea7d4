use std::path::PathBuf;

use crate::error::{Result, TournamentError};
use crate::types::{GroupName, Stage};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SNAPSHOT_PATH: &str = ".data/tournament.json";

pub fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn snapshot_path(raw: Option<&str>) -> PathBuf {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_SNAPSHOT_PATH),
    }
}

pub fn parse_group_name(raw: &str) -> Result<GroupName> {
    GroupName::parse(raw).ok_or_else(|| TournamentError::validation("Group must be A or B"))
}

/// Missing or blank means "every stage".
pub fn parse_stage_filter(raw: Option<&str>) -> Result<Option<Stage>> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    Stage::parse(value).map(Some).ok_or_else(|| {
        TournamentError::validation("Stage must be one of group, semifinal, third_place, final")
    })
}
