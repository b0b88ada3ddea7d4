use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ClassificationId = u64;
pub type CompetitionId = u64;
pub type DriverId = u64;
pub type JudgeId = u64;
pub type BattleId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStatus {
    Qualifying,
    Tournament,
    Completed,
}

impl CompetitionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qualifying => "qualifying",
            Self::Tournament => "tournament",
            Self::Completed => "completed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Group,
    Semifinal,
    ThirdPlace,
    Final,
}

impl Stage {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "group" => Some(Self::Group),
            "semifinal" => Some(Self::Semifinal),
            "third_place" => Some(Self::ThirdPlace),
            "final" => Some(Self::Final),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Semifinal => "semifinal",
            Self::ThirdPlace => "third_place",
            Self::Final => "final",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Pending,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupName {
    A,
    B,
}

impl GroupName {
    pub const ALL: [GroupName; 2] = [GroupName::A, GroupName::B];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub number: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Judge {
    pub id: JudgeId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Classification {
    pub id: ClassificationId,
    pub name: String,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub classification_id: ClassificationId,
    pub name: String,
    pub status: CompetitionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompetitionEntry {
    pub id: u64,
    pub competition_id: CompetitionId,
    pub driver_id: DriverId,
    pub group: Option<GroupName>,
    pub qualifying_rank: Option<u32>,
    pub qualifying_score: f64,
    pub final_place: Option<u32>,
    pub competition_points: f64,
    pub qualifying_points: f64,
    pub total_points: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompetitionJudge {
    pub id: u64,
    pub competition_id: CompetitionId,
    pub judge_id: JudgeId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualifyingScore {
    pub id: u64,
    pub competition_id: CompetitionId,
    pub driver_id: DriverId,
    pub judge_id: JudgeId,
    pub run_number: u8,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Battle {
    pub id: BattleId,
    pub competition_id: CompetitionId,
    pub stage: Stage,
    pub group: Option<GroupName>,
    pub order_index: u32,
    pub driver1_id: DriverId,
    pub driver2_id: DriverId,
    pub status: BattleStatus,
    pub winner_id: Option<DriverId>,
    pub loser_id: Option<DriverId>,
    pub created_at: DateTime<Utc>,
}

impl Battle {
    pub fn is_completed(&self) -> bool {
        self.status == BattleStatus::Completed
    }

    /// Winner and loser, present only once the battle has been decided.
    pub fn outcome(&self) -> Option<(DriverId, DriverId)> {
        match (self.winner_id, self.loser_id) {
            (Some(winner), Some(loser)) if self.is_completed() => Some((winner, loser)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleRunScore {
    pub id: u64,
    pub battle_id: BattleId,
    pub omt_round: u32,
    pub run_number: u8,
    pub judge_id: JudgeId,
    pub driver1_points: f64,
    pub driver2_points: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub driver_number: u32,
    pub run1_avg: f64,
    pub run2_avg: f64,
    pub qualifying_score: f64,
    pub second_best_run: f64,
    pub is_complete: bool,
    pub rank: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Groups {
    #[serde(rename = "A")]
    pub a: Vec<DriverId>,
    #[serde(rename = "B")]
    pub b: Vec<DriverId>,
}

impl Groups {
    pub fn members(&self, group: GroupName) -> &[DriverId] {
        match group {
            GroupName::A => &self.a,
            GroupName::B => &self.b,
        }
    }

    pub fn group_of(&self, driver_id: DriverId) -> Option<GroupName> {
        if self.a.contains(&driver_id) {
            return Some(GroupName::A);
        }
        if self.b.contains(&driver_id) {
            return Some(GroupName::B);
        }
        None
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TournamentStartResult {
    pub competition_id: CompetitionId,
    pub groups: Groups,
    pub created_group_battles: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupStandingRow {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub driver_number: u32,
    pub wins: u32,
    pub losses: u32,
    pub points_for: f64,
    pub points_against: f64,
    pub point_diff: f64,
    pub qualifying_rank: u32,
    pub rank: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BattleView {
    pub id: BattleId,
    pub competition_id: CompetitionId,
    pub stage: Stage,
    pub group: Option<GroupName>,
    pub order_index: u32,
    pub driver1_id: DriverId,
    pub driver2_id: DriverId,
    pub status: BattleStatus,
    pub winner_id: Option<DriverId>,
    pub loser_id: Option<DriverId>,
    pub current_omt_round: u32,
    pub next_required_omt_round: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProgressionOutcome {
    pub created_semifinals: bool,
    pub created_finals: bool,
    pub finalized_competition: bool,
}

impl ProgressionOutcome {
    pub fn changed(&self) -> bool {
        self.created_semifinals || self.created_finals || self.finalized_competition
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BattleScoreResult {
    pub battle: BattleView,
    pub progression: ProgressionOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompetitionStandingRow {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub driver_number: u32,
    pub qualifying_rank: Option<u32>,
    pub qualifying_score: f64,
    pub group: Option<GroupName>,
    pub final_place: Option<u32>,
    pub competition_points: f64,
    pub qualifying_points: f64,
    pub total_points: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompetitionBreakdownItem {
    pub competition_id: CompetitionId,
    pub points: f64,
    pub place: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationStandingRow {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub driver_number: u32,
    pub competitions_count: usize,
    pub raw_total_points: f64,
    pub effective_total_points: f64,
    pub drop_lowest_applied: bool,
    pub competition_breakdown: Vec<CompetitionBreakdownItem>,
    pub rank: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClassificationStandings {
    pub classification_id: ClassificationId,
    pub classification_name: String,
    pub is_closed: bool,
    pub standings: Vec<ClassificationStandingRow>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompetitionStandings {
    pub competition_id: CompetitionId,
    pub competition_name: String,
    pub status: CompetitionStatus,
    pub standings: Vec<CompetitionStandingRow>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompetitionSummary {
    pub id: CompetitionId,
    pub name: String,
    pub classification_id: ClassificationId,
    pub status: CompetitionStatus,
    pub driver_count: usize,
    pub judge_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompetitionDriverView {
    pub id: DriverId,
    pub name: String,
    pub number: u32,
    pub group: Option<GroupName>,
    pub qualifying_rank: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AssignmentResult {
    pub competition_id: CompetitionId,
    pub added: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    QualifyingLeaderboard {
        competition_id: CompetitionId,
        leaderboard: Vec<LeaderboardRow>,
    },
    TournamentStarted {
        competition_id: CompetitionId,
        groups: Groups,
        battles: Vec<BattleView>,
    },
    BattleUpdate {
        competition_id: CompetitionId,
        battle: BattleView,
        battles: Vec<BattleView>,
        competition_status: CompetitionStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        competition_standings: Option<Vec<CompetitionStandingRow>>,
    },
    Bootstrap {
        competition_id: CompetitionId,
        qualifying_leaderboard: Vec<LeaderboardRow>,
        battles: Vec<BattleView>,
        competition_standings: Vec<CompetitionStandingRow>,
    },
}

impl Notification {
    pub fn competition_id(&self) -> CompetitionId {
        match self {
            Self::QualifyingLeaderboard { competition_id, .. }
            | Self::TournamentStarted { competition_id, .. }
            | Self::BattleUpdate { competition_id, .. }
            | Self::Bootstrap { competition_id, .. } => *competition_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualifyingScoreInput {
    pub driver_id: DriverId,
    pub judge_id: JudgeId,
    pub run_number: u8,
    pub score: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BattleScoreInput {
    pub judge_id: JudgeId,
    pub omt_round: u32,
    pub run_number: u8,
    pub driver1_points: f64,
    pub driver2_points: f64,
}
