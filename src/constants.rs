pub const SCORE_DECIMALS: i32 = 2;

pub const RUNS_PER_ROUND: u8 = 2;
pub const MAX_QUALIFYING_SCORE: f64 = 100.0;
pub const MAX_BATTLE_POINTS: f64 = 10.0;
pub const BATTLE_POINTS_TOTAL: f64 = 10.0;
pub const SCORE_EPSILON: f64 = 1e-9;

pub const MIN_DRIVERS_TO_START: usize = 4;
pub const MIN_GROUP_SIZE: usize = 2;
pub const FIRST_NON_PODIUM_PLACE: u32 = 5;

/// Stand-in rank for entries that never received a qualifying rank.
pub const UNRANKED: u32 = 9_999;

pub const MAX_NAME_LEN: usize = 128;

pub fn competition_points_for_place(place: u32) -> u32 {
    if place == 1 {
        return 100;
    }
    if place == 2 {
        return 88;
    }
    if place == 3 {
        return 76;
    }
    if place == 4 {
        return 64;
    }
    if (5..=8).contains(&place) {
        return 48;
    }
    if (9..=16).contains(&place) {
        return 32;
    }
    if (17..=32).contains(&place) {
        return 16;
    }
    0
}

pub fn qualifying_bonus_for_rank(rank: u32) -> u32 {
    match rank {
        1 => 3,
        2 => 2,
        3 => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn competition_points_follow_step_table() {
        assert_eq!(competition_points_for_place(1), 100);
        assert_eq!(competition_points_for_place(2), 88);
        assert_eq!(competition_points_for_place(3), 76);
        assert_eq!(competition_points_for_place(4), 64);
        assert_eq!(competition_points_for_place(5), 48);
        assert_eq!(competition_points_for_place(8), 48);
        assert_eq!(competition_points_for_place(9), 32);
        assert_eq!(competition_points_for_place(16), 32);
        assert_eq!(competition_points_for_place(17), 16);
        assert_eq!(competition_points_for_place(32), 16);
        assert_eq!(competition_points_for_place(33), 0);
        assert_eq!(competition_points_for_place(0), 0);
    }

    #[test]
    fn qualifying_bonus_only_rewards_top_three() {
        assert_eq!(qualifying_bonus_for_rank(1), 3);
        assert_eq!(qualifying_bonus_for_rank(2), 2);
        assert_eq!(qualifying_bonus_for_rank(3), 1);
        assert_eq!(qualifying_bonus_for_rank(4), 0);
        assert_eq!(qualifying_bonus_for_rank(UNRANKED), 0);
    }
}
