//! Sign-in streaks and the reward of the next sign-in.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

const BASE_POINTS: i64 = 20;
const WEEKEND_POINTS: i64 = 30;
const WEEKEND_EXPERIENCE: i64 = 200;

/// Additive streak milestones: `(min_streak, points, experience, coupons)`.
///
/// Every tier whose threshold is reached applies, so day 30 collects the
/// 7-day, 14-day and 30-day bonuses together.
const MILESTONES: [(u32, i64, i64, u32); 3] = [
    (7, 40, 300, 1),
    (14, 60, 500, 0),
    (30, 200, 2000, 1),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SignInReward {
    pub points: i64,
    pub experience: i64,
    pub coupons: u32,
    /// Consecutive days including today's sign-in.
    pub streak: u32,
}

/// Consecutive days with a sign-in ending yesterday.
///
/// `dates` should be most recent first. Dates on or after `today` and
/// duplicates are skipped.
pub fn streak_before(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let Some(mut expected) = today.pred_opt() else {
        return 0;
    };
    let mut streak = 0;
    for &date in dates {
        if date > expected {
            continue;
        }
        if date < expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(previous) => expected = previous,
            None => break,
        }
    }
    streak
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Reward for signing in on `today` after `streak_before` consecutive days.
pub fn reward_for(streak_before: u32, today: NaiveDate) -> SignInReward {
    let streak = streak_before.saturating_add(1);
    let mut reward = if is_weekend(today) {
        SignInReward {
            points: WEEKEND_POINTS,
            experience: WEEKEND_EXPERIENCE,
            coupons: 0,
            streak,
        }
    } else {
        SignInReward {
            points: BASE_POINTS,
            experience: 0,
            coupons: 0,
            streak,
        }
    };

    for (min_streak, points, experience, coupons) in MILESTONES {
        if streak >= min_streak {
            reward.points += points;
            reward.experience += experience;
            reward.coupons += coupons;
        }
    }
    reward
}

/// Streak and reward for a sign-in on `today` given the history in `dates`.
pub fn next_reward(dates: &[NaiveDate], today: NaiveDate) -> SignInReward {
    reward_for(streak_before(dates, today), today)
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;

    // 2024-05-15 is a Wednesday.
    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn days_before(today: NaiveDate, n: u64) -> Vec<NaiveDate> {
        (1..=n).map(|i| today - Days::new(i)).collect()
    }

    #[test]
    fn counts_three_consecutive_days() {
        let today = wednesday();
        assert_eq!(streak_before(&days_before(today, 3), today), 3);
    }

    #[test]
    fn gap_stops_the_walk() {
        let today = wednesday();
        let dates = vec![
            today - Days::new(1),
            today - Days::new(2),
            today - Days::new(4),
            today - Days::new(5),
        ];
        assert_eq!(streak_before(&dates, today), 2);
    }

    #[test]
    fn missing_yesterday_resets_streak() {
        let today = wednesday();
        let dates = vec![today - Days::new(2), today - Days::new(3)];
        assert_eq!(streak_before(&dates, today), 0);
    }

    #[test]
    fn today_and_duplicates_are_ignored() {
        let today = wednesday();
        let dates = vec![
            today,
            today - Days::new(1),
            today - Days::new(1),
            today - Days::new(2),
        ];
        assert_eq!(streak_before(&dates, today), 2);
    }

    #[test]
    fn weekday_base_reward() {
        let reward = reward_for(0, wednesday());
        assert_eq!(
            reward,
            SignInReward {
                points: 20,
                experience: 0,
                coupons: 0,
                streak: 1,
            }
        );
    }

    #[test]
    fn weekend_base_reward() {
        let saturday = NaiveDate::from_ymd_opt(2024, 5, 18).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        for day in [saturday, sunday] {
            let reward = reward_for(2, day);
            assert_eq!(reward.points, 30);
            assert_eq!(reward.experience, 200);
            assert_eq!(reward.streak, 3);
        }
    }

    #[test]
    fn seventh_day_adds_first_tier() {
        let reward = reward_for(6, wednesday());
        assert_eq!(reward.points, 20 + 40);
        assert_eq!(reward.experience, 300);
        assert_eq!(reward.coupons, 1);
        assert_eq!(reward.streak, 7);
    }

    #[test]
    fn fourteenth_day_stacks_two_tiers() {
        let reward = reward_for(13, wednesday());
        assert_eq!(reward.points, 20 + 40 + 60);
        assert_eq!(reward.experience, 300 + 500);
        assert_eq!(reward.coupons, 1);
    }

    #[test]
    fn thirtieth_day_stacks_every_tier() {
        let reward = reward_for(29, wednesday());
        assert_eq!(reward.points, 20 + 40 + 60 + 200);
        assert_eq!(reward.experience, 300 + 500 + 2000);
        assert_eq!(reward.coupons, 2);
        assert_eq!(reward.streak, 30);
    }

    #[test]
    fn weekend_thirtieth_day_stacks_on_weekend_base() {
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        let reward = next_reward(&days_before(sunday, 29), sunday);
        assert_eq!(reward.points, 30 + 40 + 60 + 200);
        assert_eq!(reward.experience, 200 + 300 + 500 + 2000);
        assert_eq!(reward.coupons, 2);
    }
}
