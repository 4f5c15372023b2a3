//! Pet level progression.
//!
//! Thresholds and level-up bonuses are piecewise in the current level. A
//! single experience grant may cross several levels; each crossed level
//! pays its own bonus.

use serde::Serialize;

const MAX_LEVEL_UP_BONUS: i64 = 3000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Progression {
    pub level: i32,
    pub experience: i64,
    pub bonus_points: i64,
    pub leveled_up: bool,
}

/// Experience needed to leave `level`.
pub fn required_experience(level: i32) -> i64 {
    let l = i64::from(level.max(1));
    if l <= 10 {
        40 * l + 60
    } else if l <= 100 {
        // floor(0.8 * l^2 + 380), kept in integers
        4 * l * l / 5 + 380
    } else {
        let threshold = (285.69 * 1.06_f64.powi(level)).floor();
        if threshold >= i64::MAX as f64 {
            i64::MAX
        } else {
            threshold as i64
        }
    }
}

/// Points credited when a pet reaches `level`.
pub fn level_up_bonus(level: i32) -> i64 {
    let l = i64::from(level);
    match level {
        i32::MIN..=10 => l * 10,
        11..=20 => l * 20,
        21..=30 => l * 30,
        31..=40 => l * 40,
        41..=50 => l * 50,
        _ => (l * 60).min(MAX_LEVEL_UP_BONUS),
    }
}

/// Add `gained` experience and resolve every level-up it triggers.
///
/// Negative grants are ignored: progression never takes experience away.
pub fn progress(level: i32, experience: i64, gained: i64) -> Progression {
    let mut level = level.max(1);
    let mut experience = experience.max(0).saturating_add(gained.max(0));
    let mut bonus_points = 0;
    let mut leveled_up = false;

    loop {
        let required = required_experience(level);
        if experience < required {
            break;
        }
        experience -= required;
        level += 1;
        bonus_points += level_up_bonus(level);
        leveled_up = true;
    }

    Progression {
        level,
        experience,
        bonus_points,
        leveled_up,
    }
}
