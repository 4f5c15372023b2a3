//! Mini-game outcome simulator.
//!
//! The simulator is a pure function of the pet vitals, the difficulty and a
//! [`GameRandom`] source. It never touches storage; the coordinator applies
//! its output inside the owner's unit of work.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    pets::{VitalDelta, Vitals},
};

/// Stamina a pet needs before it is allowed to play.
pub const MIN_STAMINA_TO_PLAY: i32 = 20;

const WIN_BASE_POINTS: i64 = 10;
const LOSE_EXPERIENCE: i64 = 5;
const MAX_WIN_PROBABILITY: f64 = 0.9;
const ABORT_STAMINA_COST: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub fn level(self) -> i64 {
        match self {
            Self::Easy => 1,
            Self::Normal => 2,
            Self::Hard => 3,
        }
    }

    pub fn monster_count(self) -> i64 {
        match self {
            Self::Easy => 5,
            Self::Normal => 8,
            Self::Hard => 12,
        }
    }

    /// Speed of the monsters relative to the easy level.
    pub fn speed_multiplier(self) -> f64 {
        match self {
            Self::Easy => 1.0,
            Self::Normal => 1.5,
            Self::Hard => 2.0,
        }
    }

    fn coupons_on_win(self) -> u32 {
        match self {
            Self::Hard => 1,
            Self::Easy | Self::Normal => 0,
        }
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = EngineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Easy),
            2 => Ok(Self::Normal),
            3 => Ok(Self::Hard),
            other => Err(EngineError::InvalidDifficulty(format!(
                "difficulty must be 1, 2 or 3, got {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Win,
    Lose,
    Abort,
}

impl GameOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Lose => "lose",
            Self::Abort => "abort",
        }
    }
}

impl TryFrom<&str> for GameOutcome {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "win" => Ok(Self::Win),
            "lose" => Ok(Self::Lose),
            "abort" => Ok(Self::Abort),
            other => Err(EngineError::InvalidInput(format!(
                "invalid game outcome: {other}"
            ))),
        }
    }
}

/// Source of randomness for the mini-game.
///
/// Implementations must be deterministic when seeded so game outcomes can be
/// replayed in tests.
pub trait GameRandom: Send {
    /// Returns `true` with probability `p` (clamped to `0.0..=1.0`).
    fn chance(&mut self, p: f64) -> bool;
    /// Uniform integer in `lo..=hi`.
    fn roll(&mut self, lo: i32, hi: i32) -> i32;
}

/// Adapts any `rand` generator to [`GameRandom`].
#[derive(Debug)]
pub struct RngSource<R>(pub R);

impl<R: Rng + Send> GameRandom for RngSource<R> {
    fn chance(&mut self, p: f64) -> bool {
        self.0.random_bool(p.clamp(0.0, 1.0))
    }

    fn roll(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.0.random_range(lo..=hi)
    }
}

/// Everything a single round produces, before clamping and persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SimulatedGame {
    pub outcome: GameOutcome,
    pub monsters_defeated: i64,
    pub points: i64,
    pub experience: i64,
    pub coupons: u32,
    pub vital_delta: VitalDelta,
}

pub fn win_probability(vitals: &Vitals) -> f64 {
    let bonus = f64::from(vitals.mood + vitals.stamina) / 200.0;
    (0.5 + bonus).min(MAX_WIN_PROBABILITY)
}

/// Simulate one round.
///
/// With `abort` set the round ends before the outcome is drawn: no reward,
/// but the pet still pays the vital cost of starting the game.
pub fn simulate(
    vitals: &Vitals,
    difficulty: Difficulty,
    abort: bool,
    rng: &mut dyn GameRandom,
) -> SimulatedGame {
    let outcome = if abort {
        GameOutcome::Abort
    } else if rng.chance(win_probability(vitals)) {
        GameOutcome::Win
    } else {
        GameOutcome::Lose
    };

    let level = difficulty.level();
    let monsters = difficulty.monster_count();
    let (monsters_defeated, points, experience, coupons) = match outcome {
        GameOutcome::Win => (
            monsters,
            level * 10 + monsters * 5 + WIN_BASE_POINTS,
            level * 50 + monsters * 10,
            difficulty.coupons_on_win(),
        ),
        GameOutcome::Lose => (
            i64::from(rng.roll(0, (monsters - 1) as i32)),
            0,
            LOSE_EXPERIENCE,
            0,
        ),
        GameOutcome::Abort => (0, 0, 0, 0),
    };

    let hunger = -rng.roll(5, 15);
    let stamina = match outcome {
        GameOutcome::Win => -rng.roll(10, 25),
        GameOutcome::Lose => -rng.roll(20, 30),
        GameOutcome::Abort => -ABORT_STAMINA_COST,
    };
    let mood = match outcome {
        GameOutcome::Win => rng.roll(5, 15),
        GameOutcome::Lose | GameOutcome::Abort => -rng.roll(5, 30),
    };
    let cleanliness = -rng.roll(2, 20);

    SimulatedGame {
        outcome,
        monsters_defeated,
        points,
        experience,
        coupons,
        vital_delta: VitalDelta {
            hunger,
            mood,
            stamina,
            cleanliness,
        },
    }
}
