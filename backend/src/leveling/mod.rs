//! Points and level arithmetic.

pub mod progression;

pub use progression::{
    level_for_points, points_for_level, progress, LevelProgress, PointAction, LEVEL_THRESHOLDS,
    POINTS_PER_LEVEL_AFTER_TABLE,
};
