//! Ranking and color mapping for professor/course statistics.
//!
//! Department-relative values are colored by how close their percentile lands
//! to the user's preferred percentile; RateMyProfessors values, which have no
//! department distribution, are colored by raw magnitude on the same
//! red/yellow/green ramp.

use serde::{Deserialize, Serialize};

const GREEN: [f64; 3] = [66.0, 134.0, 67.0];
const YELLOW: [f64; 3] = [255.0, 165.0, 0.0];
const RED: [f64; 3] = [194.0, 59.0, 34.0];

/// Color used when a value is absent.
pub const NEUTRAL_COLOR: &str = "rgba(0, 0, 0, 0.5)";

/// Overall ranking score: quality counts up, difficulty (out of 5) and
/// weekly workload hours (out of 15) count down.
pub fn overall_score(quality: f64, difficulty: f64, workload: f64) -> f64 {
    quality + (5.0 - difficulty) + (15.0 - workload)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Overall,
    Quality,
    Difficulty,
    Workload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Tri-state column sorting: selecting a new metric sorts descending,
/// re-selecting the active one flips the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub metric: Metric,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            metric: Metric::Overall,
            direction: SortDirection::Descending,
        }
    }
}

impl SortState {
    pub fn select(&mut self, metric: Metric) {
        if self.metric == metric {
            self.direction = match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        } else {
            self.metric = metric;
            self.direction = SortDirection::Descending;
        }
    }
}

/// Rank of `value` within a sorted department-average array, as a 0-1
/// fraction (insertion-point binary search over array length).
pub fn percentile(value: f64, sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    insertion_point(sorted, value) as f64 / sorted.len() as f64
}

fn insertion_point(sorted: &[f64], target: f64) -> usize {
    let mut left = 0usize;
    let mut right = sorted.len() as isize - 1;
    while left as isize <= right {
        let mid = (left + right as usize) / 2;
        if sorted[mid] == target {
            return mid;
        }
        if sorted[mid] < target {
            left = mid + 1;
        } else {
            right = mid as isize - 1;
        }
    }
    left
}

/// Color for a department-relative value: 100 minus the distance between the
/// value's percentile and the user's preferred percentile, on a 0-100 ramp.
pub fn percentile_color(value: f64, dept_sorted: &[f64], preferred_percentile: f64) -> String {
    let p = percentile(value, dept_sorted);
    let score = 100.0 - (preferred_percentile - p).abs() * 100.0;
    rating_color(Some(score), 0.0, 100.0, true)
}

/// Color for a raw RMP quality rating on the 1-5 scale.
pub fn rmp_quality_color(value: f64) -> String {
    rating_color(Some(value), 1.0, 5.0, true)
}

/// Color for an RMP difficulty rating: distance from the user's preferred
/// difficulty on a 0-4 scale, where smaller distance is better.
pub fn rmp_difficulty_color(value: f64, preferred_difficulty_percentile: f64) -> String {
    let distance = (preferred_difficulty_percentile * 4.0 - value + 1.0).abs();
    rating_color(Some(distance), 0.0, 4.0, false)
}

/// Maps a rating onto a 3-stop red/yellow/green linear RGB ramp split at the
/// midpoint of the valid range. `good_values_are_higher` flips the ramp for
/// scales where low is good. Out-of-range ratings clamp; `None` is neutral.
pub fn rating_color(
    rating: Option<f64>,
    rating_min: f64,
    rating_max: f64,
    good_values_are_higher: bool,
) -> String {
    let Some(rating) = rating else {
        return NEUTRAL_COLOR.to_string();
    };
    let rating = rating.clamp(rating_min, rating_max);
    let rating_mid = rating_min + (rating_max - rating_min) / 2.0;
    if rating <= rating_mid {
        let ratio = (rating - rating_min) / (rating_mid - rating_min);
        if good_values_are_higher {
            interpolate_color(RED, YELLOW, ratio)
        } else {
            interpolate_color(GREEN, YELLOW, ratio)
        }
    } else {
        let ratio = (rating - rating_mid) / (rating_max - rating_mid);
        if good_values_are_higher {
            interpolate_color(YELLOW, GREEN, ratio)
        } else {
            interpolate_color(YELLOW, RED, ratio)
        }
    }
}

fn interpolate_color(from: [f64; 3], to: [f64; 3], ratio: f64) -> String {
    let r = (from[0] + ratio * (to[0] - from[0])).round() as u8;
    let g = (from[1] + ratio * (to[1] - from[1])).round() as u8;
    let b = (from[2] + ratio * (to[2] - from[2])).round() as u8;
    format!("rgba({r}, {g}, {b}, 1)")
}
