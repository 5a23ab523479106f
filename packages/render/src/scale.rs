//! Value-to-visual-encoding mapping.
//!
//! A [`ColorScale`] maps a variable's fixed 1–5 answer domain onto five
//! discrete color buckets (a step function, so bands stay visually
//! distinguishable), and [`radius_for`] scales bubble markers linearly by
//! per-cell sample count.

use emotion_map_models::Variable;

/// Number of discrete color buckets per scale.
pub const COLOR_BUCKETS: usize = 5;

/// Minimum bubble radius in meters.
pub const BASE_RADIUS_M: f64 = 20.0;

/// Maximum additional radius on top of [`BASE_RADIUS_M`], in meters.
pub const MAX_ADDITIONAL_RADIUS_M: f64 = 100.0;

/// A discretized color scale over a variable's fixed domain.
///
/// The domain comes from the survey scale, never from the data, so colors
/// are comparable across runs and datasets. Out-of-domain values clamp to
/// the nearest bucket.
#[derive(Debug, Clone, Copy)]
pub struct ColorScale {
    colors: [&'static str; COLOR_BUCKETS],
    min: f64,
    max: f64,
}

impl ColorScale {
    /// The scale for a tracked variable.
    #[must_use]
    pub const fn for_variable(variable: Variable) -> Self {
        let (min, max) = variable.domain();
        Self {
            colors: ramp(variable),
            min,
            max,
        }
    }

    /// The bucket color for a value. Values outside the domain clamp.
    #[must_use]
    pub fn color_for(&self, value: f64) -> &'static str {
        let clamped = value.clamp(self.min, self.max);
        let normalized = (clamped - self.min) / (self.max - self.min);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bucket = ((normalized * COLOR_BUCKETS as f64) as usize).min(COLOR_BUCKETS - 1);
        self.colors[bucket]
    }

    /// The color used for cells with no data for this variable: the
    /// lowest bucket, matching how an unanswered value is displayed.
    #[must_use]
    pub const fn no_data_color(&self) -> &'static str {
        self.colors[0]
    }

    /// The bucket colors from low to high.
    #[must_use]
    pub const fn colors(&self) -> &[&'static str; COLOR_BUCKETS] {
        &self.colors
    }
}

/// Five-step sequential ramps, one per variable family. The emotional
/// variables keep the ramp hues of the original survey maps; the
/// environment variables share one teal ramp.
const fn ramp(variable: Variable) -> [&'static str; COLOR_BUCKETS] {
    match variable {
        // Reds
        Variable::Stress => ["#fee5d9", "#fcae91", "#fb6a4a", "#de2d26", "#a50f15"],
        // Greens
        Variable::Happy => ["#edf8e9", "#bae4b3", "#74c476", "#31a354", "#006d2c"],
        // Blues
        Variable::Loneliness => ["#eff3ff", "#bdd7e7", "#6baed6", "#3182bd", "#08519c"],
        // Oranges
        Variable::Anxiety => ["#feedde", "#fdbe85", "#fd8d3c", "#e6550d", "#a63603"],
        // Yellow-orange-red
        Variable::Energy => ["#ffffb2", "#fecc5c", "#fd8d3c", "#f03b20", "#bd0026"],
        // Teal
        Variable::EnvBeauty
        | Variable::EnvInteresting
        | Variable::EnvSafety
        | Variable::EnvCrowded
        | Variable::EnvironmentGreeness => {
            ["#e6f7f7", "#9de1e0", "#52c7c4", "#19b3ab", "#009a92"]
        }
    }
}

/// Bubble radius in meters for a cell's sample count, linearly
/// interpolated between the dataset's min and max counts.
///
/// When `min_count == max_count` (every cell has the same count) the
/// normalized value is defined as 0, so every bubble gets the minimum
/// radius instead of dividing by zero.
#[must_use]
pub fn radius_for(count: u64, min_count: u64, max_count: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let normalized = if max_count > min_count {
        (count.saturating_sub(min_count)) as f64 / (max_count - min_count) as f64
    } else {
        0.0
    };
    normalized.mul_add(MAX_ADDITIONAL_RADIUS_M, BASE_RADIUS_M)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_endpoints_hit_first_and_last_bucket() {
        let scale = ColorScale::for_variable(Variable::Stress);
        assert_eq!(scale.color_for(1.0), scale.colors()[0]);
        assert_eq!(scale.color_for(5.0), scale.colors()[4]);
    }

    #[test]
    fn out_of_domain_values_clamp() {
        let scale = ColorScale::for_variable(Variable::Happy);
        assert_eq!(scale.color_for(-3.0), scale.colors()[0]);
        assert_eq!(scale.color_for(99.0), scale.colors()[4]);
    }

    #[test]
    fn midpoint_lands_in_middle_bucket() {
        let scale = ColorScale::for_variable(Variable::Energy);
        assert_eq!(scale.color_for(3.0), scale.colors()[2]);
    }

    #[test]
    fn scale_is_monotonic() {
        let scale = ColorScale::for_variable(Variable::Loneliness);
        let mut last_bucket = 0;
        for step in 0..=40 {
            let value = 1.0 + f64::from(step) * 0.1;
            let color = scale.color_for(value);
            let bucket = scale.colors().iter().position(|&c| c == color).unwrap();
            assert!(bucket >= last_bucket);
            last_bucket = bucket;
        }
    }

    #[test]
    fn radius_spans_base_to_max() {
        assert!((radius_for(1, 1, 10) - BASE_RADIUS_M).abs() < f64::EPSILON);
        assert!(
            (radius_for(10, 1, 10) - (BASE_RADIUS_M + MAX_ADDITIONAL_RADIUS_M)).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn degenerate_count_range_returns_minimum_radius() {
        assert!((radius_for(7, 3, 3) - BASE_RADIUS_M).abs() < f64::EPSILON);
        assert!((radius_for(0, 0, 0) - BASE_RADIUS_M).abs() < f64::EPSILON);
    }

    #[test]
    fn emotion_ramps_are_distinct() {
        let stress = ColorScale::for_variable(Variable::Stress);
        let happy = ColorScale::for_variable(Variable::Happy);
        assert_ne!(stress.colors()[4], happy.colors()[4]);
    }
}
