use crate::config::AnalysisConfig;
use crate::models::Trend;

/// Trailing mean of up to `windows` prior counts for every index of `series`.
///
/// The first entry always has an empty history and therefore a baseline of 0.
pub fn trailing_baselines(series: &[u64], windows: usize) -> Vec<f64> {
    (0..series.len())
        .map(|index| {
            let history = &series[index.saturating_sub(windows)..index];
            if history.is_empty() {
                0.0
            } else {
                history.iter().sum::<u64>() as f64 / history.len() as f64
            }
        })
        .collect()
}

pub fn compute_trend(count: u64, baseline: f64, config: &AnalysisConfig) -> Trend {
    if baseline <= 0.0 {
        return if count > 0 { Trend::Up } else { Trend::Steady };
    }

    let count = count as f64;
    if count > baseline * (1.0 + config.trend_delta) {
        Trend::Up
    } else if count < baseline * (1.0 - config.trend_delta) {
        Trend::Down
    } else {
        Trend::Steady
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_window_has_zero_baseline() {
        assert_eq!(trailing_baselines(&[9], 7), vec![0.0]);
        assert_eq!(trailing_baselines(&[], 7), Vec::<f64>::new());
    }

    #[test]
    fn baseline_averages_at_most_the_configured_windows() {
        let series = [1, 2, 3, 4, 5, 6, 7, 8, 100];
        let baselines = trailing_baselines(&series, 7);
        assert_eq!(baselines[1], 1.0);
        assert_eq!(baselines[2], 1.5);
        // Index 8 averages indices 1..8, dropping the very first count.
        assert_eq!(baselines[8], 35.0 / 7.0);
    }

    #[test]
    fn trend_threshold_is_exclusive() {
        let config = AnalysisConfig::default();
        assert_eq!(compute_trend(110, 100.0, &config), Trend::Steady);
        assert_eq!(compute_trend(111, 100.0, &config), Trend::Up);
        assert_eq!(compute_trend(90, 100.0, &config), Trend::Steady);
        assert_eq!(compute_trend(89, 100.0, &config), Trend::Down);
    }

    #[test]
    fn zero_baseline_never_divides() {
        let config = AnalysisConfig::default();
        assert_eq!(compute_trend(0, 0.0, &config), Trend::Steady);
        assert_eq!(compute_trend(1, 0.0, &config), Trend::Up);
    }
}
