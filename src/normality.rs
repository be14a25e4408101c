use crate::config::AnalysisConfig;
use crate::models::Status;

/// Group-level review verdict for one cell. Never looks at individual records.
pub fn evaluate_normality(count: u64, baseline: f64, config: &AnalysisConfig) -> Status {
    let needs_review = if baseline <= 0.0 {
        count >= config.min_count_for_review
    } else {
        count as f64 > baseline * config.review_multiplier
    };

    if needs_review {
        Status::NeedsReview
    } else {
        Status::Normal
    }
}
