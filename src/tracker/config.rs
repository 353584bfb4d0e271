/// Tunable knobs for the activity tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Engagement stops accruing this long after the last interaction.
    pub idle_window_secs: i64,

    /// Delay between page settle and the one-shot analysis request.
    pub analysis_debounce_secs: u64,

    /// Minimum extracted-text length to bother the Analysis Provider.
    pub min_analysis_chars: usize,

    /// Page views shorter than this are never logged.
    pub min_log_secs: i64,

    /// Engagement score weights
    pub weight_time: f64,
    pub weight_scroll: f64,
    pub weight_reading_ratio: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_window_secs: 30,
            analysis_debounce_secs: 3,
            min_analysis_chars: 100,
            min_log_secs: 10,
            weight_time: 0.30,
            weight_scroll: 0.30,
            weight_reading_ratio: 0.40,
        }
    }
}
