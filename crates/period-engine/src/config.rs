//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::calendar::{WeekConfig, WeekStartDay};
use crate::period::MAX_REPEAT_COUNT;

/// Options shared by every stage of a comparison request.
///
/// Every field has a default, so a host can deserialize a partial settings
/// object (`{"week_start": "sunday"}`) and get the rest filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Which day starts the week for truncation and week numbering.
    pub week_start: WeekStartDay,
    /// Clamp projected windows so they never start before their period.
    pub force_range_start_after_period: bool,
    /// Upper bound on `repeat_count`; may only tighten [`MAX_REPEAT_COUNT`].
    pub max_repeat_count: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            week_start: WeekStartDay::Monday,
            force_range_start_after_period: true,
            max_repeat_count: MAX_REPEAT_COUNT,
        }
    }
}

impl EngineOptions {
    pub fn week_config(&self) -> WeekConfig {
        WeekConfig::new(self.week_start)
    }

    /// The configured limit, never above [`MAX_REPEAT_COUNT`].
    pub fn effective_max_repeat_count(&self) -> u32 {
        self.max_repeat_count.min(MAX_REPEAT_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.week_start, WeekStartDay::Monday);
        assert!(options.force_range_start_after_period);
        assert_eq!(options.effective_max_repeat_count(), 366);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let options: EngineOptions =
            serde_json::from_str(r#"{"week_start":"sunday","max_repeat_count":5000}"#).unwrap();
        assert_eq!(options.week_config().week_start, WeekStartDay::Sunday);
        assert!(options.force_range_start_after_period);
        assert_eq!(options.effective_max_repeat_count(), MAX_REPEAT_COUNT);
    }

    #[test]
    fn test_serialize_round_trip() {
        let options = EngineOptions {
            week_start: WeekStartDay::Sunday,
            force_range_start_after_period: false,
            max_repeat_count: 24,
        };
        let json = serde_json::to_string(&options).unwrap();
        let back: EngineOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
