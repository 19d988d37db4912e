//! Rolling-window super-majority voter.

use super::window::FrameWindow;
use crate::config::TemporalConfig;
use crate::types::Verdict;

/// Votes over the last N frame tags.
///
/// The verdict is `Alarm` only when the window is full **and** the alarm tag
/// appears at least `alarm_min_count` times. A partially filled window is
/// always `Normal`, so a short burst at startup cannot trigger.
#[derive(Debug, Clone)]
pub struct TemporalVoter {
    window: FrameWindow,
    alarm_tag: String,
    alarm_min_count: usize,
}

impl TemporalVoter {
    pub fn new(config: &TemporalConfig) -> Self {
        Self {
            window: FrameWindow::new(config.window_size),
            alarm_tag: config.alarm_tag.clone(),
            alarm_min_count: config.alarm_min_count,
        }
    }

    /// Fold one tag into the window and return the current verdict.
    pub fn observe(&mut self, tag: &str) -> Verdict {
        self.window.push(tag);
        self.verdict()
    }

    pub fn verdict(&self) -> Verdict {
        if self.window.is_full() && self.alarm_count() >= self.alarm_min_count {
            Verdict::Alarm
        } else {
            Verdict::Normal
        }
    }

    pub fn alarm_count(&self) -> usize {
        self.window.count(&self.alarm_tag)
    }

    pub fn window(&self) -> &FrameWindow {
        &self.window
    }
}

impl Default for TemporalVoter {
    fn default() -> Self {
        Self::new(&TemporalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(voter: &mut TemporalVoter, tags: &[&str]) -> Verdict {
        let mut last = Verdict::Normal;
        for tag in tags {
            last = voter.observe(tag);
        }
        last
    }

    #[test]
    fn test_partial_window_is_always_normal() {
        let mut voter = TemporalVoter::default();
        for _ in 0..9 {
            assert_eq!(voter.observe("HELP"), Verdict::Normal);
        }
        assert_eq!(voter.observe("HELP"), Verdict::Alarm);
    }

    #[test]
    fn test_eight_of_ten_is_alarm() {
        let mut voter = TemporalVoter::default();
        let tags = [
            "Neutral", "Neutral", "HELP", "HELP", "HELP", "HELP", "HELP", "HELP", "HELP", "HELP",
        ];
        assert_eq!(feed(&mut voter, &tags), Verdict::Alarm);
        assert_eq!(voter.alarm_count(), 8);
    }

    #[test]
    fn test_seven_of_ten_is_normal() {
        let mut voter = TemporalVoter::default();
        let mut tags = vec!["HELP"; 7];
        tags.extend(["Neutral"; 3]);
        assert_eq!(feed(&mut voter, &tags), Verdict::Normal);
    }

    #[test]
    fn test_nine_and_ten_are_alarm() {
        let mut voter = TemporalVoter::default();
        let mut tags = vec!["Neutral"];
        tags.extend(["HELP"; 9]);
        assert_eq!(feed(&mut voter, &tags), Verdict::Alarm);
        assert_eq!(voter.observe("HELP"), Verdict::Alarm);
        assert_eq!(voter.alarm_count(), 10);
    }

    #[test]
    fn test_isolated_misclassifications_do_not_break_alarm() {
        let mut voter = TemporalVoter::default();
        feed(&mut voter, &["HELP"; 10]);
        assert_eq!(voter.observe("Neutral"), Verdict::Alarm);
        assert_eq!(voter.observe("WAVE"), Verdict::Alarm);
        // Third miss inside the window drops below the super-majority.
        assert_eq!(voter.observe("Neutral"), Verdict::Normal);
    }

    #[test]
    fn test_custom_threshold_from_config() {
        let config = TemporalConfig {
            window_size: 4,
            alarm_min_count: 3,
            ..TemporalConfig::default()
        };
        let mut voter = TemporalVoter::new(&config);
        assert_eq!(feed(&mut voter, &["HELP", "Neutral", "HELP", "HELP"]), Verdict::Alarm);
    }
}
