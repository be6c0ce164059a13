//! Picks the output style for a run.

/// How the binary presents a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Live progress on stderr, colored report on stdout
    Text,
    /// No progress, plain report at the end
    Silent,
    /// Report as JSON only
    Json,
}

impl DisplayMode {
    /// `--json` always means JSON. Otherwise progress is only shown when
    /// stdout is a terminal, so piped runs get the bare report.
    pub fn detect(json_flag: bool, is_tty: bool) -> Self {
        if json_flag {
            DisplayMode::Json
        } else if is_tty {
            DisplayMode::Text
        } else {
            DisplayMode::Silent
        }
    }

    /// Progress lines go to stderr in text mode only.
    pub fn shows_progress(&self) -> bool {
        *self == DisplayMode::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_json_flag_returns_json_mode() {
        assert_eq!(DisplayMode::detect(true, true), DisplayMode::Json);
        assert_eq!(DisplayMode::detect(true, false), DisplayMode::Json);
    }

    #[test]
    fn test_tty_without_json_returns_text_mode() {
        assert_eq!(DisplayMode::detect(false, true), DisplayMode::Text);
    }

    #[test]
    fn test_piped_output_is_silent() {
        let mode = DisplayMode::detect(false, false);
        assert_eq!(mode, DisplayMode::Silent);
        assert!(!mode.shows_progress());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// JSON wins, then the terminal decides between text and silent.
        #[test]
        fn display_mode_selection(
            json_flag in any::<bool>(),
            is_tty in any::<bool>()
        ) {
            let result = DisplayMode::detect(json_flag, is_tty);

            if json_flag {
                prop_assert_eq!(result, DisplayMode::Json);
            } else if is_tty {
                prop_assert_eq!(result, DisplayMode::Text);
            } else {
                prop_assert_eq!(result, DisplayMode::Silent);
            }
            prop_assert_eq!(result.shows_progress(), !json_flag && is_tty);
        }
    }
}
