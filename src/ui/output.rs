//! Output mode and formatting helpers.

use std::str::FromStr;
use std::time::Duration;

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Show per-unit progress and diagnostics.
    Verbose,
    /// Show phases and status.
    #[default]
    Normal,
    /// Show nothing except errors.
    Quiet,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verbose" => Ok(Self::Verbose),
            "normal" => Ok(Self::Normal),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("unknown output mode: {}", s)),
        }
    }
}

impl OutputMode {
    /// Check if this mode shows per-unit lines.
    pub fn shows_units(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Check if this mode shows status messages.
    pub fn shows_status(&self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

/// Format a duration compactly: `500ms`, `5.3s`, `1.5m`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_case_insensitively() {
        assert_eq!("Verbose".parse::<OutputMode>().unwrap(), OutputMode::Verbose);
        assert_eq!("quiet".parse::<OutputMode>().unwrap(), OutputMode::Quiet);
        assert!("loud".parse::<OutputMode>().is_err());
    }

    #[test]
    fn quiet_hides_status() {
        assert!(!OutputMode::Quiet.shows_status());
        assert!(OutputMode::Normal.shows_status());
        assert!(!OutputMode::Normal.shows_units());
        assert!(OutputMode::Verbose.shows_units());
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::ZERO), "0ms");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs_f64(5.3)), "5.3s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }
}
