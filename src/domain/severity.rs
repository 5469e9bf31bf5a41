// Severity banding for KPI displays. Thresholds are deployment
// configuration, not invariants; defaults follow the primary banding.
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Warn,
    Risk,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Warn => "warn",
            Severity::Risk => "risk",
        }
    }
}

/// Bands for percent-time-over-threshold and for an instant PM2.5 value.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SeverityBands {
    /// Percent-over-threshold: at most this is OK.
    pub pct_ok_max: f64,
    /// Percent-over-threshold: at most this is a warning, above is risk.
    pub pct_warn_max: f64,
    /// Instant PM2.5 below this is OK.
    pub pm25_ok_below: f64,
    /// Instant PM2.5 below this is a warning, at or above is risk.
    pub pm25_warn_below: f64,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            pct_ok_max: 10.0,
            pct_warn_max: 20.0,
            pm25_ok_below: 12.0,
            pm25_warn_below: 15.0,
        }
    }
}

impl SeverityBands {
    pub fn classify_percent_over(&self, pct: f64) -> Severity {
        if pct > self.pct_warn_max {
            Severity::Risk
        } else if pct > self.pct_ok_max {
            Severity::Warn
        } else {
            Severity::Ok
        }
    }

    /// `None` for a missing or non-finite reading.
    pub fn classify_pm25(&self, value: Option<f64>) -> Option<Severity> {
        let value = value.filter(|v| v.is_finite())?;
        Some(if value < self.pm25_ok_below {
            Severity::Ok
        } else if value < self.pm25_warn_below {
            Severity::Warn
        } else {
            Severity::Risk
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_bands() {
        let bands = SeverityBands::default();
        assert_eq!(bands.classify_percent_over(0.0), Severity::Ok);
        assert_eq!(bands.classify_percent_over(10.0), Severity::Ok);
        assert_eq!(bands.classify_percent_over(10.1), Severity::Warn);
        assert_eq!(bands.classify_percent_over(20.0), Severity::Warn);
        assert_eq!(bands.classify_percent_over(20.1), Severity::Risk);
    }

    #[test]
    fn test_pm25_bands() {
        let bands = SeverityBands::default();
        assert_eq!(bands.classify_pm25(Some(8.0)), Some(Severity::Ok));
        assert_eq!(bands.classify_pm25(Some(13.5)), Some(Severity::Warn));
        assert_eq!(bands.classify_pm25(Some(15.0)), Some(Severity::Risk));
        assert_eq!(bands.classify_pm25(Some(f64::NAN)), None);
        assert_eq!(bands.classify_pm25(None), None);
    }
}
