//! Cutflow reports.

use std::fmt;

use common_error::FlowError;
use log::info;
use serde::{Deserialize, Serialize};

/// Statistics of one named filter, merged across slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFilterStats")]
pub struct FilterStats {
    /// Filter name.
    pub name: String,
    /// Rows accepted by the filter.
    pub passed: u64,
    /// Rows that reached the filter.
    pub total: u64,
}

impl FilterStats {
    /// Rows rejected by the filter.
    pub fn rejected(&self) -> u64 {
        self.total.saturating_sub(self.passed)
    }

    /// Acceptance in percent; zero when no row reached the filter.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Deserialize)]
struct RawFilterStats {
    name: String,
    passed: u64,
    total: u64,
}

impl TryFrom<RawFilterStats> for FilterStats {
    type Error = FlowError;

    fn try_from(raw: RawFilterStats) -> Result<Self, Self::Error> {
        if raw.passed > raw.total {
            return Err(FlowError::value_error(format!(
                "filter {:?} passed {} of only {} rows",
                raw.name, raw.passed, raw.total
            )));
        }
        Ok(Self {
            name: raw.name,
            passed: raw.passed,
            total: raw.total,
        })
    }
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10}: pass={:<10} all={:<10} -- {:8.3} %",
            self.name,
            self.passed,
            self.total,
            self.percentage()
        )
    }
}

/// Named-filter statistics in booking order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutflowReport {
    entries: Vec<FilterStats>,
}

impl CutflowReport {
    pub(crate) fn new(entries: Vec<FilterStats>) -> Self {
        Self { entries }
    }

    /// All entries, in booking order.
    pub fn entries(&self) -> &[FilterStats] {
        &self.entries
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> impl Iterator<Item = &FilterStats> {
        self.entries.iter()
    }

    /// Entry of the filter called `name`.
    pub fn get(&self, name: &str) -> Option<&FilterStats> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no named filter is in scope.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Log every line at `info` level.
    pub fn log(&self) {
        for entry in &self.entries {
            info!("{entry}");
        }
    }
}

impl fmt::Display for CutflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a CutflowReport {
    type Item = &'a FilterStats;
    type IntoIter = std::slice::Iter<'a, FilterStats>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let stats = FilterStats {
            name: "cutA".into(),
            passed: 3,
            total: 4,
        };
        assert_eq!(stats.rejected(), 1);
        assert_eq!(
            stats.to_string(),
            "cutA      : pass=3          all=4          --   75.000 %"
        );
    }

    #[test]
    fn test_empty_filter_percentage() {
        let stats = FilterStats {
            name: "never".into(),
            passed: 0,
            total: 0,
        };
        assert_eq!(stats.percentage(), 0.0);
    }

    #[test]
    fn test_report_lookup_and_serde() {
        let report = CutflowReport::new(vec![
            FilterStats {
                name: "a".into(),
                passed: 1,
                total: 2,
            },
            FilterStats {
                name: "b".into(),
                passed: 0,
                total: 1,
            },
        ]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.get("b").map(|s| s.total), Some(1));
        assert_eq!(report.to_string().lines().count(), 2);

        let json = serde_json::to_string(&report).unwrap();
        let back: CutflowReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_stats() {
        let bad = r#"{"name":"cut","passed":5,"total":3}"#;
        assert!(serde_json::from_str::<FilterStats>(bad).is_err());

        let good: FilterStats = serde_json::from_str(r#"{"name":"cut","passed":2,"total":3}"#).unwrap();
        assert_eq!(good.rejected(), 1);
    }
}
