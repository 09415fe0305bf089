//! Per-generation fitness metric statistics.
//!
//! Every evaluated individual carries an itemized [`MetricSet`]. After each
//! generation the runner folds the population's sets into one
//! [`GenerationMetrics`] row (min/avg/max per metric), and the rows together
//! form the [`MetricsTable`] used for charting.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named metric values for one evaluated individual.
pub type MetricSet = BTreeMap<String, f64>;

/// Distribution of one metric across a population.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl MetricStats {
    /// Summarizes a non-empty sequence of values; returns None when empty.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            min,
            avg: sum / count as f64,
            max,
        })
    }
}

/// One row of the metrics table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenerationMetrics {
    /// Generation index (0 = initial population).
    pub generation: u32,
    /// Best fitness in this generation.
    pub best_fitness: f64,
    /// Per-metric distribution.
    pub stats: BTreeMap<String, MetricStats>,
}

impl GenerationMetrics {
    /// Folds a population's metric sets into one row.
    pub fn from_population<'a, I>(generation: u32, best_fitness: f64, sets: I) -> Self
    where
        I: IntoIterator<Item = &'a MetricSet>,
    {
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for set in sets {
            for (name, value) in set {
                columns.entry(name.clone()).or_default().push(*value);
            }
        }

        let stats = columns
            .into_iter()
            .filter_map(|(name, values)| MetricStats::from_values(values).map(|s| (name, s)))
            .collect();

        Self {
            generation,
            best_fitness,
            stats,
        }
    }
}

/// Per-generation metric rows for a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsTable {
    pub rows: Vec<GenerationMetrics>,
}

impl MetricsTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row.
    pub fn push(&mut self, row: GenerationMetrics) {
        self.rows.push(row);
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no generation was recorded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of metric names across all rows, sorted.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rows
            .iter()
            .flat_map(|row| row.stats.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Renders the table as CSV, one row per generation.
    pub fn to_csv(&self) -> String {
        let names = self.metric_names();
        let mut out = String::from("generation,best_fitness");
        for name in &names {
            let _ = write!(out, ",{name}_min,{name}_avg,{name}_max");
        }
        out.push('\n');

        for row in &self.rows {
            let _ = write!(out, "{},{:.6}", row.generation, row.best_fitness);
            for name in &names {
                match row.stats.get(name) {
                    Some(s) => {
                        let _ = write!(out, ",{:.6},{:.6},{:.6}", s.min, s.avg, s.max);
                    }
                    None => out.push_str(",,,"),
                }
            }
            out.push('\n');
        }

        out
    }

    /// Writes the CSV rendering to a file.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        fs::write(path, self.to_csv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn set(pairs: &[(&str, f64)]) -> MetricSet {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_stats_from_values() {
        let stats = MetricStats::from_values([0.2, 0.4, 0.9]).unwrap();
        assert_relative_eq!(stats.min, 0.2);
        assert_relative_eq!(stats.avg, 0.5);
        assert_relative_eq!(stats.max, 0.9);
        assert!(MetricStats::from_values(Vec::new()).is_none());
    }

    #[test]
    fn test_generation_row() {
        let sets = vec![
            set(&[("turns", 0.5), ("clustering", 0.1)]),
            set(&[("turns", 1.0), ("clustering", 0.3)]),
        ];
        let row = GenerationMetrics::from_population(3, 2.5, &sets);

        assert_eq!(row.generation, 3);
        assert_relative_eq!(row.stats["turns"].avg, 0.75);
        assert_relative_eq!(row.stats["clustering"].max, 0.3);
    }

    #[test]
    fn test_csv_layout() {
        let mut table = MetricsTable::new();
        table.push(GenerationMetrics::from_population(
            0,
            1.0,
            &[set(&[("turns", 0.5)])],
        ));
        table.push(GenerationMetrics::from_population(1, 1.5, &[set(&[])]));

        let csv = table.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "generation,best_fitness,turns_min,turns_avg,turns_max");
        assert_eq!(lines[1], "0,1.000000,0.500000,0.500000,0.500000");
        assert_eq!(lines[2], "1,1.500000,,,");
    }
}
