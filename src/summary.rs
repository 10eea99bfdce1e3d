//! Candidate summary
//!
//! Reads back a persisted candidate file and reduces it to `(id, stars,
//! contributors)` rows plus distribution statistics for both measures.

use serde::Serialize;

use crate::checkpoint::CandidateRecord;
use crate::display::{ColourManager, TableBuilder};

/// The per-candidate measures the downstream metrics stage correlates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuccessData {
    pub id: u64,
    pub stars: u64,
    pub contributors: u64,
}

impl From<&CandidateRecord> for SuccessData {
    fn from(record: &CandidateRecord) -> Self {
        Self {
            id: record.candidate.id,
            stars: record.candidate.stargazers_count,
            contributors: record.contributor_count as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distribution {
    pub count: usize,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub median: f64,
}

impl Distribution {
    /// `None` for an empty sample
    pub fn of(values: &[u64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        } else {
            sorted[mid] as f64
        };

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sorted.iter().sum::<u64>() as f64 / count as f64,
            median,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSummary {
    pub rows: Vec<SuccessData>,
    pub stars: Option<Distribution>,
    pub contributors: Option<Distribution>,
}

impl CandidateSummary {
    pub fn from_records(records: &[CandidateRecord]) -> Self {
        let rows: Vec<SuccessData> = records.iter().map(SuccessData::from).collect();
        let stars: Vec<u64> = rows.iter().map(|r| r.stars).collect();
        let contributors: Vec<u64> = rows.iter().map(|r| r.contributors).collect();

        Self {
            stars: Distribution::of(&stars),
            contributors: Distribution::of(&contributors),
            rows,
        }
    }

    pub fn render(&self, colours: &ColourManager) -> String {
        if self.rows.is_empty() {
            return format!("{}\n", colours.warning("No candidates found"));
        }

        let candidates = self.rows.iter().fold(
            TableBuilder::new("Candidates").headers(&["Id", "Stars", "Contributors"]),
            |table, row| table.add_row(vec![row.id.to_string(), row.stars.to_string(), row.contributors.to_string()]),
        );

        let mut statistics = TableBuilder::new("Statistics").headers(&["Measure", "Count", "Min", "Max", "Mean", "Median"]);
        for (name, dist) in [("Stars", &self.stars), ("Contributors", &self.contributors)] {
            if let Some(d) = dist {
                statistics = statistics.add_row(vec![
                    name.to_string(),
                    d.count.to_string(),
                    d.min.to_string(),
                    d.max.to_string(),
                    format!("{:.1}", d.mean),
                    format!("{:.1}", d.median),
                ]);
            }
        }

        format!(
            "{}\n{}",
            candidates.build_with_colors(colours),
            statistics.build_with_colors(colours)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::fakes::sample_candidate;

    fn record(id: u64, contributors: usize) -> CandidateRecord {
        CandidateRecord::from_candidate(&sample_candidate(id), contributors)
    }

    #[test]
    fn test_distribution() {
        let d = Distribution::of(&[40, 10, 30, 20]).unwrap();
        assert_eq!(d.count, 4);
        assert_eq!(d.min, 10);
        assert_eq!(d.max, 40);
        assert_eq!(d.mean, 25.0);
        assert_eq!(d.median, 25.0);

        assert_eq!(Distribution::of(&[7, 1, 3]).unwrap().median, 3.0);
        assert!(Distribution::of(&[]).is_none());
    }

    #[test]
    fn test_success_data() {
        let summary = CandidateSummary::from_records(&[record(3, 17), record(5, 40)]);

        assert_eq!(
            summary.rows,
            vec![
                SuccessData { id: 3, stars: 30, contributors: 17 },
                SuccessData { id: 5, stars: 50, contributors: 40 },
            ]
        );
        assert_eq!(summary.stars.unwrap().mean, 40.0);
        assert_eq!(summary.contributors.unwrap().max, 40);
    }

    #[test]
    fn test_render() {
        let summary = CandidateSummary::from_records(&[record(3, 17)]);
        let output = summary.render(&ColourManager::with_colours(false));

        assert!(output.contains("Candidates"));
        assert!(output.contains("Statistics"));
        assert!(output.contains("Contributors"));
        assert!(output.contains("17"));
    }

    #[test]
    fn test_render_empty() {
        let output = CandidateSummary::from_records(&[]).render(&ColourManager::with_colours(false));
        assert_eq!(output, "No candidates found\n");
    }
}
