//! Record transformations and their parameters.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::FlowError;
use crate::record::Record;

/// Parameters for [`update_scores`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateScoresParams {
    pub delta: f64,
    #[serde(default = "default_true")]
    pub only_active: bool,
    #[serde(default)]
    pub deactivate_below: Option<f64>,
}

impl UpdateScoresParams {
    pub fn new(delta: f64) -> Self {
        Self {
            delta,
            only_active: true,
            deactivate_below: None,
        }
    }
}

/// Parameters for [`sort_records`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortRecordsParams {
    #[serde(default = "default_sort_field")]
    pub by: String,
    #[serde(default = "default_true")]
    pub descending: bool,
}

impl Default for SortRecordsParams {
    fn default() -> Self {
        Self {
            by: default_sort_field(),
            descending: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sort_field() -> String {
    "score".to_string()
}

/// Record fields that can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Score,
    Active,
    Source,
}

impl SortField {
    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortField::Id => a.record_id.cmp(&b.record_id),
            SortField::Name => a.name.cmp(&b.name),
            SortField::Score => a.score.total_cmp(&b.score),
            SortField::Active => a.active.cmp(&b.active),
            SortField::Source => a.source.cmp(&b.source),
        }
    }
}

impl FromStr for SortField {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "score" => Ok(SortField::Score),
            "active" => Ok(SortField::Active),
            "source" => Ok(SortField::Source),
            other => Err(FlowError::UnsupportedField(other.to_string())),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Score => "score",
            SortField::Active => "active",
            SortField::Source => "source",
        };
        write!(f, "{}", name)
    }
}

/// Round to 2 decimal digits.
///
/// Rounds the exact decimal expansion of `value`, ties to even, so a float
/// stored just below a `.xx5` boundary rounds down and one just above rounds
/// up. Non-finite values are returned unchanged.
pub fn round_score(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Shift scores by `delta` and optionally deactivate records that fall below
/// a threshold. Inactive records are passed through untouched when
/// `only_active` is set.
pub fn update_scores(records: &[Record], params: &UpdateScoresParams) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            if params.only_active && !record.active {
                return record.clone();
            }

            let next_score = round_score(record.score + params.delta);
            let mut next_active = record.active;
            if let Some(threshold) = params.deactivate_below {
                if next_score < threshold {
                    if record.active {
                        tracing::warn!(
                            "Record {} deactivated: score {} below {}",
                            record.record_id,
                            next_score,
                            threshold
                        );
                    }
                    next_active = false;
                }
            }
            record.with_score(next_score, next_active)
        })
        .collect()
}

/// Stable sort by one field.
pub fn sort_records(records: &[Record], params: &SortRecordsParams) -> Result<Vec<Record>, FlowError> {
    let field: SortField = params.by.parse()?;
    let mut sorted = records.to_vec();
    if params.descending {
        sorted.sort_by(|a, b| field.compare(b, a));
    } else {
        sorted.sort_by(|a, b| field.compare(a, b));
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mia_noah() -> Vec<Record> {
        vec![
            Record::new(1, "Mia", 78.5, true, "file"),
            Record::new(2, "Noah", 61.0, false, "file"),
        ]
    }

    #[test]
    fn test_update_scores_only_active() {
        let updated = update_scores(&mia_noah(), &UpdateScoresParams::new(5.0));
        assert_eq!(
            updated,
            vec![
                Record::new(1, "Mia", 83.5, true, "file"),
                Record::new(2, "Noah", 61.0, false, "file"),
            ]
        );
    }

    #[test]
    fn test_update_scores_all_records() {
        let params = UpdateScoresParams {
            delta: -3.0,
            only_active: false,
            deactivate_below: None,
        };
        let updated = update_scores(&mia_noah(), &params);
        assert_eq!(updated[0].score, 75.5);
        assert_eq!(updated[1].score, 58.0);
        assert!(!updated[1].active);
    }

    #[test]
    fn test_update_scores_deactivates_below_threshold() {
        let params = UpdateScoresParams {
            delta: -20.0,
            only_active: true,
            deactivate_below: Some(60.0),
        };
        let updated = update_scores(&mia_noah(), &params);
        assert_eq!(updated[0].score, 58.5);
        assert!(!updated[0].active);
    }

    #[test]
    fn test_threshold_is_strict() {
        let params = UpdateScoresParams {
            delta: 0.0,
            only_active: true,
            deactivate_below: Some(78.5),
        };
        let updated = update_scores(&mia_noah(), &params);
        assert!(updated[0].active);
    }

    #[test]
    fn test_rounding_ties_to_even() {
        assert_eq!(round_score(10.125), 10.12);
        assert_eq!(round_score(10.375), 10.38);
        assert_eq!(round_score(2.675), 2.67);
        assert_eq!(round_score(1.0 / 3.0), 0.33);
        // Stored slightly above the tie.
        assert_eq!(round_score(0.005), 0.01);
        // Stored slightly below the tie.
        assert_eq!(round_score(0.015), 0.01);
        assert_eq!(round_score(0.025), 0.03);
        assert_eq!(round_score(-0.015), -0.01);
        assert!(round_score(f64::NAN).is_nan());

        let records = vec![Record::new(1, "Mia", 10.0, true, "file")];
        let updated = update_scores(&records, &UpdateScoresParams::new(0.125));
        assert_eq!(updated[0].score, 10.12);

        let zero = vec![Record::new(2, "Noah", 0.0, true, "file")];
        let updated = update_scores(&zero, &UpdateScoresParams::new(0.015));
        assert_eq!(updated[0].score, 0.01);
    }

    #[test]
    fn test_sort_by_score_descending() {
        let records = vec![
            Record::new(1, "a", 78.5, true, "x"),
            Record::new(2, "b", 61.0, true, "x"),
            Record::new(3, "c", 90.2, true, "x"),
        ];
        let sorted = sort_records(&records, &SortRecordsParams::default()).unwrap();
        let scores: Vec<f64> = sorted.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![90.2, 78.5, 61.0]);
    }

    #[test]
    fn test_sort_is_stable_both_directions() {
        let records = vec![
            Record::new(1, "b", 1.0, true, "x"),
            Record::new(2, "a", 1.0, true, "x"),
            Record::new(3, "b", 1.0, true, "x"),
            Record::new(4, "a", 1.0, true, "x"),
        ];

        let asc = sort_records(
            &records,
            &SortRecordsParams {
                by: "name".to_string(),
                descending: false,
            },
        )
        .unwrap();
        let ids: Vec<i64> = asc.iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);

        let desc = sort_records(
            &records,
            &SortRecordsParams {
                by: "name".to_string(),
                descending: true,
            },
        )
        .unwrap();
        let ids: Vec<i64> = desc.iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_sort_active_false_first() {
        let sorted = sort_records(
            &mia_noah(),
            &SortRecordsParams {
                by: "active".to_string(),
                descending: false,
            },
        )
        .unwrap();
        assert_eq!(sorted[0].name, "Noah");
    }

    #[test]
    fn test_sort_unsupported_field() {
        let result = sort_records(
            &mia_noah(),
            &SortRecordsParams {
                by: "email".to_string(),
                descending: false,
            },
        );
        assert!(matches!(result, Err(FlowError::UnsupportedField(f)) if f == "email"));
    }
}
