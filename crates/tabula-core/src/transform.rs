//! Transformations — bulk cell updates, row removals and generated columns.
//!
//! Only their forward effect is described here. Each one registers an inverse
//! with the history log when a backend runs it.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// How missing (NULL) cells are filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImputeStrategy {
  Mean,
  Median,
  /// Most frequent non-NULL value; ties go to the smallest.
  Mode,
  Constant(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMethod {
  /// Rescale into `[0, 1]`.
  MinMax,
  /// Subtract the mean, divide by the population standard deviation.
  ZScore,
}

/// Which component of a date/time value to extract into a new column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePart {
  /// 0 = Sunday.
  DayOfWeek,
  Month,
  Year,
  Date,
  Time,
}

impl DatePart {
  /// Suffix of the generated column, e.g. `"created (YEAR)"`.
  pub fn label(self) -> &'static str {
    match self {
      Self::DayOfWeek => "DOW",
      Self::Month => "MONTH",
      Self::Year => "YEAR",
      Self::Date => "DATE",
      Self::Time => "TIME",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transform {
  /// Substring replacement in the text form of one column.
  FindReplace {
    column:  String,
    find:    String,
    replace: String,
  },
  Impute {
    column:   String,
    strategy: ImputeStrategy,
  },
  /// Rewrites the column's numeric values in place.
  Normalize {
    column: String,
    method: NormalizeMethod,
  },
  /// Deletes rows whose value lies more than `threshold` standard deviations
  /// from the column mean.
  RemoveOutliers { column: String, threshold: f64 },
  /// Deletes rows equal to an earlier row on every data column.
  Deduplicate,
  ExtractDatePart { column: String, part: DatePart },
  /// One 0/1 column per distinct non-NULL value.
  OneHotEncode { column: String },
  /// Equal-width bins over the column's range, labelled into a new column.
  BinInterval { column: String, bins: u32 },
}

impl Transform {
  /// The source column, if the transform reads one.
  pub fn column(&self) -> Option<&str> {
    match self {
      Self::FindReplace { column, .. }
      | Self::Impute { column, .. }
      | Self::Normalize { column, .. }
      | Self::RemoveOutliers { column, .. }
      | Self::ExtractDatePart { column, .. }
      | Self::OneHotEncode { column }
      | Self::BinInterval { column, .. } => Some(column.as_str()),
      Self::Deduplicate => None,
    }
  }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(xs: &[f64]) -> Option<f64> {
  (!xs.is_empty()).then(|| xs.iter().sum::<f64>() / xs.len() as f64)
}

pub fn median(xs: &[f64]) -> Option<f64> {
  if xs.is_empty() {
    return None;
  }
  let mut sorted = xs.to_vec();
  sorted.sort_by(f64::total_cmp);
  let mid = sorted.len() / 2;
  Some(if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] })
}

/// Population standard deviation.
pub fn std_dev(xs: &[f64]) -> Option<f64> {
  let m = mean(xs)?;
  Some((xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64).sqrt())
}

/// Equal-width bin label for `x` within `[lo, hi]` split into `bins` parts.
/// The last bin is closed on the right.
pub fn bin_label(x: f64, lo: f64, hi: f64, bins: u32) -> String {
  let width = (hi - lo) / f64::from(bins);
  if width <= 0.0 {
    return format!("[{lo}, {hi}]");
  }
  let index = (((x - lo) / width).floor() as u32).min(bins - 1);
  let start = lo + width * f64::from(index);
  let end = if index + 1 == bins { hi } else { start + width };
  let close = if index + 1 == bins { ']' } else { ')' };
  format!("[{start}, {end}{close}")
}
