//! Rendering of one-to-many company attributes as display strings.
//!
//! Search results and company descriptions both show a company's locations,
//! sub-categories and contacts as one delimited string. Everything that
//! renders such a string goes through [`aggregate`] so the output is the same
//! wherever it appears.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Separator between aggregated values.
pub const DELIMITER: &str = ", ";

/// Which relation of a company to aggregate.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttributeKind {
  Locations,
  Subcategories,
  Personnel,
}

/// Collapse `values` into a sorted, de-duplicated, delimiter-joined string.
///
/// An empty input yields `""`.
pub fn aggregate<I, S>(values: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let distinct: BTreeSet<String> = values
    .into_iter()
    .map(|v| v.as_ref().trim().to_owned())
    .filter(|v| !v.is_empty())
    .collect();

  distinct.into_iter().collect::<Vec<_>>().join(DELIMITER)
}

/// Case-insensitive substring test. An empty needle matches everything.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
  needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn duplicates_collapse_and_sort() {
    assert_eq!(aggregate(["Pune", "Delhi", "Pune"]), "Delhi, Pune");
  }

  #[test]
  fn insertion_order_is_irrelevant() {
    let a = aggregate(["Mumbai", "Chennai", "Agra"]);
    let b = aggregate(["Agra", "Mumbai", "Chennai"]);
    assert_eq!(a, b);
    assert_eq!(a, "Agra, Chennai, Mumbai");
  }

  #[test]
  fn empty_set_is_empty_string() {
    assert_eq!(aggregate(Vec::<String>::new()), "");
  }

  #[test]
  fn blank_values_are_skipped() {
    assert_eq!(aggregate(["  ", "Pune", ""]), "Pune");
  }

  #[test]
  fn contains_ci_matches() {
    assert!(contains_ci("Steel & Alloys", "steel"));
    assert!(contains_ci("Delhi, Pune", "PUN"));
    assert!(contains_ci("anything", ""));
    assert!(!contains_ci("Textiles", "steel"));
  }
}
