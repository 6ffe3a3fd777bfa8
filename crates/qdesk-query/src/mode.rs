//! Which result pane the UI is showing

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryMode {
    /// Results of the ad-hoc query
    #[default]
    QueryView,
    /// Rows of the selected table
    PreviewData,
    /// Structure of the selected table
    PreviewDetails,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::QueryView => write!(f, "QUERY_VIEW"),
            QueryMode::PreviewData => write!(f, "PREVIEW_DATA"),
            QueryMode::PreviewDetails => write!(f, "PREVIEW_DETAILS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_query_view() {
        assert_eq!(QueryMode::default(), QueryMode::QueryView);
    }

    #[test]
    fn test_serde_names_match_display() {
        for mode in [
            QueryMode::QueryView,
            QueryMode::PreviewData,
            QueryMode::PreviewDetails,
        ] {
            let value = serde_json::to_value(mode).unwrap();
            assert_eq!(value, serde_json::json!(mode.to_string()));
        }
    }
}
