//! Filter model: the query constraints applied to transcript retrieval

mod controls;
mod predicate;
mod query;

pub use controls::FilterControls;
pub use predicate::sort_items;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Largest page a browse request may ask for
pub const MAX_PAGE_SIZE: u32 = 200;
/// Most context lines a request may ask for
pub const MAX_CONTEXT_LINES: u8 = 10;
/// Page size used when the control holds no usable number
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Emotion labels produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Disgust,
    Fear,
    Joy,
    Neutral,
    Sadness,
    Surprise,
}

impl Emotion {
    /// All labels in display order
    pub const ALL: [Emotion; 7] = [
        Emotion::Anger,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Joy,
        Emotion::Neutral,
        Emotion::Sadness,
        Emotion::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Joy => "joy",
            Self::Neutral => "neutral",
            Self::Sadness => "sadness",
            Self::Surprise => "surprise",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| format!("unknown emotion '{}'", s.trim()))
    }
}

/// How keywords combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Any,
    All,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::All => "all",
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(format!("unknown match mode '{}'", other)),
        }
    }
}

/// Browse sort column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Speaker,
    Emotion,
    JobId,
    StartTime,
}

impl SortBy {
    /// Cycle order used by the sort button
    pub const CYCLE: [SortBy; 5] = [
        SortBy::CreatedAt,
        SortBy::Speaker,
        SortBy::Emotion,
        SortBy::JobId,
        SortBy::StartTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Speaker => "speaker",
            Self::Emotion => "emotion",
            Self::JobId => "job_id",
            Self::StartTime => "start_time",
        }
    }

    /// Button label
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreatedAt => "Date",
            Self::Speaker => "Speaker",
            Self::Emotion => "Emotion",
            Self::JobId => "Job",
            Self::StartTime => "Start time",
        }
    }

    /// The column after this one in the cycle
    pub fn next(&self) -> SortBy {
        let pos = Self::CYCLE.iter().position(|s| s == self).unwrap_or(0);
        Self::CYCLE[(pos + 1) % Self::CYCLE.len()]
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::CYCLE
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("unknown sort column '{}'", s.trim()))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Button label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Asc => "Oldest first",
            Self::Desc => "Newest first",
        }
    }

    pub fn toggled(&self) -> SortOrder {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

/// Date constraint; either bound of a window may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    AllTime,
    Window {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl DateRange {
    /// Build a window, swapping reversed bounds; two open bounds mean all-time
    pub fn window(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        match (start, end) {
            (None, None) => Self::AllTime,
            (Some(s), Some(e)) if s > e => Self::Window {
                start: Some(e),
                end: Some(s),
            },
            (start, end) => Self::Window { start, end },
        }
    }

    /// Inclusive containment on calendar dates
    pub fn contains(&self, date: NaiveDate) -> bool {
        match self {
            Self::AllTime => true,
            Self::Window { start, end } => {
                start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
            }
        }
    }
}

/// Snapshot of the user's query constraints
///
/// An empty `emotions` set means every emotion, not none.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub date_range: DateRange,
    pub speakers: BTreeSet<String>,
    pub emotions: BTreeSet<Emotion>,
    pub keywords: Vec<String>,
    pub match_mode: MatchMode,
    pub context_lines: u8,
    pub page_size: u32,
    pub sort_by: SortBy,
    pub order: SortOrder,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            date_range: DateRange::AllTime,
            speakers: BTreeSet::new(),
            emotions: BTreeSet::new(),
            keywords: Vec::new(),
            match_mode: MatchMode::Any,
            context_lines: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortBy::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl FilterSpec {
    /// Whether every emotion passes
    pub fn all_emotions(&self) -> bool {
        self.emotions.is_empty()
    }

    /// Short human summary for the filter status line
    pub fn describe(&self) -> String {
        let dates = match self.date_range {
            DateRange::AllTime => "all time".to_string(),
            DateRange::Window { start, end } => format!(
                "{} to {}",
                start.map(|d| d.to_string()).unwrap_or_else(|| "…".to_string()),
                end.map(|d| d.to_string()).unwrap_or_else(|| "…".to_string())
            ),
        };
        let speakers = if self.speakers.is_empty() {
            "all speakers".to_string()
        } else {
            self.speakers.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        let emotions = if self.all_emotions() {
            "all emotions".to_string()
        } else {
            self.emotions
                .iter()
                .map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut text = format!("{}; {}; {}", dates, speakers, emotions);
        if !self.keywords.is_empty() {
            text.push_str(&format!(
                "; {} of [{}]",
                self.match_mode.as_str(),
                self.keywords.join(", ")
            ));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_emotion_parse_is_case_insensitive() {
        assert_eq!("Joy".parse::<Emotion>().unwrap(), Emotion::Joy);
        assert_eq!(" SADNESS ".parse::<Emotion>().unwrap(), Emotion::Sadness);
        assert!("boredom".parse::<Emotion>().is_err());
    }

    #[test]
    fn test_window_swaps_reversed_bounds() {
        let range = DateRange::window(Some(date("2024-05-10")), Some(date("2024-05-01")));
        assert_eq!(
            range,
            DateRange::Window {
                start: Some(date("2024-05-01")),
                end: Some(date("2024-05-10"))
            }
        );
        assert_eq!(DateRange::window(None, None), DateRange::AllTime);
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let range = DateRange::window(Some(date("2024-05-01")), Some(date("2024-05-10")));
        assert!(range.contains(date("2024-05-01")));
        assert!(range.contains(date("2024-05-10")));
        assert!(!range.contains(date("2024-05-11")));

        let open_end = DateRange::window(Some(date("2024-05-01")), None);
        assert!(open_end.contains(date("2030-01-01")));
        assert!(!open_end.contains(date("2024-04-30")));
    }

    #[test]
    fn test_sort_cycle_wraps() {
        assert_eq!(SortBy::CreatedAt.next(), SortBy::Speaker);
        assert_eq!(SortBy::StartTime.next(), SortBy::CreatedAt);
        assert_eq!(SortOrder::Desc.toggled(), SortOrder::Asc);
    }

    #[test]
    fn test_describe_mentions_all_emotions_when_empty() {
        let spec = FilterSpec::default();
        assert!(spec.describe().contains("all emotions"));
        assert!(spec.all_emotions());
    }
}
