use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use indexmap::IndexMap;
use std::collections::HashSet;
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Counts or percentages keyed by option, in the poll's declared option order
pub type OptionCounts = IndexMap<String, u64>;

/// Category assigned when none is given
pub const DEFAULT_CATEGORY: &str = "General";

/// Categories always reported by the category summary, in display order
pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "General",
    "Technology",
    "Entertainment",
    "Sports",
    "Science",
    "Politics",
    "Other",
];

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;
pub const MAX_QUESTION_LEN: usize = 500;
pub const MAX_OPTION_LEN: usize = 200;

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_question(question: &str) -> Result<(), ValidationError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(invalid("required", "Question is required"));
    }
    if question.chars().count() > MAX_QUESTION_LEN {
        return Err(invalid(
            "length",
            format!("Question cannot exceed {} characters", MAX_QUESTION_LEN),
        ));
    }
    Ok(())
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < MIN_OPTIONS {
        return Err(invalid("count", "Poll must have at least 2 options"));
    }
    if options.len() > MAX_OPTIONS {
        return Err(invalid("count", "Poll cannot have more than 10 options"));
    }

    let mut seen = HashSet::with_capacity(options.len());
    for option in options.iter().map(|o| o.trim()) {
        if option.is_empty() {
            return Err(invalid("empty", "Poll options cannot be empty"));
        }
        if option.chars().count() > MAX_OPTION_LEN {
            return Err(invalid(
                "length",
                format!("Poll options cannot exceed {} characters", MAX_OPTION_LEN),
            ));
        }
        if !seen.insert(option) {
            return Err(invalid(
                "unique",
                format!("Poll options must be unique: {}", option),
            ));
        }
    }
    Ok(())
}

fn validate_voter_id(voter_id: &str) -> Result<(), ValidationError> {
    if voter_id.trim().is_empty() {
        return Err(invalid("required", "voter_id is required"));
    }
    Ok(())
}

fn validate_vote_option(option: &str) -> Result<(), ValidationError> {
    if option.trim().is_empty() {
        return Err(invalid("required", "option is required"));
    }
    Ok(())
}

/// Poll lifecycle state. Moves from active to closed only.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PollStatus {
    #[default]
    Active,
    Closed,
}

/// A question with a fixed, ordered set of options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    /// Ordered, distinct; never changes after creation
    pub options: Vec<String>,
    pub category: String,
    pub status: PollStatus,
    pub created_at: DateTime<Utc>,
    /// Set only when the poll is closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Poll {
    /// Build an active poll from already validated, normalized input
    pub fn new(input: CreatePoll) -> Self {
        Self {
            id: Uuid::now_v7(),
            question: input.question,
            options: input.options,
            category: input
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            status: PollStatus::Active,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PollStatus::Active
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    pub(crate) fn close(&mut self, at: DateTime<Utc>) {
        self.status = PollStatus::Closed;
        self.closed_at = Some(at);
    }
}

/// A single voter's recorded choice on one poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    /// Caller-supplied, not authenticated
    pub voter_id: String,
    pub option: String,
    pub voted_at: DateTime<Utc>,
}

/// DTO for creating a new poll
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePoll {
    #[validate(custom(function = "validate_question"))]
    pub question: String,
    #[validate(custom(function = "validate_options"))]
    pub options: Vec<String>,
    /// Defaults to "General"
    #[serde(default)]
    #[validate(length(max = 100, message = "Category cannot exceed 100 characters"))]
    pub category: Option<String>,
}

impl CreatePoll {
    /// Trim question, options and category; blank category becomes `None`.
    pub fn normalized(self) -> Self {
        Self {
            question: self.question.trim().to_string(),
            options: self.options.iter().map(|o| o.trim().to_string()).collect(),
            category: self
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        }
    }
}

/// DTO for casting a vote
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CastVote {
    #[validate(custom(function = "validate_voter_id"))]
    pub voter_id: String,
    #[validate(custom(function = "validate_vote_option"))]
    pub option: String,
}

impl CastVote {
    pub fn normalized(self) -> Self {
        Self {
            voter_id: self.voter_id.trim().to_string(),
            option: self.option.trim().to_string(),
        }
    }
}

/// Query filters for listing polls
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PollFilter {
    /// Exact category match
    pub category: Option<String>,
    pub status: Option<PollStatus>,
}

impl PollFilter {
    pub fn matches(&self, poll: &Poll) -> bool {
        self.category.as_ref().is_none_or(|c| &poll.category == c)
            && self.status.is_none_or(|s| poll.status == s)
    }
}

/// Per-option vote counts for one poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tally {
    /// Every declared option, zero when nobody picked it
    pub vote_counts: IndexMap<String, u64>,
    pub total_votes: u64,
}

/// A poll with its current results attached
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PollWithResults {
    #[serde(flatten)]
    pub poll: Poll,
    pub total_votes: u64,
    pub vote_counts: IndexMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_percentages: Option<IndexMap<String, u64>>,
}

/// Results returned after a vote is accepted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteResults {
    pub total_votes: u64,
    pub vote_counts: IndexMap<String, u64>,
    pub vote_percentages: IndexMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteOutcome {
    pub vote: Vote,
    pub results: VoteResults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteSummary {
    pub poll_id: Uuid,
    pub votes_removed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PollStats {
    pub total_polls: u64,
    pub active_polls: u64,
    pub closed_polls: u64,
    pub total_votes: u64,
    /// Rounded to one decimal
    pub avg_votes_per_poll: f64,
}

// Response envelopes

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PollListResponse {
    pub success: bool,
    pub count: usize,
    pub polls: Vec<PollWithResults>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PollResponse {
    pub success: bool,
    pub poll: PollWithResults,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePollResponse {
    pub success: bool,
    pub message: String,
    pub poll: PollWithResults,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
    pub vote: Vote,
    pub results: VoteResults,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClosePollResponse {
    pub success: bool,
    pub message: String,
    pub poll_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletePollResponse {
    pub success: bool,
    pub message: String,
    pub deleted: DeleteSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoriesResponse {
    pub success: bool,
    pub categories: Vec<CategoryCount>,
    pub total_polls: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: PollStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(question: &str, options: &[&str]) -> CreatePoll {
        CreatePoll {
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            category: None,
        }
    }

    fn first_message(input: &CreatePoll) -> String {
        crate::PollError::from(input.validate().unwrap_err()).to_string()
    }

    #[test]
    fn test_valid_poll_passes() {
        assert!(create("Pick one", &["A", "B"]).validate().is_ok());
    }

    #[test]
    fn test_option_count_bounds() {
        assert_eq!(
            first_message(&create("Pick one", &["A"])),
            "Poll must have at least 2 options"
        );

        let eleven: Vec<String> = (0..11).map(|i| format!("opt{}", i)).collect();
        let input = CreatePoll {
            options: eleven,
            ..create("Pick one", &[])
        };
        assert_eq!(first_message(&input), "Poll cannot have more than 10 options");
    }

    #[test]
    fn test_blank_and_duplicate_options() {
        assert_eq!(
            first_message(&create("Pick one", &["A", "  "])),
            "Poll options cannot be empty"
        );
        assert_eq!(
            first_message(&create("Pick one", &["A", " A "])),
            "Poll options must be unique: A"
        );
    }

    #[test]
    fn test_blank_question() {
        assert_eq!(first_message(&create("   ", &["A", "B"])), "Question is required");
    }

    #[test]
    fn test_normalized_trims_and_defaults_category() {
        let input = CreatePoll {
            category: Some("  ".to_string()),
            ..create("  Pick one ", &[" A", "B "])
        }
        .normalized();

        assert_eq!(input.question, "Pick one");
        assert_eq!(input.options, vec!["A", "B"]);
        assert!(input.category.is_none());

        let poll = Poll::new(input);
        assert_eq!(poll.category, DEFAULT_CATEGORY);
        assert_eq!(poll.status, PollStatus::Active);
        assert!(poll.closed_at.is_none());
    }

    #[test]
    fn test_cast_vote_requires_voter() {
        let vote = CastVote {
            voter_id: " ".to_string(),
            option: "A".to_string(),
        };
        assert_eq!(
            crate::PollError::from(vote.validate().unwrap_err()).to_string(),
            "voter_id is required"
        );
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&PollStatus::Closed).unwrap(), "\"closed\"");
        assert_eq!("active".parse::<PollStatus>().unwrap(), PollStatus::Active);
    }

    #[test]
    fn test_filter_matches() {
        let poll = Poll::new(create("Pick one", &["A", "B"]));
        assert!(PollFilter::default().matches(&poll));
        assert!(PollFilter {
            category: Some("General".into()),
            status: Some(PollStatus::Active),
        }
        .matches(&poll));
        assert!(!PollFilter {
            status: Some(PollStatus::Closed),
            ..Default::default()
        }
        .matches(&poll));
    }

    #[test]
    fn test_poll_with_results_flattens_poll() {
        let poll = Poll::new(create("Pick one", &["A", "B"]));
        let view = PollWithResults {
            poll: poll.clone(),
            total_votes: 0,
            vote_counts: OptionCounts::from([("A".into(), 0), ("B".into(), 0)]),
            vote_percentages: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], poll.id.to_string());
        assert_eq!(json["status"], "active");
        assert_eq!(json["vote_counts"]["A"], 0);
        assert!(json.get("vote_percentages").is_none());
        assert!(json.get("closed_at").is_none());
    }
}
