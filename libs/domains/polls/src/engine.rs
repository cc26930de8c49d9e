//! Vote aggregation: tallies, percentages, the vote acceptance gate and
//! category/statistics summaries.
//!
//! Everything here is a pure function of the polls and votes passed in.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{PollError, PollResult};
use crate::models::{
    CategoryCount, DEFAULT_CATEGORIES, OptionCounts, Poll, PollStats, Tally, Vote,
};

/// Count votes per declared option, keeping the poll's option order.
///
/// Votes for other polls, or for options the poll does not declare, are
/// skipped, so `total_votes` always equals the sum of `vote_counts`.
pub fn tally(poll: &Poll, votes: &[Vote]) -> Tally {
    let mut vote_counts: OptionCounts = poll.options.iter().map(|o| (o.clone(), 0)).collect();

    for vote in votes.iter().filter(|v| v.poll_id == poll.id) {
        if let Some(count) = vote_counts.get_mut(&vote.option) {
            *count += 1;
        }
    }

    let total_votes = vote_counts.values().sum();
    Tally {
        vote_counts,
        total_votes,
    }
}

/// `round(100 * count / total)` per option, halves rounded away from zero.
///
/// All zeros when `total` is 0.
pub fn percentages(counts: &OptionCounts, total: u64) -> OptionCounts {
    counts
        .iter()
        .map(|(option, &count)| {
            let pct = if total == 0 {
                0
            } else {
                (100.0 * count as f64 / total as f64).round() as u64
            };
            (option.clone(), pct)
        })
        .collect()
}

/// Gate a vote before it is appended to the ledger.
///
/// Checks run in order: the poll must be active, the option must be declared,
/// and the voter must not already have a vote on this poll.
pub fn submit_vote(
    poll: &Poll,
    existing_votes_for_voter: &[Vote],
    option: &str,
    voter_id: &str,
    voted_at: DateTime<Utc>,
) -> PollResult<Vote> {
    if !poll.is_active() {
        return Err(PollError::Closed(poll.id));
    }

    if !poll.has_option(option) {
        return Err(PollError::InvalidOption(option.to_string()));
    }

    if let Some(previous) = existing_votes_for_voter.first() {
        return Err(PollError::AlreadyVoted {
            option: previous.option.clone(),
        });
    }

    Ok(Vote {
        id: Uuid::now_v7(),
        poll_id: poll.id,
        voter_id: voter_id.to_string(),
        option: option.to_string(),
        voted_at,
    })
}

/// Poll counts per category.
///
/// Default categories are always listed, in their fixed order, even with a
/// zero count. Other categories follow alphabetically, only when in use.
pub fn category_summary(polls: &[Poll]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for poll in polls {
        *counts.entry(poll.category.as_str()).or_default() += 1;
    }

    let mut summary: Vec<CategoryCount> = DEFAULT_CATEGORIES
        .iter()
        .map(|name| CategoryCount {
            name: name.to_string(),
            count: counts.get(name).copied().unwrap_or(0),
        })
        .collect();

    // BTreeMap iteration is already alphabetical
    summary.extend(
        counts
            .iter()
            .filter(|(name, _)| !DEFAULT_CATEGORIES.contains(*name))
            .map(|(name, &count)| CategoryCount {
                name: name.to_string(),
                count,
            }),
    );

    summary
}

/// Totals across all polls. `avg_votes_per_poll` is rounded to one decimal.
pub fn poll_stats(polls: &[Poll], total_votes: u64) -> PollStats {
    let total_polls = polls.len() as u64;
    let active_polls = polls.iter().filter(|p| p.is_active()).count() as u64;

    let avg_votes_per_poll = if total_polls == 0 {
        0.0
    } else {
        (total_votes as f64 / total_polls as f64 * 10.0).round() / 10.0
    };

    PollStats {
        total_polls,
        active_polls,
        closed_polls: total_polls - active_polls,
        total_votes,
        avg_votes_per_poll,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreatePoll, PollStatus};

    fn poll(options: &[&str]) -> Poll {
        Poll::new(CreatePoll {
            question: "Pick one".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            category: None,
        })
    }

    fn poll_in(category: &str) -> Poll {
        Poll {
            category: category.to_string(),
            ..poll(&["A", "B"])
        }
    }

    fn vote(poll: &Poll, voter: &str, option: &str) -> Vote {
        Vote {
            id: Uuid::now_v7(),
            poll_id: poll.id,
            voter_id: voter.to_string(),
            option: option.to_string(),
            voted_at: Utc::now(),
        }
    }

    #[test]
    fn test_tally_initializes_every_option() {
        let p = poll(&["A", "B", "C"]);
        let t = tally(&p, &[]);
        assert_eq!(t.total_votes, 0);
        assert_eq!(t.vote_counts.len(), 3);
        assert!(t.vote_counts.values().all(|&c| c == 0));
    }

    #[test]
    fn test_tally_counts_and_total_agree() {
        let p = poll(&["A", "B"]);
        let votes = vec![vote(&p, "u1", "A"), vote(&p, "u2", "B"), vote(&p, "u3", "A")];
        let t = tally(&p, &votes);

        assert_eq!(t.vote_counts["A"], 2);
        assert_eq!(t.vote_counts["B"], 1);
        assert_eq!(t.total_votes, 3);
        assert_eq!(t.vote_counts.values().sum::<u64>(), t.total_votes);
    }

    #[test]
    fn test_tally_ignores_undeclared_options_and_other_polls() {
        let p = poll(&["A", "B"]);
        let other = poll(&["A", "B"]);
        let votes = vec![
            vote(&p, "u1", "A"),
            vote(&p, "u2", "Z"),
            vote(&other, "u3", "B"),
        ];
        let t = tally(&p, &votes);

        assert_eq!(t.total_votes, 1);
        assert!(!t.vote_counts.contains_key("Z"));
        assert_eq!(t.vote_counts["B"], 0);
    }

    #[test]
    fn test_tally_is_repeatable() {
        let p = poll(&["A", "B"]);
        let votes = vec![vote(&p, "u1", "A")];
        assert_eq!(tally(&p, &votes), tally(&p, &votes));
    }

    #[test]
    fn test_tally_keeps_declared_option_order() {
        let p = poll(&["Zebra", "Apple", "Mango"]);
        let votes = vec![vote(&p, "u1", "Apple")];
        let t = tally(&p, &votes);

        let keys: Vec<&str> = t.vote_counts.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Zebra", "Apple", "Mango"]);

        let pct = percentages(&t.vote_counts, t.total_votes);
        let keys: Vec<&str> = pct.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Zebra", "Apple", "Mango"]);

        let json = serde_json::to_string(&t).unwrap();
        assert!(json.find("Zebra").unwrap() < json.find("Apple").unwrap());
        assert!(json.find("Apple").unwrap() < json.find("Mango").unwrap());
    }

    #[test]
    fn test_percentages_zero_total() {
        let counts = OptionCounts::from([("A".to_string(), 0), ("B".to_string(), 0)]);
        let pct = percentages(&counts, 0);
        assert_eq!(pct["A"], 0);
        assert_eq!(pct["B"], 0);
    }

    #[test]
    fn test_percentages_round_half_away_from_zero() {
        // 1/8 = 12.5% -> 13, 7/8 = 87.5% -> 88
        let counts = OptionCounts::from([("A".to_string(), 1), ("B".to_string(), 7)]);
        let pct = percentages(&counts, 8);
        assert_eq!(pct["A"], 13);
        assert_eq!(pct["B"], 88);
    }

    #[test]
    fn test_percentages_within_bounds_and_near_100() {
        let counts = OptionCounts::from([
            ("A".to_string(), 1),
            ("B".to_string(), 1),
            ("C".to_string(), 1),
        ]);
        let pct = percentages(&counts, 3);
        assert!(pct.values().all(|&p| p <= 100));
        let sum: u64 = pct.values().sum();
        assert!((98..=102).contains(&sum));

        let even = OptionCounts::from([("A".to_string(), 1), ("B".to_string(), 1)]);
        let pct = percentages(&even, 2);
        assert_eq!(pct["A"], 50);
        assert_eq!(pct["B"], 50);
    }

    #[test]
    fn test_submit_vote_accepts_valid_vote() {
        let p = poll(&["A", "B"]);
        let now = Utc::now();
        let v = submit_vote(&p, &[], "A", "u1", now).unwrap();
        assert_eq!(v.poll_id, p.id);
        assert_eq!(v.voter_id, "u1");
        assert_eq!(v.option, "A");
        assert_eq!(v.voted_at, now);
    }

    #[test]
    fn test_submit_vote_rejects_closed_poll_first() {
        let mut p = poll(&["A", "B"]);
        p.close(Utc::now());
        assert_eq!(p.status, PollStatus::Closed);

        // Closed wins over invalid option and duplicate vote
        let prior = vec![vote(&p, "u1", "A")];
        let err = submit_vote(&p, &prior, "Z", "u1", Utc::now()).unwrap_err();
        assert!(matches!(err, PollError::Closed(id) if id == p.id));
    }

    #[test]
    fn test_submit_vote_rejects_unknown_option() {
        let p = poll(&["A", "B"]);
        let err = submit_vote(&p, &[], "C", "u1", Utc::now()).unwrap_err();
        assert!(matches!(err, PollError::InvalidOption(ref o) if o == "C"));
    }

    #[test]
    fn test_submit_vote_rejects_second_vote_with_previous_option() {
        let p = poll(&["A", "B"]);
        let prior = vec![vote(&p, "u1", "A")];
        let err = submit_vote(&p, &prior, "B", "u1", Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Already voted: A");
    }

    #[test]
    fn test_category_summary_empty_lists_defaults() {
        let summary = category_summary(&[]);
        let names: Vec<_> = summary.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, DEFAULT_CATEGORIES.to_vec());
        assert!(summary.iter().all(|c| c.count == 0));
    }

    #[test]
    fn test_category_summary_appends_observed_categories() {
        let polls = vec![
            poll_in("Sports"),
            poll_in("Sports"),
            poll_in("Music"),
            poll_in("Cooking"),
        ];
        let summary = category_summary(&polls);

        assert_eq!(summary.len(), DEFAULT_CATEGORIES.len() + 2);
        let sports = summary.iter().find(|c| c.name == "Sports").unwrap();
        assert_eq!(sports.count, 2);
        assert_eq!(summary[7].name, "Cooking");
        assert_eq!(summary[8].name, "Music");
        assert_eq!(summary[8].count, 1);
    }

    #[test]
    fn test_poll_stats() {
        assert_eq!(poll_stats(&[], 0).avg_votes_per_poll, 0.0);

        let mut closed = poll(&["A", "B"]);
        closed.close(Utc::now());
        let polls = vec![poll(&["A", "B"]), poll(&["A", "B"]), closed];
        let stats = poll_stats(&polls, 10);

        assert_eq!(stats.total_polls, 3);
        assert_eq!(stats.active_polls, 2);
        assert_eq!(stats.closed_polls, 1);
        assert_eq!(stats.total_votes, 10);
        assert_eq!(stats.avg_votes_per_poll, 3.3);
    }
}
