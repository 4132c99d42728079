//! Read-only view model for the public results dashboard.

use elrep_types::election::{CandidateId, Contest, ContestId, Election};
use elrep_types::results::ResultsSnapshot;

/// Formats `votes / total` as a percentage with two decimal places and
/// a trailing `%`, rounding to the nearest hundredth of a percent. A
/// zero denominator renders as `0.00%`.
pub fn percentage(votes: u64, total: u64) -> String {
    if total == 0 {
        return "0.00%".to_owned();
    }
    let rounded = (votes as f64 / total as f64 * 10_000.0).round() / 100.0;
    format!("{rounded:.2}%")
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub votes: u64,
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContestResultsView {
    pub id: ContestId,
    pub section: String,
    pub title: String,
    pub seats: u32,
    pub contest_votes: u64,
    pub rows: Vec<CandidateRow>,
}

impl ContestResultsView {
    /// Builds the rows for one contest: candidates in definition order
    /// followed by the synthetic write-in row, each with its vote count
    /// from the snapshot (zero when absent) and its share of the
    /// contest total.
    pub fn new(election: &Election, contest: &Contest, snapshot: &ResultsSnapshot) -> Self {
        let contest_votes = snapshot.contest_votes(&contest.id);
        let rows = contest
            .voting_options()
            .into_iter()
            .map(|candidate| {
                let votes = snapshot.candidate_votes(&contest.id, &candidate.id);
                CandidateRow {
                    name: candidate.name,
                    party: election.party_name(candidate.party_id.as_ref()).to_owned(),
                    votes,
                    percentage: percentage(votes, contest_votes),
                    id: candidate.id,
                }
            })
            .collect();

        Self {
            id: contest.id.clone(),
            section: contest.section.clone(),
            title: contest.title.clone(),
            seats: contest.seats,
            contest_votes,
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectionResultsView {
    pub is_official: bool,
    pub ballots_received: u64,
    pub ballots_counted: u64,
    pub registered_voter_count: u64,
    pub turnout: String,
    pub contests: Vec<ContestResultsView>,
}

impl ElectionResultsView {
    pub fn new(election: &Election, snapshot: &ResultsSnapshot) -> Self {
        Self {
            is_official: snapshot.is_official,
            ballots_received: snapshot.ballots_received,
            ballots_counted: snapshot.ballots_counted,
            registered_voter_count: snapshot.registered_voter_count,
            turnout: percentage(snapshot.ballots_counted, snapshot.registered_voter_count),
            contests: election
                .contests
                .iter()
                .map(|contest| ContestResultsView::new(election, contest, snapshot))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use elrep_types::election::{Candidate, Party, PartyId};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use time::macros::datetime;

    use super::*;

    fn election() -> Election {
        Election {
            id: "election-1".to_owned(),
            title: "General Election".to_owned(),
            date: "2020-11-03".to_owned(),
            jurisdiction_name: "All Counties".to_owned(),
            county_name: "Lewis and Clark".to_owned(),
            state_name: "State of Montana".to_owned(),
            seal_url: None,
            contests: vec![Contest {
                id: ContestId::from("contest-1"),
                section: "City of Helena".to_owned(),
                title: "Mayor".to_owned(),
                seats: 1,
                allow_write_ins: true,
                candidates: vec![
                    Candidate {
                        id: CandidateId::from("candidate-a"),
                        name: "Alice".to_owned(),
                        party_id: Some(PartyId::from("party-1")),
                    },
                    Candidate {
                        id: CandidateId::from("candidate-b"),
                        name: "Bob".to_owned(),
                        party_id: Some(PartyId::from("party-2")),
                    },
                ],
            }],
            parties: vec![
                Party {
                    id: PartyId::from("party-1"),
                    name: "Federalist".to_owned(),
                },
                Party {
                    id: PartyId::from("party-2"),
                    name: "Labor".to_owned(),
                },
            ],
        }
    }

    fn snapshot(votes: &[(&str, u64)]) -> ResultsSnapshot {
        let mut tally = BTreeMap::new();
        for (id, count) in votes {
            tally.insert(CandidateId::from(*id), *count);
        }
        let mut contest_results = BTreeMap::new();
        contest_results.insert(ContestId::from("contest-1"), tally);
        ResultsSnapshot {
            is_official: false,
            last_updated_date: datetime!(2020-11-03 22:00:00 UTC),
            registered_voter_count: 2593,
            ballots_received: 100,
            ballots_counted: 87,
            contest_results,
        }
    }

    #[test]
    fn test_percentage_formatting() {
        assert_eq!(percentage(10, 30), "33.33%");
        assert_eq!(percentage(20, 30), "66.67%");
        assert_eq!(percentage(0, 30), "0.00%");
        assert_eq!(percentage(30, 30), "100.00%");
        // 3.35518…% rounds up at the third decimal
        assert_eq!(percentage(87, 2593), "3.36%");
    }

    #[test]
    fn test_percentage_zero_denominator() {
        assert_eq!(percentage(0, 0), "0.00%");
        assert_eq!(percentage(5, 0), "0.00%");
    }

    #[test]
    fn test_contest_view_worked_example() {
        let view = ElectionResultsView::new(
            &election(),
            &snapshot(&[("candidate-a", 10), ("candidate-b", 20), ("writeIn", 0)]),
        );
        let contest = &view.contests[0];
        assert_eq!(contest.contest_votes, 30);

        let percentages: Vec<&str> = contest
            .rows
            .iter()
            .map(|row| row.percentage.as_str())
            .collect();
        assert_eq!(percentages, vec!["33.33%", "66.67%", "0.00%"]);

        let parties: Vec<&str> = contest.rows.iter().map(|row| row.party.as_str()).collect();
        assert_eq!(parties, vec!["Federalist", "Labor", ""]);
    }

    #[test]
    fn test_write_in_row_present_exactly_once() {
        let view = ElectionResultsView::new(&election(), &snapshot(&[]));
        let contest = &view.contests[0];
        let write_in_rows: Vec<_> = contest
            .rows
            .iter()
            .filter(|row| row.id.as_str() == "writeIn")
            .collect();
        assert_eq!(write_in_rows.len(), 1);
        assert_eq!(write_in_rows[0].name, "Write-in");
        assert_eq!(write_in_rows[0].party, "");
    }

    #[test]
    fn test_zero_vote_contest_renders_zero_percentages() {
        let view = ElectionResultsView::new(&election(), &snapshot(&[]));
        for row in &view.contests[0].rows {
            assert_eq!(row.percentage, "0.00%");
        }
    }

    #[test]
    fn test_turnout() {
        let view = ElectionResultsView::new(&election(), &snapshot(&[]));
        assert_eq!(view.turnout, "3.36%");
    }

    fn parse_percentage(value: &str) -> f64 {
        value.trim_end_matches('%').parse().unwrap()
    }

    proptest! {
        // Displayed percentages for a contest with votes must sum to
        // 100% within the rounding tolerance for three rows.
        #[test]
        fn prop_percentages_sum_to_100(a in 0u64..100_000, b in 0u64..100_000, w in 0u64..1_000) {
            prop_assume!(a + b + w > 0);
            let view = ElectionResultsView::new(
                &election(),
                &snapshot(&[("candidate-a", a), ("candidate-b", b), ("writeIn", w)]),
            );
            let sum: f64 = view.contests[0]
                .rows
                .iter()
                .map(|row| parse_percentage(&row.percentage))
                .sum();
            prop_assert!((sum - 100.0).abs() <= 0.02, "sum was {sum}");
        }
    }
}
