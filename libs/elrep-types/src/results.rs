use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::election::{BallotTypeId, CandidateId, ContestId, PrecinctId};

/// Where a set of results came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "Data Entry")]
    DataEntry,
    #[serde(rename = "File Upload")]
    FileUpload,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataEntry => "Data Entry",
            Self::FileUpload => "File Upload",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Data Entry" => Ok(Self::DataEntry),
            "File Upload" => Ok(Self::FileUpload),
            _ => Err(format!("unknown results source: {value}")),
        }
    }
}

/// A snapshot of tallied votes for the public dashboard. Candidate ids
/// within each contest include the synthetic `writeIn` id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub is_official: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated_date: OffsetDateTime,
    pub registered_voter_count: u64,
    pub ballots_received: u64,
    pub ballots_counted: u64,
    pub contest_results: BTreeMap<ContestId, BTreeMap<CandidateId, u64>>,
}

impl ResultsSnapshot {
    /// Total votes recorded for a contest across all of its candidates,
    /// write-in included. Contests absent from the snapshot total zero.
    pub fn contest_votes(&self, contest_id: &ContestId) -> u64 {
        self.contest_results
            .get(contest_id)
            .map_or(0, |tally| tally.values().sum())
    }

    pub fn candidate_votes(&self, contest_id: &ContestId, candidate_id: &CandidateId) -> u64 {
        self.contest_results
            .get(contest_id)
            .and_then(|tally| tally.get(candidate_id))
            .copied()
            .unwrap_or(0)
    }
}

/// A jurisdiction admin's precinct-level results, as entered in the
/// form or uploaded as a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResultSubmission {
    pub precinct: PrecinctId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ballot_type: Option<BallotTypeId>,
    pub total_ballots_cast: u64,
    pub contests: Vec<ContestVotes>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestVotes {
    pub id: ContestId,
    pub candidates: Vec<CandidateVotes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateVotes {
    pub id: CandidateId,
    pub num_votes: u64,
}

/// One submitted-results summary row in the election data table, with
/// the full breakdown for the row's modal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDataRow {
    pub id: Uuid,
    pub jurisdiction_name: String,
    pub file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub source: Source,
    pub total_ballots_cast: u64,
    pub contests: Vec<ContestBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestBreakdown {
    pub id: ContestId,
    pub name: String,
    pub allow_write_ins: bool,
    pub candidates: Vec<CandidateBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBreakdown {
    pub id: CandidateId,
    pub name: String,
    pub num_votes: u64,
}

/// The message carried when an election has no submitted results yet.
pub const NO_ENTRY_FOUND: &str = "No entry found!";

/// The message carried alongside a non-empty data array.
pub const ENTRIES_FOUND: &str = "Entries Found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDataResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ElectionDataRow>>,
}

/// Per-jurisdiction upload progress, keyed by precinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ResultsStatus {
    Uploaded,
    NotUploaded { stats: UploadStats },
}

impl ResultsStatus {
    /// Collapses upload counts into the reported status. A jurisdiction
    /// with nothing left to upload reports as uploaded, including one
    /// with no precincts at all.
    pub fn from_stats(stats: UploadStats) -> Self {
        if stats.not_uploaded == 0 {
            Self::Uploaded
        } else {
            Self::NotUploaded { stats }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStats {
    pub uploaded: u32,
    pub not_uploaded: u32,
}

/// Payload for creating an election, carrying both configuration files
/// inline (name plus full contents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateElectionRequest {
    pub election_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub polls_open: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub polls_close: OffsetDateTime,
    pub polls_timezone: String,
    #[serde(with = "time::serde::rfc3339")]
    pub certification_date: OffsetDateTime,
    pub organization_id: Uuid,
    pub jurisdictions_file: SubmittedFile,
    pub definition_file: SubmittedFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedFile {
    pub name: String,
    pub contents: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_source_labels() {
        assert_eq!(
            serde_json::to_string(&Source::DataEntry).unwrap(),
            r#""Data Entry""#
        );
        assert_eq!(Source::from_str("File Upload"), Ok(Source::FileUpload));
        assert!(Source::from_str("Fax").is_err());
    }

    #[test]
    fn test_snapshot_vote_sums() {
        let snapshot: ResultsSnapshot = serde_json::from_str(
            r#"{
                "isOfficial": false,
                "lastUpdatedDate": "2020-11-03T22:00:00Z",
                "registeredVoterCount": 2593,
                "ballotsReceived": 100,
                "ballotsCounted": 87,
                "contestResults": {
                    "contest-1": { "candidate-1": 10, "candidate-2": 20, "writeIn": 0 }
                }
            }"#,
        )
        .unwrap();

        let contest = ContestId::from("contest-1");
        assert_eq!(snapshot.contest_votes(&contest), 30);
        assert_eq!(
            snapshot.candidate_votes(&contest, &CandidateId::from("candidate-2")),
            20
        );
        assert_eq!(
            snapshot.candidate_votes(&contest, &CandidateId::from("missing")),
            0
        );
        assert_eq!(snapshot.contest_votes(&ContestId::from("contest-9")), 0);
    }

    #[test]
    fn test_results_status_wire_shape() {
        assert_eq!(
            serde_json::to_string(&ResultsStatus::Uploaded).unwrap(),
            r#"{"status":"uploaded"}"#
        );
        assert_eq!(
            serde_json::to_string(&ResultsStatus::NotUploaded {
                stats: UploadStats {
                    uploaded: 2,
                    not_uploaded: 3,
                }
            })
            .unwrap(),
            r#"{"status":"not-uploaded","stats":{"uploaded":2,"notUploaded":3}}"#
        );
    }

    #[test]
    fn test_results_status_from_stats() {
        let stats = |uploaded, not_uploaded| UploadStats {
            uploaded,
            not_uploaded,
        };
        assert_eq!(
            ResultsStatus::from_stats(stats(4, 0)),
            ResultsStatus::Uploaded
        );
        assert_eq!(
            ResultsStatus::from_stats(stats(2, 3)),
            ResultsStatus::NotUploaded {
                stats: stats(2, 3)
            }
        );
        // a jurisdiction with no precincts has nothing left to upload
        assert_eq!(
            ResultsStatus::from_stats(stats(0, 0)),
            ResultsStatus::Uploaded
        );
    }

    #[test]
    fn test_submission_omits_absent_ballot_type() {
        let submission = ElectionResultSubmission {
            precinct: PrecinctId::from("precinct-1"),
            ballot_type: None,
            total_ballots_cast: 30,
            contests: vec![ContestVotes {
                id: ContestId::from("contest-1"),
                candidates: vec![CandidateVotes {
                    id: CandidateId::from("candidate-1"),
                    num_votes: 10,
                }],
            }],
            source: Source::DataEntry,
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json.get("ballotType"), None);
        assert_eq!(json["source"], serde_json::json!("Data Entry"));
        assert_eq!(json["totalBallotsCast"], serde_json::json!(30));
    }
}
