use serde::{Deserialize, Serialize};

use crate::util::idtype;

idtype!(BallotTypeId);
idtype!(CandidateId);
idtype!(ContestId);
idtype!(PartyId);
idtype!(PrecinctId);

/// The candidate id under which write-in votes are tallied. It never
/// appears in an election definition's candidate list; views and
/// submissions append it as a synthetic option.
pub const WRITE_IN_CANDIDATE_ID: &str = "writeIn";

/// Display name for the synthetic write-in option.
pub const WRITE_IN_NAME: &str = "Write-in";

/// An election as shown on the public results dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub jurisdiction_name: String,
    #[serde(default)]
    pub county_name: String,
    #[serde(default)]
    pub state_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seal_url: Option<String>,
    pub contests: Vec<Contest>,
    #[serde(default)]
    pub parties: Vec<Party>,
}

impl Election {
    /// Looks up a party's display name. Unknown or absent party ids map
    /// to the empty string, which is what the write-in row shows.
    pub fn party_name(&self, party_id: Option<&PartyId>) -> &str {
        party_id
            .and_then(|id| self.parties.iter().find(|party| &party.id == id))
            .map_or("", |party| party.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: ContestId,
    #[serde(default)]
    pub section: String,
    pub title: String,
    pub seats: u32,
    #[serde(default)]
    pub allow_write_ins: bool,
    pub candidates: Vec<Candidate>,
}

impl Contest {
    /// The contest's candidates in definition order, with the synthetic
    /// write-in option appended exactly once.
    pub fn voting_options(&self) -> Vec<Candidate> {
        let mut options = self.candidates.clone();
        options.push(Candidate::write_in());
        options
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
}

impl Candidate {
    pub fn write_in() -> Self {
        Self {
            id: CandidateId::from(WRITE_IN_CANDIDATE_ID),
            name: WRITE_IN_NAME.to_owned(),
            party_id: None,
        }
    }

    pub fn is_write_in(&self) -> bool {
        self.id.as_str() == WRITE_IN_CANDIDATE_ID
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: PartyId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precinct {
    pub id: PrecinctId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotType {
    pub id: BallotTypeId,
    pub name: String,
}

/// The definition served to jurisdiction admins for results entry:
/// the contests they report on, the precincts they may report for,
/// and the ballot types they may break results down by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDefinition {
    pub contests: Vec<Contest>,
    pub precincts: Vec<Precinct>,
    #[serde(default)]
    pub ballot_types: Vec<BallotType>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn contest() -> Contest {
        Contest {
            id: ContestId::from("contest-1"),
            section: "City of Helena".to_owned(),
            title: "Mayor".to_owned(),
            seats: 1,
            allow_write_ins: true,
            candidates: vec![
                Candidate {
                    id: CandidateId::from("candidate-1"),
                    name: "Sherlock Holmes".to_owned(),
                    party_id: Some(PartyId::from("party-1")),
                },
                Candidate {
                    id: CandidateId::from("candidate-2"),
                    name: "Thomas Edison".to_owned(),
                    party_id: None,
                },
            ],
        }
    }

    #[test]
    fn test_voting_options_appends_write_in_once() {
        let options = contest().voting_options();
        assert_eq!(options.len(), 3);
        let write_ins: Vec<_> = options.iter().filter(|o| o.is_write_in()).collect();
        assert_eq!(write_ins.len(), 1);
        assert_eq!(write_ins[0].name, WRITE_IN_NAME);
        assert_eq!(write_ins[0].party_id, None);
    }

    #[test]
    fn test_contest_serialization_uses_camel_case() {
        let json = serde_json::to_value(contest()).unwrap();
        assert_eq!(json["allowWriteIns"], serde_json::json!(true));
        assert_eq!(
            json["candidates"][0]["partyId"],
            serde_json::json!("party-1")
        );
        // absent party ids are omitted, not null
        assert_eq!(json["candidates"][1].get("partyId"), None);
    }

    #[test]
    fn test_definition_tolerates_missing_ballot_types() {
        let definition: ElectionDefinition = serde_json::from_str(
            r#"{
                "contests": [],
                "precincts": [{ "id": "precinct-1", "name": "Precinct 1" }]
            }"#,
        )
        .unwrap();
        assert_eq!(definition.ballot_types, vec![]);
        assert_eq!(definition.precincts[0].id, PrecinctId::from("precinct-1"));
    }

    #[test]
    fn test_party_name_lookup() {
        let election = Election {
            id: "election-1".to_owned(),
            title: "General Election".to_owned(),
            date: "2020-11-03".to_owned(),
            jurisdiction_name: "All Counties".to_owned(),
            county_name: "Lewis and Clark".to_owned(),
            state_name: "State of Montana".to_owned(),
            seal_url: None,
            contests: vec![contest()],
            parties: vec![Party {
                id: PartyId::from("party-1"),
                name: "Federalist".to_owned(),
            }],
        };
        assert_eq!(election.party_name(Some(&PartyId::from("party-1"))), "Federalist");
        assert_eq!(election.party_name(Some(&PartyId::from("party-9"))), "");
        assert_eq!(election.party_name(None), "");
    }
}
