//! Parsing and processing of uploaded election configuration files.
//!
//! Two file types are handled: the jurisdictions file, a two-column
//! CSV assigning admin users to jurisdictions, and the election
//! definition file, a JSON document listing precincts, contests and
//! ballot types. Processing failures are recorded on the file record
//! rather than failing the request, so clients can poll for the
//! outcome.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::db;

/// Header the jurisdictions file must start with.
pub const JURISDICTIONS_FILE_HEADER: &str = "Jurisdiction,Admin Email";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// One row of a parsed jurisdictions file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JurisdictionAssignment {
    pub jurisdiction_name: String,
    pub admin_email: String,
}

/// Parses the jurisdictions CSV. Each data row assigns one admin email
/// to one jurisdiction; blank lines are skipped. The error string is
/// what gets stored on the file record for the client to display.
pub fn parse_jurisdictions_file(
    contents: &str,
) -> Result<Vec<JurisdictionAssignment>, String> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());

    match lines.next() {
        Some(header) if header.trim() == JURISDICTIONS_FILE_HEADER => {}
        _ => {
            return Err(format!(
                "Invalid header. Expected header to be {JURISDICTIONS_FILE_HEADER:?}"
            ))
        }
    }

    let mut assignments = Vec::new();
    for (index, line) in lines.enumerate() {
        let row_number = index + 2;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [jurisdiction_name, admin_email] = fields.as_slice() else {
            return Err(format!(
                "Invalid row {row_number}: expected 2 columns, got {}",
                fields.len()
            ));
        };

        if jurisdiction_name.is_empty() {
            return Err(format!("Invalid row {row_number}: missing jurisdiction"));
        }

        if !email_regex().is_match(admin_email) {
            return Err(format!(
                "Invalid row {row_number}: {admin_email:?} is not a valid email address"
            ));
        }

        let assignment = JurisdictionAssignment {
            jurisdiction_name: (*jurisdiction_name).to_owned(),
            admin_email: admin_email.to_lowercase(),
        };
        if assignments.contains(&assignment) {
            return Err(format!("Invalid row {row_number}: duplicate row"));
        }
        assignments.push(assignment);
    }

    if assignments.is_empty() {
        return Err("File contains no jurisdiction rows".to_owned());
    }

    Ok(assignments)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DefinitionFile {
    pub precincts: Vec<DefinitionPrecinct>,
    pub contests: Vec<DefinitionContest>,
    #[serde(default)]
    pub ballot_types: Vec<DefinitionBallotType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DefinitionPrecinct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DefinitionContest {
    pub id: String,
    #[serde(rename = "type")]
    pub contest_type: String,
    pub title: String,
    pub seats: u32,
    pub allow_write_ins: bool,
    pub candidates: Vec<DefinitionCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DefinitionBallotType {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DefinitionCandidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
}

/// Parses the election definition JSON and checks the invariants the
/// database schema cannot express.
pub fn parse_definition_file(contents: &str) -> Result<DefinitionFile, String> {
    let definition: DefinitionFile = serde_json::from_str(contents)
        .map_err(|e| format!("Invalid election definition: {e}"))?;

    if definition.contests.is_empty() {
        return Err("Election definition has no contests".to_owned());
    }
    if definition.precincts.is_empty() {
        return Err("Election definition has no precincts".to_owned());
    }
    for contest in &definition.contests {
        if contest.candidates.is_empty() {
            return Err(format!("Contest {:?} has no candidates", contest.title));
        }
    }

    Ok(definition)
}

/// Processes a freshly uploaded jurisdictions file: parses it, links
/// the named jurisdictions to the election, and grants each listed
/// email admin access. A bad file is recorded as a processing error on
/// the file record; only infrastructure failures bubble up.
pub async fn process_jurisdictions_file(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    file_id: Uuid,
) -> color_eyre::Result<Option<String>> {
    db::mark_file_processing_started(&mut *connection, file_id).await?;
    let contents = db::get_file_contents(&mut *connection, file_id).await?;

    let error = match apply_jurisdictions_file(&mut *connection, election_id, &contents).await? {
        Ok(()) => None,
        Err(message) => Some(message),
    };
    db::mark_file_processing_completed(&mut *connection, file_id, error.as_deref()).await?;
    Ok(error)
}

async fn apply_jurisdictions_file(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    contents: &str,
) -> color_eyre::Result<Result<(), String>> {
    let assignments = match parse_jurisdictions_file(contents) {
        Ok(assignments) => assignments,
        Err(message) => return Ok(Err(message)),
    };

    db::clear_jurisdiction_admins(&mut *connection, election_id).await?;

    for assignment in assignments {
        let Some(jurisdiction) =
            db::find_jurisdiction_by_name(&mut *connection, &assignment.jurisdiction_name).await?
        else {
            return Ok(Err(format!(
                "Invalid Jurisdiction: {:?}",
                assignment.jurisdiction_name
            )));
        };
        db::link_election_jurisdiction(&mut *connection, election_id, jurisdiction.id).await?;
        let user_id =
            db::find_or_create_user_by_email(&mut *connection, &assignment.admin_email).await?;
        db::create_jurisdiction_admin(&mut *connection, user_id, jurisdiction.id).await?;
    }

    Ok(Ok(()))
}

/// Processes a freshly uploaded election definition file: parses it
/// and replaces the election's precincts, ballot types and contests.
pub async fn process_definition_file(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    file_id: Uuid,
) -> color_eyre::Result<Option<String>> {
    db::mark_file_processing_started(&mut *connection, file_id).await?;
    let contents = db::get_file_contents(&mut *connection, file_id).await?;

    let error = match apply_definition_file(&mut *connection, election_id, &contents).await? {
        Ok(()) => None,
        Err(message) => Some(message),
    };
    db::mark_file_processing_completed(&mut *connection, file_id, error.as_deref()).await?;
    Ok(error)
}

async fn apply_definition_file(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    contents: &str,
) -> color_eyre::Result<Result<(), String>> {
    let definition = match parse_definition_file(contents) {
        Ok(definition) => definition,
        Err(message) => return Ok(Err(message)),
    };

    let mut precincts = Vec::with_capacity(definition.precincts.len());
    for precinct in &definition.precincts {
        let jurisdiction_id = match &precinct.jurisdiction {
            Some(name) => {
                let Some(jurisdiction) =
                    db::find_election_jurisdiction_by_name(&mut *connection, election_id, name)
                        .await?
                else {
                    return Ok(Err(format!("Invalid Jurisdiction: {name:?}")));
                };
                Some(jurisdiction.id)
            }
            None => None,
        };
        precincts.push((precinct.id.clone(), precinct.name.clone(), jurisdiction_id));
    }

    let rows = db::DefinitionRows {
        precincts,
        ballot_types: definition
            .ballot_types
            .iter()
            .map(|bt| (bt.id.clone(), bt.name.clone()))
            .collect(),
        contests: definition
            .contests
            .iter()
            .map(|contest| db::DefinitionContestRow {
                definition_id: contest.id.clone(),
                name: contest.title.clone(),
                contest_type: contest.contest_type.clone(),
                seats: contest.seats as i32,
                allow_write_ins: contest.allow_write_ins,
                candidates: contest
                    .candidates
                    .iter()
                    .map(|c| (c.id.clone(), c.name.clone(), c.party.clone()))
                    .collect(),
            })
            .collect(),
    };

    db::replace_definition(&mut *connection, election_id, &rows).await?;
    Ok(Ok(()))
}
