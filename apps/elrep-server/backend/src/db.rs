//! Database access for the application.
//!
//! All direct use of [SQLx][`sqlx`] queries should be in this module.
//! Queries are bound at runtime so the workspace builds without a live
//! database; the schema lives in `db/migrations`.

use std::collections::BTreeMap;
use std::time::Duration;

use color_eyre::eyre::eyre;
use elrep_types::election::{
    BallotType, Candidate, Contest, ElectionDefinition, Precinct, WRITE_IN_CANDIDATE_ID,
    WRITE_IN_NAME,
};
use elrep_types::file::{FileInfo, FileProcessing, UploadedFile};
use elrep_types::results::{
    CandidateBreakdown, ContestBreakdown, CreateElectionRequest, ElectionDataRow,
    ElectionResultSubmission, Source, UploadStats,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, FromRow, PgPool};
use time::OffsetDateTime;
use tracing::Level;
use uuid::Uuid;

use crate::config::Config;

/// Sets up the database pool and runs any pending migrations, returning
/// the pool to be used by the app.
pub async fn setup(config: &Config) -> color_eyre::Result<PgPool> {
    let _entered = tracing::span!(Level::DEBUG, "Setting up database").entered();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;
    tracing::debug!("Running database migrations");
    sqlx::migrate!("db/migrations").run(&pool).await?;
    Ok(pool)
}

#[derive(Debug, Clone, FromRow)]
pub struct ElectionRecord {
    pub id: Uuid,
    pub election_name: String,
    pub organization_id: Uuid,
    pub jurisdictions_file_id: Option<Uuid>,
    pub definition_file_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct JurisdictionRecord {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PrecinctRecord {
    pub id: Uuid,
    pub jurisdiction_id: Option<Uuid>,
    pub name: String,
}

pub async fn get_organization_name(
    connection: &mut sqlx::PgConnection,
    organization_id: Uuid,
) -> color_eyre::Result<Option<String>> {
    Ok(
        sqlx::query_scalar::<_, String>("SELECT name FROM organization WHERE id = $1")
            .bind(organization_id)
            .fetch_optional(connection)
            .await?,
    )
}

pub async fn create_file(
    connection: &mut sqlx::PgConnection,
    name: &str,
    contents: &str,
) -> color_eyre::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO file (id, name, contents, uploaded_at)
        VALUES ($1, $2, $3, now())
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(contents)
    .execute(connection)
    .await?;
    Ok(id)
}

#[derive(Debug, FromRow)]
struct FileRow {
    name: String,
    uploaded_at: OffsetDateTime,
    processing_started_at: Option<OffsetDateTime>,
    processing_completed_at: Option<OffsetDateTime>,
    processing_error: Option<String>,
}

pub async fn get_file_info(
    connection: &mut sqlx::PgConnection,
    file_id: Uuid,
) -> color_eyre::Result<FileInfo> {
    let row = sqlx::query_as::<_, FileRow>(
        r#"
        SELECT name, uploaded_at, processing_started_at, processing_completed_at, processing_error
        FROM file
        WHERE id = $1
        "#,
    )
    .bind(file_id)
    .fetch_optional(connection)
    .await?;

    Ok(match row {
        Some(row) => FileInfo {
            file: Some(UploadedFile {
                name: row.name,
                uploaded_at: row.uploaded_at,
            }),
            processing: Some(FileProcessing::status_from_timestamps(
                row.processing_started_at,
                row.processing_completed_at,
                row.processing_error,
            )),
        },
        None => FileInfo::default(),
    })
}

pub async fn get_file_contents(
    connection: &mut sqlx::PgConnection,
    file_id: Uuid,
) -> color_eyre::Result<String> {
    sqlx::query_scalar::<_, String>("SELECT contents FROM file WHERE id = $1")
        .bind(file_id)
        .fetch_optional(connection)
        .await?
        .ok_or_else(|| eyre!("file {file_id} not found"))
}

pub async fn mark_file_processing_started(
    connection: &mut sqlx::PgConnection,
    file_id: Uuid,
) -> color_eyre::Result<()> {
    sqlx::query(
        r#"
        UPDATE file
        SET processing_started_at = now(), processing_completed_at = NULL, processing_error = NULL,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(file_id)
    .execute(connection)
    .await?;
    Ok(())
}

pub async fn mark_file_processing_completed(
    connection: &mut sqlx::PgConnection,
    file_id: Uuid,
    error: Option<&str>,
) -> color_eyre::Result<()> {
    sqlx::query(
        r#"
        UPDATE file
        SET processing_completed_at = now(), processing_error = $2, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(file_id)
    .bind(error)
    .execute(connection)
    .await?;
    Ok(())
}

pub async fn election_name_exists(
    connection: &mut sqlx::PgConnection,
    organization_id: Uuid,
    election_name: &str,
) -> color_eyre::Result<bool> {
    Ok(sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM election
            WHERE organization_id = $1 AND election_name = $2 AND deleted_at IS NULL
        )
        "#,
    )
    .bind(organization_id)
    .bind(election_name)
    .fetch_one(connection)
    .await?)
}

pub async fn create_election(
    connection: &mut sqlx::PgConnection,
    request: &CreateElectionRequest,
    jurisdictions_file_id: Uuid,
    definition_file_id: Uuid,
) -> color_eyre::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO election (
            id, election_name, polls_open_at, polls_close_at, polls_timezone,
            certification_date, organization_id, jurisdictions_file_id, definition_file_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(&request.election_name)
    .bind(request.polls_open)
    .bind(request.polls_close)
    .bind(&request.polls_timezone)
    .bind(request.certification_date)
    .bind(request.organization_id)
    .bind(jurisdictions_file_id)
    .bind(definition_file_id)
    .execute(connection)
    .await?;
    Ok(id)
}

pub async fn get_election(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
) -> color_eyre::Result<Option<ElectionRecord>> {
    Ok(sqlx::query_as::<_, ElectionRecord>(
        r#"
        SELECT id, election_name, organization_id, jurisdictions_file_id, definition_file_id
        FROM election
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(election_id)
    .fetch_optional(connection)
    .await?)
}

/// Flags an election as deleted without removing it, in case the
/// deletion was a mistake. Returns whether anything changed.
pub async fn soft_delete_election(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
) -> color_eyre::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE election
        SET deleted_at = now(), updated_at = now()
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(election_id)
    .execute(connection)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_jurisdictions_file(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    file_id: Uuid,
) -> color_eyre::Result<()> {
    sqlx::query(
        r#"
        UPDATE election SET jurisdictions_file_id = $2, updated_at = now() WHERE id = $1
        "#,
    )
    .bind(election_id)
    .bind(file_id)
    .execute(connection)
    .await?;
    Ok(())
}

pub async fn get_election_jurisdiction(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    jurisdiction_id: Uuid,
) -> color_eyre::Result<Option<JurisdictionRecord>> {
    Ok(sqlx::query_as::<_, JurisdictionRecord>(
        r#"
        SELECT j.id, j.name
        FROM jurisdiction AS j
        INNER JOIN election_jurisdiction AS ej ON ej.jurisdiction_id = j.id
        WHERE ej.election_id = $1 AND j.id = $2
        "#,
    )
    .bind(election_id)
    .bind(jurisdiction_id)
    .fetch_optional(connection)
    .await?)
}

pub async fn find_jurisdiction_by_name(
    connection: &mut sqlx::PgConnection,
    name: &str,
) -> color_eyre::Result<Option<JurisdictionRecord>> {
    Ok(sqlx::query_as::<_, JurisdictionRecord>(
        "SELECT id, name FROM jurisdiction WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(connection)
    .await?)
}

pub async fn link_election_jurisdiction(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    jurisdiction_id: Uuid,
) -> color_eyre::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO election_jurisdiction (election_id, jurisdiction_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(election_id)
    .bind(jurisdiction_id)
    .execute(connection)
    .await?;
    Ok(())
}

pub async fn find_election_jurisdiction_by_name(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    name: &str,
) -> color_eyre::Result<Option<JurisdictionRecord>> {
    Ok(sqlx::query_as::<_, JurisdictionRecord>(
        r#"
        SELECT j.id, j.name
        FROM jurisdiction AS j
        INNER JOIN election_jurisdiction AS ej ON ej.jurisdiction_id = j.id
        WHERE ej.election_id = $1 AND j.name = $2
        "#,
    )
    .bind(election_id)
    .bind(name)
    .fetch_optional(connection)
    .await?)
}

/// Removes all jurisdiction admins for an election's jurisdictions,
/// ahead of re-creating them from a fresh jurisdictions file.
pub async fn clear_jurisdiction_admins(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
) -> color_eyre::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM jurisdiction_administration
        WHERE jurisdiction_id IN (
            SELECT jurisdiction_id FROM election_jurisdiction WHERE election_id = $1
        )
        "#,
    )
    .bind(election_id)
    .execute(connection)
    .await?;
    Ok(())
}

pub async fn find_or_create_user_by_email(
    connection: &mut sqlx::PgConnection,
    email: &str,
) -> color_eyre::Result<Uuid> {
    let email = email.to_lowercase();
    if let Some(id) =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM app_user WHERE email = $1")
            .bind(&email)
            .fetch_optional(&mut *connection)
            .await?
    {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO app_user (id, email) VALUES ($1, $2)")
        .bind(id)
        .bind(&email)
        .execute(connection)
        .await?;
    Ok(id)
}

pub async fn create_jurisdiction_admin(
    connection: &mut sqlx::PgConnection,
    user_id: Uuid,
    jurisdiction_id: Uuid,
) -> color_eyre::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO jurisdiction_administration (user_id, jurisdiction_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(jurisdiction_id)
    .execute(connection)
    .await?;
    Ok(())
}

/// One precinct/contest/candidate set to install for an election,
/// already resolved from a parsed definition file.
#[derive(Debug, Clone)]
pub struct DefinitionRows {
    pub precincts: Vec<(String, String, Option<Uuid>)>,
    pub ballot_types: Vec<(String, String)>,
    pub contests: Vec<DefinitionContestRow>,
}

#[derive(Debug, Clone)]
pub struct DefinitionContestRow {
    pub definition_id: String,
    pub name: String,
    pub contest_type: String,
    pub seats: i32,
    pub allow_write_ins: bool,
    pub candidates: Vec<(String, String, Option<String>)>,
}

/// Replaces an election's precincts, ballot types, contests and
/// candidates with the rows from a freshly processed definition file.
/// Runs in a transaction so a failed insert leaves the previous
/// definition in place.
pub async fn replace_definition(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    rows: &DefinitionRows,
) -> color_eyre::Result<()> {
    let mut txn = connection.begin().await?;

    sqlx::query("DELETE FROM precinct WHERE election_id = $1")
        .bind(election_id)
        .execute(&mut *txn)
        .await?;
    sqlx::query("DELETE FROM ballot_type WHERE election_id = $1")
        .bind(election_id)
        .execute(&mut *txn)
        .await?;
    sqlx::query("DELETE FROM contest WHERE election_id = $1")
        .bind(election_id)
        .execute(&mut *txn)
        .await?;

    for (definition_id, name, jurisdiction_id) in &rows.precincts {
        sqlx::query(
            r#"
            INSERT INTO precinct (id, election_id, jurisdiction_id, name, definition_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(election_id)
        .bind(jurisdiction_id)
        .bind(name)
        .bind(definition_id)
        .execute(&mut *txn)
        .await?;
    }

    for (definition_id, name) in &rows.ballot_types {
        sqlx::query(
            r#"
            INSERT INTO ballot_type (id, election_id, name, definition_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(election_id)
        .bind(name)
        .bind(definition_id)
        .execute(&mut *txn)
        .await?;
    }

    for (contest_index, contest) in rows.contests.iter().enumerate() {
        let contest_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO contest (
                id, election_id, name, contest_type, seats, allow_write_ins,
                definition_id, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(contest_id)
        .bind(election_id)
        .bind(&contest.name)
        .bind(&contest.contest_type)
        .bind(contest.seats)
        .bind(contest.allow_write_ins)
        .bind(&contest.definition_id)
        .bind(contest_index as i32)
        .execute(&mut *txn)
        .await?;

        for (candidate_index, (definition_id, name, party)) in
            contest.candidates.iter().enumerate()
        {
            sqlx::query(
                r#"
                INSERT INTO candidate (id, contest_id, name, party, definition_id, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(contest_id)
            .bind(name)
            .bind(party)
            .bind(definition_id)
            .bind(candidate_index as i32)
            .execute(&mut *txn)
            .await?;
        }
    }

    txn.commit().await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct ContestRow {
    id: Uuid,
    name: String,
    seats: i32,
    allow_write_ins: bool,
}

#[derive(Debug, FromRow)]
struct CandidateRow {
    contest_id: Uuid,
    id: Uuid,
    name: String,
    party: Option<String>,
}

/// Loads the election definition for results entry: contests with
/// their candidates, the precincts the jurisdiction may report for
/// (unassigned precincts are offered to every jurisdiction), and the
/// ballot types. Ids are the server's row ids so submissions can be
/// checked against them directly.
pub async fn get_definition(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    jurisdiction_id: Option<Uuid>,
) -> color_eyre::Result<ElectionDefinition> {
    let contest_rows = sqlx::query_as::<_, ContestRow>(
        r#"
        SELECT id, name, seats, allow_write_ins
        FROM contest
        WHERE election_id = $1
        ORDER BY sort_order
        "#,
    )
    .bind(election_id)
    .fetch_all(&mut *connection)
    .await?;

    let candidate_rows = sqlx::query_as::<_, CandidateRow>(
        r#"
        SELECT c.contest_id, c.id, c.name, c.party
        FROM candidate AS c
        INNER JOIN contest ON contest.id = c.contest_id
        WHERE contest.election_id = $1
        ORDER BY c.sort_order
        "#,
    )
    .bind(election_id)
    .fetch_all(&mut *connection)
    .await?;

    let mut candidates_by_contest: BTreeMap<Uuid, Vec<Candidate>> = BTreeMap::new();
    for row in candidate_rows {
        candidates_by_contest
            .entry(row.contest_id)
            .or_default()
            .push(Candidate {
                id: row.id.to_string().into(),
                name: row.name,
                party_id: row.party.map(Into::into),
            });
    }

    let contests = contest_rows
        .into_iter()
        .map(|row| Contest {
            id: row.id.to_string().into(),
            section: String::new(),
            title: row.name,
            seats: row.seats.max(0) as u32,
            allow_write_ins: row.allow_write_ins,
            candidates: candidates_by_contest.remove(&row.id).unwrap_or_default(),
        })
        .collect();

    let precinct_rows = match jurisdiction_id {
        Some(jurisdiction_id) => {
            sqlx::query_as::<_, PrecinctRecord>(
                r#"
                SELECT id, jurisdiction_id, name
                FROM precinct
                WHERE election_id = $1
                  AND (jurisdiction_id = $2 OR jurisdiction_id IS NULL)
                ORDER BY name
                "#,
            )
            .bind(election_id)
            .bind(jurisdiction_id)
            .fetch_all(&mut *connection)
            .await?
        }
        None => {
            sqlx::query_as::<_, PrecinctRecord>(
                r#"
                SELECT id, jurisdiction_id, name
                FROM precinct
                WHERE election_id = $1
                ORDER BY name
                "#,
            )
            .bind(election_id)
            .fetch_all(&mut *connection)
            .await?
        }
    };

    let precincts = precinct_rows
        .into_iter()
        .map(|row| Precinct {
            id: row.id.to_string().into(),
            name: row.name,
        })
        .collect();

    let ballot_types = sqlx::query_as::<_, JurisdictionRecord>(
        r#"
        SELECT id, name FROM ballot_type WHERE election_id = $1 ORDER BY name
        "#,
    )
    .bind(election_id)
    .fetch_all(&mut *connection)
    .await?
    .into_iter()
    .map(|row| BallotType {
        id: row.id.to_string().into(),
        name: row.name,
    })
    .collect();

    Ok(ElectionDefinition {
        contests,
        precincts,
        ballot_types,
    })
}

pub async fn get_precinct(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    precinct_id: Uuid,
) -> color_eyre::Result<Option<PrecinctRecord>> {
    Ok(sqlx::query_as::<_, PrecinctRecord>(
        r#"
        SELECT id, jurisdiction_id, name
        FROM precinct
        WHERE election_id = $1 AND id = $2
        "#,
    )
    .bind(election_id)
    .bind(precinct_id)
    .fetch_optional(connection)
    .await?)
}

pub async fn results_exist_for_precinct(
    connection: &mut sqlx::PgConnection,
    precinct_id: Uuid,
) -> color_eyre::Result<bool> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM election_result WHERE precinct_id = $1)",
    )
    .bind(precinct_id)
    .fetch_one(connection)
    .await?)
}

/// Stores a validated results submission: one summary row plus one vote
/// row per candidate (write-in included). Runs in a transaction so a
/// failed vote insert never leaves an orphaned summary row.
pub async fn create_election_result(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    jurisdiction_id: Uuid,
    precinct: &PrecinctRecord,
    ballot_type_id: Option<Uuid>,
    submission: &ElectionResultSubmission,
) -> color_eyre::Result<Uuid> {
    let mut txn = connection.begin().await?;

    let result_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO election_result (
            id, election_id, jurisdiction_id, precinct_id, ballot_type_id,
            source, file_name, total_ballots_cast
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(result_id)
    .bind(election_id)
    .bind(jurisdiction_id)
    .bind(precinct.id)
    .bind(ballot_type_id)
    .bind(submission.source.as_str())
    .bind(&precinct.name)
    .bind(submission.total_ballots_cast as i64)
    .execute(&mut *txn)
    .await?;

    for contest in &submission.contests {
        let contest_id = Uuid::parse_str(contest.id.as_str())?;
        for candidate in &contest.candidates {
            sqlx::query(
                r#"
                INSERT INTO election_result_vote (result_id, contest_id, candidate_id, num_votes)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(result_id)
            .bind(contest_id)
            .bind(candidate.id.as_str())
            .bind(candidate.num_votes as i64)
            .execute(&mut *txn)
            .await?;
        }
    }

    txn.commit().await?;
    Ok(result_id)
}

#[derive(Debug, FromRow)]
struct ResultRow {
    id: Uuid,
    jurisdiction_name: String,
    file_name: String,
    created_at: OffsetDateTime,
    source: String,
    total_ballots_cast: i64,
}

#[derive(Debug, FromRow)]
struct VoteRow {
    result_id: Uuid,
    contest_id: Uuid,
    candidate_id: String,
    num_votes: i64,
    contest_name: String,
    allow_write_ins: bool,
    contest_sort_order: i32,
    candidate_name: Option<String>,
    candidate_sort_order: Option<i32>,
}

/// Loads every submitted-results row for an election together with its
/// contest-by-contest, candidate-by-candidate breakdown. Write-in
/// votes appear as the last candidate of their contest.
pub async fn get_election_data(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
) -> color_eyre::Result<Vec<ElectionDataRow>> {
    let result_rows = sqlx::query_as::<_, ResultRow>(
        r#"
        SELECT er.id, j.name AS jurisdiction_name, er.file_name, er.created_at,
               er.source, er.total_ballots_cast
        FROM election_result AS er
        INNER JOIN jurisdiction AS j ON j.id = er.jurisdiction_id
        WHERE er.election_id = $1
        ORDER BY er.created_at
        "#,
    )
    .bind(election_id)
    .fetch_all(&mut *connection)
    .await?;

    let mut vote_rows = sqlx::query_as::<_, VoteRow>(
        r#"
        SELECT v.result_id, v.contest_id, v.candidate_id, v.num_votes,
               c.name AS contest_name, c.allow_write_ins, c.sort_order AS contest_sort_order,
               cand.name AS candidate_name, cand.sort_order AS candidate_sort_order
        FROM election_result_vote AS v
        INNER JOIN contest AS c ON c.id = v.contest_id
        LEFT JOIN candidate AS cand ON cand.id::text = v.candidate_id
        WHERE c.election_id = $1
        "#,
    )
    .bind(election_id)
    .fetch_all(&mut *connection)
    .await?;

    // write-in rows have no candidate record; sort them last within
    // their contest
    vote_rows.sort_by_key(|row| {
        (
            row.result_id,
            row.contest_sort_order,
            row.candidate_sort_order.unwrap_or(i32::MAX),
        )
    });

    let mut data = Vec::with_capacity(result_rows.len());
    for result in result_rows {
        let mut contests: Vec<ContestBreakdown> = Vec::new();
        for vote in vote_rows.iter().filter(|v| v.result_id == result.id) {
            if contests.last().map(|c| c.id.as_str()) != Some(vote.contest_id.to_string().as_str())
            {
                contests.push(ContestBreakdown {
                    id: vote.contest_id.to_string().into(),
                    name: vote.contest_name.clone(),
                    allow_write_ins: vote.allow_write_ins,
                    candidates: Vec::new(),
                });
            }
            let (id, name) = match &vote.candidate_name {
                Some(name) => (vote.candidate_id.clone(), name.clone()),
                None => (WRITE_IN_CANDIDATE_ID.to_owned(), WRITE_IN_NAME.to_owned()),
            };
            if let Some(contest) = contests.last_mut() {
                contest.candidates.push(CandidateBreakdown {
                    id: id.into(),
                    name,
                    num_votes: vote.num_votes.max(0) as u64,
                });
            }
        }

        data.push(ElectionDataRow {
            id: result.id,
            jurisdiction_name: result.jurisdiction_name,
            file_name: result.file_name,
            created_at: result.created_at,
            source: result
                .source
                .parse::<Source>()
                .unwrap_or(Source::DataEntry),
            total_ballots_cast: result.total_ballots_cast.max(0) as u64,
            contests,
        });
    }

    Ok(data)
}

#[derive(Debug, FromRow)]
struct UploadCounts {
    uploaded: i64,
    not_uploaded: i64,
}

/// Counts how many of a jurisdiction's precincts have submitted
/// results. Unassigned precincts count toward every jurisdiction.
pub async fn get_upload_stats(
    connection: &mut sqlx::PgConnection,
    election_id: Uuid,
    jurisdiction_id: Uuid,
) -> color_eyre::Result<UploadStats> {
    let counts = sqlx::query_as::<_, UploadCounts>(
        r#"
        SELECT
            count(*) FILTER (
                WHERE EXISTS (SELECT 1 FROM election_result AS er WHERE er.precinct_id = p.id)
            ) AS uploaded,
            count(*) FILTER (
                WHERE NOT EXISTS (SELECT 1 FROM election_result AS er WHERE er.precinct_id = p.id)
            ) AS not_uploaded
        FROM precinct AS p
        WHERE p.election_id = $1 AND (p.jurisdiction_id = $2 OR p.jurisdiction_id IS NULL)
        "#,
    )
    .bind(election_id)
    .bind(jurisdiction_id)
    .fetch_one(&mut *connection)
    .await?;

    Ok(UploadStats {
        uploaded: counts.uploaded.max(0) as u32,
        not_uploaded: counts.not_uploaded.max(0) as u32,
    })
}
