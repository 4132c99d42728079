//! Application definition, including all HTTP route handlers.
//!
//! Route handlers are bundled via [`setup`] into an [`axum::Router`], which can then be run
//! using [`run`] at the configured port (see [`config`][`super::config`]).

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use elrep_types::election::WRITE_IN_CANDIDATE_ID;
use elrep_types::file::FileInfo;
use elrep_types::results::{
    CreateElectionRequest, ElectionDataResponse, ElectionResultSubmission, ResultsStatus,
    SubmittedFile, ENTRIES_FOUND, NO_ENTRY_FOUND,
};
use serde_json::json;
use sqlx::PgPool;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::Level;
use uuid::Uuid;

use crate::activity_log::{self, Activity, ActivityBase};
use crate::config::{Config, MAX_REQUEST_SIZE};
use crate::db::{self, ElectionRecord};
use crate::processing;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
}

/// Prepares the application with all the routes. Run the application with
/// `app::run(…)` once you have it.
pub fn setup(pool: PgPool, config: Config) -> Router {
    let _entered = tracing::span!(Level::DEBUG, "Setting up application").entered();

    let router = match &config.public_dir {
        Some(public_dir) => Router::new().fallback_service(
            ServeDir::new(public_dir)
                .append_index_html_on_directories(true)
                .fallback(ServeFile::new(public_dir.join("index.html"))),
        ),
        None => {
            tracing::info!("No PUBLIC_DIR configured, serving no files");
            Router::new()
        }
    };

    router
        .route("/api/status", get(get_status))
        .route("/api/election", post(create_election))
        .route("/api/election/:election_id", delete(delete_election))
        .route(
            "/api/election/:election_id/definition/file",
            get(get_definition_file),
        )
        .route("/api/election/:election_id/data", get(get_election_data))
        .route(
            "/api/election/:election_id/jurisdiction/file",
            get(get_jurisdictions_file).put(put_jurisdictions_file),
        )
        .route(
            "/api/election/:election_id/jurisdiction/:jurisdiction_id/definitions",
            get(get_definitions),
        )
        .route(
            "/api/election/:election_id/jurisdiction/:jurisdiction_id/results",
            get(get_results_status).post(upload_results),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { config, pool })
}

/// Create and run an HTTP server using the provided application at the port
/// from [`config`][`super::config`].
pub async fn run(app: Router, config: &Config) -> color_eyre::Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port);
    tracing::info!("Server listening at http://{addr}/");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Always responds with a successful status. Used to check whether the server
/// is running.
async fn get_status() -> impl IntoResponse {
    StatusCode::OK
}

async fn create_election(
    State(state): State<AppState>,
    Json(request): Json<CreateElectionRequest>,
) -> Result<impl IntoResponse, Error> {
    // one transaction end to end: a failure mid-setup must not leave a
    // half-created election behind
    let mut txn = state.pool.begin().await?;

    let Some(organization_name) =
        db::get_organization_name(&mut txn, request.organization_id).await?
    else {
        return Err(Error::BadRequest("Invalid organization".to_owned()));
    };

    if db::election_name_exists(&mut txn, request.organization_id, &request.election_name).await? {
        return Err(Error::Conflict(format!(
            "An election with name '{}' already exists within your organization",
            request.election_name
        )));
    }

    let jurisdictions_file_id = db::create_file(
        &mut txn,
        &request.jurisdictions_file.name,
        &request.jurisdictions_file.contents,
    )
    .await?;
    let definition_file_id = db::create_file(
        &mut txn,
        &request.definition_file.name,
        &request.definition_file.contents,
    )
    .await?;
    let election_id =
        db::create_election(&mut txn, &request, jurisdictions_file_id, definition_file_id).await?;
    tracing::info!("Created election {election_id} ({})", request.election_name);

    let base = ActivityBase {
        organization_id: request.organization_id,
        organization_name,
        election_id,
        election_name: request.election_name.clone(),
        user_key: None,
    };
    activity_log::record_activity(&mut txn, &base, &Activity::CreateElection).await?;

    let jurisdictions_error =
        processing::process_jurisdictions_file(&mut txn, election_id, jurisdictions_file_id)
            .await?;
    activity_log::record_activity(
        &mut txn,
        &base,
        &Activity::UploadAndProcessFile {
            file_type: "jurisdictions".to_owned(),
            error: jurisdictions_error,
        },
    )
    .await?;

    let definition_error =
        processing::process_definition_file(&mut txn, election_id, definition_file_id).await?;
    activity_log::record_activity(
        &mut txn,
        &base,
        &Activity::UploadAndProcessFile {
            file_type: "electionDefinition".to_owned(),
            error: definition_error,
        },
    )
    .await?;

    txn.commit().await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "ok", "electionId": election_id })),
    ))
}

async fn delete_election(
    State(state): State<AppState>,
    Path(election_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.pool.acquire().await?;

    let Some(election) = db::get_election(&mut connection, election_id).await? else {
        return Err(Error::NotFound);
    };

    db::soft_delete_election(&mut connection, election_id).await?;
    tracing::info!("Deleted election {election_id} ({})", election.election_name);

    let base = activity_base(&mut connection, &election).await?;
    activity_log::record_activity(&mut connection, &base, &Activity::DeleteElection).await?;

    Ok(Json(json!({ "status": "ok" })))
}

/// Returns the election's installed definition in summary form, for
/// the public results dashboard.
async fn get_definition_file(
    State(state): State<AppState>,
    Path(election_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.pool.acquire().await?;

    if db::get_election(&mut connection, election_id).await?.is_none() {
        return Err(Error::NotFound);
    }

    let definition = db::get_definition(&mut connection, election_id, None).await?;
    let contests: Vec<_> = definition
        .contests
        .iter()
        .map(|contest| {
            json!({
                "id": contest.id,
                "name": contest.title,
                "allowWriteIns": contest.allow_write_ins,
                "candidates": contest
                    .candidates
                    .iter()
                    .map(|candidate| json!({ "id": candidate.id, "name": candidate.name }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    let precincts: Vec<_> = definition
        .precincts
        .iter()
        .map(|precinct| json!({ "id": precinct.id, "name": precinct.name }))
        .collect();

    Ok(Json(json!({ "contests": contests, "precincts": precincts })))
}

async fn get_election_data(
    State(state): State<AppState>,
    Path(election_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.pool.acquire().await?;

    if db::get_election(&mut connection, election_id).await?.is_none() {
        return Err(Error::NotFound);
    }

    let data = db::get_election_data(&mut connection, election_id).await?;
    Ok(Json(if data.is_empty() {
        ElectionDataResponse {
            message: NO_ENTRY_FOUND.to_owned(),
            data: None,
        }
    } else {
        ElectionDataResponse {
            message: ENTRIES_FOUND.to_owned(),
            data: Some(data),
        }
    }))
}

async fn get_jurisdictions_file(
    State(state): State<AppState>,
    Path(election_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.pool.acquire().await?;

    let Some(election) = db::get_election(&mut connection, election_id).await? else {
        return Err(Error::NotFound);
    };

    let file_info = match election.jurisdictions_file_id {
        Some(file_id) => db::get_file_info(&mut connection, file_id).await?,
        None => FileInfo::default(),
    };
    Ok(Json(file_info))
}

async fn put_jurisdictions_file(
    State(state): State<AppState>,
    Path(election_id): Path<Uuid>,
    Json(file): Json<SubmittedFile>,
) -> Result<impl IntoResponse, Error> {
    let mut txn = state.pool.begin().await?;

    let Some(election) = db::get_election(&mut txn, election_id).await? else {
        return Err(Error::NotFound);
    };

    let file_id = db::create_file(&mut txn, &file.name, &file.contents).await?;
    db::set_jurisdictions_file(&mut txn, election_id, file_id).await?;
    let error = processing::process_jurisdictions_file(&mut txn, election_id, file_id).await?;

    let base = activity_base(&mut txn, &election).await?;
    activity_log::record_activity(
        &mut txn,
        &base,
        &Activity::UploadAndProcessFile {
            file_type: "jurisdictions".to_owned(),
            error,
        },
    )
    .await?;

    txn.commit().await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Returns the contests, precincts and ballot types a jurisdiction may
/// submit results for.
async fn get_definitions(
    State(state): State<AppState>,
    Path((election_id, jurisdiction_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.pool.acquire().await?;

    if db::get_election(&mut connection, election_id).await?.is_none() {
        return Err(Error::NotFound);
    }
    if db::get_election_jurisdiction(&mut connection, election_id, jurisdiction_id)
        .await?
        .is_none()
    {
        return Err(Error::NotFound);
    }

    let definition = db::get_definition(&mut connection, election_id, Some(jurisdiction_id)).await?;
    Ok(Json(definition))
}

async fn get_results_status(
    State(state): State<AppState>,
    Path((election_id, jurisdiction_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.pool.acquire().await?;

    if db::get_election(&mut connection, election_id).await?.is_none() {
        return Err(Error::NotFound);
    }
    if db::get_election_jurisdiction(&mut connection, election_id, jurisdiction_id)
        .await?
        .is_none()
    {
        return Err(Error::NotFound);
    }

    let stats = db::get_upload_stats(&mut connection, election_id, jurisdiction_id).await?;
    Ok(Json(ResultsStatus::from_stats(stats)))
}

async fn upload_results(
    State(state): State<AppState>,
    Path((election_id, jurisdiction_id)): Path<(Uuid, Uuid)>,
    Json(submission): Json<ElectionResultSubmission>,
) -> Result<impl IntoResponse, Error> {
    let mut connection = state.pool.acquire().await?;

    let Some(election) = db::get_election(&mut connection, election_id).await? else {
        return Err(Error::NotFound);
    };
    let Some(jurisdiction) =
        db::get_election_jurisdiction(&mut connection, election_id, jurisdiction_id).await?
    else {
        return Err(Error::NotFound);
    };

    let mut seen_contests = HashSet::new();
    if !submission
        .contests
        .iter()
        .all(|contest| seen_contests.insert(contest.id.clone()))
    {
        return Err(Error::Conflict(format!(
            "Contests should be unique for ({} - {}) results",
            election.election_name, jurisdiction.name
        )));
    }

    let precinct_id = Uuid::parse_str(submission.precinct.as_str())
        .map_err(|_| Error::BadRequest("Invalid precinct".to_owned()))?;
    let Some(precinct) = db::get_precinct(&mut connection, election_id, precinct_id).await? else {
        return Err(Error::BadRequest("Invalid precinct".to_owned()));
    };
    if precinct
        .jurisdiction_id
        .is_some_and(|id| id != jurisdiction_id)
    {
        return Err(Error::BadRequest("Invalid precinct".to_owned()));
    }

    if db::results_exist_for_precinct(&mut connection, precinct_id).await? {
        return Err(Error::Conflict(
            "Results for this precinct are already uploaded".to_owned(),
        ));
    }

    let definition = db::get_definition(&mut connection, election_id, None).await?;
    let candidates_by_contest: HashMap<&str, HashSet<&str>> = definition
        .contests
        .iter()
        .map(|contest| {
            (
                contest.id.as_str(),
                contest
                    .candidates
                    .iter()
                    .map(|candidate| candidate.id.as_str())
                    .collect(),
            )
        })
        .collect();
    for contest in &submission.contests {
        let Some(candidate_ids) = candidates_by_contest.get(contest.id.as_str()) else {
            return Err(Error::BadRequest("Invalid contest".to_owned()));
        };
        for candidate in &contest.candidates {
            if candidate.id.as_str() != WRITE_IN_CANDIDATE_ID
                && !candidate_ids.contains(candidate.id.as_str())
            {
                return Err(Error::BadRequest("Invalid candidate".to_owned()));
            }
        }
    }

    let ballot_type_id = match &submission.ballot_type {
        Some(ballot_type) => {
            if !definition
                .ballot_types
                .iter()
                .any(|bt| bt.id == *ballot_type)
            {
                return Err(Error::BadRequest("Invalid ballot type".to_owned()));
            }
            Some(
                Uuid::parse_str(ballot_type.as_str())
                    .map_err(|_| Error::BadRequest("Invalid ballot type".to_owned()))?,
            )
        }
        None => None,
    };

    let result_id = db::create_election_result(
        &mut connection,
        election_id,
        jurisdiction_id,
        &precinct,
        ballot_type_id,
        &submission,
    )
    .await?;
    tracing::info!(
        "Recorded results {result_id} for precinct {:?} in election {election_id}",
        precinct.name
    );

    let base = activity_base(&mut connection, &election).await?;
    activity_log::record_activity(
        &mut connection,
        &base,
        &Activity::RecordResults {
            jurisdiction_id,
            jurisdiction_name: jurisdiction.name,
            precinct_name: precinct.name,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "status": "ok" }))))
}

async fn activity_base(
    connection: &mut sqlx::PgConnection,
    election: &ElectionRecord,
) -> Result<ActivityBase, Error> {
    let organization_name = db::get_organization_name(connection, election.organization_id)
        .await?
        .unwrap_or_default();
    Ok(ActivityBase {
        organization_id: election.organization_id,
        organization_name,
        election_id: election.id,
        election_name: election.election_name.clone(),
        user_key: None,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Not Found")]
    NotFound,
    #[error("{0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Other(#[from] color_eyre::Report),
}

impl Error {
    fn error_type(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "badRequest",
            Self::Conflict(_) => "conflict",
            Self::NotFound => "notFound",
            Self::Database(_) | Self::Other(_) => "internalServerError",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if matches!(self, Self::Database(_) | Self::Other(_)) {
            tracing::error!("Request failed: {self}");
        }
        (
            self.status_code(),
            Json(json!({
                "status": "error",
                "errors": [{ "errorType": self.error_type(), "message": self.to_string() }],
            })),
        )
            .into_response()
    }
}
