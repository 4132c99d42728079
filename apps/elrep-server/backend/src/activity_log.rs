//! Records notable admin actions for later review.
//!
//! Every record is scoped to an organization and an election and keeps
//! its details as JSON, so new activity kinds don't need schema
//! changes.

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

/// Context shared by every activity record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBase {
    pub organization_id: Uuid,
    pub organization_name: String,
    pub election_id: Uuid,
    pub election_name: String,
    /// Identifier of the acting user, when known.
    pub user_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Activity {
    CreateElection,
    DeleteElection,
    #[serde(rename_all = "camelCase")]
    UploadAndProcessFile {
        file_type: String,
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RecordResults {
        jurisdiction_id: Uuid,
        jurisdiction_name: String,
        precinct_name: String,
    },
}

impl Activity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateElection => "CreateElection",
            Self::DeleteElection => "DeleteElection",
            Self::UploadAndProcessFile { .. } => "UploadAndProcessFile",
            Self::RecordResults { .. } => "RecordResults",
        }
    }
}

pub async fn record_activity(
    connection: &mut sqlx::PgConnection,
    base: &ActivityBase,
    activity: &Activity,
) -> color_eyre::Result<()> {
    let info = json!({
        "base": base,
        "details": activity,
    });
    sqlx::query(
        r#"
        INSERT INTO activity_log_record (id, timestamp, organization_id, activity_name, info)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(OffsetDateTime::now_utc())
    .bind(base.organization_id)
    .bind(activity.name())
    .bind(info)
    .execute(connection)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_activity_names() {
        assert_eq!(Activity::CreateElection.name(), "CreateElection");
        assert_eq!(
            Activity::UploadAndProcessFile {
                file_type: "jurisdictions".to_owned(),
                error: None,
            }
            .name(),
            "UploadAndProcessFile"
        );
    }

    #[test]
    fn test_activity_details_serialization() {
        let activity = Activity::UploadAndProcessFile {
            file_type: "electionDefinition".to_owned(),
            error: Some("Invalid election definition: expected value".to_owned()),
        };
        assert_eq!(
            serde_json::to_value(&activity).unwrap(),
            json!({
                "type": "uploadAndProcessFile",
                "fileType": "electionDefinition",
                "error": "Invalid election definition: expected value",
            })
        );
    }
}
