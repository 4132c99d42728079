//! State for the election data table: per-jurisdiction submitted
//! results with a sortable column set and a breakdown modal.

use elrep_types::results::{ElectionDataResponse, ElectionDataRow};
use uuid::Uuid;

/// Organization memberships injected by the embedding frontend. The
/// table consults this before fetching anything: a user who is not an
/// admin of the requested election never triggers the request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminContext {
    pub user_id: String,
    pub memberships: Vec<OrganizationMembership>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationMembership {
    pub organization_id: Uuid,
    pub election_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCheck {
    Allowed,
    /// The caller should redirect to the admin landing page and show a
    /// "not found" notification.
    Denied,
}

impl AdminContext {
    pub fn check_election_access(&self, election_id: Uuid) -> AccessCheck {
        let is_member = self
            .memberships
            .iter()
            .any(|membership| membership.election_ids.contains(&election_id));
        if is_member {
            AccessCheck::Allowed
        } else {
            AccessCheck::Denied
        }
    }
}

/// Columns that can be sorted. File name and the row-action column
/// deliberately cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    JurisdictionName,
    CreatedAt,
    Source,
    TotalBallotsCast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectionDataTable {
    rows: Vec<ElectionDataRow>,
    sort: Option<(SortColumn, SortDirection)>,
    open_row: Option<Uuid>,
}

impl ElectionDataTable {
    pub fn new(rows: Vec<ElectionDataRow>) -> Self {
        Self {
            rows,
            sort: None,
            open_row: None,
        }
    }

    /// Builds the table from the data endpoint's response. The
    /// no-results sentinel (or an absent data array) yields an empty
    /// table rather than an error.
    pub fn from_response(response: ElectionDataResponse) -> Self {
        Self::new(response.data.unwrap_or_default())
    }

    /// An empty table, also used when the fetch itself failed.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ElectionDataRow] {
        &self.rows
    }

    pub fn sort(&self) -> Option<(SortColumn, SortDirection)> {
        self.sort
    }

    /// Sorts by the given column; sorting by the current column again
    /// flips the direction.
    pub fn sort_by(&mut self, column: SortColumn) {
        let direction = match self.sort {
            Some((current, SortDirection::Ascending)) if current == column => {
                SortDirection::Descending
            }
            _ => SortDirection::Ascending,
        };
        self.rows.sort_by(|a, b| {
            let ordering = match column {
                SortColumn::JurisdictionName => a.jurisdiction_name.cmp(&b.jurisdiction_name),
                SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
                SortColumn::Source => a.source.cmp(&b.source),
                SortColumn::TotalBallotsCast => a.total_ballots_cast.cmp(&b.total_ballots_cast),
            };
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        self.sort = Some((column, direction));
    }

    /// Opens the breakdown modal for a row. Unknown ids are ignored.
    pub fn open_row(&mut self, id: Uuid) {
        if self.rows.iter().any(|row| row.id == id) {
            self.open_row = Some(id);
        }
    }

    pub fn close_modal(&mut self) {
        self.open_row = None;
    }

    /// The row whose contest-by-contest breakdown the modal shows.
    pub fn selected_row(&self) -> Option<&ElectionDataRow> {
        let id = self.open_row?;
        self.rows.iter().find(|row| row.id == id)
    }
}

#[cfg(test)]
mod tests {
    use elrep_types::results::{Source, NO_ENTRY_FOUND};
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    use super::*;

    fn row(id: u128, jurisdiction: &str, ballots: u64, source: Source) -> ElectionDataRow {
        ElectionDataRow {
            id: Uuid::from_u128(id),
            jurisdiction_name: jurisdiction.to_owned(),
            file_name: format!("{jurisdiction} precinct"),
            created_at: datetime!(2020-11-03 20:00:00 UTC) + time::Duration::minutes(id as i64),
            source,
            total_ballots_cast: ballots,
            contests: vec![],
        }
    }

    #[test]
    fn test_access_check_runs_on_memberships() {
        let election_id = Uuid::from_u128(7);
        let context = AdminContext {
            user_id: "admin@example.com".to_owned(),
            memberships: vec![OrganizationMembership {
                organization_id: Uuid::from_u128(1),
                election_ids: vec![election_id],
            }],
        };
        assert_eq!(
            context.check_election_access(election_id),
            AccessCheck::Allowed
        );
        assert_eq!(
            context.check_election_access(Uuid::from_u128(8)),
            AccessCheck::Denied
        );
    }

    #[test]
    fn test_no_entry_sentinel_yields_empty_table() {
        let table = ElectionDataTable::from_response(ElectionDataResponse {
            message: NO_ENTRY_FOUND.to_owned(),
            data: None,
        });
        assert!(table.is_empty());
        assert_eq!(table.selected_row(), None);
    }

    #[test]
    fn test_sort_toggles_direction() {
        let mut table = ElectionDataTable::new(vec![
            row(1, "Broadwater County", 200, Source::DataEntry),
            row(2, "Adams County", 300, Source::FileUpload),
            row(3, "Custer County", 100, Source::DataEntry),
        ]);

        table.sort_by(SortColumn::JurisdictionName);
        let names: Vec<&str> = table
            .rows()
            .iter()
            .map(|r| r.jurisdiction_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Adams County", "Broadwater County", "Custer County"]
        );
        assert_eq!(
            table.sort(),
            Some((SortColumn::JurisdictionName, SortDirection::Ascending))
        );

        table.sort_by(SortColumn::JurisdictionName);
        let names: Vec<&str> = table
            .rows()
            .iter()
            .map(|r| r.jurisdiction_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Custer County", "Broadwater County", "Adams County"]
        );

        // switching columns starts ascending again
        table.sort_by(SortColumn::TotalBallotsCast);
        let ballots: Vec<u64> = table.rows().iter().map(|r| r.total_ballots_cast).collect();
        assert_eq!(ballots, vec![100, 200, 300]);
    }

    #[test]
    fn test_modal_selection() {
        let mut table = ElectionDataTable::new(vec![
            row(1, "Broadwater County", 200, Source::DataEntry),
            row(2, "Adams County", 300, Source::FileUpload),
        ]);

        table.open_row(Uuid::from_u128(2));
        assert_eq!(
            table.selected_row().map(|r| r.jurisdiction_name.as_str()),
            Some("Adams County")
        );

        // selection survives re-sorting
        table.sort_by(SortColumn::JurisdictionName);
        assert_eq!(
            table.selected_row().map(|r| r.jurisdiction_name.as_str()),
            Some("Adams County")
        );

        table.close_modal();
        assert_eq!(table.selected_row(), None);

        table.open_row(Uuid::from_u128(99));
        assert_eq!(table.selected_row(), None);
    }
}
