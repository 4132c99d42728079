//! State machine behind the jurisdiction admin's results entry form.
//!
//! The form starts unpopulated, becomes interactive once an election
//! definition arrives, and disables itself while a submission is in
//! flight. All user input is kept as entered (strings); nothing is
//! parsed until submit, when the declarative validation rules run and
//! a structured submission payload is built.

use elrep_types::election::{Candidate, Contest, ContestId, ElectionDefinition};
use elrep_types::results::{CandidateVotes, ContestVotes, ElectionResultSubmission, Source};

use crate::validation::{validate, FieldError, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    /// No election definition yet; every field is disabled.
    Unpopulated,
    /// Definition fetched; the form is interactive.
    Populated,
    /// Submission in flight; every field is disabled.
    Submitting,
}

/// One candidate vote-count input within a contest row.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateField {
    pub candidate: Candidate,
    pub num_votes: String,
}

/// One contest row: a contest selector plus the candidate fields it
/// populates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContestRow {
    pub contest_id: Option<ContestId>,
    pub candidates: Vec<CandidateField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsEntryForm {
    phase: FormPhase,
    definition: Option<ElectionDefinition>,
    precinct: String,
    ballot_type: String,
    total_ballots_cast: String,
    rows: Vec<ContestRow>,
}

impl Default for ResultsEntryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsEntryForm {
    pub fn new() -> Self {
        Self {
            phase: FormPhase::Unpopulated,
            definition: None,
            precinct: String::new(),
            ballot_type: String::new(),
            total_ballots_cast: String::new(),
            rows: Vec::new(),
        }
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    /// Whether the form's fields should render disabled.
    pub fn is_disabled(&self) -> bool {
        self.phase != FormPhase::Populated
    }

    pub fn definition(&self) -> Option<&ElectionDefinition> {
        self.definition.as_ref()
    }

    pub fn precinct(&self) -> &str {
        &self.precinct
    }

    pub fn ballot_type(&self) -> &str {
        &self.ballot_type
    }

    pub fn total_ballots_cast(&self) -> &str {
        &self.total_ballots_cast
    }

    pub fn rows(&self) -> &[ContestRow] {
        &self.rows
    }

    /// Transition from unpopulated to populated once the definition
    /// fetch resolves. Starts with a single blank contest row.
    pub fn populate(&mut self, definition: ElectionDefinition) {
        if self.phase != FormPhase::Unpopulated {
            return;
        }
        self.definition = Some(definition);
        self.rows = vec![ContestRow::default()];
        self.phase = FormPhase::Populated;
    }

    pub fn set_precinct(&mut self, precinct: impl Into<String>) {
        if !self.is_disabled() {
            self.precinct = precinct.into();
        }
    }

    pub fn set_ballot_type(&mut self, ballot_type: impl Into<String>) {
        if !self.is_disabled() {
            self.ballot_type = ballot_type.into();
        }
    }

    pub fn set_total_ballots_cast(&mut self, value: impl Into<String>) {
        if !self.is_disabled() {
            self.total_ballots_cast = value.into();
        }
    }

    pub fn set_num_votes(&mut self, row: usize, candidate: usize, value: impl Into<String>) {
        if self.is_disabled() {
            return;
        }
        if let Some(field) = self
            .rows
            .get_mut(row)
            .and_then(|r| r.candidates.get_mut(candidate))
        {
            field.num_votes = value.into();
        }
    }

    pub fn add_row(&mut self) {
        if !self.is_disabled() {
            self.rows.push(ContestRow::default());
        }
    }

    pub fn remove_row(&mut self, row: usize) {
        if !self.is_disabled() && row < self.rows.len() {
            self.rows.remove(row);
        }
    }

    /// The contests selectable in the given row: the definition's
    /// contests minus those already selected in other rows. A row's own
    /// selection stays in its options.
    pub fn available_contests(&self, row: usize) -> Vec<&Contest> {
        let Some(definition) = &self.definition else {
            return Vec::new();
        };
        definition
            .contests
            .iter()
            .filter(|contest| {
                self.rows.iter().enumerate().all(|(index, other)| {
                    index == row || other.contest_id.as_ref() != Some(&contest.id)
                })
            })
            .collect()
    }

    /// Selects a contest for a row and repopulates the row's candidate
    /// fields with empty vote counts. Switching a row's contest always
    /// discards whatever was entered in that row.
    pub fn select_contest(&mut self, row: usize, contest_id: &ContestId) {
        if self.is_disabled() {
            return;
        }
        let Some(contest) = self
            .definition
            .as_ref()
            .and_then(|d| d.contests.iter().find(|c| &c.id == contest_id))
        else {
            return;
        };
        let candidates = contest
            .voting_options()
            .into_iter()
            .map(|candidate| CandidateField {
                candidate,
                num_votes: String::new(),
            })
            .collect();
        if let Some(contest_row) = self.rows.get_mut(row) {
            contest_row.contest_id = Some(contest.id.clone());
            contest_row.candidates = candidates;
        }
    }

    /// Runs the validation rules the form submits under. Rows without a
    /// selected contest are skipped; every candidate field of a
    /// selected contest must hold a non-negative integer.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut rules = vec![
            Rule::required("precinct", self.precinct.clone()),
            Rule::non_negative_integer("totalBallotsCast", self.total_ballots_cast.clone()),
        ];
        for (row_index, row) in self.rows.iter().enumerate() {
            if row.contest_id.is_none() {
                continue;
            }
            for (candidate_index, field) in row.candidates.iter().enumerate() {
                rules.push(Rule::non_negative_integer(
                    format!("contests[{row_index}].candidates[{candidate_index}].numVotes"),
                    field.num_votes.clone(),
                ));
            }
        }
        validate(&rules)
    }

    /// Validates and, when clean, transitions to submitting and builds
    /// the payload. The source label is always forced to data entry.
    pub fn begin_submit(&mut self) -> Result<ElectionResultSubmission, Vec<FieldError>> {
        if self.phase != FormPhase::Populated {
            return Err(Vec::new());
        }
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let contests = self
            .rows
            .iter()
            .filter_map(|row| {
                let contest_id = row.contest_id.clone()?;
                Some(ContestVotes {
                    id: contest_id,
                    candidates: row
                        .candidates
                        .iter()
                        .map(|field| CandidateVotes {
                            id: field.candidate.id.clone(),
                            // validated above as a non-negative integer
                            num_votes: field.num_votes.trim().parse().unwrap_or_default(),
                        })
                        .collect(),
                })
            })
            .collect();

        self.phase = FormPhase::Submitting;
        Ok(ElectionResultSubmission {
            precinct: self.precinct.as_str().into(),
            ballot_type: if self.ballot_type.is_empty() {
                None
            } else {
                Some(self.ballot_type.as_str().into())
            },
            total_ballots_cast: self.total_ballots_cast.trim().parse().unwrap_or_default(),
            contests,
            source: Source::DataEntry,
        })
    }

    /// A failed submission re-enables the form with everything the user
    /// entered still in place.
    pub fn submit_failed(&mut self) {
        if self.phase == FormPhase::Submitting {
            self.phase = FormPhase::Populated;
        }
    }

    /// A successful submission is followed by a full page reload; the
    /// controller resets to its initial state awaiting a fresh
    /// definition.
    pub fn submit_succeeded(&mut self) {
        *self = Self::new();
    }
}
