//! CSV hydration for the in-memory store.
//!
//! The roster and vote history are owned by an external import process; these
//! readers accept its exports so the service can run without a database.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use super::{BillCategoryRepository, InMemoryStore, RepositoryError};
use crate::config::DataSources;
use crate::domain::{
    BillCategoryAssignment, Representative, RepresentativeId, Vote, VoteResult, VoteType,
};
use crate::postal::PostalCode;
use crate::stats::bill_number::normalize_bill_number;

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
    Repository(RepositoryError),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read import file: {}", err),
            ImportError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            ImportError::InvalidRow { line, reason } => {
                write!(f, "invalid row on line {}: {}", line, reason)
            }
            ImportError::Repository(err) => write!(f, "could not store imported rows: {}", err),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRow { .. } => None,
            ImportError::Repository(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

/// Row counts loaded by [`load_sources`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub representatives: usize,
    pub votes: usize,
    pub manual_mappings: usize,
    pub district_aliases: usize,
    pub bill_categories: usize,
}

/// Loads every configured file into `store`. Missing entries are skipped.
pub fn load_sources(
    store: &InMemoryStore,
    sources: &DataSources,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::default();

    if let Some(path) = &sources.roster {
        let roster = read_roster(open(path)?)?;
        summary.representatives = roster.len();
        store.replace_roster(roster)?;
    }

    if let Some(path) = &sources.votes {
        let votes = read_votes(open(path)?)?;
        summary.votes = votes.len();
        store.add_votes(votes)?;
    }

    if let Some(path) = &sources.manual_mappings {
        for (code, district) in read_manual_mappings(open(path)?)? {
            store.add_manual_mapping(code, district)?;
            summary.manual_mappings += 1;
        }
    }

    if let Some(path) = &sources.district_aliases {
        for (from, to) in read_district_aliases(open(path)?)? {
            store.add_district_alias(&from, to)?;
            summary.district_aliases += 1;
        }
    }

    if let Some(path) = &sources.bill_categories {
        for assignment in read_bill_categories(open(path)?)? {
            store.insert_if_absent(assignment)?;
            summary.bill_categories += 1;
        }
    }

    info!(
        representatives = summary.representatives,
        votes = summary.votes,
        manual_mappings = summary.manual_mappings,
        district_aliases = summary.district_aliases,
        bill_categories = summary.bill_categories,
        "data import complete"
    );

    Ok(summary)
}

fn open(path: &Path) -> Result<File, ImportError> {
    Ok(File::open(path)?)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    id: String,
    name: String,
    district_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    district_id: Option<String>,
    party_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    gender: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    person_id: Option<String>,
}

pub fn read_roster<R: Read>(reader: R) -> Result<Vec<Representative>, ImportError> {
    let mut reader = csv_reader(reader);
    let mut roster = Vec::new();
    for row in reader.deserialize::<RosterRow>() {
        let row = row?;
        roster.push(Representative {
            id: RepresentativeId(row.id),
            name: row.name,
            district_name: row.district_name,
            district_id: row.district_id,
            party_name: row.party_name,
            email: row.email,
            phone: row.phone,
            url: row.url,
            gender: row.gender,
            person_id: row.person_id,
        });
    }
    Ok(roster)
}

#[derive(Debug, Deserialize)]
struct VoteRow {
    id: String,
    representative_id: String,
    date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    bill_number: Option<String>,
    motion_title: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    bill_title: Option<String>,
    vote_type: String,
    result: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    party_position: Option<String>,
}

pub fn read_votes<R: Read>(reader: R) -> Result<Vec<Vote>, ImportError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();
    let mut votes = Vec::new();

    for record in reader.records() {
        let record = record?;
        let line = line_of(&record);
        let row: VoteRow = record.deserialize(Some(&headers))?;
        let invalid = |reason: String| ImportError::InvalidRow { line, reason };

        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|_| invalid(format!("date '{}' is not YYYY-MM-DD", row.date)))?;
        let vote_type = parse_vote_type(&row.vote_type)
            .ok_or_else(|| invalid(format!("unknown vote type '{}'", row.vote_type)))?;
        let result = parse_vote_result(&row.result)
            .ok_or_else(|| invalid(format!("unknown result '{}'", row.result)))?;
        let party_position = match row.party_position.as_deref() {
            None => None,
            Some(raw) => Some(
                parse_vote_type(raw)
                    .ok_or_else(|| invalid(format!("unknown party position '{raw}'")))?,
            ),
        };

        votes.push(Vote {
            id: row.id,
            representative_id: RepresentativeId(row.representative_id),
            date,
            bill_number: row.bill_number.as_deref().map(normalize_bill_number),
            motion_title: row.motion_title,
            bill_title: row.bill_title,
            vote_type,
            result,
            party_position,
            category: None,
        });
    }

    Ok(votes)
}

#[derive(Debug, Deserialize)]
struct ManualMappingRow {
    postal_code: String,
    district_name: String,
}

pub fn read_manual_mappings<R: Read>(reader: R) -> Result<Vec<(PostalCode, String)>, ImportError> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let line = line_of(&record);
        let row: ManualMappingRow = record.deserialize(Some(&headers))?;
        let code = PostalCode::parse(&row.postal_code).map_err(|err| ImportError::InvalidRow {
            line,
            reason: err.to_string(),
        })?;
        rows.push((code, row.district_name));
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct DistrictAliasRow {
    from_district: String,
    to_district: String,
}

pub fn read_district_aliases<R: Read>(reader: R) -> Result<Vec<(String, String)>, ImportError> {
    let mut reader = csv_reader(reader);
    let mut rows = Vec::new();
    for row in reader.deserialize::<DistrictAliasRow>() {
        let row = row?;
        rows.push((row.from_district, row.to_district));
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct BillCategoryRow {
    bill_number: String,
    category: String,
}

pub fn read_bill_categories<R: Read>(
    reader: R,
) -> Result<Vec<BillCategoryAssignment>, ImportError> {
    let mut reader = csv_reader(reader);
    let mut rows = Vec::new();
    for row in reader.deserialize::<BillCategoryRow>() {
        let row = row?;
        rows.push(BillCategoryAssignment {
            bill_number: normalize_bill_number(&row.bill_number),
            category: row.category,
        });
    }
    Ok(rows)
}

fn parse_vote_type(raw: &str) -> Option<VoteType> {
    let key: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic())
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    match key.as_str() {
        "yea" | "yes" => Some(VoteType::Yea),
        "nay" | "no" => Some(VoteType::Nay),
        "paired" => Some(VoteType::Paired),
        "abstained" | "abstain" => Some(VoteType::Abstained),
        "notvoting" | "didnotvote" | "absent" => Some(VoteType::NotVoting),
        _ => None,
    }
}

fn parse_vote_result(raw: &str) -> Option<VoteResult> {
    let key: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic())
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    match key.as_str() {
        "agreedto" | "agreed" | "passed" => Some(VoteResult::AgreedTo),
        "negatived" | "defeated" => Some(VoteResult::Negatived),
        "tie" => Some(VoteResult::Tie),
        _ => None,
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roster_rows_treat_blank_optionals_as_missing() {
        let csv = "id,name,district_name,district_id,party_name,email,phone,url,gender,person_id\n\
mp-1,Jane Doe,Oakville East,35075,Liberal,,613-555-0100,,F,12345\n";
        let roster = read_roster(Cursor::new(csv)).expect("roster parses");
        assert_eq!(roster.len(), 1);
        let rep = &roster[0];
        assert_eq!(rep.id, RepresentativeId("mp-1".to_string()));
        assert_eq!(rep.district_id.as_deref(), Some("35075"));
        assert!(rep.email.is_none());
        assert_eq!(rep.person_id.as_deref(), Some("12345"));
    }

    #[test]
    fn votes_parse_loose_enum_spellings() {
        let csv = "id,representative_id,date,bill_number,motion_title,bill_title,vote_type,result,party_position\n\
v1,mp-1,2025-06-10,c-5,Third reading of Bill C-5,,Yea,Agreed To,Yea\n\
v2,mp-1,2025-06-11,,Opposition motion,,Not Voting,Negatived,\n";
        let votes = read_votes(Cursor::new(csv)).expect("votes parse");
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].bill_number.as_deref(), Some("C-5"));
        assert_eq!(votes[0].result, VoteResult::AgreedTo);
        assert_eq!(votes[0].party_position, Some(VoteType::Yea));
        assert_eq!(votes[1].vote_type, VoteType::NotVoting);
        assert!(votes[1].party_position.is_none());
        assert!(votes[1].bill_number.is_none());
    }

    #[test]
    fn votes_report_the_offending_line() {
        let csv = "id,representative_id,date,bill_number,motion_title,bill_title,vote_type,result,party_position\n\
v1,mp-1,2025-06-10,,Motion,,Yea,Agreed To,\n\
v2,mp-1,10/06/2025,,Motion,,Yea,Agreed To,\n";
        match read_votes(Cursor::new(csv)) {
            Err(ImportError::InvalidRow { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("10/06/2025"));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn manual_mappings_normalize_postal_codes() {
        let csv = "postal_code,district_name\nl6h 0a1,Oakville East\n";
        let rows = read_manual_mappings(Cursor::new(csv)).expect("mappings parse");
        assert_eq!(rows[0].0.as_str(), "L6H0A1");
        assert_eq!(rows[0].1, "Oakville East");

        let bad = "postal_code,district_name\n123,Nowhere\n";
        assert!(matches!(
            read_manual_mappings(Cursor::new(bad)),
            Err(ImportError::InvalidRow { line: 2, .. })
        ));
    }

    #[test]
    fn load_sources_propagates_missing_files() {
        let store = InMemoryStore::new();
        let sources = DataSources {
            roster: Some("./does-not-exist.csv".into()),
            ..DataSources::default()
        };
        match load_sources(&store, &sources) {
            Err(ImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
