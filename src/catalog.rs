// 🎓 Catalog Store - the scholarship collection and its filtered view
// Loaded once from a static JSON document, read-only afterwards

use crate::filter::{self, FilterCriteria};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Number of records the home view shows before the full listing
pub const HOME_PREVIEW_LIMIT: usize = 20;

/// Provider substring marking a centrally funded scholarship
const CENTRAL_MARKER: &str = "Central";

// ============================================================================
// IDENTITY
// ============================================================================

/// Scholarship identifier.
///
/// Catalog files carry ids either as JSON strings or JSON integers. Both are
/// normalized to their decimal/string form so `7` and `"7"` are the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ScholarshipId(String);

impl ScholarshipId {
    pub fn new(id: impl Into<String>) -> Self {
        ScholarshipId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<'de> Deserialize<'de> for ScholarshipId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => ScholarshipId(text),
            RawId::Signed(n) => ScholarshipId(n.to_string()),
            RawId::Unsigned(n) => ScholarshipId(n.to_string()),
        })
    }
}

impl fmt::Display for ScholarshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScholarshipId {
    fn from(id: &str) -> Self {
        ScholarshipId(id.to_string())
    }
}

impl From<String> for ScholarshipId {
    fn from(id: String) -> Self {
        ScholarshipId(id)
    }
}

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyLink {
    pub site_name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    Central,
    State,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Central => "Central",
            Origin::State => "State",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScholarshipRecord {
    pub id: ScholarshipId,
    pub name: String,
    pub provider: String,
    /// "All India" matches every state filter
    pub state: String,
    pub education_level: String,
    /// "all" matches every category filter
    pub category: String,
    /// Free text such as "Rs. 2,50,000", "Varies" or "As per norms"
    pub income_limit: String,
    pub description: String,
    pub apply_link: ApplyLink,
}

impl ScholarshipRecord {
    pub fn origin(&self) -> Origin {
        if self.provider.contains(CENTRAL_MARKER) {
            Origin::Central
        } else {
            Origin::State
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("empty id".to_string());
        }
        if self.name.trim().is_empty() {
            return Err(format!("record '{}' has an empty name", self.id));
        }
        if self.apply_link.url.trim().is_empty() {
            return Err(format!("record '{}' has an empty apply_link.url", self.id));
        }
        Ok(())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("duplicate scholarship id '{id}' at records {first} and {second}")]
    DuplicateId {
        id: ScholarshipId,
        first: usize,
        second: usize,
    },
}

// ============================================================================
// CATALOG
// ============================================================================

/// Full collection plus the most recent filtered view.
///
/// `Catalog::default()` is the empty catalog used before a load completes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    all: Vec<ScholarshipRecord>,
    filtered: Vec<ScholarshipRecord>,
}

impl Catalog {
    /// Load catalog from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_json_str(&content)?;
        info!(path = %path.display(), records = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        let records: Vec<ScholarshipRecord> = serde_json::from_str(content)?;
        Self::from_records(records)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let records: Vec<ScholarshipRecord> = serde_json::from_reader(reader)?;
        Self::from_records(records)
    }

    /// Validate records and seed the filtered view with all of them
    pub fn from_records(records: Vec<ScholarshipRecord>) -> Result<Self, LoadError> {
        let mut seen: HashMap<&ScholarshipId, usize> = HashMap::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            record
                .check()
                .map_err(|reason| LoadError::InvalidRecord { index, reason })?;

            if let Some(&first) = seen.get(&record.id) {
                return Err(LoadError::DuplicateId {
                    id: record.id.clone(),
                    first,
                    second: index,
                });
            }
            seen.insert(&record.id, index);
        }

        Ok(Catalog {
            filtered: records.clone(),
            all: records,
        })
    }

    pub fn all(&self) -> &[ScholarshipRecord] {
        &self.all
    }

    pub fn filtered(&self) -> &[ScholarshipRecord] {
        &self.filtered
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Replace the filtered view with the records matching `criteria`
    pub fn apply_filter(&mut self, criteria: &FilterCriteria) -> &[ScholarshipRecord] {
        self.filtered = filter::filter(&self.all, criteria);
        debug!(
            matched = self.filtered.len(),
            total = self.all.len(),
            "filter applied"
        );
        &self.filtered
    }

    /// First `limit` records of the filtered view
    pub fn preview(&self, limit: usize) -> &[ScholarshipRecord] {
        &self.filtered[..self.filtered.len().min(limit)]
    }

    pub fn find(&self, id: &ScholarshipId) -> Option<&ScholarshipRecord> {
        self.all.iter().find(|record| &record.id == id)
    }

    /// Distinct states, sorted, for the state picker
    pub fn states(&self) -> Vec<String> {
        self.all
            .iter()
            .map(|record| record.state.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Records whose id is in `ids`, in catalog order. Unknown ids are skipped.
    pub fn records_for(&self, ids: &BTreeSet<ScholarshipId>) -> Vec<ScholarshipRecord> {
        self.all
            .iter()
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(
        id: &str,
        state: &str,
        category: &str,
        income_limit: &str,
    ) -> ScholarshipRecord {
        ScholarshipRecord {
            id: ScholarshipId::from(id),
            name: format!("Scholarship {}", id),
            provider: "Ministry of Education, Central Government".to_string(),
            state: state.to_string(),
            education_level: "Undergraduate".to_string(),
            category: category.to_string(),
            income_limit: income_limit.to_string(),
            description: "Support for students".to_string(),
            apply_link: ApplyLink {
                site_name: "National Scholarship Portal".to_string(),
                url: "https://scholarships.gov.in".to_string(),
            },
        }
    }

    const SAMPLE: &str = r#"[
        {
            "id": 1,
            "name": "Post Matric Scholarship",
            "provider": "Ministry of Social Justice (Central)",
            "state": "All India",
            "education_level": "Class 11 to Postgraduate",
            "category": "SC",
            "income_limit": "Rs. 2,50,000",
            "description": "Financial assistance for SC students",
            "apply_link": { "site_name": "NSP", "url": "https://scholarships.gov.in" }
        },
        {
            "id": "kl-02",
            "name": "Kerala Merit Award",
            "provider": "Government of Kerala",
            "state": "Kerala",
            "education_level": "Undergraduate",
            "category": "all",
            "income_limit": "Varies",
            "description": "Merit award",
            "apply_link": { "site_name": "DCE Kerala", "url": "https://dcescholarship.kerala.gov.in" }
        }
    ]"#;

    #[test]
    fn test_load_sample_seeds_filtered_view() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.filtered().len(), 2);
        assert_eq!(catalog.all()[0].id.as_str(), "1");
        assert_eq!(catalog.all()[1].id.as_str(), "kl-02");
    }

    #[test]
    fn test_from_reader_matches_from_str() {
        let from_reader = Catalog::from_reader(SAMPLE.as_bytes()).unwrap();
        let from_str = Catalog::from_json_str(SAMPLE).unwrap();
        assert_eq!(from_reader.all(), from_str.all());

        let err = Catalog::from_reader(&b"[{\"id\": 1"[..]).unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn test_numeric_and_string_ids_normalize() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();

        assert!(catalog.find(&ScholarshipId::from("1")).is_some());
        assert!(catalog.find(&ScholarshipId::from("kl-02")).is_some());
        assert!(catalog.find(&ScholarshipId::from("2")).is_none());
    }

    #[test]
    fn test_origin_from_provider() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();

        assert_eq!(catalog.all()[0].origin(), Origin::Central);
        assert_eq!(catalog.all()[1].origin(), Origin::State);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let json = r#"[{ "id": 1, "name": "No provider" }]"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = Catalog::from_json_str("<html>404</html>").unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn test_empty_id_is_invalid() {
        let records = vec![
            record("1", "Kerala", "SC", "Varies"),
            record("  ", "Kerala", "SC", "Varies"),
        ];
        let err = Catalog::from_records(records).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRecord { index: 1, .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let records = vec![
            record("a", "Kerala", "SC", "Varies"),
            record("b", "Goa", "SC", "Varies"),
            record("a", "Bihar", "ST", "Varies"),
        ];

        match Catalog::from_records(records).unwrap_err() {
            LoadError::DuplicateId { id, first, second } => {
                assert_eq!(id.as_str(), "a");
                assert_eq!(first, 0);
                assert_eq!(second, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::load(dir.path().join("scholarships.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scholarships.json");
        fs::write(&path, SAMPLE).unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_empty_catalog_filters_to_nothing() {
        let mut catalog = Catalog::default();
        let criteria = FilterCriteria::default();
        assert!(catalog.apply_filter(&criteria).is_empty());
    }

    #[test]
    fn test_states_sorted_and_unique() {
        let catalog = Catalog::from_records(vec![
            record("1", "Kerala", "SC", "Varies"),
            record("2", "All India", "SC", "Varies"),
            record("3", "Kerala", "ST", "Varies"),
            record("4", "Bihar", "OBC", "Varies"),
        ])
        .unwrap();

        assert_eq!(catalog.states(), vec!["All India", "Bihar", "Kerala"]);
    }

    #[test]
    fn test_preview_caps_filtered_view() {
        let records = (0..25)
            .map(|i| record(&i.to_string(), "Kerala", "SC", "Varies"))
            .collect();
        let catalog = Catalog::from_records(records).unwrap();

        assert_eq!(catalog.preview(HOME_PREVIEW_LIMIT).len(), 20);
        assert_eq!(catalog.preview(100).len(), 25);
    }

    #[test]
    fn test_records_for_keeps_catalog_order() {
        let catalog = Catalog::from_records(vec![
            record("1", "Kerala", "SC", "Varies"),
            record("2", "Goa", "SC", "Varies"),
            record("3", "Bihar", "SC", "Varies"),
        ])
        .unwrap();

        let ids: BTreeSet<ScholarshipId> = ["3", "1", "missing"]
            .into_iter()
            .map(ScholarshipId::from)
            .collect();
        let saved = catalog.records_for(&ids);

        let saved_ids: Vec<&str> = saved.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(saved_ids, vec!["1", "3"]);
    }
}
