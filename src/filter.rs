// 🔎 Filter Engine - multi-criterion matching over catalog records
// Pure: same catalog + same criteria always yields the same ordered result

use crate::catalog::ScholarshipRecord;
use serde::{Deserialize, Serialize};

/// Category value that matches every requested category
pub const ALL_CATEGORIES: &str = "all";

/// State value that matches every requested state
pub const ALL_INDIA: &str = "All India";

/// Income-limit phrases meaning "no fixed ceiling"
const UNCONSTRAINED_MARKERS: [&str; 2] = ["varies", "as per"];

// ============================================================================
// CRITERIA
// ============================================================================

/// Filter constraints for one invocation. `None` (or an empty string) means
/// "unconstrained" for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub category: Option<String>,

    /// The applicant's income, checked against each record's ceiling
    pub income: Option<u64>,

    pub state: Option<String>,

    /// Substring searched in the record's education level
    pub education: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build criteria from raw form values.
    ///
    /// Blank fields are dropped. An income that is not a whole number is
    /// treated as unconstrained.
    pub fn from_form(category: &str, income: &str, state: &str, education: &str) -> Self {
        FilterCriteria {
            category: non_blank(Some(category)).map(str::to_string),
            income: income.trim().parse().ok(),
            state: non_blank(Some(state)).map(str::to_string),
            education: non_blank(Some(education)).map(str::to_string),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_income(mut self, income: u64) -> Self {
        self.income = Some(income);
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_education(mut self, education: impl Into<String>) -> Self {
        self.education = Some(education.into());
        self
    }

    /// True when no field constrains the result
    pub fn is_unconstrained(&self) -> bool {
        non_blank(self.category.as_deref()).is_none()
            && self.income.is_none()
            && non_blank(self.state.as_deref()).is_none()
            && non_blank(self.education.as_deref()).is_none()
    }

    /// Human-readable summary for report headers
    ///
    /// Example: "Category: SC | Income: Rs.200000 | State: Kerala"
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if let Some(category) = non_blank(self.category.as_deref()) {
            parts.push(format!("Category: {}", category));
        }
        if let Some(income) = self.income {
            parts.push(format!("Income: Rs.{}", income));
        }
        if let Some(state) = non_blank(self.state.as_deref()) {
            parts.push(format!("State: {}", state));
        }
        if let Some(education) = non_blank(self.education.as_deref()) {
            parts.push(format!("Education: {}", education));
        }

        if parts.is_empty() {
            "None (showing all)".to_string()
        } else {
            parts.join(" | ")
        }
    }

    /// Check a single record against every specified constraint
    pub fn matches(&self, record: &ScholarshipRecord) -> bool {
        if let Some(category) = non_blank(self.category.as_deref()) {
            let own = record.category.to_lowercase();
            if own != category.to_lowercase() && own != ALL_CATEGORIES {
                return false;
            }
        }

        if let Some(income) = self.income {
            if let IncomeCeiling::Limit(limit) = parse_income_ceiling(&record.income_limit) {
                if limit < income {
                    return false;
                }
            }
        }

        if let Some(state) = non_blank(self.state.as_deref()) {
            if record.state != state && record.state != ALL_INDIA {
                return false;
            }
        }

        if let Some(education) = non_blank(self.education.as_deref()) {
            if !record
                .education_level
                .to_lowercase()
                .contains(&education.to_lowercase())
            {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// INCOME PARSING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomeCeiling {
    /// "Varies", "As per norms" and similar
    Unconstrained,

    /// No digits at all, e.g. "N/A". Fails open.
    Unparsed,

    Limit(u64),
}

/// Parse a free-text income limit into a ceiling.
///
/// Every non-digit character is stripped before parsing, so
/// "Rs. 2,50,000" → 250000. A digit string too large for `u64` saturates.
pub fn parse_income_ceiling(income_limit: &str) -> IncomeCeiling {
    let lower = income_limit.to_lowercase();
    if UNCONSTRAINED_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return IncomeCeiling::Unconstrained;
    }

    let digits: String = lower.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return IncomeCeiling::Unparsed;
    }

    IncomeCeiling::Limit(digits.parse().unwrap_or(u64::MAX))
}

// ============================================================================
// FILTER
// ============================================================================

/// Records of `catalog` passing `criteria`, in catalog order
pub fn filter(catalog: &[ScholarshipRecord], criteria: &FilterCriteria) -> Vec<ScholarshipRecord> {
    if criteria.is_unconstrained() {
        return catalog.to_vec();
    }

    catalog
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::record;

    fn ids(records: &[ScholarshipRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    fn sample() -> Vec<ScholarshipRecord> {
        let mut engineering = record("3", "Tamil Nadu", "OBC", "N/A");
        engineering.education_level = "Engineering (B.E./B.Tech)".to_string();

        vec![
            record("1", "Kerala", "SC", "Rs. 2,50,000"),
            record("2", "All India", "all", "Varies"),
            engineering,
            record("4", "Kerala", "ST", "As per norms"),
            record("5", "Goa", "sc", "Rs. 1,00,000 per annum"),
        ]
    }

    #[test]
    fn test_unconstrained_is_identity() {
        let catalog = sample();
        assert_eq!(filter(&catalog, &FilterCriteria::default()), catalog);

        let blank = FilterCriteria::from_form("", "  ", "", "");
        assert!(blank.is_unconstrained());
        assert_eq!(filter(&catalog, &blank), catalog);
    }

    #[test]
    fn test_empty_strings_are_unconstrained() {
        let catalog = sample();
        let criteria = FilterCriteria {
            category: Some(String::new()),
            income: None,
            state: Some(String::new()),
            education: Some(String::new()),
        };
        assert_eq!(filter(&catalog, &criteria).len(), catalog.len());
    }

    #[test]
    fn test_category_case_insensitive_with_all_sentinel() {
        let catalog = sample();
        let result = filter(&catalog, &FilterCriteria::new().with_category("SC"));
        assert_eq!(ids(&result), vec!["1", "2", "5"]);

        let result = filter(&catalog, &FilterCriteria::new().with_category("Minority"));
        assert_eq!(ids(&result), vec!["2"]);
    }

    #[test]
    fn test_all_category_passes_any_request() {
        let all = record("x", "Goa", "ALL", "Varies");
        for category in ["SC", "ST", "OBC", "General", "whatever"] {
            assert!(FilterCriteria::new().with_category(category).matches(&all));
        }
    }

    #[test]
    fn test_state_exact_or_all_india() {
        let catalog = vec![
            record("1", "Kerala", "SC", "Varies"),
            record("2", "All India", "SC", "Varies"),
            record("3", "Tamil Nadu", "SC", "Varies"),
        ];

        let result = filter(&catalog, &FilterCriteria::new().with_state("Kerala"));
        assert_eq!(ids(&result), vec!["1", "2"]);

        // exact match only
        let result = filter(&catalog, &FilterCriteria::new().with_state("kerala"));
        assert_eq!(ids(&result), vec!["2"]);
    }

    #[test]
    fn test_all_india_passes_any_state() {
        let all_india = record("x", "All India", "SC", "Varies");
        for state in ["Kerala", "Goa", "Punjab"] {
            assert!(FilterCriteria::new().with_state(state).matches(&all_india));
        }
    }

    #[test]
    fn test_income_parsing() {
        assert_eq!(parse_income_ceiling("Rs. 2,50,000"), IncomeCeiling::Limit(250_000));
        assert_eq!(parse_income_ceiling("Varies"), IncomeCeiling::Unconstrained);
        assert_eq!(parse_income_ceiling("As per norms"), IncomeCeiling::Unconstrained);
        assert_eq!(parse_income_ceiling("VARIES by course"), IncomeCeiling::Unconstrained);
        assert_eq!(parse_income_ceiling("N/A"), IncomeCeiling::Unparsed);
        assert_eq!(parse_income_ceiling(""), IncomeCeiling::Unparsed);
        assert_eq!(
            parse_income_ceiling("99999999999999999999999"),
            IncomeCeiling::Limit(u64::MAX)
        );
    }

    #[test]
    fn test_income_ceiling_comparison() {
        let catalog = sample();

        // 1 (250000) passes, 2 varies, 3 N/A, 4 as per, 5 (100000) rejected
        let result = filter(&catalog, &FilterCriteria::new().with_income(200_000));
        assert_eq!(ids(&result), vec!["1", "2", "3", "4"]);

        // ceiling equal to income still passes
        let result = filter(&catalog, &FilterCriteria::new().with_income(250_000));
        assert_eq!(ids(&result), vec!["1", "2", "3", "4"]);

        let result = filter(&catalog, &FilterCriteria::new().with_income(250_001));
        assert_eq!(ids(&result), vec!["2", "3", "4"]);
    }

    #[test]
    fn test_education_substring() {
        let catalog = sample();
        let result = filter(&catalog, &FilterCriteria::new().with_education("b.tech"));
        assert_eq!(ids(&result), vec!["3"]);

        let result = filter(&catalog, &FilterCriteria::new().with_education("GRADUATE"));
        assert_eq!(ids(&result), vec!["1", "2", "4", "5"]);
    }

    #[test]
    fn test_all_criteria_combined() {
        let catalog = sample();
        let criteria = FilterCriteria::new()
            .with_category("sc")
            .with_income(150_000)
            .with_state("Kerala")
            .with_education("under");

        assert_eq!(ids(&filter(&catalog, &criteria)), vec!["1", "2"]);
    }

    #[test]
    fn test_from_form_unparseable_income_is_unconstrained() {
        let criteria = FilterCriteria::from_form("SC", "two lakh", "Kerala", "");
        assert_eq!(criteria.category.as_deref(), Some("SC"));
        assert_eq!(criteria.income, None);
        assert_eq!(criteria.state.as_deref(), Some("Kerala"));
        assert_eq!(criteria.education, None);

        let criteria = FilterCriteria::from_form("", " 300000 ", "", "");
        assert_eq!(criteria.income, Some(300_000));
    }

    #[test]
    fn test_summary() {
        assert_eq!(FilterCriteria::default().summary(), "None (showing all)");

        let criteria = FilterCriteria::new()
            .with_category("SC")
            .with_income(200_000)
            .with_state("Kerala")
            .with_education("Undergraduate");
        assert_eq!(
            criteria.summary(),
            "Category: SC | Income: Rs.200000 | State: Kerala | Education: Undergraduate"
        );
    }
}
