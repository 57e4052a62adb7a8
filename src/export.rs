// 📄 Export Formatter - printable reports of a record selection
// Consumes a read-only slice plus metadata; never touches the stores

use crate::accounts::UserAccount;
use crate::catalog::ScholarshipRecord;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::io::Write;
use thiserror::Error;

const RULE: &str = "================================================================";
const SEPARATOR: &str = "----------------------------------------------------------------";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No saved scholarships to export.")]
    NothingToExport,

    #[error("No scholarships match the current filters.")]
    NoMatches,

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Csv,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report<'a> {
    title: &'static str,
    file_stem: &'static str,
    records: &'a [ScholarshipRecord],
    filter_summary: Option<String>,
    user: Option<(String, String)>,
    generated_at: DateTime<Local>,
}

impl<'a> Report<'a> {
    /// Report over a filtered view; `filter_summary` comes from
    /// `FilterCriteria::summary`. An empty view is rejected.
    pub fn eligible(
        records: &'a [ScholarshipRecord],
        filter_summary: impl Into<String>,
    ) -> Result<Self, ExportError> {
        if records.is_empty() {
            return Err(ExportError::NoMatches);
        }

        Ok(Report {
            title: "ScholarSeva Eligible Scholarships Report",
            file_stem: "ScholarSeva_Eligible_Scholarships",
            records,
            filter_summary: Some(filter_summary.into()),
            user: None,
            generated_at: Local::now(),
        })
    }

    /// Report over a user's saved records. An empty selection is rejected.
    pub fn saved(records: &'a [ScholarshipRecord]) -> Result<Self, ExportError> {
        if records.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        Ok(Report {
            title: "ScholarSeva Saved Scholarships Report",
            file_stem: "ScholarSeva_Saved_Scholarships",
            records,
            filter_summary: None,
            user: None,
            generated_at: Local::now(),
        })
    }

    pub fn with_user(mut self, user: &UserAccount) -> Self {
        self.user = Some((user.username.clone(), user.email.clone()));
        self
    }

    pub fn generated_at(mut self, at: DateTime<Local>) -> Self {
        self.generated_at = at;
        self
    }

    pub fn title(&self) -> &str {
        self.title
    }

    pub fn file_name(&self, format: ReportFormat) -> String {
        format!("{}.{}", self.file_stem, format.extension())
    }

    pub fn write_to<W: Write>(&self, format: ReportFormat, writer: W) -> Result<(), ExportError> {
        match format {
            ReportFormat::Text => {
                let mut writer = writer;
                writer.write_all(self.render_text().as_bytes())?;
                Ok(())
            }
            ReportFormat::Csv => self.write_csv(writer),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();

        // writing into a String cannot fail
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(
            out,
            "Generated: {} at {}",
            self.generated_at.format("%d/%m/%Y"),
            self.generated_at.format("%-I:%M:%S %P")
        );
        if let Some((username, email)) = &self.user {
            let _ = writeln!(out, "User: {} ({})", username, email);
        }
        if let Some(summary) = &self.filter_summary {
            let _ = writeln!(out, "Filters Applied: {}", summary);
        }
        let _ = writeln!(out, "Total Results: {} scholarship(s)", self.records.len());
        let _ = writeln!(out, "{}", RULE);

        for (i, s) in self.records.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, s.name);
            let _ = writeln!(out, "   State: {}", s.state);
            let _ = writeln!(out, "   Education Level: {}", s.education_level);
            let _ = writeln!(out, "   Provider: {}", s.provider);
            let _ = writeln!(out, "   Category: {}", s.category);
            let _ = writeln!(out, "   Income Limit: {}", s.income_limit);
            let _ = writeln!(out, "   Portal: {}", s.apply_link.site_name);
            let _ = writeln!(out, "   Apply Link: {}", s.apply_link.url);

            if i + 1 < self.records.len() {
                let _ = writeln!(out, "{}", SEPARATOR);
            }
        }

        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Generated by ScholarSeva");
        let _ = writeln!(out, "Platform under development. Scholarships updated weekly.");
        out
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([
            "id",
            "name",
            "origin",
            "provider",
            "state",
            "education_level",
            "category",
            "income_limit",
            "portal",
            "apply_link",
        ])?;

        for s in self.records {
            wtr.write_record([
                s.id.as_str(),
                s.name.as_str(),
                s.origin().as_str(),
                s.provider.as_str(),
                s.state.as_str(),
                s.education_level.as_str(),
                s.category.as_str(),
                s.income_limit.as_str(),
                s.apply_link.site_name.as_str(),
                s.apply_link.url.as_str(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
