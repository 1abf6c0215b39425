use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::normalize::{format_currency, format_ein, format_ssn};
use crate::plan::builder::FormValues;

// ============================================================================
// Field rules
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    Ssn,
    Ein,
    Currency,
}

impl FieldFormat {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            FieldFormat::Ssn => format_ssn(raw),
            FieldFormat::Ein => format_ein(raw),
            FieldFormat::Currency => format_currency(raw),
        }
    }
}

const W2_REQUIRED: &[&str] = &[
    "employee_name",
    "employee_ssn",
    "employer_name",
    "employer_ein",
    "wages",
    "federal_tax_withheld",
];

const W2_CURRENCY: &[&str] = &[
    "wages",
    "federal_tax_withheld",
    "social_security_wages",
    "social_security_tax",
    "medicare_wages",
    "medicare_tax",
    "social_security_tips",
    "allocated_tips",
    "dependent_care_benefits",
    "nonqualified_plans",
    "state_wages",
    "state_tax",
    "local_wages",
    "local_tax",
];

/// Required fields and per-field formatting for one kind of form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRules {
    pub required: Vec<String>,
    pub formats: BTreeMap<String, FieldFormat>,
}

impl FieldRules {
    /// No requirements, no formatting.
    pub fn none() -> Self {
        Self::default()
    }

    /// IRS form W-2.
    pub fn w2() -> Self {
        let mut formats: BTreeMap<String, FieldFormat> = W2_CURRENCY
            .iter()
            .map(|f| (f.to_string(), FieldFormat::Currency))
            .collect();
        formats.insert("employee_ssn".into(), FieldFormat::Ssn);
        formats.insert("employer_ein".into(), FieldFormat::Ein);

        Self {
            required: W2_REQUIRED.iter().map(|f| f.to_string()).collect(),
            formats,
        }
    }

    /// Required fields that are absent or blank.
    pub fn missing_fields(&self, record: &FormValues) -> Vec<String> {
        self.required
            .iter()
            .filter(|f| record.get(*f).is_none_or(|v| v.trim().is_empty()))
            .cloned()
            .collect()
    }

    /// Copy of `record` with formatting applied to non-empty values.
    pub fn clean(&self, record: &FormValues) -> FormValues {
        record
            .iter()
            .map(|(field, value)| {
                let value = match self.formats.get(field) {
                    Some(format) if !value.trim().is_empty() => format.apply(value),
                    _ => value.clone(),
                };
                (field.clone(), value)
            })
            .collect()
    }

    pub fn validate_batch(&self, records: &[FormValues]) -> ValidationReport {
        let mut report = ValidationReport {
            total: records.len(),
            ..ValidationReport::default()
        };

        for (index, record) in records.iter().enumerate() {
            let missing = self.missing_fields(record);
            if missing.is_empty() {
                report.valid += 1;
                continue;
            }
            let label = record_label(record);
            warn!(index, record = %label, ?missing, "record is missing required fields");
            report.invalid += 1;
            report.errors.push(RecordIssue {
                index,
                label,
                missing_fields: missing,
            });
        }

        report
    }
}

impl FromStr for FieldRules {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(FieldRules::none()),
            "w2" | "w-2" => Ok(FieldRules::w2()),
            other => Err(format!("unknown preset '{}' (expected none or w2)", other)),
        }
    }
}

/// Name used to identify a record in reports.
pub fn record_label(record: &FormValues) -> String {
    ["employee_name", "name", "full_name"]
        .iter()
        .find_map(|k| record.get(*k).filter(|v| !v.trim().is_empty()))
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string())
}

// ============================================================================
// Validation report
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub index: usize,
    pub label: String,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: Vec<RecordIssue>,
}

impl ValidationReport {
    pub fn all_valid(&self) -> bool {
        self.invalid == 0
    }
}

// ============================================================================
// Sample data
// ============================================================================

fn record(pairs: &[(&str, &str)]) -> FormValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Two complete W-2 records for trying the tool out.
pub fn sample_w2_records() -> Vec<FormValues> {
    vec![
        record(&[
            ("employee_name", "John Smith"),
            ("employee_ssn", "123-45-6789"),
            ("employee_address", "123 Main St"),
            ("employee_city", "New York"),
            ("employee_state", "NY"),
            ("employee_zip", "10001"),
            ("employer_name", "ABC Corporation"),
            ("employer_ein", "12-3456789"),
            ("employer_address", "456 Business Ave"),
            ("employer_city", "New York"),
            ("employer_state", "NY"),
            ("employer_zip", "10002"),
            ("wages", "75000.00"),
            ("federal_tax_withheld", "12500.00"),
            ("social_security_wages", "75000.00"),
            ("social_security_tax", "4650.00"),
            ("medicare_wages", "75000.00"),
            ("medicare_tax", "1087.50"),
            ("state", "NY"),
            ("state_wages", "75000.00"),
            ("state_tax", "4500.00"),
        ]),
        record(&[
            ("employee_name", "Jane Doe"),
            ("employee_ssn", "987-65-4321"),
            ("employee_address", "789 Oak Lane"),
            ("employee_city", "Los Angeles"),
            ("employee_state", "CA"),
            ("employee_zip", "90001"),
            ("employer_name", "XYZ Industries"),
            ("employer_ein", "98-7654321"),
            ("employer_address", "321 Commerce Blvd"),
            ("employer_city", "Los Angeles"),
            ("employer_state", "CA"),
            ("employer_zip", "90002"),
            ("wages", "85000.00"),
            ("federal_tax_withheld", "15300.00"),
            ("social_security_wages", "85000.00"),
            ("social_security_tax", "5270.00"),
            ("medicare_wages", "85000.00"),
            ("medicare_tax", "1232.50"),
            ("state", "CA"),
            ("state_wages", "85000.00"),
            ("state_tax", "6800.00"),
        ]),
    ]
}
