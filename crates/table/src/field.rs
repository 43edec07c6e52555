use std::fmt;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::record::TableRecord;
use crate::value::{FieldValue, DATE_FORMAT};

/// How a field is edited.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    /// One of a fixed set of text options.
    Select(Vec<String>),
    /// Shown but never edited inline.
    ReadOnly,
}

impl FieldKind {
    pub fn is_editable(&self) -> bool {
        !matches!(self, FieldKind::ReadOnly)
    }
}

/// Declarative description of one editable field and its validation rules.
/// 單一欄位的宣告式設定與驗證規則。
#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pattern: Option<Regex>,
    pattern_hint: Option<String>,
}

impl FieldConfig {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
            min: None,
            max: None,
            pattern: None,
            pattern_hint: None,
        }
    }

    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, FieldKind::Text)
    }

    pub fn number(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, FieldKind::Number)
    }

    pub fn date(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, FieldKind::Date)
    }

    pub fn select<I, S>(key: impl Into<String>, label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(key, label, FieldKind::Select(options))
    }

    pub fn read_only(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(key, label, FieldKind::ReadOnly)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Requires text values to match `pattern`; `hint` is shown when they do not.
    pub fn pattern(mut self, pattern: &str, hint: impl Into<String>) -> Result<Self, regex::Error> {
        self.pattern = Some(Regex::new(pattern)?);
        self.pattern_hint = Some(hint.into());
        Ok(self)
    }

    /// Same as [`FieldConfig::pattern`] for an already compiled expression.
    pub fn with_regex(mut self, pattern: Regex, hint: impl Into<String>) -> Self {
        self.pattern = Some(pattern);
        self.pattern_hint = Some(hint.into());
        self
    }

    /// Parses raw input text into a value of this field's kind.
    pub fn parse(&self, raw: &str) -> Result<FieldValue, FieldIssue> {
        let trimmed = raw.trim();
        match &self.kind {
            FieldKind::Text | FieldKind::ReadOnly => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Number if trimmed.is_empty() => Ok(FieldValue::Number(f64::NAN)),
            FieldKind::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(FieldValue::Number)
                .ok_or(FieldIssue::NotANumber),
            FieldKind::Date if trimmed.is_empty() => Ok(FieldValue::Text(String::new())),
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| FieldIssue::InvalidDate),
            FieldKind::Select(options) => {
                if trimmed.is_empty() || options.iter().any(|option| option == trimmed) {
                    Ok(FieldValue::Text(trimmed.to_string()))
                } else {
                    Err(FieldIssue::NotAnOption)
                }
            }
        }
    }

    /// Checks a value against the declared rules.
    pub fn validate(&self, value: Option<&FieldValue>) -> Result<(), FieldIssue> {
        let value = match value {
            Some(value) if !value.is_blank() => value,
            _ if self.required => return Err(FieldIssue::Required),
            _ => return Ok(()),
        };
        if let Some(number) = value.as_number() {
            if let Some(min) = self.min.filter(|min| number < *min) {
                return Err(FieldIssue::BelowMin(min));
            }
            if let Some(max) = self.max.filter(|max| number > *max) {
                return Err(FieldIssue::AboveMax(max));
            }
        }
        if let (Some(pattern), Some(text)) = (&self.pattern, value.as_text()) {
            if !pattern.is_match(text) {
                let hint = self
                    .pattern_hint
                    .clone()
                    .unwrap_or_else(|| format!("must match {}", pattern.as_str()));
                return Err(FieldIssue::PatternMismatch(hint));
            }
        }
        if let (FieldKind::Select(options), Some(text)) = (&self.kind, value.as_text()) {
            if !options.iter().any(|option| option == text) {
                return Err(FieldIssue::NotAnOption);
            }
        }
        Ok(())
    }
}

/// Reason a single field was rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldIssue {
    #[error("is required")]
    Required,
    #[error("must be a number")]
    NotANumber,
    #[error("must be a date (YYYY-MM-DD)")]
    InvalidDate,
    #[error("must be at least {0}")]
    BelowMin(f64),
    #[error("must be at most {0}")]
    AboveMax(f64),
    #[error("{0}")]
    PatternMismatch(String),
    #[error("is not one of the allowed options")]
    NotAnOption,
    #[error("cannot be stored in this row")]
    Unsupported,
}

/// Rejected inline edit; one entry per failing field.
/// 行內編輯驗證失敗，列出每個不合格的欄位。
#[derive(Debug, Error, Clone, PartialEq)]
pub struct ValidationError {
    pub issues: Vec<(String, String, FieldIssue)>,
}

impl ValidationError {
    /// Issue reported for `key`, if any.
    pub fn issue_for(&self, key: &str) -> Option<&FieldIssue> {
        self.issues
            .iter()
            .find(|(field, _, _)| field == key)
            .map(|(_, _, issue)| issue)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (_, label, issue)) in self.issues.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{label} {issue}")?;
        }
        Ok(())
    }
}

/// Checks every field of `row` against `fields`, collecting all failures.
/// 依欄位設定檢查整列資料，並收集所有不合格欄位。
pub fn validate_record<R: TableRecord>(
    row: &R,
    fields: &[FieldConfig],
) -> Result<(), ValidationError> {
    let issues: Vec<_> = fields
        .iter()
        .filter_map(|field| {
            field
                .validate(row.field(&field.key).as_ref())
                .err()
                .map(|issue| (field.key.clone(), field.label.clone(), issue))
        })
        .collect();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}
