//! Numbering sequence state machine.
//!
//! A sequence belongs to one (tenant, document type) pair and issues formatted,
//! strictly increasing numbers, optionally restarting at 1 each calendar year.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use tallyforge_core::{AggregateRoot, DomainError, DomainResult, TenantId};

use crate::error::{NumberingError, NumberingResult};

/// Widest zero padding a format may request (`u64::MAX` has 20 digits).
pub const MAX_PADDING: usize = 20;

/// Kind of document a sequence numbers (e.g. `sales_invoice`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentType(String);

impl DocumentType {
    pub fn new(raw: &str) -> DomainResult<Self> {
        let value = raw.trim().to_lowercase();
        if value.is_empty() {
            return Err(DomainError::validation("document type cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DocumentType> for String {
    fn from(value: DocumentType) -> Self {
        value.0
    }
}

impl core::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a sequence row; also the scope of its exclusive lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    pub tenant_id: TenantId,
    pub document_type: DocumentType,
}

impl SequenceKey {
    pub fn new(tenant_id: TenantId, document_type: DocumentType) -> Self {
        Self {
            tenant_id,
            document_type,
        }
    }
}

impl core::fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.document_type)
    }
}

/// How issued numbers are rendered.
///
/// Parts are joined by `separator` in this order: prefix, year, month, number,
/// suffix. An empty prefix or suffix is left out rather than producing a doubled
/// separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FormatRecord")]
pub struct SequenceFormat {
    pub prefix: String,
    pub suffix: String,
    pub separator: String,
    pub padding: usize,
    pub include_year: bool,
    pub include_month: bool,
    pub yearly_reset: bool,
}

impl Default for SequenceFormat {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            separator: "-".to_string(),
            padding: 5,
            include_year: false,
            include_month: false,
            yearly_reset: false,
        }
    }
}

impl SequenceFormat {
    pub fn validate(&self) -> DomainResult<()> {
        if self.padding > MAX_PADDING {
            return Err(DomainError::validation(format!(
                "padding cannot exceed {MAX_PADDING} digits (got {})",
                self.padding
            )));
        }
        Ok(())
    }

    /// Render `number` as issued at `at`. Numbers wider than `padding` are not truncated.
    pub fn render(&self, number: u64, at: DateTime<Utc>) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(5);
        if !self.prefix.is_empty() {
            parts.push(self.prefix.clone());
        }
        if self.include_year {
            parts.push(format!("{:04}", at.year()));
        }
        if self.include_month {
            parts.push(format!("{:02}", at.month()));
        }
        parts.push(format!("{number:0width$}", width = self.padding));
        if !self.suffix.is_empty() {
            parts.push(self.suffix.clone());
        }
        parts.join(&self.separator)
    }
}

/// Stored shape of [`SequenceFormat`]. Missing fields take the defaults.
#[derive(Deserialize)]
#[serde(default)]
struct FormatRecord {
    prefix: String,
    suffix: String,
    separator: String,
    padding: usize,
    include_year: bool,
    include_month: bool,
    yearly_reset: bool,
}

impl Default for FormatRecord {
    fn default() -> Self {
        let SequenceFormat {
            prefix,
            suffix,
            separator,
            padding,
            include_year,
            include_month,
            yearly_reset,
        } = SequenceFormat::default();
        Self {
            prefix,
            suffix,
            separator,
            padding,
            include_year,
            include_month,
            yearly_reset,
        }
    }
}

impl TryFrom<FormatRecord> for SequenceFormat {
    type Error = DomainError;

    fn try_from(record: FormatRecord) -> Result<Self, Self::Error> {
        let format = Self {
            prefix: record.prefix,
            suffix: record.suffix,
            separator: record.separator,
            padding: record.padding,
            include_year: record.include_year,
            include_month: record.include_month,
            yearly_reset: record.yearly_reset,
        };
        format.validate()?;
        Ok(format)
    }
}

/// Counter state of one (tenant, document type).
///
/// Deserialized rows go through the same checks as [`NumberingSequence::new`]
/// and [`NumberingSequence::starting_at`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SequenceRecord")]
pub struct NumberingSequence {
    key: SequenceKey,
    format: SequenceFormat,
    next_number: u64,
    last_reset_year: Option<i32>,
    version: u64,
}

impl NumberingSequence {
    pub fn new(key: SequenceKey, format: SequenceFormat) -> DomainResult<Self> {
        format.validate()?;
        Ok(Self {
            key,
            format,
            next_number: 1,
            last_reset_year: None,
            version: 0,
        })
    }

    pub fn starting_at(mut self, next_number: u64) -> DomainResult<Self> {
        if next_number == 0 {
            return Err(DomainError::validation("next number must be at least 1"));
        }
        self.next_number = next_number;
        Ok(self)
    }

    pub fn with_last_reset_year(mut self, year: i32) -> Self {
        self.last_reset_year = Some(year);
        self
    }

    pub fn key(&self) -> &SequenceKey {
        &self.key
    }

    pub fn format(&self) -> &SequenceFormat {
        &self.format
    }

    pub fn next_number(&self) -> u64 {
        self.next_number
    }

    pub fn last_reset_year(&self) -> Option<i32> {
        self.last_reset_year
    }

    fn reset_due(&self, year: i32) -> bool {
        self.format.yearly_reset && self.last_reset_year != Some(year)
    }

    /// Number the next `advance` at `at` would issue, taking a pending yearly reset into account.
    pub fn peek_number(&self, at: DateTime<Utc>) -> u64 {
        if self.reset_due(at.year()) {
            1
        } else {
            self.next_number
        }
    }

    /// The string the next `advance` at `at` would return. Does not mutate.
    pub fn preview(&self, at: DateTime<Utc>) -> String {
        self.format.render(self.peek_number(at), at)
    }

    /// Issue the next number: apply a due yearly reset, render, then increment.
    ///
    /// State is left untouched when the counter cannot be incremented.
    pub fn advance(&mut self, at: DateTime<Utc>) -> NumberingResult<String> {
        let year = at.year();
        let reset = self.reset_due(year);
        let number = if reset { 1 } else { self.next_number };
        let following = number
            .checked_add(1)
            .ok_or_else(|| NumberingError::Exhausted(self.key.clone()))?;

        let formatted = self.format.render(number, at);

        if reset {
            self.last_reset_year = Some(year);
        }
        self.next_number = following;
        self.version += 1;

        Ok(formatted)
    }

    /// Replace the format, keeping the counter.
    pub fn reconfigure(&mut self, format: SequenceFormat) -> DomainResult<()> {
        format.validate()?;
        self.format = format;
        self.version += 1;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SequenceRecord {
    key: SequenceKey,
    format: SequenceFormat,
    next_number: u64,
    #[serde(default)]
    last_reset_year: Option<i32>,
    #[serde(default)]
    version: u64,
}

impl TryFrom<SequenceRecord> for NumberingSequence {
    type Error = DomainError;

    fn try_from(record: SequenceRecord) -> Result<Self, Self::Error> {
        let mut sequence = Self::new(record.key, record.format)?.starting_at(record.next_number)?;
        sequence.last_reset_year = record.last_reset_year;
        sequence.version = record.version;
        Ok(sequence)
    }
}

impl AggregateRoot for NumberingSequence {
    type Id = SequenceKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(year: i32, month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, 15, 9, 30, 0).unwrap()
    }

    fn key() -> SequenceKey {
        SequenceKey::new(TenantId::new(), DocumentType::new("Sales_Invoice").unwrap())
    }

    fn invoice_format() -> SequenceFormat {
        SequenceFormat {
            prefix: "INV".to_string(),
            include_year: true,
            ..SequenceFormat::default()
        }
    }

    fn embedded_number(formatted: &str) -> u64 {
        formatted.rsplit('-').next().unwrap().parse().unwrap()
    }

    #[test]
    fn document_types_are_normalized() {
        assert_eq!(DocumentType::new("  Sales_Invoice ").unwrap().as_str(), "sales_invoice");
        assert!(DocumentType::new(" ").is_err());
    }

    #[test]
    fn renders_parts_in_fixed_order() {
        let format = SequenceFormat {
            prefix: "PO".to_string(),
            suffix: "HQ".to_string(),
            separator: "/".to_string(),
            padding: 4,
            include_year: true,
            include_month: true,
            yearly_reset: false,
        };
        assert_eq!(format.render(7, at(2026, 3)), "PO/2026/03/0007/HQ");
    }

    #[test]
    fn empty_prefix_and_suffix_are_skipped() {
        let format = SequenceFormat::default();
        assert_eq!(format.render(42, at(2026, 1)), "00042");
    }

    #[test]
    fn wide_numbers_are_not_truncated() {
        let format = SequenceFormat {
            padding: 2,
            ..SequenceFormat::default()
        };
        assert_eq!(format.render(12345, at(2026, 1)), "12345");
    }

    #[test]
    fn padding_is_bounded() {
        let format = SequenceFormat {
            padding: MAX_PADDING + 1,
            ..SequenceFormat::default()
        };
        assert!(NumberingSequence::new(key(), format).is_err());
    }

    #[test]
    fn advance_issues_increasing_numbers() {
        let mut seq = NumberingSequence::new(key(), invoice_format()).unwrap();
        let now = at(2026, 10);

        let issued: Vec<String> = (0..5).map(|_| seq.advance(now).unwrap()).collect();

        assert_eq!(issued[0], "INV-2026-00001");
        assert_eq!(issued[4], "INV-2026-00005");
        assert_eq!(seq.next_number(), 6);
        assert_eq!(seq.version(), 5);
    }

    #[test]
    fn preview_never_changes_the_next_issued_value() {
        let mut seq = NumberingSequence::new(key(), invoice_format()).unwrap();
        let now = at(2026, 10);

        for _ in 0..5 {
            let before = seq.clone();
            let preview = seq.preview(now);
            assert_eq!(seq, before);
            assert_eq!(seq.advance(now).unwrap(), preview);
        }
    }

    #[test]
    fn yearly_reset_restarts_at_one() {
        let format = SequenceFormat {
            yearly_reset: true,
            ..invoice_format()
        };
        let mut seq = NumberingSequence::new(key(), format)
            .unwrap()
            .starting_at(731)
            .unwrap()
            .with_last_reset_year(2025);

        assert_eq!(seq.preview(at(2026, 1)), "INV-2026-00001");
        assert_eq!(seq.last_reset_year(), Some(2025));

        assert_eq!(seq.advance(at(2026, 1)).unwrap(), "INV-2026-00001");
        assert_eq!(seq.last_reset_year(), Some(2026));
        assert_eq!(seq.advance(at(2026, 2)).unwrap(), "INV-2026-00002");
    }

    #[test]
    fn without_yearly_reset_the_counter_carries_over() {
        let mut seq = NumberingSequence::new(key(), invoice_format())
            .unwrap()
            .starting_at(731)
            .unwrap()
            .with_last_reset_year(2025);

        assert_eq!(seq.advance(at(2026, 1)).unwrap(), "INV-2026-00731");
        assert_eq!(seq.last_reset_year(), Some(2025));
    }

    #[test]
    fn yearly_reset_applies_on_first_use() {
        let format = SequenceFormat {
            yearly_reset: true,
            ..SequenceFormat::default()
        };
        let mut seq = NumberingSequence::new(key(), format)
            .unwrap()
            .starting_at(10)
            .unwrap();

        assert_eq!(seq.peek_number(at(2026, 6)), 1);
        seq.advance(at(2026, 6)).unwrap();
        assert_eq!(seq.last_reset_year(), Some(2026));
    }

    #[test]
    fn exhausted_counter_is_left_untouched() {
        let mut seq = NumberingSequence::new(key(), SequenceFormat::default())
            .unwrap()
            .starting_at(u64::MAX)
            .unwrap();
        let before = seq.clone();

        let err = seq.advance(at(2026, 1)).unwrap_err();
        assert!(matches!(err, NumberingError::Exhausted(_)));
        assert_eq!(seq, before);
    }

    #[test]
    fn reconfigure_keeps_counter_and_bumps_version() {
        let mut seq = NumberingSequence::new(key(), SequenceFormat::default()).unwrap();
        seq.advance(at(2026, 1)).unwrap();

        seq.reconfigure(invoice_format()).unwrap();
        assert_eq!(seq.version(), 2);
        assert_eq!(seq.advance(at(2026, 1)).unwrap(), "INV-2026-00002");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: consecutive advances embed strictly increasing integers.
        #[test]
        fn advances_are_strictly_increasing(start in 1u64..1_000_000u64, count in 1usize..50) {
            let mut seq = NumberingSequence::new(key(), invoice_format())
                .unwrap()
                .starting_at(start)
                .unwrap();
            let now = at(2026, 10);

            let mut last = None;
            for _ in 0..count {
                let n = embedded_number(&seq.advance(now).unwrap());
                if let Some(prev) = last {
                    prop_assert_eq!(n, prev + 1);
                }
                last = Some(n);
            }
        }
    }

    #[test]
    fn stored_rows_are_validated_on_load() {
        let sequence = NumberingSequence::new(key(), invoice_format())
            .unwrap()
            .starting_at(42)
            .unwrap()
            .with_last_reset_year(2026);
        let json = serde_json::to_value(&sequence).unwrap();
        let loaded: NumberingSequence = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(loaded, sequence);

        let mut zero = json.clone();
        zero["next_number"] = serde_json::json!(0);
        assert!(serde_json::from_value::<NumberingSequence>(zero).is_err());

        let mut wide = json;
        wide["format"]["padding"] = serde_json::json!(10_000_000);
        assert!(serde_json::from_value::<NumberingSequence>(wide).is_err());
    }

    #[test]
    fn format_fields_default_when_missing() {
        let format: SequenceFormat = serde_json::from_str(r#"{"prefix":"SO"}"#).unwrap();
        assert_eq!(format.prefix, "SO");
        assert_eq!(format.padding, 5);
        assert_eq!(format.separator, "-");
    }
}
