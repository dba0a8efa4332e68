//! Domain models for Cadence

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An imported spreadsheet that owns a batch of transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFile {
    pub id: i64,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub transaction_count: i64,
}

/// A spending transaction as produced by the importer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// The import file this transaction came from
    pub file_id: i64,
    pub category: String,
    /// Payee or account the money went to
    pub source: String,
    pub description: String,
    /// Normalized amount in a single currency unit
    pub amount: f64,
    /// Amount exactly as it appeared in the import
    pub amount_original: String,
    pub is_paid: bool,
    /// Bank or card the payment went through (empty when not exported)
    pub bank: String,
    /// Absent when the row had no date, or an unparseable one
    pub transaction_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A transaction to be imported (before DB insertion)
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub category: String,
    pub source: String,
    pub description: String,
    pub amount: f64,
    pub amount_original: String,
    pub is_paid: bool,
    pub bank: String,
    pub transaction_date: Option<NaiveDate>,
}

/// Edit of a single transaction. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionPatch {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub is_paid: Option<bool>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<NaiveDate>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether applying it can change detection output (paid flag and bank cannot)
    pub fn touches_detection(&self) -> bool {
        self.category.is_some()
            || self.source.is_some()
            || self.description.is_some()
            || self.amount.is_some()
            || self.transaction_date.is_some()
    }
}

/// Coarse classification of the average gap between occurrences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
    Irregular,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Irregular => "irregular",
        }
    }

    /// Multiplier turning one occurrence into a monthly figure
    pub fn monthly_factor(&self) -> Option<f64> {
        match self {
            Self::Weekly => Some(4.33),
            Self::Biweekly => Some(2.17),
            Self::Monthly => Some(1.0),
            Self::Quarterly => Some(1.0 / 3.0),
            Self::Yearly => Some(1.0 / 12.0),
            Self::Irregular => None,
        }
    }

    /// Multiplier turning one occurrence into a yearly figure
    pub fn yearly_factor(&self) -> Option<f64> {
        match self {
            Self::Weekly => Some(52.0),
            Self::Biweekly => Some(26.0),
            Self::Monthly => Some(12.0),
            Self::Quarterly => Some(4.0),
            Self::Yearly => Some(1.0),
            Self::Irregular => None,
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            "irregular" => Ok(Self::Irregular),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which evidence a pattern's confidence was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Regularity of the gaps between dated occurrences
    Temporal,
    /// Amount consistency and occurrence count alone
    Similarity,
}

impl DetectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Similarity => "similarity",
        }
    }
}

impl std::str::FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "temporal" => Ok(Self::Temporal),
            "similarity" => Ok(Self::Similarity),
            _ => Err(format!("Unknown detection mode: {}", s)),
        }
    }
}

impl std::fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Amount statistics for a group of transactions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

/// Interval statistics, only known for temporally detected patterns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalStats {
    pub frequency: Frequency,
    /// Rounded average gap in days
    pub avg_interval_days: i64,
    /// Population standard deviation of the gaps (unrounded)
    pub interval_std_dev: f64,
    pub last_occurrence: NaiveDate,
    pub next_expected: NaiveDate,
}

/// A pattern produced by one detection run, before it is persisted
#[derive(Debug, Clone, PartialEq)]
pub struct PatternCandidate {
    pub source: String,
    pub category: String,
    pub description_pattern: Option<String>,
    pub amount: AmountStats,
    pub temporal: Option<TemporalStats>,
    pub occurrence_count: i64,
    pub confidence: f64,
    pub detection_mode: DetectionMode,
}

/// A persisted recurring spending pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringPattern {
    pub id: i64,
    pub source: String,
    pub category: String,
    pub description_pattern: Option<String>,
    pub amount: AmountStats,
    pub temporal: Option<TemporalStats>,
    pub occurrence_count: i64,
    pub confidence: f64,
    pub detection_mode: DetectionMode,
    /// None = pending review, Some(true) = confirmed, Some(false) = rejected
    pub is_confirmed: Option<bool>,
    pub user_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringPattern {
    pub fn frequency(&self) -> Option<Frequency> {
        self.temporal.map(|t| t.frequency)
    }

    /// Label to show: the user's override, else the detected description
    pub fn display_label(&self) -> &str {
        self.user_label
            .as_deref()
            .or(self.description_pattern.as_deref())
            .unwrap_or(&self.source)
    }
}

/// A pattern together with the transactions linked to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringPatternWithTransactions {
    #[serde(flatten)]
    pub pattern: RecurringPattern,
    pub transactions: Vec<Transaction>,
}

/// Projected spend across all listed patterns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecurringSummary {
    pub total_monthly: f64,
    pub total_yearly: f64,
    pub pattern_count: usize,
}

impl RecurringSummary {
    /// Sum each pattern's average amount scaled by its frequency.
    ///
    /// Patterns without a frequency bucket (similarity-only or irregular)
    /// are counted but contribute nothing to the totals.
    pub fn from_patterns(patterns: &[RecurringPattern]) -> Self {
        let mut total_monthly = 0.0;
        let mut total_yearly = 0.0;

        for pattern in patterns {
            let Some(frequency) = pattern.frequency() else {
                continue;
            };
            if let (Some(monthly), Some(yearly)) =
                (frequency.monthly_factor(), frequency.yearly_factor())
            {
                total_monthly += pattern.amount.average * monthly;
                total_yearly += pattern.amount.average * yearly;
            }
        }

        Self {
            total_monthly: round2(total_monthly),
            total_yearly: round2(total_yearly),
            pattern_count: patterns.len(),
        }
    }
}

/// Pattern listing with its aggregate summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringResponse {
    pub patterns: Vec<RecurringPattern>,
    pub summary: RecurringSummary,
}

/// Filter for listing patterns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternFilter {
    pub min_confidence: f64,
    /// Only patterns the user confirmed
    pub confirmed_only: bool,
    /// Also return patterns the user rejected
    pub include_rejected: bool,
}

impl Default for PatternFilter {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            confirmed_only: false,
            include_rejected: false,
        }
    }
}

/// A user's decision about a pattern. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternDecision {
    #[serde(default)]
    pub is_confirmed: Option<bool>,
    /// A blank label clears the current one
    #[serde(default)]
    pub user_label: Option<String>,
}

impl PatternDecision {
    pub fn is_empty(&self) -> bool {
        self.is_confirmed.is_none() && self.user_label.is_none()
    }
}

/// Round to cents (also used for confidence values)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
