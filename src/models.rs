use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_zero(val: &f64) -> bool {
    *val == 0.0
}

fn is_false(val: &bool) -> bool {
    !*val
}

fn default_true() -> bool {
    true
}

/// Rule files written by hand sometimes carry `"transaction_type": ""`,
/// which means "applies to both".
fn type_or_empty<'de, D>(deserializer: D) -> std::result::Result<Option<TransactionType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => TransactionType::parse(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown transaction type: {s}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub original_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub import_source: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_imported: bool,
}

impl Transaction {
    /// Amount with the sign implied by the transaction type.
    pub fn signed_amount(&self) -> f64 {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pattern: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(
        default,
        deserialize_with = "type_or_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_type: Option<TransactionType>,
}

impl CategorizationRule {
    pub fn new(category: &str, priority: i64) -> Self {
        Self {
            pattern: String::new(),
            category: category.to_string(),
            min_amount: None,
            max_amount: None,
            keywords: Vec::new(),
            priority,
            is_active: true,
            transaction_type: None,
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_min_amount(mut self, min: f64) -> Self {
        self.min_amount = Some(min);
        self
    }

    pub fn with_max_amount(mut self, max: f64) -> Self {
        self.max_amount = Some(max);
        self
    }

    pub fn for_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// A bound of exactly 0 counts as unset.
    pub fn accepts_amount(&self, amount: f64) -> bool {
        if let Some(min) = self.min_amount.filter(|m| *m != 0.0) {
            if amount < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount.filter(|m| *m != 0.0) {
            if amount > max {
                return false;
            }
        }
        true
    }

    pub fn accepts_type(&self, transaction_type: TransactionType) -> bool {
        self.transaction_type.map_or(true, |t| t == transaction_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewTransaction {
    pub amount: f64,
    pub description: String,
    pub date: String,
    pub category: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Reviewing,
    Imported,
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewing => "reviewing",
            Self::Imported => "imported",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: String,
    pub file_name: String,
    pub source: String,
    pub status: ImportStatus,
    pub total_count: usize,
    pub imported: usize,
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<PreviewTransaction>,
    pub timestamp: String,
}

/// Expense total and transaction count for a single category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySpending {
    pub category: String,
    pub amount: f64,
    pub count: usize,
}

/// Random opaque identifier: 8 bytes, hex encoded. Not checked for collisions.
pub fn generate_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes)
}
