use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::models::{generate_id, CategorySpending, Transaction, TransactionType};
use crate::storage::{load_document, save_document, LoadMode};

/// Balance below which the health status turns from a warning into an alert.
const ALERT_THRESHOLD: f64 = -100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Watch,
    Alert,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn load(path: &Path, mode: LoadMode) -> Result<Self> {
        load_document(path, mode)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_document(path, self)
    }

    /// Record a manually entered transaction.
    pub fn add_transaction(
        &mut self,
        amount: f64,
        description: &str,
        category: &str,
        transaction_type: TransactionType,
        date: DateTime<Utc>,
    ) -> Result<&Transaction> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(TallyError::InvalidAmount(format!(
                "{amount} (amounts must be positive)"
            )));
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(TallyError::Other("description is required".to_string()));
        }
        self.transactions.push(Transaction {
            id: generate_id(),
            amount,
            description: description.to_string(),
            category: category.trim().to_string(),
            transaction_type,
            date,
            original_description: String::new(),
            import_source: String::new(),
            confidence: 0.0,
            is_imported: false,
        });
        Ok(&self.transactions[self.transactions.len() - 1])
    }

    fn total_of(&self, transaction_type: TransactionType) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.transaction_type == transaction_type)
            .map(|t| t.amount)
            .sum()
    }

    pub fn total_income(&self) -> f64 {
        self.total_of(TransactionType::Income)
    }

    pub fn total_expenses(&self) -> f64 {
        self.total_of(TransactionType::Expense)
    }

    pub fn balance(&self) -> f64 {
        self.total_income() - self.total_expenses()
    }

    pub fn transactions_by_category(&self, category: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    /// Expense totals per category, largest first.
    pub fn spending_by_category(&self) -> Vec<CategorySpending> {
        let mut totals: HashMap<&str, CategorySpending> = HashMap::new();
        for t in self
            .transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Expense)
        {
            let entry = totals.entry(t.category.as_str()).or_insert_with(|| CategorySpending {
                category: t.category.clone(),
                amount: 0.0,
                count: 0,
            });
            entry.amount += t.amount;
            entry.count += 1;
        }
        let mut result: Vec<CategorySpending> = totals.into_values().collect();
        result.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.category.cmp(&b.category))
        });
        result
    }

    /// Newest first; transactions on the same instant keep ledger order.
    pub fn recent_transactions(&self, limit: usize) -> Vec<&Transaction> {
        let mut sorted: Vec<&Transaction> = self.transactions.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted.truncate(limit);
        sorted
    }

    /// (income, expenses) for one calendar month.
    pub fn month_totals(&self, year: i32, month: u32) -> (f64, f64) {
        self.transactions
            .iter()
            .filter(|t| t.date.year() == year && t.date.month() == month)
            .fold((0.0, 0.0), |(income, expenses), t| match t.transaction_type {
                TransactionType::Income => (income + t.amount, expenses),
                TransactionType::Expense => (income, expenses + t.amount),
            })
    }

    pub fn health_status(&self) -> HealthStatus {
        let balance = self.balance();
        if balance > 0.0 {
            HealthStatus::Healthy
        } else if balance > ALERT_THRESHOLD {
            HealthStatus::Watch
        } else {
            HealthStatus::Alert
        }
    }
}
