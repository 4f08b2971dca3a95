use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::models::{CategorizationRule, TransactionType};
use crate::storage::{load_document, save_document, LoadMode};

/// On-disk shape of the user rules file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RulesDocument {
    #[serde(default)]
    rules: Vec<CategorizationRule>,
}

/// User rules merged with the built-in defaults, highest priority first.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
    rules: Vec<CategorizationRule>,
}

impl RuleStore {
    pub fn load(path: &Path, mode: LoadMode) -> Result<Self> {
        let doc: RulesDocument = load_document(path, mode)?;
        Ok(Self::from_user_rules(path, doc.rules))
    }

    /// User rules come first so they win priority ties against defaults.
    pub fn from_user_rules(path: &Path, user_rules: Vec<CategorizationRule>) -> Self {
        let mut rules = user_rules;
        rules.extend(default_rules());
        sort_by_priority(&mut rules);
        Self {
            path: path.to_path_buf(),
            rules,
        }
    }

    pub fn rules(&self) -> &[CategorizationRule] {
        &self.rules
    }

    /// Rules that are not part of the default table.
    pub fn custom_rules(&self) -> Vec<CategorizationRule> {
        let defaults = default_rules();
        self.rules
            .iter()
            .filter(|r| !is_default(r, &defaults))
            .cloned()
            .collect()
    }

    pub fn add_custom_rule(&mut self, rule: CategorizationRule) -> Result<()> {
        validate_rule(&rule)?;
        self.rules.push(rule);
        sort_by_priority(&mut self.rules);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let doc = RulesDocument {
            rules: self.custom_rules(),
        };
        save_document(&self.path, &doc)
    }
}

/// Stable: equal priorities keep their load order.
fn sort_by_priority(rules: &mut [CategorizationRule]) {
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
}

fn is_default(rule: &CategorizationRule, defaults: &[CategorizationRule]) -> bool {
    defaults
        .iter()
        .any(|d| d.pattern == rule.pattern && d.category == rule.category)
}

fn validate_rule(rule: &CategorizationRule) -> Result<()> {
    if rule.category.trim().is_empty() {
        return Err(TallyError::InvalidRule("category is required".to_string()));
    }
    if rule.pattern.is_empty() && rule.keywords.iter().all(|k| k.trim().is_empty()) {
        return Err(TallyError::InvalidRule(
            "a pattern or at least one keyword is required".to_string(),
        ));
    }
    if !rule.pattern.is_empty() {
        Regex::new(&rule.pattern.to_lowercase())
            .map_err(|e| TallyError::InvalidRule(format!("bad pattern '{}': {e}", rule.pattern)))?;
    }
    if let (Some(min), Some(max)) = (rule.min_amount, rule.max_amount) {
        if min > 0.0 && max > 0.0 && min > max {
            return Err(TallyError::InvalidRule(format!(
                "min amount {min} exceeds max amount {max}"
            )));
        }
    }
    Ok(())
}

/// Built-in rules. Named merchants carry the highest priority, generic
/// words like "payment" or "transfer" the lowest.
pub fn default_rules() -> Vec<CategorizationRule> {
    use TransactionType::Income;

    vec![
        // Named merchants
        CategorizationRule::new("Entertainment", 100)
            .with_pattern(".*Netflix.*")
            .with_keywords(&["netflix"]),
        CategorizationRule::new("Entertainment", 100)
            .with_pattern(".*Spotify.*")
            .with_keywords(&["spotify"]),
        CategorizationRule::new("Shopping", 95)
            .with_pattern(".*Amazon.*")
            .with_keywords(&["amazon"]),
        CategorizationRule::new("Shopping", 95)
            .with_pattern(".*Walmart.*")
            .with_keywords(&["walmart"]),
        CategorizationRule::new("Shopping", 95)
            .with_pattern(".*Target.*")
            .with_keywords(&["target"]),
        // Food & dining
        CategorizationRule::new("Food & Dining", 90)
            .with_pattern(".*McDonald.*")
            .with_keywords(&["mcdonald"]),
        CategorizationRule::new("Food & Dining", 90)
            .with_pattern(".*Starbucks.*")
            .with_keywords(&["starbucks"]),
        CategorizationRule::new("Food & Dining", 80)
            .with_pattern(".*Restaurant|Dining|Cafe.*")
            .with_keywords(&["restaurant", "dining", "cafe", "bistro"]),
        CategorizationRule::new("Groceries", 85)
            .with_pattern(".*Grocery|Supermarket.*")
            .with_keywords(&["grocery", "supermarket", "kroger", "safeway", "whole foods"]),
        // Housing & utilities
        CategorizationRule::new("Housing", 100)
            .with_pattern(".*Rent|Mortgage.*")
            .with_keywords(&["rent", "mortgage"])
            .with_min_amount(500.0),
        CategorizationRule::new("Utilities", 90)
            .with_pattern(".*Electric|Gas|Water|Utility.*")
            .with_keywords(&["electric", "gas", "water", "utility", "power"]),
        CategorizationRule::new("Utilities", 85)
            .with_pattern(".*Internet|Cable|Phone.*")
            .with_keywords(&["internet", "cable", "phone", "verizon", "comcast", "at&t"]),
        // Transportation
        CategorizationRule::new("Transportation", 90)
            .with_pattern(".*Gas Station|Shell|Exxon|Chevron.*")
            .with_keywords(&["gas station", "shell", "exxon", "chevron", "bp"]),
        CategorizationRule::new("Transportation", 90)
            .with_pattern(".*Uber|Lyft|Taxi.*")
            .with_keywords(&["uber", "lyft", "taxi", "rideshare"]),
        CategorizationRule::new("Transportation", 85)
            .with_pattern(".*Parking|Toll.*")
            .with_keywords(&["parking", "toll"]),
        // Healthcare
        CategorizationRule::new("Healthcare", 90)
            .with_pattern(".*CVS|Walgreens|Pharmacy.*")
            .with_keywords(&["cvs", "walgreens", "pharmacy"]),
        CategorizationRule::new("Healthcare", 85)
            .with_pattern(".*Hospital|Doctor|Medical.*")
            .with_keywords(&["hospital", "doctor", "medical", "clinic"]),
        // Financial
        CategorizationRule::new("Cash & ATM", 90)
            .with_pattern(".*ATM.*")
            .with_keywords(&["atm"]),
        CategorizationRule::new("Bank Fees", 85)
            .with_pattern(".*Bank Fee|Interest Charge.*")
            .with_keywords(&["bank fee", "interest charge", "overdraft", "maintenance"]),
        // Income
        CategorizationRule::new("Salary", 100)
            .with_pattern(".*Salary|Payroll|Paycheck.*")
            .with_keywords(&["salary", "payroll", "paycheck"])
            .for_type(Income),
        CategorizationRule::new("Deposits", 80)
            .with_pattern(".*Deposit.*")
            .with_keywords(&["deposit"])
            .for_type(Income),
        // Generic
        CategorizationRule::new("Transfers", 60)
            .with_pattern(".*Transfer.*")
            .with_keywords(&["transfer", "xfer"]),
        CategorizationRule::new("Bills & Payments", 70)
            .with_pattern(".*Payment.*")
            .with_keywords(&["payment"]),
    ]
}
