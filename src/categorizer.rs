use std::collections::BTreeSet;

use regex::Regex;

use crate::error::Result;
use crate::models::{CategorizationRule, TransactionType};
use crate::rules::RuleStore;

pub const UNCATEGORIZED: &str = "Uncategorized";

const PATTERN_CONFIDENCE: f64 = 0.9;
const KEYWORD_CONFIDENCE: f64 = 0.8;
const AMAZON_BOOST: f64 = 0.1;

/// How a rule matched a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Pattern,
    Keyword,
}

/// The winning rule for a description, kept so callers can show why a
/// transaction landed in its category.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch<'a> {
    pub rule: &'a CategorizationRule,
    pub kind: MatchKind,
    pub confidence: f64,
}

struct CompiledRule {
    regex: Option<Regex>,
    keywords: Vec<String>,
}

impl CompiledRule {
    fn compile(rule: &CategorizationRule) -> Self {
        let regex = if rule.pattern.is_empty() {
            None
        } else {
            match Regex::new(&rule.pattern.to_lowercase()) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("rule pattern '{}' does not compile: {e}", rule.pattern);
                    None
                }
            }
        };
        Self {
            regex,
            keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, normalized: &str) -> Option<MatchKind> {
        if self.regex.as_ref().is_some_and(|re| re.is_match(normalized)) {
            return Some(MatchKind::Pattern);
        }
        if self.keywords.iter().any(|k| normalized.contains(k.as_str())) {
            return Some(MatchKind::Keyword);
        }
        None
    }
}

pub struct Categorizer {
    store: RuleStore,
    compiled: Vec<CompiledRule>,
}

impl Categorizer {
    pub fn new(store: RuleStore) -> Self {
        let compiled = store.rules().iter().map(CompiledRule::compile).collect();
        Self { store, compiled }
    }

    pub fn rules(&self) -> &[CategorizationRule] {
        self.store.rules()
    }

    /// Add and persist a user rule; it takes part in every later lookup.
    pub fn add_custom_rule(&mut self, rule: CategorizationRule) -> Result<()> {
        self.store.add_custom_rule(rule)?;
        self.compiled = self.store.rules().iter().map(CompiledRule::compile).collect();
        Ok(())
    }

    /// Best category for a transaction and a confidence in `[0, 1]`.
    pub fn categorize(
        &self,
        description: &str,
        amount: f64,
        transaction_type: TransactionType,
    ) -> (String, f64) {
        match self.explain(description, amount, transaction_type) {
            Some(m) => (m.rule.category.clone(), m.confidence),
            None => (UNCATEGORIZED.to_string(), 0.0),
        }
    }

    /// Every active rule is scored; the highest confidence wins and ties go
    /// to the earlier (higher priority) rule.
    pub fn explain(
        &self,
        description: &str,
        amount: f64,
        transaction_type: TransactionType,
    ) -> Option<RuleMatch<'_>> {
        let normalized = description.trim().to_lowercase();
        let mut best: Option<RuleMatch<'_>> = None;

        for (rule, compiled) in self.store.rules().iter().zip(&self.compiled) {
            if !rule.is_active
                || !rule.accepts_type(transaction_type)
                || !rule.accepts_amount(amount)
            {
                continue;
            }
            let Some(kind) = compiled.matches(&normalized) else {
                continue;
            };

            let base = match kind {
                MatchKind::Pattern => PATTERN_CONFIDENCE,
                MatchKind::Keyword => KEYWORD_CONFIDENCE,
            };
            let mut confidence = base * (rule.priority as f64 / 100.0);
            if normalized.contains("amazon") && rule.category == "Shopping" {
                confidence = (confidence + AMAZON_BOOST).min(1.0);
            }
            let confidence = confidence.clamp(0.0, 1.0);

            if confidence > best.as_ref().map_or(0.0, |b| b.confidence) {
                best = Some(RuleMatch {
                    rule,
                    kind,
                    confidence,
                });
            }
        }

        best
    }

    /// "Uncategorized" plus every category any loaded rule can assign.
    pub fn all_categories(&self) -> BTreeSet<String> {
        let mut categories: BTreeSet<String> = self
            .store
            .rules()
            .iter()
            .map(|r| r.category.clone())
            .collect();
        categories.insert(UNCATEGORIZED.to_string());
        categories
    }
}
