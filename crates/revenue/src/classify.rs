//! Keyword-priority tagging of customer names (region, industry, ...).
//!
//! A [`RuleSet`] is data: an ordered list of tiers, each an ordered list of
//! keyword rules, plus a default tag. It is loaded from TOML so rule updates
//! ship without code changes. The built-in region set lives in
//! `rules/regions.toml`.
//!
//! Evaluation is strict priority order: tier, then rule, then keyword. The
//! first case-insensitive substring hit wins even when a later tier would
//! also match.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::error::{RevenueError, RevenueResult};
use crate::model::{ClassificationResult, DEFAULT_RULE_ID};

const BUILTIN_REGIONS: &str = include_str!("../rules/regions.toml");

// ---------------------------------------------------------------------------
// Rule set (data)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RuleSet {
    pub version: String,
    pub default_tag: String,
    #[serde(default)]
    pub tiers: Vec<RuleTier>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleTier {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<KeywordRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule {
    pub id: String,
    pub tag: String,
    pub keywords: Vec<String>,
    /// Business units this rule is limited to. Empty = all units.
    #[serde(default)]
    pub units: Vec<String>,
}

impl RuleSet {
    pub fn from_toml(input: &str) -> RevenueResult<Self> {
        let rules: RuleSet =
            toml::from_str(input).map_err(|e| RevenueError::RuleSet(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> RevenueResult<()> {
        if self.version.trim().is_empty() {
            return Err(RevenueError::RuleSet("version must not be empty".into()));
        }
        if self.default_tag.trim().is_empty() {
            return Err(RevenueError::RuleSet("default_tag must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for tier in &self.tiers {
            for rule in &tier.rules {
                if !seen.insert(rule.id.as_str()) {
                    return Err(RevenueError::RuleSet(format!("duplicate rule id '{}'", rule.id)));
                }
                if rule.id == DEFAULT_RULE_ID {
                    return Err(RevenueError::RuleSet(format!(
                        "rule id '{DEFAULT_RULE_ID}' is reserved"
                    )));
                }
                if rule.tag.trim().is_empty() {
                    return Err(RevenueError::RuleSet(format!("rule '{}': empty tag", rule.id)));
                }
                if rule.keywords.is_empty() || rule.keywords.iter().any(|k| k.trim().is_empty()) {
                    return Err(RevenueError::RuleSet(format!(
                        "rule '{}': keywords must be non-empty",
                        rule.id
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn rule_count(&self) -> usize {
        self.tiers.iter().map(|t| t.rules.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// A validated rule set with keywords pre-lowered for matching.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
    lowered: Vec<Vec<Vec<String>>>,
}

impl Classifier {
    pub fn new(rules: RuleSet) -> RevenueResult<Self> {
        rules.validate()?;
        let lowered = rules
            .tiers
            .iter()
            .map(|tier| {
                tier.rules
                    .iter()
                    .map(|rule| rule.keywords.iter().map(|k| k.to_lowercase()).collect())
                    .collect()
            })
            .collect();
        Ok(Self { rules, lowered })
    }

    pub fn from_toml(input: &str) -> RevenueResult<Self> {
        Self::new(RuleSet::from_toml(input)?)
    }

    /// The embedded APAC / EMEA / Americas rule set.
    pub fn builtin() -> RevenueResult<Self> {
        Self::from_toml(BUILTIN_REGIONS)
    }

    pub fn version(&self) -> &str {
        &self.rules.version
    }

    pub fn default_tag(&self) -> &str {
        &self.rules.default_tag
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Tag one customer name. `unit_hint` enables unit-scoped rules.
    pub fn classify(&self, name: &str, unit_hint: Option<&str>) -> ClassificationResult {
        let haystack = name.to_lowercase();

        for (tier, tier_keywords) in self.rules.tiers.iter().zip(&self.lowered) {
            for (rule, keywords) in tier.rules.iter().zip(tier_keywords) {
                if !rule_applies(rule, unit_hint) {
                    continue;
                }
                if let Some(hit) = keywords.iter().position(|k| haystack.contains(k.as_str())) {
                    return ClassificationResult {
                        identity: name.to_string(),
                        tag: rule.tag.clone(),
                        rule_id: rule.id.clone(),
                        tier: Some(tier.name.clone()),
                        keyword: Some(rule.keywords[hit].clone()),
                    };
                }
            }
        }

        ClassificationResult {
            identity: name.to_string(),
            tag: self.rules.default_tag.clone(),
            rule_id: DEFAULT_RULE_ID.to_string(),
            tier: None,
            keyword: None,
        }
    }

    pub fn classify_all<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        unit_hint: Option<&str>,
    ) -> Vec<ClassificationResult> {
        names
            .into_iter()
            .map(|name| self.classify(name, unit_hint))
            .collect()
    }
}

fn rule_applies(rule: &KeywordRule, unit_hint: Option<&str>) -> bool {
    if rule.units.is_empty() {
        return true;
    }
    match unit_hint {
        Some(unit) => rule.units.iter().any(|u| u.eq_ignore_ascii_case(unit)),
        None => false,
    }
}

/// Count classifications per tag.
pub fn tag_counts(results: &[ClassificationResult]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for r in results {
        *counts.entry(r.tag.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> Classifier {
        Classifier::builtin().unwrap()
    }

    #[test]
    fn builtin_rules_load() {
        let c = builtin();
        assert_eq!(c.default_tag(), "Americas");
        assert_eq!(c.rules().tiers.len(), 3);
        assert!(c.rules().rule_count() > 5);
        assert!(c.version().starts_with("regions-"));
    }

    #[test]
    fn override_beats_generic() {
        // "corp" and "ltd" are generic Americas tokens; the named account wins.
        let r = builtin().classify("Telstra Corporation Ltd", None);
        assert_eq!(r.tag, "APAC");
        assert_eq!(r.rule_id, "apac.priority");
        assert_eq!(r.tier.as_deref(), Some("priority_accounts"));
        assert_eq!(r.keyword.as_deref(), Some("telstra"));
    }

    #[test]
    fn case_insensitive_match() {
        let r = builtin().classify("DEUTSCHE TELEKOM AG", None);
        assert_eq!(r.tag, "EMEA");
        assert_eq!(r.rule_id, "emea.keywords");
        assert_eq!(r.keyword.as_deref(), Some("ag"));
    }

    #[test]
    fn builtin_order_resolves_overlapping_keywords() {
        // Short EMEA tokens outrank general APAC and Americas keywords; only
        // the priority tier beats them.
        let c = builtin();
        let cases = [
            ("Samsung Asia Pte", "EMEA", "emea.keywords"),
            ("Verizon Australia Pty Ltd", "APAC", "apac.priority"),
            ("Sasken USA", "EMEA", "emea.keywords"),
            ("Comcast India", "APAC", "apac.priority"),
            ("Kyivstar Ukraine Korea", "EMEA", "emea.keywords"),
        ];
        for (name, tag, rule_id) in cases {
            let r = c.classify(name, None);
            assert_eq!((r.tag.as_str(), r.rule_id.as_str()), (tag, rule_id), "{name}");
        }
    }

    #[test]
    fn generic_tier_applies_last() {
        let r = builtin().classify("Initech LLC", None);
        assert_eq!(r.tag, "Americas");
        assert_eq!(r.rule_id, "americas.general");
    }

    #[test]
    fn unmatched_falls_back_to_default() {
        let r = builtin().classify("Zenith Holdings", None);
        assert_eq!(r.tag, "Americas");
        assert_eq!(r.rule_id, DEFAULT_RULE_ID);
        assert!(r.is_default());
        assert!(r.keyword.is_none());
    }

    #[test]
    fn unit_scoped_rule() {
        let toml = r#"
version = "test-1"
default_tag = "Other"

[[tiers]]
name = "overrides"

[[tiers.rules]]
id = "kandy.telco"
tag = "Telecom"
keywords = ["wireless"]
units = ["Kandy"]

[[tiers]]
name = "generic"

[[tiers.rules]]
id = "generic.wireless"
tag = "Consumer"
keywords = ["wireless"]
"#;
        let c = Classifier::from_toml(toml).unwrap();
        assert_eq!(c.classify("Acme Wireless", Some("kandy")).tag, "Telecom");
        assert_eq!(c.classify("Acme Wireless", Some("STL")).tag, "Consumer");
        assert_eq!(c.classify("Acme Wireless", None).tag, "Consumer");
        assert_eq!(c.classify("Acme Hardware", None).tag, "Other");
    }

    #[test]
    fn reject_duplicate_rule_ids() {
        let toml = r#"
version = "v"
default_tag = "X"
[[tiers]]
name = "a"
[[tiers.rules]]
id = "dup"
tag = "A"
keywords = ["a"]
[[tiers]]
name = "b"
[[tiers.rules]]
id = "dup"
tag = "B"
keywords = ["b"]
"#;
        let err = RuleSet::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate rule id 'dup'"));
    }

    #[test]
    fn reject_blank_keyword() {
        let toml = r#"
version = "v"
default_tag = "X"
[[tiers]]
name = "a"
[[tiers.rules]]
id = "r"
tag = "A"
keywords = ["  "]
"#;
        assert!(RuleSet::from_toml(toml).is_err());
    }

    #[test]
    fn reject_missing_default_tag() {
        let err = RuleSet::from_toml("version = \"v\"\ndefault_tag = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("default_tag"));
    }

    #[test]
    fn counts_by_tag() {
        let c = builtin();
        let results = c.classify_all(["Telstra", "Verizon", "Vodafone UK", "Comcast"], None);
        let counts = tag_counts(&results);
        assert_eq!(counts["Americas"], 2);
        assert_eq!(counts["APAC"], 1);
        assert_eq!(counts["EMEA"], 1);
    }
}
