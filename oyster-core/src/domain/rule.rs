//! Categorization rule domain entities
//!
//! A [`Rule`] assigns a category to transactions it matches. Rules nest via
//! `and`/`or` lists. A [`RuleSet`] holds a user's rules keyed by name and
//! applies them to transactions.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::result::{Error, Result};
use super::transaction::{Category, Transaction};

/// Description pattern, serialized as its regex source
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|e| Error::validation(format!("not a valid regex: {pattern}: {e}")))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source)
            .map(Pattern)
            .map_err(|e| serde::de::Error::custom(format!("not a valid regex: {source}: {e}")))
    }
}

/// Exclusive date bounds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub after: Option<NaiveDate>,
    #[serde(default)]
    pub before: Option<NaiveDate>,
}

impl DateRange {
    fn contains(&self, date: NaiveDate) -> bool {
        self.before.map_or(true, |before| date < before)
            && self.after.map_or(true, |after| date > after)
    }
}

/// Inclusive amount bounds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    #[serde(default)]
    pub min: Option<Decimal>,
    #[serde(default)]
    pub max: Option<Decimal>,
}

impl AmountRange {
    fn is_set(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    fn contains(&self, amount: Decimal) -> bool {
        self.min.map_or(true, |min| amount >= min) && self.max.map_or(true, |max| amount <= max)
    }
}

/// A rule that a transaction is evaluated against to pick its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Pattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_between: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_between: Option<AmountRange>,
}

impl Rule {
    /// Create a rule with no criteria (matches everything until narrowed)
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            and: Vec::new(),
            or: Vec::new(),
            description: None,
            date_between: None,
            amount_between: None,
        }
    }

    pub fn with_description(mut self, pattern: &str) -> Result<Self> {
        self.description = Some(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn with_dates(mut self, after: Option<NaiveDate>, before: Option<NaiveDate>) -> Self {
        self.date_between = Some(DateRange { after, before });
        self
    }

    pub fn with_amounts(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.amount_between = Some(AmountRange { min, max });
        self
    }

    /// Check whether the transaction matches this rule
    ///
    /// Direct criteria and `and` rules must all hold. When the rule has `or`
    /// rules and no direct criteria, it matches iff any `or` rule matches;
    /// otherwise an `or` match is an alternative to the rest.
    pub fn evaluate(&self, tx: &Transaction) -> bool {
        let mut local = true;
        let mut set = false;

        if let Some(pattern) = &self.description {
            if !tx.description.is_empty() {
                set = true;
                local = local && pattern.is_match(&tx.description);
            }
        }
        if let Some(range) = &self.date_between {
            set = true;
            local = local && range.contains(tx.date);
        }
        if let Some(range) = &self.amount_between {
            set = set || range.is_set();
            local = local && range.contains(tx.amount);
        }
        // `and` rules narrow the match but do not count as criteria for `or`
        if !self.and.is_empty() {
            local = local && self.and.iter().all(|r| r.evaluate(tx));
        }
        if !self.or.is_empty() {
            let any = self.or.iter().any(|r| r.evaluate(tx));
            local = if set { local || any } else { any };
        }
        local
    }
}

/// A user's rules, keyed by rule name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: BTreeMap<String, Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set; the first rule wins when names repeat
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut set = Self::new();
        for rule in rules {
            set.add(rule);
        }
        set
    }

    /// All rules, ordered by name
    pub fn rules(&self) -> Vec<Rule> {
        self.rules.values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add a rule, returning false if one with the same name exists
    pub fn add(&mut self, rule: Rule) -> bool {
        if self.rules.contains_key(&rule.name) {
            return false;
        }
        self.rules.insert(rule.name.clone(), rule);
        true
    }

    /// Add a rule, replacing any rule with the same name
    pub fn upsert(&mut self, rule: Rule) {
        self.rules.insert(rule.name.clone(), rule);
    }

    /// Delete a rule by name, returning true if anything was removed
    pub fn delete(&mut self, name: &str) -> bool {
        self.rules.remove(name).is_some()
    }

    /// Apply the rule set to one transaction
    ///
    /// Returns true if the transaction was modified. Matching more than one
    /// rule is an error; an already categorized transaction is left alone.
    pub fn evaluate(&self, tx: &mut Transaction) -> Result<bool> {
        let matched: Vec<&Rule> = self.rules.values().filter(|r| r.evaluate(tx)).collect();
        match matched.as_slice() {
            [] => Ok(false),
            [rule] => {
                if tx.is_categorized() {
                    return Ok(false);
                }
                tx.categories.push(Category {
                    name: rule.category.clone(),
                    amount: tx.amount,
                });
                Ok(true)
            }
            many => {
                let names: Vec<&str> = many.iter().map(|r| r.name.as_str()).collect();
                Err(Error::validation(format!(
                    "transaction {} matched multiple rules: {}",
                    tx.id,
                    names.join(", ")
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(desc: &str, cents: i64, on: NaiveDate) -> Transaction {
        Transaction::new(desc, Decimal::new(cents, 2), on)
    }

    #[test]
    fn test_description_rule() {
        let rule = Rule::new("groceries", "Food").with_description("(?i)safeway").unwrap();
        assert!(rule.evaluate(&tx("SAFEWAY #123", -2000, date(2024, 5, 1))));
        assert!(!rule.evaluate(&tx("SHELL OIL", -2000, date(2024, 5, 1))));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(Rule::new("bad", "X").with_description("(unclosed").is_err());
        let json = r#"{"name":"bad","category":"X","description":"(unclosed"}"#;
        assert!(serde_json::from_str::<Rule>(json).is_err());
    }

    #[test]
    fn test_date_bounds_are_exclusive() {
        let rule = Rule::new("may", "Spring").with_dates(Some(date(2024, 5, 1)), Some(date(2024, 5, 31)));
        assert!(!rule.evaluate(&tx("x", 100, date(2024, 5, 1))));
        assert!(rule.evaluate(&tx("x", 100, date(2024, 5, 2))));
        assert!(!rule.evaluate(&tx("x", 100, date(2024, 5, 31))));
    }

    #[test]
    fn test_amount_bounds_are_inclusive() {
        let rule = Rule::new("small", "Misc")
            .with_amounts(Some(Decimal::new(-1000, 2)), Some(Decimal::ZERO));
        assert!(rule.evaluate(&tx("x", -1000, date(2024, 1, 1))));
        assert!(rule.evaluate(&tx("x", 0, date(2024, 1, 1))));
        assert!(!rule.evaluate(&tx("x", -1001, date(2024, 1, 1))));
    }

    #[test]
    fn test_or_only_rule() {
        let mut rule = Rule::new("fuel", "Car");
        rule.or = vec![
            Rule::new("shell", "Car").with_description("SHELL").unwrap(),
            Rule::new("chevron", "Car").with_description("CHEVRON").unwrap(),
        ];
        assert!(rule.evaluate(&tx("SHELL 42", -3000, date(2024, 1, 1))));
        assert!(rule.evaluate(&tx("CHEVRON 7", -3000, date(2024, 1, 1))));
        assert!(!rule.evaluate(&tx("ARCO", -3000, date(2024, 1, 1))));
    }

    #[test]
    fn test_and_rule() {
        let mut rule = Rule::new("big-shell", "Car");
        rule.and = vec![
            Rule::new("shell", "Car").with_description("SHELL").unwrap(),
            Rule::new("big", "Car").with_amounts(None, Some(Decimal::new(-5000, 2))),
        ];
        assert!(rule.evaluate(&tx("SHELL", -6000, date(2024, 1, 1))));
        assert!(!rule.evaluate(&tx("SHELL", -100, date(2024, 1, 1))));
    }

    #[test]
    fn test_and_with_or_follows_or_alone() {
        let mut rule = Rule::new("either", "Misc");
        rule.and = vec![Rule::new("positive", "Misc").with_amounts(Some(Decimal::new(100, 2)), None)];
        rule.or = vec![Rule::new("large", "Misc").with_amounts(Some(Decimal::new(10000, 2)), None)];

        // `and` holds but `or` does not
        assert!(!rule.evaluate(&tx("x", 500, date(2024, 1, 1))));
        assert!(rule.evaluate(&tx("x", 20000, date(2024, 1, 1))));
    }

    #[test]
    fn test_direct_criteria_with_or_is_alternative() {
        let mut rule = Rule::new("fuel", "Car").with_description("SHELL").unwrap();
        rule.or = vec![Rule::new("arco", "Car").with_description("ARCO").unwrap()];
        assert!(rule.evaluate(&tx("SHELL", -100, date(2024, 1, 1))));
        assert!(rule.evaluate(&tx("ARCO", -100, date(2024, 1, 1))));
        assert!(!rule.evaluate(&tx("CHEVRON", -100, date(2024, 1, 1))));
    }

    #[test]
    fn test_rule_json_shape() {
        let rule = Rule::new("rent", "Housing")
            .with_description("LANDLORD")
            .unwrap()
            .with_amounts(Some(Decimal::new(-200000, 2)), None);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["description"], "LANDLORD");
        assert!(json.get("amountBetween").is_some());
        assert!(json.get("and").is_none());

        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_rule_set_add_upsert_delete() {
        let mut set = RuleSet::new();
        assert!(set.add(Rule::new("a", "One")));
        assert!(!set.add(Rule::new("a", "Two")));
        assert_eq!(set.get("a").unwrap().category, "One");

        set.upsert(Rule::new("a", "Two"));
        assert_eq!(set.get("a").unwrap().category, "Two");

        assert!(set.delete("a"));
        assert!(!set.delete("a"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_rule_set_evaluate() {
        let set = RuleSet::from_rules(vec![
            Rule::new("coffee", "Food").with_description("COFFEE").unwrap(),
            Rule::new("rent", "Housing").with_description("RENT").unwrap(),
        ]);

        let mut t = tx("BLUE COFFEE", -450, date(2024, 1, 1));
        assert!(set.evaluate(&mut t).unwrap());
        assert_eq!(t.categories, vec![Category { name: "Food".into(), amount: t.amount }]);

        // Already categorized transactions are left alone
        assert!(!set.evaluate(&mut t).unwrap());

        let mut unmatched = tx("GROCER", -100, date(2024, 1, 1));
        assert!(!set.evaluate(&mut unmatched).unwrap());
    }

    #[test]
    fn test_rule_set_multiple_matches_is_error() {
        let set = RuleSet::from_rules(vec![
            Rule::new("a", "One").with_description("SHOP").unwrap(),
            Rule::new("b", "Two").with_description("SHOP").unwrap(),
        ]);
        let mut t = tx("SHOP", -100, date(2024, 1, 1));
        let err = set.evaluate(&mut t).unwrap_err();
        assert!(err.to_string().contains("matched multiple rules: a, b"));
        assert!(!t.is_categorized());
    }
}
