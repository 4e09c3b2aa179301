use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};

use crate::definitions::Categories;
use crate::error::{Result, SpendError};
use crate::models::{AliasTotal, CategoryReport, MonthCategories, MonthKey, Transaction, UNKNOWN_ALIAS};

/// Case-insensitive alternation of the escaped keywords. `None` when there is
/// nothing to match, so an empty list never matches every row.
pub fn keyword_pattern<S: AsRef<str>>(keywords: &[S]) -> Result<Option<Regex>> {
    let alternation = keywords
        .iter()
        .map(AsRef::as_ref)
        .filter(|k| !k.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return Ok(None);
    }
    Ok(Some(
        RegexBuilder::new(&alternation).case_insensitive(true).build()?,
    ))
}

/// Compiled matchers for every alias except `Unknown`.
pub struct Classifier {
    rules: Vec<(String, Option<Regex>)>,
    any: Option<Regex>,
}

impl Classifier {
    pub fn new(categories: &Categories) -> Result<Self> {
        let mut rules = Vec::new();
        let mut all_keywords: Vec<&str> = Vec::new();
        for (alias, keywords) in categories.rules() {
            rules.push((alias.to_string(), keyword_pattern(keywords)?));
            all_keywords.extend(keywords.iter().map(String::as_str));
        }
        Ok(Self {
            rules,
            any: keyword_pattern(&all_keywords)?,
        })
    }

    pub fn matches(&self, alias: &str, description: &str) -> bool {
        self.rules
            .iter()
            .find(|(a, _)| a == alias)
            .and_then(|(_, re)| re.as_ref())
            .is_some_and(|re| re.is_match(description))
    }

    /// True when no alias claims the description.
    pub fn is_unknown(&self, description: &str) -> bool {
        !self.any.as_ref().is_some_and(|re| re.is_match(description))
    }

    fn month_totals<'t>(&self, expenses: &[&'t Transaction]) -> (Vec<AliasTotal>, Vec<&'t str>) {
        let mut totals: Vec<AliasTotal> = self
            .rules
            .iter()
            .map(|(alias, re)| {
                let total = match re {
                    Some(re) => abs_sum(
                        expenses
                            .iter()
                            .copied()
                            .filter(|t| re.is_match(&t.description)),
                    ),
                    None => 0.0,
                };
                AliasTotal {
                    alias: alias.clone(),
                    total,
                }
            })
            .collect();

        let unknown: Vec<&'t Transaction> = expenses
            .iter()
            .copied()
            .filter(|t| self.is_unknown(&t.description))
            .collect();
        totals.push(AliasTotal {
            alias: UNKNOWN_ALIAS.to_string(),
            total: abs_sum(unknown.iter().copied()),
        });
        let descriptions = unknown.iter().map(|t| t.description.as_str()).collect();
        (totals, descriptions)
    }
}

fn abs_sum<'a>(rows: impl Iterator<Item = &'a Transaction>) -> f64 {
    rows.map(|t| t.amount).sum::<f64>().abs()
}

/// Outcome of one classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub report: CategoryReport,
    /// Descriptions of expense rows no alias matched, first-seen order,
    /// without repeats.
    pub uncategorized: Vec<String>,
}

fn group_by_month(rows: &[Transaction]) -> BTreeMap<MonthKey, Vec<&Transaction>> {
    let mut months: BTreeMap<MonthKey, Vec<&Transaction>> = BTreeMap::new();
    for row in rows {
        months.entry(row.month()).or_default().push(row);
    }
    months
}

/// Sum expense magnitudes per alias per month. Aliases are matched
/// independently, so one row can count towards several of them; `Unknown`
/// gets exactly the rows matching none.
pub fn classify(rows: &[Transaction], categories: &Categories) -> Result<Classification> {
    let classifier = Classifier::new(categories)?;
    let mut report = CategoryReport::default();
    let mut uncategorized: Vec<String> = Vec::new();

    for (month, month_rows) in group_by_month(rows) {
        let expenses: Vec<&Transaction> = month_rows.into_iter().filter(|t| t.is_expense()).collect();
        let (totals, unknown) = classifier.month_totals(&expenses);
        for desc in unknown {
            if !uncategorized.iter().any(|u| u == desc) {
                uncategorized.push(desc.to_string());
            }
        }
        report.months.push(MonthCategories { month, totals });
    }

    Ok(Classification {
        report,
        uncategorized,
    })
}

/// Expense rows of `month` that make up `alias`'s total, in import order.
pub fn categorized_rows<'a>(
    rows: &'a [Transaction],
    categories: &Categories,
    month: MonthKey,
    alias: &str,
) -> Result<Vec<&'a Transaction>> {
    if alias != UNKNOWN_ALIAS && !categories.contains(alias) {
        return Err(SpendError::UnknownAlias(alias.to_string()));
    }
    let classifier = Classifier::new(categories)?;
    Ok(rows
        .iter()
        .filter(|t| t.is_expense() && month.contains(t.date))
        .filter(|t| {
            if alias == UNKNOWN_ALIAS {
                classifier.is_unknown(&t.description)
            } else {
                classifier.matches(alias, &t.description)
            }
        })
        .collect())
}
