//! Summary metrics over cleaned account records
//!
//! A [`FinanceManager`] resolves one checking table, one credit table and
//! their concatenation when it is built, then answers every query from those
//! three tables. All figures are recomputed per call; nothing is cached and
//! nothing is mutated after construction.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::config::{NormalizationConfig, ResolutionStrategy};
use crate::dates::{self, DateRange};
use crate::models::{
    AccountKind, AccountRecord, BudgetStatus, MonthlySummary, Subscription, Transaction,
};

/// Budget comparisons closer than this count as "on budget"
const BUDGET_EPSILON: f64 = 0.005;

/// Answers finance questions about a fixed set of cleaned records
#[derive(Debug, Clone)]
pub struct FinanceManager {
    checking: Vec<Transaction>,
    credit: Vec<Transaction>,
    combined: Vec<Transaction>,
    exclude: HashSet<String>,
    window_months: u32,
    min_occurrences: usize,
    today: NaiveDate,
}

impl FinanceManager {
    /// Build from cleaned records, using the local date as "today"
    pub fn new(records: &[AccountRecord], config: &NormalizationConfig) -> Self {
        Self::with_today(records, config, dates::today())
    }

    /// Build with an explicit "today"
    pub fn with_today(
        records: &[AccountRecord],
        config: &NormalizationConfig,
        today: NaiveDate,
    ) -> Self {
        let checking = resolve_kind(records, AccountKind::Checking, config.resolution);
        let credit = resolve_kind(records, AccountKind::Credit, config.resolution);

        let mut combined = Vec::with_capacity(checking.len() + credit.len());
        combined.extend_from_slice(&checking);
        combined.extend_from_slice(&credit);

        Self {
            checking,
            credit,
            combined,
            exclude: config.exclude_list.iter().cloned().collect(),
            window_months: config.subscription_window_months,
            min_occurrences: config.min_occurrences.max(2),
            today,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn checking(&self) -> &[Transaction] {
        &self.checking
    }

    pub fn credit(&self) -> &[Transaction] {
        &self.credit
    }

    /// Checking followed by credit
    pub fn combined(&self) -> &[Transaction] {
        &self.combined
    }

    /// Absolute total per category over both accounts, ordered by category
    pub fn expense_categories(&self) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for tx in &self.combined {
            *totals.entry(tx.category.clone()).or_default() += tx.amount;
        }
        for total in totals.values_mut() {
            *total = total.abs();
        }
        totals
    }

    /// Credit card spending so far this month
    pub fn current_month_credit_usage(&self) -> f64 {
        outflows(&self.credit, &dates::current_month_range(self.today))
    }

    /// Credit card spending over the whole previous month
    pub fn previous_month_credit_usage(&self) -> f64 {
        outflows(&self.credit, &dates::previous_month_range(self.today))
    }

    /// Checking inflows over the previous month
    pub fn total_income_last_month(&self) -> f64 {
        inflows(&self.checking, &dates::previous_month_range(self.today))
    }

    /// Checking outflows over the previous month, as a positive number
    pub fn total_expenses_last_month(&self) -> f64 {
        outflows(&self.checking, &dates::previous_month_range(self.today))
    }

    /// Income minus expenses for the previous month
    pub fn net_income_last_month(&self) -> f64 {
        self.total_income_last_month() - self.total_expenses_last_month()
    }

    /// Outflows across both accounts within `range`
    pub fn amount_spent(&self, range: &DateRange) -> f64 {
        outflows(&self.combined, range)
    }

    /// Checking income and expenses per `(year, month)`; undated rows are skipped
    pub fn monthly_summaries(&self) -> BTreeMap<(i32, u32), MonthlySummary> {
        let mut months: BTreeMap<(i32, u32), MonthlySummary> = BTreeMap::new();
        for tx in &self.checking {
            let Some(date) = tx.date else { continue };
            let summary = months.entry((date.year(), date.month())).or_default();
            if tx.amount > 0.0 {
                summary.income += tx.amount;
            } else {
                summary.expenses -= tx.amount;
            }
        }
        months
    }

    /// Average monthly checking outflow over the `months` full months before this one
    pub fn average_monthly_expenses(&self, months: u32) -> f64 {
        if months == 0 {
            return 0.0;
        }
        let range = dates::prior_full_months(self.today, months);
        outflows(&self.checking, &range) / f64::from(months)
    }

    /// Compare this month's checking outflows with `budget`
    pub fn budget_status(&self, budget: f64) -> BudgetStatus {
        let spent = outflows(&self.checking, &dates::current_month_range(self.today));
        let difference = spent - budget;
        if difference.abs() < BUDGET_EPSILON {
            BudgetStatus::On
        } else if difference > 0.0 {
            BudgetStatus::Over(difference)
        } else {
            BudgetStatus::Under(-difference)
        }
    }

    /// Descriptions charged more than once in the recent window.
    ///
    /// Looks at both accounts from the first of the month
    /// `subscription_window_months` back through today, ignores excluded
    /// categories, and returns one entry per recurring description in
    /// first-seen order. Amount and day-of-month stability are not required;
    /// `typical_day` is reported for information only.
    pub fn get_subscriptions(&self) -> Vec<Subscription> {
        let window = dates::rolling_window(self.today, self.window_months);

        let recent: Vec<&Transaction> = self
            .combined
            .iter()
            .filter(|tx| window.contains_opt(tx.date))
            .filter(|tx| !self.exclude.contains(&tx.category))
            .collect();

        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&Transaction>> = HashMap::new();
        for tx in recent {
            let group = groups.entry(tx.description.as_str()).or_insert_with(|| {
                order.push(tx.description.as_str());
                Vec::new()
            });
            group.push(tx);
        }

        let subscriptions: Vec<Subscription> = order
            .into_iter()
            .filter_map(|description| {
                let group = groups.get(description)?;
                if group.len() < self.min_occurrences {
                    return None;
                }
                let first = group.first()?;
                let days: Vec<u32> = group
                    .iter()
                    .filter_map(|tx| tx.date)
                    .map(|d| d.day())
                    .collect();
                Some(Subscription {
                    description: description.to_string(),
                    category: first.category.clone(),
                    amount: first.amount,
                    date: first.date,
                    occurrences: group.len(),
                    typical_day: single_mode(&days).unwrap_or(0),
                })
            })
            .collect();

        debug!(
            "Found {} recurring descriptions between {} and {}",
            subscriptions.len(),
            window.start,
            window.end
        );
        subscriptions
    }
}

/// Pick the checking or credit table out of `records`
fn resolve_kind(
    records: &[AccountRecord],
    kind: AccountKind,
    resolution: ResolutionStrategy,
) -> Vec<Transaction> {
    let mut matching = records.iter().filter(|r| r.kind == kind);

    match resolution {
        ResolutionStrategy::FirstWins => {
            let Some(first) = matching.next() else {
                debug!("No {} records", kind);
                return Vec::new();
            };
            let ignored = matching.count();
            if ignored > 0 {
                debug!("Using first {} record, ignoring {} more", kind, ignored);
            }
            first.transactions.clone()
        }
        ResolutionStrategy::Concatenate => {
            let mut count = 0usize;
            let transactions: Vec<Transaction> = matching
                .inspect(|_| count += 1)
                .flat_map(|r| r.transactions.iter().cloned())
                .collect();
            debug!("Concatenated {} {} records", count, kind);
            transactions
        }
    }
}

/// Absolute sum of negative amounts dated within `range`
fn outflows(transactions: &[Transaction], range: &DateRange) -> f64 {
    transactions
        .iter()
        .filter(|tx| range.contains_opt(tx.date) && tx.amount < 0.0)
        .map(|tx| -tx.amount)
        .sum()
}

/// Sum of positive amounts dated within `range`
fn inflows(transactions: &[Transaction], range: &DateRange) -> f64 {
    transactions
        .iter()
        .filter(|tx| range.contains_opt(tx.date) && tx.amount > 0.0)
        .map(|tx| tx.amount)
        .sum()
}

/// Most frequent value, smallest on ties
fn single_mode(values: &[u32]) -> Option<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(*v).or_default() += 1;
    }
    // max_by_key keeps the last maximum, so walk in reverse to land on the smallest
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, tx};

    fn today() -> NaiveDate {
        date(2025, 10, 16)
    }

    fn config() -> NormalizationConfig {
        NormalizationConfig::default()
    }

    /// Jul–Sep 2025 checking history plus a little October
    fn checking_history() -> Vec<Transaction> {
        let mut rows = Vec::new();
        for (month, electric) in [(7, -85.30), (8, -90.10), (9, -88.75)] {
            rows.push(tx(date(2025, month, 1), "Interest Payment", "Interest Income", 1.25));
            rows.push(tx(date(2025, month, 2), "Electric Co.", "Utilities", electric));
            rows.push(tx(date(2025, month, 3), "Comcast Xfinity", "Television", -70.00));
            rows.push(tx(date(2025, month, 5), "Netflix", "Entertainment", -15.49));
            rows.push(tx(date(2025, month, 6), "Adobe Creative Cloud", "Software", -20.99));
            rows.push(tx(date(2025, month, 8), "Transfer to Savings", "Transfer", -400.00));
            rows.push(tx(date(2025, month, 15), "Payroll", "Income", 2500.00));
        }
        rows.push(tx(date(2025, 9, 21), "HBO Max", "Entertainment", -9.99));
        rows.push(tx(date(2025, 10, 3), "Comcast Xfinity", "Television", -70.00));
        rows.push(tx(date(2025, 10, 10), "Grocer", "Groceries", -120.00));
        rows
    }

    fn credit_history() -> Vec<Transaction> {
        vec![
            tx(date(2025, 9, 1), "Coffee", "Dining", -4.50),
            tx(date(2025, 9, 30), "Hardware Store", "Home", -60.00),
            tx(date(2025, 9, 12), "Refund", "Home", 20.00),
            tx(date(2025, 10, 1), "Coffee Cart", "Dining", -5.00),
            tx(date(2025, 8, 31), "Bookshop", "Books", -30.00),
            Transaction::new(None, "Mystery", "Uncategorized", -99.00),
        ]
    }

    fn manager() -> FinanceManager {
        let records = vec![
            AccountRecord::new(AccountKind::Checking, checking_history()),
            AccountRecord::new(AccountKind::Credit, credit_history()),
        ];
        FinanceManager::with_today(&records, &config(), today())
    }

    #[test]
    fn test_expense_categories_non_negative_and_sorted() {
        let categories = manager().expense_categories();
        assert!(categories.values().all(|v| *v >= 0.0));

        let keys: Vec<&String> = categories.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        // Home nets -60 + 20
        assert!((categories["Home"] - 40.0).abs() < 1e-9);
        assert!((categories["Income"] - 7500.0).abs() < 1e-9);
        // Undated rows still count here
        assert!((categories["Uncategorized"] - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_expense_categories_total_matches_per_category_sums() {
        let m = manager();
        let categories = m.expense_categories();

        let mut expected: HashMap<&str, f64> = HashMap::new();
        for tx in m.combined() {
            *expected.entry(tx.category.as_str()).or_default() += tx.amount;
        }
        let expected_total: f64 = expected.values().map(|v| v.abs()).sum();
        let total: f64 = categories.values().sum();
        assert!((total - expected_total).abs() < 1e-6);
    }

    #[test]
    fn test_previous_month_credit_usage_is_closed_interval() {
        // Sep 1 and Sep 30 count; the Sep refund, Aug 31, Oct 1 and the undated row do not
        assert!((manager().previous_month_credit_usage() - 64.50).abs() < 1e-9);
    }

    #[test]
    fn test_current_month_credit_usage() {
        assert!((manager().current_month_credit_usage() - 5.00).abs() < 1e-9);
    }

    #[test]
    fn test_last_month_income_and_expenses() {
        let m = manager();
        assert!((m.total_income_last_month() - 2501.25).abs() < 1e-9);
        let expected = 88.75 + 70.00 + 15.49 + 20.99 + 400.00 + 9.99;
        assert!((m.total_expenses_last_month() - expected).abs() < 1e-9);
        assert!((m.net_income_last_month() - (2501.25 - expected)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_kinds_yield_zero() {
        let m = FinanceManager::with_today(&[], &config(), today());
        assert_eq!(m.current_month_credit_usage(), 0.0);
        assert_eq!(m.previous_month_credit_usage(), 0.0);
        assert_eq!(m.total_income_last_month(), 0.0);
        assert_eq!(m.total_expenses_last_month(), 0.0);
        assert!(m.expense_categories().is_empty());
        assert!(m.get_subscriptions().is_empty());
        assert!(m.monthly_summaries().is_empty());
    }

    #[test]
    fn test_get_subscriptions() {
        let subs = manager().get_subscriptions();
        let names: Vec<&str> = subs.iter().map(|s| s.description.as_str()).collect();
        // Window is Aug 1 - Oct 16. Transfers, payroll and interest are excluded
        // categories; HBO Max and the credit rows only appear once.
        assert_eq!(
            names,
            vec!["Electric Co.", "Comcast Xfinity", "Netflix", "Adobe Creative Cloud"]
        );

        let comcast = &subs[1];
        assert_eq!(comcast.occurrences, 3);
        assert_eq!(comcast.date, Some(date(2025, 8, 3)));
        assert_eq!(comcast.amount, -70.00);
        assert_eq!(comcast.typical_day, 3);
    }

    #[test]
    fn test_get_subscriptions_threshold_only() {
        let today = date(2025, 10, 20);
        let rows = vec![
            tx(date(2025, 10, 1), "Netflix", "Entertainment", -15.49),
            tx(date(2025, 9, 1), "Netflix", "Entertainment", -15.49),
            tx(date(2025, 8, 1), "Netflix", "Entertainment", -15.49),
            tx(date(2025, 10, 6), "Adobe", "Software", -20.99),
            tx(date(2025, 9, 9), "Adobe", "Software", -22.99),
            tx(date(2025, 8, 6), "Adobe", "Software", -20.99),
            tx(date(2025, 9, 14), "One-off Vendor", "Shopping", -300.00),
        ];
        let records = vec![AccountRecord::new(AccountKind::Credit, rows)];
        let subs = FinanceManager::with_today(&records, &config(), today).get_subscriptions();

        let names: HashSet<&str> = subs.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(names, HashSet::from(["Netflix", "Adobe"]));
        // Day 6 twice beats day 9 once
        let adobe = subs.iter().find(|s| s.description == "Adobe").unwrap();
        assert_eq!(adobe.typical_day, 6);
    }

    #[test]
    fn test_get_subscriptions_ignores_rows_outside_window() {
        let rows = vec![
            tx(date(2025, 7, 31), "Gym", "Fitness", -40.00),
            tx(date(2025, 8, 1), "Gym", "Fitness", -40.00),
            tx(date(2025, 10, 17), "Gym", "Fitness", -40.00),
        ];
        let records = vec![AccountRecord::new(AccountKind::Checking, rows)];
        let subs = FinanceManager::with_today(&records, &config(), today()).get_subscriptions();
        assert!(subs.is_empty());
    }

    #[test]
    fn test_custom_exclusions() {
        let rows = vec![
            tx(date(2025, 9, 1), "Rent", "Housing", -1500.00),
            tx(date(2025, 10, 1), "Rent", "Housing", -1500.00),
        ];
        let records = vec![AccountRecord::new(AccountKind::Checking, rows)];

        let subs = FinanceManager::with_today(&records, &config(), today()).get_subscriptions();
        assert_eq!(subs.len(), 1);

        let config = config().with_exclude_list(["Housing"]);
        let subs = FinanceManager::with_today(&records, &config, today()).get_subscriptions();
        assert!(subs.is_empty());
    }

    #[test]
    fn test_first_wins_resolution() {
        let records = vec![
            AccountRecord::new(AccountKind::Credit, vec![tx(date(2025, 9, 2), "A", "X", -10.0)]),
            AccountRecord::new(AccountKind::Credit, vec![tx(date(2025, 9, 3), "B", "X", -20.0)]),
        ];
        let m = FinanceManager::with_today(&records, &config(), today());
        assert_eq!(m.credit().len(), 1);
        assert_eq!(m.credit()[0].description, "A");
        assert!(m.checking().is_empty());
        assert!((m.previous_month_credit_usage() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_concatenate_resolution() {
        let records = vec![
            AccountRecord::new(AccountKind::Credit, vec![tx(date(2025, 9, 2), "A", "X", -10.0)]),
            AccountRecord::new(AccountKind::Checking, vec![tx(date(2025, 9, 4), "C", "Y", 5.0)]),
            AccountRecord::new(AccountKind::Credit, vec![tx(date(2025, 9, 3), "B", "X", -20.0)]),
        ];
        let config = config().with_resolution(ResolutionStrategy::Concatenate);
        let m = FinanceManager::with_today(&records, &config, today());
        let names: Vec<&str> = m.credit().iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(m.combined().len(), 3);
        assert_eq!(m.combined()[0].description, "C");
        assert!((m.previous_month_credit_usage() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_summaries() {
        let months = manager().monthly_summaries();
        assert_eq!(months.len(), 4);
        let july = months[&(2025, 7)];
        assert!((july.income - 2501.25).abs() < 1e-9);
        assert!((july.expenses - (85.30 + 70.00 + 15.49 + 20.99 + 400.00)).abs() < 1e-9);
        assert!((july.net() - (july.income - july.expenses)).abs() < 1e-9);
    }

    #[test]
    fn test_average_monthly_expenses() {
        let m = manager();
        let july = 85.30 + 70.00 + 15.49 + 20.99 + 400.00;
        let august = 90.10 + 70.00 + 15.49 + 20.99 + 400.00;
        let september = 88.75 + 70.00 + 15.49 + 20.99 + 400.00 + 9.99;
        let expected = (july + august + september) / 3.0;
        assert!((m.average_monthly_expenses(3) - expected).abs() < 1e-9);
        assert_eq!(m.average_monthly_expenses(0), 0.0);
    }

    #[test]
    fn test_budget_status() {
        let m = manager();
        // October so far: 70 + 120
        assert_eq!(m.budget_status(190.0), BudgetStatus::On);
        match m.budget_status(300.0) {
            BudgetStatus::Under(by) => assert!((by - 110.0).abs() < 1e-9),
            other => panic!("expected under budget, got {:?}", other),
        }
        match m.budget_status(100.0) {
            BudgetStatus::Over(by) => assert!((by - 90.0).abs() < 1e-9),
            other => panic!("expected over budget, got {:?}", other),
        }
    }

    #[test]
    fn test_amount_spent() {
        let m = manager();
        let september = dates::previous_month_range(today());
        let expected = 88.75 + 70.00 + 15.49 + 20.99 + 400.00 + 9.99 + 4.50 + 60.00;
        assert!((m.amount_spent(&september) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_single_mode() {
        assert_eq!(single_mode(&[]), None);
        assert_eq!(single_mode(&[5]), Some(5));
        assert_eq!(single_mode(&[9, 6, 6]), Some(6));
        assert_eq!(single_mode(&[15, 1, 15, 1]), Some(1));
    }
}
