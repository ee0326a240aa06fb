use crate::{
    data::{Expense, Listed},
    read::ExpenseUser,
    validate::parse_amount,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Total spent per category. Categories come out in the order they were first
/// seen, so the same store always gives the same chart.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Summary {
    totals: Vec<(String, Decimal)>,
    positions: HashMap<String, usize>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty summary means there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> + '_ {
        self.totals.iter().map(|(c, t)| (c.as_str(), *t))
    }
}

/// Rows whose amount isn't a number were either typed by hand or come from
/// somewhere else; they don't count, but they don't stop the others either.
impl ExpenseUser for Summary {
    fn use_expense(&mut self, index: usize, expense: Expense) {
        let Some(amount) = parse_amount(&expense.amount) else {
            debug!(index, amount = %expense.amount, "skipping non-numeric amount");
            return;
        };
        match self.positions.get(&expense.category).copied() {
            Some(i) => {
                let total = &mut self.totals[i].1;
                match total.checked_add(amount) {
                    Some(sum) => *total = sum,
                    None => warn!(index, category = %expense.category, "total overflow, row skipped"),
                }
            }
            None => {
                self.positions
                    .insert(expense.category.clone(), self.totals.len());
                self.totals.push((expense.category, amount));
            }
        }
    }
}

pub(crate) fn aggregate<I: IntoIterator<Item = Listed>>(records: I) -> Summary {
    let mut summary = Summary::new();
    for Listed { index, expense } in records {
        summary.use_expense(index, expense);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::{aggregate, Summary};
    use crate::{
        data::{Expense, Listed},
        read::read_expenses,
    };
    use rust_decimal_macros::dec;

    fn listed(index: usize, category: &str, amount: &str) -> Listed {
        Listed {
            index,
            expense: Expense {
                date: "2024-01-01".into(),
                category: category.into(),
                amount: amount.into(),
                note: String::new(),
            },
        }
    }

    #[test]
    fn test_aggregate() {
        let summary = aggregate([
            listed(1, "Food", "10"),
            listed(2, "Food", "5"),
            listed(3, "Fuel", "20"),
        ]);
        assert_eq!(
            summary.iter().collect::<Vec<_>>(),
            [("Food", dec!(15)), ("Fuel", dec!(20))]
        );
    }

    #[test]
    fn test_empty() {
        let summary = aggregate(Vec::<Listed>::new());
        assert!(summary.is_empty());
        assert_eq!(summary, Summary::new());
    }

    #[test]
    fn test_skip_non_numeric() {
        let summary = aggregate([
            listed(1, "Food", "abc"),
            listed(2, "Fuel", ""),
            listed(3, "Food", "2.5"),
        ]);
        assert_eq!(summary.iter().collect::<Vec<_>>(), [("Food", dec!(2.5))]);

        let all_garbage = aggregate([listed(1, "Food", "abc")]);
        assert!(all_garbage.is_empty());
    }

    #[test]
    fn test_first_seen_order() {
        let summary = aggregate([
            listed(1, "Rent", "700"),
            listed(2, "Food", "3"),
            listed(3, "Rent", "1"),
            listed(4, "Books", "9.99"),
        ]);
        let categories = summary.iter().map(|(c, _)| c).collect::<Vec<_>>();
        assert_eq!(categories, ["Rent", "Food", "Books"]);
    }

    #[test]
    fn test_from_csv() {
        let expenses_csv = b"\
Date,Category,Amount,Note
2024-01-02,Food,10.25,
2024-01-03,Food,oops,
2024-01-04,Fuel,1e1,
";
        let mut summary = Summary::new();
        read_expenses(&expenses_csv[..], None, &mut summary).unwrap();
        assert_eq!(
            summary.iter().collect::<Vec<_>>(),
            [("Food", dec!(10.25)), ("Fuel", dec!(10))]
        );
    }

    #[test]
    fn test_rows_without_note() {
        let expenses_csv = b"\
Date,Category,Amount,Note
2024-01-15,Food,10
2024-01-16
2024-01-17,Food,2.5,ok
";
        let mut summary = Summary::new();
        read_expenses(&expenses_csv[..], None, &mut summary).unwrap();
        assert_eq!(summary.iter().collect::<Vec<_>>(), [("Food", dec!(12.5))]);
    }
}
