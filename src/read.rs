use crate::data::{DateRange, Expense, Listed};
use tracing::{debug, warn};

/// Trait for doing something with an `Expense` read from the store. The listing
/// just collects them, the aggregator sums them up, and tests can plug a mock in
/// to check what comes out of a CSV stream.
pub(crate) trait ExpenseUser {
    fn use_expense(&mut self, index: usize, expense: Expense);
}

impl ExpenseUser for Vec<Listed> {
    fn use_expense(&mut self, index: usize, expense: Expense) {
        self.push(Listed { index, expense })
    }
}

/// CSV importer for `Expense`s. The first row is taken as the header; data rows
/// are numbered from 1 in file order. Short rows are padded with empty fields. Rows that can't be decoded, or that fall
/// outside `range` when one is given, are skipped but keep their number so the
/// indices stay in step with the file.
pub(crate) fn read_expenses<R: std::io::Read, U: ExpenseUser>(
    reader: R,
    range: Option<&DateRange>,
    user: &mut U,
) -> Result<(), csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    for (i, result) in rdr.records().enumerate() {
        let index = i + 1;
        let mut record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!(index, "unreadable row: {e}");
                continue;
            }
        };
        while record.len() < headers.len() {
            record.push_field("");
        }
        let expense: Expense = match record.deserialize(Some(&headers)) {
            Ok(expense) => expense,
            Err(e) => {
                warn!(index, "malformed row: {e}");
                continue;
            }
        };
        if let Some(range) = range {
            if !range.contains(&expense.date) {
                debug!(index, date = %expense.date, "row outside date range");
                continue;
            }
        }
        user.use_expense(index, expense);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        data::{DateRange, Expense, Listed},
        read::{read_expenses, ExpenseUser},
    };

    fn expense(date: &str, category: &str, amount: &str, note: &str) -> Expense {
        Expense {
            date: date.into(),
            category: category.into(),
            amount: amount.into(),
            note: note.into(),
        }
    }

    #[test]
    fn read_expense() {
        #[derive(Default)]
        struct ExpenseStorage {
            seen: Vec<(usize, Expense)>,
        }
        impl ExpenseUser for ExpenseStorage {
            fn use_expense(&mut self, index: usize, expense: Expense) {
                self.seen.push((index, expense))
            }
        }
        let mut storage = ExpenseStorage::default();
        let expenses_csv = b"\
Date,Category,Amount,Note
2024-01-02,Food,10,
2024-01-03,Fuel,20.5,full tank
not a date,Food,abc,hand edited
2024-01-04,\"Rent, March\",700,\"with \"\"quotes\"\"\"
";
        read_expenses(&expenses_csv[..], None, &mut storage).unwrap();
        assert_eq!(
            storage.seen,
            [
                (1, expense("2024-01-02", "Food", "10", "")),
                (2, expense("2024-01-03", "Fuel", "20.5", "full tank")),
                (3, expense("not a date", "Food", "abc", "hand edited")),
                (4, expense("2024-01-04", "Rent, March", "700", "with \"quotes\"")),
            ]
        )
    }

    #[test]
    fn filtered_read_keeps_indices() {
        let expenses_csv = b"\
Date,Category,Amount,Note
2024-01-15,Food,10,
garbage,Food,5,
2024-02-01,Fuel,20,
2024-01-31,Fuel,7,
";
        let range = DateRange {
            start: "2024-01-01".into(),
            end: "2024-01-31".into(),
        };
        let mut listed: Vec<Listed> = Vec::new();
        read_expenses(&expenses_csv[..], Some(&range), &mut listed).unwrap();
        let indices = listed.iter().map(|l| l.index).collect::<Vec<_>>();
        assert_eq!(indices, [1, 4]);
    }

    #[test]
    fn short_rows_are_tolerated() {
        let expenses_csv = b"\
Date,Category,Amount,Note
2024-01-15,Food,10
2024-01-16
2024-01-17,Fuel,3,ok
";
        let mut listed: Vec<Listed> = Vec::new();
        read_expenses(&expenses_csv[..], None, &mut listed).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].expense, expense("2024-01-15", "Food", "10", ""));
        assert_eq!(listed[1].index, 2);
        assert_eq!(listed[1].expense, expense("2024-01-16", "", "", ""));
        assert_eq!(listed[2].index, 3);
        assert_eq!(listed[2].expense, expense("2024-01-17", "Fuel", "3", "ok"));
    }

    #[test]
    fn header_only() {
        let mut listed: Vec<Listed> = Vec::new();
        read_expenses(&b"Date,Category,Amount,Note\n"[..], None, &mut listed).unwrap();
        assert!(listed.is_empty());
    }
}
