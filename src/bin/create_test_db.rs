use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use finance_tracker::{
    BudgetMonth, CategoryName, CurrencyCode, PasswordHash, Transaction, ValidatedPassword,
    count_transactions, create_category, create_transaction, create_user_with_account,
    initialize_db, upsert_budget,
};

/// A utility for creating a test database for the REST API server of the finance tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many days of transactions to generate, ending today.
    #[arg(long, default_value_t = 90)]
    days: i64,
}

/// The demo user's categories and their monthly budgets in USD.
const CATEGORIES: [(&str, f64); 5] = [
    ("Groceries", 400.0),
    ("Rent", 1500.0),
    ("Transport", 120.0),
    ("Eating Out", 150.0),
    ("Salary", 0.0),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let (user, account) =
        create_user_with_account("demo", "demo@example.com", password_hash, &conn)?;

    println!("Creating categories and budgets...");

    let today = OffsetDateTime::now_utc().date();
    let start = today - Duration::days(args.days.max(1) - 1);
    let usd = CurrencyCode::usd();
    let mut category_ids = Vec::with_capacity(CATEGORIES.len());

    for (name, budget) in CATEGORIES {
        let category = create_category(CategoryName::new(name)?, user.id, &conn)?;
        category_ids.push(category.id);

        if budget > 0.0 {
            let mut month = BudgetMonth::containing(start);
            while month.first_day() <= today {
                upsert_budget(user.id, category.id, month, budget, &usd, budget, &conn)?;
                month = BudgetMonth::containing(month.next_month());
            }
        }
    }

    let &[groceries, rent, transport, eating_out, salary] = category_ids.as_slice() else {
        return Err("expected one ID per category".into());
    };

    println!("Creating transactions...");

    let mut date = start;
    while date <= today {
        let day = date.day();
        let mut entries: Vec<(f64, &str, i64)> = Vec::new();

        if day == 1 {
            entries.push((4200.0, "Salary", salary));
            entries.push((-1500.0, "Rent", rent));
        }
        if day % 4 == 0 {
            entries.push((-(60.0 + f64::from(day) * 2.5), "Supermarket", groceries));
        }
        if day % 7 == 3 {
            entries.push((-25.0, "Bus pass top up", transport));
        }
        if day % 5 == 2 {
            entries.push((-(18.0 + f64::from(day % 3) * 6.0), "Takeaways", eating_out));
        }

        for (amount, description, category_id) in entries {
            create_transaction(
                account.id,
                Transaction::build(amount, date, description).category_id(Some(category_id)),
                &conn,
            )?;
        }

        date += Duration::days(1);
    }

    let count = count_transactions(account.id, &conn)?;
    println!("Created {count} transactions for demo@example.com (password 'test').");
    println!("Success!");

    Ok(())
}
