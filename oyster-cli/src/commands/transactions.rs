//! Transactions command - list a user's transactions

use anyhow::Result;

use super::{with_session, Credentials};
use crate::output::create_table;

pub fn run(creds: Credentials, limit: usize, uncategorized: bool, json: bool) -> Result<()> {
    let (total, transactions) = with_session(creds, "transactions", json, |_, user| {
        let all = user.transactions();
        let total = all.len();
        let shown = all
            .into_iter()
            .filter(|t| !uncategorized || !t.is_categorized())
            .take(limit)
            .collect::<Vec<_>>();
        Ok((total, shown))
    })?;

    if json {
        return crate::output::json(transactions);
    }

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Date", "Description", "Amount", "Category"]);
    for tx in &transactions {
        let category = tx
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            tx.date.to_string(),
            tx.description.clone(),
            tx.amount.to_string(),
            category,
        ]);
    }
    println!("{}", table);
    println!("Showing {} of {} transactions", transactions.len(), total);
    Ok(())
}
