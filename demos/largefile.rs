//! Open a large delimited file and read rows from its start and its end

use async_std::stream::StreamExt;
use csv_seek::{DelimitedFile, ReadByRow};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

#[async_std::main]
async fn main() -> csv_seek::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "<some large csv file>".to_owned());

    // The first line of the file is no data, the second one holds the column names
    let mut file = csv_seek::OpenOptions::new()
        .skip_lines(1)
        .has_header(true)
        .on_progress(|rows| eprint!("\r{}K", rows / 1000))
        .open(&path)
        .await?;

    println!("\nThe file has {} rows", file.row_count());
    println!("{}", file.headers().iter().join(" | "));

    for row in 0..3 {
        println!("{:?}", file.row(row).await?);
    }

    println!("--- Return last row -----------------");
    if let Some(last) = file.resolve(-1) {
        println!("{:?}", file.row(last).await?);
    }

    println!("--- Return last 10 rows -------------");
    let mut returned = 0;
    let mut rows = file.tail(10)?;
    while let Some(row) = rows.next().await {
        println!("{}", row.iter().join(" | "));
        returned += 1;
    }
    println!("Returned: {}", returned);

    println!("--- Return 5 rows starting at the 10th to last row ---");
    let start = file.resolve(-10).unwrap_or(0);
    let mut returned = 0;
    let mut rows = file.rows(start, Some(5))?;
    while let Some(row) = rows.next().await {
        println!("{}", row.iter().take(5).join(" | "));
        returned += 1;
    }
    println!("Returned: {}", returned);

    file.close();
    Ok(())
}
