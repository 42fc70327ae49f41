use crate::cli::open;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::{db_path, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let path = db_path(&settings);

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", path.display());

    if !path.exists() {
        println!();
        println!("Database not found. Run `redeem init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let (_, conn) = open()?;
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };

    println!();
    println!(
        "Codes:      {} active, {} used",
        count("SELECT count(*) FROM redemption_codes WHERE status = 'active'")?,
        count("SELECT count(*) FROM redemption_codes WHERE status = 'used'")?,
    );
    println!(
        "Accounts:   {} available, {} used",
        count("SELECT count(*) FROM accounts WHERE status = 'available'")?,
        count("SELECT count(*) FROM accounts WHERE status = 'used'")?,
    );
    println!(
        "Requests:   {} pending",
        count("SELECT count(*) FROM redemption_requests WHERE status = 'pending'")?,
    );
    println!(
        "Users:      {} ({} admins)",
        count("SELECT count(*) FROM users")?,
        count("SELECT count(*) FROM admins")?,
    );
    Ok(())
}
