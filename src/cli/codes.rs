use comfy_table::{Cell, Table};

use crate::auth::{AdminChain, Authorizer};
use crate::cli::open;
use crate::error::Result;
use crate::inventory;

pub fn add(code: &str, value: i64, issuer: &str) -> Result<()> {
    let (settings, conn) = open()?;
    let identity = AdminChain::from_settings(&conn, &settings).authorize(issuer)?;
    inventory::add_code(&conn, code, value, &identity.user_id, settings.uppercase_keys)?;
    println!("Added code: {}", code.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open()?;
    let codes = inventory::list_codes(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Code", "Value", "Status", "Issued By", "Created"]);
    for c in codes {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(c.code),
            Cell::new(c.value.map(|v| v.to_string()).unwrap_or_default()),
            Cell::new(c.status),
            Cell::new(c.created_by.unwrap_or_default()),
            Cell::new(c.created_at),
        ]);
    }
    println!("Codes\n{table}");
    Ok(())
}

pub fn delete(id: i64, issuer: &str) -> Result<()> {
    let (settings, conn) = open()?;
    AdminChain::from_settings(&conn, &settings).authorize(issuer)?;
    inventory::delete_code(&conn, id)?;
    println!("Deleted code {id}");
    Ok(())
}
