use comfy_table::{Cell, Table};

use crate::auth::{AdminChain, Authorizer};
use crate::cli::open;
use crate::error::Result;
use crate::fmt::mask;
use crate::inventory::{self, AccountFields};

pub fn add(code: &str, username: &str, password: &str, product: Option<&str>, issuer: &str) -> Result<()> {
    let (settings, conn) = open()?;
    let identity = AdminChain::from_settings(&conn, &settings).authorize(issuer)?;
    let fields = AccountFields {
        username,
        password,
        product_name: product,
    };
    let id = inventory::add_account(&conn, code, &fields, &identity.user_id, settings.uppercase_keys)?;
    println!("Added account {id}: {}", code.trim());
    Ok(())
}

pub fn list(show_passwords: bool) -> Result<()> {
    let (_, conn) = open()?;
    let accounts = inventory::list_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Code", "Username", "Password", "Product", "Status", "Used By"]);
    for a in accounts {
        let password = if show_passwords { a.password } else { mask(&a.password) };
        table.add_row(vec![
            Cell::new(a.id),
            Cell::new(a.code),
            Cell::new(a.username),
            Cell::new(password),
            Cell::new(a.product_name.unwrap_or_default()),
            Cell::new(a.status),
            Cell::new(a.used_by.unwrap_or_default()),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn edit(id: i64, username: &str, password: &str, product: Option<&str>, issuer: &str) -> Result<()> {
    let (settings, conn) = open()?;
    AdminChain::from_settings(&conn, &settings).authorize(issuer)?;
    let fields = AccountFields {
        username,
        password,
        product_name: product,
    };
    inventory::edit_account(&conn, id, &fields)?;
    println!("Updated account {id}");
    Ok(())
}

pub fn reset(id: i64, issuer: &str) -> Result<()> {
    let (settings, conn) = open()?;
    AdminChain::from_settings(&conn, &settings).authorize(issuer)?;
    inventory::reset_account(&conn, id)?;
    println!("Account {id} is available again");
    Ok(())
}

pub fn delete(id: i64, issuer: &str) -> Result<()> {
    let (settings, conn) = open()?;
    AdminChain::from_settings(&conn, &settings).authorize(issuer)?;
    inventory::delete_account(&conn, id)?;
    println!("Deleted account {id}");
    Ok(())
}
