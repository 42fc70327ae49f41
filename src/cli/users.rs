use comfy_table::{Cell, Table};
use zeroize::Zeroize;

use crate::auth::AdminChain;
use crate::cli::{open, password_or_prompt};
use crate::error::{RedeemError, Result};
use crate::users;

pub fn add(email: &str, role: Option<&str>, password: Option<String>, issuer: Option<&str>) -> Result<()> {
    let (settings, conn) = open()?;
    let chain = AdminChain::from_settings(&conn, &settings);
    let mut password = password.unwrap_or_default();
    let result = users::add_user(
        &conn,
        &chain,
        issuer,
        email,
        Some(password.as_str()).filter(|p| !p.is_empty()),
        role,
    );
    password.zeroize();
    let id = result?;
    println!("Added user {} ({id})", email.trim().to_lowercase());
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open()?;
    let rows = users::list_users(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Email", "Role", "Admin", "Created"]);
    for user in rows {
        table.add_row(vec![
            Cell::new(user.id),
            Cell::new(user.email),
            Cell::new(user.role.unwrap_or_default()),
            Cell::new(if user.is_admin { "yes" } else { "" }),
            Cell::new(user.created_at),
        ]);
    }
    println!("Users\n{table}");
    Ok(())
}

pub fn passwd(email: &str, current: Option<String>, new: Option<String>) -> Result<()> {
    let (_, conn) = open()?;
    let mut current = password_or_prompt(current, "Current password: ")?;
    let prompted = new.is_none();
    let mut new = password_or_prompt(new, "New password: ")?;
    let mut confirm = if prompted {
        rpassword::prompt_password("Confirm new password: ")?
    } else {
        new.clone()
    };

    let result = if new != confirm {
        Err(RedeemError::Validation("new passwords do not match".into()))
    } else {
        users::change_password(&conn, email, &current, &new)
    };
    current.zeroize();
    new.zeroize();
    confirm.zeroize();
    result?;

    println!("Password changed for {}", email.trim().to_lowercase());
    Ok(())
}
