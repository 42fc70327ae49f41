use colored::Colorize;
use zeroize::Zeroize;

use crate::auth::{lookup_identity, AdminChain};
use crate::cli::{open, password_or_prompt};
use crate::error::{RedeemError, Result};
use crate::users;

pub fn create(email: &str, password: Option<String>, secret: &str) -> Result<()> {
    let (settings, conn) = open()?;
    let mut password = password_or_prompt(password, "Password: ")?;
    let result = users::create_admin(&conn, &settings, email, &password, secret);
    password.zeroize();
    let id = result?;
    println!("Admin account created: {} ({id})", email.trim().to_lowercase());
    Ok(())
}

pub fn check(user: &str) -> Result<()> {
    let (settings, conn) = open()?;
    let identity = lookup_identity(&conn, user)?
        .ok_or_else(|| RedeemError::NotFound(format!("user '{user}'")))?;
    let chain = AdminChain::from_settings(&conn, &settings);
    match chain.matching_check(&identity) {
        Some(check) => println!("{} (via {})", "admin".green().bold(), check.key()),
        None => println!("{}", "not an admin".red()),
    }
    Ok(())
}
