pub mod accounts;
pub mod admin;
pub mod codes;
pub mod import;
pub mod init;
pub mod redeem;
pub mod requests;
pub mod status;
pub mod users;

use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{RedeemError, Result};
use crate::models::ImportKind;
use crate::settings::{db_path, load_settings, Settings};

#[derive(Parser)]
#[command(name = "redeem", about = "Issue redemption codes and accounts, and review redemption requests.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for redeem data (default: ~/.local/share/redeem)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Show database location and record counts.
    Status,
    /// Manage registered users.
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Create and check admin users.
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Bulk-import codes or accounts from a file (one entry per line).
    Import {
        /// What the file contains
        #[arg(value_enum)]
        kind: KindArg,
        /// Input file, or '-' for stdin
        file: String,
        /// Issuing admin (user id or email)
        #[arg(long)]
        issuer: String,
        /// Input format
        #[arg(long, value_enum, default_value = "lines")]
        format: InputFormat,
        /// Print the import response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage redemption codes.
    Codes {
        #[command(subcommand)]
        command: CodesCommands,
    },
    /// Manage distributable accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Redeem a code and open a redemption request.
    Redeem {
        /// Redemption code
        code: String,
        /// In-game username to deliver to
        #[arg(long)]
        username: String,
        /// How to reach the requester
        #[arg(long)]
        contact: String,
    },
    /// Review redemption requests.
    Requests {
        #[command(subcommand)]
        command: RequestsCommands,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Codes,
    Accounts,
}

impl From<KindArg> for ImportKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Codes => ImportKind::Codes,
            KindArg::Accounts => ImportKind::Accounts,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InputFormat {
    /// One entry per line; accounts as CODE:USER:PASS[:PRODUCT]
    Lines,
    /// A JSON array of candidate objects
    Json,
}

#[derive(Subcommand)]
pub enum UsersCommands {
    /// Register a user.
    Add {
        email: String,
        /// Role recorded on the user (e.g. 'admin')
        #[arg(long)]
        role: Option<String>,
        /// Login password
        #[arg(long)]
        password: Option<String>,
        /// Admin granting the role (user id or email); required with --role
        #[arg(long)]
        issuer: Option<String>,
    },
    /// List registered users.
    List,
    /// Change a user's password.
    Passwd {
        email: String,
        /// Current password (prompted if omitted)
        #[arg(long = "current-password")]
        current_password: Option<String>,
        /// New password (prompted if omitted)
        #[arg(long = "new-password")]
        new_password: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create an admin user (needs the configured admin secret).
    Create {
        email: String,
        /// Admin password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
        /// Admin secret from settings
        #[arg(long)]
        secret: String,
    },
    /// Run the admin checks for a user.
    Check {
        /// User id or email
        user: String,
    },
}

#[derive(Subcommand)]
pub enum CodesCommands {
    /// Add a single redemption code.
    Add {
        code: String,
        /// Reward value of the code
        #[arg(long)]
        value: i64,
        #[arg(long)]
        issuer: String,
    },
    /// List redemption codes.
    List,
    /// Delete a redemption code.
    Delete {
        id: i64,
        #[arg(long)]
        issuer: String,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a single account.
    Add {
        code: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        issuer: String,
    },
    /// List accounts.
    List {
        /// Show passwords unmasked
        #[arg(long = "show-passwords")]
        show_passwords: bool,
    },
    /// Change an account's credentials.
    Edit {
        id: i64,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        issuer: String,
    },
    /// Make a used account available again.
    Reset {
        id: i64,
        #[arg(long)]
        issuer: String,
    },
    /// Delete an account.
    Delete {
        id: i64,
        #[arg(long)]
        issuer: String,
    },
}

#[derive(Subcommand)]
pub enum RequestsCommands {
    /// List redemption requests, newest first.
    List {
        /// Only show requests with this status
        #[arg(long)]
        status: Option<String>,
    },
    /// Set a request's status: pending, processing, completed, rejected.
    Set {
        id: String,
        status: String,
        /// Notes for the requester's record
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        issuer: String,
    },
}

/// Load settings and open the initialized database.
pub(crate) fn open() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let path = db_path(&settings);
    if !path.exists() {
        return Err(RedeemError::Other(
            "Database not found. Run `redeem init` to set up.".into(),
        ));
    }
    let conn = get_connection(&path)?;
    Ok((settings, conn))
}

/// Read a password from the flag or prompt for it without echo.
pub(crate) fn password_or_prompt(password: Option<String>, prompt: &str) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => Ok(rpassword::prompt_password(prompt)?),
    }
}
