mod auth;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod inventory;
mod logging;
mod models;
mod normalizer;
mod redemption;
mod settings;
mod store;
mod users;

use clap::Parser;

use cli::{AccountsCommands, AdminCommands, Cli, CodesCommands, Commands, RequestsCommands, UsersCommands};

fn main() {
    let cli = Cli::parse();
    logging::init(&settings::get_data_dir());

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Status => cli::status::run(),
        Commands::Users { command } => match command {
            UsersCommands::Add {
                email,
                role,
                password,
                issuer,
            } => cli::users::add(&email, role.as_deref(), password, issuer.as_deref()),
            UsersCommands::List => cli::users::list(),
            UsersCommands::Passwd {
                email,
                current_password,
                new_password,
            } => cli::users::passwd(&email, current_password, new_password),
        },
        Commands::Admin { command } => match command {
            AdminCommands::Create {
                email,
                password,
                secret,
            } => cli::admin::create(&email, password, &secret),
            AdminCommands::Check { user } => cli::admin::check(&user),
        },
        Commands::Import {
            kind,
            file,
            issuer,
            format,
            json,
        } => cli::import::run(kind.into(), &file, &issuer, format, json),
        Commands::Codes { command } => match command {
            CodesCommands::Add { code, value, issuer } => cli::codes::add(&code, value, &issuer),
            CodesCommands::List => cli::codes::list(),
            CodesCommands::Delete { id, issuer } => cli::codes::delete(id, &issuer),
        },
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                code,
                username,
                password,
                product,
                issuer,
            } => cli::accounts::add(&code, &username, &password, product.as_deref(), &issuer),
            AccountsCommands::List { show_passwords } => cli::accounts::list(show_passwords),
            AccountsCommands::Edit {
                id,
                username,
                password,
                product,
                issuer,
            } => cli::accounts::edit(id, &username, &password, product.as_deref(), &issuer),
            AccountsCommands::Reset { id, issuer } => cli::accounts::reset(id, &issuer),
            AccountsCommands::Delete { id, issuer } => cli::accounts::delete(id, &issuer),
        },
        Commands::Redeem {
            code,
            username,
            contact,
        } => cli::redeem::run(&code, &username, &contact),
        Commands::Requests { command } => match command {
            RequestsCommands::List { status } => cli::requests::list(status.as_deref()),
            RequestsCommands::Set {
                id,
                status,
                notes,
                issuer,
            } => cli::requests::set(&id, &status, notes.as_deref(), &issuer),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
