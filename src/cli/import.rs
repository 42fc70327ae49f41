use std::io::Read;

use comfy_table::{Cell, Table};

use crate::auth::AdminChain;
use crate::cli::{open, InputFormat};
use crate::error::Result;
use crate::fmt::entry_status;
use crate::importer::{bulk_import, EntryStatus, ImportInput, ImportOptions, ImportRequest, ImportResponse};
use crate::models::{Candidate, ImportKind};
use crate::store::SqliteStore;

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(file)?)
    }
}

pub fn run(kind: ImportKind, file: &str, issuer: &str, format: InputFormat, json: bool) -> Result<()> {
    let outcome = execute(kind, file, issuer, format);
    match (&outcome, json) {
        (Ok(response), true) => println!("{}", serde_json::to_string_pretty(response)?),
        (Ok(response), false) => print_response(response),
        (Err(e), true) => println!("{}", serde_json::to_string_pretty(&ImportResponse::error(e))?),
        (Err(_), false) => {}
    }
    outcome.map(|_| ())
}

fn execute(kind: ImportKind, file: &str, issuer: &str, format: InputFormat) -> Result<ImportResponse> {
    let (settings, conn) = open()?;
    let raw = read_input(file)?;
    let input = match format {
        InputFormat::Lines => ImportInput::Raw(raw),
        InputFormat::Json => ImportInput::Candidates(serde_json::from_str::<Vec<Candidate>>(&raw)?),
    };
    let store = SqliteStore::new(&conn);
    let authorizer = AdminChain::from_settings(&conn, &settings);
    let request = ImportRequest {
        kind,
        issuer_id: issuer.to_string(),
        input,
    };
    let options = ImportOptions {
        uppercase_keys: settings.uppercase_keys,
    };
    bulk_import(&store, &authorizer, request, options)
}

fn print_response(response: &ImportResponse) {
    if let Some(results) = &response.results {
        let mut table = Table::new();
        table.set_header(vec!["Key", "Status", "Message"]);
        for d in results.details.iter().filter(|d| d.status != EntryStatus::Success) {
            table.add_row(vec![
                Cell::new(&d.key),
                Cell::new(entry_status(d.status)),
                Cell::new(&d.message),
            ]);
        }
        if results.successful < results.details.len() {
            println!("{table}");
        }
    }
    for r in &response.rejected {
        println!("Line {}: {}", r.line, r.reason);
    }
    println!("{}", response.message);
}
