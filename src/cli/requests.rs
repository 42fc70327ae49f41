use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::auth::{AdminChain, Authorizer};
use crate::cli::open;
use crate::error::Result;
use crate::models::RequestStatus;
use crate::redemption;

pub fn list(status: Option<&str>) -> Result<()> {
    let filter = status.map(str::parse::<RequestStatus>).transpose()?;
    let (_, conn) = open()?;
    let requests = redemption::list_requests(&conn, filter)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Code", "Username", "Contact", "Status", "Notes", "Created"]);
    for r in &requests {
        let status = match r.status {
            RequestStatus::Pending => r.status.as_str().yellow(),
            RequestStatus::Processing => r.status.as_str().blue(),
            RequestStatus::Completed => r.status.as_str().green(),
            RequestStatus::Rejected => r.status.as_str().red(),
        };
        table.add_row(vec![
            Cell::new(&r.id),
            Cell::new(&r.code),
            Cell::new(&r.username),
            Cell::new(&r.contact_info),
            Cell::new(status),
            Cell::new(r.admin_notes.as_deref().unwrap_or_default()),
            Cell::new(&r.created_at),
        ]);
    }
    let pending = requests.iter().filter(|r| r.status == RequestStatus::Pending).count();
    println!("Requests ({pending} pending)\n{table}");
    Ok(())
}

pub fn set(id: &str, status: &str, notes: Option<&str>, issuer: &str) -> Result<()> {
    let status: RequestStatus = status.parse()?;
    let (settings, conn) = open()?;
    AdminChain::from_settings(&conn, &settings).authorize(issuer)?;
    redemption::set_status(&conn, id, status, notes)?;
    println!("Request {id} is now {status}");
    Ok(())
}
