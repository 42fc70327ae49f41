use crate::cli::open;
use crate::error::Result;
use crate::redemption::{self, Submission};

pub fn run(code: &str, username: &str, contact: &str) -> Result<()> {
    let (settings, conn) = open()?;
    let submission = Submission {
        code,
        username,
        contact_info: contact,
    };
    let id = redemption::submit(&conn, &submission, settings.uppercase_keys)?;
    println!("Redemption request created: {id}");
    Ok(())
}
