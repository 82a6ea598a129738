// One-off voter import: reads a dni,name,course file and inserts voters
// with freshly generated one-time PINs. Existing dnis are left untouched.

use std::env;
use std::fs;

use anyhow::{bail, Context, Result};
use diesel::prelude::*;
use diesel::PgConnection;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use elections_backend::audit::generate_otp;
use elections_backend::models::NewVoter;
use elections_backend::schema::voters;

fn parse_voter_line(line: &str) -> Option<(String, String, String)> {
    let mut fields = line.split(',').map(str::trim);
    let dni = fields.next()?.to_string();
    let name = fields.next()?.to_string();
    let course = fields.next()?.to_string();
    if dni.is_empty() || name.is_empty() || course.is_empty() {
        return None;
    }
    Some((dni, name, course))
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let csv_path = env::var("CSV_PATH").unwrap_or_else(|_| "data/voters.csv".to_string());
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let text = fs::read_to_string(&csv_path)
        .with_context(|| format!("Failed to read voter file {csv_path}"))?;

    let rows: Vec<NewVoter> = text
        .lines()
        .filter_map(parse_voter_line)
        .map(|(dni, name, course)| NewVoter {
            dni,
            name,
            course,
            otp: generate_otp(),
        })
        .collect();

    if rows.is_empty() {
        bail!("No voter rows found in {csv_path}");
    }

    let mut conn =
        PgConnection::establish(&database_url).context("Failed to connect to the database")?;

    let mut inserted = 0;
    for row in &rows {
        inserted += diesel::insert_into(voters::table)
            .values(row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .with_context(|| format!("Failed to insert voter {}", row.dni))?;
    }

    info!(
        "imported {inserted} voters ({} duplicates skipped)",
        rows.len() - inserted
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_voter_line;

    #[test]
    fn parses_trimmed_fields() {
        assert_eq!(
            parse_voter_line(" 1001 , Ana Torres , T3A "),
            Some(("1001".into(), "Ana Torres".into(), "T3A".into()))
        );
    }

    #[test]
    fn rejects_short_or_blank_lines() {
        assert_eq!(parse_voter_line(""), None);
        assert_eq!(parse_voter_line("1001,Ana Torres"), None);
        assert_eq!(parse_voter_line("1001,,T3A"), None);
    }
}
