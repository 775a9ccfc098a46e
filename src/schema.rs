use log::info;
use postgres::{Client, GenericClient};

use crate::error::{Error, Result};

/// Migrations in ascending order. Each entry is one schema version; its
/// statements run in order inside the single upgrade transaction.
const MIGRATIONS: &[(i32, &[&str])] = &[(
	1,
	&[
		include_str!("schema_sql/v1_tables.sql"),
		include_str!("schema_sql/v1_views.sql"),
		include_str!("schema_sql/v1_triggers.sql"),
	],
)];

pub fn latest_version() -> i32 {
	MIGRATIONS.last().map(|(id, _)| *id).unwrap_or(0)
}

/// Current schema version of the database, 0 for a pristine database.
pub fn current_version(db: &mut impl GenericClient) -> Result<i32> {
	let row = db.query_one(
		"SELECT EXISTS (
			SELECT 1 FROM information_schema.tables
			WHERE table_schema = 'meta' AND table_name = 'schema_version'
		)",
		&[],
	)?;
	if !row.get::<_, bool>(0) {
		return Ok(0);
	}

	let row = db.query_one("SELECT COALESCE(MAX(id), 0) FROM meta.schema_version", &[])?;
	Ok(row.get(0))
}

/// Applies every migration newer than the current version up to `target`,
/// all in one transaction, recording each applied ID in meta.schema_version.
pub fn upgrade(client: &mut Client, target: i32) -> Result<()> {
	if target <= 0 {
		return Err(Error::InputInvalid(format!("invalid target schema version: {}", target)));
	}
	if target > latest_version() {
		return Err(Error::InputInvalid(format!(
			"target schema version {} is greater than latest available version {}",
			target,
			latest_version()
		)));
	}

	let mut tx = client.transaction()?;

	tx.batch_execute(
		"CREATE SCHEMA IF NOT EXISTS meta;
		CREATE TABLE IF NOT EXISTS meta.schema_version (
			id INTEGER PRIMARY KEY,
			applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
		);",
	)?;

	let current = current_version(&mut tx)?;

	for &(id, statements) in MIGRATIONS {
		if id <= current || id > target {
			continue;
		}
		info!("applying schema version {}", id);
		for sql in statements {
			tx.batch_execute(sql)?;
		}
		tx.execute("INSERT INTO meta.schema_version (id) VALUES ($1)", &[&id])?;
	}

	tx.commit()?;
	Ok(())
}

/// Drops everything this tool ever created. Irreversible.
pub fn purge(client: &mut Client) -> Result<()> {
	let mut tx = client.transaction()?;
	tx.batch_execute(
		"DROP SCHEMA IF EXISTS audit CASCADE;
		DROP SCHEMA IF EXISTS meta CASCADE;
		DROP SCHEMA IF EXISTS public CASCADE;
		CREATE SCHEMA public;",
	)?;
	tx.commit()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn migrations_are_strictly_ascending() {
		let mut last = 0;
		for &(id, statements) in MIGRATIONS {
			assert!(id > last, "migration IDs must ascend: {} after {}", id, last);
			assert!(!statements.is_empty());
			last = id;
		}
		assert_eq!(latest_version(), last);
	}
}
