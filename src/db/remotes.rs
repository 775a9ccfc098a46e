use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::auth;
use crate::db::{expect_one, map_delete_err, one_or_not_found, DeleteOptions};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
	pub name: String,
	pub enabled: bool,
	pub password_set: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct CreateOptions {
	pub password_hash: Option<String>,
	pub enabled: bool,
}

impl Default for CreateOptions {
	fn default() -> Self {
		CreateOptions {
			password_hash: None,
			enabled: true,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct PatchOptions {
	pub password_hash: Option<Option<String>>,
	pub enabled: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ListOptions<'a> {
	pub by_name: Option<&'a str>,
	pub include_deleted: bool,
	pub include_all: bool,
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<Remote>> {
	let mut sql = String::from(
		"SELECT name, enabled, password_hash IS NOT NULL, created_at, updated_at, deleted_at
		FROM remotes",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if options.include_deleted {
		clauses.push("deleted_at IS NOT NULL".to_owned());
	} else if !options.include_all {
		clauses.push("deleted_at IS NULL".to_owned());
	}
	if let Some(ref name) = options.by_name {
		clauses.push(format!("name = ${}", params.len() + 1));
		params.push(name);
	}

	if !clauses.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&clauses.join(" AND "));
	}
	if options.include_deleted {
		sql.push_str(" ORDER BY deleted_at");
	} else {
		sql.push_str(" ORDER BY name");
	}

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		out.push(Remote {
			name: row.get(0),
			enabled: row.get(1),
			password_set: row.get(2),
			created_at: row.get(3),
			updated_at: row.get(4),
			deleted_at: row.get(5),
		});
	}
	Ok(out)
}

pub fn authenticate(db: &mut impl GenericClient, name: &str, given_password: &str) -> Result<bool> {
	let row = db.query_opt(
		"SELECT password_hash FROM remotes WHERE name = $1 AND deleted_at IS NULL",
		&[&name],
	)?;
	let stored: Option<String> = match row {
		Some(row) => row.get(0),
		None => return Ok(false),
	};
	auth::verify_password(stored.as_deref(), given_password)
}

pub fn create(db: &mut impl GenericClient, name: &str, options: &CreateOptions) -> Result<()> {
	let n = db.execute(
		"INSERT INTO remotes (name, password_hash, enabled) VALUES ($1, $2, $3)",
		&[&name, &options.password_hash, &options.enabled],
	)?;
	expect_one(n)
}

pub fn patch(db: &mut impl GenericClient, name: &str, options: &PatchOptions) -> Result<()> {
	let mut sets: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if let Some(ref password_hash) = options.password_hash {
		sets.push(format!("password_hash = ${}", params.len() + 1));
		params.push(password_hash);
	}
	if let Some(ref enabled) = options.enabled {
		sets.push(format!("enabled = ${}", params.len() + 1));
		params.push(enabled);
	}
	if sets.is_empty() {
		return Err(Error::AffectedRowsMismatch { expected: 1, got: 0 });
	}

	let sql = format!(
		"UPDATE remotes SET {} WHERE name = ${} AND deleted_at IS NULL",
		sets.join(", "),
		params.len() + 1
	);
	params.push(&name);

	one_or_not_found(db.execute(sql.as_str(), &params)?)
}

pub fn rename(db: &mut impl GenericClient, old_name: &str, new_name: &str) -> Result<()> {
	let n = db.execute(
		"UPDATE remotes SET name = $1 WHERE name = $2 AND deleted_at IS NULL",
		&[&new_name, &old_name],
	)?;
	one_or_not_found(n)
}

pub fn delete(db: &mut impl GenericClient, name: &str, options: &DeleteOptions) -> Result<()> {
	options.check()?;
	let n = if options.permanent {
		db.execute("DELETE FROM remotes WHERE name = $1", &[&name])
			.map_err(map_delete_err)?
	} else if options.force {
		db.execute("UPDATE remotes SET deleted_at = now() WHERE name = $1", &[&name])?
	} else {
		db.execute(
			"UPDATE remotes SET deleted_at = now() WHERE name = $1 AND deleted_at IS NULL",
			&[&name],
		)?
	};
	one_or_not_found(n)
}

pub fn restore(db: &mut impl GenericClient, name: &str) -> Result<()> {
	let n = db.execute("UPDATE remotes SET deleted_at = NULL WHERE name = $1", &[&name])?;
	one_or_not_found(n)
}
