use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::db::{expect_one, map_delete_err, one_or_not_found, DeleteOptions};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
	pub name: String,
	pub method: String,
	pub host: String,
	pub port: Option<u16>,
	pub mx_lookup: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
	pub method: String,
	pub host: String,
	pub port: Option<u16>,
	pub mx_lookup: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PatchOptions {
	pub method: Option<String>,
	pub host: Option<String>,
	pub port: Option<Option<u16>>,
	pub mx_lookup: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ListOptions<'a> {
	pub by_name: Option<&'a str>,
	pub include_deleted: bool,
	pub include_all: bool,
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<Transport>> {
	let mut sql = String::from(
		"SELECT name, method, host, port, mx_lookup, created_at, updated_at, deleted_at
		FROM transports",
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
		sql.push_str(" ORDER BY name, method, host, port");
	}

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		out.push(Transport {
			name: row.get(0),
			method: row.get(1),
			host: row.get(2),
			port: row.get::<_, Option<i32>>(3).map(|p| p as u16),
			mx_lookup: row.get(4),
			created_at: row.get(5),
			updated_at: row.get(6),
			deleted_at: row.get(7),
		});
	}
	Ok(out)
}

pub fn create(db: &mut impl GenericClient, name: &str, options: &CreateOptions) -> Result<()> {
	let port = options.port.map(|p| p as i32);
	let n = db.execute(
		"INSERT INTO transports (name, method, host, port, mx_lookup)
		VALUES ($1, $2, $3, $4, $5)",
		&[&name, &options.method, &options.host, &port, &options.mx_lookup],
	)?;
	expect_one(n)
}

pub fn patch(db: &mut impl GenericClient, name: &str, options: &PatchOptions) -> Result<()> {
	let port = options.port.map(|p| p.map(|p| p as i32));

	let mut sets: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if let Some(ref method) = options.method {
		sets.push(format!("method = ${}", params.len() + 1));
		params.push(method);
	}
	if let Some(ref host) = options.host {
		sets.push(format!("host = ${}", params.len() + 1));
		params.push(host);
	}
	if let Some(ref port) = port {
		sets.push(format!("port = ${}", params.len() + 1));
		params.push(port);
	}
	if let Some(ref mx_lookup) = options.mx_lookup {
		sets.push(format!("mx_lookup = ${}", params.len() + 1));
		params.push(mx_lookup);
	}
	if sets.is_empty() {
		return Err(Error::AffectedRowsMismatch { expected: 1, got: 0 });
	}

	let sql = format!(
		"UPDATE transports SET {} WHERE name = ${} AND deleted_at IS NULL",
		sets.join(", "),
		params.len() + 1
	);
	params.push(&name);

	one_or_not_found(db.execute(sql.as_str(), &params)?)
}

pub fn rename(db: &mut impl GenericClient, old_name: &str, new_name: &str) -> Result<()> {
	let n = db.execute(
		"UPDATE transports SET name = $1 WHERE name = $2 AND deleted_at IS NULL",
		&[&new_name, &old_name],
	)?;
	one_or_not_found(n)
}

pub fn delete(db: &mut impl GenericClient, name: &str, options: &DeleteOptions) -> Result<()> {
	options.check()?;
	let n = if options.permanent {
		db.execute("DELETE FROM transports WHERE name = $1", &[&name])
			.map_err(map_delete_err)?
	} else if options.force {
		db.execute("UPDATE transports SET deleted_at = now() WHERE name = $1", &[&name])?
	} else {
		db.execute(
			"UPDATE transports SET deleted_at = now() WHERE name = $1 AND deleted_at IS NULL",
			&[&name],
		)?
	};
	one_or_not_found(n)
}

pub fn restore(db: &mut impl GenericClient, name: &str) -> Result<()> {
	let n = db.execute("UPDATE transports SET deleted_at = NULL WHERE name = $1", &[&name])?;
	one_or_not_found(n)
}
