use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::address::EmailAddress;
use crate::db::{expect_one, live_domain_id_and_type, map_delete_err, one_or_not_found, DeleteOptions};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alias {
	pub domain_fqdn: String,
	pub domain_enabled: bool,
	pub name: String,
	pub enabled: bool,
	pub target_count: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug)]
pub struct CreateOptions {
	pub enabled: bool,
}

impl Default for CreateOptions {
	fn default() -> Self {
		CreateOptions { enabled: true }
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PatchOptions {
	pub enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct ListOptions<'a> {
	pub filter_domains: &'a [String],
	pub by_email: Option<&'a EmailAddress>,
	pub include_deleted: bool,
	pub include_all: bool,
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<Alias>> {
	let mut sql = String::from(
		"SELECT d.fqdn, d.enabled, a.name, a.enabled,
			(SELECT COUNT(*) FROM aliases_targets t
				WHERE t.alias_id = a.id AND t.deleted_at IS NULL),
			a.created_at, a.updated_at, a.deleted_at
		FROM aliases a
		JOIN domains d ON a.domain_id = d.id",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if options.include_deleted {
		clauses.push("a.deleted_at IS NOT NULL".to_owned());
	} else if !options.include_all {
		clauses.push("a.deleted_at IS NULL AND d.deleted_at IS NULL".to_owned());
	}
	if !options.filter_domains.is_empty() {
		clauses.push(format!("d.fqdn = ANY(${})", params.len() + 1));
		params.push(&options.filter_domains);
	}
	if let Some(email) = options.by_email {
		clauses.push(format!(
			"d.fqdn = ${} AND a.name = ${}",
			params.len() + 1,
			params.len() + 2
		));
		params.push(&email.fqdn);
		params.push(&email.local_part);
	}

	if !clauses.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&clauses.join(" AND "));
	}
	if options.include_deleted {
		sql.push_str(" ORDER BY a.deleted_at");
	} else {
		sql.push_str(" ORDER BY d.fqdn, a.name");
	}

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		out.push(Alias {
			domain_fqdn: row.get(0),
			domain_enabled: row.get(1),
			name: row.get(2),
			enabled: row.get(3),
			target_count: row.get(4),
			created_at: row.get(5),
			updated_at: row.get(6),
			deleted_at: row.get(7),
		});
	}
	Ok(out)
}

/// Aliases live on managed, relayed or alias domains, never canonical ones.
fn live_alias_capable_domain_id(db: &mut impl GenericClient, fqdn: &str) -> Result<i64> {
	let (domain_id, domain_type) = live_domain_id_and_type(db, fqdn)?;
	if domain_type == "canonical" {
		return Err(Error::InvalidShape(
			"aliases may only live on managed, relayed or alias domains".to_owned(),
		));
	}
	Ok(domain_id)
}

pub fn create(db: &mut impl GenericClient, email: &EmailAddress, options: &CreateOptions) -> Result<()> {
	let domain_id = live_alias_capable_domain_id(db, &email.fqdn)?;
	let n = db.execute(
		"INSERT INTO aliases (domain_id, name, enabled) VALUES ($1, $2, $3)",
		&[&domain_id, &email.local_part, &options.enabled],
	)?;
	expect_one(n)
}

pub fn patch(db: &mut impl GenericClient, email: &EmailAddress, options: &PatchOptions) -> Result<()> {
	let enabled = match options.enabled {
		Some(enabled) => enabled,
		None => return Err(Error::AffectedRowsMismatch { expected: 1, got: 0 }),
	};
	let n = db.execute(
		"UPDATE aliases SET enabled = $1
		WHERE domain_id = (SELECT id FROM domains WHERE fqdn = $2 AND deleted_at IS NULL)
			AND name = $3 AND deleted_at IS NULL",
		&[&enabled, &email.fqdn, &email.local_part],
	)?;
	one_or_not_found(n)
}

pub fn rename(db: &mut impl GenericClient, old: &EmailAddress, new: &EmailAddress) -> Result<()> {
	let old_domain_id = live_alias_capable_domain_id(db, &old.fqdn)?;
	let new_domain_id = live_alias_capable_domain_id(db, &new.fqdn)?;
	let n = db.execute(
		"UPDATE aliases SET domain_id = $1, name = $2
		WHERE domain_id = $3 AND name = $4 AND deleted_at IS NULL",
		&[&new_domain_id, &new.local_part, &old_domain_id, &old.local_part],
	)?;
	one_or_not_found(n)
}

pub fn delete(db: &mut impl GenericClient, email: &EmailAddress, options: &DeleteOptions) -> Result<()> {
	options.check()?;
	let n = if options.permanent {
		db.execute(
			"DELETE FROM aliases
			WHERE domain_id = (SELECT id FROM domains WHERE fqdn = $1
				ORDER BY (deleted_at IS NOT NULL) LIMIT 1)
				AND name = $2",
			&[&email.fqdn, &email.local_part],
		)
		.map_err(map_delete_err)?
	} else {
		let mut sql = String::from(
			"UPDATE aliases SET deleted_at = now()
			WHERE domain_id = (SELECT id FROM domains WHERE fqdn = $1
				ORDER BY (deleted_at IS NOT NULL) LIMIT 1)
				AND name = $2",
		);
		if !options.force {
			sql.push_str(" AND deleted_at IS NULL");
		}
		db.execute(sql.as_str(), &[&email.fqdn, &email.local_part])?
	};
	one_or_not_found(n)
}

pub fn restore(db: &mut impl GenericClient, email: &EmailAddress) -> Result<()> {
	let n = db.execute(
		"UPDATE aliases SET deleted_at = NULL
		WHERE domain_id = (SELECT id FROM domains WHERE fqdn = $1 AND deleted_at IS NULL)
			AND name = $2",
		&[&email.fqdn, &email.local_part],
	)?;
	if n == 1 {
		return Ok(());
	}
	if n > 1 {
		return Err(Error::AffectedRowsMismatch { expected: 1, got: n });
	}

	let row = db.query_opt(
		"SELECT d.deleted_at IS NOT NULL FROM aliases a
		JOIN domains d ON a.domain_id = d.id
		WHERE d.fqdn = $1 AND a.name = $2
		LIMIT 1",
		&[&email.fqdn, &email.local_part],
	)?;
	match row {
		Some(row) if row.get::<_, bool>(0) => Err(Error::ParentDeleted),
		Some(_) => Err(Error::AffectedRowsMismatch { expected: 1, got: n }),
		None => Err(Error::NotFound),
	}
}
