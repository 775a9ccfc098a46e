use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::address::EmailAddress;
use crate::db::{expect_one, map_delete_err, one_or_not_found, DeleteOptions};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRelayed {
	pub domain_fqdn: String,
	pub domain_enabled: bool,
	pub name: String,
	pub enabled: bool,
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

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<RecipientRelayed>> {
	let mut sql = String::from(
		"SELECT d.fqdn, d.enabled, r.name, r.enabled, r.created_at, r.updated_at, r.deleted_at
		FROM recipients_relayed r
		JOIN domains_relayed d ON r.domain_id = d.id",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if options.include_deleted {
		clauses.push("r.deleted_at IS NOT NULL".to_owned());
	} else if !options.include_all {
		clauses.push("r.deleted_at IS NULL AND d.deleted_at IS NULL".to_owned());
	}
	if !options.filter_domains.is_empty() {
		clauses.push(format!("d.fqdn = ANY(${})", params.len() + 1));
		params.push(&options.filter_domains);
	}
	if let Some(email) = options.by_email {
		clauses.push(format!(
			"d.fqdn = ${} AND r.name = ${}",
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
		sql.push_str(" ORDER BY r.deleted_at");
	} else {
		sql.push_str(" ORDER BY d.fqdn, r.name");
	}

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		out.push(RecipientRelayed {
			domain_fqdn: row.get(0),
			domain_enabled: row.get(1),
			name: row.get(2),
			enabled: row.get(3),
			created_at: row.get(4),
			updated_at: row.get(5),
			deleted_at: row.get(6),
		});
	}
	Ok(out)
}

fn live_relayed_domain_id(db: &mut impl GenericClient, fqdn: &str) -> Result<i64> {
	let row = db.query_opt(
		"SELECT id FROM domains_relayed WHERE fqdn = $1 AND deleted_at IS NULL",
		&[&fqdn],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::ParentMissing)
}

pub fn create(db: &mut impl GenericClient, email: &EmailAddress, options: &CreateOptions) -> Result<()> {
	let domain_id = live_relayed_domain_id(db, &email.fqdn)?;
	let n = db.execute(
		"INSERT INTO recipients_relayed (domain_id, name, enabled) VALUES ($1, $2, $3)",
		&[&domain_id, &email.local_part, &options.enabled],
	)?;
	expect_one(n)
}

pub fn patch(db: &mut impl GenericClient, email: &EmailAddress, options: &PatchOptions) -> Result<()> {
	let domain_id = live_relayed_domain_id(db, &email.fqdn)?;
	let enabled = match options.enabled {
		Some(enabled) => enabled,
		None => return Err(Error::AffectedRowsMismatch { expected: 1, got: 0 }),
	};
	let n = db.execute(
		"UPDATE recipients_relayed SET enabled = $1
		WHERE domain_id = $2 AND name = $3 AND deleted_at IS NULL",
		&[&enabled, &domain_id, &email.local_part],
	)?;
	one_or_not_found(n)
}

pub fn rename(db: &mut impl GenericClient, old: &EmailAddress, new: &EmailAddress) -> Result<()> {
	let old_domain_id = live_relayed_domain_id(db, &old.fqdn)?;
	let new_domain_id = live_relayed_domain_id(db, &new.fqdn)?;
	let n = db.execute(
		"UPDATE recipients_relayed SET domain_id = $1, name = $2
		WHERE domain_id = $3 AND name = $4 AND deleted_at IS NULL",
		&[&new_domain_id, &new.local_part, &old_domain_id, &old.local_part],
	)?;
	one_or_not_found(n)
}

pub fn delete(db: &mut impl GenericClient, email: &EmailAddress, options: &DeleteOptions) -> Result<()> {
	options.check()?;
	let n = if options.permanent {
		db.execute(
			"DELETE FROM recipients_relayed
			WHERE domain_id = (SELECT id FROM domains_relayed WHERE fqdn = $1
				ORDER BY (deleted_at IS NOT NULL) LIMIT 1)
				AND name = $2",
			&[&email.fqdn, &email.local_part],
		)
		.map_err(map_delete_err)?
	} else {
		let mut sql = String::from(
			"UPDATE recipients_relayed SET deleted_at = now()
			WHERE domain_id = (SELECT id FROM domains_relayed WHERE fqdn = $1
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
		"UPDATE recipients_relayed SET deleted_at = NULL
		WHERE domain_id = (SELECT id FROM domains_relayed WHERE fqdn = $1 AND deleted_at IS NULL)
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
		"SELECT d.deleted_at IS NOT NULL FROM recipients_relayed r
		JOIN domains_relayed d ON r.domain_id = d.id
		WHERE d.fqdn = $1 AND r.name = $2
		LIMIT 1",
		&[&email.fqdn, &email.local_part],
	)?;
	match row {
		Some(row) if row.get::<_, bool>(0) => Err(Error::ParentDeleted),
		Some(_) => Err(Error::AffectedRowsMismatch { expected: 1, got: n }),
		None => Err(Error::NotFound),
	}
}
