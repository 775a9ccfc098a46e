use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::address::EmailAddress;
use crate::db::{expect_one, live_domain_id, live_recipient_id, map_delete_err, one_or_not_found, DeleteOptions};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCatchallTarget {
	pub domain_fqdn: String,
	pub domain_enabled: bool,
	pub target_email: String,
	pub forwarding_enabled: bool,
	pub fallback_only: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug)]
pub struct CreateOptions {
	pub forward_enabled: bool,
	pub fallback_only: bool,
}

impl Default for CreateOptions {
	fn default() -> Self {
		// the column default is false; the CLI passes its own default of true
		CreateOptions {
			forward_enabled: true,
			fallback_only: false,
		}
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PatchOptions {
	pub forwarding: Option<bool>,
	pub fallback_only: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct ListOptions<'a> {
	pub filter_domains: &'a [String],
	pub include_deleted: bool,
	pub include_all: bool,
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<DomainCatchallTarget>> {
	let mut sql = String::from(
		"SELECT d.fqdn, d.enabled, rd.fqdn, r.name,
			c.forwarding_to_target_enabled, c.fallback_only,
			c.created_at, c.updated_at, c.deleted_at
		FROM domains_catchall_targets c
		JOIN domains d ON c.domain_id = d.id
		JOIN recipients r ON c.recipient_id = r.id
		JOIN domains rd ON r.domain_id = rd.id",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if options.include_deleted {
		clauses.push("c.deleted_at IS NOT NULL".to_owned());
	} else if !options.include_all {
		clauses.push("c.deleted_at IS NULL".to_owned());
	}
	if !options.filter_domains.is_empty() {
		clauses.push(format!("d.fqdn = ANY(${})", params.len() + 1));
		params.push(&options.filter_domains);
	}

	if !clauses.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&clauses.join(" AND "));
	}
	sql.push_str(" ORDER BY d.fqdn, rd.fqdn, r.name");

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		out.push(DomainCatchallTarget {
			domain_fqdn: row.get(0),
			domain_enabled: row.get(1),
			target_email: format!("{}@{}", row.get::<_, String>(3), row.get::<_, String>(2)),
			forwarding_enabled: row.get(4),
			fallback_only: row.get(5),
			created_at: row.get(6),
			updated_at: row.get(7),
			deleted_at: row.get(8),
		});
	}
	Ok(out)
}

pub fn create(
	db: &mut impl GenericClient,
	domain_fqdn: &str,
	target_email: &EmailAddress,
	options: &CreateOptions,
) -> Result<()> {
	let domain_id = live_domain_id(db, domain_fqdn)?;
	let recipient_id = live_recipient_id(db, target_email)?;
	let n = db.execute(
		"INSERT INTO domains_catchall_targets
			(domain_id, recipient_id, forwarding_to_target_enabled, fallback_only)
		VALUES ($1, $2, $3, $4)",
		&[&domain_id, &recipient_id, &options.forward_enabled, &options.fallback_only],
	)?;
	expect_one(n)
}

fn edge_id(
	db: &mut impl GenericClient,
	domain_fqdn: &str,
	target_email: &EmailAddress,
) -> Result<i64> {
	let row = db.query_opt(
		"SELECT c.id FROM domains_catchall_targets c
		JOIN domains d ON c.domain_id = d.id
		JOIN recipients r ON c.recipient_id = r.id
		JOIN domains rd ON r.domain_id = rd.id
		WHERE d.fqdn = $1 AND rd.fqdn = $2 AND r.name = $3
		ORDER BY (c.deleted_at IS NOT NULL) LIMIT 1",
		&[&domain_fqdn, &target_email.fqdn, &target_email.local_part],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::NotFound)
}

pub fn patch(
	db: &mut impl GenericClient,
	domain_fqdn: &str,
	target_email: &EmailAddress,
	options: &PatchOptions,
) -> Result<()> {
	let id = edge_id(db, domain_fqdn, target_email)?;

	let mut sets: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if let Some(ref forwarding) = options.forwarding {
		sets.push(format!("forwarding_to_target_enabled = ${}", params.len() + 1));
		params.push(forwarding);
	}
	if let Some(ref fallback_only) = options.fallback_only {
		sets.push(format!("fallback_only = ${}", params.len() + 1));
		params.push(fallback_only);
	}
	if sets.is_empty() {
		return Err(Error::AffectedRowsMismatch { expected: 1, got: 0 });
	}

	let sql = format!(
		"UPDATE domains_catchall_targets SET {} WHERE id = ${} AND deleted_at IS NULL",
		sets.join(", "),
		params.len() + 1
	);
	params.push(&id);

	one_or_not_found(db.execute(sql.as_str(), &params)?)
}

pub fn delete(
	db: &mut impl GenericClient,
	domain_fqdn: &str,
	target_email: &EmailAddress,
	options: &DeleteOptions,
) -> Result<()> {
	options.check()?;
	let id = edge_id(db, domain_fqdn, target_email)?;

	let n = if options.permanent {
		db.execute("DELETE FROM domains_catchall_targets WHERE id = $1", &[&id])
			.map_err(map_delete_err)?
	} else {
		let mut sql = String::from("UPDATE domains_catchall_targets SET deleted_at = now() WHERE id = $1");
		if !options.force {
			sql.push_str(" AND deleted_at IS NULL");
		}
		db.execute(sql.as_str(), &[&id])?
	};
	one_or_not_found(n)
}

pub fn restore(
	db: &mut impl GenericClient,
	domain_fqdn: &str,
	target_email: &EmailAddress,
) -> Result<()> {
	let id = edge_id(db, domain_fqdn, target_email)?;

	// both the source domain and the target recipient's domain must be live
	let row = db.query_one(
		"SELECT d.deleted_at IS NOT NULL OR rd.deleted_at IS NOT NULL
		FROM domains_catchall_targets c
		JOIN domains d ON c.domain_id = d.id
		JOIN recipients r ON c.recipient_id = r.id
		JOIN domains rd ON r.domain_id = rd.id
		WHERE c.id = $1",
		&[&id],
	)?;
	if row.get::<_, bool>(0) {
		return Err(Error::ParentDeleted);
	}

	one_or_not_found(db.execute(
		"UPDATE domains_catchall_targets SET deleted_at = NULL WHERE id = $1",
		&[&id],
	)?)
}
