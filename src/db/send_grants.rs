use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::address::EmailOrWildcard;
use crate::db::{expect_one, live_domain_id, live_remote_id, map_delete_err, one_or_not_found, DeleteOptions};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSendGrant {
	pub remote_name: String,
	pub domain_fqdn: String,
	pub domain_enabled: bool,
	/// SQL-LIKE pattern; None covers the whole domain.
	pub name: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct ListOptions<'a> {
	pub filter_remote_names: &'a [String],
	pub match_email: Option<&'a EmailOrWildcard>,
	pub include_deleted: bool,
	pub include_all: bool,
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<RemoteSendGrant>> {
	let mut sql = String::from(
		"SELECT r.name, d.fqdn, d.enabled, g.name, g.created_at, g.updated_at, g.deleted_at
		FROM remotes_send_grants g
		JOIN remotes r ON g.remote_id = r.id
		JOIN domains d ON g.domain_id = d.id",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if options.include_deleted {
		clauses.push("g.deleted_at IS NOT NULL".to_owned());
	} else if !options.include_all {
		clauses.push(
			"g.deleted_at IS NULL AND r.deleted_at IS NULL AND d.deleted_at IS NULL".to_owned(),
		);
	}
	if !options.filter_remote_names.is_empty() {
		clauses.push(format!("r.name = ANY(${})", params.len() + 1));
		params.push(&options.filter_remote_names);
	}
	if let Some(email) = options.match_email {
		if let Some(ref local_part) = email.local_part {
			clauses.push(format!(
				"d.fqdn = ${} AND (g.name = ${} OR g.name IS NULL)",
				params.len() + 1,
				params.len() + 2
			));
			params.push(&email.fqdn);
			params.push(local_part);
		} else {
			clauses.push(format!("d.fqdn = ${}", params.len() + 1));
			params.push(&email.fqdn);
		}
	}

	if !clauses.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&clauses.join(" AND "));
	}
	sql.push_str(" ORDER BY r.name, d.fqdn, g.name");

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		out.push(RemoteSendGrant {
			remote_name: row.get(0),
			domain_fqdn: row.get(1),
			domain_enabled: row.get(2),
			name: row.get(3),
			created_at: row.get(4),
			updated_at: row.get(5),
			deleted_at: row.get(6),
		});
	}
	Ok(out)
}

pub fn create(db: &mut impl GenericClient, remote_name: &str, email: &EmailOrWildcard) -> Result<()> {
	let remote_id = live_remote_id(db, remote_name)?;
	let domain_id = live_domain_id(db, &email.fqdn)?;
	let n = db.execute(
		"INSERT INTO remotes_send_grants (remote_id, domain_id, name) VALUES ($1, $2, $3)",
		&[&remote_id, &domain_id, &email.local_part],
	)?;
	expect_one(n)
}

fn edge_id(db: &mut impl GenericClient, remote_name: &str, email: &EmailOrWildcard) -> Result<i64> {
	let row = db.query_opt(
		"SELECT g.id FROM remotes_send_grants g
		JOIN remotes r ON g.remote_id = r.id
		JOIN domains d ON g.domain_id = d.id
		WHERE r.name = $1 AND d.fqdn = $2 AND g.name IS NOT DISTINCT FROM $3
		ORDER BY (g.deleted_at IS NOT NULL) LIMIT 1",
		&[&remote_name, &email.fqdn, &email.local_part],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::NotFound)
}

pub fn delete(
	db: &mut impl GenericClient,
	remote_name: &str,
	email: &EmailOrWildcard,
	options: &DeleteOptions,
) -> Result<()> {
	options.check()?;
	let id = edge_id(db, remote_name, email)?;

	let n = if options.permanent {
		db.execute("DELETE FROM remotes_send_grants WHERE id = $1", &[&id])
			.map_err(map_delete_err)?
	} else {
		let mut sql = String::from("UPDATE remotes_send_grants SET deleted_at = now() WHERE id = $1");
		if !options.force {
			sql.push_str(" AND deleted_at IS NULL");
		}
		db.execute(sql.as_str(), &[&id])?
	};
	one_or_not_found(n)
}

pub fn restore(db: &mut impl GenericClient, remote_name: &str, email: &EmailOrWildcard) -> Result<()> {
	let id = edge_id(db, remote_name, email)?;

	// both the remote and the granted domain must be live
	let row = db.query_one(
		"SELECT r.deleted_at IS NOT NULL OR d.deleted_at IS NOT NULL
		FROM remotes_send_grants g
		JOIN remotes r ON g.remote_id = r.id
		JOIN domains d ON g.domain_id = d.id
		WHERE g.id = $1",
		&[&id],
	)?;
	if row.get::<_, bool>(0) {
		return Err(Error::ParentDeleted);
	}

	one_or_not_found(db.execute(
		"UPDATE remotes_send_grants SET deleted_at = NULL WHERE id = $1",
		&[&id],
	)?)
}
