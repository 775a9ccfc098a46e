use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::address::EmailAddress;
use crate::db::{expect_one, live_alias_id, live_recipient_id, map_delete_err, one_or_not_found, DeleteOptions};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasTarget {
	pub alias_email: String,
	pub target_email: String,
	pub is_foreign: bool,
	pub forwarding_enabled: bool,
	/// Always false for foreign targets.
	pub sending_enabled: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<DateTime<Utc>>,
	#[serde(skip)]
	pub alias_enabled: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct CreateOptions {
	pub forward_enabled: bool,
	pub send_enabled: bool,
}

impl Default for CreateOptions {
	fn default() -> Self {
		CreateOptions {
			forward_enabled: true,
			send_enabled: false,
		}
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PatchOptions {
	pub forwarding: Option<bool>,
	pub sending: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct ListOptions<'a> {
	pub filter_aliases: &'a [EmailAddress],
	pub include_deleted: bool,
	pub include_all: bool,
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<AliasTarget>> {
	let mut sql = String::from(
		"SELECT ad.fqdn, a.name, a.enabled, t.fqdn, t.name,
			t.type = 'foreign',
			t.forwarding_to_target_enabled,
			COALESCE(t.sending_from_target_enabled, false),
			t.created_at, t.updated_at, t.deleted_at
		FROM aliases_targets t
		JOIN aliases a ON t.alias_id = a.id
		JOIN domains ad ON a.domain_id = ad.id",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if options.include_deleted {
		clauses.push("t.deleted_at IS NOT NULL".to_owned());
	} else if !options.include_all {
		clauses.push("t.deleted_at IS NULL".to_owned());
	}

	let alias_fqdns: Vec<String> = options.filter_aliases.iter().map(|e| e.fqdn.clone()).collect();
	let alias_names: Vec<String> =
		options.filter_aliases.iter().map(|e| e.local_part.clone()).collect();
	if !options.filter_aliases.is_empty() {
		clauses.push(format!(
			"(ad.fqdn, a.name) IN (SELECT * FROM unnest(${}::TEXT[], ${}::TEXT[]))",
			params.len() + 1,
			params.len() + 2
		));
		params.push(&alias_fqdns);
		params.push(&alias_names);
	}

	if !clauses.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&clauses.join(" AND "));
	}
	if options.include_deleted {
		sql.push_str(" ORDER BY t.deleted_at DESC");
	} else {
		sql.push_str(" ORDER BY ad.fqdn, a.name, t.fqdn, t.name");
	}

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		out.push(AliasTarget {
			alias_email: format!("{}@{}", row.get::<_, String>(1), row.get::<_, String>(0)),
			target_email: format!("{}@{}", row.get::<_, String>(4), row.get::<_, String>(3)),
			alias_enabled: row.get(2),
			is_foreign: row.get(5),
			forwarding_enabled: row.get(6),
			sending_enabled: row.get(7),
			created_at: row.get(8),
			updated_at: row.get(9),
			deleted_at: row.get(10),
		});
	}
	Ok(out)
}

/// A target lands in the recursive table when its domain is in the store
/// and in the foreign table otherwise.
pub fn create(
	db: &mut impl GenericClient,
	alias_email: &EmailAddress,
	target_email: &EmailAddress,
	options: &CreateOptions,
) -> Result<()> {
	let alias_id = live_alias_id(db, alias_email)?;

	let target_domain_exists = db
		.query_opt(
			"SELECT 1 FROM domains WHERE fqdn = $1 AND deleted_at IS NULL",
			&[&target_email.fqdn],
		)?
		.is_some();

	let n = if target_domain_exists {
		let recipient_id = live_recipient_id(db, target_email)?;
		db.execute(
			"INSERT INTO aliases_targets_recursive
				(alias_id, recipient_id, forwarding_to_target_enabled, sending_from_target_enabled)
			VALUES ($1, $2, $3, $4)",
			&[&alias_id, &recipient_id, &options.forward_enabled, &options.send_enabled],
		)?
	} else {
		if options.send_enabled {
			return Err(Error::InvalidShape(
				"sending from foreign targets is not supported".to_owned(),
			));
		}
		db.execute(
			"INSERT INTO aliases_targets_foreign
				(alias_id, fqdn, name, forwarding_to_target_enabled)
			VALUES ($1, $2, $3, $4)",
			&[&alias_id, &target_email.fqdn, &target_email.local_part, &options.forward_enabled],
		)?
	};
	expect_one(n)
}

/// Edge row ID plus whether it lives in the foreign table, soft-deleted
/// rows included (delete --force and restore need them).
fn id_and_kind(
	db: &mut impl GenericClient,
	alias_email: &EmailAddress,
	target_email: &EmailAddress,
) -> Result<(i64, bool)> {
	let row = db.query_opt(
		"SELECT t.id FROM aliases_targets_recursive t
		JOIN aliases a ON t.alias_id = a.id
		JOIN domains ad ON a.domain_id = ad.id
		JOIN recipients r ON t.recipient_id = r.id
		JOIN domains rd ON r.domain_id = rd.id
		WHERE ad.fqdn = $1 AND a.name = $2 AND rd.fqdn = $3 AND r.name = $4
		ORDER BY (t.deleted_at IS NOT NULL) LIMIT 1",
		&[&alias_email.fqdn, &alias_email.local_part, &target_email.fqdn, &target_email.local_part],
	)?;
	if let Some(row) = row {
		return Ok((row.get(0), false));
	}

	let row = db.query_opt(
		"SELECT t.id FROM aliases_targets_foreign t
		JOIN aliases a ON t.alias_id = a.id
		JOIN domains ad ON a.domain_id = ad.id
		WHERE ad.fqdn = $1 AND a.name = $2 AND t.fqdn = $3 AND t.name = $4
		ORDER BY (t.deleted_at IS NOT NULL) LIMIT 1",
		&[&alias_email.fqdn, &alias_email.local_part, &target_email.fqdn, &target_email.local_part],
	)?;
	match row {
		Some(row) => Ok((row.get(0), true)),
		None => Err(Error::NotFound),
	}
}

pub fn patch(
	db: &mut impl GenericClient,
	alias_email: &EmailAddress,
	target_email: &EmailAddress,
	options: &PatchOptions,
) -> Result<()> {
	let (target_id, is_foreign) = id_and_kind(db, alias_email, target_email)?;

	if is_foreign && options.sending.is_some() {
		return Err(Error::InvalidShape(
			"foreign targets have no sending flag".to_owned(),
		));
	}

	let mut sets: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if let Some(ref forwarding) = options.forwarding {
		sets.push(format!("forwarding_to_target_enabled = ${}", params.len() + 1));
		params.push(forwarding);
	}
	if let Some(ref sending) = options.sending {
		sets.push(format!("sending_from_target_enabled = ${}", params.len() + 1));
		params.push(sending);
	}
	if sets.is_empty() {
		return Err(Error::AffectedRowsMismatch { expected: 1, got: 0 });
	}

	let table = if is_foreign { "aliases_targets_foreign" } else { "aliases_targets_recursive" };
	let sql = format!(
		"UPDATE {} SET {} WHERE id = ${} AND deleted_at IS NULL",
		table,
		sets.join(", "),
		params.len() + 1
	);
	params.push(&target_id);

	one_or_not_found(db.execute(sql.as_str(), &params)?)
}

pub fn delete(
	db: &mut impl GenericClient,
	alias_email: &EmailAddress,
	target_email: &EmailAddress,
	options: &DeleteOptions,
) -> Result<()> {
	options.check()?;
	let (target_id, is_foreign) = id_and_kind(db, alias_email, target_email)?;
	let table = if is_foreign { "aliases_targets_foreign" } else { "aliases_targets_recursive" };

	let n = if options.permanent {
		let sql = format!("DELETE FROM {} WHERE id = $1", table);
		db.execute(sql.as_str(), &[&target_id]).map_err(map_delete_err)?
	} else {
		let mut sql = format!("UPDATE {} SET deleted_at = now() WHERE id = $1", table);
		if !options.force {
			sql.push_str(" AND deleted_at IS NULL");
		}
		db.execute(sql.as_str(), &[&target_id])?
	};
	one_or_not_found(n)
}

pub fn restore(
	db: &mut impl GenericClient,
	alias_email: &EmailAddress,
	target_email: &EmailAddress,
) -> Result<()> {
	let (target_id, is_foreign) = id_and_kind(db, alias_email, target_email)?;
	let table = if is_foreign { "aliases_targets_foreign" } else { "aliases_targets_recursive" };

	// refuse while the alias itself is still soft-deleted
	let sql = format!(
		"SELECT a.deleted_at IS NOT NULL FROM {} t
		JOIN aliases a ON t.alias_id = a.id WHERE t.id = $1",
		table
	);
	let alias_deleted: bool = db.query_one(sql.as_str(), &[&target_id])?.get(0);
	if alias_deleted {
		return Err(Error::ParentDeleted);
	}

	let sql = format!("UPDATE {} SET deleted_at = NULL WHERE id = $1", table);
	one_or_not_found(db.execute(sql.as_str(), &[&target_id])?)
}
