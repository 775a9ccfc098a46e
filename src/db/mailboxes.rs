use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::address::EmailAddress;
use crate::auth;
use crate::db::{
	expect_one, live_transport_id, map_delete_err, one_or_not_found, DeleteOptions,
};
use crate::error::{Error, Result};
use crate::resolve::transport_string;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
	pub domain_fqdn: String,
	pub domain_enabled: bool,
	pub name: String,
	pub login_enabled: bool,
	pub receiving_enabled: bool,
	pub sending_enabled: bool,
	pub password_set: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub storage_quota: Option<i32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transport: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transport_name: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct CreateOptions {
	pub password_hash: Option<String>,
	pub quota: Option<i32>,
	pub transport_name: Option<String>,
	pub login_enabled: bool,
	pub receiving_enabled: bool,
	pub sending_enabled: bool,
}

impl Default for CreateOptions {
	fn default() -> Self {
		CreateOptions {
			password_hash: None,
			quota: None,
			transport_name: None,
			login_enabled: true,
			receiving_enabled: true,
			sending_enabled: true,
		}
	}
}

/// Inner None clears the value, outer None leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct PatchOptions {
	pub password_hash: Option<Option<String>>,
	pub quota: Option<Option<i32>>,
	pub transport_name: Option<Option<String>>,
	pub login: Option<bool>,
	pub receiving: Option<bool>,
	pub sending: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct ListOptions<'a> {
	pub filter_domains: &'a [String],
	pub by_email: Option<&'a EmailAddress>,
	pub include_deleted: bool,
	pub include_all: bool,
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<Mailbox>> {
	let mut sql = String::from(
		"SELECT d.fqdn, d.enabled, m.name,
			m.login_enabled, m.receiving_enabled, m.sending_enabled,
			m.password_hash IS NOT NULL,
			m.storage_quota,
			t.name, t.method, t.host, t.port, t.mx_lookup,
			m.created_at, m.updated_at, m.deleted_at
		FROM mailboxes m
		JOIN domains_managed d ON m.domain_id = d.id
		LEFT JOIN transports t ON m.transport_id = t.id",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if options.include_deleted {
		clauses.push("m.deleted_at IS NOT NULL".to_owned());
	} else if !options.include_all {
		clauses.push("m.deleted_at IS NULL AND d.deleted_at IS NULL".to_owned());
	}
	if !options.filter_domains.is_empty() {
		clauses.push(format!("d.fqdn = ANY(${})", params.len() + 1));
		params.push(&options.filter_domains);
	}
	if let Some(email) = options.by_email {
		clauses.push(format!(
			"d.fqdn = ${} AND m.name = ${}",
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
		sql.push_str(" ORDER BY m.deleted_at");
	} else {
		sql.push_str(" ORDER BY d.fqdn, m.name");
	}

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		let transport_name: Option<String> = row.get(8);
		let transport = transport_name.as_ref().map(|_| {
			transport_string(
				row.get::<_, String>(9).as_str(),
				row.get::<_, String>(10).as_str(),
				row.get::<_, Option<i32>>(11).map(|p| p as u16),
				row.get(12),
			)
		});
		out.push(Mailbox {
			domain_fqdn: row.get(0),
			domain_enabled: row.get(1),
			name: row.get(2),
			login_enabled: row.get(3),
			receiving_enabled: row.get(4),
			sending_enabled: row.get(5),
			password_set: row.get(6),
			storage_quota: row.get(7),
			transport,
			transport_name,
			created_at: row.get(13),
			updated_at: row.get(14),
			deleted_at: row.get(15),
		});
	}
	Ok(out)
}

/// Password check against the stored hash; the caller decides what a
/// failed or missing login means and records the audit row.
pub fn authenticate(
	db: &mut impl GenericClient,
	email: &EmailAddress,
	given_password: &str,
) -> Result<bool> {
	let row = db.query_opt(
		"SELECT m.password_hash FROM mailboxes m
		JOIN domains_managed d ON m.domain_id = d.id
		WHERE d.fqdn = $1 AND d.deleted_at IS NULL
			AND m.name = $2 AND m.deleted_at IS NULL",
		&[&email.fqdn, &email.local_part],
	)?;
	let stored: Option<String> = match row {
		Some(row) => row.get(0),
		None => return Ok(false),
	};
	auth::verify_password(stored.as_deref(), given_password)
}

fn live_managed_domain_id(db: &mut impl GenericClient, fqdn: &str) -> Result<i64> {
	let row = db.query_opt(
		"SELECT id FROM domains_managed WHERE fqdn = $1 AND deleted_at IS NULL",
		&[&fqdn],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::ParentMissing)
}

pub fn create(db: &mut impl GenericClient, email: &EmailAddress, options: &CreateOptions) -> Result<()> {
	let domain_id = live_managed_domain_id(db, &email.fqdn)?;
	let transport_id = match options.transport_name.as_deref() {
		Some(name) => Some(live_transport_id(db, name)?),
		None => None,
	};

	let n = db.execute(
		"INSERT INTO mailboxes
			(domain_id, name, password_hash, storage_quota, transport_id,
			login_enabled, receiving_enabled, sending_enabled)
		VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
		&[
			&domain_id,
			&email.local_part,
			&options.password_hash,
			&options.quota,
			&transport_id,
			&options.login_enabled,
			&options.receiving_enabled,
			&options.sending_enabled,
		],
	)?;
	expect_one(n)
}

pub fn patch(db: &mut impl GenericClient, email: &EmailAddress, options: &PatchOptions) -> Result<()> {
	let domain_id = live_managed_domain_id(db, &email.fqdn)?;
	let transport_id = match options.transport_name.as_ref() {
		Some(Some(name)) => Some(Some(live_transport_id(db, name)?)),
		Some(None) => Some(None),
		None => None,
	};

	let mut sets: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if let Some(ref password_hash) = options.password_hash {
		sets.push(format!("password_hash = ${}", params.len() + 1));
		params.push(password_hash);
	}
	if let Some(ref quota) = options.quota {
		sets.push(format!("storage_quota = ${}", params.len() + 1));
		params.push(quota);
	}
	if let Some(ref transport_id) = transport_id {
		sets.push(format!("transport_id = ${}", params.len() + 1));
		params.push(transport_id);
	}
	if let Some(ref login) = options.login {
		sets.push(format!("login_enabled = ${}", params.len() + 1));
		params.push(login);
	}
	if let Some(ref receiving) = options.receiving {
		sets.push(format!("receiving_enabled = ${}", params.len() + 1));
		params.push(receiving);
	}
	if let Some(ref sending) = options.sending {
		sets.push(format!("sending_enabled = ${}", params.len() + 1));
		params.push(sending);
	}
	if sets.is_empty() {
		return Err(Error::AffectedRowsMismatch { expected: 1, got: 0 });
	}

	let sql = format!(
		"UPDATE mailboxes SET {} WHERE domain_id = ${} AND name = ${} AND deleted_at IS NULL",
		sets.join(", "),
		params.len() + 1,
		params.len() + 2
	);
	params.push(&domain_id);
	params.push(&email.local_part);

	one_or_not_found(db.execute(sql.as_str(), &params)?)
}

/// Atomic rename; the new address may live on a different managed domain,
/// all alias edges keep pointing at the row.
pub fn rename(db: &mut impl GenericClient, old: &EmailAddress, new: &EmailAddress) -> Result<()> {
	let old_domain_id = live_managed_domain_id(db, &old.fqdn)?;
	let new_domain_id = live_managed_domain_id(db, &new.fqdn)?;
	let n = db.execute(
		"UPDATE mailboxes SET domain_id = $1, name = $2
		WHERE domain_id = $3 AND name = $4 AND deleted_at IS NULL",
		&[&new_domain_id, &new.local_part, &old_domain_id, &old.local_part],
	)?;
	one_or_not_found(n)
}

pub fn delete(db: &mut impl GenericClient, email: &EmailAddress, options: &DeleteOptions) -> Result<()> {
	options.check()?;
	let n = if options.permanent {
		db.execute(
			"DELETE FROM mailboxes
			WHERE domain_id = (SELECT id FROM domains_managed WHERE fqdn = $1
				ORDER BY (deleted_at IS NOT NULL) LIMIT 1)
				AND name = $2",
			&[&email.fqdn, &email.local_part],
		)
		.map_err(map_delete_err)?
	} else {
		let mut sql = String::from(
			"UPDATE mailboxes SET deleted_at = now()
			WHERE domain_id = (SELECT id FROM domains_managed WHERE fqdn = $1
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
		"UPDATE mailboxes SET deleted_at = NULL
		WHERE domain_id = (SELECT id FROM domains_managed WHERE fqdn = $1 AND deleted_at IS NULL)
			AND name = $2",
		&[&email.fqdn, &email.local_part],
	)?;
	if n == 1 {
		return Ok(());
	}
	if n > 1 {
		return Err(Error::AffectedRowsMismatch { expected: 1, got: n });
	}

	// distinguish a missing row from one whose domain is still soft-deleted
	let row = db.query_opt(
		"SELECT d.deleted_at IS NOT NULL FROM mailboxes m
		JOIN domains_managed d ON m.domain_id = d.id
		WHERE d.fqdn = $1 AND m.name = $2
		LIMIT 1",
		&[&email.fqdn, &email.local_part],
	)?;
	match row {
		Some(row) if row.get::<_, bool>(0) => Err(Error::ParentDeleted),
		Some(_) => Err(Error::AffectedRowsMismatch { expected: 1, got: n }),
		None => Err(Error::NotFound),
	}
}
