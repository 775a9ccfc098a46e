//! Lookups the IMAP/submission side asks per login and per delivery.

use postgres::GenericClient;

use crate::error::Result;
use crate::resolve::{normalize_fqdn, normalize_local};

/// Row shape of the password database lookup. `nologin` is set when the
/// account exists but may not authenticate right now; the caller still
/// records the attempt and applies its rate limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassdbEntry {
	pub password_hash: Option<String>,
	pub nologin: bool,
}

pub fn passdb_lookup(
	db: &mut impl GenericClient,
	fqdn: &str,
	name: &str,
) -> Result<Option<PassdbEntry>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);
	let row = db.query_opt(
		"SELECT m.password_hash, NOT (m.login_enabled AND d.enabled)
		FROM mailboxes m
		JOIN domains_managed d ON m.domain_id = d.id
		WHERE d.fqdn = $1 AND d.deleted_at IS NULL
			AND m.name = $2 AND m.deleted_at IS NULL",
		&[&fqdn, &name],
	)?;
	Ok(row.map(|row| PassdbEntry {
		password_hash: row.get(0),
		nologin: row.get(1),
	}))
}

/// Row shape of the user database lookup: canonical user string plus the
/// storage quota in megabytes, for accounts that can receive mail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserdbEntry {
	pub user: String,
	pub quota_mb: Option<i32>,
}

pub fn userdb_lookup(
	db: &mut impl GenericClient,
	fqdn: &str,
	name: &str,
) -> Result<Option<UserdbEntry>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);
	let row = db.query_opt(
		"SELECT m.name, d.fqdn, m.storage_quota
		FROM mailboxes m
		JOIN domains_managed d ON m.domain_id = d.id
		WHERE d.fqdn = $1 AND d.enabled AND d.deleted_at IS NULL
			AND m.name = $2 AND m.receiving_enabled AND m.deleted_at IS NULL",
		&[&fqdn, &name],
	)?;
	Ok(row.map(|row| UserdbEntry {
		user: format!("{}@{}", row.get::<_, String>(0), row.get::<_, String>(1)),
		quota_mb: row.get(2),
	}))
}
