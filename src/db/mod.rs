use std::fs;

use native_tls::{Certificate, Identity, TlsConnector};
use postgres::{Client, GenericClient, NoTls};
use postgres_native_tls::MakeTlsConnector;
use r2d2_postgres::PostgresConnectionManager;

use crate::address::EmailAddress;
use crate::config::DbConfig;
use crate::error::{Error, Result};

pub mod aliases;
pub mod alias_targets;
pub mod catchall_targets;
pub mod domains;
pub mod login_attempts;
pub mod mailboxes;
pub mod recipients_relayed;
pub mod remotes;
pub mod runner;
pub mod send_grants;
pub mod transports;

pub type Pool = r2d2::Pool<PostgresConnectionManager<MakeTlsConnector>>;

/// Options shared by every delete operation. `force` re-stamps deleted_at
/// on an already soft-deleted row and cannot be combined with `permanent`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeleteOptions {
	pub permanent: bool,
	pub force: bool,
}

impl DeleteOptions {
	pub(crate) fn check(&self) -> Result<()> {
		if self.permanent && self.force {
			return Err(Error::InvalidTransition(
				"permanent and force deletion cannot be combined".to_owned(),
			));
		}
		Ok(())
	}
}

fn tls_connector(config: &DbConfig) -> Result<MakeTlsConnector> {
	let mut builder = TlsConnector::builder();

	match config.sslmode.as_str() {
		"verify-full" => {}
		"verify-ca" => {
			builder.danger_accept_invalid_hostnames(true);
		}
		_ => {
			// like libpq, plain require/prefer encrypt without verifying
			builder.danger_accept_invalid_certs(true);
			builder.danger_accept_invalid_hostnames(true);
		}
	}

	if let Some(ref ca) = config.tls_ca_cert {
		builder.add_root_certificate(Certificate::from_pem(&fs::read(ca)?)?);
	}
	if let (Some(cert), Some(key)) = (&config.tls_cert, &config.tls_key) {
		builder.identity(Identity::from_pkcs8(&fs::read(cert)?, &fs::read(key)?)?);
	}

	Ok(MakeTlsConnector::new(builder.build()?))
}

/// Opens a single connection using the DB_* environment configuration.
pub fn connect() -> Result<Client> {
	connect_with(&DbConfig::from_env())
}

pub fn connect_with(config: &DbConfig) -> Result<Client> {
	let client = if config.wants_tls() {
		Client::connect(&config.dsn(), tls_connector(config)?)
	} else {
		Client::connect(&config.dsn(), NoTls)
	};
	client.map_err(Error::StoreUnavailable)
}

/// Shared connection pool for embedding callers that answer many lookups.
pub fn pool(max_size: u32) -> Result<Pool> {
	let config = DbConfig::from_env();
	let pg_config: postgres::Config = config.dsn().parse().map_err(Error::StoreUnavailable)?;
	let manager = PostgresConnectionManager::new(pg_config, tls_connector(&config)?);
	Ok(r2d2::Pool::builder().max_size(max_size).build(manager)?)
}

/// Every write states how many rows it must touch; anything else rolls the
/// transaction back.
pub(crate) fn expect_one(n: u64) -> Result<()> {
	match n {
		1 => Ok(()),
		n => Err(Error::AffectedRowsMismatch { expected: 1, got: n }),
	}
}

/// Like [`expect_one`], but a miss means the addressed row is gone.
pub(crate) fn one_or_not_found(n: u64) -> Result<()> {
	match n {
		1 => Ok(()),
		0 => Err(Error::NotFound),
		n => Err(Error::AffectedRowsMismatch { expected: 1, got: n }),
	}
}

/// Hard deletes hitting a RESTRICT foreign key surface as 23503, which the
/// blanket conversion reads as a missing parent; rewrap for delete paths.
pub(crate) fn map_delete_err(err: postgres::Error) -> Error {
	match Error::from(err) {
		Error::ParentMissing => {
			Error::InvalidTransition("object is still referenced; delete dependents first".to_owned())
		}
		other => other,
	}
}

/// ID of a live domain of any variant.
pub(crate) fn live_domain_id(db: &mut impl GenericClient, fqdn: &str) -> Result<i64> {
	let row = db.query_opt(
		"SELECT id FROM domains WHERE fqdn = $1 AND deleted_at IS NULL",
		&[&fqdn],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::ParentMissing)
}

/// ID and variant of a live domain.
pub(crate) fn live_domain_id_and_type(
	db: &mut impl GenericClient,
	fqdn: &str,
) -> Result<(i64, String)> {
	let row = db.query_opt(
		"SELECT id, type FROM domains WHERE fqdn = $1 AND deleted_at IS NULL",
		&[&fqdn],
	)?;
	row.map(|row| (row.get(0), row.get(1))).ok_or(Error::ParentMissing)
}

pub(crate) fn live_transport_id(db: &mut impl GenericClient, name: &str) -> Result<i64> {
	let row = db.query_opt(
		"SELECT id FROM transports WHERE name = $1 AND deleted_at IS NULL",
		&[&name],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::ParentMissing)
}

pub(crate) fn live_remote_id(db: &mut impl GenericClient, name: &str) -> Result<i64> {
	let row = db.query_opt(
		"SELECT id FROM remotes WHERE name = $1 AND deleted_at IS NULL",
		&[&name],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::ParentMissing)
}

/// ID of a live recipient (mailbox, alias or relayed) under a live domain.
pub(crate) fn live_recipient_id(db: &mut impl GenericClient, email: &EmailAddress) -> Result<i64> {
	let row = db.query_opt(
		"SELECT r.id FROM recipients r
		JOIN domains d ON r.domain_id = d.id
		WHERE d.fqdn = $1 AND d.deleted_at IS NULL
			AND r.name = $2 AND r.deleted_at IS NULL",
		&[&email.fqdn, &email.local_part],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::ParentMissing)
}

/// ID of a live alias under a live domain.
pub(crate) fn live_alias_id(db: &mut impl GenericClient, email: &EmailAddress) -> Result<i64> {
	let row = db.query_opt(
		"SELECT a.id FROM aliases a
		JOIN domains d ON a.domain_id = d.id
		WHERE d.fqdn = $1 AND d.deleted_at IS NULL
			AND a.name = $2 AND a.deleted_at IS NULL",
		&[&email.fqdn, &email.local_part],
	)?;
	row.map(|row| row.get(0)).ok_or(Error::ParentMissing)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn permanent_and_force_are_exclusive() {
		assert!(DeleteOptions { permanent: true, force: true }.check().is_err());
		assert!(DeleteOptions { permanent: true, force: false }.check().is_ok());
		assert!(DeleteOptions { permanent: false, force: true }.check().is_ok());
	}

	#[test]
	fn row_count_checks() {
		assert!(expect_one(1).is_ok());
		assert!(matches!(expect_one(0), Err(Error::AffectedRowsMismatch { .. })));
		assert!(matches!(one_or_not_found(0), Err(Error::NotFound)));
		assert!(matches!(one_or_not_found(2), Err(Error::AffectedRowsMismatch { .. })));
	}
}
