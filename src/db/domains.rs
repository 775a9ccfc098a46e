use std::fmt;

use chrono::{DateTime, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::db::{
	expect_one, live_domain_id, live_transport_id, map_delete_err, one_or_not_found, DeleteOptions,
};
use crate::error::{Error, Result};
use crate::resolve::transport_string;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
	Managed,
	Relayed,
	Alias,
	Canonical,
}

impl DomainType {
	pub fn parse(s: &str) -> Result<Self> {
		match s {
			"managed" => Ok(DomainType::Managed),
			"relayed" => Ok(DomainType::Relayed),
			"alias" => Ok(DomainType::Alias),
			"canonical" => Ok(DomainType::Canonical),
			other => Err(Error::InputInvalid(format!(
				"invalid domain type: {} (must be 'managed', 'relayed', 'alias' or 'canonical')",
				other
			))),
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			DomainType::Managed => "managed",
			DomainType::Relayed => "relayed",
			DomainType::Alias => "alias",
			DomainType::Canonical => "canonical",
		}
	}

	fn table(&self) -> &'static str {
		match self {
			DomainType::Managed => "domains_managed",
			DomainType::Relayed => "domains_relayed",
			DomainType::Alias => "domains_alias",
			DomainType::Canonical => "domains_canonical",
		}
	}
}

impl fmt::Display for DomainType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
	pub fqdn: String,
	#[serde(rename = "type")]
	pub domain_type: DomainType,
	pub enabled: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transport: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transport_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_domain_fqdn: Option<String>,
	pub target_domain_enabled: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct CreateOptions {
	pub domain_type: DomainType,
	pub transport_name: Option<String>,
	pub target_domain_fqdn: Option<String>,
	pub enabled: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PatchOptions {
	pub enabled: Option<bool>,
	pub transport_name: Option<String>,
	pub target_domain_fqdn: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ListOptions<'a> {
	pub by_fqdn: Option<&'a str>,
	pub include_deleted: bool,
	pub include_all: bool,
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<Domain>> {
	let mut sql = String::from(
		"SELECT d.fqdn, d.type, d.enabled,
			t.name, t.method, t.host, t.port, t.mx_lookup,
			td.fqdn, COALESCE(td.enabled, false),
			d.created_at, d.updated_at, d.deleted_at
		FROM domains d
		LEFT JOIN transports t ON d.transport_id = t.id
		LEFT JOIN domains td ON d.target_domain_id = td.id",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if options.include_deleted {
		clauses.push("d.deleted_at IS NOT NULL".to_owned());
	} else if !options.include_all {
		clauses.push("d.deleted_at IS NULL".to_owned());
	}
	if let Some(ref fqdn) = options.by_fqdn {
		clauses.push(format!("d.fqdn = ${}", params.len() + 1));
		params.push(fqdn);
	}

	if !clauses.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&clauses.join(" AND "));
	}
	if options.include_deleted {
		sql.push_str(" ORDER BY d.deleted_at");
	} else {
		sql.push_str(" ORDER BY d.type, d.fqdn");
	}

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		let transport_name: Option<String> = row.get(3);
		let transport = transport_name.as_ref().map(|_| {
			transport_string(
				row.get::<_, String>(4).as_str(),
				row.get::<_, String>(5).as_str(),
				row.get::<_, Option<i32>>(6).map(|p| p as u16),
				row.get(7),
			)
		});
		out.push(Domain {
			fqdn: row.get(0),
			domain_type: DomainType::parse(row.get::<_, String>(1).as_str())?,
			enabled: row.get(2),
			transport,
			transport_name,
			target_domain_fqdn: row.get(8),
			target_domain_enabled: row.get(9),
			created_at: row.get(10),
			updated_at: row.get(11),
			deleted_at: row.get(12),
		});
	}
	Ok(out)
}

pub fn create(db: &mut impl GenericClient, fqdn: &str, options: &CreateOptions) -> Result<()> {
	match options.domain_type {
		DomainType::Managed | DomainType::Relayed => {
			if options.target_domain_fqdn.is_some() {
				return Err(Error::InvalidShape(
					"only domains of type 'canonical' can have a target domain".to_owned(),
				));
			}
			let transport_name = options.transport_name.as_deref().ok_or_else(|| {
				Error::InvalidShape(format!(
					"transport name is required for {} domains",
					options.domain_type
				))
			})?;
			let transport_id = live_transport_id(db, transport_name)?;
			let sql = format!(
				"INSERT INTO {} (fqdn, transport_id, enabled) VALUES ($1, $2, $3)",
				options.domain_type.table()
			);
			expect_one(db.execute(sql.as_str(), &[&fqdn, &transport_id, &options.enabled])?)
		}
		DomainType::Canonical => {
			if options.transport_name.is_some() {
				return Err(Error::InvalidShape(
					"domains of type 'canonical' cannot have a transport".to_owned(),
				));
			}
			let target = options.target_domain_fqdn.as_deref().ok_or_else(|| {
				Error::InvalidShape("target domain FQDN is required for canonical domains".to_owned())
			})?;
			let target_domain_id = live_domain_id(db, target)?;
			expect_one(db.execute(
				"INSERT INTO domains_canonical (fqdn, target_domain_id, enabled) VALUES ($1, $2, $3)",
				&[&fqdn, &target_domain_id, &options.enabled],
			)?)
		}
		DomainType::Alias => {
			if options.transport_name.is_some() || options.target_domain_fqdn.is_some() {
				return Err(Error::InvalidShape(
					"domains of type 'alias' cannot have a transport or target domain".to_owned(),
				));
			}
			expect_one(db.execute(
				"INSERT INTO domains_alias (fqdn, enabled) VALUES ($1, $2)",
				&[&fqdn, &options.enabled],
			)?)
		}
	}
}

/// Variant and ID of a domain. Prefers the live row when a soft-deleted
/// one shares the FQDN.
fn id_and_type(db: &mut impl GenericClient, fqdn: &str) -> Result<(i64, DomainType)> {
	let row = db
		.query_opt(
			"SELECT id, type FROM domains WHERE fqdn = $1
			ORDER BY (deleted_at IS NOT NULL) LIMIT 1",
			&[&fqdn],
		)?
		.ok_or(Error::NotFound)?;
	Ok((row.get(0), DomainType::parse(row.get::<_, String>(1).as_str())?))
}

/// Most recently soft-deleted domain row with the given FQDN.
fn deleted_id_and_type(db: &mut impl GenericClient, fqdn: &str) -> Result<(i64, DomainType)> {
	let row = db
		.query_opt(
			"SELECT id, type FROM domains WHERE fqdn = $1 AND deleted_at IS NOT NULL
			ORDER BY deleted_at DESC LIMIT 1",
			&[&fqdn],
		)?
		.ok_or(Error::NotFound)?;
	Ok((row.get(0), DomainType::parse(row.get::<_, String>(1).as_str())?))
}

pub fn patch(db: &mut impl GenericClient, fqdn: &str, options: &PatchOptions) -> Result<()> {
	let (domain_id, domain_type) = id_and_type(db, fqdn)?;

	match domain_type {
		DomainType::Managed | DomainType::Relayed => {
			if options.target_domain_fqdn.is_some() {
				return Err(Error::InvalidShape(
					"only domains of type 'canonical' can have a target domain".to_owned(),
				));
			}
		}
		DomainType::Alias => {
			if options.transport_name.is_some() || options.target_domain_fqdn.is_some() {
				return Err(Error::InvalidShape(
					"domains of type 'alias' cannot have a transport or target domain".to_owned(),
				));
			}
		}
		DomainType::Canonical => {
			if options.transport_name.is_some() {
				return Err(Error::InvalidShape(
					"domains of type 'canonical' cannot have a transport".to_owned(),
				));
			}
		}
	}

	let transport_id = match options.transport_name.as_deref() {
		Some(name) => Some(live_transport_id(db, name)?),
		None => None,
	};
	let target_domain_id = match options.target_domain_fqdn.as_deref() {
		Some(target) => Some(live_domain_id(db, target)?),
		None => None,
	};

	let mut sets: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if let Some(ref enabled) = options.enabled {
		sets.push(format!("enabled = ${}", params.len() + 1));
		params.push(enabled);
	}
	if let Some(ref transport_id) = transport_id {
		sets.push(format!("transport_id = ${}", params.len() + 1));
		params.push(transport_id);
	}
	if let Some(ref target_domain_id) = target_domain_id {
		sets.push(format!("target_domain_id = ${}", params.len() + 1));
		params.push(target_domain_id);
	}
	if sets.is_empty() {
		return Err(Error::AffectedRowsMismatch { expected: 1, got: 0 });
	}

	let sql = format!(
		"UPDATE {} SET {} WHERE id = ${} AND deleted_at IS NULL",
		domain_type.table(),
		sets.join(", "),
		params.len() + 1
	);
	params.push(&domain_id);

	one_or_not_found(db.execute(sql.as_str(), &params)?)
}

pub fn rename(db: &mut impl GenericClient, old_fqdn: &str, new_fqdn: &str) -> Result<()> {
	let (domain_id, domain_type) = id_and_type(db, old_fqdn)?;
	let sql = format!(
		"UPDATE {} SET fqdn = $1 WHERE id = $2 AND deleted_at IS NULL",
		domain_type.table()
	);
	one_or_not_found(db.execute(sql.as_str(), &[&new_fqdn, &domain_id])?)
}

pub fn delete(db: &mut impl GenericClient, fqdn: &str, options: &DeleteOptions) -> Result<()> {
	options.check()?;
	let (domain_id, domain_type) = id_and_type(db, fqdn)?;

	let n = if options.permanent {
		let sql = format!("DELETE FROM {} WHERE id = $1", domain_type.table());
		db.execute(sql.as_str(), &[&domain_id]).map_err(map_delete_err)?
	} else {
		let mut sql = format!("UPDATE {} SET deleted_at = now() WHERE id = $1", domain_type.table());
		if !options.force {
			sql.push_str(" AND deleted_at IS NULL");
		}
		db.execute(sql.as_str(), &[&domain_id])?
	};
	one_or_not_found(n)
}

pub fn restore(db: &mut impl GenericClient, fqdn: &str) -> Result<()> {
	let (domain_id, domain_type) = deleted_id_and_type(db, fqdn)?;
	let sql = format!("UPDATE {} SET deleted_at = NULL WHERE id = $1", domain_type.table());
	one_or_not_found(db.execute(sql.as_str(), &[&domain_id])?)
}
