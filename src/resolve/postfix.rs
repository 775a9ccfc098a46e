//! The lookup functions Postfix queries per message. All of them are
//! read-only and answer either a single optional string or a list.

use std::collections::HashSet;

use itertools::Itertools;
use postgres::GenericClient;

use crate::error::Result;
use crate::resolve::{expand, normalize_fqdn, normalize_local, transport_string, Edge};

/// The literal every predicate map answers with when it matches.
pub const OK: &str = "OK";

/// Delivery transport for an address: mailbox transport override first,
/// then the managed domain's transport, then the relayed domain's.
pub fn transport_maps(db: &mut impl GenericClient, fqdn: &str, name: &str) -> Result<Option<String>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);

	let row = db.query_opt(
		"SELECT t.method, t.host, t.port, t.mx_lookup
		FROM mailboxes m
		JOIN domains_managed d ON m.domain_id = d.id
		JOIN transports t ON t.id = COALESCE(m.transport_id, d.transport_id)
		WHERE d.fqdn = $1 AND d.enabled AND d.deleted_at IS NULL
			AND m.name = $2 AND m.receiving_enabled AND m.deleted_at IS NULL
			AND t.deleted_at IS NULL",
		&[&fqdn, &name],
	)?;
	if let Some(row) = row {
		return Ok(Some(transport_string(
			row.get::<_, String>(0).as_str(),
			row.get::<_, String>(1).as_str(),
			row.get::<_, Option<i32>>(2).map(|p| p as u16),
			row.get(3),
		)));
	}

	let row = db.query_opt(
		"SELECT t.method, t.host, t.port, t.mx_lookup
		FROM recipients_relayed r
		JOIN domains_relayed d ON r.domain_id = d.id
		JOIN transports t ON t.id = d.transport_id
		WHERE d.fqdn = $1 AND d.enabled AND d.deleted_at IS NULL
			AND r.name = $2 AND r.enabled AND r.deleted_at IS NULL
			AND t.deleted_at IS NULL",
		&[&fqdn, &name],
	)?;
	Ok(row.map(|row| {
		transport_string(
			row.get::<_, String>(0).as_str(),
			row.get::<_, String>(1).as_str(),
			row.get::<_, Option<i32>>(2).map(|p| p as u16),
			row.get(3),
		)
	}))
}

fn domain_predicate(db: &mut impl GenericClient, table: &str, fqdn: &str) -> Result<Option<&'static str>> {
	let fqdn = normalize_fqdn(fqdn);
	let sql = format!(
		"SELECT 1 FROM {} WHERE fqdn = $1 AND enabled AND deleted_at IS NULL",
		table
	);
	Ok(db.query_opt(sql.as_str(), &[&fqdn])?.map(|_| OK))
}

pub fn virtual_mailbox_domains(db: &mut impl GenericClient, fqdn: &str) -> Result<Option<&'static str>> {
	domain_predicate(db, "domains_managed", fqdn)
}

pub fn virtual_alias_domains(db: &mut impl GenericClient, fqdn: &str) -> Result<Option<&'static str>> {
	domain_predicate(db, "domains_alias", fqdn)
}

pub fn relay_domains(db: &mut impl GenericClient, fqdn: &str) -> Result<Option<&'static str>> {
	domain_predicate(db, "domains_relayed", fqdn)
}

pub fn virtual_mailbox_maps(
	db: &mut impl GenericClient,
	fqdn: &str,
	name: &str,
) -> Result<Option<&'static str>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);
	let row = db.query_opt(
		"SELECT 1 FROM mailboxes m
		JOIN domains_managed d ON m.domain_id = d.id
		WHERE d.fqdn = $1 AND d.enabled AND d.deleted_at IS NULL
			AND m.name = $2 AND m.receiving_enabled AND m.deleted_at IS NULL",
		&[&fqdn, &name],
	)?;
	Ok(row.map(|_| OK))
}

pub fn relay_recipient_maps(
	db: &mut impl GenericClient,
	fqdn: &str,
	name: &str,
) -> Result<Option<&'static str>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);
	let row = db.query_opt(
		"SELECT 1 FROM recipients_relayed r
		JOIN domains_relayed d ON r.domain_id = d.id
		WHERE d.fqdn = $1 AND d.enabled AND d.deleted_at IS NULL
			AND r.name = $2 AND r.enabled AND r.deleted_at IS NULL",
		&[&fqdn, &name],
	)?;
	Ok(row.map(|_| OK))
}

/// Rewrites `name@canonical` to `name@target` when both the canonical
/// domain and its target are live and enabled.
pub fn canonical_maps(db: &mut impl GenericClient, fqdn: &str, name: &str) -> Result<Option<String>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);
	let row = db.query_opt(
		"SELECT td.fqdn FROM domains_canonical c
		JOIN domains td ON c.target_domain_id = td.id
		WHERE c.fqdn = $1 AND c.enabled AND c.deleted_at IS NULL
			AND td.enabled AND td.deleted_at IS NULL",
		&[&fqdn],
	)?;
	Ok(row.map(|row| format!("{}@{}", name, row.get::<_, String>(0))))
}

fn catchall_seeds(
	db: &mut impl GenericClient,
	domain_id: i64,
	fallback_only: bool,
) -> Result<Vec<(i64, u32)>> {
	let rows = db.query(
		"SELECT recipient_id FROM domains_catchall_targets
		WHERE domain_id = $1 AND forwarding_to_target_enabled
			AND fallback_only = $2 AND deleted_at IS NULL",
		&[&domain_id, &fallback_only],
	)?;
	// catch-all targets sit at depth 1, their subtree gets one hop less
	Ok(rows.iter().map(|row| (row.get(0), 1)).collect())
}

/// The flat set of delivery addresses `name@fqdn` expands to.
///
/// Seeds are the explicitly matching live alias plus the domain's
/// non-fallback catch-all targets; fallback-only catch-alls join in only
/// when the explicit expansion produced nothing. Every seed set is walked
/// with its own visited set so a shared node is reachable at its shallowest
/// depth in each pass.
pub fn virtual_alias_maps(
	db: &mut impl GenericClient,
	fqdn: &str,
	name: &str,
	max_depth: u32,
) -> Result<Vec<String>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);

	let domain = db.query_opt(
		"SELECT id, enabled, deleted_at IS NULL FROM domains WHERE fqdn = $1
		ORDER BY (deleted_at IS NOT NULL) LIMIT 1",
		&[&fqdn],
	)?;
	let domain_id: i64 = match domain {
		Some(row) if row.get::<_, bool>(1) && row.get::<_, bool>(2) => row.get(0),
		_ => return Ok(Vec::new()),
	};

	let alias_id: Option<i64> = db
		.query_opt(
			"SELECT id FROM aliases
			WHERE domain_id = $1 AND name = $2 AND enabled AND deleted_at IS NULL",
			&[&domain_id, &name],
		)?
		.map(|row| row.get(0));

	let mut explicit: HashSet<String> = HashSet::new();
	if let Some(alias_id) = alias_id {
		expand(db, &[(alias_id, 0)], max_depth, Edge::Forwarding, &mut explicit)?;
	}

	let mut out: HashSet<String> = HashSet::new();
	let always = catchall_seeds(db, domain_id, false)?;
	expand(db, &always, max_depth, Edge::Forwarding, &mut out)?;

	if explicit.is_empty() {
		let fallback = catchall_seeds(db, domain_id, true)?;
		expand(db, &fallback, max_depth, Edge::Forwarding, &mut out)?;
	}

	out.extend(explicit);
	Ok(out.into_iter().sorted().collect())
}

/// Mailbox addresses allowed to use `name@fqdn` as sender. Walks sending
/// edges only; catch-alls, foreign targets and relayed recipients never
/// contribute.
pub fn smtpd_sender_login_maps_mailboxes(
	db: &mut impl GenericClient,
	fqdn: &str,
	name: &str,
	max_depth: u32,
) -> Result<Vec<String>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);

	let seed: Option<i64> = db
		.query_opt(
			"SELECT r.id FROM recipients r
			JOIN domains d ON r.domain_id = d.id
			WHERE d.fqdn = $1 AND r.name = $2 AND r.deleted_at IS NULL AND d.deleted_at IS NULL",
			&[&fqdn, &name],
		)?
		.map(|row| row.get(0));

	let mut out: HashSet<String> = HashSet::new();
	if let Some(seed) = seed {
		expand(db, &[(seed, 0)], max_depth, Edge::Sending, &mut out)?;
	}

	Ok(out.into_iter().sorted().collect())
}

/// Remote names granted to send as `name@fqdn`. Pattern matching runs in
/// the store (`%`, `_`, backslash escape); a NULL pattern is the whole
/// domain wildcard.
pub fn smtpd_sender_login_maps_remotes(
	db: &mut impl GenericClient,
	fqdn: &str,
	name: &str,
) -> Result<Vec<String>> {
	let fqdn = normalize_fqdn(fqdn);
	let name = normalize_local(name);

	let rows = db.query(
		"SELECT DISTINCT r.name FROM remotes_send_grants g
		JOIN remotes r ON g.remote_id = r.id
		JOIN domains d ON g.domain_id = d.id
		WHERE d.fqdn = $1 AND d.enabled AND d.deleted_at IS NULL
			AND g.deleted_at IS NULL
			AND r.enabled AND r.deleted_at IS NULL
			AND $2 LIKE COALESCE(g.name, '%')
		ORDER BY r.name",
		&[&fqdn, &name],
	)?;
	Ok(rows.iter().map(|row| row.get(0)).collect())
}
