use chrono::{DateTime, Duration, Utc};
use postgres::GenericClient;
use serde_derive::Serialize;

use crate::address::EmailAddress;
use crate::db::expect_one;
use crate::error::Result;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxLoginAttempt {
	pub domain_fqdn: String,
	pub name: String,
	pub succeeded: bool,
	pub failure_reason: Option<String>,
	pub attempted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct ListOptions<'a> {
	pub filter_domains: &'a [String],
	pub filter_emails: &'a [EmailAddress],
}

pub fn list(db: &mut impl GenericClient, options: ListOptions<'_>) -> Result<Vec<MailboxLoginAttempt>> {
	let mut sql = String::from(
		"SELECT domain_fqdn, name, succeeded, failure_reason, attempted_at
		FROM audit.mailboxes_login_attempts",
	);
	let mut clauses: Vec<String> = Vec::new();
	let mut params: Vec<&(dyn postgres::types::ToSql + Sync)> = Vec::new();

	if !options.filter_domains.is_empty() {
		clauses.push(format!("domain_fqdn = ANY(${})", params.len() + 1));
		params.push(&options.filter_domains);
	}
	let email_fqdns: Vec<String> = options.filter_emails.iter().map(|e| e.fqdn.clone()).collect();
	let email_names: Vec<String> =
		options.filter_emails.iter().map(|e| e.local_part.clone()).collect();
	if !options.filter_emails.is_empty() {
		clauses.push(format!(
			"(domain_fqdn, name) IN (SELECT * FROM unnest(${}::TEXT[], ${}::TEXT[]))",
			params.len() + 1,
			params.len() + 2
		));
		params.push(&email_fqdns);
		params.push(&email_names);
	}

	if !clauses.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&clauses.join(" AND "));
	}
	sql.push_str(" ORDER BY attempted_at");

	let rows = db.query(sql.as_str(), &params)?;
	let mut out = Vec::with_capacity(rows.len());
	for row in rows {
		out.push(MailboxLoginAttempt {
			domain_fqdn: row.get(0),
			name: row.get(1),
			succeeded: row.get(2),
			failure_reason: row.get(3),
			attempted_at: row.get(4),
		});
	}
	Ok(out)
}

/// Appends one audit row. The table has no delete path.
pub fn record(
	db: &mut impl GenericClient,
	email: &EmailAddress,
	succeeded: bool,
	failure_reason: Option<&str>,
) -> Result<()> {
	let n = db.execute(
		"INSERT INTO audit.mailboxes_login_attempts (domain_fqdn, name, succeeded, failure_reason)
		VALUES ($1, $2, $3, $4)",
		&[&email.fqdn, &email.local_part, &succeeded, &failure_reason],
	)?;
	expect_one(n)
}

/// True while the address has seen fewer than `count` attempts within the
/// trailing `interval`.
pub fn check_rate_limit(
	db: &mut impl GenericClient,
	email: &EmailAddress,
	count: u32,
	interval: Duration,
) -> Result<bool> {
	let cutoff = Utc::now() - interval;
	let row = db.query_one(
		"SELECT COUNT(*) FROM audit.mailboxes_login_attempts
		WHERE domain_fqdn = $1 AND name = $2 AND attempted_at > $3",
		&[&email.fqdn, &email.local_part, &cutoff],
	)?;
	let attempts: i64 = row.get(0);
	Ok(attempts < count as i64)
}
