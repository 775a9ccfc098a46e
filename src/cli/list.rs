use anyhow::{bail, Result};
use postgres::Client;

use maildb::db;

use crate::cli::args::{parse_emails, parse_fqdns};
use crate::cli::output::{fmt_bool, fmt_opt, fmt_time, fmt_time_opt, print_json, print_table};
use crate::cli::ListKind;

pub fn run(
	client: &mut Client,
	kind: ListKind,
	deleted: bool,
	all: bool,
	json: bool,
	verbose: bool,
) -> Result<u32> {
	if deleted && all {
		bail!("cannot use --deleted and --all flags together");
	}

	match kind {
		ListKind::Transports => {
			let items = db::transports::list(
				client,
				db::transports::ListOptions {
					by_name: None,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers = vec!["Name", "Method", "Host", "Port", "MX Lookup"];
			let rows = items
				.iter()
				.map(|t| {
					let mut row = vec![
						t.name.clone(),
						t.method.clone(),
						t.host.clone(),
						fmt_opt(&t.port),
						fmt_bool(t.mx_lookup),
					];
					extend_meta(&mut row, verbose, deleted || all, &t.created_at, &t.updated_at, &t.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::Domains => {
			let items = db::domains::list(
				client,
				db::domains::ListOptions {
					by_fqdn: None,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers = vec!["FQDN", "Type", "Enabled", "Transport / Target Domain"];
			let rows = items
				.iter()
				.map(|d| {
					let detail = match d.domain_type {
						db::domains::DomainType::Canonical => fmt_opt(&d.target_domain_fqdn),
						db::domains::DomainType::Alias => "-".to_owned(),
						_ => match (&d.transport, &d.transport_name) {
							(Some(spec), Some(name)) => format!("{} ({})", spec, name),
							_ => "-".to_owned(),
						},
					};
					let mut row = vec![
						d.fqdn.clone(),
						d.domain_type.to_string(),
						fmt_bool(d.enabled),
						detail,
					];
					extend_meta(&mut row, verbose, deleted || all, &d.created_at, &d.updated_at, &d.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::Mailboxes { domains } => {
			let filter_domains = parse_fqdns(&domains)?;
			let items = db::mailboxes::list(
				client,
				db::mailboxes::ListOptions {
					filter_domains: &filter_domains,
					by_email: None,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers =
				vec!["Address", "Login", "Receiving", "Sending", "Password", "Quota (MB)", "Transport"];
			let rows = items
				.iter()
				.map(|m| {
					let mut row = vec![
						format!("{}@{}", m.name, m.domain_fqdn),
						fmt_bool(m.login_enabled),
						fmt_bool(m.receiving_enabled),
						fmt_bool(m.sending_enabled),
						fmt_bool(m.password_set),
						fmt_opt(&m.storage_quota),
						fmt_opt(&m.transport_name),
					];
					extend_meta(&mut row, verbose, deleted || all, &m.created_at, &m.updated_at, &m.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::Aliases { domains } => {
			let filter_domains = parse_fqdns(&domains)?;
			let items = db::aliases::list(
				client,
				db::aliases::ListOptions {
					filter_domains: &filter_domains,
					by_email: None,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers = vec!["Address", "Enabled", "Targets"];
			let rows = items
				.iter()
				.map(|a| {
					let mut row = vec![
						format!("{}@{}", a.name, a.domain_fqdn),
						fmt_bool(a.enabled),
						a.target_count.to_string(),
					];
					extend_meta(&mut row, verbose, deleted || all, &a.created_at, &a.updated_at, &a.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::AliasTargets { aliases } => {
			let filter_aliases = parse_emails(&aliases)?;
			let items = db::alias_targets::list(
				client,
				db::alias_targets::ListOptions {
					filter_aliases: &filter_aliases,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers = vec!["Alias", "Target", "Foreign", "Forwarding", "Sending"];
			let rows = items
				.iter()
				.map(|t| {
					let mut row = vec![
						t.alias_email.clone(),
						t.target_email.clone(),
						fmt_bool(t.is_foreign),
						fmt_bool(t.forwarding_enabled),
						fmt_bool(t.sending_enabled),
					];
					extend_meta(&mut row, verbose, deleted || all, &t.created_at, &t.updated_at, &t.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::CatchallTargets { domains } => {
			let filter_domains = parse_fqdns(&domains)?;
			let items = db::catchall_targets::list(
				client,
				db::catchall_targets::ListOptions {
					filter_domains: &filter_domains,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers = vec!["Domain", "Target", "Forwarding", "Fallback Only"];
			let rows = items
				.iter()
				.map(|c| {
					let mut row = vec![
						format!("@{}", c.domain_fqdn),
						c.target_email.clone(),
						fmt_bool(c.forwarding_enabled),
						fmt_bool(c.fallback_only),
					];
					extend_meta(&mut row, verbose, deleted || all, &c.created_at, &c.updated_at, &c.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::RecipientsRelayed { domains } => {
			let filter_domains = parse_fqdns(&domains)?;
			let items = db::recipients_relayed::list(
				client,
				db::recipients_relayed::ListOptions {
					filter_domains: &filter_domains,
					by_email: None,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers = vec!["Address", "Enabled"];
			let rows = items
				.iter()
				.map(|r| {
					let mut row =
						vec![format!("{}@{}", r.name, r.domain_fqdn), fmt_bool(r.enabled)];
					extend_meta(&mut row, verbose, deleted || all, &r.created_at, &r.updated_at, &r.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::Remotes => {
			let items = db::remotes::list(
				client,
				db::remotes::ListOptions {
					by_name: None,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers = vec!["Name", "Enabled", "Password"];
			let rows = items
				.iter()
				.map(|r| {
					let mut row = vec![r.name.clone(), fmt_bool(r.enabled), fmt_bool(r.password_set)];
					extend_meta(&mut row, verbose, deleted || all, &r.created_at, &r.updated_at, &r.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::SendGrants { remotes } => {
			let items = db::send_grants::list(
				client,
				db::send_grants::ListOptions {
					filter_remote_names: &remotes,
					match_email: None,
					include_deleted: deleted,
					include_all: all,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let mut headers = vec!["Remote", "Domain", "Pattern"];
			let rows = items
				.iter()
				.map(|g| {
					let mut row = vec![
						g.remote_name.clone(),
						g.domain_fqdn.clone(),
						g.name.clone().unwrap_or_else(|| "% (whole domain)".to_owned()),
					];
					extend_meta(&mut row, verbose, deleted || all, &g.created_at, &g.updated_at, &g.deleted_at);
					row
				})
				.collect();
			extend_meta_headers(&mut headers, verbose, deleted || all);
			print_table(&headers, rows);
		}
		ListKind::LoginAttempts { addresses } => {
			let filter_emails = parse_emails(&addresses)?;
			let items = db::login_attempts::list(
				client,
				db::login_attempts::ListOptions {
					filter_domains: &[],
					filter_emails: &filter_emails,
				},
			)?;
			if json {
				return print_json(&items).map(|_| 0);
			}
			let headers = vec!["Address", "Succeeded", "Reason", "Attempted"];
			let rows = items
				.iter()
				.map(|a| {
					vec![
						format!("{}@{}", a.name, a.domain_fqdn),
						fmt_bool(a.succeeded),
						fmt_opt(&a.failure_reason),
						fmt_time(&a.attempted_at),
					]
				})
				.collect();
			print_table(&headers, rows);
		}
	}

	Ok(0)
}

fn extend_meta_headers(headers: &mut Vec<&str>, verbose: bool, with_deleted: bool) {
	if verbose {
		headers.push("Created");
		headers.push("Last Updated");
	}
	if with_deleted {
		headers.push("Deleted");
	}
}

fn extend_meta(
	row: &mut Vec<String>,
	verbose: bool,
	with_deleted: bool,
	created_at: &chrono::DateTime<chrono::Utc>,
	updated_at: &chrono::DateTime<chrono::Utc>,
	deleted_at: &Option<chrono::DateTime<chrono::Utc>>,
) {
	if verbose {
		row.push(fmt_time(created_at));
		row.push(fmt_time(updated_at));
	}
	if with_deleted {
		row.push(fmt_time_opt(deleted_at));
	}
}
