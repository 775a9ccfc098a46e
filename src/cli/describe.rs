use anyhow::Result;
use itertools::Itertools;
use postgres::Client;

use maildb::address::{parse_fqdn, EmailAddress, EmailOrWildcard};
use maildb::db;
use maildb::db::domains::DomainType;
use maildb::resolve::postfix;

use crate::cli::output::{fmt_bool, fmt_opt, fmt_time, fmt_time_opt, print_fields, print_json};

const DESCRIBE_MAX_DEPTH: u32 = 50;

pub fn run(client: &mut Client, arg: &str, json: bool) -> Result<u32> {
	if arg.contains('@') {
		let email = match EmailOrWildcard::parse(arg) {
			Ok(email) => email,
			Err(err) => {
				eprintln!("error[{}]: {}", err.tag(), err);
				return Ok(1);
			}
		};
		match email.local_part.clone() {
			None => describe_catchall(client, &email.fqdn, json),
			Some(local_part) => {
				let email = EmailAddress { local_part, fqdn: email.fqdn };
				describe_email(client, &email, json)
			}
		}
	} else {
		match parse_fqdn(arg) {
			Ok(fqdn) => {
				if describe_domain(client, &fqdn, json)? {
					return Ok(0);
				}
				describe_named(client, arg, json)
			}
			// not a valid FQDN, may still be a transport or remote name
			Err(_) => describe_named(client, arg, json),
		}
	}
}

fn describe_email(client: &mut Client, email: &EmailAddress, json: bool) -> Result<u32> {
	// aliases first, canonical rewrites, mailboxes, then relayed recipients
	let aliases = db::aliases::list(
		client,
		db::aliases::ListOptions {
			by_email: Some(email),
			include_all: true,
			..Default::default()
		},
	)?;
	if let Some(alias) = aliases.first() {
		if json {
			return print_json(alias).map(|_| 0);
		}
		print_fields(
			"Alias",
			&[
				("Address:", format!("{}@{}", alias.name, alias.domain_fqdn)),
				("Enabled:", fmt_bool(alias.enabled)),
				("Domain enabled:", fmt_bool(alias.domain_enabled)),
				("Targets:", alias.target_count.to_string()),
				("Created:", fmt_time(&alias.created_at)),
				("Updated:", fmt_time(&alias.updated_at)),
				("Deleted:", fmt_time_opt(&alias.deleted_at)),
			],
		);
		let targets = db::alias_targets::list(
			client,
			db::alias_targets::ListOptions {
				filter_aliases: std::slice::from_ref(email),
				include_all: true,
				..Default::default()
			},
		)?;
		if !targets.is_empty() {
			println!();
			let rows: Vec<(&str, String)> = targets
				.iter()
				.map(|t| {
					let mut notes = Vec::new();
					if t.is_foreign {
						notes.push("foreign");
					}
					if t.forwarding_enabled {
						notes.push("forwarding");
					}
					if t.sending_enabled {
						notes.push("sending");
					}
					if t.deleted_at.is_some() {
						notes.push("deleted");
					}
					(t.target_email.as_str(), notes.join(", "))
				})
				.collect();
			print_fields("Targets", &rows);
		}
		println!();
		print_email_functions(client, email)?;
		return Ok(0);
	}

	let domains = db::domains::list(
		client,
		db::domains::ListOptions {
			by_fqdn: Some(&email.fqdn),
			include_all: true,
			..Default::default()
		},
	)?;
	if let Some(domain) = domains.first() {
		if domain.domain_type == DomainType::Canonical {
			let rewritten = postfix::canonical_maps(client, &email.fqdn, &email.local_part)?;
			if json {
				return print_json(&rewritten).map(|_| 0);
			}
			print_fields(
				"Canonical Address",
				&[
					("Address:", email.to_string()),
					("Rewrites to:", fmt_opt(&rewritten)),
					("Target domain:", fmt_opt(&domain.target_domain_fqdn)),
					("Enabled:", fmt_bool(domain.enabled)),
				],
			);
			return Ok(0);
		}
	}

	let mailboxes = db::mailboxes::list(
		client,
		db::mailboxes::ListOptions {
			by_email: Some(email),
			include_all: true,
			..Default::default()
		},
	)?;
	if let Some(mailbox) = mailboxes.first() {
		if json {
			return print_json(mailbox).map(|_| 0);
		}
		print_fields(
			"Mailbox",
			&[
				("Address:", format!("{}@{}", mailbox.name, mailbox.domain_fqdn)),
				("Login:", fmt_bool(mailbox.login_enabled)),
				("Receiving:", fmt_bool(mailbox.receiving_enabled)),
				("Sending:", fmt_bool(mailbox.sending_enabled)),
				("Password set:", fmt_bool(mailbox.password_set)),
				("Quota (MB):", fmt_opt(&mailbox.storage_quota)),
				("Transport:", fmt_opt(&mailbox.transport)),
				("Domain enabled:", fmt_bool(mailbox.domain_enabled)),
				("Created:", fmt_time(&mailbox.created_at)),
				("Updated:", fmt_time(&mailbox.updated_at)),
				("Deleted:", fmt_time_opt(&mailbox.deleted_at)),
			],
		);
		println!();
		print_email_functions(client, email)?;
		return Ok(0);
	}

	let relayed = db::recipients_relayed::list(
		client,
		db::recipients_relayed::ListOptions {
			by_email: Some(email),
			include_all: true,
			..Default::default()
		},
	)?;
	if let Some(recipient) = relayed.first() {
		if json {
			return print_json(recipient).map(|_| 0);
		}
		print_fields(
			"Relayed Recipient",
			&[
				("Address:", format!("{}@{}", recipient.name, recipient.domain_fqdn)),
				("Enabled:", fmt_bool(recipient.enabled)),
				("Domain enabled:", fmt_bool(recipient.domain_enabled)),
				("Created:", fmt_time(&recipient.created_at)),
				("Updated:", fmt_time(&recipient.updated_at)),
				("Deleted:", fmt_time_opt(&recipient.deleted_at)),
			],
		);
		println!();
		print_email_functions(client, email)?;
		return Ok(0);
	}

	if json {
		return print_json(&serde_json::json!({ "status": "not found" })).map(|_| 1);
	}
	println!("Unknown address: {}", email);
	println!();
	print_email_functions(client, email)?;
	Ok(1)
}

/// What the resolution engine answers for this address right now; handy
/// when figuring out why mail does not flow.
fn print_email_functions(client: &mut Client, email: &EmailAddress) -> Result<()> {
	let fqdn = &email.fqdn;
	let name = &email.local_part;
	let fields = [
		(
			"virtual_mailbox_maps:",
			fmt_opt(&postfix::virtual_mailbox_maps(client, fqdn, name)?.map(str::to_owned)),
		),
		(
			"relay_recipient_maps:",
			fmt_opt(&postfix::relay_recipient_maps(client, fqdn, name)?.map(str::to_owned)),
		),
		(
			"virtual_alias_maps:",
			join_list(&postfix::virtual_alias_maps(client, fqdn, name, DESCRIBE_MAX_DEPTH)?),
		),
		(
			"sender_login_maps (mailboxes):",
			join_list(&postfix::smtpd_sender_login_maps_mailboxes(client, fqdn, name, DESCRIBE_MAX_DEPTH)?),
		),
		(
			"sender_login_maps (remotes):",
			join_list(&postfix::smtpd_sender_login_maps_remotes(client, fqdn, name)?),
		),
		("transport_maps:", fmt_opt(&postfix::transport_maps(client, fqdn, name)?)),
		("canonical_maps:", fmt_opt(&postfix::canonical_maps(client, fqdn, name)?)),
	];
	print_fields("Resolution", &fields);
	Ok(())
}

fn join_list(items: &[String]) -> String {
	if items.is_empty() {
		"-".to_owned()
	} else {
		items.iter().join(", ")
	}
}

fn describe_catchall(client: &mut Client, fqdn: &str, json: bool) -> Result<u32> {
	let filter = [fqdn.to_owned()];
	let targets = db::catchall_targets::list(
		client,
		db::catchall_targets::ListOptions {
			filter_domains: &filter,
			include_all: true,
			..Default::default()
		},
	)?;
	if targets.is_empty() {
		if json {
			return print_json(&serde_json::json!({ "status": "not found" })).map(|_| 1);
		}
		println!("No catch-all targets for @{}", fqdn);
		return Ok(1);
	}
	if json {
		return print_json(&targets).map(|_| 0);
	}
	let rows: Vec<(&str, String)> = targets
		.iter()
		.map(|t| {
			let mut notes = Vec::new();
			if t.forwarding_enabled {
				notes.push("forwarding");
			}
			if t.fallback_only {
				notes.push("fallback-only");
			}
			if t.deleted_at.is_some() {
				notes.push("deleted");
			}
			(t.target_email.as_str(), notes.join(", "))
		})
		.collect();
	print_fields(&format!("Catch-all @{}", fqdn), &rows);
	Ok(0)
}

fn describe_domain(client: &mut Client, fqdn: &str, json: bool) -> Result<bool> {
	let domains = db::domains::list(
		client,
		db::domains::ListOptions {
			by_fqdn: Some(fqdn),
			include_all: true,
			..Default::default()
		},
	)?;
	let domain = match domains.first() {
		Some(domain) => domain,
		None => return Ok(false),
	};
	if json {
		print_json(domain)?;
		return Ok(true);
	}
	print_fields(
		"Domain",
		&[
			("FQDN:", domain.fqdn.clone()),
			("Type:", domain.domain_type.to_string()),
			("Enabled:", fmt_bool(domain.enabled)),
			("Transport:", fmt_opt(&domain.transport)),
			("Target domain:", fmt_opt(&domain.target_domain_fqdn)),
			("Created:", fmt_time(&domain.created_at)),
			("Updated:", fmt_time(&domain.updated_at)),
			("Deleted:", fmt_time_opt(&domain.deleted_at)),
		],
	);
	println!();
	print_domain_functions(client, fqdn)?;
	Ok(true)
}

fn print_domain_functions(client: &mut Client, fqdn: &str) -> Result<()> {
	let fields = [
		(
			"virtual_mailbox_domains:",
			fmt_opt(&postfix::virtual_mailbox_domains(client, fqdn)?.map(str::to_owned)),
		),
		(
			"relay_domains:",
			fmt_opt(&postfix::relay_domains(client, fqdn)?.map(str::to_owned)),
		),
		(
			"virtual_alias_domains:",
			fmt_opt(&postfix::virtual_alias_domains(client, fqdn)?.map(str::to_owned)),
		),
	];
	print_fields("Resolution", &fields);
	Ok(())
}

fn describe_named(client: &mut Client, name: &str, json: bool) -> Result<u32> {
	let transports = db::transports::list(
		client,
		db::transports::ListOptions {
			by_name: Some(name),
			include_all: true,
			..Default::default()
		},
	)?;
	if let Some(transport) = transports.first() {
		if json {
			return print_json(transport).map(|_| 0);
		}
		print_fields(
			"Transport",
			&[
				("Name:", transport.name.clone()),
				("Method:", transport.method.clone()),
				("Host:", transport.host.clone()),
				("Port:", fmt_opt(&transport.port)),
				("MX lookup:", fmt_bool(transport.mx_lookup)),
				(
					"Spec:",
					maildb::resolve::transport_string(
						&transport.method,
						&transport.host,
						transport.port,
						transport.mx_lookup,
					),
				),
				("Created:", fmt_time(&transport.created_at)),
				("Updated:", fmt_time(&transport.updated_at)),
				("Deleted:", fmt_time_opt(&transport.deleted_at)),
			],
		);
		return Ok(0);
	}

	let remotes = db::remotes::list(
		client,
		db::remotes::ListOptions {
			by_name: Some(name),
			include_all: true,
			..Default::default()
		},
	)?;
	if let Some(remote) = remotes.first() {
		if json {
			return print_json(remote).map(|_| 0);
		}
		print_fields(
			"Remote",
			&[
				("Name:", remote.name.clone()),
				("Enabled:", fmt_bool(remote.enabled)),
				("Password set:", fmt_bool(remote.password_set)),
				("Created:", fmt_time(&remote.created_at)),
				("Updated:", fmt_time(&remote.updated_at)),
				("Deleted:", fmt_time_opt(&remote.deleted_at)),
			],
		);
		let grants = db::send_grants::list(
			client,
			db::send_grants::ListOptions {
				filter_remote_names: std::slice::from_ref(&remote.name),
				include_all: true,
				..Default::default()
			},
		)?;
		if !grants.is_empty() {
			println!();
			print_fields(
				"Send Grants",
				&grants
					.iter()
					.map(|g| {
						(
							"Pattern:",
							format!(
								"{}@{}{}",
								g.name.as_deref().unwrap_or("%"),
								g.domain_fqdn,
								if g.deleted_at.is_some() { " (deleted)" } else { "" }
							),
						)
					})
					.collect::<Vec<_>>(),
			);
		}
		return Ok(0);
	}

	if json {
		return print_json(&serde_json::json!({ "status": "not found" })).map(|_| 1);
	}
	println!("Unknown object: {}", name);
	Ok(1)
}
