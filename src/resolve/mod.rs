use std::collections::{HashSet, VecDeque};

use postgres::GenericClient;

use crate::error::Result;

pub mod dovecot;
pub mod postfix;

/// Postfix transport entry: `method:host[:port]`, with the host bracketed
/// when MX lookup is off.
pub fn transport_string(method: &str, host: &str, port: Option<u16>, mx_lookup: bool) -> String {
	let mut out = String::from(method);
	out.push(':');
	if mx_lookup {
		out.push_str(host);
	} else {
		out.push('[');
		out.push_str(host);
		out.push(']');
	}
	if let Some(port) = port {
		out.push(':');
		out.push_str(&port.to_string());
	}
	out
}

pub(crate) fn normalize_fqdn(fqdn: &str) -> String {
	fqdn.trim().to_ascii_lowercase()
}

pub(crate) fn normalize_local(name: &str) -> &str {
	name.trim()
}

/// Which edge flag a graph walk follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Edge {
	Forwarding,
	Sending,
}

/// Breadth-first walk over the recipient graph, bounded by `max_depth` and
/// cycle-protected by a visited set keyed on the recipient row ID. Rows
/// that are disabled or soft-deleted (or sit under such a domain) are dead
/// ends; the rest of the graph is still explored. Terminals land in `out`.
pub(crate) fn expand(
	db: &mut impl GenericClient,
	seeds: &[(i64, u32)],
	max_depth: u32,
	edge: Edge,
	out: &mut HashSet<String>,
) -> Result<()> {
	let mut queue: VecDeque<(i64, u32)> = seeds.iter().copied().collect();
	let mut visited: HashSet<i64> = HashSet::new();

	while let Some((recipient_id, depth)) = queue.pop_front() {
		if depth > max_depth {
			continue;
		}
		if !visited.insert(recipient_id) {
			continue;
		}

		let row = match db.query_opt(
			"SELECT r.type, r.name, r.receiving_enabled, r.sending_enabled,
				r.deleted_at IS NULL,
				d.fqdn, d.enabled, d.deleted_at IS NULL
			FROM recipients r
			JOIN domains d ON r.domain_id = d.id
			WHERE r.id = $1",
			&[&recipient_id],
		)? {
			Some(row) => row,
			None => continue,
		};

		let kind: String = row.get(0);
		let name: String = row.get(1);
		let receiving_enabled: bool = row.get(2);
		let sending_enabled: bool = row.get(3);
		let live: bool = row.get(4);
		let fqdn: String = row.get(5);
		let domain_enabled: bool = row.get(6);
		let domain_live: bool = row.get(7);

		if !live || !domain_live || !domain_enabled {
			continue;
		}

		match kind.as_str() {
			"alias" => {
				// for an alias both view columns mirror its enabled flag
				if !receiving_enabled {
					continue;
				}
				let flag = match edge {
					Edge::Forwarding => "forwarding_to_target_enabled",
					Edge::Sending => "sending_from_target_enabled",
				};
				let sql = format!(
					"SELECT recipient_id FROM aliases_targets_recursive
					WHERE alias_id = $1 AND {} AND deleted_at IS NULL",
					flag
				);
				for row in db.query(sql.as_str(), &[&recipient_id])? {
					queue.push_back((row.get(0), depth + 1));
				}
				if edge == Edge::Forwarding {
					for row in db.query(
						"SELECT name, fqdn FROM aliases_targets_foreign
						WHERE alias_id = $1 AND forwarding_to_target_enabled AND deleted_at IS NULL",
						&[&recipient_id],
					)? {
						out.insert(format!(
							"{}@{}",
							row.get::<_, String>(0),
							row.get::<_, String>(1)
						));
					}
				}
			}
			"mailbox" => {
				let wanted = match edge {
					Edge::Forwarding => receiving_enabled,
					Edge::Sending => sending_enabled,
				};
				if wanted {
					out.insert(format!("{}@{}", name, fqdn));
				}
			}
			"relayed" => {
				// relayed recipients cannot authenticate, so they only
				// terminate forwarding walks
				if edge == Edge::Forwarding && receiving_enabled {
					out.insert(format!("{}@{}", name, fqdn));
				}
			}
			_ => {}
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transport_string_forms() {
		assert_eq!(transport_string("smtp", "mail.example.org", None, true), "smtp:mail.example.org");
		assert_eq!(
			transport_string("smtp", "mail.example.org", Some(2525), true),
			"smtp:mail.example.org:2525"
		);
		assert_eq!(transport_string("lmtp", "127.0.0.1", None, false), "lmtp:[127.0.0.1]");
		assert_eq!(
			transport_string("relay", "upstream.example.org", Some(587), false),
			"relay:[upstream.example.org]:587"
		);
	}

	#[test]
	fn normalization() {
		assert_eq!(normalize_fqdn("  Example.ORG "), "example.org");
		assert_eq!(normalize_local(" alice "), "alice");
	}
}
