use anyhow::{bail, Result};
use postgres::Client;

use maildb::db::{self, runner};

use crate::cli::args::{parse_email, parse_fqdn_arg};
use crate::cli::password::read_password_hashed;
use crate::cli::PatchKind;

pub fn run(client: &mut Client, kind: PatchKind) -> Result<u32> {
	match kind {
		PatchKind::Transport { name, method, host, port, clear_port, mx_lookup } => {
			let options = db::transports::PatchOptions {
				method,
				host,
				port: if clear_port { Some(None) } else { port.map(Some) },
				mx_lookup,
			};
			Ok(runner::run_tx(
				client,
				&name,
				"failed to patch transport",
				"Successfully patched transport",
				|tx| db::transports::patch(tx, &name, &options),
			))
		}
		PatchKind::Domain { fqdn, transport, target_domain } => {
			let fqdn = parse_fqdn_arg(&fqdn)?;
			let options = db::domains::PatchOptions {
				enabled: None,
				transport_name: transport,
				target_domain_fqdn: match target_domain {
					Some(target) => Some(parse_fqdn_arg(&target)?),
					None => None,
				},
			};
			Ok(runner::run_tx(
				client,
				&fqdn,
				"failed to patch domain",
				"Successfully patched domain",
				|tx| db::domains::patch(tx, &fqdn, &options),
			))
		}
		PatchKind::Mailbox {
			email,
			password,
			password_stdin,
			password_method,
			clear_password,
			quota,
			clear_quota,
			transport,
			clear_transport,
			login,
			receiving,
			sending,
		} => {
			if password && password_stdin {
				bail!("cannot use both --password and --password-stdin");
			}
			let email = parse_email(&email)?;

			let password_hash = if clear_password {
				Some(None)
			} else if password || password_stdin {
				Some(Some(read_password_hashed(&password_method, password_stdin)?))
			} else {
				None
			};
			let options = db::mailboxes::PatchOptions {
				password_hash,
				quota: if clear_quota { Some(None) } else { quota.map(Some) },
				transport_name: if clear_transport { Some(None) } else { transport.map(Some) },
				login,
				receiving,
				sending,
			};
			Ok(runner::run_tx(
				client,
				&email.to_string(),
				"failed to patch mailbox",
				"Successfully patched mailbox",
				|tx| db::mailboxes::patch(tx, &email, &options),
			))
		}
		PatchKind::Alias { email, enabled } => {
			let email = parse_email(&email)?;
			let options = db::aliases::PatchOptions { enabled };
			Ok(runner::run_tx(
				client,
				&email.to_string(),
				"failed to patch alias",
				"Successfully patched alias",
				|tx| db::aliases::patch(tx, &email, &options),
			))
		}
		PatchKind::AliasTarget { alias, target, forward, send } => {
			let alias = parse_email(&alias)?;
			let target = parse_email(&target)?;
			let options = db::alias_targets::PatchOptions {
				forwarding: forward,
				sending: send,
			};
			Ok(runner::run_tx(
				client,
				&format!("{} -> {}", alias, target),
				"failed to patch alias target",
				"Successfully patched alias target",
				|tx| db::alias_targets::patch(tx, &alias, &target, &options),
			))
		}
		PatchKind::CatchallTarget { domain, target, forward, fallback_only } => {
			let domain = parse_fqdn_arg(&domain)?;
			let target = parse_email(&target)?;
			let options = db::catchall_targets::PatchOptions {
				forwarding: forward,
				fallback_only,
			};
			Ok(runner::run_tx(
				client,
				&format!("@{} -> {}", domain, target),
				"failed to patch catchall target",
				"Successfully patched catchall target",
				|tx| db::catchall_targets::patch(tx, &domain, &target, &options),
			))
		}
		PatchKind::RecipientRelayed { email, enabled } => {
			let email = parse_email(&email)?;
			let options = db::recipients_relayed::PatchOptions { enabled };
			Ok(runner::run_tx(
				client,
				&email.to_string(),
				"failed to patch relayed recipient",
				"Successfully patched relayed recipient",
				|tx| db::recipients_relayed::patch(tx, &email, &options),
			))
		}
		PatchKind::Remote { name, password, password_stdin, password_method, clear_password, enabled } => {
			if password && password_stdin {
				bail!("cannot use both --password and --password-stdin");
			}
			let password_hash = if clear_password {
				Some(None)
			} else if password || password_stdin {
				Some(Some(read_password_hashed(&password_method, password_stdin)?))
			} else {
				None
			};
			let options = db::remotes::PatchOptions { password_hash, enabled };
			Ok(runner::run_tx(
				client,
				&name,
				"failed to patch remote",
				"Successfully patched remote",
				|tx| db::remotes::patch(tx, &name, &options),
			))
		}
	}
}
