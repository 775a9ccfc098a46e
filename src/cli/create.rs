use anyhow::{bail, Result};
use postgres::Client;

use maildb::db::{self, runner};
use maildb::db::domains::DomainType;

use crate::cli::args::{parse_email, parse_emails, parse_fqdn_arg, parse_fqdns, parse_wildcard};
use crate::cli::password::read_password_hashed;
use crate::cli::CreateKind;

pub fn run(client: &mut Client, kind: CreateKind) -> Result<u32> {
	match kind {
		CreateKind::Transport { name, method, host, port, mx_lookup } => {
			let options = db::transports::CreateOptions { method, host, port, mx_lookup };
			Ok(runner::run_tx(
				client,
				&name,
				"failed to create transport",
				"Successfully created transport",
				|tx| db::transports::create(tx, &name, &options),
			))
		}
		CreateKind::Domain { fqdns, r#type, transport, target_domain, disabled } => {
			let domain_type = DomainType::parse(&r#type.to_lowercase())?;
			let fqdns = parse_fqdns(&fqdns)?;
			let options = db::domains::CreateOptions {
				domain_type,
				transport_name: transport,
				target_domain_fqdn: match target_domain {
					Some(target) => Some(parse_fqdn_arg(&target)?),
					None => None,
				},
				enabled: !disabled,
			};
			Ok(runner::run_for_each(
				client,
				&fqdns,
				|fqdn| fqdn.clone(),
				"failed to create domain",
				"Successfully created domain",
				|tx, fqdn| db::domains::create(tx, fqdn, &options),
			))
		}
		CreateKind::Mailbox {
			emails,
			password,
			password_stdin,
			password_method,
			quota,
			transport,
			login_disabled,
			receiving_disabled,
			sending_disabled,
		} => {
			if password && password_stdin {
				bail!("cannot use both --password and --password-stdin");
			}
			if emails.len() > 1 && (password || password_stdin) {
				bail!("cannot set a password while creating multiple mailboxes");
			}
			let emails = parse_emails(&emails)?;

			let password_hash = if password || password_stdin {
				Some(read_password_hashed(&password_method, password_stdin)?)
			} else {
				None
			};
			let options = db::mailboxes::CreateOptions {
				password_hash,
				quota,
				transport_name: transport,
				login_enabled: !login_disabled,
				receiving_enabled: !receiving_disabled,
				sending_enabled: !sending_disabled,
			};
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to create mailbox",
				"Successfully created mailbox",
				|tx, email| db::mailboxes::create(tx, email, &options),
			))
		}
		CreateKind::Alias { emails, disabled } => {
			let emails = parse_emails(&emails)?;
			let options = db::aliases::CreateOptions { enabled: !disabled };
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to create alias",
				"Successfully created alias",
				|tx, email| db::aliases::create(tx, email, &options),
			))
		}
		CreateKind::AliasTarget { alias, targets, forward, send } => {
			let alias = parse_email(&alias)?;
			let targets = parse_emails(&targets)?;
			let options = db::alias_targets::CreateOptions {
				forward_enabled: forward,
				send_enabled: send,
			};
			Ok(runner::run_for_each(
				client,
				&targets,
				|target| format!("{} -> {}", alias, target),
				"failed to create alias target",
				"Successfully created alias target",
				|tx, target| db::alias_targets::create(tx, &alias, target, &options),
			))
		}
		CreateKind::CatchallTarget { domain, targets, forward, fallback_only } => {
			let domain = parse_fqdn_arg(&domain)?;
			let targets = parse_emails(&targets)?;
			let options = db::catchall_targets::CreateOptions {
				forward_enabled: forward,
				fallback_only,
			};
			Ok(runner::run_for_each(
				client,
				&targets,
				|target| format!("@{} -> {}", domain, target),
				"failed to create catchall target",
				"Successfully created catchall target",
				|tx, target| db::catchall_targets::create(tx, &domain, target, &options),
			))
		}
		CreateKind::RecipientRelayed { emails, disabled } => {
			let emails = parse_emails(&emails)?;
			let options = db::recipients_relayed::CreateOptions { enabled: !disabled };
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to create relayed recipient",
				"Successfully created relayed recipient",
				|tx, email| db::recipients_relayed::create(tx, email, &options),
			))
		}
		CreateKind::Remote { name, password, password_stdin, password_method, disabled } => {
			if password && password_stdin {
				bail!("cannot use both --password and --password-stdin");
			}
			let password_hash = if password || password_stdin {
				Some(read_password_hashed(&password_method, password_stdin)?)
			} else {
				None
			};
			let options = db::remotes::CreateOptions {
				password_hash,
				enabled: !disabled,
			};
			Ok(runner::run_tx(
				client,
				&name,
				"failed to create remote",
				"Successfully created remote",
				|tx| db::remotes::create(tx, &name, &options),
			))
		}
		CreateKind::SendGrant { remote, email } => {
			let email = parse_wildcard(&email)?;
			Ok(runner::run_tx(
				client,
				&format!("{} -> {}", remote, email),
				"failed to create send grant",
				"Successfully created send grant",
				|tx| db::send_grants::create(tx, &remote, &email),
			))
		}
	}
}
