use anyhow::Result;
use postgres::Client;

use maildb::db::{self, runner};

use crate::cli::args::{parse_email, parse_emails, parse_fqdn_arg, parse_fqdns, parse_wildcard};
use crate::cli::RestoreKind;

pub fn run(client: &mut Client, kind: RestoreKind) -> Result<u32> {
	match kind {
		RestoreKind::Transport { names } => Ok(runner::run_for_each(
			client,
			&names,
			|name| name.clone(),
			"failed to restore transport",
			"Successfully restored transport",
			|tx, name| db::transports::restore(tx, name),
		)),
		RestoreKind::Domain { fqdns } => {
			let fqdns = parse_fqdns(&fqdns)?;
			Ok(runner::run_for_each(
				client,
				&fqdns,
				|fqdn| fqdn.clone(),
				"failed to restore domain",
				"Successfully restored domain",
				|tx, fqdn| db::domains::restore(tx, fqdn),
			))
		}
		RestoreKind::Mailbox { emails } => {
			let emails = parse_emails(&emails)?;
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to restore mailbox",
				"Successfully restored mailbox",
				|tx, email| db::mailboxes::restore(tx, email),
			))
		}
		RestoreKind::Alias { emails } => {
			let emails = parse_emails(&emails)?;
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to restore alias",
				"Successfully restored alias",
				|tx, email| db::aliases::restore(tx, email),
			))
		}
		RestoreKind::AliasTarget { alias, targets } => {
			let alias = parse_email(&alias)?;
			let targets = parse_emails(&targets)?;
			Ok(runner::run_for_each(
				client,
				&targets,
				|target| format!("{} -> {}", alias, target),
				"failed to restore alias target",
				"Successfully restored alias target",
				|tx, target| db::alias_targets::restore(tx, &alias, target),
			))
		}
		RestoreKind::CatchallTarget { domain, targets } => {
			let domain = parse_fqdn_arg(&domain)?;
			let targets = parse_emails(&targets)?;
			Ok(runner::run_for_each(
				client,
				&targets,
				|target| format!("@{} -> {}", domain, target),
				"failed to restore catchall target",
				"Successfully restored catchall target",
				|tx, target| db::catchall_targets::restore(tx, &domain, target),
			))
		}
		RestoreKind::RecipientRelayed { emails } => {
			let emails = parse_emails(&emails)?;
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to restore relayed recipient",
				"Successfully restored relayed recipient",
				|tx, email| db::recipients_relayed::restore(tx, email),
			))
		}
		RestoreKind::Remote { names } => Ok(runner::run_for_each(
			client,
			&names,
			|name| name.clone(),
			"failed to restore remote",
			"Successfully restored remote",
			|tx, name| db::remotes::restore(tx, name),
		)),
		RestoreKind::SendGrant { remote, email } => {
			let email = parse_wildcard(&email)?;
			Ok(runner::run_tx(
				client,
				&format!("{} -> {}", remote, email),
				"failed to restore send grant",
				"Successfully restored send grant",
				|tx| db::send_grants::restore(tx, &remote, &email),
			))
		}
	}
}
