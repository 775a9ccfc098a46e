use anyhow::Result;
use postgres::Client;

use maildb::db::{self, runner, DeleteOptions};

use crate::cli::args::{parse_email, parse_emails, parse_fqdn_arg, parse_fqdns, parse_wildcard};
use crate::cli::DeleteKind;

pub fn run(client: &mut Client, kind: DeleteKind, permanent: bool, force: bool) -> Result<u32> {
	let options = DeleteOptions { permanent, force };
	let success = if permanent {
		"Successfully deleted permanently"
	} else {
		"Successfully deleted"
	};

	match kind {
		DeleteKind::Transport { names } => Ok(runner::run_for_each(
			client,
			&names,
			|name| name.clone(),
			"failed to delete transport",
			success,
			|tx, name| db::transports::delete(tx, name, &options),
		)),
		DeleteKind::Domain { fqdns } => {
			let fqdns = parse_fqdns(&fqdns)?;
			Ok(runner::run_for_each(
				client,
				&fqdns,
				|fqdn| fqdn.clone(),
				"failed to delete domain",
				success,
				|tx, fqdn| db::domains::delete(tx, fqdn, &options),
			))
		}
		DeleteKind::Mailbox { emails } => {
			let emails = parse_emails(&emails)?;
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to delete mailbox",
				success,
				|tx, email| db::mailboxes::delete(tx, email, &options),
			))
		}
		DeleteKind::Alias { emails } => {
			let emails = parse_emails(&emails)?;
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to delete alias",
				success,
				|tx, email| db::aliases::delete(tx, email, &options),
			))
		}
		DeleteKind::AliasTarget { alias, targets } => {
			let alias = parse_email(&alias)?;
			let targets = parse_emails(&targets)?;
			Ok(runner::run_for_each(
				client,
				&targets,
				|target| format!("{} -> {}", alias, target),
				"failed to delete alias target",
				success,
				|tx, target| db::alias_targets::delete(tx, &alias, target, &options),
			))
		}
		DeleteKind::CatchallTarget { domain, targets } => {
			let domain = parse_fqdn_arg(&domain)?;
			let targets = parse_emails(&targets)?;
			Ok(runner::run_for_each(
				client,
				&targets,
				|target| format!("@{} -> {}", domain, target),
				"failed to delete catchall target",
				success,
				|tx, target| db::catchall_targets::delete(tx, &domain, target, &options),
			))
		}
		DeleteKind::RecipientRelayed { emails } => {
			let emails = parse_emails(&emails)?;
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				"failed to delete relayed recipient",
				success,
				|tx, email| db::recipients_relayed::delete(tx, email, &options),
			))
		}
		DeleteKind::Remote { names } => Ok(runner::run_for_each(
			client,
			&names,
			|name| name.clone(),
			"failed to delete remote",
			success,
			|tx, name| db::remotes::delete(tx, name, &options),
		)),
		DeleteKind::SendGrant { remote, email } => {
			let email = parse_wildcard(&email)?;
			Ok(runner::run_tx(
				client,
				&format!("{} -> {}", remote, email),
				"failed to delete send grant",
				success,
				|tx| db::send_grants::delete(tx, &remote, &email, &options),
			))
		}
	}
}
