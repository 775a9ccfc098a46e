use anyhow::Result;
use postgres::Client;

use maildb::db::{self, runner};

use crate::cli::args::{parse_email, parse_fqdn_arg};
use crate::cli::RenameKind;

pub fn run(client: &mut Client, kind: RenameKind) -> Result<u32> {
	match kind {
		RenameKind::Transport { old_name, new_name } => Ok(runner::run_tx(
			client,
			&format!("{} -> {}", old_name, new_name),
			"failed to rename transport",
			"Successfully renamed transport",
			|tx| db::transports::rename(tx, &old_name, &new_name),
		)),
		RenameKind::Domain { old_fqdn, new_fqdn } => {
			let old_fqdn = parse_fqdn_arg(&old_fqdn)?;
			let new_fqdn = parse_fqdn_arg(&new_fqdn)?;
			Ok(runner::run_tx(
				client,
				&format!("{} -> {}", old_fqdn, new_fqdn),
				"failed to rename domain",
				"Successfully renamed domain",
				|tx| db::domains::rename(tx, &old_fqdn, &new_fqdn),
			))
		}
		RenameKind::Mailbox { old_email, new_email } => {
			let old_email = parse_email(&old_email)?;
			let new_email = parse_email(&new_email)?;
			Ok(runner::run_tx(
				client,
				&format!("{} -> {}", old_email, new_email),
				"failed to rename mailbox",
				"Successfully renamed mailbox",
				|tx| db::mailboxes::rename(tx, &old_email, &new_email),
			))
		}
		RenameKind::Alias { old_email, new_email } => {
			let old_email = parse_email(&old_email)?;
			let new_email = parse_email(&new_email)?;
			Ok(runner::run_tx(
				client,
				&format!("{} -> {}", old_email, new_email),
				"failed to rename alias",
				"Successfully renamed alias",
				|tx| db::aliases::rename(tx, &old_email, &new_email),
			))
		}
		RenameKind::RecipientRelayed { old_email, new_email } => {
			let old_email = parse_email(&old_email)?;
			let new_email = parse_email(&new_email)?;
			Ok(runner::run_tx(
				client,
				&format!("{} -> {}", old_email, new_email),
				"failed to rename relayed recipient",
				"Successfully renamed relayed recipient",
				|tx| db::recipients_relayed::rename(tx, &old_email, &new_email),
			))
		}
		RenameKind::Remote { old_name, new_name } => Ok(runner::run_tx(
			client,
			&format!("{} -> {}", old_name, new_name),
			"failed to rename remote",
			"Successfully renamed remote",
			|tx| db::remotes::rename(tx, &old_name, &new_name),
		)),
	}
}
