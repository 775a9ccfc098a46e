use anyhow::Result;
use postgres::Client;

use maildb::db::{self, runner};

use crate::cli::args::{parse_email, parse_emails, parse_fqdn_arg, parse_fqdns};
use crate::cli::ToggleKind;

/// Shared by the enable and disable verbs; they only differ in the flag
/// value written.
pub fn run(client: &mut Client, kind: ToggleKind, enabled: bool) -> Result<u32> {
	let verbed = if enabled { "enabled" } else { "disabled" };
	let failure_word = if enabled { "enable" } else { "disable" };

	match kind {
		ToggleKind::Domain { fqdns } => {
			let fqdns = parse_fqdns(&fqdns)?;
			let options = db::domains::PatchOptions {
				enabled: Some(enabled),
				..Default::default()
			};
			Ok(runner::run_for_each(
				client,
				&fqdns,
				|fqdn| fqdn.clone(),
				&format!("failed to {} domain", failure_word),
				&format!("Successfully {} domain", verbed),
				|tx, fqdn| db::domains::patch(tx, fqdn, &options),
			))
		}
		ToggleKind::Mailbox { emails, login, receiving, sending } => {
			let emails = parse_emails(&emails)?;
			// no explicit selection toggles all three flags
			let everything = !login && !receiving && !sending;
			let options = db::mailboxes::PatchOptions {
				login: (login || everything).then_some(enabled),
				receiving: (receiving || everything).then_some(enabled),
				sending: (sending || everything).then_some(enabled),
				..Default::default()
			};
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				&format!("failed to {} mailbox", failure_word),
				&format!("Successfully {} mailbox", verbed),
				|tx, email| db::mailboxes::patch(tx, email, &options),
			))
		}
		ToggleKind::Alias { emails } => {
			let emails = parse_emails(&emails)?;
			let options = db::aliases::PatchOptions { enabled: Some(enabled) };
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				&format!("failed to {} alias", failure_word),
				&format!("Successfully {} alias", verbed),
				|tx, email| db::aliases::patch(tx, email, &options),
			))
		}
		ToggleKind::AliasTarget { alias, targets, forwarding, sending } => {
			let alias = parse_email(&alias)?;
			let targets = parse_emails(&targets)?;
			// forwarding is the default edge to toggle
			let forwarding = forwarding || !sending;
			let options = db::alias_targets::PatchOptions {
				forwarding: forwarding.then_some(enabled),
				sending: sending.then_some(enabled),
			};
			Ok(runner::run_for_each(
				client,
				&targets,
				|target| format!("{} -> {}", alias, target),
				&format!("failed to {} alias target", failure_word),
				&format!("Successfully {} alias target", verbed),
				|tx, target| db::alias_targets::patch(tx, &alias, target, &options),
			))
		}
		ToggleKind::CatchallTarget { domain, targets } => {
			let domain = parse_fqdn_arg(&domain)?;
			let targets = parse_emails(&targets)?;
			let options = db::catchall_targets::PatchOptions {
				forwarding: Some(enabled),
				fallback_only: None,
			};
			Ok(runner::run_for_each(
				client,
				&targets,
				|target| format!("@{} -> {}", domain, target),
				&format!("failed to {} catchall target", failure_word),
				&format!("Successfully {} catchall target", verbed),
				|tx, target| db::catchall_targets::patch(tx, &domain, target, &options),
			))
		}
		ToggleKind::RecipientRelayed { emails } => {
			let emails = parse_emails(&emails)?;
			let options = db::recipients_relayed::PatchOptions { enabled: Some(enabled) };
			Ok(runner::run_for_each(
				client,
				&emails,
				|email| email.to_string(),
				&format!("failed to {} relayed recipient", failure_word),
				&format!("Successfully {} relayed recipient", verbed),
				|tx, email| db::recipients_relayed::patch(tx, email, &options),
			))
		}
		ToggleKind::Remote { names } => {
			let options = db::remotes::PatchOptions {
				enabled: Some(enabled),
				..Default::default()
			};
			Ok(runner::run_for_each(
				client,
				&names,
				|name| name.clone(),
				&format!("failed to {} remote", failure_word),
				&format!("Successfully {} remote", verbed),
				|tx, name| db::remotes::patch(tx, name, &options),
			))
		}
	}
}
