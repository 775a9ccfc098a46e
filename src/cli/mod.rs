use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};

use maildb::db;

mod args;
mod create;
mod delete;
mod describe;
mod list;
mod output;
mod password;
mod patch;
mod rename;
mod restore;
mod schema_cmd;
mod toggle;

#[derive(Parser)]
#[command(
	name = "maildb",
	version,
	about = "Mail routing database management CLI",
	long_about = "maildb manages the mail routing database: domains, mailboxes, aliases,\ntransports, remotes and their send grants."
)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
	/// Create mail system objects
	Create {
		#[command(subcommand)]
		kind: CreateKind,
	},
	/// Modify fields of existing objects
	Patch {
		#[command(subcommand)]
		kind: PatchKind,
	},
	/// Rename objects, keeping all references intact
	Rename {
		#[command(subcommand)]
		kind: RenameKind,
	},
	/// Enable objects
	Enable {
		#[command(subcommand)]
		kind: ToggleKind,
	},
	/// Disable objects
	Disable {
		#[command(subcommand)]
		kind: ToggleKind,
	},
	/// Delete objects (soft delete by default)
	Delete {
		/// Perform permanent deletion instead of soft delete
		#[arg(short, long)]
		permanent: bool,
		/// Re-stamp the deletion time of an already soft-deleted object
		#[arg(short, long)]
		force: bool,
		#[command(subcommand)]
		kind: DeleteKind,
	},
	/// Restore soft-deleted objects
	Restore {
		#[command(subcommand)]
		kind: RestoreKind,
	},
	/// List mail system objects
	List {
		/// Show only soft-deleted entries
		#[arg(long)]
		deleted: bool,
		/// Show live and soft-deleted entries
		#[arg(long)]
		all: bool,
		/// Output as JSON
		#[arg(long)]
		json: bool,
		/// Show creation and update timestamps
		#[arg(short, long)]
		verbose: bool,
		#[command(subcommand)]
		kind: ListKind,
	},
	/// Describe one object, or diagnose an unknown address
	Describe {
		/// An email address, @domain, FQDN, transport or remote name
		arg: String,
		/// Output as JSON
		#[arg(long)]
		json: bool,
	},
	/// Manage the database schema
	Schema {
		#[command(subcommand)]
		kind: SchemaKind,
	},
}

#[derive(Subcommand)]
pub enum CreateKind {
	/// Create a delivery transport
	Transport {
		name: String,
		#[arg(long)]
		method: String,
		#[arg(long)]
		host: String,
		#[arg(long)]
		port: Option<u16>,
		/// Resolve the host through MX records instead of using it verbatim
		#[arg(long)]
		mx_lookup: bool,
	},
	/// Create domains of the given type
	Domain {
		#[arg(required = true)]
		fqdns: Vec<String>,
		/// Domain type: 'managed', 'relayed', 'alias' or 'canonical'
		#[arg(short = 't', long, default_value = "managed")]
		r#type: String,
		/// Transport name (required for managed/relayed domains)
		#[arg(long)]
		transport: Option<String>,
		/// Target domain FQDN (required for canonical domains)
		#[arg(long)]
		target_domain: Option<String>,
		/// Create in disabled state
		#[arg(short, long)]
		disabled: bool,
	},
	/// Create mailboxes
	Mailbox {
		#[arg(required = true)]
		emails: Vec<String>,
		/// Set password interactively (prompts)
		#[arg(long)]
		password: bool,
		/// Read password from stdin
		#[arg(long)]
		password_stdin: bool,
		/// Password hashing method: 'bcrypt' or 'argon2id'
		#[arg(long, default_value = "bcrypt")]
		password_method: String,
		/// Storage quota in megabytes
		#[arg(long)]
		quota: Option<i32>,
		/// Per-mailbox transport override
		#[arg(long)]
		transport: Option<String>,
		#[arg(long)]
		login_disabled: bool,
		#[arg(long)]
		receiving_disabled: bool,
		#[arg(long)]
		sending_disabled: bool,
	},
	/// Create aliases
	Alias {
		#[arg(required = true)]
		emails: Vec<String>,
		/// Create in disabled state
		#[arg(short, long)]
		disabled: bool,
	},
	/// Add targets to an alias
	AliasTarget {
		alias: String,
		#[arg(required = true)]
		targets: Vec<String>,
		/// Forward incoming mail to the target
		#[arg(long, default_value_t = true, action = ArgAction::Set)]
		forward: bool,
		/// Allow the target to send with the alias as sender (local targets only)
		#[arg(long)]
		send: bool,
	},
	/// Add catch-all targets to a domain
	CatchallTarget {
		domain: String,
		#[arg(required = true)]
		targets: Vec<String>,
		/// Forward incoming mail to the target
		#[arg(long, default_value_t = true, action = ArgAction::Set)]
		forward: bool,
		/// Use the target only when no explicit recipient matched
		#[arg(long, default_value_t = true, action = ArgAction::Set)]
		fallback_only: bool,
	},
	/// Create relayed recipients
	RecipientRelayed {
		#[arg(required = true)]
		emails: Vec<String>,
		/// Create in disabled state
		#[arg(short, long)]
		disabled: bool,
	},
	/// Create an outbound remote identity
	Remote {
		name: String,
		/// Set password interactively (prompts)
		#[arg(long)]
		password: bool,
		/// Read password from stdin
		#[arg(long)]
		password_stdin: bool,
		/// Password hashing method: 'bcrypt' or 'argon2id'
		#[arg(long, default_value = "bcrypt")]
		password_method: String,
		/// Create in disabled state
		#[arg(short, long)]
		disabled: bool,
	},
	/// Grant a remote the right to send as a pattern or whole domain
	SendGrant {
		remote: String,
		/// 'pattern@domain' (SQL-LIKE) or '@domain' for the whole domain
		email: String,
	},
}

#[derive(Subcommand)]
pub enum PatchKind {
	Transport {
		name: String,
		#[arg(long)]
		method: Option<String>,
		#[arg(long)]
		host: Option<String>,
		#[arg(long)]
		port: Option<u16>,
		/// Unset the port
		#[arg(long, conflicts_with = "port")]
		clear_port: bool,
		#[arg(long)]
		mx_lookup: Option<bool>,
	},
	Domain {
		fqdn: String,
		/// New transport (managed/relayed domains)
		#[arg(long)]
		transport: Option<String>,
		/// New target domain (canonical domains)
		#[arg(long)]
		target_domain: Option<String>,
	},
	Mailbox {
		email: String,
		#[arg(long)]
		password: bool,
		#[arg(long)]
		password_stdin: bool,
		#[arg(long, default_value = "bcrypt")]
		password_method: String,
		/// Unset the password
		#[arg(long, conflicts_with_all = ["password", "password_stdin"])]
		clear_password: bool,
		#[arg(long)]
		quota: Option<i32>,
		#[arg(long, conflicts_with = "quota")]
		clear_quota: bool,
		#[arg(long)]
		transport: Option<String>,
		#[arg(long, conflicts_with = "transport")]
		clear_transport: bool,
		#[arg(long)]
		login: Option<bool>,
		#[arg(long)]
		receiving: Option<bool>,
		#[arg(long)]
		sending: Option<bool>,
	},
	Alias {
		email: String,
		#[arg(long)]
		enabled: Option<bool>,
	},
	AliasTarget {
		alias: String,
		target: String,
		#[arg(long)]
		forward: Option<bool>,
		#[arg(long)]
		send: Option<bool>,
	},
	CatchallTarget {
		domain: String,
		target: String,
		#[arg(long)]
		forward: Option<bool>,
		#[arg(long)]
		fallback_only: Option<bool>,
	},
	RecipientRelayed {
		email: String,
		#[arg(long)]
		enabled: Option<bool>,
	},
	Remote {
		name: String,
		#[arg(long)]
		password: bool,
		#[arg(long)]
		password_stdin: bool,
		#[arg(long, default_value = "bcrypt")]
		password_method: String,
		#[arg(long, conflicts_with_all = ["password", "password_stdin"])]
		clear_password: bool,
		#[arg(long)]
		enabled: Option<bool>,
	},
}

#[derive(Subcommand)]
pub enum RenameKind {
	Transport { old_name: String, new_name: String },
	Domain { old_fqdn: String, new_fqdn: String },
	/// May move the mailbox to another managed domain
	Mailbox { old_email: String, new_email: String },
	/// May move the alias to another domain
	Alias { old_email: String, new_email: String },
	RecipientRelayed { old_email: String, new_email: String },
	Remote { old_name: String, new_name: String },
}

#[derive(Subcommand)]
pub enum ToggleKind {
	Domain {
		#[arg(required = true)]
		fqdns: Vec<String>,
	},
	/// Toggles login/receiving/sending; all three when no flag is given
	Mailbox {
		#[arg(required = true)]
		emails: Vec<String>,
		#[arg(long)]
		login: bool,
		#[arg(long)]
		receiving: bool,
		#[arg(long)]
		sending: bool,
	},
	Alias {
		#[arg(required = true)]
		emails: Vec<String>,
	},
	/// Toggles forwarding/sending edges; forwarding when no flag is given
	AliasTarget {
		alias: String,
		#[arg(required = true)]
		targets: Vec<String>,
		#[arg(long)]
		forwarding: bool,
		#[arg(long)]
		sending: bool,
	},
	CatchallTarget {
		domain: String,
		#[arg(required = true)]
		targets: Vec<String>,
	},
	RecipientRelayed {
		#[arg(required = true)]
		emails: Vec<String>,
	},
	Remote {
		#[arg(required = true)]
		names: Vec<String>,
	},
}

#[derive(Subcommand)]
pub enum DeleteKind {
	Transport {
		#[arg(required = true)]
		names: Vec<String>,
	},
	Domain {
		#[arg(required = true)]
		fqdns: Vec<String>,
	},
	Mailbox {
		#[arg(required = true)]
		emails: Vec<String>,
	},
	Alias {
		#[arg(required = true)]
		emails: Vec<String>,
	},
	AliasTarget {
		alias: String,
		#[arg(required = true)]
		targets: Vec<String>,
	},
	CatchallTarget {
		domain: String,
		#[arg(required = true)]
		targets: Vec<String>,
	},
	RecipientRelayed {
		#[arg(required = true)]
		emails: Vec<String>,
	},
	Remote {
		#[arg(required = true)]
		names: Vec<String>,
	},
	SendGrant {
		remote: String,
		email: String,
	},
}

#[derive(Subcommand)]
pub enum RestoreKind {
	Transport {
		#[arg(required = true)]
		names: Vec<String>,
	},
	Domain {
		#[arg(required = true)]
		fqdns: Vec<String>,
	},
	Mailbox {
		#[arg(required = true)]
		emails: Vec<String>,
	},
	Alias {
		#[arg(required = true)]
		emails: Vec<String>,
	},
	AliasTarget {
		alias: String,
		#[arg(required = true)]
		targets: Vec<String>,
	},
	CatchallTarget {
		domain: String,
		#[arg(required = true)]
		targets: Vec<String>,
	},
	RecipientRelayed {
		#[arg(required = true)]
		emails: Vec<String>,
	},
	Remote {
		#[arg(required = true)]
		names: Vec<String>,
	},
	SendGrant {
		remote: String,
		email: String,
	},
}

#[derive(Subcommand)]
pub enum ListKind {
	Transports,
	Domains,
	Mailboxes { domains: Vec<String> },
	Aliases { domains: Vec<String> },
	AliasTargets { aliases: Vec<String> },
	CatchallTargets { domains: Vec<String> },
	RecipientsRelayed { domains: Vec<String> },
	Remotes,
	SendGrants { remotes: Vec<String> },
	LoginAttempts { addresses: Vec<String> },
}

#[derive(Subcommand)]
pub enum SchemaKind {
	/// Show current and latest schema version
	Status,
	/// Apply pending migrations
	Upgrade {
		/// Stop at this version instead of the latest
		#[arg(long)]
		target: Option<i32>,
	},
	/// Drop all schemas created by this tool. Irreversible.
	Purge {
		/// Confirm the purge
		#[arg(long)]
		yes: bool,
	},
}

/// Executes the parsed command; returns the number of failed items.
pub fn run(cli: Cli) -> anyhow::Result<u32> {
	let mut client = db::connect().context("failed to connect to database")?;

	match cli.command {
		Command::Create { kind } => create::run(&mut client, kind),
		Command::Patch { kind } => patch::run(&mut client, kind),
		Command::Rename { kind } => rename::run(&mut client, kind),
		Command::Enable { kind } => toggle::run(&mut client, kind, true),
		Command::Disable { kind } => toggle::run(&mut client, kind, false),
		Command::Delete { permanent, force, kind } => delete::run(&mut client, kind, permanent, force),
		Command::Restore { kind } => restore::run(&mut client, kind),
		Command::List { deleted, all, json, verbose, kind } => {
			list::run(&mut client, kind, deleted, all, json, verbose)
		}
		Command::Describe { arg, json } => describe::run(&mut client, &arg, json),
		Command::Schema { kind } => schema_cmd::run(&mut client, kind),
	}
}
