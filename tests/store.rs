//! End-to-end tests against a live PostgreSQL instance.
//!
//! They run only when MAILDB_TEST_DSN is set (e.g.
//! `host=localhost user=postgres dbname=maildb_test`) and wipe that
//! database completely. Without the variable the test is a no-op skip.

use chrono::Duration;
use postgres::{Client, NoTls};

use maildb::address::{EmailAddress, EmailOrWildcard};
use maildb::auth::{self, HashScheme};
use maildb::db::{self, DeleteOptions};
use maildb::error::Error;
use maildb::resolve::{dovecot, postfix};
use maildb::schema;

const MAX_DEPTH: u32 = 50;

fn test_client() -> Option<Client> {
	let dsn = match std::env::var("MAILDB_TEST_DSN") {
		Ok(dsn) => dsn,
		Err(_) => {
			eprintln!("skipping: MAILDB_TEST_DSN not set");
			return None;
		}
	};
	Some(Client::connect(&dsn, NoTls).expect("failed to connect to test database"))
}

fn email(address: &str) -> EmailAddress {
	EmailAddress::parse(address).unwrap()
}

fn grant(address: &str) -> EmailOrWildcard {
	EmailOrWildcard::parse(address).unwrap()
}

fn create_mailbox(db: &mut Client, address: &str, options: db::mailboxes::CreateOptions) {
	db::mailboxes::create(db, &email(address), &options).unwrap();
}

fn create_alias(db: &mut Client, address: &str) {
	db::aliases::create(db, &email(address), &db::aliases::CreateOptions::default()).unwrap();
}

fn link(db: &mut Client, alias: &str, target: &str, options: db::alias_targets::CreateOptions) {
	db::alias_targets::create(db, &email(alias), &email(target), &options).unwrap();
}

#[test]
fn store_end_to_end() {
	let mut db = match test_client() {
		Some(db) => db,
		None => return,
	};

	schema::purge(&mut db).unwrap();
	assert_eq!(schema::current_version(&mut db).unwrap(), 0);
	schema::upgrade(&mut db, schema::latest_version()).unwrap();
	assert_eq!(schema::current_version(&mut db).unwrap(), schema::latest_version());
	// re-running the upgrade applies nothing and succeeds
	schema::upgrade(&mut db, schema::latest_version()).unwrap();

	seed_fixtures(&mut db);

	canonical_rewrite(&mut db);
	chain_depth_limit(&mut db);
	catchall_fallback(&mut db);
	sender_logins_mailboxes(&mut db);
	sender_logins_remotes(&mut db);
	soft_delete_cascade(&mut db);
	transports_and_predicates(&mut db);
	foreign_and_cycles(&mut db);
	rename_keeps_edges(&mut db);
	invariants(&mut db);
	authentication(&mut db);
	login_audit(&mut db);
	imap_lookups(&mut db);
}

fn seed_fixtures(db: &mut Client) {
	db::transports::create(
		db,
		"local",
		&db::transports::CreateOptions {
			method: "lmtp".to_owned(),
			host: "mail.internal.test".to_owned(),
			port: None,
			mx_lookup: false,
		},
	)
	.unwrap();
	db::transports::create(
		db,
		"relay-out",
		&db::transports::CreateOptions {
			method: "smtp".to_owned(),
			host: "relay.upstream.test".to_owned(),
			port: Some(2525),
			mx_lookup: true,
		},
	)
	.unwrap();

	for fqdn in ["real.test", "d.test", "chain.test", "gone.test"] {
		db::domains::create(
			db,
			fqdn,
			&db::domains::CreateOptions {
				domain_type: db::domains::DomainType::Managed,
				transport_name: Some("local".to_owned()),
				target_domain_fqdn: None,
				enabled: true,
			},
		)
		.unwrap();
	}
	db::domains::create(
		db,
		"relay.test",
		&db::domains::CreateOptions {
			domain_type: db::domains::DomainType::Relayed,
			transport_name: Some("relay-out".to_owned()),
			target_domain_fqdn: None,
			enabled: true,
		},
	)
	.unwrap();
	db::domains::create(
		db,
		"fwd.test",
		&db::domains::CreateOptions {
			domain_type: db::domains::DomainType::Alias,
			transport_name: None,
			target_domain_fqdn: None,
			enabled: true,
		},
	)
	.unwrap();
	db::domains::create(
		db,
		"canon.test",
		&db::domains::CreateOptions {
			domain_type: db::domains::DomainType::Canonical,
			transport_name: None,
			target_domain_fqdn: Some("real.test".to_owned()),
			enabled: true,
		},
	)
	.unwrap();

	create_mailbox(db, "alice@real.test", db::mailboxes::CreateOptions::default());
	create_mailbox(db, "mbx@d.test", db::mailboxes::CreateOptions::default());
	create_mailbox(db, "c@d.test", db::mailboxes::CreateOptions::default());
	create_mailbox(db, "a@d.test", db::mailboxes::CreateOptions::default());
	create_mailbox(
		db,
		"b@d.test",
		db::mailboxes::CreateOptions {
			sending_enabled: false,
			..Default::default()
		},
	);
	create_mailbox(db, "m@chain.test", db::mailboxes::CreateOptions::default());
	create_mailbox(db, "u@gone.test", db::mailboxes::CreateOptions::default());

	db::recipients_relayed::create(
		db,
		&email("rr@relay.test"),
		&db::recipients_relayed::CreateOptions::default(),
	)
	.unwrap();

	// explicit alias plus fallback-only catch-all on d.test
	create_alias(db, "x@d.test");
	link(db, "x@d.test", "mbx@d.test", db::alias_targets::CreateOptions::default());
	db::catchall_targets::create(
		db,
		"d.test",
		&email("c@d.test"),
		&db::catchall_targets::CreateOptions {
			forward_enabled: true,
			fallback_only: true,
		},
	)
	.unwrap();

	// sending-authorized list alias
	create_alias(db, "list@d.test");
	link(
		db,
		"list@d.test",
		"a@d.test",
		db::alias_targets::CreateOptions {
			forward_enabled: true,
			send_enabled: true,
		},
	);
	link(
		db,
		"list@d.test",
		"b@d.test",
		db::alias_targets::CreateOptions {
			forward_enabled: true,
			send_enabled: true,
		},
	);

	// 50-link chain: a50 -> a49 -> ... -> a1 -> m@chain.test
	create_alias(db, "a1@chain.test");
	link(db, "a1@chain.test", "m@chain.test", db::alias_targets::CreateOptions::default());
	for i in 2..=50 {
		create_alias(db, &format!("a{}@chain.test", i));
		link(
			db,
			&format!("a{}@chain.test", i),
			&format!("a{}@chain.test", i - 1),
			db::alias_targets::CreateOptions::default(),
		);
	}

	db::remotes::create(db, "r", &db::remotes::CreateOptions::default()).unwrap();
	db::remotes::create(db, "r2", &db::remotes::CreateOptions::default()).unwrap();
	db::send_grants::create(db, "r", &grant("sales%@d.test")).unwrap();
	db::send_grants::create(db, "r", &grant("@d.test")).unwrap();
	db::send_grants::create(db, "r2", &grant("x_y@d.test")).unwrap();
	db::send_grants::create(db, "r2", &grant("lit\\_eral@d.test")).unwrap();
}

fn canonical_rewrite(db: &mut Client) {
	assert_eq!(
		postfix::canonical_maps(db, "canon.test", "alice").unwrap(),
		Some("alice@real.test".to_owned())
	);

	db::domains::delete(db, "real.test", &DeleteOptions::default()).unwrap();
	assert_eq!(postfix::canonical_maps(db, "canon.test", "alice").unwrap(), None);
	db::domains::restore(db, "real.test").unwrap();
	assert!(postfix::canonical_maps(db, "canon.test", "alice").unwrap().is_some());
}

fn chain_depth_limit(db: &mut Client) {
	assert_eq!(
		postfix::virtual_alias_maps(db, "chain.test", "a50", 50).unwrap(),
		vec!["m@chain.test".to_owned()]
	);
	assert!(postfix::virtual_alias_maps(db, "chain.test", "a50", 10).unwrap().is_empty());
	// one hop short of the mailbox
	assert!(postfix::virtual_alias_maps(db, "chain.test", "a50", 49).unwrap().is_empty());
}

fn catchall_fallback(db: &mut Client) {
	// explicit match wins, fallback-only target stays out
	assert_eq!(
		postfix::virtual_alias_maps(db, "d.test", "x", MAX_DEPTH).unwrap(),
		vec!["mbx@d.test".to_owned()]
	);
	// no explicit match: fallback applies
	assert_eq!(
		postfix::virtual_alias_maps(db, "d.test", "y", MAX_DEPTH).unwrap(),
		vec!["c@d.test".to_owned()]
	);

	// a disabled alias counts as no explicit match
	db::aliases::patch(db, &email("x@d.test"), &db::aliases::PatchOptions { enabled: Some(false) })
		.unwrap();
	assert_eq!(
		postfix::virtual_alias_maps(db, "d.test", "x", MAX_DEPTH).unwrap(),
		vec!["c@d.test".to_owned()]
	);
	db::aliases::patch(db, &email("x@d.test"), &db::aliases::PatchOptions { enabled: Some(true) })
		.unwrap();
	assert_eq!(
		postfix::virtual_alias_maps(db, "d.test", "x", MAX_DEPTH).unwrap(),
		vec!["mbx@d.test".to_owned()]
	);
}

fn sender_logins_mailboxes(db: &mut Client) {
	// only the sending-enabled mailbox of the list survives
	assert_eq!(
		postfix::smtpd_sender_login_maps_mailboxes(db, "d.test", "list", MAX_DEPTH).unwrap(),
		vec!["a@d.test".to_owned()]
	);
	// a mailbox may send as itself
	assert_eq!(
		postfix::smtpd_sender_login_maps_mailboxes(db, "d.test", "a", MAX_DEPTH).unwrap(),
		vec!["a@d.test".to_owned()]
	);
	assert!(postfix::smtpd_sender_login_maps_mailboxes(db, "d.test", "b", MAX_DEPTH)
		.unwrap()
		.is_empty());
	// forwarding-only edges do not authorize sending
	assert!(postfix::smtpd_sender_login_maps_mailboxes(db, "d.test", "x", MAX_DEPTH)
		.unwrap()
		.is_empty());
}

fn sender_logins_remotes(db: &mut Client) {
	// both grants match, the result is de-duplicated
	assert_eq!(
		postfix::smtpd_sender_login_maps_remotes(db, "d.test", "sales42").unwrap(),
		vec!["r".to_owned()]
	);
	// only the whole-domain wildcard matches
	assert_eq!(
		postfix::smtpd_sender_login_maps_remotes(db, "d.test", "bob").unwrap(),
		vec!["r".to_owned()]
	);
	// _ matches exactly one character
	assert_eq!(
		postfix::smtpd_sender_login_maps_remotes(db, "d.test", "xay").unwrap(),
		vec!["r".to_owned(), "r2".to_owned()]
	);
	assert_eq!(
		postfix::smtpd_sender_login_maps_remotes(db, "d.test", "xaay").unwrap(),
		vec!["r".to_owned()]
	);
	// backslash escapes the metacharacter
	assert_eq!(
		postfix::smtpd_sender_login_maps_remotes(db, "d.test", "lit_eral").unwrap(),
		vec!["r".to_owned(), "r2".to_owned()]
	);
	assert_eq!(
		postfix::smtpd_sender_login_maps_remotes(db, "d.test", "litXeral").unwrap(),
		vec!["r".to_owned()]
	);

	// disabled remotes drop out
	db::remotes::patch(db, "r2", &db::remotes::PatchOptions { enabled: Some(false), ..Default::default() })
		.unwrap();
	assert_eq!(
		postfix::smtpd_sender_login_maps_remotes(db, "d.test", "xay").unwrap(),
		vec!["r".to_owned()]
	);
	db::remotes::patch(db, "r2", &db::remotes::PatchOptions { enabled: Some(true), ..Default::default() })
		.unwrap();
}

fn soft_delete_cascade(db: &mut Client) {
	db::domains::patch(
		db,
		"gone.test",
		&db::domains::PatchOptions { enabled: Some(false), ..Default::default() },
	)
	.unwrap();
	db::domains::delete(db, "gone.test", &DeleteOptions::default()).unwrap();

	assert_eq!(postfix::virtual_mailbox_maps(db, "gone.test", "u").unwrap(), None);
	assert_eq!(postfix::virtual_mailbox_domains(db, "gone.test").unwrap(), None);
	assert_eq!(postfix::transport_maps(db, "gone.test", "u").unwrap(), None);
	assert!(postfix::virtual_alias_maps(db, "gone.test", "u", MAX_DEPTH).unwrap().is_empty());

	// the mailbox row itself is untouched, only the domain is gone
	let rows = db::mailboxes::list(
		db,
		db::mailboxes::ListOptions {
			by_email: Some(&email("u@gone.test")),
			include_all: true,
			..Default::default()
		},
	)
	.unwrap();
	assert_eq!(rows.len(), 1);
	assert!(rows[0].deleted_at.is_none());

	// restoring below the deleted domain is refused
	db::mailboxes::delete(db, &email("u@gone.test"), &DeleteOptions::default()).unwrap();
	match db::mailboxes::restore(db, &email("u@gone.test")) {
		Err(Error::ParentDeleted) => {}
		other => panic!("expected ParentDeleted, got {:?}", other),
	}

	db::domains::restore(db, "gone.test").unwrap();
	db::mailboxes::restore(db, &email("u@gone.test")).unwrap();
	db::domains::patch(
		db,
		"gone.test",
		&db::domains::PatchOptions { enabled: Some(true), ..Default::default() },
	)
	.unwrap();
	assert_eq!(postfix::virtual_mailbox_maps(db, "gone.test", "u").unwrap(), Some("OK"));
}

fn transports_and_predicates(db: &mut Client) {
	assert_eq!(
		postfix::transport_maps(db, "real.test", "alice").unwrap(),
		Some("lmtp:[mail.internal.test]".to_owned())
	);
	assert_eq!(
		postfix::transport_maps(db, "relay.test", "rr").unwrap(),
		Some("smtp:relay.upstream.test:2525".to_owned())
	);
	assert_eq!(postfix::transport_maps(db, "real.test", "nobody").unwrap(), None);

	// the per-mailbox override wins over the domain transport
	db::mailboxes::patch(
		db,
		&email("alice@real.test"),
		&db::mailboxes::PatchOptions {
			transport_name: Some(Some("relay-out".to_owned())),
			..Default::default()
		},
	)
	.unwrap();
	assert_eq!(
		postfix::transport_maps(db, "real.test", "alice").unwrap(),
		Some("smtp:relay.upstream.test:2525".to_owned())
	);
	db::mailboxes::patch(
		db,
		&email("alice@real.test"),
		&db::mailboxes::PatchOptions {
			transport_name: Some(None),
			..Default::default()
		},
	)
	.unwrap();
	assert_eq!(
		postfix::transport_maps(db, "real.test", "alice").unwrap(),
		Some("lmtp:[mail.internal.test]".to_owned())
	);

	assert_eq!(postfix::virtual_mailbox_domains(db, "real.test").unwrap(), Some("OK"));
	assert_eq!(postfix::virtual_mailbox_domains(db, "relay.test").unwrap(), None);
	assert_eq!(postfix::relay_domains(db, "relay.test").unwrap(), Some("OK"));
	assert_eq!(postfix::virtual_alias_domains(db, "fwd.test").unwrap(), Some("OK"));
	assert_eq!(postfix::relay_recipient_maps(db, "relay.test", "rr").unwrap(), Some("OK"));
	assert_eq!(postfix::virtual_mailbox_maps(db, "real.test", "alice").unwrap(), Some("OK"));

	// FQDN matching is case-insensitive, inputs get trimmed
	assert_eq!(postfix::virtual_mailbox_maps(db, " REAL.Test ", "alice").unwrap(), Some("OK"));
	assert_eq!(postfix::virtual_mailbox_maps(db, "real.test", "Alice").unwrap(), None);
}

fn foreign_and_cycles(db: &mut Client) {
	create_alias(db, "ext@fwd.test");
	link(db, "ext@fwd.test", "someone@outside.example", db::alias_targets::CreateOptions::default());
	assert_eq!(
		postfix::virtual_alias_maps(db, "fwd.test", "ext", MAX_DEPTH).unwrap(),
		vec!["someone@outside.example".to_owned()]
	);
	// foreign targets never authorize sending
	assert!(postfix::smtpd_sender_login_maps_mailboxes(db, "fwd.test", "ext", MAX_DEPTH)
		.unwrap()
		.is_empty());

	// two-alias cycle with one mailbox exit
	create_alias(db, "loop1@fwd.test");
	create_alias(db, "loop2@fwd.test");
	link(db, "loop1@fwd.test", "loop2@fwd.test", db::alias_targets::CreateOptions::default());
	link(db, "loop2@fwd.test", "loop1@fwd.test", db::alias_targets::CreateOptions::default());
	link(db, "loop1@fwd.test", "alice@real.test", db::alias_targets::CreateOptions::default());
	assert_eq!(
		postfix::virtual_alias_maps(db, "fwd.test", "loop1", MAX_DEPTH).unwrap(),
		vec!["alice@real.test".to_owned()]
	);
	assert_eq!(
		postfix::virtual_alias_maps(db, "fwd.test", "loop2", MAX_DEPTH).unwrap(),
		vec!["alice@real.test".to_owned()]
	);
}

fn rename_keeps_edges(db: &mut Client) {
	create_mailbox(db, "mv@d.test", db::mailboxes::CreateOptions::default());
	create_alias(db, "mvref@d.test");
	link(db, "mvref@d.test", "mv@d.test", db::alias_targets::CreateOptions::default());
	assert_eq!(
		postfix::virtual_alias_maps(db, "d.test", "mvref", MAX_DEPTH).unwrap(),
		vec!["mv@d.test".to_owned()]
	);

	db::mailboxes::rename(db, &email("mv@d.test"), &email("mv2@real.test")).unwrap();
	assert_eq!(
		postfix::virtual_alias_maps(db, "d.test", "mvref", MAX_DEPTH).unwrap(),
		vec!["mv2@real.test".to_owned()]
	);
}

fn invariants(db: &mut Client) {
	// unique collision
	match db::mailboxes::create(db, &email("alice@real.test"), &db::mailboxes::CreateOptions::default()) {
		Err(Error::ConflictExists) => {}
		other => panic!("expected ConflictExists, got {:?}", other),
	}
	// recipient names are unique across types within a domain
	match db::aliases::create(db, &email("alice@real.test"), &db::aliases::CreateOptions::default()) {
		Err(Error::ConflictExists) => {}
		other => panic!("expected ConflictExists, got {:?}", other),
	}
	// absent parent
	match db::mailboxes::create(db, &email("who@nosuch.test"), &db::mailboxes::CreateOptions::default()) {
		Err(Error::ParentMissing) => {}
		other => panic!("expected ParentMissing, got {:?}", other),
	}
	// aliases cannot live on canonical domains
	match db::aliases::create(db, &email("nope@canon.test"), &db::aliases::CreateOptions::default()) {
		Err(Error::InvalidShape(_)) => {}
		other => panic!("expected InvalidShape, got {:?}", other),
	}
	// canonical chains are rejected
	match db::domains::create(
		db,
		"canon2.test",
		&db::domains::CreateOptions {
			domain_type: db::domains::DomainType::Canonical,
			transport_name: None,
			target_domain_fqdn: Some("canon.test".to_owned()),
			enabled: true,
		},
	) {
		Err(Error::InvalidShape(_)) => {}
		other => panic!("expected InvalidShape, got {:?}", other),
	}
	// sending from foreign targets is forbidden
	match db::alias_targets::create(
		db,
		&email("ext@fwd.test"),
		&email("other@elsewhere.example"),
		&db::alias_targets::CreateOptions {
			forward_enabled: true,
			send_enabled: true,
		},
	) {
		Err(Error::InvalidShape(_)) => {}
		other => panic!("expected InvalidShape, got {:?}", other),
	}
	// empty patch delta
	match db::transports::patch(db, "local", &db::transports::PatchOptions::default()) {
		Err(Error::AffectedRowsMismatch { .. }) => {}
		other => panic!("expected AffectedRowsMismatch, got {:?}", other),
	}
	// permanent and force are mutually exclusive
	match db::transports::delete(db, "local", &DeleteOptions { permanent: true, force: true }) {
		Err(Error::InvalidTransition(_)) => {}
		other => panic!("expected InvalidTransition, got {:?}", other),
	}
	// a referenced transport cannot be hard-deleted
	match db::transports::delete(db, "local", &DeleteOptions { permanent: true, force: false }) {
		Err(Error::InvalidTransition(_)) => {}
		other => panic!("expected InvalidTransition, got {:?}", other),
	}
	// patching something soft-deleted reports NotFound
	db::transports::create(
		db,
		"spare",
		&db::transports::CreateOptions {
			method: "smtp".to_owned(),
			host: "spare.test".to_owned(),
			port: None,
			mx_lookup: false,
		},
	)
	.unwrap();
	db::transports::delete(db, "spare", &DeleteOptions::default()).unwrap();
	match db::transports::patch(
		db,
		"spare",
		&db::transports::PatchOptions {
			host: Some("other.test".to_owned()),
			..Default::default()
		},
	) {
		Err(Error::NotFound) => {}
		other => panic!("expected NotFound, got {:?}", other),
	}
	// create -> delete -> restore round trip
	db::transports::restore(db, "spare").unwrap();
	let rows = db::transports::list(
		db,
		db::transports::ListOptions {
			by_name: Some("spare"),
			..Default::default()
		},
	)
	.unwrap();
	assert_eq!(rows.len(), 1);
	assert!(rows[0].deleted_at.is_none());
	db::transports::delete(db, "spare", &DeleteOptions { permanent: true, force: false }).unwrap();

	// a catch-all edge cannot be restored while its target's domain is gone
	db::catchall_targets::create(
		db,
		"fwd.test",
		&email("alice@real.test"),
		&db::catchall_targets::CreateOptions {
			forward_enabled: true,
			fallback_only: true,
		},
	)
	.unwrap();
	db::catchall_targets::delete(db, "fwd.test", &email("alice@real.test"), &DeleteOptions::default())
		.unwrap();
	db::domains::delete(db, "real.test", &DeleteOptions::default()).unwrap();
	match db::catchall_targets::restore(db, "fwd.test", &email("alice@real.test")) {
		Err(Error::ParentDeleted) => {}
		other => panic!("expected ParentDeleted, got {:?}", other),
	}
	db::domains::restore(db, "real.test").unwrap();
	db::catchall_targets::restore(db, "fwd.test", &email("alice@real.test")).unwrap();
	db::catchall_targets::delete(
		db,
		"fwd.test",
		&email("alice@real.test"),
		&DeleteOptions { permanent: true, force: false },
	)
	.unwrap();

	// same for a send grant whose domain is still soft-deleted
	db::send_grants::delete(db, "r", &grant("@d.test"), &DeleteOptions::default()).unwrap();
	db::domains::delete(db, "d.test", &DeleteOptions::default()).unwrap();
	match db::send_grants::restore(db, "r", &grant("@d.test")) {
		Err(Error::ParentDeleted) => {}
		other => panic!("expected ParentDeleted, got {:?}", other),
	}
	db::domains::restore(db, "d.test").unwrap();
	db::send_grants::restore(db, "r", &grant("@d.test")).unwrap();
}

fn authentication(db: &mut Client) {
	let bcrypt_hash = auth::hash_password("hunter2", HashScheme::Bcrypt).unwrap();
	db::mailboxes::patch(
		db,
		&email("alice@real.test"),
		&db::mailboxes::PatchOptions {
			password_hash: Some(Some(bcrypt_hash)),
			..Default::default()
		},
	)
	.unwrap();
	assert!(db::mailboxes::authenticate(db, &email("alice@real.test"), "hunter2").unwrap());
	assert!(!db::mailboxes::authenticate(db, &email("alice@real.test"), "wrong").unwrap());
	// unknown mailbox or unset password both answer false
	assert!(!db::mailboxes::authenticate(db, &email("nobody@real.test"), "hunter2").unwrap());
	assert!(!db::mailboxes::authenticate(db, &email("mbx@d.test"), "hunter2").unwrap());

	let argon2_hash = auth::hash_password("remote secret", HashScheme::Argon2id).unwrap();
	db::remotes::patch(
		db,
		"r",
		&db::remotes::PatchOptions {
			password_hash: Some(Some(argon2_hash)),
			..Default::default()
		},
	)
	.unwrap();
	assert!(db::remotes::authenticate(db, "r", "remote secret").unwrap());
	assert!(!db::remotes::authenticate(db, "r", "nope").unwrap());
}

fn login_audit(db: &mut Client) {
	let address = email("alice@real.test");
	assert!(db::login_attempts::check_rate_limit(db, &address, 3, Duration::hours(1)).unwrap());

	db::login_attempts::record(db, &address, false, Some("wrong password")).unwrap();
	db::login_attempts::record(db, &address, false, Some("wrong password")).unwrap();
	db::login_attempts::record(db, &address, true, None).unwrap();

	assert!(db::login_attempts::check_rate_limit(db, &address, 5, Duration::hours(1)).unwrap());
	assert!(!db::login_attempts::check_rate_limit(db, &address, 3, Duration::hours(1)).unwrap());

	let rows = db::login_attempts::list(
		db,
		db::login_attempts::ListOptions {
			filter_emails: std::slice::from_ref(&address),
			..Default::default()
		},
	)
	.unwrap();
	assert_eq!(rows.len(), 3);
	assert_eq!(rows.iter().filter(|row| row.succeeded).count(), 1);
}

fn imap_lookups(db: &mut Client) {
	let entry = dovecot::passdb_lookup(db, "real.test", "alice").unwrap().unwrap();
	assert!(entry.password_hash.is_some());
	assert!(!entry.nologin);

	db::mailboxes::patch(
		db,
		&email("alice@real.test"),
		&db::mailboxes::PatchOptions {
			login: Some(false),
			..Default::default()
		},
	)
	.unwrap();
	let entry = dovecot::passdb_lookup(db, "real.test", "alice").unwrap().unwrap();
	assert!(entry.nologin);
	db::mailboxes::patch(
		db,
		&email("alice@real.test"),
		&db::mailboxes::PatchOptions {
			login: Some(true),
			..Default::default()
		},
	)
	.unwrap();

	db::mailboxes::patch(
		db,
		&email("alice@real.test"),
		&db::mailboxes::PatchOptions {
			quota: Some(Some(2048)),
			..Default::default()
		},
	)
	.unwrap();
	let entry = dovecot::userdb_lookup(db, "real.test", "alice").unwrap().unwrap();
	assert_eq!(entry.user, "alice@real.test");
	assert_eq!(entry.quota_mb, Some(2048));

	assert!(dovecot::userdb_lookup(db, "real.test", "nobody").unwrap().is_none());
}
