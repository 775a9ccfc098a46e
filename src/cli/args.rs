use anyhow::{bail, Result};

use maildb::address::{parse_fqdn, EmailAddress, EmailOrWildcard};

pub fn parse_emails(args: &[String]) -> Result<Vec<EmailAddress>> {
	let mut emails = Vec::with_capacity(args.len());
	for arg in args {
		match EmailAddress::parse(arg) {
			Ok(email) => emails.push(email),
			Err(err) => bail!("invalid email {:?}: {}", arg, err),
		}
	}
	Ok(emails)
}

pub fn parse_email(arg: &str) -> Result<EmailAddress> {
	match EmailAddress::parse(arg) {
		Ok(email) => Ok(email),
		Err(err) => bail!("invalid email {:?}: {}", arg, err),
	}
}

pub fn parse_fqdns(args: &[String]) -> Result<Vec<String>> {
	let mut fqdns = Vec::with_capacity(args.len());
	for arg in args {
		match parse_fqdn(arg) {
			Ok(fqdn) => fqdns.push(fqdn),
			Err(err) => bail!("invalid domain {:?}: {}", arg, err),
		}
	}
	Ok(fqdns)
}

pub fn parse_fqdn_arg(arg: &str) -> Result<String> {
	match parse_fqdn(arg) {
		Ok(fqdn) => Ok(fqdn),
		Err(err) => bail!("invalid domain {:?}: {}", arg, err),
	}
}

pub fn parse_wildcard(arg: &str) -> Result<EmailOrWildcard> {
	match EmailOrWildcard::parse(arg) {
		Ok(email) => Ok(email),
		Err(err) => bail!("invalid email or domain pattern {:?}: {}", arg, err),
	}
}
