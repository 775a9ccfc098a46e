use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_derive::Serialize;

use crate::error::{Error, Result};

static LOCAL_PART_ALLOWED: Lazy<Regex> =
	Lazy::new(|| Regex::new("(?i)^[a-z0-9!#$%&'*+\\-/=?^_`{|}~.]+$").unwrap());
static FQDN_ALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-zA-Z0-9.-]+$").unwrap());
static FQDN_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?i)^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").unwrap());

/// Validates a domain name with the same rules the schema enforces and
/// returns it lowercased (FQDN matching is case-insensitive everywhere).
pub fn parse_fqdn(input: &str) -> Result<String> {
	let fqdn = input.trim();

	if fqdn.len() < 3 || fqdn.len() > 253 {
		return Err(Error::InputInvalid(format!(
			"domain length must be between 3 and 253 characters: {:?}",
			fqdn
		)));
	}
	if !FQDN_ALLOWED_CHARS.is_match(fqdn) {
		return Err(Error::InputInvalid(format!("domain contains invalid characters: {:?}", fqdn)));
	}
	if !FQDN_PATTERN.is_match(fqdn) {
		return Err(Error::InputInvalid(format!("domain is not a valid FQDN: {:?}", fqdn)));
	}

	Ok(fqdn.to_ascii_lowercase())
}

fn validate_local_part(local: &str) -> Result<()> {
	if local.is_empty() || local.len() > 64 {
		return Err(Error::InputInvalid(
			"local part length must be between 1 and 64 characters".to_owned(),
		));
	}
	if local.starts_with('.') || local.ends_with('.') {
		return Err(Error::InputInvalid("local part cannot start or end with a dot".to_owned()));
	}
	if local.contains("..") {
		return Err(Error::InputInvalid("local part cannot contain consecutive dots".to_owned()));
	}
	if !LOCAL_PART_ALLOWED.is_match(local) {
		return Err(Error::InputInvalid(format!("local part contains invalid characters: {:?}", local)));
	}
	Ok(())
}

/// A validated mail address. The local part keeps its case, the domain is
/// stored lowercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct EmailAddress {
	pub local_part: String,
	pub fqdn: String,
}

impl EmailAddress {
	pub fn parse(address: &str) -> Result<Self> {
		let address = address.trim();
		if address.matches('@').count() != 1 {
			return Err(Error::InputInvalid(format!(
				"invalid email format, expected name@domain: {:?}",
				address
			)));
		}

		let (local_part, domain_part) = address.split_once('@').unwrap();
		validate_local_part(local_part)?;
		let fqdn = parse_fqdn(domain_part)?;

		Ok(EmailAddress {
			local_part: local_part.to_owned(),
			fqdn,
		})
	}
}

impl fmt::Display for EmailAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}@{}", self.local_part, self.fqdn)
	}
}

/// Address form used by send grants: `@domain` denotes the whole-domain
/// wildcard, `name@domain` a SQL-LIKE pattern for the local part.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct EmailOrWildcard {
	pub local_part: Option<String>,
	pub fqdn: String,
}

impl EmailOrWildcard {
	pub fn parse(address: &str) -> Result<Self> {
		let address = address.trim();
		if address.matches('@').count() != 1 {
			return Err(Error::InputInvalid(format!(
				"invalid email format, expected [name]@domain: {:?}",
				address
			)));
		}

		let (local_part, domain_part) = address.split_once('@').unwrap();
		let local_part = if local_part.is_empty() {
			None
		} else {
			// LIKE patterns reuse the local part grammar (% and _ are atext
			// characters already), plus backslash for escapes
			let stripped: String = local_part.chars().filter(|&c| c != '\\').collect();
			if !stripped.is_empty() {
				validate_local_part(&stripped)?;
			}
			if local_part.len() > 64 {
				return Err(Error::InputInvalid(
					"local part length must be between 1 and 64 characters".to_owned(),
				));
			}
			Some(local_part.to_owned())
		};
		let fqdn = parse_fqdn(domain_part)?;

		Ok(EmailOrWildcard { local_part, fqdn })
	}

	pub fn is_wildcard(&self) -> bool {
		self.local_part.is_none()
	}
}

impl fmt::Display for EmailOrWildcard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}@{}", self.local_part.as_deref().unwrap_or(""), self.fqdn)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_plain_address() {
		let email = EmailAddress::parse("alice@example.org").unwrap();
		assert_eq!(email.local_part, "alice");
		assert_eq!(email.fqdn, "example.org");
		assert_eq!(email.to_string(), "alice@example.org");
	}

	#[test]
	fn domain_is_lowercased_local_part_is_not() {
		let email = EmailAddress::parse("  Alice.B@Example.ORG ").unwrap();
		assert_eq!(email.local_part, "Alice.B");
		assert_eq!(email.fqdn, "example.org");
	}

	#[test]
	fn rejects_malformed_addresses() {
		for bad in [
			"alice",
			"alice@@example.org",
			"@example.org",
			".alice@example.org",
			"alice.@example.org",
			"ali..ce@example.org",
			"al ice@example.org",
			"alice@ex",
			"alice@-example.org",
			"alice@example",
			"alice@example..org",
		] {
			let err = EmailAddress::parse(bad).unwrap_err();
			assert_eq!(err.tag(), "input-invalid", "expected rejection of {:?}", bad);
		}
	}

	#[test]
	fn rejects_overlong_parts() {
		let local = "a".repeat(65);
		assert!(EmailAddress::parse(&format!("{}@example.org", local)).is_err());
		let fqdn = format!("{}.org", "a".repeat(250));
		assert!(EmailAddress::parse(&format!("a@{}", fqdn)).is_err());
	}

	#[test]
	fn fqdn_label_rules() {
		assert!(parse_fqdn("mail.example.org").is_ok());
		assert_eq!(parse_fqdn("MAIL.Example.Org").unwrap(), "mail.example.org");
		assert!(parse_fqdn("example.o").is_err());
		assert!(parse_fqdn("exa_mple.org").is_err());
		assert!(parse_fqdn("example-.org").is_err());
	}

	#[test]
	fn wildcard_form() {
		let grant = EmailOrWildcard::parse("@example.org").unwrap();
		assert!(grant.is_wildcard());
		assert_eq!(grant.to_string(), "@example.org");

		let grant = EmailOrWildcard::parse("sales%@example.org").unwrap();
		assert!(!grant.is_wildcard());
		assert_eq!(grant.local_part.as_deref(), Some("sales%"));

		let grant = EmailOrWildcard::parse("x_y@example.org").unwrap();
		assert_eq!(grant.local_part.as_deref(), Some("x_y"));
	}
}
