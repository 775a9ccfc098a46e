use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::{Error, Result};

/// The only argon2 version current hashes may carry (0x13). Hashes without
/// a version part default to version 10 and are rejected.
pub const ARGON2_VERSION: u32 = 19;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashScheme {
	Bcrypt,
	Argon2id,
}

impl HashScheme {
	pub fn parse(method: &str) -> Result<Self> {
		match method {
			"bcrypt" => Ok(HashScheme::Bcrypt),
			"argon2id" => Ok(HashScheme::Argon2id),
			other => Err(Error::InputInvalid(format!(
				"unsupported password hashing method: {}",
				other
			))),
		}
	}
}

/// Hashes a password for storage. The result self-describes its algorithm
/// through its prefix, which is what [`verify_password`] dispatches on.
pub fn hash_password(password: &str, scheme: HashScheme) -> Result<String> {
	match scheme {
		HashScheme::Bcrypt => {
			bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|_| Error::UnsupportedHash)
		}
		HashScheme::Argon2id => {
			let salt = SaltString::generate(&mut OsRng);
			Argon2::default()
				.hash_password(password.as_bytes(), &salt)
				.map(|hash| hash.to_string())
				.map_err(|_| Error::UnsupportedHash)
		}
	}
}

/// Verifies `given` against a stored hash. A missing hash never matches and
/// is not an error; an unknown prefix is. Comparison is constant-time in
/// both backends.
pub fn verify_password(stored: Option<&str>, given: &str) -> Result<bool> {
	let stored = match stored {
		Some(stored) => stored,
		None => return Ok(false),
	};

	if stored.starts_with("$argon2id$") {
		verify_argon2id(stored, given)
	} else if stored.starts_with("$2") {
		bcrypt::verify(given, stored).map_err(|_| Error::UnsupportedHash)
	} else {
		Err(Error::UnsupportedHash)
	}
}

fn verify_argon2id(stored: &str, given: &str) -> Result<bool> {
	let parsed = PasswordHash::new(stored).map_err(|_| Error::UnsupportedHash)?;

	match parsed.version {
		Some(version) if version == ARGON2_VERSION => {}
		Some(version) => return Err(Error::UnsupportedHashVersion(version)),
		None => return Err(Error::UnsupportedHashVersion(10)),
	}

	match Argon2::default().verify_password(given.as_bytes(), &parsed) {
		Ok(()) => Ok(true),
		Err(argon2::password_hash::Error::Password) => Ok(false),
		Err(_) => Err(Error::UnsupportedHash),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bcrypt_round_trip() {
		let hash = hash_password("correct horse", HashScheme::Bcrypt).unwrap();
		assert!(hash.starts_with("$2"));
		assert!(verify_password(Some(&hash), "correct horse").unwrap());
		assert!(!verify_password(Some(&hash), "battery staple").unwrap());
	}

	#[test]
	fn argon2id_round_trip() {
		let hash = hash_password("correct horse", HashScheme::Argon2id).unwrap();
		assert!(hash.starts_with("$argon2id$v=19$"));
		assert!(verify_password(Some(&hash), "correct horse").unwrap());
		assert!(!verify_password(Some(&hash), "battery staple").unwrap());
	}

	#[test]
	fn missing_hash_never_matches() {
		assert!(!verify_password(None, "anything").unwrap());
	}

	#[test]
	fn unknown_prefix_is_rejected() {
		for stored in ["{CRYPT}abc", "$argon2i$v=19$m=65536,t=3,p=4$c2FsdHNhbHQ$aGFzaGhhc2g", "plaintext"] {
			let err = verify_password(Some(stored), "x").unwrap_err();
			assert!(matches!(err, Error::UnsupportedHash), "{:?}", stored);
		}
	}

	#[test]
	fn wrong_argon2_version_is_rejected() {
		let stored = "$argon2id$v=16$m=65536,t=3,p=4$c2FsdHNhbHQ$aGFzaGhhc2g";
		match verify_password(Some(stored), "x").unwrap_err() {
			Error::UnsupportedHashVersion(version) => assert_eq!(version, 16),
			other => panic!("unexpected error: {:?}", other),
		}

		// no version component at all defaults to 10
		let stored = "$argon2id$m=65536,t=3,p=4$c2FsdHNhbHQ$aGFzaGhhc2g";
		match verify_password(Some(stored), "x").unwrap_err() {
			Error::UnsupportedHashVersion(version) => assert_eq!(version, 10),
			other => panic!("unexpected error: {:?}", other),
		}
	}

	#[test]
	fn scheme_parsing() {
		assert_eq!(HashScheme::parse("bcrypt").unwrap(), HashScheme::Bcrypt);
		assert_eq!(HashScheme::parse("argon2id").unwrap(), HashScheme::Argon2id);
		assert!(HashScheme::parse("md5").is_err());
	}
}
