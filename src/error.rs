use postgres::error::SqlState;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything a caller of this library must be able to tell apart.
#[derive(Debug, Error)]
pub enum Error {
	#[error("object not found (or soft-deleted)")]
	NotFound,
	#[error("conflicting object already exists")]
	ConflictExists,
	#[error("referenced object is missing or soft-deleted")]
	ParentMissing,
	#[error("cannot restore while the parent object is soft-deleted")]
	ParentDeleted,
	#[error("{0}")]
	InvalidShape(String),
	#[error("{0}")]
	InvalidTransition(String),
	#[error("write affected {got} rows, expected {expected}")]
	AffectedRowsMismatch { expected: u64, got: u64 },
	#[error("unsupported password hash type")]
	UnsupportedHash,
	#[error("unsupported argon2 hash version {0}")]
	UnsupportedHashVersion(u32),
	#[error("password does not match")]
	AuthMismatch,
	#[error("store unavailable: {0}")]
	StoreUnavailable(postgres::Error),
	#[error("{0}")]
	InputInvalid(String),
	#[error(transparent)]
	Db(postgres::Error),
	#[error("connection pool: {0}")]
	Pool(#[from] r2d2::Error),
	#[error("tls setup: {0}")]
	Tls(#[from] native_tls::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Short classification tag, printed by the CLI next to every error.
	pub fn tag(&self) -> &'static str {
		match self {
			Error::NotFound => "not-found",
			Error::ConflictExists => "conflict",
			Error::ParentMissing => "parent-missing",
			Error::ParentDeleted => "parent-deleted",
			Error::InvalidShape(_) => "invalid-shape",
			Error::InvalidTransition(_) => "invalid-transition",
			Error::AffectedRowsMismatch { .. } => "rows-mismatch",
			Error::UnsupportedHash => "unsupported-hash",
			Error::UnsupportedHashVersion(_) => "unsupported-hash-version",
			Error::AuthMismatch => "auth-mismatch",
			Error::StoreUnavailable(_) => "store-unavailable",
			Error::InputInvalid(_) => "input-invalid",
			Error::Db(_) => "db",
			Error::Pool(_) => "pool",
			Error::Tls(_) => "tls",
			Error::Io(_) => "io",
		}
	}
}

impl From<postgres::Error> for Error {
	fn from(err: postgres::Error) -> Self {
		if err.is_closed() {
			return Error::StoreUnavailable(err);
		}
		match err.code() {
			Some(&SqlState::UNIQUE_VIOLATION) => Error::ConflictExists,
			// parent subqueries insert NULL when the referenced row is
			// absent or soft-deleted; triggers raise 23503 for the same
			Some(&SqlState::NOT_NULL_VIOLATION) => Error::ParentMissing,
			Some(&SqlState::FOREIGN_KEY_VIOLATION) => Error::ParentMissing,
			Some(&SqlState::CHECK_VIOLATION) => Error::InvalidShape(
				err.as_db_error()
					.map(|db| db.message().to_owned())
					.unwrap_or_else(|| err.to_string()),
			),
			_ => Error::Db(err),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tags_are_stable() {
		assert_eq!(Error::NotFound.tag(), "not-found");
		assert_eq!(Error::ConflictExists.tag(), "conflict");
		assert_eq!(Error::ParentDeleted.tag(), "parent-deleted");
		assert_eq!(
			Error::AffectedRowsMismatch { expected: 1, got: 0 }.tag(),
			"rows-mismatch"
		);
		assert_eq!(Error::UnsupportedHashVersion(16).tag(), "unsupported-hash-version");
	}

	#[test]
	fn mismatch_message_names_both_counts() {
		let err = Error::AffectedRowsMismatch { expected: 1, got: 3 };
		assert_eq!(err.to_string(), "write affected 3 rows, expected 1");
	}
}
