use std::env;

/// Connection parameters for the backing store, taken from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbConfig {
	pub host: String,
	pub port: String,
	pub user: String,
	pub dbname: String,
	pub sslmode: String,
	pub password: Option<String>,
	pub tls_cert: Option<String>,
	pub tls_key: Option<String>,
	pub tls_ca_cert: Option<String>,
}

fn get_env(key: &str, default: &str) -> String {
	match env::var(key) {
		Ok(value) if !value.is_empty() => value,
		_ => default.to_owned(),
	}
}

fn get_env_opt(key: &str) -> Option<String> {
	env::var(key).ok().filter(|v| !v.is_empty())
}

impl DbConfig {
	pub fn from_env() -> Self {
		DbConfig {
			host: get_env("DB_HOST", "localhost"),
			port: get_env("DB_PORT", "5432"),
			user: get_env("DB_USER", "mail"),
			dbname: get_env("DB_NAME", "mail"),
			sslmode: get_env("DB_SSLMODE", "disable"),
			password: get_env_opt("DB_PASSWORD"),
			tls_cert: get_env_opt("DB_TLSCERT"),
			tls_key: get_env_opt("DB_TLSKEY"),
			tls_ca_cert: get_env_opt("DB_TLSCACERT"),
		}
	}

	/// Keyword/value connection string. The verify-* modes are handled by
	/// the TLS connector, the driver itself only knows disable/prefer/require.
	pub fn dsn(&self) -> String {
		let driver_sslmode = match self.sslmode.as_str() {
			"disable" => "disable",
			"prefer" => "prefer",
			_ => "require",
		};
		let mut dsn = format!(
			"host={} port={} user={} dbname={} sslmode={}",
			self.host, self.port, self.user, self.dbname, driver_sslmode
		);
		if let Some(ref password) = self.password {
			dsn.push_str(&format!(" password={}", password));
		}
		dsn
	}

	pub fn wants_tls(&self) -> bool {
		self.sslmode != "disable"
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> DbConfig {
		DbConfig {
			host: "db.example.org".to_owned(),
			port: "5433".to_owned(),
			user: "mail".to_owned(),
			dbname: "mail".to_owned(),
			sslmode: "disable".to_owned(),
			password: None,
			tls_cert: None,
			tls_key: None,
			tls_ca_cert: None,
		}
	}

	#[test]
	fn dsn_without_password() {
		assert_eq!(
			base().dsn(),
			"host=db.example.org port=5433 user=mail dbname=mail sslmode=disable"
		);
	}

	#[test]
	fn dsn_with_password() {
		let mut config = base();
		config.password = Some("hunter2".to_owned());
		assert_eq!(
			config.dsn(),
			"host=db.example.org port=5433 user=mail dbname=mail sslmode=disable password=hunter2"
		);
	}

	#[test]
	fn verify_modes_map_to_require() {
		for mode in ["require", "verify-ca", "verify-full"] {
			let mut config = base();
			config.sslmode = mode.to_owned();
			assert!(config.dsn().contains("sslmode=require"), "mode {}", mode);
			assert!(config.wants_tls());
		}
	}

	#[test]
	fn env_defaults() {
		// no DB_* variables are set by the test harness
		for key in ["DB_HOST", "DB_PORT", "DB_USER", "DB_NAME", "DB_SSLMODE", "DB_PASSWORD"] {
			std::env::remove_var(key);
		}
		let config = DbConfig::from_env();
		assert_eq!(config.host, "localhost");
		assert_eq!(config.port, "5432");
		assert_eq!(config.sslmode, "disable");
		assert_eq!(config.password, None);
	}
}
