use std::io::{self, BufRead};

use anyhow::{bail, Context, Result};

use maildb::auth::{hash_password, HashScheme};

pub fn read_password(from_stdin: bool) -> Result<String> {
	let password = if from_stdin {
		let mut line = String::new();
		io::stdin()
			.lock()
			.read_line(&mut line)
			.context("failed to read password from stdin")?;
		line
	} else {
		rpassword::prompt_password("Password: ").context("failed to read password")?
	};

	let password = password.trim().to_owned();
	if password.is_empty() {
		bail!("password cannot be empty");
	}
	Ok(password)
}

pub fn read_password_hashed(method: &str, from_stdin: bool) -> Result<String> {
	let scheme = HashScheme::parse(method)?;
	let password = read_password(from_stdin)?;
	Ok(hash_password(&password, scheme)?)
}
