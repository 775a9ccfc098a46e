use anyhow::{bail, Result};
use postgres::Client;

use maildb::schema;

use crate::cli::SchemaKind;

pub fn run(client: &mut Client, kind: SchemaKind) -> Result<u32> {
	match kind {
		SchemaKind::Status => {
			let current = schema::current_version(client)?;
			let latest = schema::latest_version();
			println!("current schema version: {}", current);
			println!("latest schema version:  {}", latest);
			if current < latest {
				println!("run 'maildb schema upgrade' to apply pending migrations");
			}
			Ok(0)
		}
		SchemaKind::Upgrade { target } => {
			let target = target.unwrap_or_else(schema::latest_version);
			let before = schema::current_version(client)?;
			if before >= target {
				println!("schema already at version {}", before);
				return Ok(0);
			}
			schema::upgrade(client, target)?;
			println!("Successfully upgraded schema: {} -> {}", before, target);
			Ok(0)
		}
		SchemaKind::Purge { yes } => {
			if !yes {
				bail!("refusing to purge without --yes");
			}
			schema::purge(client)?;
			println!("Successfully purged all schemas");
			Ok(0)
		}
	}
}
