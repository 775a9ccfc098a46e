use log::debug;
use postgres::{Client, Transaction};

use crate::error::Result;

/// Runs one logical change in its own transaction, reporting the outcome
/// on stdout/stderr. Returns the number of failures (0 or 1).
pub fn run_tx<F>(client: &mut Client, item: &str, failure: &str, success: &str, f: F) -> u32
where
	F: FnOnce(&mut Transaction<'_>) -> Result<()>,
{
	let mut tx = match client.transaction() {
		Ok(tx) => tx,
		Err(err) => {
			eprintln!("error[store-unavailable]: failed to begin transaction: {}", err);
			return 1;
		}
	};

	match f(&mut tx) {
		Ok(()) => match tx.commit() {
			Ok(()) => {
				println!("{}: {}", success, item);
				0
			}
			Err(err) => {
				eprintln!("error[db]: failed to commit transaction: {}", err);
				1
			}
		},
		Err(err) => {
			eprintln!("error[{}]: {} ({}): {}", err.tag(), failure, item, err);
			if let Err(rb_err) = tx.rollback() {
				eprintln!("error[db]: failed to rollback transaction: {}", rb_err);
			}
			1
		}
	}
}

/// Runs one transaction per item: a failed item rolls back alone and the
/// batch carries on. Returns how many items failed.
pub fn run_for_each<T, F, S>(
	client: &mut Client,
	items: &[T],
	item_str: S,
	failure: &str,
	success: &str,
	mut f: F,
) -> u32
where
	F: FnMut(&mut Transaction<'_>, &T) -> Result<()>,
	S: Fn(&T) -> String,
{
	let mut failures = 0;
	for item in items {
		debug!("processing item: {}", item_str(item));
		failures += run_tx(client, &item_str(item), failure, success, |tx| f(tx, item));
	}
	failures
}
