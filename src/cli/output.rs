use ascii_table::{Align, AsciiTable};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub fn fmt_time(t: &DateTime<Utc>) -> String {
	t.format("%Y-%m-%d %H:%M").to_string()
}

pub fn fmt_time_opt(t: &Option<DateTime<Utc>>) -> String {
	t.as_ref().map(fmt_time).unwrap_or_else(|| "-".to_owned())
}

pub fn fmt_bool(b: bool) -> String {
	if b { "yes" } else { "no" }.to_owned()
}

pub fn fmt_opt<T: ToString>(value: &Option<T>) -> String {
	value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_owned())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
	let mut table = AsciiTable::default();
	table.set_max_width(usize::MAX);
	for (i, header) in headers.iter().enumerate() {
		table.column(i).set_header(*header).set_align(Align::Left);
	}
	table.print(rows); // prints a 0 if empty :)
}

pub fn print_json<T: Serialize>(items: &T) -> anyhow::Result<()> {
	println!("{}", serde_json::to_string(items)?);
	Ok(())
}

/// Key/value block used by describe output.
pub fn print_fields(title: &str, fields: &[(&str, String)]) {
	println!("{}", title);
	let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
	for (key, value) in fields {
		println!("  {:width$}  {}", key, value, width = width);
	}
}
