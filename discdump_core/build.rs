/*!
# Disc Dump: Build

This parses the drive offset list into a constant array that can be easily
searched at runtime.
*/

use std::{
	collections::BTreeMap,
	env,
	fs::File,
	io::Write,
	path::PathBuf,
};



/// # Glumped Vendor/Model.
///
/// Same layout as `DriveVendorModel`.
type VendorModel = [u8; 24];



/// # Main.
fn main() {
	println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");
	println!("cargo:rerun-if-changed=skel");

	let offsets = parse_offsets();

	// Announce the totals for reference.
	if env::var("SHOW_TOTALS").is_ok() {
		println!("cargo:warning=Read Offsets: {}", offsets.len());
	}

	// Save it!
	let data = nice_offsets(offsets);
	File::create(out_path("drives.rs"))
		.and_then(|mut f| f.write_all(data.as_bytes()).and_then(|()| f.flush()))
		.expect("Unable to save drive data.");
}



/// # Nice Drive Offsets.
///
/// Reformat the offsets as Rust code that can be included directly in a
/// library script.
///
/// The generated code takes the form of a static array, allowing for
/// reasonably fast and straightforward binary search at runtime.
fn nice_offsets(parsed: BTreeMap<VendorModel, i16>) -> String {
	use std::fmt::Write;

	let nice = parsed.into_iter()
		.map(|(vendormodel, offset)|
			format!("(DriveVendorModel({vendormodel:?}), ReadOffset({offset})),")
		)
		.collect::<Vec<String>>();

	let mut out = format!(
		r"
/// # Drive Offsets.
const DRIVE_OFFSETS: [(DriveVendorModel, ReadOffset); {}] = [",
		nice.len(),
	);

	// One entry per line keeps the generated source readable.
	for line in nice {
		write!(&mut out, "\n\t{line}").expect("Failed to write string.");
	}

	out.push_str("\n];\n");
	out
}

/// # Out path.
///
/// This generates a (file/dir) path relative to `OUT_DIR`.
fn out_path(name: &str) -> PathBuf {
	let dir = env::var("OUT_DIR").expect("Missing OUT_DIR.");
	let mut out = std::fs::canonicalize(dir).expect("Missing OUT_DIR.");
	out.push(name);
	out
}

/// # Parse Drive Offsets.
///
/// Lines take the form `VENDOR|MODEL|OFFSET`. Vendor/model pairs are
/// uppercased for case-insensitive searching.
fn parse_offsets() -> BTreeMap<VendorModel, i16> {
	let mut parsed: BTreeMap<VendorModel, i16> = BTreeMap::new();

	let raw = std::fs::read_to_string("skel/offsets.txt")
		.expect("Unable to open skel/offsets.txt");
	for line in raw.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') { continue; }
		let Some((vm, offset)) = parse_offset_line(line) else {
			println!("cargo:warning=Invalid offset line: {line}.");
			continue;
		};
		if parsed.insert(vm, offset).is_some() {
			println!("cargo:warning=Duplicate offset line: {line}.");
		}
	}

	// Make sure we parsed something.
	assert!(! parsed.is_empty(), "No drive offsets could be parsed.");

	parsed
}

/// # Parse a Single Offset Entry.
fn parse_offset_line(line: &str) -> Option<(VendorModel, i16)> {
	let mut parts = line.split('|');
	let v = parts.next()?.trim();
	let m = parts.next()?.trim();
	let o = parts.next()?.trim();
	if parts.next().is_some() || ! line.is_ascii() || v.len() > 8 || m.is_empty() || m.len() > 16 {
		return None;
	}

	let o: i16 = o.trim_start_matches('+').parse().ok()?;
	if o == 0 || ! (-5880..=5880).contains(&o) { return None; }

	let mut vm = VendorModel::default();
	for (old, new) in vm.iter_mut().zip(v.bytes()) {
		*old = new.to_ascii_uppercase();
	}
	for (old, new) in vm.iter_mut().skip(8).zip(m.bytes()) {
		*old = new.to_ascii_uppercase();
	}

	Some((vm, o))
}
