/*!
# Disc Dump: Dump Log
*/

use crate::DumpError;
use dactyl::NiceElapsed;
use std::{
	fs::File,
	io::{
		BufWriter,
		Write,
	},
	path::Path,
	time::Instant,
};
use utc2k::FmtUtc2k;



/// # Dump Log.
///
/// A plain-text, timestamped record of everything noteworthy that happened
/// during a dump, including every reason it stopped. Lines are kept in memory
/// too so callers (and tests) can inspect them.
pub struct DumpLog {
	file: Option<BufWriter<File>>,
	lines: Vec<String>,
	pass: Option<(&'static str, Instant)>,
}

impl std::fmt::Debug for DumpLog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DumpLog")
			.field("file", &self.file.is_some())
			.field("lines", &self.lines.len())
			.finish_non_exhaustive()
	}
}

impl Default for DumpLog {
	fn default() -> Self { Self::new() }
}

impl Drop for DumpLog {
	fn drop(&mut self) {
		if let Some(f) = self.file.as_mut() { let _res = f.flush(); }
	}
}

impl DumpLog {
	#[must_use]
	/// # New (Memory Only).
	pub const fn new() -> Self {
		Self {
			file: None,
			lines: Vec::new(),
			pass: None,
		}
	}

	/// # Create (With File).
	///
	/// New lines are appended to whatever the file already holds.
	///
	/// ## Errors
	///
	/// Returns an error if the file cannot be opened.
	pub fn create(dst: &Path) -> Result<Self, DumpError> {
		let mut out = Self::new();
		out.file.replace(open(dst)?);
		Ok(out)
	}

	/// # Attach a File.
	///
	/// Start mirroring to `dst`, first writing out anything logged so far.
	///
	/// ## Errors
	///
	/// Returns an error if the file cannot be opened or written.
	pub fn attach(&mut self, dst: &Path) -> Result<(), DumpError> {
		let mut file = open(dst)?;
		for line in &self.lines {
			writeln!(file, "{line}")
				.map_err(|_| DumpError::Write(dst.to_string_lossy().into_owned()))?;
		}
		file.flush().map_err(|_| DumpError::Write(dst.to_string_lossy().into_owned()))?;
		self.file.replace(file);
		Ok(())
	}

	/// # Add Line.
	pub fn line<S: AsRef<str>>(&mut self, msg: S) {
		let line = format!("[{}] {}", FmtUtc2k::now(), msg.as_ref());
		if let Some(f) = self.file.as_mut() { let _res = writeln!(f, "{line}"); }
		self.lines.push(line);
	}

	/// # Add Error.
	///
	/// Returns the error so abort paths can log and bail in one go.
	pub fn error(&mut self, err: DumpError) -> DumpError {
		self.line(format!("ERROR: {err}"));
		if let Some(f) = self.file.as_mut() { let _res = f.flush(); }
		err
	}

	/// # Start Pass.
	pub fn pass_start(&mut self, label: &'static str) {
		self.line(format!("{label} started."));
		self.pass.replace((label, Instant::now()));
	}

	/// # End Pass.
	pub fn pass_end(&mut self, bad: usize) {
		if let Some((label, start)) = self.pass.take() {
			self.line(format!(
				"{label} finished in {} with {bad} bad block(s).",
				NiceElapsed::from(start),
			));
		}
	}

	#[must_use]
	/// # Lines.
	pub fn lines(&self) -> &[String] { &self.lines }

	#[must_use]
	/// # Contains?
	///
	/// True if any line contains the needle.
	pub fn contains(&self, needle: &str) -> bool {
		self.lines.iter().any(|l| l.contains(needle))
	}
}



/// # Open For Appending.
fn open(dst: &Path) -> Result<BufWriter<File>, DumpError> {
	File::options()
		.create(true)
		.append(true)
		.open(dst)
		.map(BufWriter::new)
		.map_err(|_| DumpError::Write(dst.to_string_lossy().into_owned()))
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_log() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let path = dir.path().join("disc.log");

		{
			let mut log = DumpLog::create(&path).expect("Log failed.");
			log.line("Hello.");
			log.pass_start("Main pass");
			log.pass_end(3);
			let err = log.error(DumpError::NoToc);
			assert_eq!(err, DumpError::NoToc);
			assert_eq!(log.lines().len(), 4);
			assert!(log.contains("3 bad block(s)"));
		}

		let raw = std::fs::read_to_string(&path).expect("Read failed.");
		assert_eq!(raw.lines().count(), 4);
		assert!(raw.lines().all(|l| l.starts_with('[')), "Missing timestamps.");
		assert!(raw.contains("ERROR: Could not read TOC"));
	}

	#[test]
	fn t_attach() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let path = dir.path().join("disc.log");

		{
			let mut log = DumpLog::new();
			log.line("Before.");
			log.attach(&path).expect("Attach failed.");
			log.line("After.");
			assert_eq!(log.lines().len(), 2);
		}

		let raw = std::fs::read_to_string(&path).expect("Read failed.");
		let lines: Vec<&str> = raw.lines().collect();
		assert_eq!(lines.len(), 2, "Earlier lines were not carried over.");
		assert!(lines[0].ends_with("Before."));
		assert!(lines[1].ends_with("After."));
	}
}
