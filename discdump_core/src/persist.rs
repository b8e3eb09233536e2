/*!
# Disc Dump: Persistence
*/

use crate::DumpError;
use std::{
	io::{
		Read,
		Write,
	},
	path::Path,
};
use tempfile::NamedTempFile;



/// # Write Atomically.
///
/// Write `data` to a temporary file in the destination's directory, then
/// rename it into place, so readers only ever see the old copy or the new
/// one.
///
/// ## Errors
///
/// Returns an error if the temporary file cannot be written or renamed.
pub(crate) fn write_atomic(dst: &Path, data: &[u8]) -> Result<(), DumpError> {
	let err = || DumpError::Write(dst.to_string_lossy().into_owned());
	let dir = dst.parent()
		.filter(|p| ! p.as_os_str().is_empty())
		.unwrap_or_else(|| Path::new("."));

	let mut tmp = NamedTempFile::new_in(dir).map_err(|_| err())?;
	tmp.write_all(data).and_then(|()| tmp.flush()).map_err(|_| err())?;
	tmp.persist(dst).map_err(|_| err())?;
	Ok(())
}

/// # Zstd Decode.
///
/// Return a decompressed copy of `raw`, or `None` if the operation fails.
pub(crate) fn zstd_decode(raw: &[u8]) -> Option<Vec<u8>> {
	let mut out = Vec::with_capacity(raw.len() * 2);
	let mut decoder = zstd::stream::Decoder::new(raw).ok()?;
	decoder.read_to_end(&mut out).ok()?;

	if out.is_empty() { None }
	else { Some(out) }
}

/// # Zstd Encode.
///
/// Return a copy of `raw` compressed with default-level zstd, or `None` if
/// there is any sort of problem.
pub(crate) fn zstd_encode(raw: &[u8]) -> Option<Vec<u8>> {
	let mut encoder = zstd::stream::Encoder::new(
		Vec::with_capacity(raw.len().wrapping_div(2)),
		zstd::DEFAULT_COMPRESSION_LEVEL,
	).ok()?;
	encoder.write_all(raw).ok()?;
	let out = encoder.finish().ok()?;

	if out.is_empty() { None }
	else { Some(out) }
}
