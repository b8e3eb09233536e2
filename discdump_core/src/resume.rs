/*!
# Disc Dump: Resume State
*/

use crate::{
	DumpError,
	Extents,
	Track,
	persist::{
		write_atomic,
		zstd_decode,
		zstd_encode,
	},
};
use serde::{
	Deserialize,
	Serialize,
};
use std::{
	collections::BTreeSet,
	path::Path,
};
use utc2k::FmtUtc2k;



#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
/// # Pass Kind.
pub enum PassKind {
	/// # Main Read.
	Main,

	/// # Trim.
	Trim,

	/// # Retry (Numbered From One).
	Retry(u8),
}



#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
/// # Pass Record.
pub struct PassRecord {
	/// # Kind.
	pub kind: PassKind,

	/// # Finished (UTC).
	pub finished: String,

	/// # Bad Blocks Remaining.
	pub bad: u32,
}



#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
/// # Resume State.
///
/// Every attempted block ends up either in `extents` (written) or
/// `bad_blocks` (zero-filled), never both. `next_block` only moves forward.
pub struct Resume {
	/// # Disc Fingerprint.
	fingerprint: u32,

	/// # Next Block.
	next_block: i32,

	/// # Bad Blocks.
	bad_blocks: BTreeSet<i32>,

	/// # Written Extents.
	extents: Extents,

	/// # Completed Passes.
	history: Vec<PassRecord>,
}

impl Resume {
	#[must_use]
	/// # New.
	pub const fn new(fingerprint: u32) -> Self {
		Self {
			fingerprint,
			next_block: 0,
			bad_blocks: BTreeSet::new(),
			extents: Extents::new(),
			history: Vec::new(),
		}
	}

	#[must_use]
	/// # Fingerprint a Layout.
	///
	/// CRC32 of the block count and every track's number, session, kind and
	/// start. Pregaps are left out since detection can wobble between runs.
	pub fn fingerprint(tracks: &[Track], blocks: u32) -> u32 {
		let mut h = crc32fast::Hasher::new();
		h.update(&blocks.to_be_bytes());
		for t in tracks {
			h.update(&[t.number, t.session, u8::from(t.kind.is_audio())]);
			h.update(&t.start.to_be_bytes());
		}
		h.finalize()
	}

	/// # Load.
	///
	/// Returns `None` if there is nothing usable at `src`. Unreadable files are
	/// treated as absent.
	///
	/// ## Errors
	///
	/// Returns an error if the state belongs to a different disc.
	pub fn load(src: &Path, fingerprint: u32) -> Result<Option<Self>, DumpError> {
		let Ok(raw) = std::fs::read(src) else { return Ok(None); };
		let Some(out) = zstd_decode(&raw)
			.and_then(|v| bincode::deserialize::<Self>(&v).ok())
		else {
			log::warn!("Ignoring unreadable resume state {}.", src.display());
			return Ok(None);
		};

		if out.fingerprint == fingerprint { Ok(Some(out)) }
		else { Err(DumpError::ResumeMismatch) }
	}

	/// # Save.
	///
	/// ## Errors
	///
	/// Returns an error if the state could not be encoded or written.
	pub fn save(&self, dst: &Path) -> Result<(), DumpError> {
		let raw = bincode::serialize(self)
			.ok()
			.and_then(|v| zstd_encode(&v))
			.ok_or(DumpError::Bug("Unable to encode resume state"))?;
		write_atomic(dst, &raw)
	}
}

impl Resume {
	#[must_use]
	/// # Next Block.
	pub const fn next_block(&self) -> i32 { self.next_block }

	#[must_use]
	/// # Bad Blocks.
	pub const fn bad_blocks(&self) -> &BTreeSet<i32> { &self.bad_blocks }

	#[must_use]
	/// # Written Extents.
	pub const fn extents(&self) -> &Extents { &self.extents }

	#[must_use]
	/// # History.
	pub fn history(&self) -> &[PassRecord] { &self.history }

	/// # Advance.
	///
	/// Move the cursor forward; backward moves are ignored.
	pub fn advance(&mut self, next: i32) {
		if next > self.next_block { self.next_block = next; }
	}

	/// # Mark Good.
	pub fn mark_good(&mut self, start: i32, count: u32) {
		if count == 0 { return; }
		let end = start.saturating_add_unsigned(count - 1);
		self.extents.insert(start, end);
		if ! self.bad_blocks.is_empty() {
			let fixed: Vec<i32> = self.bad_blocks.range(start..=end).copied().collect();
			for lba in fixed { self.bad_blocks.remove(&lba); }
		}
	}

	/// # Mark Bad.
	pub fn mark_bad(&mut self, lba: i32) {
		self.extents.remove_one(lba);
		self.bad_blocks.insert(lba);
	}

	/// # Record Pass.
	pub fn record_pass(&mut self, kind: PassKind) {
		let bad = u32::try_from(self.bad_blocks.len()).unwrap_or(u32::MAX);
		self.history.push(PassRecord {
			kind,
			finished: FmtUtc2k::now().to_string(),
			bad,
		});
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		TrackFlags,
		TrackKind,
	};

	#[test]
	fn t_partition() {
		let mut r = Resume::new(1);
		r.mark_good(0, 10);
		r.mark_bad(10);
		r.mark_bad(11);
		r.mark_good(12, 4);
		assert_eq!(r.extents().sectors(), 14);
		assert_eq!(r.bad_blocks().len(), 2);

		// A retry fixes one.
		r.mark_good(11, 1);
		assert!(! r.bad_blocks().contains(&11));
		assert!(r.extents().contains(11));

		// A block can't be both.
		r.mark_bad(5);
		assert!(! r.extents().contains(5), "Bad block left in extents.");

		for lba in 0..16 {
			assert!(
				r.extents().contains(lba) != r.bad_blocks().contains(&lba),
				"Block {lba} is in both sets or neither."
			);
		}
	}

	#[test]
	fn t_advance() {
		let mut r = Resume::new(1);
		r.advance(100);
		r.advance(50);
		assert_eq!(r.next_block(), 100, "Cursor moved backwards.");
	}

	#[test]
	fn t_save_load() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let path = dir.path().join("disc.resume");

		let tracks = vec![Track::new(1, 1, TrackKind::Audio, 0, TrackFlags::default())];
		let fp = Resume::fingerprint(&tracks, 1000);

		assert_eq!(Resume::load(&path, fp), Ok(None), "Missing file should be None.");

		let mut r = Resume::new(fp);
		r.mark_good(0, 500);
		r.mark_bad(500);
		r.advance(501);
		r.record_pass(PassKind::Main);
		r.save(&path).expect("Save failed.");

		let loaded = Resume::load(&path, fp)
			.expect("Load failed.")
			.expect("State missing.");
		assert_eq!(loaded, r);
		assert_eq!(loaded.history().len(), 1);

		let other = Resume::fingerprint(&tracks, 1001);
		assert_ne!(fp, other);
		assert_eq!(Resume::load(&path, other), Err(DumpError::ResumeMismatch));

		std::fs::write(&path, b"garbage").expect("Write failed.");
		assert_eq!(Resume::load(&path, fp), Ok(None), "Garbage should be ignored.");
	}
}
