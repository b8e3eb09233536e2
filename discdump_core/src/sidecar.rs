/*!
# Disc Dump: Sidecar
*/

use cdtoc::Toc;
use crate::{
	CD_LEADIN,
	DumpError,
	Geometry,
	Track,
	persist::write_atomic,
};
use std::{
	collections::BTreeSet,
	fmt::Write as _,
	fs::File,
	io::Read,
	path::Path,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Image Checksums.
pub struct Checksums {
	/// # CRC32.
	pub crc32: u32,

	/// # SHA-1.
	pub sha1: [u8; 20],

	/// # Size (Bytes).
	pub size: u64,
}

impl Checksums {
	/// # From File.
	///
	/// ## Errors
	///
	/// Returns an error if the file can't be read.
	pub fn from_path(src: &Path) -> Result<Self, DumpError> {
		let err = || DumpError::Write(src.to_string_lossy().into_owned());
		let mut file = File::open(src).map_err(|_| err())?;
		let mut crc = crc32fast::Hasher::new();
		let mut sha = sha1_smol::Sha1::new();
		let mut size = 0_u64;
		let mut buf = vec![0_u8; 1024 * 1024];
		loop {
			let len = file.read(&mut buf).map_err(|_| err())?;
			if len == 0 { break; }
			crc.update(&buf[..len]);
			sha.update(&buf[..len]);
			size += len as u64;
		}
		Ok(Self {
			crc32: crc.finalize(),
			sha1: sha.digest().bytes(),
			size,
		})
	}

	#[must_use]
	/// # SHA-1 Hex.
	pub fn sha1_hex(&self) -> String {
		self.sha1.iter().fold(String::with_capacity(40), |mut acc, b| {
			let _res = write!(acc, "{b:02x}");
			acc
		})
	}
}



#[must_use]
/// # Audio TOC.
///
/// `cdtoc` can only model audio tracks plus at most one data track at the
/// very start or very end of the disc; anything else returns `None`.
pub fn audio_toc(tracks: &[Track], last_sector: i32) -> Option<Toc> {
	let leadin = i32::from(CD_LEADIN);
	let to_sector = |lba: i32| u32::try_from(lba + leadin).ok();

	let mut audio = Vec::new();
	let mut data = None;
	for (idx, t) in tracks.iter().enumerate() {
		if t.kind.is_audio() { audio.push(to_sector(t.start)?); }
		else if data.is_none() && (idx == 0 || idx + 1 == tracks.len()) {
			data.replace(to_sector(t.start)?);
		}
		else { return None; }
	}

	Toc::from_parts(audio, data, to_sector(last_sector + 1)?).ok()
}



/// # Write Sidecar.
///
/// A plain-text summary of the dump: geometry, layout, disc IDs, bad blocks,
/// and checksums of the main image file.
///
/// ## Errors
///
/// Returns an error if the image can't be hashed or the sidecar can't be
/// written.
pub fn write_sidecar(
	dst: &Path,
	image: Option<&Path>,
	geometry: &Geometry,
	tracks: &[Track],
	bad: &BTreeSet<i32>,
) -> Result<(), DumpError> {
	let mut out = String::new();
	let _res = writeln!(out, "Media:        {}", geometry.media_type);
	let _res = writeln!(out, "Blocks:       {}", geometry.blocks);
	let _res = writeln!(out, "Sub-channel:  {}", geometry.subchannel().as_str());
	let _res = writeln!(out, "Read command: {}", geometry.read_command().as_str());
	let _res = writeln!(out, "Read offset:  {} bytes", geometry.offset_bytes);
	let _res = writeln!(out, "Hidden track: {}", geometry.hidden_track.as_str());

	if let Some(toc) = audio_toc(tracks, geometry.last_sector()) {
		let _res = writeln!(out, "CDTOC:        {toc}");
		let _res = writeln!(out, "AccurateRip:  {}", toc.accuraterip_id());
		let _res = writeln!(out, "CDDB:         {}", toc.cddb_id());
	}

	out.push_str("\n##  SS  TYPE         PREGAP   START     END  FLAGS\n");
	for t in tracks {
		let _res = writeln!(out, "{t}");
	}

	let _res = writeln!(out, "\nBad blocks: {}", bad.len());
	for lba in bad {
		let _res = writeln!(out, "{lba}");
	}

	if let Some(src) = image {
		let chk = Checksums::from_path(src)?;
		let _res = writeln!(out, "\nImage size:   {}", chk.size);
		let _res = writeln!(out, "Image CRC32:  {:08x}", chk.crc32);
		let _res = writeln!(out, "Image SHA-1:  {}", chk.sha1_hex());
	}

	write_atomic(dst, out.as_bytes())
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		ReadCommand,
		Subchannel,
		TrackFlags,
		TrackKind,
	};

	fn track(number: u8, kind: TrackKind, start: i32, end: i32) -> Track {
		let mut t = Track::new(number, 1, kind, start, TrackFlags::default());
		t.end = end;
		t
	}

	#[test]
	fn t_checksums() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let path = dir.path().join("img.bin");
		std::fs::write(&path, b"abc").expect("Write failed.");

		let chk = Checksums::from_path(&path).expect("Checksum failed.");
		assert_eq!(chk.size, 3);
		assert_eq!(chk.crc32, 0x3524_41c2);
		assert_eq!(chk.sha1_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
	}

	#[test]
	fn t_audio_toc() {
		let tracks = vec![
			track(1, TrackKind::Audio, 0, 9999),
			track(2, TrackKind::Audio, 10_000, 19_999),
		];
		let toc = audio_toc(&tracks, 19_999).expect("Audio TOC failed.");
		assert_eq!(toc.audio_len(), 2);

		// Enhanced CD (data last) works.
		let tracks = vec![
			track(1, TrackKind::Audio, 0, 9999),
			track(2, TrackKind::CdMode1, 21_400, 29_999),
		];
		assert!(audio_toc(&tracks, 29_999).is_some());

		// Data in the middle does not.
		let tracks = vec![
			track(1, TrackKind::Audio, 0, 9999),
			track(2, TrackKind::CdMode1, 10_000, 19_999),
			track(3, TrackKind::Audio, 20_000, 29_999),
		];
		assert!(audio_toc(&tracks, 29_999).is_none());
	}

	#[test]
	fn t_sidecar() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let img = dir.path().join("disc.bin");
		std::fs::write(&img, [0_u8; 2352 * 2]).expect("Write failed.");
		let dst = dir.path().join("disc.sidecar.txt");

		let g = Geometry::new(20_000, Subchannel::Raw, ReadCommand::ReadCd);
		let tracks = vec![track(1, TrackKind::Audio, 0, 19_999)];
		let bad = BTreeSet::from([5_i32, 6]);
		write_sidecar(&dst, Some(&img), &g, &tracks, &bad).expect("Sidecar failed.");

		let raw = std::fs::read_to_string(&dst).expect("Read failed.");
		assert!(raw.contains("Bad blocks: 2"));
		assert!(raw.contains("Image size:   4704"));
		assert!(raw.contains("AccurateRip:"));
		assert!(raw.contains("Sub-channel:  raw P-W"));
	}
}
