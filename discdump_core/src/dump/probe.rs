/*!
# Disc Dump: Drive Probes

Work out what the drive can actually do before committing to a dump: which
sub-channel format, which read command, how many sectors per request, and
where the audio really starts.
*/

use crate::{
	BYTES_PER_SECTOR,
	COOKED_SECTOR_SIZE,
	decode::{
		bcd_to_u8,
		msf_to_lba,
	},
	Drive,
	DumpError,
	Geometry,
	HiddenTrack,
	ReadCommand,
	ReadOffset,
	SectorType,
	Subchannel,
	Track,
};
use super::{
	read_blocks,
	TIMEOUT,
};



/// # Sync Pattern.
pub(super) const SYNC: [u8; 12] = [0, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 0];

/// # Scrambler Table (ECMA-130 Annex B).
///
/// XORed over bytes 12..2352 of every data sector before it hits the disc.
pub(super) const SCRAMBLE: [u8; 2340] = scramble_table();



/// # Probe Sub-channel.
///
/// Try a single raw read at LBA zero with each sub-channel format, best
/// first.
pub(super) fn probe_subchannel(drive: &mut dyn Drive) -> Subchannel {
	for sub in [Subchannel::Raw, Subchannel::Q16] {
		match drive.read_cd(0, BYTES_PER_SECTOR + sub.size(), 1, SectorType::All, sub, TIMEOUT) {
			Ok(_) => return sub,
			Err(e) => log::debug!("{} sub-channel unsupported: {e}.", sub.as_str()),
		}
	}
	Subchannel::None
}



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
/// # Read Support.
pub(super) struct ReadSupport {
	pub(super) readcd: bool,
	pub(super) read16: bool,
	pub(super) read12: bool,
	pub(super) read10: bool,
	pub(super) read6: bool,
}

impl ReadSupport {
	/// # Probe.
	///
	/// Try one sector at LBA zero with each command.
	pub(super) fn probe(drive: &mut dyn Drive) -> Self {
		let readcd = drive.read_cd(0, BYTES_PER_SECTOR, 1, SectorType::All, Subchannel::None, TIMEOUT).is_ok();
		let read16 = drive.read16(0, COOKED_SECTOR_SIZE, 1, TIMEOUT).is_ok();
		let read12 = drive.read12(0, COOKED_SECTOR_SIZE, 1, TIMEOUT).is_ok();
		let read10 = drive.read10(0, COOKED_SECTOR_SIZE, 1, TIMEOUT).is_ok();
		let read6 = drive.read6(0, COOKED_SECTOR_SIZE, 1, TIMEOUT).is_ok();
		Self { readcd, read16, read12, read10, read6 }
	}

	/// # Best Command.
	pub(super) const fn best(&self) -> Option<ReadCommand> {
		if self.readcd { Some(ReadCommand::ReadCd) }
		else { self.best_cooked() }
	}

	/// # Best Cooked Command.
	pub(super) const fn best_cooked(&self) -> Option<ReadCommand> {
		if self.read16 { Some(ReadCommand::Read16) }
		else if self.read12 { Some(ReadCommand::Read12) }
		else if self.read10 { Some(ReadCommand::Read10) }
		else if self.read6 { Some(ReadCommand::Read6) }
		else { None }
	}
}



/// # Probe Maximum Transfer.
///
/// Start with the requested count and halve it until the drive stops
/// complaining.
///
/// ## Errors
///
/// Returns an error if even two sectors can't be read.
pub(super) fn probe_max_transfer(drive: &mut dyn Drive, geometry: &Geometry, want: u32)
-> Result<u32, DumpError> {
	let mut n = want.min(geometry.blocks).max(1);
	loop {
		match read_blocks(
			drive,
			geometry.read_command(),
			0,
			n,
			geometry.block_size(),
			SectorType::All,
			geometry.subchannel(),
		) {
			Ok(_) => return Ok(n),
			Err(e) if n <= 2 => {
				log::debug!("Transfer probe gave up at {n}: {e}.");
				return Err(DumpError::Transfer);
			},
			Err(e) => {
				log::debug!("Transfer of {n} sectors failed: {e}.");
				n = (n / 2).max(2);
			},
		}
	}
}



/// # Detect Hidden Track.
///
/// Anything between LBA zero and the first track is hidden. A sync pattern
/// means data; Mode 2 data ahead of an audio track is the CD-i Ready
/// arrangement.
pub(super) fn detect_hidden_track(drive: &mut dyn Drive, first: &Track, readcd: bool) -> HiddenTrack {
	if first.start <= 0 { return HiddenTrack::None; }
	if ! readcd { return HiddenTrack::Data; }

	match drive.read_cd(0, BYTES_PER_SECTOR, 1, SectorType::All, Subchannel::None, TIMEOUT) {
		Ok((buf, _)) if buf.starts_with(&SYNC) => {
			if buf.get(15) == Some(&2) && first.kind.is_audio() { HiddenTrack::CdiReady }
			else { HiddenTrack::Data }
		},
		Ok(_) => HiddenTrack::Audio,
		Err(e) => {
			log::debug!("Unable to sample the hidden track: {e}.");
			HiddenTrack::Audio
		},
	}
}



/// # Combined Offset.
///
/// Read the start of the first data track as if it were audio. Drives that
/// allow this return the still-scrambled sector, shifted by the same
/// disc+drive offset as any audio; the sync pattern marks where the sector
/// really begins, and the descrambled header says which sector it is.
///
/// Returns `None` if the drive won't play along or the result is nonsense.
pub(super) fn combined_offset(drive: &mut dyn Drive, tracks: &[Track]) -> Option<ReadOffset> {
	let track = tracks.iter().find(|t| ! t.kind.is_audio() && 0 < t.start)?;
	let (buf, _) = drive.read_cd(track.start, BYTES_PER_SECTOR, 3, SectorType::Cdda, Subchannel::None, TIMEOUT)
		.map_err(|e| log::debug!("Scrambled read failed: {e}."))
		.ok()?;

	let pos = buf.windows(SYNC.len()).position(|w| w == SYNC)?;
	let header = buf.get(pos + 12..pos + 16)?;
	let m = bcd_to_u8(header[0] ^ SCRAMBLE[0]);
	let s = bcd_to_u8(header[1] ^ SCRAMBLE[1]);
	let f = bcd_to_u8(header[2] ^ SCRAMBLE[2]);
	let mode = header[3] ^ SCRAMBLE[3];
	if ! matches!(mode, 1 | 2) { return None; }

	let lba = msf_to_lba(m, s, f);
	let pos = i64::try_from(pos).ok()?;
	let offset = (i64::from(track.start) - i64::from(lba)) * i64::from(BYTES_PER_SECTOR) + pos;
	let offset = i32::try_from(offset).ok()?;

	log::debug!("Combined offset: {offset} bytes (sector {lba} sync at {pos}).");
	ReadOffset::from_bytes(offset)
}



#[allow(clippy::cast_possible_truncation)]
/// # Build Scrambler Table.
///
/// A 15-bit LFSR (x^15 + x + 1) seeded with one, least significant bit
/// first.
const fn scramble_table() -> [u8; 2340] {
	let mut out = [0_u8; 2340];
	let mut reg: u16 = 1;
	let mut i = 0;
	while i < out.len() {
		let mut byte = 0_u8;
		let mut bit = 0;
		while bit < 8 {
			byte |= ((reg & 1) as u8) << bit;
			let feedback = (reg ^ (reg >> 1)) & 1;
			reg = (reg >> 1) | (feedback << 14);
			bit += 1;
		}
		out[i] = byte;
		i += 1;
	}
	out
}
