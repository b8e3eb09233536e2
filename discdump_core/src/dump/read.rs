/*!
# Disc Dump: Bulk Reading
*/

use crate::{
	BYTES_PER_SECTOR,
	Drive,
	DumpError,
	DumpLog,
	DumpOptions,
	Extents,
	Geometry,
	ImageWriter,
	KillSwitch,
	MediaTag,
	PassKind,
	ProgressSink,
	Resume,
	SectorTag,
	SectorType,
	sectors_for_bytes,
	SenseError,
	Subchannel,
	Track,
};
use dactyl::NiceU32;
use super::{
	interleave::{
		deinterleave,
		fix_offset,
	},
	read_blocks,
	speed::Speed,
	TIMEOUT,
};
use std::{
	path::Path,
	time::{
		Duration,
		Instant,
	},
};



/// # Resume Save Interval.
const SAVE_EVERY: Duration = Duration::from_secs(10);

/// # First Track Pregap Length.
const FIRST_PREGAP: i32 = 150;



/// # Dump Share.
///
/// Everything the main, trim, and retry passes need, grouped so they don't
/// have to pass a dozen variables back and forth.
pub(super) struct DumpShare<'a> {
	pub(super) drive: &'a mut dyn Drive,
	pub(super) image: &'a mut dyn ImageWriter,
	pub(super) progress: &'a mut dyn ProgressSink,
	pub(super) log: &'a mut DumpLog,
	pub(super) resume: &'a mut Resume,
	pub(super) resume_path: Option<&'a Path>,
	pub(super) killed: &'a KillSwitch,
	pub(super) geometry: Geometry,
	pub(super) tracks: &'a [Track],
	pub(super) lead_outs: &'a Extents,
	pub(super) opts: DumpOptions,

	/// # Audio Offset Correction (Bytes).
	///
	/// Zero disables correction entirely.
	pub(super) offset: i32,

	pub(super) speed: Speed,
	pub(super) last_save: Instant,
}

impl DumpShare<'_> {
	/// # Read.
	///
	/// Issue the negotiated read command and make sure the drive returned
	/// everything it was asked for.
	fn read(&mut self, lba: i32, count: u32) -> Result<Vec<u8>, SenseError> {
		let block = self.geometry.block_size();
		let (buf, took) = read_blocks(
			self.drive,
			self.geometry.read_command(),
			lba,
			count,
			block,
			SectorType::All,
			self.geometry.subchannel(),
		)?;

		if buf.len() < block as usize * count as usize {
			log::debug!("Short read at {lba}: {} of {} bytes.", buf.len(), block * count);
			return Err(SenseError::MEDIUM);
		}

		self.progress.on_sector_timing(lba, count, took);
		self.speed.record(buf.len() as u64, took);
		Ok(buf)
	}

	/// # Read a Run.
	///
	/// Read `count` blocks at `lba`, applying the offset correction when
	/// `fix` is set. Negative offsets start early, positive ones run late.
	///
	/// The padding is only read when it lands on audio in the same session.
	/// Padding that would cross into a data track, a lead-out, or off the end
	/// of the disc is zero-filled instead, as is an unreadable lead-in.
	pub(super) fn read_run(&mut self, lba: i32, count: u32, fix: bool) -> Result<Vec<u8>, SenseError> {
		let offset = if fix { self.offset } else { 0 };
		if offset == 0 { return self.read(lba, count); }

		let pad = sectors_for_bytes(offset);
		let (start, pad_start) =
			if offset < 0 { (lba - pad as i32, lba - pad as i32) }
			else { (lba, lba + count as i32) };
		let total = count + pad;

		let reachable = (pad_start..pad_start + pad as i32).all(|l| self.pad_readable(l));
		let buf =
			if reachable {
				match self.read(start, total) {
					Ok(buf) => buf,
					Err(_) if start < 0 => self.read_zero_padded(lba, count, pad, offset)?,
					Err(e) => return Err(e),
				}
			}
			else { self.read_zero_padded(lba, count, pad, offset)? };

		fix_offset(
			&buf,
			total,
			self.geometry.sector_size(),
			self.geometry.subchannel().size(),
			offset,
			pad,
		)
			.ok_or(SenseError::MEDIUM)
	}

	/// # Read With Zero Padding.
	///
	/// Read just the run itself and stand zeros in for the offset padding.
	fn read_zero_padded(&mut self, lba: i32, count: u32, pad: u32, offset: i32)
	-> Result<Vec<u8>, SenseError> {
		let mut buf = self.read(lba, count)?;
		let zeros = vec![0_u8; (pad * self.geometry.block_size()) as usize];
		if offset < 0 {
			let mut padded = zeros;
			padded.append(&mut buf);
			Ok(padded)
		}
		else {
			buf.extend_from_slice(&zeros);
			Ok(buf)
		}
	}

	/// # Padding Readable?
	///
	/// Offset padding has to be more audio from the same session.
	fn pad_readable(&self, lba: i32) -> bool {
		if lba < 0 {
			return self.tracks.first().is_some_and(|t| t.kind.is_audio() && t.contains(lba));
		}

		lba <= self.geometry.last_sector() &&
		! self.lead_outs.contains(lba) &&
		self.track_at(lba).is_some_and(|t| t.kind.is_audio())
	}

	/// # Write Blocks.
	///
	/// Split off the sub-channel (if any) and hand both halves to the image.
	pub(super) fn write(&mut self, buf: &[u8], lba: i32, count: u32) -> Result<(), DumpError> {
		let now = Instant::now();
		let sub = self.geometry.subchannel();
		if matches!(sub, Subchannel::None) { self.write_main(buf, lba, count)?; }
		else {
			let (main, subs) = deinterleave(buf, count, self.geometry.sector_size(), sub.size());
			self.write_main(&main, lba, count)?;
			self.image.write_sectors_tag(&subs, lba, count, SectorTag::CdSectorSubchannel)?;
		}
		self.speed.record_write(now.elapsed());
		Ok(())
	}

	/// # Write Main Channel.
	fn write_main(&mut self, buf: &[u8], lba: i32, count: u32) -> Result<(), DumpError> {
		if self.geometry.readcd() { self.image.write_sectors_long(buf, lba, count) }
		else { self.image.write_sectors(buf, lba, count) }
	}

	/// # Zero-Fill.
	///
	/// Write empty blocks in place of unreadable ones and mark them bad.
	fn zero_fill(&mut self, lba: i32, count: u32) -> Result<(), DumpError> {
		let buf = vec![0_u8; (count * self.geometry.block_size()) as usize];
		self.write(&buf, lba, count)?;
		for l in lba..lba + count as i32 {
			self.resume.mark_bad(l);
			self.progress.on_unreadable(l);
		}
		Ok(())
	}

	/// # Track At.
	pub(super) fn track_at(&self, lba: i32) -> Option<&Track> {
		self.tracks.iter().find(|t| t.read_start() <= lba && lba <= t.end)
	}

	/// # Save Resume State.
	pub(super) fn save(&mut self) -> Result<(), DumpError> {
		self.last_save = Instant::now();
		match self.resume_path {
			Some(p) => self.resume.save(p),
			None => Ok(()),
		}
	}

	/// # Save (Occasionally).
	fn maybe_save(&mut self) -> Result<(), DumpError> {
		if SAVE_EVERY <= self.last_save.elapsed() { self.save() }
		else { Ok(()) }
	}

	/// # Correct Audio?
	fn fix_for(&self, track: &Track) -> bool { self.offset != 0 && track.kind.is_audio() }

	/// # Re-read One Block.
	///
	/// Used by the trim and retry passes. Returns `true` if the block was
	/// recovered.
	pub(super) fn reread(&mut self, lba: i32) -> Result<bool, DumpError> {
		let fix = self.track_at(lba).is_some_and(|t| self.fix_for(t));
		match self.read_run(lba, 1, fix) {
			Ok(buf) => {
				self.write(&buf, lba, 1)?;
				self.resume.mark_good(lba, 1);
				self.log.line(format!("Correctly re-read sector {lba}."));
				Ok(true)
			},
			Err(e) => {
				log::debug!("Sector {lba} is still unreadable: {e}.");
				Ok(false)
			},
		}
	}
}



/// # Read First Track Pregap.
///
/// The 150 sectors ahead of LBA zero aren't addressable on most drives, but
/// some will return them. Each one is tried on its own; the result is only
/// kept if at least one came back.
pub(super) fn read_first_pregap(share: &mut DumpShare) -> Result<bool, DumpError> {
	if ! share.geometry.readcd() { return Ok(false); }
	share.progress.on_pulse("Reading the first track pregap…");

	let mut out = Vec::with_capacity(FIRST_PREGAP as usize * BYTES_PER_SECTOR as usize);
	let mut good = 0_u32;
	for lba in -FIRST_PREGAP..0 {
		match share.drive.read_cd(lba, BYTES_PER_SECTOR, 1, SectorType::All, Subchannel::None, TIMEOUT) {
			Ok((buf, _)) if buf.len() == BYTES_PER_SECTOR as usize => {
				out.extend_from_slice(&buf);
				good += 1;
			},
			_ => out.resize(out.len() + BYTES_PER_SECTOR as usize, 0),
		}
	}

	if good == 0 {
		share.log.line("The first track pregap could not be read.");
		return Ok(false);
	}

	share.log.line(format!("Read {good} of {FIRST_PREGAP} first track pregap sector(s)."));
	if share.image.capabilities().media_tags {
		share.image.write_media_tag(&out, MediaTag::CdFirstTrackPregap)?;
	}
	Ok(true)
}



#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
/// # Main Pass.
///
/// Walk the disc from the resume point to the end, in runs of up to the
/// maximum transfer size that never cross a track boundary.
///
/// ## Errors
///
/// Read failures only stop the pass with `stop_on_error`; write failures
/// always do.
pub(super) fn read_disc(share: &mut DumpShare) -> Result<(), DumpError> {
	let last = share.geometry.last_sector();
	let mut i = share.resume.next_block().max(0);
	if last < i {
		share.log.line("The main pass is already complete.");
		return Ok(());
	}

	share.log.pass_start("Main pass");
	share.progress.on_init();
	let total = u64::from(share.geometry.blocks);

	while i <= last {
		if share.killed.killed() {
			share.log.line(format!("Dump aborted by user at sector {i}."));
			break;
		}

		// Nothing to read between sessions.
		if let Some(end) = share.lead_outs.end_of(i) {
			i = end + 1;
			share.resume.advance(i);
			continue;
		}

		let Some((end, fix)) = share.track_at(i).map(|t| (t.end, share.fix_for(t))) else {
			i += 1;
			share.resume.advance(i);
			continue;
		};

		let room =
			if fix { share.geometry.max_transfer.saturating_sub(sectors_for_bytes(share.offset)) }
			else { share.geometry.max_transfer };
		// A corrected batch can drop to one sector; the padding still keeps the
		// request itself at two or more.
		let n = room.max(1).min((end - i + 1) as u32);

		share.progress.on_update(
			&format!("Reading sector {} ({:.2} MiB/s)…", NiceU32::from(i as u32), share.speed.current()),
			i as u64,
			total,
		);

		match share.read_run(i, n, fix) {
			Ok(buf) => {
				share.write(&buf, i, n)?;
				share.resume.mark_good(i, n);
				i += n as i32;
			},
			Err(e) => {
				if share.opts.stop_on_error() {
					share.save()?;
					return Err(DumpError::ReadStop(i, e));
				}

				let skip = share.opts.skip()
					.map_or(n, u32::from)
					.min((end - i + 1) as u32)
					.max(1);
				share.log.line(format!("Error reading sector {i} ({e}); skipping {skip} sector(s)."));
				share.zero_fill(i, skip)?;
				i += skip as i32;
			},
		}

		share.resume.advance(i);
		share.maybe_save()?;
	}

	share.progress.on_end();
	if ! share.killed.killed() { share.resume.record_pass(PassKind::Main); }
	share.log.pass_end(share.resume.bad_blocks().len());
	share.save()
}
