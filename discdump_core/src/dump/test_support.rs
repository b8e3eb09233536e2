/*!
# Disc Dump: Test Fixtures

A scriptable in-memory drive and image so the dumper can be exercised without
hardware. The drive models a single disc: track layout, sub-channel Q, read
offset, and failures (random, transient, or permanent).
*/

use crate::{
	BYTES_PER_SECTOR,
	decode::{
		full_toc,
		lba_to_msf,
		subchannel::{
			bcd_to_binary_q,
			interleave_q,
			SubQBuf,
			test::position_q,
		},
		toc,
		u8_to_bcd,
	},
	Drive,
	DriveResult,
	DriveVendorModel,
	DumpError,
	ImageCapabilities,
	ImageWriter,
	MediaTag,
	MediaType,
	SectorTag,
	SectorType,
	SenseError,
	Subchannel,
	TocFormat,
	Track,
};
use super::probe::{
	SCRAMBLE,
	SYNC,
};
use std::{
	collections::{
		BTreeMap,
		BTreeSet,
	},
	time::Duration,
};



/// # Illegal Mode For This Track.
const ILLEGAL_MODE: SenseError = SenseError { key: 0x05, asc: 0x64, ascq: 0x00 };

/// # Pretend Command Duration.
const TICK: Duration = Duration::from_millis(2);



#[derive(Debug, Clone, Copy)]
/// # Mock Track.
pub(crate) struct MockTrack {
	pub(crate) number: u8,
	pub(crate) session: u8,

	/// # Mode (Zero for Audio).
	pub(crate) mode: u8,
	pub(crate) form2: bool,
	pub(crate) start: i32,
	pub(crate) pregap: u32,
	pub(crate) end: i32,
}

impl MockTrack {
	/// # Audio.
	pub(crate) const fn audio(number: u8, start: i32, pregap: u32) -> Self {
		Self { number, session: 1, mode: 0, form2: false, start, pregap, end: start }
	}

	/// # Data.
	pub(crate) const fn data(number: u8, mode: u8, start: i32, pregap: u32) -> Self {
		Self { number, session: 1, mode, form2: false, start, pregap, end: start }
	}

	/// # Form 2.
	pub(crate) const fn with_form2(self) -> Self { Self { form2: true, ..self } }

	/// # Session.
	pub(crate) const fn in_session(self, session: u8) -> Self { Self { session, ..self } }

	/// # CONTROL.
	const fn control(&self) -> u8 { if self.mode == 0 { 0 } else { 4 } }

	/// # Pregap Start.
	pub(crate) const fn pregap_start(&self) -> i32 {
		self.start.saturating_sub_unsigned(self.pregap)
	}
}



#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
/// # Mock Drive.
pub(crate) struct MockDrive {
	pub(crate) tracks: Vec<MockTrack>,

	/// # Lead-out Start (Per Session).
	pub(crate) lead_outs: Vec<i32>,

	/// # Full TOC Disc Type (A0 PSEC).
	pub(crate) disc_type: u8,

	/// # Q16 Is BCD?
	pub(crate) bcd: bool,

	/// # Best Sub-channel Supported.
	pub(crate) sub: Subchannel,

	pub(crate) readcd: bool,
	pub(crate) read10: bool,
	pub(crate) full_toc: bool,
	pub(crate) toc: bool,
	pub(crate) capacity: bool,
	pub(crate) max_transfer: u32,

	/// # Read Offset (Bytes).
	pub(crate) offset_bytes: i32,

	/// # Return Scrambled Data Sectors For CD-DA Reads?
	pub(crate) scrambled: bool,

	/// # Allow Reads of LBA -150..0?
	pub(crate) pregap_readable: bool,

	/// # Random Read Failure (Per Mille).
	pub(crate) fail_rate: u32,

	/// # Random Q Corruption (Per Mille).
	pub(crate) corrupt_rate: u32,

	/// # Always Unreadable.
	pub(crate) permanent: BTreeSet<i32>,

	/// # Unreadable For the First N Attempts.
	pub(crate) transient: BTreeMap<i32, u8>,

	pub(crate) mcn: Option<String>,
	pub(crate) isrc: BTreeMap<u8, String>,
	pub(crate) vendor_model: Option<DriveVendorModel>,

	/// # READ CD Calls.
	pub(crate) reads: usize,

	rng: u64,
}

impl MockDrive {
	/// # New.
	///
	/// Track ends are worked out from the following track (or the session's
	/// lead-out).
	pub(crate) fn new(mut tracks: Vec<MockTrack>, lead_outs: &[i32]) -> Self {
		let len = tracks.len();
		for idx in 0..len {
			let session = tracks[idx].session;
			let end = match tracks.get(idx + 1) {
				Some(next) if next.session == session => next.pregap_start() - 1,
				_ => lead_outs[usize::from(session) - 1] - 1,
			};
			tracks[idx].end = end;
		}

		Self {
			tracks,
			lead_outs: lead_outs.to_vec(),
			disc_type: 0,
			bcd: true,
			sub: Subchannel::Raw,
			readcd: true,
			read10: true,
			full_toc: true,
			toc: true,
			capacity: true,
			max_transfer: 256,
			offset_bytes: 0,
			scrambled: false,
			pregap_readable: false,
			fail_rate: 0,
			corrupt_rate: 0,
			permanent: BTreeSet::new(),
			transient: BTreeMap::new(),
			mcn: None,
			isrc: BTreeMap::new(),
			vendor_model: None,
			reads: 0,
			rng: 0x2545_F491_4F6C_DD1D,
		}
	}

	/// # Last Sector.
	pub(crate) fn last_sector(&self) -> i32 {
		self.lead_outs.last().copied().unwrap_or(1) - 1
	}

	/// # Track At.
	fn track_at(&self, lba: i32) -> Option<&MockTrack> {
		self.tracks.iter().find(|t| t.pregap_start() <= lba && lba <= t.end)
	}

	/// # Roll the Dice.
	fn roll(&mut self, per_mille: u32) -> bool {
		if per_mille == 0 { return false; }
		self.rng ^= self.rng << 13;
		self.rng ^= self.rng >> 7;
		self.rng ^= self.rng << 17;
		self.rng % 1000 < u64::from(per_mille)
	}

	/// # Readable?
	fn readable(&self, lba: i32) -> bool {
		if lba < 0 { self.pregap_readable && -150 <= lba }
		else { self.track_at(lba).is_some() }
	}

	/// # Sector Ground Truth.
	pub(crate) fn true_sector(&self, lba: i32) -> Vec<u8> {
		match self.track_at(lba) {
			Some(t) if t.mode == 0 => audio_sector(lba),
			Some(t) => data_sector(lba, t.mode, t.form2),
			None => vec![0; BYTES_PER_SECTOR as usize],
		}
	}

	#[allow(clippy::cast_possible_wrap)]
	/// # Corrected Audio Ground Truth.
	///
	/// What an offset-corrected read of `lba` should produce when only the
	/// audio in `first..=last` can be fetched: bytes the drive would have had
	/// to return from outside that stretch are zero.
	pub(crate) fn corrected_sector(&self, lba: i32, offset: i32, first: i32, last: i32) -> Vec<u8> {
		let size = i64::from(BYTES_PER_SECTOR);
		let base = i64::from(lba) * size + i64::from(offset);
		let mut out = self.true_sector(lba);
		for (k, b) in out.iter_mut().enumerate() {
			let src = (base + k as i64).div_euclid(size);
			if src < i64::from(first) || i64::from(last) < src { *b = 0; }
		}
		out
	}

	/// # Q Ground Truth (BCD).
	pub(crate) fn true_q(&self, lba: i32) -> SubQBuf {
		let Some(t) = self.track_at(lba) else { return [0; 12]; };
		let (index, relative) =
			if lba < t.start { (0, t.start - lba) }
			else { (1, lba - t.start) };
		position_q(t.control(), t.number, index, relative, lba)
	}

	/// # Sub-channel As Returned.
	fn sub_for(&mut self, lba: i32, sub: Subchannel) -> Vec<u8> {
		let mut q = self.true_q(lba);
		if self.roll(self.corrupt_rate) { q[4] ^= 0x01; }
		match sub {
			Subchannel::None => Vec::new(),
			Subchannel::Raw => interleave_q(&q).to_vec(),
			Subchannel::Q16 => {
				// Some drives hand back binary positions but keep the CRC.
				if ! self.bcd {
					let crc = [q[10], q[11]];
					bcd_to_binary_q(&mut q);
					q[10] = crc[0];
					q[11] = crc[1];
				}
				let mut out = q.to_vec();
				out.extend_from_slice(&[0, 0, 0, 0]);
				out
			},
		}
	}

	/// # Main Channel As Returned.
	fn main_for(&self, lba: i32, kind: SectorType) -> Result<Vec<u8>, SenseError> {
		let audio = self.track_at(lba).map_or(true, |t| t.mode == 0);
		if audio { return Ok(self.shifted(lba, false)); }
		match kind {
			SectorType::Cdda if self.scrambled => Ok(self.shifted(lba, true)),
			SectorType::Cdda => Err(ILLEGAL_MODE),
			_ => Ok(self.true_sector(lba)),
		}
	}

	/// # Sector As Recorded.
	///
	/// Data sectors are scrambled on the disc itself.
	fn disc_sector(&self, lba: i32, raw: bool) -> Vec<u8> {
		let mut out = self.true_sector(lba);
		if raw && self.track_at(lba).is_some_and(|t| t.mode != 0) { scramble(&mut out); }
		out
	}

	/// # Offset-Shifted Sector.
	///
	/// The drive returns the byte `offset` positions before the one asked
	/// for.
	fn shifted(&self, lba: i32, raw: bool) -> Vec<u8> {
		let g = i64::from(lba) * i64::from(BYTES_PER_SECTOR) - i64::from(self.offset_bytes);
		let size = i64::from(BYTES_PER_SECTOR);
		let a = i32::try_from(g.div_euclid(size)).unwrap_or(i32::MIN);
		let off = usize::try_from(g.rem_euclid(size)).unwrap_or(0);
		let mut out = self.disc_sector(a, raw)[off..].to_vec();
		out.extend_from_slice(&self.disc_sector(a + 1, raw)[..off]);
		out
	}

	/// # Shared Failure Checks.
	fn check(&mut self, lba: i32, count: u32) -> Result<(), SenseError> {
		if count == 0 || self.max_transfer < count { return Err(SenseError::UNSUPPORTED); }
		let end = lba + count as i32;
		if self.last_sector() < end - 1 { return Err(SenseError::OUT_OF_RANGE); }
		if (lba..end).any(|l| ! self.readable(l)) { return Err(SenseError::MEDIUM); }
		if (lba..end).any(|l| self.permanent.contains(&l)) { return Err(SenseError::MEDIUM); }

		let mut transient = false;
		for l in lba..end {
			if let Some(v) = self.transient.get_mut(&l) {
				if *v != 0 {
					*v -= 1;
					transient = true;
				}
			}
		}
		if transient || self.roll(self.fail_rate) { Err(SenseError::MEDIUM) }
		else { Ok(()) }
	}
}

impl Drive for MockDrive {
	fn read_cd(
		&mut self,
		lba: i32,
		block_size: u32,
		count: u32,
		kind: SectorType,
		sub: Subchannel,
		_timeout: Duration,
	) -> DriveResult<Vec<u8>> {
		self.reads += 1;
		if ! self.readcd || self.sub.size() < sub.size() { return Err(SenseError::UNSUPPORTED); }
		if block_size != BYTES_PER_SECTOR + sub.size() { return Err(SenseError::UNSUPPORTED); }
		self.check(lba, count)?;

		let mut out = Vec::with_capacity(block_size as usize * count as usize);
		for l in lba..lba + count as i32 {
			out.extend_from_slice(&self.main_for(l, kind)?);
			let s = self.sub_for(l, sub);
			out.extend_from_slice(&s);
		}
		Ok((out, TICK))
	}

	fn read6(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>> {
		let _res = (lba, block_size, count, timeout);
		Err(SenseError::UNSUPPORTED)
	}

	fn read10(&mut self, lba: i32, block_size: u32, count: u32, _timeout: Duration) -> DriveResult<Vec<u8>> {
		if ! self.read10 || block_size != 2048 { return Err(SenseError::UNSUPPORTED); }
		self.check(lba, count)?;
		let mut out = Vec::with_capacity(2048 * count as usize);
		for l in lba..lba + count as i32 {
			let s = self.true_sector(l);
			out.extend_from_slice(&s[16..16 + 2048]);
		}
		Ok((out, TICK))
	}

	fn read12(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>> {
		let _res = (lba, block_size, count, timeout);
		Err(SenseError::UNSUPPORTED)
	}

	fn read16(&mut self, lba: i32, block_size: u32, count: u32, timeout: Duration) -> DriveResult<Vec<u8>> {
		let _res = (lba, block_size, count, timeout);
		Err(SenseError::UNSUPPORTED)
	}

	fn read_toc(&mut self, format: TocFormat, _track_session: u8, _timeout: Duration) -> DriveResult<Vec<u8>> {
		match format {
			TocFormat::FullToc if self.full_toc => Ok((self.encode_full_toc(), TICK)),
			TocFormat::Toc if self.toc => {
				let mut entries: Vec<(u8, u8, i32)> = self.tracks.iter()
					.map(|t| (t.number, t.control(), t.start))
					.collect();
				let last = self.tracks.last().map_or(0, |t| t.control());
				entries.push((toc::LEADOUT_TRACK, last, self.last_sector() + 1));
				let first = self.tracks.first().map_or(1, |t| t.number);
				let last = self.tracks.last().map_or(1, |t| t.number);
				Ok((toc::test::encode(first, last, &entries), TICK))
			},
			_ => Err(SenseError::UNSUPPORTED),
		}
	}

	fn read_mcn(&mut self, _timeout: Duration) -> DriveResult<Option<String>> {
		Ok((self.mcn.clone(), TICK))
	}

	fn read_isrc(&mut self, track: u8, _timeout: Duration) -> DriveResult<Option<String>> {
		Ok((self.isrc.get(&track).cloned(), TICK))
	}

	fn read_capacity10(&mut self, _timeout: Duration) -> DriveResult<(u32, u32)> {
		if ! self.capacity { return Err(SenseError::UNSUPPORTED); }
		let last = u32::try_from(self.last_sector()).unwrap_or(0);
		Ok(((last, 2048), TICK))
	}

	fn read_capacity16(&mut self, _timeout: Duration) -> DriveResult<(u64, u32)> {
		Err(SenseError::UNSUPPORTED)
	}

	fn vendor_model(&self) -> Option<DriveVendorModel> { self.vendor_model }
}

impl MockDrive {
	/// # Full TOC.
	fn encode_full_toc(&self) -> Vec<u8> {
		let mut entries = Vec::new();
		for (idx, lead_out) in self.lead_outs.iter().enumerate() {
			let session = u8::try_from(idx + 1).unwrap_or(1);
			let tracks: Vec<&MockTrack> = self.tracks.iter()
				.filter(|t| t.session == session)
				.collect();
			let (Some(first), Some(last)) = (tracks.first(), tracks.last()) else { continue; };
			entries.push([session, 0x10 | first.control(), 0, full_toc::POINT_FIRST_TRACK, 0, 0, 0, 0, first.number, self.disc_type, 0]);
			entries.push([session, 0x10 | last.control(), 0, full_toc::POINT_LAST_TRACK, 0, 0, 0, 0, last.number, 0, 0]);
			entries.push(full_toc::test::entry(session, last.control(), full_toc::POINT_LEADOUT, *lead_out));
			for t in tracks {
				entries.push(full_toc::test::entry(session, t.control(), t.number, t.start));
			}
		}
		full_toc::test::encode(&entries)
	}
}



#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
/// # Audio Ground Truth.
pub(crate) fn audio_sector(lba: i32) -> Vec<u8> {
	let base = i64::from(lba) * i64::from(BYTES_PER_SECTOR);
	(0..i64::from(BYTES_PER_SECTOR))
		.map(|k| {
			let g = base + k;
			(g.rem_euclid(251) as u8) ^ (g.div_euclid(2352) & 0xFF) as u8
		})
		.collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
/// # Data Ground Truth.
pub(crate) fn data_sector(lba: i32, mode: u8, form2: bool) -> Vec<u8> {
	let mut out = vec![0_u8; BYTES_PER_SECTOR as usize];
	out[..12].copy_from_slice(&SYNC);
	let (m, s, f) = lba_to_msf(lba);
	out[12] = u8_to_bcd(m);
	out[13] = u8_to_bcd(s);
	out[14] = u8_to_bcd(f);
	out[15] = mode;
	if mode == 2 {
		let submode = if form2 { 0x20 } else { 0x08 };
		out[16..24].copy_from_slice(&[0, 0, submode, 0, 0, 0, submode, 0]);
	}
	for (k, b) in out.iter_mut().enumerate().skip(24) {
		*b = (lba as u8).wrapping_add(k as u8);
	}
	out
}

/// # Scramble (ECMA-130).
///
/// Everything after the sync pattern is XORed with the scrambler table.
pub(crate) fn scramble(sector: &mut [u8]) {
	for (b, t) in sector.iter_mut().skip(12).zip(SCRAMBLE.iter()) { *b ^= *t; }
}



#[derive(Debug, Default)]
/// # Memory Image.
pub(crate) struct MemoryImage {
	pub(crate) caps: ImageCapabilities,
	pub(crate) created: Option<(MediaType, u64, u32)>,
	pub(crate) tracks: Vec<Track>,
	pub(crate) main: BTreeMap<i32, Vec<u8>>,
	pub(crate) subs: BTreeMap<i32, Vec<u8>>,
	pub(crate) track_tags: BTreeMap<(u8, SectorTag), Vec<u8>>,
	pub(crate) media_tags: BTreeMap<MediaTag, Vec<u8>>,
	pub(crate) closed: bool,

	/// # Refuse Sub-channel Layouts Regardless of Capabilities.
	pub(crate) reject_subchannel: bool,
}

impl MemoryImage {
	/// # New.
	pub(crate) fn new() -> Self {
		Self {
			caps: ImageCapabilities::default(),
			..Self::default()
		}
	}

	/// # Split Into Sectors.
	fn store(dst: &mut BTreeMap<i32, Vec<u8>>, data: &[u8], lba: i32, count: u32)
	-> Result<(), DumpError> {
		if count == 0 || data.len() % count as usize != 0 {
			return Err(DumpError::Image("uneven write".to_owned()));
		}
		let size = data.len() / count as usize;
		for (idx, chunk) in data.chunks_exact(size).enumerate() {
			dst.insert(lba + idx as i32, chunk.to_vec());
		}
		Ok(())
	}
}

impl ImageWriter for MemoryImage {
	fn capabilities(&self) -> ImageCapabilities { self.caps }

	fn create(&mut self, media: MediaType, sectors: u64, sector_size: u32) -> Result<(), DumpError> {
		self.created.replace((media, sectors, sector_size));
		Ok(())
	}

	fn set_tracks(&mut self, tracks: &[Track]) -> Result<(), DumpError> {
		if (! self.caps.subchannel || self.reject_subchannel) && tracks.iter().any(|t| t.subchannel.size() != 0) {
			return Err(DumpError::Image("sub-channel is not supported".to_owned()));
		}
		self.tracks = tracks.to_vec();
		Ok(())
	}

	fn write_sectors(&mut self, data: &[u8], lba: i32, count: u32) -> Result<(), DumpError> {
		Self::store(&mut self.main, data, lba, count)
	}

	fn write_sectors_long(&mut self, data: &[u8], lba: i32, count: u32) -> Result<(), DumpError> {
		Self::store(&mut self.main, data, lba, count)
	}

	fn write_sectors_tag(&mut self, data: &[u8], lba: i32, count: u32, tag: SectorTag) -> Result<(), DumpError> {
		match tag {
			SectorTag::CdSectorSubchannel => Self::store(&mut self.subs, data, lba, count),
			SectorTag::CdTrackFlags | SectorTag::CdTrackIsrc => {
				let track = u8::try_from(lba).map_err(|_| DumpError::Image("bad track".to_owned()))?;
				self.track_tags.insert((track, tag), data.to_vec());
				Ok(())
			},
		}
	}

	fn write_media_tag(&mut self, data: &[u8], tag: MediaTag) -> Result<(), DumpError> {
		if ! self.caps.media_tags { return Err(DumpError::Capability("no media tags")); }
		self.media_tags.insert(tag, data.to_vec());
		Ok(())
	}

	fn close(&mut self) -> Result<(), DumpError> {
		self.closed = true;
		Ok(())
	}
}
