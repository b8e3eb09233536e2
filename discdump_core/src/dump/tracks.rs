/*!
# Disc Dump: Track Mapping
*/

use crate::{
	BYTES_PER_SECTOR,
	decode::{
		full_toc::{
			DISC_TYPE_CDI,
			DISC_TYPE_CDROM_XA,
			FullToc,
			POINT_FIRST_TRACK,
			POINT_LEADOUT,
		},
		toc::{
			LEADOUT_TRACK,
			Toc,
		},
	},
	Drive,
	DumpError,
	DumpLog,
	Extents,
	MediaType,
	SectorType,
	Subchannel,
	TocFormat,
	Track,
	TrackFlags,
	TrackKind,
};
use super::TIMEOUT;



/// # Fallback Disc Length.
///
/// Used with `force` when nothing reports where the disc ends.
const FALLBACK_SECTORS: i32 = 360_000;

/// # Sub-header Submode Byte.
const SUBMODE: usize = 0x12;

/// # Submode: Form 2.
const SUBMODE_FORM2: u8 = 0x20;



#[derive(Debug, Clone, Default)]
/// # Track Map.
///
/// Everything learned from the TOC.
pub(super) struct TrackMap {
	/// # Tracks.
	pub(super) tracks: Vec<Track>,

	/// # Raw Full TOC.
	pub(super) full_toc: Option<Vec<u8>>,

	/// # Raw TOC.
	pub(super) toc: Option<Vec<u8>>,

	/// # Lead-out Starts (Session, LBA).
	pub(super) lead_outs: Vec<(u8, i32)>,

	/// # Last Sector.
	pub(super) last_sector: i32,

	/// # Media Type.
	pub(super) media_type: MediaType,
}

impl TrackMap {
	/// # Blocks.
	pub(super) fn blocks(&self) -> u32 {
		u32::try_from(self.last_sector + 1).unwrap_or(0)
	}
}



/// # Build Track List.
///
/// Read the Full TOC (or failing that, the plain TOC) and work out the
/// tracks, sessions, lead-outs, and a first guess at the media type.
///
/// ## Errors
///
/// Unless `force` is set, this returns an error if no TOC can be read or the
/// end of the disc can't be determined.
pub(super) fn build_track_list(drive: &mut dyn Drive, force: bool, log: &mut DumpLog)
-> Result<TrackMap, DumpError> {
	let mut map = TrackMap::default();
	let mut a0_media = None;
	let mut lead_out_kind = TrackKind::Audio;

	match drive.read_raw_toc(TIMEOUT) {
		Ok((raw, _)) => if let Some(full) = FullToc::decode(&raw) {
			for d in full.sorted() {
				if ! matches!(d.adr, 1 | 4) { continue; }
				if d.is_track() {
					let kind = if d.is_data() { TrackKind::Data } else { TrackKind::Audio };
					map.tracks.push(Track::new(d.point, d.session, kind, d.point_lba(), TrackFlags::from(d.control)));
				}
				else if d.point == POINT_LEADOUT {
					map.lead_outs.push((d.session, d.point_lba_minus_one() + 1));
					lead_out_kind = if d.is_data() { TrackKind::Data } else { TrackKind::Audio };
				}
				else if d.point == POINT_FIRST_TRACK && d.adr == 1 {
					match d.psec {
						DISC_TYPE_CDI => { a0_media.replace(MediaType::Cdi); },
						DISC_TYPE_CDROM_XA => { a0_media.replace(MediaType::CdromXa); },
						_ => {},
					}
				}
			}
			map.full_toc.replace(raw);
		}
		else { log.line("The Full TOC could not be decoded."); },
		Err(e) => log::debug!("Full TOC unavailable: {e}."),
	}

	// Fall back to the plain TOC.
	match drive.read_toc(TocFormat::Toc, 0, TIMEOUT) {
		Ok((raw, _)) => {
			if let Some(toc) = Toc::decode(&raw) {
				if map.tracks.is_empty() { from_toc(&mut map, &toc, &mut lead_out_kind); }
				map.toc.replace(raw);
			}
		},
		Err(e) => log::debug!("TOC unavailable: {e}."),
	}

	if map.full_toc.is_none() && map.toc.is_none() {
		if ! force { return Err(log.error(DumpError::NoToc)); }
		log.line("Could not read the TOC; continuing anyway.");
	}

	// Find the end.
	map.last_sector = last_sector(drive, &map.lead_outs, force, log)?;

	// Nothing at all? Pretend the whole thing is one big track.
	if map.tracks.is_empty() {
		log.line("No tracks found; assuming a single track.");
		let flags = TrackFlags::from(if lead_out_kind.is_audio() { 0 } else { TrackFlags::DATA });
		map.tracks.push(Track::new(1, 1, lead_out_kind, 0, flags));
	}

	map.tracks[0].pregap = 150;
	map.media_type = media_hint(&map.tracks, a0_media);
	reconcile(&mut map.tracks, &map.lead_outs, map.last_sector);

	for t in &map.tracks {
		log::debug!("Track {:02}: session {}, {} from {}.", t.number, t.session, t.kind, t.start);
	}

	Ok(map)
}

/// # Tracks From Plain TOC.
///
/// Everything is lumped into the first session.
fn from_toc(map: &mut TrackMap, toc: &Toc, lead_out_kind: &mut TrackKind) {
	for d in &toc.descriptors {
		let kind = if d.is_data() { TrackKind::Data } else { TrackKind::Audio };
		if d.track == LEADOUT_TRACK {
			map.lead_outs.push((1, d.lba()));
			*lead_out_kind = kind;
		}
		else if (1..=99).contains(&d.track) {
			map.tracks.push(Track::new(d.track, 1, kind, d.lba(), TrackFlags::from(d.control)));
		}
	}
}

/// # Last Sector.
///
/// Prefer the TOC's lead-out, then READ CAPACITY, then a guess.
fn last_sector(drive: &mut dyn Drive, lead_outs: &[(u8, i32)], force: bool, log: &mut DumpLog)
-> Result<i32, DumpError> {
	if let Some(&(_, start)) = lead_outs.iter().max_by_key(|(s, _)| *s) {
		return Ok(start - 1);
	}

	if let Some(last) = drive.read_capacity16(TIMEOUT).ok()
		.and_then(|((last, _), _)| i32::try_from(last).ok())
	{
		return Ok(last);
	}

	if let Some(last) = drive.read_capacity10(TIMEOUT).ok()
		.and_then(|((last, _), _)| i32::try_from(last).ok())
	{
		return Ok(last);
	}

	if force {
		log.line(format!("Could not find the end of the disc; guessing {FALLBACK_SECTORS} sectors."));
		Ok(FALLBACK_SECTORS - 1)
	}
	else { Err(log.error(DumpError::NoLeadOut)) }
}

/// # Media Type Hint.
///
/// All audio is CD-DA; all data is CD-ROM; audio sessions followed by a data
/// session is CD-Plus; anything else mixed is plain CD. The Full TOC's disc
/// type can then upgrade CD and CD-ROM.
fn media_hint(tracks: &[Track], a0: Option<MediaType>) -> MediaType {
	let audio = tracks.iter().filter(|t| t.kind.is_audio()).count();
	let media =
		if audio == tracks.len() { MediaType::Cdda }
		else if audio == 0 { MediaType::Cdrom }
		else {
			let last_audio = tracks.iter().filter(|t| t.kind.is_audio()).map(|t| t.session).max();
			let first_data = tracks.iter().filter(|t| ! t.kind.is_audio()).map(|t| t.session).min();
			match (last_audio, first_data) {
				(Some(a), Some(d)) if a < d => MediaType::CdPlus,
				_ => MediaType::Cd,
			}
		};

	match a0 {
		Some(hint) if matches!(media, MediaType::Cd | MediaType::Cdrom) => hint,
		_ => media,
	}
}



/// # Reconcile Ends and Lead-outs.
///
/// Each track runs until the next one's pregap; the last track of a session
/// runs to that session's lead-out. Returns the unreadable stretches between
/// sessions.
pub(super) fn reconcile(tracks: &mut [Track], lead_outs: &[(u8, i32)], last_sector: i32) -> Extents {
	let mut gaps = Extents::new();
	for idx in 0..tracks.len() {
		let session = tracks[idx].session;
		let next = tracks.get(idx + 1).map(|t| (t.session, t.pregap_start()));
		let end = match next {
			Some((s, start)) if s == session => start - 1,
			_ => lead_outs.iter()
				.find_map(|&(s, l)| if s == session { Some(l - 1) } else { None })
				.unwrap_or(last_sector),
		};
		tracks[idx].end = end.min(last_sector);

		if let Some((s, start)) = next {
			if s != session && tracks[idx].end + 1 < start {
				gaps.insert(tracks[idx].end + 1, start - 1);
			}
		}
	}
	gaps
}



/// # Detect Track Modes.
///
/// Sample the first sector of each data track to tell Mode 1 from the
/// various Mode 2 flavours.
pub(super) fn detect_track_modes(
	drive: &mut dyn Drive,
	tracks: &mut [Track],
	media: &mut MediaType,
	readcd: bool,
	log: &mut DumpLog,
) {
	let mut mode2 = false;
	for t in tracks.iter_mut().filter(|t| ! t.kind.is_audio()) {
		if ! readcd {
			t.kind = TrackKind::CdMode1;
			continue;
		}

		match drive.read_cd(t.start, BYTES_PER_SECTOR, 1, SectorType::All, Subchannel::None, TIMEOUT) {
			Ok((buf, _)) => match buf.get(15) {
				Some(2) => {
					mode2 = true;
					t.kind =
						if media.is_cdi() { TrackKind::CdMode2Formless }
						else if buf.get(SUBMODE).is_some_and(|b| b & SUBMODE_FORM2 == SUBMODE_FORM2) {
							TrackKind::CdMode2Form2
						}
						else { TrackKind::CdMode2Form1 };
					if matches!(media, MediaType::Cdrom) { *media = MediaType::CdromXa; }
				},
				Some(1) => { t.kind = TrackKind::CdMode1; },
				_ => {
					log.line(format!("Track {:02} has an unrecognized sector mode; assuming Mode 1.", t.number));
					t.kind = TrackKind::CdMode1;
				},
			},
			Err(e) => {
				log.line(format!("Unable to sample track {:02} ({e}); assuming Mode 1.", t.number));
				t.kind = TrackKind::CdMode1;
			},
		}
	}

	if ! mode2 && matches!(media, MediaType::CdromXa) { *media = MediaType::Cdrom; }
}
