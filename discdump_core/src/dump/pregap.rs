/*!
# Disc Dump: Pregap Solver

The TOC only says where each track's index 01 begins. The pregap (index 00)
ahead of it has to be found by walking the Q sub-channel backward from the
start until the previous track shows up.
*/

use crate::{
	BYTES_PER_SECTOR,
	CD_LEADIN,
	decode::subchannel::{
		bcd_to_binary_q,
		binary_to_bcd_q,
		deinterleave_q,
		fix_q,
		is_empty_q,
		q_crc_ok,
		Q_LEN,
		RAW_SUB_LEN,
		SubQ,
		SubQBuf,
	},
	Drive,
	DumpLog,
	SectorType,
	Subchannel,
	Track,
};
use super::TIMEOUT;



/// # Reads Per Position.
const READ_TRIES: u8 = 10;

/// # Retries Per Track.
const TRACK_TRIES: u8 = 10;

/// # Search Step Limit (Per Track).
const MAX_STEPS: u16 = 1000;

/// # Seek Distance.
const SEEK_BACK: i32 = 10;

/// # Sector Probed for BCD.
const BCD_PROBE_LBA: i32 = 11;



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Pregap Report.
pub(super) struct PregapReport {
	/// # Some Positions Were Guessed.
	pub(super) inexact_positioning: bool,
}



/// # Detect BCD.
///
/// Read LBA 11, whose absolute frame is 11: in BCD that sets bit four, in
/// binary it doesn't. Returns `None` if the sector can't be read.
pub(super) fn detect_bcd(drive: &mut dyn Drive, sub: Subchannel) -> Option<bool> {
	if matches!(sub, Subchannel::None) { return None; }
	for _ in 0..READ_TRIES {
		if let Some(q) = read_raw_q(drive, BCD_PROBE_LBA, sub) {
			return Some(q[9] & 0x10 == 0x10);
		}
	}
	None
}

/// # Read Q (As Returned).
fn read_raw_q(drive: &mut dyn Drive, lba: i32, sub: Subchannel) -> Option<SubQBuf> {
	let (buf, _) = drive.read_cd(lba, BYTES_PER_SECTOR + sub.size(), 1, SectorType::All, sub, TIMEOUT)
		.map_err(|e| log::trace!("Q read at {lba} failed: {e}."))
		.ok()?;
	let tail = buf.get(BYTES_PER_SECTOR as usize..)?;
	match sub {
		Subchannel::Raw => deinterleave_q(tail.get(..RAW_SUB_LEN)?),
		Subchannel::Q16 => tail.get(..Q_LEN)?.try_into().ok(),
		Subchannel::None => None,
	}
}



/// # Solve Pregaps.
///
/// Fill in the pregap of every track that isn't the first in its session.
/// Later sessions' first tracks get the standard 150. Nothing here is
/// fatal; the worst case is a guess, flagged in the report.
pub(super) fn solve_pregaps(
	drive: &mut dyn Drive,
	tracks: &mut [Track],
	sub: Subchannel,
	skip_same_type: bool,
	log: &mut DumpLog,
) -> PregapReport {
	let mut report = PregapReport::default();
	let Some(bcd) = detect_bcd(drive, sub) else {
		log.line("Could not read the sub-channel; pregaps will not be detected.");
		return report;
	};
	log::debug!("Sub-channel Q is {}.", if bcd { "BCD" } else { "binary" });

	let mut solver = PregapSolver { drive, sub, bcd, log, inexact: false };
	for idx in 0..tracks.len() {
		if idx == 0 { continue; }
		let prev = tracks[idx - 1].clone();
		let track = &mut tracks[idx];

		// First of a later session.
		if track.session != prev.session {
			track.pregap = u32::from(CD_LEADIN);
			continue;
		}

		if skip_same_type && track.kind == prev.kind { continue; }

		let pregap = solver.solve(track, &prev);
		if pregap != 0 {
			log::debug!("Track {:02} pregap: {pregap} sector(s).", track.number);
		}
		track.pregap = pregap;
	}

	report.inexact_positioning = solver.inexact;
	report
}



/// # Pregap Solver.
///
/// Shared state for walking one track after another.
struct PregapSolver<'a> {
	drive: &'a mut dyn Drive,
	sub: Subchannel,
	bcd: bool,
	log: &'a mut DumpLog,
	inexact: bool,
}

impl PregapSolver<'_> {
	/// # Read Q.
	///
	/// Returns the binary Q and whether its CRC checked out, or `None` if the
	/// sector couldn't be read at all. Bad CRCs are retried; if none of the
	/// attempts are clean the last one is used anyway.
	fn read_q(&mut self, lba: i32, number: u8) -> Option<(SubQBuf, bool)> {
		let mut last = None;
		for _ in 0..READ_TRIES {
			let Some(mut q) = read_raw_q(self.drive, lba, self.sub) else { continue; };
			if ! self.bcd { binary_to_bcd_q(&mut q); }
			if q_crc_ok(&q) || fix_q(&mut q) {
				bcd_to_binary_q(&mut q);
				return Some((q, true));
			}
			last.replace(q);
		}

		let mut q = last?;
		self.log.line(format!("Could not get correct subchannel for track {number}."));
		bcd_to_binary_q(&mut q);
		Some((q, false))
	}

	/// # Seek Ahead of a Backward Read.
	fn seek_before(&mut self, lba: i32) {
		if let Err(e) = self.drive.seek((lba - SEEK_BACK).max(0), TIMEOUT) {
			log::trace!("Seek near {lba} failed: {e}.");
		}
	}

	/// # Pregap Zero?
	///
	/// True if the sector just ahead of the start belongs to the previous
	/// track proper.
	fn is_pregap_zero(&mut self, track: &Track, prev: &Track) -> bool {
		let lba = track.start - 1;
		self.read_q(lba, track.number)
			.and_then(|(q, _)| SubQ::from_binary(&q))
			.is_some_and(|q| q.track == prev.number && q.index != 0 && q.lba() == lba)
	}

	#[allow(clippy::cast_sign_loss)]
	/// # Solve One Track.
	fn solve(&mut self, track: &Track, prev: &Track) -> u32 {
		if prev.start >= track.start { return 0; }
		if self.is_pregap_zero(track, prev) { return 0; }

		let start = track.start;
		let mut lba = (start - i32::from(CD_LEADIN)).max(prev.start + 1);
		let mut best: u32 = 0;
		let mut retries = 0_u8;
		let mut steps = 0_u16;
		let mut gone_back = false;
		let mut go_front = false;
		let mut forward = false;
		let mut backward_read = true;

		while prev.start < lba && lba <= start {
			steps += 1;
			if MAX_STEPS < steps {
				log::debug!("Track {:02} pregap search ran too long.", track.number);
				self.inexact = true;
				break;
			}

			if backward_read { self.seek_before(lba); }
			let Some((q, crc_ok)) = self.read_q(lba, track.number) else {
				retries += 1;
				if TRACK_TRIES <= retries {
					if best == 0 { best = u32::from(CD_LEADIN); }
					self.log.line(format!(
						"Could not read subchannel for this track, supposing {best} sectors."
					));
					self.inexact = true;
					break;
				}
				continue;
			};

			if is_empty_q(&q) {
				self.log.line(format!("Track {:02}: drive returned empty sub-channel.", track.number));
				self.inexact = true;
				break;
			}

			// Anything other than a position in one of the two tracks of
			// interest is skipped.
			let pos = SubQ::from_binary(&q)
				.filter(|p| p.track == prev.number || p.track == track.number);
			let Some(pos) = pos else {
				if gone_back { lba += 1; backward_read = false; }
				else { lba -= 1; backward_read = true; }
				continue;
			};
			if pos.lba() != lba { self.inexact = true; }

			// Still in the previous track; the pregap starts later.
			if pos.track == prev.number {
				if gone_back { break; }
				lba += 1;
				backward_read = false;
				go_front = true;
				forward = true;
				continue;
			}

			// In the track proper.
			if pos.index != 0 {
				if go_front { break; }
				lba -= 1;
				backward_read = true;
				gone_back = true;
				continue;
			}

			// Index 00.
			let pregap_q = (start - lba) as u32;
			if forward {
				best = pregap_q;
				break;
			}
			if crc_ok || best == 0 || pregap_q.saturating_sub(best) < 10 { best = pregap_q; }
			lba -= 1;
			backward_read = true;
			gone_back = true;
		}

		if best == 0 && ! go_front {
			best = u32::from(CD_LEADIN);
			self.inexact = true;
		}

		// The previous track must keep at least one sector.
		best.min((start - prev.start - 1) as u32)
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		TrackFlags,
		TrackKind,
	};
	use super::super::test_support::{
		MockDrive,
		MockTrack,
	};

	fn disc() -> MockDrive {
		MockDrive::new(
			vec![
				MockTrack::audio(1, 0, 150),
				MockTrack::audio(2, 1000, 75),
				MockTrack::data(3, 1, 3000, 187),
				MockTrack::audio(4, 4000, 2),
				MockTrack::audio(5, 5000, 0),
			],
			&[6000],
		)
	}

	fn tracks() -> Vec<Track> {
		let mut out = vec![
			Track::new(1, 1, TrackKind::Audio, 0, TrackFlags::default()),
			Track::new(2, 1, TrackKind::Audio, 1000, TrackFlags::default()),
			Track::new(3, 1, TrackKind::CdMode1, 3000, TrackFlags::from(4)),
			Track::new(4, 1, TrackKind::Audio, 4000, TrackFlags::default()),
			Track::new(5, 1, TrackKind::Audio, 5000, TrackFlags::default()),
		];
		out[0].pregap = 150;
		out
	}

	fn pregaps(tracks: &[Track]) -> Vec<u32> { tracks.iter().map(|t| t.pregap).collect() }

	#[test]
	fn t_detect_bcd() {
		let mut drive = disc();
		assert_eq!(detect_bcd(&mut drive, Subchannel::Raw), Some(true));
		assert_eq!(detect_bcd(&mut drive, Subchannel::None), None);

		drive.sub = Subchannel::Q16;
		drive.bcd = false;
		assert_eq!(detect_bcd(&mut drive, Subchannel::Q16), Some(false));

		drive.permanent.insert(BCD_PROBE_LBA);
		assert_eq!(detect_bcd(&mut drive, Subchannel::Q16), None);
	}

	#[test]
	fn t_solve_bcd() {
		let mut drive = disc();
		let mut tracks = tracks();
		let mut log = DumpLog::new();
		let report = solve_pregaps(&mut drive, &mut tracks, Subchannel::Raw, false, &mut log);
		assert_eq!(pregaps(&tracks), [150, 75, 187, 2, 0], "Wrong pregaps.");
		assert!(! report.inexact_positioning, "Clean disc reported inexact.");
	}

	#[test]
	fn t_solve_binary() {
		let mut drive = disc();
		drive.sub = Subchannel::Q16;
		drive.bcd = false;
		let mut tracks = tracks();
		let mut log = DumpLog::new();
		let report = solve_pregaps(&mut drive, &mut tracks, Subchannel::Q16, false, &mut log);
		assert_eq!(pregaps(&tracks), [150, 75, 187, 2, 0], "Wrong pregaps.");
		assert!(! report.inexact_positioning);
	}

	#[test]
	fn t_solve_noisy() {
		let mut drive = disc();
		drive.fail_rate = 300;
		drive.corrupt_rate = 100;
		let mut tracks = tracks();
		let mut log = DumpLog::new();
		solve_pregaps(&mut drive, &mut tracks, Subchannel::Raw, false, &mut log);
		for (t, expected) in tracks.iter().zip([150_u32, 75, 187, 2, 0]) {
			assert!(
				t.pregap.abs_diff(expected) <= 1,
				"Track {} pregap {} too far from {expected}.", t.number, t.pregap,
			);
		}
	}

	#[test]
	fn t_skip_same_type() {
		let mut drive = disc();
		let mut tracks = tracks();
		let mut log = DumpLog::new();
		solve_pregaps(&mut drive, &mut tracks, Subchannel::Raw, true, &mut log);
		assert_eq!(pregaps(&tracks), [150, 0, 187, 2, 0], "Same-type tracks should be skipped.");
	}

	#[test]
	fn t_unreadable() {
		let mut drive = disc();
		drive.permanent.extend(800..1000);
		let mut tracks = tracks();
		tracks.truncate(2);
		let mut log = DumpLog::new();
		let report = solve_pregaps(&mut drive, &mut tracks, Subchannel::Raw, false, &mut log);
		assert_eq!(tracks[1].pregap, 150, "Unreadable pregaps should default to 150.");
		assert!(report.inexact_positioning, "Guess not flagged.");
		assert!(log.contains("supposing 150 sectors"), "Guess not logged.");
	}

	#[test]
	fn t_sessions() {
		let mut drive = MockDrive::new(
			vec![
				MockTrack::audio(1, 0, 150),
				MockTrack::data(2, 1, 12_000, 150).in_session(2),
			],
			&[1000, 13_000],
		);
		let mut tracks = vec![
			Track::new(1, 1, TrackKind::Audio, 0, TrackFlags::default()),
			Track::new(2, 2, TrackKind::CdMode1, 12_000, TrackFlags::from(4)),
		];
		let mut log = DumpLog::new();
		solve_pregaps(&mut drive, &mut tracks, Subchannel::Raw, false, &mut log);
		assert_eq!(tracks[1].pregap, 150, "Later sessions start with 150.");

		// No sub-channel, no solving.
		tracks[1].pregap = 0;
		solve_pregaps(&mut drive, &mut tracks, Subchannel::None, false, &mut log);
		assert_eq!(tracks[1].pregap, 0);
		assert!(log.contains("pregaps will not be detected"));
	}
}
