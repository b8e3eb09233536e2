/*!
# Disc Dump: Trim and Retry Passes
*/

use crate::{
	DumpError,
	PassKind,
};
use super::{
	iter::BadIter,
	read::DumpShare,
};



/// # Trim Pass.
///
/// Re-read every bad block once, one at a time. Runs that failed in the main
/// pass often contain only a handful of truly bad sectors.
pub(super) fn trim(share: &mut DumpShare) -> Result<(), DumpError> {
	if share.resume.bad_blocks().is_empty() { return Ok(()); }

	share.log.pass_start("Trim pass");
	let fixed = pass(share, "Trimming", false)?;
	if ! share.killed.killed() { share.resume.record_pass(PassKind::Trim); }
	share.log.line(format!("Trimming recovered {fixed} sector(s)."));
	share.log.pass_end(share.resume.bad_blocks().len());
	share.save()
}

/// # Retry Passes.
///
/// Keep at the remaining bad blocks, alternating direction each time, until
/// they're all gone or the passes run out.
pub(super) fn retry(share: &mut DumpShare) -> Result<(), DumpError> {
	for num in 1..=share.opts.retry_passes() {
		if share.resume.bad_blocks().is_empty() || share.killed.killed() { break; }

		let backwards = num % 2 == 0;
		share.log.pass_start(if backwards { "Retry pass (backward)" } else { "Retry pass (forward)" });
		let title = format!("Retry pass #{num}");
		let fixed = pass(share, &title, backwards)?;
		if ! share.killed.killed() { share.resume.record_pass(PassKind::Retry(num)); }
		share.log.line(format!("Retry pass #{num} recovered {fixed} sector(s)."));
		share.log.pass_end(share.resume.bad_blocks().len());
		share.save()?;
	}
	Ok(())
}

/// # One Pass.
///
/// Returns the number of recovered blocks.
fn pass(share: &mut DumpShare, title: &str, backwards: bool) -> Result<usize, DumpError> {
	let iter = BadIter::new(share.resume.bad_blocks(), backwards);
	let total = iter.len() as u64;
	let mut fixed = 0;

	share.progress.on_init();
	for (idx, lba) in iter.enumerate() {
		if share.killed.killed() { break; }
		share.progress.on_update(&format!("{title}: sector {lba}…"), idx as u64, total);
		if share.reread(lba)? { fixed += 1; }
	}
	share.progress.on_end();

	Ok(fixed)
}
