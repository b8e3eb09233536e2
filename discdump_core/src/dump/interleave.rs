/*!
# Disc Dump: Block Shuffling

READ CD hands back each sector with its sub-channel glued to the end. Offset
correction needs the main channel as one continuous stream, so blocks are
pulled apart, the stream is shifted, and everything is glued back together.
*/



/// # Split Blocks.
///
/// Return the main channel and sub-channel halves of `count` blocks.
pub(super) fn deinterleave(buf: &[u8], count: u32, sector: u32, sub: u32) -> (Vec<u8>, Vec<u8>) {
	let count = count as usize;
	let sector = sector as usize;
	let sub = sub as usize;

	let mut main = Vec::with_capacity(count * sector);
	let mut subs = Vec::with_capacity(count * sub);
	for block in buf.chunks_exact(sector + sub).take(count) {
		main.extend_from_slice(&block[..sector]);
		subs.extend_from_slice(&block[sector..]);
	}
	(main, subs)
}

/// # Join Blocks.
///
/// The inverse of [`deinterleave`].
pub(super) fn reinterleave(main: &[u8], subs: &[u8], count: u32, sector: u32, sub: u32) -> Vec<u8> {
	let count = count as usize;
	let sector = sector as usize;
	let sub = sub as usize;

	let mut out = Vec::with_capacity(count * (sector + sub));
	for idx in 0..count {
		out.extend_from_slice(&main[idx * sector..(idx + 1) * sector]);
		if sub != 0 { out.extend_from_slice(&subs[idx * sub..(idx + 1) * sub]); }
	}
	out
}

#[allow(clippy::cast_sign_loss)]
/// # Fix Offset.
///
/// `buf` holds `count` blocks read with `pad` extra sectors: after the
/// wanted range for positive offsets, before it for negative ones. This
/// returns exactly `count - pad` blocks with the main channel shifted by
/// `offset` bytes. Sub-channel is never shifted; each wanted block keeps its
/// own.
///
/// Returns `None` if the buffer is too short or the padding doesn't cover
/// the shift.
pub(super) fn fix_offset(buf: &[u8], count: u32, sector: u32, sub: u32, offset: i32, pad: u32)
-> Option<Vec<u8>> {
	let wanted = count.checked_sub(pad)?;
	if buf.len() < (count as usize) * (sector + sub) as usize { return None; }
	if offset == 0 { return Some(buf[..(wanted * (sector + sub)) as usize].to_vec()); }

	let (main, subs) = deinterleave(buf, count, sector, sub);
	let fix =
		if offset < 0 { i64::from(sector) * i64::from(pad) + i64::from(offset) }
		else { i64::from(offset) };
	let fix = usize::try_from(fix).ok()?;
	let len = (wanted * sector) as usize;
	let main = main.get(fix..fix + len)?;

	let sub_start = if offset < 0 { (pad * sub) as usize } else { 0 };
	let subs = subs.get(sub_start..sub_start + (wanted * sub) as usize)?;

	Some(reinterleave(main, subs, wanted, sector, sub))
}
