//! Partition-then-concatenate execution over rayon.
//!
//! A slice is cut into contiguous ranges, each range is processed on the rayon
//! pool, and the per-range outputs are concatenated in range order. Output
//! order therefore matches input order regardless of scheduling.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Split `[0, len)` into `parts` contiguous ranges as `(start, end)`.
///
/// `parts` is clamped to `[1, len]` and the remainder is spread over the first
/// ranges, so sizes differ by at most one. Ranges are non-empty and cover the
/// whole domain; an empty domain yields no ranges.
#[must_use]
pub fn split_ranges(len: usize, parts: usize) -> Vec<(usize, usize)> {
    if len == 0 {
        return Vec::new();
    }
    let parts = parts.clamp(1, len);
    let base = len / parts;
    let rem = len % parts;

    let mut out = Vec::with_capacity(parts);
    let mut start = 0usize;
    for idx in 0..parts {
        let end = start + base + usize::from(idx < rem);
        out.push((start, end));
        start = end;
    }
    out
}

/// Apply `f` to `parts` contiguous partitions of `items` in parallel and
/// concatenate the results in partition order.
///
/// The first error (in partition order) is returned.
pub fn par_map_concat<T, O, E, F>(items: &[T], parts: usize, f: F) -> Result<Vec<O>, E>
where
    T: Sync,
    O: Send,
    E: Send,
    F: Fn(&[T]) -> Result<Vec<O>, E> + Sync,
{
    let outputs: Vec<Result<Vec<O>, E>> = split_ranges(items.len(), parts)
        .into_par_iter()
        .map(|(start, end)| f(&items[start..end]))
        .collect();

    let mut out = Vec::with_capacity(items.len());
    for part in outputs {
        out.extend(part?);
    }
    Ok(out)
}
