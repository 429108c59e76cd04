//! Minimal edit scripts between two ordered sequences.
//!
//! The script is built from a longest common subsequence of `old` and `new`:
//! every matched pair is left untouched and each gap between consecutive
//! matches becomes exactly one [`SpliceInstruction`]. Untouched elements
//! keep their identity on the receiving side, which matters when they are
//! references to live objects.
//!
//! Ties between equally long subsequences are broken by preferring to drop
//! an element of `old` before inserting one from `new`.

use std::iter;

use super::splice::SpliceInstruction;

/// Produces the splices turning `old` into `new`, ordered by `start`.
///
/// Returns an empty list if and only if the sequences are equal.
pub fn diff<T: PartialEq + Clone>(old: &[T], new: &[T]) -> Vec<SpliceInstruction<T>> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_middle = &old[prefix..old.len() - suffix];
    let new_middle = &new[prefix..new.len() - suffix];

    let matches = common_subsequence(old_middle, new_middle);

    let mut edits = Vec::new();
    let mut old_cursor = 0;
    let mut new_cursor = 0;
    for (old_index, new_index) in matches
        .into_iter()
        .chain(iter::once((old_middle.len(), new_middle.len())))
    {
        if old_index > old_cursor || new_index > new_cursor {
            edits.push(SpliceInstruction::new(
                prefix + old_cursor,
                old_index - old_cursor,
                new_middle[new_cursor..new_index].to_vec(),
            ));
        }
        old_cursor = old_index + 1;
        new_cursor = new_index + 1;
    }

    edits
}

/// Matched index pairs of one longest common subsequence, ascending
fn common_subsequence<T: PartialEq>(old: &[T], new: &[T]) -> Vec<(usize, usize)> {
    if old.is_empty() || new.is_empty() {
        return Vec::new();
    }

    let rows = old.len() + 1;
    let columns = new.len() + 1;

    // lengths[i * columns + j] = LCS length of old[i..] and new[j..]
    let mut lengths = vec![0u32; rows * columns];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            lengths[i * columns + j] = if old[i] == new[j] {
                lengths[(i + 1) * columns + j + 1] + 1
            } else {
                lengths[(i + 1) * columns + j].max(lengths[i * columns + j + 1])
            };
        }
    }

    let mut matches = Vec::with_capacity(lengths[0] as usize);
    let mut i = 0;
    let mut j = 0;
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            matches.push((i, j));
            i += 1;
            j += 1;
        } else if lengths[(i + 1) * columns + j] >= lengths[i * columns + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }

    matches
}
