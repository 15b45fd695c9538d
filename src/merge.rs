//! Two-source ordered merge
//!
//! Merges two already-ordered entry ranges on their composite ids with a
//! two-pointer walk. Timestamps compare first, sequences break ties; on a
//! full tie the left entry wins and **both** pointers advance, silently
//! suppressing the right-hand duplicate. Whatever remains of either side is
//! flushed in order.

use std::cmp::Ordering;

use crate::types::Entry;

/// Merge two id-ordered entry lists into one id-ordered list
pub fn merge_entries(left: Vec<Entry>, right: Vec<Entry>) -> Vec<Entry> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left_iter = left.into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();

    loop {
        let ordering = match (left_iter.peek(), right_iter.peek()) {
            (Some(l), Some(r)) => l.id.cmp(&r.id),
            _ => break,
        };
        match ordering {
            Ordering::Less => out.extend(left_iter.next()),
            Ordering::Greater => out.extend(right_iter.next()),
            Ordering::Equal => {
                // duplicate id: keep the left entry, drop the right
                out.extend(left_iter.next());
                right_iter.next();
            }
        }
    }

    out.extend(left_iter);
    out.extend(right_iter);
    out
}
