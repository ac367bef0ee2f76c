//! Line-level source diffing.
//!
//! Candidates carry a unified diff against the source they patch; the
//! evaluator only needs its changed-line count, which [`changed_lines`]
//! reads back from the diff text.

/// One aligned step between two line sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    Equal { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

/// Number of unchanged lines shown around each hunk.
const CONTEXT: usize = 3;

/// Compute the Longest Common Subsequence (LCS) of two line sequences.
///
/// Returns a list of (index_a, index_b) pairs indicating matching positions.
fn lcs_alignment(a: &[&str], b: &[&str]) -> Vec<(usize, usize)> {
    let m = a.len();
    let n = b.len();

    if m == 0 || n == 0 {
        return Vec::new();
    }

    // dp[i][j] = length of LCS of a[i..] and b[j..]
    let mut dp = vec![vec![0u32; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            dp[i][j] = if a[i] == b[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }

    let mut alignment = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if a[i] == b[j] {
            alignment.push((i, j));
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    alignment
}

/// Align two line sequences into an edit script.
pub fn line_ops(old: &[&str], new: &[&str]) -> Vec<LineOp> {
    // Common prefix and suffix never need the quadratic table.
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut ops: Vec<LineOp> = (0..prefix)
        .map(|i| LineOp::Equal { old: i, new: i })
        .collect();

    let (mut i, mut j) = (0, 0);
    for (ai, bj) in lcs_alignment(old_mid, new_mid) {
        while i < ai {
            ops.push(LineOp::Delete { old: prefix + i });
            i += 1;
        }
        while j < bj {
            ops.push(LineOp::Insert { new: prefix + j });
            j += 1;
        }
        ops.push(LineOp::Equal {
            old: prefix + ai,
            new: prefix + bj,
        });
        i += 1;
        j += 1;
    }
    while i < old_mid.len() {
        ops.push(LineOp::Delete { old: prefix + i });
        i += 1;
    }
    while j < new_mid.len() {
        ops.push(LineOp::Insert { new: prefix + j });
        j += 1;
    }

    let old_tail = old.len() - suffix;
    let new_tail = new.len() - suffix;
    ops.extend((0..suffix).map(|k| LineOp::Equal {
        old: old_tail + k,
        new: new_tail + k,
    }));
    ops
}

/// Render a unified diff of `old` → `new`. Empty when they are identical.
pub fn unified_diff(old: &str, new: &str, label: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let ops = line_ops(&old_lines, &new_lines);

    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, LineOp::Equal { .. }))
        .map(|(idx, _)| idx)
        .collect();
    if changes.is_empty() {
        return String::new();
    }

    // Group change positions whose context windows overlap.
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &idx in &changes {
        let start = idx.saturating_sub(CONTEXT);
        let end = (idx + CONTEXT + 1).min(ops.len());
        match hunks.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => hunks.push((start, end)),
        }
    }

    let mut out = format!("--- a/{label}\n+++ b/{label}\n");
    for (start, end) in hunks {
        let slice = &ops[start..end];
        let old_start = first_old_line(&ops, start);
        let new_start = first_new_line(&ops, start);
        let old_len = slice
            .iter()
            .filter(|op| !matches!(op, LineOp::Insert { .. }))
            .count();
        let new_len = slice
            .iter()
            .filter(|op| !matches!(op, LineOp::Delete { .. }))
            .count();

        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk_start(old_start, old_len),
            old_len,
            hunk_start(new_start, new_len),
            new_len
        ));
        for op in slice {
            match *op {
                LineOp::Equal { old, .. } => {
                    out.push(' ');
                    out.push_str(old_lines[old]);
                }
                LineOp::Delete { old } => {
                    out.push('-');
                    out.push_str(old_lines[old]);
                }
                LineOp::Insert { new } => {
                    out.push('+');
                    out.push_str(new_lines[new]);
                }
            }
            out.push('\n');
        }
    }
    out
}

// Unified diff convention: a zero-length range starts at the line before it.
fn hunk_start(first: usize, len: usize) -> usize {
    if len == 0 {
        first
    } else {
        first + 1
    }
}

fn first_old_line(ops: &[LineOp], from: usize) -> usize {
    ops[from..]
        .iter()
        .find_map(|op| match op {
            LineOp::Equal { old, .. } | LineOp::Delete { old } => Some(*old),
            LineOp::Insert { .. } => None,
        })
        .unwrap_or_else(|| count_old(&ops[..from]))
}

fn first_new_line(ops: &[LineOp], from: usize) -> usize {
    ops[from..]
        .iter()
        .find_map(|op| match op {
            LineOp::Equal { new, .. } | LineOp::Insert { new } => Some(*new),
            LineOp::Delete { .. } => None,
        })
        .unwrap_or_else(|| ops[..from].iter().filter(|op| !matches!(op, LineOp::Delete { .. })).count())
}

fn count_old(ops: &[LineOp]) -> usize {
    ops.iter()
        .filter(|op| !matches!(op, LineOp::Insert { .. }))
        .count()
}

/// Count `+`/`-` lines of a unified diff, excluding the file headers.
pub fn changed_lines(diff: &str) -> usize {
    diff.lines()
        .filter(|line| {
            (line.starts_with('+') && !line.starts_with("+++"))
                || (line.starts_with('-') && !line.starts_with("---"))
        })
        .count()
}
