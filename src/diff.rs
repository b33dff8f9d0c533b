//! Line-level unified diff between an expectation and captured output.

use std::fmt::Write;

/// Lines of unchanged context around each change.
pub const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Largest LCS table built; bigger changed regions are shown as one
/// delete block followed by one insert block.
pub const MAX_TABLE_CELLS: usize = 1 << 22;

/// Edit script turning `old` into `new`.
///
/// The common prefix and suffix are matched directly; only the changed
/// middle goes through the longest-common-subsequence table.
fn edit_script<T: PartialEq>(old: &[T], new: &[T]) -> Vec<Op> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mut ops = Vec::with_capacity(old.len() + new.len() - prefix - suffix);
    ops.extend((0..prefix).map(|i| Op::Equal(i, i)));
    middle_script(
        &old[prefix..old.len() - suffix],
        &new[prefix..new.len() - suffix],
        prefix,
        &mut ops,
    );
    let (old_tail, new_tail) = (old.len() - suffix, new.len() - suffix);
    ops.extend((0..suffix).map(|k| Op::Equal(old_tail + k, new_tail + k)));
    ops
}

/// LCS edit script of the changed region, indices shifted by `offset`.
fn middle_script<T: PartialEq>(old: &[T], new: &[T], offset: usize, ops: &mut Vec<Op>) {
    let (n, m) = (old.len(), new.len());
    if (n + 1).saturating_mul(m + 1) > MAX_TABLE_CELLS {
        ops.extend((0..n).map(|i| Op::Delete(offset + i)));
        ops.extend((0..m).map(|j| Op::Insert(offset + j)));
        return;
    }

    // lcs[i * (m + 1) + j] = LCS length of old[i..] and new[j..]
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(Op::Equal(offset + i, offset + j));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(Op::Delete(offset + i));
            i += 1;
        } else {
            ops.push(Op::Insert(offset + j));
            j += 1;
        }
    }
    ops.extend((i..n).map(|i| Op::Delete(offset + i)));
    ops.extend((j..m).map(|j| Op::Insert(offset + j)));
}

/// Group changes into hunks of op indices, `context` lines around each.
fn hunks(ops: &[Op], context: usize) -> Vec<std::ops::Range<usize>> {
    let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();
    for (idx, op) in ops.iter().enumerate() {
        if matches!(op, Op::Equal(..)) {
            continue;
        }
        let start = idx.saturating_sub(context);
        let end = (idx + context + 1).min(ops.len());
        match ranges.last_mut() {
            Some(last) if start <= last.end => last.end = last.end.max(end),
            _ => ranges.push(start..end),
        }
    }
    ranges
}

fn header_range(start: usize, len: usize) -> String {
    // Empty ranges point at the line before the hunk.
    let first = if len == 0 { start } else { start + 1 };
    format!("{},{}", first, len)
}

fn push_line(out: &mut String, prefix: char, line: &str) {
    out.push(prefix);
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push('\n');
    }
}

/// Unified diff from `expected` to `actual`, empty when they are equal.
pub fn unified_diff(expected: &[String], actual: &[String], from: &str, to: &str) -> String {
    let ops = edit_script(expected, actual);
    let ranges = hunks(&ops, CONTEXT);
    if ranges.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- {}", from);
    let _ = writeln!(out, "+++ {}", to);

    for range in ranges {
        let slice = &ops[range];
        let old_start = slice
            .iter()
            .find_map(|op| match op {
                Op::Equal(i, _) | Op::Delete(i) => Some(*i),
                Op::Insert(_) => None,
            })
            // Only an empty side yields a hunk without lines on that side.
            .unwrap_or(0);
        let new_start = slice
            .iter()
            .find_map(|op| match op {
                Op::Equal(_, j) | Op::Insert(j) => Some(*j),
                Op::Delete(_) => None,
            })
            .unwrap_or(0);
        let old_len = slice.iter().filter(|op| !matches!(op, Op::Insert(_))).count();
        let new_len = slice.iter().filter(|op| !matches!(op, Op::Delete(_))).count();

        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            header_range(old_start, old_len),
            header_range(new_start, new_len)
        );

        for op in slice {
            match *op {
                Op::Equal(i, _) => push_line(&mut out, ' ', &expected[i]),
                Op::Delete(i) => push_line(&mut out, '-', &expected[i]),
                Op::Insert(j) => push_line(&mut out, '+', &actual[j]),
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| format!("{}\n", s)).collect()
    }

    #[test]
    fn test_equal_inputs_give_empty_diff() {
        let a = lines(&["x", "y"]);
        assert_eq!(unified_diff(&a, &a, "a", "b"), "");
    }

    #[test]
    fn test_single_line_change() {
        let expected = lines(&["1", "2", "3"]);
        let actual = lines(&["1", "two", "3"]);
        let diff = unified_diff(&expected, &actual, "case.expect", "case (actual)");
        assert_eq!(
            diff,
            "--- case.expect\n+++ case (actual)\n@@ -1,3 +1,3 @@\n 1\n-2\n+two\n 3\n"
        );
    }

    #[test]
    fn test_context_is_trimmed() {
        let expected = lines(&["a", "b", "c", "d", "e", "f", "g", "h", "i"]);
        let mut actual = expected.clone();
        actual[8] = "I\n".to_string();
        let diff = unified_diff(&expected, &actual, "x", "y");
        assert_eq!(diff, "--- x\n+++ y\n@@ -6,4 +6,4 @@\n f\n g\n h\n-i\n+I\n");
    }

    #[test]
    fn test_separate_hunks() {
        let expected: Vec<String> = (0..20).map(|i| format!("{}\n", i)).collect();
        let mut actual = expected.clone();
        actual[1] = "one\n".to_string();
        actual[18] = "eighteen\n".to_string();
        let diff = unified_diff(&expected, &actual, "x", "y");
        assert_eq!(diff.matches("@@ -").count(), 2);
    }

    #[test]
    fn test_missing_output_against_expectation() {
        let expected = lines(&["only"]);
        let diff = unified_diff(&expected, &[], "x", "y");
        assert_eq!(diff, "--- x\n+++ y\n@@ -1,1 +0,0 @@\n-only\n");
    }

    #[test]
    fn test_output_without_expectation_lines() {
        let actual = lines(&["new"]);
        let diff = unified_diff(&[], &actual, "x", "y");
        assert_eq!(diff, "--- x\n+++ y\n@@ -0,0 +1,1 @@\n+new\n");
    }

    #[test]
    fn test_missing_trailing_newline_is_terminated() {
        let expected = vec!["end".to_string()];
        let actual = lines(&["end"]);
        let diff = unified_diff(&expected, &actual, "x", "y");
        assert_eq!(diff, "--- x\n+++ y\n@@ -1,1 +1,1 @@\n-end\n+end\n");
    }

    #[test]
    fn test_large_mostly_equal_inputs() {
        let expected: Vec<String> = (0..50_000).map(|i| format!("{}\n", i)).collect();
        let mut actual = expected.clone();
        actual[25_000] = "changed\n".to_string();

        let diff = unified_diff(&expected, &actual, "x", "y");
        assert_eq!(
            diff,
            "--- x\n+++ y\n@@ -24998,7 +24998,7 @@\n 24997\n 24998\n 24999\n-25000\n+changed\n 25001\n 25002\n 25003\n"
        );
    }

    #[test]
    fn test_oversized_change_becomes_block() {
        let expected: Vec<String> = (0..3_000).map(|i| format!("old {}\n", i)).collect();
        let actual: Vec<String> = (0..3_000).map(|i| format!("new {}\n", i)).collect();

        let diff = unified_diff(&expected, &actual, "x", "y");
        let body: Vec<&str> = diff.lines().skip(3).collect();
        assert_eq!(body.len(), 6_000);
        assert!(body[..3_000].iter().all(|l| l.starts_with("-old")));
        assert!(body[3_000..].iter().all(|l| l.starts_with("+new")));
        assert!(diff.contains("@@ -1,3000 +1,3000 @@\n"));
    }
}
