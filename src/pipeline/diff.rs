// src/pipeline/diff.rs

/// Approximate number of changed lines between two texts.
///
/// Common leading and trailing lines are ignored; of what remains the larger
/// side is the count. Texts that differ only in line endings count as one.
#[must_use]
pub fn changed_lines(before: &str, after: &str) -> usize {
    if before == after {
        return 0;
    }
    let a: Vec<&str> = before.lines().collect();
    let b: Vec<&str> = after.lines().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let removed = a.len() - prefix - suffix;
    let added = b.len() - prefix - suffix;
    removed.max(added).max(1)
}
