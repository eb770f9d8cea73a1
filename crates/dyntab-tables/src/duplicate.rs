/// First pair of indices `(i, j)`, `i < j`, whose items compare equal.
///
/// Pairwise, so quadratic in the number of items.
pub fn find_duplicate<T>(items: &[T], eq: impl Fn(&T, &T) -> bool) -> Option<(usize, usize)> {
    for (i, a) in items.iter().enumerate() {
        for (j, b) in items.iter().enumerate().skip(i + 1) {
            if eq(a, b) {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_duplicates() {
        assert_eq!(find_duplicate(&[1, 2, 3], |a, b| a == b), None);
        assert_eq!(find_duplicate::<u32>(&[], |a, b| a == b), None);
    }

    #[test]
    fn first_pair_is_reported() {
        assert_eq!(find_duplicate(&[5, 1, 7, 1, 5], |a, b| a == b), Some((0, 4)));
        assert_eq!(find_duplicate(&[1, 2, 2], |a, b| a == b), Some((1, 2)));
    }

    #[test]
    fn compares_by_field() {
        let items = [(1, "a"), (2, "b"), (3, "a")];
        assert_eq!(find_duplicate(&items, |x, y| x.1 == y.1), Some((0, 2)));
    }
}
