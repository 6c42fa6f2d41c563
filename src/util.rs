//! Small shared helpers

use crate::error::{Error, Result};
use std::fmt::Debug;

/// Reduce a collection to its single distinct value.
///
/// Used wherever a computation expects exactly one value across a collection
/// (camera, shutter speed, frame count) and anything else signals bad input.
pub fn single_value<T, I>(values: I, what: &str) -> Result<T>
where
    T: PartialEq + Debug,
    I: IntoIterator<Item = T>,
{
    let mut distinct: Vec<T> = Vec::new();
    for value in values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    if distinct.len() == 1 {
        Ok(distinct.remove(0))
    } else {
        Err(Error::SingleValueExpected {
            what: what.to_string(),
            found: distinct.iter().map(|v| format!("{v:?}")).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_returns_the_only_distinct_value() {
        assert_eq!(single_value([3, 3, 3], "count").unwrap(), 3);
        assert_eq!(single_value(["a"], "name").unwrap(), "a");
    }

    #[test]
    fn test_single_value_rejects_empty_and_mixed_input() {
        assert!(matches!(
            single_value(Vec::<i32>::new(), "count"),
            Err(Error::SingleValueExpected { .. })
        ));
        assert!(matches!(
            single_value([1, 2], "count"),
            Err(Error::SingleValueExpected { .. })
        ));
    }
}
