//! Sequence parsing and sibling ranking
//!
//! Contender nodes are named `<prefix><sequence>` where the sequence is the
//! coordination service's zero-padded signed counter. The counter can wrap
//! negative, so every comparison here is on the parsed signed integer, never on
//! the name.

use crate::error::{CoordinationError, Result};

/// Which end of the ordering to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Min,
    Max,
}

/// Parse the sequence suffix of `name`.
///
/// # Examples
///
/// ```
/// use turnstile_coordination::parse_sequence;
///
/// assert_eq!(parse_sequence("lock-0000000012", "lock-").unwrap(), 12);
/// assert_eq!(parse_sequence("lock--000000001", "lock-").unwrap(), -1);
/// assert_eq!(parse_sequence("lock-+12", "lock-").unwrap(), 12);
/// assert!(parse_sequence("lock-", "lock-").is_err());
/// assert!(parse_sequence("other-1", "lock-").is_err());
/// ```
pub fn parse_sequence(name: &str, prefix: &str) -> Result<i64> {
    let malformed = || CoordinationError::MalformedSequence {
        name: name.to_string(),
        prefix: prefix.to_string(),
    };

    let digits = name.strip_prefix(prefix).ok_or_else(malformed)?;
    digits.parse::<i64>().map_err(|_| malformed())
}

/// Find the minimum or maximum sequence among `names`.
///
/// Returns the sequence and the index of the first name carrying it. Names
/// that do not parse are skipped.
pub fn find_extremum<S: AsRef<str>>(
    names: &[S],
    prefix: &str,
    mode: Extremum,
) -> Result<(i64, usize)> {
    if names.is_empty() {
        return Err(CoordinationError::EmptyInput);
    }

    let mut best: Option<(i64, usize)> = None;
    for (index, name) in names.iter().enumerate() {
        let Ok(sequence) = parse_sequence(name.as_ref(), prefix) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((current, _)) => match mode {
                Extremum::Min => sequence < current,
                Extremum::Max => sequence > current,
            },
        };
        if better {
            best = Some((sequence, index));
        }
    }

    best.ok_or_else(|| CoordinationError::NoValidSequence {
        prefix: prefix.to_string(),
    })
}

pub fn min_sequence<S: AsRef<str>>(names: &[S], prefix: &str) -> Result<(i64, usize)> {
    find_extremum(names, prefix, Extremum::Min)
}

pub fn max_sequence<S: AsRef<str>>(names: &[S], prefix: &str) -> Result<(i64, usize)> {
    find_extremum(names, prefix, Extremum::Max)
}

/// The sibling immediately ahead of `own` in the queue: the greatest sequence
/// strictly lower than `own`. `None` means `own` is at the head.
pub fn predecessor<S: AsRef<str>>(names: &[S], prefix: &str, own: i64) -> Option<(i64, usize)> {
    names
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            parse_sequence(name.as_ref(), prefix)
                .ok()
                .filter(|sequence| *sequence < own)
                .map(|sequence| (sequence, index))
        })
        .fold(None, |best: Option<(i64, usize)>, candidate| match best {
            Some((current, _)) if current >= candidate.0 => best,
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const PREFIX: &str = "/test/seq-";

    fn names(suffixes: &[&str]) -> Vec<String> {
        suffixes.iter().map(|s| format!("{}{}", PREFIX, s)).collect()
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence(&format!("{}1", PREFIX), PREFIX).unwrap(), 1);
        assert_eq!(parse_sequence("lock-0000000007", "lock-").unwrap(), 7);
        assert_eq!(parse_sequence("lock--2147483648", "lock-").unwrap(), -2147483648);
        assert_eq!(parse_sequence("0000000003", "").unwrap(), 3);
        assert_eq!(parse_sequence("lock-+12", "lock-").unwrap(), 12);
    }

    #[test]
    fn test_parse_sequence_rejects_malformed() {
        assert!(matches!(
            parse_sequence(PREFIX, PREFIX),
            Err(CoordinationError::MalformedSequence { .. })
        ));
        assert!(parse_sequence("lock-12a", "lock-").is_err());
        assert!(parse_sequence("lock- 12", "lock-").is_err());
        assert!(parse_sequence("lock-+", "lock-").is_err());
        assert!(parse_sequence("lock-+-1", "lock-").is_err());
        assert!(parse_sequence("candidate-1", "lock-").is_err());
    }

    #[test]
    fn test_find_extremum_empty() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            min_sequence(&empty, PREFIX),
            Err(CoordinationError::EmptyInput)
        ));
        assert!(matches!(
            max_sequence(&empty, PREFIX),
            Err(CoordinationError::EmptyInput)
        ));
    }

    #[test]
    fn test_find_extremum_single() {
        assert_eq!(min_sequence(&names(&["1"]), PREFIX).unwrap(), (1, 0));
        assert_eq!(max_sequence(&names(&["1"]), PREFIX).unwrap(), (1, 0));
    }

    #[test]
    fn test_min_sequence() {
        assert_eq!(min_sequence(&names(&["2", "1", "3"]), PREFIX).unwrap(), (1, 1));
        assert_eq!(
            min_sequence(&names(&["2", "1", "3", "-1"]), PREFIX).unwrap(),
            (-1, 3)
        );
    }

    #[test]
    fn test_max_sequence() {
        assert_eq!(max_sequence(&names(&["4", "1", "3"]), PREFIX).unwrap(), (4, 0));
        assert_eq!(
            max_sequence(&names(&["2", "1", "3", "4"]), PREFIX).unwrap(),
            (4, 3)
        );
    }

    #[test]
    fn test_signed_not_lexical_ordering() {
        // Lexically "lock-0000000010" < "lock-0000000009" is false, "-1" sorts after "0"
        let siblings = ["lock-0000000010", "lock-0000000009", "lock--000000001"];
        assert_eq!(min_sequence(&siblings, "lock-").unwrap(), (-1, 2));
        assert_eq!(max_sequence(&siblings, "lock-").unwrap(), (10, 0));
    }

    #[test]
    fn test_first_occurrence_wins_ties() {
        let siblings = ["lock-5", "lock-0000000005", "lock-7"];
        assert_eq!(min_sequence(&siblings, "lock-").unwrap(), (5, 0));
    }

    #[test]
    fn test_unparsable_names_are_skipped() {
        let siblings = ["readme", "lock-0000000004", "candidate-0000000001"];
        assert_eq!(min_sequence(&siblings, "lock-").unwrap(), (4, 1));

        let foreign = ["readme", "candidate-0000000001"];
        assert!(matches!(
            min_sequence(&foreign, "lock-"),
            Err(CoordinationError::NoValidSequence { .. })
        ));
    }

    #[test]
    fn test_predecessor() {
        let siblings = ["lock-0000000003", "lock-0000000001", "lock-0000000007", "lock-0000000005"];
        assert_eq!(predecessor(&siblings, "lock-", 7), Some((5, 3)));
        assert_eq!(predecessor(&siblings, "lock-", 5), Some((3, 0)));
        assert_eq!(predecessor(&siblings, "lock-", 1), None);
        // own sequence need not be present
        assert_eq!(predecessor(&siblings, "lock-", 4), Some((3, 0)));
    }

    #[test]
    fn test_predecessor_after_out_of_order_removal() {
        // 3 timed out before 5 released: 7 must now watch 1
        let siblings = ["lock-0000000001", "lock-0000000007"];
        assert_eq!(predecessor(&siblings, "lock-", 7), Some((1, 0)));
    }

    proptest! {
        #[test]
        fn prop_parse_recovers_integer(prefix in "[a-z/_-]{0,12}", value in any::<i64>()) {
            let name = format!("{}{}", prefix, value);
            prop_assert_eq!(parse_sequence(&name, &prefix).unwrap(), value);
        }

        #[test]
        fn prop_parse_recovers_zero_padded(value in any::<i32>()) {
            let name = format!("lock-{:010}", value);
            prop_assert_eq!(parse_sequence(&name, "lock-").unwrap(), i64::from(value));
        }

        #[test]
        fn prop_extremum_agrees_with_iterator(values in proptest::collection::vec(any::<i32>(), 1..50)) {
            let siblings: Vec<String> = values.iter().map(|v| format!("lock-{:010}", v)).collect();
            let (min, min_index) = min_sequence(&siblings, "lock-").unwrap();
            let (max, max_index) = max_sequence(&siblings, "lock-").unwrap();

            let expected_min = i64::from(*values.iter().min().unwrap());
            let expected_max = i64::from(*values.iter().max().unwrap());
            prop_assert_eq!(min, expected_min);
            prop_assert_eq!(max, expected_max);
            prop_assert_eq!(min_index, values.iter().position(|v| i64::from(*v) == expected_min).unwrap());
            prop_assert_eq!(max_index, values.iter().position(|v| i64::from(*v) == expected_max).unwrap());
        }
    }
}
