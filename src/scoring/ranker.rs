//! Ranking — threshold filter and descending sort.

use std::cmp::Reverse;

use crate::scoring::types::{ResultSet, ScoredThread};

/// Keep results scoring at least `min_score`, highest first.
///
/// Equal scores keep their input (fetch) order. The input is left untouched
/// and no upper bound is applied to the output.
pub fn rank(scored: &[ScoredThread], min_score: i32) -> ResultSet {
    let mut kept: Vec<(usize, &ScoredThread)> = scored
        .iter()
        .enumerate()
        .filter(|(_, result)| i32::from(result.score) >= min_score)
        .collect();

    kept.sort_by_key(|(position, result)| (Reverse(result.score), *position));

    ResultSet::from_ranked(kept.into_iter().map(|(_, result)| result.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, score: u8) -> ScoredThread {
        ScoredThread {
            id: id.into(),
            sender_name: "Sender".into(),
            sender_email: "sender@example.com".into(),
            subject: "Subject".into(),
            last_message: String::new(),
            days_ago: 0,
            message_count: 1,
            is_read: false,
            score,
            reasons: Vec::new(),
        }
    }

    #[test]
    fn filters_and_sorts_descending() {
        let input = vec![scored("a", 10), scored("b", 25), scored("c", 85), scored("d", 20)];
        let ranked = rank(&input, 20);
        assert_eq!(ranked.scores(), vec![85, 25, 20]);
        assert!(ranked.iter().all(|r| r.id != "a"));
    }

    #[test]
    fn threshold_is_inclusive() {
        let ranked = rank(&[scored("a", 20)], 20);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn ties_keep_fetch_order() {
        let input = vec![
            scored("first", 50),
            scored("top", 90),
            scored("second", 50),
            scored("third", 50),
        ];
        let ranked = rank(&input, 0);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn input_is_not_mutated() {
        let input = vec![scored("a", 10), scored("b", 90)];
        let before = input.clone();
        let _ = rank(&input, 50);
        assert_eq!(input, before);
    }

    #[test]
    fn no_output_cap() {
        let input: Vec<ScoredThread> = (0..500).map(|i| scored(&format!("t-{i}"), 60)).collect();
        assert_eq!(rank(&input, 20).len(), 500);
    }

    #[test]
    fn empty_input_gives_empty_result() {
        assert!(rank(&[], 20).is_empty());
    }
}
