//! Word-count penalty rule for the task agent.
//!
//! Pure computation: the output is a natural-language instruction passed to
//! the scoring call, not a score adjustment applied here.

/// Count of whitespace-delimited tokens in the essay.
pub fn word_count(essay: &str) -> usize {
    essay.split_whitespace().count()
}

/// Build the word-count penalty instruction for an essay against its
/// minimum requirement (150 for Task 1, 250 for Task 2).
///
/// Tiers, scaled by the minimum M:
/// - `count >= M`: no penalty.
/// - `M-10 <= count < M`: reduce by 0.5 band.
/// - `M-50 <= count < M-10`: reduce by 1+ bands depending on impact.
/// - `count < M-50`: cap the score at band 5.
pub fn penalty_note(min_words: u32, essay: &str) -> String {
    let count = word_count(essay);
    let minimum = min_words as usize;

    let general = format!(
        "The minimum words required for this task is: {minimum}. \
         This essay actually has {count} words: "
    );

    let penalty = if count >= minimum {
        "no word count penalty applies."
    } else if count + 10 >= minimum {
        "REDUCE the Task Achievement Band score by 0.5"
    } else if count + 50 >= minimum {
        "REDUCE the Task Achievement Band score by 1 band or more depending on Task Achievement impact."
    } else {
        "The Task Achievement Band score should *not exceed Band score 5* for Task Achievement"
    };

    general + penalty
}

#[cfg(test)]
mod tests {
    use super::*;

    fn essay_of(words: usize) -> String {
        vec!["word"; words].join(" ")
    }

    #[test]
    fn counts_whitespace_delimited_tokens() {
        assert_eq!(word_count("one two\tthree\nfour"), 4);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn tiers_for_150_word_minimum() {
        assert!(penalty_note(150, &essay_of(150)).ends_with("no word count penalty applies."));
        assert!(penalty_note(150, &essay_of(200)).ends_with("no word count penalty applies."));
        // 140-149: half band.
        assert!(penalty_note(150, &essay_of(149)).ends_with("by 0.5"));
        assert!(penalty_note(150, &essay_of(140)).ends_with("by 0.5"));
        // 100-139: one band or more.
        assert!(penalty_note(150, &essay_of(139)).contains("1 band or more"));
        assert!(penalty_note(150, &essay_of(100)).contains("1 band or more"));
        // below 100: capped at band 5.
        assert!(penalty_note(150, &essay_of(99)).contains("not exceed Band score 5"));
        assert!(penalty_note(150, &essay_of(10)).contains("not exceed Band score 5"));
    }

    #[test]
    fn tiers_for_250_word_minimum() {
        assert!(penalty_note(250, &essay_of(250)).ends_with("no word count penalty applies."));
        assert!(penalty_note(250, &essay_of(249)).ends_with("by 0.5"));
        assert!(penalty_note(250, &essay_of(240)).ends_with("by 0.5"));
        assert!(penalty_note(250, &essay_of(239)).contains("1 band or more"));
        assert!(penalty_note(250, &essay_of(200)).contains("1 band or more"));
        assert!(penalty_note(250, &essay_of(199)).contains("not exceed Band score 5"));
    }

    #[test]
    fn note_reports_requirement_and_actual_count() {
        let note = penalty_note(250, &essay_of(42));
        assert!(note.contains("required for this task is: 250"));
        assert!(note.contains("actually has 42 words"));
    }
}
