use crate::models::Match;

pub const DEFAULT_MIN_KEYWORD_LENGTH: usize = 2;

const STOP_WORDS: [&str; 24] = [
    "what", "which", "who", "where", "when", "how", "the", "is", "are", "was", "were", "a", "an",
    "it", "its", "this", "that", "for", "to", "of", "in", "on", "and", "or",
];

// hyphens survive so part numbers such as `xy-500` stay whole
pub fn extract_keywords(question: &str, min_length: usize) -> Vec<String> {
    let cleaned: String = question
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for token in cleaned.split_whitespace() {
        if token.chars().count() < min_length
            || token.chars().all(|c| c.is_ascii_digit())
            || STOP_WORDS.contains(&token)
        {
            continue;
        }
        if !keywords.iter().any(|existing| existing == token) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

/// Zero-hit matches are dropped; with no hits at all the input comes back unchanged.
pub fn rank_by_keywords(matches: Vec<Match>, question: &str) -> Vec<Match> {
    let keywords = extract_keywords(question, DEFAULT_MIN_KEYWORD_LENGTH);
    if keywords.is_empty() {
        return matches;
    }

    let mut scored: Vec<(usize, usize)> = matches
        .iter()
        .enumerate()
        .map(|(position, candidate)| (position, keyword_hits(&candidate.text, &keywords)))
        .filter(|(_, hits)| *hits > 0)
        .collect();

    if scored.is_empty() {
        return matches;
    }

    // stable: equal hit counts keep their vector order
    scored.sort_by(|left, right| right.1.cmp(&left.1));

    let mut slots: Vec<Option<Match>> = matches.into_iter().map(Some).collect();
    scored
        .into_iter()
        .filter_map(|(position, _)| slots[position].take())
        .collect()
}

fn keyword_hits(text: &str, keywords: &[String]) -> usize {
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .filter(|keyword| lowered.contains(keyword.as_str()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, score: f32) -> Match {
        Match {
            text: text.to_string(),
            file_name: Some("manual.pdf".to_string()),
            page_number: Some(1),
            score,
        }
    }

    #[test]
    fn serial_number_question_keeps_codes_and_drops_stop_words() {
        let keywords = extract_keywords("What is the XY-500 serial number?", 2);
        assert_eq!(keywords, vec!["xy-500", "serial", "number"]);
        for stop in ["what", "is", "the"] {
            assert!(!keywords.iter().any(|keyword| keyword == stop));
        }
    }

    #[test]
    fn numbers_short_tokens_and_duplicates_are_dropped() {
        let keywords = extract_keywords("Pump pump 2024 x, valve: 7 valve", 2);
        assert_eq!(keywords, vec!["pump", "valve"]);
    }

    #[test]
    fn no_keywords_returns_input_unchanged() {
        let matches = vec![candidate("A", 0.3), candidate("B", 0.2)];
        let ranked = rank_by_keywords(matches.clone(), "What is it?");
        assert_eq!(ranked, matches);
    }

    #[test]
    fn no_hits_fails_open() {
        let matches = vec![candidate("alpha", 0.3), candidate("beta", 0.2)];
        let ranked = rank_by_keywords(matches.clone(), "turbine torque");
        assert_eq!(ranked, matches);
    }

    #[test]
    fn higher_hit_counts_come_first_and_zero_hits_are_dropped() {
        let matches = vec![
            candidate("the serial plate", 0.40),
            candidate("XY-500 serial number location", 0.35),
            candidate("warranty terms", 0.30),
        ];
        let ranked = rank_by_keywords(matches, "What is the XY-500 serial number?");

        let texts: Vec<_> = ranked.iter().map(|found| found.text.as_str()).collect();
        assert_eq!(texts, vec!["XY-500 serial number location", "the serial plate"]);
        assert!((ranked[0].score - 0.35).abs() < f32::EPSILON);
    }

    #[test]
    fn equal_hit_counts_keep_input_order() {
        let matches = vec![
            candidate("serial on the left", 0.2),
            candidate("nothing here", 0.19),
            candidate("serial on the right", 0.1),
        ];
        let ranked = rank_by_keywords(matches, "serial");
        let texts: Vec<_> = ranked.iter().map(|found| found.text.as_str()).collect();
        assert_eq!(texts, vec!["serial on the left", "serial on the right"]);
    }
}
