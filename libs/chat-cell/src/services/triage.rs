use crate::models::{Severity, TriageResult};

const HIGH_KEYWORDS: &[&str] = &[
    "chest pain",
    "difficulty breathing",
    "severe headache",
    "high fever",
    "blood",
    "unconscious",
    "emergency",
    "can't breathe",
    "heart attack",
    "stroke",
    "severe pain",
    "bleeding",
    "suicide",
    "overdose",
    "poisoning",
    "severe allergic reaction",
    "anaphylaxis",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "fever",
    "persistent cough",
    "vomiting",
    "dizziness",
    "infection",
    "migraine",
    "anxiety",
    "depression",
    "rash",
    "swelling",
    "nausea",
    "fatigue",
    "insomnia",
    "back pain",
    "joint pain",
];

const LOW_KEYWORDS: &[&str] = &[
    "mild headache",
    "runny nose",
    "slight cough",
    "minor fatigue",
    "sore throat",
    "minor pain",
    "cold",
    "sneezing",
    "minor cut",
    "bruise",
    "muscle soreness",
];

/// Lists in priority order; the first list with a hit decides.
const KEYWORD_LISTS: [(Severity, &[&str]); 3] = [
    (Severity::High, HIGH_KEYWORDS),
    (Severity::Medium, MEDIUM_KEYWORDS),
    (Severity::Low, LOW_KEYWORDS),
];

/// Keyword triage of a free-text symptom description.
///
/// Case-insensitive substring matching; a message with no known keyword is
/// `Low`. Pure and deterministic.
pub fn classify(message: &str) -> TriageResult {
    let lower = message.to_lowercase();

    let hit = KEYWORD_LISTS.iter().find_map(|(severity, keywords)| {
        keywords
            .iter()
            .find(|keyword| lower.contains(*keyword))
            .map(|keyword| (*severity, keyword.to_string()))
    });

    let (severity, matched_keyword) = match hit {
        Some((severity, keyword)) => (severity, Some(keyword)),
        None => (Severity::Low, None),
    };

    TriageResult {
        severity,
        appointment_needed: severity != Severity::Low,
        matched_keyword,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_high_beats_low_in_same_message() {
        let result = classify("I have chest pain and a mild headache");
        assert_eq!(result.severity, Severity::High);
        assert!(result.appointment_needed);
        assert_eq!(result.matched_keyword.as_deref(), Some("chest pain"));
    }

    #[test]
    fn test_medium_keywords() {
        let result = classify("Three days of VOMITING and dizziness");
        assert_eq!(result.severity, Severity::Medium);
        assert!(result.appointment_needed);
    }

    #[test]
    fn test_low_keywords_do_not_need_appointment() {
        let result = classify("Just a runny nose and some sneezing");
        assert_eq!(result.severity, Severity::Low);
        assert!(!result.appointment_needed);
        assert_eq!(result.matched_keyword.as_deref(), Some("runny nose"));
    }

    #[test]
    fn test_unknown_text_is_low() {
        let result = classify("hello, what are your opening hours?");
        assert_eq!(result.severity, Severity::Low);
        assert_eq!(result.matched_keyword, None);
        assert!(!result.appointment_needed);
    }

    #[test]
    fn test_severe_pain_is_high() {
        assert_eq!(classify("severe pain in my leg").severity, Severity::High);
    }

    #[test]
    fn test_keyword_lists_are_disjoint() {
        let mut seen = HashSet::new();
        for (_, keywords) in KEYWORD_LISTS {
            for keyword in keywords {
                assert!(seen.insert(*keyword), "{} appears in more than one list", keyword);
            }
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let message = "persistent cough with fever";
        assert_eq!(classify(message), classify(message));
    }
}
