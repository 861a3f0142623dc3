// src/services/topics.rs
use regex::Regex;
use std::sync::OnceLock;

/// Short display name from a headline: first five words longer than three characters,
/// punctuation stripped, at most 50 characters.
pub fn extract_trend_from_title(title: &str) -> String {
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();
    let punctuation = PUNCTUATION.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\s]").unwrap());

    let words: Vec<&str> = title
        .split(' ')
        .filter(|w| w.chars().count() > 3)
        .take(5)
        .collect();
    let joined = words.join(" ");
    punctuation.replace_all(&joined, "").chars().take(50).collect()
}

/// `my-cool-repo` -> `My Cool Repo`
pub fn format_repo_name(name: &str) -> String {
    name.split('-')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn categorize_topic(title: &str) -> &'static str {
    static CATEGORIES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let categories = CATEGORIES.get_or_init(|| {
        [
            (r"\b(ai|ml|gpt|llm|neural|model)\b", "AI/ML"),
            (r"\b(crypto|bitcoin|blockchain|web3)\b", "Crypto"),
            (r"\b(startup|founder|vc|funding)\b", "Startups"),
            (r"\b(climate|energy|solar|carbon)\b", "Climate"),
            (r"\b(security|privacy|hack|breach)\b", "Security"),
            (r"\b(react|vue|js|python|rust)\b", "Dev Tools"),
        ]
        .into_iter()
        .map(|(pattern, label)| (Regex::new(pattern).unwrap(), label))
        .collect()
    });

    let lower = title.to_lowercase();
    categories
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, label)| *label)
        .unwrap_or("Technology")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_name_keeps_long_words_only() {
        assert_eq!(
            extract_trend_from_title("Show HN: I built a Rust compiler for tiny GPUs, really!"),
            "Show built Rust compiler tiny"
        );
    }

    #[test]
    fn trend_name_strips_punctuation_and_truncates() {
        let title = "Supercalifragilistic expialidocious antidisestablishmentarianism, pneumonoultramicroscopic";
        let name = extract_trend_from_title(title);
        assert!(name.chars().count() <= 50);
        assert!(!name.contains(','));
    }

    #[test]
    fn repo_names_are_title_cased() {
        assert_eq!(format_repo_name("awesome-llm-apps"), "Awesome Llm Apps");
        assert_eq!(format_repo_name("tokio"), "Tokio");
    }

    #[test]
    fn topics_fall_back_to_technology() {
        assert_eq!(categorize_topic("New LLM beats benchmarks"), "AI/ML");
        assert_eq!(categorize_topic("Why I rewrote it in Rust"), "Dev Tools");
        assert_eq!(categorize_topic("Solar output hits record"), "Climate");
        assert_eq!(categorize_topic("A history of typewriters"), "Technology");
    }
}
