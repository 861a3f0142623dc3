// src/bin/classify_url.rs
use std::env;

use trend_pulse::services::registry::UrlClassifier;

fn main() {
    let urls: Vec<String> = env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("usage: classify_url <url>...");
        std::process::exit(2);
    }

    let classifier = UrlClassifier::new();
    for url in urls {
        let (kind, item_id) = classifier.classify(url.trim());
        println!("{:<11} {:<40} {}", kind.as_str(), item_id, url);
    }
}
