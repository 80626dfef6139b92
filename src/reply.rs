//! Post-processing of completion replies

use std::sync::OnceLock;

use regex::Regex;

fn fenced_block() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"(?s)```(?:[a-zA-Z0-9_+#-]+)?\s*(.*?)\s*```").expect("fenced block regex")
    })
}

/// Split a reply into prose and the first fenced code block.
///
/// Every fenced block is removed from the prose; only the first one is
/// returned as code. Replies without a block come back as `(reply, "")`.
pub fn split_text_and_code(reply: &str) -> (String, String) {
    let re = fenced_block();
    match re.captures(reply) {
        Some(caps) => {
            let code = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string();
            let text = re.replace_all(reply, "").into_owned();
            (text, code)
        }
        None => (reply.to_string(), String::new()),
    }
}

/// Languages listed after a `languages:` line, one per line.
///
/// Bullet markers (`-`, `*`) are stripped; blank lines are skipped.
pub fn extract_languages(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.eq_ignore_ascii_case("languages:"))
        .skip(1)
        .map(|line| line.trim_start_matches(['-', '*']).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
