//! Text rendering utilities for human-friendly error messages.
//!
//! Service names are dotted strings (`modules.users`, `db.primary`), so the
//! helpers here treat the last dotted segment as the "short" name.

/// Renders a dependency chain as a readable string.
///
/// # Examples
/// ```
/// use stowage_support::rendering::render_chain;
///
/// let chain = vec!["users", "users.repo", "db", "users"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "users → users.repo → db → users");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Returns the last dotted segment of a service name.
///
/// ```
/// use stowage_support::rendering::short_name;
///
/// assert_eq!(short_name("modules.users.repo"), "repo");
/// assert_eq!(short_name("db"), "db");
/// ```
pub fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Generates "did you mean?" suggestions from the registered names.
///
/// Candidates are scored by substring containment, then by short-name
/// containment, then by common prefix length. Highest score first; ties keep
/// the order of `available`.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = short_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = short_name(name).to_lowercase();

            if name_lower.contains(&requested_lower)
                || requested_lower.contains(&name_lower)
            {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short)
                || requested_short.contains(&name_short)
            {
                return Some((name, 80));
            }

            let common = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
