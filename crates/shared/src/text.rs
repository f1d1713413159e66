/// Splits a comma separated capability list. Entries are trimmed; empty
/// entries are kept.
pub fn parse_capabilities(capabilities: &str) -> Vec<String> {
    capabilities
        .split(',')
        .map(|capability| capability.trim().to_string())
        .collect()
}

/// Splits newline separated bullet points without trimming.
pub fn parse_points(points: &str) -> Vec<String> {
    points.split('\n').map(str::to_string).collect()
}

pub fn join_points(points: &[String]) -> String {
    points.join("\n")
}
