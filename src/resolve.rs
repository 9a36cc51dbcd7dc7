use wildmatch::WildMatch;

// Patterns either name a unit in full ("t.CalcTest", possibly with
// wildcards) or just its simple name after the last dot ("CalcTest").
fn is_qualified(pattern: &str) -> bool {
    pattern.contains('.')
}

fn simple_name(unit: &str) -> &str {
    unit.rsplit('.').next().unwrap_or(unit)
}

/// Resolves wildcard patterns against the compiled test unit names.
/// Returns the selected names (sorted, deduplicated) and the patterns that
/// matched nothing.
pub fn resolve_unit_patterns(
    available_units: &[String],
    patterns: &[String],
) -> (Vec<String>, Vec<String>) {
    let mut selected_units = Vec::new();
    let mut invalid_patterns = Vec::new();

    for pattern in patterns {
        let matches = if is_qualified(pattern) {
            match_by_full_name(available_units, pattern)
        } else {
            match_by_simple_name(available_units, pattern)
        };

        if matches.is_empty() {
            invalid_patterns.push(pattern.clone());
        } else {
            selected_units.extend(matches);
        }
    }

    selected_units.sort();
    selected_units.dedup();

    (selected_units, invalid_patterns)
}

fn match_by_full_name(available_units: &[String], pattern: &str) -> Vec<String> {
    let wildcard = WildMatch::new(pattern);
    available_units
        .iter()
        .filter(|unit| wildcard.matches(unit))
        .cloned()
        .collect()
}

fn match_by_simple_name(available_units: &[String], pattern: &str) -> Vec<String> {
    let wildcard = WildMatch::new(pattern);
    available_units
        .iter()
        .filter(|unit| wildcard.matches(simple_name(unit)))
        .cloned()
        .collect()
}
