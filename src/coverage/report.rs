use crate::types::models::{AnalysisLevel, Counter, CoverageNode};
use std::fmt::Write;

/// Counter kinds included in one coverage block, in print order.
fn included_counters(level: &str, node: &CoverageNode) -> Vec<(&'static str, Counter)> {
    let mut counters = vec![
        ("instructions", node.instructions),
        ("branches", node.branches),
        ("lines", node.lines),
        ("complexity", node.complexity),
    ];
    if level != "method" {
        counters.push(("methods", node.methods));
        if level == "package" {
            counters.push(("classes", node.classes));
        }
    }
    counters
}

/// Mean of covered/total over counters with a nonzero total, as a
/// percentage. Zero-total counters contribute to neither numerator nor
/// denominator.
pub fn aggregate_percentage(counters: &[Counter]) -> f64 {
    let mut ratio = 0.0;
    let mut count = 0u32;
    for counter in counters {
        if let Some(fraction) = counter.ratio() {
            ratio += fraction;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        ratio / f64::from(count) * 100.0
    }
}

fn coverage_block(level: &str, node: &CoverageNode, with_percentage: bool) -> String {
    let counters = included_counters(level, node);
    let mut block = format!("Coverage of {level} {}:\n", node.name);
    for (unit, counter) in &counters {
        let _ = writeln!(
            block,
            "{} of {} {unit} covered",
            counter.covered, counter.total
        );
    }
    if with_percentage {
        let values: Vec<Counter> = counters.iter().map(|(_, counter)| *counter).collect();
        let _ = writeln!(
            block,
            "Total coverage: {:.2}%",
            aggregate_percentage(&values)
        );
    }
    block
}

fn class_block(node: &CoverageNode) -> String {
    let mut text = coverage_block("class", node, true);
    for method in &node.children {
        text.push('\n');
        text.push_str(&coverage_block("method", method, false));
    }
    text
}

/// Renders the selected coverage nodes into the fixed text layout for the
/// requested level.
pub fn render(level: &AnalysisLevel, nodes: &[CoverageNode]) -> String {
    match level {
        AnalysisLevel::Method { class, method } => {
            if nodes.is_empty() {
                format!("No method named '{method}' found in class {class}\n")
            } else {
                nodes
                    .iter()
                    .map(|node| coverage_block("method", node, false))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        AnalysisLevel::Class(_) => nodes
            .iter()
            .map(class_block)
            .collect::<Vec<_>>()
            .join("\n"),
        AnalysisLevel::Package(_) => {
            let mut sections = Vec::new();
            for package in nodes {
                sections.push(coverage_block("package", package, true));
                for class in &package.children {
                    sections.push(class_block(class));
                }
            }
            sections.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_total_counters_are_excluded_from_the_percentage() {
        let counters = [Counter::new(3, 4), Counter::new(0, 0), Counter::new(5, 5)];
        let percentage = aggregate_percentage(&counters);
        assert_eq!(format!("{percentage:.2}"), "87.50");
    }

    #[test]
    fn all_zero_totals_yield_zero_percent() {
        assert_eq!(aggregate_percentage(&[Counter::new(0, 0)]), 0.0);
    }

    fn sample_class() -> CoverageNode {
        CoverageNode::class(
            "a.B",
            vec![CoverageNode::method(
                "foo",
                Counter::new(3, 4),
                Counter::new(0, 0),
                Counter::new(5, 5),
                Counter::new(1, 1),
            )],
        )
    }

    #[test]
    fn method_block_prints_four_counters_without_percentage() {
        let class = sample_class();
        let text = render(
            &AnalysisLevel::Method {
                class: "a.B".to_string(),
                method: "foo".to_string(),
            },
            std::slice::from_ref(class.find_method("foo").unwrap()),
        );
        assert!(text.starts_with("Coverage of method foo:\n"));
        assert!(text.contains("3 of 4 instructions covered\n"));
        assert!(text.contains("0 of 0 branches covered\n"));
        assert!(!text.contains("methods covered"));
        assert!(!text.contains("Total coverage"));
    }

    #[test]
    fn class_block_appends_method_breakdown_and_percentage() {
        let text = render(&AnalysisLevel::Class("a.B".to_string()), &[sample_class()]);
        assert!(text.starts_with("Coverage of class a.B:\n"));
        assert!(text.contains("1 of 1 methods covered\n"));
        assert!(text.contains("Total coverage:"));
        assert!(text.contains("Coverage of method foo:\n"));
    }

    #[test]
    fn missing_method_renders_an_absent_result() {
        let text = render(
            &AnalysisLevel::Method {
                class: "a.B".to_string(),
                method: "nope".to_string(),
            },
            &[],
        );
        assert!(text.contains("No method named 'nope'"));
    }

    #[test]
    fn package_block_includes_class_counter() {
        let package = CoverageNode::package("a", vec![sample_class()]);
        let text = render(&AnalysisLevel::Package("a".to_string()), &[package]);
        assert!(text.starts_with("Coverage of package a:\n"));
        assert!(text.contains("1 of 1 classes covered\n"));
        assert!(text.contains("Coverage of class a.B:\n"));
    }
}
