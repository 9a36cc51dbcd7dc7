use crate::types::errors::Error;
use serde::Serialize;

/// One binary unit produced by compiling a source file: fully-qualified
/// name plus raw byte content. Immutable once produced.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A unit selected for instrumentation and analysis, with the raw bytes
/// fetched from the artifact. Lives only for one pipeline run.
#[derive(Debug, Clone)]
pub struct TargetUnit {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Requested output granularity, parsed from a selector string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AnalysisLevel {
    Package(String),
    Class(String),
    Method { class: String, method: String },
}

impl AnalysisLevel {
    /// Parses a selector of one of the three shapes:
    /// `PACKAGE(pkg=a.b)`, `CLASS(klass=a.B)`, `METHOD(klass=a.B, method=foo)`.
    pub fn parse(selector: &str) -> Result<Self, Error> {
        let malformed = || Error::InvalidSelector(selector.to_string());

        let trimmed = selector.trim();
        let (tag, rest) = trimmed.split_once('(').ok_or_else(malformed)?;
        let inner = rest.strip_suffix(')').ok_or_else(malformed)?;

        match tag {
            "PACKAGE" => {
                let pkg = inner.strip_prefix("pkg=").ok_or_else(malformed)?;
                if pkg.is_empty() || pkg.contains(", ") {
                    return Err(malformed());
                }
                Ok(AnalysisLevel::Package(pkg.to_string()))
            }
            "CLASS" => {
                let klass = inner.strip_prefix("klass=").ok_or_else(malformed)?;
                if klass.is_empty() || klass.contains(", ") {
                    return Err(malformed());
                }
                Ok(AnalysisLevel::Class(klass.to_string()))
            }
            "METHOD" => {
                let (first, second) = inner.split_once(", ").ok_or_else(malformed)?;
                let klass = first.strip_prefix("klass=").ok_or_else(malformed)?;
                let method = second.strip_prefix("method=").ok_or_else(malformed)?;
                if klass.is_empty() || method.is_empty() {
                    return Err(malformed());
                }
                Ok(AnalysisLevel::Method {
                    class: klass.to_string(),
                    method: method.to_string(),
                })
            }
            _ => Err(malformed()),
        }
    }
}

/// A (covered, total) pair for one counter kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counter {
    pub covered: u32,
    pub total: u32,
}

impl Counter {
    pub fn new(covered: u32, total: u32) -> Self {
        debug_assert!(covered <= total);
        Counter { covered, total }
    }

    pub fn add(&mut self, other: Counter) {
        self.covered += other.covered;
        self.total += other.total;
    }

    /// covered/total, or None when the counter has no coverable units
    pub fn ratio(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(f64::from(self.covered) / f64::from(self.total))
        }
    }
}

/// Coverage of one structural element (method, class or package).
///
/// Class nodes hold their method nodes as children and package nodes hold
/// their class nodes; instructions/branches/lines/complexity sum over the
/// children, while the `methods` and `classes` counters are member counts
/// tracked independently of that summation.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageNode {
    pub name: String,
    pub instructions: Counter,
    pub branches: Counter,
    pub lines: Counter,
    pub complexity: Counter,
    pub methods: Counter,
    pub classes: Counter,
    pub children: Vec<CoverageNode>,
}

impl CoverageNode {
    pub fn method(
        name: &str,
        instructions: Counter,
        branches: Counter,
        lines: Counter,
        complexity: Counter,
    ) -> Self {
        CoverageNode {
            name: name.to_string(),
            instructions,
            branches,
            lines,
            complexity,
            methods: Counter::default(),
            classes: Counter::default(),
            children: Vec::new(),
        }
    }

    /// Builds a class node by aggregating its method nodes.
    pub fn class(name: &str, methods: Vec<CoverageNode>) -> Self {
        let mut node = CoverageNode {
            name: name.to_string(),
            instructions: Counter::default(),
            branches: Counter::default(),
            lines: Counter::default(),
            complexity: Counter::default(),
            methods: Counter::default(),
            classes: Counter::default(),
            children: Vec::new(),
        };
        let mut covered_methods = 0;
        for method in &methods {
            node.instructions.add(method.instructions);
            node.branches.add(method.branches);
            node.lines.add(method.lines);
            node.complexity.add(method.complexity);
            if method.instructions.covered > 0 {
                covered_methods += 1;
            }
        }
        node.methods = Counter::new(covered_methods, methods.len() as u32);
        node.classes = Counter::new(u32::from(covered_methods > 0), 1);
        node.children = methods;
        node
    }

    /// Builds a package node by aggregating its class nodes.
    pub fn package(name: &str, classes: Vec<CoverageNode>) -> Self {
        let mut node = CoverageNode {
            name: name.to_string(),
            instructions: Counter::default(),
            branches: Counter::default(),
            lines: Counter::default(),
            complexity: Counter::default(),
            methods: Counter::default(),
            classes: Counter::default(),
            children: Vec::new(),
        };
        for class in &classes {
            node.instructions.add(class.instructions);
            node.branches.add(class.branches);
            node.lines.add(class.lines);
            node.complexity.add(class.complexity);
            node.methods.add(class.methods);
            node.classes.add(class.classes);
        }
        node.children = classes;
        node
    }

    /// Looks up a method child of a class node by name.
    pub fn find_method(&self, method: &str) -> Option<&CoverageNode> {
        self.children.iter().find(|child| child.name == method)
    }
}

/// Outcome of driving one test unit: failures are expected signal, never
/// pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TestStatus {
    Passed,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
}

/// Per-test results collected over one execution phase.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub results: Vec<TestResult>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == TestStatus::Passed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PACKAGE(pkg=a.b)", AnalysisLevel::Package("a.b".into()))]
    #[case("CLASS(klass=a.B)", AnalysisLevel::Class("a.B".into()))]
    #[case(
        "METHOD(klass=a.B, method=foo)",
        AnalysisLevel::Method { class: "a.B".into(), method: "foo".into() }
    )]
    fn selector_parses(#[case] selector: &str, #[case] expected: AnalysisLevel) {
        assert_eq!(AnalysisLevel::parse(selector).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("CLASS(a.B)")]
    #[case("METHOD(klass=a.B)")]
    #[case("METHOD(klass=a.B, foo)")]
    #[case("PACKAGE(pkg=)")]
    #[case("MODULE(name=a.B)")]
    #[case("CLASS(klass=a.B")]
    fn malformed_selector_is_rejected(#[case] selector: &str) {
        assert!(matches!(
            AnalysisLevel::parse(selector),
            Err(Error::InvalidSelector(_))
        ));
    }

    #[test]
    fn class_node_sums_method_counters() {
        let methods = vec![
            CoverageNode::method(
                "foo",
                Counter::new(3, 4),
                Counter::new(1, 2),
                Counter::new(2, 3),
                Counter::new(1, 2),
            ),
            CoverageNode::method(
                "bar",
                Counter::new(0, 5),
                Counter::new(0, 0),
                Counter::new(0, 4),
                Counter::new(0, 1),
            ),
        ];
        let class = CoverageNode::class("a.B", methods);

        assert_eq!(class.instructions, Counter::new(3, 9));
        assert_eq!(class.branches, Counter::new(1, 2));
        assert_eq!(class.lines, Counter::new(2, 7));
        assert_eq!(class.methods, Counter::new(1, 2));
        assert_eq!(class.classes, Counter::new(1, 1));
    }

    #[test]
    fn package_node_sums_class_counters() {
        let class_a = CoverageNode::class(
            "a.A",
            vec![CoverageNode::method(
                "foo",
                Counter::new(2, 2),
                Counter::new(0, 0),
                Counter::new(1, 1),
                Counter::new(1, 1),
            )],
        );
        let class_b = CoverageNode::class(
            "a.B",
            vec![CoverageNode::method(
                "bar",
                Counter::new(0, 3),
                Counter::new(0, 2),
                Counter::new(0, 2),
                Counter::new(0, 2),
            )],
        );
        let package = CoverageNode::package("a", vec![class_a, class_b]);

        assert_eq!(package.instructions, Counter::new(2, 5));
        assert_eq!(package.methods, Counter::new(1, 2));
        assert_eq!(package.classes, Counter::new(1, 2));
    }
}
