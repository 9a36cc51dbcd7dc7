use crate::coverage::analysis::CoverageAnalyzer;
use crate::script::unit::{MethodBody, Op, Unit};
use crate::session::ExecutionData;
use crate::types::errors::Error;
use crate::types::models::{Counter, CoverageNode};
use std::collections::BTreeMap;

/// Static analyzer for instrumented stack-machine units: maps collected
/// probe hits back onto instructions, branch edges, source lines and
/// methods, producing one class node per unit.
pub struct ScriptAnalyzer;

impl CoverageAnalyzer for ScriptAnalyzer {
    fn analyze(&self, name: &str, bytes: &[u8], data: &ExecutionData) -> Result<CoverageNode, Error> {
        let unit = Unit::from_bytes(name, bytes)?;
        let methods = unit
            .methods
            .iter()
            .map(|method| analyze_method(&unit.name, method, data))
            .collect();
        Ok(CoverageNode::class(&unit.name, methods))
    }
}

fn analyze_method(unit_name: &str, method: &MethodBody, data: &ExecutionData) -> CoverageNode {
    let hit = |probe: Option<u32>| {
        probe
            .map(|probe| data.probe_hits(unit_name, probe) > 0)
            .unwrap_or(false)
    };

    let mut covered_instrs = 0u32;
    let mut total_branches = 0u32;
    let mut covered_branches = 0u32;
    let mut fully_covered_decisions = 0u32;
    let mut decisions = 0u32;
    // line number -> any instruction on it covered
    let mut lines: BTreeMap<u32, bool> = BTreeMap::new();

    for instr in &method.instrs {
        let instr_hit = hit(instr.probe);
        if instr_hit {
            covered_instrs += 1;
        }
        let line = lines.entry(instr.line).or_insert(false);
        *line |= instr_hit;

        if let Op::If {
            taken_probe,
            fall_probe,
            ..
        } = &instr.op
        {
            decisions += 1;
            total_branches += 2;
            let taken = hit(*taken_probe);
            let fallen = hit(*fall_probe);
            covered_branches += u32::from(taken) + u32::from(fallen);
            if taken && fallen {
                fully_covered_decisions += 1;
            }
        }
    }

    let entered = method
        .instrs
        .first()
        .map(|instr| hit(instr.probe))
        .unwrap_or(false);

    let total_instrs = method.instrs.len() as u32;
    let covered_lines = lines.values().filter(|covered| **covered).count() as u32;
    let total_lines = lines.len() as u32;

    // cyclomatic complexity: one path plus one per decision; an executed
    // path counts as covered once entered, plus one per decision whose
    // both edges were exercised
    let total_complexity = decisions + 1;
    let covered_complexity = if entered {
        1 + fully_covered_decisions
    } else {
        0
    };

    CoverageNode::method(
        &method.name,
        Counter::new(covered_instrs, total_instrs),
        Counter::new(covered_branches, total_branches),
        Counter::new(covered_lines, total_lines),
        Counter::new(covered_complexity, total_complexity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Toolchain;
    use crate::instrument::ProbeRewriter;
    use crate::loader::UnitResolver;
    use crate::runner::TestDriver;
    use crate::script::compile::ScriptToolchain;
    use crate::script::exec::ScriptDriver;
    use crate::script::instrument::ScriptRewriter;
    use crate::session::SessionHandle;

    struct SelfResolver(Vec<u8>);

    impl UnitResolver for SelfResolver {
        fn resolve(&self, _name: &str) -> Result<Vec<u8>, Error> {
            Ok(self.0.clone())
        }
    }

    const TARGET: &str = "\
unit demo.Calc

method clampLow
  push 5
  lt
  if low
  push 0
  ret
:low
  push 1
  ret
";

    fn instrumented_target() -> Vec<u8> {
        let compiled = ScriptToolchain.compile(TARGET).unwrap();
        let target = crate::types::models::TargetUnit {
            name: "demo.Calc".to_string(),
            bytes: compiled[0].bytes.clone(),
        };
        ScriptRewriter.instrument(&target).unwrap()
    }

    fn run_tests(test_source: &str, target_bytes: &[u8]) -> ExecutionData {
        let session = SessionHandle::new();
        session.start().unwrap();
        let driver = ScriptDriver::new(session.clone());
        let tests = ScriptToolchain.compile(test_source).unwrap();
        let resolver = SelfResolver(target_bytes.to_vec());
        for test in &tests {
            let result = driver.run(&test.name, &test.bytes, &resolver);
            assert_eq!(result.status, crate::types::models::TestStatus::Passed);
        }
        session.stop_and_collect().unwrap()
    }

    #[test]
    fn one_exercised_branch_shows_half_branch_coverage() {
        let target = instrumented_target();
        let data = run_tests(
            "unit t.T\nmethod testLow\n  push 3\n  call demo.Calc clampLow\n  push 1\n  eq\n  assert\n  ret\n",
            &target,
        );

        let node = ScriptAnalyzer.analyze("demo.Calc", &target, &data).unwrap();
        let method = node.find_method("clampLow").unwrap();
        assert_eq!(method.branches, Counter::new(1, 2));
        assert!(method.instructions.covered < method.instructions.total);
    }

    #[test]
    fn both_branches_exercised_shows_full_branch_coverage() {
        let target = instrumented_target();
        let data = run_tests(
            "unit t.T\n\
             method testLow\n  push 3\n  call demo.Calc clampLow\n  push 1\n  eq\n  assert\n  ret\n\
             method testHigh\n  push 7\n  call demo.Calc clampLow\n  push 0\n  eq\n  assert\n  ret\n",
            &target,
        );

        let node = ScriptAnalyzer.analyze("demo.Calc", &target, &data).unwrap();
        let method = node.find_method("clampLow").unwrap();
        assert_eq!(method.branches, Counter::new(2, 2));
        assert_eq!(method.instructions.covered, method.instructions.total);
        assert_eq!(method.complexity, Counter::new(2, 2));
    }

    #[test]
    fn unexecuted_unit_reports_zero_covered() {
        let target = instrumented_target();
        let data = ExecutionData::default();
        let node = ScriptAnalyzer.analyze("demo.Calc", &target, &data).unwrap();

        assert_eq!(node.instructions.covered, 0);
        assert!(node.instructions.total > 0);
        assert_eq!(node.methods, Counter::new(0, 1));
    }
}
