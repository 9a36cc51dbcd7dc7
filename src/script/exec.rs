use crate::loader::UnitResolver;
use crate::runner::TestDriver;
use crate::script::unit::{MethodBody, Op, Unit};
use crate::session::SessionHandle;
use crate::types::models::{TestResult, TestStatus};

const STEP_LIMIT: u64 = 1_000_000;
const DEPTH_LIMIT: usize = 64;

/// Interpreter driving stack-machine test units. Every method whose name
/// starts with `test` is executed; assertion failures and thrown errors
/// become failed results, never panics or pipeline errors. `call` targets
/// resolve through the isolated loader, so instrumented definitions are
/// the ones that run.
pub struct ScriptDriver {
    session: SessionHandle,
}

impl ScriptDriver {
    pub fn new(session: SessionHandle) -> Self {
        ScriptDriver { session }
    }

    fn exec_method(
        &self,
        unit: &Unit,
        method: &MethodBody,
        resolver: &dyn UnitResolver,
        stack: &mut Vec<i64>,
        steps: &mut u64,
        depth: usize,
    ) -> Result<(), String> {
        if depth >= DEPTH_LIMIT {
            return Err(format!("call depth limit exceeded in {}", unit.name));
        }

        let mut pc = 0usize;
        while let Some(instr) = method.instrs.get(pc) {
            *steps += 1;
            if *steps > STEP_LIMIT {
                return Err(format!("step limit exceeded in {}", unit.name));
            }
            if let Some(probe) = instr.probe {
                self.session.record(&unit.name, probe);
            }

            let underflow = || format!("stack underflow at line {} of {}", instr.line, unit.name);
            let pop = |stack: &mut Vec<i64>| stack.pop().ok_or_else(|| underflow());

            match &instr.op {
                Op::Push(value) => stack.push(*value),
                Op::Add => {
                    let b = pop(stack)?;
                    let a = pop(stack)?;
                    stack.push(a.wrapping_add(b));
                }
                Op::Sub => {
                    let b = pop(stack)?;
                    let a = pop(stack)?;
                    stack.push(a.wrapping_sub(b));
                }
                Op::Eq => {
                    let b = pop(stack)?;
                    let a = pop(stack)?;
                    stack.push(i64::from(a == b));
                }
                Op::Lt => {
                    let b = pop(stack)?;
                    let a = pop(stack)?;
                    stack.push(i64::from(a < b));
                }
                Op::If {
                    target,
                    taken_probe,
                    fall_probe,
                } => {
                    let condition = pop(stack)?;
                    let (edge, next) = if condition != 0 {
                        (taken_probe, *target)
                    } else {
                        (fall_probe, pc + 1)
                    };
                    if let Some(probe) = edge {
                        self.session.record(&unit.name, *probe);
                    }
                    pc = next;
                    continue;
                }
                Op::Goto { target } => {
                    pc = *target;
                    continue;
                }
                Op::Call {
                    unit: callee_name,
                    method: callee_method,
                } => {
                    let bytes = resolver
                        .resolve(callee_name)
                        .map_err(|err| format!("line {}: {err}", instr.line))?;
                    let callee = Unit::from_bytes(callee_name, &bytes)
                        .map_err(|err| format!("line {}: {err}", instr.line))?;
                    let body = callee.method(callee_method).ok_or_else(|| {
                        format!("line {}: no method '{callee_method}' in {callee_name}",
                            instr.line)
                    })?;
                    // the callee shares the operand stack: arguments stay
                    // where the caller pushed them
                    self.exec_method(&callee, body, resolver, stack, steps, depth + 1)?;
                }
                Op::Ret => return Ok(()),
                Op::Assert => {
                    let condition = pop(stack)?;
                    if condition == 0 {
                        return Err(format!(
                            "assertion failed at line {} of {}",
                            instr.line, unit.name
                        ));
                    }
                }
                Op::Throw(message) => {
                    return Err(format!("{message} (line {} of {})", instr.line, unit.name));
                }
                Op::Nop => {}
            }
            pc += 1;
        }
        Ok(())
    }
}

impl TestDriver for ScriptDriver {
    fn run(&self, name: &str, bytes: &[u8], resolver: &dyn UnitResolver) -> TestResult {
        let unit = match Unit::from_bytes(name, bytes) {
            Ok(unit) => unit,
            Err(err) => {
                return TestResult {
                    name: name.to_string(),
                    status: TestStatus::Failed(err.to_string()),
                };
            }
        };

        // run every test method even after a failure, so later methods
        // still contribute coverage; the unit reports its first failure
        let mut first_failure = None;
        for method in &unit.methods {
            if !method.name.starts_with("test") {
                continue;
            }
            let mut stack = Vec::new();
            let mut steps = 0u64;
            if let Err(reason) =
                self.exec_method(&unit, method, resolver, &mut stack, &mut steps, 0)
            {
                let failure = format!("{}: {reason}", method.name);
                first_failure.get_or_insert(failure);
            }
        }

        TestResult {
            name: name.to_string(),
            status: match first_failure {
                Some(reason) => TestStatus::Failed(reason),
                None => TestStatus::Passed,
            },
        }
    }
}
