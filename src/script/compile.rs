use crate::compile::Toolchain;
use crate::script::unit::{Instr, MethodBody, Op, Unit};
use crate::types::errors::Error;
use crate::types::models::CompilationUnit;
use std::collections::HashMap;

/// Toolchain for the line-oriented stack-machine source format.
///
/// A source file holds one or more `unit <fqcn>` blocks, each containing
/// `method <name>` blocks of instructions. `:label` lines mark jump
/// targets, `#` starts a comment.
pub struct ScriptToolchain;

impl Toolchain for ScriptToolchain {
    fn compile(&self, source: &str) -> Result<Vec<CompilationUnit>, Error> {
        let units = parse_units(source)?;
        let mut compiled = Vec::with_capacity(units.len());
        for unit in units {
            let bytes = unit.to_bytes()?;
            compiled.push(CompilationUnit {
                name: unit.name,
                bytes,
            });
        }
        Ok(compiled)
    }
}

// Branch targets may be forward references, so instructions are collected
// raw per method and resolved against the label table at method end.
enum RawOp {
    Resolved(Op),
    If(String),
    Goto(String),
}

struct RawMethod {
    name: String,
    instrs: Vec<(u32, RawOp)>,
    labels: HashMap<String, usize>,
}

impl RawMethod {
    fn finish(self) -> Result<MethodBody, Error> {
        let RawMethod {
            name,
            instrs: raw_instrs,
            labels,
        } = self;
        let resolve = |label: &str, line: u32| {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| Error::Compile(format!("line {line}: unknown label '{label}'")))
        };

        let mut instrs = Vec::with_capacity(raw_instrs.len());
        for (line, raw) in raw_instrs {
            let op = match raw {
                RawOp::Resolved(op) => op,
                RawOp::If(label) => Op::If {
                    target: resolve(&label, line)?,
                    taken_probe: None,
                    fall_probe: None,
                },
                RawOp::Goto(label) => Op::Goto {
                    target: resolve(&label, line)?,
                },
            };
            instrs.push(Instr {
                line,
                op,
                probe: None,
            });
        }
        Ok(MethodBody { name, instrs })
    }
}

fn parse_units(source: &str) -> Result<Vec<Unit>, Error> {
    let mut units: Vec<Unit> = Vec::new();
    let mut current_unit: Option<(String, Vec<RawMethod>)> = None;
    let mut current_method: Option<RawMethod> = None;

    let finish_method =
        |unit: &mut Option<(String, Vec<RawMethod>)>, method: Option<RawMethod>| match (
            unit, method,
        ) {
            (Some((_, methods)), Some(raw)) => {
                methods.push(raw);
                Ok(())
            }
            (None, Some(raw)) => Err(Error::Compile(format!(
                "method '{}' declared outside a unit",
                raw.name
            ))),
            (_, None) => Ok(()),
        };

    for (index, raw_line) in source.lines().enumerate() {
        let line_no = (index + 1) as u32;
        let line = match raw_line.split_once('#') {
            Some((code, _comment)) => code.trim(),
            None => raw_line.trim(),
        };
        if line.is_empty() {
            continue;
        }

        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();
        let err = |reason: &str| Error::Compile(format!("line {line_no}: {reason}"));

        match head {
            "unit" => {
                let name = words.next().ok_or_else(|| err("missing unit name"))?;
                finish_method(&mut current_unit, current_method.take())?;
                if let Some((name, methods)) = current_unit.take() {
                    units.push(build_unit(name, methods)?);
                }
                current_unit = Some((name.to_string(), Vec::new()));
            }
            "method" => {
                let name = words.next().ok_or_else(|| err("missing method name"))?;
                finish_method(&mut current_unit, current_method.take())?;
                if current_unit.is_none() {
                    return Err(err(&format!("method '{name}' declared outside a unit")));
                }
                current_method = Some(RawMethod {
                    name: name.to_string(),
                    instrs: Vec::new(),
                    labels: HashMap::new(),
                });
            }
            label if label.starts_with(':') => {
                let method = current_method
                    .as_mut()
                    .ok_or_else(|| err("label outside a method"))?;
                let at = method.instrs.len();
                method.labels.insert(label[1..].to_string(), at);
            }
            opcode => {
                let method = current_method
                    .as_mut()
                    .ok_or_else(|| err("instruction outside a method"))?;
                let raw = parse_op(opcode, &mut words, line_no)?;
                if words.next().is_some() {
                    return Err(err("trailing operand"));
                }
                method.instrs.push((line_no, raw));
            }
        }
    }

    finish_method(&mut current_unit, current_method.take())?;
    if let Some((name, methods)) = current_unit.take() {
        units.push(build_unit(name, methods)?);
    }
    Ok(units)
}

fn build_unit(name: String, methods: Vec<RawMethod>) -> Result<Unit, Error> {
    let methods = methods
        .into_iter()
        .map(RawMethod::finish)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Unit { name, methods })
}

fn parse_op<'a>(
    opcode: &str,
    words: &mut impl Iterator<Item = &'a str>,
    line_no: u32,
) -> Result<RawOp, Error> {
    let err = |reason: String| Error::Compile(format!("line {line_no}: {reason}"));
    let mut operand = |what: &str| {
        words
            .next()
            .map(str::to_string)
            .ok_or_else(|| err(format!("'{opcode}' needs a {what} operand")))
    };

    let raw = match opcode {
        "push" => {
            let value = operand("numeric")?;
            let value = value
                .parse::<i64>()
                .map_err(|_| err(format!("invalid operand '{value}' for 'push'")))?;
            RawOp::Resolved(Op::Push(value))
        }
        "add" => RawOp::Resolved(Op::Add),
        "sub" => RawOp::Resolved(Op::Sub),
        "eq" => RawOp::Resolved(Op::Eq),
        "lt" => RawOp::Resolved(Op::Lt),
        "if" => RawOp::If(operand("label")?),
        "goto" => RawOp::Goto(operand("label")?),
        "call" => {
            let unit = operand("unit")?;
            let method = operand("method")?;
            RawOp::Resolved(Op::Call { unit, method })
        }
        "ret" => RawOp::Resolved(Op::Ret),
        "assert" => RawOp::Resolved(Op::Assert),
        "throw" => {
            let mut message = String::new();
            for word in words.by_ref() {
                if !message.is_empty() {
                    message.push(' ');
                }
                message.push_str(word);
            }
            RawOp::Resolved(Op::Throw(message))
        }
        "nop" => RawOp::Resolved(Op::Nop),
        unknown => return Err(err(format!("unknown opcode '{unknown}'"))),
    };
    Ok(raw)
}
