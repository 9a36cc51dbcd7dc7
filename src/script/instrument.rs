use crate::instrument::ProbeRewriter;
use crate::script::unit::{Op, Unit};
use crate::types::errors::Error;
use crate::types::models::TargetUnit;

/// Rewriter for stack-machine units: assigns a sequential probe id to
/// every instruction and a pair of edge probes to every branch, so the
/// analyzer can map hit counts back to instructions and branch edges.
pub struct ScriptRewriter;

impl ProbeRewriter for ScriptRewriter {
    fn instrument(&self, target: &TargetUnit) -> Result<Vec<u8>, Error> {
        let mut unit = Unit::from_bytes(&target.name, &target.bytes).map_err(|err| {
            Error::Instrumentation {
                name: target.name.clone(),
                reason: err.to_string(),
            }
        })?;

        let mut next_probe = 0u32;
        let mut probe = || {
            let id = next_probe;
            next_probe += 1;
            id
        };

        for method in &mut unit.methods {
            for instr in &mut method.instrs {
                instr.probe = Some(probe());
                if let Op::If {
                    taken_probe,
                    fall_probe,
                    ..
                } = &mut instr.op
                {
                    *taken_probe = Some(probe());
                    *fall_probe = Some(probe());
                }
            }
        }

        unit.to_bytes()
    }
}
