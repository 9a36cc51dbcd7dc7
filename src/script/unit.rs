use crate::types::errors::Error;
use serde::{Deserialize, Serialize};

/// One binary unit of the stack-machine format: the JSON encoding of this
/// structure is what the toolchain emits and the artifact stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub methods: Vec<MethodBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodBody {
    pub name: String,
    pub instrs: Vec<Instr>,
}

/// One instruction: source line, opcode, and the probe id the rewriter
/// assigned (None in uninstrumented units).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instr {
    pub line: u32,
    pub op: Op,
    pub probe: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Op {
    Push(i64),
    Add,
    Sub,
    Eq,
    Lt,
    If {
        target: usize,
        taken_probe: Option<u32>,
        fall_probe: Option<u32>,
    },
    Goto {
        target: usize,
    },
    Call {
        unit: String,
        method: String,
    },
    Ret,
    Assert,
    Throw(String),
    Nop,
}

impl Unit {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Unit, Error> {
        serde_json::from_slice(bytes).map_err(|err| Error::MalformedUnit {
            name: name.to_string(),
            reason: err.to_string(),
        })
    }

    pub fn method(&self, name: &str) -> Option<&MethodBody> {
        self.methods.iter().find(|method| method.name == name)
    }
}
