use std::path::Path;

use anyhow::Context;
use pvm_core::api::{RunConfig, VmInput, VmOutput, run_vm_with};
use serde::Deserialize;

/// A conformance fixture: the run input and the expected final state in one
/// JSON object.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub input: VmInput,
    #[serde(flatten)]
    pub expected: VmOutput,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read fixture '{}'", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse fixture '{}'", path.display()))
    }

    /// Run the fixture and list every field that differs from the expectation.
    pub fn check(&self, config: &RunConfig) -> anyhow::Result<Vec<String>> {
        let actual = run_vm_with(&self.input, config)?;
        Ok(mismatches(&self.expected, &actual))
    }
}

pub fn mismatches(expected: &VmOutput, actual: &VmOutput) -> Vec<String> {
    let mut out = Vec::new();
    if expected.status != actual.status {
        out.push(format!("status: expected {:?}, got {:?}", expected.status, actual.status));
    }
    if expected.registers != actual.registers {
        for (idx, (want, got)) in expected.registers.iter().zip(&actual.registers).enumerate() {
            if want != got {
                out.push(format!("r{idx}: expected {want:#x}, got {got:#x}"));
            }
        }
        if expected.registers.len() != actual.registers.len() {
            out.push(format!(
                "registers: expected {} values, got {}",
                expected.registers.len(),
                actual.registers.len()
            ));
        }
    }
    if expected.pc != actual.pc {
        out.push(format!("pc: expected {}, got {}", expected.pc, actual.pc));
    }
    if expected.gas != actual.gas {
        out.push(format!("gas: expected {}, got {}", expected.gas, actual.gas));
    }
    if expected.memory != actual.memory {
        out.push(format!(
            "memory: expected {} chunks, got {} ({:?})",
            expected.memory.len(),
            actual.memory.len(),
            actual.memory.iter().map(|c| (c.address, c.contents.len())).collect::<Vec<_>>()
        ));
    }
    // fixtures without an exit code don't check it
    if expected.exit_code.is_some() && expected.exit_code != actual.exit_code {
        out.push(format!("exit code: expected {:?}, got {:?}", expected.exit_code, actual.exit_code));
    }
    out
}
