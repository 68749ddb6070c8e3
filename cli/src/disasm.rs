use std::fmt::Write;

use pvm_core::program::Program;
use pvm_core::program::spi::SpiProgram;

/// One line per instruction: `<offset>: <NAME>(<opcode>) <args...>`.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    for inst in program.instructions() {
        let _ = write!(out, "{:>6}: {}({})", inst.pc, inst.instruction.name, inst.opcode);
        match inst.args {
            Some(args) => {
                let relevant = inst.instruction.shape.relevant_args();
                let values: Vec<String> = args.as_array()[..relevant].iter().map(u32::to_string).collect();
                if !values.is_empty() {
                    let _ = write!(out, " {}", values.join(", "));
                }
            }
            None => out.push_str(" <truncated>"),
        }
        out.push('\n');
    }
    if !program.jump_table.is_empty() {
        let targets: Vec<String> = program.jump_table.targets().iter().map(u32::to_string).collect();
        let _ = writeln!(out, "jump table: [{}]", targets.join(", "));
    }
    out
}

pub fn disassemble_spi(spi: &SpiProgram) -> anyhow::Result<String> {
    let program = spi.program()?;
    let mut out = format!(
        "ro data: {} bytes, rw data: {} bytes, heap pages: {}, stack: {} bytes\n",
        spi.ro_data.len(),
        spi.rw_data.len(),
        spi.heap_pages,
        spi.stack_size
    );
    out.push_str(&disassemble(&program));
    Ok(out)
}
