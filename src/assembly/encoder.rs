//! CIL instruction encoding with label-based branches.
//!
//! [`InstructionEncoder`] is the reverse counterpart of the decoder. It looks opcodes up by
//! mnemonic in the same static tables and resolves branch labels when the method is finalized,
//! which makes it convenient for synthesizing method bodies for analysis.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilflow::assembly::{InstructionEncoder, MethodBody};
//!
//! let mut encoder = InstructionEncoder::new();
//! encoder.emit_instruction("ldarg.0", None)?;
//! encoder.emit_branch("brfalse.s", "zero")?;
//! encoder.emit_instruction("ldc.i4.1", None)?;
//! encoder.emit_instruction("ret", None)?;
//! encoder.define_label("zero")?;
//! encoder.emit_instruction("ldc.i4.0", None)?;
//! encoder.emit_instruction("ret", None)?;
//!
//! let il = encoder.finalize()?;
//! let body = MethodBody::decode(&il, false, &())?;
//! assert_eq!(body.len(), 6);
//! # Ok::<(), cilflow::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{
        instruction::{FlowControl, Immediate, Operand, OperandType},
        opcodes::{self, OpCode},
    },
    file::io::write_le_at,
    Error, Result,
};

/// Pending branch displacement awaiting label resolution.
#[derive(Debug, Clone)]
struct LabelFixup {
    /// Target label name
    label: String,
    /// Position of the displacement bytes in the bytecode
    fixup_position: usize,
    /// Size of the displacement (1 or 4 bytes)
    offset_size: usize,
}

/// Pending switch table awaiting label resolution.
#[derive(Debug, Clone)]
struct SwitchFixup {
    labels: Vec<String>,
    /// Position of the first case displacement
    fixup_position: usize,
    /// Position after the switch instruction, the base of all case displacements
    instruction_end_position: usize,
}

/// Assembles CIL bytecode from mnemonics.
///
/// Branch instructions refer to labels, which may be defined before or after the branch;
/// displacements are written in [`InstructionEncoder::finalize`].
#[derive(Debug, Default)]
pub struct InstructionEncoder {
    bytecode: Vec<u8>,
    labels: HashMap<String, u32>,
    fixups: Vec<LabelFixup>,
    switch_fixups: Vec<SwitchFixup>,
}

fn lookup(mnemonic: &str) -> Result<&'static OpCode> {
    opcodes::by_mnemonic(mnemonic).ok_or_else(|| Error::InvalidMnemonic(mnemonic.to_string()))
}

impl InstructionEncoder {
    /// Create an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size of the emitted bytecode, i.e. the offset of the next instruction.
    #[must_use]
    pub fn position(&self) -> usize {
        self.bytecode.len()
    }

    /// Emit an instruction with an optional operand.
    ///
    /// Branches should be emitted with [`InstructionEncoder::emit_branch`] and switches with
    /// [`InstructionEncoder::emit_switch`]; passing raw displacements here is accepted as an
    /// immediate for the branch forms.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidMnemonic`] if the mnemonic is unknown
    /// - [`crate::Error::Malformed`] if the operand does not match the opcode's operand type
    pub fn emit_instruction(&mut self, mnemonic: &str, operand: Option<Operand>) -> Result<()> {
        let opcode = lookup(mnemonic)?;
        self.bytecode.extend_from_slice(&opcode.bytes());
        self.emit_operand(opcode, operand)
    }

    /// Emit a branch instruction targeting `label`.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidMnemonic`] if the mnemonic is unknown
    /// - [`crate::Error::InvalidBranch`] if the instruction is not a single-target branch
    pub fn emit_branch(&mut self, mnemonic: &str, label: &str) -> Result<()> {
        let opcode = lookup(mnemonic)?;

        if !matches!(
            opcode.flow_control,
            FlowControl::Branch | FlowControl::ConditionalBranch
        ) {
            return Err(Error::InvalidBranch(format!(
                "instruction '{mnemonic}' is not a branch instruction"
            )));
        }

        let offset_size = match opcode.operand_type {
            OperandType::Int8 => 1,
            OperandType::Int32 => 4,
            _ => {
                return Err(Error::InvalidBranch(format!(
                    "instruction '{mnemonic}' has no displacement operand"
                )))
            }
        };

        self.bytecode.extend_from_slice(&opcode.bytes());
        self.fixups.push(LabelFixup {
            label: label.to_string(),
            fixup_position: self.bytecode.len(),
            offset_size,
        });
        self.bytecode.resize(self.bytecode.len() + offset_size, 0);

        Ok(())
    }

    /// Emit a `switch` with one case per label, in order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidBranch`] if `labels` is empty.
    pub fn emit_switch(&mut self, labels: &[&str]) -> Result<()> {
        if labels.is_empty() {
            return Err(Error::InvalidBranch(
                "switch must have at least one target".to_string(),
            ));
        }

        let opcode = lookup("switch")?;
        self.bytecode.extend_from_slice(&opcode.bytes());

        let num_targets =
            u32::try_from(labels.len()).map_err(|_| malformed_error!("Too many switch targets"))?;
        self.bytecode.extend_from_slice(&num_targets.to_le_bytes());

        let fixup_position = self.bytecode.len();
        self.bytecode.resize(fixup_position + labels.len() * 4, 0);

        self.switch_fixups.push(SwitchFixup {
            labels: labels.iter().map(|s| (*s).to_string()).collect(),
            fixup_position,
            instruction_end_position: self.bytecode.len(),
        });

        Ok(())
    }

    /// Bind `name` to the current position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidBranch`] if the label was already defined.
    pub fn define_label(&mut self, name: &str) -> Result<()> {
        if self.labels.contains_key(name) {
            return Err(Error::InvalidBranch(format!("label '{name}' defined twice")));
        }

        let position = u32::try_from(self.bytecode.len())
            .map_err(|_| malformed_error!("Bytecode length exceeds u32 range"))?;
        self.labels.insert(name.to_string(), position);
        Ok(())
    }

    /// Resolve all labels and return the finished bytecode.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidBranch`] if a label is undefined or a short branch
    /// cannot reach its label.
    pub fn finalize(mut self) -> Result<Vec<u8>> {
        for fixup in &self.fixups {
            let next_instruction = fixup.fixup_position + fixup.offset_size;
            let displacement = self.displacement(&fixup.label, next_instruction)?;

            let mut position = fixup.fixup_position;
            if fixup.offset_size == 1 {
                let short = i8::try_from(displacement).map_err(|_| {
                    Error::InvalidBranch(format!(
                        "label '{}' is out of range for a short branch",
                        fixup.label
                    ))
                })?;
                write_le_at(&mut self.bytecode, &mut position, short)?;
            } else {
                write_le_at(&mut self.bytecode, &mut position, displacement)?;
            }
        }

        for switch_fixup in &self.switch_fixups {
            let mut position = switch_fixup.fixup_position;
            for label in &switch_fixup.labels {
                let displacement =
                    self.displacement(label, switch_fixup.instruction_end_position)?;
                write_le_at(&mut self.bytecode, &mut position, displacement)?;
            }
        }

        Ok(self.bytecode)
    }

    fn displacement(&self, label: &str, base: usize) -> Result<i32> {
        let target = self
            .labels
            .get(label)
            .ok_or_else(|| Error::InvalidBranch(format!("undefined label '{label}'")))?;

        let target = i64::from(*target);
        let base = i64::try_from(base).map_err(|_| malformed_error!("Position exceeds i64"))?;
        i32::try_from(target - base).map_err(|_| malformed_error!("Branch displacement overflow"))
    }

    fn emit_operand(&mut self, opcode: &OpCode, operand: Option<Operand>) -> Result<()> {
        match (opcode.operand_type, operand) {
            (OperandType::None, None) => {}
            (OperandType::Int8, Some(Operand::Immediate(Immediate::Int8(value)))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::UInt8, Some(Operand::Immediate(Immediate::UInt8(value)))) => {
                self.bytecode.push(value);
            }
            (OperandType::UInt16, Some(Operand::Immediate(Immediate::UInt16(value)))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Int32, Some(Operand::Immediate(Immediate::Int32(value)))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Int64, Some(Operand::Immediate(Immediate::Int64(value)))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Float32, Some(Operand::Immediate(Immediate::Float32(value)))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Float64, Some(Operand::Immediate(Immediate::Float64(value)))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (
                OperandType::Token,
                Some(Operand::Token(token) | Operand::Method { token, .. }),
            ) => {
                self.bytecode.extend_from_slice(&token.value().to_le_bytes());
            }
            (expected, operand) => {
                return Err(malformed_error!(
                    "'{}' expects a {:?} operand, got {:?}",
                    opcode.mnemonic,
                    expected,
                    operand
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::token::Token;

    #[test]
    fn simple_instructions() {
        let mut encoder = InstructionEncoder::new();
        encoder.emit_instruction("nop", None).unwrap();
        encoder
            .emit_instruction("ldc.i4.s", Some(Operand::Immediate(Immediate::Int8(-1))))
            .unwrap();
        encoder.emit_instruction("ceq", None).unwrap();
        encoder
            .emit_instruction("call", Some(Operand::Token(Token::new(0x0600_0002))))
            .unwrap();
        encoder.emit_instruction("ret", None).unwrap();

        let il = encoder.finalize().unwrap();
        assert_eq!(
            il,
            vec![0x00, 0x1F, 0xFF, 0xFE, 0x01, 0x28, 0x02, 0x00, 0x00, 0x06, 0x2A]
        );
    }

    #[test]
    fn forward_and_backward_branches() {
        let mut encoder = InstructionEncoder::new();
        encoder.define_label("top").unwrap();
        encoder.emit_branch("brtrue.s", "end").unwrap();
        encoder.emit_branch("br", "top").unwrap();
        encoder.define_label("end").unwrap();
        encoder.emit_instruction("ret", None).unwrap();

        let il = encoder.finalize().unwrap();
        // brtrue.s +5; br -7; ret
        assert_eq!(il, vec![0x2D, 0x05, 0x38, 0xF9, 0xFF, 0xFF, 0xFF, 0x2A]);
    }

    #[test]
    fn switch_table() {
        let mut encoder = InstructionEncoder::new();
        encoder.emit_switch(&["a", "b"]).unwrap();
        encoder.define_label("a").unwrap();
        encoder.emit_instruction("nop", None).unwrap();
        encoder.define_label("b").unwrap();
        encoder.emit_instruction("ret", None).unwrap();

        let il = encoder.finalize().unwrap();
        assert_eq!(
            il,
            vec![
                0x45, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
                0x00, 0x2A
            ]
        );
    }

    #[test]
    fn errors() {
        let mut encoder = InstructionEncoder::new();
        assert!(matches!(
            encoder.emit_instruction("bogus", None),
            Err(Error::InvalidMnemonic(_))
        ));
        assert!(matches!(
            encoder.emit_branch("nop", "x"),
            Err(Error::InvalidBranch(_))
        ));
        assert!(matches!(encoder.emit_switch(&[]), Err(Error::InvalidBranch(_))));
        assert!(matches!(
            encoder.emit_instruction("ldc.i4", None),
            Err(Error::Malformed { .. })
        ));

        let mut encoder = InstructionEncoder::new();
        encoder.define_label("x").unwrap();
        assert!(matches!(encoder.define_label("x"), Err(Error::InvalidBranch(_))));
        encoder.emit_branch("br.s", "missing").unwrap();
        assert!(matches!(encoder.finalize(), Err(Error::InvalidBranch(_))));
    }
}
