//! Static CIL opcode descriptor tables (ECMA-335 Partition III).
//!
//! Single-byte opcodes live in [`OPCODES`], indexed by their byte value (`0x00` – `0xE0`).
//! Two-byte opcodes share the `0xFE` prefix and live in [`OPCODES_FE`], indexed by their
//! second byte (`0x00` – `0x1E`). Unassigned slots are present as reserved entries with an empty
//! mnemonic so both tables can be indexed directly.

use std::{collections::HashMap, sync::OnceLock};

use crate::assembly::instruction::{FlowControl, OperandType, StackPop, StackPush};

/// Prefix byte of all two-byte opcodes.
pub const FE_PREFIX: u8 = 0xFE;

/// Static description of one opcode.
#[derive(Debug, PartialEq, Eq)]
pub struct OpCode {
    /// Instruction mnemonic, empty for reserved slots
    pub mnemonic: &'static str,
    /// Opcode value; two-byte opcodes carry the `0xFE` prefix in the high byte
    pub value: u16,
    /// Encoding of the inline operand
    pub operand_type: OperandType,
    /// How control leaves the instruction
    pub flow_control: FlowControl,
    /// Stack pop behaviour
    pub pop: StackPop,
    /// Stack push behaviour
    pub push: StackPush,
}

impl OpCode {
    /// Returns `true` for unassigned table slots.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.mnemonic.is_empty()
    }

    /// Number of bytes the opcode itself occupies (1 or 2).
    #[must_use]
    pub fn size(&self) -> u32 {
        if self.value > 0xFF {
            2
        } else {
            1
        }
    }

    /// Encoded opcode bytes, without the operand.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        let [high, low] = self.value.to_be_bytes();
        if self.value > 0xFF {
            vec![high, low]
        } else {
            vec![low]
        }
    }
}

macro_rules! op {
    ($value:expr, $mnemonic:expr, $operand:ident, $flow:ident, $pop:ident, $push:ident) => {
        OpCode {
            mnemonic: $mnemonic,
            value: $value,
            operand_type: OperandType::$operand,
            flow_control: FlowControl::$flow,
            pop: StackPop::$pop,
            push: StackPush::$push,
        }
    };
}

macro_rules! reserved {
    ($value:expr) => {
        op!($value, "", None, Next, Pop0, Push0)
    };
}

/// Single-byte opcodes, indexed by opcode byte.
pub static OPCODES: [OpCode; 225] = [
    op!(0x00, "nop", None, Next, Pop0, Push0),
    op!(0x01, "break", None, Break, Pop0, Push0),
    op!(0x02, "ldarg.0", None, Next, Pop0, Push1),
    op!(0x03, "ldarg.1", None, Next, Pop0, Push1),
    op!(0x04, "ldarg.2", None, Next, Pop0, Push1),
    op!(0x05, "ldarg.3", None, Next, Pop0, Push1),
    op!(0x06, "ldloc.0", None, Next, Pop0, Push1),
    op!(0x07, "ldloc.1", None, Next, Pop0, Push1),
    op!(0x08, "ldloc.2", None, Next, Pop0, Push1),
    op!(0x09, "ldloc.3", None, Next, Pop0, Push1),
    op!(0x0A, "stloc.0", None, Next, Pop1, Push0),
    op!(0x0B, "stloc.1", None, Next, Pop1, Push0),
    op!(0x0C, "stloc.2", None, Next, Pop1, Push0),
    op!(0x0D, "stloc.3", None, Next, Pop1, Push0),
    op!(0x0E, "ldarg.s", UInt8, Next, Pop0, Push1),
    op!(0x0F, "ldarga.s", UInt8, Next, Pop0, Pushi),
    op!(0x10, "starg.s", UInt8, Next, Pop1, Push0),
    op!(0x11, "ldloc.s", UInt8, Next, Pop0, Push1),
    op!(0x12, "ldloca.s", UInt8, Next, Pop0, Pushi),
    op!(0x13, "stloc.s", UInt8, Next, Pop1, Push0),
    op!(0x14, "ldnull", None, Next, Pop0, Pushref),
    op!(0x15, "ldc.i4.m1", None, Next, Pop0, Pushi),
    op!(0x16, "ldc.i4.0", None, Next, Pop0, Pushi),
    op!(0x17, "ldc.i4.1", None, Next, Pop0, Pushi),
    op!(0x18, "ldc.i4.2", None, Next, Pop0, Pushi),
    op!(0x19, "ldc.i4.3", None, Next, Pop0, Pushi),
    op!(0x1A, "ldc.i4.4", None, Next, Pop0, Pushi),
    op!(0x1B, "ldc.i4.5", None, Next, Pop0, Pushi),
    op!(0x1C, "ldc.i4.6", None, Next, Pop0, Pushi),
    op!(0x1D, "ldc.i4.7", None, Next, Pop0, Pushi),
    op!(0x1E, "ldc.i4.8", None, Next, Pop0, Pushi),
    op!(0x1F, "ldc.i4.s", Int8, Next, Pop0, Pushi),
    op!(0x20, "ldc.i4", Int32, Next, Pop0, Pushi),
    op!(0x21, "ldc.i8", Int64, Next, Pop0, Pushi8),
    op!(0x22, "ldc.r4", Float32, Next, Pop0, Pushr4),
    op!(0x23, "ldc.r8", Float64, Next, Pop0, Pushr8),
    reserved!(0x24),
    op!(0x25, "dup", None, Next, Pop1, Push1Push1),
    op!(0x26, "pop", None, Next, Pop1, Push0),
    op!(0x27, "jmp", Token, Call, Pop0, Push0),
    op!(0x28, "call", Token, Call, Varpop, Varpush),
    op!(0x29, "calli", Token, Call, Varpop, Varpush),
    op!(0x2A, "ret", None, Return, Varpop, Push0),
    op!(0x2B, "br.s", Int8, Branch, Pop0, Push0),
    op!(0x2C, "brfalse.s", Int8, ConditionalBranch, Popi, Push0),
    op!(0x2D, "brtrue.s", Int8, ConditionalBranch, Popi, Push0),
    op!(0x2E, "beq.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x2F, "bge.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x30, "bgt.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x31, "ble.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x32, "blt.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x33, "bne.un.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x34, "bge.un.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x35, "bgt.un.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x36, "ble.un.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x37, "blt.un.s", Int8, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x38, "br", Int32, Branch, Pop0, Push0),
    op!(0x39, "brfalse", Int32, ConditionalBranch, Popi, Push0),
    op!(0x3A, "brtrue", Int32, ConditionalBranch, Popi, Push0),
    op!(0x3B, "beq", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x3C, "bge", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x3D, "bgt", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x3E, "ble", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x3F, "blt", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x40, "bne.un", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x41, "bge.un", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x42, "bgt.un", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x43, "ble.un", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x44, "blt.un", Int32, ConditionalBranch, Pop1Pop1, Push0),
    op!(0x45, "switch", Switch, Switch, Popi, Push0),
    op!(0x46, "ldind.i1", None, Next, Popi, Pushi),
    op!(0x47, "ldind.u1", None, Next, Popi, Pushi),
    op!(0x48, "ldind.i2", None, Next, Popi, Pushi),
    op!(0x49, "ldind.u2", None, Next, Popi, Pushi),
    op!(0x4A, "ldind.i4", None, Next, Popi, Pushi),
    op!(0x4B, "ldind.u4", None, Next, Popi, Pushi),
    op!(0x4C, "ldind.i8", None, Next, Popi, Pushi8),
    op!(0x4D, "ldind.i", None, Next, Popi, Pushi),
    op!(0x4E, "ldind.r4", None, Next, Popi, Pushr4),
    op!(0x4F, "ldind.r8", None, Next, Popi, Pushr8),
    op!(0x50, "ldind.ref", None, Next, Popi, Pushref),
    op!(0x51, "stind.ref", None, Next, PopiPopi, Push0),
    op!(0x52, "stind.i1", None, Next, PopiPopi, Push0),
    op!(0x53, "stind.i2", None, Next, PopiPopi, Push0),
    op!(0x54, "stind.i4", None, Next, PopiPopi, Push0),
    op!(0x55, "stind.i8", None, Next, PopiPopi8, Push0),
    op!(0x56, "stind.r4", None, Next, PopiPopr4, Push0),
    op!(0x57, "stind.r8", None, Next, PopiPopr8, Push0),
    op!(0x58, "add", None, Next, Pop1Pop1, Push1),
    op!(0x59, "sub", None, Next, Pop1Pop1, Push1),
    op!(0x5A, "mul", None, Next, Pop1Pop1, Push1),
    op!(0x5B, "div", None, Next, Pop1Pop1, Push1),
    op!(0x5C, "div.un", None, Next, Pop1Pop1, Push1),
    op!(0x5D, "rem", None, Next, Pop1Pop1, Push1),
    op!(0x5E, "rem.un", None, Next, Pop1Pop1, Push1),
    op!(0x5F, "and", None, Next, Pop1Pop1, Push1),
    op!(0x60, "or", None, Next, Pop1Pop1, Push1),
    op!(0x61, "xor", None, Next, Pop1Pop1, Push1),
    op!(0x62, "shl", None, Next, Pop1Pop1, Push1),
    op!(0x63, "shr", None, Next, Pop1Pop1, Push1),
    op!(0x64, "shr.un", None, Next, Pop1Pop1, Push1),
    op!(0x65, "neg", None, Next, Pop1, Push1),
    op!(0x66, "not", None, Next, Pop1, Push1),
    op!(0x67, "conv.i1", None, Next, Pop1, Pushi),
    op!(0x68, "conv.i2", None, Next, Pop1, Pushi),
    op!(0x69, "conv.i4", None, Next, Pop1, Pushi),
    op!(0x6A, "conv.i8", None, Next, Pop1, Pushi8),
    op!(0x6B, "conv.r4", None, Next, Pop1, Pushr4),
    op!(0x6C, "conv.r8", None, Next, Pop1, Pushr8),
    op!(0x6D, "conv.u4", None, Next, Pop1, Pushi),
    op!(0x6E, "conv.u8", None, Next, Pop1, Pushi8),
    op!(0x6F, "callvirt", Token, Call, Varpop, Varpush),
    op!(0x70, "cpobj", Token, Next, PopiPopi, Push0),
    op!(0x71, "ldobj", Token, Next, Popi, Push1),
    op!(0x72, "ldstr", Token, Next, Pop0, Pushref),
    op!(0x73, "newobj", Token, Call, Varpop, Pushref),
    op!(0x74, "castclass", Token, Next, Popref, Pushref),
    op!(0x75, "isinst", Token, Next, Popref, Pushi),
    op!(0x76, "conv.r.un", None, Next, Pop1, Pushr8),
    reserved!(0x77),
    reserved!(0x78),
    op!(0x79, "unbox", Token, Next, Popref, Pushi),
    op!(0x7A, "throw", None, Throw, Popref, Push0),
    op!(0x7B, "ldfld", Token, Next, Popref, Push1),
    op!(0x7C, "ldflda", Token, Next, Popref, Pushi),
    op!(0x7D, "stfld", Token, Next, PoprefPop1, Push0),
    op!(0x7E, "ldsfld", Token, Next, Pop0, Push1),
    op!(0x7F, "ldsflda", Token, Next, Pop0, Pushi),
    op!(0x80, "stsfld", Token, Next, Pop1, Push0),
    op!(0x81, "stobj", Token, Next, PopiPop1, Push0),
    op!(0x82, "conv.ovf.i1.un", None, Next, Pop1, Pushi),
    op!(0x83, "conv.ovf.i2.un", None, Next, Pop1, Pushi),
    op!(0x84, "conv.ovf.i4.un", None, Next, Pop1, Pushi),
    op!(0x85, "conv.ovf.i8.un", None, Next, Pop1, Pushi8),
    op!(0x86, "conv.ovf.u1.un", None, Next, Pop1, Pushi),
    op!(0x87, "conv.ovf.u2.un", None, Next, Pop1, Pushi),
    op!(0x88, "conv.ovf.u4.un", None, Next, Pop1, Pushi),
    op!(0x89, "conv.ovf.u8.un", None, Next, Pop1, Pushi8),
    op!(0x8A, "conv.ovf.i.un", None, Next, Pop1, Pushi),
    op!(0x8B, "conv.ovf.u.un", None, Next, Pop1, Pushi),
    op!(0x8C, "box", Token, Next, Pop1, Pushref),
    op!(0x8D, "newarr", Token, Next, Popi, Pushref),
    op!(0x8E, "ldlen", None, Next, Popref, Pushi),
    op!(0x8F, "ldelema", Token, Next, PoprefPopi, Pushi),
    op!(0x90, "ldelem.i1", None, Next, PoprefPopi, Pushi),
    op!(0x91, "ldelem.u1", None, Next, PoprefPopi, Pushi),
    op!(0x92, "ldelem.i2", None, Next, PoprefPopi, Pushi),
    op!(0x93, "ldelem.u2", None, Next, PoprefPopi, Pushi),
    op!(0x94, "ldelem.i4", None, Next, PoprefPopi, Pushi),
    op!(0x95, "ldelem.u4", None, Next, PoprefPopi, Pushi),
    op!(0x96, "ldelem.i8", None, Next, PoprefPopi, Pushi8),
    op!(0x97, "ldelem.i", None, Next, PoprefPopi, Pushi),
    op!(0x98, "ldelem.r4", None, Next, PoprefPopi, Pushr4),
    op!(0x99, "ldelem.r8", None, Next, PoprefPopi, Pushr8),
    op!(0x9A, "ldelem.ref", None, Next, PoprefPopi, Pushref),
    op!(0x9B, "stelem.i", None, Next, PoprefPopiPopi, Push0),
    op!(0x9C, "stelem.i1", None, Next, PoprefPopiPopi, Push0),
    op!(0x9D, "stelem.i2", None, Next, PoprefPopiPopi, Push0),
    op!(0x9E, "stelem.i4", None, Next, PoprefPopiPopi, Push0),
    op!(0x9F, "stelem.i8", None, Next, PoprefPopiPopi8, Push0),
    op!(0xA0, "stelem.r4", None, Next, PoprefPopiPopr4, Push0),
    op!(0xA1, "stelem.r8", None, Next, PoprefPopiPopr8, Push0),
    op!(0xA2, "stelem.ref", None, Next, PoprefPopiPopref, Push0),
    op!(0xA3, "ldelem.any", Token, Next, PoprefPopi, Push1),
    op!(0xA4, "stelem.any", Token, Next, PoprefPopiPopref, Push0),
    op!(0xA5, "unbox.any", Token, Next, Popref, Push1),
    reserved!(0xA6),
    reserved!(0xA7),
    reserved!(0xA8),
    reserved!(0xA9),
    reserved!(0xAA),
    reserved!(0xAB),
    reserved!(0xAC),
    reserved!(0xAD),
    reserved!(0xAE),
    reserved!(0xAF),
    reserved!(0xB0),
    reserved!(0xB1),
    reserved!(0xB2),
    op!(0xB3, "conv.ovf.i1", None, Next, Pop1, Pushi),
    op!(0xB4, "conv.ovf.u1", None, Next, Pop1, Pushi),
    op!(0xB5, "conv.ovf.i2", None, Next, Pop1, Pushi),
    op!(0xB6, "conv.ovf.u2", None, Next, Pop1, Pushi),
    op!(0xB7, "conv.ovf.i4", None, Next, Pop1, Pushi),
    op!(0xB8, "conv.ovf.u4", None, Next, Pop1, Pushi),
    op!(0xB9, "conv.ovf.i8", None, Next, Pop1, Pushi8),
    op!(0xBA, "conv.ovf.u8", None, Next, Pop1, Pushi8),
    reserved!(0xBB),
    reserved!(0xBC),
    reserved!(0xBD),
    reserved!(0xBE),
    reserved!(0xBF),
    reserved!(0xC0),
    reserved!(0xC1),
    op!(0xC2, "refanyval", Token, Next, Pop1, Pushi),
    op!(0xC3, "ckfinite", None, Next, Pop1, Pushr8),
    reserved!(0xC4),
    reserved!(0xC5),
    op!(0xC6, "mkrefany", Token, Next, Popi, Push1),
    reserved!(0xC7),
    reserved!(0xC8),
    reserved!(0xC9),
    reserved!(0xCA),
    reserved!(0xCB),
    reserved!(0xCC),
    reserved!(0xCD),
    reserved!(0xCE),
    reserved!(0xCF),
    op!(0xD0, "ldtoken", Token, Next, Pop0, Pushi),
    op!(0xD1, "conv.u2", None, Next, Pop1, Pushi),
    op!(0xD2, "conv.u1", None, Next, Pop1, Pushi),
    op!(0xD3, "conv.i", None, Next, Pop1, Pushi),
    op!(0xD4, "conv.ovf.i", None, Next, Pop1, Pushi),
    op!(0xD5, "conv.ovf.u", None, Next, Pop1, Pushi),
    op!(0xD6, "add.ovf", None, Next, Pop1Pop1, Push1),
    op!(0xD7, "add.ovf.un", None, Next, Pop1Pop1, Push1),
    op!(0xD8, "mul.ovf", None, Next, Pop1Pop1, Push1),
    op!(0xD9, "mul.ovf.un", None, Next, Pop1Pop1, Push1),
    op!(0xDA, "sub.ovf", None, Next, Pop1Pop1, Push1),
    op!(0xDB, "sub.ovf.un", None, Next, Pop1Pop1, Push1),
    op!(0xDC, "endfinally", None, Return, Pop0, Push0),
    op!(0xDD, "leave", Int32, Branch, PopAll, Push0),
    op!(0xDE, "leave.s", Int8, Branch, PopAll, Push0),
    op!(0xDF, "stind.i", None, Next, PopiPopi, Push0),
    op!(0xE0, "conv.u", None, Next, Pop1, Pushi),
];

/// Two-byte opcodes (`0xFE` prefix), indexed by the second byte.
pub static OPCODES_FE: [OpCode; 31] = [
    op!(0xFE00, "arglist", None, Next, Pop0, Pushi),
    op!(0xFE01, "ceq", None, Next, Pop1Pop1, Pushi),
    op!(0xFE02, "cgt", None, Next, Pop1Pop1, Pushi),
    op!(0xFE03, "cgt.un", None, Next, Pop1Pop1, Pushi),
    op!(0xFE04, "clt", None, Next, Pop1Pop1, Pushi),
    op!(0xFE05, "clt.un", None, Next, Pop1Pop1, Pushi),
    op!(0xFE06, "ldftn", Token, Next, Pop0, Pushi),
    op!(0xFE07, "ldvirtftn", Token, Next, Popref, Pushi),
    reserved!(0xFE08),
    op!(0xFE09, "ldarg", UInt16, Next, Pop0, Push1),
    op!(0xFE0A, "ldarga", UInt16, Next, Pop0, Pushi),
    op!(0xFE0B, "starg", UInt16, Next, Pop1, Push0),
    op!(0xFE0C, "ldloc", UInt16, Next, Pop0, Push1),
    op!(0xFE0D, "ldloca", UInt16, Next, Pop0, Pushi),
    op!(0xFE0E, "stloc", UInt16, Next, Pop1, Push0),
    op!(0xFE0F, "localloc", None, Next, Popi, Pushi),
    reserved!(0xFE10),
    op!(0xFE11, "endfilter", None, Return, Popi, Push0),
    op!(0xFE12, "unaligned.", UInt8, Meta, Pop0, Push0),
    op!(0xFE13, "volatile.", None, Meta, Pop0, Push0),
    op!(0xFE14, "tail.", None, Meta, Pop0, Push0),
    op!(0xFE15, "initobj", Token, Next, Popi, Push0),
    op!(0xFE16, "constrained.", Token, Meta, Pop0, Push0),
    op!(0xFE17, "cpblk", None, Next, PopiPopiPopi, Push0),
    op!(0xFE18, "initblk", None, Next, PopiPopiPopi, Push0),
    op!(0xFE19, "no.", UInt8, Meta, Pop0, Push0),
    op!(0xFE1A, "rethrow", None, Throw, Pop0, Push0),
    reserved!(0xFE1B),
    op!(0xFE1C, "sizeof", Token, Next, Pop0, Pushi),
    op!(0xFE1D, "refanytype", None, Next, Pop1, Pushi),
    op!(0xFE1E, "readonly.", None, Meta, Pop0, Push0),
];

/// Look up an opcode descriptor by value, e.g. `0x2A` for `ret` or `0xFE01` for `ceq`.
///
/// Returns `None` for reserved slots and values outside both tables.
#[must_use]
pub fn by_value(value: u16) -> Option<&'static OpCode> {
    let [high, low] = value.to_be_bytes();
    let opcode = match high {
        0 => OPCODES.get(usize::from(low)),
        FE_PREFIX => OPCODES_FE.get(usize::from(low)),
        _ => None,
    }?;
    (!opcode.is_reserved()).then_some(opcode)
}

static MNEMONIC_TO_OPCODE: OnceLock<HashMap<&'static str, &'static OpCode>> = OnceLock::new();

/// Look up an opcode descriptor by mnemonic, e.g. `"ldc.i4.s"`.
///
/// The reverse lookup table is built on first use from [`OPCODES`] and [`OPCODES_FE`].
#[must_use]
pub fn by_mnemonic(mnemonic: &str) -> Option<&'static OpCode> {
    MNEMONIC_TO_OPCODE
        .get_or_init(|| {
            OPCODES
                .iter()
                .chain(OPCODES_FE.iter())
                .filter(|opcode| !opcode.is_reserved())
                .map(|opcode| (opcode.mnemonic, opcode))
                .collect()
        })
        .get(mnemonic)
        .copied()
}
