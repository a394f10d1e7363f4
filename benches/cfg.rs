//! Benchmarks for control flow graph construction.
//!
//! Measures each stage on synthesized method bodies:
//! - IL decoding
//! - Delimitation and connection only
//! - Full builds with stack simulation and simplification
//! - Parallel batch builds over many methods

extern crate cilflow;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use cilflow::prelude::*;

/// IL of a method with `blocks` chained conditionals, each guarding a small arithmetic body.
fn conditional_chain(blocks: usize) -> Vec<u8> {
    let mut encoder = InstructionEncoder::new();
    for i in 0..blocks {
        let skip = format!("skip{i}");
        encoder.emit_instruction("ldarg.0", None).unwrap();
        encoder.emit_branch("brfalse", &skip).unwrap();
        encoder.emit_instruction("ldarg.1", None).unwrap();
        encoder.emit_instruction("ldc.i4.1", None).unwrap();
        encoder.emit_instruction("add", None).unwrap();
        encoder.emit_instruction("starg.s", Some(Operand::Immediate(Immediate::UInt8(1)))).unwrap();
        encoder.define_label(&skip).unwrap();
        encoder.emit_instruction("nop", None).unwrap();
    }
    encoder.emit_instruction("ldarg.1", None).unwrap();
    encoder.emit_instruction("ret", None).unwrap();
    encoder.finalize().unwrap()
}

/// IL of a method dispatching over a switch with `cases` targets.
fn dispatch(cases: usize) -> Vec<u8> {
    let labels: Vec<String> = (0..cases).map(|i| format!("case{i}")).collect();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();

    let mut encoder = InstructionEncoder::new();
    encoder.emit_instruction("ldarg.0", None).unwrap();
    encoder.emit_switch(&label_refs).unwrap();
    encoder.emit_instruction("ldc.i4.m1", None).unwrap();
    encoder.emit_instruction("ret", None).unwrap();
    for (i, label) in labels.iter().enumerate() {
        encoder.define_label(label).unwrap();
        let value = i32::try_from(i).unwrap();
        encoder.emit_instruction("ldc.i4", Some(Operand::Immediate(Immediate::Int32(value)))).unwrap();
        encoder.emit_instruction("ret", None).unwrap();
    }
    encoder.finalize().unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let il = conditional_chain(256);

    c.bench_function("decode_chain_256", |b| {
        b.iter(|| {
            let body = MethodBody::decode(black_box(&il), false, &()).unwrap();
            black_box(body)
        });
    });
}

fn bench_build_plain(c: &mut Criterion) {
    let body = MethodBody::decode(&conditional_chain(256), false, &()).unwrap();

    c.bench_function("cfg_chain_256_plain", |b| {
        b.iter(|| {
            let cfg = ControlFlowGraph::build(black_box(&body), CfgOptions::default()).unwrap();
            black_box(cfg.block_count())
        });
    });
}

fn bench_build_full(c: &mut Criterion) {
    let body = MethodBody::decode(&conditional_chain(256), false, &()).unwrap();

    c.bench_function("cfg_chain_256_full", |b| {
        b.iter(|| {
            let cfg = ControlFlowGraph::build(black_box(&body), CfgOptions::full()).unwrap();
            black_box(cfg.max_stack())
        });
    });
}

fn bench_build_switch(c: &mut Criterion) {
    let body = MethodBody::decode(&dispatch(512), false, &()).unwrap();

    c.bench_function("cfg_switch_512_full", |b| {
        b.iter(|| {
            let cfg = ControlFlowGraph::build(black_box(&body), CfgOptions::full()).unwrap();
            black_box(cfg.block_count())
        });
    });
}

fn bench_build_batch(c: &mut Criterion) {
    let methods: Vec<MethodDefinition> = (1..=512u32)
        .map(|row| {
            let mut method = MethodDefinition::new(
                Token::from_parts(Token::METHOD_DEF, row),
                format!("Method{row}"),
                CallingConvention::empty(),
                false,
            );
            method
                .decode_body(&conditional_chain(16 + (row as usize % 32)), &())
                .unwrap();
            method
        })
        .collect();

    c.bench_function("cfg_batch_512_full", |b| {
        b.iter(|| {
            let graphs = build_graphs(black_box(&methods), CfgOptions::full());
            black_box(graphs.len())
        });
    });
}

criterion_group!(
    benches,
    bench_decode,
    bench_build_plain,
    bench_build_full,
    bench_build_switch,
    bench_build_batch,
);
criterion_main!(benches);
