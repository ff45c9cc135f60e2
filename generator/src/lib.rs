// tofgen — TOF400C block code generator
//
// Library root. Blocks flow through parameter extraction (`block`),
// emission onto a per-pass accumulator (`tof400c`, `assembly`), and sketch
// rendering (`codegen`); `pipeline` drives one pass end to end.

pub mod assembly;
pub mod block;
pub mod blocks;
pub mod catalog;
pub mod codegen;
pub mod diag;
pub mod fragment;
pub mod pipeline;
pub mod tof400c;
