//! The JSON file format for TAC programs.
//!
//! A file holds an array of declarations:
//!
//! ```json
//! [
//!   {"var": "@g", "init": 0},
//!   {"proc": "@main", "args": ["%x"], "body": [
//!     {"opcode": "label", "args": ["%.L0"], "result": null},
//!     {"opcode": "add", "args": ["%x", 1], "result": "%0"},
//!     {"opcode": "phi", "args": [{"%.L1": "%0", "%.L2": "%x"}], "result": "%1"},
//!     {"opcode": "jz", "args": ["%1", "%.L3"], "result": null}
//!   ]}
//! ]
//! ```
//!
//! Operands are strings (temporaries) or integers (immediates). Labels are strings.

use std::{collections::BTreeMap, path::Path, str::FromStr};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    tac::{BinaryOp, Condition, Decl, Gvar, Instr, Label, Op, Opcode, Operand, Proc, Temp, UnaryOp},
    Result,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecl {
    Var {
        var: String,
        init: i64,
    },
    Proc {
        proc: String,
        args: Vec<String>,
        body: Vec<RawInstr>,
    },
}

#[derive(Deserialize)]
struct RawInstr {
    opcode: String,
    args: Vec<Value>,
    result: Option<String>,
}

/// Loads a TAC program from a JSON file.
///
/// # Errors
///
/// Returns [`crate::Error::FileError`] if the file cannot be read,
/// [`crate::Error::Parse`] if it is not valid JSON and [`crate::Error::Malformed`] if an
/// instruction has the wrong shape.
pub fn load_tac(path: impl AsRef<Path>) -> Result<Vec<Decl>> {
    let text = std::fs::read_to_string(path)?;
    parse_tac(&text)
}

/// Parses a TAC program from JSON text.
///
/// # Errors
///
/// Returns [`crate::Error::Parse`] for invalid JSON and [`crate::Error::Malformed`] for
/// well-formed JSON that does not describe TAC.
pub fn parse_tac(text: &str) -> Result<Vec<Decl>> {
    let raw: Vec<RawDecl> = serde_json::from_str(text)?;
    raw.into_iter().map(decode_decl).collect()
}

/// Writes a TAC program to a JSON file.
///
/// # Errors
///
/// Returns [`crate::Error::FileError`] if the file cannot be written.
pub fn store_tac(path: impl AsRef<Path>, decls: &[Decl]) -> Result<()> {
    let text = serde_json::to_string(&to_json(decls))?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Encodes a TAC program as a JSON value.
#[must_use]
pub fn to_json(decls: &[Decl]) -> Value {
    Value::Array(decls.iter().map(encode_decl).collect())
}

fn decode_decl(raw: RawDecl) -> Result<Decl> {
    match raw {
        RawDecl::Var { var, init } => {
            if !var.starts_with('@') {
                return Err(malformed_error!("global variable {} must start with '@'", var));
            }
            Ok(Decl::Var(Gvar::new(var, init)))
        }
        RawDecl::Proc { proc, args, body } => {
            if !proc.starts_with('@') {
                return Err(malformed_error!("procedure {} must start with '@'", proc));
            }
            let body = body
                .into_iter()
                .map(decode_instr)
                .collect::<Result<Vec<_>>>()
                .map_err(|e| match e {
                    crate::Error::Malformed {
                        message,
                        file,
                        line,
                    } => crate::Error::Malformed {
                        message: format!("in {proc}: {message}"),
                        file,
                        line,
                    },
                    other => other,
                })?;
            Ok(Decl::Proc(Proc::new(
                proc,
                args.into_iter().map(Temp::new).collect(),
                body,
            )))
        }
    }
}

fn decode_instr(raw: RawInstr) -> Result<Instr> {
    let opcode = Opcode::from_str(&raw.opcode)
        .map_err(|_| malformed_error!("unknown opcode {}", raw.opcode))?;
    let args = &raw.args;
    let dest = raw.result.map(Temp::new);

    let arity = |n: usize| -> Result<()> {
        if args.len() == n {
            Ok(())
        } else {
            Err(malformed_error!(
                "{} expects {} arguments, found {}",
                opcode,
                n,
                args.len()
            ))
        }
    };

    let op = match opcode {
        Opcode::Nop => {
            arity(0)?;
            Op::Nop
        }
        Opcode::Const => {
            arity(1)?;
            Op::Const {
                value: decode_int(&args[0])?,
            }
        }
        Opcode::Copy => {
            arity(1)?;
            Op::Copy {
                src: decode_operand(&args[0])?,
            }
        }
        Opcode::Neg | Opcode::Not => {
            arity(1)?;
            Op::Unary {
                op: UnaryOp::from_str(opcode.into())
                    .map_err(|_| malformed_error!("{} is not a unary operator", opcode))?,
                operand: decode_operand(&args[0])?,
            }
        }
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod
        | Opcode::And
        | Opcode::Or
        | Opcode::Xor
        | Opcode::Shl
        | Opcode::Shr => {
            arity(2)?;
            Op::Binary {
                op: BinaryOp::from_str(opcode.into())
                    .map_err(|_| malformed_error!("{} is not a binary operator", opcode))?,
                left: decode_operand(&args[0])?,
                right: decode_operand(&args[1])?,
            }
        }
        Opcode::Param => {
            arity(2)?;
            let index = u32::try_from(decode_int(&args[0])?)
                .map_err(|_| malformed_error!("param index out of range"))?;
            Op::Param {
                index,
                value: decode_operand(&args[1])?,
            }
        }
        Opcode::Call => {
            arity(2)?;
            let argc = u32::try_from(decode_int(&args[1])?)
                .map_err(|_| malformed_error!("call argument count out of range"))?;
            Op::Call {
                target: decode_str(&args[0])?.to_string(),
                argc,
            }
        }
        Opcode::Phi => {
            arity(1)?;
            let Value::Object(map) = &args[0] else {
                return Err(malformed_error!("phi expects an object of sources"));
            };
            let sources = map
                .iter()
                .map(|(label, src)| Ok((Label::new(label.as_str()), decode_operand(src)?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            Op::Phi { sources }
        }
        Opcode::Label => {
            arity(1)?;
            Op::Label {
                label: Label::new(decode_str(&args[0])?),
            }
        }
        Opcode::Jmp => {
            arity(1)?;
            Op::Jump {
                target: Label::new(decode_str(&args[0])?),
            }
        }
        Opcode::Jz | Opcode::Jnz | Opcode::Jl | Opcode::Jle | Opcode::Jnl | Opcode::Jnle => {
            arity(2)?;
            Op::Branch {
                cond: Condition::from_str(opcode.into())
                    .map_err(|_| malformed_error!("{} is not a conditional jump", opcode))?,
                value: decode_operand(&args[0])?,
                target: Label::new(decode_str(&args[1])?),
            }
        }
        Opcode::Ret => match args.as_slice() {
            [] => Op::Ret { value: None },
            [v] => Op::Ret {
                value: Some(decode_operand(v)?),
            },
            _ => return Err(malformed_error!("ret expects at most one argument")),
        },
    };

    let needs_dest = matches!(
        op,
        Op::Const { .. } | Op::Copy { .. } | Op::Binary { .. } | Op::Unary { .. } | Op::Phi { .. }
    );
    let allows_dest = needs_dest || matches!(op, Op::Call { .. });
    match (&dest, needs_dest, allows_dest) {
        (None, true, _) => Err(malformed_error!("{} requires a result temporary", opcode)),
        (Some(d), _, false) => Err(malformed_error!("{} cannot define {}", opcode, d)),
        _ => Ok(Instr::new(dest, op)),
    }
}

fn decode_int(value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| malformed_error!("expected an integer, found {}", value))
}

fn decode_str(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| malformed_error!("expected a string, found {}", value))
}

fn decode_operand(value: &Value) -> Result<Operand> {
    match value {
        Value::String(name) => Ok(Operand::Temp(Temp::new(name.as_str()))),
        Value::Number(n) => n
            .as_i64()
            .map(Operand::Imm)
            .ok_or_else(|| malformed_error!("immediate {} is not a 64-bit integer", n)),
        other => Err(malformed_error!("expected an operand, found {}", other)),
    }
}

fn encode_operand(operand: &Operand) -> Value {
    match operand {
        Operand::Temp(t) => Value::String(t.as_str().to_string()),
        Operand::Imm(v) => json!(v),
    }
}

fn encode_instr(instr: &Instr) -> Value {
    let args = match &instr.op {
        Op::Nop | Op::Ret { value: None } => Vec::new(),
        Op::Const { value } => vec![json!(value)],
        Op::Copy { src } => vec![encode_operand(src)],
        Op::Unary { operand, .. } => vec![encode_operand(operand)],
        Op::Binary { left, right, .. } => vec![encode_operand(left), encode_operand(right)],
        Op::Param { index, value } => vec![json!(index), encode_operand(value)],
        Op::Call { target, argc } => vec![json!(target), json!(argc)],
        Op::Phi { sources } => {
            let map = sources
                .iter()
                .map(|(label, src)| (label.as_str().to_string(), encode_operand(src)))
                .collect::<serde_json::Map<_, _>>();
            vec![Value::Object(map)]
        }
        Op::Label { label } | Op::Jump { target: label } => vec![json!(label.as_str())],
        Op::Branch { value, target, .. } => vec![encode_operand(value), json!(target.as_str())],
        Op::Ret { value: Some(v) } => vec![encode_operand(v)],
    };

    json!({
        "opcode": instr.opcode().to_string(),
        "args": args,
        "result": instr.dest.as_ref().map(Temp::as_str),
    })
}

fn encode_decl(decl: &Decl) -> Value {
    match decl {
        Decl::Var(gvar) => json!({ "var": gvar.name, "init": gvar.init }),
        Decl::Proc(proc) => json!({
            "proc": proc.name,
            "args": proc.params.iter().map(Temp::as_str).collect::<Vec<_>>(),
            "body": proc.body.iter().map(encode_instr).collect::<Vec<_>>(),
        }),
    }
}
