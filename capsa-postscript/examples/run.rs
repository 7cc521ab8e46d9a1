//! A small example that runs a PostScript program and dumps the operand
//! stack it leaves behind.

#![allow(missing_docs)]

use capsa_postscript::{Interpreter, Object, Value};
use std::env;
use std::fs;
use std::process;

fn main() {
    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("Usage: run <file>");
            process::exit(1);
        }
    };

    let data = match fs::read(&path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            process::exit(1);
        }
    };

    let mut interp = Interpreter::new();

    if let Err(e) = interp.load(&data) {
        eprintln!("Error: {e}");
    }

    let operands = interp.operands();
    println!("{} object(s) on the operand stack", operands.len());

    for (i, object) in operands.iter().rev().enumerate() {
        println!("{i}: {}", describe(object));
    }
}

fn describe(object: &Object) -> String {
    match object.value() {
        Value::Boolean(v) => format!("boolean {v}"),
        Value::Integer(v) => format!("integer {}", *v as i64),
        Value::Real(v) => format!("real {v}"),
        Value::String(s) => format!("string ({})", String::from_utf8_lossy(&s.borrow())),
        Value::LiteralName(n) => format!("name /{n}"),
        Value::ExecutableName(n) => format!("name {n}"),
        Value::Array(items) => format!("array of {}", items.borrow().len()),
        Value::Procedure(items) => format!("procedure of {}", items.borrow().len()),
        Value::Dictionary(d) => format!("dictionary of {}", d.len()),
        Value::Operand(op) => format!("operator {}", op.name()),
    }
}
