//! Execution of TAC programs.
//!
//! Two passes: a label-resolution scan, then a program-counter loop over the
//! instruction list. Expressions on instruction right-hand sides are
//! evaluated textually by partitioning on space-surrounded operators in
//! precedence order, mirroring the way the generator printed them. Runtime
//! problems are diagnostics, never panics: the executor substitutes a
//! neutral value (0) or halts cleanly when the instruction budget runs out.

mod value;

pub use value::Value;

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    io::{self, BufRead, Write},
};

use log::debug;

use crate::tac::{Instruction, Program};

/// Upper bound on executed instructions; a runaway loop trips it and halts.
pub const INSTRUCTION_BUDGET: usize = 100_000;

const RELATIONAL_OPS: &[&str] = &["==", "!=", "<=", ">=", "<", ">"];
const ADDITIVE_OPS: &[&str] = &["+", "-"];
const MULTIPLICATIVE_OPS: &[&str] = &["*", "/", "%"];

pub struct Executor {
    program: Program,
    labels: HashMap<String, usize>,
    variables: HashMap<String, Value>,
    output: Vec<String>,
    diagnostics: Vec<String>,
    pc: usize,
}

impl Executor {
    pub fn new(program: Program) -> Self {
        let labels = program.labels();
        Self {
            program,
            labels,
            variables: HashMap::new(),
            output: vec![],
            diagnostics: vec![],
            pc: 0,
        }
    }

    /// Run the program to completion, reading `READ` lines from `input` and
    /// emitting one line per `WRITE` to `output`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> io::Result<()> {
        self.pc = 0;
        let mut executed = 0;

        while self.pc < self.program.instructions.len() && executed < INSTRUCTION_BUDGET {
            executed += 1;
            let instruction = self.program.instructions[self.pc].clone();

            match instruction {
                Instruction::Comment(_) | Instruction::Label(_) => {}
                Instruction::Halt => break,
                Instruction::Declare { name, ty } => {
                    let initial = match ty.as_str() {
                        "int" => Value::Int(0),
                        "float" => Value::Float(0.0),
                        "bool" => Value::Bool(false),
                        _ => Value::Nil,
                    };
                    self.variables.insert(name, initial);
                }
                Instruction::Read(name) => self.execute_read(&name, input)?,
                Instruction::Write(expr) => self.execute_write(&expr, output)?,
                Instruction::Goto(label) => {
                    if let Some(target) = self.resolve_label(&label) {
                        self.pc = target;
                        continue;
                    }
                }
                Instruction::IfFalse { cond, label } => {
                    let value = self.evaluate(&cond);
                    if !value.as_bool() {
                        if let Some(target) = self.resolve_label(&label) {
                            self.pc = target;
                            continue;
                        }
                    }
                }
                Instruction::Assign { dest, expr } => {
                    let value = self.evaluate(&expr);
                    self.variables.insert(dest, value);
                }
                Instruction::Unknown(line) => {
                    self.diagnostics.push(format!("unresolved instruction: '{line}'"));
                }
            }

            self.pc += 1;
        }

        if executed >= INSTRUCTION_BUDGET {
            self.diagnostics.push("iteration limit reached".to_string());
        }

        debug!("executed {executed} instructions, {} outputs", self.output.len());
        Ok(())
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Final bindings of user variables, sorted by name; temporaries
    /// (`t` followed by digits) are excluded.
    pub fn final_state(&self) -> BTreeMap<String, Value> {
        self.variables
            .iter()
            .filter(|(name, _)| !is_temporary(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn resolve_label(&mut self, label: &str) -> Option<usize> {
        let target = self.labels.get(label).copied();
        if target.is_none() {
            self.diagnostics.push(format!("unknown label: {label}"));
        }
        target
    }

    fn execute_read<R: BufRead>(&mut self, name: &str, input: &mut R) -> io::Result<()> {
        let mut line = String::new();
        let read = input.read_line(&mut line)?;

        if read == 0 {
            self.diagnostics
                .push(format!("could not read input for '{name}'"));
            self.variables.insert(name.to_string(), Value::Int(0));
            return Ok(());
        }

        let text = line.trim_end_matches(['\n', '\r']);
        let value = if let Ok(int) = text.parse::<i64>() {
            Value::Int(int)
        } else if text.contains('.') {
            match text.parse::<f64>() {
                Ok(float) => Value::Float(float),
                Err(_) => Value::Str(text.to_string()),
            }
        } else {
            Value::Str(text.to_string())
        };

        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    fn execute_write<W: Write>(&mut self, expr: &str, output: &mut W) -> io::Result<()> {
        let value = self.evaluate(expr);

        // String literals lose their surrounding quotes on output.
        let text = match &value {
            Value::Str(s) => strip_quotes(s).to_string(),
            other => other.to_string(),
        };

        writeln!(output, "{text}")?;
        self.output.push(text);
        Ok(())
    }

    /// Evaluate a textual expression: atoms first, then binary operators by
    /// ascending precedence, right-partitioned so the left side keeps the
    /// larger subexpression. `^` partitions leftmost instead, making it
    /// right-associative.
    fn evaluate(&mut self, expr: &str) -> Value {
        let expr = expr.trim();

        if is_string_literal(expr) {
            return Value::Str(expr.to_string());
        }
        if expr == "true" {
            return Value::Bool(true);
        }
        if expr == "false" {
            return Value::Bool(false);
        }

        if !expr.contains(' ') {
            if expr.contains('.') {
                if let Ok(float) = expr.parse::<f64>() {
                    return Value::Float(float);
                }
            } else if let Ok(int) = expr.parse::<i64>() {
                return Value::Int(int);
            }
        }

        if let Some(value) = self.variables.get(expr) {
            return value.clone();
        }

        if let Some(operand) = expr.strip_prefix("! ") {
            let value = self.evaluate(operand);
            return Value::Bool(!value.as_bool());
        }

        if let Some((left, right)) = rpartition(expr, "||") {
            return self.apply_binary("||", left, right);
        }
        if let Some((left, right)) = rpartition(expr, "&&") {
            return self.apply_binary("&&", left, right);
        }
        for op in RELATIONAL_OPS {
            if let Some((left, right)) = rpartition(expr, op) {
                return self.apply_binary(op, left, right);
            }
        }
        for op in ADDITIVE_OPS {
            if let Some((left, right)) = rpartition(expr, op) {
                return self.apply_binary(op, left, right);
            }
        }
        for op in MULTIPLICATIVE_OPS {
            if let Some((left, right)) = rpartition(expr, op) {
                return self.apply_binary(op, left, right);
            }
        }
        if let Some((left, right)) = lpartition(expr, "^") {
            return self.apply_binary("^", left, right);
        }

        self.diagnostics
            .push(format!("could not evaluate expression: '{expr}'"));
        Value::Int(0)
    }

    fn apply_binary(&mut self, op: &str, left: &str, right: &str) -> Value {
        let left = self.evaluate(left);
        let right = self.evaluate(right);
        self.apply_operator(op, left, right)
    }

    fn apply_operator(&mut self, op: &str, left: Value, right: Value) -> Value {
        match op {
            "+" => {
                if let (Value::Str(l), Value::Str(r)) = (&left, &right) {
                    // Concatenation joins the contents and yields one quoted
                    // literal again.
                    return Value::Str(format!("\"{}{}\"", strip_quotes(l), strip_quotes(r)));
                }
                self.arithmetic(op, left, right, i64::checked_add, |l, r| l + r)
            }
            "-" => self.arithmetic(op, left, right, i64::checked_sub, |l, r| l - r),
            "*" => self.arithmetic(op, left, right, i64::checked_mul, |l, r| l * r),
            "/" => {
                if right.as_f64() == Some(0.0) {
                    self.diagnostics.push("division by zero".to_string());
                    return Value::Int(0);
                }
                match Value::both_ints(&left, &right) {
                    // Integer division truncates toward zero.
                    Some((l, r)) => Value::Int(l / r),
                    None => self.float_arithmetic(op, &left, &right, |l, r| l / r),
                }
            }
            "%" => {
                if right.as_f64() == Some(0.0) {
                    self.diagnostics.push("modulo by zero".to_string());
                    return Value::Int(0);
                }
                match Value::both_ints(&left, &right) {
                    Some((l, r)) => Value::Int(l % r),
                    None => self.float_arithmetic(op, &left, &right, |l, r| l % r),
                }
            }
            "^" => match Value::both_ints(&left, &right) {
                Some((l, r)) if r >= 0 => {
                    let value = u32::try_from(r).ok().and_then(|exp| l.checked_pow(exp));
                    match value {
                        Some(v) => Value::Int(v),
                        None => {
                            self.diagnostics
                                .push(format!("arithmetic overflow in operation '{op}'"));
                            Value::Int(0)
                        }
                    }
                }
                _ => self.float_arithmetic(op, &left, &right, f64::powf),
            },
            "==" => Value::Bool(values_equal(&left, &right)),
            "!=" => Value::Bool(!values_equal(&left, &right)),
            "<" | ">" | "<=" | ">=" => match compare(&left, &right) {
                Some(ordering) => Value::Bool(match op {
                    "<" => ordering.is_lt(),
                    ">" => ordering.is_gt(),
                    "<=" => ordering.is_le(),
                    _ => ordering.is_ge(),
                }),
                None => {
                    self.diagnostics.push(format!("error in operation '{op}'"));
                    Value::Int(0)
                }
            },
            "&&" => Value::Bool(left.as_bool() && right.as_bool()),
            "||" => Value::Bool(left.as_bool() || right.as_bool()),
            _ => {
                self.diagnostics.push(format!("unknown operator: {op}"));
                Value::Int(0)
            }
        }
    }

    /// `+ - *`: exact when both operands are integers, float otherwise.
    fn arithmetic(
        &mut self,
        op: &str,
        left: Value,
        right: Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Value {
        match Value::both_ints(&left, &right) {
            Some((l, r)) => match int_op(l, r) {
                Some(value) => Value::Int(value),
                None => {
                    self.diagnostics
                        .push(format!("arithmetic overflow in operation '{op}'"));
                    Value::Int(0)
                }
            },
            None => self.float_arithmetic(op, &left, &right, float_op),
        }
    }

    fn float_arithmetic(
        &mut self,
        op: &str,
        left: &Value,
        right: &Value,
        float_op: fn(f64, f64) -> f64,
    ) -> Value {
        match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => Value::Float(float_op(l, r)),
            _ => {
                self.diagnostics.push(format!("error in operation '{op}'"));
                Value::Int(0)
            }
        }
    }
}

fn is_temporary(name: &str) -> bool {
    name.strip_prefix('t')
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Whether the whole span is exactly one double-quoted literal (escapes
/// respected). An expression that merely starts and ends with a quote, like
/// `"a" + "b"`, is not a literal and must go through operator partitioning.
fn is_string_literal(expr: &str) -> bool {
    let Some(inner) = expr.strip_prefix('"') else {
        return false;
    };
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => return chars.as_str().is_empty(),
            _ => {}
        }
    }
    false
}

/// The content of a quoted literal; anything else passes through unchanged.
fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Split on the rightmost ` <op> `, spaces included.
fn rpartition<'a>(expr: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    let pattern = format!(" {op} ");
    expr.rfind(&pattern)
        .map(|at| (&expr[..at], &expr[at + pattern.len()..]))
}

/// Split on the leftmost ` <op> `, spaces included.
fn lpartition<'a>(expr: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    let pattern = format!(" {op} ");
    expr.find(&pattern)
        .map(|at| (&expr[..at], &expr[at + pattern.len()..]))
}

fn values_equal(left: &Value, right: &Value) -> bool {
    if left.is_numeric() && right.is_numeric() {
        return left.as_f64() == right.as_f64();
    }
    match (left, right) {
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Str(l), Value::Str(r)) => l == r,
        (Value::Nil, Value::Nil) => true,
        _ => false,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if left.is_numeric() && right.is_numeric() {
        return left.as_f64()?.partial_cmp(&right.as_f64()?);
    }
    match (left, right) {
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        _ => None,
    }
}
