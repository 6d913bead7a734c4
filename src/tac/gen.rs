//! Lowering from the annotated AST to a flat TAC program.
//!
//! Every expression subtree reports the operand (variable, temporary or
//! literal spelling) holding its result; composite nodes allocate one fresh
//! temporary and emit one instruction. `&&`/`||` are lowered strictly — both
//! operands are always evaluated — which matches the interpreter's strict
//! operators.

use log::debug;

use crate::parser::{AstNode, NodeKind};

use super::{Instruction, Program};

#[derive(Default)]
pub struct CodeGenerator {
    instructions: Vec<Instruction>,
    temp_counter: usize,
    label_counter: usize,
}

fn is_expression(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ExpresionSimple
            | NodeKind::Termino
            | NodeKind::Factor
            | NodeKind::ExpresionRelacional
            | NodeKind::ExpresionLogica
            | NodeKind::Id
            | NodeKind::Numero
            | NodeKind::Bool
            | NodeKind::Cadena
    )
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower a whole program, consuming the generator.
    pub fn generate(mut self, ast: &AstNode) -> Program {
        self.emit(Instruction::Comment("Inicio del Programa".to_string()));
        self.visit(ast);
        self.emit(Instruction::Comment("Fin del Programa".to_string()));
        self.emit(Instruction::Halt);

        debug!(
            "generated {} TAC instructions ({} temps, {} labels)",
            self.instructions.len(),
            self.temp_counter,
            self.label_counter
        );
        Program::from_instructions(self.instructions)
    }

    fn new_temp(&mut self) -> String {
        let temp = format!("t{}", self.temp_counter);
        self.temp_counter += 1;
        temp
    }

    fn new_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn visit_children(&mut self, node: &AstNode) {
        for child in &node.children {
            self.visit(child);
        }
    }

    /// Lower one node, returning the operand that holds its value (leaves
    /// and expressions only).
    fn visit(&mut self, node: &AstNode) -> Option<String> {
        match node.kind {
            NodeKind::Programa
            | NodeKind::ListaDeclaracion
            | NodeKind::ListaSentencias
            | NodeKind::ThenBlock
            | NodeKind::ElseBlock
            | NodeKind::Cuerpo => {
                self.visit_children(node);
                None
            }
            NodeKind::Condicion => node.children.first().and_then(|child| self.visit(child)),
            NodeKind::DeclaracionVariable => {
                let ty = node.value_str().to_string();
                for child in &node.children {
                    if child.kind == NodeKind::Id {
                        self.emit(Instruction::Declare {
                            name: child.value_str().to_string(),
                            ty: ty.clone(),
                        });
                    }
                }
                None
            }
            NodeKind::Asignacion => self.visit_asignacion(node),
            NodeKind::Seleccion => self.visit_seleccion(node),
            NodeKind::Iteracion => self.visit_iteracion(node),
            NodeKind::Repeticion => self.visit_repeticion(node),
            NodeKind::SentIn => {
                for child in &node.children {
                    if child.kind == NodeKind::Id {
                        self.emit(Instruction::Read(child.value_str().to_string()));
                    }
                }
                None
            }
            NodeKind::SentOut => self.visit_sent_out(node),
            NodeKind::ExpresionSimple
            | NodeKind::Termino
            | NodeKind::Factor
            | NodeKind::ExpresionRelacional => self.visit_binary(node),
            NodeKind::ExpresionLogica => self.visit_logical(node),
            NodeKind::Id | NodeKind::Numero | NodeKind::Bool | NodeKind::Cadena => {
                node.value.clone()
            }
            _ => None,
        }
    }

    fn visit_asignacion(&mut self, node: &AstNode) -> Option<String> {
        if node.children.len() < 2 {
            return None;
        }

        let dest = node.children[0].value_str().to_string();
        let rhs = &node.children[1];

        if rhs.kind == NodeKind::Cadena {
            // String assignment keeps its quotes.
            self.emit(Instruction::Assign {
                dest,
                expr: rhs.value_str().to_string(),
            });
        } else if let Some(result) = self.visit(rhs) {
            self.emit(Instruction::Assign { dest, expr: result });
        }

        None
    }

    fn visit_seleccion(&mut self, node: &AstNode) -> Option<String> {
        let condition = node.children.iter().find(|child| is_expression(child.kind))?;
        let then_block = node.find_child(NodeKind::ThenBlock);
        let else_block = node.find_child(NodeKind::ElseBlock);

        let cond_result = self.visit(condition).unwrap_or_else(|| "0".to_string());

        let label_else = self.new_label();
        let label_end = self.new_label();

        self.emit(Instruction::IfFalse {
            cond: cond_result,
            label: label_else.clone(),
        });

        if let Some(block) = then_block {
            self.visit_children(block);
        }

        self.emit(Instruction::Goto(label_end.clone()));

        // The else-less case still gets both labels.
        self.emit(Instruction::Label(label_else));
        if let Some(block) = else_block {
            self.visit_children(block);
        }

        self.emit(Instruction::Label(label_end));
        None
    }

    fn visit_iteracion(&mut self, node: &AstNode) -> Option<String> {
        let condition = node.find_child(NodeKind::Condicion)?;
        let body = node.find_child(NodeKind::Cuerpo);

        let label_start = self.new_label();
        let label_end = self.new_label();

        self.emit(Instruction::Label(label_start.clone()));

        if let Some(expression) = condition.children.first() {
            let cond_result = self.visit(expression).unwrap_or_else(|| "0".to_string());
            self.emit(Instruction::IfFalse {
                cond: cond_result,
                label: label_end.clone(),
            });
        }

        if let Some(body) = body {
            self.visit_children(body);
        }

        self.emit(Instruction::Goto(label_start));
        self.emit(Instruction::Label(label_end));
        None
    }

    /// `until` loops while the condition is false, so the conditional jump
    /// goes backwards.
    fn visit_repeticion(&mut self, node: &AstNode) -> Option<String> {
        let body = node.find_child(NodeKind::Cuerpo);
        let condition = node.find_child(NodeKind::Condicion);

        let label_start = self.new_label();
        self.emit(Instruction::Label(label_start.clone()));

        if let Some(body) = body {
            self.visit_children(body);
        }

        if let Some(expression) = condition.and_then(|c| c.children.first()) {
            let cond_result = self.visit(expression).unwrap_or_else(|| "0".to_string());
            self.emit(Instruction::IfFalse {
                cond: cond_result,
                label: label_start,
            });
        }

        None
    }

    fn visit_sent_out(&mut self, node: &AstNode) -> Option<String> {
        for child in &node.children {
            match child.kind {
                NodeKind::Cadena => {
                    self.emit(Instruction::Write(child.value_str().to_string()));
                }
                NodeKind::Cout | NodeKind::StreamWrite => {}
                _ => {
                    if let Some(result) = self.visit(child) {
                        self.emit(Instruction::Write(result));
                    }
                }
            }
        }
        None
    }

    fn visit_binary(&mut self, node: &AstNode) -> Option<String> {
        if node.children.len() < 2 {
            return None;
        }

        let op = node.value_str().to_string();
        let left = self.visit(&node.children[0])?;
        let right = self.visit(&node.children[1])?;

        let temp = self.new_temp();
        self.emit(Instruction::Assign {
            dest: temp.clone(),
            expr: format!("{left} {op} {right}"),
        });
        Some(temp)
    }

    fn visit_logical(&mut self, node: &AstNode) -> Option<String> {
        if node.value_str() == "!" {
            let operand = self.visit(node.children.first()?)?;
            let temp = self.new_temp();
            self.emit(Instruction::Assign {
                dest: temp.clone(),
                expr: format!("! {operand}"),
            });
            return Some(temp);
        }

        self.visit_binary(node)
    }
}
