//! Basic-block intermediate representation and its builder.
//!
//! A [`Module`] owns functions in declaration order; a [`Function`] owns
//! basic blocks in creation order; a [`BasicBlock`] owns an instruction
//! list and at most one terminator. The [`Builder`] wraps a module with
//! an insertion cursor, so the code generator only ever appends at the
//! cursor and never edits blocks in place.
//!
//! Everything is stored in vectors, so formatting a module twice yields
//! byte-identical text. The textual form follows the LLVM assembly
//! grammar: `define`/`declare` headers, labelled blocks, and typed
//! three-address instructions. Floating-point constants are printed in
//! the 64-bit hexadecimal form, which is always exact.

use std::collections::HashMap;
use std::fmt;

/// Primitive value types carried by registers and constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrType {
    I1,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Ptr,
    Void,
}

impl IrType {
    pub fn is_float(self) -> bool {
        matches!(self, IrType::F32 | IrType::F64)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IrType::I1 => "i1",
            IrType::I8 => "i8",
            IrType::I16 => "i16",
            IrType::I32 => "i32",
            IrType::I64 => "i64",
            IrType::F32 => "float",
            IrType::F64 => "double",
            IrType::Ptr => "ptr",
            IrType::Void => "void",
        };
        f.write_str(text)
    }
}

/// An SSA operand: a register produced by an instruction or parameter,
/// an immediate constant, or the undefined placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Reg { id: u32, ty: IrType },
    ConstInt { ty: IrType, value: i64 },
    ConstFloat { ty: IrType, value: f64 },
    Undef(IrType),
}

impl Value {
    pub fn ty(self) -> IrType {
        match self {
            Value::Reg { ty, .. } => ty,
            Value::ConstInt { ty, .. } => ty,
            Value::ConstFloat { ty, .. } => ty,
            Value::Undef(ty) => ty,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Reg { id, .. } => write!(f, "%t{}", id),
            Value::ConstInt { value, .. } => write!(f, "{}", value),
            // The value is already rounded to the constant's own width;
            // its 64-bit image is exact in this form.
            Value::ConstFloat { value, .. } => write!(f, "0x{:016X}", value.to_bits()),
            Value::Undef(_) => f.write_str("undef"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    And,
    Or,
    Xor,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::SRem => "srem",
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::FRem => "frem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        };
        f.write_str(text)
    }
}

/// Signed integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpCond {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl fmt::Display for IcmpCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IcmpCond::Eq => "eq",
            IcmpCond::Ne => "ne",
            IcmpCond::Slt => "slt",
            IcmpCond::Sle => "sle",
            IcmpCond::Sgt => "sgt",
            IcmpCond::Sge => "sge",
        };
        f.write_str(text)
    }
}

/// Ordered floating-point comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcmpCond {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl fmt::Display for FcmpCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FcmpCond::Oeq => "oeq",
            FcmpCond::One => "one",
            FcmpCond::Olt => "olt",
            FcmpCond::Ole => "ole",
            FcmpCond::Ogt => "ogt",
            FcmpCond::Oge => "oge",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Alloca {
        dest: Value,
        ty: IrType,
    },
    Load {
        dest: Value,
        ty: IrType,
        slot: Value,
    },
    Store {
        value: Value,
        slot: Value,
    },
    Binary {
        dest: Value,
        op: BinOp,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        dest: Value,
        cond: IcmpCond,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    Fcmp {
        dest: Value,
        cond: FcmpCond,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    Fneg {
        dest: Value,
        ty: IrType,
        value: Value,
    },
    Select {
        dest: Value,
        cond: Value,
        ty: IrType,
        then_value: Value,
        else_value: Value,
    },
    Call {
        dest: Option<Value>,
        ret: IrType,
        callee: String,
        args: Vec<Value>,
    },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Alloca { dest, ty } => write!(f, "{} = alloca {}", dest, ty),
            Instr::Load { dest, ty, slot } => {
                write!(f, "{} = load {}, ptr {}", dest, ty, slot)
            }
            Instr::Store { value, slot } => {
                write!(f, "store {} {}, ptr {}", value.ty(), value, slot)
            }
            Instr::Binary {
                dest,
                op,
                ty,
                lhs,
                rhs,
            } => write!(f, "{} = {} {} {}, {}", dest, op, ty, lhs, rhs),
            Instr::Icmp {
                dest,
                cond,
                ty,
                lhs,
                rhs,
            } => write!(f, "{} = icmp {} {} {}, {}", dest, cond, ty, lhs, rhs),
            Instr::Fcmp {
                dest,
                cond,
                ty,
                lhs,
                rhs,
            } => write!(f, "{} = fcmp {} {} {}, {}", dest, cond, ty, lhs, rhs),
            Instr::Fneg { dest, ty, value } => write!(f, "{} = fneg {} {}", dest, ty, value),
            Instr::Select {
                dest,
                cond,
                ty,
                then_value,
                else_value,
            } => write!(
                f,
                "{} = select i1 {}, {} {}, {} {}",
                dest, cond, ty, then_value, ty, else_value
            ),
            Instr::Call {
                dest,
                ret,
                callee,
                args,
            } => {
                if let Some(dest) = dest {
                    write!(f, "{} = ", dest)?;
                }
                write!(f, "call {} @{}(", ret, callee)?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", arg.ty(), arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// The single control transfer ending a basic block.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Br { target: BlockId },
    CondBr { cond: Value, then_block: BlockId, else_block: BlockId },
    Ret { value: Option<Value> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockId(pub usize);

#[derive(Debug)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instr>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, IrType)>,
    pub return_type: IrType,
    pub blocks: Vec<BasicBlock>,
    next_reg: u32,
}

impl Function {
    fn new(name: String, params: Vec<(String, IrType)>, return_type: IrType) -> Self {
        // Parameters occupy the first registers.
        let next_reg = params.len() as u32;
        Function {
            name,
            params,
            return_type,
            blocks: Vec::new(),
            next_reg,
        }
    }

    /// Functions left without a body print as `declare` headers.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|func| func.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        for func in &self.functions {
            writeln!(f)?;
            let keyword = if func.is_declaration() { "declare" } else { "define" };
            write!(f, "{} {} @{}(", keyword, func.return_type, func.name)?;
            for (index, (_, ty)) in func.params.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} %t{}", ty, index)?;
            }
            if func.is_declaration() {
                writeln!(f, ")")?;
                continue;
            }
            writeln!(f, ") {{")?;
            for block in &func.blocks {
                writeln!(f, "{}:", block.label)?;
                for instr in &block.instructions {
                    writeln!(f, "  {}", instr)?;
                }
                match &block.terminator {
                    Some(Terminator::Br { target }) => {
                        writeln!(f, "  br label %{}", func.blocks[target.0].label)?;
                    }
                    Some(Terminator::CondBr {
                        cond,
                        then_block,
                        else_block,
                    }) => {
                        writeln!(
                            f,
                            "  br i1 {}, label %{}, label %{}",
                            cond, func.blocks[then_block.0].label, func.blocks[else_block.0].label
                        )?;
                    }
                    Some(Terminator::Ret { value: Some(value) }) => {
                        writeln!(f, "  ret {} {}", value.ty(), value)?;
                    }
                    Some(Terminator::Ret { value: None }) => {
                        writeln!(f, "  ret void")?;
                    }
                    None => {}
                }
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

/// Append-only module builder with an insertion cursor.
///
/// Instructions and terminators land in the cursor's block. Appends into
/// a block that already has its terminator are silently dropped, so code
/// lowered after a `return` cannot corrupt the block structure.
#[derive(Debug)]
pub struct Builder {
    module: Module,
    function: Option<usize>,
    block: Option<BlockId>,
    label_counts: HashMap<String, u32>,
}

impl Builder {
    pub fn new(module_name: impl Into<String>) -> Self {
        Builder {
            module: Module::new(module_name),
            function: None,
            block: None,
            label_counts: HashMap::new(),
        }
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    // -----------------------------------------------------------------
    // Functions and blocks
    // -----------------------------------------------------------------

    pub fn declare_function(
        &mut self,
        name: impl Into<String>,
        params: Vec<(String, IrType)>,
        return_type: IrType,
    ) {
        self.module
            .functions
            .push(Function::new(name.into(), params, return_type));
    }

    /// Moves the cursor to a previously declared function. The insertion
    /// block is cleared; the caller creates an entry block next.
    pub fn select_function(&mut self, name: &str) -> bool {
        let index = self
            .module
            .functions
            .iter()
            .position(|func| func.name == name);
        match index {
            Some(index) => {
                self.function = Some(index);
                self.block = None;
                self.label_counts.clear();
                true
            }
            None => false,
        }
    }

    pub fn param_value(&self, index: usize) -> Option<Value> {
        let func = &self.module.functions[self.function?];
        let ty = func.params.get(index)?.1;
        Some(Value::Reg {
            id: index as u32,
            ty,
        })
    }

    pub fn return_type(&self) -> Option<IrType> {
        Some(self.module.functions[self.function?].return_type)
    }

    /// Creates a block in the current function. The label hint is made
    /// unique with a per-function counter.
    pub fn create_block(&mut self, hint: &str) -> BlockId {
        let Some(function) = self.function else {
            return BlockId(0);
        };
        let count = self.label_counts.entry(hint.to_string()).or_insert(0);
        let label = if *count == 0 {
            hint.to_string()
        } else {
            format!("{}{}", hint, count)
        };
        *count += 1;

        let func = &mut self.module.functions[function];
        func.blocks.push(BasicBlock {
            label,
            instructions: Vec::new(),
            terminator: None,
        });
        BlockId(func.blocks.len() - 1)
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.block = Some(block);
    }

    pub fn current_block_terminated(&self) -> bool {
        match (self.function, self.block) {
            (Some(function), Some(block)) => {
                self.module.functions[function].blocks[block.0].terminator.is_some()
            }
            _ => true,
        }
    }

    // -----------------------------------------------------------------
    // Instructions
    // -----------------------------------------------------------------

    fn fresh_reg(&mut self, ty: IrType) -> Value {
        let Some(function) = self.function else {
            return Value::Undef(ty);
        };
        let func = &mut self.module.functions[function];
        let id = func.next_reg;
        func.next_reg += 1;
        Value::Reg { id, ty }
    }

    fn push(&mut self, instr: Instr) {
        let (Some(function), Some(block)) = (self.function, self.block) else {
            return;
        };
        let block = &mut self.module.functions[function].blocks[block.0];
        if block.terminator.is_some() {
            return;
        }
        block.instructions.push(instr);
    }

    pub fn alloca(&mut self, ty: IrType) -> Value {
        let dest = self.fresh_reg(IrType::Ptr);
        self.push(Instr::Alloca { dest, ty });
        dest
    }

    pub fn load(&mut self, ty: IrType, slot: Value) -> Value {
        let dest = self.fresh_reg(ty);
        self.push(Instr::Load { dest, ty, slot });
        dest
    }

    pub fn store(&mut self, value: Value, slot: Value) {
        self.push(Instr::Store { value, slot });
    }

    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        let ty = lhs.ty();
        let dest = self.fresh_reg(ty);
        self.push(Instr::Binary {
            dest,
            op,
            ty,
            lhs,
            rhs,
        });
        dest
    }

    pub fn icmp(&mut self, cond: IcmpCond, lhs: Value, rhs: Value) -> Value {
        let dest = self.fresh_reg(IrType::I1);
        self.push(Instr::Icmp {
            dest,
            cond,
            ty: lhs.ty(),
            lhs,
            rhs,
        });
        dest
    }

    pub fn fcmp(&mut self, cond: FcmpCond, lhs: Value, rhs: Value) -> Value {
        let dest = self.fresh_reg(IrType::I1);
        self.push(Instr::Fcmp {
            dest,
            cond,
            ty: lhs.ty(),
            lhs,
            rhs,
        });
        dest
    }

    /// Integer negation, `sub ty 0, value`.
    pub fn neg(&mut self, value: Value) -> Value {
        self.binary(
            BinOp::Sub,
            Value::ConstInt {
                ty: value.ty(),
                value: 0,
            },
            value,
        )
    }

    pub fn fneg(&mut self, value: Value) -> Value {
        let ty = value.ty();
        let dest = self.fresh_reg(ty);
        self.push(Instr::Fneg { dest, ty, value });
        dest
    }

    /// Bitwise complement, `xor ty value, -1`; on i1 this is logical not.
    pub fn not(&mut self, value: Value) -> Value {
        self.binary(
            BinOp::Xor,
            value,
            Value::ConstInt {
                ty: value.ty(),
                value: -1,
            },
        )
    }

    pub fn select(&mut self, cond: Value, then_value: Value, else_value: Value) -> Value {
        let ty = then_value.ty();
        let dest = self.fresh_reg(ty);
        self.push(Instr::Select {
            dest,
            cond,
            ty,
            then_value,
            else_value,
        });
        dest
    }

    pub fn call(&mut self, callee: impl Into<String>, ret: IrType, args: Vec<Value>) -> Value {
        if ret == IrType::Void {
            self.push(Instr::Call {
                dest: None,
                ret,
                callee: callee.into(),
                args,
            });
            return Value::Undef(IrType::I32);
        }
        let dest = self.fresh_reg(ret);
        self.push(Instr::Call {
            dest: Some(dest),
            ret,
            callee: callee.into(),
            args,
        });
        dest
    }

    // -----------------------------------------------------------------
    // Terminators
    // -----------------------------------------------------------------

    fn terminate(&mut self, terminator: Terminator) {
        let (Some(function), Some(block)) = (self.function, self.block) else {
            return;
        };
        let block = &mut self.module.functions[function].blocks[block.0];
        if block.terminator.is_some() {
            return;
        }
        block.terminator = Some(terminator);
    }

    pub fn br(&mut self, target: BlockId) {
        self.terminate(Terminator::Br { target });
    }

    pub fn cond_br(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) {
        self.terminate(Terminator::CondBr {
            cond,
            then_block,
            else_block,
        });
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.terminate(Terminator::Ret { value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn const_i32(value: i64) -> Value {
        Value::ConstInt {
            ty: IrType::I32,
            value,
        }
    }

    #[test]
    fn emits_a_straight_line_function() {
        let mut builder = Builder::new("main");
        builder.declare_function("answer", Vec::new(), IrType::I32);
        assert!(builder.select_function("answer"));

        let entry = builder.create_block("entry");
        builder.set_insert_point(entry);
        let sum = builder.binary(BinOp::Add, const_i32(40), const_i32(2));
        builder.ret(Some(sum));

        let text = builder.into_module().to_string();
        assert_eq!(
            text,
            "; ModuleID = 'main'\n\
             \n\
             define i32 @answer() {\n\
             entry:\n\
             \x20 %t0 = add i32 40, 2\n\
             \x20 ret i32 %t0\n\
             }\n"
        );
    }

    #[test]
    fn parameters_take_the_first_registers() {
        let mut builder = Builder::new("main");
        builder.declare_function(
            "add",
            vec![
                ("a".to_string(), IrType::I32),
                ("b".to_string(), IrType::I32),
            ],
            IrType::I32,
        );
        builder.select_function("add");

        let entry = builder.create_block("entry");
        builder.set_insert_point(entry);
        let a = builder.param_value(0).unwrap();
        let b = builder.param_value(1).unwrap();
        let sum = builder.binary(BinOp::Add, a, b);
        builder.ret(Some(sum));

        let text = builder.into_module().to_string();
        assert!(text.contains("define i32 @add(i32 %t0, i32 %t1)"));
        assert!(text.contains("%t2 = add i32 %t0, %t1"));
    }

    #[test]
    fn appends_after_terminator_are_dropped() {
        let mut builder = Builder::new("main");
        builder.declare_function("f", Vec::new(), IrType::I32);
        builder.select_function("f");

        let entry = builder.create_block("entry");
        builder.set_insert_point(entry);
        builder.ret(Some(const_i32(1)));
        builder.binary(BinOp::Add, const_i32(1), const_i32(2));
        builder.ret(Some(const_i32(2)));

        let module = builder.into_module();
        let block = &module.function("f").unwrap().blocks[0];
        assert!(block.instructions.is_empty());
        assert_eq!(
            block.terminator,
            Some(Terminator::Ret {
                value: Some(const_i32(1))
            })
        );
    }

    #[test]
    fn block_labels_are_uniquified_per_function() {
        let mut builder = Builder::new("main");
        builder.declare_function("f", Vec::new(), IrType::Void);
        builder.select_function("f");

        builder.create_block("then");
        builder.create_block("then");
        let third = builder.create_block("then");
        builder.set_insert_point(third);
        builder.ret(None);

        let module = builder.into_module();
        let labels: Vec<&str> = module.function("f").unwrap().blocks
            .iter()
            .map(|block| block.label.as_str())
            .collect();
        assert_eq!(labels, vec!["then", "then1", "then2"]);
    }

    #[test]
    fn bodyless_function_prints_as_declare() {
        let mut builder = Builder::new("main");
        builder.declare_function(
            "putchar",
            vec![("c".to_string(), IrType::I32)],
            IrType::I32,
        );
        let text = builder.into_module().to_string();
        assert!(text.contains("declare i32 @putchar(i32 %t0)"));
    }

    #[test]
    fn float_constants_print_in_exact_hex_form() {
        let value = Value::ConstFloat {
            ty: IrType::F64,
            value: 1.5,
        };
        assert_eq!(value.to_string(), "0x3FF8000000000000");
    }

    #[test]
    fn conditional_branch_references_block_labels() {
        let mut builder = Builder::new("main");
        builder.declare_function("f", Vec::new(), IrType::Void);
        builder.select_function("f");

        let entry = builder.create_block("entry");
        let then_block = builder.create_block("then");
        let merge = builder.create_block("ifcont");

        builder.set_insert_point(entry);
        let cond = builder.icmp(IcmpCond::Slt, const_i32(1), const_i32(2));
        builder.cond_br(cond, then_block, merge);

        builder.set_insert_point(then_block);
        builder.br(merge);

        builder.set_insert_point(merge);
        builder.ret(None);

        let text = builder.into_module().to_string();
        assert!(text.contains("%t0 = icmp slt i32 1, 2"));
        assert!(text.contains("br i1 %t0, label %then, label %ifcont"));
        assert!(text.contains("br label %ifcont"));
    }
}
