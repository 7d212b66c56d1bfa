//! Bantam AST node definitions
//!
//! The tree is built by the parser and handed to the semantic phase,
//! which resolves the static type of every expression in place. Each
//! expression node carries a line number and a resolved-type slot that
//! the type checker writes exactly once; the slot starts out `None` and
//! is `Some` for every reachable expression after the pass.

use crate::ty::Ty;

/// A complete parsed program: one or more class declarations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub classes: Vec<Class>,
}

impl Program {
    pub fn new(classes: Vec<Class>) -> Self {
        Self { classes }
    }
}

/// A class declaration: `class Dog extends Animal { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub line: u32,
    pub name: String,
    /// Parent class name; `None` means the class extends `Object`.
    pub parent: Option<String>,
    /// Source file the class was parsed from, carried for diagnostics.
    pub file: String,
    pub members: Vec<Member>,
}

impl Class {
    pub fn new(
        line: u32,
        name: impl Into<String>,
        parent: Option<&str>,
        file: impl Into<String>,
        members: Vec<Member>,
    ) -> Self {
        Self {
            line,
            name: name.into(),
            parent: parent.map(str::to_string),
            file: file.into(),
            members,
        }
    }
}

/// A class member.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(Field),
    Method(Method),
}

/// A field declaration: `int count = 0;`
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub line: u32,
    pub name: String,
    /// Declared type name as written in source.
    pub declared_type: String,
    pub init: Option<Expr>,
}

impl Field {
    pub fn new(
        line: u32,
        name: impl Into<String>,
        declared_type: impl Into<String>,
        init: Option<Expr>,
    ) -> Self {
        Self {
            line,
            name: name.into(),
            declared_type: declared_type.into(),
            init,
        }
    }
}

/// A method declaration: `int area(int w, int h) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub line: u32,
    pub name: String,
    /// Declared return type name; may be `void`.
    pub return_type: String,
    pub formals: Vec<Formal>,
    pub body: Vec<Stmt>,
}

impl Method {
    pub fn new(
        line: u32,
        name: impl Into<String>,
        return_type: impl Into<String>,
        formals: Vec<Formal>,
        body: Vec<Stmt>,
    ) -> Self {
        Self {
            line,
            name: name.into(),
            return_type: return_type.into(),
            formals,
            body,
        }
    }
}

/// A formal parameter of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct Formal {
    pub line: u32,
    pub name: String,
    pub declared_type: String,
}

impl Formal {
    pub fn new(line: u32, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            line,
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// A statement together with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: u32,
    pub kind: StmtKind,
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// An expression evaluated for its effect: `x.bark();`
    Expr(Expr),
    /// A local declaration: `var x = init;` The declared type is
    /// inferred from the initializer; the checker records it in `ty`.
    Decl {
        name: String,
        init: Expr,
        ty: Option<Ty>,
    },
    /// `if (pred) then else alt`
    If {
        pred: Expr,
        then_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
    },
    /// `while (pred) body`
    While { pred: Expr, body: Box<Stmt> },
    /// `for (init; pred; update) body`; all three header slots optional
    For {
        init: Option<Expr>,
        pred: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `break;`
    Break,
    /// `return;` or `return expr;`
    Return(Option<Expr>),
    /// `{ ... }`
    Block(Vec<Stmt>),
}

impl Stmt {
    pub fn new(line: u32, kind: StmtKind) -> Self {
        Self { line, kind }
    }

    pub fn expr(line: u32, expr: Expr) -> Self {
        Self::new(line, StmtKind::Expr(expr))
    }

    pub fn decl(line: u32, name: impl Into<String>, init: Expr) -> Self {
        Self::new(
            line,
            StmtKind::Decl {
                name: name.into(),
                init,
                ty: None,
            },
        )
    }

    pub fn if_stmt(line: u32, pred: Expr, then_stmt: Stmt, else_stmt: Option<Stmt>) -> Self {
        Self::new(
            line,
            StmtKind::If {
                pred,
                then_stmt: Box::new(then_stmt),
                else_stmt: else_stmt.map(Box::new),
            },
        )
    }

    pub fn while_stmt(line: u32, pred: Expr, body: Stmt) -> Self {
        Self::new(
            line,
            StmtKind::While {
                pred,
                body: Box::new(body),
            },
        )
    }

    pub fn for_stmt(
        line: u32,
        init: Option<Expr>,
        pred: Option<Expr>,
        update: Option<Expr>,
        body: Stmt,
    ) -> Self {
        Self::new(
            line,
            StmtKind::For {
                init,
                pred,
                update,
                body: Box::new(body),
            },
        )
    }

    pub fn break_stmt(line: u32) -> Self {
        Self::new(line, StmtKind::Break)
    }

    pub fn return_stmt(line: u32, expr: Option<Expr>) -> Self {
        Self::new(line, StmtKind::Return(expr))
    }

    pub fn block(line: u32, stmts: Vec<Stmt>) -> Self {
        Self::new(line, StmtKind::Block(stmts))
    }
}

/// An expression with its source line and resolved-type slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub line: u32,
    /// Written exactly once by the type checker.
    pub ty: Option<Ty>,
    pub kind: ExprKind,
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A method call, optionally qualified: `foo(a)`, `this.foo(a)`,
    /// `super.foo(a)`, `x.foo(a)`, `this.x.foo(a)`
    Dispatch {
        reference: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
    },
    /// `new Dog()`
    New { class_name: String },
    /// `(Animal) expr`; `up_cast` records a statically-known widening
    /// for the benefit of later phases.
    Cast {
        target: String,
        operand: Box<Expr>,
        up_cast: bool,
    },
    /// `expr instanceof Animal`; `up_check` records whether the check
    /// is a statically-known upcast (`Some(true)`) or downcast
    /// (`Some(false)`).
    InstanceOf {
        operand: Box<Expr>,
        target: String,
        up_check: Option<bool>,
    },
    /// A binary operator application.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// A unary operator application.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// A variable reference, optionally qualified by `this`/`super`:
    /// `x`, `this.x`, `super.x`
    Var {
        reference: Option<Box<Expr>>,
        name: String,
    },
    /// An assignment: `x = e` or `this.x = e` / `super.x = e`
    Assign {
        ref_name: Option<String>,
        name: String,
        value: Box<Expr>,
    },
    /// `42`
    IntConst(i64),
    /// `true` / `false`
    BoolConst(bool),
    /// `"hello"`
    StringConst(String),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Divide,
    Modulus,
    Lt,
    Leq,
    Gt,
    Geq,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    /// The operator's source spelling, for error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Times => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulus => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Geq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation `-e`
    Neg,
    /// Logical negation `!e`
    Not,
    /// Increment `e++` / `++e`
    Incr,
    /// Decrement `e--` / `--e`
    Decr,
}

impl Expr {
    pub fn new(line: u32, kind: ExprKind) -> Self {
        Self {
            line,
            ty: None,
            kind,
        }
    }

    pub fn int_const(line: u32, value: i64) -> Self {
        Self::new(line, ExprKind::IntConst(value))
    }

    pub fn bool_const(line: u32, value: bool) -> Self {
        Self::new(line, ExprKind::BoolConst(value))
    }

    pub fn string_const(line: u32, value: impl Into<String>) -> Self {
        Self::new(line, ExprKind::StringConst(value.into()))
    }

    /// An unqualified variable reference.
    pub fn var(line: u32, name: impl Into<String>) -> Self {
        Self::new(
            line,
            ExprKind::Var {
                reference: None,
                name: name.into(),
            },
        )
    }

    /// A qualified variable reference such as `this.x` or `super.x`.
    pub fn qualified_var(line: u32, reference: &str, name: impl Into<String>) -> Self {
        Self::new(
            line,
            ExprKind::Var {
                reference: Some(Box::new(Expr::var(line, reference))),
                name: name.into(),
            },
        )
    }

    pub fn binary(line: u32, op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(
            line,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    pub fn unary(line: u32, op: UnaryOp, operand: Expr) -> Self {
        Self::new(
            line,
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        )
    }

    pub fn dispatch(
        line: u32,
        reference: Option<Expr>,
        method: impl Into<String>,
        args: Vec<Expr>,
    ) -> Self {
        Self::new(
            line,
            ExprKind::Dispatch {
                reference: reference.map(Box::new),
                method: method.into(),
                args,
            },
        )
    }

    pub fn new_object(line: u32, class_name: impl Into<String>) -> Self {
        Self::new(
            line,
            ExprKind::New {
                class_name: class_name.into(),
            },
        )
    }

    pub fn cast(line: u32, target: impl Into<String>, operand: Expr) -> Self {
        Self::new(
            line,
            ExprKind::Cast {
                target: target.into(),
                operand: Box::new(operand),
                up_cast: false,
            },
        )
    }

    pub fn instance_of(line: u32, operand: Expr, target: impl Into<String>) -> Self {
        Self::new(
            line,
            ExprKind::InstanceOf {
                operand: Box::new(operand),
                target: target.into(),
                up_check: None,
            },
        )
    }

    pub fn assign(
        line: u32,
        ref_name: Option<&str>,
        name: impl Into<String>,
        value: Expr,
    ) -> Self {
        Self::new(
            line,
            ExprKind::Assign {
                ref_name: ref_name.map(str::to_string),
                name: name.into(),
                value: Box::new(value),
            },
        )
    }
}
