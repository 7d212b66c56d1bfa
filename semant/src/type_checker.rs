//! Type checking pass
//!
//! A single mutable traversal over the parsed program. For every
//! expression it resolves a static type and writes it into the node's
//! type slot, exactly once per node; for every statement it enforces
//! the scoping and control-flow rules. Violations are registered with
//! the shared [`ErrorHandler`] and the walk continues with a fallback
//! type of `Object`, so one bad subtree never hides errors elsewhere.
//!
//! The checker owns a working [`ScopeStack`] seeded from the current
//! class's field table (which already stacks the parent chain plus the
//! `this`/`super` bindings), then pushes one scope per method, block,
//! `if` arm and loop body on top of it. The class's own field level
//! separates field bindings from locals for shadowing decisions and for
//! the bounded lookups behind `this.x` and `this.foo()`.

use std::rc::Rc;

use ast::{
    BinaryOp, Class, Expr, ExprKind, Field, Formal, Member, Method, Program, Stmt, StmtKind, Ty,
    UnaryOp,
};
use diagnostics::{ErrorHandler, ErrorKind};
use log::{debug, trace};
use smallvec::SmallVec;

use crate::hierarchy::{ClassHierarchy, ClassInfo, MethodSig};
use crate::symbol_table::ScopeStack;

/// Type check a whole program against its class hierarchy. Errors are
/// appended to `errors` in discovery order; the pass itself never
/// fails.
pub fn check_program(program: &mut Program, hierarchy: &ClassHierarchy, errors: &mut ErrorHandler) {
    debug!(
        "type checking program with {} declared class(es)",
        program.classes.len()
    );
    let mut checker = TypeChecker::new(hierarchy, errors);
    for class in &mut program.classes {
        checker.check_class(class);
    }
}

/// The method the checker is currently inside of, for `return` checks.
#[derive(Debug, Clone)]
struct CurrentMethod {
    name: String,
    return_type: Ty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    While,
    For,
}

/// The shape of a dispatch/variable qualifier, decided syntactically
/// before any type is resolved.
enum RefShape {
    /// Bare `this`
    This,
    /// Bare `super`
    Super,
    /// A plain variable name, carried for error messages.
    Plain(String),
    /// `this.x` or `super.x`; the field name is carried for messages.
    Chained(String),
    /// A qualified variable whose own qualifier is not bare
    /// `this`/`super`; the offending qualifier name is carried.
    IllegalInner(String),
    /// Any non-variable expression.
    NotAVar,
}

pub struct TypeChecker<'h, 'e> {
    hierarchy: &'h ClassHierarchy,
    errors: &'e mut ErrorHandler,
    current_class: Option<&'h ClassInfo>,
    current_file: String,
    current_method: Option<CurrentMethod>,
    /// Fields of the current class (from the hierarchy) with method
    /// and block scopes stacked on top.
    symbols: ScopeStack<Ty>,
    /// Scope level of the current class's own fields within `symbols`.
    class_field_level: usize,
    /// One entry per enclosing loop; `break` is legal iff non-empty.
    loops: SmallVec<[LoopKind; 4]>,
}

impl<'h, 'e> TypeChecker<'h, 'e> {
    pub fn new(hierarchy: &'h ClassHierarchy, errors: &'e mut ErrorHandler) -> Self {
        Self {
            hierarchy,
            errors,
            current_class: None,
            current_file: String::new(),
            current_method: None,
            symbols: ScopeStack::new(),
            class_field_level: 0,
            loops: SmallVec::new(),
        }
    }

    fn semantic_error(&mut self, line: u32, message: impl Into<String>) {
        self.errors
            .register(ErrorKind::Semantic, self.current_file.as_str(), line, message);
    }

    fn is_subtype(&self, a: &Ty, b: &Ty) -> bool {
        self.hierarchy.is_subtype(a, b)
    }

    /// Run `f` inside a fresh scope, guaranteeing the matching exit.
    fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.symbols.enter_scope();
        trace!("entered scope level {}", self.symbols.current_level());
        let result = f(self);
        self.symbols.exit_scope();
        result
    }

    // ---- declarations ----------------------------------------------

    pub fn check_class(&mut self, class: &mut Class) {
        let Some(info) = self.hierarchy.get(&class.name) else {
            self.errors.register(
                ErrorKind::Internal,
                class.file.as_str(),
                class.line,
                format!("class {} is missing from the class hierarchy", class.name),
            );
            return;
        };
        debug!("type checking class {}", class.name);

        self.current_class = Some(info);
        self.current_file = info.file.clone();
        self.symbols = info.fields.clone();
        self.class_field_level = info.field_level;
        self.loops.clear();

        for member in &mut class.members {
            match member {
                Member::Field(field) => self.check_field(field),
                Member::Method(method) => self.check_method(method),
            }
        }
    }

    fn check_field(&mut self, field: &mut Field) {
        if !self.hierarchy.is_declared_type(&field.declared_type) {
            self.semantic_error(
                field.line,
                format!(
                    "The declared type {} of the field {} is undefined.",
                    field.declared_type, field.name
                ),
            );
        }
        if let Some(init) = &mut field.init {
            let init_ty = self.check_expr(init);
            let declared = Ty::from_name(&field.declared_type);
            if !self.is_subtype(&init_ty, &declared) {
                self.semantic_error(
                    field.line,
                    format!(
                        "The type of the initializer is {} which is not compatible with the {} field's type {}.",
                        init_ty, field.name, field.declared_type
                    ),
                );
            }
        }
    }

    fn check_method(&mut self, method: &mut Method) {
        debug!("type checking method {}", method.name);
        if method.return_type != "void" && !self.hierarchy.is_declared_type(&method.return_type) {
            self.semantic_error(
                method.line,
                format!(
                    "The return type {} of the method {} is undefined.",
                    method.return_type, method.name
                ),
            );
        }
        let return_type = Ty::from_name(&method.return_type);
        self.current_method = Some(CurrentMethod {
            name: method.name.clone(),
            return_type: return_type.clone(),
        });

        self.scoped(|s| {
            for formal in &method.formals {
                s.check_formal(formal);
            }
            for stmt in &mut method.body {
                s.check_stmt(stmt);
            }
        });

        if return_type != Ty::Void {
            let ends_with_return = matches!(
                method.body.last(),
                Some(Stmt {
                    kind: StmtKind::Return(_),
                    ..
                })
            );
            if !ends_with_return {
                self.semantic_error(
                    method.line,
                    "Methods with a non-void return type must end with a return statement.",
                );
            }
        }
        self.current_method = None;
    }

    fn check_formal(&mut self, formal: &Formal) {
        if !self.hierarchy.is_declared_type(&formal.declared_type) {
            self.semantic_error(
                formal.line,
                format!(
                    "The declared type {} of the formal parameter {} is undefined.",
                    formal.declared_type, formal.name
                ),
            );
        }
        if self.symbols.level_of(&formal.name) == Some(self.symbols.current_level()) {
            self.semantic_error(
                formal.line,
                format!(
                    "The name of the formal parameter {} is the same as the name of another formal parameter.",
                    formal.name
                ),
            );
        }
        // Bound regardless so uses of the name resolve to something.
        self.symbols
            .add(&formal.name, Ty::from_name(&formal.declared_type));
    }

    // ---- statements ------------------------------------------------

    pub fn check_stmt(&mut self, stmt: &mut Stmt) {
        let line = stmt.line;
        match &mut stmt.kind {
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Decl { name, init, ty } => self.check_decl(line, name, init, ty),
            StmtKind::If {
                pred,
                then_stmt,
                else_stmt,
            } => {
                let pred_ty = self.check_expr(pred);
                if pred_ty != Ty::Boolean {
                    self.semantic_error(
                        line,
                        format!("The type of the predicate is {}, not boolean.", pred_ty),
                    );
                }
                self.scoped(|s| s.check_stmt(then_stmt));
                if let Some(alt) = else_stmt {
                    self.scoped(|s| s.check_stmt(alt));
                }
            }
            StmtKind::While { pred, body } => {
                let pred_ty = self.check_expr(pred);
                if !self.is_subtype(&pred_ty, &Ty::Boolean) {
                    self.semantic_error(
                        line,
                        format!("The type of the predicate is {}, not boolean.", pred_ty),
                    );
                }
                self.scoped(|s| {
                    s.loops.push(LoopKind::While);
                    s.check_stmt(body);
                    s.loops.pop();
                });
            }
            StmtKind::For {
                init,
                pred,
                update,
                body,
            } => {
                // Header expressions are evaluated in the enclosing
                // scope; only the body opens a new one.
                if let Some(init) = init {
                    self.check_expr(init);
                }
                if let Some(pred) = pred {
                    let pred_ty = self.check_expr(pred);
                    if !self.is_subtype(&pred_ty, &Ty::Boolean) {
                        self.semantic_error(
                            line,
                            format!("The type of the predicate is {}, not boolean.", pred_ty),
                        );
                    }
                }
                if let Some(update) = update {
                    self.check_expr(update);
                }
                self.scoped(|s| {
                    s.loops.push(LoopKind::For);
                    s.check_stmt(body);
                    s.loops.pop();
                });
            }
            StmtKind::Break => {
                if self.loops.is_empty() {
                    self.semantic_error(line, "Break statement not inside of a loop.");
                }
            }
            StmtKind::Return(expr) => self.check_return(line, expr.as_mut()),
            StmtKind::Block(stmts) => {
                self.scoped(|s| {
                    for stmt in stmts {
                        s.check_stmt(stmt);
                    }
                });
            }
        }
    }

    fn check_decl(&mut self, line: u32, name: &str, init: &mut Expr, slot: &mut Option<Ty>) {
        let mut ty = self.check_expr(init);
        if matches!(ty, Ty::Null | Ty::Void) {
            self.semantic_error(line, "Initialization can't have value null or void.");
            ty = Ty::object();
        } else if let Ty::Class(class_name) = &ty {
            if self.hierarchy.get(class_name).is_none() {
                self.semantic_error(line, format!("The type {} does not exist.", class_name));
                ty = Ty::object();
            }
        }
        *slot = Some(ty.clone());

        if self.symbols.lookup(name).is_some() {
            let level = self.symbols.level_of(name).unwrap_or(0);
            // A declaration may shadow an own or inherited field, but
            // never another binding in the same method.
            let shadows_field =
                level != self.symbols.current_level() && level <= self.class_field_level;
            if !shadows_field {
                self.semantic_error(
                    line,
                    format!("Variable {} is already defined in this scope.", name),
                );
                return;
            }
        }
        self.symbols.add(name, ty);
    }

    fn check_return(&mut self, line: u32, expr: Option<&mut Expr>) {
        let Some(method) = self.current_method.clone() else {
            self.errors.register(
                ErrorKind::Internal,
                self.current_file.as_str(),
                line,
                "return statement outside of a method",
            );
            if let Some(expr) = expr {
                self.check_expr(expr);
            }
            return;
        };
        match expr {
            Some(expr) => {
                let ty = self.check_expr(expr);
                if !self.is_subtype(&ty, &method.return_type) {
                    self.semantic_error(
                        line,
                        format!(
                            "The type of the return expression is {} which is not compatible with the {} method's return type {}.",
                            ty, method.name, method.return_type
                        ),
                    );
                }
            }
            None => {
                if method.return_type != Ty::Void {
                    self.semantic_error(
                        line,
                        format!(
                            "The return type of the method {} is not void and so return statements in it must return a value.",
                            method.name
                        ),
                    );
                }
            }
        }
    }

    // ---- expressions -----------------------------------------------

    /// Resolve and record the static type of one expression.
    pub fn check_expr(&mut self, expr: &mut Expr) -> Ty {
        debug_assert!(expr.ty.is_none(), "expression visited twice");
        let line = expr.line;
        let ty = match &mut expr.kind {
            ExprKind::Dispatch {
                reference,
                method,
                args,
            } => self.check_dispatch(line, reference.as_deref_mut(), method.as_str(), args),
            ExprKind::New { class_name } => self.check_new(line, class_name),
            ExprKind::Cast {
                target,
                operand,
                up_cast,
            } => self.check_cast(line, target.as_str(), operand, up_cast),
            ExprKind::InstanceOf {
                operand,
                target,
                up_check,
            } => self.check_instanceof(line, operand, target.as_str(), up_check),
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.check_binary(line, op, left, right)
            }
            ExprKind::Unary { op, operand } => {
                let op = *op;
                self.check_unary(line, op, operand)
            }
            ExprKind::Var { reference, name } => {
                self.check_var(line, reference.as_deref_mut(), name.as_str())
            }
            ExprKind::Assign {
                ref_name,
                name,
                value,
            } => self.check_assign(line, ref_name.as_deref(), name.as_str(), value),
            ExprKind::IntConst(_) => Ty::Int,
            ExprKind::BoolConst(_) => Ty::Boolean,
            ExprKind::StringConst(_) => Ty::string(),
        };
        trace!("line {}: expression resolved to {}", line, ty);
        expr.ty = Some(ty.clone());
        ty
    }

    fn check_new(&mut self, line: u32, class_name: &str) -> Ty {
        if self.hierarchy.get(class_name).is_none() {
            self.semantic_error(line, format!("The type {} does not exist.", class_name));
            return Ty::object();
        }
        Ty::Class(class_name.to_string())
    }

    fn check_cast(&mut self, line: u32, target: &str, operand: &mut Expr, up_cast: &mut bool) -> Ty {
        let operand_ty = self.check_expr(operand);
        let dest = Ty::from_name(target);
        if operand_ty.is_primitive() || dest.is_primitive() {
            let primitive = if operand_ty.is_primitive() {
                &operand_ty
            } else {
                &dest
            };
            self.semantic_error(
                line,
                format!("Casting primitive type {} is not supported.", primitive),
            );
            return dest;
        }
        if !self.hierarchy.is_declared_type(target) {
            self.semantic_error(
                line,
                format!("The destination type {} is undefined.", target),
            );
            return dest;
        }
        let widening = self.is_subtype(&operand_ty, &dest);
        let narrowing = self.is_subtype(&dest, &operand_ty);
        if !widening && !narrowing {
            self.semantic_error(
                line,
                format!(
                    "Illegal cast: the expression type {} and the destination type {} are not related by inheritance.",
                    operand_ty, target
                ),
            );
        }
        if widening && !narrowing {
            *up_cast = true;
        }
        dest
    }

    fn check_instanceof(
        &mut self,
        line: u32,
        operand: &mut Expr,
        target: &str,
        up_check: &mut Option<bool>,
    ) -> Ty {
        if self.hierarchy.get(target).is_none() {
            self.semantic_error(
                line,
                format!("The reference type {} does not exist.", target),
            );
        }
        let operand_ty = self.check_expr(operand);
        let dest = Ty::Class(target.to_string());
        if self.is_subtype(&operand_ty, &dest) {
            *up_check = Some(true);
        } else if self.is_subtype(&dest, &operand_ty) {
            *up_check = Some(false);
        } else {
            self.semantic_error(
                line,
                format!(
                    "You can't compare type {} to incompatible type {}.",
                    operand_ty, target
                ),
            );
        }
        Ty::Boolean
    }

    fn check_binary(&mut self, line: u32, op: BinaryOp, left: &mut Expr, right: &mut Expr) -> Ty {
        let left_ty = self.check_expr(left);
        let right_ty = self.check_expr(right);
        match op {
            BinaryOp::Plus
            | BinaryOp::Minus
            | BinaryOp::Times
            | BinaryOp::Divide
            | BinaryOp::Modulus => {
                if left_ty != Ty::Int || right_ty != Ty::Int {
                    self.semantic_error(
                        line,
                        format!("The two operands of \"{}\" are not both ints.", op.symbol()),
                    );
                }
                Ty::Int
            }
            BinaryOp::Lt | BinaryOp::Leq | BinaryOp::Gt | BinaryOp::Geq => {
                if left_ty != Ty::Int || right_ty != Ty::Int {
                    self.semantic_error(
                        line,
                        format!(
                            "The two values being compared by \"{}\" are not both ints.",
                            op.symbol()
                        ),
                    );
                }
                Ty::Boolean
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                // Incompatibility is reported but the comparison still
                // types as boolean.
                if !self.is_subtype(&left_ty, &right_ty) && !self.is_subtype(&right_ty, &left_ty) {
                    self.semantic_error(
                        line,
                        format!(
                            "The two values being compared by \"{}\" are of incompatible types {} and {}.",
                            op.symbol(),
                            left_ty,
                            right_ty
                        ),
                    );
                }
                Ty::Boolean
            }
            BinaryOp::And | BinaryOp::Or => {
                if left_ty != Ty::Boolean || right_ty != Ty::Boolean {
                    self.semantic_error(
                        line,
                        format!(
                            "The two operands of \"{}\" are not both booleans.",
                            op.symbol()
                        ),
                    );
                }
                Ty::Boolean
            }
        }
    }

    fn check_unary(&mut self, line: u32, op: UnaryOp, operand: &mut Expr) -> Ty {
        match op {
            UnaryOp::Neg => {
                let ty = self.check_expr(operand);
                if ty != Ty::Int {
                    self.semantic_error(
                        line,
                        format!("The value being negated is of type {}, not int.", ty),
                    );
                }
                Ty::Int
            }
            UnaryOp::Not => {
                let ty = self.check_expr(operand);
                if ty != Ty::Boolean {
                    self.semantic_error(
                        line,
                        format!(
                            "The not (!) operator applies only to boolean expressions, not {}.",
                            ty
                        ),
                    );
                }
                Ty::Boolean
            }
            UnaryOp::Incr | UnaryOp::Decr => {
                let verb = if op == UnaryOp::Incr {
                    "incremented"
                } else {
                    "decremented"
                };
                // Shape and type are independent checks; both may fire.
                if !matches!(operand.kind, ExprKind::Var { .. }) {
                    self.semantic_error(
                        line,
                        format!(
                            "The expression being {} must be a variable name with an optional \"this.\" or \"super.\" prefix.",
                            verb
                        ),
                    );
                }
                let ty = self.check_expr(operand);
                if ty != Ty::Int {
                    self.semantic_error(
                        line,
                        format!("The value being {} is of type {}, not int.", verb, ty),
                    );
                }
                Ty::Int
            }
        }
    }

    // ---- variables and assignment ----------------------------------

    fn check_var(&mut self, line: u32, reference: Option<&mut Expr>, name: &str) -> Ty {
        if let Some(reference) = reference {
            return self.check_qualified_var(line, reference, name);
        }
        if name == "null" {
            return Ty::Null;
        }
        match self.symbols.lookup(name).cloned() {
            Some(ty) => ty,
            None => {
                self.semantic_error(
                    line,
                    format!("Identifier {} hasn't been defined yet.", name),
                );
                Ty::object()
            }
        }
    }

    fn check_qualified_var(&mut self, line: u32, reference: &mut Expr, name: &str) -> Ty {
        let qualifier = match &reference.kind {
            ExprKind::Var {
                reference: None,
                name: qualifier,
            } => Some(qualifier.clone()),
            _ => None,
        };
        match qualifier.as_deref() {
            Some("this") => {
                let this_ty = self
                    .symbols
                    .lookup("this")
                    .cloned()
                    .unwrap_or_else(Ty::object);
                reference.ty = Some(this_ty);
                match self
                    .symbols
                    .lookup_to(name, self.class_field_level)
                    .cloned()
                {
                    Some(ty) => ty,
                    None => {
                        self.semantic_error(
                            line,
                            format!("Identifier {} is undefined in this class scope.", name),
                        );
                        Ty::object()
                    }
                }
            }
            Some("super") => {
                let super_ty = self.symbols.lookup("super").cloned();
                match super_ty {
                    Some(Ty::Class(parent)) => {
                        reference.ty = Some(Ty::Class(parent.clone()));
                        let field = self
                            .hierarchy
                            .get(&parent)
                            .and_then(|class| class.fields.lookup(name))
                            .cloned();
                        match field {
                            Some(ty) => ty,
                            None => {
                                self.semantic_error(
                                    line,
                                    format!(
                                        "Identifier {} is undefined in superclass scope.",
                                        name
                                    ),
                                );
                                Ty::object()
                            }
                        }
                    }
                    _ => {
                        reference.ty = Some(Ty::object());
                        self.semantic_error(
                            line,
                            format!("Identifier {} is undefined in superclass scope.", name),
                        );
                        Ty::object()
                    }
                }
            }
            Some(other) => {
                reference.ty = Some(Ty::object());
                self.semantic_error(
                    line,
                    format!(
                        "Invalid reference object {}; only \"this\" and \"super\" can qualify a variable.",
                        other
                    ),
                );
                Ty::object()
            }
            None => {
                self.check_expr(reference);
                self.semantic_error(
                    line,
                    "Invalid reference expression; only \"this\" and \"super\" can qualify a variable.",
                );
                Ty::object()
            }
        }
    }

    fn check_assign(
        &mut self,
        line: u32,
        ref_name: Option<&str>,
        name: &str,
        value: &mut Expr,
    ) -> Ty {
        let rhs = self.check_expr(value);
        // A qualified left side resolves like a qualified variable
        // reference, undefined-identifier errors included.
        let lhs = match ref_name {
            Some("this") => {
                let ty = self
                    .symbols
                    .lookup_to(name, self.class_field_level)
                    .cloned();
                if ty.is_none() {
                    self.semantic_error(
                        line,
                        format!("Identifier {} is undefined in this class scope.", name),
                    );
                }
                ty
            }
            Some("super") => {
                let ty = match self.symbols.lookup("super").cloned() {
                    Some(Ty::Class(parent)) => self
                        .hierarchy
                        .get(&parent)
                        .and_then(|class| class.fields.lookup(name))
                        .cloned(),
                    _ => None,
                };
                if ty.is_none() {
                    self.semantic_error(
                        line,
                        format!("Identifier {} is undefined in superclass scope.", name),
                    );
                }
                ty
            }
            Some(_) => None,
            None => self.symbols.lookup(name).cloned(),
        };
        match lhs {
            Some(lhs_ty) => {
                // A null right side is assignable to any left side.
                if rhs != Ty::Null && !self.is_subtype(&rhs, &lhs_ty) {
                    self.semantic_error(
                        line,
                        format!(
                            "The right hand side type {} does not conform to the left hand side type {}.",
                            rhs, lhs_ty
                        ),
                    );
                }
            }
            None => match ref_name {
                Some(qualifier) => self.semantic_error(
                    line,
                    format!(
                        "The left hand expression \"{}.{}\" in this assignment is invalid.",
                        qualifier, name
                    ),
                ),
                None => self.semantic_error(
                    line,
                    format!(
                        "The left hand expression \"{}\" in this assignment is undefined.",
                        name
                    ),
                ),
            },
        }
        // An assignment has the type of its right hand side.
        rhs
    }

    // ---- dispatch --------------------------------------------------

    fn check_dispatch(
        &mut self,
        line: u32,
        reference: Option<&mut Expr>,
        method: &str,
        args: &mut [Expr],
    ) -> Ty {
        let sig = match reference {
            None => {
                let found = self
                    .current_class
                    .and_then(|class| class.methods.lookup(method))
                    .cloned();
                match found {
                    Some(sig) => Some(sig),
                    None => {
                        self.semantic_error(
                            line,
                            format!("Method name {} is undefined.", method),
                        );
                        None
                    }
                }
            }
            Some(reference) => self.resolve_dispatch_target(line, reference, method),
        };

        // Arguments are always visited so every reachable expression
        // ends the pass with a resolved type.
        let actual_types: Vec<Ty> = args.iter_mut().map(|arg| self.check_expr(arg)).collect();

        let Some(sig) = sig else {
            return Ty::object();
        };
        if actual_types.len() != sig.formals.len() {
            self.semantic_error(
                line,
                format!(
                    "Method {} requires {} argument(s) but {} given.",
                    method,
                    sig.formals.len(),
                    actual_types.len()
                ),
            );
            return Ty::object();
        }
        for (index, (actual, (_, formal_ty))) in
            actual_types.iter().zip(sig.formals.iter()).enumerate()
        {
            if !self.is_subtype(actual, formal_ty) {
                self.semantic_error(
                    line,
                    format!(
                        "Argument {} of method {} should have type {} but has type {}.",
                        index + 1,
                        method,
                        formal_ty,
                        actual
                    ),
                );
                return Ty::object();
            }
        }
        sig.return_type.clone()
    }

    /// Resolve the method signature a qualified call targets, typing
    /// the reference expression along the way. `None` means resolution
    /// failed and an error was registered.
    fn resolve_dispatch_target(
        &mut self,
        line: u32,
        reference: &mut Expr,
        method: &str,
    ) -> Option<Rc<MethodSig>> {
        match classify_reference(reference) {
            RefShape::This => {
                let this_ty = self
                    .symbols
                    .lookup("this")
                    .cloned()
                    .unwrap_or_else(Ty::object);
                reference.ty = Some(this_ty);
                // Bounded at the class's own level: inherited and own
                // methods, never anything from an inner scope.
                let sig = self
                    .current_class
                    .and_then(|class| class.methods.lookup_to(method, self.class_field_level))
                    .cloned();
                if sig.is_none() {
                    self.semantic_error(
                        line,
                        format!("Method name {} is undefined in 'this' class scope.", method),
                    );
                }
                sig
            }
            RefShape::Super => match self.symbols.lookup("super").cloned() {
                Some(Ty::Class(parent)) => {
                    reference.ty = Some(Ty::Class(parent.clone()));
                    let sig = self
                        .hierarchy
                        .get(&parent)
                        .and_then(|class| class.methods.lookup(method))
                        .cloned();
                    if sig.is_none() {
                        self.semantic_error(
                            line,
                            format!("Method name {} is undefined in superclass scope.", method),
                        );
                    }
                    sig
                }
                _ => {
                    reference.ty = Some(Ty::object());
                    self.semantic_error(
                        line,
                        format!("Method name {} is undefined in superclass scope.", method),
                    );
                    None
                }
            },
            RefShape::Plain(name) => {
                if self.symbols.lookup(&name).is_none() {
                    self.semantic_error(
                        line,
                        format!("Reference object {} is undefined.", name),
                    );
                    reference.ty = Some(Ty::object());
                    return None;
                }
                let reference_ty = self.check_expr(reference);
                self.lookup_method_on(line, &reference_ty, &name, method)
            }
            RefShape::Chained(field_name) => {
                let reference_ty = self.check_expr(reference);
                self.lookup_method_on(line, &reference_ty, &field_name, method)
            }
            RefShape::IllegalInner(qualifier) => {
                force_var_chain_fallback(reference);
                self.semantic_error(
                    line,
                    format!(
                        "Illegal reference object {}; only \"this\" and \"super\" can qualify a reference.",
                        qualifier
                    ),
                );
                None
            }
            RefShape::NotAVar => {
                self.check_expr(reference);
                self.semantic_error(
                    line,
                    "Illegal reference expression; only variables can qualify a method call.",
                );
                None
            }
        }
    }

    /// Find `method` in the class of `reference_ty`; `name` is the
    /// reference's source spelling, for the error message.
    fn lookup_method_on(
        &mut self,
        line: u32,
        reference_ty: &Ty,
        name: &str,
        method: &str,
    ) -> Option<Rc<MethodSig>> {
        let sig = reference_ty
            .class_name()
            .and_then(|class_name| self.hierarchy.get(class_name))
            .and_then(|class| class.methods.lookup(method))
            .cloned();
        if sig.is_none() {
            self.semantic_error(
                line,
                format!(
                    "Method {} is undefined with reference object {}.",
                    method, name
                ),
            );
        }
        sig
    }
}

/// Classify a dispatch qualifier or qualified variable syntactically.
fn classify_reference(reference: &Expr) -> RefShape {
    match &reference.kind {
        ExprKind::Var {
            reference: None,
            name,
        } if name == "this" => RefShape::This,
        ExprKind::Var {
            reference: None,
            name,
        } if name == "super" => RefShape::Super,
        ExprKind::Var {
            reference: None,
            name,
        } => RefShape::Plain(name.clone()),
        ExprKind::Var {
            reference: Some(inner),
            name,
        } => match &inner.kind {
            ExprKind::Var {
                reference: None,
                name: qualifier,
            } if qualifier == "this" || qualifier == "super" => RefShape::Chained(name.clone()),
            ExprKind::Var { name: qualifier, .. } => RefShape::IllegalInner(qualifier.clone()),
            _ => RefShape::NotAVar,
        },
        _ => RefShape::NotAVar,
    }
}

/// Fill in fallback types along a rejected variable chain without
/// visiting it, so the typed-everywhere invariant still holds.
fn force_var_chain_fallback(expr: &mut Expr) {
    if expr.ty.is_none() {
        expr.ty = Some(Ty::object());
    }
    if let ExprKind::Var {
        reference: Some(inner),
        ..
    } = &mut expr.kind
    {
        force_var_chain_fallback(inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(expr: &mut Expr) -> (Ty, ErrorHandler) {
        let hierarchy = ClassHierarchy::with_builtins();
        let mut errors = ErrorHandler::new();
        let mut checker = TypeChecker::new(&hierarchy, &mut errors);
        checker.current_file = "Test.btm".to_string();
        checker.symbols.enter_scope();
        checker.class_field_level = 1;
        let ty = checker.check_expr(expr);
        (ty, errors)
    }

    #[test]
    fn constants_resolve_to_their_types() {
        let (ty, errors) = check(&mut Expr::int_const(1, 42));
        assert_eq!(ty, Ty::Int);
        assert!(errors.is_empty());

        let (ty, _) = check(&mut Expr::bool_const(1, true));
        assert_eq!(ty, Ty::Boolean);

        let (ty, _) = check(&mut Expr::string_const(1, "hi"));
        assert_eq!(ty, Ty::string());
    }

    #[test]
    fn null_literal_has_the_null_type() {
        let (ty, errors) = check(&mut Expr::var(1, "null"));
        assert_eq!(ty, Ty::Null);
        assert!(errors.is_empty());
    }

    #[test]
    fn arithmetic_on_non_ints_reports_but_types_int() {
        let mut expr = Expr::binary(
            4,
            BinaryOp::Plus,
            Expr::int_const(4, 1),
            Expr::bool_const(4, true),
        );
        let (ty, errors) = check(&mut expr);
        assert_eq!(ty, Ty::Int);
        assert_eq!(errors.len(), 1);
        assert!(errors.errors()[0].message.contains("\"+\""));
        // Both operand slots are filled despite the error.
        if let ExprKind::Binary { left, right, .. } = &expr.kind {
            assert_eq!(left.ty, Some(Ty::Int));
            assert_eq!(right.ty, Some(Ty::Boolean));
        } else {
            unreachable!();
        }
    }

    #[test]
    fn undefined_variable_falls_back_to_object() {
        let (ty, errors) = check(&mut Expr::var(9, "ghost"));
        assert_eq!(ty, Ty::object());
        assert_eq!(errors.len(), 1);
        assert!(errors.errors()[0]
            .message
            .contains("hasn't been defined yet"));
    }

    #[test]
    fn non_variable_dispatch_reference_is_rejected() {
        let mut expr = Expr::dispatch(
            2,
            Some(Expr::string_const(2, "abc")),
            "length",
            Vec::new(),
        );
        let (ty, errors) = check(&mut expr);
        assert_eq!(ty, Ty::object());
        assert_eq!(errors.len(), 1);
        assert!(errors.errors()[0].message.contains("Illegal reference"));
    }

    #[test]
    fn primitive_cast_is_rejected() {
        let mut expr = Expr::cast(3, "int", Expr::int_const(3, 7));
        let (ty, errors) = check(&mut expr);
        assert_eq!(ty, Ty::Int);
        assert_eq!(errors.len(), 1);
        assert!(errors.errors()[0].message.contains("Casting primitive"));
    }
}
