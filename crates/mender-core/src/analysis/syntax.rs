//! Owned syntax model for Python sources.
//!
//! tree-sitter produces a concrete syntax tree tied to the source buffer.
//! The analyzer works on this smaller owned model instead: statements and
//! expressions with 1-indexed lines, lowered in one pass.

use std::cell::RefCell;

use tree_sitter::{Node, Parser};

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // A language failure surfaces as a failed parse below.
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });
}

/// A parsed module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: u32,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub line: u32,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Assign {
        targets: Vec<Expr>,
        value: Option<Expr>,
    },
    AugAssign {
        target: Expr,
        op: String,
        value: Expr,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Pass,
    Raise(Option<Expr>),
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    ClassDef {
        name: String,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    With {
        items: Vec<Expr>,
        targets: Vec<Expr>,
        body: Vec<Stmt>,
    },
    /// Names bound by an import.
    Import(Vec<String>),
    /// `global` / `nonlocal` declarations.
    Global(Vec<String>),
    /// Anything else, with the expressions it evaluates.
    Other(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub line: u32,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

impl Literal {
    /// Python truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Literal::Int(v) => *v != 0,
            Literal::Float(v) => *v != 0.0,
            Literal::Str(s) => !s.is_empty(),
            Literal::Bool(b) => *b,
            Literal::None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    fn from_token(token: &str) -> Option<CmpOp> {
        Some(match token {
            "==" => CmpOp::Eq,
            "!=" | "<>" => CmpOp::NotEq,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::LtE,
            ">" => CmpOp::Gt,
            ">=" => CmpOp::GtE,
            "in" => CmpOp::In,
            "not in" => CmpOp::NotIn,
            "is" => CmpOp::Is,
            "is not" => CmpOp::IsNot,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Name(String),
    Const(Literal),
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    BinOp {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    /// Tuples, lists and sets (also as assignment targets).
    Sequence(Vec<Expr>),
    /// Lambdas and comprehensions: their names live in an inner scope.
    Scoped,
    Other(Vec<Expr>),
}

impl Expr {
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<&Literal> {
        match &self.kind {
            ExprKind::Const(lit) => Some(lit),
            _ => None,
        }
    }

    /// Visit this expression and every sub-expression, outermost first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Name(_) | ExprKind::Const(_) | ExprKind::Scoped => {}
            ExprKind::Compare {
                left, comparators, ..
            } => {
                left.walk(visit);
                for c in comparators {
                    c.walk(visit);
                }
            }
            ExprKind::BinOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            ExprKind::Call { func, args } => {
                func.walk(visit);
                for a in args {
                    a.walk(visit);
                }
            }
            ExprKind::Subscript { value, index } => {
                value.walk(visit);
                index.walk(visit);
            }
            ExprKind::Attribute { value, .. } => value.walk(visit),
            ExprKind::Sequence(items) | ExprKind::Other(items) => {
                for item in items {
                    item.walk(visit);
                }
            }
        }
    }

    /// Names bound when this expression is an assignment target.
    pub fn bound_names(&self, out: &mut Vec<String>) {
        match &self.kind {
            ExprKind::Name(n) => out.push(n.clone()),
            ExprKind::Sequence(items) => {
                for item in items {
                    item.bound_names(out);
                }
            }
            _ => {}
        }
    }
}

impl Stmt {
    /// Expressions this statement evaluates directly (not those of nested
    /// statements).
    pub fn expressions(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::Expr(e) => vec![e],
            StmtKind::Assign { targets, value } => {
                targets.iter().chain(value.iter()).collect()
            }
            StmtKind::AugAssign { target, value, .. } => vec![target, value],
            StmtKind::Return(v) | StmtKind::Raise(v) => v.iter().collect(),
            StmtKind::If { test, .. } | StmtKind::While { test, .. } => vec![test],
            StmtKind::For { target, iter, .. } => vec![target, iter],
            StmtKind::With { items, targets, .. } => items.iter().chain(targets).collect(),
            StmtKind::Other(exprs) => exprs.iter().collect(),
            StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass
            | StmtKind::FunctionDef { .. }
            | StmtKind::ClassDef { .. }
            | StmtKind::Try { .. }
            | StmtKind::Import(_)
            | StmtKind::Global(_) => Vec::new(),
        }
    }

    /// Child statement blocks, in source order. Function and class bodies
    /// are included; callers that stay within one scope skip them.
    pub fn blocks(&self) -> Vec<&[Stmt]> {
        match &self.kind {
            StmtKind::If { body, orelse, .. }
            | StmtKind::While { body, orelse, .. }
            | StmtKind::For { body, orelse, .. } => vec![body.as_slice(), orelse.as_slice()],
            StmtKind::FunctionDef { body, .. }
            | StmtKind::ClassDef { body, .. }
            | StmtKind::With { body, .. } => vec![body.as_slice()],
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                let mut blocks: Vec<&[Stmt]> = vec![body.as_slice()];
                blocks.extend(handlers.iter().map(|h| h.body.as_slice()));
                blocks.push(orelse.as_slice());
                blocks.push(finalbody.as_slice());
                blocks
            }
            _ => Vec::new(),
        }
    }

    pub fn is_scope(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::FunctionDef { .. } | StmtKind::ClassDef { .. }
        )
    }
}

/// Visit every statement of `body` in the same scope (not descending into
/// nested functions or classes), outermost first.
pub fn walk_scope<'a>(body: &'a [Stmt], visit: &mut dyn FnMut(&'a Stmt)) {
    for stmt in body {
        visit(stmt);
        if stmt.is_scope() {
            continue;
        }
        for block in stmt.blocks() {
            walk_scope(block, visit);
        }
    }
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

/// Parse Python source. `None` when the parser reports any syntax error.
pub fn parse(source: &str) -> Option<Module> {
    let tree = PYTHON_PARSER.with(|p| p.borrow_mut().parse(source, None))?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }
    let lowerer = Lowerer {
        src: source.as_bytes(),
    };
    Some(Module {
        body: lowerer.block(root),
    })
}

fn line_of(node: Node<'_>) -> u32 {
    (node.start_position().row + 1) as u32
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

struct Lowerer<'s> {
    src: &'s [u8],
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.src).unwrap_or_default().to_string()
    }

    fn block(&self, node: Node<'_>) -> Vec<Stmt> {
        named_children(node)
            .into_iter()
            .flat_map(|child| self.statement(child))
            .collect()
    }

    fn field_block(&self, node: Node<'_>, field: &str) -> Vec<Stmt> {
        node.child_by_field_name(field)
            .map(|b| self.block(b))
            .unwrap_or_default()
    }

    fn child_block(&self, node: Node<'_>) -> Vec<Stmt> {
        named_children(node)
            .into_iter()
            .find(|c| c.kind() == "block")
            .map(|b| self.block(b))
            .unwrap_or_default()
    }

    fn field_expr(&self, node: Node<'_>, field: &str) -> Option<Expr> {
        node.child_by_field_name(field).map(|n| self.expr(n))
    }

    /// One syntax node can lower to several statements (`a = 1; b = 2` is
    /// already split by the parser, but expression statements holding
    /// several assignments are not).
    fn statement(&self, node: Node<'_>) -> Vec<Stmt> {
        let line = line_of(node);
        let kind = match node.kind() {
            "expression_statement" => {
                return named_children(node)
                    .into_iter()
                    .map(|child| Stmt {
                        line: line_of(child),
                        kind: self.simple_statement(child),
                    })
                    .collect();
            }
            "return_statement" => {
                StmtKind::Return(named_children(node).first().map(|n| self.expr(*n)))
            }
            "pass_statement" => StmtKind::Pass,
            "break_statement" => StmtKind::Break,
            "continue_statement" => StmtKind::Continue,
            "raise_statement" => {
                StmtKind::Raise(named_children(node).first().map(|n| self.expr(*n)))
            }
            "if_statement" => self.if_statement(node),
            "while_statement" => StmtKind::While {
                test: self.required_expr(node, "condition"),
                body: self.field_block(node, "body"),
                orelse: self.else_of(node),
            },
            "for_statement" => StmtKind::For {
                target: self.required_expr(node, "left"),
                iter: self.required_expr(node, "right"),
                body: self.field_block(node, "body"),
                orelse: self.else_of(node),
            },
            "function_definition" => StmtKind::FunctionDef {
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default(),
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| self.parameters(p))
                    .unwrap_or_default(),
                body: self.field_block(node, "body"),
            },
            "class_definition" => StmtKind::ClassDef {
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default(),
                body: self.field_block(node, "body"),
            },
            "decorated_definition" => {
                return node
                    .child_by_field_name("definition")
                    .map(|def| self.statement(def))
                    .unwrap_or_default();
            }
            "try_statement" => self.try_statement(node),
            "with_statement" => self.with_statement(node),
            "import_statement" | "import_from_statement" => {
                StmtKind::Import(self.imported_names(node))
            }
            "global_statement" | "nonlocal_statement" => StmtKind::Global(
                named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "identifier")
                    .map(|c| self.text(c))
                    .collect(),
            ),
            "comment" => return Vec::new(),
            _ => StmtKind::Other(
                named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() != "block")
                    .map(|c| self.expr(c))
                    .collect(),
            ),
        };
        vec![Stmt { line, kind }]
    }

    fn simple_statement(&self, node: Node<'_>) -> StmtKind {
        match node.kind() {
            "assignment" => {
                let mut targets = Vec::new();
                let mut current = node;
                // Chained assignments nest in the `right` field.
                loop {
                    if let Some(left) = current.child_by_field_name("left") {
                        targets.push(self.expr(left));
                    }
                    match current.child_by_field_name("right") {
                        Some(right) if right.kind() == "assignment" => current = right,
                        Some(right) => {
                            return StmtKind::Assign {
                                targets,
                                value: Some(self.expr(right)),
                            }
                        }
                        None => return StmtKind::Assign {
                            targets,
                            value: None,
                        },
                    }
                }
            }
            "augmented_assignment" => StmtKind::AugAssign {
                target: self.required_expr(node, "left"),
                op: node
                    .child_by_field_name("operator")
                    .map(|op| op.kind().to_string())
                    .unwrap_or_default(),
                value: self.required_expr(node, "right"),
            },
            _ => StmtKind::Expr(self.expr(node)),
        }
    }

    fn if_statement(&self, node: Node<'_>) -> StmtKind {
        let test = self.required_expr(node, "condition");
        let body = self.field_block(node, "consequence");

        let mut cursor = node.walk();
        let alternatives: Vec<Node<'_>> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();

        // Fold `elif` chains into nested ifs, innermost last.
        let mut orelse = Vec::new();
        for alt in alternatives.iter().rev() {
            match alt.kind() {
                "else_clause" => orelse = self.field_block(*alt, "body"),
                "elif_clause" => {
                    let nested = Stmt {
                        line: line_of(*alt),
                        kind: StmtKind::If {
                            test: self.required_expr(*alt, "condition"),
                            body: self.field_block(*alt, "consequence"),
                            orelse: std::mem::take(&mut orelse),
                        },
                    };
                    orelse = vec![nested];
                }
                _ => {}
            }
        }
        StmtKind::If { test, body, orelse }
    }

    fn else_of(&self, node: Node<'_>) -> Vec<Stmt> {
        node.child_by_field_name("alternative")
            .map(|alt| self.field_block(alt, "body"))
            .unwrap_or_default()
    }

    fn try_statement(&self, node: Node<'_>) -> StmtKind {
        let body = self.field_block(node, "body");
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "except_clause" | "except_group_clause" => {
                    let name = named_children(child)
                        .into_iter()
                        .filter(|c| c.kind() != "block")
                        .flat_map(|c| {
                            if c.kind() == "as_pattern" {
                                c.child_by_field_name("alias")
                                    .map(|alias| self.text(alias))
                            } else {
                                None
                            }
                        })
                        .next()
                        .or_else(|| {
                            // `except E as name` without an as_pattern node.
                            let exprs: Vec<_> = named_children(child)
                                .into_iter()
                                .filter(|c| c.kind() != "block")
                                .collect();
                            (exprs.len() == 2 && exprs[1].kind() == "identifier")
                                .then(|| self.text(exprs[1]))
                        });
                    handlers.push(Handler {
                        line: line_of(child),
                        name,
                        body: self.child_block(child),
                    });
                }
                "else_clause" => orelse = self.field_block(child, "body"),
                "finally_clause" => finalbody = self.child_block(child),
                _ => {}
            }
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        }
    }

    fn with_statement(&self, node: Node<'_>) -> StmtKind {
        let mut items = Vec::new();
        let mut targets = Vec::new();
        for clause in named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "with_clause")
        {
            for item in named_children(clause) {
                let value = item.child_by_field_name("value").unwrap_or(item);
                if value.kind() == "as_pattern" {
                    if let Some(inner) = named_children(value).first() {
                        items.push(self.expr(*inner));
                    }
                    if let Some(alias) = value.child_by_field_name("alias") {
                        targets.push(self.expr(alias));
                    }
                } else {
                    items.push(self.expr(value));
                }
            }
        }
        StmtKind::With {
            items,
            targets,
            body: self.field_block(node, "body"),
        }
    }

    fn imported_names(&self, node: Node<'_>) -> Vec<String> {
        let mut cursor = node.walk();
        node.children_by_field_name("name", &mut cursor)
            .map(|name| {
                if name.kind() == "aliased_import" {
                    name.child_by_field_name("alias")
                        .map(|a| self.text(a))
                        .unwrap_or_default()
                } else {
                    // `import a.b` binds `a`.
                    self.text(name)
                        .split('.')
                        .next()
                        .unwrap_or_default()
                        .to_string()
                }
            })
            .filter(|n| !n.is_empty())
            .collect()
    }

    fn parameters(&self, node: Node<'_>) -> Vec<String> {
        named_children(node)
            .into_iter()
            .filter_map(|param| self.parameter_name(param))
            .collect()
    }

    fn parameter_name(&self, node: Node<'_>) -> Option<String> {
        if node.kind() == "identifier" {
            return Some(self.text(node));
        }
        if let Some(name) = node.child_by_field_name("name") {
            return self.parameter_name(name);
        }
        named_children(node)
            .into_iter()
            .find_map(|child| self.parameter_name(child))
    }

    fn required_expr(&self, node: Node<'_>, field: &str) -> Expr {
        self.field_expr(node, field).unwrap_or(Expr {
            line: line_of(node),
            kind: ExprKind::Other(Vec::new()),
        })
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        let line = line_of(node);
        let kind = match node.kind() {
            "identifier" => ExprKind::Name(self.text(node)),
            "integer" => match parse_int(&self.text(node)) {
                Some(v) => ExprKind::Const(Literal::Int(v)),
                None => ExprKind::Other(Vec::new()),
            },
            "float" => match self.text(node).replace('_', "").parse::<f64>() {
                Ok(v) => ExprKind::Const(Literal::Float(v)),
                Err(_) => ExprKind::Other(Vec::new()),
            },
            "string" | "concatenated_string" => {
                ExprKind::Const(Literal::Str(string_value(&self.text(node))))
            }
            "true" => ExprKind::Const(Literal::Bool(true)),
            "false" => ExprKind::Const(Literal::Bool(false)),
            "none" => ExprKind::Const(Literal::None),
            "parenthesized_expression" => {
                return named_children(node)
                    .first()
                    .map(|inner| self.expr(*inner))
                    .unwrap_or(Expr {
                        line,
                        kind: ExprKind::Other(Vec::new()),
                    })
            }
            "unary_operator" => {
                let operand = self.required_expr(node, "argument");
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| o.kind().to_string())
                    .unwrap_or_default();
                match (op.as_str(), &operand.kind) {
                    ("-", ExprKind::Const(Literal::Int(v))) => {
                        ExprKind::Const(Literal::Int(v.wrapping_neg()))
                    }
                    ("-", ExprKind::Const(Literal::Float(v))) => {
                        ExprKind::Const(Literal::Float(-v))
                    }
                    _ => ExprKind::Other(vec![operand]),
                }
            }
            "comparison_operator" => self.comparison(node),
            "binary_operator" => ExprKind::BinOp {
                left: Box::new(self.required_expr(node, "left")),
                op: node
                    .child_by_field_name("operator")
                    .map(|o| o.kind().to_string())
                    .unwrap_or_default(),
                right: Box::new(self.required_expr(node, "right")),
            },
            "call" => {
                let func = self.required_expr(node, "function");
                let args = node
                    .child_by_field_name("arguments")
                    .map(|a| {
                        if a.kind() == "argument_list" {
                            named_children(a).into_iter().map(|c| self.expr(c)).collect()
                        } else {
                            vec![self.expr(a)]
                        }
                    })
                    .unwrap_or_default();
                ExprKind::Call {
                    func: Box::new(func),
                    args,
                }
            }
            "keyword_argument" => {
                return self.required_expr(node, "value");
            }
            "list_splat" | "dictionary_splat" | "list_splat_pattern" | "as_pattern_target" => {
                return named_children(node)
                    .first()
                    .map(|inner| self.expr(*inner))
                    .unwrap_or(Expr {
                        line,
                        kind: ExprKind::Other(Vec::new()),
                    })
            }
            "subscript" => ExprKind::Subscript {
                value: Box::new(self.required_expr(node, "value")),
                index: Box::new(self.required_expr(node, "subscript")),
            },
            "attribute" => ExprKind::Attribute {
                value: Box::new(self.required_expr(node, "object")),
                attr: node
                    .child_by_field_name("attribute")
                    .map(|a| self.text(a))
                    .unwrap_or_default(),
            },
            "tuple" | "list" | "set" | "expression_list" | "pattern_list" | "tuple_pattern"
            | "list_pattern" => ExprKind::Sequence(
                named_children(node).into_iter().map(|c| self.expr(c)).collect(),
            ),
            "lambda"
            | "list_comprehension"
            | "set_comprehension"
            | "dictionary_comprehension"
            | "generator_expression" => ExprKind::Scoped,
            _ => ExprKind::Other(
                named_children(node).into_iter().map(|c| self.expr(c)).collect(),
            ),
        };
        Expr { line, kind }
    }

    fn comparison(&self, node: Node<'_>) -> ExprKind {
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        let mut pending: Option<String> = None;
        for child in all_children(node) {
            if child.is_extra() {
                continue;
            }
            if child.is_named() {
                if let Some(token) = pending.take() {
                    ops.extend(CmpOp::from_token(&token));
                }
                operands.push(self.expr(child));
                continue;
            }
            // `not in` / `is not` may arrive as one token or two.
            let token = child.kind().to_string();
            pending = Some(match pending.take() {
                Some(prev) => format!("{prev} {token}"),
                None => token,
            });
        }

        let mut operands = operands.into_iter();
        let left = operands.next().unwrap_or(Expr {
            line: line_of(node),
            kind: ExprKind::Other(Vec::new()),
        });
        ExprKind::Compare {
            left: Box::new(left),
            ops,
            comparators: operands.collect(),
        }
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let t = text.replace('_', "").to_ascii_lowercase();
    let t = t.trim_end_matches('l');
    if let Some(hex) = t.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = t.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = t.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        t.parse().ok()
    }
}

/// Literal value of a simple string token, quotes and prefixes removed.
fn string_value(text: &str) -> String {
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    body.to_string()
}
