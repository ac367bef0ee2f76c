//! Structural checks over the Python syntax model.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::cfg::Cfg;
use super::syntax::{self, walk_scope, CmpOp, Expr, ExprKind, Literal, Stmt, StmtKind};
use crate::domain::finding::normalize;
use crate::domain::{FindingCategory, LogicalFinding, Severity};

/// Accumulator names preferred when suggesting a missing `return`.
const ACCUMULATOR_HINTS: &[&str] = &["total", "result", "sum", "count", "value"];

/// Tree walks named after their visiting order.
const TRAVERSALS: &[(&str, [Step; 3])] = &[
    ("preorder", [Step::Visit, Step::Left, Step::Right]),
    ("inorder", [Step::Left, Step::Visit, Step::Right]),
    ("postorder", [Step::Left, Step::Right, Step::Visit]),
];

/// Methods that move an element into or out of a sequence.
const ELEMENT_MOVES: &[&str] = &["append", "insert", "pop"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Visit,
    Left,
    Right,
}

impl Step {
    fn label(&self) -> &'static str {
        match self {
            Step::Visit => "root",
            Step::Left => "left",
            Step::Right => "right",
        }
    }
}

fn order_text(steps: &[Step]) -> String {
    steps.iter().map(Step::label).collect::<Vec<_>>().join(" -> ")
}

/// Analyze Python source. A source that does not parse yields no findings;
/// syntax errors are diagnosed from the failing run instead.
pub fn analyze(source: &str) -> Vec<LogicalFinding> {
    let Some(module) = syntax::parse(source) else {
        debug!("source does not parse; skipping structural analysis");
        return Vec::new();
    };
    let mut checker = Checker {
        lines: source.lines().collect(),
        findings: Vec::new(),
    };
    checker.scope(&module.body);
    normalize(checker.findings)
}

struct Checker<'s> {
    lines: Vec<&'s str>,
    findings: Vec<LogicalFinding>,
}

impl<'s> Checker<'s> {
    fn push(&mut self, finding: LogicalFinding) {
        self.findings.push(finding);
    }

    fn line_text(&self, line: u32) -> &str {
        self.lines
            .get((line as usize).saturating_sub(1))
            .copied()
            .unwrap_or_default()
    }

    /// Check one scope, then every scope nested in it.
    fn scope(&mut self, body: &[Stmt]) {
        for line in Cfg::build(body).unreachable_lines() {
            self.push(
                LogicalFinding::new(
                    FindingCategory::UnreachableCode,
                    Some(line),
                    Severity::High,
                    0.9,
                    "Unreachable code: no control-flow path reaches this statement",
                )
                .with_fix("Remove the unreachable statements or fix the preceding control flow"),
            );
        }

        let mut stmts = Vec::new();
        walk_scope(body, &mut |s| stmts.push(s));

        for stmt in &stmts {
            self.statement(stmt);
        }
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::FunctionDef { name, params, body } => {
                    self.function(stmt.line, name, params, body);
                    self.scope(body);
                }
                StmtKind::ClassDef { body, .. } => self.scope(body),
                _ => {}
            }
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::While { test, body, .. } => {
                self.infinite_loop(stmt.line, test, body);
                self.empty_loop(stmt.line, body);
            }
            StmtKind::For { iter, body, .. } => {
                self.range_from_one(stmt.line, iter, body);
                self.empty_loop(stmt.line, body);
            }
            StmtKind::If { test, body, .. } => self.membership_lookup(test, body),
            _ => {}
        }

        let mut compares = Vec::new();
        let mut binops = Vec::new();
        for expr in stmt.expressions() {
            expr.walk(&mut |e| match &e.kind {
                ExprKind::Compare { .. } => compares.push(e),
                ExprKind::BinOp { .. } => binops.push(e),
                _ => {}
            });
        }
        for compare in compares {
            self.comparison(compare);
        }
        for binop in binops {
            self.arithmetic(binop);
        }
    }

    fn infinite_loop(&mut self, line: u32, test: &Expr, body: &[Stmt]) {
        if escapes(body) {
            return;
        }
        if test.literal().is_some_and(Literal::truthy) {
            self.push(
                LogicalFinding::new(
                    FindingCategory::InfiniteLoop,
                    Some(line),
                    Severity::High,
                    0.95,
                    "Infinite loop: condition is always true and the loop has no break",
                )
                .with_fix("Add a break condition or change the loop condition"),
            );
            return;
        }
        if !matches!(test.kind, ExprKind::Compare { .. }) {
            return;
        }

        let watched = condition_names(test);
        if watched.is_empty() {
            return;
        }
        let modified = modified_names(body);
        if watched.iter().any(|name| modified.contains(name)) {
            return;
        }
        let mut names: Vec<&String> = watched.iter().collect();
        names.sort();
        let first = names[0].clone();
        let listed = names
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.push(
            LogicalFinding::new(
                FindingCategory::InfiniteLoop,
                Some(line),
                Severity::High,
                0.85,
                format!("Infinite loop: condition variables ({listed}) never change inside the loop"),
            )
            .with_fix(format!("Update '{first}' inside the loop or add a break condition")),
        );
    }

    fn empty_loop(&mut self, line: u32, body: &[Stmt]) {
        if let [Stmt {
            kind: StmtKind::Pass,
            ..
        }] = body
        {
            self.push(LogicalFinding::new(
                FindingCategory::DeadCode,
                Some(line),
                Severity::Low,
                0.8,
                "Empty loop: the body only contains 'pass'",
            ));
        }
    }

    fn range_from_one(&mut self, line: u32, iter: &Expr, body: &[Stmt]) {
        let ExprKind::Call { func, args } = &iter.kind else {
            return;
        };
        if func.name() != Some("range") || args.len() != 2 {
            return;
        }
        if args[0].literal() != Some(&Literal::Int(1)) {
            return;
        }
        let mut accumulates = false;
        walk_scope(body, &mut |s| {
            if matches!(&s.kind, StmtKind::AugAssign { op, .. } if op == "+=") {
                accumulates = true;
            }
        });
        if accumulates {
            self.push(
                LogicalFinding::new(
                    FindingCategory::OffByOne,
                    Some(line),
                    Severity::Medium,
                    0.7,
                    "Possible off-by-one: range(1, n) skips the first element while accumulating",
                )
                .with_fix("Start the range at 0, or end it at n + 1 if 1..=n was intended"),
            );
        }
    }

    fn membership_lookup(&mut self, test: &Expr, body: &[Stmt]) {
        let ExprKind::Compare {
            left,
            ops,
            comparators,
        } = &test.kind
        else {
            return;
        };
        if ops.as_slice() != [CmpOp::In] {
            return;
        }
        let (Some(key), Some(container)) = (render(left), comparators.first().and_then(|c| c.name()))
        else {
            return;
        };

        let mut misuse = Vec::new();
        walk_scope(body, &mut |s| {
            let StmtKind::Return(Some(value)) = &s.kind else {
                return;
            };
            let ExprKind::Subscript { value: base, index } = &value.kind else {
                return;
            };
            if base.name() != Some(container) {
                return;
            }
            if let Some(other) = render(index) {
                if other != key {
                    misuse.push((s.line, other));
                }
            }
        });

        for (line, other) in misuse {
            self.push(
                LogicalFinding::new(
                    FindingCategory::ContainerKeyMisuse,
                    Some(line),
                    Severity::High,
                    0.95,
                    format!(
                        "Checked '{key} in {container}' but returned '{container}[{other}]'"
                    ),
                )
                .with_fix(format!(
                    "Change '{container}[{other}]' to '{container}[{key}]'"
                )),
            );
        }
    }

    fn comparison(&mut self, compare: &Expr) {
        let ExprKind::Compare {
            left,
            ops,
            comparators,
        } = &compare.kind
        else {
            return;
        };
        let operands: Vec<&Expr> = std::iter::once(left.as_ref()).chain(comparators).collect();

        if operands.iter().all(|e| e.literal().is_some()) {
            self.push(
                LogicalFinding::new(
                    FindingCategory::AlwaysTrueFalse,
                    Some(compare.line),
                    Severity::Medium,
                    0.95,
                    "Comparison between constants always has the same result",
                )
                .with_fix("Compare against a variable or remove the condition"),
            );
            return;
        }

        let against_bool = ops
            .iter()
            .any(|op| matches!(op, CmpOp::Eq | CmpOp::NotEq | CmpOp::Is | CmpOp::IsNot))
            && operands
                .iter()
                .any(|e| matches!(e.literal(), Some(Literal::Bool(_))));
        if against_bool {
            self.push(
                LogicalFinding::new(
                    FindingCategory::WrongComparison,
                    Some(compare.line),
                    Severity::Low,
                    0.85,
                    "Comparison against a boolean literal",
                )
                .with_fix("Use the value directly as the condition (or 'not value')"),
            );
        }
    }

    fn arithmetic(&mut self, binop: &Expr) {
        let ExprKind::BinOp { left, op, right } = &binop.kind else {
            return;
        };
        match op.as_str() {
            "*" => {
                let Some(name) = [left, right]
                    .into_iter()
                    .filter_map(|e| leaf_name(e))
                    .find(|n| {
                        let n = n.to_ascii_lowercase();
                        n.contains("percent") || n.contains("pct")
                    })
                else {
                    return;
                };
                let text: String = self.line_text(binop.line).split_whitespace().collect();
                if text.contains("/100") {
                    return;
                }
                self.push(
                    LogicalFinding::new(
                        FindingCategory::MissingPercentageConversion,
                        Some(binop.line),
                        Severity::Medium,
                        0.7,
                        format!("'{name}' looks like a percentage but is used as a fraction"),
                    )
                    .with_fix(format!("Divide '{name}' by 100 before multiplying")),
                );
            }
            "+" => {
                let Some(name) = [left, right]
                    .into_iter()
                    .filter_map(|e| leaf_name(e))
                    .find(|n| n.to_ascii_lowercase().contains("discount"))
                else {
                    return;
                };
                self.push(
                    LogicalFinding::new(
                        FindingCategory::WrongOperator,
                        Some(binop.line),
                        Severity::Medium,
                        0.6,
                        format!("Adding '{name}' where a discount is usually subtracted"),
                    )
                    .with_fix("Change '+' to '-'"),
                );
            }
            _ => {}
        }
    }

    fn function(&mut self, line: u32, name: &str, params: &[String], body: &[Stmt]) {
        let mut stmts = Vec::new();
        walk_scope(body, &mut |s| stmts.push(s));

        let mut valued = Vec::new();
        let mut bare = Vec::new();
        for stmt in &stmts {
            match &stmt.kind {
                StmtKind::Return(Some(_)) => valued.push(stmt.line),
                StmtKind::Return(None) => bare.push(stmt.line),
                _ => {}
            }
        }

        let recursive = stmts.iter().any(|stmt| {
            let mut calls_self = false;
            for expr in stmt.expressions() {
                expr.walk(&mut |e| {
                    if let ExprKind::Call { func, .. } = &e.kind {
                        if func.name() == Some(name) {
                            calls_self = true;
                        }
                    }
                });
            }
            calls_self
        });

        if recursive {
            if valued.is_empty() && bare.is_empty() {
                self.push(
                    LogicalFinding::new(
                        FindingCategory::MissingReturn,
                        Some(line),
                        Severity::Critical,
                        0.9,
                        format!("Recursive function '{name}' never returns"),
                    )
                    .with_fix("Add a base case that returns a value"),
                );
            } else if !returns_under_branch(body, false) {
                self.push(
                    LogicalFinding::new(
                        FindingCategory::IncorrectBaseCase,
                        Some(line),
                        Severity::High,
                        0.8,
                        format!("Recursive function '{name}' has no conditional base case"),
                    )
                    .with_fix("Return early under an 'if' that stops the recursion"),
                );
            }
        }

        if !valued.is_empty() && !bare.is_empty() {
            self.push(
                LogicalFinding::new(
                    FindingCategory::MissingReturn,
                    Some(bare[0]),
                    Severity::Medium,
                    0.7,
                    format!("Function '{name}' mixes 'return' with and without a value"),
                )
                .with_fix("Return a value on every path"),
            );
        }

        if valued.is_empty() {
            let accumulators: Vec<&str> = stmts
                .iter()
                .filter_map(|stmt| match &stmt.kind {
                    StmtKind::AugAssign { target, op, .. } if op == "+=" => target.name(),
                    _ => None,
                })
                .collect();
            let preferred = accumulators
                .iter()
                .find(|acc| {
                    let lower = acc.to_ascii_lowercase();
                    ACCUMULATOR_HINTS.iter().any(|hint| lower.contains(hint))
                })
                .or(accumulators.first());
            if let Some(acc) = preferred {
                self.push(
                    LogicalFinding::new(
                        FindingCategory::MissingReturn,
                        Some(line),
                        Severity::Medium,
                        0.8,
                        format!("Function '{name}' accumulates into '{acc}' but never returns it"),
                    )
                    .with_fix(format!("return {acc}")),
                );
            } else if bare.is_empty() {
                self.search_without_result(line, name, &stmts);
            }
        }

        self.traversal_order(line, name, &stmts);
        self.sort_without_moves(line, name, &stmts);
        self.uninitialized(params, &stmts);
    }

    fn traversal_order(&mut self, line: u32, name: &str, stmts: &[&Stmt]) {
        let lower = name.to_ascii_lowercase();
        let Some((kind, expected)) = TRAVERSALS.iter().find(|(kind, _)| lower.contains(kind))
        else {
            return;
        };

        let mut steps = Vec::new();
        for stmt in stmts {
            for expr in stmt.expressions() {
                expr.walk(&mut |e| {
                    if let Some(step) = traversal_step(e, name) {
                        if !steps.contains(&step) {
                            steps.push(step);
                        }
                    }
                });
            }
        }
        if steps.len() != expected.len() || steps.as_slice() == expected.as_slice() {
            return;
        }
        self.push(
            LogicalFinding::new(
                FindingCategory::TraversalOrderMismatch,
                Some(line),
                Severity::High,
                0.85,
                format!(
                    "Function '{name}' visits {} but {kind} traversal is {}",
                    order_text(&steps),
                    order_text(expected)
                ),
            )
            .with_fix(format!(
                "Reorder the visit and the recursive calls in '{name}' to {}",
                order_text(expected)
            )),
        );
    }

    fn sort_without_moves(&mut self, line: u32, name: &str, stmts: &[&Stmt]) {
        let lower = name.to_ascii_lowercase();
        if !(lower.contains("sort") || lower.contains("bubble")) || !has_loop(stmts) {
            return;
        }
        let compares = has_compare(stmts);
        let moves = stmts.iter().any(|stmt| moves_element(stmt));
        if compares && moves {
            return;
        }
        let missing = match (compares, moves) {
            (false, false) => "compares or moves elements",
            (false, true) => "compares elements",
            _ => "moves elements",
        };
        self.push(
            LogicalFinding::new(
                FindingCategory::IncompleteImplementation,
                Some(line),
                Severity::Medium,
                0.6,
                format!("Function '{name}' is named like a sort but never {missing}"),
            )
            .with_fix("Compare neighbouring elements and swap them when out of order"),
        );
    }

    fn search_without_result(&mut self, line: u32, name: &str, stmts: &[&Stmt]) {
        let lower = name.to_ascii_lowercase();
        if !(lower.contains("search") || lower.contains("find")) {
            return;
        }
        if !has_loop(stmts) || !has_compare(stmts) {
            return;
        }
        let yields = stmts.iter().any(|stmt| {
            static_regex!(r"^\s*(?:\w+\s*=\s*)?yield\b").is_match(self.line_text(stmt.line))
        });
        if yields {
            return;
        }
        self.push(
            LogicalFinding::new(
                FindingCategory::MissingReturn,
                Some(line),
                Severity::High,
                0.7,
                format!("Function '{name}' is named like a search but never returns a result"),
            )
            .with_fix("Return the match when it is found, and a sentinel after the loop"),
        );
    }

    fn uninitialized(&mut self, params: &[String], stmts: &[&Stmt]) {
        let mut declared: HashSet<&str> = params.iter().map(String::as_str).collect();
        let mut first_store: HashMap<String, u32> = HashMap::new();
        for stmt in stmts {
            if let StmtKind::Global(names) = &stmt.kind {
                declared.extend(names.iter().map(String::as_str));
            }
            for (name, line) in stores(stmt) {
                first_store
                    .entry(name)
                    .and_modify(|l| *l = (*l).min(line))
                    .or_insert(line);
            }
        }

        let mut reads: Vec<(u32, &str)> = Vec::new();
        for stmt in stmts {
            for expr in loads(stmt) {
                expr.walk(&mut |e| {
                    if let ExprKind::Name(n) = &e.kind {
                        reads.push((e.line, n.as_str()));
                    }
                });
            }
        }
        reads.sort_by_key(|(line, _)| *line);

        let mut reported = HashSet::new();
        for (line, name) in reads {
            if declared.contains(name) || reported.contains(name) {
                continue;
            }
            let Some(&assigned) = first_store.get(name) else {
                continue;
            };
            if line < assigned {
                reported.insert(name);
                self.push(
                    LogicalFinding::new(
                        FindingCategory::UninitializedVariable,
                        Some(line),
                        Severity::High,
                        0.75,
                        format!("'{name}' is read before it is first assigned on line {assigned}"),
                    )
                    .with_fix(format!("Initialize '{name}' before line {line}")),
                );
            }
        }
    }
}

/// The traversal step an expression performs inside function `name`.
fn traversal_step(expr: &Expr, name: &str) -> Option<Step> {
    let ExprKind::Call { func, args } = &expr.kind else {
        return None;
    };
    let callee = match &func.kind {
        ExprKind::Attribute { attr, .. } if attr == "append" => return Some(Step::Visit),
        // `self.inorder(node.left)` recurses through a method.
        ExprKind::Attribute { attr, .. } => attr.as_str(),
        _ => func.name()?,
    };
    if callee != name {
        return None;
    }
    let rendered: Vec<String> = args.iter().filter_map(render).collect();
    if rendered.iter().any(|a| a.contains("left")) {
        Some(Step::Left)
    } else if rendered.iter().any(|a| a.contains("right")) {
        Some(Step::Right)
    } else {
        None
    }
}

fn has_loop(stmts: &[&Stmt]) -> bool {
    stmts
        .iter()
        .any(|stmt| matches!(stmt.kind, StmtKind::For { .. } | StmtKind::While { .. }))
}

fn has_compare(stmts: &[&Stmt]) -> bool {
    stmts.iter().any(|stmt| {
        let mut found = false;
        for expr in stmt.expressions() {
            expr.walk(&mut |e| found |= matches!(e.kind, ExprKind::Compare { .. }));
        }
        found
    })
}

/// A subscript store (swaps included) or a call to one of [`ELEMENT_MOVES`].
fn moves_element(stmt: &Stmt) -> bool {
    let stores_subscript = match &stmt.kind {
        StmtKind::Assign { targets, .. } => targets.iter().any(has_subscript_target),
        StmtKind::AugAssign { target, .. } => has_subscript_target(target),
        _ => false,
    };
    if stores_subscript {
        return true;
    }
    let mut calls_move = false;
    for expr in stmt.expressions() {
        expr.walk(&mut |e| {
            if let ExprKind::Call { func, .. } = &e.kind {
                if let ExprKind::Attribute { attr, .. } = &func.kind {
                    calls_move |= ELEMENT_MOVES.contains(&attr.as_str());
                }
            }
        });
    }
    calls_move
}

fn has_subscript_target(target: &Expr) -> bool {
    match &target.kind {
        ExprKind::Subscript { .. } => true,
        ExprKind::Sequence(items) => items.iter().any(has_subscript_target),
        _ => false,
    }
}

/// Whether the loop body can leave the loop: a `break` of this loop, or a
/// `return`/`raise`.
fn escapes(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break | StmtKind::Return(_) | StmtKind::Raise(_) => true,
        // A break inside a nested loop only leaves that loop.
        StmtKind::While { body, orelse, .. } | StmtKind::For { body, orelse, .. } => {
            escapes_without_break(body) || escapes(orelse)
        }
        StmtKind::FunctionDef { .. } | StmtKind::ClassDef { .. } => false,
        _ => stmt.blocks().into_iter().any(escapes),
    })
}

fn escapes_without_break(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(_) | StmtKind::Raise(_) => true,
        StmtKind::FunctionDef { .. } | StmtKind::ClassDef { .. } => false,
        _ => stmt.blocks().into_iter().any(escapes_without_break),
    })
}

fn returns_under_branch(body: &[Stmt], in_branch: bool) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(_) => in_branch,
        StmtKind::If { body, orelse, .. } => {
            returns_under_branch(body, true) || returns_under_branch(orelse, true)
        }
        StmtKind::FunctionDef { .. } | StmtKind::ClassDef { .. } => false,
        _ => stmt
            .blocks()
            .into_iter()
            .any(|block| returns_under_branch(block, in_branch)),
    })
}

/// Variables a loop condition depends on; called functions are excluded.
fn condition_names(test: &Expr) -> HashSet<String> {
    let mut callees = HashSet::new();
    let mut names = HashSet::new();
    test.walk(&mut |e| match &e.kind {
        ExprKind::Call { func, .. } => {
            if let Some(n) = func.name() {
                callees.insert(n.to_string());
            }
        }
        ExprKind::Name(n) => {
            names.insert(n.clone());
        }
        _ => {}
    });
    names.retain(|n| !callees.contains(n));
    names
}

/// Names rebound or mutated anywhere in `body` (nested loops included).
fn modified_names(body: &[Stmt]) -> HashSet<String> {
    let mut modified = HashSet::new();
    walk_scope(body, &mut |stmt| {
        for (name, _) in stores(stmt) {
            modified.insert(name);
        }
        let targets: Vec<&Expr> = match &stmt.kind {
            StmtKind::Assign { targets, .. } => targets.iter().collect(),
            StmtKind::AugAssign { target, .. } => vec![target],
            _ => Vec::new(),
        };
        for target in targets {
            if let Some(base) = base_name(target) {
                modified.insert(base.to_string());
            }
        }
        for expr in stmt.expressions() {
            expr.walk(&mut |e| {
                // `xs.pop()` and friends mutate their receiver.
                if let ExprKind::Call { func, .. } = &e.kind {
                    if let ExprKind::Attribute { value, .. } = &func.kind {
                        if let Some(n) = value.name() {
                            modified.insert(n.to_string());
                        }
                    }
                }
            });
        }
    });
    modified
}

/// Names bound by a statement, with the line of the binding.
fn stores(stmt: &Stmt) -> Vec<(String, u32)> {
    let mut names = Vec::new();
    match &stmt.kind {
        StmtKind::Assign { targets, .. } => {
            for t in targets {
                t.bound_names(&mut names);
            }
        }
        StmtKind::AugAssign { target, .. } => target.bound_names(&mut names),
        StmtKind::For { target, .. } => target.bound_names(&mut names),
        StmtKind::With { targets, .. } => {
            for t in targets {
                t.bound_names(&mut names);
            }
        }
        StmtKind::Import(imported) => names.extend(imported.iter().cloned()),
        StmtKind::FunctionDef { name, .. } | StmtKind::ClassDef { name, .. } => {
            names.push(name.clone())
        }
        StmtKind::Try { handlers, .. } => {
            return handlers
                .iter()
                .filter_map(|h| h.name.clone().map(|n| (n, h.line)))
                .collect();
        }
        _ => {}
    }
    names.into_iter().map(|n| (n, stmt.line)).collect()
}

/// Expressions a statement reads; pure binding targets are left out.
fn loads(stmt: &Stmt) -> Vec<&Expr> {
    match &stmt.kind {
        StmtKind::Assign { targets, value } => value
            .iter()
            .chain(targets.iter().flat_map(target_loads))
            .collect(),
        StmtKind::For { target, iter, .. } => {
            std::iter::once(iter).chain(target_loads(target)).collect()
        }
        StmtKind::With { items, targets, .. } => items
            .iter()
            .chain(targets.iter().flat_map(target_loads))
            .collect(),
        _ => stmt.expressions(),
    }
}

fn target_loads(target: &Expr) -> Vec<&Expr> {
    match &target.kind {
        ExprKind::Name(_) => Vec::new(),
        ExprKind::Sequence(items) => items.iter().flat_map(target_loads).collect(),
        ExprKind::Subscript { value, index } => vec![value.as_ref(), index.as_ref()],
        ExprKind::Attribute { value, .. } => vec![value.as_ref()],
        _ => vec![target],
    }
}

/// `a` for `a`, `a.b` and `a[i]`.
fn base_name(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Name(n) => Some(n),
        ExprKind::Attribute { value, .. } | ExprKind::Subscript { value, .. } => base_name(value),
        _ => None,
    }
}

/// The identifier at the end of a name or attribute chain.
fn leaf_name(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Name(n) => Some(n),
        ExprKind::Attribute { attr, .. } => Some(attr),
        _ => None,
    }
}

/// Compact source form of simple expressions, for comparing keys.
fn render(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(n) => Some(n.clone()),
        ExprKind::Const(Literal::Int(v)) => Some(v.to_string()),
        ExprKind::Const(Literal::Str(s)) => Some(format!("'{s}'")),
        ExprKind::Const(Literal::Bool(b)) => Some(if *b { "True" } else { "False" }.to_string()),
        ExprKind::Const(Literal::None) => Some("None".to_string()),
        ExprKind::Attribute { value, attr } => Some(format!("{}.{attr}", render(value)?)),
        ExprKind::Subscript { value, index } => {
            Some(format!("{}[{}]", render(value)?, render(index)?))
        }
        _ => None,
    }
}
