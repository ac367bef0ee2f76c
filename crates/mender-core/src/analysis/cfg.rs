//! Control-flow graph over one Python scope.
//!
//! Nodes live in an arena and refer to each other by index; edges are
//! plain adjacency lists. Reachability is a separate traversal over the
//! finished graph.

use super::syntax::{Stmt, StmtKind};

/// Index of a node in [`Cfg::nodes`].
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgNodeKind {
    Entry,
    Exit,
    /// A statement, at its 1-indexed source line.
    Statement { line: u32 },
    /// Join point after an `if`/`try`.
    Merge,
    /// Target of `break` and of loop completion.
    LoopExit,
}

#[derive(Debug, Clone)]
pub struct CfgNode {
    pub kind: CfgNodeKind,
    pub successors: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Cfg {
    pub nodes: Vec<CfgNode>,
    pub entry: NodeId,
    pub exit: NodeId,
}

impl Cfg {
    /// Build the graph for one scope. Nested function and class bodies
    /// are single statements here; they get graphs of their own.
    pub fn build(body: &[Stmt]) -> Cfg {
        let mut builder = Builder {
            nodes: Vec::new(),
            loops: Vec::new(),
            exit: 0,
        };
        let entry = builder.add(CfgNodeKind::Entry);
        let exit = builder.add(CfgNodeKind::Exit);
        builder.exit = exit;
        let tail = builder.block(body, vec![entry]);
        for node in tail {
            builder.edge(node, exit);
        }
        Cfg {
            nodes: builder.nodes,
            entry,
            exit,
        }
    }

    /// Nodes reachable from the entry.
    pub fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.entry];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id], true) {
                continue;
            }
            stack.extend(self.nodes[id].successors.iter().copied());
        }
        seen
    }

    /// Source lines that start an unreachable region.
    ///
    /// A region is reported once, at its first statement: statements that
    /// are only entered (by a forward edge) from other unreachable
    /// statements are covered by that head.
    pub fn unreachable_lines(&self) -> Vec<u32> {
        let reachable = self.reachable();
        let is_dead_statement = |id: NodeId| {
            !reachable[id] && matches!(self.nodes[id].kind, CfgNodeKind::Statement { .. })
        };

        let mut covered = vec![false; self.nodes.len()];
        for id in (0..self.nodes.len()).filter(|&id| is_dead_statement(id)) {
            let mut stack: Vec<NodeId> = self.forward(id).collect();
            while let Some(next) = stack.pop() {
                if std::mem::replace(&mut covered[next], true) {
                    continue;
                }
                stack.extend(self.forward(next));
            }
        }

        let mut lines: Vec<u32> = (0..self.nodes.len())
            .filter(|&id| is_dead_statement(id) && !covered[id])
            .filter_map(|id| match self.nodes[id].kind {
                CfgNodeKind::Statement { line } => Some(line),
                _ => None,
            })
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    fn forward(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .successors
            .iter()
            .copied()
            .filter(move |&next| next > id)
    }
}

struct LoopFrame {
    header: NodeId,
    exit: NodeId,
}

struct Builder {
    nodes: Vec<CfgNode>,
    loops: Vec<LoopFrame>,
    exit: NodeId,
}

impl Builder {
    fn add(&mut self, kind: CfgNodeKind) -> NodeId {
        self.nodes.push(CfgNode {
            kind,
            successors: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn edge(&mut self, from: NodeId, to: NodeId) {
        if !self.nodes[from].successors.contains(&to) {
            self.nodes[from].successors.push(to);
        }
    }

    fn statement_node(&mut self, line: u32, preds: &[NodeId]) -> NodeId {
        let id = self.add(CfgNodeKind::Statement { line });
        for &pred in preds {
            self.edge(pred, id);
        }
        id
    }

    /// Wire `stmts` after `preds`; returns the nodes that fall through.
    fn block(&mut self, stmts: &[Stmt], mut preds: Vec<NodeId>) -> Vec<NodeId> {
        for stmt in stmts {
            preds = self.statement(stmt, preds);
        }
        preds
    }

    fn statement(&mut self, stmt: &Stmt, preds: Vec<NodeId>) -> Vec<NodeId> {
        let node = self.statement_node(stmt.line, &preds);
        match &stmt.kind {
            StmtKind::Return(_) | StmtKind::Raise(_) => {
                self.edge(node, self.exit);
                Vec::new()
            }
            StmtKind::Break => {
                if let Some(target) = self.loops.last().map(|l| l.exit) {
                    self.edge(node, target);
                }
                Vec::new()
            }
            StmtKind::Continue => {
                if let Some(target) = self.loops.last().map(|l| l.header) {
                    self.edge(node, target);
                }
                Vec::new()
            }
            StmtKind::If { test, body, orelse } => {
                let constant = test.literal().map(|lit| lit.truthy());
                let body_in = if constant == Some(false) {
                    Vec::new()
                } else {
                    vec![node]
                };
                let else_in = if constant == Some(true) {
                    Vec::new()
                } else {
                    vec![node]
                };
                let mut outs = self.block(body, body_in);
                outs.extend(self.block(orelse, else_in));
                self.merge(outs)
            }
            StmtKind::While { test, body, orelse } => {
                let forever = test.literal().is_some_and(|lit| lit.truthy());
                self.looping(node, body, orelse, forever)
            }
            StmtKind::For { body, orelse, .. } => self.looping(node, body, orelse, false),
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                let body_out = self.block(body, vec![node]);
                let mut outs = self.block(orelse, body_out);
                for handler in handlers {
                    outs.extend(self.block(&handler.body, vec![node]));
                }
                if finalbody.is_empty() {
                    return self.merge(outs);
                }
                // `finally` also runs on the way out of a `return`, `raise`
                // or uncaught exception, so the try node enters it directly.
                let falls_through = !outs.is_empty();
                let mut entry = self.merge(outs);
                entry.push(node);
                let tail = self.block(finalbody, entry);
                if falls_through {
                    tail
                } else {
                    for out in tail {
                        self.edge(out, self.exit);
                    }
                    Vec::new()
                }
            }
            StmtKind::With { body, .. } => self.block(body, vec![node]),
            _ => vec![node],
        }
    }

    fn merge(&mut self, outs: Vec<NodeId>) -> Vec<NodeId> {
        let merge = self.add(CfgNodeKind::Merge);
        for out in outs {
            self.edge(out, merge);
        }
        vec![merge]
    }

    fn looping(
        &mut self,
        header: NodeId,
        body: &[Stmt],
        orelse: &[Stmt],
        forever: bool,
    ) -> Vec<NodeId> {
        let exit = self.add(CfgNodeKind::LoopExit);
        self.loops.push(LoopFrame { header, exit });
        let body_out = self.block(body, vec![header]);
        self.loops.pop();
        for node in body_out {
            self.edge(node, header);
        }
        if !forever {
            for node in self.block(orelse, vec![header]) {
                self.edge(node, exit);
            }
        }
        vec![exit]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::syntax::{parse, StmtKind};

    fn function_cfg(src: &str) -> Cfg {
        let module = parse(src).unwrap();
        match &module.body[0].kind {
            StmtKind::FunctionDef { body, .. } => Cfg::build(body),
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_straight_line_is_fully_reachable() {
        let cfg = Cfg::build(&parse("a = 1\nb = a + 1\nprint(b)\n").unwrap().body);
        assert!(cfg.reachable().iter().all(|r| *r));
        assert!(cfg.unreachable_lines().is_empty());
    }

    #[test]
    fn test_code_after_return_reported_once() {
        let cfg = function_cfg("def f():\n    return 1\n    x = 2\n    y = 3\n");
        assert_eq!(cfg.unreachable_lines(), vec![3]);
    }

    #[test]
    fn test_code_after_break_in_loop() {
        let cfg = function_cfg(
            "def f(xs):\n    for x in xs:\n        break\n        print(x)\n    return 0\n",
        );
        assert_eq!(cfg.unreachable_lines(), vec![4]);
    }

    #[test]
    fn test_both_branches_return() {
        let src = "def f(x):\n    if x:\n        return 1\n    else:\n        return 2\n    print('never')\n";
        assert_eq!(function_cfg(src).unreachable_lines(), vec![6]);
    }

    #[test]
    fn test_one_branch_returns_keeps_rest_reachable() {
        let src = "def f(x):\n    if x:\n        return 1\n    y = 2\n    return y\n";
        assert!(function_cfg(src).unreachable_lines().is_empty());
    }

    #[test]
    fn test_dead_loop_region_reported_at_head() {
        let src = "def f():\n    return 0\n    while x:\n        x -= 1\n    done()\n";
        assert_eq!(function_cfg(src).unreachable_lines(), vec![3]);
    }

    #[test]
    fn test_while_true_without_break_ends_flow() {
        let src = "def f():\n    while True:\n        step()\n    cleanup()\n";
        assert_eq!(function_cfg(src).unreachable_lines(), vec![4]);
    }

    #[test]
    fn test_while_true_with_break_keeps_flow() {
        let src = "def f():\n    while True:\n        if done():\n            break\n    cleanup()\n";
        assert!(function_cfg(src).unreachable_lines().is_empty());
    }

    #[test]
    fn test_continue_returns_to_header() {
        let src = "def f(xs):\n    for x in xs:\n        continue\n        skip(x)\n    return 1\n";
        assert_eq!(function_cfg(src).unreachable_lines(), vec![4]);
    }

    #[test]
    fn test_finally_after_returning_body_is_reachable() {
        let src = "def read(path):\n    f = open(path)\n    try:\n        return f.read()\n    finally:\n        f.close()\n";
        assert!(function_cfg(src).unreachable_lines().is_empty());

        let src = "def f(x):\n    try:\n        return g(x)\n    except ValueError:\n        raise\n    finally:\n        log()\n";
        assert!(function_cfg(src).unreachable_lines().is_empty());
    }

    #[test]
    fn test_code_after_abrupt_try_finally_is_unreachable() {
        let src = "def f():\n    try:\n        return 1\n    finally:\n        log()\n    print('never')\n";
        assert_eq!(function_cfg(src).unreachable_lines(), vec![6]);
    }

    #[test]
    fn test_finally_falls_through_when_body_does() {
        let src = "def f():\n    try:\n        x = 1\n    finally:\n        log()\n    return x\n";
        assert!(function_cfg(src).unreachable_lines().is_empty());
    }

    #[test]
    fn test_try_handlers_are_reachable() {
        let src = "def f():\n    try:\n        return risky()\n    except ValueError:\n        log()\n    return None\n";
        assert!(function_cfg(src).unreachable_lines().is_empty());
    }
}
