use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use crate::ast::BinOp;
use crate::value::Value;

/// Abstract Syntax Tree node representing a parsed rule expression.
///
/// Trees are immutable once parsed, except for the one-slot memories of the
/// stateful forms [`Expr::EdgeIf`] and [`Expr::At`], which live in cells so
/// that a program can be re-entered while it is still being evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal number or string
    ///
    /// # Example
    /// ```text
    /// 42
    /// 0.5
    /// "down"
    /// ```
    Const(Value),

    /// Plain symbol reference
    ///
    /// # Example
    /// ```text
    /// cpu.0
    /// ```
    Var(String),

    /// Wildcard symbol reference, evaluates to the list of values of every
    /// symbol whose name matches.
    ///
    /// # Example
    /// ```text
    /// cpu.*
    /// ```
    Glob(String),

    /// Assignment to a plain symbol; evaluates to the assigned value.
    ///
    /// # Example
    /// ```text
    /// total = a + b
    /// ```
    Assign { target: String, value: Box<Expr> },

    /// Binary operation (arithmetic, comparison, logical)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary minus
    Negate(Box<Expr>),

    /// `a ; b`: evaluates `a`, then returns the result of `b`
    Sequence(Box<Expr>, Box<Expr>),

    /// Braced statement list, returns the last statement's value
    ///
    /// # Example
    /// ```text
    /// { hot = 1; print("cpu.*") }
    /// ```
    Block(Vec<Expr>),

    /// Conditional evaluated on every run
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },

    /// Fires a branch only when the condition flips
    ///
    /// # Example
    /// ```text
    /// edge_if load > 2 then alarm = 1 else alarm = 0
    /// ```
    EdgeIf {
        cond: Box<Expr>,
        on_true: Box<Expr>,
        on_false: Box<Expr>,
        previous: Cell<bool>,
    },

    /// Evaluates `action` only when `watch` changed since last time
    ///
    /// # Example
    /// ```text
    /// at hour do print("requests.*")
    /// ```
    At {
        watch: Box<Expr>,
        action: Box<Expr>,
        previous: RefCell<Option<Value>>,
    },

    /// Call to a registered native function
    ///
    /// # Example
    /// ```text
    /// round(sum(cpu.*), 2)
    /// ```
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn edge_if(cond: Expr, on_true: Expr, on_false: Expr) -> Self {
        Expr::EdgeIf {
            cond: Box::new(cond),
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
            previous: Cell::new(false),
        }
    }

    pub fn at(watch: Expr, action: Expr) -> Self {
        Expr::At {
            watch: Box::new(watch),
            action: Box::new(action),
            previous: RefCell::new(None),
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Symbol names and glob patterns this expression reacts to.
    ///
    /// Depends only on the tree shape. Assignment targets are not
    /// dependencies, and the stateful forms only react to their condition.
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        self.collect_dependencies(&mut deps);
        deps
    }

    fn collect_dependencies(&self, deps: &mut BTreeSet<String>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(name) | Expr::Glob(name) => {
                deps.insert(name.clone());
            }
            Expr::Assign { value, .. } => value.collect_dependencies(deps),
            Expr::BinaryOp { left, right, .. } | Expr::Sequence(left, right) => {
                left.collect_dependencies(deps);
                right.collect_dependencies(deps);
            }
            Expr::Negate(inner) => inner.collect_dependencies(deps),
            Expr::Block(stmts) => {
                for stmt in stmts {
                    stmt.collect_dependencies(deps);
                }
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.collect_dependencies(deps);
                then_branch.collect_dependencies(deps);
                if let Some(branch) = else_branch {
                    branch.collect_dependencies(deps);
                }
            }
            Expr::EdgeIf { cond, .. } => cond.collect_dependencies(deps),
            Expr::At { watch, .. } => watch.collect_dependencies(deps),
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_dependencies(deps);
                }
            }
        }
    }

    /// Fully parenthesized rendering of the tree, for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Expr::Const(value) => value.to_string(),
            Expr::Var(name) | Expr::Glob(name) => name.clone(),
            Expr::Assign { target, value } => format!("({} = {})", target, value.describe()),
            Expr::BinaryOp { op, left, right } => {
                format!("({} {} {})", left.describe(), op.symbol(), right.describe())
            }
            Expr::Negate(inner) => format!("(-{})", inner.describe()),
            Expr::Sequence(first, second) => {
                format!("({}; {})", first.describe(), second.describe())
            }
            Expr::Block(stmts) => {
                let inner: Vec<String> = stmts.iter().map(Expr::describe).collect();
                format!("{{{}}}", inner.join("; "))
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(branch) => format!(
                    "(if {} then {} else {})",
                    cond.describe(),
                    then_branch.describe(),
                    branch.describe()
                ),
                None => format!("(if {} then {})", cond.describe(), then_branch.describe()),
            },
            Expr::EdgeIf {
                cond,
                on_true,
                on_false,
                ..
            } => format!(
                "(edge_if {} then {} else {})",
                cond.describe(),
                on_true.describe(),
                on_false.describe()
            ),
            Expr::At { watch, action, .. } => {
                format!("(at {} do {})", watch.describe(), action.describe())
            }
            Expr::Call { name, args } => {
                let args: Vec<String> = args.iter().map(Expr::describe).collect();
                format!("{}({})", name, args.join(", "))
            }
        }
    }
}
