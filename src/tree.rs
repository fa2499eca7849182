use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
}

impl Op {
    pub fn symbol(self) -> char {
        match self {
            Op::Plus => '+',
            Op::Minus => '-',
            Op::Star => '*',
            Op::Slash => '/',
            Op::Caret => '^',
        }
    }

    /// Combines two operands. Division follows IEEE semantics, so dividing by
    /// zero produces an infinity or NaN instead of failing.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Op::Plus => lhs + rhs,
            Op::Minus => lhs - rhs,
            Op::Star => lhs * rhs,
            Op::Slash => lhs / rhs,
            Op::Caret => lhs.powf(rhs),
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Number,
    VariableOrFunction,
    Operator,
}

/// An expression tree. Every node owns its children exclusively.
///
/// A `VariableOrFunction` node with an argument is a call, one without is a
/// variable reference. Which of the two a name denotes is decided against the
/// function registry, both when parsing and again when evaluating, so the
/// registry must not change in between.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    VariableOrFunction {
        name: String,
        argument: Option<Box<Node>>,
    },
    Operator {
        op: Op,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

impl Node {
    pub fn variable(name: impl Into<String>) -> Self {
        Node::VariableOrFunction {
            name: name.into(),
            argument: None,
        }
    }

    pub fn call(name: impl Into<String>, argument: Node) -> Self {
        Node::VariableOrFunction {
            name: name.into(),
            argument: Some(Box::new(argument)),
        }
    }

    pub fn binary(op: Op, lhs: Node, rhs: Node) -> Self {
        Node::Operator {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Number(_) => NodeKind::Number,
            Node::VariableOrFunction { .. } => NodeKind::VariableOrFunction,
            Node::Operator { .. } => NodeKind::Operator,
        }
    }

    /// Children in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Number(_) => vec![],
            Node::VariableOrFunction { argument, .. } => argument.as_deref().into_iter().collect(),
            Node::Operator { lhs, rhs, .. } => vec![&**lhs, &**rhs],
        }
    }

    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Node::depth)
            .max()
            .unwrap_or(0)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Number(n) => write!(f, "{n:?}"),
            Node::VariableOrFunction {
                name,
                argument: None,
            } => write!(f, "{name}"),
            Node::VariableOrFunction {
                name,
                argument: Some(argument),
            } => write!(f, "({name} {argument})"),
            Node::Operator { op, lhs, rhs } => write!(f, "({op} {lhs} {rhs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn display_is_prefix_notation() {
        let tree = Node::binary(
            Op::Plus,
            Node::Number(1.0),
            Node::binary(Op::Star, Node::Number(2.0), Node::call("sin", Node::variable("x"))),
        );
        assert_eq!(tree.to_string(), "(+ 1.0 (* 2.0 (sin x)))");
    }

    #[test]
    fn arity_by_kind() {
        let call = Node::call("ln", Node::Number(1.0));
        let variable = Node::variable("x");
        let sum = Node::binary(Op::Minus, variable.clone(), Node::Number(2.0));

        assert_eq!(Node::Number(3.0).children().len(), 0);
        assert_eq!(variable.children().len(), 0);
        assert_eq!(call.children().len(), 1);
        assert_eq!(sum.children(), vec![&variable, &Node::Number(2.0)]);
        assert_eq!(call.kind(), NodeKind::VariableOrFunction);
        assert_eq!(sum.kind(), NodeKind::Operator);
    }

    #[test]
    fn depth_follows_nesting() {
        let tree = Node::binary(
            Op::Caret,
            Node::binary(Op::Caret, Node::Number(2.0), Node::Number(3.0)),
            Node::Number(2.0),
        );
        assert_eq!(tree.depth(), 3);
        assert_eq!(Node::Number(0.0).depth(), 1);
    }

    #[test]
    fn operators_apply() {
        assert_eq!(Op::Minus.apply(8.0, 3.0), 5.0);
        assert_eq!(Op::Caret.apply(2.0, 10.0), 1024.0);
        assert!(Op::Slash.apply(1.0, 0.0).is_infinite());
        assert!(Op::Slash.apply(0.0, 0.0).is_nan());
    }
}
