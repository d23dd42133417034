use super::ExpressionError;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Abs,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "exp" => Some(Self::Exp),
            "log" | "ln" => Some(Self::Log),
            "sqrt" => Some(Self::Sqrt),
            "abs" => Some(Self::Abs),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
        }
    }

    fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Exp => x.exp(),
            Self::Log => x.ln(),
            Self::Sqrt => x.sqrt(),
            Self::Abs => x.abs(),
        }
    }
}

/// Expression tree.
///
/// Subtraction and division never appear as nodes: `a - b` is stored as
/// `a + (-1)*b` and `a / b` as `a * b**-1`, which lets sums and products be
/// flattened and reordered freely during canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Symbol(String),
    Add(Vec<Node>),
    Mul(Vec<Node>),
    Pow(Box<Node>, Box<Node>),
    Call(Function, Box<Node>),
}

impl Node {
    pub fn negate(node: Node) -> Node {
        match node {
            Node::Number(n) => Node::Number(-n),
            other => Node::Mul(vec![Node::Number(-1.0), other]),
        }
    }

    pub fn reciprocal(node: Node) -> Node {
        Node::Pow(Box::new(node), Box::new(Node::Number(-1.0)))
    }

    fn rank(&self) -> u8 {
        match self {
            Node::Number(_) => 0,
            Node::Symbol(_) => 1,
            Node::Pow(..) => 2,
            Node::Mul(_) => 3,
            Node::Add(_) => 4,
            Node::Call(..) => 5,
        }
    }

    /// Total order used to sort the operands of sums and products.
    fn canonical_cmp(&self, other: &Node) -> Ordering {
        match (self, other) {
            (Node::Number(a), Node::Number(b)) => a.total_cmp(b),
            (Node::Symbol(a), Node::Symbol(b)) => a.cmp(b),
            (Node::Add(a), Node::Add(b)) | (Node::Mul(a), Node::Mul(b)) => cmp_slices(a, b),
            (Node::Pow(ab, ae), Node::Pow(bb, be)) => {
                ab.canonical_cmp(bb).then_with(|| ae.canonical_cmp(be))
            }
            (Node::Call(fa, a), Node::Call(fb, b)) => fa.cmp(fb).then_with(|| a.canonical_cmp(b)),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Rewrites the tree into its canonical form.
    pub fn canonicalize(self) -> Node {
        match self {
            Node::Number(_) | Node::Symbol(_) => self,
            Node::Add(terms) => canonical_sum(terms),
            Node::Mul(factors) => canonical_product(factors),
            Node::Pow(base, exponent) => canonical_power(base.canonicalize(), exponent.canonicalize()),
            Node::Call(function, arg) => match arg.canonicalize() {
                Node::Number(x) => Node::Number(function.apply(x)),
                arg => Node::Call(function, Box::new(arg)),
            },
        }
    }

    pub fn collect_symbols(&self, symbols: &mut BTreeSet<String>) {
        match self {
            Node::Number(_) => {}
            Node::Symbol(name) => {
                symbols.insert(name.clone());
            }
            Node::Add(children) | Node::Mul(children) => {
                for child in children {
                    child.collect_symbols(symbols);
                }
            }
            Node::Pow(base, exponent) => {
                base.collect_symbols(symbols);
                exponent.collect_symbols(symbols);
            }
            Node::Call(_, arg) => arg.collect_symbols(symbols),
        }
    }

    pub fn substitute(self, name: &str, value: f64) -> Node {
        match self {
            Node::Symbol(s) if s == name => Node::Number(value),
            Node::Number(_) | Node::Symbol(_) => self,
            Node::Add(children) => Node::Add(
                children
                    .into_iter()
                    .map(|c| c.substitute(name, value))
                    .collect(),
            ),
            Node::Mul(children) => Node::Mul(
                children
                    .into_iter()
                    .map(|c| c.substitute(name, value))
                    .collect(),
            ),
            Node::Pow(base, exponent) => Node::Pow(
                Box::new(base.substitute(name, value)),
                Box::new(exponent.substitute(name, value)),
            ),
            Node::Call(function, arg) => Node::Call(function, Box::new(arg.substitute(name, value))),
        }
    }

    pub fn evaluate(&self, bindings: &HashMap<&str, f64>) -> Result<f64, ExpressionError> {
        let value = match self {
            Node::Number(n) => *n,
            Node::Symbol(name) => *bindings
                .get(name.as_str())
                .ok_or_else(|| ExpressionError::UnboundSymbol(name.clone()))?,
            Node::Add(children) => {
                let mut sum = 0.0;
                for child in children {
                    sum += child.evaluate(bindings)?;
                }
                sum
            }
            Node::Mul(children) => {
                let mut product = 1.0;
                for child in children {
                    product *= child.evaluate(bindings)?;
                }
                product
            }
            Node::Pow(base, exponent) => base.evaluate(bindings)?.powf(exponent.evaluate(bindings)?),
            Node::Call(function, arg) => function.apply(arg.evaluate(bindings)?),
        };
        if value.is_nan() {
            return Err(ExpressionError::NotANumber);
        }
        Ok(value)
    }
}

fn cmp_slices(a: &[Node], b: &[Node]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x.canonical_cmp(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn canonical_sum(terms: Vec<Node>) -> Node {
    let mut constant = 0.0;
    let mut rest = Vec::with_capacity(terms.len());
    for term in terms {
        match term.canonicalize() {
            Node::Number(n) => constant += n,
            Node::Add(inner) => {
                // inner sums are already canonical, so their constants sit first
                for t in inner {
                    match t {
                        Node::Number(n) => constant += n,
                        other => rest.push(other),
                    }
                }
            }
            other => rest.push(other),
        }
    }
    if constant != 0.0 || rest.is_empty() {
        rest.push(Node::Number(constant));
    }
    rest.sort_by(|a, b| a.canonical_cmp(b));
    if rest.len() == 1 {
        return rest.remove(0);
    }
    Node::Add(rest)
}

fn canonical_product(factors: Vec<Node>) -> Node {
    let mut coefficient = 1.0;
    let mut rest = Vec::with_capacity(factors.len());
    for factor in factors {
        match factor.canonicalize() {
            Node::Number(n) => coefficient *= n,
            Node::Mul(inner) => {
                for f in inner {
                    match f {
                        Node::Number(n) => coefficient *= n,
                        other => rest.push(other),
                    }
                }
            }
            other => rest.push(other),
        }
    }
    if coefficient == 0.0 {
        return Node::Number(0.0);
    }
    if coefficient != 1.0 || rest.is_empty() {
        rest.push(Node::Number(coefficient));
    }
    rest.sort_by(|a, b| a.canonical_cmp(b));
    if rest.len() == 1 {
        return rest.remove(0);
    }
    Node::Mul(rest)
}

fn canonical_power(base: Node, exponent: Node) -> Node {
    match (base, exponent) {
        (Node::Number(b), Node::Number(e)) => Node::Number(b.powf(e)),
        (base, Node::Number(e)) if e == 1.0 => base,
        (_, Node::Number(e)) if e == 0.0 => Node::Number(1.0),
        (base, exponent) => Node::Pow(Box::new(base), Box::new(exponent)),
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(n) => write!(f, "{}", n),
            Node::Symbol(s) => write!(f, "{}", s),
            Node::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
            Node::Mul(factors) => {
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    if matches!(factor, Node::Add(_)) {
                        write!(f, "({})", factor)?;
                    } else {
                        write!(f, "{}", factor)?;
                    }
                }
                Ok(())
            }
            Node::Pow(base, exponent) => {
                let wrap = |node: &Node| !matches!(node, Node::Symbol(_) | Node::Call(..))
                    && !matches!(node, Node::Number(n) if *n >= 0.0);
                if wrap(base) {
                    write!(f, "({})", base)?;
                } else {
                    write!(f, "{}", base)?;
                }
                write!(f, "**")?;
                if wrap(exponent) {
                    write!(f, "({})", exponent)
                } else {
                    write!(f, "{}", exponent)
                }
            }
            Node::Call(function, arg) => write!(f, "{}({})", function.name(), arg),
        }
    }
}
