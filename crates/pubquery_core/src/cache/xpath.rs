//! Path expressions over a published snapshot.
//!
//! # Responsibility
//! - Compile a practical XPath subset into an immutable expression.
//! - Evaluate compiled expressions against any tree exposing
//!   [`XPathNavigator`].
//!
//! # Invariants
//! - Results are returned in document order without duplicates.
//! - Syntax errors and undefined variables are errors, never empty results.
//!
//! The virtual document has one element named `root`; top-level items are its
//! children and every item element is named by its content type alias.

use crate::cache::{CacheError, CacheResult, XPathVariable};
use crate::model::item::PublishedItem;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

const ROOT_ELEMENT: &str = "root";

/// Read-only tree access used by the evaluator.
///
/// Item indexes must be assigned in document (pre-order) order.
pub trait XPathNavigator {
    fn top_level(&self) -> &[usize];
    fn children(&self, index: usize) -> &[usize];
    fn parent(&self, index: usize) -> Option<usize>;
    fn item(&self, index: usize) -> &PublishedItem;
}

/// Compiled, immutable path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct XPathExpression {
    source: String,
    steps: Vec<Step>,
    /// Every `$name` referenced by a predicate, in first-use order.
    variables: Vec<String>,
}

impl XPathExpression {
    /// Parses `source` into a reusable expression.
    pub fn compile(source: &str) -> CacheResult<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let steps = parser.parse_path()?;
        let mut variables = Vec::new();
        for predicate in steps.iter().flat_map(|step| &step.predicates) {
            predicate.collect_variables(&mut variables);
        }
        Ok(Self {
            source: source.to_string(),
            steps,
            variables,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression and returns matching item indexes in document
    /// order.
    pub fn evaluate(
        &self,
        tree: &impl XPathNavigator,
        vars: &[XPathVariable],
    ) -> CacheResult<Vec<usize>> {
        // Unbound variables fail even when no node reaches the predicate.
        if let Some(name) = self
            .variables
            .iter()
            .find(|name| !vars.iter().any(|variable| variable.name == **name))
        {
            return Err(CacheError::UndefinedVariable {
                expression: self.source.clone(),
                name: name.clone(),
            });
        }

        let eval = Evaluator {
            tree,
            vars,
            source: &self.source,
        };

        let mut context = BTreeSet::from([Node::Document]);
        for step in &self.steps {
            let mut next = BTreeSet::new();
            let origins = if step.descendants {
                eval.descendants_or_self(&context)
            } else {
                context
            };
            for node in origins {
                for selected in eval.apply_step(node, step)? {
                    next.insert(selected);
                }
            }
            context = next;
        }

        Ok(context
            .into_iter()
            .filter_map(|node| match node {
                Node::Item(index) => Some(index),
                Node::Document | Node::Root => None,
            })
            .collect())
    }
}

impl Display for XPathExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Node {
    Document,
    Root,
    Item(usize),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    /// Preceded by `//`.
    descendants: bool,
    axis: StepAxis,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
enum StepAxis {
    SelfNode,
    Parent,
    Child(NameTest),
}

#[derive(Debug, Clone, PartialEq)]
enum NameTest {
    Any,
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Attribute(String),
    Property(String),
    Literal(String),
    Number(f64),
    Variable(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CmpOp, Box<Expr>),
}

impl Expr {
    fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Self::Variable(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Self::Not(inner) => inner.collect_variables(out),
            Self::And(left, right) | Self::Or(left, right) | Self::Compare(left, _, right) => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Self::Attribute(_) | Self::Property(_) | Self::Literal(_) | Self::Number(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    Star,
    At,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Name(String),
    Literal(String),
    Number(f64),
    Variable(String),
    Op(CmpOp),
}

fn tokenize(source: &str) -> CacheResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '.' if chars.get(i + 1) == Some(&'.') => {
                tokens.push(Token::DotDot);
                i += 2;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '@' => {
                tokens.push(Token::At);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op(CmpOp::Eq));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CmpOp::Ne));
                i += 2;
            }
            '<' | '>' => {
                let with_eq = chars.get(i + 1) == Some(&'=');
                let op = match (c, with_eq) {
                    ('<', true) => CmpOp::Le,
                    ('<', false) => CmpOp::Lt,
                    (_, true) => CmpOp::Ge,
                    (_, false) => CmpOp::Gt,
                };
                tokens.push(Token::Op(op));
                i += if with_eq { 2 } else { 1 };
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|value| *value == c)
                    .ok_or_else(|| syntax_error(source, "unterminated string literal"))?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '$' => {
                let (name, next) = read_name(&chars, i + 1);
                if name.is_empty() {
                    return Err(syntax_error(source, "expected variable name after `$`"));
                }
                tokens.push(Token::Variable(name));
                i = next;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| syntax_error(source, &format!("invalid number `{text}`")))?;
                tokens.push(Token::Number(number));
            }
            c if is_name_start(c) => {
                let (name, next) = read_name(&chars, i);
                tokens.push(Token::Name(name));
                i = next;
            }
            other => {
                return Err(syntax_error(
                    source,
                    &format!("unexpected character `{other}`"),
                ))
            }
        }
    }

    Ok(tokens)
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn read_name(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    if end < chars.len() && is_name_start(chars[end]) {
        end += 1;
        while end < chars.len()
            && (chars[end].is_ascii_alphanumeric() || chars[end] == '_' || chars[end] == '-')
        {
            end += 1;
        }
    }
    (chars[start..end].iter().collect(), end)
}

fn syntax_error(source: &str, message: &str) -> CacheError {
    CacheError::InvalidXPath {
        expression: source.to_string(),
        message: message.to_string(),
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> CacheResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            _ => Err(self.error(&format!("expected {what}"))),
        }
    }

    fn error(&self, message: &str) -> CacheError {
        syntax_error(self.source, message)
    }

    fn parse_path(&mut self) -> CacheResult<Vec<Step>> {
        let mut steps = Vec::new();
        match self.peek() {
            None => return Err(self.error("expression is empty")),
            Some(Token::Slash) | Some(Token::DoubleSlash) => {}
            Some(_) => return Err(self.error("path expression must be absolute")),
        }

        while let Some(separator) = self.next() {
            let descendants = match separator {
                Token::Slash => false,
                Token::DoubleSlash => true,
                _ => return Err(self.error("expected `/` or `//` between steps")),
            };
            if self.peek().is_none() {
                if descendants || !steps.is_empty() {
                    return Err(self.error("expected step after separator"));
                }
                // `/` alone selects the document node, which is never an item.
                break;
            }
            steps.push(self.parse_step(descendants)?);
        }

        Ok(steps)
    }

    fn parse_step(&mut self, descendants: bool) -> CacheResult<Step> {
        let axis = match self.next() {
            Some(Token::Dot) => StepAxis::SelfNode,
            Some(Token::DotDot) => StepAxis::Parent,
            Some(Token::Star) => StepAxis::Child(NameTest::Any),
            Some(Token::Name(name)) => StepAxis::Child(NameTest::Name(name)),
            _ => return Err(self.error("expected element name, `*`, `.` or `..`")),
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            if !matches!(axis, StepAxis::Child(_)) {
                return Err(self.error("predicates are not allowed after `.` or `..`"));
            }
            self.next();
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket, "`]`")?;
        }

        Ok(Step {
            descendants,
            axis,
            predicates,
        })
    }

    fn parse_or(&mut self) -> CacheResult<Expr> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Name(name)) if name == "or") {
            self.next();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> CacheResult<Expr> {
        let mut left = self.parse_compare()?;
        while matches!(self.peek(), Some(Token::Name(name)) if name == "and") {
            self.next();
            let right = self.parse_compare()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_compare(&mut self) -> CacheResult<Expr> {
        let left = self.parse_primary()?;
        if let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            self.next();
            let right = self.parse_primary()?;
            return Ok(Expr::Compare(Box::new(left), op, Box::new(right)));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> CacheResult<Expr> {
        match self.next() {
            Some(Token::At) => match self.next() {
                Some(Token::Name(name)) => Ok(Expr::Attribute(name)),
                _ => Err(self.error("expected attribute name after `@`")),
            },
            Some(Token::Name(name)) if name == "not" && self.peek() == Some(&Token::LParen) => {
                self.next();
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(Expr::Not(Box::new(inner)))
            }
            Some(Token::Name(name)) => Ok(Expr::Property(name)),
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Variable(name)) => Ok(Expr::Variable(name)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            _ => Err(self.error("expected predicate operand")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    /// Attribute/property lookup; `None` is an empty node-set.
    Node(Option<String>),
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Self::Node(value) => value.is_some(),
            Self::Text(value) => !value.is_empty(),
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::Bool(value) => *value,
        }
    }

    fn as_number(&self) -> f64 {
        match self {
            Self::Node(Some(value)) | Self::Text(value) => {
                value.trim().parse::<f64>().unwrap_or(f64::NAN)
            }
            Self::Node(None) => f64::NAN,
            Self::Number(value) => *value,
            Self::Bool(value) => f64::from(u8::from(*value)),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Self::Node(value) => value.clone().unwrap_or_default(),
            Self::Text(value) => value.clone(),
            Self::Number(value) if value.fract() == 0.0 && value.is_finite() => {
                format!("{}", *value as i64)
            }
            Self::Number(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

struct Evaluator<'a, T: XPathNavigator> {
    tree: &'a T,
    vars: &'a [XPathVariable],
    source: &'a str,
}

impl<T: XPathNavigator> Evaluator<'_, T> {
    fn children(&self, node: Node) -> Vec<Node> {
        match node {
            Node::Document => vec![Node::Root],
            Node::Root => self.tree.top_level().iter().copied().map(Node::Item).collect(),
            Node::Item(index) => self
                .tree
                .children(index)
                .iter()
                .copied()
                .map(Node::Item)
                .collect(),
        }
    }

    fn parent(&self, node: Node) -> Option<Node> {
        match node {
            Node::Document => None,
            Node::Root => Some(Node::Document),
            Node::Item(index) => Some(self.tree.parent(index).map_or(Node::Root, Node::Item)),
        }
    }

    fn descendants_or_self(&self, context: &BTreeSet<Node>) -> BTreeSet<Node> {
        let mut result = BTreeSet::new();
        let mut stack: Vec<Node> = context.iter().copied().collect();
        while let Some(node) = stack.pop() {
            if result.insert(node) {
                stack.extend(self.children(node));
            }
        }
        result
    }

    fn element_name(&self, node: Node) -> Option<&str> {
        match node {
            Node::Document => None,
            Node::Root => Some(ROOT_ELEMENT),
            Node::Item(index) => Some(self.tree.item(index).content_type.as_str()),
        }
    }

    fn apply_step(&self, node: Node, step: &Step) -> CacheResult<Vec<Node>> {
        let test = match &step.axis {
            StepAxis::SelfNode => return Ok(vec![node]),
            StepAxis::Parent => return Ok(self.parent(node).into_iter().collect()),
            StepAxis::Child(test) => test,
        };

        let mut candidates: Vec<Node> = self
            .children(node)
            .into_iter()
            .filter(|child| match test {
                NameTest::Any => true,
                NameTest::Name(name) => self.element_name(*child) == Some(name.as_str()),
            })
            .collect();

        for predicate in &step.predicates {
            let mut kept = Vec::with_capacity(candidates.len());
            for (offset, candidate) in candidates.iter().enumerate() {
                let position = (offset + 1) as f64;
                let matched = match predicate {
                    Expr::Number(wanted) => *wanted == position,
                    other => self.eval(other, *candidate)?.truthy(),
                };
                if matched {
                    kept.push(*candidate);
                }
            }
            candidates = kept;
        }

        Ok(candidates)
    }

    fn eval(&self, expr: &Expr, node: Node) -> CacheResult<Value> {
        Ok(match expr {
            Expr::Attribute(name) => Value::Node(self.attribute(node, name)),
            Expr::Property(name) => Value::Node(self.property(node, name)),
            Expr::Literal(value) => Value::Text(value.clone()),
            Expr::Number(value) => Value::Number(*value),
            Expr::Variable(name) => {
                let variable = self
                    .vars
                    .iter()
                    .find(|variable| variable.name == *name)
                    .ok_or_else(|| CacheError::UndefinedVariable {
                        expression: self.source.to_string(),
                        name: name.clone(),
                    })?;
                Value::Text(variable.value.clone())
            }
            Expr::Not(inner) => Value::Bool(!self.eval(inner, node)?.truthy()),
            Expr::And(left, right) => {
                Value::Bool(self.eval(left, node)?.truthy() && self.eval(right, node)?.truthy())
            }
            Expr::Or(left, right) => {
                Value::Bool(self.eval(left, node)?.truthy() || self.eval(right, node)?.truthy())
            }
            Expr::Compare(left, op, right) => {
                let left = self.eval(left, node)?;
                let right = self.eval(right, node)?;
                Value::Bool(compare(&left, *op, &right))
            }
        })
    }

    fn attribute(&self, node: Node, name: &str) -> Option<String> {
        let Node::Item(index) = node else {
            return None;
        };
        let item = self.tree.item(index);
        match name {
            "id" => Some(item.id.to_string()),
            "key" => Some(item.key.to_string()),
            "parentID" => Some(item.parent_id.unwrap_or(-1).to_string()),
            "level" => Some(item.level.to_string()),
            "nodeName" => Some(item.name.clone()),
            "urlName" => Some(item.url_name.clone()),
            "sortOrder" => Some(item.sort_order.to_string()),
            "path" => Some(item.path.clone()),
            "nodeType" => Some(item.content_type.clone()),
            "isDoc" => Some(String::new()),
            _ => None,
        }
    }

    fn property(&self, node: Node, name: &str) -> Option<String> {
        let Node::Item(index) = node else {
            return None;
        };
        self.tree.item(index).property(name).map(str::to_string)
    }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> bool {
    if matches!(left, Value::Node(None)) || matches!(right, Value::Node(None)) {
        return false;
    }

    match op {
        CmpOp::Eq | CmpOp::Ne => {
            let equal = if matches!(left, Value::Bool(_)) || matches!(right, Value::Bool(_)) {
                left.truthy() == right.truthy()
            } else if matches!(left, Value::Number(_)) || matches!(right, Value::Number(_)) {
                left.as_number() == right.as_number()
            } else {
                left.as_text() == right.as_text()
            };
            if op == CmpOp::Eq {
                equal
            } else {
                !equal
            }
        }
        CmpOp::Lt => left.as_number() < right.as_number(),
        CmpOp::Le => left.as_number() <= right.as_number(),
        CmpOp::Gt => left.as_number() > right.as_number(),
        CmpOp::Ge => left.as_number() >= right.as_number(),
    }
}
