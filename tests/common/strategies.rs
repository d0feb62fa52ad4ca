use proptest::prelude::*;
use proptest::strategy::Just;

/// Shape of a generated expression. Rendering never adds parentheses beyond
/// explicit groups, so the string's own precedence decides the meaning.
#[derive(Debug, Clone)]
pub enum ExprTree {
    Literal(String),
    Binary(Box<ExprTree>, char, Box<ExprTree>),
    Group(Box<ExprTree>),
}

impl ExprTree {
    pub fn render(&self, spaced: bool) -> String {
        match self {
            ExprTree::Literal(text) => text.clone(),
            ExprTree::Binary(lhs, op, rhs) if spaced => {
                format!("{} {} {}", lhs.render(spaced), op, rhs.render(spaced))
            }
            ExprTree::Binary(lhs, op, rhs) => {
                format!("{}{}{}", lhs.render(spaced), op, rhs.render(spaced))
            }
            ExprTree::Group(inner) => format!("({})", inner.render(spaced)),
        }
    }
}

/// Strategy for decimal literals matching `digits[.digits]`
pub fn literal_strategy() -> impl Strategy<Value = String> {
    (0u32..1000, prop::option::of(0u32..100)).prop_map(|(int, frac)| match frac {
        Some(frac) => format!("{int}.{frac}"),
        None => int.to_string(),
    })
}

pub fn operator_strategy() -> impl Strategy<Value = char> {
    prop_oneof![Just('+'), Just('-'), Just('*'), Just('/')]
}

pub fn tree_strategy() -> impl Strategy<Value = ExprTree> {
    let leaf = literal_strategy().prop_map(ExprTree::Literal);
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), operator_strategy(), inner.clone())
                .prop_map(|(lhs, op, rhs)| ExprTree::Binary(Box::new(lhs), op, Box::new(rhs))),
            inner.prop_map(|e| ExprTree::Group(Box::new(e))),
        ]
    })
}

/// Strategy for valid expressions: always at least one top-level operator.
pub fn expression_strategy() -> impl Strategy<Value = String> {
    (
        tree_strategy(),
        operator_strategy(),
        tree_strategy(),
        any::<bool>(),
    )
        .prop_map(|(lhs, op, rhs, spaced)| {
            ExprTree::Binary(Box::new(lhs), op, Box::new(rhs)).render(spaced)
        })
}

/// Strategy for strings containing a character outside the grammar.
pub fn foreign_character_strategy() -> impl Strategy<Value = (String, char)> {
    (
        expression_strategy(),
        prop_oneof![Just('a'), Just('^'), Just('%'), Just('x'), Just('=')],
    )
        .prop_map(|(expression, foreign)| (format!("{expression}+{foreign}"), foreign))
}
