//! Clause combinators - AND, OR, NOT chain continuation
//!
//! Each combinator wraps a duplicated head condition (the start of the new
//! chain link) and a duplicated empty scope (enabling jumps to a sibling
//! field). Folding a chain back into a condition attaches every pending link
//! to the condition it was opened on; the original conditions are never
//! mutated by merely creating a combinator.

use serde_json::Value;

use crate::condition::capabilities::{
    SupportsEquality, SupportsExistence, SupportsMatch, SupportsRange,
};
use crate::condition::field::{AndLink, FieldCondition};
use crate::condition::set::ConditionSet;
use crate::condition::types::MatchOperator;
use crate::error::{CuttleError, Result};

/// Fold a fluent chain back into its root condition
pub trait IntoCondition {
    /// Attach all pending links and return the root condition
    fn into_condition(self) -> FieldCondition;
}

impl IntoCondition for FieldCondition {
    fn into_condition(self) -> FieldCondition {
        self
    }
}

#[derive(Clone, Debug)]
enum LinkKind {
    And { negated: bool },
    Or,
    Not,
}

#[derive(Clone, Debug)]
struct Frame {
    root: FieldCondition,
    kind: LinkKind,
}

impl Frame {
    fn attach(self, link: FieldCondition) -> FieldCondition {
        let mut root = self.root;
        match self.kind {
            LinkKind::And { negated } => root.and_links.push(AndLink {
                condition: link,
                negated,
            }),
            LinkKind::Or => root.or_links.push(link),
            LinkKind::Not => root.not_links.push(link),
        }
        root
    }
}

/// Shared state of the three combinator types
#[derive(Clone, Debug)]
struct Chain {
    frames: Vec<Frame>,
    head: FieldCondition,
    scope: ConditionSet,
}

impl Chain {
    fn open(condition: FieldCondition, kind: LinkKind) -> Self {
        let head = condition.duplicate();
        let scope = ConditionSet::scope_of(condition.context().clone());
        Chain {
            frames: vec![Frame {
                root: condition,
                kind,
            }],
            head,
            scope,
        }
    }

    /// Continue the chain from the current head
    fn extend(mut self, kind: LinkKind) -> Self {
        let head = self.head.duplicate();
        let scope = ConditionSet::scope_of(self.head.context().clone());
        self.frames.push(Frame {
            root: self.head,
            kind,
        });
        Chain {
            frames: self.frames,
            head,
            scope,
        }
    }

    /// Close the innermost link and continue from its root
    ///
    /// Used by NOT combinators: a chain following `.not()` returns to the
    /// condition the NOT was attached to rather than to the negated head.
    fn return_to_root(mut self, kind: LinkKind) -> Self {
        match self.frames.pop() {
            Some(frame) => {
                let root = frame.attach(self.head);
                let head = root.duplicate();
                let scope = ConditionSet::scope_of(root.context().clone());
                self.frames.push(Frame { root, kind });
                Chain {
                    frames: self.frames,
                    head,
                    scope,
                }
            }
            None => Chain::open(self.head, kind),
        }
    }

    fn fold(mut self) -> FieldCondition {
        let mut current = self.head;
        while let Some(frame) = self.frames.pop() {
            current = frame.attach(current);
        }
        current
    }

    /// Jump the chain head to a sibling field of the duplicated scope
    fn jump(mut self, name: &str) -> Result<Self> {
        if self.head.has_clause() {
            return Err(CuttleError::InvalidChain(format!(
                "cannot target field {} after a value was set on {}",
                name,
                self.head.name()
            )));
        }
        self.head = self.scope.field(name)?;
        Ok(self)
    }

    fn negate_pending(mut self) -> Self {
        if let Some(frame) = self.frames.last_mut() {
            if let LinkKind::And { negated } = &mut frame.kind {
                *negated = true;
            }
        }
        self
    }
}

macro_rules! delegate_capabilities {
    ($clause:ident) => {
        impl SupportsEquality for $clause {
            fn eq(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.eq(value)?;
                Ok(self)
            }
        }

        impl SupportsMatch for $clause {
            fn matches(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.matches(value)?;
                Ok(self)
            }

            fn match_phrase(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.match_phrase(value)?;
                Ok(self)
            }

            fn prefix(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.prefix(value)?;
                Ok(self)
            }

            fn multi_match(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.multi_match(value)?;
                Ok(self)
            }
        }

        impl SupportsExistence for $clause {
            fn exists(mut self) -> Result<Self> {
                self.chain.head = self.chain.head.exists()?;
                Ok(self)
            }
        }

        impl SupportsRange for $clause {
            fn gt(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.gt(value)?;
                Ok(self)
            }

            fn gte(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.gte(value)?;
                Ok(self)
            }

            fn lt(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.lt(value)?;
                Ok(self)
            }

            fn lte(mut self, value: impl Into<Value>) -> Result<Self> {
                self.chain.head = self.chain.head.lte(value)?;
                Ok(self)
            }
        }

        impl $clause {
            /// Jump the chain to a sibling field
            pub fn field(mut self, name: &str) -> Result<Self> {
                self.chain = self.chain.jump(name)?;
                Ok(self)
            }

            /// Set the boost factor of the current link
            pub fn with_boost(mut self, boost: f64) -> Self {
                self.chain.head = self.chain.head.with_boost(boost);
                self
            }

            /// Match case-insensitively on the current link
            pub fn case_insensitive(mut self) -> Self {
                self.chain.head = self.chain.head.case_insensitive();
                self
            }

            /// Set the field list of the current link
            pub fn with_fields(mut self, fields: Vec<String>) -> Self {
                self.chain.head = self.chain.head.with_fields(fields);
                self
            }

            /// Set the term combinator of the current link
            pub fn with_operator(mut self, operator: MatchOperator) -> Self {
                self.chain.head = self.chain.head.with_operator(operator);
                self
            }
        }

        impl IntoCondition for $clause {
            fn into_condition(self) -> FieldCondition {
                self.chain.fold()
            }
        }
    };
}

/// AND continuation of a condition chain
#[derive(Clone, Debug)]
pub struct AndClause {
    chain: Chain,
}

impl AndClause {
    pub(crate) fn from_condition(condition: FieldCondition) -> Self {
        AndClause {
            chain: Chain::open(condition, LinkKind::And { negated: false }),
        }
    }

    /// Continue with a further AND link
    pub fn and(self) -> AndClause {
        AndClause {
            chain: self.chain.extend(LinkKind::And { negated: false }),
        }
    }

    /// Continue with an OR link on the current head
    pub fn or(self) -> OrClause {
        OrClause {
            chain: self.chain.extend(LinkKind::Or),
        }
    }

    /// Negate this AND link (AND NOT)
    pub fn not(self) -> AndClause {
        AndClause {
            chain: self.chain.negate_pending(),
        }
    }
}

delegate_capabilities!(AndClause);

/// OR continuation of a condition chain
#[derive(Clone, Debug)]
pub struct OrClause {
    chain: Chain,
}

impl OrClause {
    pub(crate) fn from_condition(condition: FieldCondition) -> Self {
        OrClause {
            chain: Chain::open(condition, LinkKind::Or),
        }
    }

    /// Continue with an AND link on the current alternative
    pub fn and(self) -> AndClause {
        AndClause {
            chain: self.chain.extend(LinkKind::And { negated: false }),
        }
    }

    /// Add a further alternative
    pub fn or(self) -> OrClause {
        OrClause {
            chain: self.chain.extend(LinkKind::Or),
        }
    }

    /// Negate within the current alternative
    pub fn not(self) -> NotClause {
        NotClause {
            chain: self.chain.extend(LinkKind::Not),
        }
    }
}

delegate_capabilities!(OrClause);

/// NOT continuation of a condition chain
///
/// Chains following a NOT return to the condition the NOT was attached to,
/// so `.not().eq(x)?.and()…` augments the original clause rather than the
/// negated one.
#[derive(Clone, Debug)]
pub struct NotClause {
    chain: Chain,
}

impl NotClause {
    pub(crate) fn from_condition(condition: FieldCondition) -> Self {
        NotClause {
            chain: Chain::open(condition, LinkKind::Not),
        }
    }

    /// Close the negation and AND onto the original condition
    pub fn and(self) -> AndClause {
        AndClause {
            chain: self
                .chain
                .return_to_root(LinkKind::And { negated: false }),
        }
    }

    /// Close the negation and OR onto the original condition
    pub fn or(self) -> OrClause {
        OrClause {
            chain: self.chain.return_to_root(LinkKind::Or),
        }
    }
}

delegate_capabilities!(NotClause);
