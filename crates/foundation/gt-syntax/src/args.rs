//! Formal parameter lists of methods, blocks and lambdas

use crate::{MultipleAsgn, Node};
use gt_span::Position;

/// A positional parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Plain name
    Required(String),
    /// `(a, b)` destructuring parameter of a block
    Destructure(Box<MultipleAsgn>),
}

/// `name = default`
#[derive(Debug, Clone, PartialEq)]
pub struct OptionalParam {
    /// Parameter name
    pub name: String,
    /// Default expression, evaluated only when the argument is missing
    pub default: Node,
}

/// `name:` or `name: default`
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordParam {
    /// Parameter name without the colon
    pub name: String,
    /// Default; `None` for a required keyword
    pub default: Option<Node>,
}

/// A complete parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct ArgsNode {
    /// Position of the list
    pub pos: Position,
    /// Leading required parameters
    pub pre: Vec<Param>,
    /// Optional parameters
    pub optional: Vec<OptionalParam>,
    /// `*rest`; `Some(None)` for an anonymous `*`
    pub rest: Option<Option<String>>,
    /// Required parameters after the rest parameter
    pub post: Vec<Param>,
    /// Keyword parameters
    pub keywords: Vec<KeywordParam>,
    /// `**kwrest`; `Some(None)` for an anonymous `**`
    pub keyword_rest: Option<Option<String>>,
    /// `&block`
    pub block: Option<String>,
    /// Block-local variables after `;`
    pub block_locals: Vec<String>,
    /// `|a, |`: a trailing comma that makes a block destructure
    pub excess_comma: bool,
}

impl ArgsNode {
    /// An empty parameter list
    pub fn empty(pos: Position) -> Self {
        Self {
            pos,
            pre: Vec::new(),
            optional: Vec::new(),
            rest: None,
            post: Vec::new(),
            keywords: Vec::new(),
            keyword_rest: None,
            block: None,
            block_locals: Vec::new(),
            excess_comma: false,
        }
    }

    /// Count of positional parameters that must be supplied
    pub fn required_count(&self) -> usize {
        self.pre.len() + self.post.len()
    }

    /// Whether a rest parameter is present
    pub fn has_rest(&self) -> bool {
        self.rest.is_some()
    }

    /// Whether any keyword or keyword-rest parameter is present
    pub fn has_keywords(&self) -> bool {
        !self.keywords.is_empty() || self.keyword_rest.is_some()
    }

    /// Whether the list takes no parameters at all
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty()
            && self.optional.is_empty()
            && self.rest.is_none()
            && self.post.is_empty()
            && !self.has_keywords()
            && self.block.is_none()
    }

    /// Every name the list binds, in declaration order
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for param in &self.pre {
            collect_param_names(param, &mut names);
        }
        names.extend(self.optional.iter().map(|optional| optional.name.clone()));
        if let Some(Some(rest)) = &self.rest {
            names.push(rest.clone());
        }
        for param in &self.post {
            collect_param_names(param, &mut names);
        }
        names.extend(self.keywords.iter().map(|keyword| keyword.name.clone()));
        if let Some(Some(keyword_rest)) = &self.keyword_rest {
            names.push(keyword_rest.clone());
        }
        if let Some(block) = &self.block {
            names.push(block.clone());
        }
        names
    }
}

fn collect_param_names(param: &Param, names: &mut Vec<String>) {
    match param {
        Param::Required(name) => names.push(name.clone()),
        Param::Destructure(masgn) => collect_target_names(masgn, names),
    }
}

fn collect_target_names(masgn: &MultipleAsgn, names: &mut Vec<String>) {
    let rest = masgn.rest.iter().map(|node| &**node);
    for target in masgn.pre.iter().chain(rest).chain(masgn.post.iter()) {
        match &target.kind {
            crate::NodeKind::LocalAsgn { name, .. } | crate::NodeKind::DAsgn { name, .. } => {
                names.push(name.clone());
            }
            crate::NodeKind::MultipleAsgn(inner) => collect_target_names(inner, names),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;

    #[test]
    fn test_parameter_names_in_declaration_order() {
        let pos = Position::default();
        let mut nested = MultipleAsgn::new();
        nested.pre.push(Node::new(NodeKind::DAsgn { name: "x".into(), value: None }, pos));
        nested.pre.push(Node::new(NodeKind::DAsgn { name: "y".into(), value: None }, pos));

        let mut args = ArgsNode::empty(pos);
        args.pre.push(Param::Required("a".into()));
        args.pre.push(Param::Destructure(Box::new(nested)));
        args.optional.push(OptionalParam {
            name: "b".into(),
            default: Node::new(NodeKind::Fixnum(1), pos),
        });
        args.rest = Some(Some("rest".into()));
        args.block = Some("blk".into());

        assert_eq!(args.parameter_names(), vec!["a", "x", "y", "b", "rest", "blk"]);
        assert_eq!(args.required_count(), 2);
        assert!(args.has_rest());
        assert!(!args.is_empty());
    }
}
