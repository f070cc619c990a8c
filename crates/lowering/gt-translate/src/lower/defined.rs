use crate::Translator;
use crate::error::TResult;
use gt_exec::{ExecId, ExecKind};
use gt_span::Position;
use gt_syntax::Node;

/// `defined?` answers known without running anything, by node kind
static DEFINED_NAMES: &[(&str, &str)] = &[
    ("Self", "self"),
    ("Nil", "nil"),
    ("True", "true"),
    ("False", "false"),
    ("LocalAsgn", "assignment"),
    ("DAsgn", "assignment"),
    ("GlobalAsgn", "assignment"),
    ("InstAsgn", "assignment"),
    ("ClassVarAsgn", "assignment"),
    ("OpAsgnAnd", "assignment"),
    ("OpAsgnOr", "assignment"),
    ("OpAsgn", "assignment"),
    ("OpElementAsgn", "assignment"),
    ("MultipleAsgn", "assignment"),
    ("Str", "expression"),
    ("DStr", "expression"),
    ("Fixnum", "expression"),
    ("Bignum", "expression"),
    ("Float", "expression"),
    ("Regexp", "expression"),
    ("DRegexp", "expression"),
    ("Array", "expression"),
    ("ZArray", "expression"),
    ("Hash", "expression"),
    ("Symbol", "expression"),
    ("DSymbol", "expression"),
    ("Dot", "expression"),
    ("And", "expression"),
    ("Or", "expression"),
    ("LocalVar", "local-variable"),
    ("DVar", "local-variable"),
];

pub(crate) fn static_description(node: &Node) -> Option<&'static str> {
    let kind = node.kind_name();
    DEFINED_NAMES
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, description)| *description)
}

impl Translator<'_> {
    pub(crate) fn lower_defined(&mut self, expression: &Node, pos: Position) -> TResult<ExecId> {
        if let Some(description) = static_description(expression) {
            return Ok(self.alloc(ExecKind::Str(description.as_bytes().to_vec()), pos));
        }
        let expression = self.lower(expression)?;
        Ok(self.alloc(ExecKind::Defined(expression), pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_syntax::NodeKind;

    #[test]
    fn test_static_descriptions() {
        let pos = Position::default();
        let local = Node::new(NodeKind::LocalVar("x".into()), pos);
        assert_eq!(static_description(&local), Some("local-variable"));
        assert_eq!(static_description(&Node::nil(pos)), Some("nil"));
        let call = Node::new(NodeKind::VCall("x".into()), pos);
        assert_eq!(static_description(&call), None);
    }
}
