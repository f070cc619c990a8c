//! Parameter loading
//!
//! Positional parameters are bound in a fixed order: required, optional
//! (defaults see the earlier parameters), post, rest. Keyword and block
//! parameters follow. Blocks whose parameter list can take a single array
//! apart get a run-time switch between the two loaders.

use crate::Translator;
use crate::error::TResult;
use crate::specialize::Specializer;
use gt_exec::{ExecId, ExecKind, LocalSlot, MissingArgumentBehavior, SplatNil};
use gt_span::Position;
use gt_syntax::{ArgsNode, Param};

/// Whether a block with these parameters spreads a single array argument
pub(crate) fn needs_destructure_switch(args: &ArgsNode) -> bool {
    let count = args.pre.len() + args.post.len() + args.optional.len();
    count >= 2 || (count >= 1 && (args.has_rest() || args.excess_comma))
}

impl Translator<'_> {
    pub(crate) fn load_arguments(&mut self, args: &ArgsNode, specializer: Specializer) -> TResult<Vec<ExecId>> {
        let pos = args.pos;
        let mut statements = Vec::new();
        if specializer.destructures_single_argument() && needs_destructure_switch(args) {
            let probe = self.alloc(
                ExecKind::ReadPreArgument {
                    index: 0,
                    missing: MissingArgumentBehavior::Nil,
                },
                pos,
            );
            let name = self.sym("to_ary");
            let responds = self.alloc(ExecKind::RespondTo { value: probe, name }, pos);
            let cond = self.alloc(ExecKind::ShouldDestructure(responds), pos);
            let from_array = self.load_from_array(args)?;
            let from_array = self.sequence(from_array, pos);
            let positional = self.load_positional(args, specializer.missing_argument())?;
            let positional = self.sequence(positional, pos);
            statements.push(self.alloc(
                ExecKind::If {
                    cond,
                    then_body: from_array,
                    else_body: positional,
                },
                pos,
            ));
        } else {
            statements.extend(self.load_positional(args, specializer.missing_argument())?);
        }
        statements.extend(self.load_keywords_and_block(args)?);
        Ok(statements)
    }

    fn load_positional(&mut self, args: &ArgsNode, missing: MissingArgumentBehavior) -> TResult<Vec<ExecId>> {
        let pos = args.pos;
        let pre = args.pre.len();
        let optional = args.optional.len();
        let post = args.post.len();
        let mut statements = Vec::new();

        for (index, param) in args.pre.iter().enumerate() {
            let value = self.alloc(ExecKind::ReadPreArgument { index, missing }, pos);
            statements.push(self.bind_parameter(param, value, pos)?);
        }
        for (offset, param) in args.optional.iter().enumerate() {
            let default = self.lower(&param.default)?;
            let value = self.alloc(
                ExecKind::ReadOptionalArgument {
                    index: pre + offset,
                    minimum: pre + offset + 1 + post,
                    default,
                },
                pos,
            );
            statements.push(self.write_parameter(&param.name, value, pos));
        }
        for (index, param) in args.post.iter().enumerate() {
            let value = self.alloc(
                ExecKind::ReadPostArgument {
                    from_end: post - index,
                    required: pre + post,
                    missing,
                },
                pos,
            );
            statements.push(self.bind_parameter(param, value, pos)?);
        }
        if let Some(Some(rest)) = &args.rest {
            let value = self.alloc(
                ExecKind::ReadRestArgument {
                    start: pre + optional,
                    from_end: post,
                },
                pos,
            );
            statements.push(self.write_parameter(rest, value, pos));
        }
        Ok(statements)
    }

    /// Same bindings as [`Self::load_positional`], taken from the elements
    /// of the single array argument
    fn load_from_array(&mut self, args: &ArgsNode) -> TResult<Vec<ExecId>> {
        let pos = args.pos;
        let pre = args.pre.len();
        let optional = args.optional.len();
        let post = args.post.len();

        let probe = self.alloc(
            ExecKind::ReadPreArgument {
                index: 0,
                missing: MissingArgumentBehavior::Nil,
            },
            pos,
        );
        let array = self.splat_cast(probe, SplatNil::ArrayWithNil, pos);
        let temp = self.new_temp("destructure");
        let mut statements = vec![self.write_local(temp, array, pos)];

        for (index, param) in args.pre.iter().enumerate() {
            let value = self.array_index(temp, index as i64, pos);
            statements.push(self.bind_parameter(param, value, pos)?);
        }
        for (offset, param) in args.optional.iter().enumerate() {
            let cond = self.size_at_least(temp, pre + offset + 1 + post, pos);
            let then_body = self.array_index(temp, (pre + offset) as i64, pos);
            let else_body = self.lower(&param.default)?;
            let value = self.alloc(
                ExecKind::If {
                    cond,
                    then_body,
                    else_body,
                },
                pos,
            );
            statements.push(self.write_parameter(&param.name, value, pos));
        }
        for (index, param) in args.post.iter().enumerate() {
            let cond = self.size_at_least(temp, pre + post, pos);
            let then_body = self.array_index(temp, -((post - index) as i64), pos);
            let else_body = self.array_index(temp, (pre + index) as i64, pos);
            let value = self.alloc(
                ExecKind::If {
                    cond,
                    then_body,
                    else_body,
                },
                pos,
            );
            statements.push(self.bind_parameter(param, value, pos)?);
        }
        if let Some(Some(rest)) = &args.rest {
            let array = self.read_local(temp, pos);
            let value = self.alloc(
                ExecKind::ArraySlice {
                    array,
                    from: pre + optional,
                    from_end: post,
                },
                pos,
            );
            statements.push(self.write_parameter(rest, value, pos));
        }
        Ok(statements)
    }

    fn load_keywords_and_block(&mut self, args: &ArgsNode) -> TResult<Vec<ExecId>> {
        let pos = args.pos;
        let mut statements = Vec::new();
        for keyword in &args.keywords {
            let default = match &keyword.default {
                Some(default) => Some(self.lower(default)?),
                None => None,
            };
            let name = self.sym(&keyword.name);
            let value = self.alloc(ExecKind::ReadKeywordArgument { name, default }, pos);
            statements.push(self.write_parameter(&keyword.name, value, pos));
        }
        if let Some(keyword_rest) = &args.keyword_rest {
            let excluded = args.keywords.iter().map(|keyword| self.sym(&keyword.name)).collect();
            let value = self.alloc(ExecKind::ReadKeywordRestArgument { excluded }, pos);
            if let Some(name) = keyword_rest {
                statements.push(self.write_parameter(name, value, pos));
            }
        }
        if let Some(block) = &args.block {
            let value = self.alloc(ExecKind::ReadBlockArgument, pos);
            statements.push(self.write_parameter(block, value, pos));
        }
        Ok(statements)
    }

    fn bind_parameter(&mut self, param: &Param, value: ExecId, pos: Position) -> TResult<ExecId> {
        match param {
            Param::Required(name) => Ok(self.write_parameter(name, value, pos)),
            Param::Destructure(masgn) => self.destructure(masgn, value, pos),
        }
    }

    /// Parameters always live in the callable's own frame
    fn write_parameter(&mut self, name: &str, value: ExecId, pos: Position) -> ExecId {
        let name = self.sym(name);
        let target = self.declare_here(name);
        self.write_local(target, value, pos)
    }

    fn size_at_least(&mut self, array: LocalSlot, size: usize, pos: Position) -> ExecId {
        let array = self.read_local(array, pos);
        self.alloc(ExecKind::ArraySizeAtLeast { array, size }, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_syntax::OptionalParam;

    #[test]
    fn test_destructure_switch_conditions() {
        let pos = Position::default();
        let mut args = ArgsNode::empty(pos);
        args.pre.push(Param::Required("a".into()));
        assert!(!needs_destructure_switch(&args));

        args.excess_comma = true;
        assert!(needs_destructure_switch(&args));

        args.excess_comma = false;
        args.optional.push(OptionalParam {
            name: "b".into(),
            default: gt_syntax::Node::nil(pos),
        });
        assert!(needs_destructure_switch(&args));

        let mut rest_only = ArgsNode::empty(pos);
        rest_only.rest = Some(Some("r".into()));
        assert!(!needs_destructure_switch(&rest_only));
    }
}
