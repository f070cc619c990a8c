use crate::Translator;
use crate::error::TResult;
use crate::specialize::{Callable, Specializer};
use gt_exec::{ExecId, ExecKind, LocalSlot, RescueClause, SplatNil};
use gt_span::Position;
use gt_syntax::{ArgsNode, Node, NodeKind, Param, RescueBody, WhenClause};

impl Translator<'_> {
    pub(crate) fn lower_if(
        &mut self,
        cond: &Node,
        then_body: Option<&Node>,
        else_body: Option<&Node>,
        pos: Position,
    ) -> TResult<ExecId> {
        let cond = self.lower(cond)?;
        let cond = self.boolean_cast(cond, pos);
        let then_body = self.lower_opt(then_body, pos)?;
        let else_body = self.lower_opt(else_body, pos)?;
        Ok(self.alloc(
            ExecKind::If {
                cond,
                then_body,
                else_body,
            },
            pos,
        ))
    }

    pub(crate) fn lower_while(
        &mut self,
        cond: &Node,
        body: Option<&Node>,
        evaluate_at_start: bool,
        until: bool,
        pos: Position,
    ) -> TResult<ExecId> {
        let cond = self.lower(cond)?;
        let mut cond = self.boolean_cast(cond, pos);
        if until {
            let negated = self.alloc(ExecKind::Not(cond), pos);
            cond = self.boolean_cast(negated, pos);
        }
        let body = self.lower_opt(body, pos)?;
        Ok(self.alloc(
            ExecKind::While {
                cond,
                body,
                do_while: !evaluate_at_start,
            },
            pos,
        ))
    }

    /// `for var in iter` is `iter.each { |tmp| var = tmp; body }` with the
    /// loop variables living in the enclosing frame
    pub(crate) fn lower_for(&mut self, var: &Node, iter: &Node, body: Option<&Node>, pos: Position) -> TResult<ExecId> {
        let receiver = self.lower(iter)?;
        let parameter = self.temp_name("for");
        let mut args = ArgsNode::empty(pos);
        args.pre.push(Param::Required(parameter.clone()));
        let locals = [parameter];

        let saved = std::mem::replace(&mut self.translating_for_statement, true);
        let lowered = self.translate_callable(Callable {
            specializer: Specializer::Block,
            name: "(for-block)".to_string(),
            args: Some(&args),
            body,
            locals: &locals,
            pos,
            for_target: Some(var),
        });
        self.translating_for_statement = saved;
        let lowered = lowered?;

        let block = self.alloc(
            ExecKind::BlockDefinition {
                method: lowered.method,
                frame: lowered.frame,
                body: lowered.body,
                lambda: false,
            },
            pos,
        );
        let name = self.sym("each");
        Ok(self.alloc(
            ExecKind::Call {
                receiver,
                name,
                args: Vec::new(),
                block: Some(block),
                splatted: false,
                ignore_visibility: false,
            },
            pos,
        ))
    }

    /// `case` as a chain of `if`s over `===`, the subject held in one temp
    pub(crate) fn lower_case(
        &mut self,
        subject: Option<&Node>,
        whens: &[WhenClause],
        else_body: Option<&Node>,
        pos: Position,
    ) -> TResult<ExecId> {
        let subject = match subject {
            Some(subject) => {
                let value = self.lower(subject)?;
                let temp = self.new_temp("case");
                Some((temp, self.write_local(temp, value, pos)))
            }
            None => None,
        };

        let mut branches = Vec::with_capacity(whens.len());
        for when in whens {
            let mut tests = Vec::with_capacity(when.candidates.len());
            for candidate in &when.candidates {
                let test = match subject {
                    Some((temp, _)) => self.lower_when_test(candidate, temp, when.pos)?,
                    None => self.lower(candidate)?,
                };
                tests.push(test);
            }
            let cond = self.or_chain(tests, when.pos);
            let cond = self.boolean_cast(cond, when.pos);
            let body = self.lower_opt(when.body.as_deref(), when.pos)?;
            branches.push((cond, body, when.pos));
        }

        let mut chain = self.lower_opt(else_body, pos)?;
        for (cond, then_body, when_pos) in branches.into_iter().rev() {
            chain = self.alloc(
                ExecKind::If {
                    cond,
                    then_body,
                    else_body: chain,
                },
                when_pos,
            );
        }
        match subject {
            Some((_, write)) => Ok(self.alloc(ExecKind::Sequence(vec![write, chain]), pos)),
            None => Ok(chain),
        }
    }

    fn lower_when_test(&mut self, candidate: &Node, subject: LocalSlot, pos: Position) -> TResult<ExecId> {
        if let NodeKind::Splat(inner) = &candidate.kind {
            let subject = self.read_local(subject, pos);
            let splat = self.lower(inner)?;
            let splat = self.splat_cast(splat, SplatNil::EmptyArray, pos);
            return Ok(self.alloc(ExecKind::WhenSplat { subject, splat }, pos));
        }
        let candidate = self.lower(candidate)?;
        let subject = self.read_local(subject, pos);
        Ok(self.call(candidate, "===", vec![subject], pos))
    }

    /// `a || (b || c)`; false for no tests
    fn or_chain(&mut self, tests: Vec<ExecId>, pos: Position) -> ExecId {
        let mut tests = tests.into_iter().rev();
        let Some(mut chain) = tests.next() else {
            return self.alloc(ExecKind::Boolean(false), pos);
        };
        for test in tests {
            chain = self.alloc(ExecKind::Or(test, chain), pos);
        }
        chain
    }

    pub(crate) fn lower_rescue(
        &mut self,
        body: Option<&Node>,
        rescues: &[RescueBody],
        else_body: Option<&Node>,
        pos: Position,
    ) -> TResult<ExecId> {
        let body = self.lower_opt(body, pos)?;
        let mut clauses = Vec::with_capacity(rescues.len());
        for rescue in rescues {
            clauses.push(self.lower_rescue_clause(rescue)?);
        }
        let else_body = self.lower_opt(else_body, pos)?;
        Ok(self.alloc(
            ExecKind::Try {
                body,
                rescues: clauses,
                else_body,
            },
            pos,
        ))
    }

    fn lower_rescue_clause(&mut self, rescue: &RescueBody) -> TResult<RescueClause> {
        let pos = rescue.pos;
        let has_splat = rescue
            .exceptions
            .iter()
            .any(|exception| matches!(exception.kind, NodeKind::Splat(_)));
        let clause = match rescue.exceptions.as_slice() {
            [] => {
                let body = self.lower_opt(rescue.body.as_deref(), pos)?;
                RescueClause::Any { body }
            }
            [single] if has_splat => {
                let splat = self.lower_array_value(single)?;
                let body = self.lower_opt(rescue.body.as_deref(), pos)?;
                RescueClause::Splat { splat, body }
            }
            exceptions if has_splat => {
                let list = Node::new(NodeKind::Array(exceptions.to_vec()), pos);
                let splat = self.lower_array_value(&list)?;
                let body = self.lower_opt(rescue.body.as_deref(), pos)?;
                RescueClause::Splat { splat, body }
            }
            exceptions => {
                let classes = exceptions
                    .iter()
                    .map(|exception| self.lower(exception))
                    .collect::<TResult<Vec<_>>>()?;
                let body = self.lower_opt(rescue.body.as_deref(), pos)?;
                RescueClause::Classes { classes, body }
            }
        };
        Ok(clause)
    }
}
