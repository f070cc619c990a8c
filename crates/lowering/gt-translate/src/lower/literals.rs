use crate::Translator;
use crate::error::TResult;
use gt_exec::{ExecId, ExecKind, SplatNil};
use gt_span::Position;
use gt_syntax::{Node, NodeKind};

impl Translator<'_> {
    pub(crate) fn lower_interpolation(&mut self, parts: &[Node], pos: Position) -> TResult<ExecId> {
        let parts = parts.iter().map(|part| self.lower(part)).collect::<TResult<Vec<_>>>()?;
        Ok(self.alloc(ExecKind::InterpolatedString(parts), pos))
    }

    /// Lower a node that produces an array: literals, splats and the
    /// argument concatenation forms
    pub(crate) fn lower_array_value(&mut self, node: &Node) -> TResult<ExecId> {
        let pos = node.pos;
        match &node.kind {
            NodeKind::Array(items) => self.lower_array_literal(items, pos),
            NodeKind::ZArray => Ok(self.alloc(ExecKind::ArrayLiteral(Vec::new()), pos)),
            NodeKind::Splat(value) => {
                let value = self.lower(value)?;
                Ok(self.splat_cast(value, SplatNil::EmptyArray, pos))
            }
            NodeKind::ArgsCat { first, second } => {
                let first = self.lower_array_value(first)?;
                let second = self.lower(second)?;
                let second = self.splat_cast(second, SplatNil::EmptyArray, pos);
                Ok(self.alloc(ExecKind::ArrayConcat(vec![first, second]), pos))
            }
            NodeKind::ArgsPush { first, second } => {
                let array = self.lower_array_value(first)?;
                let value = self.lower(second)?;
                Ok(self.alloc(ExecKind::ArrayPush { array, value }, pos))
            }
            _ => {
                let value = self.lower(node)?;
                Ok(self.splat_cast(value, SplatNil::EmptyArray, pos))
            }
        }
    }

    /// `[a, *b, c]`: runs of plain elements become literals, concatenated
    /// with the splatted parts
    fn lower_array_literal(&mut self, items: &[Node], pos: Position) -> TResult<ExecId> {
        if !items.iter().any(|item| matches!(item.kind, NodeKind::Splat(_))) {
            let items = items.iter().map(|item| self.lower(item)).collect::<TResult<Vec<_>>>()?;
            return Ok(self.alloc(ExecKind::ArrayLiteral(items), pos));
        }
        let mut parts = Vec::new();
        let mut run = Vec::new();
        for item in items {
            if let NodeKind::Splat(_) = item.kind {
                if !run.is_empty() {
                    let literal = self.alloc(ExecKind::ArrayLiteral(std::mem::take(&mut run)), pos);
                    parts.push(literal);
                }
                parts.push(self.lower_array_value(item)?);
            } else {
                run.push(self.lower(item)?);
            }
        }
        if !run.is_empty() {
            parts.push(self.alloc(ExecKind::ArrayLiteral(run), pos));
        }
        Ok(self.alloc(ExecKind::ArrayConcat(parts), pos))
    }

    pub(crate) fn splat_cast(&mut self, value: ExecId, nil: SplatNil, pos: Position) -> ExecId {
        self.alloc(ExecKind::SplatCast { value, nil }, pos)
    }

    pub(crate) fn lower_hash(&mut self, pairs: &[(Option<Node>, Node)], pos: Position) -> TResult<ExecId> {
        let mut lowered = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let key = self.lower_opt(key.as_ref(), pos)?;
            let value = self.lower(value)?;
            lowered.push((key, value));
        }
        Ok(self.alloc(ExecKind::HashLiteral(lowered), pos))
    }

    pub(crate) fn lower_range(&mut self, begin: &Node, end: &Node, exclusive: bool, pos: Position) -> TResult<ExecId> {
        if let (NodeKind::Fixnum(begin), NodeKind::Fixnum(end)) = (&begin.kind, &end.kind) {
            return Ok(self.alloc(
                ExecKind::IntegerRange {
                    begin: *begin,
                    end: *end,
                    exclusive,
                },
                pos,
            ));
        }
        let begin = self.lower(begin)?;
        let end = self.lower(end)?;
        Ok(self.alloc(ExecKind::Range { begin, end, exclusive }, pos))
    }
}
