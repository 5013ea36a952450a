//! Content expressions and the automata compiled from them.
//!
//! An expression such as `"paragraph* bulletList*"` is parsed into a small
//! regular grammar over node types and groups, turned into an NFA, and then
//! into a DFA whose states are exposed as [`ContentMatch`] values.

use super::schema::{NodeName, SchemaError};
use super::{Fragment, NodeType};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContentExpr {
    Choice(Vec<ContentExpr>),
    Seq(Vec<ContentExpr>),
    Plus(Box<ContentExpr>),
    Star(Box<ContentExpr>),
    Opt(Box<ContentExpr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<ContentExpr>,
    },
    Name(usize),
}

struct TokenStream<'a> {
    source: &'a str,
    tokens: Vec<String>,
    pos: usize,
    names: &'a [NodeName],
    inline: Option<bool>,
}

impl<'a> TokenStream<'a> {
    fn new(source: &'a str, names: &'a [NodeName]) -> Self {
        let mut tokens = Vec::new();
        let mut word = String::new();
        for ch in source.chars() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                continue;
            }
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !ch.is_whitespace() {
                tokens.push(ch.to_string());
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
        Self {
            source,
            tokens,
            pos: 0,
            names,
            inline: None,
        }
    }

    fn next(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.next() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::Syntax {
            message: message.into(),
            expr: self.source.to_string(),
        }
    }
}

impl ContentExpr {
    pub(crate) fn parse(source: &str, names: &[NodeName]) -> Result<Self, SchemaError> {
        let mut stream = TokenStream::new(source, names);
        if stream.next().is_none() {
            return Ok(ContentExpr::Seq(Vec::new()));
        }
        let expr = parse_expr(&mut stream)?;
        if let Some(token) = stream.next() {
            return Err(stream.err(format!("unexpected trailing text {token:?}")));
        }
        Ok(expr)
    }
}

fn parse_expr(stream: &mut TokenStream<'_>) -> Result<ContentExpr, SchemaError> {
    let mut exprs = vec![parse_expr_seq(stream)?];
    while stream.eat("|") {
        exprs.push(parse_expr_seq(stream)?);
    }
    Ok(if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        ContentExpr::Choice(exprs)
    })
}

fn parse_expr_seq(stream: &mut TokenStream<'_>) -> Result<ContentExpr, SchemaError> {
    let mut exprs = Vec::new();
    loop {
        exprs.push(parse_expr_subscript(stream)?);
        match stream.next() {
            None | Some(")") | Some("|") => break,
            Some(_) => {}
        }
    }
    Ok(if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        ContentExpr::Seq(exprs)
    })
}

fn parse_expr_subscript(stream: &mut TokenStream<'_>) -> Result<ContentExpr, SchemaError> {
    let mut expr = parse_expr_atom(stream)?;
    loop {
        if stream.eat("+") {
            expr = ContentExpr::Plus(Box::new(expr));
        } else if stream.eat("*") {
            expr = ContentExpr::Star(Box::new(expr));
        } else if stream.eat("?") {
            expr = ContentExpr::Opt(Box::new(expr));
        } else if stream.eat("{") {
            expr = parse_expr_range(stream, expr)?;
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_num(stream: &mut TokenStream<'_>) -> Result<usize, SchemaError> {
    let token = stream.next().unwrap_or_default();
    let value = token
        .parse::<usize>()
        .map_err(|_| stream.err(format!("expected number, got {token:?}")))?;
    stream.pos += 1;
    Ok(value)
}

fn parse_expr_range(
    stream: &mut TokenStream<'_>,
    expr: ContentExpr,
) -> Result<ContentExpr, SchemaError> {
    let min = parse_num(stream)?;
    let mut max = Some(min);
    if stream.eat(",") {
        max = if stream.next() != Some("}") {
            Some(parse_num(stream)?)
        } else {
            None
        };
    }
    if !stream.eat("}") {
        return Err(stream.err("unclosed braced range"));
    }
    Ok(ContentExpr::Range {
        min,
        max,
        expr: Box::new(expr),
    })
}

fn resolve_name(stream: &TokenStream<'_>, name: &str) -> Result<Vec<usize>, SchemaError> {
    if let Some(index) = stream.names.iter().position(|n| n.name == name) {
        return Ok(vec![index]);
    }
    let grouped: Vec<usize> = stream
        .names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.groups.iter().any(|g| g == name))
        .map(|(index, _)| index)
        .collect();
    if grouped.is_empty() {
        return Err(SchemaError::UnknownName {
            name: name.to_string(),
            expr: stream.source.to_string(),
        });
    }
    Ok(grouped)
}

fn parse_expr_atom(stream: &mut TokenStream<'_>) -> Result<ContentExpr, SchemaError> {
    if stream.eat("(") {
        let expr = parse_expr(stream)?;
        if !stream.eat(")") {
            return Err(stream.err("missing closing paren"));
        }
        return Ok(expr);
    }
    let Some(token) = stream.next().map(str::to_string) else {
        return Err(stream.err("unexpected end of expression"));
    };
    if !token.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(stream.err(format!("unexpected token {token:?}")));
    }
    let types = resolve_name(stream, &token)?;
    for &ty in &types {
        let inline = stream.names[ty].inline;
        match stream.inline {
            None => stream.inline = Some(inline),
            Some(current) if current != inline => {
                return Err(SchemaError::MixedContent(stream.source.to_string()));
            }
            Some(_) => {}
        }
    }
    stream.pos += 1;
    let mut exprs: Vec<ContentExpr> = types.into_iter().map(ContentExpr::Name).collect();
    Ok(if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        ContentExpr::Choice(exprs)
    })
}

struct NfaEdge {
    term: Option<usize>,
    to: Option<usize>,
}

/// Thompson-style NFA; the last node is the accepting one.
struct Nfa {
    nodes: Vec<Vec<usize>>,
    edges: Vec<NfaEdge>,
}

impl Nfa {
    fn build(expr: &ContentExpr) -> Self {
        let mut nfa = Nfa {
            nodes: vec![Vec::new()],
            edges: Vec::new(),
        };
        let out = nfa.compile(expr, 0);
        let end = nfa.node();
        nfa.connect(&out, end);
        nfa
    }

    fn node(&mut self) -> usize {
        self.nodes.push(Vec::new());
        self.nodes.len() - 1
    }

    fn edge(&mut self, from: usize, to: Option<usize>, term: Option<usize>) -> usize {
        let id = self.edges.len();
        self.edges.push(NfaEdge { term, to });
        self.nodes[from].push(id);
        id
    }

    fn connect(&mut self, edges: &[usize], to: usize) {
        for &edge in edges {
            self.edges[edge].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &ContentExpr, from: usize) -> Vec<usize> {
        match expr {
            ContentExpr::Choice(exprs) => exprs
                .iter()
                .flat_map(|expr| self.compile(expr, from))
                .collect(),
            ContentExpr::Seq(exprs) => {
                let Some((last, init)) = exprs.split_last() else {
                    return vec![self.edge(from, None, None)];
                };
                let mut from = from;
                for expr in init {
                    let next = self.compile(expr, from);
                    from = self.node();
                    self.connect(&next, from);
                }
                self.compile(last, from)
            }
            ContentExpr::Star(expr) => {
                let lp = self.node();
                self.edge(from, Some(lp), None);
                let inner = self.compile(expr, lp);
                self.connect(&inner, lp);
                vec![self.edge(lp, None, None)]
            }
            ContentExpr::Plus(expr) => {
                let lp = self.node();
                let first = self.compile(expr, from);
                self.connect(&first, lp);
                let again = self.compile(expr, lp);
                self.connect(&again, lp);
                vec![self.edge(lp, None, None)]
            }
            ContentExpr::Opt(expr) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(expr, from));
                out
            }
            ContentExpr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let inner = self.compile(expr, cur);
                    self.connect(&inner, next);
                    cur = next;
                }
                match max {
                    None => {
                        let inner = self.compile(expr, cur);
                        self.connect(&inner, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let inner = self.compile(expr, cur);
                            self.connect(&inner, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            ContentExpr::Name(ty) => vec![self.edge(from, None, Some(*ty))],
        }
    }

    fn null_from(&self, node: usize) -> Vec<usize> {
        let mut result = Vec::new();
        self.scan(node, &mut result);
        result.sort_unstable();
        result.dedup();
        result
    }

    fn scan(&self, node: usize, result: &mut Vec<usize>) {
        let edges = &self.nodes[node];
        if let [only] = edges.as_slice() {
            let edge = &self.edges[*only];
            if edge.term.is_none()
                && let Some(to) = edge.to
            {
                return self.scan(to, result);
            }
        }
        result.push(node);
        for &edge in edges {
            let edge = &self.edges[edge];
            if edge.term.is_none()
                && let Some(to) = edge.to
                && !result.contains(&to)
            {
                self.scan(to, result);
            }
        }
    }

    fn accepting(&self) -> usize {
        self.nodes.len() - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DfaState {
    pub(crate) valid_end: bool,
    /// `(node type index, next state)` in declaration order.
    pub(crate) next: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dfa {
    pub(crate) states: Vec<DfaState>,
}

impl Dfa {
    /// Automaton of a leaf type: only the empty sequence matches.
    pub(crate) fn empty() -> Self {
        Self {
            states: vec![DfaState {
                valid_end: true,
                next: Vec::new(),
            }],
        }
    }

    pub(crate) fn compile(expr: &ContentExpr) -> Self {
        let nfa = Nfa::build(expr);
        let mut dfa = Dfa { states: Vec::new() };
        let mut labeled = HashMap::new();
        dfa.explore(&nfa, nfa.null_from(0), &mut labeled);
        dfa
    }

    fn explore(
        &mut self,
        nfa: &Nfa,
        states: Vec<usize>,
        labeled: &mut HashMap<Vec<usize>, usize>,
    ) -> usize {
        let mut out: Vec<(usize, Vec<usize>)> = Vec::new();
        for &node in &states {
            for &edge in &nfa.nodes[node] {
                let edge = &nfa.edges[edge];
                let (Some(term), Some(to)) = (edge.term, edge.to) else {
                    continue;
                };
                let slot = match out.iter().position(|(ty, _)| *ty == term) {
                    Some(slot) => slot,
                    None => {
                        out.push((term, Vec::new()));
                        out.len() - 1
                    }
                };
                for reached in nfa.null_from(to) {
                    if !out[slot].1.contains(&reached) {
                        out[slot].1.push(reached);
                    }
                }
            }
        }

        let id = self.states.len();
        self.states.push(DfaState {
            valid_end: states.contains(&nfa.accepting()),
            next: Vec::new(),
        });
        labeled.insert(states, id);

        for (ty, mut set) in out {
            set.sort_unstable();
            let next = match labeled.get(&set) {
                Some(&next) => next,
                None => self.explore(nfa, set, labeled),
            };
            self.states[id].next.push((ty, next));
        }
        id
    }

    pub(crate) fn first_edge_type(&self) -> Option<usize> {
        self.states
            .first()
            .and_then(|state| state.next.first())
            .map(|(ty, _)| *ty)
    }
}

/// A state in a node type's content automaton.
#[derive(Clone)]
pub struct ContentMatch {
    owner: NodeType,
    state: usize,
}

impl ContentMatch {
    pub(crate) fn start(owner: NodeType) -> Self {
        Self { owner, state: 0 }
    }

    fn data(&self) -> &DfaState {
        &self.owner.data().content.states[self.state]
    }

    fn at(&self, state: usize) -> Self {
        Self {
            owner: self.owner.clone(),
            state,
        }
    }

    /// True when the content matched so far is a complete sequence.
    pub fn valid_end(&self) -> bool {
        self.data().valid_end
    }

    pub fn edge_count(&self) -> usize {
        self.data().next.len()
    }

    pub fn edge(&self, n: usize) -> Option<(NodeType, ContentMatch)> {
        self.data()
            .next
            .get(n)
            .map(|&(ty, next)| (self.owner.schema.node_type_at(ty), self.at(next)))
    }

    fn edges(&self) -> impl Iterator<Item = (NodeType, ContentMatch)> + '_ {
        (0..self.edge_count()).filter_map(|n| self.edge(n))
    }

    pub fn match_type(&self, ty: &NodeType) -> Option<ContentMatch> {
        if !ty.schema.ptr_eq(&self.owner.schema) {
            return None;
        }
        self.data()
            .next
            .iter()
            .find(|(candidate, _)| *candidate == ty.index)
            .map(|&(_, next)| self.at(next))
    }

    pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
        self.match_fragment_range(fragment, 0, fragment.child_count())
    }

    pub fn match_fragment_range(
        &self,
        fragment: &Fragment,
        start: usize,
        end: usize,
    ) -> Option<ContentMatch> {
        let mut cur = self.clone();
        for i in start..end {
            cur = cur.match_type(fragment.child(i).ty())?;
        }
        Some(cur)
    }

    pub fn inline_content(&self) -> bool {
        self.edge(0).is_some_and(|(ty, _)| ty.is_inline())
    }

    /// First type allowed here that can be created without content or
    /// attributes.
    pub fn default_type(&self) -> Option<NodeType> {
        self.edges()
            .map(|(ty, _)| ty)
            .find(|ty| !(ty.is_text() || ty.has_required_attrs()))
    }

    pub fn compatible(&self, other: &ContentMatch) -> bool {
        self.data()
            .next
            .iter()
            .any(|(a, _)| other.data().next.iter().any(|(b, _)| a == b))
            && self.owner.schema.ptr_eq(&other.owner.schema)
    }

    /// Finds the nodes to insert before `after` (from `start_index`) so that it
    /// matches from this state; with `to_end` the result must also be a
    /// complete sequence.
    pub fn fill_before(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Option<Fragment> {
        let mut seen = vec![self.state];
        self.search_fill(after, to_end, start_index, &mut Vec::new(), &mut seen)
    }

    fn search_fill(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
        types: &mut Vec<NodeType>,
        seen: &mut Vec<usize>,
    ) -> Option<Fragment> {
        if let Some(finished) =
            self.match_fragment_range(after, start_index, after.child_count())
            && (!to_end || finished.valid_end())
        {
            let mut nodes = Vec::with_capacity(types.len());
            for ty in types.iter() {
                nodes.push(ty.create_and_fill(None, Fragment::empty(), Vec::new())?);
            }
            return Some(Fragment::from_nodes(nodes));
        }
        for (ty, next) in self.edges() {
            if !(ty.is_text() || ty.has_required_attrs()) && !seen.contains(&next.state) {
                seen.push(next.state);
                types.push(ty);
                let found = next.search_fill(after, to_end, start_index, types, seen);
                types.pop();
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    /// Shortest chain of wrapper types that lets `target` appear here.
    pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        struct Active {
            matched: ContentMatch,
            ty: Option<NodeType>,
            via: Option<usize>,
        }

        let mut seen: Vec<usize> = Vec::new();
        let mut active = vec![Active {
            matched: self.clone(),
            ty: None,
            via: None,
        }];
        let mut head = 0;
        while head < active.len() {
            let current = head;
            head += 1;
            if active[current].matched.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut cursor = Some(current);
                while let Some(index) = cursor {
                    let Some(ty) = &active[index].ty else {
                        break;
                    };
                    result.push(ty.clone());
                    cursor = active[index].via;
                }
                result.reverse();
                return Some(result);
            }
            let candidates: Vec<(NodeType, ContentMatch)> =
                active[current].matched.edges().collect();
            for (ty, next) in candidates {
                if !ty.is_leaf()
                    && !ty.has_required_attrs()
                    && !seen.contains(&ty.index)
                    && (active[current].ty.is_none() || next.valid_end())
                {
                    seen.push(ty.index);
                    active.push(Active {
                        matched: ty.content_match(),
                        ty: Some(ty),
                        via: Some(current),
                    });
                }
            }
        }
        None
    }
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.state == other.state
    }
}

impl std::fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let next: Vec<String> = self
            .edges()
            .map(|(ty, m)| format!("{}->{}", ty.name(), m.state))
            .collect();
        write!(
            f,
            "ContentMatch({}#{}{} [{}])",
            self.owner.name(),
            self.state,
            if self.valid_end() { "*" } else { "" },
            next.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Schema, SchemaSpec, schema::NodeSpec};

    fn schema_with(content: &str) -> Schema {
        Schema::new(SchemaSpec {
            nodes: vec![
                NodeSpec::new("doc").content(content),
                NodeSpec::new("para").content("text*").group("block"),
                NodeSpec::new("quote").content("block+").group("block"),
                NodeSpec::new("rule").group("block"),
                NodeSpec::new("text"),
            ],
            marks: vec![],
            top_node: "doc".to_string(),
        })
        .unwrap()
    }

    fn accepts(schema: &Schema, types: &[&str]) -> bool {
        let mut cur = schema.top_node_type().content_match();
        for name in types {
            match cur.match_type(&schema.node_type(name).unwrap()) {
                Some(next) => cur = next,
                None => return false,
            }
        }
        cur.valid_end()
    }

    #[test]
    fn star_and_plus() {
        let schema = schema_with("para* rule+");
        assert!(accepts(&schema, &["rule"]));
        assert!(accepts(&schema, &["para", "para", "rule", "rule"]));
        assert!(!accepts(&schema, &[]));
        assert!(!accepts(&schema, &["rule", "para"]));
    }

    #[test]
    fn choice_and_optional() {
        let schema = schema_with("(para | rule) quote?");
        assert!(accepts(&schema, &["para"]));
        assert!(accepts(&schema, &["rule", "quote"]));
        assert!(!accepts(&schema, &["quote"]));
        assert!(!accepts(&schema, &["para", "quote", "quote"]));
    }

    #[test]
    fn braced_ranges() {
        let schema = schema_with("para{2,3}");
        assert!(!accepts(&schema, &["para"]));
        assert!(accepts(&schema, &["para", "para"]));
        assert!(accepts(&schema, &["para", "para", "para"]));
        assert!(!accepts(&schema, &["para", "para", "para", "para"]));

        let schema = schema_with("rule{2,}");
        assert!(!accepts(&schema, &["rule"]));
        assert!(accepts(&schema, &["rule", "rule", "rule", "rule"]));
    }

    #[test]
    fn groups_expand_to_members() {
        let schema = schema_with("block+");
        assert!(accepts(&schema, &["para", "quote", "rule"]));
        assert!(!accepts(&schema, &[]));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let result = Schema::new(SchemaSpec {
            nodes: vec![NodeSpec::new("doc").content("(text"), NodeSpec::new("text")],
            marks: vec![],
            top_node: "doc".to_string(),
        });
        assert!(matches!(result, Err(SchemaError::Syntax { .. })));
    }

    #[test]
    fn mixing_inline_and_block_is_rejected() {
        let result = Schema::new(SchemaSpec {
            nodes: vec![
                NodeSpec::new("doc").content("(para | text)+"),
                NodeSpec::new("para").content("text*"),
                NodeSpec::new("text"),
            ],
            marks: vec![],
            top_node: "doc".to_string(),
        });
        assert!(matches!(result, Err(SchemaError::MixedContent(_))));
    }

    #[test]
    fn default_type_skips_text() {
        let schema = Schema::outline();
        let item = schema.node_type("listItem").unwrap();
        assert_eq!(
            item.content_match().default_type().map(|t| t.name().to_string()),
            Some("paragraph".to_string())
        );
    }

    #[test]
    fn find_wrapping_in_outline_schema() {
        let schema = Schema::outline();
        let list = schema.node_type("bulletList").unwrap();
        let paragraph = schema.node_type("paragraph").unwrap();
        let doc = schema.top_node_type();

        let inside = list.content_match().find_wrapping(&paragraph).unwrap();
        let names: Vec<&str> = inside.iter().map(NodeType::name).collect();
        assert_eq!(names, vec!["listItem"]);

        assert_eq!(doc.content_match().find_wrapping(&list), Some(vec![]));
    }

    #[test]
    fn fill_before_creates_required_nodes() {
        let schema = schema_with("para rule");
        let rule = schema.node_type("rule").unwrap();
        let after = Fragment::from_node(rule.create(None, Fragment::empty(), vec![]).unwrap());
        let fill = schema
            .top_node_type()
            .content_match()
            .fill_before(&after, true, 0)
            .unwrap();
        assert_eq!(fill.child_count(), 1);
        assert_eq!(fill.child(0).ty().name(), "para");
    }
}
