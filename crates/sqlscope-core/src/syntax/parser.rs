//! Error-tolerant recursive descent parser for SELECT queries.
//!
//! The parser never fails. Tokens it cannot place are wrapped in
//! [`NodeKind::Error`] nodes and missing pieces simply end a node early, so a
//! half-typed statement still yields a tree whose shape reflects the clause
//! the user is editing.

#[cfg(feature = "tracing")]
use tracing::trace;

use super::tokens::{SqlToken, TokenKind};
use super::tree::{NodeId, NodeKind, SyntaxNode, SyntaxTree};
use crate::types::Span;

/// Maximum nesting of parenthesized groups and subqueries that get their own nodes.
/// Deeper groups are skipped as flat token runs.
const MAX_NESTING_DEPTH: usize = 128;

const QUERY_START: &[&str] = &["SELECT", "WITH"];
const SET_OPERATORS: &[&str] = &["UNION", "INTERSECT", "EXCEPT"];
const JOIN_KEYWORDS: &[&str] = &[
    "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "OUTER",
];
const CLAUSE_KEYWORDS: &[&str] = &[
    "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "FETCH",
];

/// Keywords that end an expression outside of parentheses.
const EXPR_TERMINATORS: &[&str] = &[
    "AS",
    "BY",
    "CROSS",
    "EXCEPT",
    "FETCH",
    "FROM",
    "FULL",
    "GROUP",
    "HAVING",
    "INNER",
    "INTERSECT",
    "JOIN",
    "LEFT",
    "LIMIT",
    "NATURAL",
    "OFFSET",
    "ON",
    "ORDER",
    "OUTER",
    "RECURSIVE",
    "RIGHT",
    "SELECT",
    "UNION",
    "USING",
    "WHERE",
    "WITH",
];

/// Keywords that complete an operand, so a following identifier is an alias.
const OPERAND_KEYWORDS: &[&str] = &["END", "FALSE", "NULL", "TRUE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExprMode {
    /// A select-list item: a comma ends it and a trailing identifier is an alias.
    SelectItem,
    /// One element of a GROUP BY / ORDER BY / LIMIT list.
    List,
    /// WHERE, HAVING and ON conditions.
    Predicate,
    /// Inside parentheses: only the closing parenthesis ends it.
    Paren,
}

/// Parses a token stream into a [`SyntaxTree`].
pub fn parse_tokens(tokens: Vec<SqlToken>) -> SyntaxTree {
    let mut parser = Parser::new(tokens);
    parser.script();
    parser.into_tree()
}

struct Parser {
    tokens: Vec<SqlToken>,
    /// Indices of non-comment tokens.
    significant: Vec<usize>,
    pos: usize,
    nodes: Vec<SyntaxNode>,
    open: Vec<NodeId>,
    /// One past the last consumed token index.
    last_end: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<SqlToken>) -> Self {
        let significant = tokens
            .iter()
            .filter(|t| !t.is_comment())
            .map(|t| t.index)
            .collect();
        Self {
            tokens,
            significant,
            pos: 0,
            nodes: Vec::new(),
            open: Vec::new(),
            last_end: 0,
            depth: 0,
        }
    }

    fn into_tree(self) -> SyntaxTree {
        SyntaxTree {
            nodes: self.nodes,
            tokens: self.tokens,
        }
    }

    // ---- token cursor -------------------------------------------------

    fn peek(&self) -> Option<&SqlToken> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<&SqlToken> {
        self.significant
            .get(self.pos + n)
            .and_then(|&index| self.tokens.get(index))
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn at_any_keyword(&self, keywords: &[&str]) -> bool {
        self.peek().is_some_and(|t| t.is_any_keyword(keywords))
    }

    /// `(` immediately followed by the start of a query.
    fn at_query_paren(&self) -> bool {
        self.query_paren_at(0)
    }

    /// `LATERAL (SELECT ...`
    fn at_lateral_query(&self) -> bool {
        self.peek().is_some_and(|t| t.is_keyword("LATERAL")) && self.query_paren_at(1)
    }

    fn query_paren_at(&self, n: usize) -> bool {
        self.peek_nth(n).is_some_and(|t| t.kind == TokenKind::LParen)
            && self
                .peek_nth(n + 1)
                .is_some_and(|t| t.is_any_keyword(QUERY_START))
    }

    fn current_index(&self) -> usize {
        self.significant
            .get(self.pos)
            .copied()
            .unwrap_or(self.tokens.len())
    }

    fn bump(&mut self) {
        if let Some(&index) = self.significant.get(self.pos) {
            self.last_end = index + 1;
            self.pos += 1;
        }
    }

    fn eat_kind(&mut self, kind: TokenKind) -> bool {
        let matched = self.at_kind(kind);
        if matched {
            self.bump();
        }
        matched
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let matched = self.at_keyword(keyword);
        if matched {
            self.bump();
        }
        matched
    }

    fn eat_any_keyword(&mut self, keywords: &[&str]) -> bool {
        let matched = self.at_any_keyword(keywords);
        if matched {
            self.bump();
        }
        matched
    }

    // ---- node construction ----------------------------------------------

    fn start(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        let start = self.current_index();
        let parent = self.open.last().copied();
        self.nodes.push(SyntaxNode {
            kind,
            tokens: start..start,
            span: Span::default(),
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        self.open.push(id);
        id
    }

    fn finish(&mut self, id: NodeId) {
        self.open.pop();
        let start = self.nodes[id].tokens.start;
        let end = self.last_end.max(start);
        let span = self.span_of(start, end);
        let node = &mut self.nodes[id];
        node.tokens = start..end;
        node.span = span;
    }

    fn span_of(&self, start: usize, end: usize) -> Span {
        if start < end {
            return Span::new(self.tokens[start].span.start, self.tokens[end - 1].span.end);
        }
        let at = self
            .tokens
            .get(start)
            .map(|t| t.span.start)
            .or_else(|| self.tokens.last().map(|t| t.span.end))
            .unwrap_or(0);
        Span::new(at, at)
    }

    /// Wraps tokens in an Error node until `stop` matches outside parentheses.
    /// Always consumes at least one token.
    fn error_until(&mut self, stop: impl Fn(&SqlToken) -> bool) {
        let node = self.start(NodeKind::Error);
        #[cfg(feature = "tracing")]
        trace!(token = self.current_index(), "recovering from unexpected token");
        let mut parens = 0usize;
        let mut first = true;
        while let Some(token) = self.peek() {
            if !first && parens == 0 && stop(token) {
                break;
            }
            match token.kind {
                TokenKind::LParen => parens += 1,
                TokenKind::RParen => parens = parens.saturating_sub(1),
                _ => {}
            }
            first = false;
            self.bump();
        }
        self.finish(node);
    }

    /// Consumes a balanced parenthesized group without building nodes.
    fn skip_balanced(&mut self) {
        let mut parens = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::LParen => parens += 1,
                TokenKind::RParen => {
                    parens = parens.saturating_sub(1);
                    if parens == 0 {
                        self.bump();
                        break;
                    }
                }
                TokenKind::Semicolon => break,
                _ => {}
            }
            self.bump();
        }
    }

    /// Skips leftovers before a closing parenthesis, then consumes it if present.
    fn close_paren(&mut self) {
        if !self.at_kind(TokenKind::RParen)
            && self
                .peek()
                .is_some_and(|t| t.kind != TokenKind::Semicolon)
        {
            self.error_until(|t| matches!(t.kind, TokenKind::RParen | TokenKind::Semicolon));
        }
        self.eat_kind(TokenKind::RParen);
    }

    // ---- statements -----------------------------------------------------

    fn script(&mut self) {
        let root = self.start(NodeKind::Script);
        while let Some(token) = self.peek() {
            if token.is_any_keyword(QUERY_START) {
                self.query();
            } else if token.kind == TokenKind::Semicolon {
                self.bump();
            } else {
                self.error_until(|t| {
                    t.kind == TokenKind::Semicolon || t.is_any_keyword(QUERY_START)
                });
            }
        }
        self.finish(root);

        let end = self.tokens.len();
        let span_end = self.tokens.last().map_or(0, |t| t.span.end);
        let node = &mut self.nodes[root];
        node.tokens = 0..end;
        node.span = Span::new(0, span_end);
    }

    fn query(&mut self) {
        let node = self.start(NodeKind::Query);
        if self.at_keyword("WITH") {
            self.with_clause();
        }
        if self.at_keyword("SELECT") {
            self.select();
        }
        while self.eat_any_keyword(SET_OPERATORS) {
            self.eat_any_keyword(&["ALL", "DISTINCT"]);
            if self.at_keyword("SELECT") {
                self.select();
            } else {
                break;
            }
        }
        self.finish(node);
    }

    fn with_clause(&mut self) {
        let node = self.start(NodeKind::WithClause);
        self.bump();
        self.eat_keyword("RECURSIVE");
        while self.at_kind(TokenKind::Identifier) {
            self.cte();
            if !self.eat_kind(TokenKind::Comma) {
                break;
            }
        }
        self.finish(node);
    }

    fn cte(&mut self) {
        let node = self.start(NodeKind::Cte);
        self.bump();
        if self.eat_kind(TokenKind::LParen) {
            while self.at_kind(TokenKind::Identifier) || self.at_kind(TokenKind::Comma) {
                self.bump();
            }
            self.eat_kind(TokenKind::RParen);
        }
        self.eat_keyword("AS");
        if self.at_kind(TokenKind::LParen) {
            self.parenthesized_query();
        }
        self.finish(node);
    }

    /// `( query )` with the opening parenthesis at the cursor.
    fn parenthesized_query(&mut self) {
        if self.depth >= MAX_NESTING_DEPTH {
            self.skip_balanced();
            return;
        }
        self.depth += 1;
        self.bump();
        if self.at_any_keyword(QUERY_START) {
            self.query();
        }
        self.close_paren();
        self.depth -= 1;
    }

    fn select(&mut self) {
        let node = self.start(NodeKind::Select);
        self.select_list();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Keyword {
                match token.value.as_str() {
                    "FROM" => self.from_clause(),
                    "WHERE" => self.predicate_clause(NodeKind::WhereClause),
                    "HAVING" => self.predicate_clause(NodeKind::HavingClause),
                    "GROUP" => self.by_clause(NodeKind::GroupByClause),
                    "ORDER" => self.by_clause(NodeKind::OrderByClause),
                    "LIMIT" | "OFFSET" | "FETCH" => self.limit_clause(),
                    value if SET_OPERATORS.contains(&value) || QUERY_START.contains(&value) => {
                        break
                    }
                    _ => self.error_until(ends_select_error),
                }
            } else if matches!(token.kind, TokenKind::RParen | TokenKind::Semicolon) {
                break;
            } else {
                self.error_until(ends_select_error);
            }
        }
        self.finish(node);
    }

    fn select_list(&mut self) {
        let node = self.start(NodeKind::SelectList);
        self.bump();
        self.eat_any_keyword(&["DISTINCT", "ALL"]);
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Comma {
                self.bump();
                continue;
            }
            if ends_expr(token, ExprMode::SelectItem, false) {
                break;
            }
            let before = self.pos;
            self.select_item();
            if self.pos == before {
                break;
            }
        }
        self.finish(node);
    }

    fn select_item(&mut self) {
        let node = self.start(NodeKind::SelectItem);
        self.expr(ExprMode::SelectItem);
        self.alias();
        self.finish(node);
    }

    /// `[AS] alias` after a select item or source.
    fn alias(&mut self) {
        if self.eat_keyword("AS") {
            self.eat_kind(TokenKind::Identifier);
        } else {
            self.eat_kind(TokenKind::Identifier);
        }
    }

    // ---- FROM -----------------------------------------------------------

    fn from_clause(&mut self) {
        let node = self.start(NodeKind::FromClause);
        self.bump();
        let mut parens = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Identifier => self.table_ref(),
                TokenKind::LParen if self.at_query_paren() => self.derived_table(),
                TokenKind::LParen => {
                    parens += 1;
                    self.bump();
                }
                TokenKind::RParen if parens > 0 => {
                    parens -= 1;
                    self.bump();
                }
                TokenKind::Comma => self.bump(),
                TokenKind::Keyword if self.at_lateral_query() => self.derived_table(),
                TokenKind::Keyword if token.is_keyword("LATERAL") => self.bump(),
                TokenKind::Keyword if token.is_any_keyword(JOIN_KEYWORDS) => self.join(),
                _ => break,
            }
        }
        self.finish(node);
    }

    fn table_ref(&mut self) {
        let node = self.start(NodeKind::TableRef);
        self.bump();
        while self.eat_kind(TokenKind::Dot) {
            if !self.eat_kind(TokenKind::Identifier) {
                break;
            }
        }
        if self.at_kind(TokenKind::LParen) {
            self.paren_group();
        }
        self.alias();
        self.finish(node);
    }

    /// `[LATERAL] (query) [AS] alias`
    fn derived_table(&mut self) {
        let node = self.start(NodeKind::DerivedTable);
        self.eat_keyword("LATERAL");
        self.parenthesized_query();
        self.alias();
        self.finish(node);
    }

    fn join(&mut self) {
        let node = self.start(NodeKind::Join);
        while self.eat_any_keyword(&[
            "NATURAL", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER",
        ]) {}
        if self.eat_keyword("JOIN") {
            if !self.at_lateral_query() {
                self.eat_keyword("LATERAL");
            }
            if self.at_kind(TokenKind::Identifier) {
                self.table_ref();
            } else if self.at_query_paren() || self.at_lateral_query() {
                self.derived_table();
            }
            if self.at_keyword("ON") {
                let condition = self.start(NodeKind::JoinCondition);
                self.bump();
                self.expr(ExprMode::Predicate);
                self.finish(condition);
            } else if self.at_keyword("USING") {
                let condition = self.start(NodeKind::JoinCondition);
                self.bump();
                if self.eat_kind(TokenKind::LParen) {
                    while self.at_kind(TokenKind::Identifier) || self.at_kind(TokenKind::Comma) {
                        self.bump();
                    }
                    self.eat_kind(TokenKind::RParen);
                }
                self.finish(condition);
            }
        }
        self.finish(node);
    }

    // ---- other clauses --------------------------------------------------

    fn predicate_clause(&mut self, kind: NodeKind) {
        let node = self.start(kind);
        self.bump();
        self.expr(ExprMode::Predicate);
        self.finish(node);
    }

    fn by_clause(&mut self, kind: NodeKind) {
        let node = self.start(kind);
        self.bump();
        if self.eat_keyword("BY") {
            self.expr_list();
        }
        self.finish(node);
    }

    fn limit_clause(&mut self) {
        let node = self.start(NodeKind::LimitClause);
        while self.eat_any_keyword(&["LIMIT", "OFFSET", "FETCH"]) {
            self.expr_list();
        }
        self.finish(node);
    }

    fn expr_list(&mut self) {
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Comma {
                self.bump();
                continue;
            }
            if ends_expr(token, ExprMode::List, false) {
                break;
            }
            let before = self.pos;
            self.expr(ExprMode::List);
            if self.pos == before {
                break;
            }
        }
    }

    // ---- expressions ----------------------------------------------------

    fn expr(&mut self, mode: ExprMode) {
        let node = self.start(NodeKind::Expr);
        let mut after_operand = false;
        while let Some(token) = self.peek() {
            if ends_expr(token, mode, after_operand) {
                break;
            }
            match token.kind {
                TokenKind::Identifier => {
                    if self
                        .peek_nth(1)
                        .is_some_and(|t| t.kind == TokenKind::LParen)
                    {
                        self.bump();
                        self.paren_group();
                    } else {
                        self.column_ref();
                    }
                    after_operand = true;
                }
                TokenKind::LParen => {
                    if self.at_query_paren() {
                        self.subquery();
                    } else {
                        self.paren_group();
                    }
                    after_operand = true;
                }
                TokenKind::Star if !after_operand => {
                    self.column_ref();
                    after_operand = true;
                }
                TokenKind::Keyword => {
                    after_operand = token.is_any_keyword(OPERAND_KEYWORDS);
                    self.bump();
                }
                TokenKind::Literal => {
                    self.bump();
                    after_operand = true;
                }
                _ => {
                    self.bump();
                    after_operand = false;
                }
            }
        }
        self.finish(node);
    }

    /// `( expr )` with the opening parenthesis at the cursor.
    fn paren_group(&mut self) {
        if self.depth >= MAX_NESTING_DEPTH {
            self.skip_balanced();
            return;
        }
        self.depth += 1;
        self.bump();
        if self
            .peek()
            .is_some_and(|t| !matches!(t.kind, TokenKind::RParen | TokenKind::Semicolon))
        {
            self.expr(ExprMode::Paren);
        }
        self.eat_kind(TokenKind::RParen);
        self.depth -= 1;
    }

    fn subquery(&mut self) {
        let node = self.start(NodeKind::Subquery);
        self.parenthesized_query();
        self.finish(node);
    }

    /// `name(.name)*[.*]` or a bare `*`. A trailing dot is kept.
    fn column_ref(&mut self) {
        let node = self.start(NodeKind::ColumnRef);
        let is_star = self.at_kind(TokenKind::Star);
        self.bump();
        if !is_star {
            while self.eat_kind(TokenKind::Dot) {
                if self.eat_kind(TokenKind::Identifier) {
                    continue;
                }
                self.eat_kind(TokenKind::Star);
                break;
            }
        }
        self.finish(node);
    }
}

fn ends_select_error(token: &SqlToken) -> bool {
    matches!(token.kind, TokenKind::RParen | TokenKind::Semicolon)
        || token.is_any_keyword(CLAUSE_KEYWORDS)
        || token.is_any_keyword(SET_OPERATORS)
        || token.is_any_keyword(QUERY_START)
}

fn ends_expr(token: &SqlToken, mode: ExprMode, after_operand: bool) -> bool {
    match token.kind {
        TokenKind::RParen | TokenKind::Semicolon => true,
        TokenKind::Comma => matches!(mode, ExprMode::SelectItem | ExprMode::List),
        TokenKind::Identifier => mode == ExprMode::SelectItem && after_operand,
        TokenKind::Keyword => mode != ExprMode::Paren && token.is_any_keyword(EXPR_TERMINATORS),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize;
    use crate::types::Dialect;

    fn parse(sql: &str) -> SyntaxTree {
        parse_tokens(tokenize(sql, Dialect::Generic).tokens)
    }

    fn kinds_on_path(tree: &SyntaxTree, token_text: &str) -> Vec<NodeKind> {
        let token = tree
            .tokens()
            .iter()
            .rposition(|t| t.text == token_text)
            .unwrap();
        tree.path_to_token(token)
            .into_iter()
            .map(|id| tree.kind(id))
            .collect()
    }

    #[test]
    fn parses_basic_select() {
        let tree = parse("SELECT a, b FROM users u WHERE a = 1");
        assert_eq!(
            tree.dump(),
            "Script 0..11\n\
             \x20 Query 0..11\n\
             \x20   Select 0..11\n\
             \x20     SelectList 0..4\n\
             \x20       SelectItem 1..2\n\
             \x20         Expr 1..2\n\
             \x20           ColumnRef 1..2\n\
             \x20       SelectItem 3..4\n\
             \x20         Expr 3..4\n\
             \x20           ColumnRef 3..4\n\
             \x20     FromClause 4..7\n\
             \x20       TableRef 5..7\n\
             \x20     WhereClause 7..11\n\
             \x20       Expr 8..11\n\
             \x20         ColumnRef 8..9\n"
        );
    }

    #[test]
    fn incomplete_where_has_empty_expression() {
        let tree = parse("SELECT * FROM users WHERE ");
        assert_eq!(
            kinds_on_path(&tree, "WHERE"),
            vec![
                NodeKind::Script,
                NodeKind::Query,
                NodeKind::Select,
                NodeKind::WhereClause
            ]
        );
    }

    #[test]
    fn trailing_dot_stays_in_column_ref() {
        let tree = parse("SELECT u. FROM users u");
        assert_eq!(
            kinds_on_path(&tree, "."),
            vec![
                NodeKind::Script,
                NodeKind::Query,
                NodeKind::Select,
                NodeKind::SelectList,
                NodeKind::SelectItem,
                NodeKind::Expr,
                NodeKind::ColumnRef
            ]
        );
        assert_eq!(kinds_on_path(&tree, "users").last(), Some(&NodeKind::TableRef));
    }

    #[test]
    fn joins_and_conditions() {
        let tree = parse("SELECT * FROM a JOIN b ON a.id = b.id LEFT JOIN c USING (id)");
        assert_eq!(
            kinds_on_path(&tree, "ON"),
            vec![
                NodeKind::Script,
                NodeKind::Query,
                NodeKind::Select,
                NodeKind::FromClause,
                NodeKind::Join,
                NodeKind::JoinCondition
            ]
        );
        assert_eq!(kinds_on_path(&tree, "c").last(), Some(&NodeKind::TableRef));
        assert_eq!(kinds_on_path(&tree, "USING").last(), Some(&NodeKind::JoinCondition));
    }

    #[test]
    fn derived_tables_and_subqueries() {
        let tree = parse("SELECT * FROM (SELECT x FROM t) d WHERE y IN (SELECT z FROM s)");
        let path = kinds_on_path(&tree, "t");
        assert!(path.contains(&NodeKind::DerivedTable));
        assert_eq!(path.last(), Some(&NodeKind::TableRef));
        let path = kinds_on_path(&tree, "s");
        assert!(path.contains(&NodeKind::Subquery));
        assert!(path.contains(&NodeKind::WhereClause));
    }

    #[test]
    fn lateral_keyword_belongs_to_its_derived_table() {
        for sql in [
            "SELECT * FROM a, LATERAL (SELECT x FROM t) d",
            "SELECT * FROM a JOIN LATERAL (SELECT x FROM t) d ON true",
        ] {
            let tree = parse(sql);
            assert_eq!(
                kinds_on_path(&tree, "LATERAL").last(),
                Some(&NodeKind::DerivedTable),
                "{sql}"
            );
            assert!(kinds_on_path(&tree, "t").contains(&NodeKind::DerivedTable));
        }
        let tree = parse("SELECT * FROM a, LATERAL ");
        assert_eq!(kinds_on_path(&tree, "LATERAL").last(), Some(&NodeKind::FromClause));
    }

    #[test]
    fn ctes_are_parsed() {
        let tree =
            parse("WITH c (k) AS (SELECT id FROM t), d AS (SELECT * FROM c) SELECT * FROM d");
        let path = kinds_on_path(&tree, "t");
        assert!(path.contains(&NodeKind::WithClause));
        assert!(path.contains(&NodeKind::Cte));
        let query = tree.children(SyntaxTree::ROOT)[0];
        let with = tree.first_child_of_kind(query, NodeKind::WithClause).unwrap();
        assert_eq!(tree.children_of_kind(with, NodeKind::Cte).count(), 2);
    }

    #[test]
    fn unknown_tokens_become_error_nodes() {
        let tree = parse("SELECT a FROM t 42 ORDER BY a");
        assert_eq!(kinds_on_path(&tree, "42").last(), Some(&NodeKind::Error));
        assert_eq!(
            kinds_on_path(&tree, "ORDER").last(),
            Some(&NodeKind::OrderByClause)
        );
    }

    #[test]
    fn every_token_is_inside_the_root() {
        for sql in [
            "",
            "garbage ( ( (",
            "SELECT (((",
            ") SELECT FROM WHERE",
            "SELECT * FROM users WHERE name = 'open",
            "; ; SELECT 1; SELECT",
        ] {
            let tree = parse(sql);
            for token in tree.tokens() {
                assert!(!tree.path_to_token(token.index).is_empty(), "{sql}");
            }
        }
    }

    #[test]
    fn children_are_ordered_and_disjoint() {
        let tree = parse(
            "SELECT a.b, count(*) c FROM x JOIN y ON x.id = y.id WHERE (a > 1) GROUP BY a",
        );
        for id in 0..tree.len() {
            let children = tree.children(id);
            for pair in children.windows(2) {
                assert!(tree.node(pair[0]).tokens.end <= tree.node(pair[1]).tokens.start);
            }
            for &child in children {
                let outer = &tree.node(id).tokens;
                let inner = &tree.node(child).tokens;
                assert!(outer.start <= inner.start && inner.end <= outer.end);
            }
        }
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let sql = format!("SELECT {}1{}", "(".repeat(500), ")".repeat(500));
        let tree = parse(&sql);
        assert!(tree.len() < 600);
    }

    #[test]
    fn own_tokens_exclude_children() {
        let tree = parse("SELECT a FROM users AS u");
        let table_ref = (0..tree.len())
            .find(|&id| tree.kind(id) == NodeKind::TableRef)
            .unwrap();
        let own: Vec<_> = tree
            .own_tokens(table_ref)
            .iter()
            .map(|t| t.text.clone())
            .collect();
        assert_eq!(own, vec!["users", "AS", "u"]);
    }
}
