//! Scope building: the table and alias bindings visible at a point in a query.
//!
//! Scopes are computed as immutable snapshots while folding down the path
//! from the root to the cursor. Each SELECT on the path pushes one [`Scope`]
//! onto an explicit stack; inner bindings shadow outer ones with the same
//! reference name.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::syntax::walk::{preorder, PathFold};
use crate::syntax::{NodeId, NodeKind, SqlToken, SyntaxTree, TokenKind};
use crate::types::{CompletionOptions, CompletionRequest, NormalizationStrategy, Schema};

/// Recursion bound for derived tables and CTE projections.
const MAX_SCOPE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DerivedOrigin {
    Subquery,
    Cte,
}

impl DerivedOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Subquery => "subquery",
            Self::Cte => "cte",
        }
    }
}

/// Where a binding's columns come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BindingSource {
    /// A schema table, looked up by name.
    Table,
    /// A derived table or CTE with its projected column names.
    Derived {
        origin: DerivedOrigin,
        columns: Vec<String>,
    },
}

/// A table (or derived source) introduced by a FROM/JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableBinding {
    /// Name as written, or the CTE name / alias for derived sources.
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub name_quoted: bool,
    #[serde(default)]
    pub alias_quoted: bool,
    pub source: BindingSource,
    /// 0 for the SELECT's own sources, +1 per enclosing level.
    pub depth: usize,
}

impl TableBinding {
    /// The name this binding is referenced by: the alias when present.
    pub fn reference_name(&self) -> (&str, bool) {
        match &self.alias {
            Some(alias) => (alias, self.alias_quoted),
            None => (&self.table_name, self.name_quoted),
        }
    }
}

/// Bindings visible at one SELECT level, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub bindings: Vec<TableBinding>,
}

impl Scope {
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Combines a SELECT's own bindings with the non-shadowed bindings of `outer`.
    pub fn nest(
        own: Vec<TableBinding>,
        outer: Option<&Scope>,
        resolver: &NameResolver<'_>,
    ) -> Scope {
        let own_len = own.len();
        let mut bindings = own;
        for binding in outer.map(|s| s.bindings.as_slice()).unwrap_or_default() {
            let (name, quoted) = binding.reference_name();
            let shadowed = bindings[..own_len].iter().any(|inner| {
                let (inner_name, inner_quoted) = inner.reference_name();
                resolver.names_match(inner_name, inner_quoted, name, quoted)
            });
            if !shadowed {
                let mut visible = binding.clone();
                visible.depth += 1;
                bindings.push(visible);
            }
        }
        Scope { bindings }
    }
}

/// A common table expression and the columns it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CteDefinition {
    pub name: String,
    #[serde(default)]
    pub quoted: bool,
    pub columns: Vec<String>,
}

/// Columns a binding resolves to, with the owner name used in suggestion details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns<'a> {
    pub owner: &'a str,
    pub origin: &'static str,
    pub columns: &'a [String],
}

/// Name matching and schema lookup under one request's folding rules.
#[derive(Debug, Clone, Copy)]
pub struct NameResolver<'a> {
    schema: &'a Schema,
    strategy: NormalizationStrategy,
    options: CompletionOptions,
}

impl<'a> NameResolver<'a> {
    pub fn new(
        schema: &'a Schema,
        strategy: NormalizationStrategy,
        options: CompletionOptions,
    ) -> Self {
        Self {
            schema,
            strategy,
            options,
        }
    }

    pub fn from_request(request: &'a CompletionRequest) -> Self {
        let options = request.options.unwrap_or_default();
        let strategy = options.case_sensitivity.resolve(request.dialect);
        Self::new(&request.schema, strategy, options)
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    /// Compares two identifiers, folding only the unquoted ones.
    pub fn names_match(
        &self,
        left: &str,
        left_quoted: bool,
        right: &str,
        right_quoted: bool,
    ) -> bool {
        self.fold(left, left_quoted) == self.fold(right, right_quoted)
    }

    fn fold<'n>(&self, name: &'n str, quoted: bool) -> Cow<'n, str> {
        if quoted {
            Cow::Borrowed(name)
        } else {
            self.strategy.apply(name)
        }
    }

    pub fn find_cte<'c>(
        &self,
        ctes: &'c [CteDefinition],
        name: &str,
        quoted: bool,
    ) -> Option<&'c CteDefinition> {
        ctes.iter().rev().find(|cte| {
            !cte.name.is_empty() && self.names_match(&cte.name, cte.quoted, name, quoted)
        })
    }

    /// Columns of `binding`, or `None` when it names no known table.
    pub fn resolve<'b>(&self, binding: &'b TableBinding) -> Option<ResolvedColumns<'b>>
    where
        'a: 'b,
    {
        match &binding.source {
            BindingSource::Table => self
                .schema
                .find_table(&binding.table_name, binding.name_quoted, self.strategy)
                .map(|table| ResolvedColumns {
                    owner: &table.name,
                    origin: "table",
                    columns: &table.columns,
                }),
            BindingSource::Derived { origin, columns } => Some(ResolvedColumns {
                owner: &binding.table_name,
                origin: origin.label(),
                columns,
            }),
        }
    }

    /// Whether `qualifier` (as in `qualifier.column`) refers to `binding`.
    pub fn matches_qualifier(&self, binding: &TableBinding, qualifier: &str, quoted: bool) -> bool {
        if let Some(alias) = &binding.alias {
            if self.names_match(alias, binding.alias_quoted, qualifier, quoted) {
                return true;
            }
            let subquery = matches!(
                binding.source,
                BindingSource::Derived {
                    origin: DerivedOrigin::Subquery,
                    ..
                }
            );
            if self.options.alias_shadows_table || subquery {
                return false;
            }
        }
        if self.names_match(&binding.table_name, binding.name_quoted, qualifier, quoted) {
            return true;
        }
        binding
            .table_name
            .rsplit_once('.')
            .is_some_and(|(_, last)| self.names_match(last, binding.name_quoted, qualifier, quoted))
    }

    /// Innermost binding in `scope` that `qualifier` refers to.
    pub fn lookup<'s>(
        &self,
        scope: &'s Scope,
        qualifier: &str,
        quoted: bool,
    ) -> Option<&'s TableBinding> {
        scope
            .bindings
            .iter()
            .find(|binding| self.matches_qualifier(binding, qualifier, quoted))
    }
}

/// Scope state at one node on the path: the SELECT scope stack and visible CTEs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeEnv {
    scopes: Vec<Scope>,
    ctes: Vec<CteDefinition>,
}

impl ScopeEnv {
    /// Scope of the innermost enclosing SELECT.
    pub fn current(&self) -> Scope {
        self.scopes.last().cloned().unwrap_or_default()
    }

    /// Nesting depth in SELECT levels.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn ctes(&self) -> &[CteDefinition] {
        &self.ctes
    }

    /// Names of the CTEs visible here, outermost first.
    pub fn visible_cte_names(&self) -> Vec<String> {
        self.ctes
            .iter()
            .filter(|cte| !cte.name.is_empty())
            .map(|cte| cte.name.clone())
            .collect()
    }
}

/// Folds scope state down a root-to-cursor path.
pub struct ScopeFold<'r, 'a> {
    resolver: &'r NameResolver<'a>,
}

impl<'r, 'a> ScopeFold<'r, 'a> {
    pub fn new(resolver: &'r NameResolver<'a>) -> Self {
        Self { resolver }
    }
}

impl PathFold for ScopeFold<'_, '_> {
    type State = ScopeEnv;

    fn enter(&self, tree: &SyntaxTree, node: NodeId, outer: &ScopeEnv) -> ScopeEnv {
        match tree.kind(node) {
            NodeKind::Query => match tree.first_child_of_kind(node, NodeKind::WithClause) {
                Some(with) => {
                    let mut env = outer.clone();
                    env.ctes
                        .extend(compute_ctes(tree, with, &outer.ctes, self.resolver, 0));
                    env
                }
                None => outer.clone(),
            },
            NodeKind::Cte => {
                let mut env = outer.clone();
                if let Some(with) = tree.parent(node) {
                    let siblings: Vec<NodeId> =
                        tree.children_of_kind(with, NodeKind::Cte).collect();
                    let position = siblings.iter().position(|&c| c == node).unwrap_or(0);
                    let recursive = tree
                        .own_tokens(with)
                        .iter()
                        .any(|t| t.is_keyword("RECURSIVE"));
                    let keep = outer.ctes.len().saturating_sub(siblings.len())
                        + position
                        + usize::from(recursive);
                    env.ctes.truncate(keep);
                }
                env
            }
            NodeKind::Select => {
                if outer.scopes.len() >= MAX_SCOPE_DEPTH {
                    return outer.clone();
                }
                let own = collect_bindings(tree, node, &outer.ctes, self.resolver, 0);
                let scope = match derived_table_of(tree, node) {
                    Some(derived) if is_lateral(tree, derived) => {
                        let visible = outer.scopes.last().map(|enclosing| {
                            self.preceding_sources(tree, derived, enclosing, outer)
                        });
                        Scope::nest(own, visible.as_ref(), self.resolver)
                    }
                    Some(_) => {
                        let parent = outer
                            .scopes
                            .len()
                            .checked_sub(2)
                            .and_then(|i| outer.scopes.get(i));
                        Scope::nest(own, parent, self.resolver)
                    }
                    None => Scope::nest(own, outer.scopes.last(), self.resolver),
                };
                let mut env = outer.clone();
                env.scopes.push(scope);
                env
            }
            _ => outer.clone(),
        }
    }
}

impl ScopeFold<'_, '_> {
    /// The enclosing scope as a LATERAL derived table sees it: the owning
    /// SELECT's sources written before `derived`, plus everything further out.
    fn preceding_sources(
        &self,
        tree: &SyntaxTree,
        derived: NodeId,
        enclosing: &Scope,
        outer: &ScopeEnv,
    ) -> Scope {
        let start = tree.node(derived).tokens.start;
        let preceding = owning_select(tree, derived)
            .map(|select| {
                source_bindings(tree, select, &outer.ctes, self.resolver, 0)
                    .into_iter()
                    .filter(|(node, _)| tree.node(*node).tokens.start < start)
                    .count()
            })
            .unwrap_or(0);
        let mut own_seen = 0;
        let bindings = enclosing
            .bindings
            .iter()
            .filter(|binding| {
                if binding.depth > 0 {
                    return true;
                }
                own_seen += 1;
                own_seen <= preceding
            })
            .cloned()
            .collect();
        Scope { bindings }
    }
}

/// The FROM-clause derived table whose body is `select`, if any.
///
/// A derived table cannot see its sibling sources, only what encloses the
/// SELECT owning the FROM clause. A LATERAL one also sees the sources before it.
fn derived_table_of(tree: &SyntaxTree, select: NodeId) -> Option<NodeId> {
    tree.parent(select)
        .filter(|&query| tree.kind(query) == NodeKind::Query)
        .and_then(|query| tree.parent(query))
        .filter(|&owner| tree.kind(owner) == NodeKind::DerivedTable)
}

fn is_lateral(tree: &SyntaxTree, derived: NodeId) -> bool {
    tree.own_tokens(derived)
        .first()
        .is_some_and(|t| t.is_keyword("LATERAL"))
}

fn owning_select(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    let mut current = tree.parent(node)?;
    while tree.kind(current) != NodeKind::Select {
        current = tree.parent(current)?;
    }
    Some(current)
}

/// Bindings introduced by the FROM clause of `select`, in source order.
pub fn collect_bindings(
    tree: &SyntaxTree,
    select: NodeId,
    ctes: &[CteDefinition],
    resolver: &NameResolver<'_>,
    depth: usize,
) -> Vec<TableBinding> {
    source_bindings(tree, select, ctes, resolver, depth)
        .into_iter()
        .map(|(_, binding)| binding)
        .collect()
}

/// Like [`collect_bindings`], paired with the source node each binding came from.
fn source_bindings(
    tree: &SyntaxTree,
    select: NodeId,
    ctes: &[CteDefinition],
    resolver: &NameResolver<'_>,
    depth: usize,
) -> Vec<(NodeId, TableBinding)> {
    let Some(from) = tree.first_child_of_kind(select, NodeKind::FromClause) else {
        return Vec::new();
    };
    preorder(tree, from, |t, n| {
        matches!(t.kind(n), NodeKind::FromClause | NodeKind::Join)
    })
    .filter_map(|node| {
        let binding = match tree.kind(node) {
            NodeKind::TableRef => table_binding(tree, node, ctes, resolver),
            NodeKind::DerivedTable => derived_binding(tree, node, ctes, resolver, depth),
            _ => None,
        };
        binding.map(|binding| (node, binding))
    })
    .collect()
}

fn table_binding(
    tree: &SyntaxTree,
    node: NodeId,
    ctes: &[CteDefinition],
    resolver: &NameResolver<'_>,
) -> Option<TableBinding> {
    let parts = TableRefParts::from_tokens(&tree.own_tokens(node));
    if parts.name.is_empty() {
        return None;
    }
    let (alias, alias_quoted) = match parts.alias {
        Some((alias, quoted)) => (Some(alias), quoted),
        None => (None, false),
    };

    let cte = (!parts.name.contains('.'))
        .then(|| resolver.find_cte(ctes, &parts.name, parts.name_quoted))
        .flatten();
    let binding = match cte {
        Some(cte) => TableBinding {
            table_name: cte.name.clone(),
            alias,
            name_quoted: cte.quoted,
            alias_quoted,
            source: BindingSource::Derived {
                origin: DerivedOrigin::Cte,
                columns: cte.columns.clone(),
            },
            depth: 0,
        },
        None => TableBinding {
            table_name: parts.name,
            alias,
            name_quoted: parts.name_quoted,
            alias_quoted,
            source: BindingSource::Table,
            depth: 0,
        },
    };
    Some(binding)
}

/// Derived tables are only referenceable through an alias.
fn derived_binding(
    tree: &SyntaxTree,
    node: NodeId,
    ctes: &[CteDefinition],
    resolver: &NameResolver<'_>,
    depth: usize,
) -> Option<TableBinding> {
    let own = tree.own_tokens(node);
    let alias = own.iter().rev().find(|t| t.kind == TokenKind::Identifier)?;
    let columns = tree
        .first_child_of_kind(node, NodeKind::Query)
        .map(|query| projected_columns(tree, query, ctes, resolver, depth + 1))
        .unwrap_or_default();
    Some(TableBinding {
        table_name: alias.value.clone(),
        alias: Some(alias.value.clone()),
        name_quoted: alias.quoted,
        alias_quoted: alias.quoted,
        source: BindingSource::Derived {
            origin: DerivedOrigin::Subquery,
            columns,
        },
        depth: 0,
    })
}

/// CTE definitions of a WITH clause, one per CTE, each seeing the ones before it.
pub fn compute_ctes(
    tree: &SyntaxTree,
    with: NodeId,
    outer: &[CteDefinition],
    resolver: &NameResolver<'_>,
    depth: usize,
) -> Vec<CteDefinition> {
    let mut visible = outer.to_vec();
    let mut defined = Vec::new();
    for cte in tree.children_of_kind(with, NodeKind::Cte) {
        let own = tree.own_tokens(cte);
        let (name, quoted) = own
            .first()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| (t.value.clone(), t.quoted))
            .unwrap_or_default();
        let explicit: Vec<String> = own
            .iter()
            .skip(1)
            .take_while(|t| !t.is_keyword("AS"))
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.value.clone())
            .collect();
        let columns = if explicit.is_empty() {
            tree.first_child_of_kind(cte, NodeKind::Query)
                .map(|query| projected_columns(tree, query, &visible, resolver, depth + 1))
                .unwrap_or_default()
        } else {
            explicit
        };
        let definition = CteDefinition {
            name,
            quoted,
            columns,
        };
        visible.push(definition.clone());
        defined.push(definition);
    }
    defined
}

/// Column names a query exposes to an enclosing FROM clause.
///
/// Explicit aliases and plain column references contribute their name, `*`
/// and `q.*` expand through the query's own bindings, and unnamed
/// expressions contribute nothing. Set operations take the first SELECT.
pub fn projected_columns(
    tree: &SyntaxTree,
    query: NodeId,
    ctes: &[CteDefinition],
    resolver: &NameResolver<'_>,
    depth: usize,
) -> Vec<String> {
    if depth > MAX_SCOPE_DEPTH {
        return Vec::new();
    }
    let mut visible = Cow::Borrowed(ctes);
    if let Some(with) = tree.first_child_of_kind(query, NodeKind::WithClause) {
        let inner = compute_ctes(tree, with, ctes, resolver, depth);
        visible.to_mut().extend(inner);
    }
    let Some(select) = tree.first_child_of_kind(query, NodeKind::Select) else {
        return Vec::new();
    };
    let Some(list) = tree.first_child_of_kind(select, NodeKind::SelectList) else {
        return Vec::new();
    };
    let bindings = collect_bindings(tree, select, &visible, resolver, depth);

    let mut columns = Vec::new();
    for item in tree.children_of_kind(list, NodeKind::SelectItem) {
        if let Some(alias) = tree
            .own_tokens(item)
            .last()
            .filter(|t| t.kind == TokenKind::Identifier)
        {
            columns.push(alias.value.clone());
            continue;
        }
        let Some(column_ref) = bare_column_ref(tree, item) else {
            continue;
        };
        let parts = tree.own_tokens(column_ref);
        match parts.split_last() {
            Some((last, qualifier)) if last.kind == TokenKind::Star => {
                let qualifier = Qualifier::from_tokens(qualifier);
                for binding in &bindings {
                    let selected = qualifier.as_ref().is_none_or(|q| {
                        resolver.matches_qualifier(binding, &q.name, q.quoted)
                    });
                    if let Some(resolved) = selected.then(|| resolver.resolve(binding)).flatten() {
                        columns.extend(resolved.columns.iter().cloned());
                    }
                }
            }
            Some((last, _)) if last.kind == TokenKind::Identifier => {
                columns.push(last.value.clone());
            }
            _ => {}
        }
    }
    columns
}

/// The column reference a select item consists of, if it is nothing else.
fn bare_column_ref(tree: &SyntaxTree, item: NodeId) -> Option<NodeId> {
    let expr = tree.first_child_of_kind(item, NodeKind::Expr)?;
    match tree.children(expr) {
        [only] if tree.kind(*only) == NodeKind::ColumnRef && tree.own_tokens(expr).is_empty() => {
            Some(*only)
        }
        _ => None,
    }
}

/// A dotted qualifier such as `u` or `public.users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualifier {
    pub name: String,
    pub quoted: bool,
}

impl Qualifier {
    /// Joins the identifiers among `tokens`; `None` when there are none.
    pub fn from_tokens(tokens: &[&SqlToken]) -> Option<Qualifier> {
        let parts: Vec<&&SqlToken> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(Qualifier {
            name: parts
                .iter()
                .map(|t| t.value.as_str())
                .collect::<Vec<_>>()
                .join("."),
            quoted: parts.iter().any(|t| t.quoted),
        })
    }
}

/// The pieces of a FROM-clause table reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRefParts {
    /// Dotted table name as written, without quotes.
    pub name: String,
    pub name_quoted: bool,
    /// Number of leading own tokens that make up the name, dots included.
    pub name_len: usize,
    pub alias: Option<(String, bool)>,
}

impl TableRefParts {
    pub fn from_tokens(own: &[&SqlToken]) -> TableRefParts {
        let mut parts = TableRefParts::default();
        if own.first().is_none_or(|t| t.kind != TokenKind::Identifier) {
            return parts;
        }
        let mut segments = vec![own[0]];
        let mut len = 1;
        while own.get(len).is_some_and(|t| t.kind == TokenKind::Dot) {
            len += 1;
            match own.get(len) {
                Some(&t) if t.kind == TokenKind::Identifier => {
                    segments.push(t);
                    len += 1;
                }
                _ => break,
            }
        }
        parts.name = segments
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join(".");
        parts.name_quoted = segments.iter().any(|t| t.quoted);
        parts.name_len = len;
        parts.alias = own[len..]
            .iter()
            .rev()
            .find(|t| t.kind == TokenKind::Identifier)
            .map(|t| (t.value.clone(), t.quoted));
        parts
    }
}
