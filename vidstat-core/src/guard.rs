//! Query guard — the only gate between candidate SQL and the database
//!
//! `validate` is a pure, conservative syntactic filter. It accepts a single
//! `SELECT` whose result is one aggregate value over the analytics tables and
//! rejects everything it cannot classify. Rejecting a safe query is
//! acceptable; admitting an unsafe one is not.
//!
//! Checks run in this order:
//! 1. empty input
//! 2. forbidden keywords and functions anywhere in the text (literals included)
//! 3. lexing: comments, dollar quoting, prefixed literals, backslashes
//! 4. statement terminators (one trailing `;` is tolerated and dropped)
//! 5. root keyword must be `SELECT`
//! 6. scalar shape: one aggregate projection, no grouping, set operations,
//!    windows or set-returning functions in the select list
//! 7. every `FROM` / `JOIN` relation is an unqualified (or `public.`) analytics
//!    table or a subquery

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::db::ANALYTICS_TABLES;

/// Keywords that never appear in a read-only aggregate query.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "truncate", "grant", "revoke", "create",
    "into", "copy", "merge", "call", "do", "execute", "prepare", "vacuum", "lock", "listen",
    "notify", "set", "reset", "comment", "refresh", "reindex", "cluster", "discard",
    "checkpoint", "load", "import", "table",
];

/// Functions that read or touch state beyond the analytics tables, matched
/// anywhere in the text. `*_to_xml*` covers the catalog functions that run an
/// arbitrary query or dump a named table.
const FORBIDDEN_FUNCTIONS: &str =
    r"\b(?:pg_|lo_|dblink)\w*|\b\w*_to_xml\w*|\b(?:set_config|current_setting|nextval|setval|currval|lastval)\b";

/// Aggregate functions that make a projection scalar.
const AGGREGATES: &[&str] = &[
    "count", "sum", "avg", "min", "max", "stddev", "stddev_pop", "stddev_samp", "variance",
    "var_pop", "var_samp", "percentile_cont", "percentile_disc",
];

/// Set-returning functions; any of them in the select list yields a row set.
const SET_RETURNING_FUNCTIONS: &[&str] = &[
    "generate_series", "generate_subscripts", "unnest", "regexp_matches",
    "regexp_split_to_table", "string_to_table", "ts_stat", "ts_debug", "ts_parse",
    "ts_token_type", "aclexplode",
];

/// Name fragments of the json/jsonb set-returning family
/// (`json_array_elements`, `jsonb_each_text`, `json_to_recordset`, ...).
const JSON_SET_RETURNING_PARTS: &[&str] =
    &["_elements", "_each", "_keys", "recordset", "path_query"];

/// Functions whose argument syntax contains a `FROM` that is not a relation.
const FROM_TAKING_FUNCTIONS: &[&str] = &["extract", "substring", "trim", "overlay", "position"];

/// Words that end a relation reference instead of aliasing it.
const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "group", "order", "limit", "offset", "having", "join", "inner", "left", "right",
    "full", "cross", "natural", "on", "using", "union", "intersect", "except", "window",
    "fetch", "for", "lateral", "and", "or", "when", "then", "else", "end",
];

// ============================================================================
// Types
// ============================================================================

/// SQL text that passed `validate`. Only this module can construct it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeQuery {
    sql: String,
}

impl SafeQuery {
    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

#[cfg(test)]
impl SafeQuery {
    /// Wrap text without validation, for exercising the executor's own limits.
    pub(crate) fn unchecked(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
        }
    }
}

impl fmt::Display for SafeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("query is empty")]
    Empty,

    #[error("forbidden keyword `{0}`")]
    ForbiddenKeyword(String),

    #[error("malformed query: {0}")]
    Malformed(&'static str),

    #[error("more than one statement")]
    MultiStatement,

    #[error("query is not a SELECT")]
    NotReadOnly,

    #[error("query does not produce a single scalar")]
    NotScalar,

    #[error("relation `{0}` is not an analytics table")]
    UnknownRelation(String),
}

impl GuardError {
    /// Stable machine-readable reason, suitable for log fields.
    pub fn reason_code(&self) -> &'static str {
        match self {
            GuardError::Empty => "empty",
            GuardError::ForbiddenKeyword(_) => "forbidden-keyword",
            GuardError::Malformed(_) => "malformed",
            GuardError::MultiStatement => "multi-statement",
            GuardError::NotReadOnly => "not-read-only",
            GuardError::NotScalar => "not-scalar",
            GuardError::UnknownRelation(_) => "unknown-relation",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Bare word, lowercased.
    Word(String),
    /// Double-quoted identifier, case preserved.
    Quoted(String),
    Literal,
    Number,
    Symbol(char),
    Terminator,
}

// ============================================================================
// validate
// ============================================================================

/// Validate candidate SQL, returning a `SafeQuery` or the first rejection.
pub fn validate(sql: &str) -> Result<SafeQuery, GuardError> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(GuardError::Empty);
    }

    check_forbidden(trimmed)?;

    let mut tokens = lex(trimmed)?;

    let terminators = tokens.iter().filter(|t| **t == Token::Terminator).count();
    let mut text = trimmed;
    match terminators {
        0 => {}
        1 if tokens.last() == Some(&Token::Terminator) => {
            tokens.pop();
            text = trimmed.trim_end_matches(';').trim_end();
        }
        _ => return Err(GuardError::MultiStatement),
    }

    if tokens.is_empty() {
        return Err(GuardError::Empty);
    }
    if tokens[0] != Token::Word("select".to_string()) {
        return Err(GuardError::NotReadOnly);
    }

    check_scalar_shape(&tokens)?;
    check_relations(&tokens)?;

    Ok(SafeQuery {
        sql: text.to_string(),
    })
}

fn forbidden_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            let pattern = format!(
                r"(?i)\b(?:{})\b|{}",
                FORBIDDEN_KEYWORDS.join("|"),
                FORBIDDEN_FUNCTIONS
            );
            Regex::new(&pattern).ok()
        })
        .as_ref()
}

fn check_forbidden(sql: &str) -> Result<(), GuardError> {
    let pattern = forbidden_pattern().ok_or(GuardError::Malformed("keyword filter unavailable"))?;
    match pattern.find(sql) {
        Some(m) => Err(GuardError::ForbiddenKeyword(m.as_str().to_lowercase())),
        None => Ok(()),
    }
}

// ============================================================================
// Lexer
// ============================================================================

fn lex(sql: &str) -> Result<Vec<Token>, GuardError> {
    let mut tokens = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '\'' | '"' => {
                if let Some(prev) = sql[..idx].chars().last() {
                    if prev.is_alphanumeric() || prev == '_' || prev == '&' {
                        return Err(GuardError::Malformed("prefixed literal"));
                    }
                }
                let mut content = String::new();
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => {
                            if matches!(chars.peek(), Some((_, next)) if *next == c) {
                                chars.next();
                                content.push(c);
                            } else {
                                break;
                            }
                        }
                        Some((_, other)) => content.push(other),
                        None => return Err(GuardError::Malformed("unterminated literal")),
                    }
                }
                tokens.push(if c == '\'' {
                    Token::Literal
                } else {
                    Token::Quoted(content)
                });
            }
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                return Err(GuardError::Malformed("comment"));
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                return Err(GuardError::Malformed("comment"));
            }
            '$' => return Err(GuardError::Malformed("dollar quoting or parameter")),
            '\\' => return Err(GuardError::Malformed("backslash")),
            ';' => tokens.push(Token::Terminator),
            c if c.is_ascii_digit() => {
                while matches!(chars.peek(), Some((_, n)) if n.is_ascii_alphanumeric() || *n == '.')
                {
                    chars.next();
                }
                tokens.push(Token::Number);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = c.to_lowercase().to_string();
                while let Some((_, n)) = chars.peek() {
                    if n.is_alphanumeric() || *n == '_' {
                        word.extend(n.to_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => tokens.push(Token::Symbol(other)),
        }
    }

    Ok(tokens)
}

// ============================================================================
// Shape checks
// ============================================================================

fn is_word(token: Option<&Token>, word: &str) -> bool {
    matches!(token, Some(Token::Word(w)) if w == word)
}

fn is_set_returning(name: &str) -> bool {
    SET_RETURNING_FUNCTIONS.contains(&name)
        || (name.starts_with("json") && JSON_SET_RETURNING_PARTS.iter().any(|p| name.contains(p)))
}

fn check_scalar_shape(tokens: &[Token]) -> Result<(), GuardError> {
    let mut depth: i32 = 0;
    let mut in_select_list = true;
    let mut has_aggregate = false;

    for (i, token) in tokens.iter().enumerate().skip(1) {
        match token {
            Token::Symbol('(') => depth += 1,
            Token::Symbol(')') => {
                depth -= 1;
                if depth < 0 {
                    return Err(GuardError::Malformed("unbalanced parentheses"));
                }
            }
            Token::Symbol(',') if depth == 0 && in_select_list => {
                return Err(GuardError::NotScalar);
            }
            Token::Word(w) => {
                let is_call = tokens.get(i + 1) == Some(&Token::Symbol('('));
                if in_select_list && is_call {
                    if is_set_returning(w) {
                        return Err(GuardError::NotScalar);
                    }
                    if AGGREGATES.contains(&w.as_str()) {
                        has_aggregate = true;
                    }
                }
                if w == "over" {
                    return Err(GuardError::NotScalar);
                }
                if depth == 0 {
                    match w.as_str() {
                        "from" | "where" | "order" | "limit" | "offset" | "having" => {
                            in_select_list = false
                        }
                        "group" if !is_word(tokens.get(i - 1), "within") => {
                            return Err(GuardError::NotScalar)
                        }
                        "union" | "intersect" | "except" => return Err(GuardError::NotScalar),
                        "for" => return Err(GuardError::NotReadOnly),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(GuardError::Malformed("unbalanced parentheses"));
    }
    if !has_aggregate {
        return Err(GuardError::NotScalar);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Opener<'a> {
    Relation,
    Call(&'a str),
    Group,
}

fn check_relations(tokens: &[Token]) -> Result<(), GuardError> {
    let mut openers: Vec<Opener> = Vec::new();
    let mut relation_paren: Option<usize> = None;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Symbol('(') => {
                let opener = if relation_paren == Some(i) {
                    Opener::Relation
                } else {
                    match i.checked_sub(1).map(|p| &tokens[p]) {
                        Some(Token::Word(w)) => Opener::Call(w.as_str()),
                        _ => Opener::Group,
                    }
                };
                openers.push(opener);
            }
            Token::Symbol(')') => {
                if openers.pop() == Some(Opener::Relation) {
                    i = after_relation(tokens, i + 1)?;
                    relation_paren = subquery_start(tokens, i);
                    continue;
                }
            }
            Token::Word(w) if w == "from" || w == "join" => {
                let in_call = matches!(
                    openers.last(),
                    Some(Opener::Call(f)) if FROM_TAKING_FUNCTIONS.contains(f)
                );
                let distinct_from = is_word(i.checked_sub(1).and_then(|p| tokens.get(p)), "distinct");
                if w == "join" || !(in_call || distinct_from) {
                    i = expect_relations(tokens, i + 1)?;
                    relation_paren = subquery_start(tokens, i);
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    Ok(())
}

fn subquery_start(tokens: &[Token], i: usize) -> Option<usize> {
    (tokens.get(i) == Some(&Token::Symbol('('))).then_some(i)
}

fn identifier(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) => Some(w.clone()),
        Token::Quoted(q) => Some(q.clone()),
        _ => None,
    }
}

/// Consume a comma-separated relation list starting at `i`. Returns the index
/// of the first token after the list, or of the `(` opening a subquery.
fn expect_relations(tokens: &[Token], mut i: usize) -> Result<usize, GuardError> {
    if is_word(tokens.get(i), "lateral") {
        i += 1;
    }
    match tokens.get(i) {
        Some(Token::Symbol('(')) => Ok(i),
        Some(token) => {
            let mut name =
                identifier(token).ok_or(GuardError::Malformed("missing relation after FROM/JOIN"))?;
            i += 1;
            if name == "public" && tokens.get(i) == Some(&Token::Symbol('.')) {
                name = tokens
                    .get(i + 1)
                    .and_then(identifier)
                    .ok_or(GuardError::Malformed("dangling schema qualifier"))?;
                i += 2;
            }
            if !ANALYTICS_TABLES.contains(&name.as_str()) {
                return Err(GuardError::UnknownRelation(name));
            }
            // `videos.x` names a relation in schema `videos`, not the table
            if tokens.get(i) == Some(&Token::Symbol('.')) {
                let member = tokens.get(i + 1).and_then(identifier).unwrap_or_default();
                return Err(GuardError::UnknownRelation(format!("{}.{}", name, member)));
            }
            after_relation(tokens, i)
        }
        None => Err(GuardError::Malformed("missing relation after FROM/JOIN")),
    }
}

/// Skip an optional alias; when a `,` follows, continue with the next
/// relation of the list.
fn after_relation(tokens: &[Token], mut i: usize) -> Result<usize, GuardError> {
    match tokens.get(i) {
        Some(Token::Word(w)) if w == "as" => i += 2,
        Some(Token::Word(w)) if !CLAUSE_KEYWORDS.contains(&w.as_str()) => i += 1,
        Some(Token::Quoted(_)) => i += 1,
        _ => {}
    }
    if tokens.get(i) == Some(&Token::Symbol(',')) {
        return expect_relations(tokens, i + 1);
    }
    Ok(i)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(sql: &str) -> SafeQuery {
        match validate(sql) {
            Ok(q) => q,
            Err(e) => panic!("expected `{}` to be accepted, got {:?}", sql, e),
        }
    }

    fn rejects(sql: &str) -> GuardError {
        match validate(sql) {
            Ok(q) => panic!("expected `{}` to be rejected, got {:?}", sql, q),
            Err(e) => e,
        }
    }

    #[test]
    fn test_accepts_total_video_count() {
        let q = accepts("select count(*) from videos");
        assert_eq!(q.as_str(), "select count(*) from videos");
    }

    #[test]
    fn test_accepts_business_rule_queries() {
        accepts(
            "SELECT COUNT(*) FROM videos WHERE date(video_created_at) BETWEEN '2025-11-01' AND '2025-11-05'",
        );
        accepts("select sum(delta_views_count) from video_snapshots where date(created_at) = '2025-11-28'");
        accepts(
            "select count(distinct video_id) from video_snapshots where delta_views_count > 0 and date(created_at) = '2025-11-27'",
        );
        accepts("select count(*) from videos where views_count > 100000");
        accepts("select coalesce(sum(likes_count), 0) from videos where creator_id = 'aca1061a9d324ecf8c3fa2bb32d7be63'");
        accepts("select round(avg(views_count)::numeric, 2) from videos");
    }

    #[test]
    fn test_trailing_terminator_is_dropped() {
        let q = accepts("select count(*) from videos ;  ");
        assert_eq!(q.as_str(), "select count(*) from videos");
    }

    #[test]
    fn test_terminator_inside_literal_is_not_a_separator() {
        accepts("select count(*) from videos where creator_id = 'a;b'");
    }

    #[test]
    fn test_accepts_joins_aliases_and_subqueries() {
        accepts(
            "select sum(s.delta_likes_count) from video_snapshots s join videos v on v.id = s.video_id where v.creator_id = 'x'",
        );
        accepts("select count(*) from public.videos as v");
        accepts("select (select count(*) from videos) - (select count(distinct video_id) from video_snapshots)");
        accepts("select max(t.c) from (select count(*) as c from video_snapshots) t");
        accepts("select count(*) from videos v, video_snapshots s where v.id = s.video_id");
        accepts("select count(*) from videos where extract(hour from video_created_at) = 10");
        accepts("select count(*) from videos where creator_id is distinct from 'x'");
        accepts("select percentile_cont(0.5) within group (order by views_count) from videos");
    }

    #[test]
    fn test_mutation_column_names_are_not_keywords() {
        accepts("select count(*) from videos where updated_at > '2025-01-01' and created_at < '2025-12-31'");
        accepts("select sum(comments_count) from videos");
        accepts("select count(*) from videos offset 0");
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(rejects(""), GuardError::Empty);
        assert_eq!(rejects("  \n\t "), GuardError::Empty);
        assert_eq!(rejects(" ; "), GuardError::Empty);
    }

    #[test]
    fn test_rejects_every_forbidden_keyword_in_any_case() {
        for keyword in FORBIDDEN_KEYWORDS {
            let variants = [
                keyword.to_string(),
                keyword.to_uppercase(),
                keyword
                    .chars()
                    .enumerate()
                    .map(|(i, c)| if i % 2 == 0 { c.to_ascii_uppercase() } else { c })
                    .collect::<String>(),
            ];
            for variant in variants {
                let sql = format!("select count(*) from videos where {} is null", variant);
                match validate(&sql) {
                    Err(GuardError::ForbiddenKeyword(found)) => assert_eq!(found, *keyword),
                    other => panic!("`{}` should be a forbidden keyword, got {:?}", sql, other),
                }
            }
        }
    }

    #[test]
    fn test_rejects_delete_after_valid_query() {
        let err = rejects("select count(*) from videos; DELETE FROM videos");
        assert_eq!(err, GuardError::ForbiddenKeyword("delete".to_string()));
        assert_eq!(err.reason_code(), "forbidden-keyword");
    }

    #[test]
    fn test_rejects_keyword_hidden_in_literal() {
        assert_eq!(
            rejects("select count(*) from videos where creator_id = 'drop'"),
            GuardError::ForbiddenKeyword("drop".to_string())
        );
    }

    #[test]
    fn test_rejects_select_into_and_side_effect_functions() {
        assert_eq!(
            rejects("select count(*) into backup from videos"),
            GuardError::ForbiddenKeyword("into".to_string())
        );
        assert_eq!(
            rejects("select count(*) from videos where pg_sleep(10) is not null"),
            GuardError::ForbiddenKeyword("pg_sleep".to_string())
        );
        assert_eq!(
            rejects("select max(length(current_setting('is_superuser'))) from videos"),
            GuardError::ForbiddenKeyword("current_setting".to_string())
        );
    }

    #[test]
    fn test_rejects_two_valid_statements() {
        let err = rejects("select count(*) from videos; select sum(views_count) from videos");
        assert_eq!(err, GuardError::MultiStatement);
        assert_eq!(err.reason_code(), "multi-statement");
        assert_eq!(
            rejects("select count(*) from videos;;"),
            GuardError::MultiStatement
        );
    }

    #[test]
    fn test_rejects_non_select_roots() {
        for sql in [
            "with t as (select count(*) c from videos) select max(c) from t",
            "explain select count(*) from videos",
            "values (1)",
            "(select count(*) from videos)",
        ] {
            assert_eq!(rejects(sql), GuardError::NotReadOnly, "{}", sql);
        }
        assert_eq!(
            rejects("select count(*) from videos for share"),
            GuardError::NotReadOnly
        );
    }

    #[test]
    fn test_rejects_row_sets() {
        for sql in [
            "select * from videos",
            "select id, views_count from videos",
            "select count(*), sum(views_count) from videos",
            "select views_count from videos where id = '7f1e'",
            "select creator_id, count(*) from videos group by creator_id",
            "select count(*) from videos group by creator_id",
            "select count(*) from videos union select count(*) from video_snapshots",
            "select count(*) over () from videos",
            "select 1",
            "select generate_series(1, count(*)) from videos",
            "select unnest(array[count(*), sum(views_count)]) from videos",
            "select count(*) + 0 * generate_series(1, 2) from videos",
            "select json_array_elements(json_build_array(count(*), 1)) from videos",
            "select jsonb_each_text(jsonb_build_object('n', count(*))) from videos",
            "select regexp_matches(max(creator_id), '.', 'g') from videos",
            "select string_to_table(max(creator_id), 'a') from videos",
            "select (select unnest(array[1, 2])) + count(*) from videos",
        ] {
            let err = rejects(sql);
            assert_eq!(err, GuardError::NotScalar, "{}", sql);
            assert_eq!(err.reason_code(), "not-scalar");
        }
    }

    #[test]
    fn test_rejects_unknown_relations() {
        assert_eq!(
            rejects("select count(*) from users"),
            GuardError::UnknownRelation("users".to_string())
        );
        assert_eq!(
            rejects("select count(*) from information_schema.tables"),
            GuardError::UnknownRelation("information_schema".to_string())
        );
        assert_eq!(
            rejects("select count(*) from videos v, accounts a"),
            GuardError::UnknownRelation("accounts".to_string())
        );
        assert_eq!(
            rejects("select count(*) from (select 1 from videos) s, secrets"),
            GuardError::UnknownRelation("secrets".to_string())
        );
        assert_eq!(
            rejects("select count(*) from videos join \"Videos\" x on true"),
            GuardError::UnknownRelation("Videos".to_string())
        );
        assert_eq!(
            rejects("select count(*) from generate_series(1, 10)"),
            GuardError::UnknownRelation("generate_series".to_string())
        );
        assert_eq!(
            rejects("select count(*) from videos.secrets"),
            GuardError::UnknownRelation("videos.secrets".to_string())
        );
        assert_eq!(
            rejects("select count(*) from public.videos.secrets"),
            GuardError::UnknownRelation("videos.secrets".to_string())
        );
        assert_eq!(
            rejects("select count(*) from videos v join video_snapshots.\"x\" s on true"),
            GuardError::UnknownRelation("video_snapshots.x".to_string())
        );
    }

    #[test]
    fn test_rejects_relations_reached_without_from() {
        assert_eq!(
            rejects("select count(*) from videos where views_count > (table secrets)"),
            GuardError::ForbiddenKeyword("table".to_string())
        );
        assert_eq!(rejects("table videos"), GuardError::ForbiddenKeyword("table".to_string()));

        for (sql, function) in [
            (
                "select max(length(query_to_xml('select * from secrets', true, true, '')::text)) from videos",
                "query_to_xml",
            ),
            (
                "select max(length(table_to_xml('secrets', true, false, '')::text)) from videos",
                "table_to_xml",
            ),
            (
                "select max(length(cursor_to_xml('c', 10, false, true, '')::text)) from videos",
                "cursor_to_xml",
            ),
            (
                "select max(length(schema_to_xml('public', true, false, '')::text)) from videos",
                "schema_to_xml",
            ),
            (
                "select max(length(database_to_xml(true, false, '')::text)) from videos",
                "database_to_xml",
            ),
            (
                "select max(length(QUERY_TO_XML_AND_XMLSCHEMA('x', true, true, '')::text)) from videos",
                "query_to_xml_and_xmlschema",
            ),
            ("select count(*) + nextval('s') from videos", "nextval"),
        ] {
            match validate(sql) {
                Err(GuardError::ForbiddenKeyword(found)) => assert_eq!(found, function, "{}", sql),
                other => panic!("`{}` should be rejected, got {:?}", sql, other),
            }
        }
    }

    #[test]
    fn test_keyword_filter_compiles() {
        assert!(forbidden_pattern().is_some());
        assert!(forbidden_pattern()
            .map(|p| p.is_match("select TABLE_TO_XML('x')"))
            .unwrap_or(false));
    }

    #[test]
    fn test_rejects_malformed_input() {
        for sql in [
            "select count(*) from videos -- trailing",
            "select count(*) /* hidden */ from videos",
            "select count(*) from videos where creator_id = $$x$$",
            "select count(*) from videos where creator_id = E'x'",
            "select count(*) from videos where creator_id = 'open",
            "select count(*) from videos where creator_id = x\\y",
            "select count(*) from videos where (views_count > 1",
            "select count(*) from",
        ] {
            let err = rejects(sql);
            assert!(
                matches!(err, GuardError::Malformed(_)),
                "{} should be malformed, got {:?}",
                sql,
                err
            );
            assert_eq!(err.reason_code(), "malformed");
        }
    }

    #[test]
    fn test_validation_is_deterministic() {
        let sql = "select count(*) from videos where views_count > 10";
        assert_eq!(validate(sql), validate(sql));
        assert_eq!(validate("drop table videos"), validate("drop table videos"));
    }
}
