//! SQL Parser
//!
//! Recursive descent over the token stream, producing one [`Statement`] per
//! call. The parser knows nothing about the catalog; resolution happens in
//! the validator and executor.

use super::ast::*;
use super::token::{Keyword, Token, TokenKind};
use crate::catalog::{ColumnDef, DataType};
use crate::error::{Error, Result};

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a parser over a token stream. The stream must end with an
    /// `Eof` token, which the lexer guarantees.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse exactly one statement.
    ///
    /// A single trailing semicolon is consumed silently; anything else left
    /// over is an error.
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }

        if !self.is_at_end() {
            self.reject_reserved()?;
            return Err(self.unexpected("end of statement"));
        }

        Ok(stmt)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        self.reject_reserved()?;

        match self.kind() {
            TokenKind::Keyword(Keyword::Select) => self.parse_query().map(Statement::Query),
            TokenKind::Keyword(Keyword::Create) => {
                self.parse_create_table().map(Statement::CreateTable)
            }
            TokenKind::Keyword(Keyword::Alter) => {
                self.parse_alter_table().map(Statement::AlterTable)
            }
            TokenKind::Keyword(Keyword::Drop) => self.parse_drop_table().map(Statement::DropTable),
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert().map(Statement::Insert),
            TokenKind::Keyword(Keyword::Update) => self.parse_update().map(Statement::Update),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete().map(Statement::Delete),
            _ => Err(self.unexpected(
                "a statement starting with SELECT, CREATE, ALTER, DROP, INSERT, UPDATE or DELETE",
            )),
        }
    }

    // ========== SELECT ==========

    fn parse_query(&mut self) -> Result<Query> {
        self.expect_keyword(Keyword::Select)?;

        let distinct = self.eat_keyword(Keyword::Distinct);
        let select = self.parse_select_list()?;

        self.reject_reserved()?;
        self.expect_keyword(Keyword::From)?;
        let from = self.expect_ident()?;

        self.reject_reserved()?;
        let join = self.parse_join()?;

        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_predicate()?)
        } else {
            None
        };

        self.reject_reserved()?;
        let group_by = if self.eat_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            self.parse_column_ref_list()?
        } else {
            Vec::new()
        };

        self.reject_reserved()?;
        let order_by = if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            let column = self.parse_column_ref()?;
            let descending = if self.eat_keyword(Keyword::Desc) {
                true
            } else {
                self.eat_keyword(Keyword::Asc);
                false
            };
            Some(OrderBy { column, descending })
        } else {
            None
        };

        let limit = if self.eat_keyword(Keyword::Limit) {
            Some(self.parse_limit_count()?)
        } else {
            None
        };

        Ok(Query {
            distinct,
            select,
            from,
            join,
            where_clause,
            group_by,
            order_by,
            limit,
        })
    }

    fn parse_select_list(&mut self) -> Result<SelectList> {
        if self.check(&TokenKind::Star) {
            self.advance();
            return Ok(SelectList::Star);
        }

        let mut items = Vec::new();
        loop {
            items.push(self.parse_select_item()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(SelectList::Items(items))
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        let is_aggregate = matches!(self.kind(), TokenKind::Keyword(kw) if kw.is_aggregate());
        let expr = if is_aggregate {
            SelectExpr::Aggregate(self.parse_aggregate()?)
        } else {
            SelectExpr::Column(self.parse_column_ref()?)
        };

        let alias = self.parse_optional_alias()?;

        Ok(SelectItem { expr, alias })
    }

    /// The alias-without-AS lookahead: a bare identifier after an item is
    /// an alias only when the token after it is a comma, end of input, or a
    /// clause keyword. Anything else means the identifier belongs to
    /// whatever comes next and parsing continues without an alias.
    fn parse_optional_alias(&mut self) -> Result<Option<String>> {
        if self.eat_keyword(Keyword::As) {
            return Ok(Some(self.expect_ident()?.name));
        }

        if let TokenKind::Ident(name) = self.kind() {
            let is_alias = match self.peek_kind() {
                TokenKind::Comma | TokenKind::Semicolon | TokenKind::Eof => true,
                TokenKind::Keyword(kw) => kw.starts_clause(),
                _ => false,
            };
            if is_alias {
                let name = name.clone();
                self.advance();
                return Ok(Some(name));
            }
        }

        Ok(None)
    }

    fn parse_aggregate(&mut self) -> Result<Aggregate> {
        let func = match self.kind() {
            TokenKind::Keyword(Keyword::Count) => AggregateFunc::Count,
            TokenKind::Keyword(Keyword::Sum) => AggregateFunc::Sum,
            TokenKind::Keyword(Keyword::Avg) => AggregateFunc::Avg,
            TokenKind::Keyword(Keyword::Min) => AggregateFunc::Min,
            TokenKind::Keyword(Keyword::Max) => AggregateFunc::Max,
            _ => return Err(self.unexpected("an aggregate function")),
        };
        self.advance();

        self.expect(&TokenKind::LParen)?;

        let arg = if self.check(&TokenKind::Star) {
            if func != AggregateFunc::Count {
                return Err(Error::syntax(
                    format!("* is only valid inside COUNT, not {}", func),
                    self.offset(),
                ));
            }
            self.advance();
            AggregateArg::Star
        } else {
            AggregateArg::Column(self.parse_column_ref()?)
        };

        self.expect(&TokenKind::RParen)?;

        Ok(Aggregate { func, arg })
    }

    fn parse_join(&mut self) -> Result<Option<Join>> {
        let has_join = if self.eat_keyword(Keyword::Inner) {
            self.expect_keyword(Keyword::Join)?;
            true
        } else {
            self.eat_keyword(Keyword::Join)
        };

        if !has_join {
            return Ok(None);
        }

        let table = self.expect_ident()?;
        self.expect_keyword(Keyword::On)?;
        let left = self.parse_column_ref()?;
        self.expect(&TokenKind::Eq)?;
        let right = self.parse_column_ref()?;

        Ok(Some(Join { table, left, right }))
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        let mut comparisons = vec![self.parse_comparison()?];

        while self.eat_keyword(Keyword::And) {
            comparisons.push(self.parse_comparison()?);
        }

        Ok(Predicate { comparisons })
    }

    fn parse_comparison(&mut self) -> Result<Comparison> {
        let left = self.parse_operand()?;

        let op = match self.kind() {
            TokenKind::Eq => Some(CompareOp::Eq),
            TokenKind::Neq => Some(CompareOp::Neq),
            TokenKind::Lt => Some(CompareOp::Lt),
            TokenKind::Lte => Some(CompareOp::Lte),
            TokenKind::Gt => Some(CompareOp::Gt),
            TokenKind::Gte => Some(CompareOp::Gte),
            TokenKind::Keyword(Keyword::Like) => Some(CompareOp::Like),
            _ => None,
        };

        let Some(op) = op else {
            self.reject_reserved()?;
            // A bare boolean literal is a valid comparison on its own.
            if let Operand::Literal(Literal::Boolean(_)) = left {
                return Ok(Comparison {
                    left,
                    op: CompareOp::Eq,
                    right: Operand::Literal(Literal::Boolean(true)),
                });
            }
            return Err(self.unexpected("a comparison operator"));
        };
        self.advance();

        let right = self.parse_operand()?;

        Ok(Comparison { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        self.reject_reserved()?;

        let operand = match self.kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Operand::Literal(Literal::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Operand::Literal(Literal::String(s))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Operand::Literal(Literal::Boolean(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Operand::Literal(Literal::Boolean(false))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Operand::Literal(Literal::Null)
            }
            TokenKind::Ident(_) => Operand::Column(self.parse_column_ref()?),
            _ => return Err(self.unexpected("a column, number, string, TRUE, FALSE or NULL")),
        };

        Ok(operand)
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.expect_ident()?;

        if self.eat(&TokenKind::Dot) {
            let column = self.expect_ident()?;
            Ok(ColumnRef {
                table: Some(first.name),
                column: column.name,
                offset: first.offset,
                resolved: None,
            })
        } else {
            Ok(ColumnRef {
                table: None,
                column: first.name,
                offset: first.offset,
                resolved: None,
            })
        }
    }

    fn parse_column_ref_list(&mut self) -> Result<Vec<ColumnRef>> {
        let mut refs = Vec::new();
        loop {
            refs.push(self.parse_column_ref()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(refs)
    }

    fn parse_limit_count(&mut self) -> Result<usize> {
        let offset = self.offset();
        match self.kind() {
            TokenKind::Number(n) if n.fract() == 0.0 => {
                let count = *n as usize;
                self.advance();
                Ok(count)
            }
            TokenKind::Number(_) => Err(Error::syntax(
                "LIMIT must be a non-negative integer",
                offset,
            )),
            _ => Err(self.unexpected("a row count after LIMIT")),
        }
    }

    // ========== CREATE TABLE ==========

    fn parse_create_table(&mut self) -> Result<CreateTable> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Table)?;

        let name = self.expect_ident()?;

        self.expect(&TokenKind::LParen)?;

        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut primary_key: Option<String> = None;

        loop {
            let offset = self.offset();
            let column = self.parse_column_def()?;

            if column.primary_key {
                if primary_key.is_some() {
                    return Err(Error::syntax(
                        "multiple primary keys are not supported",
                        offset,
                    ));
                }
                primary_key = Some(column.name.clone());
            }
            columns.push(column);

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RParen)?;

        Ok(CreateTable {
            name,
            columns,
            primary_key,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_ident()?;
        let (data_type, size) = self.parse_type_spec()?;

        let mut not_null = false;
        let mut primary_key = false;
        let mut auto_increment = false;

        loop {
            if self.at_keyword(Keyword::Primary) {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                primary_key = true;
            } else if self.at_keyword(Keyword::AutoIncrement) {
                if data_type != DataType::Number {
                    return Err(Error::syntax(
                        "AUTO_INCREMENT is only valid on numeric columns",
                        self.offset(),
                    ));
                }
                self.advance();
                auto_increment = true;
            } else if self.at_keyword(Keyword::Not) {
                self.advance();
                self.expect_keyword(Keyword::Null)?;
                not_null = true;
            } else if self.at_keyword(Keyword::Null) {
                // Explicitly nullable, which is the default anyway.
                self.advance();
            } else {
                break;
            }
        }

        let mut column = ColumnDef::new(name.name, data_type)
            .not_null(not_null)
            .primary_key(primary_key)
            .auto_increment(auto_increment);
        column.size = size;

        Ok(column)
    }

    /// Parse a type name plus its optional `(size)`, normalising the many
    /// accepted synonyms down to the three data types.
    fn parse_type_spec(&mut self) -> Result<(DataType, Option<u32>)> {
        let data_type = match self.kind() {
            TokenKind::Keyword(
                Keyword::Int
                | Keyword::Integer
                | Keyword::Number
                | Keyword::Decimal
                | Keyword::Float
                | Keyword::Numeric
                | Keyword::Real
                | Keyword::Double,
            ) => DataType::Number,
            TokenKind::Keyword(
                Keyword::Varchar | Keyword::Char | Keyword::Text | Keyword::Str,
            ) => DataType::String,
            TokenKind::Keyword(Keyword::Boolean | Keyword::Bool) => DataType::Boolean,
            TokenKind::Ident(name) => {
                return Err(Error::syntax(
                    format!("unknown type '{}'", name),
                    self.offset(),
                ));
            }
            _ => return Err(self.unexpected("a type name such as INT, VARCHAR or BOOLEAN")),
        };
        self.advance();

        let size = if self.eat(&TokenKind::LParen) {
            let offset = self.offset();
            let size = match self.kind() {
                TokenKind::Number(n) if n.fract() == 0.0 && *n >= 1.0 => *n as u32,
                _ => {
                    return Err(Error::InvalidLiteral {
                        message: "type size must be a positive integer".to_string(),
                        offset: Some(offset),
                    });
                }
            };
            self.advance();
            self.expect(&TokenKind::RParen)?;
            Some(size)
        } else {
            None
        };

        Ok((data_type, size))
    }

    // ========== ALTER / DROP ==========

    fn parse_alter_table(&mut self) -> Result<AlterTable> {
        self.expect_keyword(Keyword::Alter)?;
        self.expect_keyword(Keyword::Table)?;

        let name = self.expect_ident()?;

        self.expect_keyword(Keyword::Add)?;
        self.eat_keyword(Keyword::Column); // COLUMN is optional noise

        let add_column = self.parse_column_def()?;

        Ok(AlterTable { name, add_column })
    }

    fn parse_drop_table(&mut self) -> Result<DropTable> {
        self.expect_keyword(Keyword::Drop)?;
        self.expect_keyword(Keyword::Table)?;
        let name = self.expect_ident()?;
        Ok(DropTable { name })
    }

    // ========== INSERT / UPDATE / DELETE ==========

    fn parse_insert(&mut self) -> Result<Insert> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;

        let table = self.expect_ident()?;

        self.expect(&TokenKind::LParen)?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.expect_ident()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;

        self.expect_keyword(Keyword::Values)?;

        let mut rows = Vec::new();
        loop {
            self.expect(&TokenKind::LParen)?;
            let mut values = Vec::new();
            loop {
                values.push(self.parse_literal()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
            rows.push(values);

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(Insert {
            table,
            columns,
            rows,
        })
    }

    fn parse_update(&mut self) -> Result<Update> {
        self.expect_keyword(Keyword::Update)?;

        let table = self.expect_ident()?;

        self.expect_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_ident()?;
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_literal()?;
            assignments.push(Assignment { column, value });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_predicate()?)
        } else {
            None
        };

        Ok(Update {
            table,
            assignments,
            where_clause,
        })
    }

    fn parse_delete(&mut self) -> Result<Delete> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;

        let table = self.expect_ident()?;

        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_predicate()?)
        } else {
            None
        };

        Ok(Delete {
            table,
            where_clause,
        })
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        self.reject_reserved()?;

        let literal = match self.kind().clone() {
            TokenKind::Number(n) => Literal::Number(n),
            TokenKind::String(s) => Literal::String(s),
            TokenKind::Keyword(Keyword::True) => Literal::Boolean(true),
            TokenKind::Keyword(Keyword::False) => Literal::Boolean(false),
            TokenKind::Keyword(Keyword::Null) => Literal::Null,
            _ => return Err(self.unexpected("a literal value")),
        };
        self.advance();

        Ok(literal)
    }

    // ========== Helpers ==========

    fn current(&self) -> &Token {
        // The stream always ends with Eof, so this index is in range.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> &TokenKind {
        let index = (self.position + 1).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn offset(&self) -> usize {
        self.current().offset
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", kind)))
        }
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.kind(), TokenKind::Keyword(kw) if *kw == keyword)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&keyword.to_string()))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident> {
        self.reject_reserved()?;
        match self.kind().clone() {
            TokenKind::Ident(name) => {
                let offset = self.offset();
                self.advance();
                Ok(Ident { name, offset })
            }
            TokenKind::Keyword(kw) => Err(Error::syntax(
                format!("'{}' is a keyword and cannot be used as a name", kw),
                self.offset(),
            )),
            _ => Err(self.unexpected("a name")),
        }
    }

    /// Reserved keywords are recognised purely so they can be rejected with
    /// a clear message and position instead of a generic syntax error.
    fn reject_reserved(&self) -> Result<()> {
        if let TokenKind::Keyword(kw) = self.kind() {
            if kw.is_reserved() {
                return Err(Error::Unsupported {
                    feature: kw.to_string(),
                    offset: Some(self.offset()),
                });
            }
        }
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::syntax(
            format!("expected {}, found '{}'", expected, self.kind()),
            self.offset(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::lexer::Lexer;

    fn parse(sql: &str) -> Result<Statement> {
        let tokens = Lexer::new(sql).tokenize()?;
        Parser::new(tokens).parse()
    }

    fn parse_query(sql: &str) -> Query {
        match parse(sql).unwrap() {
            Statement::Query(q) => q,
            other => panic!("expected a query, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_select_star() {
        let query = parse_query("SELECT * FROM students");
        assert!(!query.distinct);
        assert_eq!(query.select, SelectList::Star);
        assert_eq!(query.from.name, "students");
        assert!(query.join.is_none());
        assert!(query.where_clause.is_none());
    }

    #[test]
    fn test_parse_select_columns_without_alias() {
        // The alias lookahead must not swallow FROM here.
        let query = parse_query("SELECT forename, surname FROM students");
        let SelectList::Items(items) = query.select else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].alias, None);
        assert!(
            matches!(&items[0].expr, SelectExpr::Column(c) if c.column == "forename")
        );
    }

    #[test]
    fn test_parse_aliases() {
        let query = parse_query("SELECT forename AS name, surname family FROM students");
        let SelectList::Items(items) = query.select else {
            panic!("expected items");
        };
        assert_eq!(items[0].alias.as_deref(), Some("name"));
        assert_eq!(items[1].alias.as_deref(), Some("family"));
    }

    #[test]
    fn test_bare_ident_not_an_alias_when_followed_by_junk() {
        // "surname extra FROM" leaves `extra` dangling: the token after it
        // is another identifier, so it is not an alias and parsing fails.
        assert!(parse("SELECT surname extra junk FROM students").is_err());
    }

    #[test]
    fn test_parse_aggregates() {
        let query = parse_query("SELECT COUNT(*), AVG(score) average FROM grades");
        let SelectList::Items(items) = query.select else {
            panic!("expected items");
        };
        assert!(matches!(
            &items[0].expr,
            SelectExpr::Aggregate(Aggregate {
                func: AggregateFunc::Count,
                arg: AggregateArg::Star,
            })
        ));
        assert_eq!(items[1].alias.as_deref(), Some("average"));
    }

    #[test]
    fn test_star_only_inside_count() {
        let err = parse("SELECT SUM(*) FROM grades").unwrap_err();
        assert!(err.to_string().contains("only valid inside COUNT"));
    }

    #[test]
    fn test_parse_join() {
        let query = parse_query(
            "SELECT * FROM students INNER JOIN tutor_groups \
             ON students.tutor_group_id = tutor_groups.tutor_group_id",
        );
        let join = query.join.unwrap();
        assert_eq!(join.table.name, "tutor_groups");
        assert_eq!(join.left.table.as_deref(), Some("students"));
        assert_eq!(join.right.column, "tutor_group_id");
    }

    #[test]
    fn test_join_without_inner() {
        let query = parse_query("SELECT * FROM a JOIN b ON a.x = b.x");
        assert!(query.join.is_some());
    }

    #[test]
    fn test_parse_where_group_order_limit() {
        let query = parse_query(
            "SELECT tutor_group_id, COUNT(*) FROM students \
             WHERE surname != 'Smith' AND tutor_group_id > 1 \
             GROUP BY tutor_group_id ORDER BY tutor_group_id DESC LIMIT 5",
        );
        assert_eq!(query.where_clause.unwrap().comparisons.len(), 2);
        assert_eq!(query.group_by.len(), 1);
        let order_by = query.order_by.unwrap();
        assert!(order_by.descending);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_bare_boolean_predicate() {
        let query = parse_query("SELECT * FROM students WHERE TRUE");
        let pred = query.where_clause.unwrap();
        assert_eq!(
            pred.comparisons[0],
            Comparison {
                left: Operand::Literal(Literal::Boolean(true)),
                op: CompareOp::Eq,
                right: Operand::Literal(Literal::Boolean(true)),
            }
        );
    }

    #[test]
    fn test_limit_must_be_integer() {
        let err = parse("SELECT * FROM students LIMIT 2.5").unwrap_err();
        assert!(err.to_string().contains("non-negative integer"));
    }

    #[test]
    fn test_reserved_keywords_unsupported() {
        let err = parse("SELECT * FROM students WHERE a = 1 OR b = 2").unwrap_err();
        assert!(matches!(err, Error::Unsupported { ref feature, .. } if feature == "OR"));

        let err = parse("SELECT * FROM a LEFT JOIN b ON a.x = b.x").unwrap_err();
        assert!(matches!(err, Error::Unsupported { ref feature, .. } if feature == "LEFT"));

        let err = parse("SELECT * FROM g GROUP BY x HAVING COUNT(*) > 1").unwrap_err();
        assert!(matches!(err, Error::Unsupported { ref feature, .. } if feature == "HAVING"));

        let err = parse("SELECT * FROM s WHERE x IN (1, 2)").unwrap_err();
        assert!(matches!(err, Error::Unsupported { ref feature, .. } if feature == "IN"));
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse(
            "CREATE TABLE statuses (
                id INT AUTO_INCREMENT PRIMARY KEY,
                label VARCHAR(20) NOT NULL,
                active BOOLEAN
            )",
        )
        .unwrap();

        let Statement::CreateTable(create) = stmt else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.name.name, "statuses");
        assert_eq!(create.primary_key.as_deref(), Some("id"));
        assert_eq!(create.columns.len(), 3);

        let id = &create.columns[0];
        assert_eq!(id.data_type, DataType::Number);
        assert!(id.auto_increment && id.primary_key && id.not_null);

        let label = &create.columns[1];
        assert_eq!(label.data_type, DataType::String);
        assert_eq!(label.size, Some(20));
        assert!(label.not_null && !label.primary_key);

        assert_eq!(create.columns[2].data_type, DataType::Boolean);
    }

    #[test]
    fn test_type_synonyms_normalise() {
        let stmt = parse(
            "CREATE TABLE t (a DECIMAL, b REAL, c DOUBLE, d NUMBER, e TEXT, f CHAR(1), g BOOL)",
        )
        .unwrap();
        let Statement::CreateTable(create) = stmt else {
            panic!("expected CREATE TABLE");
        };
        let types: Vec<DataType> = create.columns.iter().map(|c| c.data_type).collect();
        assert_eq!(
            types,
            vec![
                DataType::Number,
                DataType::Number,
                DataType::Number,
                DataType::Number,
                DataType::String,
                DataType::String,
                DataType::Boolean,
            ]
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = parse("CREATE TABLE t (a BLOB)").unwrap_err();
        assert!(err.to_string().contains("unknown type 'BLOB'"));
    }

    #[test]
    fn test_multiple_primary_keys_rejected() {
        let err = parse("CREATE TABLE t (a INT PRIMARY KEY, b INT PRIMARY KEY)").unwrap_err();
        assert!(err.to_string().contains("multiple primary keys"));
    }

    #[test]
    fn test_auto_increment_needs_number() {
        let err = parse("CREATE TABLE t (a TEXT AUTO_INCREMENT)").unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn test_parse_alter_table() {
        let stmt = parse("ALTER TABLE notes ADD COLUMN body TEXT").unwrap();
        let Statement::AlterTable(alter) = stmt else {
            panic!("expected ALTER TABLE");
        };
        assert_eq!(alter.name.name, "notes");
        assert_eq!(alter.add_column.name, "body");

        // COLUMN is optional
        assert!(parse("ALTER TABLE notes ADD body TEXT").is_ok());
    }

    #[test]
    fn test_parse_insert() {
        let stmt = parse(
            "INSERT INTO notes (id, body) VALUES (1, 'first'), (2, NULL)",
        )
        .unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("expected INSERT");
        };
        assert_eq!(insert.table.name, "notes");
        assert_eq!(insert.columns.len(), 2);
        assert_eq!(insert.rows.len(), 2);
        assert_eq!(insert.rows[1][1], Literal::Null);
    }

    #[test]
    fn test_parse_update() {
        let stmt = parse("UPDATE notes SET body = 'edited', done = TRUE WHERE id = 1").unwrap();
        let Statement::Update(update) = stmt else {
            panic!("expected UPDATE");
        };
        assert_eq!(update.assignments.len(), 2);
        assert_eq!(update.assignments[1].value, Literal::Boolean(true));
        assert!(update.where_clause.is_some());
    }

    #[test]
    fn test_parse_delete() {
        let stmt = parse("DELETE FROM notes WHERE id = 1;").unwrap();
        let Statement::Delete(delete) = stmt else {
            panic!("expected DELETE");
        };
        assert_eq!(delete.table.name, "notes");
        assert!(delete.where_clause.is_some());

        let stmt = parse("DELETE FROM notes").unwrap();
        let Statement::Delete(delete) = stmt else {
            panic!("expected DELETE");
        };
        assert!(delete.where_clause.is_none());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse("SELECT * FROM students;").is_ok());
        assert!(parse("SELECT * FROM students; SELECT * FROM grades").is_err());
        assert!(parse("DROP TABLE notes extra").is_err());
    }
}
