//! Tests for the SQL parser.

use super::*;
use crate::ast::*;

fn round_trip_query(sql: &str) {
    let query = parse_query(sql).unwrap_or_else(|e| panic!("parsing {:?}: {}", sql, e));
    let rendered = query.to_string();
    let reparsed =
        parse_query(&rendered).unwrap_or_else(|e| panic!("reparsing {:?}: {}", rendered, e));
    assert_eq!(query, reparsed, "rendered as {:?}", rendered);
}

fn round_trip_dml(sql: &str) {
    let stmt = parse_dml_stmt(sql).unwrap_or_else(|e| panic!("parsing {:?}: {}", sql, e));
    let rendered = stmt.to_string();
    let reparsed =
        parse_dml_stmt(&rendered).unwrap_or_else(|e| panic!("reparsing {:?}: {}", rendered, e));
    assert_eq!(stmt, reparsed, "rendered as {:?}", rendered);
}

fn round_trip_ddl(sql: &str) {
    let stmt = parse_ddl_stmt(sql).unwrap_or_else(|e| panic!("parsing {:?}: {}", sql, e));
    let rendered = stmt.to_string();
    let reparsed =
        parse_ddl_stmt(&rendered).unwrap_or_else(|e| panic!("reparsing {:?}: {}", rendered, e));
    assert_eq!(stmt, reparsed, "rendered as {:?}", rendered);
}

// ==================== Queries ====================

#[test]
fn test_simple_query() {
    let query = parse_query("SELECT * FROM Singers WHERE Id = 1").unwrap();
    assert_eq!(query.select.list, vec![Expr::Star]);
    assert_eq!(
        query.select.from,
        vec![SelectFrom::Table(SelectFromTable {
            table: "Singers".to_string(),
            alias: None,
        })]
    );
    assert_eq!(
        query.select.where_clause,
        Some(Expr::compare(
            ComparisonOperator::Eq,
            Expr::ident("Id"),
            Expr::Integer(1)
        ))
    );
    assert!(query.order.is_empty());
    assert!(query.limit.is_none());
}

#[test]
fn test_select_alias() {
    let query = parse_query("SELECT 1 AS one").unwrap();
    assert_eq!(query.select.list, vec![Expr::Integer(1)]);
    assert_eq!(query.select.list_aliases, vec!["one".to_string()]);
    assert!(query.select.from.is_empty());
    assert_eq!(query.to_string(), "SELECT 1 AS one");
}

#[test]
fn test_aliases_only_recorded_when_present() {
    let query = parse_query("SELECT a, b FROM T").unwrap();
    assert!(query.select.list_aliases.is_empty());

    let query = parse_query("SELECT a, b AS x FROM T").unwrap();
    assert_eq!(query.select.list_aliases, vec!["".to_string(), "x".to_string()]);
}

#[test]
fn test_keywords_are_case_insensitive() {
    let upper = parse_query("SELECT a FROM t WHERE a = 1 ORDER BY a DESC LIMIT 3").unwrap();
    let lower = parse_query("select a from t where a = 1 order by a desc limit 3").unwrap();
    assert_eq!(upper, lower);
    assert!(lower.order[0].desc);
}

#[test]
fn test_order_limit_offset() {
    let query = parse_query("SELECT A FROM T ORDER BY A DESC, B LIMIT 10 OFFSET @skip").unwrap();
    assert_eq!(query.order.len(), 2);
    assert!(query.order[0].desc);
    assert!(!query.order[1].desc);
    assert_eq!(query.limit, Some(LiteralOrParam::Integer(10)));
    assert_eq!(query.offset, Some(LiteralOrParam::Param("skip".to_string())));
}

#[test]
fn test_group_by() {
    let query = parse_query("SELECT Name, COUNT(*) FROM T GROUP BY Name").unwrap();
    assert_eq!(query.select.group_by, vec![Expr::ident("Name")]);
    assert_eq!(
        query.select.list[1],
        Expr::Func {
            name: "COUNT".to_string(),
            args: vec![Expr::Star],
        }
    );
}

#[test]
fn test_joins() {
    let query = parse_query("SELECT * FROM A AS x LEFT OUTER JOIN C AS y ON x.id = y.id").unwrap();
    let SelectFrom::Join(join) = &query.select.from[0] else {
        panic!("Expected join, got {:?}", query.select.from[0]);
    };
    assert_eq!(join.join_type, JoinType::Left);
    assert_eq!(
        join.on,
        Some(Expr::compare(
            ComparisonOperator::Eq,
            Expr::Path(vec!["x".to_string(), "id".to_string()]),
            Expr::Path(vec!["y".to_string(), "id".to_string()]),
        ))
    );

    let query = parse_query("SELECT * FROM T1 HASH JOIN T2 USING (id)").unwrap();
    let SelectFrom::Join(join) = &query.select.from[0] else {
        panic!("Expected join");
    };
    assert_eq!(join.join_type, JoinType::Inner);
    assert_eq!(join.using, vec!["id".to_string()]);
    assert_eq!(
        join.hints.get("JOIN_METHOD").map(String::as_str),
        Some("HASH_JOIN")
    );
}

#[test]
fn test_unnest_from() {
    let query = parse_query("SELECT * FROM UNNEST(@ids) AS id").unwrap();
    let SelectFrom::Unnest(unnest) = &query.select.from[0] else {
        panic!("Expected UNNEST");
    };
    assert_eq!(unnest.expr, Expr::Param("ids".to_string()));
    assert_eq!(unnest.alias.as_deref(), Some("id"));
}

#[test]
fn test_select_all_is_the_default() {
    let all = parse_query("SELECT ALL A FROM T").unwrap();
    assert!(!all.select.distinct);
    assert_eq!(all, parse_query("SELECT A FROM T").unwrap());
    assert_eq!(all.to_string(), "SELECT A FROM T");

    assert!(parse_query("SELECT DISTINCT A FROM T").unwrap().select.distinct);
}

#[test]
fn test_table_sample() {
    let query = parse_query(
        "SELECT * FROM T tablesample bernoulli (10 PERCENT), U, \
         V TABLESAMPLE RESERVOIR (@n ROWS)",
    )
    .unwrap();
    assert_eq!(query.select.from.len(), 3);
    assert_eq!(
        query.select.table_samples,
        vec![
            Some(TableSample {
                method: TableSampleMethod::Bernoulli,
                size: Expr::Integer(10),
                size_type: TableSampleSizeType::Percent,
            }),
            None,
            Some(TableSample {
                method: TableSampleMethod::Reservoir,
                size: Expr::Param("n".to_string()),
                size_type: TableSampleSizeType::Rows,
            }),
        ]
    );
    assert_eq!(
        query.to_string(),
        "SELECT * FROM T TABLESAMPLE BERNOULLI (10 PERCENT), U, V TABLESAMPLE RESERVOIR (@n ROWS)"
    );

    // Only recorded when some FROM item has one.
    assert!(parse_query("SELECT * FROM T, U").unwrap().select.table_samples.is_empty());
}

// ==================== Expressions ====================

#[test]
fn test_not_binds_tighter_than_and() {
    let expr = parse_expr("NOT a AND b").unwrap();
    let Expr::Logical {
        op: LogicalOperator::And,
        lhs,
        rhs,
    } = expr
    else {
        panic!("Expected AND");
    };
    assert_eq!(*lhs, Expr::Not(Box::new(Expr::ident("a"))));
    assert_eq!(*rhs, Expr::ident("b"));
}

#[test]
fn test_and_binds_tighter_than_or() {
    let expr = parse_expr("a OR b AND c").unwrap();
    assert_eq!(
        expr,
        Expr::logical(
            LogicalOperator::Or,
            Expr::ident("a"),
            Expr::logical(LogicalOperator::And, Expr::ident("b"), Expr::ident("c")),
        )
    );
}

#[test]
fn test_arith_levels() {
    // Each operator has its own level; `+` binds tighter than `-`.
    let expr = parse_expr("a - b + c").unwrap();
    assert_eq!(
        expr,
        Expr::arith(
            ArithOperator::Sub,
            Expr::ident("a"),
            Expr::arith(ArithOperator::Add, Expr::ident("b"), Expr::ident("c")),
        )
    );

    let expr = parse_expr("1 + 2 * 3").unwrap();
    assert_eq!(
        expr,
        Expr::arith(
            ArithOperator::Add,
            Expr::Integer(1),
            Expr::arith(ArithOperator::Mul, Expr::Integer(2), Expr::Integer(3)),
        )
    );
}

#[test]
fn test_signed_literals() {
    assert_eq!(parse_expr("-5").unwrap(), Expr::Integer(-5));
    assert_eq!(parse_expr("+7").unwrap(), Expr::Integer(7));
    assert_eq!(parse_expr("-2.5").unwrap(), Expr::Float(-2.5));
    assert_eq!(
        parse_expr("-9223372036854775808").unwrap(),
        Expr::Integer(i64::MIN)
    );
    assert_eq!(
        parse_expr("-x").unwrap(),
        Expr::Unary {
            op: UnaryOperator::Neg,
            operand: Box::new(Expr::ident("x")),
        }
    );
    assert_eq!(
        parse_expr("3 - 1").unwrap(),
        Expr::arith(ArithOperator::Sub, Expr::Integer(3), Expr::Integer(1))
    );
}

#[test]
fn test_negated_operators() {
    let expr = parse_expr("a NOT IN (1, 2)").unwrap();
    let Expr::In { neg, unnest, rhs, .. } = expr else {
        panic!("Expected IN");
    };
    assert!(neg);
    assert!(!unnest);
    assert_eq!(rhs, vec![Expr::Integer(1), Expr::Integer(2)]);

    let expr = parse_expr("a IN UNNEST (@arr)").unwrap();
    let Expr::In { neg, unnest, .. } = expr else {
        panic!("Expected IN");
    };
    assert!(!neg);
    assert!(unnest);

    let expr = parse_expr("s NOT LIKE 'x%'").unwrap();
    assert_eq!(
        expr,
        Expr::compare(
            ComparisonOperator::NotLike,
            Expr::ident("s"),
            Expr::String("x%".to_string())
        )
    );

    let expr = parse_expr("n NOT BETWEEN 1 AND 5").unwrap();
    let Expr::Comparison { op, rhs2, .. } = expr else {
        panic!("Expected BETWEEN");
    };
    assert_eq!(op, ComparisonOperator::NotBetween);
    assert_eq!(rhs2.as_deref(), Some(&Expr::Integer(5)));
}

#[test]
fn test_is_expression() {
    let expr = parse_expr("a IS NOT NULL").unwrap();
    assert_eq!(
        expr,
        Expr::Is {
            lhs: Box::new(Expr::ident("a")),
            neg: true,
            rhs: IsTarget::Null,
        }
    );
}

#[test]
fn test_function_names_are_uppercased() {
    assert_eq!(
        parse_expr("starts_with(Name, \"A\")").unwrap(),
        Expr::Func {
            name: "STARTS_WITH".to_string(),
            args: vec![Expr::ident("Name"), Expr::String("A".to_string())],
        }
    );
}

#[test]
fn test_paren_is_transparent_to_equality() {
    let expr = parse_expr("(a)").unwrap();
    assert!(matches!(expr, Expr::Paren(_)));
    assert_eq!(expr, Expr::ident("a"));
}

#[test]
fn test_literals() {
    assert_eq!(parse_expr("0x1F").unwrap(), Expr::Integer(31));
    assert_eq!(parse_expr(".5").unwrap(), Expr::Float(0.5));
    assert_eq!(parse_expr("TRUE").unwrap(), Expr::Bool(true));
    assert_eq!(parse_expr("null").unwrap(), Expr::Null);
    assert_eq!(parse_expr("b'ab'").unwrap(), Expr::Bytes(b"ab".to_vec()));
    assert_eq!(
        parse_expr("[1, 2]").unwrap(),
        Expr::Array(vec![Expr::Integer(1), Expr::Integer(2)])
    );
    assert_eq!(parse_expr("ARRAY[]").unwrap(), Expr::Array(vec![]));
    assert_eq!(parse_expr("`select`").unwrap(), Expr::ident("select"));
}

// ==================== DML ====================

#[test]
fn test_delete() {
    let stmt = parse_dml_stmt("DELETE FROM Singers WHERE Id = 5").unwrap();
    let DmlStmt::Delete(delete) = stmt else {
        panic!("Expected DELETE");
    };
    assert_eq!(delete.table, "Singers");

    // FROM is optional.
    let stmt = parse_dml_stmt("DELETE Singers WHERE TRUE").unwrap();
    assert!(matches!(stmt, DmlStmt::Delete(_)));
}

#[test]
fn test_update() {
    let stmt = parse_dml_stmt("UPDATE T SET A = 1, B = DEFAULT WHERE Id = 2").unwrap();
    let DmlStmt::Update(update) = stmt else {
        panic!("Expected UPDATE");
    };
    assert_eq!(update.table, "T");
    assert_eq!(update.items.len(), 2);
    assert_eq!(update.items[0].column, "A");
    assert_eq!(update.items[0].value, Some(Expr::Integer(1)));
    assert_eq!(update.items[1].value, None);
}

// ==================== DDL ====================

#[test]
fn test_create_table() {
    let stmt = parse_ddl_stmt(
        "CREATE TABLE Albums (
            SingerId INT64 NOT NULL,
            Title STRING(MAX),
            Tags ARRAY<STRING(64)>,
            CONSTRAINT FK_Singer FOREIGN KEY (SingerId) REFERENCES Singers (Id),
        ) PRIMARY KEY (SingerId, Title DESC),
          INTERLEAVE IN PARENT Singers ON DELETE CASCADE",
    )
    .unwrap();
    let DdlStmt::CreateTable(ct) = stmt else {
        panic!("Expected CREATE TABLE");
    };
    assert_eq!(ct.name, "Albums");
    assert_eq!(ct.columns.len(), 3);
    assert!(ct.columns[0].not_null);
    assert_eq!(ct.columns[1].ty, Type::sized(TypeBase::String, MAX_LEN));
    assert_eq!(
        ct.columns[2].ty,
        Type::array_of(Type::sized(TypeBase::String, 64))
    );
    assert_eq!(ct.constraints.len(), 1);
    assert_eq!(ct.constraints[0].name, "FK_Singer");
    assert_eq!(
        ct.primary_key,
        vec![KeyPart::asc("SingerId"), KeyPart::desc("Title")]
    );
    assert_eq!(
        ct.interleave,
        Some(Interleave {
            parent: "Singers".to_string(),
            on_delete: OnDelete::Cascade,
        })
    );
    assert_eq!(ct.position.line, 1);
    assert_eq!(ct.columns[1].position.line, 3);
}

#[test]
fn test_column_named_like_constraint_keyword() {
    let stmt = parse_ddl_stmt("CREATE TABLE T (CONSTRAINT BOOL, CHECK (CONSTRAINT)) PRIMARY KEY ()")
        .unwrap();
    let DdlStmt::CreateTable(ct) = stmt else {
        panic!("Expected CREATE TABLE");
    };
    assert_eq!(ct.columns[0].name, "CONSTRAINT");
    assert_eq!(ct.columns[0].ty, Type::scalar(TypeBase::Bool));
    assert_eq!(ct.constraints.len(), 1);
    assert!(ct.constraints[0].name.is_empty());
}

#[test]
fn test_create_index() {
    let stmt = parse_ddl_stmt(
        "CREATE UNIQUE NULL_FILTERED INDEX ByTitle ON Albums(Title DESC) STORING (Cover), INTERLEAVE IN Singers",
    )
    .unwrap();
    let DdlStmt::CreateIndex(ci) = stmt else {
        panic!("Expected CREATE INDEX");
    };
    assert!(ci.unique);
    assert!(ci.null_filtered);
    assert_eq!(ci.columns, vec![KeyPart::desc("Title")]);
    assert_eq!(ci.storing, vec!["Cover".to_string()]);
    assert_eq!(ci.interleave.as_deref(), Some("Singers"));
}

#[test]
fn test_alter_table() {
    let stmt = parse_ddl_stmt("ALTER TABLE T ALTER COLUMN C STRING(10) NOT NULL").unwrap();
    let DdlStmt::AlterTable(at) = stmt else {
        panic!("Expected ALTER TABLE");
    };
    assert_eq!(
        at.alteration,
        TableAlteration::AlterColumn {
            name: "C".to_string(),
            alteration: ColumnAlteration::SetType {
                ty: Type::sized(TypeBase::String, 10),
                not_null: true,
            },
        }
    );

    let stmt = parse_ddl_stmt("ALTER TABLE T DROP COLUMN C").unwrap();
    let DdlStmt::AlterTable(at) = stmt else {
        panic!("Expected ALTER TABLE");
    };
    assert_eq!(at.alteration, TableAlteration::DropColumn("C".to_string()));
}

#[test]
fn test_parse_ddl_file_with_comments() {
    let ddl = parse_ddl(
        "schema.sql",
        "-- Singers table.\n\
         CREATE TABLE Singers (\n\
           Id INT64 NOT NULL, -- the id\n\
         ) PRIMARY KEY(Id);\n\
         \n\
         DROP TABLE Old;\n",
    )
    .unwrap();
    assert_eq!(ddl.filename, "schema.sql");
    assert_eq!(ddl.list.len(), 2);

    let DdlStmt::CreateTable(ct) = &ddl.list[0] else {
        panic!("Expected CREATE TABLE");
    };
    let leading = ddl.leading_comment(ct).expect("leading comment");
    assert_eq!(leading.text, vec!["Singers table.".to_string()]);
    let inline = ddl.inline_comment(&ct.columns[0]).expect("inline comment");
    assert_eq!(inline.text, vec!["the id".to_string()]);
    assert!(ddl.leading_comment(&ddl.list[1]).is_none());
}

// ==================== Errors ====================

#[test]
fn test_trailing_query_contents() {
    let err = parse_query("SELECT 1 garbage").unwrap_err();
    assert_eq!(
        err.to_string(),
        "-:1.9: unexpected trailing query contents \"garbage\""
    );
}

#[test]
fn test_parse_errors() {
    let cases = [
        (parse_dml_stmt("INSERT INTO T").map(|_| ()), "unknown DML statement"),
        (
            parse_dml_stmt("DELETE FROM T WHERE 1 + 2").map(|_| ()),
            "got non-bool expression",
        ),
        (
            parse_expr("a AND 1").map(|_| ()),
            "operands of AND must be boolean expressions",
        ),
        (parse_expr("a +").map(|_| ()), "unexpected end of input"),
        (
            parse_query("SELECT * FROM T LIMIT x").map(|_| ()),
            "want literal or parameter",
        ),
        (
            parse_query("SELECT * FROM T1 JOIN T2 ON T1.x = T2.x USING (x)").map(|_| ()),
            "join may not have both ON and USING clauses",
        ),
        (parse_expr("SELECT").map(|_| ()), "expected identifier"),
        (
            parse_ddl_stmt("CREATE TABLE T (A INT32) PRIMARY KEY (A)").map(|_| ()),
            "want scalar type",
        ),
        (parse_ddl_stmt("TRUNCATE T").map(|_| ()), "unknown DDL statement"),
        (
            parse_query("SELECT * FROM T TABLESAMPLE SYSTEM (10 PERCENT)").map(|_| ()),
            "want BERNOULLI or RESERVOIR",
        ),
        (
            parse_query("SELECT * FROM T TABLESAMPLE BERNOULLI (10 BLOCKS)").map(|_| ()),
            "want PERCENT or ROWS",
        ),
        (parse_expr("1e400").map(|_| ()), "out of range"),
    ];
    for (result, want) in cases {
        let err = result.expect_err(want);
        assert!(
            err.message.contains(want),
            "got {:?}, want it to contain {:?}",
            err.message,
            want
        );
    }
}

// ==================== Round trips ====================

#[test]
fn test_query_round_trip() {
    for sql in [
        "SELECT 1 AS one",
        "SELECT DISTINCT Name, COUNT(*) FROM Singers WHERE Age >= 18 AND Name LIKE \"A%\" \
         GROUP BY Name ORDER BY Name DESC LIMIT 10 OFFSET @skip",
        "SELECT a FROM T WHERE NOT a IN (1, 2, 3) OR b IS NOT NULL",
        "SELECT -a, ~b, +c, a - b + c, (a + b) * c, a || 'x' FROM T",
        "SELECT * FROM T WHERE x BETWEEN 1 AND 10 AND y NOT BETWEEN -5 AND 5",
        "SELECT * FROM T WHERE s NOT LIKE 'x%' AND z NOT IN UNNEST (@arr)",
        "SELECT [1, 2.5, NULL], ARRAY[b'ab', b\"\\x00\"] FROM T",
        "SELECT x.a FROM T AS x LEFT OUTER JOIN U AS y ON x.id = y.id",
        "SELECT * FROM T CROSS JOIN U",
        "SELECT * FROM Albums HASH JOIN Songs USING (id)",
        "SELECT * FROM UNNEST(@ids) AS id",
        "SELECT * FROM T WHERE a = TRUE OR b IS FALSE",
        "SELECT 0x1F, 1e10, .5, \"a\\nb\", 'tab\\there' FROM T",
        "SELECT STARTS_WITH(Name, 'A'), LOWER(Name) FROM T WHERE CHAR_LENGTH(Name) > 3",
        "SELECT * FROM T WHERE (a OR b) AND NOT (c OR d)",
        "SELECT `Order`, `select` AS `from` FROM `Order`",
        "SELECT * FROM T WHERE a < b = c",
        "SELECT -(-5), 1 - -2, -(a + b) FROM T",
        "SELECT ALL A FROM T",
        "SELECT * FROM T TABLESAMPLE BERNOULLI (0.5 PERCENT) WHERE a = 1",
        "SELECT x.a FROM T AS x TABLESAMPLE RESERVOIR (100 ROWS), U AS y",
        "SELECT 1e300, 2.5e-10 FROM T",
    ] {
        round_trip_query(sql);
    }
}

#[test]
fn test_dml_round_trip() {
    for sql in [
        "DELETE FROM Singers WHERE Id = 5",
        "DELETE Singers WHERE TRUE",
        "UPDATE Singers SET Name = 'x', Age = DEFAULT, Score = Score + 1 WHERE Id IN (1, 2)",
    ] {
        round_trip_dml(sql);
    }
}

#[test]
fn test_ddl_round_trip() {
    for sql in [
        "CREATE TABLE Albums (
            SingerId INT64 NOT NULL,
            AlbumId INT64 NOT NULL,
            Title STRING(MAX),
            Cover BYTES(1024),
            Tags ARRAY<STRING(64)>,
            Released DATE,
            Updated TIMESTAMP OPTIONS (allow_commit_timestamp = true),
            Score FLOAT64,
            Price NUMERIC,
            Shout STRING(MAX) AS (UPPER(Title)) STORED,
            CONSTRAINT FK_Singer FOREIGN KEY (SingerId) REFERENCES Singers (Id),
            CHECK (Score > 0),
        ) PRIMARY KEY (SingerId, AlbumId DESC),
          INTERLEAVE IN PARENT Singers ON DELETE CASCADE",
        "CREATE TABLE Empty () PRIMARY KEY ()",
        "CREATE UNIQUE NULL_FILTERED INDEX ByTitle ON Albums(Title DESC) STORING (Cover), INTERLEAVE IN Singers",
        "CREATE INDEX ByName ON Singers(LastName, FirstName)",
        "DROP TABLE Albums",
        "DROP INDEX ByTitle",
        "ALTER TABLE Albums ADD COLUMN Notes STRING(100)",
        "ALTER TABLE Albums DROP COLUMN Notes",
        "ALTER TABLE Albums ADD CONSTRAINT FK2 FOREIGN KEY (A) REFERENCES Other (C)",
        "ALTER TABLE Albums ADD CHECK (A > 0)",
        "ALTER TABLE Albums DROP CONSTRAINT FK2",
        "ALTER TABLE Albums SET ON DELETE NO ACTION",
        "ALTER TABLE Albums ALTER COLUMN Title STRING(200) NOT NULL",
        "ALTER TABLE Albums ALTER COLUMN Updated SET OPTIONS (allow_commit_timestamp = null)",
    ] {
        round_trip_ddl(sql);
    }
}
