//! DDL statement parsing: CREATE/ALTER/DROP TABLE, CREATE/DROP INDEX.

use crate::ast::{
    AlterTable, Check, ColumnAlteration, ColumnDef, ColumnOptions, Constraint, CreateIndex,
    CreateTable, DdlStmt, DropIndex, DropTable, ForeignKey, Interleave, KeyPart, OnDelete,
    TableAlteration, TableConstraint, Type, TypeBase, MAX_LEN,
};
use crate::error::ParseResult;
use crate::lexer::{parse_int64, TokenKind};
use crate::parser::{describe, Parser};

impl Parser {
    pub(crate) fn parse_ddl_stmt(&mut self) -> ParseResult<DdlStmt> {
        if self.sniff(&["CREATE", "TABLE"]) {
            return Ok(DdlStmt::CreateTable(self.parse_create_table()?));
        }
        if self.sniff(&["CREATE"]) {
            // The only other CREATE is CREATE [UNIQUE] [NULL_FILTERED] INDEX.
            return Ok(DdlStmt::CreateIndex(self.parse_create_index()?));
        }
        if self.sniff(&["ALTER", "TABLE"]) {
            return Ok(DdlStmt::AlterTable(self.parse_alter_table()?));
        }
        if self.sniff(&["DROP"]) {
            let position = self.next().position();
            let kind = self.next();
            let name = if kind.is("TABLE") || kind.is("INDEX") {
                self.parse_name()?
            } else {
                return Err(self.error_at(
                    &kind,
                    format!("got {}, want TABLE or INDEX", describe(&kind)),
                ));
            };
            if kind.is("TABLE") {
                return Ok(DdlStmt::DropTable(DropTable { name, position }));
            }
            return Ok(DdlStmt::DropIndex(DropIndex { name, position }));
        }

        Err(self.error("unknown DDL statement"))
    }

    /// ```text
    /// CREATE TABLE name ( [column_def | table_constraint, ...] )
    ///     PRIMARY KEY ( [key_part, ...] )
    ///     [, INTERLEAVE IN PARENT parent [ ON DELETE { CASCADE | NO ACTION } ] ]
    /// ```
    fn parse_create_table(&mut self) -> ParseResult<CreateTable> {
        let position = self.current_token().position();
        self.expect("CREATE")?;
        self.expect("TABLE")?;
        let name = self.parse_name()?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        self.parse_comma_list("(", ")", |p| {
            if p.sniff_table_constraint() {
                constraints.push(p.parse_table_constraint()?);
            } else {
                columns.push(p.parse_column_def()?);
            }
            Ok(())
        })?;

        self.expect("PRIMARY")?;
        self.expect("KEY")?;
        let primary_key = self.parse_key_part_list()?;

        let mut interleave = None;
        if self.eat(&[",", "INTERLEAVE"]) {
            self.expect("IN")?;
            self.expect("PARENT")?;
            let parent = self.parse_name()?;
            let on_delete = if self.eat(&["ON", "DELETE"]) {
                self.parse_on_delete()?
            } else {
                OnDelete::NoAction
            };
            interleave = Some(Interleave { parent, on_delete });
        }

        Ok(CreateTable {
            name,
            columns,
            constraints,
            primary_key,
            interleave,
            position,
        })
    }

    /// `CONSTRAINT BOOL` could start a column named CONSTRAINT of type BOOL
    /// or a constraint named BOOL, so this looks up to three tokens ahead.
    fn sniff_table_constraint(&mut self) -> bool {
        if self.sniff(&["FOREIGN", "KEY"]) || self.sniff(&["CHECK"]) {
            return true;
        }

        let checkpoint = self.checkpoint();
        let found = self.eat(&["CONSTRAINT"])
            && self.parse_name().is_ok()
            && (self.sniff(&["FOREIGN"]) || self.sniff(&["CHECK"]));
        self.restore(checkpoint);
        found
    }

    /// ```text
    /// CREATE [UNIQUE] [NULL_FILTERED] INDEX name ON table ( key_part [, ...] )
    ///     [ STORING ( column [, ...] ) ] [ , INTERLEAVE IN table ]
    /// ```
    fn parse_create_index(&mut self) -> ParseResult<CreateIndex> {
        let position = self.current_token().position();
        self.expect("CREATE")?;
        let unique = self.eat(&["UNIQUE"]);
        let null_filtered = self.eat(&["NULL_FILTERED"]);
        self.expect("INDEX")?;
        let name = self.parse_name()?;
        self.expect("ON")?;
        let table = self.parse_name()?;
        let columns = self.parse_key_part_list()?;

        let storing = if self.eat(&["STORING"]) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };

        let interleave = if self.eat(&[",", "INTERLEAVE", "IN"]) {
            Some(self.parse_name()?)
        } else {
            None
        };

        Ok(CreateIndex {
            name,
            table,
            columns,
            unique,
            null_filtered,
            storing,
            interleave,
            position,
        })
    }

    /// ```text
    /// ALTER TABLE name { ADD COLUMN column_def | DROP COLUMN column
    ///     | ADD table_constraint | DROP CONSTRAINT name
    ///     | SET ON DELETE { CASCADE | NO ACTION }
    ///     | ALTER COLUMN column { type [NOT NULL] | SET options } }
    /// ```
    fn parse_alter_table(&mut self) -> ParseResult<AlterTable> {
        let position = self.current_token().position();
        self.expect("ALTER")?;
        self.expect("TABLE")?;
        let name = self.parse_name()?;

        let tok = self.next();
        let alteration = if tok.is("ADD") {
            if self.sniff(&["CONSTRAINT"]) || self.sniff(&["FOREIGN"]) || self.sniff(&["CHECK"]) {
                TableAlteration::AddConstraint(self.parse_table_constraint()?)
            } else {
                self.expect("COLUMN")?;
                TableAlteration::AddColumn(self.parse_column_def()?)
            }
        } else if tok.is("DROP") {
            if self.eat(&["CONSTRAINT"]) {
                TableAlteration::DropConstraint(self.parse_name()?)
            } else {
                self.expect("COLUMN")?;
                TableAlteration::DropColumn(self.parse_name()?)
            }
        } else if tok.is("SET") {
            self.expect("ON")?;
            self.expect("DELETE")?;
            TableAlteration::SetOnDelete(self.parse_on_delete()?)
        } else if tok.is("ALTER") {
            self.expect("COLUMN")?;
            let name = self.parse_name()?;
            let alteration = self.parse_column_alteration()?;
            TableAlteration::AlterColumn { name, alteration }
        } else {
            return Err(self.error_at(
                &tok,
                format!("got {}, expected ADD or DROP or SET or ALTER", describe(&tok)),
            ));
        };

        Ok(AlterTable {
            name,
            alteration,
            position,
        })
    }

    /// `name type [NOT NULL] [AS ( expr ) STORED] [OPTIONS ( ... )]`
    fn parse_column_def(&mut self) -> ParseResult<ColumnDef> {
        let position = self.current_token().position();
        let name = self.parse_name()?;
        let ty = self.parse_type()?;
        let not_null = self.eat(&["NOT", "NULL"]);

        let mut generated = None;
        if self.eat(&["AS", "("]) {
            generated = Some(self.parse_expr()?);
            self.expect(")")?;
            self.expect("STORED")?;
        }

        let options = if self.sniff(&["OPTIONS"]) {
            self.parse_column_options()?
        } else {
            ColumnOptions::default()
        };

        Ok(ColumnDef {
            name,
            ty,
            not_null,
            generated,
            options,
            position,
        })
    }

    fn parse_column_alteration(&mut self) -> ParseResult<ColumnAlteration> {
        if self.eat(&["SET"]) {
            return Ok(ColumnAlteration::SetOptions(self.parse_column_options()?));
        }
        let ty = self.parse_type()?;
        let not_null = self.eat(&["NOT", "NULL"]);
        Ok(ColumnAlteration::SetType { ty, not_null })
    }

    /// `OPTIONS ( allow_commit_timestamp = { true | null } )`
    fn parse_column_options(&mut self) -> ParseResult<ColumnOptions> {
        self.expect("OPTIONS")?;
        self.expect("(")?;

        let mut options = ColumnOptions::default();
        if self.eat(&["allow_commit_timestamp", "="]) {
            let tok = self.next();
            let allow = if tok.is("true") {
                true
            } else if tok.is("null") {
                false
            } else {
                return Err(self.error_at(
                    &tok,
                    format!("got {}, want true or null", describe(&tok)),
                ));
            };
            options.allow_commit_timestamp = Some(allow);
        }

        self.expect(")")?;
        Ok(options)
    }

    fn parse_key_part_list(&mut self) -> ParseResult<Vec<KeyPart>> {
        let mut list = Vec::new();
        self.parse_comma_list("(", ")", |p| {
            list.push(p.parse_key_part()?);
            Ok(())
        })?;
        Ok(list)
    }

    /// `column [ASC | DESC]`
    fn parse_key_part(&mut self) -> ParseResult<KeyPart> {
        let column = self.parse_name()?;
        let desc = if self.eat(&["DESC"]) {
            true
        } else {
            self.eat(&["ASC"]);
            false
        };
        Ok(KeyPart { column, desc })
    }

    /// `[CONSTRAINT name] { FOREIGN KEY ... | CHECK ( expr ) }`
    fn parse_table_constraint(&mut self) -> ParseResult<TableConstraint> {
        if self.sniff(&["CONSTRAINT"]) {
            let position = self.next().position();
            let name = self.parse_name()?;
            let constraint = self.parse_constraint()?;
            return Ok(TableConstraint {
                name,
                constraint,
                position,
            });
        }

        let constraint = self.parse_constraint()?;
        Ok(TableConstraint {
            name: String::new(),
            position: crate::ast::Node::position(&constraint),
            constraint,
        })
    }

    fn parse_constraint(&mut self) -> ParseResult<Constraint> {
        if self.sniff(&["FOREIGN"]) {
            return Ok(Constraint::ForeignKey(self.parse_foreign_key()?));
        }
        Ok(Constraint::Check(self.parse_check()?))
    }

    /// `FOREIGN KEY ( column [, ...] ) REFERENCES table ( column [, ...] )`
    fn parse_foreign_key(&mut self) -> ParseResult<ForeignKey> {
        let position = self.current_token().position();
        self.expect("FOREIGN")?;
        self.expect("KEY")?;
        let columns = self.parse_name_list()?;
        self.expect("REFERENCES")?;
        let ref_table = self.parse_name()?;
        let ref_columns = self.parse_name_list()?;
        Ok(ForeignKey {
            columns,
            ref_table,
            ref_columns,
            position,
        })
    }

    /// `CHECK ( bool_expr )`
    fn parse_check(&mut self) -> ParseResult<Check> {
        let position = self.current_token().position();
        self.expect("CHECK")?;
        self.expect("(")?;
        let expr = self.parse_bool_expr()?;
        self.expect(")")?;
        Ok(Check { expr, position })
    }

    /// ```text
    /// ARRAY< scalar_type > | scalar_type
    /// scalar_type: BOOL | INT64 | FLOAT64 | NUMERIC | STRING( length )
    ///     | BYTES( length ) | DATE | TIMESTAMP
    /// length: int64_value | MAX
    /// ```
    fn parse_type(&mut self) -> ParseResult<Type> {
        let mut tok = self.next();
        let array = tok.is("ARRAY");
        if array {
            self.expect("<")?;
            tok = self.next();
        }

        let base = match (&tok.kind, TypeBase::from_keyword(&tok.value)) {
            (TokenKind::Ident, Some(base)) => base,
            _ => {
                return Err(self.error_at(
                    &tok,
                    format!("got {}, want scalar type", describe(&tok)),
                ))
            }
        };

        let mut len = 0;
        if matches!(base, TypeBase::String | TypeBase::Bytes) {
            self.expect("(")?;
            let tok = self.next();
            len = match tok.kind {
                _ if tok.is("MAX") => MAX_LEN,
                TokenKind::Int64 { base } => {
                    parse_int64(&tok.value, base, false).map_err(|msg| self.error_at(&tok, msg))?
                }
                _ => {
                    return Err(self.error_at(
                        &tok,
                        format!("got {}, want MAX or int64", describe(&tok)),
                    ))
                }
            };
            self.expect(")")?;
        }

        if array {
            self.expect(">")?;
        }

        Ok(Type { array, base, len })
    }

    /// `CASCADE | NO ACTION`
    fn parse_on_delete(&mut self) -> ParseResult<OnDelete> {
        let tok = self.next();
        if tok.is("CASCADE") {
            return Ok(OnDelete::Cascade);
        }
        if !tok.is("NO") {
            return Err(self.error_at(&tok, format!("got {}, want NO or CASCADE", describe(&tok))));
        }
        self.expect("ACTION")?;
        Ok(OnDelete::NoAction)
    }
}
