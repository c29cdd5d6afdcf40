use crate::ast::{Stmt, StmtRef};
use crate::token::Kind;

use super::core::Parser;
use super::error::ParserResult;
use super::expr::parse_expression;

pub fn parse_statement(parser: &mut Parser) -> ParserResult<StmtRef> {
    match parser.peek() {
        Some(Kind::If) => {
            parser.next();
            parse_if_statement(parser)
        }
        Some(Kind::While) => {
            parser.next();
            parse_while_statement(parser)
        }
        Some(Kind::For) => {
            parser.next();
            parse_for_statement(parser)
        }
        Some(Kind::Do) => {
            parser.next();
            parse_do_while_statement(parser)
        }
        Some(Kind::Switch) => {
            parser.next();
            parse_switch_statement(parser)
        }
        Some(Kind::Return) => {
            parser.next();
            parse_return_statement(parser)
        }
        Some(Kind::Break) => {
            let location = parser.current_location();
            parser.next();
            parser.consume(&Kind::Semicolon);
            Ok(parser.ast_builder.break_stmt(Some(location)))
        }
        Some(Kind::Continue) => {
            let location = parser.current_location();
            parser.next();
            parser.consume(&Kind::Semicolon);
            Ok(parser.ast_builder.continue_stmt(Some(location)))
        }
        Some(Kind::BraceOpen) => {
            parser.next();
            parse_block(parser)
        }
        _ => parse_expression_statement(parser),
    }
}

/// One entry of a block body: a declaration or a statement, disambiguated
/// the same way as at top level.
fn parse_block_item(parser: &mut Parser) -> ParserResult<StmtRef> {
    match parser.peek() {
        Some(kind) if kind.is_type_token() => {
            if parser.function_follows() {
                return Err(parser.error_here("function declarations are only allowed at top level".to_string()));
            }
            parser.parse_variable_declaration()
        }
        _ => parse_statement(parser),
    }
}

/// Body statements of `{ ... }`; the opening brace is already consumed.
pub fn parse_block(parser: &mut Parser) -> ParserResult<StmtRef> {
    let location = parser.current_location();
    let mut statements = Vec::new();

    while !parser.check(&Kind::BraceClose) && !parser.at_end() {
        if parser.in_panic_mode() {
            parser.synchronize();
            if parser.check(&Kind::BraceClose) || parser.at_end() {
                break;
            }
        }
        let before = parser.consumed();
        match parse_block_item(parser) {
            Ok(stmt) => statements.push(stmt),
            Err(_) => {
                // The loop head synchronizes; if the failing item consumed
                // nothing, step over the offending token so recovery makes
                // progress.
                if parser.consumed() == before && !parser.at_end() {
                    parser.next();
                }
                if parser.check(&Kind::BraceClose) || parser.at_end() {
                    break;
                }
            }
        }
    }

    parser.consume(&Kind::BraceClose);
    Ok(parser.ast_builder.block_stmt(statements, Some(location)))
}

pub fn parse_if_statement(parser: &mut Parser) -> ParserResult<StmtRef> {
    let location = parser.current_location();
    parser.consume(&Kind::ParenOpen);
    let cond = parse_expression(parser)?;
    parser.consume(&Kind::ParenClose);

    let then_stmt = parse_statement(parser)?;

    let else_stmt = if parser.match_kind(&Kind::Else) {
        Some(parse_statement(parser)?)
    } else {
        None
    };

    Ok(parser.ast_builder.if_stmt(cond, then_stmt, else_stmt, Some(location)))
}

pub fn parse_while_statement(parser: &mut Parser) -> ParserResult<StmtRef> {
    let location = parser.current_location();
    parser.consume(&Kind::ParenOpen);
    let cond = parse_expression(parser)?;
    parser.consume(&Kind::ParenClose);

    let body = parse_statement(parser)?;

    Ok(parser.ast_builder.while_stmt(cond, body, Some(location)))
}

/// `for (init; cond; step) body` — each of the three clauses may be empty.
pub fn parse_for_statement(parser: &mut Parser) -> ParserResult<StmtRef> {
    let location = parser.current_location();
    parser.consume(&Kind::ParenOpen);

    let init = if parser.match_kind(&Kind::Semicolon) {
        None
    } else if parser.peek().map(|k| k.is_type_token()).unwrap_or(false) {
        Some(parser.parse_variable_declaration()?)
    } else {
        Some(parse_expression_statement(parser)?)
    };

    let cond = if parser.check(&Kind::Semicolon) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.consume(&Kind::Semicolon);

    let step = if parser.check(&Kind::ParenClose) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.consume(&Kind::ParenClose);

    let body = parse_statement(parser)?;

    Ok(parser.ast_builder.for_stmt(init, cond, step, body, Some(location)))
}

pub fn parse_do_while_statement(parser: &mut Parser) -> ParserResult<StmtRef> {
    let location = parser.current_location();
    let body = parse_statement(parser)?;

    parser.consume(&Kind::While);
    parser.consume(&Kind::ParenOpen);
    let cond = parse_expression(parser)?;
    parser.consume(&Kind::ParenClose);
    parser.consume(&Kind::Semicolon);

    Ok(parser.ast_builder.do_while_stmt(body, cond, Some(location)))
}

pub fn parse_switch_statement(parser: &mut Parser) -> ParserResult<StmtRef> {
    let location = parser.current_location();
    parser.consume(&Kind::ParenOpen);
    let scrutinee = parse_expression(parser)?;
    parser.consume(&Kind::ParenClose);
    parser.consume(&Kind::BraceOpen);

    let mut arms = Vec::new();
    while !parser.check(&Kind::BraceClose) && !parser.at_end() {
        if parser.match_kind(&Kind::Case) {
            let case_location = parser.current_location();
            let value = parse_expression(parser)?;
            parser.consume(&Kind::Colon);
            let body = parse_case_body(parser)?;
            arms.push(parser.ast_builder.case_stmt(value, body, Some(case_location)));
        } else if parser.match_kind(&Kind::Default) {
            let default_location = parser.current_location();
            parser.consume(&Kind::Colon);
            let body = parse_case_body(parser)?;
            arms.push(parser.ast_builder.default_stmt(body, Some(default_location)));
        } else {
            let err = parser.error_here("Expected 'case' or 'default'".to_string());
            parser.synchronize();
            if arms.is_empty() {
                return Err(err);
            }
            break;
        }
    }

    parser.consume(&Kind::BraceClose);
    Ok(parser.ast_builder.switch_stmt(scrutinee, arms, Some(location)))
}

/// Statements of one case arm. A `break` ends the arm but stays part of
/// it so the emitter sees the jump.
fn parse_case_body(parser: &mut Parser) -> ParserResult<Vec<StmtRef>> {
    let mut body = Vec::new();

    while !parser.check(&Kind::Case)
        && !parser.check(&Kind::Default)
        && !parser.check(&Kind::BraceClose)
        && !parser.at_end()
    {
        let stmt = parse_statement(parser)?;
        let is_break = matches!(parser.ast_builder.stmt_pool().get(stmt.to_index()), Some(Stmt::Break));
        body.push(stmt);
        if is_break {
            break;
        }
    }

    Ok(body)
}

pub fn parse_return_statement(parser: &mut Parser) -> ParserResult<StmtRef> {
    let location = parser.current_location();

    let expr = if parser.check(&Kind::Semicolon) {
        None
    } else {
        Some(parse_expression(parser)?)
    };

    parser.consume(&Kind::Semicolon);
    Ok(parser.ast_builder.return_stmt(expr, Some(location)))
}

pub fn parse_expression_statement(parser: &mut Parser) -> ParserResult<StmtRef> {
    let location = parser.current_location();
    let expr = parse_expression(parser)?;
    parser.consume(&Kind::Semicolon);
    Ok(parser.ast_builder.expression_stmt(expr, Some(location)))
}
