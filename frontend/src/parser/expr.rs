use crate::ast::{AssignOp, BinOp, Expr, ExprRef, MemberOp, PostfixOp, UnaryOp};
use crate::token::Kind;

use super::core::Parser;
use super::error::ParserResult;

/// One precedence level of left-associative binary operators plus the
/// production that binds tighter.
pub struct OperatorGroup<'a> {
    tokens: Vec<(Kind, BinOp)>,
    next_precedence: fn(&mut Parser<'a>) -> ParserResult<ExprRef>,
}

pub fn parse_expression(parser: &mut Parser) -> ParserResult<ExprRef> {
    parse_assignment(parser)
}

/// Assignment is right-associative and the loosest-binding level.
pub fn parse_assignment(parser: &mut Parser) -> ParserResult<ExprRef> {
    let lhs = parse_ternary(parser)?;

    let op = match parser.peek() {
        Some(Kind::Assign) => Some(AssignOp::Assign),
        Some(Kind::PlusAssign) => Some(AssignOp::Add),
        Some(Kind::MinusAssign) => Some(AssignOp::Sub),
        Some(Kind::StarAssign) => Some(AssignOp::Mul),
        Some(Kind::SlashAssign) => Some(AssignOp::Div),
        Some(Kind::PercentAssign) => Some(AssignOp::Mod),
        _ => None,
    };

    if let Some(op) = op {
        let location = parser.current_location();
        parser.next();
        let rhs = parse_assignment(parser)?;
        return Ok(parser.ast_builder.assign_expr(op, lhs, rhs, Some(location)));
    }

    Ok(lhs)
}

pub fn parse_ternary(parser: &mut Parser) -> ParserResult<ExprRef> {
    let cond = parse_logical_or(parser)?;

    if parser.check(&Kind::Question) {
        let location = parser.current_location();
        parser.next();
        let then_expr = parse_expression(parser)?;
        parser.consume(&Kind::Colon);
        let else_expr = parse_ternary(parser)?;
        return Ok(parser.ast_builder.ternary_expr(cond, then_expr, else_expr, Some(location)));
    }

    Ok(cond)
}

fn parse_binary<'a>(parser: &mut Parser<'a>, group: &OperatorGroup<'a>) -> ParserResult<ExprRef> {
    let mut lhs = (group.next_precedence)(parser)?;

    loop {
        let matched = group.tokens.iter().find(|(kind, _)| parser.peek() == Some(kind)).map(|(_, op)| *op);
        match matched {
            Some(op) => {
                let location = parser.current_location();
                parser.next();
                let rhs = (group.next_precedence)(parser)?;
                lhs = parser.ast_builder.binary_expr(op, lhs, rhs, Some(location));
            }
            None => return Ok(lhs),
        }
    }
}

pub fn parse_logical_or(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![(Kind::DoubleOr, BinOp::LogicalOr)],
        next_precedence: parse_logical_and,
    };
    parse_binary(parser, &group)
}

pub fn parse_logical_and(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![(Kind::DoubleAnd, BinOp::LogicalAnd)],
        next_precedence: parse_bitwise_or,
    };
    parse_binary(parser, &group)
}

pub fn parse_bitwise_or(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![(Kind::Pipe, BinOp::BitOr)],
        next_precedence: parse_bitwise_xor,
    };
    parse_binary(parser, &group)
}

pub fn parse_bitwise_xor(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![(Kind::Caret, BinOp::BitXor)],
        next_precedence: parse_bitwise_and,
    };
    parse_binary(parser, &group)
}

pub fn parse_bitwise_and(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![(Kind::Amp, BinOp::BitAnd)],
        next_precedence: parse_equality,
    };
    parse_binary(parser, &group)
}

pub fn parse_equality(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![(Kind::DoubleEqual, BinOp::EQ), (Kind::NotEqual, BinOp::NE)],
        next_precedence: parse_relational,
    };
    parse_binary(parser, &group)
}

pub fn parse_relational(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![
            (Kind::LT, BinOp::LT),
            (Kind::GT, BinOp::GT),
            (Kind::LE, BinOp::LE),
            (Kind::GE, BinOp::GE),
        ],
        next_precedence: parse_shift,
    };
    parse_binary(parser, &group)
}

pub fn parse_shift(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![(Kind::ShiftLeft, BinOp::ShiftLeft), (Kind::ShiftRight, BinOp::ShiftRight)],
        next_precedence: parse_additive,
    };
    parse_binary(parser, &group)
}

pub fn parse_additive(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![(Kind::Plus, BinOp::Add), (Kind::Minus, BinOp::Sub)],
        next_precedence: parse_multiplicative,
    };
    parse_binary(parser, &group)
}

pub fn parse_multiplicative(parser: &mut Parser) -> ParserResult<ExprRef> {
    let group = OperatorGroup {
        tokens: vec![
            (Kind::Star, BinOp::Mul),
            (Kind::Slash, BinOp::Div),
            (Kind::Percent, BinOp::Mod),
        ],
        next_precedence: parse_unary,
    };
    parse_binary(parser, &group)
}

pub fn parse_unary(parser: &mut Parser) -> ParserResult<ExprRef> {
    let op = match parser.peek() {
        Some(Kind::Exclamation) => Some(UnaryOp::LogicalNot),
        Some(Kind::Tilde) => Some(UnaryOp::BitNot),
        Some(Kind::Minus) => Some(UnaryOp::Neg),
        Some(Kind::Plus) => Some(UnaryOp::Plus),
        Some(Kind::Star) => Some(UnaryOp::Deref),
        Some(Kind::Amp) => Some(UnaryOp::AddrOf),
        Some(Kind::Increment) => Some(UnaryOp::PreIncrement),
        Some(Kind::Decrement) => Some(UnaryOp::PreDecrement),
        _ => None,
    };

    if let Some(op) = op {
        let location = parser.current_location();
        parser.next();
        let operand = parse_unary(parser)?;
        return Ok(parser.ast_builder.unary_expr(op, operand, Some(location)));
    }

    if parser.check(&Kind::Sizeof) {
        let location = parser.current_location();
        parser.next();
        parser.consume(&Kind::ParenOpen);
        let operand = parse_expression(parser)?;
        parser.consume(&Kind::ParenClose);
        return Ok(parser.ast_builder.sizeof_expr(operand, Some(location)));
    }

    parse_postfix(parser)
}

pub fn parse_postfix(parser: &mut Parser) -> ParserResult<ExprRef> {
    let mut expr = parse_primary(parser)?;

    loop {
        match parser.peek() {
            Some(Kind::BracketOpen) => {
                let location = parser.current_location();
                parser.next();
                let index = parse_expression(parser)?;
                parser.consume(&Kind::BracketClose);
                expr = parser.ast_builder.array_access_expr(expr, index, Some(location));
            }
            Some(Kind::ParenOpen) => {
                // Only direct calls through a name are supported; the
                // callee identifier becomes the call's symbol.
                let callee = match parser.ast_builder.expr_pool().get(expr.to_index()) {
                    Some(Expr::Identifier(sym)) => *sym,
                    _ => {
                        return Err(parser.error_here("called expression is not a function name".to_string()));
                    }
                };
                let location = parser.current_location();
                parser.next();
                let args = parse_argument_list(parser)?;
                parser.consume(&Kind::ParenClose);
                expr = parser.ast_builder.call_expr(callee, args, Some(location));
            }
            Some(Kind::Dot) | Some(Kind::Arrow) => {
                let op = if parser.check(&Kind::Dot) { MemberOp::Dot } else { MemberOp::Arrow };
                let location = parser.current_location();
                parser.next();
                let member = parser.expect_identifier("member")?;
                expr = parser.ast_builder.member_access_expr(expr, member, op, Some(location));
            }
            Some(Kind::Increment) => {
                let location = parser.current_location();
                parser.next();
                expr = parser.ast_builder.postfix_expr(PostfixOp::Increment, expr, Some(location));
            }
            Some(Kind::Decrement) => {
                let location = parser.current_location();
                parser.next();
                expr = parser.ast_builder.postfix_expr(PostfixOp::Decrement, expr, Some(location));
            }
            _ => break,
        }
    }

    Ok(expr)
}

fn parse_argument_list(parser: &mut Parser) -> ParserResult<Vec<ExprRef>> {
    let mut args = Vec::new();
    if parser.check(&Kind::ParenClose) {
        return Ok(args);
    }

    loop {
        args.push(parse_expression(parser)?);
        if !parser.match_kind(&Kind::Comma) {
            break;
        }
    }

    Ok(args)
}

pub fn parse_primary(parser: &mut Parser) -> ParserResult<ExprRef> {
    let location = parser.current_location();

    match parser.peek() {
        Some(Kind::True) => {
            parser.next();
            Ok(parser.ast_builder.bool_expr(true, Some(location)))
        }
        Some(Kind::False) => {
            parser.next();
            Ok(parser.ast_builder.bool_expr(false, Some(location)))
        }
        Some(Kind::Null) => {
            parser.next();
            Ok(parser.ast_builder.null_expr(Some(location)))
        }
        Some(&Kind::Number(value)) => {
            parser.next();
            Ok(parser.ast_builder.number_expr(value, Some(location)))
        }
        Some(&Kind::Float(value)) => {
            parser.next();
            Ok(parser.ast_builder.float_expr(value, Some(location)))
        }
        Some(Kind::Str(value)) => {
            let value = value.clone();
            parser.next();
            let sym = parser.intern(&value);
            Ok(parser.ast_builder.string_expr(sym, Some(location)))
        }
        Some(&Kind::Char(value)) => {
            parser.next();
            Ok(parser.ast_builder.char_expr(value, Some(location)))
        }
        Some(Kind::Identifier(name)) => {
            let name = name.clone();
            parser.next();
            let sym = parser.intern(&name);
            Ok(parser.ast_builder.identifier_expr(sym, Some(location)))
        }
        Some(Kind::ParenOpen) => {
            parser.next();
            let expr = parse_expression(parser)?;
            parser.consume(&Kind::ParenClose);
            Ok(expr)
        }
        Some(&Kind::Invalid(c)) => {
            let err = super::error::ParserError::invalid_token(location, c.to_string());
            Err(parser.report(err))
        }
        _ => Err(parser.error_here("Expected expression".to_string())),
    }
}
