//! Pest parser for textual filter expressions.

use std::ops::Bound;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{Result, TickscanError};
use crate::filter::FilterExpr;
use crate::types::ScalarValue;

#[derive(Parser)]
#[grammar = "filter/grammar.pest"]
struct FilterParser;

/// Parses filter text into a filter set (implicitly AND-ed).
///
/// Empty or whitespace-only text yields an empty set.
///
/// # Errors
///
/// Returns a `ParseError` if the text is syntactically invalid.
pub fn parse_filters(text: &str) -> Result<Vec<FilterExpr>> {
    let mut pairs = FilterParser::parse(Rule::filters, text).map_err(|e| {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c))
            | pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        TickscanError::ParseError {
            line,
            col,
            message: e.variant.message().to_string(),
        }
    })?;

    let Some(filters) = pairs.next() else {
        return Ok(Vec::new());
    };
    for inner in filters.into_inner() {
        if inner.as_rule() == Rule::conjunction {
            return build_conjunction(inner);
        }
    }
    Ok(Vec::new())
}

fn build_conjunction(pair: Pair<Rule>) -> Result<Vec<FilterExpr>> {
    let mut exprs = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::predicate {
            exprs.push(build_predicate(inner)?);
        }
    }
    Ok(exprs)
}

fn build_predicate(pair: Pair<Rule>) -> Result<FilterExpr> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| parse_error("empty predicate"))?;
    match inner.as_rule() {
        Rule::comparison => build_comparison(inner),
        Rule::between => build_between(inner),
        Rule::membership => build_membership(inner),
        Rule::group => {
            let mut exprs = Vec::new();
            for conj in inner.into_inner() {
                if conj.as_rule() == Rule::conjunction {
                    exprs.extend(build_conjunction(conj)?);
                }
            }
            if exprs.len() == 1 {
                Ok(exprs.remove(0))
            } else {
                Ok(FilterExpr::And(exprs))
            }
        }
        _ => Err(parse_error("unknown predicate")),
    }
}

fn build_comparison(pair: Pair<Rule>) -> Result<FilterExpr> {
    let mut column = String::new();
    let mut op = "";
    let mut value = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => column = inner.as_str().to_string(),
            Rule::comp_op => op = inner.as_str(),
            Rule::literal => value = Some(build_literal(inner)?),
            _ => {}
        }
    }

    let value = value.ok_or_else(|| parse_error("comparison requires a literal"))?;
    Ok(match op {
        "=" | "==" => FilterExpr::eq(column, value),
        ">" => FilterExpr::gt(column, value),
        ">=" => FilterExpr::gt_eq(column, value),
        "<" => FilterExpr::lt(column, value),
        "<=" => FilterExpr::lt_eq(column, value),
        other => return Err(parse_error(&format!("unknown operator: {other}"))),
    })
}

fn build_between(pair: Pair<Rule>) -> Result<FilterExpr> {
    let mut column = String::new();
    let mut bounds = Vec::with_capacity(2);

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => column = inner.as_str().to_string(),
            Rule::literal => bounds.push(build_literal(inner)?),
            _ => {}
        }
    }

    let mut bounds = bounds.into_iter();
    match (bounds.next(), bounds.next()) {
        (Some(low), Some(high)) => Ok(FilterExpr::range(
            column,
            Bound::Included(low),
            Bound::Included(high),
        )),
        _ => Err(parse_error("BETWEEN requires two literals")),
    }
}

fn build_membership(pair: Pair<Rule>) -> Result<FilterExpr> {
    let mut column = String::new();
    let mut values = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => column = inner.as_str().to_string(),
            Rule::literal => values.push(build_literal(inner)?),
            _ => {}
        }
    }

    Ok(FilterExpr::In { column, values })
}

fn build_literal(pair: Pair<Rule>) -> Result<ScalarValue> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| parse_error("empty literal"))?;
    let text = inner.as_str();
    match inner.as_rule() {
        Rule::string_literal => Ok(ScalarValue::Utf8(
            text[1..text.len() - 1].replace("''", "'"),
        )),
        Rule::bool_literal => Ok(ScalarValue::Boolean(text.eq_ignore_ascii_case("true"))),
        Rule::float_literal => {
            let f: f64 = text
                .parse()
                .map_err(|_| parse_error(&format!("Invalid float: {text}")))?;
            if !f.is_finite() {
                return Err(parse_error(&format!("Invalid float: {text}")));
            }
            Ok(ScalarValue::Float64(f))
        }
        Rule::integer_literal => {
            if let Ok(n) = text.parse::<i64>() {
                Ok(ScalarValue::Int64(n))
            } else {
                text.parse::<u64>()
                    .map(ScalarValue::UInt64)
                    .map_err(|_| parse_error(&format!("Invalid integer: {text}")))
            }
        }
        _ => Err(parse_error("Invalid literal")),
    }
}

fn parse_error(message: &str) -> TickscanError {
    TickscanError::ParseError {
        line: 0,
        col: 0,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert!(parse_filters("").unwrap().is_empty());
        assert!(parse_filters("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_comparison() {
        assert_eq!(
            parse_filters("p > 15.0").unwrap(),
            vec![FilterExpr::gt("p", 15.0)]
        );
        assert_eq!(
            parse_filters("t == 2").unwrap(),
            vec![FilterExpr::eq("t", 2i64)]
        );
        assert_eq!(
            parse_filters("t<=-3").unwrap(),
            vec![FilterExpr::lt_eq("t", -3i64)]
        );
    }

    #[test]
    fn test_parse_conjunction() {
        let filters = parse_filters("bid_price >= 1.5 and ts_event < 100").unwrap();
        assert_eq!(
            filters,
            vec![
                FilterExpr::gt_eq("bid_price", 1.5),
                FilterExpr::lt("ts_event", 100i64),
            ]
        );
    }

    #[test]
    fn test_parse_between() {
        let filters = parse_filters("ts_event BETWEEN 10 AND 20 AND p > 1").unwrap();
        assert_eq!(
            filters,
            vec![
                FilterExpr::between("ts_event", 10i64, 20i64),
                FilterExpr::gt("p", 1i64),
            ]
        );
    }

    #[test]
    fn test_parse_membership() {
        let filters = parse_filters("venue IN ('XNAS', 'XNYS')").unwrap();
        assert_eq!(filters, vec![FilterExpr::is_in("venue", ["XNAS", "XNYS"])]);
    }

    #[test]
    fn test_parse_group() {
        let filters = parse_filters("(t > 1 AND t < 5) AND flag = true").unwrap();
        assert_eq!(
            filters,
            vec![
                FilterExpr::and(vec![FilterExpr::gt("t", 1i64), FilterExpr::lt("t", 5i64)]),
                FilterExpr::eq("flag", true),
            ]
        );
    }

    #[test]
    fn test_parse_identifier_with_keyword_prefix() {
        let filters = parse_filters("android = 1 AND index > 2").unwrap();
        assert_eq!(
            filters,
            vec![FilterExpr::eq("android", 1i64), FilterExpr::gt("index", 2i64)]
        );
    }

    #[test]
    fn test_parse_large_unsigned() {
        let filters = parse_filters("ts_init = 18446744073709551615").unwrap();
        assert_eq!(filters, vec![FilterExpr::eq("ts_init", u64::MAX)]);
    }

    #[test]
    fn test_parse_exponent() {
        assert_eq!(
            parse_filters("p < 1e3").unwrap(),
            vec![FilterExpr::lt("p", 1000.0)]
        );
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse_filters("p >").unwrap_err();
        match err {
            TickscanError::ParseError { line, col, .. } => {
                assert_eq!(line, 1);
                assert_eq!(col, 4);
            }
            other => panic!("Expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_dangling_and() {
        assert!(parse_filters("p > 1 AND").is_err());
        assert!(parse_filters("AND p > 1").is_err());
    }
    #[test]
    fn test_doubled_quote_escapes_quote() {
        let filters = parse_filters("venue = 'O''Brien' AND code IN ('''', 'a')").unwrap();
        assert_eq!(
            filters,
            vec![
                FilterExpr::eq("venue", "O'Brien"),
                FilterExpr::is_in("code", ["'", "a"]),
            ]
        );
        assert_eq!(filters[0].to_string(), "venue = 'O''Brien'");
        assert!(parse_filters("venue = 'O'Brien'").is_err());
    }
}
