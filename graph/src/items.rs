//! Parses `consumes` / `produces` item lists.
//!
//! Three spellings are accepted and may be mixed line by line:
//!
//! ```text
//! Apples Blackberries                      # bare names (whole block)
//! IronOre = 0.2 kg {comment: "hello"}      # name = amount unit {data}
//! {object: IronOre, amount: 0.2, unit: kg} # structured record
//! ```
//!
//! Structured data is a YAML flow mapping, so both JSON and unquoted keys
//! work. Amounts that are not plain numbers are kept as expressions and
//! evaluated later by [`expand_amounts`] against the declaration's `defs`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::expr;

/// An item amount before or after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    /// A literal or evaluated number.
    Number(f64),
    /// An arithmetic expression still to be evaluated.
    Expr(String),
}

impl Amount {
    fn from_text(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(n) => Amount::Number(n),
            Err(_) => Amount::Expr(text.trim().to_string()),
        }
    }

    /// Returns the number if the amount has been evaluated.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amount::Number(n) => Some(*n),
            Amount::Expr(_) => None,
        }
    }
}

/// One consumed or produced item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    /// Object name as written (resolved to a URI by the caller).
    pub object: String,
    /// Optional amount.
    pub amount: Option<Amount>,
    /// Optional unit symbol.
    pub unit: Option<String>,
    /// Any other structured fields.
    pub extra: BTreeMap<String, Value>,
}

impl Item {
    /// Creates an item with only an object name.
    pub fn named(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            ..Self::default()
        }
    }
}

/// Splits a whitespace-separated token list (`composed_of`, `equivalent`).
#[must_use]
pub fn parse_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Parses an item block.
///
/// # Errors
///
/// Returns [`GraphError::ItemSyntax`] for a line matching none of the forms.
pub fn parse_items(text: &str) -> Result<Vec<Item>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if !lines.iter().any(|l| l.contains('=') || l.contains('{')) {
        return Ok(parse_tokens(text).into_iter().map(Item::named).collect());
    }

    lines.into_iter().map(parse_line).collect()
}

fn parse_line(line: &str) -> Result<Item> {
    let (head, data) = match line.find('{') {
        Some(i) => (line[..i].trim(), Some(line[i..].trim())),
        None => (line, None),
    };

    let mut item = Item::default();
    if !head.is_empty() {
        parse_head(line, head, &mut item)?;
    }
    if let Some(data) = data {
        merge_structured(line, data, &mut item)?;
    }
    if item.object.is_empty() {
        return Err(GraphError::item(line, "no object name"));
    }
    Ok(item)
}

/// `name [= amount [unit]]`
fn parse_head(line: &str, head: &str, item: &mut Item) -> Result<()> {
    let (name, rest) = match head.split_once('=') {
        Some((name, rest)) => (name.trim(), Some(rest.trim())),
        None => (head, None),
    };
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(GraphError::item(line, "expected a single object name"));
    }
    item.object = name.to_string();

    let Some(rest) = rest else {
        return Ok(());
    };
    let (amount, after) = if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted
            .find('"')
            .ok_or_else(|| GraphError::item(line, "unterminated quoted amount"))?;
        (Amount::Expr(quoted[..end].to_string()), quoted[end + 1..].trim())
    } else {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let token = parts.next().unwrap_or_default();
        if token.is_empty() {
            return Err(GraphError::item(line, "expected an amount after '='"));
        }
        (Amount::from_text(token), parts.next().unwrap_or_default().trim())
    };
    item.amount = Some(amount);

    let mut units = after.split_whitespace();
    if let Some(unit) = units.next() {
        item.unit = Some(unit.to_string());
    }
    if units.next().is_some() {
        return Err(GraphError::item(line, "unexpected text after unit"));
    }
    Ok(())
}

fn merge_structured(line: &str, data: &str, item: &mut Item) -> Result<()> {
    let value: Value = serde_yaml::from_str(data)
        .map_err(|e| GraphError::item(line, format!("bad structured data: {e}")))?;
    let Value::Object(map) = value else {
        return Err(GraphError::item(line, "structured data must be a mapping"));
    };

    for (key, value) in map {
        match key.as_str() {
            "object" => {
                if !item.object.is_empty() {
                    return Err(GraphError::item(line, "object given twice"));
                }
                item.object = value_to_string(line, "object", &value)?;
            }
            "amount" => {
                if item.amount.is_some() {
                    return Err(GraphError::item(line, "amount given twice"));
                }
                item.amount = Some(match &value {
                    Value::Number(n) => Amount::Number(
                        n.as_f64()
                            .ok_or_else(|| GraphError::item(line, "amount out of range"))?,
                    ),
                    Value::String(s) => Amount::from_text(s),
                    _ => return Err(GraphError::item(line, "amount must be a number or string")),
                });
            }
            "unit" => {
                if item.unit.is_some() {
                    return Err(GraphError::item(line, "unit given twice"));
                }
                item.unit = Some(value_to_string(line, "unit", &value)?);
            }
            _ => {
                item.extra.insert(key, value);
            }
        }
    }
    Ok(())
}

fn value_to_string(line: &str, key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(GraphError::item(line, format!("{key} must be a string"))),
    }
}

/// Evaluates `defs`, then replaces every expression amount with its value.
///
/// # Errors
///
/// Propagates [`GraphError::UndefinedName`] and
/// [`GraphError::ExpressionSyntax`] from the evaluator.
pub fn expand_amounts(defs: &str, items: Vec<Item>) -> Result<Vec<Item>> {
    let scope = expr::evaluate_defs(defs)?;
    items
        .into_iter()
        .map(|mut item| {
            if let Some(Amount::Expr(source)) = &item.amount {
                item.amount = Some(Amount::Number(expr::evaluate(source, &scope)?));
            }
            Ok(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iron_ore() -> Item {
        Item {
            object: "IronOre".into(),
            amount: Some(Amount::Number(0.2)),
            unit: Some("kg".into()),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn tokens() {
        assert_eq!(parse_tokens("Child"), vec!["Child"]);
        assert_eq!(parse_tokens("Child1  Child2 "), vec!["Child1", "Child2"]);
    }

    #[test]
    fn simple_name_list() {
        assert_eq!(
            parse_items("ObjectA ObjectB").unwrap(),
            vec![Item::named("ObjectA"), Item::named("ObjectB")]
        );
    }

    #[test]
    fn all_forms_agree() {
        let text = r#"
            IronOre = 0.2 kg
            IronOre = 0.2 {"unit": "kg"}
            IronOre {"amount": 0.2, "unit": "kg"}
            {"object": "IronOre", "amount": 0.2, "unit": "kg"}
        "#;
        let parsed = parse_items(text).unwrap();
        assert_eq!(parsed.len(), 4);
        for item in parsed {
            assert_eq!(item, iron_ore());
        }
    }

    #[test]
    fn extra_fields_are_kept() {
        let parsed = parse_items(r#"IronOre = 0.2 kg {comment: "hello"}"#).unwrap();
        let mut expected = iron_ore();
        expected
            .extra
            .insert("comment".into(), Value::String("hello".into()));
        assert_eq!(parsed, vec![expected]);
    }

    #[test]
    fn non_numeric_amounts_are_expressions() {
        let parsed = parse_items("Output = k*0.5 -\nOther = \"2 * x\" kg").unwrap();
        assert_eq!(parsed[0].amount, Some(Amount::Expr("k*0.5".into())));
        assert_eq!(parsed[0].unit.as_deref(), Some("-"));
        assert_eq!(parsed[1].amount, Some(Amount::Expr("2 * x".into())));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_items("Two Names = 1").is_err());
        assert!(parse_items("A = 1 kg extra").is_err());
        assert!(parse_items("A = 1 {amount: 2}").is_err());
        assert!(parse_items("{amount: 2}").is_err());
        assert!(parse_items("A {not closed").is_err());
    }

    #[test]
    fn expand_literal_expression() {
        let item = Item {
            amount: Some(Amount::Expr("2 * 0.1".into())),
            ..iron_ore()
        };
        assert_eq!(expand_amounts("", vec![item]).unwrap(), vec![iron_ore()]);
    }

    #[test]
    fn expand_with_defs() {
        let item = Item {
            amount: Some(Amount::Expr("k * 0.1".into())),
            ..iron_ore()
        };
        let expanded = expand_amounts("a = 1\nb = 2\nk = a * b", vec![item]).unwrap();
        assert_eq!(expanded, vec![iron_ore()]);
    }

    #[test]
    fn expand_failures() {
        let item = Item {
            amount: Some(Amount::Expr("k * 0.1".into())),
            ..iron_ore()
        };
        assert_eq!(
            expand_amounts("", vec![item.clone()]).unwrap_err(),
            GraphError::UndefinedName("k".into())
        );
        let bad = Item {
            amount: Some(Amount::Expr("k * ".into())),
            ..iron_ore()
        };
        assert!(matches!(
            expand_amounts("", vec![bad]),
            Err(GraphError::ExpressionSyntax { .. })
        ));
        assert!(expand_amounts("del options", vec![item]).is_err());
    }
}
