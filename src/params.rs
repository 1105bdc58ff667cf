//! Typed rule parameters.
//!
//! Rules declare an ordered list of [`Parameter`]s. Callers hand over one [`ParamInput`]
//! per declared parameter, in the same order, and [`parse_inputs`] turns them into
//! [`ParamValues`]. Rules never see raw text.

use crate::error::ParseError;
use anyhow::{anyhow, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Number,
    Text,
    Bool,
    Choice(Vec<String>),
}

impl ParamKind {
    pub fn label(&self) -> &'static str {
        match self {
            ParamKind::Number => "number",
            ParamKind::Text => "text",
            ParamKind::Bool => "bool",
            ParamKind::Choice(_) => "choice",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    default: String,
}

impl Parameter {
    pub fn number(name: impl Into<String>, default: f64) -> Self {
        Self { name: name.into(), kind: ParamKind::Number, default: default.to_string() }
    }

    pub fn text(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self { name: name.into(), kind: ParamKind::Text, default: default.into() }
    }

    pub fn flag(name: impl Into<String>, default: bool) -> Self {
        Self { name: name.into(), kind: ParamKind::Bool, default: default.to_string() }
    }

    pub fn choice<S: Into<String>>(name: impl Into<String>, options: impl IntoIterator<Item = S>, default: usize) -> Self {
        let options = options.into_iter().map(Into::into).collect();
        Self { name: name.into(), kind: ParamKind::Choice(options), default: default.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    /// Raw text a UI should pre-fill.
    pub fn default_text(&self) -> &str {
        &self.default
    }

    pub fn default_input(&self) -> ParamInput {
        ParamInput::Text(self.default.clone())
    }

    pub fn parse(&self, raw: &str) -> Result<ParamValue, ParseError> {
        match &self.kind {
            ParamKind::Number => match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(ParamValue::Number(value)),
                _ => Err(ParseError::InvalidNumber { param: self.name.clone(), raw: raw.to_string() }),
            },
            ParamKind::Text => Ok(ParamValue::Text(raw.to_string())),
            ParamKind::Bool => parse_bool(raw)
                .map(ParamValue::Bool)
                .ok_or_else(|| ParseError::InvalidBool { param: self.name.clone(), raw: raw.to_string() }),
            ParamKind::Choice(options) => {
                let index = raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidChoice { param: self.name.clone(), raw: raw.to_string() })?;
                if index >= options.len() {
                    return Err(ParseError::ChoiceOutOfRange {
                        param: self.name.clone(),
                        index,
                        options: options.len(),
                    });
                }
                Ok(ParamValue::Choice(index))
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Choice(usize),
    Null,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(value) => write!(f, "{value}"),
            ParamValue::Text(value) => write!(f, "{value:?}"),
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Choice(index) => write!(f, "option {index}"),
            ParamValue::Null => f.write_str("null"),
        }
    }
}

/// One raw value as produced by an editor widget.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamInput {
    /// Free text from an input field.
    Text(String),
    /// Selected index of a dropdown.
    Choice(usize),
    /// State of a toggle.
    Toggle(bool),
    /// A widget the checker does not know how to read.
    Unsupported,
}

impl From<&str> for ParamInput {
    fn from(value: &str) -> Self {
        ParamInput::Text(value.to_string())
    }
}

impl From<String> for ParamInput {
    fn from(value: String) -> Self {
        ParamInput::Text(value)
    }
}

/// Parse `inputs` positionally against `params`.
///
/// Choice and toggle widgets are rendered to text and parsed by the declared parameter,
/// so a toggle wired to a number parameter still fails loudly. Unsupported widgets yield
/// [`ParamValue::Null`] instead of failing the batch.
pub fn parse_inputs(params: &[Parameter], inputs: &[ParamInput]) -> Result<ParamValues, ParseError> {
    if params.len() != inputs.len() {
        return Err(ParseError::ArityMismatch { expected: params.len(), actual: inputs.len() });
    }
    let values = params
        .iter()
        .zip(inputs)
        .map(|(param, input)| match input {
            ParamInput::Text(raw) => param.parse(raw),
            ParamInput::Choice(index) => param.parse(&index.to_string()),
            ParamInput::Toggle(on) => param.parse(&on.to_string()),
            ParamInput::Unsupported => Ok(ParamValue::Null),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParamValues(values))
}

/// Parsed values, positionally aligned with a rule's declared parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamValues(Vec<ParamValue>);

impl ParamValues {
    pub fn new(values: Vec<ParamValue>) -> Self {
        Self(values)
    }

    pub fn get(&self, index: usize) -> Option<&ParamValue> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn number(&self, index: usize) -> Result<f64> {
        match self.get(index) {
            Some(ParamValue::Number(value)) => Ok(*value),
            other => Err(mismatch(index, "number", other)),
        }
    }

    /// Text value; a null value reads as empty text.
    pub fn text(&self, index: usize) -> Result<&str> {
        match self.get(index) {
            Some(ParamValue::Text(value)) => Ok(value),
            Some(ParamValue::Null) => Ok(""),
            other => Err(mismatch(index, "text", other)),
        }
    }

    pub fn flag(&self, index: usize) -> Result<bool> {
        match self.get(index) {
            Some(ParamValue::Bool(value)) => Ok(*value),
            other => Err(mismatch(index, "bool", other)),
        }
    }

    pub fn choice(&self, index: usize) -> Result<usize> {
        match self.get(index) {
            Some(ParamValue::Choice(value)) => Ok(*value),
            other => Err(mismatch(index, "choice", other)),
        }
    }
}

fn mismatch(index: usize, expected: &str, found: Option<&ParamValue>) -> anyhow::Error {
    match found {
        Some(value) => anyhow!("parameter {index} should be a {expected}, found {value}"),
        None => anyhow!("parameter {index} is missing (expected a {expected})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_must_be_finite_decimals() {
        let param = Parameter::number("Tolerance", 0.01);
        assert_eq!(param.parse(" 0.25 "), Ok(ParamValue::Number(0.25)));
        assert_eq!(param.parse("-3"), Ok(ParamValue::Number(-3.0)));
        for raw in ["abc", "", "NaN", "inf"] {
            assert!(matches!(param.parse(raw), Err(ParseError::InvalidNumber { .. })), "{raw} should fail");
        }
    }

    #[test]
    fn booleans_are_case_insensitive() {
        let param = Parameter::flag("Include bombs", true);
        assert_eq!(param.parse("TRUE"), Ok(ParamValue::Bool(true)));
        assert_eq!(param.parse("False"), Ok(ParamValue::Bool(false)));
        assert_eq!(param.parse("off"), Ok(ParamValue::Bool(false)));
        assert!(matches!(param.parse("maybe"), Err(ParseError::InvalidBool { .. })));
    }

    #[test]
    fn text_is_passed_through_unchanged() {
        let param = Parameter::text("Positions", "");
        assert_eq!(param.parse(""), Ok(ParamValue::Text(String::new())));
        assert_eq!(param.parse("  1:0 "), Ok(ParamValue::Text("  1:0 ".into())));
    }

    #[test]
    fn choice_is_an_index_into_options() {
        let param = Parameter::choice("Mode", ["Ignore", "Warn", "Block"], 1);
        assert_eq!(param.default_text(), "1");
        assert_eq!(param.parse("2"), Ok(ParamValue::Choice(2)));
        assert!(matches!(param.parse("3"), Err(ParseError::ChoiceOutOfRange { index: 3, options: 3, .. })));
        assert!(matches!(param.parse("Warn"), Err(ParseError::InvalidChoice { .. })));
    }

    #[test]
    fn inputs_are_parsed_positionally() {
        let params = vec![
            Parameter::number("Window", 0.5),
            Parameter::choice("Mode", ["A", "B"], 0),
            Parameter::flag("Bombs", false),
            Parameter::text("Notes", ""),
        ];
        let inputs = vec![
            ParamInput::from("1.5"),
            ParamInput::Choice(1),
            ParamInput::Toggle(true),
            ParamInput::Unsupported,
        ];
        let values = parse_inputs(&params, &inputs).expect("inputs parse");
        assert_eq!(values.number(0).unwrap(), 1.5);
        assert_eq!(values.choice(1).unwrap(), 1);
        assert!(values.flag(2).unwrap());
        assert_eq!(values.get(3), Some(&ParamValue::Null));
        assert_eq!(values.text(3).unwrap(), "");
    }

    #[test]
    fn count_mismatch_is_a_parse_error() {
        let params = vec![Parameter::number("Window", 0.5)];
        let err = parse_inputs(&params, &[]).unwrap_err();
        assert_eq!(err, ParseError::ArityMismatch { expected: 1, actual: 0 });
    }

    #[test]
    fn toggle_against_number_fails() {
        let params = vec![Parameter::number("Window", 0.5)];
        let err = parse_inputs(&params, &[ParamInput::Toggle(true)]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { .. }));
    }

    #[test]
    fn typed_accessors_reject_wrong_kinds() {
        let values = ParamValues::new(vec![ParamValue::Text("x".into())]);
        assert!(values.number(0).is_err());
        assert!(values.flag(5).unwrap_err().to_string().contains("missing"));
    }
}
