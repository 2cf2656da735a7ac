//! Formatted output and input
//!
//! Pure rendering of `printf` templates against evaluated arguments and
//! tokenizing of `scanf` input. The interpreter evaluates arguments and binds
//! scanned values; this module never touches the environment, which keeps the
//! conversion rules testable on their own.
//!
//! # Output conversions
//!
//! `%d %i %u %c %f %e %x %p %%` with flags `-` and `0`, a field width and a
//! precision (`%5d`, `%-3d`, `%.2f`, `%08.3f`). Length modifiers `l`, `ll`,
//! `h` and `hh` are accepted and ignored, so `%lf` is `%f`.
//!
//! # Input conversions
//!
//! `%d %i %u %f %c` (with the same ignored length modifiers). Input is consumed
//! in whitespace-delimited tokens; `%c` takes the next non-whitespace
//! character. Literal text in an input template is ignored.

use crate::memory::value::Value;
use thiserror::Error;

/// A template or argument list that does not fit together
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FormatError {
    pub message: String,
}

impl FormatError {
    fn new(message: impl Into<String>) -> Self {
        FormatError {
            message: message.into(),
        }
    }
}

/// Conversion character of one directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Int,      // %d %i
    Unsigned, // %u
    Hex,      // %x
    Char,     // %c
    Float,    // %f
    Exp,      // %e
    Pointer,  // %p
}

/// One parsed `%` directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Directive {
    left_align: bool,
    zero_pad: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

/// Piece of a template: literal text or a directive
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Directive(Directive),
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits.parse().ok()
}

/// Split a template into text and directives
fn parse_template(template: &str) -> Result<Vec<Segment>, FormatError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            text.push(ch);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            text.push('%');
            continue;
        }

        let mut directive = Directive {
            left_align: false,
            zero_pad: false,
            width: None,
            precision: None,
            conversion: Conversion::Int,
        };

        while let Some(flag) = chars.peek().copied() {
            match flag {
                '-' => directive.left_align = true,
                '0' => directive.zero_pad = true,
                _ => break,
            }
            chars.next();
        }

        directive.width = read_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            directive.precision = Some(read_number(&mut chars).unwrap_or(0));
        }

        while matches!(chars.peek(), Some('l') | Some('h')) {
            chars.next();
        }

        directive.conversion = match chars.next() {
            Some('d') | Some('i') => Conversion::Int,
            Some('u') => Conversion::Unsigned,
            Some('x') => Conversion::Hex,
            Some('c') => Conversion::Char,
            Some('f') => Conversion::Float,
            Some('e') => Conversion::Exp,
            Some('p') => Conversion::Pointer,
            Some(other) => {
                return Err(FormatError::new(format!(
                    "unsupported conversion '%{}'",
                    other
                )))
            }
            None => return Err(FormatError::new("format ends in the middle of a directive")),
        };

        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text)));
        }
        segments.push(Segment::Directive(directive));
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Render a `printf` template against its arguments
pub fn format_output(template: &str, args: &[Value]) -> Result<String, FormatError> {
    let segments = parse_template(template)?;
    let wanted = segments
        .iter()
        .filter(|s| matches!(s, Segment::Directive(_)))
        .count();
    if wanted != args.len() {
        return Err(FormatError::new(format!(
            "format expects {} argument(s) but {} given",
            wanted,
            args.len()
        )));
    }

    let mut output = String::new();
    let mut args = args.iter();
    for segment in segments {
        match segment {
            Segment::Text(text) => output.push_str(&text),
            Segment::Directive(directive) => {
                let arg = args.next().copied().unwrap_or_default();
                output.push_str(&render(&directive, arg)?);
            }
        }
    }
    Ok(output)
}

fn mismatch(directive: &Directive, arg: Value) -> FormatError {
    let wanted = match directive.conversion {
        Conversion::Int | Conversion::Unsigned | Conversion::Hex => "an integer",
        Conversion::Char => "a character",
        Conversion::Float | Conversion::Exp => "a floating value",
        Conversion::Pointer => "a pointer",
    };
    FormatError::new(format!(
        "{:?} conversion expects {}, found {}",
        directive.conversion,
        wanted,
        arg.type_name()
    ))
}

/// Render one directive, including padding
fn render(directive: &Directive, arg: Value) -> Result<String, FormatError> {
    let body = match (directive.conversion, arg) {
        (Conversion::Int, v) => {
            let n = v.as_int().ok_or_else(|| mismatch(directive, arg))?;
            with_min_digits(n.to_string(), directive.precision)
        }
        (Conversion::Unsigned, v) => {
            let n = v.as_int().ok_or_else(|| mismatch(directive, arg))?;
            with_min_digits((n as u32).to_string(), directive.precision)
        }
        (Conversion::Hex, v) => {
            let n = v.as_int().ok_or_else(|| mismatch(directive, arg))?;
            with_min_digits(format!("{:x}", n as u32), directive.precision)
        }
        (Conversion::Char, v) => {
            let n = v.as_int().ok_or_else(|| mismatch(directive, arg))?;
            ((n as u8) as char).to_string()
        }
        (Conversion::Float, Value::Float(x)) => fixed(x, directive.precision.unwrap_or(6)),
        (Conversion::Exp, Value::Float(x)) => scientific(x, directive.precision.unwrap_or(6)),
        (Conversion::Pointer, Value::Address(0)) => "(nil)".to_string(),
        (Conversion::Pointer, Value::Address(addr)) => format!("0x{:x}", addr),
        _ => return Err(mismatch(directive, arg)),
    };

    Ok(pad(directive, body))
}

/// Integer precision: minimum digit count, zero-extended after the sign
fn with_min_digits(digits: String, precision: Option<usize>) -> String {
    let Some(min) = precision else {
        return digits;
    };
    let (sign, magnitude) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };
    if magnitude.len() >= min {
        return digits;
    }
    format!("{}{}{}", sign, "0".repeat(min - magnitude.len()), magnitude)
}

fn non_finite(x: f64) -> Option<String> {
    if x.is_nan() {
        Some("nan".to_string())
    } else if x.is_infinite() {
        Some(if x > 0.0 { "inf" } else { "-inf" }.to_string())
    } else {
        None
    }
}

fn fixed(x: f64, precision: usize) -> String {
    non_finite(x).unwrap_or_else(|| format!("{:.*}", precision, x))
}

/// C-style `%e`: mantissa, then `e`, sign and at least two exponent digits
fn scientific(x: f64, precision: usize) -> String {
    if let Some(text) = non_finite(x) {
        return text;
    }
    let rust = format!("{:.*e}", precision, x);
    match rust.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(rest) => ('-', rest),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => rust,
    }
}

fn pad(directive: &Directive, body: String) -> String {
    let width = directive.width.unwrap_or(0);
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;

    if directive.left_align {
        return format!("{}{}", body, " ".repeat(fill));
    }

    let numeric = !matches!(directive.conversion, Conversion::Char | Conversion::Pointer);
    // C ignores the 0 flag for integers with an explicit precision
    let int_with_precision = matches!(
        directive.conversion,
        Conversion::Int | Conversion::Unsigned | Conversion::Hex
    ) && directive.precision.is_some();
    let finite = !body.ends_with("inf") && !body.ends_with("nan");

    if directive.zero_pad && numeric && !int_with_precision && finite {
        let (sign, rest) = match body.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", body.as_str()),
        };
        return format!("{}{}{}", sign, "0".repeat(fill), rest);
    }

    format!("{}{}", " ".repeat(fill), body)
}

/// Remaining stdin text for `scanf`
#[derive(Debug, Clone)]
pub struct InputBuffer {
    chars: Vec<char>,
    position: usize,
}

/// Values produced by one `scanf` call, in directive order
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub values: Vec<Value>,
    /// Input ran out before the first conversion could be attempted
    pub exhausted: bool,
}

impl ScanOutcome {
    /// What the `scanf` call evaluates to: the number of bound conversions,
    /// or -1 when input was already exhausted
    pub fn result(&self) -> i32 {
        if self.values.is_empty() && self.exhausted {
            -1
        } else {
            self.values.len() as i32
        }
    }
}

impl InputBuffer {
    pub fn new(input: &str) -> Self {
        InputBuffer {
            chars: input.chars().collect(),
            position: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.get(self.position).is_some_and(|c| c.is_whitespace()) {
            self.position += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    /// Next whitespace-delimited token, without consuming it
    fn peek_token(&self) -> (String, usize) {
        let end = self.chars[self.position..]
            .iter()
            .position(|c| c.is_whitespace())
            .map_or(self.chars.len(), |offset| self.position + offset);
        (self.chars[self.position..end].iter().collect(), end)
    }

    /// Unconsumed input
    pub fn remaining(&self) -> String {
        self.chars[self.position..].iter().collect()
    }

    /// Parse the directives of `template` and consume matching input
    pub fn scan(&mut self, template: &str) -> Result<(Vec<Conversion>, ScanOutcome), FormatError> {
        let conversions: Vec<Conversion> = parse_template(template)?
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Directive(d) => Some(d.conversion),
                Segment::Text(_) => None,
            })
            .collect();

        let mut values = Vec::new();
        let mut exhausted = false;

        for (i, conversion) in conversions.iter().enumerate() {
            self.skip_whitespace();
            if self.at_end() {
                exhausted = i == 0;
                break;
            }

            let scanned = match conversion {
                Conversion::Char => {
                    let c = self.chars[self.position];
                    self.position += 1;
                    Some(Value::Char(c as u32 as u8 as i8))
                }
                Conversion::Int | Conversion::Unsigned | Conversion::Hex => {
                    let (token, end) = self.peek_token();
                    let parsed = match conversion {
                        Conversion::Hex => {
                            let digits = token
                                .strip_prefix("0x")
                                .or_else(|| token.strip_prefix("0X"))
                                .unwrap_or(&token);
                            u32::from_str_radix(digits, 16).ok().map(|n| n as i32)
                        }
                        Conversion::Unsigned => token
                            .parse::<i64>()
                            .ok()
                            .filter(|n| *n >= i32::MIN as i64 && *n <= u32::MAX as i64)
                            .map(|n| n as i32),
                        _ => token.parse::<i32>().ok(),
                    };
                    parsed.map(|n| {
                        self.position = end;
                        Value::Int(n)
                    })
                }
                Conversion::Float | Conversion::Exp => {
                    let (token, end) = self.peek_token();
                    token.parse::<f64>().ok().map(|x| {
                        self.position = end;
                        Value::Float(x)
                    })
                }
                Conversion::Pointer => {
                    return Err(FormatError::new("'%p' cannot be used for input"));
                }
            };

            match scanned {
                Some(value) => values.push(value),
                None => break,
            }
        }

        Ok((conversions, ScanOutcome { values, exhausted }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_conversions() {
        let out = format_output(
            "%d %i %u %c %x %%\n",
            &[
                Value::Int(-5),
                Value::Int(7),
                Value::Int(-1),
                Value::Char(b'z' as i8),
                Value::Int(255),
            ],
        )
        .unwrap();
        assert_eq!(out, "-5 7 4294967295 z ff %\n");
    }

    #[test]
    fn test_width_precision_and_flags() {
        assert_eq!(format_output("[%5d]", &[Value::Int(42)]).unwrap(), "[   42]");
        assert_eq!(format_output("[%-3d]", &[Value::Int(7)]).unwrap(), "[7  ]");
        assert_eq!(format_output("[%05d]", &[Value::Int(-42)]).unwrap(), "[-0042]");
        assert_eq!(format_output("%.2f", &[Value::Float(3.14159)]).unwrap(), "3.14");
        assert_eq!(format_output("%08.3f", &[Value::Float(-2.5)]).unwrap(), "-002.500");
        assert_eq!(format_output("%lf", &[Value::Float(0.5)]).unwrap(), "0.500000");
        assert_eq!(format_output("%.3d", &[Value::Int(5)]).unwrap(), "005");
    }

    #[test]
    fn test_scientific_and_pointer() {
        assert_eq!(format_output("%e", &[Value::Float(12345.678)]).unwrap(), "1.234568e+04");
        assert_eq!(format_output("%.2e", &[Value::Float(0.00123)]).unwrap(), "1.23e-03");
        assert_eq!(format_output("%p", &[Value::Address(0x10)]).unwrap(), "0x10");
        assert_eq!(format_output("%p", &[Value::NULL]).unwrap(), "(nil)");
    }

    #[test]
    fn test_mismatches_are_errors() {
        assert!(format_output("%d", &[]).is_err());
        assert!(format_output("%d", &[Value::Int(1), Value::Int(2)]).is_err());
        assert!(format_output("%d", &[Value::Float(1.0)]).is_err());
        assert!(format_output("%f", &[Value::Int(1)]).is_err());
        assert!(format_output("%s", &[Value::Int(1)]).is_err());
        assert!(format_output("%d", &[Value::Undefined]).is_err());
    }

    #[test]
    fn test_scan_tokens_in_order() {
        let mut input = InputBuffer::new("  7\n-3 2.5 x");
        let (conversions, outcome) = input.scan("%d %d").unwrap();
        assert_eq!(conversions, vec![Conversion::Int, Conversion::Int]);
        assert_eq!(outcome.values, vec![Value::Int(7), Value::Int(-3)]);
        assert_eq!(outcome.result(), 2);

        let (_, outcome) = input.scan("%lf %c").unwrap();
        assert_eq!(outcome.values, vec![Value::Float(2.5), Value::Char(b'x' as i8)]);
    }

    #[test]
    fn test_failed_token_is_not_consumed() {
        let mut input = InputBuffer::new("abc 5");
        let (_, outcome) = input.scan("%d").unwrap();
        assert_eq!(outcome.result(), 0);
        assert_eq!(input.remaining(), "abc 5");
    }

    #[test]
    fn test_exhausted_input() {
        let mut input = InputBuffer::new("   ");
        let (_, outcome) = input.scan("%d").unwrap();
        assert_eq!(outcome.result(), -1);

        let mut input = InputBuffer::new("4");
        let (_, outcome) = input.scan("%d %d").unwrap();
        assert_eq!(outcome.result(), 1);
    }
}
