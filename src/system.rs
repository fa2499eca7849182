use std::io::{self, BufRead, StdinLock, Stdout, Write};

use crate::eval::{EvalError, Functions, Resolver};

pub const BUILTINS: [(&str, fn(f64) -> f64); 4] = [
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("ln", f64::ln),
];

impl Functions {
    pub fn builtin() -> Self {
        let mut functions = Functions::new();
        for (name, function) in BUILTINS {
            functions.register(name, function);
        }
        functions
    }
}

/// Asks for missing variables on a line-oriented reader/writer pair.
pub struct Prompt<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> Prompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Prompt { reader, writer }
    }
}

impl Prompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Prompt::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Resolver for Prompt<R, W> {
    fn resolve(&mut self, name: &str) -> Result<Option<f64>, EvalError> {
        let failed = |message: String| EvalError::Resolve {
            name: name.to_string(),
            message,
        };

        writeln!(self.writer, "Enter value for variable {name}:").map_err(|e| failed(e.to_string()))?;
        self.writer.flush().map_err(|e| failed(e.to_string()))?;

        let mut input = String::new();
        let read = self
            .reader
            .read_line(&mut input)
            .map_err(|e| failed(e.to_string()))?;
        if read == 0 {
            log::debug!("input closed while asking for `{name}`");
            return Ok(None);
        }

        let input = input.trim();
        input
            .parse()
            .map(Some)
            .map_err(|e| failed(format!("`{input}` is not a number: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builtins_are_registered() {
        let functions = Functions::builtin();
        let mut names: Vec<_> = functions.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["cos", "ln", "sin", "tan"]);

        let ln = functions.get("ln").unwrap();
        assert!((ln(std::f64::consts::E) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn prompt_reads_a_value() {
        let mut output = Vec::new();
        let mut prompt = Prompt::new(Cursor::new("  4.5 \n"), &mut output);
        assert_eq!(prompt.resolve("x").unwrap(), Some(4.5));
        drop(prompt);
        assert_eq!(String::from_utf8(output).unwrap(), "Enter value for variable x:\n");
    }

    #[test]
    fn prompt_at_end_of_input_resolves_nothing() {
        let mut prompt = Prompt::new(Cursor::new(""), Vec::new());
        assert_eq!(prompt.resolve("x").unwrap(), None);
    }

    #[test]
    fn prompt_rejects_garbage() {
        let mut prompt = Prompt::new(Cursor::new("abc\n"), Vec::new());
        let err = prompt.resolve("x").unwrap_err();
        assert!(matches!(err, EvalError::Resolve { ref name, .. } if name == "x"));
    }

    #[test]
    fn prompt_answers_in_order() {
        let mut prompt = Prompt::new(Cursor::new("1\n2\n"), Vec::new());
        assert_eq!(prompt.resolve("a").unwrap(), Some(1.0));
        assert_eq!(prompt.resolve("b").unwrap(), Some(2.0));
    }
}
