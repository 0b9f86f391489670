//! Yes/no prompts.

use console::{style, Term};

use crate::error::Result;

/// Interpret a yes/no answer. `None` for anything else.
pub fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "1" | "true" | "д" | "да" => Some(true),
        "n" | "no" | "0" | "false" | "н" | "нет" => Some(false),
        _ => None,
    }
}

/// Ask a yes/no question on the terminal until it gets a usable answer.
pub fn confirm(question: &str) -> Result<bool> {
    let term = Term::stdout();
    loop {
        term.write_str(&format!("{} {} ", question, style("(y/n) >").dim()))?;
        let answer = term.read_line()?;
        match parse_answer(&answer) {
            Some(value) => return Ok(value),
            None => term.write_line("Please answer 'y' or 'n'.")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("Y"), Some(true));
        assert_eq!(parse_answer(" yes \n"), Some(true));
        assert_eq!(parse_answer("no"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
        assert_eq!(parse_answer(""), None);
    }
}
