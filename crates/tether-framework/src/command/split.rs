//! Tokenizers for command lines.

/// Splits on runs of whitespace.
pub fn whitespace_split(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

/// Shell-like splitting.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Quoted strings (single and double quotes)
/// - Backslash escapes within double quotes
///
/// An unterminated quote runs to the end of the line.
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    // Distinguishes `""` (an empty argument) from no argument at all.
    let mut quoted = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if !current.is_empty() || quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_split_collapses_runs() {
        assert_eq!(whitespace_split("give  wood\t5"), vec!["give", "wood", "5"]);
        assert!(whitespace_split("   ").is_empty());
    }

    #[test]
    fn test_whitespace_split_keeps_quotes() {
        assert_eq!(
            whitespace_split(r#"msg "hello world""#),
            vec!["msg", "\"hello", "world\""]
        );
    }

    #[test]
    fn test_shell_split_quoted() {
        let args = shell_split(r#"msg "hello world" test"#);
        assert_eq!(args, vec!["msg", "hello world", "test"]);
    }

    #[test]
    fn test_shell_split_single_quoted() {
        let args = shell_split("msg 'hello world' test");
        assert_eq!(args, vec!["msg", "hello world", "test"]);
    }

    #[test]
    fn test_shell_split_mixed_quotes() {
        let args = shell_split(r#"cmd "double's quote" 'single"s quote'"#);
        assert_eq!(args, vec!["cmd", "double's quote", r#"single"s quote"#]);
    }

    #[test]
    fn test_shell_split_escape_in_double_quotes() {
        let args = shell_split(r#"say "a \"b\" c""#);
        assert_eq!(args, vec!["say", r#"a "b" c"#]);
    }

    #[test]
    fn test_shell_split_empty_quoted_argument() {
        assert_eq!(shell_split(r#"rename "" x"#), vec!["rename", "", "x"]);
    }

    #[test]
    fn test_shell_split_whitespace_only() {
        assert!(shell_split("   \t  ").is_empty());
        assert!(shell_split("").is_empty());
    }
}
