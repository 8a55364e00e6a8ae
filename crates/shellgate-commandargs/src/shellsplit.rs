//! Minimal shell-style splitting of the SSH original command.
//!
//! A word is an unquoted run, a `'single quoted'` run taken literally, or a
//! `"double quoted"` run where `\X` is kept as the two characters `\X`.
//! Input that cannot start a word (a stray backslash, an unterminated quote)
//! is skipped one character at a time; there is no error path.

fn is_shell_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\x0C' | '\r')
}

fn is_bare_word_char(ch: char) -> bool {
    !is_shell_space(ch) && !matches!(ch, '\\' | '\'' | '"')
}

/// Splits `command` into argument words.
pub fn split_ssh_args(command: &str) -> Vec<String> {
    let chars = command.chars().collect::<Vec<_>>();
    let mut words = Vec::new();
    let mut position = 0;

    while position < chars.len() {
        let start = position
            + chars[position..]
                .iter()
                .take_while(|ch| is_shell_space(**ch))
                .count();
        if start >= chars.len() {
            break;
        }
        match scan_word(&chars, start) {
            Some((word, next)) => {
                words.push(word);
                position = next;
            }
            None => position = start + 1,
        }
    }

    words
}

fn scan_word(chars: &[char], start: usize) -> Option<(String, usize)> {
    match chars[start] {
        '\'' => {
            let close = start + 1 + chars[start + 1..].iter().position(|ch| *ch == '\'')?;
            Some((chars[start + 1..close].iter().collect(), close + 1))
        }
        '"' => scan_double_quoted(chars, start),
        ch if is_bare_word_char(ch) => {
            let end = chars[start..]
                .iter()
                .position(|ch| !is_bare_word_char(*ch))
                .map_or(chars.len(), |offset| start + offset);
            Some((chars[start..end].iter().collect(), end))
        }
        _ => None,
    }
}

fn scan_double_quoted(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut index = start + 1;
    while index < chars.len() {
        match chars[index] {
            '"' => return Some((chars[start + 1..index].iter().collect(), index + 1)),
            '\\' => match chars.get(index + 1) {
                Some(next) if *next != '\n' => index += 2,
                _ => return None,
            },
            _ => index += 1,
        }
    }
    None
}
