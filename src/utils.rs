use anyhow::Result;

use anyhow::anyhow;
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use directories::ProjectDirs;

pub fn trim_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Returns at most `max_chars` characters of `input`, never splitting a
/// multi-byte character.
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

pub fn strip_controls_and_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            // ANSI escape sequence (ESC … letter)
            '\x1b' => {
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }

            c if c.is_control() => {}

            c => out.push(c),
        }
    }

    out.trim().to_string()
}

pub fn ask_yn(prompt: String) -> Result<bool> {
    println!("{}", prompt);
    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Proceed? ")
        .report(true)
        .wait_for_newline(true)
        .interact()?;
    Ok(answer)
}

pub fn get_data_dir() -> Result<std::path::PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "flashdeck")
        .ok_or_else(|| anyhow!("Could not determine project directory"))?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_controls_and_escapes() {
        let input = "\x1b[1msk-test\x1b[0m\n";
        assert_eq!(strip_controls_and_escapes(input), "sk-test");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("", 2), "");
        // multi-byte characters count once each
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("日本語のテキスト", 3), "日本語");
    }

    #[test]
    fn test_trim_line() {
        assert_eq!(trim_line("  key \n"), Some("key"));
        assert_eq!(trim_line(" \t "), None);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("card", 0), "0 cards");
        assert_eq!(pluralize("card", 1), "1 card");
        assert_eq!(pluralize("card", 5), "5 cards");
    }
}
