//! Interactive input for commands that need it.

use std::io::{self, BufRead, Write};

/// Print `prompt` and read one line from stdin, without the line ending.
pub fn line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut buf = String::new();
    io::stdin().lock().read_line(&mut buf)?;
    Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}

/// Read a secret without echoing it.
pub fn password(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}

/// Ask a yes/no question; anything but an affirmative answer is `false`.
///
/// Empty lines repeat the question. End of input counts as `false`.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        print!("{prompt}");
        io::stdout().flush()?;

        let mut buf = String::new();
        if input.read_line(&mut buf)? == 0 {
            return Ok(false);
        }
        if !buf.trim().is_empty() {
            return Ok(is_affirmative(&buf));
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "t" | "true" | "y" | "yes")
}
