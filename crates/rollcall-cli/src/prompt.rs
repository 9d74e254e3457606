use std::io::{self, BufRead, Write};

/// Ask `question [y/N]` on stdout. Anything but y/yes, including EOF, is no.
pub fn confirm(question: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    print!("{question} [y/N]: ");
    let _ = io::stdout().flush();
    read_answer(io::stdin().lock())
}

fn read_answer(mut input: impl BufRead) -> bool {
    let mut s = String::new();
    match input.read_line(&mut s) {
        Ok(_) => matches!(s.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
