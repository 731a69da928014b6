//! Terminal prompts.

use session_auth::BiometricOutcome;
use std::io::{self, BufRead, Write};

/// Clap value parser for yes/no answers.
pub fn parse_yes_no(answer: &str) -> Result<bool, String> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "on" => Ok(true),
        "n" | "no" | "false" | "off" => Ok(false),
        other => Err(format!("expected yes or no, got '{}'", other)),
    }
}

/// Map a typed confirmation to a gate outcome: `y` confirms, `n` cancels,
/// anything else counts as a mismatch.
pub fn confirmation_outcome(answer: &str) -> BiometricOutcome {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => BiometricOutcome::Success,
        "n" | "no" => BiometricOutcome::UserCancelled,
        _ => BiometricOutcome::Failed,
    }
}

/// Stand-in for a platform biometric prompt. Runs on the blocking pool.
pub fn confirm_identity() -> BiometricOutcome {
    match ask("Confirm it's you to unlock FindMySong [y/n]: ") {
        Ok(Some(answer)) => confirmation_outcome(&answer),
        Ok(None) | Err(_) => BiometricOutcome::Unavailable,
    }
}

/// Ask the opt-in question. `None` when stdin is closed or unreadable.
pub fn ask_biometric_opt_in() -> Option<bool> {
    let answer = ask("Unlock future sessions with a biometric check? [y/n]: ").ok()??;
    parse_yes_no(&answer).ok()
}

fn ask(question: &str) -> io::Result<Option<String>> {
    let mut stderr = io::stderr();
    stderr.write_all(question.as_bytes())?;
    stderr.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
