//! Narrative drafting through an external LM command.
//!
//! The generator is an optional assist: it assembles a Malay prompt from the
//! draft's details, hands it to a configurable LM CLI, and returns the reply
//! text. Any failure surfaces as an error and leaves the draft's narrative
//! untouched; the caller only assigns on success.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use std::env;
use std::fmt::Write as _;
use std::io::Write as _;
use std::process::{Command, Stdio};

use crate::schema::ReportRecord;

/// Env var holding the LM command override: either a JSON object
/// `{"command": [...]}` or a shell-words string. A `{prompt}` placeholder is
/// substituted; without one the prompt is piped via stdin.
pub const LM_COMMAND_ENV: &str = "LAPOR_LM_COMMAND";

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LmCommandConfig {
    command: Vec<String>,
}

pub struct LmCommand {
    pub argv: Vec<String>,
}

/// Requested narrative length, mapped to a sentence budget in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NarrativeLength {
    Short,
    Medium,
    Long,
}

impl NarrativeLength {
    fn sentence_budget(self) -> &'static str {
        match self {
            NarrativeLength::Short => "3 hingga 4 ayat sahaja",
            NarrativeLength::Medium => "satu perenggan (5 hingga 7 ayat)",
            NarrativeLength::Long => "dua perenggan penuh",
        }
    }
}

/// Load the LM command configuration, falling back to the claude CLI.
pub fn load_lm_command() -> Result<LmCommand> {
    if let Ok(raw) = env::var(LM_COMMAND_ENV) {
        let argv = parse_command_config(&raw)
            .with_context(|| format!("parse {LM_COMMAND_ENV}"))?;
        return Ok(LmCommand { argv });
    }
    Ok(default_lm_command())
}

fn parse_command_config(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    let argv = if trimmed.starts_with('{') {
        let config: LmCommandConfig =
            serde_json::from_str(trimmed).context("parse LM command JSON")?;
        config.command
    } else {
        shell_words::split(trimmed).context("parse LM command words")?
    };
    if argv.is_empty() {
        return Err(anyhow!("LM command is empty"));
    }
    Ok(argv)
}

fn default_lm_command() -> LmCommand {
    LmCommand {
        argv: vec![
            "claude".to_string(),
            "--print".to_string(),
            "--no-session-persistence".to_string(),
            "--system-prompt".to_string(),
            "Balas dengan teks laporan sahaja, tanpa pengenalan atau pagar kod.".to_string(),
        ],
    }
}

fn or_dash(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}

/// Assemble the Malay prompt from the draft's details.
pub fn build_prompt(record: &ReportRecord, length: NarrativeLength) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Tulis ringkasan laporan aktiviti kokurikulum sekolah rendah dalam Bahasa Melayu, {}.",
        length.sentence_budget()
    );
    prompt.push_str("Gunakan nada formal dan fakta di bawah sahaja, tanpa menambah butiran rekaan.\n\n");
    let _ = writeln!(prompt, "Program / Aktiviti: {}", or_dash(&record.program));
    let _ = writeln!(prompt, "Kelab / Unit: {}", or_dash(&record.unit_name));
    let _ = writeln!(prompt, "Anjuran: {}", or_dash(&record.organiser));
    let _ = writeln!(prompt, "Tarikh: {}", or_dash(&record.date));
    let _ = writeln!(prompt, "Masa: {}", or_dash(&record.time));
    let _ = writeln!(
        prompt,
        "Kehadiran: {} hadir, {} tidak hadir",
        or_dash(&record.attendee_count),
        or_dash(&record.absentee_count)
    );
    let _ = writeln!(prompt, "Guru Penasihat: {}", or_dash(&record.advisor_name));
    prompt
}

/// Generate narrative text for the record.
pub fn generate_narrative(record: &ReportRecord, length: NarrativeLength) -> Result<String> {
    let command = load_lm_command()?;
    let prompt = build_prompt(record, length);
    let reply = run_lm(&prompt, &command)?;
    let text = strip_code_fences(&String::from_utf8_lossy(&reply));
    if text.is_empty() {
        return Err(anyhow!("LM returned an empty narrative"));
    }
    Ok(text)
}

/// Invoke the configured LM CLI and capture its reply.
fn run_lm(prompt: &str, command: &LmCommand) -> Result<Vec<u8>> {
    let mut argv = command.argv.clone();
    let mut has_placeholder = false;
    for arg in &mut argv {
        if arg == "{prompt}" {
            *arg = prompt.to_string();
            has_placeholder = true;
        }
    }
    let program = argv.remove(0);
    let resolved = which::which(&program)
        .with_context(|| format!("LM command '{program}' not found on PATH"))?;

    let mut command = Command::new(resolved);
    command.args(argv);
    if has_placeholder {
        command.stdin(Stdio::null());
    } else {
        command.stdin(Stdio::piped());
    }
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let output = if has_placeholder {
        command.output().context("run LM command")?
    } else {
        let mut child = command.spawn().context("spawn LM command")?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .context("write LM prompt")?;
        }
        child.wait_with_output().context("wait LM output")?
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("LM command failed: {}", stderr.trim()));
    }
    Ok(output.stdout)
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    if let Some(first) = lines.first() {
        if first.trim_start().starts_with("```") {
            lines.remove(0);
        }
    }
    if let Some(last) = lines.last() {
        if last.trim_start().starts_with("```") {
            lines.pop();
        }
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_details_and_length_budget() {
        let record = ReportRecord {
            program: "Perjumpaan Pengakap".to_string(),
            organiser: "Unit Beruniform".to_string(),
            date: "2026-01-14".to_string(),
            attendee_count: "32".to_string(),
            ..ReportRecord::default()
        };
        let prompt = build_prompt(&record, NarrativeLength::Short);
        assert!(prompt.contains("Perjumpaan Pengakap"));
        assert!(prompt.contains("Unit Beruniform"));
        assert!(prompt.contains("2026-01-14"));
        assert!(prompt.contains("32 hadir"));
        assert!(prompt.contains("3 hingga 4 ayat"));

        let long = build_prompt(&record, NarrativeLength::Long);
        assert!(long.contains("dua perenggan"));
    }

    #[test]
    fn blank_fields_render_as_dashes_in_the_prompt() {
        let prompt = build_prompt(&ReportRecord::default(), NarrativeLength::Medium);
        assert!(prompt.contains("Program / Aktiviti: -"));
        assert!(prompt.contains("Guru Penasihat: -"));
    }

    #[test]
    fn command_config_accepts_json_and_shell_words() {
        let argv = parse_command_config(r#"{"command": ["ollama", "run", "model"]}"#)
            .expect("json config");
        assert_eq!(argv, ["ollama", "run", "model"]);

        let argv = parse_command_config("my-lm --flag 'two words' {prompt}").expect("words");
        assert_eq!(argv, ["my-lm", "--flag", "two words", "{prompt}"]);

        assert!(parse_command_config("").is_err());
        assert!(parse_command_config(r#"{"command": []}"#).is_err());
    }

    #[test]
    fn code_fences_are_stripped_from_replies() {
        let reply = "```\nLaporan aktiviti.\n```";
        assert_eq!(strip_code_fences(reply), "Laporan aktiviti.");
        assert_eq!(strip_code_fences("  plain text  "), "plain text");
        let fenced = "```markdown\nBaris satu.\nBaris dua.\n```";
        assert_eq!(strip_code_fences(fenced), "Baris satu.\nBaris dua.");
    }
}
