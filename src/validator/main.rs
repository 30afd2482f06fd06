//! Standalone validator for funnel script files.
//!
//! Checks a script JSON file the same way the bot does at startup: every
//! message present and within the caption limit, the invitation carrying the
//! `{link}` placeholder and a usable button label.

use std::process::ExitCode;

use clap::Parser;

use funnel_bot::config::{
    FunnelScript, MAX_BUTTON_LABEL_LENGTH, MAX_CAPTION_LENGTH, Step, caption_length,
};

/// Funnel script validator.
#[derive(Parser, Debug)]
#[command(name = "validate_script")]
#[command(about = "Validates message script files for the funnel bot")]
#[command(version)]
struct Args {
    /// Path to the JSON script file to validate.
    #[arg(short, long, default_value = "script.json")]
    file: String,

    /// Generate an example script file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show every message with its length.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    validate_script(&args.file, args.verbose)
}

fn generate_example(output_path: &str) -> ExitCode {
    match FunnelScript::example().save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example script written to: {output_path}");
            println!("\nThe invitation text must keep the {{link}} placeholder.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_script(path: &str, verbose: bool) -> ExitCode {
    println!("Validating: {path}\n");

    let script = match FunnelScript::load_from_file(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("✗ Failed to load script: {e}");
            return ExitCode::FAILURE;
        }
    };

    let results = script.validate_all();
    let labels = Step::ALL
        .iter()
        .map(|step| (step.name(), script.text(*step)))
        .chain(std::iter::once(("button_label", script.button_label.as_str())));

    let mut errors = 0;
    let mut warnings = 0;

    for ((name, text), result) in labels.zip(&results) {
        let (char_count, max_length) = if name == "button_label" {
            (text.chars().count(), MAX_BUTTON_LABEL_LENGTH)
        } else {
            (caption_length(text), MAX_CAPTION_LENGTH)
        };

        if verbose {
            println!("[{name}] \"{}\" ({char_count} chars)", truncate(text, 40));
        }

        match result {
            Ok(()) => {
                let warn_threshold = max_length * 90 / 100;
                if char_count > warn_threshold {
                    warnings += 1;
                    if verbose {
                        println!("  ⚠ Warning: {char_count} chars is close to the {max_length} char limit");
                    }
                } else if verbose {
                    println!("  ✓ OK");
                }
            }
            Err(e) => {
                errors += 1;
                println!("  ✗ Error: {e}");
            }
        }
    }

    println!();

    let total = results.len();
    if errors == 0 {
        println!("✓ All {total} entries are valid!");
        if warnings > 0 {
            println!("  ({warnings} warning(s) - texts close to their limit)");
        }
        ExitCode::SUCCESS
    } else {
        println!("✗ Validation failed: {errors} error(s) in {total} entries");
        ExitCode::FAILURE
    }
}

/// Truncates a string for display.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
