//! The `evalify init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create evalify.toml
    if std::path::Path::new("evalify.toml").exists() {
        println!("evalify.toml already exists, skipping.");
    } else {
        std::fs::write("evalify.toml", SAMPLE_CONFIG)?;
        println!("Created evalify.toml");
    }

    // Create example exam definition
    if std::path::Path::new("exam.toml").exists() {
        println!("exam.toml already exists, skipping.");
    } else {
        std::fs::write("exam.toml", EXAMPLE_EXAM)?;
        println!("Created exam.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set EVALIFY_GEMINI_KEY or edit evalify.toml with your API key");
    println!("  2. Run: evalify validate");
    println!("  3. Run: evalify evaluate --image sheet.jpg --key \"Set A\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# evalify configuration

default_recognizer = "gemini"
max_retries = 2
retry_delay_ms = 1000
timeout_secs = 120
data_dir = "./evalify-data"
notification_cap = 20
exam_file = "exam.toml"

[recognizers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"
model = "gemini-2.5-flash"

[recognizers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"
model = "gpt-4.1-mini"

# Offline recognizer for trying the pipeline without an API key.
[recognizers.mock]
type = "mock"
answers = "ABCDE ABCDE ABCDE ABCDE ABCDE"
"#;

const EXAMPLE_EXAM: &str = r#"[exam]
name = "Example mock test"
question_count = 100

[[subjects]]
name = "Mathematics"
start = 1
end = 25

[[subjects]]
name = "Physics"
start = 26
end = 50

[[subjects]]
name = "Chemistry"
start = 51
end = 75

[[subjects]]
name = "Biology"
start = 76
end = 100

# One character per question starting at question 1. A-E mark the answer,
# `-` leaves the question unanswered. Whitespace is ignored.
[[answer_keys]]
name = "Set A"
answers = """
ABCDE ABCDE ABCDE ABCDE ABCDE
BCDEA BCDEA BCDEA BCDEA BCDEA
CDEAB CDEAB CDEAB CDEAB CDEAB
DEABC DEABC DEABC DEABC DEABC
"""

[[answer_keys]]
name = "Set B"
answers = """
EDCBA EDCBA EDCBA EDCBA EDCBA
DCBAE DCBAE DCBAE DCBAE DCBAE
CBAED CBAED CBAED CBAED CBAED
BAEDC BAEDC BAEDC BAEDC BAEDC
"""
"#;
