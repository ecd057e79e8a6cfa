//! The `quizflow init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizflow.toml").exists() {
        println!("quizflow.toml already exists, skipping.");
    } else {
        std::fs::write("quizflow.toml", SAMPLE_CONFIG)?;
        println!("Created quizflow.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: quizflow topics");
    println!("  2. Run: quizflow run --subject physics");
    println!("  3. To go online, point [backends.http] at your server and set default_backend = \"http\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizflow configuration

default_backend = "local"

# Countdown lengths in seconds.
awareness_secs = 30
question_secs = 60

# Urgency bands shown while a countdown runs.
warning_below_secs = 30
critical_below_secs = 10

# How long feedback stays on screen, in milliseconds.
feedback_dwell_ms = 2000
timeout_dwell_ms = 1000

[backends.local]
type = "local"

[backends.http]
type = "http"
base_url = "http://localhost:8080/api/quizzes"
api_key = "${QUIZFLOW_API_KEY}"
"#;
