//! The `quizflow topics` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizflow_client::{create_service, load_config_from};

pub async fn execute(backend: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let name = backend.as_deref().unwrap_or(&config.default_backend);
    let backend_config = config
        .backends
        .get(name)
        .with_context(|| format!("backend '{name}' is not configured"))?;
    let service = create_service(name, backend_config)?;

    let subjects = service.list_subjects().await?;
    if subjects.is_empty() {
        println!("No topics available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Description"]);
    for subject in &subjects {
        table.add_row(vec![
            Cell::new(&subject.id),
            Cell::new(&subject.name),
            Cell::new(&subject.description),
        ]);
    }
    println!("{table}");

    Ok(())
}
