use anyhow::Context;
use profwatch_core::AppConfig;
use profwatch_store::{LinkIndex, ProfileDatabase};

/// Entry point for `profwatch status`. Reads local files only.
///
/// # Errors
///
/// Returns an error if the database exists but cannot be read.
pub(crate) fn print_status(config: &AppConfig) -> anyhow::Result<()> {
    for line in status_lines(config)? {
        println!("{line}");
    }
    Ok(())
}

fn status_lines(config: &AppConfig) -> anyhow::Result<Vec<String>> {
    let database = ProfileDatabase::new(config.database_path());
    let known = database.load_known().with_context(|| {
        format!("failed to read database {}", database.path().display())
    })?;

    let mut lines = vec![format!(
        "{} known profiles in {}",
        known.len(),
        database.path().display()
    )];

    let index = LinkIndex::new(config.link_index_path());
    match index.rows() {
        Ok(rows) => lines.push(format!(
            "{} indexed links in {}",
            rows.len(),
            index.path().display()
        )),
        Err(err) => tracing::warn!(error = %err, "link index unreadable"),
    }
    Ok(lines)
}
