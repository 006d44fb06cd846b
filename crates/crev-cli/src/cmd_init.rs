use anyhow::{bail, Context};
use crev_core::{write_atomic, Workspace, WorkspaceConfig};
use crev_sum::{Phase, Prompts};
use std::path::Path;

pub fn execute(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("directory '{}' already exists", path.display());
    }
    std::fs::create_dir_all(path).with_context(|| format!("create {}", path.display()))?;
    let ws = Workspace::discover(path);

    let config = WorkspaceConfig::template().to_pretty_json()?;
    write_atomic(&ws.config_json, format!("{config}\n").as_bytes())
        .with_context(|| format!("write {}", ws.config_json.display()))?;

    // Editable copies of the built-in prompts; `Prompts::load` picks them up.
    let prompts = Prompts::default();
    for phase in Phase::ALL {
        let file = ws.prompts_dir.join(format!("{}.txt", phase.key()));
        write_atomic(&file, format!("{}\n", prompts.get(phase)).as_bytes())
            .with_context(|| format!("write {}", file.display()))?;
    }

    let shown = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    println!("Initialized crev workspace at {}", shown.display());
    println!("  edit {} to list repositories and pull requests,", ws.config_json.display());
    println!("  then run `crev pull` and `crev extract` from inside it.");
    Ok(())
}
