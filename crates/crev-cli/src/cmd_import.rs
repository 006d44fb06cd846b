use crate::{open_workspace, print_json};
use anyhow::bail;
use crev_core::CancellationToken;
use crev_exim::import_path;
use std::path::Path;

pub fn execute(
    cwd: &Path,
    input: &Path,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let (ws, _config) = open_workspace(cwd)?;
    let input = if input.is_absolute() {
        input.to_path_buf()
    } else {
        cwd.join(input)
    };
    let report = import_path(&ws, &input, cancel)?;
    if json {
        print_json(&report)?;
    } else {
        print!("{}", report.render());
    }
    if report.all_failed() {
        bail!("import: every group failed");
    }
    Ok(())
}
