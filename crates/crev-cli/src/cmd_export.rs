use crate::{open_workspace, print_json};
use crev_core::Scope;
use crev_exim::{export, ExportOptions, OutputFormat, DEFAULT_EXPORT_NAME};
use std::path::Path;

pub const DEFAULT_NAME: &str = DEFAULT_EXPORT_NAME;

pub struct ExportParams<'a> {
    pub cwd: &'a Path,
    pub name: &'a str,
    pub output: &'a str,
    pub scope_folders: Vec<String>,
    pub scope: &'a str,
    pub json: bool,
}

pub fn execute(p: &ExportParams<'_>) -> anyhow::Result<()> {
    let (ws, _config) = open_workspace(p.cwd)?;
    let opts = ExportOptions {
        name: p.name.to_string(),
        format: p.output.parse::<OutputFormat>()?,
        folders: p.scope_folders.clone(),
        scope: p.scope.parse::<Scope>()?,
    };
    let report = export(&ws, &opts)?;
    if p.json {
        print_json(&report)?;
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::init_workspace;
    use std::fs;

    fn params<'a>(cwd: &'a Path, output: &'static str) -> ExportParams<'a> {
        ExportParams {
            cwd,
            name: DEFAULT_NAME,
            output,
            scope_folders: Vec::new(),
            scope: "ai",
            json: false,
        }
    }

    #[test]
    fn requires_initialized_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let err = execute(&params(tmp.path(), "txtar")).unwrap_err();
        assert!(err.to_string().contains("crev init"));
        assert!(!tmp.path().join("export.txtar").exists());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        init_workspace(tmp.path(), r#"{"repos": []}"#);
        assert!(execute(&params(tmp.path(), "zip")).is_err());
    }

    #[test]
    fn writes_archive_of_summaries() {
        let tmp = tempfile::tempdir().unwrap();
        init_workspace(tmp.path(), r#"{"repos": []}"#);
        let sum = tmp.path().join("pullrequests/acme/widgets/4/sum");
        fs::create_dir_all(&sum).unwrap();
        fs::write(sum.join("sum.pr.ai.md"), "done\n").unwrap();
        fs::write(sum.join("diff.txt"), "raw\n").unwrap();

        execute(&params(tmp.path(), "txtar")).unwrap();
        let text = fs::read_to_string(tmp.path().join("export.txtar")).unwrap();
        assert!(text.contains("-- pullrequests/acme/widgets/4/sum/sum.pr.ai.md --\ndone\n"));
        assert!(!text.contains("diff.txt"));
    }
}
