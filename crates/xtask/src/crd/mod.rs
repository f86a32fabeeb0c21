use std::path::{Path, PathBuf};

use label_check_operator::crd::{self, CustomResourceExt, DeploymentLabelCheck};
use snafu::{OptionExt, ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to get manifest directory"))]
    GetManifestDirectory { source: std::env::VarError },

    #[snafu(display("failed to get the workspace root above {path}", path = path.display()))]
    GetWorkspaceRoot { path: PathBuf },

    #[snafu(display("failed to create CRD directory {path}", path = path.display()))]
    CreateCrdDirectory {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to write CRD to file at {path}", path = path.display()))]
    WriteCrd { source: crd::Error, path: PathBuf },
}

/// Writes the CRD of `K` to `<base_path>/<crd_name>.yaml`.
fn write_crd<K: CustomResourceExt>(base_path: &Path, crd_name: &str) -> Result<(), Error> {
    let mut path = base_path.join(crd_name);
    path.set_extension("yaml");

    K::write_yaml_schema(&path).with_context(|_| WriteCrdSnafu { path: path.clone() })
}

pub fn generate_preview() -> Result<(), Error> {
    let path = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .context(GetManifestDirectorySnafu)?;

    // crates/xtask -> workspace root
    let path = path
        .ancestors()
        .nth(2)
        .with_context(|| GetWorkspaceRootSnafu { path: path.clone() })?
        .join("deploy/crds");

    std::fs::create_dir_all(&path).with_context(|_| CreateCrdDirectorySnafu { path: path.clone() })?;

    write_crd::<DeploymentLabelCheck>(&path, "DeploymentLabelCheck")?;

    Ok(())
}
