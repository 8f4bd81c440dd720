use serde::Serialize;
use std::path::{
    Path,
    PathBuf,
};
use strum::Display;

const IDD_FILE: &str = "Energy+.idd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Detection {
    Configured,
    SearchPath,
    PlatformDefault,
}

/// Location of an EnergyPlus installation and the files used from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnergyPlusInstall {
    root: PathBuf,
    detection: Detection,
}

impl EnergyPlusInstall {
    /// Uses `configured` when given, then the directory of an `energyplus` binary on `PATH`, then the default
    /// install location of the platform.
    pub fn detect(configured: Option<&Path>) -> Self {
        Self::detect_with(configured, || {
            let found = which::which(exe_name("energyplus")).ok()?;
            let found = found.canonicalize().unwrap_or(found);
            found.parent().map(Path::to_path_buf)
        })
    }

    fn detect_with(configured: Option<&Path>, search_path: impl FnOnce() -> Option<PathBuf>) -> Self {
        let install = if let Some(root) = configured {
            Self {
                root: root.to_path_buf(),
                detection: Detection::Configured,
            }
        } else if let Some(root) = search_path() {
            Self {
                root,
                detection: Detection::SearchPath,
            }
        } else {
            Self {
                root: platform_default(),
                detection: Detection::PlatformDefault,
            }
        };
        debug!("EnergyPlus at {} ({})", install.root.display(), install.detection);
        install
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn detection(&self) -> Detection {
        self.detection
    }

    pub fn idd_file(&self) -> PathBuf {
        self.root.join(IDD_FILE)
    }

    pub fn energyplus_exe(&self) -> PathBuf {
        self.root.join(exe_name("energyplus"))
    }

    pub fn expand_objects_exe(&self) -> PathBuf {
        self.root.join(exe_name("ExpandObjects"))
    }
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn platform_default() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\EnergyPlusV25-1-0")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/EnergyPlus-25-1-0")
    } else {
        PathBuf::from("/usr/local/EnergyPlus-25-1-0")
    }
}
