//! Command implementations.

pub mod check;
pub mod fuse;

use std::fmt;
use std::path::Path;

use weld_core::fragment::Fragment;

/// One fragment's diagnostic: which file, which error code, what happened.
#[derive(Debug)]
pub struct FragmentFailure {
    pub label: String,
    pub code: Option<&'static str>,
    pub message: String,
}

impl fmt::Display for FragmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}: [{code}] {}", self.label, self.message),
            None => write!(f, "{}: {}", self.label, self.message),
        }
    }
}

/// Load and strictly validate one fragment file.
///
/// The fragment label is the path as given, so diagnostics point back at
/// the generator output that produced them. Each fragment is handled
/// independently — a failure here never aborts sibling fragments.
pub fn load_fragment(path: &Path) -> Result<Fragment, FragmentFailure> {
    let label = path.display().to_string();

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return Err(FragmentFailure {
                label,
                code: None,
                message: format!("read failed: {error}"),
            });
        }
    };

    let fragment = match Fragment::from_json_str(&label, &raw) {
        Ok(fragment) => fragment,
        Err(error) => {
            return Err(FragmentFailure {
                label,
                code: Some(error.code().code()),
                message: error.to_string(),
            });
        }
    };

    if let Err(error) = fragment.validate() {
        return Err(FragmentFailure {
            label,
            code: Some(error.code().code()),
            message: error.to_string(),
        });
    }

    Ok(fragment)
}
