//! Per-extension transforms.

mod copy;
mod document;
mod raster;
mod script;
mod style;

use std::fs;
use std::path::{Path, PathBuf};

pub use copy::CopyTransform;
pub use document::DocumentTransform;
pub use raster::ImageTransform;
pub use script::ScriptTransform;
pub use style::StyleTransform;

use crate::context::SourceFile;
use crate::dispatch::{TransformError, TransformOutput};
use crate::hash::{fingerprint, hashed_file_name};

/// Write `contents` to `path`, creating parent directories.
pub(crate) fn write_output(
    path: &Path,
    contents: impl AsRef<[u8]>,
) -> Result<(), TransformError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TransformError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| TransformError::io(path, e))
}

/// Replace the last segment of a `/`-separated path.
fn sibling_rel(rel: &str, name: &str) -> String {
    match rel.rfind('/') {
        Some(slash) => format!("{}/{}", &rel[..slash], name),
        None => name.to_string(),
    }
}

/// Shared cache-by-hash contract for styles and scripts.
///
/// The destination name carries the fingerprint of the source bytes. An
/// existing destination is trusted and never rewritten, so `render` only runs
/// when the content changed.
fn fingerprinted(
    file: &SourceFile,
    render: impl FnOnce(&str) -> Result<String, TransformError>,
) -> Result<TransformOutput, TransformError> {
    let source = fs::read_to_string(&file.src).map_err(|e| TransformError::io(&file.src, e))?;

    let hashed_name = hashed_file_name(&file.name, &fingerprint(&source));
    let dest: PathBuf = file.dest.with_file_name(&hashed_name);

    if dest.exists() {
        tracing::debug!("Up to date: {}", dest.display());
    } else {
        write_output(&dest, render(&source)?)?;
        tracing::info!("Built: {}", dest.display());
    }

    Ok(TransformOutput {
        outputs: vec![dest],
        manifest_entry: Some((
            file.output_rel.clone(),
            sibling_rel(&file.output_rel, &hashed_name),
        )),
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_last_segment() {
        assert_eq!(sibling_rel("static/css/style.css", "style.x.css"), "static/css/style.x.css");
        assert_eq!(sibling_rel("app.js", "app.x.js"), "app.x.js");
    }
}
