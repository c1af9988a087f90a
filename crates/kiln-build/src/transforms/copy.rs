use std::fs;

use crate::context::{BuildContext, SourceFile};
use crate::dispatch::{OutputKind, Transform, TransformError, TransformOutput};

/// Byte-for-byte copy. Default for unknown extensions and the fallback for
/// every failed transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransform;

impl Transform for CopyTransform {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn extensions(&self) -> &[&'static str] {
        &[]
    }

    fn kind(&self) -> OutputKind {
        OutputKind::Copy
    }

    fn process(
        &self,
        _ctx: &BuildContext,
        file: &SourceFile,
    ) -> Result<TransformOutput, TransformError> {
        if let Some(parent) = file.dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TransformError::io(parent, e))?;
        }
        fs::copy(&file.src, &file.dest).map_err(|e| TransformError::io(&file.src, e))?;

        Ok(TransformOutput::single(file.dest.clone()))
    }
}
