use crate::assets::{minify_js, wrap_iife};
use crate::context::{BuildContext, SourceFile};
use crate::dispatch::{OutputKind, Transform, TransformError, TransformOutput};

use super::fingerprinted;

/// Self-contained minified script under a content-hashed name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptTransform;

impl Transform for ScriptTransform {
    fn name(&self) -> &'static str {
        "script"
    }

    fn extensions(&self) -> &[&'static str] {
        &["js"]
    }

    fn kind(&self) -> OutputKind {
        OutputKind::Asset
    }

    fn process(
        &self,
        _ctx: &BuildContext,
        file: &SourceFile,
    ) -> Result<TransformOutput, TransformError> {
        fingerprinted(file, |js| {
            minify_js(&wrap_iife(js)).map_err(TransformError::Minify)
        })
    }
}
