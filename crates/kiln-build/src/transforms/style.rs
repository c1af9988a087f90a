use crate::assets::minify_css;
use crate::context::{BuildContext, SourceFile};
use crate::dispatch::{OutputKind, Transform, TransformError, TransformOutput};

use super::fingerprinted;

/// Minified stylesheet under a content-hashed name.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleTransform;

impl Transform for StyleTransform {
    fn name(&self) -> &'static str {
        "style"
    }

    fn extensions(&self) -> &[&'static str] {
        &["css"]
    }

    fn kind(&self) -> OutputKind {
        OutputKind::Asset
    }

    fn process(
        &self,
        _ctx: &BuildContext,
        file: &SourceFile,
    ) -> Result<TransformOutput, TransformError> {
        fingerprinted(file, |css| minify_css(css).map_err(TransformError::Minify))
    }
}
