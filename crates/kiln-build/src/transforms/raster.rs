use std::sync::Arc;

use crate::context::{BuildContext, SourceFile};
use crate::dispatch::{OutputKind, Transform, TransformError, TransformOutput};
use crate::images::{ImageResizer, RASTER_EXTENSIONS};

/// Copies a raster image and writes its responsive variants.
#[derive(Clone)]
pub struct ImageTransform {
    resizer: Arc<dyn ImageResizer>,
}

impl ImageTransform {
    pub fn new(resizer: Arc<dyn ImageResizer>) -> Self {
        Self { resizer }
    }
}

impl Transform for ImageTransform {
    fn name(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &[&'static str] {
        RASTER_EXTENSIONS
    }

    fn kind(&self) -> OutputKind {
        OutputKind::Image
    }

    fn process(
        &self,
        ctx: &BuildContext,
        file: &SourceFile,
    ) -> Result<TransformOutput, TransformError> {
        let outputs = self
            .resizer
            .resize(&file.src, &file.dest, ctx.options.force_regenerate)?;

        Ok(TransformOutput {
            outputs,
            manifest_entry: None,
        })
    }
}
