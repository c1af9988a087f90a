//! Responsive image variants and their markup.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::avif::AvifEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use kiln_markdown::ImageRenderer;
use rayon::prelude::*;

use crate::config::ImagePolicy;
use crate::dispatch::TransformError;

/// Extensions handled as raster images.
pub const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

const AVIF_SPEED: u8 = 8;

/// Produces the sized variants of one image.
pub trait ImageResizer: Send + Sync {
    /// Write `src` to `dest` plus its variants next to it.
    ///
    /// Returns every output path, including variants that were already up to
    /// date. `force` regenerates everything.
    fn resize(&self, src: &Path, dest: &Path, force: bool) -> Result<Vec<PathBuf>, TransformError>;
}

/// Encoded variant format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantFormat {
    Avif,
    Webp,
}

impl VariantFormat {
    /// Preference order for `<source>` elements.
    pub const ALL: [VariantFormat; 2] = [VariantFormat::Avif, VariantFormat::Webp];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Avif => "image/avif",
            Self::Webp => "image/webp",
        }
    }
}

/// `<dir>/<stem>-<width>.<ext>` next to `dest`.
pub fn variant_path(dest: &Path, width: u32, format: VariantFormat) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!("{}-{}.{}", stem, width, format.extension()))
}

/// Same naming as [`variant_path`], applied to a URL.
pub fn variant_href(src: &str, width: u32, format: VariantFormat) -> String {
    let base = match src.rfind('.') {
        Some(dot) if !src[dot..].contains('/') => &src[..dot],
        _ => src,
    };
    format!("{}-{}.{}", base, width, format.extension())
}

/// Resizes with Lanczos3 and encodes AVIF and lossless WebP variants.
///
/// The WebP encoder is lossless, so `quality.webp` has no effect here.
#[derive(Debug, Clone)]
pub struct ImagePipeline {
    policy: ImagePolicy,
}

impl ImagePipeline {
    pub fn new(policy: ImagePolicy) -> Self {
        Self { policy }
    }

    fn encode(
        &self,
        img: &DynamicImage,
        width: u32,
        format: VariantFormat,
        path: &Path,
    ) -> Result<(), TransformError> {
        let height = scaled_height(img.width(), img.height(), width);
        let resized = img.resize_exact(width, height, FilterType::Lanczos3).to_rgba8();

        let file = File::create(path).map_err(|e| TransformError::io(path, e))?;
        let writer = BufWriter::new(file);

        let result = match format {
            VariantFormat::Webp => resized.write_with_encoder(WebPEncoder::new_lossless(writer)),
            VariantFormat::Avif => resized.write_with_encoder(AvifEncoder::new_with_speed_quality(
                writer,
                AVIF_SPEED,
                self.policy.quality.avif,
            )),
        };

        result.map_err(|e| {
            // a truncated variant would otherwise look up to date next build
            let _ = fs::remove_file(path);
            TransformError::Image(format!("{}: {}", path.display(), e))
        })
    }
}

impl ImageResizer for ImagePipeline {
    fn resize(&self, src: &Path, dest: &Path, force: bool) -> Result<Vec<PathBuf>, TransformError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TransformError::io(parent, e))?;
        }
        if force || is_stale(src, dest) {
            fs::copy(src, dest).map_err(|e| TransformError::io(src, e))?;
        }

        let (width, _) = image::image_dimensions(src)
            .map_err(|e| TransformError::Image(format!("{}: {}", src.display(), e)))?;

        let variants: Vec<(u32, VariantFormat, PathBuf)> = self
            .policy
            .target_widths(width)
            .into_iter()
            .flat_map(|w| {
                VariantFormat::ALL
                    .into_iter()
                    .map(move |f| (w, f, variant_path(dest, w, f)))
            })
            .collect();

        let stale: Vec<&(u32, VariantFormat, PathBuf)> = variants
            .iter()
            .filter(|(_, _, path)| force || is_stale(src, path))
            .collect();

        if !stale.is_empty() {
            let img = image::open(src)
                .map_err(|e| TransformError::Image(format!("{}: {}", src.display(), e)))?;

            stale
                .par_iter()
                .map(|(w, f, path)| self.encode(&img, *w, *f, path))
                .collect::<Result<Vec<()>, TransformError>>()?;

            tracing::info!("Generated {} image variants for {}", stale.len(), src.display());
        }

        let mut outputs = vec![dest.to_path_buf()];
        outputs.extend(variants.into_iter().map(|(_, _, path)| path));
        Ok(outputs)
    }
}

/// Output missing or older than its source.
fn is_stale(src: &Path, output: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();

    match (modified(src), modified(output)) {
        (Some(src_time), Some(out_time)) => out_time < src_time,
        (_, None) => true,
        (None, Some(_)) => false,
    }
}

fn scaled_height(src_width: u32, src_height: u32, width: u32) -> u32 {
    if src_width == 0 {
        return src_height.max(1);
    }
    let scaled = (u64::from(src_height) * u64::from(width) + u64::from(src_width) / 2)
        / u64::from(src_width);
    scaled.max(1) as u32
}

/// Where an image is shown, which decides its `sizes` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageContext {
    /// Inside a document body
    Content,
    /// Full-width featured tile
    Featured,
    /// Grid tile
    Grid,
}

fn sizes_attr(policy: &ImagePolicy, context: ImageContext, widths: &[u32]) -> String {
    match context {
        ImageContext::Content | ImageContext::Featured => policy.sizes_attr(),
        ImageContext::Grid => {
            let tile = widths.first().copied().unwrap_or(policy.max_size);
            match policy.responsive.breakpoints.first() {
                Some(bp) => format!("(max-width: {}px) {}, {}px", bp.max_width, bp.width, tile),
                None => format!("{}px", tile),
            }
        }
    }
}

/// `<picture>` markup for a raster image of the given source dimensions.
pub fn picture_markup(
    src: &str,
    alt: &str,
    title: &str,
    (width, height): (u32, u32),
    policy: &ImagePolicy,
    context: ImageContext,
) -> String {
    let widths = policy.target_widths(width);
    let sizes = sizes_attr(policy, context, &widths);

    let mut html = String::from("<picture>");
    for format in VariantFormat::ALL {
        let srcset = widths
            .iter()
            .map(|w| format!("{} {}w", variant_href(src, *w, format), w))
            .collect::<Vec<_>>()
            .join(", ");
        html.push_str(&format!(
            r#"<source type="{}" srcset="{}" sizes="{}">"#,
            format.mime(),
            escape_html(&srcset),
            escape_html(&sizes)
        ));
    }

    let title_attr = if title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, escape_html(title))
    };
    let loading = if context == ImageContext::Featured {
        "eager"
    } else {
        "lazy"
    };
    html.push_str(&format!(
        r#"<img src="{}" alt="{}"{} width="{}" height="{}" loading="{}" decoding="async"></picture>"#,
        escape_html(src),
        escape_html(alt),
        title_attr,
        width,
        height,
        loading
    ));

    html
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Local raster image reference (not absolute, not a URL).
pub fn is_local_raster(src: &str) -> bool {
    if src.starts_with('/') || src.contains("://") || src.starts_with("data:") {
        return false;
    }
    let path = src.split(['?', '#']).next().unwrap_or(src);
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| RASTER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Renders markdown images next to a document as `<picture>` elements.
pub struct ResponsiveImages<'a> {
    pub policy: &'a ImagePolicy,
    /// Directory the document's relative image paths resolve against
    pub base_dir: &'a Path,
}

impl ImageRenderer for ResponsiveImages<'_> {
    fn render_image(&self, src: &str, title: &str, alt: &str) -> Option<String> {
        if !is_local_raster(src) {
            return None;
        }

        let size = image::image_dimensions(self.base_dir.join(src)).ok()?;
        Some(picture_markup(src, alt, title, size, self.policy, ImageContext::Content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(width, height, Rgb([200, 40, 40]))
            .save(path)
            .unwrap();
    }

    fn small_policy() -> ImagePolicy {
        ImagePolicy {
            sizes: vec![8, 16],
            max_size: 16,
            ..Default::default()
        }
    }

    #[test]
    fn names_variants_next_to_destination() {
        assert_eq!(
            variant_path(Path::new("out/posts/a/cat.jpg"), 480, VariantFormat::Webp),
            PathBuf::from("out/posts/a/cat-480.webp")
        );
        assert_eq!(variant_href("img/cat.jpg", 960, VariantFormat::Avif), "img/cat-960.avif");
        assert_eq!(variant_href("../x.y/cat", 960, VariantFormat::Avif), "../x.y/cat-960.avif");
    }

    #[test]
    fn generates_and_reports_variants() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src/photo.png");
        let dest = temp.path().join("out/photo.png");
        write_png(&src, 32, 16);

        let outputs = ImagePipeline::new(small_policy())
            .resize(&src, &dest, false)
            .unwrap();

        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[0], dest);
        for path in &outputs {
            assert!(path.exists(), "missing {}", path.display());
        }
        let (w, h) = image::image_dimensions(variant_path(&dest, 8, VariantFormat::Webp)).unwrap();
        assert_eq!((w, h), (8, 4));
    }

    #[test]
    fn skips_fresh_variants_unless_forced() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src/photo.png");
        let dest = temp.path().join("out/photo.png");
        write_png(&src, 16, 16);
        let pipeline = ImagePipeline::new(small_policy());
        pipeline.resize(&src, &dest, false).unwrap();

        let variant = variant_path(&dest, 8, VariantFormat::Webp);
        fs::write(&variant, b"kept").unwrap();

        pipeline.resize(&src, &dest, false).unwrap();
        assert_eq!(fs::read(&variant).unwrap(), b"kept");

        pipeline.resize(&src, &dest, true).unwrap();
        assert_ne!(fs::read(&variant).unwrap(), b"kept");
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src/fake.jpg");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, b"not an image").unwrap();

        let dest = temp.path().join("out/fake.jpg");
        let result = ImagePipeline::new(small_policy()).resize(&src, &dest, false);

        assert!(matches!(result, Err(TransformError::Image(_))));
    }

    #[test]
    fn builds_picture_markup() {
        let html = picture_markup(
            "cat.jpg",
            "A \"cat\"",
            "",
            (1200, 800),
            &ImagePolicy::default(),
            ImageContext::Content,
        );

        assert!(html.starts_with("<picture><source type=\"image/avif\""));
        assert!(html.contains(r#"srcset="cat-480.avif 480w, cat-960.avif 960w""#));
        assert!(html.contains(r#"srcset="cat-480.webp 480w, cat-960.webp 960w""#));
        assert!(html.contains(r#"alt="A &quot;cat&quot;""#));
        assert!(html.contains(r#"width="1200" height="800""#));
        assert!(html.contains(
            r#"sizes="(max-width: 480px) 96vw, (max-width: 960px) 90vw, 960px""#
        ));
    }

    #[test]
    fn grid_tiles_use_smallest_width() {
        let policy = ImagePolicy::default();
        let html = picture_markup("a.png", "", "", (2000, 1000), &policy, ImageContext::Grid);

        assert!(html.contains(r#"sizes="(max-width: 480px) 96vw, 480px""#));
    }

    #[test]
    fn recognises_local_raster_references() {
        assert!(is_local_raster("photo.JPG"));
        assert!(is_local_raster("img/photo.png?v=1"));
        assert!(!is_local_raster("/abs/photo.png"));
        assert!(!is_local_raster("https://x.org/photo.png"));
        assert!(!is_local_raster("logo.svg"));
    }

    #[test]
    fn renders_document_images_with_known_size() {
        let temp = tempdir().unwrap();
        write_png(&temp.path().join("cat.png"), 20, 10);
        let policy = small_policy();
        let renderer = ResponsiveImages {
            policy: &policy,
            base_dir: temp.path(),
        };

        let html = renderer.render_image("cat.png", "", "cat").unwrap();

        assert!(html.contains(r#"width="20" height="10""#));
        assert!(renderer.render_image("missing.png", "", "x").is_none());
    }
}
