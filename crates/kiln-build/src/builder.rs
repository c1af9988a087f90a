//! Static site builder.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::context::{slash_path, BuildContext, BuildOptions, SourceFile, TreeRoot};
use crate::dispatch::{Dispatcher, OutputKind};
use crate::images::{ImagePipeline, ImageResizer};
use crate::sweep::sweep_orphans;
use crate::templates::TemplateEngine;

const NOJEKYLL: &str = "# This file tells GitHub Pages not to use Jekyll";

/// Result of a build operation.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Rendered documents
    pub documents: usize,

    /// Fingerprinted styles and scripts
    pub assets: usize,

    /// Images processed with their variants
    pub images: usize,

    /// Files copied verbatim, fallbacks included
    pub copied: usize,

    /// Files whose transform failed and were copied instead
    pub fallbacks: usize,

    /// Orphaned files removed by the sweep
    pub removed_files: usize,

    /// Empty directories removed by the sweep
    pub removed_dirs: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that abort a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read source: {0}")]
    ReadError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Build task failed: {0}")]
    TaskFailed(String),
}

/// Incremental static site builder.
///
/// Cheap to clone; every build gets a fresh [`BuildContext`], dispatcher and
/// template engine, so edits to templates are picked up by the next build.
#[derive(Clone)]
pub struct SiteBuilder {
    config: Arc<SiteConfig>,
    resizer: Arc<dyn ImageResizer>,
}

impl SiteBuilder {
    /// Create a builder using the standard image pipeline.
    pub fn new(config: SiteConfig) -> Self {
        let resizer = Arc::new(ImagePipeline::new(config.images.clone()));
        Self {
            config: Arc::new(config),
            resizer,
        }
    }

    /// Replace the image resizer.
    pub fn with_resizer(mut self, resizer: Arc<dyn ImageResizer>) -> Self {
        self.resizer = resizer;
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Build the site on the blocking thread pool.
    pub async fn build(&self, options: BuildOptions) -> Result<BuildReport, BuildError> {
        let builder = self.clone();

        tokio::task::spawn_blocking(move || builder.run(options))
            .await
            .map_err(|e| BuildError::TaskFailed(e.to_string()))?
    }

    /// Build the site on the current thread.
    pub fn run(&self, options: BuildOptions) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let config = &self.config;
        let output_dir = &config.output_dir;

        if !config.source_dir.is_dir() {
            return Err(BuildError::ReadError(format!(
                "Source directory not found: {}",
                config.source_dir.display()
            )));
        }

        let mut ctx = BuildContext::new(options);

        if ctx.options.clean {
            empty_dir(output_dir)?;
        }
        fs::create_dir_all(output_dir)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", output_dir.display(), e)))?;

        let dispatcher = Dispatcher::standard(
            Arc::clone(config),
            TemplateEngine::for_config(config),
            Arc::clone(&self.resizer),
        );

        let mut report = BuildReport {
            output_dir: output_dir.clone(),
            ..Default::default()
        };
        let mut documents = Vec::new();

        // Phase 1: everything but documents, static tree first.
        let mut files = match config.resolve_static_dir() {
            Some(static_dir) => walk_tree(
                &static_dir,
                &output_dir.join("static"),
                "static",
                TreeRoot::Static,
            )?,
            None => {
                tracing::info!("No static directory found, skipping static files");
                Vec::new()
            }
        };
        files.extend(walk_tree(&config.source_dir, output_dir, "", TreeRoot::Content)?);

        for file in files {
            if dispatcher.kind_of(&file) == OutputKind::Document {
                documents.push(file);
            } else {
                process_file(&dispatcher, &mut ctx, &file, &mut report)?;
            }
        }
        tracing::debug!("Asset manifest has {} entries", ctx.manifest.len());

        // Phase 2: documents, against the complete manifest.
        for file in &documents {
            process_file(&dispatcher, &mut ctx, file, &mut report)?;
        }

        self.write_synthetic_files(&mut ctx)?;

        let sweep = sweep_orphans(output_dir, &ctx.processed)
            .map_err(|e| BuildError::WriteError(format!("sweep {}: {}", output_dir.display(), e)))?;
        report.removed_files = sweep.files;
        report.removed_dirs = sweep.dirs;

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Built {} docs, {} assets, {} images, {} copied ({} fallback), {} swept in {}ms",
            report.documents,
            report.assets,
            report.images,
            report.copied,
            report.fallbacks,
            report.removed_files,
            report.duration_ms
        );

        Ok(report)
    }

    /// `.nojekyll` always, `CNAME` when a custom domain is configured.
    fn write_synthetic_files(&self, ctx: &mut BuildContext) -> Result<(), BuildError> {
        let mut files = vec![(".nojekyll", NOJEKYLL.to_string())];
        if let Some(domain) = &self.config.custom_domain {
            files.push(("CNAME", domain.clone()));
        }

        for (name, contents) in files {
            let path = self.config.output_dir.join(name);
            fs::write(&path, contents)
                .map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))?;
            ctx.processed.insert(path);
        }

        Ok(())
    }
}

fn process_file(
    dispatcher: &Dispatcher,
    ctx: &mut BuildContext,
    file: &SourceFile,
    report: &mut BuildReport,
) -> Result<(), BuildError> {
    let dispatched = dispatcher
        .process(ctx, file)
        .map_err(|e| BuildError::WriteError(format!("{}: {}", file.rel, e)))?;

    if dispatched.fell_back {
        report.fallbacks += 1;
    }
    match dispatched.kind {
        OutputKind::Document => report.documents += 1,
        OutputKind::Asset => report.assets += 1,
        OutputKind::Image => report.images += 1,
        OutputKind::Copy => report.copied += 1,
    }

    if let Some((original, hashed)) = dispatched.output.manifest_entry {
        ctx.manifest.insert(original, hashed);
    }
    ctx.processed.extend(dispatched.output.outputs);

    Ok(())
}

/// Every file under `root`, depth-first in file-name order.
///
/// Destination directories are created as they are reached. `prefix` is
/// prepended to output-relative paths.
fn walk_tree(
    root: &Path,
    dest_root: &Path,
    prefix: &str,
    tree: TreeRoot,
) -> Result<Vec<SourceFile>, BuildError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::ReadError(e.to_string()))?;
        let rel_path = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let dest = dest_root.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)
                .map_err(|e| BuildError::WriteError(format!("{}: {}", dest.display(), e)))?;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = slash_path(rel_path);
        let output_rel = if prefix.is_empty() {
            rel.clone()
        } else {
            format!("{}/{}", prefix, rel)
        };

        files.push(SourceFile {
            name: entry.file_name().to_string_lossy().to_string(),
            src: entry.path().to_path_buf(),
            rel,
            dest,
            output_rel,
            root: tree,
        });
    }

    Ok(files)
}

/// Remove everything inside `dir`, keeping `dir` itself.
fn empty_dir(dir: &Path) -> Result<(), BuildError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(BuildError::WriteError(format!("{}: {}", dir.display(), e))),
    };

    for entry in entries {
        let path = entry
            .map_err(|e| BuildError::WriteError(e.to_string()))?
            .path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))?;
    }

    tracing::info!("Cleaned {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{fingerprint, hashed_file_name};
    use tempfile::{tempdir, TempDir};

    struct Site {
        _temp: TempDir,
        root: PathBuf,
    }

    impl Site {
        fn new() -> Self {
            let temp = tempdir().unwrap();
            let root = temp.path().to_path_buf();
            fs::create_dir_all(root.join("content")).unwrap();
            Self { _temp: temp, root }
        }

        fn write(&self, rel: &str, body: &str) {
            let path = self.root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }

        fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.root.join(rel)).unwrap()
        }

        fn builder(&self) -> SiteBuilder {
            SiteBuilder::new(SiteConfig {
                source_dir: self.root.join("content"),
                output_dir: self.root.join("docs"),
                static_dir: self.root.join("static"),
                templates_dir: self.root.join("templates"),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn index_lists_posts_newest_first() {
        let site = Site::new();
        site.write("content/index.md", "---\ntitle: Home\n---\n{{postsList}}\n");
        site.write("content/posts/a/index.md", "---\ntitle: A\ndate: 2024-01-01\n---\nA\n");
        site.write("content/posts/b/index.md", "---\ntitle: B\ndate: 2024-06-01\n---\nB\n");

        let report = site.builder().build(BuildOptions::default()).await.unwrap();

        assert_eq!(report.documents, 3);
        let html = site.read("docs/index.html");
        let b = html.find(r#"href="posts/b/""#).unwrap();
        let a = html.find(r#"href="posts/a/""#).unwrap();
        assert!(b < a);
        assert!(site.root.join("docs/posts/a/index.html").exists());
    }

    #[tokio::test]
    async fn pages_reference_hashed_stylesheet() {
        let site = Site::new();
        site.write("static/css/style.css", "body{color:red}");
        site.write("content/about.md", "# About\n");

        let report = site.builder().build(BuildOptions::default()).await.unwrap();

        let hashed = hashed_file_name("style.css", &fingerprint("body{color:red}"));
        assert_eq!(report.assets, 1);
        assert_eq!(site.read(&format!("docs/static/css/{hashed}")), "body{color:red}");
        assert!(!site.root.join("docs/static/css/style.css").exists());
        assert!(site
            .read("docs/about.html")
            .contains(&format!(r#"href="static/css/{hashed}""#)));
    }

    #[tokio::test]
    async fn changed_stylesheet_replaces_old_hash() {
        let site = Site::new();
        site.write("static/css/style.css", "body{color:red}");
        site.write("content/index.md", "Home\n");
        let builder = site.builder();
        builder.build(BuildOptions::default()).await.unwrap();

        site.write("static/css/style.css", "body{color:blue}");
        builder.build(BuildOptions::default()).await.unwrap();

        let old = hashed_file_name("style.css", &fingerprint("body{color:red}"));
        let new = hashed_file_name("style.css", &fingerprint("body{color:blue}"));
        assert!(!site.root.join("docs/static/css").join(old).exists());
        assert!(site.root.join("docs/static/css").join(&new).exists());
        assert!(site.read("docs/index.html").contains(&new));
    }

    #[tokio::test]
    async fn removes_orphans_after_clean_rebuild() {
        let site = Site::new();
        site.write("content/index.md", "Home\n");
        site.write("docs/old/page.html", "<p>stale</p>");

        let report = site
            .builder()
            .build(BuildOptions {
                clean: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!site.root.join("docs/old").exists());
        assert!(site.root.join("docs/index.html").exists());
        assert!(site.root.join("docs/.nojekyll").exists());
        assert_eq!(report.removed_files, 0);
    }

    #[tokio::test]
    async fn sweeps_orphans_without_clean() {
        let site = Site::new();
        site.write("content/index.md", "Home\n");
        site.write("docs/old/page.html", "<p>stale</p>");

        let report = site.builder().build(BuildOptions::default()).await.unwrap();

        assert!(!site.root.join("docs/old").exists());
        assert_eq!(report.removed_files, 1);
        assert_eq!(report.removed_dirs, 1);
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let site = Site::new();
        site.write("static/js/app.js", "const x = 1; console.log(x);");
        site.write("content/index.md", "Home\n");
        site.write("content/data/file.bin", "raw");
        let builder = site.builder();

        builder.build(BuildOptions::default()).await.unwrap();
        let first = site.read("docs/index.html");
        let report = builder.build(BuildOptions::default()).await.unwrap();

        assert_eq!(site.read("docs/index.html"), first);
        assert_eq!(report.removed_files, 0);
        assert_eq!(site.read("docs/data/file.bin"), "raw");
    }

    #[tokio::test]
    async fn pages_reference_hashed_sibling_assets() {
        let site = Site::new();
        let script = "const x = 1; console.log(x);";
        site.write("content/posts/a/demo.js", script);
        site.write(
            "content/posts/a/index.md",
            concat!(
                "<script src=\"demo.js\"></script>\n",
                "<script src=\"{{root}}posts/a/demo.js\"></script>\n",
            ),
        );

        site.builder().build(BuildOptions::default()).await.unwrap();

        let hashed = hashed_file_name("demo.js", &fingerprint(script));
        let html = site.read("docs/posts/a/index.html");
        assert!(html.contains(&format!(r#"<script src="{hashed}"></script>"#)));
        assert!(html.contains(&format!(r#"<script src="../../posts/a/{hashed}"></script>"#)));
        assert!(!html.contains("demo.js\""));
        assert!(site.root.join("docs/posts/a").join(&hashed).exists());
        assert!(!site.root.join("docs/posts/a/demo.js").exists());
    }

    #[tokio::test]
    async fn writes_cname_only_when_configured() {
        let site = Site::new();
        site.write("content/index.md", "Home\n");
        let builder = SiteBuilder::new(SiteConfig {
            custom_domain: Some("example.org".to_string()),
            ..site.builder().config().clone()
        });

        builder.build(BuildOptions::default()).await.unwrap();
        assert_eq!(site.read("docs/CNAME"), "example.org");
        assert_eq!(site.read("docs/.nojekyll"), NOJEKYLL);

        site.builder().build(BuildOptions::default()).await.unwrap();
        assert!(!site.root.join("docs/CNAME").exists());
    }

    #[tokio::test]
    async fn failed_transform_is_copied() {
        let site = Site::new();
        site.write("content/broken.md", "---\ntitle: [oops\n---\n");

        let report = site.builder().build(BuildOptions::default()).await.unwrap();

        assert_eq!(report.fallbacks, 1);
        assert!(site.root.join("docs/broken.md").exists());
    }

    #[tokio::test]
    async fn module_script_is_copied_verbatim() {
        let site = Site::new();
        site.write("static/js/module.js", "export const x = 1;");

        let report = site.builder().build(BuildOptions::default()).await.unwrap();

        assert_eq!(report.fallbacks, 1);
        assert_eq!(report.assets, 0);
        assert_eq!(site.read("docs/static/js/module.js"), "export const x = 1;");
    }

    #[tokio::test]
    async fn missing_source_directory_aborts() {
        let site = Site::new();
        site.write("docs/keep.html", "kept");
        fs::remove_dir_all(site.root.join("content")).unwrap();

        let result = site.builder().build(BuildOptions::default()).await;

        assert!(matches!(result, Err(BuildError::ReadError(_))));
        assert_eq!(site.read("docs/keep.html"), "kept");
    }
}
