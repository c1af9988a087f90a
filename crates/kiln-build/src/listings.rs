//! Generated listings for the site index: posts and projects.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use kiln_markdown::{extract_frontmatter, Frontmatter};

use crate::config::ImagePolicy;
use crate::images::{escape_html, is_local_raster, picture_markup, ImageContext};

const COVER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Index entry for a post or project directory.
#[derive(Debug, Clone, PartialEq)]
struct Entry {
    slug: String,
    title: String,
    date: NaiveDate,
    featured: bool,
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// `YYYY-MM-DD` or RFC 3339; anything else sorts as the epoch.
fn parse_date(raw: Option<&str>) -> NaiveDate {
    let Some(raw) = raw.map(str::trim) else {
        return epoch();
    };

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .unwrap_or_else(|_| epoch())
}

fn read_frontmatter(path: &Path) -> Option<Frontmatter> {
    let source = fs::read_to_string(path).ok()?;
    match extract_frontmatter(&source) {
        Ok((frontmatter, _)) => Some(frontmatter),
        Err(e) => {
            tracing::warn!("Ignoring front matter in {}: {}", path.display(), e);
            Some(Frontmatter::default())
        }
    }
}

/// Subdirectory names of `dir`, sorted. Empty if `dir` is unreadable.
fn subdirectories(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn entry_for(slug: String, frontmatter: Option<&Frontmatter>) -> Entry {
    Entry {
        title: frontmatter
            .and_then(|f| f.title.clone())
            .unwrap_or_else(|| slug.clone()),
        date: parse_date(frontmatter.and_then(|f| f.date.as_deref())),
        featured: frontmatter.is_some_and(|f| f.featured),
        slug,
    }
}

fn newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

/// `<li>` links to every post under `<source>/posts/*/index.md`, newest first.
///
/// Directories without an `index.md` are skipped.
pub fn posts_list(source_dir: &Path) -> String {
    let posts_root = source_dir.join("posts");

    let mut entries: Vec<Entry> = subdirectories(&posts_root)
        .into_iter()
        .filter_map(|slug| {
            let frontmatter = read_frontmatter(&posts_root.join(&slug).join("index.md"))?;
            Some(entry_for(slug, Some(&frontmatter)))
        })
        .collect();
    newest_first(&mut entries);

    entries
        .iter()
        .map(|e| format!(r#"<li><a href="posts/{}/">{}</a></li>"#, e.slug, escape_html(&e.title)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Project tiles for the site index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectsMarkup {
    /// The featured project's tile
    pub featured: String,
    /// Every other project, newest first
    pub grid: String,
}

/// Tiles for every directory under `<source>/projects`.
///
/// The featured project is the first marked `featured: true`, otherwise the
/// newest one.
pub fn projects_markup(source_dir: &Path, policy: &ImagePolicy) -> ProjectsMarkup {
    let projects_root = source_dir.join("projects");

    let mut entries: Vec<Entry> = subdirectories(&projects_root)
        .into_iter()
        .map(|slug| {
            let frontmatter = read_frontmatter(&projects_root.join(&slug).join("index.md"));
            entry_for(slug, frontmatter.as_ref())
        })
        .collect();
    newest_first(&mut entries);

    let featured_idx = entries
        .iter()
        .position(|e| e.featured)
        .or((!entries.is_empty()).then_some(0));

    let mut markup = ProjectsMarkup::default();
    let mut grid = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let is_featured = Some(idx) == featured_idx;
        let tile = project_tile(&projects_root, entry, is_featured, policy);
        if is_featured {
            markup.featured = tile;
        } else {
            grid.push(tile);
        }
    }
    markup.grid = grid.join("\n\n");
    markup
}

/// Lowercased stem of an image file name usable as a cover.
fn cover_stem(name: &str) -> Option<String> {
    let path = Path::new(name);
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !COVER_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    Some(path.file_stem()?.to_string_lossy().to_ascii_lowercase())
}

/// `cover.<ext>`, else the first file whose stem ends in `image1`.
fn find_cover(dir: &Path) -> Option<String> {
    let mut files: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    files.sort();

    files
        .iter()
        .find(|f| cover_stem(f).is_some_and(|stem| stem == "cover"))
        .or_else(|| {
            files
                .iter()
                .find(|f| cover_stem(f).is_some_and(|stem| stem.ends_with("image1")))
        })
        .cloned()
}

fn project_tile(root: &Path, entry: &Entry, featured: bool, policy: &ImagePolicy) -> String {
    let dir: PathBuf = root.join(&entry.slug);
    let title = escape_html(&entry.title);

    let video_attr = if dir.join("video.mp4").is_file() {
        " data-video"
    } else {
        ""
    };

    let mut style_attr = String::new();
    let mut image = String::new();
    if let Some(cover) = find_cover(&dir) {
        let src = format!("projects/{}/{}", entry.slug, cover);
        let size = image::image_dimensions(dir.join(&cover)).ok();

        if let Some((w, h)) = size {
            style_attr = format!(r#" style="aspect-ratio:{}/{}""#, w, h);
        }

        let context = if featured {
            ImageContext::Featured
        } else {
            ImageContext::Grid
        };
        image = match size {
            Some(size) if is_local_raster(&src) => {
                picture_markup(&src, &entry.title, &entry.title, size, policy, context)
            }
            _ => format!(
                r#"<img src="{}" alt="{}" loading="lazy" decoding="async">"#,
                escape_html(&src),
                title
            ),
        };
    }

    format!(
        r#"<a class="project-item{}" href="projects/{}/"{}{}>{}<span class="caption">{}</span></a>"#,
        if featured { " full" } else { "" },
        entry.slug,
        video_attr,
        style_attr,
        image,
        title
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn lists_posts_newest_first() {
        let temp = tempdir().unwrap();
        let posts = temp.path().join("posts");
        write(&posts.join("a/index.md"), "---\ntitle: A\ndate: 2024-01-01\n---\n");
        write(&posts.join("b/index.md"), "---\ntitle: B\ndate: 2024-06-01\n---\n");
        write(&posts.join("c/index.md"), "No front matter\n");
        fs::create_dir_all(posts.join("draft")).unwrap();

        assert_eq!(
            posts_list(temp.path()),
            "<li><a href=\"posts/b/\">B</a></li>\n\
             <li><a href=\"posts/a/\">A</a></li>\n\
             <li><a href=\"posts/c/\">c</a></li>"
        );
    }

    #[test]
    fn missing_posts_directory_lists_nothing() {
        let temp = tempdir().unwrap();

        assert_eq!(posts_list(temp.path()), "");
    }

    #[test]
    fn parses_dates() {
        assert_eq!(parse_date(Some("2024-02-03")), NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
        assert_eq!(
            parse_date(Some("2024-02-03T10:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 2, 3).unwrap()
        );
        assert_eq!(parse_date(Some("soon")), epoch());
        assert_eq!(parse_date(None), epoch());
    }

    #[test]
    fn features_the_marked_project() {
        let temp = tempdir().unwrap();
        let projects = temp.path().join("projects");
        write(
            &projects.join("old/index.md"),
            "---\ntitle: Old\ndate: 2020-01-01\nfeatured: true\n---\n",
        );
        write(&projects.join("new/index.md"), "---\ntitle: New\ndate: 2024-01-01\n---\n");
        write(&projects.join("new/video.mp4"), "");

        let markup = projects_markup(temp.path(), &ImagePolicy::default());

        assert_eq!(
            markup.featured,
            concat!(
                r#"<a class="project-item full" href="projects/old/">"#,
                r#"<span class="caption">Old</span></a>"#
            )
        );
        assert_eq!(
            markup.grid,
            concat!(
                r#"<a class="project-item" href="projects/new/" data-video>"#,
                r#"<span class="caption">New</span></a>"#
            )
        );
    }

    #[test]
    fn newest_project_is_featured_by_default() {
        let temp = tempdir().unwrap();
        let projects = temp.path().join("projects");
        write(&projects.join("one/index.md"), "---\ndate: 2021-01-01\n---\n");
        write(&projects.join("two/index.md"), "---\ndate: 2023-01-01\n---\n");
        write(&projects.join("three/index.md"), "---\ndate: 2022-01-01\n---\n");

        let markup = projects_markup(temp.path(), &ImagePolicy::default());

        assert!(markup.featured.contains(r#"href="projects/two/""#));
        assert_eq!(markup.grid.matches("project-item").count(), 2);
        assert!(markup.grid.find("three").unwrap() < markup.grid.find("one").unwrap());
    }

    #[test]
    fn project_tiles_use_cover_images() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("projects/shot");
        fs::create_dir_all(&dir).unwrap();
        image::RgbImage::new(40, 20).save(dir.join("cover.png")).unwrap();
        write(&dir.join("logo.svg"), "<svg/>");

        let markup = projects_markup(temp.path(), &ImagePolicy::default());

        assert!(markup.featured.contains(r#"style="aspect-ratio:40/20""#));
        assert!(markup.featured.contains("<picture>"));
        assert!(markup.featured.contains(r#"src="projects/shot/cover.png""#));
    }

    #[test]
    fn falls_back_to_first_image() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("projects/art");
        write(&dir.join("art-image1.svg"), "<svg/>");

        assert_eq!(find_cover(&dir).as_deref(), Some("art-image1.svg"));
    }
}
