use pretty_assertions::assert_eq;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

use guidesite::config::AssetMode;
use guidesite::error::Stage;
use guidesite::html::Templates;
use guidesite::markdown::{CmarkRenderer, MarkdownRenderer};
use guidesite::{BuildConfig, BuildError, RenderError, SiteBuilder, SiteConfig};

const FAIL_MARKER: &str = "RENDER-FAIL";

/// Fails any page containing `FAIL_MARKER`.
struct FailingRenderer(CmarkRenderer);

impl MarkdownRenderer for FailingRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        if markdown.contains(FAIL_MARKER) {
            return Err(RenderError::Markdown("marker found".to_string()));
        }
        self.0.render(markdown)
    }
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

struct Site {
    dir: TempDir,
}

impl Site {
    fn new(files: &[(&str, &str)]) -> Site {
        let dir = TempDir::new().unwrap();
        for (rel, body) in files {
            write(&dir.path().join("content").join(rel), body);
        }
        write(&dir.path().join("assets/styles.css"), "body { margin: 0; }");
        Site { dir }
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    fn config(&self) -> BuildConfig {
        BuildConfig {
            source: self.dir.path().join("content"),
            target: self.out(),
            assets: self.dir.path().join("assets"),
            templates: None,
            clean: true,
            site: SiteConfig {
                site_url: "https://guides.example.com".to_string(),
                ..SiteConfig::default()
            },
        }
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.out().join(rel)).unwrap_or_else(|e| panic!("{rel}: {e}"))
    }
}

fn twelve_pages() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "pages/index.yaml",
            "title: Guides\ncontent: |\n  # Welcome\n  Start with [AWS](aws/README.md).\n",
        ),
        ("aws/README.md", "# AWS\n\n- [S3](s3.md)\n- [Glue](glue.md#jobs)\n"),
        ("aws/s3.md", "# S3\n\n## Buckets\n\nBack to [AWS](README.md).\n"),
        ("aws/glue.md", "# Glue\n\n## Jobs\n"),
        ("gcp/README.md", "# GCP\n\nSee [BigQuery](bigquery.md).\n"),
        (
            "gcp/bigquery.md",
            "# BigQuery\n\nCompare with [S3](/aws/s3.md) and [gone](missing.md).\n",
        ),
        ("azure/README.md", "# Azure\n"),
        ("databricks/README.md", "# Databricks\n"),
        ("sql/README.md", "# SQL\n\n[Joins](joins.md)\n"),
        ("sql/joins.md", "# Joins\n\nRENDER-FAIL\n"),
        ("docs/x/README.md", "# X\n"),
        ("docs/y.md", "# Y\n\nGo to [x](x/README.md).\n"),
    ]
}

fn build(config: BuildConfig) -> guidesite::BuildReport {
    SiteBuilder::new(config, Box::new(CmarkRenderer::default()), Templates::default())
        .build()
        .unwrap()
}

fn build_with_failing_renderer(site: &Site) -> guidesite::BuildReport {
    let renderer = FailingRenderer(CmarkRenderer::default());
    SiteBuilder::new(site.config(), Box::new(renderer), Templates::default())
        .build()
        .unwrap()
}

#[test]
fn test_one_failure_in_twelve_pages() {
    let site = Site::new(&twelve_pages());
    let report = build_with_failing_renderer(&site);

    assert_eq!(report.pages.len(), 11);
    assert_eq!(report.errors.len(), 1);
    assert!(!report.is_success());

    let failure = &report.errors[0];
    assert_eq!(failure.path, PathBuf::from("sql/joins.md"));
    assert_eq!(failure.stage, Stage::BodyRendered);
    assert!(matches!(failure.source, BuildError::Render(RenderError::Markdown(_))));

    assert!(!site.out().join("sql/joins.html").exists());
    for page in [
        "index.html",
        "aws/index.html",
        "aws/s3.html",
        "aws/glue.html",
        "gcp/index.html",
        "gcp/bigquery.html",
        "azure/index.html",
        "databricks/index.html",
        "sql/index.html",
        "docs/x/index.html",
        "docs/y.html",
    ] {
        assert!(site.out().join(page).is_file(), "{page} missing");
    }
}

#[test]
fn test_links_are_rewritten_across_the_site() {
    let site = Site::new(&twelve_pages());
    build_with_failing_renderer(&site);

    assert!(site.read("docs/y.html").contains(r#"<a href="x/index.html">x</a>"#));
    assert!(site.read("index.html").contains(r#"<a href="aws/index.html">AWS</a>"#));

    let aws = site.read("aws/index.html");
    assert!(aws.contains(r#"<a href="s3.html">S3</a>"#));
    assert!(aws.contains(r#"<a href="glue.html#jobs">Glue</a>"#));

    let bigquery = site.read("gcp/bigquery.html");
    assert!(bigquery.contains(r#"<a href="../aws/s3.html">S3</a>"#));
    // unknown targets stay as written
    assert!(bigquery.contains(r#"<a href="missing.md">gone</a>"#));

    // the failed page still counts as a known page for its siblings
    assert!(site.read("sql/index.html").contains(r#"<a href="joins.html">Joins</a>"#));
}

#[test]
fn test_pages_share_chrome() {
    let site = Site::new(&twelve_pages());
    build_with_failing_renderer(&site);

    let s3 = site.read("aws/s3.html");
    assert!(s3.contains("<title>S3 | Data Engineering Guides</title>"));
    assert!(s3.contains(r#"<link rel="stylesheet" href="../assets/styles.css">"#));
    assert!(s3.contains(r#"<a href="./" class="nav-link active">AWS</a>"#));
    assert!(s3.contains(r##"<a href="#buckets">Buckets</a>"##));
    assert!(s3.contains(r#"<link rel="canonical" href="https://guides.example.com/aws/s3.html">"#));

    let home = site.read("index.html");
    assert!(home.contains(r#"<link rel="stylesheet" href="assets/styles.css">"#));
    assert!(home.contains(r#"<a href="aws/" class="nav-link">AWS</a>"#));
    assert!(!home.contains("breadcrumb-current"));

    assert_eq!(site.read("assets/styles.css"), "body { margin: 0; }");
}

#[test]
fn test_sitemap_and_robots() {
    let site = Site::new(&twelve_pages());
    build_with_failing_renderer(&site);

    let sitemap = site.read("sitemap.xml");
    let locs: Vec<&str> = sitemap
        .lines()
        .filter_map(|l| l.trim().strip_prefix("<loc>")?.strip_suffix("</loc>"))
        .collect();
    assert_eq!(locs.len(), 11);
    assert_eq!(locs[0], "https://guides.example.com/");
    assert!(locs.contains(&"https://guides.example.com/aws/"));
    assert!(locs.contains(&"https://guides.example.com/aws/s3"));
    assert!(!locs.iter().any(|l| l.contains("joins")));
    let mut sorted = locs.clone();
    sorted.sort();
    assert_eq!(locs, sorted);

    assert_eq!(
        site.read("robots.txt"),
        "User-agent: *\nAllow: /\n\nSitemap: https://guides.example.com/sitemap.xml\n"
    );
}

#[test]
fn test_rebuild_is_stable() {
    let site = Site::new(&twelve_pages());
    build_with_failing_renderer(&site);
    let first = site.read("aws/s3.html");
    let report = build_with_failing_renderer(&site);
    assert_eq!(report.pages.len(), 11);
    assert_eq!(site.read("aws/s3.html"), first);
}

#[test]
fn test_clean_only_removes_generated_entries() {
    let site = Site::new(&[("aws/s3.md", "# S3\n")]);
    write(&site.out().join("aboutme.html"), "stale");
    write(&site.out().join("aws/old-page.html"), "stale");
    write(&site.out().join("CNAME"), "guides.example.com");

    let report = build(site.config());
    assert!(report.is_success());
    assert!(!site.out().join("aboutme.html").exists());
    assert!(!site.out().join("aws/old-page.html").exists());
    assert!(site.out().join("aws/s3.html").is_file());
    assert_eq!(site.read("CNAME"), "guides.example.com");
}

#[test]
fn test_clean_never_touches_sources_inside_output() {
    // content lives inside the output root, as in a repository published from its root
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(&root.join("aws/s3.md"), "# S3\n");
    write(&root.join("assets/styles.css"), "css");
    let config = BuildConfig {
        source: root.to_path_buf(),
        target: root.to_path_buf(),
        assets: root.join("assets"),
        templates: None,
        clean: true,
        site: SiteConfig::default(),
    };
    let report = build(config);
    assert!(report.is_success());
    assert!(root.join("aws/s3.md").is_file());
    assert!(root.join("aws/s3.html").is_file());
    assert_eq!(fs::read_to_string(root.join("assets/styles.css")).unwrap(), "css");
}

#[test]
fn test_passthrough_and_prebuilt_files() {
    let site = Site::new(&[
        ("img/diagram.png", "PNG"),
        (
            "learn_concepts/README.html",
            "<html><head><title>Learn</title></head><body><main><h1 id=\"learn\">Learn</h1></main></body></html>",
        ),
        ("learn_concepts/README.md", "# Source of the committed HTML"),
        ("learn_concepts/progress.json", "{}"),
    ]);
    let report = build(site.config());
    assert!(report.is_success());
    assert_eq!(site.read("img/diagram.png"), "PNG");
    assert_eq!(site.read("learn_concepts/progress.json"), "{}");

    let learn = site.read("learn_concepts/README.html");
    assert!(learn.contains("<title>Learn | Data Engineering Guides</title>"));
    assert!(learn.contains(r#"<a href="./" class="nav-link active">Learn</a>"#));
    assert_eq!(report.pages, vec![PathBuf::from("learn_concepts/README.html")]);
}

#[test]
fn test_mirrored_assets() {
    let site = Site::new(&[("gcp/bigquery.md", "# BigQuery\n")]);
    let mut config = site.config();
    config.site.asset_mode = AssetMode::Mirrored;
    build(config);
    assert!(site.out().join("gcp/assets/styles.css").is_file());
    assert!(site.out().join("assets/styles.css").is_file());
    assert!(site.read("gcp/bigquery.html").contains(r#"href="assets/styles.css""#));
}

#[test]
fn test_malformed_site_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("site.yaml");
    write(&path, "sections: [unclosed");
    assert!(matches!(SiteConfig::load(&path), Err(BuildError::SiteConfig { .. })));
}

#[test]
fn test_links_to_prebuilt_sources_reach_their_html() {
    let site = Site::new(&[
        ("aws/README.md", "# AWS\n\nStart with [intro](../learn_concepts/docs/intro.md).\n"),
        ("learn_concepts/docs/intro.md", "# Intro"),
        ("learn_concepts/docs/intro.html", "<main><h1 id=\"intro\">Intro</h1></main>"),
    ]);
    let report = build(site.config());
    assert!(report.is_success());
    let aws = site.read("aws/index.html");
    assert!(aws.contains(r#"<a href="../learn_concepts/docs/intro.html">intro</a>"#), "{aws}");
}

#[test]
fn test_failed_passthrough_copy_fails_the_build() {
    let site = Site::new(&[("aws/s3.md", "# S3\n"), ("img/diagram.png", "PNG")]);
    // a directory where the copy has to land
    fs::create_dir_all(site.out().join("img/diagram.png")).unwrap();

    let report = build(site.config());
    assert!(!report.is_success());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, PathBuf::from("img/diagram.png"));
    assert_eq!(report.errors[0].stage, Stage::Emitted);
    assert!(site.out().join("aws/s3.html").is_file());
}
