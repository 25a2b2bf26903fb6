use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mdcms_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mdcms");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Source tree to import
    let notes = root.join("notes");
    fs::create_dir_all(notes.join("Tech/AI")).unwrap();
    fs::create_dir_all(notes.join("Life")).unwrap();
    fs::write(
        notes.join("Tech/rust.md"),
        "# Rust Notes\n\nOwnership and borrowing explained.",
    )
    .unwrap();
    fs::write(
        notes.join("Tech/AI/llm.md"),
        "# Language Models\n\nNotes on transformers.",
    )
    .unwrap();
    fs::write(notes.join("Life/walk.md"), "A walk in the park.").unwrap();
    fs::write(notes.join("Life/photo.png"), [0u8, 1, 2]).unwrap();
    fs::write(notes.join("top.md"), "# Loose\n\nFile at the source root.").unwrap();

    let config_content = format!(
        r#"[content]
root = "{root}/content"

[data]
comments_file = "{root}/data/comments.json"
summaries_file = "{root}/data/summaries.json"

[server]
bind = "127.0.0.1:0"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("mdcms.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_mdcms(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mdcms_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("CONTENT_DIR")
        .env_remove("COMMENTS_FILE")
        .env_remove("SUMMARIES_FILE")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mdcms binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("not JSON ({}): {}", e, stdout))
}

fn import_notes(tmp: &TempDir, config_path: &Path) -> serde_json::Value {
    let notes = tmp.path().join("notes");
    let (stdout, stderr, success) = run_mdcms(config_path, &["import", notes.to_str().unwrap()]);
    assert!(success, "import failed: stdout={}, stderr={}", stdout, stderr);
    json(&stdout)
}

#[test]
fn test_import_reports_stats() {
    let (tmp, config_path) = setup_test_env();
    let result = import_notes(&tmp, &config_path);

    assert_eq!(result["success"], true);
    assert_eq!(result["stats"]["articles"], 4);
    assert_eq!(result["stats"]["errors"], 0);
    assert_eq!(result["stats"]["categories"], 3);
    let mut categories: Vec<String> = result["stats"]["categories_created"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();
    categories.sort();
    assert_eq!(categories, vec!["Life", "Tech", "notes"]);

    let content = tmp.path().join("content");
    assert!(content.join("Tech/AI/llm.md").is_file());
    assert!(content.join("notes/top.md").is_file());
    assert!(!content.join("Life/photo.png").exists());
}

#[test]
fn test_import_missing_directory_fails() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("nope");
    let (stdout, _stderr, success) = run_mdcms(&config_path, &["import", missing.to_str().unwrap()]);
    assert!(!success);
    let result = json(&stdout);
    assert_eq!(result["success"], false);
    assert!(result["message"].as_str().unwrap().contains("nope"));
}

#[test]
fn test_import_without_markdown_fails() {
    let (tmp, config_path) = setup_test_env();
    let empty = tmp.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    fs::write(empty.join("readme.txt"), "plain").unwrap();

    let (stdout, _stderr, success) = run_mdcms(&config_path, &["import", empty.to_str().unwrap()]);
    assert!(!success);
    assert_eq!(json(&stdout)["success"], false);
}

#[test]
fn test_categories_after_import() {
    let (tmp, config_path) = setup_test_env();
    import_notes(&tmp, &config_path);

    let (stdout, stderr, success) = run_mdcms(&config_path, &["categories"]);
    assert!(success, "categories failed: {}", stderr);
    let ids: Vec<String> = json(&stdout)
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["Life", "Tech", "Tech/AI", "notes"]);
}

#[test]
fn test_articles_include_subcategories() {
    let (tmp, config_path) = setup_test_env();
    import_notes(&tmp, &config_path);

    let (stdout, _stderr, success) = run_mdcms(&config_path, &["articles", "Tech"]);
    assert!(success);
    let articles = json(&stdout);
    let articles = articles.as_array().unwrap();
    assert_eq!(articles.len(), 2);

    let llm = articles
        .iter()
        .find(|a| a["id"] == "Tech/AI/llm.md")
        .expect("nested article listed");
    assert_eq!(llm["category_id"], "Tech/AI");
    assert_eq!(llm["title"], "Language Models");
    assert_eq!(llm["comment_count"], 0);
}

#[test]
fn test_articles_unknown_category_is_empty() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _stderr, success) = run_mdcms(&config_path, &["articles", "Nowhere"]);
    assert!(success);
    assert_eq!(json(&stdout), serde_json::json!([]));
}

#[test]
fn test_get_article() {
    let (tmp, config_path) = setup_test_env();
    import_notes(&tmp, &config_path);

    let (stdout, _stderr, success) = run_mdcms(&config_path, &["get", "Life/walk.md"]);
    assert!(success);
    let article = json(&stdout);
    assert_eq!(article["title"], "A walk in the park.");
    assert_eq!(article["content"], "A walk in the park.");
}

#[test]
fn test_get_missing_article_fails() {
    let (tmp, config_path) = setup_test_env();
    import_notes(&tmp, &config_path);

    let (_stdout, stderr, success) = run_mdcms(&config_path, &["get", "Life/ghost.md"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_comment_roundtrip() {
    let (tmp, config_path) = setup_test_env();
    import_notes(&tmp, &config_path);

    let (stdout, stderr, success) = run_mdcms(
        &config_path,
        &["comment", "Tech/rust.md", "--author", "ann", "--content", "Nice"],
    );
    assert!(success, "comment failed: {}", stderr);
    let comment = json(&stdout);
    assert_eq!(comment["article_id"], "Tech/rust.md");
    assert_eq!(comment["author"], "ann");

    run_mdcms(
        &config_path,
        &["comment", "Tech/rust.md", "--author", "bob", "--content", "Agreed"],
    );

    let (stdout, _stderr, _) = run_mdcms(&config_path, &["comments", "Tech/rust.md"]);
    let authors: Vec<String> = json(&stdout)
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["author"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(authors, vec!["ann", "bob"]);

    let (stdout, _stderr, _) = run_mdcms(&config_path, &["get", "Tech/rust.md"]);
    assert_eq!(json(&stdout)["comment_count"], 2);

    let stored = fs::read_to_string(tmp.path().join("data/comments.json")).unwrap();
    assert!(stored.contains("Tech/rust.md"));
}

#[test]
fn test_summarize_without_providers_uses_excerpt() {
    let (tmp, config_path) = setup_test_env();
    import_notes(&tmp, &config_path);

    let (stdout, stderr, success) = run_mdcms(&config_path, &["summarize", "Tech/rust.md"]);
    assert!(success, "summarize failed: {}", stderr);
    assert_eq!(
        json(&stdout)["summary"],
        "This is an auto-generated summary: Ownership and borrowing explained...."
    );

    let (stdout, _stderr, _) = run_mdcms(&config_path, &["articles", "Tech"]);
    let articles = json(&stdout);
    let rust = articles
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["id"] == "Tech/rust.md")
        .unwrap()
        .clone();
    assert!(rust["summary"].as_str().unwrap().starts_with("This is an auto-generated summary"));
}

#[test]
fn test_upload_into_category() {
    let (tmp, config_path) = setup_test_env();
    let a = tmp.path().join("a.md");
    let b = tmp.path().join("b.md");
    fs::write(&a, "# A\n\nFirst upload.").unwrap();
    fs::write(&b, "# B\n\nSecond upload.").unwrap();

    let (stdout, stderr, success) = run_mdcms(
        &config_path,
        &["upload", "Docs/Guides", a.to_str().unwrap(), b.to_str().unwrap()],
    );
    assert!(success, "upload failed: stdout={}, stderr={}", stdout, stderr);
    let result = json(&stdout);
    assert_eq!(result["stats"]["articles"], 2);
    assert_eq!(result["stats"]["summaries_generated"], 2);
    assert_eq!(result["stats"]["categories"], 1);
    assert_eq!(result["stats"]["categories_created"], serde_json::json!(["Docs"]));

    let (stdout, _stderr, _) = run_mdcms(&config_path, &["get", "Docs/Guides/b.md"]);
    assert_eq!(
        json(&stdout)["summary"],
        "This is an auto-generated summary: Second upload...."
    );
}

#[test]
fn test_env_override_content_dir() {
    let (tmp, config_path) = setup_test_env();
    let other = tmp.path().join("other");
    fs::create_dir_all(other.join("Solo")).unwrap();
    fs::write(other.join("Solo/one.md"), "# One").unwrap();

    let output = Command::new(mdcms_binary())
        .arg("--config")
        .arg(&config_path)
        .arg("categories")
        .env("CONTENT_DIR", &other)
        .output()
        .unwrap();
    assert!(output.status.success());
    let ids = json(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(ids[0]["id"], "Solo");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_stdout, stderr, success) = run_mdcms(&tmp.path().join("absent.toml"), &["categories"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}
