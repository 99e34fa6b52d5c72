use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/catalog.json")
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).expect("write config");
    path
}

fn base_cmd(config: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("catalog-search"));
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CATALOG_SEARCH_URL")
        .env_remove("CATALOG_SEARCH_USER")
        .env_remove("CATALOG_SEARCH_PASSWORD")
        .env_remove("CATALOG_SEARCH_TIMEOUT_MS")
        .arg("--config")
        .arg(config);
    cmd
}

fn fixture_cmd(tmp: &TempDir) -> Command {
    let config = write_config(tmp.path(), "");
    let mut cmd = base_cmd(&config);
    cmd.arg("--fixture").arg(fixture());
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().clone();
    serde_json::from_slice(&output.stdout).expect("valid json on stdout")
}

#[test]
fn json_search_returns_every_book_for_empty_query() {
    let tmp = TempDir::new().unwrap();
    let json = json_stdout(fixture_cmd(&tmp).args(["--json", "search", "--size", "20"]));
    assert_eq!(json["total"], 12);
    assert_eq!(json["hits"].as_array().unwrap().len(), 12);
    assert!(json.get("facets").is_none());
}

#[test]
fn json_search_with_filters_and_sort() {
    let tmp = TempDir::new().unwrap();
    let json = json_stdout(fixture_cmd(&tmp).args([
        "--json",
        "search",
        "--filter",
        "language=Rust",
        "--sort",
        "price_asc",
    ]));
    let hits = json["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["fields"]["title"], "The Rust Programming Language");
    assert_eq!(hits[1]["fields"]["title"], "Programming Rust");
    assert!(hits.iter().all(|h| h["score"].is_null()));
}

#[test]
fn min_and_max_bound_the_price() {
    let tmp = TempDir::new().unwrap();
    let json = json_stdout(fixture_cmd(&tmp).args([
        "--json", "search", "--min", "price=30000", "--max", "price=40000", "--size", "20",
    ]));
    let hits = json["hits"].as_array().unwrap();
    assert!(!hits.is_empty());
    for hit in hits {
        let price = hit["fields"]["price"].as_f64().unwrap();
        assert!((30000.0..=40000.0).contains(&price), "price {price} out of range");
    }
}

#[test]
fn search_with_facets_includes_buckets() {
    let tmp = TempDir::new().unwrap();
    let json = json_stdout(fixture_cmd(&tmp).args(["--json", "search", "rust", "--facets"]));
    let facets = json["facets"].as_object().expect("facets present");
    for name in ["categories", "languages", "price_ranges", "rating_ranges"] {
        assert!(facets.contains_key(name), "missing facet {name}");
    }
}

#[test]
fn facets_command_respects_filters() {
    let tmp = TempDir::new().unwrap();
    let json = json_stdout(fixture_cmd(&tmp).args(["--json", "facets", "--filter", "category=ML"]));
    let categories = json["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["label"], "ML");
    assert_eq!(categories[0]["count"], 3);
}

#[test]
fn human_output_marks_sorted_scores() {
    let tmp = TempDir::new().unwrap();
    fixture_cmd(&tmp)
        .args(["search", "--sort", "rating_desc", "--size", "3"])
        .assert()
        .success()
        .stdout(contains("12 results"))
        .stdout(contains("N/A (sorted)"));
}

#[test]
fn human_output_renders_highlight_markers() {
    let tmp = TempDir::new().unwrap();
    fixture_cmd(&tmp)
        .args(["search", "rust"])
        .assert()
        .success()
        .stdout(contains("【"))
        .stdout(contains("Programming Rust"));
}

#[test]
fn invalid_page_fails_without_output() {
    let tmp = TempDir::new().unwrap();
    fixture_cmd(&tmp)
        .args(["--json", "search", "--page", "0"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(contains("invalid pagination"));
}

#[test]
fn legal_phrase_search_lists_documents() {
    let tmp = TempDir::new().unwrap();
    fixture_cmd(&tmp)
        .args(["legal", "\"Criminal Act\""])
        .assert()
        .success()
        .stdout(contains("3 matching documents"))
        .stdout(contains("criminal.pdf"));
}

#[test]
fn suggest_completes_title_prefix() {
    let tmp = TempDir::new().unwrap();
    let json = json_stdout(fixture_cmd(&tmp).args(["--json", "suggest", "pyth"]));
    let hits = json.as_array().unwrap();
    assert!(!hits.is_empty());
    assert!(
        hits.iter()
            .any(|h| h["fields"]["title"].as_str().unwrap_or("").starts_with("Python"))
    );
}

#[test]
fn unknown_filter_is_warned_and_ignored() {
    let tmp = TempDir::new().unwrap();
    let output = fixture_cmd(&tmp)
        .args(["--json", "search", "--filter", "shelf=B3", "--size", "20"])
        .assert()
        .success()
        .stderr(contains("unknown filter key"))
        .get_output()
        .clone();
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total"], 12);
}

#[test]
fn search_help_lists_sort_tokens() {
    let tmp = TempDir::new().unwrap();
    fixture_cmd(&tmp)
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(contains("price_asc").and(contains("pages_desc")));
}

#[test]
fn bad_timeout_override_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fixture_cmd(&tmp)
        .env("CATALOG_SEARCH_TIMEOUT_MS", "soon")
        .args(["search"])
        .assert()
        .failure()
        .stderr(contains("CATALOG_SEARCH_TIMEOUT_MS"));
}

#[test]
fn unreachable_engine_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(
        tmp.path(),
        "[engine]\nurl = \"http://127.0.0.1:9\"\ntimeout_ms = 500\n",
    );
    base_cmd(&config)
        .args(["search", "rust"])
        .assert()
        .failure()
        .stderr(contains("unavailable"));
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "[engine]\nurl = \"localhost:9200\"\n");
    base_cmd(&config)
        .args(["search"])
        .assert()
        .failure()
        .stderr(contains("engine.url"));
}

#[test]
fn completions_do_not_need_config() {
    Command::new(assert_cmd::cargo::cargo_bin!("catalog-search"))
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(contains("catalog-search"));
}
