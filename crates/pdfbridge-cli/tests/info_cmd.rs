mod common;

use common::{cmd, sample_pdf, text_content, write_temp_pdf};
use predicates::prelude::*;

#[test]
fn info_text_shows_pages_and_metadata() {
    let content = text_content(2);
    let tmp = write_temp_pdf(&sample_pdf(&[&content, &content]));
    cmd()
        .args(["info", tmp.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pages: 2"))
        .stdout(predicate::str::contains("Needs password: no"))
        .stdout(predicate::str::contains("format: PDF 1.7"))
        .stdout(predicate::str::contains("info:Title: Quarterly Report"))
        .stdout(predicate::str::contains("info:Author: R. Tester"))
        .stdout(predicate::str::contains("info:Creator").not());
}

#[test]
fn info_json_is_parseable() {
    let content = text_content(1);
    let tmp = write_temp_pdf(&sample_pdf(&[&content]));
    let output = cmd()
        .args(["info", tmp.path().to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["pages"], 1);
    assert_eq!(value["needs_password"], false);
    assert_eq!(value["metadata"]["info:Title"], "Quarterly Report");
    assert!(value["metadata"]["info:Producer"].is_null());
}
