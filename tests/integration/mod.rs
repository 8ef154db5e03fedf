// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture helper for creating temporary issue trees with a manifest.
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
    pub out_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary input and output directories.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().join("issues");
        let out_path = temp_dir.path().join("processed");
        fs::create_dir_all(&root_path).expect("Failed to create issues directory");

        Self {
            temp_dir,
            root_path,
            out_path,
        }
    }

    /// Create an issue text file with given content under the issues root.
    pub fn create_issue_file<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write issue file");
        file_path
    }

    /// Write a TOC manifest JSON file and return its path.
    pub fn write_manifest(&self, json: &str) -> PathBuf {
        let path = self.temp_dir.path().join("toc.json");
        fs::write(&path, json).expect("Failed to write manifest");
        path
    }

    /// Path of a written output file under the processed tree.
    pub fn output_file<P: AsRef<Path>>(&self, relative_path: P) -> PathBuf {
        self.out_path.join(relative_path)
    }

    /// Read a written output file to a string.
    pub fn read_output<P: AsRef<Path>>(&self, relative_path: P) -> String {
        fs::read_to_string(self.output_file(relative_path)).expect("Failed to read output file")
    }
}

/// A small issue in the magazine's shape: masthead and contents page, two
/// articles separated by a running header, and an advertising tail.
pub fn sample_issue_text() -> String {
    let mut text = String::new();
    text.push_str("RELIEF SOCIETY MAGAZINE\nVol. 30 No. 3\n\n");
    text.push_str("CONTENTS\nThe Gold Watch . . . Mary E Knowles . . . 5\nWoman's Sphere . . . Ramona W. Cannon . . . 12\n\n");
    text.push_str("GENERAL BOARD\nBelle S. Spafford, President\n\n");
    text.push_str("MAGAZINE CIRCULATION 40,000\n");
    text.push_str("\nThe Gold Watch\nBy Mary E Knowles\n");
    text.push_str(
        &"The watch had been her grandmother's, carried across the plains.\n".repeat(12),
    );
    text.push_str("RELIEF SOCIETY MAGAZINE MARCH 1943\n");
    text.push_str(&"It kept good time through every season of her life.\n".repeat(12));
    text.push_str("Woman's Sphere\nBy Ramona W. Cannon\n");
    text.push_str(&"Notes on the achievements of women around the world.\n".repeat(12));
    text.push_str(
        "\nWhen Buying Mention Relief Society Magazine\nDESERET NEWS PRESS\nSalt Lake City, Utah\n",
    );
    text
}

/// Manifest for [`sample_issue_text`]: the two real articles plus one title
/// that never appears in the body.
pub fn sample_manifest_json(source_file: &str) -> String {
    format!(
        r#"{{
  "issues": [
    {{
      "volume": "Vol30",
      "issue": "No3",
      "month": "March",
      "year": 1943,
      "source_file": "{source_file}",
      "entries": [
        {{"title": "The Gold Watch", "author": "Mary E Knowles", "etype": "fiction"}},
        {{"title": "Woman's Sphere", "author": "Ramona W. Cannon", "etype": "article"}},
        {{"title": "Vanished Feature", "author": null, "etype": "article"}}
      ]
    }}
  ]
}}"#
    )
}
