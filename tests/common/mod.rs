//! Test utilities for expectrun integration tests
//!
//! Builds scratch projects in a temporary directory. The shared driver
//! declares a stand-in compiler: it extracts every `#> ` line of the source
//! into an executable shell script, so no C toolchain is needed.
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use expectrun::{discover, Action, Batch, BatchReport, Engine, EngineConfig};
use tempfile::TempDir;

/// Compile template turning `#> ` lines into a script.
pub const STAND_IN_COMPILE: &str =
    "//!compile = sed -n 's/^#> //p' {infile} > {outfile} && chmod +x {outfile}";

/// Scratch project with a `cases` directory and a default driver.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir(dir.path().join("cases")).expect("create cases dir");
        std::fs::write(
            dir.path().join("test-driver.c"),
            format!("{}\nint main(void) {{ return 0; }}\n", STAND_IN_COMPILE),
        )
        .expect("write driver");
        Project { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a case whose program runs `script` lines through `/bin/sh`.
    pub fn case(&self, name: &str, header: &[&str], script: &[&str]) -> PathBuf {
        let mut text = String::new();
        for line in header {
            text.push_str("//!");
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("#> #!/bin/sh\n");
        for line in script {
            text.push_str("#> ");
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("int unused;\n");

        let relative = PathBuf::from("cases").join(name);
        self.write(&relative.display().to_string(), &text);
        relative
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write file");
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).expect("read file")
    }

    /// Write an executable filter script.
    pub fn filter(&self, relative: &str, body: &str) {
        self.write(relative, &format!("#!/bin/sh\n{}\n", body));
        std::fs::set_permissions(self.path(relative), std::fs::Permissions::from_mode(0o755))
            .expect("chmod filter");
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::new(self.root())
    }

    /// Discover every case and drive the batch, returning the report and
    /// everything printed.
    pub fn run(&self, action: Action) -> (BatchReport, String) {
        self.run_with(self.config(), action)
    }

    pub fn run_with(&self, config: EngineConfig, action: Action) -> (BatchReport, String) {
        let paths = discover(&[], &config).expect("discover cases");
        let engine = Engine::new(config);
        let mut out = Vec::new();
        let report = Batch::new(&engine, action)
            .run(&paths, &mut out)
            .expect("write report");
        (report, String::from_utf8_lossy(&out).into_owned())
    }
}

/// Verdict printed for `name`, without the alignment padding.
pub fn verdict<'a>(output: &'a str, name: &str) -> Option<&'a str> {
    let label = format!("{}:", name);
    output
        .lines()
        .find(|line| line.starts_with(&label))
        .map(|line| line[label.len()..].trim())
}
