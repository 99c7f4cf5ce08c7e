// Licensed under the Apache-2.0 license

use anyhow::{bail, Result};
use walkdir::DirEntry;

use crate::PROJECT_ROOT;
use std::{
    fs::File,
    io::{BufRead, BufReader, Error, ErrorKind},
    path::{Path, PathBuf},
};

const REQUIRED_TEXT: &str = "Licensed under the Apache-2.0 license";
const EXTENSIONS: &[&str] = &["rs", "toml", "sh", "ld", "yml", "yaml"];
const IGNORED_DIRS: &[&str] = &[".git", "examples", "out", "target"];

pub(crate) fn fix() -> Result<()> {
    println!("Running: license header fix");

    let files = find_files(&PROJECT_ROOT, EXTENSIONS)?;
    let mut failed = false;
    for file in files.iter() {
        if check_file(file).is_err() {
            println!("Fixing header in {}", remove_root(file));
            fix_file(file)?;
        }
        if let Err(e) = check_file(file) {
            println!("{e}");
            failed = true;
        }
    }
    if failed {
        bail!("License header fix failed; please fix the above files manually.");
    }
    Ok(())
}

pub(crate) fn check() -> Result<()> {
    println!("Running: license header check");
    let files = find_files(&PROJECT_ROOT, EXTENSIONS)?;
    let mut failed = false;
    for file in files.iter() {
        if let Err(e) = check_file(file) {
            println!("{e}");
            failed = true;
        }
    }
    if failed {
        bail!("Some files are missing the license header; to fix, run \"cargo xtask header-fix\" from the repo root");
    }
    Ok(())
}

fn remove_root(path: &Path) -> String {
    let path = path.to_string_lossy();
    let root = format!("{}/", PROJECT_ROOT.display());
    path.strip_prefix(&root).unwrap_or(&*path).into()
}

fn add_path(path: &Path) -> impl Fn(Error) -> Error + Copy + '_ {
    move |e: Error| {
        let path = remove_root(path);
        Error::new(e.kind(), format!("{path:?}: {e}"))
    }
}

fn check_file_contents(path: &Path, contents: impl BufRead) -> Result<(), Error> {
    // Block headers put the text on line 3.
    const N: usize = 3;
    let wrap_err = add_path(path);

    for line in contents.lines().take(N) {
        if line.map_err(wrap_err)?.contains(REQUIRED_TEXT) {
            return Ok(());
        }
    }
    let path = remove_root(path);
    Err(Error::new(
        ErrorKind::Other,
        format!("File {path:?} doesn't contain {REQUIRED_TEXT:?} in the first {N} lines"),
    ))
}

fn check_file(path: &Path) -> Result<(), Error> {
    let wrap_err = add_path(path);
    check_file_contents(path, BufReader::new(File::open(path).map_err(wrap_err)?))
}

fn header_for(path: &Path) -> Result<String, Error> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("rs") => Ok(format!("// {REQUIRED_TEXT}\n")),
        Some("toml" | "sh" | "yaml" | "yml") => Ok(format!("# {REQUIRED_TEXT}\n")),
        Some("ld") => Ok(format!("/* {REQUIRED_TEXT} */\n")),
        other => Err(Error::new(
            ErrorKind::Other,
            format!("Unknown extension {other:?}"),
        )),
    }
}

fn fix_file(path: &Path) -> Result<(), Error> {
    let wrap_err = add_path(path);

    let mut contents = header_for(path)?.into_bytes();
    let mut prev_contents = std::fs::read(path).map_err(wrap_err)?;
    if prev_contents.first() != Some(&b'\n') {
        contents.push(b'\n');
    }
    contents.append(&mut prev_contents);
    std::fs::write(path, contents).map_err(wrap_err)
}

fn allow(file: &DirEntry) -> bool {
    if file.file_type().is_dir() {
        if let Some(name) = file.file_name().to_str() {
            return !IGNORED_DIRS.contains(&name);
        }
    }
    true
}

pub(crate) fn find_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut result = vec![];
    for file in walkdir::WalkDir::new(dir).into_iter().filter_entry(allow) {
        let file = file?;
        let is_match = file
            .path()
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if file.file_type().is_file() && is_match {
            result.push(file.path().to_path_buf());
        }
    }
    result.sort();
    Ok(result)
}
