use anyhow::{Context, Result};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

pub const SCRIPT_EXTENSION: &str = "py";
pub const ORDER_FILE_NAME: &str = ".order";

pub fn order_path(dir: &Path) -> PathBuf {
    dir.join(ORDER_FILE_NAME)
}

pub fn is_script_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == SCRIPT_EXTENSION)
        .unwrap_or(false)
}

/// Lists the scripts in `dir`, ordered by the persisted order file when one
/// can be read. Listed names that vanished are dropped and unlisted scripts
/// are appended in lexicographic order.
pub fn load(dir: &Path) -> Result<Vec<String>> {
    fs::create_dir_all(dir).with_context(|| format!("create scripts dir {}", dir.display()))?;

    let mut present = scan_scripts(dir)?;
    present.sort();

    let Some(listed) = read_order_file(dir) else {
        return Ok(present);
    };

    let present_set: HashSet<&str> = present.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut ordered = Vec::with_capacity(present.len());
    for name in listed {
        if present_set.contains(name.as_str()) && seen.insert(name.clone()) {
            ordered.push(name);
        }
    }
    for name in present {
        if !seen.contains(&name) {
            ordered.push(name);
        }
    }
    Ok(ordered)
}

pub fn save(dir: &Path, filenames: &[String]) -> Result<()> {
    let mut raw = String::new();
    for name in filenames {
        raw.push_str(name);
        raw.push('\n');
    }
    fs::write(order_path(dir), raw).context("write order file")?;
    Ok(())
}

fn scan_scripts(dir: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("read scripts dir {}", dir.display()))?;
    for entry in entries.flatten() {
        // Follows symlinks; dangling links are skipped.
        if !entry.path().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if is_script_name(&name) {
            out.push(name);
        }
    }
    Ok(out)
}

// Unreadable or non-UTF-8 order files count as absent.
fn read_order_file(dir: &Path) -> Option<Vec<String>> {
    let raw = fs::read_to_string(order_path(dir)).ok()?;
    Some(
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "def main():\n    pass\n").unwrap();
    }

    #[test]
    fn keeps_listed_order_and_appends_new_scripts() {
        let temp = TempDir::new().unwrap();
        for name in ["a.py", "b.py", "c.py"] {
            touch(temp.path(), name);
        }
        fs::write(order_path(temp.path()), "b.py\na.py\n").unwrap();

        let order = load(temp.path()).unwrap();
        assert_eq!(order, vec!["b.py", "a.py", "c.py"]);
    }

    #[test]
    fn falls_back_to_lexicographic_without_order_file() {
        let temp = TempDir::new().unwrap();
        for name in ["c.py", "a.py", "b.py"] {
            touch(temp.path(), name);
        }

        let order = load(temp.path()).unwrap();
        assert_eq!(order, vec!["a.py", "b.py", "c.py"]);
    }

    #[test]
    fn drops_missing_and_duplicate_names() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.py");
        touch(temp.path(), "b.py");
        fs::write(order_path(temp.path()), "gone.py\n\n b.py \nb.py\na.py\n").unwrap();

        let order = load(temp.path()).unwrap();
        assert_eq!(order, vec!["b.py", "a.py"]);
    }

    #[test]
    fn ignores_other_extensions_and_directories() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.py");
        fs::write(temp.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(temp.path().join("pkg.py")).unwrap();

        let order = load(temp.path()).unwrap();
        assert_eq!(order, vec!["a.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn lists_symlinked_scripts() {
        let temp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        touch(temp.path(), "a.py");
        touch(elsewhere.path(), "shared.py");
        std::os::unix::fs::symlink(
            elsewhere.path().join("shared.py"),
            temp.path().join("linked.py"),
        )
        .unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone.py"), temp.path().join("dangling.py"))
            .unwrap();
        fs::write(order_path(temp.path()), "linked.py\na.py\n").unwrap();

        let order = load(temp.path()).unwrap();
        assert_eq!(order, vec!["linked.py", "a.py"]);
    }

    #[test]
    fn unreadable_order_file_counts_as_absent() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b.py");
        touch(temp.path(), "a.py");
        fs::write(order_path(temp.path()), [0xff, 0xfe, 0x00, 0x62]).unwrap();

        let order = load(temp.path()).unwrap();
        assert_eq!(order, vec!["a.py", "b.py"]);
    }

    #[test]
    fn creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("functions");

        let order = load(&dir).unwrap();
        assert!(order.is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn save_writes_one_name_per_line() {
        let temp = TempDir::new().unwrap();
        let names = vec!["b.py".to_string(), "a.py".to_string()];
        save(temp.path(), &names).unwrap();

        let raw = fs::read_to_string(order_path(temp.path())).unwrap();
        assert_eq!(raw, "b.py\na.py\n");
    }
}
