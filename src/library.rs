use crate::order::{self, SCRIPT_EXTENSION};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

const NEW_SCRIPT_PREFIX: &str = "function_";
const NAME_FILLER: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub filename: String,
    pub display_name: String,
    pub enabled: bool,
}

impl Entry {
    pub fn has_pending_rename(&self) -> bool {
        self.display_name != self.filename
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn label(self) -> &'static str {
        match self {
            SortDirection::Asc => "A → Z",
            SortDirection::Desc => "Z → A",
        }
    }

    fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("renaming is only available in edit mode")]
    NotEditing,
    #[error("no script at position {0}")]
    OutOfRange(usize),
    #[error("invalid script name {name:?}")]
    Invalid { name: String },
    #[error("{name} already exists")]
    Taken { name: String },
    #[error("rename {from} → {to}: {source}")]
    Io {
        from: String,
        to: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}

#[derive(Debug, Default)]
pub struct RenameSummary {
    pub renamed: Vec<(String, String)>,
    pub rejected: Vec<RenameError>,
}

#[derive(Debug)]
pub enum EditModeChange {
    Entered,
    Left(RenameSummary),
}

/// Ordered scripts of one directory. The vector order is the display
/// order; every mutation that touches order, membership or filenames
/// rewrites the order file before returning.
#[derive(Debug)]
pub struct ScriptList {
    dir: PathBuf,
    entries: Vec<Entry>,
    selected: Option<usize>,
    next_id: u64,
    next_sort: SortDirection,
    edit_mode: bool,
}

impl ScriptList {
    pub fn load(dir: &Path) -> Result<Self> {
        let filenames = order::load(dir)?;
        let mut list = Self {
            dir: dir.to_path_buf(),
            entries: Vec::with_capacity(filenames.len()),
            selected: None,
            next_id: 1,
            next_sort: SortDirection::Asc,
            edit_mode: false,
        };
        for filename in filenames {
            list.push_entry(filename);
        }
        list.save()?;
        Ok(list)
    }

    pub fn save(&self) -> Result<()> {
        order::save(&self.dir, &self.filenames())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn filenames(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.filename.clone())
            .collect()
    }

    pub fn index_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn path_of(&self, index: usize) -> Option<PathBuf> {
        self.entries
            .get(index)
            .map(|entry| self.dir.join(&entry.filename))
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: usize) {
        if index < self.entries.len() {
            self.selected = Some(index);
        }
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn next_sort_direction(&self) -> SortDirection {
        self.next_sort
    }

    pub fn enabled_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.enabled).count()
    }

    pub fn add_new(&mut self) -> Result<usize> {
        let filename = self.next_new_filename();
        let body = format!(
            "def main():\n    print(\"Running new function: File name: {filename}\")\n"
        );
        fs::write(self.dir.join(&filename), body)
            .with_context(|| format!("create {filename}"))?;
        let index = self.push_entry(filename);
        self.selected = Some(index);
        self.save()?;
        Ok(index)
    }

    pub fn move_up(&mut self, index: usize) -> Result<bool> {
        if index == 0 || index >= self.entries.len() {
            return Ok(false);
        }
        self.entries.swap(index, index - 1);
        self.selected = Some(index - 1);
        self.save()?;
        Ok(true)
    }

    pub fn move_down(&mut self, index: usize) -> Result<bool> {
        if index + 1 >= self.entries.len() {
            return Ok(false);
        }
        self.entries.swap(index, index + 1);
        self.selected = Some(index + 1);
        self.save()?;
        Ok(true)
    }

    pub fn move_top(&mut self, index: usize) -> Result<bool> {
        if index == 0 || index >= self.entries.len() {
            return Ok(false);
        }
        let entry = self.entries.remove(index);
        self.entries.insert(0, entry);
        self.selected = Some(0);
        self.save()?;
        Ok(true)
    }

    pub fn move_bottom(&mut self, index: usize) -> Result<bool> {
        if index + 1 >= self.entries.len() {
            return Ok(false);
        }
        let entry = self.entries.remove(index);
        self.entries.push(entry);
        self.selected = Some(self.entries.len() - 1);
        self.save()?;
        Ok(true)
    }

    /// Sorts by display name, alternating direction on every call.
    pub fn sort_alphabetical(&mut self) -> Result<SortDirection> {
        let direction = self.next_sort;
        let selected_id = self.selected_id();
        match direction {
            SortDirection::Asc => self
                .entries
                .sort_by(|a, b| a.display_name.cmp(&b.display_name)),
            SortDirection::Desc => self
                .entries
                .sort_by(|a, b| b.display_name.cmp(&a.display_name)),
        }
        self.next_sort = direction.flipped();
        self.reselect(selected_id);
        self.save()?;
        Ok(direction)
    }

    pub fn move_checked_to_top(&mut self) -> Result<()> {
        let selected_id = self.selected_id();
        let (mut checked, unchecked): (Vec<Entry>, Vec<Entry>) =
            std::mem::take(&mut self.entries)
                .into_iter()
                .partition(|entry| entry.enabled);
        checked.extend(unchecked);
        self.entries = checked;
        self.reselect(selected_id);
        self.save()
    }

    pub fn toggle_enabled(&mut self, index: usize) -> Option<bool> {
        let entry = self.entries.get_mut(index)?;
        entry.enabled = !entry.enabled;
        let enabled = entry.enabled;
        self.selected = Some(index);
        Some(enabled)
    }

    /// Disables everything when all rows are checked, otherwise checks all.
    pub fn toggle_all(&mut self) -> bool {
        let enable = !self.entries.iter().all(|entry| entry.enabled);
        for entry in &mut self.entries {
            entry.enabled = enable;
        }
        enable
    }

    pub fn set_display_name(&mut self, index: usize, name: &str) -> Result<(), RenameError> {
        if !self.edit_mode {
            return Err(RenameError::NotEditing);
        }
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(RenameError::OutOfRange(index))?;
        entry.display_name = name.to_string();
        self.selected = Some(index);
        Ok(())
    }

    pub fn commit_rename(
        &mut self,
        index: usize,
        new_name: &str,
    ) -> Result<Option<(String, String)>, RenameError> {
        let renamed = self.rename_entry(index, new_name)?;
        if renamed.is_some() {
            self.save()?;
        }
        Ok(renamed)
    }

    pub fn toggle_edit_mode(&mut self) -> Result<EditModeChange> {
        if !self.edit_mode {
            self.edit_mode = true;
            return Ok(EditModeChange::Entered);
        }

        let mut summary = RenameSummary::default();
        for index in 0..self.entries.len() {
            if !self.entries[index].has_pending_rename() {
                continue;
            }
            let proposed = self.entries[index].display_name.clone();
            match self.commit_rename(index, &proposed) {
                Ok(Some(pair)) => summary.renamed.push(pair),
                Ok(None) => {}
                Err(err) => {
                    let entry = &mut self.entries[index];
                    entry.display_name = entry.filename.clone();
                    summary.rejected.push(err);
                }
            }
        }
        self.edit_mode = false;
        self.save()?;
        Ok(EditModeChange::Left(summary))
    }

    fn rename_entry(
        &mut self,
        index: usize,
        new_name: &str,
    ) -> Result<Option<(String, String)>, RenameError> {
        if !self.edit_mode {
            return Err(RenameError::NotEditing);
        }
        let old = self
            .entries
            .get(index)
            .ok_or(RenameError::OutOfRange(index))?
            .filename
            .clone();
        let new = sanitize_name(new_name).ok_or_else(|| RenameError::Invalid {
            name: new_name.to_string(),
        })?;

        if new == old {
            self.entries[index].display_name = old;
            return Ok(None);
        }
        let taken = self
            .entries
            .iter()
            .enumerate()
            .any(|(other, entry)| other != index && entry.filename == new);
        if taken || self.dir.join(&new).exists() {
            return Err(RenameError::Taken { name: new });
        }

        fs::rename(self.dir.join(&old), self.dir.join(&new)).map_err(|source| {
            RenameError::Io {
                from: old.clone(),
                to: new.clone(),
                source,
            }
        })?;
        let entry = &mut self.entries[index];
        entry.filename = new.clone();
        entry.display_name = new.clone();
        Ok(Some((old, new)))
    }

    fn push_entry(&mut self, filename: String) -> usize {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            display_name: filename.clone(),
            filename,
            enabled: false,
        });
        self.entries.len() - 1
    }

    fn next_new_filename(&self) -> String {
        let mut number = self.entries.len() + 1;
        loop {
            let candidate = format!("{NEW_SCRIPT_PREFIX}{number:03}.{SCRIPT_EXTENSION}");
            let in_list = self.entries.iter().any(|entry| entry.filename == candidate);
            if !in_list && !self.dir.join(&candidate).exists() {
                return candidate;
            }
            number += 1;
        }
    }

    fn selected_id(&self) -> Option<EntryId> {
        self.selected
            .and_then(|index| self.entries.get(index))
            .map(|entry| entry.id)
    }

    fn reselect(&mut self, id: Option<EntryId>) {
        self.selected = id.and_then(|id| self.index_of(id));
    }
}

/// Turns a proposed label into a script filename: whitespace becomes `_`
/// and the script extension is appended when missing.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let suffix = format!(".{SCRIPT_EXTENSION}");
    let mut name: String = raw
        .chars()
        .map(|ch| if ch.is_whitespace() { NAME_FILLER } else { ch })
        .collect();
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return None;
    }
    if !name.ends_with(&suffix) {
        name.push_str(&suffix);
    }
    if name.len() == suffix.len() {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn setup(names: &[&str]) -> (TempDir, ScriptList) {
        let temp = TempDir::new().unwrap();
        for name in names {
            fs::write(temp.path().join(name), "def main():\n    pass\n").unwrap();
        }
        let list = ScriptList::load(temp.path()).unwrap();
        (temp, list)
    }

    fn persisted(list: &ScriptList) -> Vec<String> {
        fs::read_to_string(order::order_path(list.dir()))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn names(list: &ScriptList) -> Vec<String> {
        list.filenames()
    }

    #[test]
    fn load_persists_reconciled_order() {
        let (_temp, list) = setup(&["c.py", "a.py", "b.py"]);
        assert_eq!(names(&list), vec!["a.py", "b.py", "c.py"]);
        assert_eq!(persisted(&list), names(&list));
        assert!(list.entries().iter().all(|entry| !entry.enabled));
        assert_eq!(list.selected(), None);
    }

    #[test]
    fn moves_keep_membership_and_persist() {
        let (_temp, mut list) = setup(&["a.py", "b.py", "c.py", "d.py"]);
        let before: BTreeSet<String> = names(&list).into_iter().collect();

        list.move_down(0).unwrap();
        list.move_top(3).unwrap();
        list.move_bottom(1).unwrap();
        list.move_up(2).unwrap();

        let after: BTreeSet<String> = names(&list).into_iter().collect();
        assert_eq!(before, after);
        assert_eq!(persisted(&list), names(&list));
    }

    #[test]
    fn up_then_down_restores_order_and_selection_follows() {
        let (_temp, mut list) = setup(&["a.py", "b.py", "c.py"]);
        let original = names(&list);

        assert!(list.move_up(1).unwrap());
        assert_eq!(names(&list), vec!["b.py", "a.py", "c.py"]);
        assert_eq!(list.selected(), Some(0));

        assert!(list.move_down(0).unwrap());
        assert_eq!(names(&list), original);
        assert_eq!(list.selected(), Some(1));
    }

    #[test]
    fn moves_at_boundaries_are_noops() {
        let (_temp, mut list) = setup(&["a.py", "b.py", "c.py"]);
        let original = names(&list);

        assert!(!list.move_up(0).unwrap());
        assert!(!list.move_down(2).unwrap());
        assert!(!list.move_top(0).unwrap());
        assert!(!list.move_bottom(2).unwrap());
        assert!(!list.move_up(7).unwrap());
        assert_eq!(names(&list), original);
        assert_eq!(list.selected(), None);
    }

    #[test]
    fn top_and_bottom_preserve_relative_order() {
        let (_temp, mut list) = setup(&["a.py", "b.py", "c.py", "d.py"]);

        list.move_top(2).unwrap();
        assert_eq!(names(&list), vec!["c.py", "a.py", "b.py", "d.py"]);
        assert_eq!(list.selected(), Some(0));

        list.move_bottom(1).unwrap();
        assert_eq!(names(&list), vec!["c.py", "b.py", "d.py", "a.py"]);
        assert_eq!(list.selected(), Some(3));
        assert_eq!(persisted(&list), names(&list));
    }

    #[test]
    fn sort_alternates_direction() {
        let (_temp, mut list) = setup(&["b.py", "c.py", "a.py"]);
        list.move_top(2).unwrap();

        assert_eq!(list.sort_alphabetical().unwrap(), SortDirection::Asc);
        assert_eq!(names(&list), vec!["a.py", "b.py", "c.py"]);
        assert_eq!(list.sort_alphabetical().unwrap(), SortDirection::Desc);
        assert_eq!(names(&list), vec!["c.py", "b.py", "a.py"]);
        assert_eq!(list.next_sort_direction(), SortDirection::Asc);
        assert_eq!(persisted(&list), names(&list));
    }

    #[test]
    fn sort_uses_display_names_and_keeps_selection() {
        let (_temp, mut list) = setup(&["a.py", "b.py"]);
        list.toggle_edit_mode().unwrap();
        list.set_display_name(0, "zeta").unwrap();
        let moved_id = list.get(0).unwrap().id;

        list.sort_alphabetical().unwrap();
        assert_eq!(names(&list), vec!["b.py", "a.py"]);
        assert_eq!(list.selected(), list.index_of(moved_id));
    }

    #[test]
    fn checked_to_top_is_stable_and_idempotent() {
        let (_temp, mut list) = setup(&["a.py", "b.py", "c.py", "d.py"]);
        list.toggle_enabled(1);
        list.toggle_enabled(3);
        list.select(0);

        list.move_checked_to_top().unwrap();
        let once = names(&list);
        assert_eq!(once, vec!["b.py", "d.py", "a.py", "c.py"]);
        assert_eq!(list.selected(), Some(2));

        list.move_checked_to_top().unwrap();
        assert_eq!(names(&list), once);
        assert_eq!(persisted(&list), once);
    }

    #[test]
    fn toggle_all_checks_then_clears() {
        let (_temp, mut list) = setup(&["a.py", "b.py"]);
        list.toggle_enabled(0);

        assert!(list.toggle_all());
        assert_eq!(list.enabled_count(), 2);
        assert!(!list.toggle_all());
        assert_eq!(list.enabled_count(), 0);
    }

    #[test]
    fn add_new_picks_unused_name_and_writes_stub() {
        let (temp, mut list) = setup(&["function_002.py"]);

        let index = list.add_new().unwrap();
        let entry = list.get(index).unwrap();
        assert_eq!(entry.filename, "function_003.py");
        assert_eq!(list.selected(), Some(index));

        let body = fs::read_to_string(temp.path().join("function_003.py")).unwrap();
        assert!(body.starts_with("def main():"));
        assert!(body.contains("function_003.py"));
        assert_eq!(persisted(&list), names(&list));

        list.add_new().unwrap();
        assert_eq!(names(&list).last().unwrap(), "function_004.py");
    }

    #[test]
    fn sanitize_rules() {
        assert_eq!(sanitize_name("hello world").as_deref(), Some("hello_world.py"));
        assert_eq!(sanitize_name("tab\there.py").as_deref(), Some("tab_here.py"));
        assert_eq!(sanitize_name("done.py").as_deref(), Some("done.py"));
        assert_eq!(sanitize_name(""), None);
        assert_eq!(sanitize_name(".py"), None);
        assert_eq!(sanitize_name("../escape"), None);
    }

    #[test]
    fn rename_requires_edit_mode() {
        let (_temp, mut list) = setup(&["a.py"]);
        assert!(matches!(
            list.commit_rename(0, "b"),
            Err(RenameError::NotEditing)
        ));
        assert!(matches!(
            list.set_display_name(0, "b"),
            Err(RenameError::NotEditing)
        ));
    }

    #[test]
    fn leaving_edit_mode_renames_changed_entries() {
        let (temp, mut list) = setup(&["a.py", "b.py"]);
        assert!(matches!(
            list.toggle_edit_mode().unwrap(),
            EditModeChange::Entered
        ));
        list.set_display_name(1, "my script").unwrap();

        let EditModeChange::Left(summary) = list.toggle_edit_mode().unwrap() else {
            panic!("expected to leave edit mode");
        };
        assert_eq!(
            summary.renamed,
            vec![("b.py".to_string(), "my_script.py".to_string())]
        );
        assert!(summary.rejected.is_empty());
        assert!(!list.edit_mode());
        assert!(temp.path().join("my_script.py").exists());
        assert!(!temp.path().join("b.py").exists());
        assert_eq!(persisted(&list), vec!["a.py", "my_script.py"]);
    }

    #[test]
    fn colliding_rename_is_rejected_and_files_survive() {
        let (temp, mut list) = setup(&["a.py", "b.py"]);
        list.toggle_edit_mode().unwrap();
        list.set_display_name(0, "b.py").unwrap();

        let EditModeChange::Left(summary) = list.toggle_edit_mode().unwrap() else {
            panic!("expected to leave edit mode");
        };
        assert!(summary.renamed.is_empty());
        assert!(matches!(
            summary.rejected.as_slice(),
            [RenameError::Taken { name }] if name == "b.py"
        ));
        assert_eq!(list.get(0).unwrap().display_name, "a.py");
        assert!(temp.path().join("a.py").exists());
        assert!(temp.path().join("b.py").exists());
    }

    #[test]
    fn commit_rename_persists_immediately() {
        let (_temp, mut list) = setup(&["a.py", "b.py"]);
        list.toggle_edit_mode().unwrap();

        let renamed = list.commit_rename(0, "first").unwrap();
        assert_eq!(renamed, Some(("a.py".to_string(), "first.py".to_string())));
        assert_eq!(persisted(&list), vec!["first.py", "b.py"]);
        assert_eq!(list.commit_rename(0, "first.py").unwrap(), None);
    }
}
