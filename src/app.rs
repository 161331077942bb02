use crate::{
    config::{LauncherConfig, WindowGeometry},
    library::{EditModeChange, EntryId, ScriptList, SortDirection},
    runner::{OutputStream, PythonRunner, RunOutcome, RunReport, ScriptRunner},
    trace::{TraceLine, Tracer},
};
use anyhow::{Context, Result};
use arboard::Clipboard;
use std::{
    fmt::Debug,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use time::{macros::format_description, OffsetDateTime};

const LOG_CAPACITY: usize = 500;
const TOAST_SECS: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    RenameEntry { id: EntryId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing {
        prompt: String,
        buffer: String,
        purpose: InputPurpose,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Yes,
    No,
}

#[derive(Debug, Clone)]
pub enum DialogKind {
    SortAlphabetical { direction: SortDirection },
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub yes_label: String,
    pub no_label: String,
    pub choice: DialogChoice,
    pub kind: DialogKind,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunAllSummary {
    pub ran: usize,
    pub failed: usize,
}

pub struct App {
    pub config: LauncherConfig,
    pub list: ScriptList,
    pub status: String,
    pub input_mode: InputMode,
    pub dialog: Option<Dialog>,
    pub logs: Vec<LogEntry>,
    pub log_scroll: usize,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    runner: Box<dyn ScriptRunner>,
    tracer: Tracer,
    clipboard: Option<Clipboard>,
    log_path: Option<PathBuf>,
}

impl App {
    pub fn initialize(debug: bool) -> Result<Self> {
        let config = LauncherConfig::load_or_create()?;
        let list = ScriptList::load(&config.scripts_dir)
            .with_context(|| format!("load scripts from {}", config.scripts_dir.display()))?;
        let runner = PythonRunner::new(&config.interpreter);
        let interpreter = runner.interpreter().display().to_string();
        let log_path = config.log_path();

        let mut app = Self::with_parts(config, list, Box::new(runner), Tracer::new(debug));
        app.log_path = Some(log_path);
        app.log_info(format!(
            "Loaded {} script(s) from {}",
            app.list.len(),
            app.list.dir().display()
        ));
        app.log_info(format!("Interpreter: {interpreter}"));
        if debug {
            app.log_info("Debug tracing enabled".to_string());
        }
        Ok(app)
    }

    pub fn with_parts(
        config: LauncherConfig,
        mut list: ScriptList,
        runner: Box<dyn ScriptRunner>,
        tracer: Tracer,
    ) -> Self {
        if !list.is_empty() {
            list.select(0);
        }
        Self {
            config,
            list,
            status: "Ready".to_string(),
            input_mode: InputMode::Normal,
            dialog: None,
            logs: Vec::new(),
            log_scroll: 0,
            toast: None,
            should_quit: false,
            runner,
            tracer,
            clipboard: None,
            log_path: None,
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.tracer.is_enabled()
    }

    pub fn geometry_path(&self) -> PathBuf {
        self.config.geometry_path()
    }

    /// Runs `f` between entry and exit trace lines when tracing is on.
    pub fn traced<T: Debug>(
        &mut self,
        name: &str,
        args: String,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        if let Some(line) = self.tracer.enter(name, &args) {
            self.push_trace(line);
        }
        let result = f(self);
        if self.tracer.is_enabled() {
            let rendered = format!("{result:?}");
            if let Some(line) = self.tracer.exit(name, &rendered) {
                self.push_trace(line);
            }
        }
        result
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.expires_at <= Instant::now() {
                self.toast = None;
            }
        }
    }

    pub fn set_toast(&mut self, message: &str, level: ToastLevel, duration: Duration) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + duration,
        });
    }

    pub fn hint(&self) -> &'static str {
        if self.list.edit_mode() {
            "u/d move  t/b top/bottom  s sort  m checked↑  r rename  e save"
        } else {
            "Enter run  Space check  R run all  c check all  n new  e edit  q quit"
        }
    }

    pub fn select_row(&mut self, index: usize) {
        self.traced("select_row", format!("index={index}"), |app| {
            app.list.select(index);
        });
    }

    pub fn select_prev(&mut self) {
        if let Some(current) = self.list.selected() {
            if current > 0 {
                self.select_row(current - 1);
            }
        } else if !self.list.is_empty() {
            self.select_row(0);
        }
    }

    pub fn select_next(&mut self) {
        match self.list.selected() {
            Some(current) if current + 1 < self.list.len() => self.select_row(current + 1),
            Some(_) => {}
            None if !self.list.is_empty() => self.select_row(0),
            None => {}
        }
    }

    pub fn select_first(&mut self) {
        if !self.list.is_empty() {
            self.select_row(0);
        }
    }

    pub fn select_last(&mut self) {
        if !self.list.is_empty() {
            self.select_row(self.list.len() - 1);
        }
    }

    pub fn add_new_script(&mut self) {
        let result = self.traced("add_new_function", String::new(), |app| app.list.add_new());
        match result {
            Ok(index) => {
                let name = self
                    .list
                    .get(index)
                    .map(|entry| entry.filename.clone())
                    .unwrap_or_default();
                self.status = format!("Created {name}");
                self.log_info(format!("Created {name}"));
            }
            Err(err) => self.report_error("Create failed", err),
        }
    }

    pub fn move_selected_up(&mut self) {
        self.apply_move("move_up", ScriptList::move_up);
    }

    pub fn move_selected_down(&mut self) {
        self.apply_move("move_down", ScriptList::move_down);
    }

    pub fn move_selected_top(&mut self) {
        self.apply_move("move_top", ScriptList::move_top);
    }

    pub fn move_selected_bottom(&mut self) {
        self.apply_move("move_bottom", ScriptList::move_bottom);
    }

    fn apply_move(&mut self, name: &str, op: fn(&mut ScriptList, usize) -> Result<bool>) {
        if !self.require_edit_mode() {
            return;
        }
        let Some(index) = self.list.selected() else {
            self.status = "Select a script first".to_string();
            return;
        };
        let result = self.traced(name, format!("index={index}"), |app| op(&mut app.list, index));
        if let Err(err) = result {
            self.report_error("Reorder failed", err);
        }
    }

    pub fn request_sort(&mut self) {
        if !self.require_edit_mode() {
            return;
        }
        let direction = self.list.next_sort_direction();
        self.dialog = Some(Dialog {
            title: "Sort by Alphabet".to_string(),
            message: format!(
                "Sort all scripts by name ({})?\nThe next sort reverses the direction.",
                direction.label()
            ),
            yes_label: "Sort".to_string(),
            no_label: "Cancel".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::SortAlphabetical { direction },
        });
    }

    fn sort_alphabetical(&mut self) {
        let result = self.traced("sort_alphabet", String::new(), |app| {
            app.list.sort_alphabetical()
        });
        match result {
            Ok(direction) => {
                self.status = format!("Sorted {}", direction.label());
                self.log_info(format!("Sorted scripts {}", direction.label()));
            }
            Err(err) => self.report_error("Sort failed", err),
        }
    }

    pub fn move_checked_to_top(&mut self) {
        if !self.require_edit_mode() {
            return;
        }
        let result = self.traced("move_checked_to_top", String::new(), |app| {
            app.list.move_checked_to_top()
        });
        match result {
            Ok(()) => self.status = "Checked scripts moved to top".to_string(),
            Err(err) => self.report_error("Reorder failed", err),
        }
    }

    pub fn toggle_selected(&mut self) {
        let Some(index) = self.list.selected() else {
            return;
        };
        self.traced("toggle_check", format!("index={index}"), |app| {
            app.list.toggle_enabled(index)
        });
    }

    pub fn toggle_all(&mut self) {
        let enabled = self.traced("toggle_all", String::new(), |app| app.list.toggle_all());
        self.status = if enabled {
            "All scripts checked".to_string()
        } else {
            "All scripts unchecked".to_string()
        };
    }

    pub fn toggle_edit_mode(&mut self) {
        let result = self.traced("toggle_edit_mode", String::new(), |app| {
            app.list.toggle_edit_mode()
        });
        match result {
            Ok(EditModeChange::Entered) => {
                self.status = "Edit mode: reorder and rename, e to save".to_string();
                self.set_toast(
                    "Edit mode",
                    ToastLevel::Info,
                    Duration::from_secs(TOAST_SECS),
                );
            }
            Ok(EditModeChange::Left(summary)) => {
                for (from, to) in &summary.renamed {
                    self.log_info(format!("Renamed {from} → {to}"));
                }
                for err in &summary.rejected {
                    self.log_error(format!("Rename failed: {err}"));
                }
                self.log_info(format!("Scripts saved: {:?}", self.list.filenames()));
                if summary.rejected.is_empty() {
                    self.status = "Saved".to_string();
                    self.set_toast("Saved", ToastLevel::Info, Duration::from_secs(TOAST_SECS));
                } else {
                    self.status = format!("Saved with {} rename error(s)", summary.rejected.len());
                    self.set_toast(
                        "Some renames were rejected",
                        ToastLevel::Warn,
                        Duration::from_secs(TOAST_SECS),
                    );
                }
            }
            Err(err) => self.report_error("Save failed", err),
        }
    }

    pub fn begin_rename(&mut self) {
        if !self.require_edit_mode() {
            return;
        }
        let Some(index) = self.list.selected() else {
            return;
        };
        let Some(entry) = self.list.get(index) else {
            return;
        };
        self.input_mode = InputMode::Editing {
            prompt: format!("Rename {}", entry.filename),
            buffer: entry.display_name.clone(),
            purpose: InputPurpose::RenameEntry { id: entry.id },
        };
    }

    pub fn handle_submit(&mut self, purpose: InputPurpose, value: String) -> Result<()> {
        match purpose {
            InputPurpose::RenameEntry { id } => {
                let index = self
                    .list
                    .index_of(id)
                    .context("script is no longer listed")?;
                self.list.set_display_name(index, &value)?;
                self.status = format!("Name set to {value} (saved on leaving edit mode)");
                Ok(())
            }
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.set_toast(
            "Rename cancelled",
            ToastLevel::Warn,
            Duration::from_secs(TOAST_SECS),
        );
    }

    pub fn run_selected(&mut self) {
        if let Some(index) = self.list.selected() {
            self.run_at(index);
        }
    }

    /// Selects the row and runs it as one action.
    pub fn run_at(&mut self, index: usize) -> Option<RunOutcome> {
        self.select_row(index);
        self.traced("run_function", format!("index={index}"), |app| {
            app.run_entry(index)
        })
    }

    pub fn run_all(&mut self) -> RunAllSummary {
        let summary = self.traced("run_all", String::new(), |app| {
            let targets: Vec<usize> = app
                .list
                .entries()
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.enabled)
                .map(|(index, _)| index)
                .collect();
            let mut summary = RunAllSummary::default();
            for index in targets {
                if let Some(outcome) = app.run_entry(index) {
                    summary.ran += 1;
                    if matches!(outcome, RunOutcome::Failed { .. }) {
                        summary.failed += 1;
                    }
                }
            }
            summary
        });
        if summary.ran == 0 {
            self.status = "No checked scripts to run".to_string();
        } else {
            self.status = format!("Ran {} script(s), {} failed", summary.ran, summary.failed);
        }
        summary
    }

    fn run_entry(&mut self, index: usize) -> Option<RunOutcome> {
        let path = self.list.path_of(index)?;
        let report = self.runner.run(&path);
        self.report_run(&report);
        Some(report.outcome)
    }

    fn report_run(&mut self, report: &RunReport) {
        for (stream, line) in &report.output {
            let message = format!("[{}] {line}", report.filename);
            match stream {
                OutputStream::Stdout => self.log_info(message),
                OutputStream::Stderr => self.log_warn(message),
            }
        }
        match &report.outcome {
            RunOutcome::Completed => {
                self.status = format!("Ran {}", report.filename);
            }
            RunOutcome::NoEntryPoint => {
                self.status = format!("{} has no main()", report.filename);
                self.log_warn(format!("{} has no main() function.", report.filename));
            }
            RunOutcome::Failed { detail } => {
                self.status = format!("Failed to run {}", report.filename);
                self.log_error(format!("Failed to run {}: {detail}", report.filename));
            }
        }
    }

    pub fn dialog_choice_left(&mut self) {
        self.dialog_set_choice(DialogChoice::Yes);
    }

    pub fn dialog_choice_right(&mut self) {
        self.dialog_set_choice(DialogChoice::No);
    }

    pub fn dialog_set_choice(&mut self, choice: DialogChoice) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = choice;
        }
    }

    pub fn dialog_confirm(&mut self) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        match dialog.kind {
            DialogKind::SortAlphabetical { direction } => {
                if dialog.choice != DialogChoice::Yes {
                    self.status = "Sort cancelled".to_string();
                } else if direction != self.list.next_sort_direction() {
                    self.status = "Sort direction changed, press s again".to_string();
                } else {
                    self.sort_alphabetical();
                }
            }
        }
    }

    /// Commits pending renames, then writes order and window size.
    pub fn shutdown(&mut self, geometry: Option<WindowGeometry>) -> Result<()> {
        self.traced("on_close", String::new(), |app| -> Result<()> {
            if app.list.edit_mode() {
                app.toggle_edit_mode();
            }
            app.list.save()?;
            if let Some(geometry) = geometry {
                geometry.save(&app.geometry_path())?;
            }
            Ok(())
        })
    }

    pub fn scroll_log_up(&mut self, lines: usize) {
        let max_scroll = self.logs.len().saturating_sub(1);
        self.log_scroll = self.log_scroll.saturating_add(lines).min(max_scroll);
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn copy_log_to_clipboard(&mut self) {
        let text = self.log_text();
        if text.is_empty() {
            self.status = "Log is empty".to_string();
            self.set_toast("Log is empty", ToastLevel::Warn, Duration::from_secs(TOAST_SECS));
            return;
        }
        if self.copy_to_clipboard(&text) {
            self.status = "Log copied to clipboard".to_string();
            self.set_toast(
                "Log copied to clipboard",
                ToastLevel::Info,
                Duration::from_secs(TOAST_SECS),
            );
        }
    }

    fn copy_to_clipboard(&mut self, text: &str) -> bool {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(err) => {
                    self.status = format!("Clipboard unavailable: {err}");
                    self.log_warn(format!("Clipboard unavailable: {err}"));
                    return false;
                }
            }
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return false;
        };
        if let Err(err) = clipboard.set_text(text.to_string()) {
            self.status = format!("Clipboard copy failed: {err}");
            self.log_warn(format!("Clipboard copy failed: {err}"));
            return false;
        }
        true
    }

    fn require_edit_mode(&mut self) -> bool {
        if self.list.edit_mode() {
            return true;
        }
        self.status = "Press e to enter edit mode first".to_string();
        false
    }

    pub fn report_error(&mut self, action: &str, err: anyhow::Error) {
        self.status = format!("{action}: {err}");
        self.set_toast(action, ToastLevel::Error, Duration::from_secs(TOAST_SECS));
        self.log_error(format!("{action}: {err:#}"));
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message, 0);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message, 0);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message, 0);
    }

    fn push_trace(&mut self, line: TraceLine) {
        self.push_log(LogLevel::Trace, line.text, line.depth);
    }

    fn log_text(&self) -> String {
        self.logs
            .iter()
            .map(|entry| {
                format!(
                    "[{}] {}{}",
                    log_level_label(entry.level),
                    "    ".repeat(entry.depth),
                    entry.message
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn push_log(&mut self, level: LogLevel, message: String, depth: usize) {
        if self.log_scroll > 0 {
            self.log_scroll = self.log_scroll.saturating_add(1);
        }

        if let Some(path) = &self.log_path {
            let _ = append_log_file(path, level, depth, &message);
        }

        self.logs.push(LogEntry {
            level,
            message,
            depth,
        });

        if self.logs.len() > LOG_CAPACITY {
            let overflow = self.logs.len() - LOG_CAPACITY;
            self.logs.drain(0..overflow);
            self.log_scroll = self.log_scroll.saturating_sub(overflow);
        }
    }
}

pub fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
        LogLevel::Trace => "TRACE",
    }
}

fn append_log_file(path: &Path, level: LogLevel, depth: usize, message: &str) -> std::io::Result<()> {
    let label = log_level_label(level);
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp = now
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_default();
    let indent = "    ".repeat(depth);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{stamp} [{label}] {indent}{message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, collections::HashMap, rc::Rc};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeRunner {
        calls: Rc<RefCell<Vec<String>>>,
        outcomes: HashMap<String, RunOutcome>,
    }

    impl ScriptRunner for FakeRunner {
        fn run(&self, path: &Path) -> RunReport {
            let filename = path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string();
            self.calls.borrow_mut().push(filename.clone());
            let outcome = self
                .outcomes
                .get(&filename)
                .cloned()
                .unwrap_or(RunOutcome::Completed);
            RunReport {
                filename,
                outcome,
                output: vec![(OutputStream::Stdout, "hello".to_string())],
            }
        }
    }

    fn setup(
        names: &[&str],
        outcomes: &[(&str, RunOutcome)],
        debug: bool,
    ) -> (TempDir, App, Rc<RefCell<Vec<String>>>) {
        let temp = TempDir::new().unwrap();
        let scripts = temp.path().join("functions");
        fs::create_dir_all(&scripts).unwrap();
        for name in names {
            fs::write(scripts.join(name), "def main():\n    pass\n").unwrap();
        }
        let config = LauncherConfig {
            scripts_dir: scripts.clone(),
            interpreter: "python3".to_string(),
            data_dir: temp.path().to_path_buf(),
        };
        let list = ScriptList::load(&scripts).unwrap();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let runner = FakeRunner {
            calls: calls.clone(),
            outcomes: outcomes
                .iter()
                .map(|(name, outcome)| (name.to_string(), outcome.clone()))
                .collect(),
        };
        let app = App::with_parts(config, list, Box::new(runner), Tracer::new(debug));
        (temp, app, calls)
    }

    #[test]
    fn run_all_runs_checked_in_order_past_failures() {
        let failure = RunOutcome::Failed {
            detail: "RuntimeError: boom".to_string(),
        };
        let (_temp, mut app, calls) =
            setup(&["a.py", "b.py", "c.py", "d.py"], &[("b.py", failure)], false);
        app.list.toggle_enabled(0);
        app.list.toggle_enabled(1);
        app.list.toggle_enabled(3);

        let summary = app.run_all();
        assert_eq!(summary, RunAllSummary { ran: 3, failed: 1 });
        assert_eq!(*calls.borrow(), vec!["a.py", "b.py", "d.py"]);
        assert!(app
            .logs
            .iter()
            .any(|entry| entry.level == LogLevel::Error
                && entry.message == "Failed to run b.py: RuntimeError: boom"));
    }

    #[test]
    fn missing_entry_point_warns_without_touching_model() {
        let (_temp, mut app, _calls) =
            setup(&["a.py", "b.py"], &[("b.py", RunOutcome::NoEntryPoint)], false);
        let before = app.list.entries().to_vec();

        let outcome = app.run_at(1);
        assert_eq!(outcome, Some(RunOutcome::NoEntryPoint));
        assert_eq!(app.list.entries(), before.as_slice());
        assert_eq!(app.list.selected(), Some(1));
        assert!(app
            .logs
            .iter()
            .any(|entry| entry.level == LogLevel::Warn
                && entry.message == "b.py has no main() function."));
    }

    #[test]
    fn run_selects_the_row_first() {
        let (_temp, mut app, calls) = setup(&["a.py", "b.py", "c.py"], &[], false);
        assert_eq!(app.list.selected(), Some(0));

        app.run_at(2);
        assert_eq!(app.list.selected(), Some(2));
        assert_eq!(*calls.borrow(), vec!["c.py"]);
        assert!(app
            .logs
            .iter()
            .any(|entry| entry.message == "[c.py] hello"));
    }

    #[test]
    fn reordering_needs_edit_mode() {
        let (_temp, mut app, _calls) = setup(&["a.py", "b.py"], &[], false);
        app.select_row(1);

        app.move_selected_up();
        assert_eq!(app.list.filenames(), vec!["a.py", "b.py"]);

        app.toggle_edit_mode();
        app.move_selected_up();
        assert_eq!(app.list.filenames(), vec!["b.py", "a.py"]);
        assert_eq!(app.list.selected(), Some(0));
    }

    #[test]
    fn sort_waits_for_confirmation() {
        let (_temp, mut app, _calls) = setup(&["a.py", "b.py", "c.py"], &[], false);
        app.toggle_edit_mode();

        app.request_sort();
        assert!(app.dialog.is_some());
        app.dialog_confirm();
        assert_eq!(app.list.filenames(), vec!["a.py", "b.py", "c.py"]);
        assert_eq!(app.list.next_sort_direction(), SortDirection::Asc);

        app.request_sort();
        app.dialog_choice_left();
        app.dialog_confirm();
        assert_eq!(app.list.next_sort_direction(), SortDirection::Desc);

        app.request_sort();
        app.dialog_set_choice(DialogChoice::Yes);
        app.dialog_confirm();
        assert_eq!(app.list.filenames(), vec!["c.py", "b.py", "a.py"]);
    }

    #[test]
    fn stale_sort_confirmation_is_not_applied() {
        let (_temp, mut app, _calls) = setup(&["b.py", "a.py", "c.py"], &[], false);
        app.toggle_edit_mode();
        app.list.move_top(2).unwrap();

        app.request_sort();
        app.list.sort_alphabetical().unwrap();
        let sorted = app.list.filenames();
        app.dialog_set_choice(DialogChoice::Yes);
        app.dialog_confirm();

        assert!(app.dialog.is_none());
        assert_eq!(app.list.filenames(), sorted);
        assert_eq!(app.list.next_sort_direction(), SortDirection::Desc);
    }

    #[test]
    fn rename_flow_commits_on_save() {
        let (temp, mut app, _calls) = setup(&["a.py", "b.py"], &[], false);
        app.begin_rename();
        assert_eq!(app.input_mode, InputMode::Normal);

        app.toggle_edit_mode();
        app.begin_rename();
        let InputMode::Editing { purpose, .. } = app.input_mode.clone() else {
            panic!("expected rename input");
        };
        app.input_mode = InputMode::Normal;
        app.handle_submit(purpose, "daily report".to_string()).unwrap();
        assert_eq!(app.list.get(0).unwrap().filename, "a.py");

        app.toggle_edit_mode();
        assert_eq!(app.list.filenames(), vec!["daily_report.py", "b.py"]);
        assert!(temp.path().join("functions").join("daily_report.py").exists());
        assert!(app
            .logs
            .iter()
            .any(|entry| entry.message == "Renamed a.py → daily_report.py"));
    }

    #[test]
    fn shutdown_commits_edits_and_writes_geometry() {
        let (temp, mut app, _calls) = setup(&["a.py"], &[], false);
        app.toggle_edit_mode();
        app.list.set_display_name(0, "renamed").unwrap();

        let geometry = WindowGeometry {
            width: 100,
            height: 40,
        };
        app.shutdown(Some(geometry)).unwrap();
        assert!(!app.list.edit_mode());
        assert_eq!(app.list.filenames(), vec!["renamed.py"]);
        assert_eq!(WindowGeometry::load(&temp.path().join("window_size.json")), geometry);
    }

    #[test]
    fn debug_traces_nested_operations() {
        let (_temp, mut app, _calls) = setup(&["a.py"], &[], true);
        app.list.toggle_enabled(0);
        app.run_all();

        let traces: Vec<(usize, &str)> = app
            .logs
            .iter()
            .filter(|entry| entry.level == LogLevel::Trace)
            .map(|entry| (entry.depth, entry.message.as_str()))
            .collect();
        assert_eq!(traces.first(), Some(&(0, "==> Entry: run_all with arguments: ()")));
        assert_eq!(
            traces.last(),
            Some(&(0, "<== Exit: run_all with result: RunAllSummary { ran: 1, failed: 0 }"))
        );
    }

    #[test]
    fn without_debug_no_trace_lines() {
        let (_temp, mut app, _calls) = setup(&["a.py"], &[], false);
        app.select_row(0);
        app.toggle_all();
        assert!(app.logs.iter().all(|entry| entry.level != LogLevel::Trace));
    }
}
