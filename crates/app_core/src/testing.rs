//! Test doubles shared by the core tests

use app_fs::{
    AuthState, FileEntry, LocalHandle, MemoryProvider, Prompter, ProviderAdapter, ProviderError,
    ProviderResult, RemotePath, Scratch,
};
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

/// One adapter call, keyed by the full remote path it touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Fetch(String),
    Store(String),
    Delete(String),
}

/// Memory-backed adapter that records calls and fails on demand
pub struct ScriptedAdapter {
    inner: MemoryProvider,
    calls: RefCell<Vec<Call>>,
    failures: RefCell<Vec<(Call, ProviderError)>>,
    parts: usize,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self {
            inner: MemoryProvider::new(),
            calls: RefCell::new(Vec::new()),
            failures: RefCell::new(Vec::new()),
            parts: 1,
        }
    }

    /// Every fetch expands into `parts` local files
    pub fn multi_part(mut self, parts: usize) -> Self {
        self.parts = parts;
        self
    }

    pub fn add_file(&self, path: &str, data: &str) {
        self.inner.insert_file(path, data.as_bytes());
    }

    pub fn add_folder(&self, path: &str) {
        self.inner.insert_folder(path);
    }

    pub fn read(&self, path: &str) -> Option<String> {
        self.inner
            .read_file(path)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }

    /// Fail the next call matching `call` with `error`
    pub fn fail(&self, call: Call, error: ProviderError) {
        self.failures.borrow_mut().push((call, error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn stores(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Store(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> ProviderResult<()> {
        self.calls.borrow_mut().push(call.clone());
        let mut failures = self.failures.borrow_mut();
        match failures.iter().position(|(c, _)| *c == call) {
            Some(idx) => Err(failures.remove(idx).1),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl ProviderAdapter for ScriptedAdapter {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn initialize(
        &mut self,
        _drive_name: &str,
        _prompter: &mut dyn Prompter,
    ) -> ProviderResult<AuthState> {
        Ok(AuthState::empty())
    }

    async fn list(&self, path: &RemotePath) -> ProviderResult<Vec<FileEntry>> {
        self.record(Call::List(path.trimmed().to_string()))?;
        self.inner.list(path).await
    }

    async fn fetch(
        &self,
        folder: &RemotePath,
        file_name: &str,
        scratch: &Scratch,
    ) -> ProviderResult<LocalHandle> {
        self.record(Call::Fetch(folder.join(file_name).to_string()))?;
        let handle = self.inner.fetch(folder, file_name, scratch).await?;
        if self.parts <= 1 {
            return Ok(handle);
        }

        let mut parts = handle.parts().to_vec();
        for k in 1..self.parts {
            let extra = scratch.allocate(&format!("{}.part{}", file_name, k))?;
            std::fs::write(&extra, format!("part {}", k))?;
            parts.push(extra);
        }
        Ok(LocalHandle::from_parts(parts))
    }

    async fn store(&self, folder: &RemotePath, file_name: &str, local: &Path) -> ProviderResult<()> {
        self.record(Call::Store(folder.join(file_name).to_string()))?;
        self.inner.store(folder, file_name, local).await
    }

    async fn delete(&self, folder: &RemotePath, file_name: Option<&str>) -> ProviderResult<()> {
        let target = match file_name {
            Some(name) => folder.join(name),
            None => folder.clone(),
        };
        self.record(Call::Delete(target.to_string()))?;
        self.inner.delete(folder, file_name).await
    }
}

/// Prompter that replays canned answers in order
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub notes: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            notes: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, _question: &str, default: Option<&str>) -> ProviderResult<String> {
        match self.answers.pop_front() {
            Some(answer) if answer.is_empty() => Ok(default.unwrap_or_default().to_string()),
            Some(answer) => Ok(answer),
            None => Err(ProviderError::Cancelled),
        }
    }

    fn note(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }
}
