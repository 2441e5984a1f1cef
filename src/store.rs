//! Job storage capability.
//!
//! Every status write goes through [`JobStore::transition`], which applies a
//! [`JobEvent`] under a per-job lock so the background run and concurrent
//! readers never observe a torn record. There is no lock across jobs.
//!
//! [`MemoryJobStore`] keeps jobs for the life of the process.
//! [`JsonFileJobStore`] keeps one JSON file per job, written via a temporary
//! file and an atomic rename.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::{Result, ScriptoriumError};
use crate::state_machine::{Job, JobEvent, StateMachine};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job. Fails if the id is already taken.
    async fn insert(&self, job: Job) -> Result<()>;

    async fn get(&self, job_id: &str) -> Result<Option<Job>>;

    /// Atomically apply `event` to the stored job and return the new record.
    async fn transition(&self, job_id: &str, event: JobEvent) -> Result<Job>;

    /// All jobs of `owner`, most recently created first.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Job>>;
}

fn newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[derive(Default)]
struct MemoryInner {
    jobs: HashMap<String, Arc<Mutex<Job>>>,
    // insertion order, used to break created_at ties
    order: Vec<String>,
}

#[derive(Default)]
pub struct MemoryJobStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, job_id: &str) -> Option<Arc<Mutex<Job>>> {
        self.inner.read().await.jobs.get(job_id).cloned()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: Job) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&job.id) {
            return Err(ScriptoriumError::Store(format!("duplicate job id {}", job.id)));
        }
        inner.order.push(job.id.clone());
        inner.jobs.insert(job.id.clone(), Arc::new(Mutex::new(job)));
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>> {
        match self.slot(job_id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn transition(&self, job_id: &str, event: JobEvent) -> Result<Job> {
        let slot = self
            .slot(job_id)
            .await
            .ok_or_else(|| ScriptoriumError::NotFound(job_id.to_string()))?;
        let mut job = slot.lock().await;
        StateMachine::apply(&mut job, event)?;
        Ok(job.clone())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Job>> {
        let slots: Vec<Arc<Mutex<Job>>> = {
            let inner = self.inner.read().await;
            inner
                .order
                .iter()
                .rev()
                .filter_map(|id| inner.jobs.get(id).cloned())
                .collect()
        };

        let mut jobs = Vec::new();
        for slot in slots {
            let job = slot.lock().await;
            if job.owner == owner {
                jobs.push(job.clone());
            }
        }
        newest_first(&mut jobs);
        Ok(jobs)
    }
}

type LockTable = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Exclusive access to one job file. The table entry is dropped with the last
/// holder, so the table only tracks ids that are in use.
struct JobLock<'a> {
    table: &'a LockTable,
    job_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for JobLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let Ok(mut table) = self.table.lock() else {
            return;
        };
        if table
            .get(&self.job_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.job_id);
        }
    }
}

/// One `<id>.json` file per job under a directory.
pub struct JsonFileJobStore {
    dir: PathBuf,
    locks: LockTable,
}

impl JsonFileJobStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            locks: StdMutex::new(HashMap::new()),
        })
    }

    // Ids come from callers; anything outside [A-Za-z0-9-] can never be ours.
    fn path_for(&self, job_id: &str) -> Option<PathBuf> {
        let valid = !job_id.is_empty()
            && job_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| self.dir.join(format!("{job_id}.json")))
    }

    async fn lock(&self, job_id: &str) -> Result<JobLock<'_>> {
        let mutex = {
            let mut table = self
                .locks
                .lock()
                .map_err(|_| ScriptoriumError::Store("job lock table poisoned".into()))?;
            Arc::clone(table.entry(job_id.to_string()).or_default())
        };
        let guard = mutex.lock_owned().await;
        Ok(JobLock {
            table: &self.locks,
            job_id: job_id.to_string(),
            guard: Some(guard),
        })
    }

    async fn read(path: &Path) -> Result<Option<Job>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(path: &Path, job: &Job) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(job)?;
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for JsonFileJobStore {
    async fn insert(&self, job: Job) -> Result<()> {
        let path = self
            .path_for(&job.id)
            .ok_or_else(|| ScriptoriumError::Store(format!("invalid job id {}", job.id)))?;
        let _lock = self.lock(&job.id).await?;
        if tokio::fs::try_exists(&path).await? {
            return Err(ScriptoriumError::Store(format!("duplicate job id {}", job.id)));
        }
        Self::write(&path, &job).await
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>> {
        let Some(path) = self.path_for(job_id) else {
            return Ok(None);
        };
        let _lock = self.lock(job_id).await?;
        Self::read(&path).await
    }

    async fn transition(&self, job_id: &str, event: JobEvent) -> Result<Job> {
        let path = self
            .path_for(job_id)
            .ok_or_else(|| ScriptoriumError::NotFound(job_id.to_string()))?;
        let _lock = self.lock(job_id).await?;
        let mut job = Self::read(&path)
            .await?
            .ok_or_else(|| ScriptoriumError::NotFound(job_id.to_string()))?;
        StateMachine::apply(&mut job, event)?;
        Self::write(&path, &job).await?;
        Ok(job)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Job>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(id.to_string());
            }
        }

        let mut jobs = Vec::new();
        for id in ids {
            if let Some(job) = self.get(&id).await? {
                if job.owner == owner {
                    jobs.push(job);
                }
            }
        }
        newest_first(&mut jobs);
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Report;
    use crate::state_machine::JobStatus;

    async fn exercise_lifecycle(store: &dyn JobStore) {
        let job = Job::new("Topic", "alice");
        let id = job.id.clone();
        store.insert(job).await.unwrap();

        let started = store.transition(&id, JobEvent::Start).await.unwrap();
        assert_eq!(started.status, JobStatus::Processing);

        let done = store
            .transition(&id, JobEvent::Complete(Report::new("Topic", Vec::new())))
            .await
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.result.unwrap().topic, "Topic");
        assert_eq!(stored.status_history, vec![JobStatus::Queued, JobStatus::Processing]);

        let late = store.transition(&id, JobEvent::Fail("late".into())).await;
        assert!(matches!(late, Err(ScriptoriumError::InvalidTransition { .. })));
        assert!(store.get(&id).await.unwrap().unwrap().error.is_none());
    }

    async fn exercise_listing(store: &dyn JobStore) {
        let first = Job::new("first", "alice");
        let mut second = Job::new("second", "alice");
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        let other = Job::new("other", "bob");

        store.insert(first).await.unwrap();
        store.insert(second).await.unwrap();
        store.insert(other).await.unwrap();

        let topics: Vec<String> = store
            .list_by_owner("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.topic)
            .collect();
        assert_eq!(topics, vec!["second", "first"]);
        assert!(store.list_by_owner("carol").await.unwrap().is_empty());
    }

    /// Races a completion against a failure on one running job while readers
    /// poll it. Exactly one terminal write lands; every read sees a whole record.
    async fn exercise_racing_terminal_writes(store: Arc<dyn JobStore>) {
        let job = Job::new("Topic", "alice");
        let id = job.id.clone();
        store.insert(job).await.unwrap();
        store.transition(&id, JobEvent::Start).await.unwrap();

        let spawn_transition = |event: JobEvent| {
            let store = Arc::clone(&store);
            let id = id.clone();
            tokio::spawn(async move { store.transition(&id, event).await })
        };
        let complete = spawn_transition(JobEvent::Complete(Report::new("Topic", Vec::new())));
        let fail = spawn_transition(JobEvent::Fail("boom".into()));
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                tokio::spawn(async move { store.get(&id).await })
            })
            .collect();

        let outcomes = [complete.await.unwrap(), fail.await.unwrap()];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(ScriptoriumError::InvalidTransition { .. }))));

        for reader in readers {
            let seen = reader.await.unwrap().unwrap().unwrap();
            assert_ne!(seen.status, JobStatus::Queued);
        }

        let stored = store.get(&id).await.unwrap().unwrap();
        assert!(stored.is_terminal());
        assert_eq!(stored.status_history, vec![JobStatus::Queued, JobStatus::Processing]);
        assert!(stored.result.is_some() != stored.error.is_some());
    }

    #[tokio::test]
    async fn memory_store_lifecycle() {
        exercise_lifecycle(&MemoryJobStore::new()).await;
    }

    #[tokio::test]
    async fn memory_store_listing() {
        exercise_listing(&MemoryJobStore::new()).await;
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicates_and_unknown_ids() {
        let store = MemoryJobStore::new();
        let job = Job::new("Topic", "alice");
        store.insert(job.clone()).await.unwrap();
        assert!(store.insert(job).await.is_err());

        assert!(store.get("missing").await.unwrap().is_none());
        let err = store.transition("missing", JobEvent::Start).await.unwrap_err();
        assert!(matches!(err, ScriptoriumError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn memory_store_serializes_terminal_writes() {
        exercise_racing_terminal_writes(Arc::new(MemoryJobStore::new())).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn file_store_serializes_terminal_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileJobStore::open(dir.path()).await.unwrap());

        exercise_racing_terminal_writes(store.clone()).await;

        assert!(store.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_releases_locks_for_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileJobStore::open(dir.path()).await.unwrap();

        for i in 0..16 {
            assert!(store.get(&format!("missing-{i}")).await.unwrap().is_none());
        }
        exercise_lifecycle(&store).await;

        assert!(store.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileJobStore::open(dir.path()).await.unwrap();
        exercise_lifecycle(&store).await;
    }

    #[tokio::test]
    async fn file_store_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileJobStore::open(dir.path()).await.unwrap();
        exercise_listing(&store).await;
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::new("Persisted", "alice");
        let id = job.id.clone();
        {
            let store = JsonFileJobStore::open(dir.path()).await.unwrap();
            store.insert(job).await.unwrap();
            store.transition(&id, JobEvent::Start).await.unwrap();
        }

        let reopened = JsonFileJobStore::open(dir.path()).await.unwrap();
        let job = reopened.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(!dir.path().join(format!("{id}.json.tmp")).exists());
    }

    #[tokio::test]
    async fn file_store_ignores_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileJobStore::open(dir.path()).await.unwrap();
        assert!(store.get("../etc/passwd").await.unwrap().is_none());
        assert!(matches!(
            store.transition("a/b", JobEvent::Start).await,
            Err(ScriptoriumError::NotFound(_))
        ));
    }
}
