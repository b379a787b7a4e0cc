//! Team registry
//!
//! Authoritative store of team records, keyed by the slug derived from the
//! display name. Every operation is atomic per team; there are no
//! cross-team transactions.

use crate::queue::JobQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{CompilationStatus, Team, TeamSummary, now_millis};
use std::sync::Arc;
use tracing::info;

/// Concurrent team store
///
/// Holds the job queue so that deleting a team also drops its waiting jobs.
#[derive(Debug)]
pub struct TeamRegistry {
    teams: DashMap<String, Team>,
    queue: Arc<JobQueue>,
}

impl TeamRegistry {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self {
            teams: DashMap::new(),
            queue,
        }
    }

    /// Create or update the team for `display_name`, returning its id
    ///
    /// A repeat registration replaces the script and counts another upload;
    /// the printer flag is kept.
    pub fn register(&self, display_name: &str, script: &str) -> AppResult<String> {
        let display_name = display_name.trim();
        let id = Team::slug(display_name).ok_or_else(|| {
            AppError::with_message(
                ErrorCode::InvalidTeamName,
                format!("Team name '{display_name}' has no letters or digits"),
            )
        })?;

        let now = now_millis();
        match self.teams.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let team = entry.get_mut();
                team.display_name = display_name.to_string();
                team.script = script.to_string();
                team.upload_count += 1;
                team.last_activity_time = now;
                info!(team_id = %id, uploads = team.upload_count, "Team updated");
            }
            Entry::Vacant(entry) => {
                let mut team = Team::new(id.clone(), display_name, script, now);
                team.upload_count = 1;
                entry.insert(team);
                info!(team_id = %id, "Team registered");
            }
        }
        Ok(id)
    }

    pub fn get(&self, team_id: &str) -> AppResult<Team> {
        self.teams
            .get(team_id)
            .map(|t| t.clone())
            .ok_or_else(|| AppError::team_not_found(team_id))
    }

    pub fn contains(&self, team_id: &str) -> bool {
        self.teams.contains_key(team_id)
    }

    fn update<R>(&self, team_id: &str, f: impl FnOnce(&mut Team) -> R) -> AppResult<R> {
        let mut team = self
            .teams
            .get_mut(team_id)
            .ok_or_else(|| AppError::team_not_found(team_id))?;
        Ok(f(&mut team))
    }

    pub fn update_script(&self, team_id: &str, script: &str) -> AppResult<()> {
        self.update(team_id, |team| {
            team.script = script.to_string();
            team.last_activity_time = now_millis();
        })
    }

    pub fn set_printer_enabled(&self, team_id: &str, enabled: bool) -> AppResult<()> {
        self.update(team_id, |team| team.printer_enabled = enabled)?;
        info!(team_id, enabled, "Printer access changed");
        Ok(())
    }

    /// Store the validation outcome of the latest upload
    pub fn record_upload(
        &self,
        team_id: &str,
        status: CompilationStatus,
        error: Option<String>,
    ) -> AppResult<()> {
        self.update(team_id, |team| {
            team.last_compilation_status = status;
            team.last_compilation_error = error;
            team.last_activity_time = now_millis();
        })
    }

    /// Count an accepted print request
    pub fn record_job(&self, team_id: &str) -> AppResult<u64> {
        self.update(team_id, |team| {
            team.job_count += 1;
            team.last_activity_time = now_millis();
            team.job_count
        })
    }

    /// Remove a team and its queued jobs
    pub fn delete(&self, team_id: &str) -> bool {
        if self.teams.remove(team_id).is_none() {
            return false;
        }
        let removed_jobs = self.queue.remove_team(team_id);
        info!(team_id, removed_jobs, "Team deleted");
        true
    }

    /// Remove every team and every queued job, returning the team count
    pub fn clear(&self) -> usize {
        let teams = self.teams.len();
        self.teams.clear();
        let jobs = self.queue.clear();
        info!(teams, jobs, "Registry cleared");
        teams
    }

    /// Summaries, most recently active first
    pub fn list(&self) -> Vec<TeamSummary> {
        let mut teams: Vec<TeamSummary> = self.teams.iter().map(|t| t.summary()).collect();
        teams.sort_by(|a, b| {
            b.last_activity_time
                .cmp(&a.last_activity_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn printer_enabled_count(&self) -> usize {
        self.teams.iter().filter(|t| t.printer_enabled).count()
    }

    pub fn total_uploads(&self) -> u64 {
        self.teams.iter().map(|t| t.upload_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{PrintJob, PrinterCommand};

    fn registry() -> (TeamRegistry, Arc<JobQueue>) {
        let queue = Arc::new(JobQueue::new(10));
        (TeamRegistry::new(queue.clone()), queue)
    }

    #[test]
    fn test_register_merges_same_slug() {
        let (registry, _) = registry();
        let id = registry.register("Team Rocket", "v1").unwrap();
        assert_eq!(id, "team-rocket");
        registry.set_printer_enabled(&id, true).unwrap();

        let again = registry.register("team   rocket!", "v2").unwrap();
        assert_eq!(again, id);
        assert_eq!(registry.len(), 1);

        let team = registry.get(&id).unwrap();
        assert_eq!(team.script, "v2");
        assert_eq!(team.upload_count, 2);
        assert!(team.printer_enabled);
    }

    #[test]
    fn test_invalid_name() {
        let (registry, _) = registry();
        let err = registry.register("  !!! ", "x").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTeamName);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_team() {
        let (registry, _) = registry();
        assert_eq!(registry.get("ghost").unwrap_err().code, ErrorCode::TeamNotFound);
        assert_eq!(
            registry.update_script("ghost", "x").unwrap_err().code,
            ErrorCode::TeamNotFound
        );
        assert!(registry.set_printer_enabled("ghost", true).is_err());
        assert!(!registry.delete("ghost"));
    }

    #[test]
    fn test_record_upload_and_jobs() {
        let (registry, _) = registry();
        let id = registry.register("Byte Me", "").unwrap();
        registry
            .record_upload(&id, CompilationStatus::Failed, Some("boom".into()))
            .unwrap();
        assert_eq!(registry.record_job(&id).unwrap(), 1);
        assert_eq!(registry.record_job(&id).unwrap(), 2);

        let team = registry.get(&id).unwrap();
        assert_eq!(team.last_compilation_status, CompilationStatus::Failed);
        assert_eq!(team.last_compilation_error.as_deref(), Some("boom"));
        assert_eq!(team.job_count, 2);
    }

    #[test]
    fn test_delete_cascades_to_queue() {
        let (registry, queue) = registry();
        let a = registry.register("Alpha", "").unwrap();
        let b = registry.register("Beta", "").unwrap();
        for team in [&a, &b, &a] {
            queue
                .enqueue(PrintJob::new(team.as_str(), team.as_str(), vec![PrinterCommand::Cut]))
                .unwrap();
        }

        assert!(registry.delete(&a));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.snapshot()[0].team_id, b);
        assert!(registry.get(&a).is_err());
    }

    #[test]
    fn test_list_sorted_by_activity() {
        let (registry, _) = registry();
        let a = registry.register("Alpha", "").unwrap();
        let b = registry.register("Beta", "").unwrap();
        registry.update(&a, |t| t.last_activity_time = 10).unwrap();
        registry.update(&b, |t| t.last_activity_time = 20).unwrap();

        let ids: Vec<String> = registry.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_clear_and_counters() {
        let (registry, queue) = registry();
        let a = registry.register("Alpha", "").unwrap();
        registry.register("Alpha", "").unwrap();
        registry.register("Beta", "").unwrap();
        registry.set_printer_enabled(&a, true).unwrap();
        queue
            .enqueue(PrintJob::new(a.as_str(), "Alpha", vec![PrinterCommand::Cut]))
            .unwrap();

        assert_eq!(registry.total_uploads(), 3);
        assert_eq!(registry.printer_enabled_count(), 1);

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_registration_merges() {
        let (registry, _) = registry();
        let registry = Arc::new(registry);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.register("Same Team", &format!("v{i}")).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "same-team");
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("same-team").unwrap().upload_count, 8);
    }
}
