//! GitHub commit collector
//!
//! Fetches the authenticated user's recent commits across all accessible
//! repositories (or one legacy-scoped repository) and normalizes them into
//! [`CommitActivity`] records. Inaccessible or empty repositories are
//! skipped, never fatal: partial data is strictly better than aborting the
//! whole recap for one flaky upstream call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::collectors::window::ActivityWindow;

/// GitHub collector specific errors
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },
}

/// A normalized commit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitActivity {
    /// Repository in `owner/name` form
    pub repository: String,
    /// First line of the commit message
    pub message: String,
    /// Commit author login or name
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Optional legacy scoping to a single repository.
#[derive(Debug, Clone)]
pub struct RepoScope {
    pub owner: String,
    pub repo: String,
}

/// GitHub commit collector
#[derive(Debug, Clone)]
pub struct GitHubCollector {
    api_base: String,
    http: reqwest::Client,
    max_repos: usize,
    max_commits: usize,
}

impl GitHubCollector {
    /// Create a new collector against the given API base URL
    pub fn new(api_base: String, max_repos: usize, max_commits: usize) -> Self {
        Self {
            api_base,
            http: reqwest::Client::new(),
            max_repos,
            max_commits,
        }
    }

    /// Collects the user's commits inside the window.
    ///
    /// Degrades to an empty sequence on any top-level failure (bad token,
    /// repo listing unavailable) and skips individual repositories that
    /// error, logging and continuing. Results are most-recent-first and
    /// capped at `max_commits`.
    pub async fn collect(
        &self,
        token: &str,
        scope: Option<&RepoScope>,
        window: &ActivityWindow,
    ) -> Vec<CommitActivity> {
        let login = match self.authenticated_login(token).await {
            Ok(login) => login,
            Err(e) => {
                warn!(error = %e, "could not resolve GitHub user, skipping commit collection");
                return Vec::new();
            }
        };

        let repos = match scope {
            Some(scope) => vec![format!("{}/{}", scope.owner, scope.repo)],
            None => match self.accessible_repos(token).await {
                Ok(repos) => repos,
                Err(e) => {
                    warn!(error = %e, "could not list GitHub repositories, skipping commit collection");
                    return Vec::new();
                }
            },
        };

        let mut commits = Vec::new();
        for full_name in repos.iter().take(self.max_repos) {
            match self.repo_commits(token, full_name, &login, window).await {
                Ok(mut repo_commits) => commits.append(&mut repo_commits),
                Err(GitHubError::ApiError { status, .. })
                    if status == 403 || status == 404 || status == 409 =>
                {
                    // Forbidden, missing, or empty repository: skippable.
                    debug!(repository = %full_name, status, "skipping inaccessible repository");
                    metrics::counter!("collector_repos_skipped", "source" => "github")
                        .increment(1);
                }
                Err(e) => {
                    warn!(repository = %full_name, error = %e, "commit fetch failed, skipping repository");
                    metrics::counter!("collector_repos_skipped", "source" => "github")
                        .increment(1);
                }
            }
        }

        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        commits.truncate(self.max_commits);
        debug!(count = commits.len(), "collected GitHub commits");
        commits
    }

    /// Resolves the login of the token's owner.
    async fn authenticated_login(&self, token: &str) -> Result<String, GitHubError> {
        let response = self
            .http
            .get(format!("{}/user", self.api_base))
            .header("Authorization", format!("Bearer {}", token))
            .header("User-Agent", "standup-recap/0.1")
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        if response.status().is_success() {
            let user: GitHubUser = response.json().await?;
            Ok(user.login)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(GitHubError::ApiError {
                status,
                message: format!("Failed to get user info: {}", body),
            })
        }
    }

    /// Lists repositories the token can access, most recently pushed first.
    async fn accessible_repos(&self, token: &str) -> Result<Vec<String>, GitHubError> {
        let response = self
            .http
            .get(format!("{}/user/repos", self.api_base))
            .header("Authorization", format!("Bearer {}", token))
            .header("User-Agent", "standup-recap/0.1")
            .header("Accept", "application/vnd.github.v3+json")
            .query(&[
                ("sort", "pushed"),
                ("direction", "desc"),
                ("per_page", "100"),
                ("affiliation", "owner,collaborator,organization_member"),
            ])
            .send()
            .await?;

        if response.status().is_success() {
            let repos: Vec<GitHubRepo> = response.json().await?;
            Ok(repos.into_iter().map(|r| r.full_name).collect())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(GitHubError::ApiError {
                status,
                message: format!("Failed to list repositories: {}", body),
            })
        }
    }

    /// Fetches one repository's commits authored by `login` in the window.
    async fn repo_commits(
        &self,
        token: &str,
        full_name: &str,
        login: &str,
        window: &ActivityWindow,
    ) -> Result<Vec<CommitActivity>, GitHubError> {
        let response = self
            .http
            .get(format!("{}/repos/{}/commits", self.api_base, full_name))
            .header("Authorization", format!("Bearer {}", token))
            .header("User-Agent", "standup-recap/0.1")
            .header("Accept", "application/vnd.github.v3+json")
            .query(&[
                ("author", login),
                ("since", &window.start().to_rfc3339()),
                ("until", &window.end_exclusive().to_rfc3339()),
                ("per_page", "100"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::ApiError {
                status,
                message: format!("Failed to fetch commits: {}", body),
            });
        }

        let commits: Vec<GitHubCommit> = response.json().await?;
        Ok(commits
            .into_iter()
            .filter_map(|c| normalize_commit(c, full_name, login))
            .filter(|c| window.contains(c.timestamp))
            .collect())
    }
}

/// Normalizes one upstream commit into a [`CommitActivity`], dropping
/// commits not attributable to the target login.
fn normalize_commit(
    commit: GitHubCommit,
    repository: &str,
    login: &str,
) -> Option<CommitActivity> {
    // The `author` query param already filters server-side, but commits can
    // come back with detached user objects; a commit counts as the user's
    // when either the author or the committer login matches.
    let matches = |user: &Option<GitHubUser>| {
        user.as_ref()
            .map(|u| u.login.eq_ignore_ascii_case(login))
            .unwrap_or(false)
    };
    if !matches(&commit.author) && !matches(&commit.committer) {
        return None;
    }

    let message = commit
        .commit
        .message
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();

    Some(CommitActivity {
        repository: repository.to_string(),
        message,
        author: commit
            .author
            .map(|a| a.login)
            .unwrap_or_else(|| commit.commit.author.name.clone()),
        timestamp: commit.commit.author.date,
    })
}

// GitHub API response types

#[derive(Debug, Serialize, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GitHubRepo {
    full_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GitHubCommit {
    sha: String,
    commit: GitHubCommitDetail,
    #[serde(default)]
    author: Option<GitHubUser>,
    #[serde(default)]
    committer: Option<GitHubUser>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GitHubCommitDetail {
    message: String,
    author: GitHubCommitAuthor,
}

#[derive(Debug, Serialize, Deserialize)]
struct GitHubCommitAuthor {
    name: String,
    date: DateTime<Utc>,
}
