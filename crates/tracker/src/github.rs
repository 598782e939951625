//! GitHub REST implementation of [`TicketStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::TrackerError;
use crate::models::{
    Comment, Contributor, NewTicket, RepoRef, Ticket, TicketQuery, TicketState, TicketUpdate,
};
use crate::store::TicketStore;

/// Default GitHub API endpoint
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Page size for list endpoints
const PER_PAGE: usize = 100;

/// Upper bound on pages fetched for a single listing
const MAX_PAGES: usize = 10;

/// GitHub API client bound to one repository.
#[derive(Debug, Clone)]
pub struct GitHubTracker {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    repo: RepoRef,
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    state: TicketState,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
    #[serde(default)]
    assignees: Vec<GitHubUser>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    /// Present when the "issue" is actually a pull request
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl From<GitHubIssue> for Ticket {
    fn from(issue: GitHubIssue) -> Self {
        Self {
            id: issue.number,
            state: issue.state,
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            assignees: issue.assignees.into_iter().map(|a| a.login).collect(),
            created_at: issue.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubContributor {
    #[serde(default)]
    login: Option<String>,
    contributions: u64,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GitHubFieldError>,
}

#[derive(Debug, Deserialize)]
struct GitHubFieldError {
    #[serde(default)]
    field: Option<String>,
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct LabelRequest<'a> {
    name: &'a str,
}

impl GitHubTracker {
    /// Create a new GitHub tracker for `repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str, repo: RepoRef) -> Result<Self, TrackerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("continuous-compliance/1.0"),
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: GITHUB_API_URL.to_string(),
            token: token.to_string(),
            repo,
        })
    }

    /// Point the client at a different API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.base_url, self.repo.owner, self.repo.name, path
        )
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn get_issue_page(
        &self,
        query: &TicketQuery,
        page: usize,
    ) -> Result<Vec<GitHubIssue>, TrackerError> {
        let mut params: Vec<(&str, String)> = vec![
            ("state", query.state.as_str().to_string()),
            ("sort", query.sort.as_str().to_string()),
            ("direction", query.direction.as_str().to_string()),
            ("per_page", PER_PAGE.to_string()),
            ("page", page.to_string()),
        ];
        if !query.labels.is_empty() {
            params.push(("labels", query.labels.join(",")));
        }

        let response = self
            .http_client
            .get(self.repo_url("/issues"))
            .header(AUTHORIZATION, self.auth())
            .query(&params)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Turn a non-success response into the matching [`TrackerError`].
async fn check_status(response: Response) -> Result<Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let parsed: Option<GitHubErrorBody> = serde_json::from_str(&text).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or(text);

    if status == StatusCode::UNPROCESSABLE_ENTITY {
        let field = parsed
            .as_ref()
            .and_then(|b| b.errors.iter().find_map(|e| e.field.clone()));
        if let Some(field) = field {
            return Err(TrackerError::Validation { field, message });
        }
    }

    if status == StatusCode::NOT_FOUND {
        return Err(TrackerError::NotFound(message));
    }

    Err(TrackerError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TicketStore for GitHubTracker {
    fn name(&self) -> &'static str {
        "github"
    }

    #[instrument(skip(self), fields(repo = %self.repo, labels = ?query.labels))]
    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, TrackerError> {
        let mut tickets = Vec::new();

        for page in 1..=MAX_PAGES {
            let issues = self.get_issue_page(query, page).await?;
            let fetched = issues.len();

            tickets.extend(
                issues
                    .into_iter()
                    .filter(|i| i.pull_request.is_none())
                    .map(Ticket::from),
            );

            if fetched < PER_PAGE {
                break;
            }
            if page == MAX_PAGES {
                warn!(
                    pages = MAX_PAGES,
                    count = tickets.len(),
                    "Issue listing truncated, older matching issues were not scanned"
                );
            }
        }

        debug!(count = tickets.len(), "Listed GitHub issues");
        Ok(tickets)
    }

    #[instrument(skip(self, ticket), fields(repo = %self.repo, title = %ticket.title))]
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, TrackerError> {
        let response = self
            .http_client
            .post(self.repo_url("/issues"))
            .header(AUTHORIZATION, self.auth())
            .json(ticket)
            .send()
            .await?;

        let issue: GitHubIssue = check_status(response).await?.json().await?;
        info!(issue_number = issue.number, "Created GitHub issue");
        Ok(issue.into())
    }

    #[instrument(skip(self, update), fields(repo = %self.repo, issue_number = id))]
    async fn update_ticket(&self, id: u64, update: &TicketUpdate) -> Result<Ticket, TrackerError> {
        let response = self
            .http_client
            .patch(self.repo_url(&format!("/issues/{id}")))
            .header(AUTHORIZATION, self.auth())
            .json(update)
            .send()
            .await?;

        let issue: GitHubIssue = check_status(response).await?.json().await?;
        info!(
            issue_number = issue.number,
            state = issue.state.as_str(),
            "Updated GitHub issue"
        );
        Ok(issue.into())
    }

    #[instrument(skip(self, body), fields(repo = %self.repo, issue_number = id))]
    async fn comment_on_ticket(&self, id: u64, body: &str) -> Result<Comment, TrackerError> {
        let response = self
            .http_client
            .post(self.repo_url(&format!("/issues/{id}/comments")))
            .header(AUTHORIZATION, self.auth())
            .json(&CommentRequest { body })
            .send()
            .await?;

        let comment: Comment = check_status(response).await?.json().await?;
        info!(comment_id = comment.id, "Commented on GitHub issue");
        Ok(comment)
    }

    async fn label_exists(&self, name: &str) -> Result<bool, TrackerError> {
        let response = self
            .http_client
            .get(self.repo_url(&format!("/labels/{}", urlencoding::encode(name))))
            .header(AUTHORIZATION, self.auth())
            .send()
            .await?;

        match check_status(response).await {
            Ok(_) => Ok(true),
            Err(TrackerError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_label(&self, name: &str) -> Result<(), TrackerError> {
        let response = self
            .http_client
            .post(self.repo_url("/labels"))
            .header(AUTHORIZATION, self.auth())
            .json(&LabelRequest { name })
            .send()
            .await?;

        check_status(response).await?;
        info!(repo = %self.repo, label = %name, "Created GitHub label");
        Ok(())
    }

    async fn list_contributors(&self) -> Result<Vec<Contributor>, TrackerError> {
        let response = self
            .http_client
            .get(self.repo_url("/contributors"))
            .header(AUTHORIZATION, self.auth())
            .query(&[("per_page", PER_PAGE.to_string())])
            .send()
            .await?;

        let raw: Vec<GitHubContributor> = check_status(response).await?.json().await?;
        let mut contributors: Vec<Contributor> = raw
            .into_iter()
            .filter_map(|c| {
                c.login.map(|login| Contributor {
                    login,
                    contributions: c.contributions,
                })
            })
            .collect();
        contributors.sort_by(|a, b| b.contributions.cmp(&a.contributions));
        Ok(contributors)
    }
}
