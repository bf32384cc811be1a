//! GitHub REST client
//!
//! Synchronous (blocking) client for the handful of endpoints the setup
//! and deploy flows need: auth check, Actions secrets and variables,
//! repository contents, deploy keys. 404s on GET are existence probes,
//! not failures; every other non-2xx surfaces as a provider error.

pub mod seal;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::error::{DeployError, DeployResult};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("gangplank/", env!("CARGO_PKG_VERSION"));

/// A deploy key registered with the repository.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployKey {
    pub id: u64,
    pub title: String,
    pub key: String,
    pub read_only: bool,
}

#[derive(Debug, Deserialize)]
struct RepoPublicKey {
    key_id: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct Identity {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ContentBlob {
    sha: String,
}

/// Seam between the flows and the provider API, so orchestration logic is
/// testable without the network. The optionality of the client at call
/// sites is explicit: every caller branches on `Option<&dyn CiProvider>`.
pub trait CiProvider {
    /// Verify the credential; returns the authenticated login. Must pass
    /// before any mutating call.
    fn test_connection(&self) -> DeployResult<String>;

    /// Seal-encrypt and upsert an Actions secret. Implementations must
    /// never transmit the plaintext.
    fn put_secret(&self, name: &str, plaintext: &str) -> DeployResult<()>;

    /// Create or update an Actions variable.
    fn set_variable(&self, name: &str, value: &str) -> DeployResult<()>;

    /// Create or update a file in the repository on `branch`.
    fn upsert_file(&self, path: &str, content: &str, message: &str, branch: &str)
        -> DeployResult<()>;

    fn list_deploy_keys(&self) -> DeployResult<Vec<DeployKey>>;

    fn create_deploy_key(&self, title: &str, key: &str, read_only: bool) -> DeployResult<()>;
}

/// Blocking client bound to one repository.
pub struct GithubClient {
    http: Client,
    token: String,
    api_url: String,
    owner: String,
    repo: String,
}

impl GithubClient {
    pub fn new(token: &str, owner: &str, repo: &str) -> DeployResult<Self> {
        Ok(Self {
            http: Client::builder().user_agent(USER_AGENT).build()?,
            token: token.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Point at a GitHub Enterprise (or test) API root.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, rest: &str) -> String {
        format!("{}/repos/{}/{}/{rest}", self.api_url, self.owner, self.repo)
    }

    fn send(&self, req: RequestBuilder) -> DeployResult<Response> {
        let resp = req
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()?;
        Ok(resp)
    }

    /// Issue the request and fail on any non-2xx status.
    fn expect_success(&self, req: RequestBuilder) -> DeployResult<Response> {
        let resp = self.send(req)?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(error_for(status, &resp.text().unwrap_or_default()))
        }
    }

    /// GET used as an existence probe: 404 means "absent", not "failed".
    fn probe(&self, url: &str) -> DeployResult<Option<Response>> {
        let resp = self.send(self.http.get(url))?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(resp)),
            status => Err(error_for(status, &resp.text().unwrap_or_default())),
        }
    }

    fn secrets_public_key(&self) -> DeployResult<RepoPublicKey> {
        let resp = self.expect_success(self.http.get(self.repo_url("actions/secrets/public-key")))?;
        Ok(resp.json()?)
    }
}

impl CiProvider for GithubClient {
    fn test_connection(&self) -> DeployResult<String> {
        let resp = self.expect_success(self.http.get(format!("{}/user", self.api_url)))?;
        let identity: Identity = resp.json()?;
        Ok(identity.login)
    }

    fn put_secret(&self, name: &str, plaintext: &str) -> DeployResult<()> {
        // Mandated two-step protocol: fetch the repository key, seal the
        // value against it, then PUT ciphertext keyed by key_id.
        let public_key = self.secrets_public_key()?;
        let encrypted_value = seal::seal_secret(&public_key.key, plaintext)?;

        self.expect_success(
            self.http
                .put(self.repo_url(&format!("actions/secrets/{name}")))
                .json(&json!({
                    "encrypted_value": encrypted_value,
                    "key_id": public_key.key_id,
                })),
        )?;
        Ok(())
    }

    fn set_variable(&self, name: &str, value: &str) -> DeployResult<()> {
        let exists = self
            .probe(&self.repo_url(&format!("actions/variables/{name}")))?
            .is_some();

        if exists {
            self.expect_success(
                self.http
                    .patch(self.repo_url(&format!("actions/variables/{name}")))
                    .json(&json!({ "name": name, "value": value })),
            )?;
        } else {
            self.expect_success(
                self.http
                    .post(self.repo_url("actions/variables"))
                    .json(&json!({ "name": name, "value": value })),
            )?;
        }
        Ok(())
    }

    fn upsert_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> DeployResult<()> {
        // The previous blob SHA is required on update; omitting it when
        // the file exists is rejected as a conflict.
        let existing_sha = match self.probe(&self.repo_url(&format!("contents/{path}")))? {
            Some(resp) => Some(resp.json::<ContentBlob>()?.sha),
            None => None,
        };

        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content),
            "branch": branch,
        });
        if let Some(sha) = existing_sha {
            body["sha"] = json!(sha);
        }

        self.expect_success(
            self.http
                .put(self.repo_url(&format!("contents/{path}")))
                .json(&body),
        )?;
        Ok(())
    }

    fn list_deploy_keys(&self) -> DeployResult<Vec<DeployKey>> {
        let resp = self.expect_success(self.http.get(self.repo_url("keys")))?;
        Ok(resp.json()?)
    }

    fn create_deploy_key(&self, title: &str, key: &str, read_only: bool) -> DeployResult<()> {
        self.expect_success(self.http.post(self.repo_url("keys")).json(&json!({
            "title": title,
            "key": key.trim(),
            "read_only": read_only,
        })))?;
        Ok(())
    }
}

/// Whether `public_key` is already registered, by exact key-material
/// comparison.
///
/// GitHub strips the comment field from registered keys, so only the
/// algorithm and base64 blob are compared; both must match exactly.
/// Prefix or substring matches would accept a truncated key.
pub fn deploy_key_registered(public_key: &str, keys: &[DeployKey]) -> bool {
    let Some(wanted) = key_material(public_key) else {
        return false;
    };
    keys.iter().any(|k| key_material(&k.key) == Some(wanted.clone()))
}

fn key_material(key: &str) -> Option<(String, String)> {
    let mut fields = key.split_whitespace();
    let algorithm = fields.next()?;
    let blob = fields.next()?;
    Some((algorithm.to_string(), blob.to_string()))
}

fn error_for(status: StatusCode, body: &str) -> DeployError {
    // GitHub wraps error detail in {"message": "..."}
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(String::from))
        .unwrap_or_else(|| {
            let line = body.lines().next().unwrap_or("").trim();
            if line.is_empty() {
                "no response body".to_string()
            } else {
                line.to_string()
            }
        });
    DeployError::provider(status.as_u16(), message)
}
