use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tableops_resource::schema::v0;
use tokio::{io::AsyncWriteExt as _, process::Command};
use tracing::{debug, instrument};

pub struct ResourceProviderConfig {
    pub provider_executable: String,
    pub provider_args: Vec<String>,
}

/// Runs provider operations by spawning the provider executable, one
/// process per request.
pub struct ResourceProviderClient {
    provider_config: ResourceProviderConfig,
}

impl ResourceProviderClient {
    pub fn new(provider_config: ResourceProviderConfig) -> Self {
        ResourceProviderClient { provider_config }
    }

    pub async fn create(&self, inputs: v0::TableInputs) -> Result<v0::CreateResourceResponse> {
        let request = v0::Request::Create(v0::CreateResourceRequest {
            input_properties: inputs,
        });
        match self.request(&request).await? {
            v0::Response::Create(r) => Ok(r),
            other => bail!("Provider answered create with an unexpected response: {:?}", other),
        }
    }

    pub async fn diff(
        &self,
        id: String,
        old_inputs: v0::TableInputs,
        new_inputs: v0::TableInputs,
    ) -> Result<v0::DiffResourceResponse> {
        let request = v0::Request::Diff(v0::DiffResourceRequest {
            id,
            old_inputs,
            new_inputs,
        });
        match self.request(&request).await? {
            v0::Response::Diff(r) => Ok(r),
            other => bail!("Provider answered diff with an unexpected response: {:?}", other),
        }
    }

    pub async fn update(
        &self,
        id: String,
        old_inputs: v0::TableState,
        new_inputs: v0::TableInputs,
    ) -> Result<v0::UpdateResourceResponse> {
        let request = v0::Request::Update(v0::UpdateResourceRequest {
            id,
            old_inputs,
            new_inputs,
        });
        match self.request(&request).await? {
            v0::Response::Update(r) => Ok(r),
            other => bail!("Provider answered update with an unexpected response: {:?}", other),
        }
    }

    pub async fn delete(&self, id: String, inputs: v0::TableInputs) -> Result<()> {
        let request = v0::Request::Delete(v0::DeleteResourceRequest {
            id,
            input_properties: inputs,
        });
        match self.request(&request).await? {
            v0::Response::Delete(_) => Ok(()),
            other => bail!("Provider answered delete with an unexpected response: {:?}", other),
        }
    }

    #[instrument(skip_all, fields(provider = %self.provider_config.provider_executable))]
    async fn request(&self, request: &v0::Request) -> Result<v0::Response> {
        let line = serde_json::to_string(request)?;
        debug!(%line, "sending request");

        let mut process = Command::new(&self.provider_config.provider_executable)
            .args(&self.provider_config.provider_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| {
                format!(
                    "Could not spawn provider process {}",
                    self.provider_config.provider_executable
                )
            })?;

        {
            let mut child_in = process
                .stdin
                .take()
                .context("Provider process has no stdin")?;
            child_in.write_all(line.as_bytes()).await?;
            child_in.write_all(b"\n").await?;
            child_in.flush().await?;
            // This closes stdin
        }

        let output = process.wait_with_output().await?;
        if !output.status.success() {
            bail!(
                "Provider process {} failed with {}",
                self.provider_config.provider_executable,
                output.status
            );
        }

        let stdout = String::from_utf8(output.stdout)
            .with_context(|| "Provider response is not valid UTF-8")?;
        let response_line = stdout
            .lines()
            .find(|l| !l.trim().is_empty())
            .context("Provider process exited without a response")?;
        debug!(response = %response_line, "received response");
        serde_json::from_str(response_line).with_context(|| "Could not parse provider response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A provider stand-in: a shell script that swallows the request and
    /// prints a canned answer.
    fn scripted(script: &str) -> ResourceProviderClient {
        ResourceProviderClient::new(ResourceProviderConfig {
            provider_executable: "sh".to_string(),
            provider_args: vec!["-c".to_string(), script.to_string()],
        })
    }

    fn inputs() -> v0::TableInputs {
        v0::TableInputs {
            name: "t".to_string(),
            size: 1,
            read_only: false,
            endpoint: "http://localhost:3000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_diff_response() {
        let client = scripted(
            r#"read line; echo '{"type":"diff","changes":true,"replaces":[],"deleteBeforeReplace":false}'"#,
        );
        let diff = client
            .diff("1".to_string(), inputs(), inputs())
            .await
            .unwrap();
        assert_eq!(
            diff,
            v0::DiffResourceResponse {
                changes: true,
                replaces: vec![],
                delete_before_replace: false,
            }
        );
    }

    #[tokio::test]
    async fn test_request_reaches_provider() {
        // Answer only if the request line is a delete for id 7
        let client = scripted(
            r#"read line; case "$line" in *'"type":"delete"'*'"id":"7"'*) echo '{"type":"delete"}';; *) exit 2;; esac"#,
        );
        client.delete("7".to_string(), inputs()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_response_type() {
        let client = scripted(r#"read line; echo '{"type":"delete"}'"#);
        let err = client.create(inputs()).await.unwrap_err();
        assert!(err.to_string().contains("unexpected response"));
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let client = scripted("read line; echo 'Error: boom' >&2; exit 3");
        let err = client.delete("1".to_string(), inputs()).await.unwrap_err();
        assert!(err.to_string().contains("failed"));
    }

    #[tokio::test]
    async fn test_provider_without_response() {
        let client = scripted("read line");
        let err = client.delete("1".to_string(), inputs()).await.unwrap_err();
        assert!(err.to_string().contains("without a response"));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let client = ResourceProviderClient::new(ResourceProviderConfig {
            provider_executable: "/nonexistent/tableops-provider".to_string(),
            provider_args: vec![],
        });
        let err = client.create(inputs()).await.unwrap_err();
        assert!(err.to_string().contains("Could not spawn provider process"));
    }
}
