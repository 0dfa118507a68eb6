use offsite_core::config::ToolCommand;
use offsite_core::Result;
use std::path::{Path, PathBuf};

use super::{path_arg, run_client, ObjectStore};

/// `aws s3` client
#[derive(Debug, Clone)]
pub struct AwsCliStore {
    tool: ToolCommand,
    profile: String,
    endpoint: Option<String>,
    log: Option<PathBuf>,
}

impl AwsCliStore {
    pub fn new(
        tool: ToolCommand,
        profile: &str,
        endpoint: Option<String>,
        log: Option<PathBuf>,
    ) -> Self {
        Self {
            tool,
            profile: profile.to_string(),
            endpoint,
            log,
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "s3".to_string(),
            format!("--profile={}", self.profile),
            "--sse=AES256".to_string(),
        ];
        if self.log.is_some() {
            args.extend(["--debug".to_string(), "--no-paginate".to_string()]);
        } else {
            args.push("--only-show-errors".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            let url = if endpoint.contains("://") {
                endpoint.clone()
            } else {
                format!("https://{}", endpoint)
            };
            args.push(format!("--endpoint-url={}", url));
        }
        args
    }

    fn copy_args(&self, local: &Path, remote: &str, recursive: bool) -> Vec<String> {
        let mut args = self.base_args();
        args.push("cp".to_string());
        if recursive {
            args.push("--recursive".to_string());
        }
        args.push(path_arg(local));
        args.push(remote.to_string());
        args
    }

    fn mirror_args(&self, local: &Path, remote: &str, delete_extraneous: bool) -> Vec<String> {
        let mut args = self.base_args();
        args.push("sync".to_string());
        if delete_extraneous {
            args.push("--delete".to_string());
        }
        args.push(path_arg(local));
        args.push(remote.to_string());
        args
    }
}

impl ObjectStore for AwsCliStore {
    fn copy(&self, local: &Path, remote: &str, recursive: bool) -> Result<()> {
        run_client(
            &self.tool,
            &self.copy_args(local, remote, recursive),
            self.log.as_ref(),
        )
    }

    fn mirror(&self, local: &Path, remote: &str, delete_extraneous: bool) -> Result<()> {
        run_client(
            &self.tool,
            &self.mirror_args(local, remote, delete_extraneous),
            self.log.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_recursive_cp() {
        let store = AwsCliStore::new(ToolCommand::new(["aws"]), "backup", None, None);
        let args = store.copy_args(Path::new("/srv/d/"), "s3://b/d/", true);
        assert_eq!(
            args,
            [
                "s3",
                "--profile=backup",
                "--sse=AES256",
                "--only-show-errors",
                "cp",
                "--recursive",
                "/srv/d/",
                "s3://b/d/"
            ]
        );
    }

    #[test]
    fn test_debug_sync_with_endpoint() {
        let store = AwsCliStore::new(
            ToolCommand::new(["aws"]),
            "backup",
            Some("minio.local:9000".to_string()),
            Some(PathBuf::from("/tmp/sync.log")),
        );
        let args = store.mirror_args(Path::new("/srv/x"), "s3://b/x", true);
        assert_eq!(
            args,
            [
                "s3",
                "--profile=backup",
                "--sse=AES256",
                "--debug",
                "--no-paginate",
                "--endpoint-url=https://minio.local:9000",
                "sync",
                "--delete",
                "/srv/x",
                "s3://b/x"
            ]
        );
    }
}
