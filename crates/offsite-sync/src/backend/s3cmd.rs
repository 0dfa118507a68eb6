use offsite_core::config::ToolCommand;
use offsite_core::Result;
use std::path::{Path, PathBuf};

use super::{path_arg, run_client, ObjectStore};

/// `s3cmd` client
#[derive(Debug, Clone)]
pub struct S3CmdStore {
    tool: ToolCommand,
    config: PathBuf,
    server: Option<String>,
    log: Option<PathBuf>,
}

impl S3CmdStore {
    pub fn new(
        tool: ToolCommand,
        config: &Path,
        server: Option<String>,
        log: Option<PathBuf>,
    ) -> Self {
        Self {
            tool,
            config: config.to_path_buf(),
            server: server.as_deref().map(bare_host),
            log,
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--config={}", self.config.display()),
            "--server-side-encryption".to_string(),
        ];
        if self.log.is_some() {
            args.extend(["--verbose".to_string(), "--debug".to_string()]);
        } else {
            args.push("--quiet".to_string());
        }
        if let Some(server) = &self.server {
            args.push(format!("--host={}", server));
            args.push(format!("--host-bucket={}", server));
        }
        args
    }

    fn copy_args(&self, local: &Path, remote: &str, recursive: bool) -> Vec<String> {
        let mut args = self.base_args();
        args.push("put".to_string());
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
            args.push("--delete-removed".to_string());
        }
        args.push(path_arg(local));
        args.push(remote.to_string());
        args
    }
}

/// s3cmd takes a bare `host[:port]`, without the URL scheme
fn bare_host(server: &str) -> String {
    server.rsplit("://").next().unwrap_or(server).to_string()
}

impl ObjectStore for S3CmdStore {
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

    fn store(server: Option<&str>, log: bool) -> S3CmdStore {
        S3CmdStore::new(
            ToolCommand::new(["s3cmd"]),
            Path::new("/etc/s3cmd.cfg"),
            server.map(str::to_string),
            log.then(|| PathBuf::from("/tmp/sync.log")),
        )
    }

    #[test]
    fn test_quiet_put() {
        let args = store(None, false).copy_args(Path::new("/srv/a.tgz"), "s3://b/a.tgz", false);
        assert_eq!(
            args,
            [
                "--config=/etc/s3cmd.cfg",
                "--server-side-encryption",
                "--quiet",
                "put",
                "/srv/a.tgz",
                "s3://b/a.tgz"
            ]
        );
    }

    #[test]
    fn test_verbose_sync_with_server() {
        let args = store(Some("minio:9000"), true).mirror_args(Path::new("/srv/x"), "s3://b/x", true);
        assert_eq!(
            args,
            [
                "--config=/etc/s3cmd.cfg",
                "--server-side-encryption",
                "--verbose",
                "--debug",
                "--host=minio:9000",
                "--host-bucket=minio:9000",
                "sync",
                "--delete-removed",
                "/srv/x",
                "s3://b/x"
            ]
        );
    }

    #[test]
    fn test_server_scheme_is_stripped() {
        let args = store(Some("http://minio:9000"), false).copy_args(
            Path::new("/srv/a.tgz"),
            "s3://b/a.tgz",
            false,
        );
        assert!(args.contains(&"--host=minio:9000".to_string()));
        assert!(args.contains(&"--host-bucket=minio:9000".to_string()));
        assert!(!args.iter().any(|arg| arg.contains("http://")));
    }

    #[test]
    fn test_recursive_put() {
        let args = store(None, false).copy_args(Path::new("/srv/d/"), "s3://b/d/", true);
        assert!(args.contains(&"--recursive".to_string()));
    }
}
