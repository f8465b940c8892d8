//! Alternate strategy: build `nibble` with the Go toolchain.
//!
//! Compiled in with the `source-install` feature, in place of the release
//! download. The binary is installed with `go install` into the directory Go
//! itself uses:
//!
//! 1. `$GOBIN`
//! 2. `{first GOPATH entry}/bin`
//! 3. `~/go/bin`
//!
//! A binary already present there is launched as is.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::config::{Environment, InstallerConfig};
use crate::errors::NibbleError;

/// Go module path of the scanner.
const GO_MODULE: &str = "github.com/backendsystems/nibble";

/// Returns the directory `go install` places binaries in.
///
/// # Errors
///
/// Returns an error if neither `GOBIN`, `GOPATH` nor a home directory is known.
pub fn go_bin_dir(env: &Environment) -> Result<PathBuf> {
    if let Some(gobin) = &env.gobin {
        return Ok(gobin.clone());
    }
    if let Some(gopath) = &env.gopath {
        return Ok(gopath.join("bin"));
    }
    let home = env
        .home
        .as_ref()
        .context("Cannot determine home directory. Set GOBIN or GOPATH.")?;
    Ok(home.join("go").join("bin"))
}

/// Returns the Go-installed binary, running `go install` first if needed.
///
/// # Errors
///
/// Returns [`NibbleError::SourceInstall`] if `go` is not on `PATH`, exits
/// non-zero, or leaves no binary behind.
pub fn ensure_installed_from_source(env: &Environment, config: &InstallerConfig) -> Result<PathBuf> {
    ensure_installed_from_source_with(env, config, || {
        which::which("go")
            .map_err(|_| NibbleError::source_install("go toolchain not found on PATH").into())
    })
}

/// Like [`ensure_installed_from_source`], locating `go` through `locate_go`.
///
/// # Errors
///
/// See [`ensure_installed_from_source`].
pub fn ensure_installed_from_source_with<F>(
    env: &Environment,
    config: &InstallerConfig,
    locate_go: F,
) -> Result<PathBuf>
where
    F: FnOnce() -> Result<PathBuf>,
{
    let binary_path = go_bin_dir(env)?.join(config.binary_name());
    if binary_path.exists() {
        tracing::debug!(path = %binary_path.display(), "go-installed binary found");
        return Ok(binary_path);
    }

    let go = locate_go()?;
    let package = format!("{GO_MODULE}@{}", config.version.tag());
    tracing::info!(go = %go.display(), module = %package, "installing with go");
    go_install(&go, &package)?;

    if !binary_path.exists() {
        return Err(NibbleError::source_install(format!(
            "go install succeeded but {} does not exist",
            binary_path.display()
        ))
        .into());
    }
    Ok(binary_path)
}

fn go_install(go: &Path, package: &str) -> Result<()> {
    let status = Command::new(go)
        .arg("install")
        .arg(package)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to execute {}", go.display()))?;

    if !status.success() {
        let code = status.code().unwrap_or(1);
        return Err(NibbleError::source_install(format!(
            "go install {package} exited with code {code}"
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> InstallerConfig {
        let env = Environment {
            home: Some(PathBuf::from("/home/ada")),
            version: Some("1.2.0".to_string()),
            ..Environment::default()
        };
        InstallerConfig::from_environment(&env).unwrap()
    }

    #[test]
    fn gobin_takes_precedence() {
        let env = Environment {
            home: Some(PathBuf::from("/home/ada")),
            gobin: Some(PathBuf::from("/opt/gobin")),
            gopath: Some(PathBuf::from("/opt/gopath")),
            ..Environment::default()
        };
        assert_eq!(go_bin_dir(&env).unwrap(), PathBuf::from("/opt/gobin"));
    }

    #[test]
    fn gopath_bin_is_second() {
        let env = Environment {
            home: Some(PathBuf::from("/home/ada")),
            gopath: Some(PathBuf::from("/opt/gopath")),
            ..Environment::default()
        };
        assert_eq!(go_bin_dir(&env).unwrap(), PathBuf::from("/opt/gopath/bin"));
    }

    #[test]
    fn home_go_bin_is_the_fallback() {
        let env = Environment {
            home: Some(PathBuf::from("/home/ada")),
            ..Environment::default()
        };
        assert_eq!(go_bin_dir(&env).unwrap(), PathBuf::from("/home/ada/go/bin"));
    }

    #[test]
    fn existing_binary_skips_go() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("nibble"), b"bin").unwrap();
        let env = Environment {
            gobin: Some(temp.path().to_path_buf()),
            ..Environment::default()
        };

        let path = ensure_installed_from_source_with(&env, &config(), || {
            panic!("go must not be located when the binary exists")
        })
        .unwrap();

        assert_eq!(path, temp.path().join("nibble"));
    }

    #[test]
    fn gobin_alone_is_enough_without_home() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("nibble"), b"bin").unwrap();
        let env = Environment {
            gobin: Some(temp.path().to_path_buf()),
            version: Some("1.2.0".to_string()),
            ..Environment::default()
        };
        let config = InstallerConfig::from_environment(&env).unwrap();

        let path = ensure_installed_from_source_with(&env, &config, || {
            panic!("go must not be located when the binary exists")
        })
        .unwrap();

        assert_eq!(path, temp.path().join("nibble"));
    }

    #[test]
    fn missing_go_is_a_source_install_error() {
        let temp = TempDir::new().unwrap();
        let env = Environment {
            gobin: Some(temp.path().to_path_buf()),
            ..Environment::default()
        };

        let err = ensure_installed_from_source_with(&env, &config(), || {
            Err(NibbleError::source_install("go toolchain not found on PATH").into())
        })
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "source install failed: go toolchain not found on PATH"
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_go(temp: &TempDir, body: &str) -> PathBuf {
            let path = temp.path().join("go");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn go_install_places_binary() {
            let tools = TempDir::new().unwrap();
            let gobin = TempDir::new().unwrap();
            let log = tools.path().join("args.txt");
            let go = fake_go(
                &tools,
                &format!(
                    "echo \"$@\" > '{}'\ntouch '{}'",
                    log.display(),
                    gobin.path().join("nibble").display()
                ),
            );
            let env = Environment {
                gobin: Some(gobin.path().to_path_buf()),
                ..Environment::default()
            };

            let path = ensure_installed_from_source_with(&env, &config(), || Ok(go)).unwrap();

            assert_eq!(path, gobin.path().join("nibble"));
            assert_eq!(
                std::fs::read_to_string(&log).unwrap(),
                "install github.com/backendsystems/nibble@v1.2.0\n"
            );
        }

        #[test]
        fn failing_go_reports_exit_code() {
            let tools = TempDir::new().unwrap();
            let gobin = TempDir::new().unwrap();
            let go = fake_go(&tools, "exit 2");
            let env = Environment {
                gobin: Some(gobin.path().to_path_buf()),
                ..Environment::default()
            };

            let err = ensure_installed_from_source_with(&env, &config(), || Ok(go)).unwrap_err();

            assert!(err.to_string().contains("exited with code 2"), "{err}");
        }

        #[test]
        fn go_success_without_binary_is_an_error() {
            let tools = TempDir::new().unwrap();
            let gobin = TempDir::new().unwrap();
            let go = fake_go(&tools, "exit 0");
            let env = Environment {
                gobin: Some(gobin.path().to_path_buf()),
                ..Environment::default()
            };

            let err = ensure_installed_from_source_with(&env, &config(), || Ok(go)).unwrap_err();

            assert!(matches!(
                err.downcast_ref::<NibbleError>(),
                Some(NibbleError::SourceInstall { .. })
            ));
        }
    }
}
