//! Clone, fetch, checkout and push against `origin`.

use super::{open_repository, safe_checkout};
use crate::error::{GitError, Result, ScmError};
use git2::build::RepoBuilder;
use git2::{BranchType, Cred, CredentialType, FetchOptions, PushOptions, RemoteCallbacks};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use url::Url;

/// Username the release host expects alongside an access token
const TOKEN_USERNAME: &str = "x-access-token";

/// Embed an access token into an https clone URL.
///
/// Returns the URL unchanged when no token is configured.
pub fn authenticated_url(clone_url: &str, access_token: Option<&str>) -> Result<String> {
    let token = match access_token {
        Some(token) if !token.is_empty() => token,
        _ => return Ok(clone_url.to_string()),
    };

    let mut url = Url::parse(clone_url).map_err(|e| ScmError::AuthenticationFailed {
        reason: format!("clone url is not a valid URL: {}", e),
    })?;

    url.set_username(TOKEN_USERNAME)
        .and_then(|_| url.set_password(Some(token)))
        .map_err(|_| ScmError::AuthenticationFailed {
            reason: "clone url cannot carry credentials".to_string(),
        })?;

    Ok(url.to_string())
}

/// Callbacks offering the credentials embedded in `remote_url` to libgit2
pub(crate) fn remote_callbacks<'cb>(remote_url: &str) -> RemoteCallbacks<'cb> {
    let credentials = url_credentials(remote_url);
    let mut attempts = 0u32;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, allowed| {
        // libgit2 keeps asking until it gets an error
        attempts += 1;
        if attempts > 1 {
            return Err(git2::Error::from_str("credentials rejected by remote"));
        }

        if let Some((username, password)) = &credentials
            && allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
        {
            return Cred::userpass_plaintext(username, password);
        }

        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username_from_url.unwrap_or("git"));
        }

        Cred::default()
    });
    callbacks
}

fn url_credentials(remote_url: &str) -> Option<(String, String)> {
    let url = Url::parse(remote_url).ok()?;
    let password = url.password()?;
    Some((url.username().to_string(), password.to_string()))
}

fn fetch_options<'cb>(remote_url: &str) -> FetchOptions<'cb> {
    let mut options = FetchOptions::new();
    options.remote_callbacks(remote_callbacks(remote_url));
    options
}

/// Clone `remote_url` into `<parent_path>/<repo_name>`.
///
/// Fails when the target path already exists. Returns the absolute local path.
pub fn clone(parent_path: &Path, repo_name: &str, remote_url: &str) -> Result<PathBuf> {
    let local_path = parent_path.join(repo_name).absolutize()?.into_owned();

    if local_path.exists() {
        return Err(GitError::Filesystem {
            reason: format!(
                "The local repository path already exists, this should never happen: {}",
                local_path.display()
            ),
        }
        .into());
    }

    std::fs::create_dir_all(&local_path)?;

    log::info!("Cloning {} into {}", repo_name, local_path.display());
    RepoBuilder::new()
        .fetch_options(fetch_options(remote_url))
        .clone(remote_url, &local_path)?;

    Ok(local_path)
}

/// Fetch `remote_ref` from `origin` into `refs/heads/<local_branch>` and check it out
pub fn fetch_ref(local_path: &Path, remote_ref: &str, local_branch: &str) -> Result<()> {
    let repo = open_repository(local_path)?;

    let mut remote = repo.find_remote("origin").map_err(|e| GitError::Filesystem {
        reason: format!("Failed to lookup origin remote: {}", e),
    })?;
    let origin_url = remote.url().unwrap_or_default().to_string();

    let refspec = format!("{}:refs/heads/{}", remote_ref, local_branch);
    log::debug!("Fetching {}", refspec);
    remote.fetch(&[refspec.as_str()], Some(&mut fetch_options(&origin_url)), None)?;

    let branch = repo
        .find_branch(local_branch, BranchType::Local)
        .map_err(|e| GitError::Filesystem {
            reason: format!("Failed to lookup fetched branch '{}': {}", local_branch, e),
        })?;
    let commit = branch.get().peel_to_commit()?;

    repo.checkout_tree(commit.as_object(), Some(&mut safe_checkout()))?;
    repo.set_head(&format!("refs/heads/{}", local_branch))?;

    Ok(())
}

/// Check out `branch`, creating a local branch tracking `origin/<branch>` when absent
pub fn checkout(local_path: &Path, branch: &str) -> Result<()> {
    let repo = open_repository(local_path)?;

    let upstream_name = format!("origin/{}", branch);
    let remote_branch = repo
        .find_branch(&upstream_name, BranchType::Remote)
        .map_err(|e| GitError::Filesystem {
            reason: format!("Failed to find remote branch '{}': {}", upstream_name, e),
        })?;
    let remote_commit = remote_branch.get().peel_to_commit()?;

    let local_branch = match repo.find_branch(branch, BranchType::Local) {
        Ok(existing) => existing,
        Err(_) => {
            log::debug!("Creating local branch '{}' tracking {}", branch, upstream_name);
            let mut created = repo.branch(branch, &remote_commit, false)?;
            created.set_upstream(Some(&upstream_name))?;
            created
        }
    };

    let commit = local_branch.get().peel_to_commit()?;
    repo.checkout_tree(commit.as_object(), Some(&mut safe_checkout()))?;
    repo.set_head(&format!("refs/heads/{}", branch))?;

    Ok(())
}

/// Push `local_branch` to `remote_branch` and `tag_name` to `origin` in one push.
///
/// Any ref the remote refuses turns the whole push into [`GitError::PushRejected`].
pub fn push(local_path: &Path, local_branch: &str, remote_branch: &str, tag_name: &str) -> Result<()> {
    let repo = open_repository(local_path)?;

    let mut remote = repo.find_remote("origin").map_err(|e| GitError::Filesystem {
        reason: format!("Failed to lookup origin remote: {}", e),
    })?;
    let origin_url = remote.url().unwrap_or_default().to_string();

    let refspecs = [
        format!("refs/heads/{}:refs/heads/{}", local_branch, remote_branch),
        format!("refs/tags/{}:refs/tags/{}", tag_name, tag_name),
    ];

    let mut rejections = Vec::new();
    {
        let mut callbacks = remote_callbacks(&origin_url);
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                rejections.push(format!("{}: {}", refname, message));
            }
            Ok(())
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        log::info!("Pushing {} and tag {} to origin", remote_branch, tag_name);
        remote.push(&refspecs, Some(&mut options))?;
    }

    if !rejections.is_empty() {
        return Err(GitError::PushRejected { rejections }.into());
    }

    Ok(())
}
