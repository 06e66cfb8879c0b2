//! Download, validate and extract the boundary archive into the tier cache.

use std::fs::File;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use zip::ZipArchive;

use super::{GeometryConfig, GeometryError, OPTIONAL_EXTENSIONS, REQUIRED_EXTENSIONS};
use crate::http::{Fetch, HttpRequest};

/// Make sure the required shapefile members of the configured tier are
/// cached, downloading the archive when any is absent.
///
/// Returns the path of the cached geometry stream. When validation fails the
/// tier directory is left untouched.
pub(crate) fn ensure_cached(
    fetch: &dyn Fetch,
    config: &GeometryConfig,
) -> Result<Utf8PathBuf, GeometryError> {
    let tier = config.tier_dir();
    let required: Vec<String> = REQUIRED_EXTENSIONS
        .iter()
        .map(|ext| config.member_name(ext))
        .collect();
    let names: Vec<&str> = required.iter().map(String::as_str).collect();
    let missing = worldsync_fs::missing_files(&tier, &names)
        .map_err(GeometryError::io("inspect boundary cache", tier.clone()))?;
    if missing.is_empty() {
        debug!("boundary cache hit for {tier}");
        return Ok(config.shp_path());
    }
    debug!("boundary cache for {tier} lacks {}", missing.join(", "));

    download_and_extract(fetch, config, &tier)?;
    Ok(config.shp_path())
}

fn download_and_extract(
    fetch: &dyn Fetch,
    config: &GeometryConfig,
    tier: &Utf8Path,
) -> Result<(), GeometryError> {
    let url = config.archive_url();
    let root = &config.cache_dir;
    worldsync_fs::ensure_dir(root)
        .map_err(GeometryError::io("create cache directory", root.clone()))?;

    let mut download = tempfile::Builder::new()
        .prefix(".download-")
        .suffix(".zip")
        .tempfile_in(root.as_std_path())
        .map_err(GeometryError::io("create download file", root.clone()))?;
    info!("downloading boundary archive {url}");
    let bytes = fetch
        .download(&HttpRequest::new(url.as_str()), &mut download)
        .map_err(|source| GeometryError::Download { source })?;
    debug!("downloaded {bytes} bytes from {url}");

    let reopened = download
        .reopen()
        .map_err(GeometryError::io("reopen downloaded archive", root.clone()))?;
    let mut archive = ZipArchive::new(reopened).map_err(|source| GeometryError::Archive {
        url: url.clone(),
        source,
    })?;
    let entries = locate_members(&archive, config, &url)?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(root.as_std_path())
        .map_err(GeometryError::io("create staging directory", root.clone()))?;
    let staging_dir = worldsync_fs::utf8_path(staging.path().to_path_buf())
        .map_err(GeometryError::io("resolve staging directory", root.clone()))?;
    for (member, entry_name) in &entries {
        extract_member(&mut archive, entry_name, &staging_dir.join(member), &url)?;
    }

    worldsync_fs::ensure_dir(tier)
        .map_err(GeometryError::io("create tier directory", tier.to_path_buf()))?;
    for (member, _) in &entries {
        let target = tier.join(member);
        worldsync_fs::replace_file(&staging_dir.join(member), &target)
            .map_err(GeometryError::io("move extracted member", target.clone()))?;
    }
    info!("cached {} members of {url} in {tier}", entries.len());
    Ok(())
}

/// Pair each wanted member with its entry name inside the archive.
///
/// Fails with [`GeometryError::MissingArchiveMembers`] before anything is
/// extracted when a required member is absent.
fn locate_members<R: io::Read + io::Seek>(
    archive: &ZipArchive<R>,
    config: &GeometryConfig,
    url: &str,
) -> Result<Vec<(String, String)>, GeometryError> {
    let entry_names: Vec<&str> = archive.file_names().collect();
    let find = |member: &str| {
        entry_names
            .iter()
            .find(|entry| entry.rsplit('/').next() == Some(member))
            .map(|entry| (*entry).to_owned())
    };

    let mut located = Vec::new();
    let mut missing = Vec::new();
    for ext in REQUIRED_EXTENSIONS {
        let member = config.member_name(ext);
        match find(&member) {
            Some(entry) => located.push((member, entry)),
            None => missing.push(member),
        }
    }
    if !missing.is_empty() {
        return Err(GeometryError::MissingArchiveMembers {
            url: url.to_owned(),
            missing,
        });
    }
    for ext in OPTIONAL_EXTENSIONS {
        let member = config.member_name(ext);
        if let Some(entry) = find(&member) {
            located.push((member, entry));
        }
    }
    Ok(located)
}

fn extract_member<R: io::Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    entry_name: &str,
    target: &Utf8Path,
    url: &str,
) -> Result<(), GeometryError> {
    let mut entry = archive
        .by_name(entry_name)
        .map_err(|source| GeometryError::Archive {
            url: url.to_owned(),
            source,
        })?;
    let mut out = File::create(target.as_std_path())
        .map_err(GeometryError::io("create extracted member", target.to_path_buf()))?;
    io::copy(&mut entry, &mut out)
        .map_err(GeometryError::io("extract archive member", target.to_path_buf()))?;
    Ok(())
}
