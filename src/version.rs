//! Kubernetes version resolution
//!
//! LKE versions are `major.minor` pairs. "latest" resolves to the greatest
//! pair the provider offers; a single malformed entry fails the resolution.

use tracing::debug;

use crate::crd::LkeClusterConfigSpec;
use crate::gateway::{LkeGateway, LkeVersion};
use crate::Error;

/// Parse a `major.minor` version into its two numeric segments
pub fn get_major_minor(version: &str) -> Result<(u32, u32), Error> {
    let segments: Vec<&str> = version.split('.').collect();
    let [major, minor] = segments.as_slice() else {
        return Err(Error::invalid_version(
            version,
            format!("expected 2 segments, got {}", segments.len()),
        ));
    };

    let parse = |segment: &str, what: &str| {
        segment
            .parse::<u32>()
            .map_err(|e| Error::invalid_version(version, format!("{what}: {e}")))
    };

    Ok((parse(*major, "major")?, parse(*minor, "minor")?))
}

/// Select the greatest version; the first entry wins ties
pub fn resolve_latest(versions: &[LkeVersion]) -> Result<LkeVersion, Error> {
    let mut latest: Option<(&LkeVersion, (u32, u32))> = None;

    for version in versions {
        let parsed = get_major_minor(&version.id)?;
        match latest {
            Some((_, best)) if parsed <= best => {}
            _ => latest = Some((version, parsed)),
        }
    }

    latest
        .map(|(v, _)| v.clone())
        .ok_or_else(|| Error::invalid_version("", "provider returned no versions"))
}

/// Effective Kubernetes version for a new cluster
///
/// Explicit versions are used verbatim; the provider rejects unknown ones.
pub async fn resolve_version(
    spec: &LkeClusterConfigSpec,
    gateway: &dyn LkeGateway,
) -> Result<String, Error> {
    if !spec.wants_latest_version() {
        if let Some(ref version) = spec.kubernetes_version {
            return Ok(version.clone());
        }
    }

    let versions = gateway
        .list_versions()
        .await
        .map_err(|e| Error::gateway("list versions", e))?;
    let latest = resolve_latest(&versions)?;
    debug!(version = %latest.id, "resolved latest kubernetes version");
    Ok(latest.id)
}
