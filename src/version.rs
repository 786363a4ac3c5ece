//! Version and build information
//!
//! Build metadata (commit SHA, build date, rustc version) is injected by
//! `build.rs`; each value falls back to "unknown".

/// Full version string including build metadata
///
/// Returns format: "graphvault {version} ({commit} {date}) rustc {rustc_version}"
pub fn version() -> String {
    format!(
        "graphvault {} ({} {}) rustc {}",
        package_version(),
        build_commit(),
        build_date(),
        rustc_version()
    )
}

/// Package version (e.g., "0.4.0")
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_commit() -> &'static str {
    option_env!("GRAPHVAULT_COMMIT_SHA").unwrap_or("unknown")
}

pub fn build_date() -> &'static str {
    option_env!("GRAPHVAULT_BUILD_DATE").unwrap_or("unknown")
}

pub fn rustc_version() -> &'static str {
    option_env!("GRAPHVAULT_RUSTC_VERSION").unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_mentions_package_version() {
        let v = version();
        assert!(v.starts_with("graphvault "));
        assert!(v.contains(package_version()));
    }
}
