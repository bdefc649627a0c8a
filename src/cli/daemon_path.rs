use std::path::PathBuf;

/// Path of the standalone `memtrail-daemon` binary installed next to `path`.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("memtrail-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_daemon_path;

    #[test]
    #[cfg(not(windows))]
    fn test_daemon_sits_next_to_cli() {
        assert_eq!(
            to_daemon_path(PathBuf::from("/usr/local/bin/memtrail")),
            PathBuf::from("/usr/local/bin/memtrail-daemon")
        );
    }
}
