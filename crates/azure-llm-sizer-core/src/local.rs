use std::path::PathBuf;

/// Directory holding user-supplied catalog overrides,
/// e.g. `~/.config/azure-llm-sizer` on Linux.
pub fn data_dir() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("azure-llm-sizer"))
}

/// Path of an override file, if the config directory is known.
/// The file itself may not exist.
pub fn data_path(filename: &str) -> Option<PathBuf> {
    Some(data_dir()?.join(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_path_is_under_data_dir() {
        if let (Some(dir), Some(path)) = (data_dir(), data_path("azure-gpus.toml")) {
            assert!(path.starts_with(&dir));
            assert!(path.ends_with("azure-gpus.toml"));
        }
    }
}
