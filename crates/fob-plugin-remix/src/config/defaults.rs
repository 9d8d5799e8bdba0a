use std::path::PathBuf;

pub fn default_app_directory() -> PathBuf {
    PathBuf::from("app")
}

pub fn default_build_directory() -> PathBuf {
    PathBuf::from("build")
}

pub fn default_server_build_file() -> String {
    "index.js".to_string()
}

pub fn default_public_path() -> String {
    "/".to_string()
}

pub fn default_assets_dir() -> String {
    "assets".to_string()
}

pub fn default_basename() -> String {
    "/".to_string()
}

pub fn default_ssr() -> bool {
    true // Server rendering by default
}
