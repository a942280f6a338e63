pub mod document;
#[cfg(not(target_arch = "wasm32"))]
pub mod json_file;
pub mod repository;
