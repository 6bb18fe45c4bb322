//! Read file tool: text files up to a size cap, images as data URIs.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use gdpilot_core::error::ToolError;
use gdpilot_core::host::{ProjectFs, extension};
use gdpilot_core::tool::{Tool, ToolArgs, ToolResult};
use std::sync::Arc;

use crate::blocking::on_blocking_pool;

/// Largest text file returned verbatim, in bytes.
pub const TEXT_FILE_LIMIT: u64 = 10240;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "svg", "bmp", "tga"];

pub struct ReadFileTool {
    fs: Arc<dyn ProjectFs>,
}

impl ReadFileTool {
    pub fn new(fs: Arc<dyn ProjectFs>) -> Self {
        Self { fs }
    }
}

fn image_mime(ext: &str) -> &str {
    match ext {
        "svg" => "svg+xml",
        "jpg" => "jpeg",
        other => other,
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the content of a specific file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The full path of the file to read (e.g., 'res://main.gd')"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolResult, ToolError> {
        let path = args.str("path");
        let fs = Arc::clone(&self.fs);
        on_blocking_pool("read_file", move || read(fs.as_ref(), &path)).await
    }
}

fn read(fs: &dyn ProjectFs, path: &str) -> ToolResult {
    if !fs.file_exists(path) {
        return ToolResult::failure("Error: File not found.");
    }

    let Ok(length) = fs.file_size(path) else {
        return ToolResult::failure("Error: Could not open file.");
    };

    let ext = extension(path);
    let is_image = IMAGE_EXTENSIONS.contains(&ext.as_str());

    if !is_image && length > TEXT_FILE_LIMIT {
        return ToolResult::failure(format!(
            "Error: File is too large ({length} bytes). Text file limit is 10KB."
        ));
    }

    let Ok(bytes) = fs.read(path) else {
        return ToolResult::failure("Error: Could not open file.");
    };

    if is_image {
        return ToolResult::ok(format!(
            "data:image/{};base64,{}",
            image_mime(&ext),
            BASE64.encode(&bytes)
        ));
    }

    ToolResult::ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    async fn read(fx: &Fixture, path: &str) -> ToolResult {
        ReadFileTool::new(fx.ctx.fs.clone())
            .execute(ToolArgs::from_value(serde_json::json!({ "path": path })))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reads_text_file() {
        let fx = Fixture::without_scene();
        fx.write("scripts/player.gd", b"extends CharacterBody3D\n");
        let result = read(&fx, "res://scripts/player.gd").await;
        assert!(result.success);
        assert_eq!(result.output, "extends CharacterBody3D\n");
    }

    #[tokio::test]
    async fn size_cap_boundary() {
        let fx = Fixture::without_scene();
        fx.write("at_limit.txt", &vec![b'a'; 10240]);
        fx.write("over_limit.txt", &vec![b'a'; 10241]);

        let ok = read(&fx, "res://at_limit.txt").await;
        assert!(ok.success);
        assert_eq!(ok.output.len(), 10240);

        let too_big = read(&fx, "res://over_limit.txt").await;
        assert!(!too_big.success);
        assert_eq!(
            too_big.output,
            "Error: File is too large (10241 bytes). Text file limit is 10KB."
        );
    }

    #[tokio::test]
    async fn images_bypass_cap_and_become_data_uris() {
        let fx = Fixture::without_scene();
        let png = vec![0x89u8; 20000];
        fx.write("icons/big.PNG", &png);

        let result = read(&fx, "res://icons/big.PNG").await;
        assert!(result.success);
        let expected = format!("data:image/png;base64,{}", BASE64.encode(&png));
        assert_eq!(result.output, expected);
    }

    #[tokio::test]
    async fn image_mime_mapping() {
        let fx = Fixture::without_scene();
        fx.write("a.svg", b"<svg/>");
        fx.write("b.jpg", b"\xff\xd8");

        assert!(read(&fx, "res://a.svg").await.output.starts_with("data:image/svg+xml;base64,"));
        assert!(read(&fx, "res://b.jpg").await.output.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn missing_file() {
        let fx = Fixture::without_scene();
        let result = read(&fx, "res://ghost.gd").await;
        assert!(!result.success);
        assert_eq!(result.output, "Error: File not found.");
    }
}
